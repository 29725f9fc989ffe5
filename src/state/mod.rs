pub mod verification_state;
