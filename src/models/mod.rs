pub mod verification_model;
