pub mod root;
pub mod verification_routes;
