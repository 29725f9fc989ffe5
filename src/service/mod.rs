pub mod verification_service;
