pub mod cleanup;
pub mod config;
pub mod constants;
pub mod serialization;
