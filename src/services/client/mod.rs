pub mod catalog_client;
pub mod config;
pub mod error;
pub mod generic;

pub use catalog_client::*;
pub use config::*;
pub use error::*;
