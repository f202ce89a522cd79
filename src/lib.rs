//! Minimal service catalog: an in-memory registry of network services with
//! periodic liveness probing, served over a newline-delimited JSON protocol.

pub mod config;
pub mod server;
pub mod services;

pub use config::Config;
pub use server::{CatalogServer, ServerError};
