//! Request dispatch
//!
//! - `envelope`: wire envelopes and typed command payloads
//! - `handler`: decodes a request line and routes it to storage
//! - `error`: transport-level failures

pub mod envelope;
pub mod error;
pub mod handler;

pub use envelope::{
    Command, DELIMITER, DeregisterRequest, DeregisterResponse, RegisterRequest, RegisterResponse,
    Request, Response, ServiceRequest, ServiceResponse, ServicesRequest, ServicesResponse,
};
pub use error::DispatchError;
pub use handler::Dispatcher;
