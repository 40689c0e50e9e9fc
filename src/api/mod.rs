//! API Module
//!
//! Inbound wire types and the HTTP surface.

pub mod completion;
pub mod routes;

pub use completion::{ChatRequest, ErrorDetail, ErrorResponse};
pub use routes::app;
