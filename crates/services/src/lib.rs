//! Business logic layer: everything that isn't HTTP/WebSocket framing or
//! metadata-store SQL lives here, so `server` stays a thin transport shell
//! over these services.

pub mod active_learning;
pub mod billing;
pub mod dispatcher;
pub mod encoders;
pub mod enrichment;
pub mod error;
pub mod export;
pub mod quality;
pub mod search;
pub mod training;

pub use error::ServiceError;
