//! Edge platform contract.
//!
//! # Data Flow
//! ```text
//! platform trigger (JSON)
//!     → event.rs (EdgeEvent: custom origin, uri, querystring)
//!     → pipeline
//!     → response.rs (EdgeResponse: status, description, headers, base64 body)
//!     → platform
//! ```

pub mod event;
pub mod response;

pub use event::{CustomOrigin, EdgeEvent, OriginProtocol, ViewerRequest};
pub use response::{BodyEncoding, EdgeResponse, HeaderEntry};
