// Core types for Palisade: HTTP request/response wrappers, errors,
// body parsing and the async middleware chain the guard plugs into.

pub mod error;
pub mod form;
pub mod http;
pub mod middleware;

pub use error::*;
pub use form::*;
pub use http::*;
pub use middleware::*;
