// Palisade - synchronizer-token CSRF protection for async middleware chains
//
// This crate bundles the workspace: HTTP plumbing, token storage and the
// guard itself. Depend on the individual crates for a smaller footprint.

// Re-export core functionality
pub use palisade_core::*;

pub use palisade_csrf as csrf;
pub use palisade_log as log;
pub use palisade_store as store;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Error, HandlerFn, HttpMethod, HttpRequest, HttpResponse, Middleware, MiddlewareChain,
        Next, handler_fn,
    };
    pub use palisade_csrf::{
        CsrfConfig, CsrfError, CsrfGuard, DefaultFailureHandler, FailureHandler,
        FailureHandlerFn, TokenPair,
    };
    pub use palisade_store::{MemoryTokenStore, TokenStore};
}
