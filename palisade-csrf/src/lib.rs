//! # Palisade CSRF Protection
//!
//! Synchronizer-token protection against cross-site request forgery.
//!
//! ## How it works
//!
//! - Every request through the guard receives a fresh token pair in its
//!   `{prefix}_name` and `{prefix}_value` attributes, ready to be embedded
//!   in the next form.
//! - POST, PUT, DELETE and PATCH requests must submit a previously issued
//!   pair in the same two body fields. The stored entry is consumed by the
//!   check, so each pair works at most once.
//! - The store keeps at most `storage_limit` pairs; the oldest are evicted
//!   first.
//! - Failed checks go to a [`FailureHandler`], by default a plain-text
//!   `400 Failed CSRF check!`.
//!
//! ## Quick Start
//!
//! ```rust
//! use palisade_csrf::{CsrfConfig, CsrfGuard};
//! use palisade_store::MemoryTokenStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryTokenStore::new());
//! let guard = CsrfGuard::new(CsrfConfig::default(), store).unwrap();
//!
//! // Issue a pair for a form without going through the middleware
//! let pair = guard.generate_token();
//! assert!(pair.name.starts_with("csrf"));
//! assert_eq!(pair.value.len(), 32);
//!
//! // Pairs are single-use
//! assert!(guard.validate_token(&pair.name, &pair.value));
//! assert!(!guard.validate_token(&pair.name, &pair.value));
//! ```
//!
//! ## As Middleware
//!
//! ```rust
//! use palisade_core::{HttpRequest, HttpResponse, MiddlewareChain, handler_fn};
//! use palisade_csrf::CsrfGuard;
//! use palisade_store::MemoryTokenStore;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let guard = CsrfGuard::builder()
//!     .storage(Arc::new(MemoryTokenStore::new()))
//!     .build()
//!     .unwrap();
//!
//! let mut chain = MiddlewareChain::new();
//! chain.use_middleware(guard);
//!
//! let handler = handler_fn(|req: HttpRequest| async move {
//!     let name = req.attribute("csrf_name").unwrap_or_default().to_string();
//!     Ok(HttpResponse::ok().with_text(name))
//! });
//!
//! // A POST without a token is rejected
//! let res = chain.apply(HttpRequest::new("POST", "/transfer"), handler.clone()).await.unwrap();
//! assert_eq!(res.status, 400);
//!
//! // A GET passes and sees a fresh token name
//! let res = chain.apply(HttpRequest::new("GET", "/transfer"), handler).await.unwrap();
//! assert!(res.body_text().starts_with("csrf"));
//! # });
//! ```

pub mod config;
pub mod error;
pub mod guard;
pub mod handler;
pub mod token;

pub use config::{CsrfConfig, DEFAULT_PREFIX, DEFAULT_STORAGE_LIMIT, DEFAULT_TOKEN_STRENGTH};
pub use error::{CsrfError, Result};
pub use guard::{CsrfGuard, CsrfGuardBuilder};
pub use handler::{DEFAULT_FAILURE_BODY, DefaultFailureHandler, FailureHandler, FailureHandlerFn};
pub use token::TokenPair;
