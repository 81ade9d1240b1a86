//! Token storage for Palisade.
//!
//! The CSRF guard keeps outstanding token pairs in a [`TokenStore`] owned by
//! the host application, usually one per user session. This crate defines
//! that contract and ships [`MemoryTokenStore`], an in-process implementation
//! suitable for tests and for hosts that keep session state in memory.
//!
//! # Examples
//!
//! ```
//! use palisade_store::{MemoryTokenStore, TokenStore};
//!
//! let store = MemoryTokenStore::new();
//! store.set("csrf1", "a1b2".to_string());
//! store.set("csrf2", "c3d4".to_string());
//!
//! assert_eq!(store.count(), 2);
//! assert_eq!(store.take("csrf1"), Some("a1b2".to_string()));
//! assert_eq!(store.keys(), vec!["csrf2".to_string()]);
//! ```

pub mod memory;
pub mod traits;

pub use memory::MemoryTokenStore;
pub use traits::TokenStore;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::memory::MemoryTokenStore;
    pub use crate::traits::TokenStore;
}
