use crate::config::CsrfConfig;
use crate::error::{CsrfError, Result};
use crate::handler::{DefaultFailureHandler, FailureHandler};
use crate::token::{TokenPair, constant_time_eq, generate_name};
use async_trait::async_trait;
use palisade_core::{Error as CoreError, HttpMethod, HttpRequest, HttpResponse, Middleware, Next};
use palisade_log::{debug, trace, warn};
use palisade_store::TokenStore;
use std::fmt;
use std::sync::Arc;

/// Synchronizer-token CSRF guard.
///
/// On POST, PUT, DELETE and PATCH the guard takes the submitted
/// `{prefix}_name` / `{prefix}_value` body fields and checks them against the
/// store, consuming the stored entry whatever the outcome. Every request, valid
/// or not, leaves with a new pair in its `{prefix}_name` / `{prefix}_value`
/// attributes. Invalid requests go to the [`FailureHandler`]; everything else
/// continues down the chain.
#[derive(Clone)]
pub struct CsrfGuard {
    config: Arc<CsrfConfig>,
    name_key: String,
    value_key: String,
    store: Arc<dyn TokenStore>,
    failure_handler: Arc<dyn FailureHandler>,
}

impl CsrfGuard {
    /// Create a guard over an explicit store
    pub fn new(config: CsrfConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        let config = config.normalized();
        config.validate()?;

        Ok(Self {
            name_key: config.name_key(),
            value_key: config.value_key(),
            config: Arc::new(config),
            store,
            failure_handler: Arc::new(DefaultFailureHandler),
        })
    }

    /// Start building a guard
    pub fn builder() -> CsrfGuardBuilder {
        CsrfGuardBuilder::default()
    }

    /// Get the normalized configuration
    pub fn config(&self) -> &CsrfConfig {
        &self.config
    }

    /// Get the token prefix, without trailing underscores
    pub fn prefix(&self) -> &str {
        &self.config.prefix
    }

    /// Get the maximum number of outstanding pairs
    pub fn storage_limit(&self) -> usize {
        self.config.storage_limit
    }

    /// Get the number of random bytes per token value
    pub fn token_strength(&self) -> usize {
        self.config.token_strength
    }

    /// Get the backing token store
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Attribute (and body field) key holding the token name
    pub fn token_name_key(&self) -> &str {
        &self.name_key
    }

    /// Attribute (and body field) key holding the token value
    pub fn token_value_key(&self) -> &str {
        &self.value_key
    }

    /// Get the current failure handler
    pub fn failure_handler(&self) -> Arc<dyn FailureHandler> {
        self.failure_handler.clone()
    }

    /// Replace the failure handler
    pub fn set_failure_handler<H: FailureHandler + 'static>(&mut self, handler: H) {
        self.failure_handler = Arc::new(handler);
    }

    /// Whether `method` is state-changing and must carry a valid pair.
    ///
    /// Exactly POST, PUT, DELETE and PATCH; unknown methods pass.
    pub fn requires_validation(method: &str) -> bool {
        matches!(
            HttpMethod::from_str(method),
            Some(HttpMethod::POST | HttpMethod::PUT | HttpMethod::DELETE | HttpMethod::PATCH)
        )
    }

    /// The submitted `(name, value)`, if the body carries both fields
    pub fn submitted_token(&self, req: &HttpRequest) -> Option<(String, String)> {
        let mut fields = match req.parsed_body() {
            Ok(fields) => fields,
            Err(e) => {
                debug!("Unreadable body on {} {}: {}", req.method, req.path, e);
                return None;
            }
        };

        let name = fields.remove(&self.name_key)?;
        let value = fields.remove(&self.value_key)?;
        Some((name, value))
    }

    /// Check `value` against the entry stored under `name`.
    ///
    /// The entry is removed whether or not it matches, so a pair can never be
    /// presented twice.
    pub fn validate_token(&self, name: &str, value: &str) -> bool {
        match self.store.take(name) {
            Some(stored) => constant_time_eq(&stored, value),
            None => false,
        }
    }

    /// Issue a pair, store it and bound the store.
    pub fn generate_token(&self) -> TokenPair {
        let mut pair = TokenPair::generate(&self.config.prefix, self.config.token_strength);
        while !self.store.set_if_absent(&pair.name, pair.value.clone()) {
            pair.name = generate_name(&self.config.prefix);
        }

        self.enforce_storage_limit();
        pair
    }

    /// Issue a pair and attach it to `req` under the name/value keys
    pub fn generate_new_token(&self, req: HttpRequest) -> HttpRequest {
        let pair = self.generate_token();
        req.with_attribute(self.name_key.as_str(), pair.name)
            .with_attribute(self.value_key.as_str(), pair.value)
    }

    /// Drop the oldest entries until the store fits the limit.
    ///
    /// Returns the number of entries evicted.
    pub fn enforce_storage_limit(&self) -> usize {
        let mut evicted = 0;
        while self.store.count() > self.config.storage_limit {
            if self.store.evict_oldest().is_none() {
                break;
            }
            evicted += 1;
        }

        if evicted > 0 {
            trace!(
                "Evicted {} token(s) to stay within storage limit {}",
                evicted,
                self.config.storage_limit
            );
        }
        evicted
    }

    /// Run the guard for one request
    pub async fn process(
        &self,
        req: HttpRequest,
        next: Next,
    ) -> std::result::Result<HttpResponse, CoreError> {
        if !Self::requires_validation(&req.method) {
            trace!("{} {} skips CSRF validation", req.method, req.path);
            return next(self.generate_new_token(req)).await;
        }

        let valid = match self.submitted_token(&req) {
            Some((name, value)) => self.validate_token(&name, &value),
            None => {
                debug!(
                    "{} {} is missing '{}' or '{}'",
                    req.method, req.path, self.name_key, self.value_key
                );
                false
            }
        };

        let req = self.generate_new_token(req);

        if valid {
            next(req).await
        } else {
            warn!("CSRF validation failed for {} {}", req.method, req.path);
            self.failure_handler.on_failure(req, next).await
        }
    }
}

impl fmt::Debug for CsrfGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfGuard")
            .field("config", &self.config)
            .field("stored_tokens", &self.store.count())
            .finish()
    }
}

#[async_trait]
impl Middleware for CsrfGuard {
    async fn handle(
        &self,
        req: HttpRequest,
        next: Next,
    ) -> std::result::Result<HttpResponse, CoreError> {
        self.process(req, next).await
    }
}

/// Builder for [`CsrfGuard`]
///
/// A store is mandatory: the guard never falls back to ambient state.
///
/// ```
/// use palisade_csrf::CsrfGuard;
/// use palisade_store::MemoryTokenStore;
/// use std::sync::Arc;
///
/// assert!(CsrfGuard::builder().build().is_err());
///
/// let guard = CsrfGuard::builder()
///     .prefix("login_")
///     .storage(Arc::new(MemoryTokenStore::new()))
///     .build()
///     .unwrap();
/// assert_eq!(guard.token_name_key(), "login_name");
/// ```
#[derive(Default)]
pub struct CsrfGuardBuilder {
    config: CsrfConfig,
    store: Option<Arc<dyn TokenStore>>,
    failure_handler: Option<Arc<dyn FailureHandler>>,
}

impl CsrfGuardBuilder {
    /// Replace the whole configuration
    pub fn config(mut self, config: CsrfConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the token prefix
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config = self.config.with_prefix(prefix);
        self
    }

    /// Set the maximum number of outstanding pairs
    pub fn storage_limit(mut self, limit: usize) -> Self {
        self.config = self.config.with_storage_limit(limit);
        self
    }

    /// Set the number of random bytes per token value
    pub fn token_strength(mut self, bytes: usize) -> Self {
        self.config = self.config.with_token_strength(bytes);
        self
    }

    /// Set the token store (required)
    pub fn storage(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set a custom failure handler
    pub fn failure_handler<H: FailureHandler + 'static>(mut self, handler: H) -> Self {
        self.failure_handler = Some(Arc::new(handler));
        self
    }

    /// Build the guard, validating the configuration
    pub fn build(self) -> Result<CsrfGuard> {
        let store = self.store.ok_or_else(|| {
            CsrfError::Configuration(
                "no token store supplied; pass one with `storage`".to_string(),
            )
        })?;

        let mut guard = CsrfGuard::new(self.config, store)?;
        if let Some(handler) = self.failure_handler {
            guard.failure_handler = handler;
        }
        Ok(guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palisade_core::{handler_fn, next_fn};
    use palisade_store::MemoryTokenStore;

    fn guard_with_limit(limit: usize) -> (CsrfGuard, Arc<MemoryTokenStore>) {
        let store = Arc::new(MemoryTokenStore::new());
        let guard = CsrfGuard::new(CsrfConfig::new().with_storage_limit(limit), store.clone())
            .unwrap();
        (guard, store)
    }

    fn ok_next() -> Next {
        next_fn(handler_fn(|_req: HttpRequest| async move { Ok(HttpResponse::ok()) }))
    }

    #[test]
    fn test_requires_validation() {
        for method in ["POST", "PUT", "DELETE", "PATCH", "post", "Patch"] {
            assert!(CsrfGuard::requires_validation(method), "{}", method);
        }
        for method in ["GET", "HEAD", "OPTIONS", "PROPFIND", ""] {
            assert!(!CsrfGuard::requires_validation(method), "{}", method);
        }
    }

    #[test]
    fn test_keys_follow_prefix() {
        let store: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
        let guard = CsrfGuard::new(CsrfConfig::new().with_prefix("app__"), store).unwrap();
        assert_eq!(guard.prefix(), "app");
        assert_eq!(guard.token_name_key(), "app_name");
        assert_eq!(guard.token_value_key(), "app_value");
    }

    #[test]
    fn test_deserialized_prefix_is_normalized() {
        let config: CsrfConfig = serde_json::from_str(r#"{"prefix":"app_"}"#).unwrap();
        let store = Arc::new(MemoryTokenStore::new());
        let guard = CsrfGuard::new(config, store).unwrap();
        assert_eq!(guard.token_name_key(), "app_name");
    }

    #[test]
    fn test_generate_token_stores_pair() {
        let (guard, store) = guard_with_limit(200);
        let pair = guard.generate_token();

        assert!(pair.name.starts_with("csrf"));
        assert_eq!(pair.value.len(), 32);
        assert_eq!(store.get(&pair.name), Some(pair.value));
    }

    /// Rejects the first `collisions` inserts as if the name were taken
    struct CollidingStore {
        inner: MemoryTokenStore,
        collisions: std::sync::atomic::AtomicUsize,
    }

    impl TokenStore for CollidingStore {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: String) {
            self.inner.set(key, value)
        }

        fn delete(&self, key: &str) -> Option<String> {
            self.inner.delete(key)
        }

        fn count(&self) -> usize {
            self.inner.count()
        }

        fn keys(&self) -> Vec<String> {
            self.inner.keys()
        }

        fn evict_oldest(&self) -> Option<(String, String)> {
            self.inner.evict_oldest()
        }

        fn set_if_absent(&self, key: &str, value: String) -> bool {
            use std::sync::atomic::Ordering;
            let remaining = self.collisions.load(Ordering::SeqCst);
            if remaining > 0 {
                self.collisions.store(remaining - 1, Ordering::SeqCst);
                return false;
            }
            self.inner.set_if_absent(key, value)
        }
    }

    #[test]
    fn test_generate_token_redraws_taken_names() {
        let store = Arc::new(CollidingStore {
            inner: MemoryTokenStore::new(),
            collisions: std::sync::atomic::AtomicUsize::new(3),
        });
        let guard = CsrfGuard::new(CsrfConfig::default(), store.clone()).unwrap();

        let pair = guard.generate_token();
        assert_eq!(store.count(), 1);
        assert_eq!(store.get(&pair.name), Some(pair.value));
    }

    #[test]
    fn test_generate_token_never_overwrites() {
        let (guard, store) = guard_with_limit(200);
        let existing = guard.generate_token();
        let fresh = guard.generate_token();

        assert_ne!(existing.name, fresh.name);
        assert_eq!(store.get(&existing.name), Some(existing.value));
    }

    #[test]
    fn test_validate_consumes_entry() {
        let (guard, store) = guard_with_limit(200);
        let pair = guard.generate_token();

        assert!(guard.validate_token(&pair.name, &pair.value));
        assert!(!store.contains(&pair.name));
        assert!(!guard.validate_token(&pair.name, &pair.value));
    }

    #[test]
    fn test_wrong_value_still_consumes_entry() {
        let (guard, store) = guard_with_limit(200);
        let pair = guard.generate_token();

        assert!(!guard.validate_token(&pair.name, "forged"));
        assert!(!store.contains(&pair.name));
        assert!(!guard.validate_token(&pair.name, &pair.value));
    }

    #[test]
    fn test_unknown_name_fails() {
        let (guard, _) = guard_with_limit(200);
        assert!(!guard.validate_token("bogus", "x"));
    }

    #[test]
    fn test_storage_limit_evicts_oldest() {
        let (guard, store) = guard_with_limit(3);
        let pairs: Vec<TokenPair> = (0..4).map(|_| guard.generate_token()).collect();

        assert_eq!(store.count(), 3);
        assert!(!store.contains(&pairs[0].name));
        let expected: Vec<String> = pairs[1..].iter().map(|p| p.name.clone()).collect();
        assert_eq!(store.keys(), expected);
    }

    #[test]
    fn test_enforce_storage_limit_on_prefilled_store() {
        let (guard, store) = guard_with_limit(2);
        for i in 0..5 {
            store.set(&format!("old{}", i), "v".to_string());
        }

        assert_eq!(guard.enforce_storage_limit(), 3);
        assert_eq!(store.keys(), vec!["old3", "old4"]);
        assert_eq!(guard.enforce_storage_limit(), 0);
    }

    #[test]
    fn test_submitted_token_needs_both_fields() {
        let (guard, _) = guard_with_limit(200);

        let both = HttpRequest::new("POST", "/")
            .with_form(&[("csrf_name", "n"), ("csrf_value", "v")])
            .unwrap();
        assert_eq!(
            guard.submitted_token(&both),
            Some(("n".to_string(), "v".to_string()))
        );

        let name_only = HttpRequest::new("POST", "/")
            .with_form(&[("csrf_name", "n")])
            .unwrap();
        assert_eq!(guard.submitted_token(&name_only), None);

        let garbage = HttpRequest::new("POST", "/")
            .with_header("Content-Type", "application/json")
            .with_body(b"not json".to_vec());
        assert_eq!(guard.submitted_token(&garbage), None);
    }

    #[test]
    fn test_builder_requires_store() {
        let err = CsrfGuard::builder().build().unwrap_err();
        assert!(matches!(err, CsrfError::Configuration(_)));
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result = CsrfGuard::builder()
            .token_strength(0)
            .storage(Arc::new(MemoryTokenStore::new()))
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_failure_handler_setter() {
        let (mut guard, _) = guard_with_limit(200);
        guard.set_failure_handler(crate::FailureHandlerFn::new(|_req| {
            HttpResponse::forbidden()
        }));

        let res = guard
            .failure_handler()
            .on_failure(HttpRequest::new("POST", "/"), ok_next())
            .await
            .unwrap();
        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn test_get_passes_and_refreshes() {
        let (guard, store) = guard_with_limit(200);
        let res = guard
            .process(HttpRequest::new("GET", "/form"), ok_next())
            .await
            .unwrap();

        assert_eq!(res.status, 200);
        assert_eq!(store.count(), 1);
    }
}
