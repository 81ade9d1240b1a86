use palisade_log::warn;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// One issued, single-use CSRF credential
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Store key: the prefix followed by a random decimal suffix
    pub name: String,

    /// Hex-encoded random secret
    pub value: String,
}

impl TokenPair {
    /// Issue a fresh, unstored pair
    pub fn generate(prefix: &str, strength: usize) -> Self {
        Self {
            name: generate_name(prefix),
            value: generate_value(strength),
        }
    }

    /// Compare `value` against this pair's secret in constant time
    pub fn matches(&self, value: &str) -> bool {
        constant_time_eq(&self.value, value)
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Token name: `prefix` plus a decimal suffix uniform over `u64`
pub fn generate_name(prefix: &str) -> String {
    let suffix: u64 = rand::thread_rng().r#gen();
    format!("{}{}", prefix, suffix)
}

/// Token value: `strength` random bytes, hex encoded
pub fn generate_value(strength: usize) -> String {
    hex::encode(random_bytes(strength))
}

/// Fill `len` bytes from the OS generator.
///
/// If the OS source reports an error the thread-local generator is used
/// instead. It is itself a CSPRNG seeded from the OS, so token quality is
/// kept and issuance never fails.
fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    if let Err(e) = OsRng.try_fill_bytes(&mut bytes) {
        warn!("OS random source unavailable ({}), using thread-local generator", e);
        rand::thread_rng().fill_bytes(&mut bytes);
    }
    bytes
}

/// Constant-time string comparison (prevent timing attacks)
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_value_length_is_twice_strength() {
        assert_eq!(generate_value(16).len(), 32);
        assert_eq!(generate_value(1).len(), 2);
        assert_eq!(generate_value(64).len(), 128);
    }

    #[test]
    fn test_value_is_lowercase_hex() {
        let value = generate_value(16);
        assert!(value.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_name_has_prefix_and_numeric_suffix() {
        let name = generate_name("csrf");
        let suffix = name.strip_prefix("csrf").unwrap();
        assert!(!suffix.is_empty());
        assert!(suffix.parse::<u64>().is_ok());
    }

    #[test]
    fn test_generated_pairs_are_distinct() {
        let pairs: Vec<TokenPair> = (0..500).map(|_| TokenPair::generate("csrf", 16)).collect();

        let names: HashSet<_> = pairs.iter().map(|p| p.name.clone()).collect();
        let values: HashSet<_> = pairs.iter().map(|p| p.value.clone()).collect();
        assert_eq!(names.len(), 500);
        assert_eq!(values.len(), 500);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
        assert!(!constant_time_eq("", "a"));
    }

    #[test]
    fn test_matches() {
        let pair = TokenPair::generate("csrf", 16);
        let value = pair.value.clone();
        assert!(pair.matches(&value));
        assert!(!pair.matches("nope"));
    }

    #[test]
    fn test_debug_redacts_value() {
        let pair = TokenPair::generate("csrf", 16);
        let debug = format!("{:?}", pair);
        assert!(debug.contains(&pair.name));
        assert!(!debug.contains(&pair.value));
    }
}
