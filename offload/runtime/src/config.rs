//! Pool configuration.

use serde::{Deserialize, Serialize};

/// Number of units a pool runs at once.
///
/// Never below [`Capacity::MIN`], whatever was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Capacity(usize);

impl Capacity {
    /// The floor applied to every requested thread count.
    pub const MIN: usize = 2;

    /// Validate a requested thread count. Zero, one and negative requests
    /// all yield the floor.
    pub fn new(requested: i64) -> Self {
        let floor = Self::MIN as i64;
        Self(usize::try_from(requested.max(floor)).unwrap_or(usize::MAX))
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for Capacity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for an offload pool.
///
/// Deserializes with per-field defaults, so an embedding application can
/// carry it in its own config file:
///
/// ```rust
/// use offload_runtime::PoolConfig;
///
/// let config: PoolConfig = serde_json::from_str(r#"{ "threads": 8 }"#).unwrap();
/// assert_eq!(config.capacity().get(), 8);
/// assert_eq!(config.thread_name, "offload-unit");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Requested number of concurrent units. Floored to [`Capacity::MIN`].
    pub threads: i64,

    /// Prefix for unit thread names.
    pub thread_name: String,

    /// Stack size for unit threads, in bytes. Platform default if unset.
    pub stack_size: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get() as i64)
            .unwrap_or(Capacity::MIN as i64);

        Self {
            threads,
            thread_name: "offload-unit".to_string(),
            stack_size: None,
        }
    }
}

impl PoolConfig {
    pub fn threads(mut self, threads: i64) -> Self {
        self.threads = threads;
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// The validated capacity for this configuration.
    pub fn capacity(&self) -> Capacity {
        Capacity::new(self.threads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_floor() {
        assert_eq!(Capacity::new(0).get(), 2);
        assert_eq!(Capacity::new(1).get(), 2);
        assert_eq!(Capacity::new(-7).get(), 2);
        assert_eq!(Capacity::new(i64::MIN).get(), 2);
        assert_eq!(Capacity::new(2).get(), 2);
        assert_eq!(Capacity::new(16).get(), 16);
    }

    #[test]
    fn default_config() {
        let config = PoolConfig::default();
        assert!(config.capacity().get() >= Capacity::MIN);
        assert_eq!(config.thread_name, "offload-unit");
        assert_eq!(config.stack_size, None);
    }

    #[test]
    fn builder() {
        let config = PoolConfig::default().threads(0).thread_name("x");
        assert_eq!(config.capacity().get(), 2);
        assert_eq!(config.thread_name, "x");
    }

    #[test]
    fn deserialize_with_defaults() {
        let config: PoolConfig =
            serde_json::from_str(r#"{ "threads": -1, "stack_size": 65536 }"#).unwrap();
        assert_eq!(config.capacity().get(), 2);
        assert_eq!(config.stack_size, Some(65536));
        assert_eq!(config.thread_name, "offload-unit");
    }
}
