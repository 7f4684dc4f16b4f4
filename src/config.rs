//! Engine configuration
//!
//! Constructed once at service start and passed where needed; the engine
//! keeps no ambient global configuration.

use serde::{Deserialize, Serialize};

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Permission/name cache entry lifetime in seconds (default: 60)
    #[serde(default = "default_permission_cache_ttl_secs")]
    pub permission_cache_ttl_secs: u64,

    /// Maximum depth accepted for nested upsert trees (default: 10)
    #[serde(default = "default_max_upsert_depth")]
    pub max_upsert_depth: usize,
}

fn default_permission_cache_ttl_secs() -> u64 {
    60
}

fn default_max_upsert_depth() -> usize {
    10
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            permission_cache_ttl_secs: default_permission_cache_ttl_secs(),
            max_upsert_depth: default_max_upsert_depth(),
        }
    }
}
