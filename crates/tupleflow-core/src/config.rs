//! Engine configuration shared by the driver and scan operators.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fixed chunk size (in bytes) for buffered block-reader fills.
    pub read_chunk_bytes: usize,

    /// Number of scan partitions / worker threads the driver launches.
    pub max_parallel_workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            read_chunk_bytes: 64 * 1024,
            max_parallel_workers: 4,
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `TUPLEFLOW_READ_CHUNK_BYTES`: block-reader chunk size in bytes
    /// - `TUPLEFLOW_MAX_PARALLEL_WORKERS`: worker parallelism
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("TUPLEFLOW_READ_CHUNK_BYTES") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.read_chunk_bytes = v.max(1);
            }
        }

        if let Ok(s) = std::env::var("TUPLEFLOW_MAX_PARALLEL_WORKERS") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.max_parallel_workers = v.max(1);
            }
        }

        cfg
    }
}
