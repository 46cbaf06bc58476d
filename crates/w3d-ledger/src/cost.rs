//! Per-chunk payment schedule
//!
//! Small writes are covered by the base transaction fee. Past `free_bytes` the
//! contract charges one price unit per `bytes_per_unit` of stored data,
//! counting a fixed per-slot overhead:
//!
//! ```text
//! cost(len) = 0                                                if len <= free_bytes
//! cost(len) = floor((len + overhead) / bytes_per_unit) * price  otherwise
//! ```

use w3d_core::config::CostConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostSchedule {
    pub free_bytes: usize,
    pub overhead_bytes: usize,
    pub bytes_per_unit: usize,
    pub unit_price_wei: u128,
}

impl Default for CostSchedule {
    fn default() -> Self {
        Self::from(&CostConfig::default())
    }
}

impl From<&CostConfig> for CostSchedule {
    fn from(cfg: &CostConfig) -> Self {
        Self {
            free_bytes: cfg.free_bytes,
            overhead_bytes: cfg.overhead_bytes,
            bytes_per_unit: cfg.bytes_per_unit.max(1),
            unit_price_wei: u128::from(cfg.unit_price_wei),
        }
    }
}

impl CostSchedule {
    /// A schedule where every write is free.
    pub fn free() -> Self {
        Self {
            unit_price_wei: 0,
            ..Self::default()
        }
    }

    /// Payment required to store a chunk of `len` bytes.
    pub fn chunk_cost(&self, len: usize) -> u128 {
        if len <= self.free_bytes {
            return 0;
        }
        let units = (len + self.overhead_bytes) / self.bytes_per_unit;
        units as u128 * self.unit_price_wei
    }
}
