//! Seeded random workload generation.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::ops::RangeInclusive;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::units::{to_bytes, SizeUnit};

/// One process asking for memory
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessRequest {
    pub name: String,
    pub size: usize,
    pub unit: SizeUnit,
}

impl ProcessRequest {
    pub fn new(name: impl Into<String>, size: usize, unit: SizeUnit) -> Self {
        Self {
            name: name.into(),
            size,
            unit,
        }
    }

    /// Requested size in bytes; `None` on overflow
    pub fn bytes(&self) -> Option<usize> {
        to_bytes(self.size, self.unit)
    }
}

/// Shape of a generated workload
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadConfig {
    pub process_count: usize,
    /// Probability that a process draws from `large_sizes`
    pub large_ratio: f64,
    pub small_sizes: RangeInclusive<usize>,
    pub large_sizes: RangeInclusive<usize>,
    pub unit: SizeUnit,
    pub seed: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            process_count: 200,
            large_ratio: 0.3,
            small_sizes: 1..=1024,
            large_sizes: 1025..=2048,
            unit: SizeUnit::Kilobytes,
            seed: 0,
        }
    }
}

fn pick(rng: &mut SmallRng, range: &RangeInclusive<usize>) -> usize {
    if range.is_empty() {
        *range.start()
    } else {
        rng.gen_range(range.clone())
    }
}

/// Generate `process_count` requests named `P1..Pn`
pub fn generate_workload(config: &WorkloadConfig) -> Vec<ProcessRequest> {
    let mut rng = SmallRng::seed_from_u64(config.seed);
    let large_ratio = if config.large_ratio.is_nan() {
        0.0
    } else {
        config.large_ratio.clamp(0.0, 1.0)
    };

    (1..=config.process_count)
        .map(|i| {
            let size = if rng.gen_bool(large_ratio) {
                pick(&mut rng, &config.large_sizes)
            } else {
                pick(&mut rng, &config.small_sizes)
            };
            ProcessRequest::new(format!("P{}", i), size, config.unit)
        })
        .collect()
}
