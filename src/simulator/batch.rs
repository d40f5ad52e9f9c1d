//! Batch simulator driving an [`OwnerAllocator`] on a logical clock.
//!
//! Every `batch_interval_ms` the next `batch_size` requests are attempted.
//! Accepted processes hold their block for a random delay and are then freed.
//! Releases due at or before a batch instant run before that batch.

use alloc::collections::BinaryHeap;
use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Reverse;
use core::ops::RangeInclusive;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::buddy::BlockHandle;
use crate::{AllocError, OwnerAllocator};

use super::workload::ProcessRequest;

#[cfg(feature = "log")]
use log::{debug, info, warn};

/// Lifecycle of a simulated process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProcessStatus {
    /// Not attempted yet
    Pending,
    /// Holding a block
    Active,
    /// The allocator refused the request
    Rejected,
    /// Ran and gave its block back
    Released,
}

/// Timing parameters of the simulator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatorConfig {
    pub batch_size: usize,
    pub batch_interval_ms: u64,
    /// How long an accepted process keeps its block
    pub release_delay_ms: RangeInclusive<u64>,
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_interval_ms: 2500,
            release_delay_ms: 2000..=3000,
            seed: 0,
        }
    }
}

/// Something that happened during a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    Allocated {
        name: String,
        block: BlockHandle,
        at_ms: u64,
    },
    Rejected {
        name: String,
        error: AllocError,
        at_ms: u64,
    },
    Released {
        name: String,
        block: BlockHandle,
        at_ms: u64,
    },
}

/// Count of processes in each status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusSummary {
    pub total: usize,
    pub pending: usize,
    pub active: usize,
    pub rejected: usize,
    pub released: usize,
}

pub struct Simulator<A: OwnerAllocator> {
    allocator: A,
    config: SimulatorConfig,
    requests: Vec<ProcessRequest>,
    statuses: Vec<ProcessStatus>,
    next_request: usize,
    next_batch_ms: u64,
    now_ms: u64,
    /// Min-heap of (release time, request index)
    releases: BinaryHeap<Reverse<(u64, usize)>>,
    rng: SmallRng,
}

impl<A: OwnerAllocator> Simulator<A> {
    pub fn new(allocator: A, requests: Vec<ProcessRequest>, config: SimulatorConfig) -> Self {
        let rng = SmallRng::seed_from_u64(config.seed);
        Self {
            allocator,
            statuses: alloc::vec![ProcessStatus::Pending; requests.len()],
            requests,
            config,
            next_request: 0,
            next_batch_ms: 0,
            now_ms: 0,
            releases: BinaryHeap::new(),
            rng,
        }
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    pub fn into_allocator(self) -> A {
        self.allocator
    }

    pub fn requests(&self) -> &[ProcessRequest] {
        &self.requests
    }

    /// Current logical time
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn is_finished(&self) -> bool {
        self.next_request >= self.requests.len() && self.releases.is_empty()
    }

    /// Status of the first process named `name`
    pub fn status(&self, name: &str) -> Option<ProcessStatus> {
        self.requests
            .iter()
            .position(|request| request.name == name)
            .map(|idx| self.statuses[idx])
    }

    pub fn summary(&self) -> StatusSummary {
        let mut summary = StatusSummary {
            total: self.statuses.len(),
            ..StatusSummary::default()
        };
        for status in &self.statuses {
            match status {
                ProcessStatus::Pending => summary.pending += 1,
                ProcessStatus::Active => summary.active += 1,
                ProcessStatus::Rejected => summary.rejected += 1,
                ProcessStatus::Released => summary.released += 1,
            }
        }
        summary
    }

    /// Advance to the next scheduled instant and process it.
    ///
    /// Returns `None` once every request has been attempted and every
    /// accepted process has been released.
    pub fn step(&mut self) -> Option<Vec<SimEvent>> {
        let next_batch =
            (self.next_request < self.requests.len()).then_some(self.next_batch_ms);
        let next_release = self.releases.peek().map(|Reverse((at, _))| *at);

        let now = match (next_batch, next_release) {
            (Some(batch), Some(release)) => batch.min(release),
            (Some(at), None) | (None, Some(at)) => at,
            (None, None) => return None,
        };
        self.now_ms = now;

        let mut events = Vec::new();
        self.run_releases(now, &mut events);
        if next_batch == Some(now) {
            self.run_batch(now, &mut events);
        }

        if self.is_finished() {
            let _summary = self.summary();
            info!(
                "simulator: finished at {} ms: {} released, {} rejected",
                now, _summary.released, _summary.rejected
            );
        }
        Some(events)
    }

    /// Run until nothing is left to do
    pub fn run(&mut self) -> StatusSummary {
        while self.step().is_some() {}
        self.summary()
    }

    fn run_releases(&mut self, now: u64, events: &mut Vec<SimEvent>) {
        while let Some(&Reverse((at, idx))) = self.releases.peek() {
            if at > now {
                break;
            }
            self.releases.pop();

            let name = &self.requests[idx].name;
            match self.allocator.free(name) {
                Ok(block) => {
                    info!("simulator: [-] released {} at {} ms", name, at);
                    self.statuses[idx] = ProcessStatus::Released;
                    events.push(SimEvent::Released {
                        name: name.clone(),
                        block,
                        at_ms: at,
                    });
                }
                Err(_err) => {
                    warn!("simulator: failed to release {}: {}", name, _err);
                }
            }
        }
    }

    fn run_batch(&mut self, now: u64, events: &mut Vec<SimEvent>) {
        let end = (self.next_request + self.config.batch_size.max(1)).min(self.requests.len());

        for idx in self.next_request..end {
            let request = &self.requests[idx];
            let result = request
                .bytes()
                .ok_or(AllocError::InsufficientTotalMemory)
                .and_then(|bytes| self.allocator.allocate(bytes, &request.name));

            match result {
                Ok(block) => {
                    info!(
                        "simulator: [+] allocated {} ({} {}) at {} ms",
                        request.name, request.size, request.unit, now
                    );
                    let delays = &self.config.release_delay_ms;
                    let delay = if delays.is_empty() {
                        *delays.start()
                    } else {
                        self.rng.gen_range(delays.clone())
                    };
                    self.releases.push(Reverse((now.saturating_add(delay), idx)));
                    self.statuses[idx] = ProcessStatus::Active;
                    events.push(SimEvent::Allocated {
                        name: request.name.clone(),
                        block,
                        at_ms: now,
                    });
                }
                Err(error) => {
                    debug!(
                        "simulator: [!] could not allocate {} ({} {}): {}",
                        request.name, request.size, request.unit, error
                    );
                    self.statuses[idx] = ProcessStatus::Rejected;
                    events.push(SimEvent::Rejected {
                        name: request.name.clone(),
                        error,
                        at_ms: now,
                    });
                }
            }
        }

        self.next_request = end;
        self.next_batch_ms = now.saturating_add(self.config.batch_interval_ms);
    }
}
