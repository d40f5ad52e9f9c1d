//! Batch workload simulator
//!
//! Replays a generated list of process requests against any
//! [`OwnerAllocator`](crate::OwnerAllocator), tracking a status per process.
//! The simulator only talks to the allocator through `allocate` and `free`.

pub mod batch;
pub mod workload;

pub use batch::{ProcessStatus, SimEvent, Simulator, SimulatorConfig, StatusSummary};
pub use workload::{generate_workload, ProcessRequest, WorkloadConfig};
