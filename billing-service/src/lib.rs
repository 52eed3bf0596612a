pub mod allocation;
pub mod billing;
pub mod config;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod reading;
pub mod sinks;
pub mod sources;
pub mod store;
pub mod transform;

pub use allocation::{allocate_tenant_energy, AllocationResult, TenantEnergyAllocator};
pub use pipeline::{Envelope, Pipeline};
