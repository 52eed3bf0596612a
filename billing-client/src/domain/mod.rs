mod occupant;
mod reading;

pub use occupant::{Occupant, OccupantKind, TenantTariff, UnknownOccupantKind};
pub use reading::{ConsumptionReading, GenerationReading};
