mod occupant_queries;
mod reading_queries;

pub use occupant_queries::{building_occupants, occupant, tenant_tariff};
pub use reading_queries::{building_consumption, building_generation, occupant_consumption};
