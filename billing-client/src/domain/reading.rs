use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One meter sample for one occupant of a building.
///
/// `consumption_kwh` is nullable in storage; gaps in meter exports come
/// through as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConsumptionReading {
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
    pub occupant_id: String,
    pub building_id: String,
    pub consumption_kwh: Option<f64>,
}

impl ConsumptionReading {
    pub fn new(
        ts: OffsetDateTime,
        occupant_id: impl Into<String>,
        building_id: impl Into<String>,
        consumption_kwh: f64,
    ) -> Self {
        Self {
            ts,
            occupant_id: occupant_id.into(),
            building_id: building_id.into(),
            consumption_kwh: Some(consumption_kwh),
        }
    }
}

/// One PV output sample from one generating device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GenerationReading {
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
    pub device_id: String,
    pub building_id: String,
    pub generation_kwh: Option<f64>,
}

impl GenerationReading {
    pub fn new(
        ts: OffsetDateTime,
        device_id: impl Into<String>,
        building_id: impl Into<String>,
        generation_kwh: f64,
    ) -> Self {
        Self {
            ts,
            device_id: device_id.into(),
            building_id: building_id.into(),
            generation_kwh: Some(generation_kwh),
        }
    }
}
