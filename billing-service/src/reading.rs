//! Glue between the two reading types and the import pipeline: CSV parsing,
//! table layout and row binding.

use billing_client::domain::{ConsumptionReading, GenerationReading};
use csv::StringRecord;
use serde::de::DeserializeOwned;
use sqlx::{query_builder::Separated, Postgres};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::pipeline::PipelineError;

pub trait Reading: DeserializeOwned + Clone + Send + Sync + 'static {
    /// Short label used in routes, metric labels and logs.
    const KIND: &'static str;
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    fn ts(&self) -> OffsetDateTime;

    fn kwh(&self) -> Option<f64>;

    fn from_csv_record(record: &StringRecord, headers: &StringRecord) -> Result<Self, PipelineError>;

    fn bind_row<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>);
}

fn column<'r>(
    record: &'r StringRecord,
    headers: &StringRecord,
    name: &str,
) -> Result<&'r str, PipelineError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .and_then(|idx| record.get(idx))
        .map(str::trim)
        .ok_or_else(|| PipelineError::Source(format!("missing column '{name}' in CSV record")))
}

fn parse_ts(s: &str) -> Result<OffsetDateTime, PipelineError> {
    OffsetDateTime::parse(s, &Rfc3339).map_err(|e| PipelineError::Source(format!("invalid ts '{s}': {e}")))
}

/// Blank cells are gaps in the meter export and map to `None`.
fn parse_optional_kwh(s: &str, name: &str) -> Result<Option<f64>, PipelineError> {
    if s.is_empty() {
        return Ok(None);
    }
    s.parse()
        .map(Some)
        .map_err(|e| PipelineError::Source(format!("invalid {name} '{s}': {e}")))
}

fn required(s: &str, name: &str) -> Result<String, PipelineError> {
    if s.is_empty() {
        return Err(PipelineError::Source(format!("empty '{name}' in CSV record")));
    }
    Ok(s.to_string())
}

impl Reading for ConsumptionReading {
    const KIND: &'static str = "consumption";
    const TABLE: &'static str = "consumption_readings";
    const COLUMNS: &'static [&'static str] = &["ts", "occupant_id", "building_id", "consumption_kwh"];

    fn ts(&self) -> OffsetDateTime {
        self.ts
    }

    fn kwh(&self) -> Option<f64> {
        self.consumption_kwh
    }

    fn from_csv_record(record: &StringRecord, headers: &StringRecord) -> Result<Self, PipelineError> {
        Ok(ConsumptionReading {
            ts: parse_ts(column(record, headers, "ts")?)?,
            occupant_id: required(column(record, headers, "occupant_id")?, "occupant_id")?,
            building_id: required(column(record, headers, "building_id")?, "building_id")?,
            consumption_kwh: parse_optional_kwh(column(record, headers, "consumption_kwh")?, "consumption_kwh")?,
        })
    }

    fn bind_row<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.ts)
            .push_bind(self.occupant_id.clone())
            .push_bind(self.building_id.clone())
            .push_bind(self.consumption_kwh);
    }
}

impl Reading for GenerationReading {
    const KIND: &'static str = "generation";
    const TABLE: &'static str = "generation_readings";
    const COLUMNS: &'static [&'static str] = &["ts", "device_id", "building_id", "generation_kwh"];

    fn ts(&self) -> OffsetDateTime {
        self.ts
    }

    fn kwh(&self) -> Option<f64> {
        self.generation_kwh
    }

    fn from_csv_record(record: &StringRecord, headers: &StringRecord) -> Result<Self, PipelineError> {
        Ok(GenerationReading {
            ts: parse_ts(column(record, headers, "ts")?)?,
            device_id: required(column(record, headers, "device_id")?, "device_id")?,
            building_id: required(column(record, headers, "building_id")?, "building_id")?,
            generation_kwh: parse_optional_kwh(column(record, headers, "generation_kwh")?, "generation_kwh")?,
        })
    }

    fn bind_row<'args>(&self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.ts)
            .push_bind(self.device_id.clone())
            .push_bind(self.building_id.clone())
            .push_bind(self.generation_kwh);
    }
}
