//! Storage seam the billing layer fetches readings and tariffs through.

mod memory;
mod postgres;

use billing_client::domain::{ConsumptionReading, GenerationReading, Occupant, TenantTariff};
use serde::Serialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

pub use memory::InMemoryReadingStore;
pub use postgres::PgReadingStore;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("invalid reporting window: end {end} is not after start {start}")]
    InvalidWindow {
        start: OffsetDateTime,
        end: OffsetDateTime,
    },
    #[error("unknown tenant '{0}'")]
    UnknownTenant(String),
    #[error("no tariff configured for tenant '{0}'")]
    MissingTariff(String),
    #[error("database error: {0}")]
    Database(#[from] anyhow::Error),
}

/// Half-open reporting window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportingWindow {
    #[serde(with = "time::serde::rfc3339")]
    start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    end: OffsetDateTime,
}

impl ReportingWindow {
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> Result<Self, StoreError> {
        if end <= start {
            return Err(StoreError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse a window from two RFC3339 instants, as given on the command line.
    pub fn from_rfc3339(start: &str, end: &str) -> anyhow::Result<Self> {
        let parse = |s: &str| {
            OffsetDateTime::parse(s, &Rfc3339).map_err(|e| anyhow::anyhow!("invalid instant '{s}': {e}"))
        };
        Ok(Self::new(parse(start)?, parse(end)?)?)
    }

    pub fn start(&self) -> OffsetDateTime {
        self.start
    }

    pub fn end(&self) -> OffsetDateTime {
        self.end
    }

    pub fn contains(&self, ts: OffsetDateTime) -> bool {
        ts >= self.start && ts < self.end
    }
}

#[async_trait::async_trait]
pub trait ReadingStore: Send + Sync {
    async fn tenant_consumption(
        &self,
        tenant_id: &str,
        window: ReportingWindow,
    ) -> Result<Vec<ConsumptionReading>, StoreError>;

    /// Readings of every occupant of the building, general meter included.
    async fn building_consumption(
        &self,
        building_id: &str,
        window: ReportingWindow,
    ) -> Result<Vec<ConsumptionReading>, StoreError>;

    async fn building_generation(
        &self,
        building_id: &str,
        window: ReportingWindow,
    ) -> Result<Vec<GenerationReading>, StoreError>;

    async fn tenant_tariff(&self, tenant_id: &str) -> Result<TenantTariff, StoreError>;

    async fn tenant(&self, tenant_id: &str) -> Result<Occupant, StoreError>;

    async fn building_occupants(&self, building_id: &str) -> Result<Vec<Occupant>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn window_rejects_empty_and_inverted_ranges() {
        let t = datetime!(2024-01-01 00:00:00 UTC);
        assert!(matches!(
            ReportingWindow::new(t, t),
            Err(StoreError::InvalidWindow { .. })
        ));
        assert!(ReportingWindow::new(t, datetime!(2023-12-31 00:00:00 UTC)).is_err());
    }

    #[test]
    fn window_parses_from_rfc3339_arguments() {
        let w = ReportingWindow::from_rfc3339("2024-01-01T00:00:00+01:00", "2024-02-01T00:00:00Z").unwrap();
        assert_eq!(w.start(), datetime!(2023-12-31 23:00:00 UTC));
        assert!(ReportingWindow::from_rfc3339("2024-01-01", "2024-02-01T00:00:00Z").is_err());
        assert!(ReportingWindow::from_rfc3339("2024-02-01T00:00:00Z", "2024-01-01T00:00:00Z").is_err());
    }

    #[test]
    fn window_is_half_open() {
        let w = ReportingWindow::new(
            datetime!(2024-01-01 00:00:00 UTC),
            datetime!(2024-02-01 00:00:00 UTC),
        )
        .unwrap();
        assert!(w.contains(datetime!(2024-01-01 00:00:00 UTC)));
        assert!(w.contains(datetime!(2024-01-31 23:59:59 UTC)));
        assert!(!w.contains(datetime!(2024-02-01 00:00:00 UTC)));
    }
}
