use billing_client::{
    db,
    domain::{ConsumptionReading, GenerationReading, Occupant, TenantTariff},
};
use sqlx::PgPool;

use super::{ReadingStore, ReportingWindow, StoreError};

/// `ReadingStore` backed by a Postgres pool.
///
/// Every query checks a connection out of the pool for its own duration only,
/// so nothing is held across calls or leaked on error paths.
#[derive(Clone)]
pub struct PgReadingStore {
    pool: PgPool,
}

impl PgReadingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ReadingStore for PgReadingStore {
    async fn tenant_consumption(
        &self,
        tenant_id: &str,
        window: ReportingWindow,
    ) -> Result<Vec<ConsumptionReading>, StoreError> {
        let rows = db::occupant_consumption(&self.pool, tenant_id, window.start(), window.end()).await?;
        Ok(rows)
    }

    async fn building_consumption(
        &self,
        building_id: &str,
        window: ReportingWindow,
    ) -> Result<Vec<ConsumptionReading>, StoreError> {
        let rows = db::building_consumption(&self.pool, building_id, window.start(), window.end()).await?;
        Ok(rows)
    }

    async fn building_generation(
        &self,
        building_id: &str,
        window: ReportingWindow,
    ) -> Result<Vec<GenerationReading>, StoreError> {
        let rows = db::building_generation(&self.pool, building_id, window.start(), window.end()).await?;
        Ok(rows)
    }

    async fn tenant_tariff(&self, tenant_id: &str) -> Result<TenantTariff, StoreError> {
        db::tenant_tariff(&self.pool, tenant_id)
            .await?
            .ok_or_else(|| StoreError::MissingTariff(tenant_id.to_string()))
    }

    async fn tenant(&self, tenant_id: &str) -> Result<Occupant, StoreError> {
        db::occupant(&self.pool, tenant_id)
            .await?
            .filter(Occupant::is_tenant)
            .ok_or_else(|| StoreError::UnknownTenant(tenant_id.to_string()))
    }

    async fn building_occupants(&self, building_id: &str) -> Result<Vec<Occupant>, StoreError> {
        Ok(db::building_occupants(&self.pool, building_id).await?)
    }
}
