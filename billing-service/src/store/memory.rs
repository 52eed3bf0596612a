use std::collections::HashMap;

use billing_client::domain::{ConsumptionReading, GenerationReading, Occupant, TenantTariff};

use super::{ReadingStore, ReportingWindow, StoreError};

/// `ReadingStore` holding everything in memory; used by tests and by
/// offline tooling working from exported files.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReadingStore {
    occupants: HashMap<String, Occupant>,
    tariffs: HashMap<String, TenantTariff>,
    consumption: Vec<ConsumptionReading>,
    generation: Vec<GenerationReading>,
}

impl InMemoryReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_occupant(&mut self, occupant: Occupant) -> &mut Self {
        self.occupants.insert(occupant.occupant_id.clone(), occupant);
        self
    }

    pub fn add_tariff(&mut self, tariff: TenantTariff) -> &mut Self {
        self.tariffs.insert(tariff.tenant_id.clone(), tariff);
        self
    }

    pub fn add_consumption(&mut self, readings: impl IntoIterator<Item = ConsumptionReading>) -> &mut Self {
        self.consumption.extend(readings);
        self
    }

    pub fn add_generation(&mut self, readings: impl IntoIterator<Item = GenerationReading>) -> &mut Self {
        self.generation.extend(readings);
        self
    }

    fn building_of(&self, occupant_id: &str) -> Option<&str> {
        self.occupants.get(occupant_id).map(|o| o.building_id.as_str())
    }
}

#[async_trait::async_trait]
impl ReadingStore for InMemoryReadingStore {
    async fn tenant_consumption(
        &self,
        tenant_id: &str,
        window: ReportingWindow,
    ) -> Result<Vec<ConsumptionReading>, StoreError> {
        Ok(self
            .consumption
            .iter()
            .filter(|r| r.occupant_id == tenant_id && window.contains(r.ts))
            .cloned()
            .collect())
    }

    async fn building_consumption(
        &self,
        building_id: &str,
        window: ReportingWindow,
    ) -> Result<Vec<ConsumptionReading>, StoreError> {
        Ok(self
            .consumption
            .iter()
            .filter(|r| self.building_of(&r.occupant_id) == Some(building_id))
            .filter(|r| window.contains(r.ts))
            .cloned()
            .collect())
    }

    async fn building_generation(
        &self,
        building_id: &str,
        window: ReportingWindow,
    ) -> Result<Vec<GenerationReading>, StoreError> {
        Ok(self
            .generation
            .iter()
            .filter(|r| r.building_id == building_id && window.contains(r.ts))
            .cloned()
            .collect())
    }

    async fn tenant_tariff(&self, tenant_id: &str) -> Result<TenantTariff, StoreError> {
        self.tariffs
            .get(tenant_id)
            .cloned()
            .ok_or_else(|| StoreError::MissingTariff(tenant_id.to_string()))
    }

    async fn tenant(&self, tenant_id: &str) -> Result<Occupant, StoreError> {
        self.occupants
            .get(tenant_id)
            .filter(|o| o.is_tenant())
            .cloned()
            .ok_or_else(|| StoreError::UnknownTenant(tenant_id.to_string()))
    }

    async fn building_occupants(&self, building_id: &str) -> Result<Vec<Occupant>, StoreError> {
        let mut occupants: Vec<Occupant> = self
            .occupants
            .values()
            .filter(|o| o.building_id == building_id)
            .cloned()
            .collect();
        occupants.sort_by(|a, b| a.occupant_id.cmp(&b.occupant_id));
        Ok(occupants)
    }
}
