use billing_client::domain::{ConsumptionReading, Occupant, TenantTariff};
use time::OffsetDateTime;

use super::{BuildingProfit, CostBreakdown, Invoice};
use crate::{
    allocation::{exported_pv, AllocationPolicy, AllocationResult, ProportionalShare, TenantEnergyAllocator},
    config::BillingConfig,
    store::{ReadingStore, ReportingWindow, StoreError},
};

/// Fetches readings for a tenant or building and runs them through the
/// allocator, once per tenant per window.
pub struct BillingService<S, P = ProportionalShare> {
    store: S,
    allocator: TenantEnergyAllocator<P>,
    config: BillingConfig,
}

impl<S, P> BillingService<S, P>
where
    S: ReadingStore,
    P: AllocationPolicy,
{
    pub fn new(store: S, allocator: TenantEnergyAllocator<P>, config: BillingConfig) -> Self {
        Self {
            store,
            allocator,
            config,
        }
    }

    pub async fn tenant_allocation(
        &self,
        tenant_id: &str,
        window: ReportingWindow,
    ) -> Result<AllocationResult, StoreError> {
        let tenant = self.store.tenant(tenant_id).await?;
        self.allocate_for(&tenant, window).await
    }

    /// Tenant readings, the whole building's readings and its PV for one
    /// window, run through the allocator once.
    async fn allocate_for(
        &self,
        tenant: &Occupant,
        window: ReportingWindow,
    ) -> Result<AllocationResult, StoreError> {
        let own = self.store.tenant_consumption(&tenant.occupant_id, window).await?;
        let building = self.store.building_consumption(&tenant.building_id, window).await?;
        let pv = self.store.building_generation(&tenant.building_id, window).await?;

        let allocation = self.allocator.allocate(&own, &building, &pv);
        metrics::counter!("billing_allocations_total").increment(1);
        tracing::debug!(
            tenant_id = %tenant.occupant_id,
            building_id = %tenant.building_id,
            tenant_readings = own.len(),
            building_readings = building.len(),
            pv_readings = pv.len(),
            pv_kwh = allocation.pv_kwh,
            grid_kwh = allocation.grid_kwh,
            "tenant energy allocated"
        );
        Ok(allocation)
    }

    /// Tenant check first, so a non-tenant meter reports `UnknownTenant`
    /// rather than `MissingTariff`.
    async fn billed_tenant(
        &self,
        tenant_id: &str,
        window: ReportingWindow,
    ) -> Result<(Occupant, TenantTariff, CostBreakdown), StoreError> {
        let tenant = self.store.tenant(tenant_id).await?;
        let tariff = self.store.tenant_tariff(tenant_id).await?;
        let allocation = self.allocate_for(&tenant, window).await?;
        let costs = CostBreakdown::from_allocation(&allocation, &tariff);
        Ok((tenant, tariff, costs))
    }

    pub async fn tenant_costs(
        &self,
        tenant_id: &str,
        window: ReportingWindow,
    ) -> Result<CostBreakdown, StoreError> {
        let (_, _, costs) = self.billed_tenant(tenant_id, window).await?;
        metrics::counter!("billing_tenant_costs_total").increment(1);
        Ok(costs)
    }

    pub async fn tenant_invoice(
        &self,
        tenant_id: &str,
        window: ReportingWindow,
        issued_at: OffsetDateTime,
    ) -> Result<Invoice, StoreError> {
        let (tenant, tariff, costs) = self.billed_tenant(tenant_id, window).await?;

        let invoice = Invoice::new(
            tenant_id,
            &tenant.building_id,
            &window,
            issued_at,
            &self.config.currency,
            &costs,
            &tariff,
        );

        metrics::counter!("billing_invoices_generated_total").increment(1);
        tracing::info!(
            invoice_id = %invoice.invoice_id,
            tenant_id,
            pv_kwh = costs.pv_kwh,
            grid_kwh = costs.grid_kwh,
            total_cost = costs.total_cost,
            "invoice generated"
        );
        Ok(invoice)
    }

    /// Landlord revenue: PV sold to every tenant plus feed-in for the surplus.
    pub async fn building_profit(
        &self,
        building_id: &str,
        window: ReportingWindow,
    ) -> Result<BuildingProfit, StoreError> {
        let occupants = self.store.building_occupants(building_id).await?;
        let building = self.store.building_consumption(building_id, window).await?;
        let pv = self.store.building_generation(building_id, window).await?;

        let mut costs = Vec::new();
        for tenant in occupants.iter().filter(|o| o.is_tenant()) {
            let tariff = self.store.tenant_tariff(&tenant.occupant_id).await?;
            let own: Vec<ConsumptionReading> = building
                .iter()
                .filter(|r| r.occupant_id == tenant.occupant_id)
                .cloned()
                .collect();
            let allocation = self.allocator.allocate(&own, &building, &pv);
            costs.push(CostBreakdown::from_allocation(&allocation, &tariff));
        }

        let export = exported_pv(&building, &pv, self.allocator.bucket_width());
        let profit = BuildingProfit::compute(&costs, &export, self.config.feed_in_tariff);

        metrics::counter!("billing_building_profit_total").increment(1);
        tracing::info!(
            building_id,
            tenants = costs.len(),
            exported_kwh = profit.exported_kwh,
            total_revenue = profit.total_revenue,
            "building profit computed"
        );
        Ok(profit)
    }
}
