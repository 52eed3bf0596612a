//! Turns allocations into money: tenant cost breakdowns, landlord profit and
//! invoices. All rounding happens here, never inside the allocator.

mod invoice;
mod service;

use billing_client::domain::TenantTariff;
use serde::{Deserialize, Serialize};

use crate::allocation::{AllocationResult, ExportSummary};

pub use invoice::{Invoice, InvoiceLine, InvoiceLineKind};
pub use service::BillingService;

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Currency amounts are kept at 2 decimal places.
pub fn round_currency(value: f64) -> f64 {
    round_to(value, 2)
}

/// Energy quantities are reported at 3 decimal places.
pub fn round_kwh(value: f64) -> f64 {
    round_to(value, 3)
}

/// What a tenant owes for a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub pv_kwh: f64,
    pub grid_kwh: f64,
    pub total_kwh: f64,
    pub pv_cost: f64,
    pub grid_cost: f64,
    pub base_fee: f64,
    pub total_cost: f64,
}

impl CostBreakdown {
    /// Price an allocation at the tenant's rates.
    ///
    /// Costs are computed from the unrounded energy and rounded per line; the
    /// total is the sum of the rounded lines so it always matches an invoice.
    pub fn from_allocation(allocation: &AllocationResult, tariff: &TenantTariff) -> Self {
        let pv_cost = round_currency(allocation.pv_kwh * tariff.pv_rate);
        let grid_cost = round_currency(allocation.grid_kwh * tariff.grid_rate);
        let base_fee = round_currency(tariff.base_fee);

        Self {
            pv_kwh: round_kwh(allocation.pv_kwh),
            grid_kwh: round_kwh(allocation.grid_kwh),
            total_kwh: round_kwh(allocation.total_kwh),
            pv_cost,
            grid_cost,
            base_fee,
            total_cost: round_currency(pv_cost + grid_cost + base_fee),
        }
    }
}

/// Landlord revenue from a building's PV over a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildingProfit {
    /// PV energy sold to tenants at their PV rate.
    pub tenant_pv_revenue: f64,
    pub exported_kwh: f64,
    pub feed_in_revenue: f64,
    pub total_revenue: f64,
}

impl BuildingProfit {
    pub fn compute<'a, I>(tenant_costs: I, export: &ExportSummary, feed_in_tariff: f64) -> Self
    where
        I: IntoIterator<Item = &'a CostBreakdown>,
    {
        let tenant_pv_revenue = round_currency(tenant_costs.into_iter().map(|c| c.pv_cost).sum());
        let feed_in_revenue = round_currency(export.exported_kwh * feed_in_tariff);

        Self {
            tenant_pv_revenue,
            exported_kwh: round_kwh(export.exported_kwh),
            feed_in_revenue,
            total_revenue: round_currency(tenant_pv_revenue + feed_in_revenue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tariff() -> TenantTariff {
        TenantTariff {
            tenant_id: "t-1".to_string(),
            pv_rate: 0.18,
            grid_rate: 0.32,
            base_fee: 9.5,
        }
    }

    #[test]
    fn rounding_helpers_use_billing_precision() {
        assert_eq!(round_currency(1.23456), 1.23);
        assert_eq!(round_currency(2.675000001), 2.68);
        assert_eq!(round_kwh(0.12345), 0.123);
        assert_eq!(round_kwh(10.0), 10.0);
    }

    #[test]
    fn cost_breakdown_prices_pv_and_grid_separately() {
        let allocation = AllocationResult {
            pv_kwh: 120.4567,
            grid_kwh: 80.1234,
            total_kwh: 200.5801,
        };

        let c = CostBreakdown::from_allocation(&allocation, &tariff());
        assert_eq!(c.pv_kwh, 120.457);
        assert_eq!(c.grid_kwh, 80.123);
        assert_eq!(c.total_kwh, 200.58);
        assert_eq!(c.pv_cost, 21.68);
        assert_eq!(c.grid_cost, 25.64);
        assert_eq!(c.base_fee, 9.5);
        assert_eq!(c.total_cost, 56.82);
    }

    #[test]
    fn zero_allocation_bills_only_the_base_fee() {
        let c = CostBreakdown::from_allocation(&AllocationResult::default(), &tariff());
        assert_eq!(c.total_kwh, 0.0);
        assert_eq!(c.pv_cost + c.grid_cost, 0.0);
        assert_eq!(c.total_cost, 9.5);
    }

    #[test]
    fn building_profit_adds_feed_in_to_tenant_pv_sales() {
        let a = CostBreakdown {
            pv_cost: 10.25,
            ..Default::default()
        };
        let b = CostBreakdown {
            pv_cost: 4.5,
            ..Default::default()
        };
        let export = ExportSummary {
            generated_kwh: 100.0,
            self_consumed_kwh: 60.0,
            exported_kwh: 40.0,
        };

        let p = BuildingProfit::compute([&a, &b], &export, 0.08);
        assert_eq!(p.tenant_pv_revenue, 14.75);
        assert_eq!(p.exported_kwh, 40.0);
        assert_eq!(p.feed_in_revenue, 3.2);
        assert_eq!(p.total_revenue, 17.95);
    }
}
