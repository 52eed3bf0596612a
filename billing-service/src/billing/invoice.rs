use billing_client::domain::TenantTariff;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{round_currency, CostBreakdown};
use crate::store::ReportingWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceLineKind {
    PvEnergy,
    GridEnergy,
    BaseFee,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub kind: InvoiceLineKind,
    pub description: String,
    /// kWh for energy lines, `None` for flat fees.
    pub quantity_kwh: Option<f64>,
    pub unit_rate: Option<f64>,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: String,
    pub tenant_id: String,
    pub building_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub period_start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub period_end: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
    pub currency: String,
    pub lines: Vec<InvoiceLine>,
    pub total: f64,
}

fn hash_str(hasher: &mut blake3::Hasher, s: &str) {
    let len = s.len() as u32;
    hasher.update(&len.to_le_bytes());
    hasher.update(s.as_bytes());
}

/// Deterministic id: the same tenant and period always map to the same
/// invoice, so re-issuing replaces rather than duplicates.
pub(crate) fn invoice_id(tenant_id: &str, window: &ReportingWindow) -> String {
    let mut h = blake3::Hasher::new();
    hash_str(&mut h, tenant_id);
    h.update(&window.start().unix_timestamp_nanos().to_le_bytes());
    h.update(&window.end().unix_timestamp_nanos().to_le_bytes());
    let hex = h.finalize().to_hex();
    format!("INV-{}", &hex.as_str()[..16])
}

impl Invoice {
    pub fn new(
        tenant_id: &str,
        building_id: &str,
        window: &ReportingWindow,
        issued_at: OffsetDateTime,
        currency: &str,
        costs: &CostBreakdown,
        tariff: &TenantTariff,
    ) -> Self {
        let lines = vec![
            InvoiceLine {
                kind: InvoiceLineKind::PvEnergy,
                description: "Solar energy from on-site PV".to_string(),
                quantity_kwh: Some(costs.pv_kwh),
                unit_rate: Some(tariff.pv_rate),
                amount: costs.pv_cost,
            },
            InvoiceLine {
                kind: InvoiceLineKind::GridEnergy,
                description: "Grid energy".to_string(),
                quantity_kwh: Some(costs.grid_kwh),
                unit_rate: Some(tariff.grid_rate),
                amount: costs.grid_cost,
            },
            InvoiceLine {
                kind: InvoiceLineKind::BaseFee,
                description: "Base fee".to_string(),
                quantity_kwh: None,
                unit_rate: None,
                amount: costs.base_fee,
            },
        ];
        let total = round_currency(lines.iter().map(|l| l.amount).sum());

        Self {
            invoice_id: invoice_id(tenant_id, window),
            tenant_id: tenant_id.to_string(),
            building_id: building_id.to_string(),
            period_start: window.start(),
            period_end: window.end(),
            issued_at,
            currency: currency.to_string(),
            lines,
            total,
        }
    }

    pub fn line(&self, kind: InvoiceLineKind) -> Option<&InvoiceLine> {
        self.lines.iter().find(|l| l.kind == kind)
    }
}
