use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Who a consumption meter belongs to.
///
/// `General` is the landlord's common-area meter; it takes part in the
/// building-wide totals but is never invoiced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupantKind {
    Tenant,
    General,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown occupant kind '{0}'")]
pub struct UnknownOccupantKind(pub String);

impl FromStr for OccupantKind {
    type Err = UnknownOccupantKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tenant" => Ok(Self::Tenant),
            "general" | "landlord" => Ok(Self::General),
            other => Err(UnknownOccupantKind(other.to_string())),
        }
    }
}

impl fmt::Display for OccupantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tenant => f.write_str("tenant"),
            Self::General => f.write_str("general"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub occupant_id: String,
    pub building_id: String,
    pub kind: OccupantKind,
}

impl Occupant {
    pub fn is_tenant(&self) -> bool {
        self.kind == OccupantKind::Tenant
    }
}

/// Unit rates a tenant is billed at.
///
/// Rates are currency per kWh; `base_fee` is charged once per invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TenantTariff {
    pub tenant_id: String,
    pub pv_rate: f64,
    pub grid_rate: f64,
    pub base_fee: f64,
}
