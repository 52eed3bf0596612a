use anyhow::Result;
use sqlx::PgPool;

use crate::domain::{Occupant, OccupantKind, TenantTariff};

#[derive(Debug, Clone, sqlx::FromRow)]
struct OccupantRow {
    occupant_id: String,
    building_id: String,
    kind: String,
}

impl TryFrom<OccupantRow> for Occupant {
    type Error = anyhow::Error;

    fn try_from(row: OccupantRow) -> Result<Self> {
        let kind: OccupantKind = row.kind.parse()?;
        Ok(Occupant {
            occupant_id: row.occupant_id,
            building_id: row.building_id,
            kind,
        })
    }
}

/// Look up a single occupant, `None` if it does not exist.
pub async fn occupant(pool: &PgPool, occupant_id: &str) -> Result<Option<Occupant>> {
    let row = sqlx::query_as::<_, OccupantRow>(
        r#"
        SELECT occupant_id, building_id, kind
        FROM occupants
        WHERE occupant_id = $1
        "#,
    )
    .bind(occupant_id)
    .fetch_optional(pool)
    .await?;

    row.map(Occupant::try_from).transpose()
}

/// All occupants of a building, tenants and the general meter alike.
pub async fn building_occupants(pool: &PgPool, building_id: &str) -> Result<Vec<Occupant>> {
    let rows = sqlx::query_as::<_, OccupantRow>(
        r#"
        SELECT occupant_id, building_id, kind
        FROM occupants
        WHERE building_id = $1
        ORDER BY occupant_id
        "#,
    )
    .bind(building_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Occupant::try_from).collect()
}

pub async fn tenant_tariff(pool: &PgPool, tenant_id: &str) -> Result<Option<TenantTariff>> {
    let row = sqlx::query_as::<_, TenantTariff>(
        r#"
        SELECT tenant_id, pv_rate, grid_rate, base_fee
        FROM tenant_tariffs
        WHERE tenant_id = $1
        "#,
    )
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
