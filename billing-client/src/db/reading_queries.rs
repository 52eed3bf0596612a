use anyhow::Result;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::domain::{ConsumptionReading, GenerationReading};

/// Fetch every consumption sample of a single occupant in `[start, end)`.
pub async fn occupant_consumption(
    pool: &PgPool,
    occupant_id: &str,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> Result<Vec<ConsumptionReading>> {
    let rows = sqlx::query_as::<_, ConsumptionReading>(
        r#"
        SELECT
            ts,
            occupant_id,
            building_id,
            consumption_kwh
        FROM consumption_readings
        WHERE occupant_id = $1
          AND ts >= $2
          AND ts <  $3
        ORDER BY ts
        "#,
    )
    .bind(occupant_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetch consumption samples of every occupant of a building, the landlord's
/// general meter included.
pub async fn building_consumption(
    pool: &PgPool,
    building_id: &str,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> Result<Vec<ConsumptionReading>> {
    let rows = sqlx::query_as::<_, ConsumptionReading>(
        r#"
        SELECT
            cr.ts,
            cr.occupant_id,
            o.building_id,
            cr.consumption_kwh
        FROM consumption_readings cr
        JOIN occupants o ON cr.occupant_id = o.occupant_id
        WHERE o.building_id = $1
          AND cr.ts >= $2
          AND cr.ts <  $3
        ORDER BY cr.ts
        "#,
    )
    .bind(building_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetch PV output of every device attached to a building.
pub async fn building_generation(
    pool: &PgPool,
    building_id: &str,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> Result<Vec<GenerationReading>> {
    let rows = sqlx::query_as::<_, GenerationReading>(
        r#"
        SELECT
            gr.ts,
            gr.device_id,
            d.building_id,
            gr.generation_kwh
        FROM generation_readings gr
        JOIN devices d ON gr.device_id = d.device_id
        WHERE d.building_id = $1
          AND gr.ts >= $2
          AND gr.ts <  $3
        ORDER BY gr.ts
        "#,
    )
    .bind(building_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
