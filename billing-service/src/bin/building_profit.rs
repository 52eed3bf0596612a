use std::env;

use anyhow::{bail, Result};
use billing_service::{
    allocation::TenantEnergyAllocator,
    billing::BillingService,
    config::AppConfig,
    observability,
    store::{PgReadingStore, ReportingWindow},
};
use sqlx::postgres::PgPoolOptions;

/// Print the landlord's PV revenue for one building as JSON.
///
/// Usage:
///   building_profit <building_id> <start_rfc3339> <end_rfc3339>
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        bail!("usage: building_profit <building_id> <start_rfc3339> <end_rfc3339>");
    }
    let building_id = &args[1];
    let window = ReportingWindow::from_rfc3339(&args[2], &args[3])?;

    let cfg = AppConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;

    let service = BillingService::new(
        PgReadingStore::new(pool),
        TenantEnergyAllocator::new(cfg.allocation.bucket_width),
        cfg.billing.clone(),
    );

    let profit = service.building_profit(building_id, window).await?;
    println!("{}", serde_json::to_string_pretty(&profit)?);

    Ok(())
}
