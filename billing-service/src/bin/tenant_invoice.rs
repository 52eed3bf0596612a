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
use time::OffsetDateTime;

/// Generate a tenant invoice for a reporting window and print it as JSON.
///
/// Usage:
///   tenant_invoice <tenant_id> <start_rfc3339> <end_rfc3339>
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        bail!("usage: tenant_invoice <tenant_id> <start_rfc3339> <end_rfc3339>");
    }
    let tenant_id = &args[1];
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

    let invoice = service
        .tenant_invoice(tenant_id, window, OffsetDateTime::now_utc())
        .await?;
    for line in &invoice.lines {
        tracing::info!(
            tenant_id = %tenant_id,
            kind = ?line.kind,
            quantity_kwh = ?line.quantity_kwh,
            amount = line.amount,
            "invoice line"
        );
    }
    println!("{}", serde_json::to_string_pretty(&invoice)?);

    Ok(())
}
