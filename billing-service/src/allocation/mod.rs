//! Per-interval attribution of shared PV generation to a single tenant.
//!
//! Readings from the three input streams are aligned on fixed-width time
//! buckets. Within each bucket the PV actually used by the building (capped
//! at the building's draw) is split between occupants by a pluggable
//! [`AllocationPolicy`]; the default is [`ProportionalShare`].

mod bucket;
mod export;

use std::collections::{HashMap, HashSet};

use billing_client::domain::{ConsumptionReading, GenerationReading};
use serde::{Deserialize, Serialize};

pub use bucket::{BucketWidth, InvalidBucketWidth};
pub use export::{exported_pv, ExportSummary};

/// A tenant's consumption over a window, split by where it came from.
///
/// Values are unrounded; rounding for display happens in the billing layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub pv_kwh: f64,
    pub grid_kwh: f64,
    pub total_kwh: f64,
}

/// Aggregated inputs of a single time bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BucketLoad {
    pub building_kwh: f64,
    pub tenant_kwh: f64,
    pub pv_kwh: f64,
}

/// Fairness rule deciding how much of a bucket's PV a tenant receives.
///
/// Only called for buckets where both the tenant and the building drew
/// power. The returned value is clamped into `[0, tenant_kwh]` by the
/// allocator.
pub trait AllocationPolicy: Send + Sync {
    fn tenant_pv(&self, load: &BucketLoad) -> f64;
}

/// Split the PV the building used in a bucket by each occupant's share of
/// the simultaneous draw. PV beyond the building's consumption is exported
/// and never attributed to a tenant.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProportionalShare;

impl AllocationPolicy for ProportionalShare {
    fn tenant_pv(&self, load: &BucketLoad) -> f64 {
        let used_pv = load.pv_kwh.min(load.building_kwh);
        let share = load.tenant_kwh / load.building_kwh;
        used_pv * share
    }
}

/// Missing or non-finite quantities count as zero.
pub fn sanitize_kwh(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

pub(crate) fn sum_by_bucket<I>(readings: I, width: BucketWidth) -> HashMap<i64, f64>
where
    I: IntoIterator<Item = (time::OffsetDateTime, Option<f64>)>,
{
    let mut buckets: HashMap<i64, f64> = HashMap::new();
    for (ts, kwh) in readings {
        *buckets.entry(width.bucket_of(ts)).or_insert(0.0) += sanitize_kwh(kwh);
    }
    buckets
}

pub(crate) fn consumption_by_bucket(
    readings: &[ConsumptionReading],
    width: BucketWidth,
) -> HashMap<i64, f64> {
    sum_by_bucket(readings.iter().map(|r| (r.ts, r.consumption_kwh)), width)
}

pub(crate) fn generation_by_bucket(
    readings: &[GenerationReading],
    width: BucketWidth,
) -> HashMap<i64, f64> {
    sum_by_bucket(readings.iter().map(|r| (r.ts, r.generation_kwh)), width)
}

#[derive(Debug, Clone, Default)]
pub struct TenantEnergyAllocator<P = ProportionalShare> {
    width: BucketWidth,
    policy: P,
}

impl TenantEnergyAllocator<ProportionalShare> {
    pub fn new(width: BucketWidth) -> Self {
        Self {
            width,
            policy: ProportionalShare,
        }
    }
}

impl<P: AllocationPolicy> TenantEnergyAllocator<P> {
    pub fn with_policy(width: BucketWidth, policy: P) -> Self {
        Self { width, policy }
    }

    pub fn bucket_width(&self) -> BucketWidth {
        self.width
    }

    /// Attribute PV and grid energy to one tenant.
    ///
    /// `building` must contain the readings of every occupant, the tenant's
    /// own and the general meter included. Never fails; empty inputs give
    /// an all-zero result.
    pub fn allocate(
        &self,
        tenant: &[ConsumptionReading],
        building: &[ConsumptionReading],
        pv: &[GenerationReading],
    ) -> AllocationResult {
        let tenant_by_bucket = consumption_by_bucket(tenant, self.width);
        let building_by_bucket = consumption_by_bucket(building, self.width);
        let pv_by_bucket = generation_by_bucket(pv, self.width);

        let keys: HashSet<i64> = tenant_by_bucket
            .keys()
            .chain(building_by_bucket.keys())
            .chain(pv_by_bucket.keys())
            .copied()
            .collect();

        let mut result = AllocationResult::default();
        for key in keys {
            let load = BucketLoad {
                building_kwh: building_by_bucket.get(&key).copied().unwrap_or(0.0),
                tenant_kwh: tenant_by_bucket.get(&key).copied().unwrap_or(0.0),
                pv_kwh: pv_by_bucket.get(&key).copied().unwrap_or(0.0),
            };

            if load.tenant_kwh <= 0.0 {
                continue;
            }
            result.total_kwh += load.tenant_kwh;

            if load.building_kwh <= 0.0 {
                // Tenant drew power but the building total is missing: upstream gap.
                tracing::trace!(
                    bucket = key,
                    tenant_kwh = load.tenant_kwh,
                    "no building consumption in bucket, billing tenant draw as grid"
                );
                result.grid_kwh += load.tenant_kwh;
                continue;
            }

            let tenant_pv = sanitize_kwh(Some(self.policy.tenant_pv(&load)))
                .clamp(0.0, load.tenant_kwh);
            result.pv_kwh += tenant_pv;
            result.grid_kwh += load.tenant_kwh - tenant_pv;
        }

        result
    }
}

/// Allocate with the default one-minute buckets and proportional sharing.
pub fn allocate_tenant_energy(
    tenant: &[ConsumptionReading],
    building: &[ConsumptionReading],
    pv: &[GenerationReading],
) -> AllocationResult {
    TenantEnergyAllocator::new(BucketWidth::MINUTE).allocate(tenant, building, pv)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use time::{macros::datetime, Duration, OffsetDateTime};

    const EPS: f64 = 1e-9;

    pub(crate) fn cons(ts: OffsetDateTime, occupant: &str, kwh: f64) -> ConsumptionReading {
        ConsumptionReading::new(ts, occupant, "b-1", kwh)
    }

    pub(crate) fn pv_at(ts: OffsetDateTime, kwh: f64) -> GenerationReading {
        GenerationReading::new(ts, "pv-1", "b-1", kwh)
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_conserved(r: &AllocationResult) {
        assert_close(r.pv_kwh + r.grid_kwh, r.total_kwh);
    }

    #[test]
    fn empty_inputs_give_all_zero_result() {
        let r = allocate_tenant_energy(&[], &[], &[]);
        assert_eq!(r, AllocationResult::default());
    }

    #[test]
    fn single_bucket_single_tenant_splits_half_and_half() {
        let t0 = datetime!(2024-06-01 12:00:00 UTC);
        let tenant = vec![cons(t0, "t-1", 2.0)];
        let building = tenant.clone();
        let pv = vec![pv_at(t0, 1.0)];

        let r = allocate_tenant_energy(&tenant, &building, &pv);
        assert_close(r.pv_kwh, 1.0);
        assert_close(r.grid_kwh, 1.0);
        assert_close(r.total_kwh, 2.0);
    }

    #[test]
    fn missing_building_data_bills_everything_as_grid() {
        let t0 = datetime!(2024-06-01 12:00:00 UTC);
        let tenant = vec![cons(t0, "t-1", 1.0)];
        let pv = vec![pv_at(t0, 5.0)];

        let r = allocate_tenant_energy(&tenant, &[], &pv);
        assert_eq!(r.pv_kwh, 0.0);
        assert_close(r.grid_kwh, 1.0);
        assert_close(r.total_kwh, 1.0);
    }

    #[test]
    fn zero_tenant_reading_contributes_nothing() {
        let t0 = datetime!(2024-06-01 12:00:00 UTC);
        let t1 = t0 + Duration::minutes(1);
        let tenant = vec![cons(t0, "t-1", 0.0), cons(t1, "t-1", 1.5)];
        let building = vec![cons(t0, "t-2", 4.0), cons(t1, "t-1", 1.5)];
        let pv = vec![pv_at(t0, 3.0)];

        let r = allocate_tenant_energy(&tenant, &building, &pv);
        assert_close(r.total_kwh, 1.5);
        assert_eq!(r.pv_kwh, 0.0);
        assert_close(r.grid_kwh, 1.5);
    }

    #[test]
    fn without_pv_everything_is_grid() {
        let t0 = datetime!(2024-06-01 08:00:00 UTC);
        let tenant: Vec<_> = (0..10)
            .map(|i| cons(t0 + Duration::minutes(i), "t-1", 0.1 * (i + 1) as f64))
            .collect();
        let mut building = tenant.clone();
        building.push(cons(t0, "general", 2.0));

        let r = allocate_tenant_energy(&tenant, &building, &[]);
        assert_eq!(r.pv_kwh, 0.0);
        assert_close(r.grid_kwh, r.total_kwh);
        assert_close(r.total_kwh, 5.5);
    }

    #[test]
    fn pv_surplus_is_capped_at_building_consumption() {
        let t0 = datetime!(2024-06-01 12:00:00 UTC);
        let tenant = vec![cons(t0, "t-1", 1.0)];
        let building = vec![cons(t0, "t-1", 1.0), cons(t0, "t-2", 1.0)];
        let pv = vec![pv_at(t0, 10.0)];

        let r = allocate_tenant_energy(&tenant, &building, &pv);
        assert_close(r.pv_kwh, 1.0);
        assert_close(r.grid_kwh, 0.0);
        assert!(r.pv_kwh <= r.total_kwh);
    }

    #[test]
    fn pv_is_shared_in_proportion_to_simultaneous_draw() {
        let t0 = datetime!(2024-06-01 12:00:00 UTC);
        let a = vec![cons(t0, "t-a", 3.0)];
        let b = vec![cons(t0, "t-b", 1.0)];
        let building: Vec<_> = a.iter().chain(b.iter()).cloned().collect();
        let pv = vec![pv_at(t0, 2.0)];

        let ra = allocate_tenant_energy(&a, &building, &pv);
        let rb = allocate_tenant_energy(&b, &building, &pv);
        assert_close(ra.pv_kwh, 1.5);
        assert_close(rb.pv_kwh, 0.5);
        assert_close(ra.grid_kwh, 1.5);
        assert_close(rb.grid_kwh, 0.5);
    }

    #[test]
    fn night_consumption_is_not_credited_with_daytime_pv() {
        let noon = datetime!(2024-06-01 12:00:00 UTC);
        let night = datetime!(2024-06-01 23:00:00 UTC);
        let tenant = vec![cons(night, "t-1", 4.0)];
        let building = vec![cons(night, "t-1", 4.0), cons(noon, "t-2", 1.0)];
        let pv = vec![pv_at(noon, 6.0)];

        let r = allocate_tenant_energy(&tenant, &building, &pv);
        assert_eq!(r.pv_kwh, 0.0);
        assert_close(r.grid_kwh, 4.0);
    }

    #[test]
    fn sub_minute_jitter_lands_in_the_same_bucket() {
        let t0 = datetime!(2024-06-01 12:00:00.120 UTC);
        let jittered = datetime!(2024-06-01 12:00:59.900 UTC);
        let tenant = vec![cons(t0, "t-1", 1.0)];
        let building = vec![cons(t0, "t-1", 1.0), cons(jittered, "t-2", 1.0)];
        let pv = vec![pv_at(jittered, 1.0)];

        let r = allocate_tenant_energy(&tenant, &building, &pv);
        assert_close(r.pv_kwh, 0.5);
        assert_close(r.grid_kwh, 0.5);
    }

    #[test]
    fn wider_buckets_align_coarser_samples() {
        let t0 = datetime!(2024-06-01 12:00:00 UTC);
        let t1 = datetime!(2024-06-01 12:10:00 UTC);
        let tenant = vec![cons(t0, "t-1", 1.0)];
        let building = tenant.clone();
        let pv = vec![pv_at(t1, 1.0)];

        let minute = TenantEnergyAllocator::new(BucketWidth::default());
        assert_eq!(minute.allocate(&tenant, &building, &pv).pv_kwh, 0.0);

        let quarter_hour = TenantEnergyAllocator::new(BucketWidth::from_secs(900).unwrap());
        assert_close(quarter_hour.allocate(&tenant, &building, &pv).pv_kwh, 1.0);
    }

    #[test]
    fn malformed_quantities_are_treated_as_zero() {
        let t0 = datetime!(2024-06-01 12:00:00 UTC);
        let mut broken = cons(t0, "t-1", 0.0);
        broken.consumption_kwh = Some(f64::NAN);
        let mut missing = cons(t0, "t-1", 0.0);
        missing.consumption_kwh = None;
        let tenant = vec![broken, missing, cons(t0, "t-1", 2.0)];
        let building = tenant.clone();
        let mut bad_pv = pv_at(t0, 0.0);
        bad_pv.generation_kwh = Some(f64::INFINITY);
        let pv = vec![bad_pv, pv_at(t0, 1.0)];

        let r = allocate_tenant_energy(&tenant, &building, &pv);
        assert!(r.total_kwh.is_finite() && r.pv_kwh.is_finite());
        assert_close(r.total_kwh, 2.0);
        assert_close(r.pv_kwh, 1.0);
    }

    #[test]
    fn reading_order_does_not_change_the_result() {
        let t0 = datetime!(2024-06-01 06:00:00 UTC);
        let tenant: Vec<_> = (0..30)
            .map(|i| cons(t0 + Duration::minutes(i % 7), "t-1", 0.05 * (i % 5 + 1) as f64))
            .collect();
        let mut building = tenant.clone();
        building.extend((0..30).map(|i| cons(t0 + Duration::minutes(i % 11), "t-2", 0.3)));
        let pv: Vec<_> = (0..12)
            .map(|i| pv_at(t0 + Duration::minutes(i), 0.4 + 0.1 * i as f64))
            .collect();

        let forward = allocate_tenant_energy(&tenant, &building, &pv);

        let mut t_rev = tenant.clone();
        t_rev.reverse();
        let mut b_rev = building.clone();
        b_rev.rotate_left(17);
        let mut p_rev = pv.clone();
        p_rev.reverse();
        let shuffled = allocate_tenant_energy(&t_rev, &b_rev, &p_rev);

        assert_close(forward.pv_kwh, shuffled.pv_kwh);
        assert_close(forward.grid_kwh, shuffled.grid_kwh);
        assert_close(forward.total_kwh, shuffled.total_kwh);
        assert_conserved(&forward);
    }

    #[test]
    fn total_matches_sum_of_tenant_readings() {
        let t0 = datetime!(2024-06-01 00:00:00 UTC);
        let tenant: Vec<_> = (0..24 * 60)
            .step_by(15)
            .map(|m| cons(t0 + Duration::minutes(m), "t-1", 0.2))
            .collect();
        let mut building = tenant.clone();
        building.extend(
            (0..24 * 60)
                .step_by(15)
                .map(|m| cons(t0 + Duration::minutes(m), "general", 0.1)),
        );
        let pv: Vec<_> = (6 * 60..18 * 60)
            .step_by(15)
            .map(|m| pv_at(t0 + Duration::minutes(m), 0.25))
            .collect();

        let r = allocate_tenant_energy(&tenant, &building, &pv);
        let expected: f64 = tenant.iter().map(|r| r.consumption_kwh.unwrap()).sum();
        assert_close(r.total_kwh, expected);
        assert_conserved(&r);
        // 48 daylight buckets, building uses 0.25 of 0.3, tenant gets 2/3 of it.
        assert_close(r.pv_kwh, 48.0 * 0.25 * (0.2 / 0.3));
    }

    struct TenantFirst;

    impl AllocationPolicy for TenantFirst {
        fn tenant_pv(&self, load: &BucketLoad) -> f64 {
            load.pv_kwh
        }
    }

    #[test]
    fn custom_policy_is_clamped_to_tenant_draw() {
        let t0 = datetime!(2024-06-01 12:00:00 UTC);
        let tenant = vec![cons(t0, "t-1", 1.0)];
        let building = vec![cons(t0, "t-1", 1.0), cons(t0, "t-2", 3.0)];
        let pv = vec![pv_at(t0, 2.5)];

        let allocator = TenantEnergyAllocator::with_policy(BucketWidth::default(), TenantFirst);
        let r = allocator.allocate(&tenant, &building, &pv);
        assert_close(r.pv_kwh, 1.0);
        assert_close(r.grid_kwh, 0.0);
        assert_conserved(&r);
    }
}
