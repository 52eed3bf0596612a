use billing_client::domain::{ConsumptionReading, GenerationReading};
use serde::{Deserialize, Serialize};

use super::{consumption_by_bucket, generation_by_bucket, BucketWidth};

/// Building-level fate of PV generation over a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub generated_kwh: f64,
    pub self_consumed_kwh: f64,
    pub exported_kwh: f64,
}

/// Split a building's PV output into the part its occupants used and the
/// surplus fed into the grid, bucket by bucket.
pub fn exported_pv(
    building: &[ConsumptionReading],
    pv: &[GenerationReading],
    width: BucketWidth,
) -> ExportSummary {
    let building_by_bucket = consumption_by_bucket(building, width);
    let pv_by_bucket = generation_by_bucket(pv, width);

    let mut summary = ExportSummary::default();
    for (key, generated) in pv_by_bucket {
        if generated <= 0.0 {
            continue;
        }
        let consumed = building_by_bucket.get(&key).copied().unwrap_or(0.0).max(0.0);
        let used = generated.min(consumed);

        summary.generated_kwh += generated;
        summary.self_consumed_kwh += used;
        summary.exported_kwh += generated - used;
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::tests::{cons, pv_at};
    use time::{macros::datetime, Duration};

    #[test]
    fn surplus_beyond_building_draw_is_exported() {
        let t0 = datetime!(2024-06-01 12:00:00 UTC);
        let t1 = t0 + Duration::minutes(1);
        let building = vec![cons(t0, "t-1", 1.0), cons(t0, "general", 0.5), cons(t1, "t-1", 3.0)];
        let pv = vec![pv_at(t0, 2.0), pv_at(t1, 2.0)];

        let s = exported_pv(&building, &pv, BucketWidth::MINUTE);
        assert_eq!(s.generated_kwh, 4.0);
        assert_eq!(s.self_consumed_kwh, 3.5);
        assert_eq!(s.exported_kwh, 0.5);
    }

    #[test]
    fn generation_without_any_consumption_is_fully_exported() {
        let t0 = datetime!(2024-06-01 12:00:00 UTC);
        let s = exported_pv(&[], &[pv_at(t0, 1.25)], BucketWidth::MINUTE);
        assert_eq!(s.exported_kwh, 1.25);
        assert_eq!(s.self_consumed_kwh, 0.0);
    }

    #[test]
    fn no_generation_means_nothing_exported() {
        let t0 = datetime!(2024-06-01 12:00:00 UTC);
        let s = exported_pv(&[cons(t0, "t-1", 2.0)], &[], BucketWidth::MINUTE);
        assert_eq!(s, ExportSummary::default());
    }
}
