use std::marker::PhantomData;

use time::macros::datetime;

use crate::{
    pipeline::{Envelope, PipelineError, Transform},
    reading::Reading,
};

/// Pure validation of an incoming reading.
///
/// Rules:
/// - a present kWh value must be finite and non-negative; a missing value is
///   a meter gap and passes (the allocator counts it as zero).
/// - ts must be within a broad sanity window [2000-01-01, 2100-01-01].
pub fn validate_reading<T: Reading>(env: Envelope<T>) -> Result<Envelope<T>, PipelineError> {
    let r = &env.payload;

    if let Some(kwh) = r.kwh() {
        if !kwh.is_finite() {
            return Err(PipelineError::Transform(format!("{} kwh must be finite", T::KIND)));
        }
        if kwh < 0.0 {
            return Err(PipelineError::Transform(format!("{} kwh must be non-negative", T::KIND)));
        }
    }

    let min_ts = datetime!(2000-01-01 00:00:00 UTC);
    let max_ts = datetime!(2100-01-01 00:00:00 UTC);

    if r.ts() < min_ts || r.ts() > max_ts {
        return Err(PipelineError::Transform("timestamp out of allowed range".to_string()));
    }

    Ok(env)
}

pub struct ReadingValidation<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for ReadingValidation<T> {
    fn default() -> Self {
        Self { _marker: PhantomData }
    }
}

#[async_trait::async_trait]
impl<T: Reading> Transform<T> for ReadingValidation<T> {
    async fn apply(&self, input: Envelope<T>) -> Result<Envelope<T>, PipelineError> {
        match validate_reading(input) {
            Ok(env) => Ok(env),
            Err(e) => {
                metrics::counter!("validation_readings_rejected_total", "kind" => T::KIND).increment(1);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billing_client::domain::{ConsumptionReading, GenerationReading};

    fn consumption(kwh: Option<f64>) -> Envelope<ConsumptionReading> {
        Envelope::now(ConsumptionReading {
            ts: datetime!(2024-01-01 00:00:00 UTC),
            occupant_id: "t-1".to_string(),
            building_id: "b-1".to_string(),
            consumption_kwh: kwh,
        })
    }

    #[test]
    fn reading_validation_accepts_valid_record() {
        assert!(validate_reading(consumption(Some(1.0))).is_ok());
    }

    #[test]
    fn reading_validation_accepts_gaps() {
        assert!(validate_reading(consumption(None)).is_ok());
    }

    #[test]
    fn reading_validation_rejects_negative_kwh() {
        let res = validate_reading(consumption(Some(-0.1)));
        assert!(matches!(res, Err(PipelineError::Transform(_))));
    }

    #[test]
    fn reading_validation_rejects_non_finite_kwh() {
        let res = validate_reading(consumption(Some(f64::NAN)));
        assert!(matches!(res, Err(PipelineError::Transform(msg)) if msg.contains("finite")));
    }

    #[test]
    fn reading_validation_rejects_out_of_range_ts() {
        let env = Envelope::now(GenerationReading::new(
            datetime!(1800-01-01 00:00:00 UTC),
            "pv-1",
            "b-1",
            1.0,
        ));

        let res = validate_reading(env);
        assert!(matches!(res, Err(PipelineError::Transform(_))));
    }

    #[tokio::test]
    async fn transform_wraps_validation() {
        let t = ReadingValidation::<ConsumptionReading>::default();
        assert!(t.apply(consumption(Some(2.0))).await.is_ok());
        assert!(t.apply(consumption(Some(-2.0))).await.is_err());
    }
}
