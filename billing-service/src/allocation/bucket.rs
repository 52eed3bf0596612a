use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("bucket width must be at least one second")]
pub struct InvalidBucketWidth;

/// Width of the time buckets readings are aligned on.
///
/// A reading at `ts` falls into bucket `floor(unix_seconds / width)`, so
/// buckets are anchored at the Unix epoch and sub-second parts are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct BucketWidth(u32);

impl BucketWidth {
    pub const MINUTE: BucketWidth = BucketWidth(60);

    pub fn from_secs(secs: u32) -> Result<Self, InvalidBucketWidth> {
        if secs == 0 {
            return Err(InvalidBucketWidth);
        }
        Ok(Self(secs))
    }

    pub fn as_secs(self) -> u32 {
        self.0
    }

    pub fn bucket_of(self, ts: OffsetDateTime) -> i64 {
        ts.unix_timestamp().div_euclid(i64::from(self.0))
    }
}

impl Default for BucketWidth {
    fn default() -> Self {
        Self::MINUTE
    }
}

impl TryFrom<u32> for BucketWidth {
    type Error = InvalidBucketWidth;

    fn try_from(secs: u32) -> Result<Self, Self::Error> {
        Self::from_secs(secs)
    }
}

impl From<BucketWidth> for u32 {
    fn from(width: BucketWidth) -> Self {
        width.0
    }
}
