use std::{fs::File, marker::PhantomData, path::PathBuf};

use crate::{
    pipeline::{Envelope, EnvelopeStream, PipelineError, Source},
    reading::Reading,
};

/// CSV backfill source for readings.
///
/// Columns are looked up by header name (see `Reading::COLUMNS`); `ts` must
/// be RFC3339. Pipe-delimited `.dat` exports work with `with_delimiter(b'|')`.
pub struct ReadingCsvFileSource<T> {
    path: PathBuf,
    delimiter: u8,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ReadingCsvFileSource<T> {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
            _marker: PhantomData,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

#[async_trait::async_trait]
impl<T: Reading> Source<T> for ReadingCsvFileSource<T> {
    async fn stream(&self) -> EnvelopeStream<T> {
        // Blocking reader inside a single async task; fine for backfill sizes.
        let path = self.path.clone();
        let delimiter = self.delimiter;
        let s = async_stream::try_stream! {
            let file = File::open(&path)
                .map_err(|e| PipelineError::Source(format!("failed to open CSV file {}: {e}", path.display())))?;
            let mut rdr = csv::ReaderBuilder::new()
                .delimiter(delimiter)
                .trim(csv::Trim::All)
                .from_reader(file);
            let headers = rdr
                .headers()
                .map_err(|e| PipelineError::Source(format!("failed to read CSV headers: {e}")))?
                .clone();

            for result in rdr.records() {
                let record = result.map_err(|e| PipelineError::Source(format!(
                    "failed to read CSV record: {e}"
                )))?;

                let reading = match T::from_csv_record(&record, &headers) {
                    Ok(r) => r,
                    Err(e) => {
                        metrics::counter!("readings_csv_parse_errors_total", "kind" => T::KIND).increment(1);
                        Err(e)?
                    }
                };

                yield Envelope::now(reading);
            }
        };

        Box::pin(s)
    }
}
