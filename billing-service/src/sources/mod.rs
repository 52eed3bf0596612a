pub mod csv_file;
pub mod http_readings;

pub use csv_file::ReadingCsvFileSource;
pub use http_readings::HttpReadingSource;
