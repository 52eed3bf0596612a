pub mod postgres;

pub use postgres::PgReadingSink;
