//! Market data for the rotation.

mod csv_source;
mod pair;

pub use csv_source::{parse_bars, CsvDataSource};
pub use pair::{align_pair, fetch_pair};
