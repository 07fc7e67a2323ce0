/// CSV and JSON export of ERP results.
pub mod export;
/// CSV time-series input.
pub mod series;
