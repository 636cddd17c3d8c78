pub mod accuracy;
pub mod analyzers;
pub mod config;
pub mod datetime;
pub mod error;
pub mod ingest;
pub mod output;
pub mod records;
