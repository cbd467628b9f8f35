pub mod aggregate;
pub mod bucket;
pub mod config;
pub mod error;
pub mod format;
pub mod gapfill;
pub mod pipeline;
pub mod series;
pub mod source;
pub mod timezone;
