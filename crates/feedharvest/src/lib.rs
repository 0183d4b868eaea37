//! feedharvest: post records, engagement-label parsing, dedup, and CSV output.

pub mod dedup;
pub mod identity;
pub mod metrics;
pub mod storage;
pub mod types;

pub use dedup::{dedup_by_identifier, SeenSet};
pub use identity::parse_post_id;
pub use metrics::{parse_aggregate_label, parse_count, parse_views_label};
pub use storage::{output_file_name, CsvOptions, CsvWriter};
pub use types::*;
