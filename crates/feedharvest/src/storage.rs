//! CSV output for harvested posts.
//!
//! Output is UTF-8 with a leading byte-order mark so spreadsheet tools pick
//! the right encoding, one row per record.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::types::{HarvestError, HarvestResult, PostRecord, SENTINEL};

/// UTF-8 byte-order mark.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Column headers, in output order.
pub const COLUMNS: [&str; 10] = [
    "TweetID",
    "AuthorName",
    "Username",
    "TweetText",
    "Timestamp",
    "Replies",
    "Retweets",
    "Likes",
    "Views",
    "TweetURL",
];

/// Extra column holding the view-count provenance.
pub const VIEW_SOURCE_COLUMN: &str = "ViewsSource";

/// Output file name derived from the search term.
pub fn output_file_name(search_term: &str) -> String {
    let sanitized: String = search_term
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = if sanitized.is_empty() {
        "search"
    } else {
        sanitized.as_str()
    };
    format!("tweets_full_data_{stem}.csv")
}

/// Options controlling the CSV layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvOptions {
    /// Append the `ViewsSource` column.
    pub include_view_source: bool,
}

/// Writer for harvest CSV files.
pub struct CsvWriter;

impl CsvWriter {
    /// Write records to `dir/<name>`, creating the directory if needed.
    pub fn write_to_dir(
        records: &[PostRecord],
        dir: &Path,
        file_name: &str,
        options: CsvOptions,
    ) -> HarvestResult<PathBuf> {
        if file_name.trim().is_empty() || file_name.contains(['/', '\\']) {
            return Err(HarvestError::InvalidInput(format!(
                "output file name must be a bare file name, got {file_name:?}"
            )));
        }
        let path = dir.join(file_name);
        Self::write_to_file(records, &path, options)?;
        Ok(path)
    }

    /// Write records to a file, replacing any existing content.
    pub fn write_to_file(
        records: &[PostRecord],
        path: &Path,
        options: CsvOptions,
    ) -> HarvestResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = std::fs::File::create(path)?;
        Self::write_to(records, &mut file, options)?;
        tracing::debug!("wrote {} rows to {}", records.len(), path.display());
        Ok(())
    }

    /// Write records to any writer.
    pub fn write_to<W: Write>(
        records: &[PostRecord],
        writer: &mut W,
        options: CsvOptions,
    ) -> HarvestResult<()> {
        writer.write_all(UTF8_BOM)?;

        let mut csv = csv::Writer::from_writer(writer);

        let mut header: Vec<&str> = COLUMNS.to_vec();
        if options.include_view_source {
            header.push(VIEW_SOURCE_COLUMN);
        }
        csv.write_record(&header)?;

        for record in records {
            csv.write_record(&row(record, options))?;
        }

        csv.flush()?;
        Ok(())
    }
}

fn row(record: &PostRecord, options: CsvOptions) -> Vec<String> {
    let or_sentinel = |v: &Option<String>| v.clone().unwrap_or_else(|| SENTINEL.to_string());

    let mut row = vec![
        record.id.clone(),
        or_sentinel(&record.author_name),
        or_sentinel(&record.handle),
        or_sentinel(&record.text),
        or_sentinel(&record.timestamp),
        record.metrics.replies.to_string(),
        record.metrics.reposts.to_string(),
        record.metrics.likes.to_string(),
        record.metrics.views.as_output().to_string(),
        record.url.clone(),
    ];
    if options.include_view_source {
        row.push(record.metrics.views.source.to_string());
    }
    row
}
