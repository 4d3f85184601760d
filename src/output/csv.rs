//! CSV output formatter for duplicate scan results.
//!
//! One row per file, in report order.
//!
//! # Columns
//!
//! - `group_id`: 1-based position of the group in the report
//! - `hash`: BLAKE3 content hash (hexadecimal)
//! - `size`: File size in bytes
//! - `path`: Path as produced by traversal
//! - `is_representative`: `true` for the first member of each group

use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::duplicates::DuplicateGroup;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    group_id: usize,
    hash: &'a str,
    size: u64,
    path: String,
    is_representative: bool,
}

/// CSV output formatter.
#[derive(Debug)]
pub struct CsvOutput<'a> {
    groups: &'a [DuplicateGroup],
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup]) -> Self {
        Self { groups }
    }

    /// Write the CSV output, header included, to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        if self.groups.is_empty() {
            csv_writer.write_record(["group_id", "hash", "size", "path", "is_representative"])?;
        }

        for (idx, group) in self.groups.iter().enumerate() {
            let hash = group.hash_hex();
            for (position, file) in group.files.iter().enumerate() {
                csv_writer.serialize(CsvRow {
                    group_id: idx + 1,
                    hash: &hash,
                    size: file.size,
                    path: file.path.to_string_lossy().into_owned(),
                    is_representative: position == 0,
                })?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::FileEntry;
    use std::path::PathBuf;

    fn group(fill: u8, size: u64, paths: &[&str]) -> DuplicateGroup {
        DuplicateGroup::new(
            [fill; 32],
            size,
            paths
                .iter()
                .map(|p| FileEntry::new(PathBuf::from(p), size))
                .collect(),
        )
    }

    #[test]
    fn test_csv_rows() {
        let groups = vec![group(1, 10, &["/a", "/bb"]), group(2, 5, &["/c", "/d", "/e"])];
        let csv = CsvOutput::new(&groups).to_string().unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "group_id,hash,size,path,is_representative");
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[1], format!("1,{},10,/a,true", "01".repeat(32)));
        assert_eq!(lines[2], format!("1,{},10,/bb,false", "01".repeat(32)));
        assert!(lines[3].starts_with("2,"));
        assert!(lines[3].ends_with(",/c,true"));
    }

    #[test]
    fn test_csv_empty_has_header() {
        let csv = CsvOutput::new(&[]).to_string().unwrap();
        assert_eq!(csv.trim_end(), "group_id,hash,size,path,is_representative");
    }

    #[test]
    fn test_csv_quotes_paths_with_commas() {
        let groups = vec![group(3, 1, &["/x,y", "/z"])];
        let csv = CsvOutput::new(&groups).to_string().unwrap();
        assert!(csv.contains("\"/x,y\""));
    }
}
