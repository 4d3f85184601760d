//! Plain text report.
//!
//! Two lines per group:
//!
//! ```text
//! # a/1.txt 2000000 x2
//! - b/1.txt
//! ```
//!
//! The header names the representative, its size and the member count; the
//! second line lists the other members separated by spaces.

use std::io::{self, Write};

use yansi::Paint;

use crate::duplicates::DuplicateGroup;

/// Text output formatter.
#[derive(Debug)]
pub struct TextOutput<'a> {
    groups: &'a [DuplicateGroup],
    color: bool,
}

impl<'a> TextOutput<'a> {
    /// Create a formatter; `color` highlights group headers.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup], color: bool) -> Self {
        Self { groups, color }
    }

    fn header(&self, group: &DuplicateGroup) -> String {
        let path = group
            .representative()
            .map(|f| f.path.display().to_string())
            .unwrap_or_default();
        let line = format!("# {} {} x{}", path, group.size, group.len());
        if self.color {
            line.bold().green().to_string()
        } else {
            line
        }
    }

    /// Write every group.
    ///
    /// # Errors
    ///
    /// Returns the writer's I/O error.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for group in self.groups {
            writeln!(writer, "{}", self.header(group))?;
            let others: Vec<String> = group
                .others()
                .iter()
                .map(|f| f.path.display().to_string())
                .collect();
            writeln!(writer, "- {}", others.join(" "))?;
        }
        writer.flush()
    }

    /// Render the report to a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_to(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
