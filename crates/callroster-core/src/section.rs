//! Line format of dated report sections inside the append-only report log.

use crate::{ReportCategory, RunReport};

pub const SECTION_START_PREFIX: &str = "--- Stakeholder Report for Assignments on ";
pub const SECTION_END_PREFIX: &str = "--- End of Report for ";
pub const MARKER_SUFFIX: &str = " ---";

pub fn start_marker(date_key: &str) -> String {
    format!("{SECTION_START_PREFIX}{date_key}{MARKER_SUFFIX}")
}

pub fn end_marker(date_key: &str) -> String {
    format!("{SECTION_END_PREFIX}{date_key}{MARKER_SUFFIX}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaggedLine<'a> {
    /// `date_key` is `None` when the line carries the start prefix but not the closing suffix.
    SectionStart { date_key: Option<&'a str> },
    SectionEnd { date_key: Option<&'a str> },
    Body(&'a str),
}

impl<'a> TaggedLine<'a> {
    pub fn is_section_start(&self) -> bool {
        matches!(self, TaggedLine::SectionStart { .. })
    }

    pub fn opens_section_for(&self, date_key: &str) -> bool {
        matches!(self, TaggedLine::SectionStart { date_key: Some(found) } if *found == date_key)
    }
}

pub fn parse_line(raw: &str) -> TaggedLine<'_> {
    let line = raw.trim();
    if let Some(rest) = line.strip_prefix(SECTION_START_PREFIX) {
        return TaggedLine::SectionStart {
            date_key: rest.strip_suffix(MARKER_SUFFIX),
        };
    }
    if let Some(rest) = line.strip_prefix(SECTION_END_PREFIX) {
        return TaggedLine::SectionEnd {
            date_key: rest.strip_suffix(MARKER_SUFFIX),
        };
    }
    TaggedLine::Body(line)
}

/// Renders the report as the exact line sequence stored in the log.
pub fn render_section(report: &RunReport) -> Vec<String> {
    let mut lines = Vec::with_capacity(3 + report.stakeholders.len() * 9);
    lines.push(start_marker(&report.date_key));
    lines.push(String::new());
    for entry in &report.stakeholders {
        lines.push(format!("Calls assigned {}", entry.name));
        lines.push(format!("- Total Calls This Run - {}", entry.total()));
        for category in ReportCategory::ORDER {
            lines.push(format!("- {}- {}", category.label(), entry.count(category)));
        }
        lines.push(String::new());
    }
    lines.push(end_marker(&report.date_key));
    lines
}
