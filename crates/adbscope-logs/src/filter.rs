use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

use adbscope_types::{FilterConfig, LogRecord, Priority};

use crate::error::FilterError;
use crate::registry::TargetSet;

/// Name glob where `*` matches any run of characters and everything else is literal
#[derive(Clone, Debug)]
pub struct NamePattern {
    /// Original glob
    glob: String,

    /// Anchored translation
    regex: Regex,
}

impl NamePattern {
    /// Translate a glob into an anchored regex honoring the case rule
    pub fn new(glob: &str, case_sensitive: bool) -> Result<Self, regex::Error> {
        let translated = regex::escape(glob).replace(r"\*", ".*");
        let regex = RegexBuilder::new(&format!("^{translated}$"))
            .case_insensitive(!case_sensitive)
            .build()?;

        Ok(Self {
            glob: glob.to_string(),
            regex,
        })
    }

    /// Compile an optional config value, treating empty as unset
    pub(crate) fn from_config(
        field: &'static str,
        glob: Option<&str>,
        case_sensitive: bool,
    ) -> Result<Option<Self>, FilterError> {
        match glob.filter(|g| !g.is_empty()) {
            Some(glob) => Self::new(glob, case_sensitive)
                .map(Some)
                .map_err(|source| FilterError::InvalidPattern {
                    field,
                    pattern: glob.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// Get the original glob
    pub fn as_str(&self) -> &str {
        &self.glob
    }
}

/// A stage of the filter pipeline, in evaluation order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterStage {
    ProcessId,
    Tag,
    PrioritySet,
    MinPriority,
    Content,
}

/// Compiled filter pipeline for log records
///
/// Stages are a strict conjunction evaluated in [`FilterStage`] order; the
/// first failing stage drops the record.
#[derive(Clone, Debug)]
pub struct CompiledFilter {
    /// Whether a process name filter is configured
    process_filtered: bool,

    /// Tag glob (if any)
    tag: Option<NamePattern>,

    /// Accepted priorities
    priorities: HashSet<Priority>,

    /// Minimum accepted priority
    min_priority: Priority,

    /// Message regex (if any)
    grep: Option<Regex>,
}

impl CompiledFilter {
    /// Validate and compile a filter configuration
    pub fn new(config: &FilterConfig) -> Result<Self, FilterError> {
        if config.tag_length == 0 {
            return Err(FilterError::ZeroTagLength);
        }

        let priorities = parse_priorities(&config.priorities)?;
        let min_priority = parse_min_priority(&config.min_priority)?;

        let tag = NamePattern::from_config("tag", config.tag.as_deref(), config.case_sensitive)?;

        let grep = match config.grep.as_deref().filter(|g| !g.is_empty()) {
            Some(pattern) => Some(
                RegexBuilder::new(pattern)
                    .case_insensitive(!config.case_sensitive)
                    .build()
                    .map_err(|source| FilterError::InvalidPattern {
                        field: "grep",
                        pattern: pattern.to_string(),
                        source,
                    })?,
            ),
            None => None,
        };

        Ok(Self {
            process_filtered: config.process.as_deref().is_some_and(|p| !p.is_empty()),
            tag,
            priorities,
            min_priority,
            grep,
        })
    }

    /// Check if a record passes every configured stage
    pub fn accepts(&self, record: &LogRecord, targets: &TargetSet) -> bool {
        self.first_failing_stage(record, targets).is_none()
    }

    /// The stage that drops this record, if any
    pub fn first_failing_stage(&self, record: &LogRecord, targets: &TargetSet) -> Option<FilterStage> {
        // Records without a process id skip this stage
        if self.process_filtered {
            if let Some(pid) = record.process_id {
                if !targets.contains(pid) {
                    return Some(FilterStage::ProcessId);
                }
            }
        }

        if let Some(tag) = &self.tag {
            if !tag.matches(&record.tag) {
                return Some(FilterStage::Tag);
            }
        }

        if !self.priorities.contains(&record.priority) {
            return Some(FilterStage::PrioritySet);
        }

        if record.priority.rank() < self.min_priority.rank() {
            return Some(FilterStage::MinPriority);
        }

        if let Some(grep) = &self.grep {
            if !grep.is_match(&record.message) {
                return Some(FilterStage::Content);
            }
        }

        None
    }

    /// Check if a process name filter is configured
    pub fn has_process_filter(&self) -> bool {
        self.process_filtered
    }
}

/// Parse a priority set such as `"VDIWEF"` or `"we"`
fn parse_priorities(letters: &str) -> Result<HashSet<Priority>, FilterError> {
    letters
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .map(|c| Priority::from_letter(c.to_ascii_uppercase()).ok_or(FilterError::InvalidPriority(c)))
        .collect()
}

/// Parse a single priority letter such as `"W"`
fn parse_min_priority(letter: &str) -> Result<Priority, FilterError> {
    let mut chars = letter.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Priority::from_letter(c.to_ascii_uppercase())
            .ok_or_else(|| FilterError::InvalidMinPriority(letter.to_string())),
        _ => Err(FilterError::InvalidMinPriority(letter.to_string())),
    }
}
