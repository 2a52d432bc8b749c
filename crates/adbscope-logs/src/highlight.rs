use adbscope_types::{Decoration, FilterConfig, LogRecord};

use crate::error::FilterError;
use crate::filter::NamePattern;
use crate::registry::TargetSet;

/// Picks the console decoration of an accepted record
///
/// Precedence: highlight, then priority color (when enabled), then none.
#[derive(Clone, Debug)]
pub struct Highlighter {
    /// Highlight glob matched against the tag
    tag: Option<NamePattern>,

    /// Whether a process filter is configured
    process_filtered: bool,

    /// Colorize by priority
    color: bool,
}

impl Highlighter {
    pub fn new(config: &FilterConfig) -> Result<Self, FilterError> {
        Ok(Self {
            tag: NamePattern::from_config(
                "highlight",
                config.highlight.as_deref(),
                config.case_sensitive,
            )?,
            process_filtered: config.process.as_deref().is_some_and(|p| !p.is_empty()),
            color: config.color,
        })
    }

    pub fn decoration_for(&self, record: &LogRecord, targets: &TargetSet) -> Decoration {
        let tag_match = self.tag.as_ref().is_some_and(|p| p.matches(&record.tag));

        // Without a process filter, a tracked highlight process is highlighted wholesale
        let pid_match = !self.process_filtered
            && record.process_id.is_some_and(|pid| targets.is_highlighted(pid));

        if tag_match || pid_match {
            Decoration::Highlight
        } else if self.color {
            Decoration::PriorityColor
        } else {
            Decoration::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adbscope_types::Priority;

    fn highlighter(highlight: Option<&str>, process: Option<&str>, color: bool) -> Highlighter {
        Highlighter::new(&FilterConfig {
            highlight: highlight.map(String::from),
            process: process.map(String::from),
            color,
            ..FilterConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_highlight_beats_priority_color() {
        let h = highlighter(Some("Camera*"), None, true);
        let record = LogRecord::new(Priority::Error, "CameraService", "open failed");
        assert_eq!(h.decoration_for(&record, &TargetSet::default()), Decoration::Highlight);
    }

    #[test]
    fn test_priority_color_and_none() {
        let record = LogRecord::new(Priority::Info, "Wifi", "connected");
        let targets = TargetSet::default();
        assert_eq!(
            highlighter(Some("Camera*"), None, true).decoration_for(&record, &targets),
            Decoration::PriorityColor
        );
        assert_eq!(
            highlighter(Some("Camera*"), None, false).decoration_for(&record, &targets),
            Decoration::None
        );
        assert_eq!(
            highlighter(None, None, false).decoration_for(&record, &targets),
            Decoration::None
        );
    }

    #[test]
    fn test_highlight_ignores_color_flag() {
        let h = highlighter(Some("wifi"), None, false);
        let record = LogRecord::new(Priority::Info, "Wifi", "connected");
        assert_eq!(h.decoration_for(&record, &TargetSet::default()), Decoration::Highlight);
    }

    #[test]
    fn test_tracked_pid_highlight() {
        let mut targets = TargetSet::default();
        targets.insert_highlight(789);
        let record = LogRecord::new(Priority::Debug, "Anything", "x").with_process_id(789);

        // No process filter: the whole process is highlighted
        let h = highlighter(Some("com.bar"), None, true);
        assert_eq!(h.decoration_for(&record, &targets), Decoration::Highlight);

        // With a process filter only the tag match counts
        let h = highlighter(Some("com.bar"), Some("com.foo"), true);
        assert_eq!(h.decoration_for(&record, &targets), Decoration::PriorityColor);

        // Untracked pid
        let other = LogRecord::new(Priority::Debug, "Anything", "x").with_process_id(1);
        let h = highlighter(Some("com.bar"), None, true);
        assert_eq!(h.decoration_for(&other, &targets), Decoration::PriorityColor);
    }
}
