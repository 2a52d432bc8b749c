use regex::Regex;
use std::sync::LazyLock;

use adbscope_types::{LogRecord, Priority};

/// Identifies which line grammar produced a record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GrammarKind {
    /// `I/Tag( 123): message` (logcat brief)
    Compact,
    /// `01-01 00:00:01.000 123 456 I Tag: message` (logcat threadtime)
    Verbose,
    /// `Tag [I] message` (adbscope's own file output and other tools)
    Generic,
}

/// Static description of a grammar, compiled into a [`LineGrammar`]
struct GrammarDescriptor {
    kind: GrammarKind,
    pattern: &'static str,
    trim_colons: bool,
    exposes_ids: bool,
}

/// Built-in grammars in detection order (cheapest / most specific first)
const GRAMMAR_DESCRIPTORS: &[GrammarDescriptor] = &[
    GrammarDescriptor {
        kind: GrammarKind::Compact,
        pattern: r"^(?P<prio>[VDIWEF])/(?P<tag>.+?)\s*\(\s*(?P<pid>\d+)\):(?P<msg>.*)$",
        trim_colons: true,
        // The embedded pid is informational only
        exposes_ids: false,
    },
    GrammarDescriptor {
        kind: GrammarKind::Verbose,
        pattern: r"^(?P<date>\d+-\d+)\s+(?P<time>\d+:\d+:\d+\.\d+)\s+(?P<tid>\d+)\s+(?P<pid>\d+)\s+(?P<prio>[VDIWEF])\s+(?P<tag>\S+)\s*(?P<msg>.*)$",
        trim_colons: true,
        exposes_ids: true,
    },
    GrammarDescriptor {
        kind: GrammarKind::Generic,
        pattern: r"^(?P<tag>.+?)\s*\[(?P<prio>[VDIWEF])\](?:\s(?P<msg>.*))?$",
        trim_colons: false,
        exposes_ids: false,
    },
];

static BUILTIN_GRAMMARS: LazyLock<Vec<LineGrammar>> = LazyLock::new(|| {
    GRAMMAR_DESCRIPTORS
        .iter()
        .map(|desc| LineGrammar {
            kind: desc.kind,
            pattern: Regex::new(desc.pattern).expect("built-in grammar pattern is valid"),
            trim_colons: desc.trim_colons,
            exposes_ids: desc.exposes_ids,
        })
        .collect()
});

/// A recognized raw-line format with named capture slots
///
/// Slots: `prio`, `tag`, `msg` (required) and `date`, `time`, `tid`, `pid`
/// (optional). Only grammars that expose ids populate the timestamp, thread
/// and process id of the record.
#[derive(Clone, Debug)]
pub struct LineGrammar {
    kind: GrammarKind,
    pattern: Regex,
    trim_colons: bool,
    exposes_ids: bool,
}

impl LineGrammar {
    /// Compile a grammar from a pattern using the named slots above
    pub fn new(
        kind: GrammarKind,
        pattern: &str,
        trim_colons: bool,
        exposes_ids: bool,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            kind,
            pattern: Regex::new(pattern)?,
            trim_colons,
            exposes_ids,
        })
    }

    /// Build a record if the line follows this grammar
    pub fn extract(&self, line: &str) -> Option<LogRecord> {
        let caps = self.pattern.captures(line)?;

        let priority = caps
            .name("prio")
            .and_then(|m| m.as_str().chars().next())
            .and_then(Priority::from_letter)?;

        let mut tag = caps.name("tag").map_or("", |m| m.as_str());
        let mut message = caps.name("msg").map_or("", |m| m.as_str());
        if self.trim_colons {
            tag = tag.trim_end_matches(':');
            message = message.trim_start_matches([':', ' ']);
        }

        let mut record = LogRecord::new(priority, tag, message);
        if self.exposes_ids {
            record.timestamp = match (caps.name("date"), caps.name("time")) {
                (Some(date), Some(time)) => Some(format!("{} {}", date.as_str(), time.as_str())),
                _ => None,
            };
            record.thread_id = caps.name("tid").and_then(|m| m.as_str().parse().ok());
            record.process_id = caps.name("pid").and_then(|m| m.as_str().parse().ok());
        }

        Some(record)
    }
}

/// Finds the first grammar a raw line follows and extracts its record
#[derive(Clone, Debug)]
pub struct FormatDetector {
    grammars: Vec<LineGrammar>,
}

impl Default for FormatDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatDetector {
    /// Detector over the built-in grammars
    pub fn new() -> Self {
        Self {
            grammars: BUILTIN_GRAMMARS.clone(),
        }
    }

    /// Detector over a custom ordered grammar list
    pub fn with_grammars(grammars: Vec<LineGrammar>) -> Self {
        Self { grammars }
    }

    /// Parse a raw line, `None` when no grammar matches
    pub fn detect(&self, raw: &str) -> Option<LogRecord> {
        self.detect_with_kind(raw).map(|(_, record)| record)
    }

    /// Like [`detect`](Self::detect) but also reports the winning grammar
    pub fn detect_with_kind(&self, raw: &str) -> Option<(GrammarKind, LogRecord)> {
        let line = raw.trim_end_matches(['\r', '\n']);
        self.grammars
            .iter()
            .find_map(|grammar| grammar.extract(line).map(|record| (grammar.kind, record)))
    }
}
