//! Shared types for adbscope
//!
//! This crate contains data structures used across multiple adbscope crates.

use crossterm::style::Color;
use std::fmt;

// ============================================================================
// Log Types
// ============================================================================

/// Log severity level, ordered from least to most severe
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Verbose,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Priority {
    /// Every priority, lowest first
    pub const ALL: [Priority; 6] = [
        Self::Verbose,
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Error,
        Self::Fatal,
    ];

    /// Parse the single-letter logcat form (`V`, `D`, `I`, `W`, `E`, `F`)
    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            'V' => Some(Self::Verbose),
            'D' => Some(Self::Debug),
            'I' => Some(Self::Info),
            'W' => Some(Self::Warn),
            'E' => Some(Self::Error),
            'F' => Some(Self::Fatal),
            _ => None,
        }
    }

    /// Single-letter display form
    pub fn letter(&self) -> char {
        match self {
            Self::Verbose => 'V',
            Self::Debug => 'D',
            Self::Info => 'I',
            Self::Warn => 'W',
            Self::Error => 'E',
            Self::Fatal => 'F',
        }
    }

    /// Rank used by the minimum-priority threshold
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    /// Display color for this priority
    pub fn color(&self) -> Color {
        match self {
            Self::Verbose => Color::DarkGreen,
            Self::Debug => Color::DarkCyan,
            Self::Info => Color::DarkYellow,
            Self::Warn => Color::DarkBlue,
            Self::Error => Color::DarkRed,
            Self::Fatal => Color::DarkMagenta,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A single parsed log line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    /// Severity level
    pub priority: Priority,

    /// Log source tag
    pub tag: String,

    /// Free-form message text
    pub message: String,

    /// `MM-DD HH:MM:SS.mmm` timestamp (verbose grammar only)
    pub timestamp: Option<String>,

    /// Thread id (verbose grammar only)
    pub thread_id: Option<u32>,

    /// Process id (verbose grammar only)
    pub process_id: Option<u32>,
}

impl LogRecord {
    /// Create a record carrying only priority, tag and message
    pub fn new(priority: Priority, tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            priority,
            tag: tag.into(),
            message: message.into(),
            timestamp: None,
            thread_id: None,
            process_id: None,
        }
    }

    /// Attach a process id
    pub fn with_process_id(mut self, pid: u32) -> Self {
        self.process_id = Some(pid);
        self
    }
}

/// How an accepted record is decorated on the console
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decoration {
    /// Black text on the priority color
    Highlight,
    /// Text in the priority color
    PriorityColor,
    /// Plain text
    None,
}

// ============================================================================
// Filter Configuration
// ============================================================================

/// Default width of the tag column
pub const DEFAULT_TAG_LENGTH: usize = 30;

/// Default priority set (all of them)
pub const DEFAULT_PRIORITIES: &str = "VDIWEF";

/// Default minimum priority
pub const DEFAULT_MIN_PRIORITY: &str = "V";

/// User-supplied filter settings, read-only once the pipeline is built
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterConfig {
    /// Width of the tag column
    pub tag_length: usize,

    /// Process or package name glob
    pub process: Option<String>,

    /// Tag glob
    pub tag: Option<String>,

    /// Tag or process name glob to highlight
    pub highlight: Option<String>,

    /// Accepted priority letters
    pub priorities: String,

    /// Minimum priority letter
    pub min_priority: String,

    /// Regex applied to the message
    pub grep: Option<String>,

    /// Case sensitive matching for all patterns
    pub case_sensitive: bool,

    /// Colorize console output by priority
    pub color: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            tag_length: DEFAULT_TAG_LENGTH,
            process: None,
            tag: None,
            highlight: None,
            priorities: DEFAULT_PRIORITIES.to_string(),
            min_priority: DEFAULT_MIN_PRIORITY.to_string(),
            grep: None,
            case_sensitive: false,
            color: true,
        }
    }
}
