//! Log processing for adbscope
//!
//! This crate provides line grammar detection, the filter pipeline,
//! highlighting, width-aware wrapping, output sinks, process tracking and
//! the per-line session loop that ties them together.

mod error;
mod filter;
mod highlight;
mod parser;
mod registry;
mod session;
mod sink;
mod stream;
mod wrap;

pub use error::{FilterError, ProcessListError, SessionError, SinkError};
pub use filter::{CompiledFilter, FilterStage, NamePattern};
pub use highlight::Highlighter;
pub use parser::{FormatDetector, GrammarKind, LineGrammar};
pub use registry::{
    ACTIVITY_MANAGER_TAG, ProcessEntry, ProcessRegistry, ProcessSource, TargetSet,
    parse_process_table,
};
pub use session::{LineOutcome, RefreshRequest, Session, Step};
pub use sink::{FormattedLine, LineFormatter, OutputSink};
pub use stream::{DEFAULT_MAX_LINE_LENGTH, LineStream, LossyLinesCodec, line_stream};
pub use wrap::{GUTTER_WIDTH, LineWrapper};

// Re-export types used in our public API
pub use adbscope_types::{Decoration, FilterConfig, LogRecord, Priority};
