use futures::{Stream, StreamExt};
use std::io::{self, Write};

use adbscope_types::FilterConfig;

use crate::error::{FilterError, SessionError, SinkError};
use crate::filter::CompiledFilter;
use crate::highlight::Highlighter;
use crate::parser::FormatDetector;
use crate::registry::{ProcessRegistry, ProcessSource};
use crate::sink::{LineFormatter, OutputSink};

/// What happened to one raw line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineOutcome {
    /// No grammar matched
    Unmatched,
    /// Parsed but rejected by a filter stage
    Dropped,
    /// Written to the sink
    Emitted,
}

/// Ask the registry to re-resolve tracked processes before the next line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshRequest;

/// Result of the synchronous part of processing one line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step {
    pub outcome: LineOutcome,
    pub refresh: Option<RefreshRequest>,
}

/// One viewing session: detect, filter, decorate, wrap, emit
///
/// Lines are handled strictly one at a time. A refresh requested by a line
/// completes before the next line is read.
pub struct Session<S, C: Write, F: Write> {
    detector: FormatDetector,
    filter: CompiledFilter,
    highlighter: Highlighter,
    formatter: LineFormatter,
    registry: ProcessRegistry<S>,
    sink: OutputSink<C, F>,
}

impl<S: ProcessSource, C: Write, F: Write> Session<S, C, F> {
    pub fn new(
        config: &FilterConfig,
        terminal_width: Option<u16>,
        registry: ProcessRegistry<S>,
        sink: OutputSink<C, F>,
    ) -> Result<Self, FilterError> {
        Ok(Self {
            detector: FormatDetector::new(),
            filter: CompiledFilter::new(config)?,
            highlighter: Highlighter::new(config)?,
            formatter: LineFormatter::new(config.tag_length, terminal_width),
            registry,
            sink,
        })
    }

    /// Detect, filter and emit one raw line
    pub fn process_line(&mut self, raw: &str) -> Result<Step, SinkError> {
        let Some(record) = self.detector.detect(raw) else {
            if !raw.trim().is_empty() {
                tracing::warn!(line = raw, "line does not match any known log format");
            }
            return Ok(Step {
                outcome: LineOutcome::Unmatched,
                refresh: None,
            });
        };

        let targets = self.registry.targets();
        let outcome = if self.filter.accepts(&record, targets) {
            let decoration = self.highlighter.decoration_for(&record, targets);
            self.sink.emit(&self.formatter.format(&record, decoration))?;
            LineOutcome::Emitted
        } else {
            LineOutcome::Dropped
        };

        // Filtered records can still announce a restart
        let refresh = self
            .registry
            .should_refresh(&record)
            .then_some(RefreshRequest);

        Ok(Step { outcome, refresh })
    }

    /// Process one line and serve its refresh request, if any
    pub async fn handle_line(&mut self, raw: &str) -> Result<LineOutcome, SinkError> {
        let step = self.process_line(raw)?;
        if let Some(RefreshRequest) = step.refresh {
            tracing::debug!("tracked process restarted, re-resolving");
            self.registry.refresh().await;
        }
        Ok(step.outcome)
    }

    /// Resolve tracked processes now
    pub async fn refresh(&mut self) {
        self.registry.refresh().await;
    }

    /// Consume lines until the input ends
    pub async fn run<L>(&mut self, mut lines: L) -> Result<(), SessionError>
    where
        L: Stream<Item = io::Result<String>> + Unpin,
    {
        while let Some(line) = lines.next().await {
            let line = line.map_err(SessionError::Read)?;
            self.handle_line(&line).await?;
        }
        self.sink.flush()?;
        Ok(())
    }

    pub fn registry(&self) -> &ProcessRegistry<S> {
        &self.registry
    }

    pub fn sink(&self) -> &OutputSink<C, F> {
        &self.sink
    }
}
