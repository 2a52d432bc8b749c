use crossterm::style::{Color, ResetColor, SetBackgroundColor, SetForegroundColor};
use std::fs::File;
use std::io::{self, LineWriter, Stdout, Write};
use unicode_width::UnicodeWidthChar;

use adbscope_types::{Decoration, LogRecord, Priority};

use crate::error::SinkError;
use crate::wrap::LineWrapper;

/// Console and file renditions of one accepted record
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormattedLine {
    /// Decorated and wrapped
    pub console: String,

    /// Plain and unwrapped
    pub file: String,
}

/// Renders records into the tag column layout
#[derive(Clone, Debug)]
pub struct LineFormatter {
    tag_length: usize,
    wrapper: LineWrapper,
}

impl LineFormatter {
    pub fn new(tag_length: usize, terminal_width: Option<u16>) -> Self {
        Self {
            tag_length,
            wrapper: LineWrapper::new(terminal_width, tag_length),
        }
    }

    pub fn wrapper(&self) -> &LineWrapper {
        &self.wrapper
    }

    pub fn format(&self, record: &LogRecord, decoration: Decoration) -> FormattedLine {
        let tag = fit_tag(&record.tag, self.tag_length);
        let priority = record.priority;

        let message = self.wrapper.render(&record.message);
        let console = match decoration_prefix(decoration, priority) {
            Some(prefix) => format!("{prefix}{tag}[{priority}] {message}{}", ResetColor),
            None => format!("{tag}[{priority}] {message}"),
        };

        FormattedLine {
            console,
            file: format!("{tag}[{priority}] {}", record.message),
        }
    }
}

/// ANSI prefix for a decoration
fn decoration_prefix(decoration: Decoration, priority: Priority) -> Option<String> {
    match decoration {
        Decoration::Highlight => Some(format!(
            "{}{}",
            SetBackgroundColor(priority.color()),
            SetForegroundColor(Color::Black)
        )),
        Decoration::PriorityColor => Some(SetForegroundColor(priority.color()).to_string()),
        Decoration::None => None,
    }
}

/// Truncate or pad a tag to exactly `width` display columns
fn fit_tag(tag: &str, width: usize) -> String {
    let mut fitted = String::with_capacity(width);
    let mut used = 0;
    for c in tag.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        fitted.push(c);
        used += w;
    }
    fitted.extend(std::iter::repeat_n(' ', width - used));
    fitted
}

/// Writes formatted lines to the console and/or an output file
///
/// A failing console is disabled with a warning; a failing file is fatal.
pub struct OutputSink<C: Write, F: Write> {
    console: Option<C>,
    file: Option<F>,
}

impl OutputSink<Stdout, LineWriter<File>> {
    /// Standard output plus an optional line-buffered file
    pub fn stdout(console: bool, file: Option<File>) -> Self {
        Self::new(console.then(io::stdout), file.map(LineWriter::new))
    }
}

impl<C: Write, F: Write> OutputSink<C, F> {
    pub fn new(console: Option<C>, file: Option<F>) -> Self {
        Self { console, file }
    }

    pub fn emit(&mut self, line: &FormattedLine) -> Result<(), SinkError> {
        let console_error = match self.console.as_mut() {
            Some(console) => writeln!(console, "{}", line.console).err(),
            None => None,
        };
        if let Some(e) = console_error {
            tracing::warn!(error = %e, "console output failed, disabling it");
            self.console = None;
        }

        if let Some(file) = self.file.as_mut() {
            writeln!(file, "{}", line.file).map_err(SinkError::File)?;
        }

        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), SinkError> {
        if let Some(console) = self.console.as_mut() {
            // Console output is best effort
            let _ = console.flush();
        }
        if let Some(file) = self.file.as_mut() {
            file.flush().map_err(SinkError::File)?;
        }
        Ok(())
    }

    pub fn console(&self) -> Option<&C> {
        self.console.as_ref()
    }

    pub fn file(&self) -> Option<&F> {
        self.file.as_ref()
    }
}
