use unicode_width::UnicodeWidthChar;

/// Width of the `[P] ` separator between the tag column and the message
pub const GUTTER_WIDTH: usize = 4;

/// Reflows messages into fixed-width blocks that line up under the message column
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineWrapper {
    /// Message column width, `None` when no terminal is attached
    content_width: Option<usize>,

    /// Indent of continuation lines
    indent: usize,
}

impl LineWrapper {
    /// Derive the message column from the terminal width and tag column
    ///
    /// A terminal narrower than the tag column still gets a one column message area.
    pub fn new(terminal_width: Option<u16>, tag_length: usize) -> Self {
        let indent = tag_length + GUTTER_WIDTH;
        Self {
            content_width: terminal_width.map(|cols| usize::from(cols).saturating_sub(indent).max(1)),
            indent,
        }
    }

    /// Use an explicit message column width
    pub fn with_content_width(content_width: Option<usize>, indent: usize) -> Self {
        Self {
            content_width: content_width.map(|w| w.max(1)),
            indent,
        }
    }

    pub fn content_width(&self) -> Option<usize> {
        self.content_width
    }

    /// Split a message into lines of exactly `content_width` columns
    ///
    /// Chunks break at column boundaries, not words. The last chunk is padded
    /// with spaces. Tabs count as a single space, and a character wider than
    /// the column becomes `?`. Without a width the message passes through unchanged.
    pub fn layout(&self, message: &str) -> Vec<String> {
        let Some(width) = self.content_width else {
            return vec![message.to_string()];
        };

        let mut lines = Vec::new();
        let mut current = String::with_capacity(width);
        let mut used = 0;

        for c in message.chars() {
            let c = if c == '\t' { ' ' } else { c };
            // A character wider than the whole column cannot be placed
            let (c, w) = match c.width().unwrap_or(0) {
                w if w > width => ('?', 1),
                w => (c, w),
            };
            if used + w > width && used > 0 {
                lines.push(pad(current, used, width));
                current = String::with_capacity(width);
                used = 0;
            }
            current.push(c);
            used += w;
        }
        lines.push(pad(current, used, width));

        lines
    }

    /// Lay out a message and join the block, indenting continuation lines
    pub fn render(&self, message: &str) -> String {
        let separator = format!("\n{}", " ".repeat(self.indent));
        self.layout(message).join(&separator)
    }
}

fn pad(mut line: String, used: usize, width: usize) -> String {
    line.extend(std::iter::repeat_n(' ', width.saturating_sub(used)));
    line
}
