//! Command line and config file settings
//!
//! Settings come from `~/.adbscope/config.toml` (or `--config`), with command
//! line flags taking precedence.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use adbscope_types::{DEFAULT_MIN_PRIORITY, DEFAULT_PRIORITIES, DEFAULT_TAG_LENGTH, FilterConfig};

/// Adbscope - filter and colorize Android logcat output
#[derive(Parser, Debug, Default)]
#[command(name = "adbscope")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Maximum tag column width
    #[arg(short = 'l', long, value_name = "COLUMNS")]
    pub tag_length: Option<usize>,

    /// Process or package name filter (`*` matches anything)
    ///
    /// Restarts are detected from ActivityManager lines naming the process.
    #[arg(short, long, value_name = "NAME")]
    pub process: Option<String>,

    /// Tag filter (`*` matches anything)
    #[arg(short, long, value_name = "TAG")]
    pub tag: Option<String>,

    /// Highlight a tag, process or package name
    #[arg(short = 'H', long, value_name = "NAME")]
    pub highlight: Option<String>,

    /// Priority filter, any of VDIWEF
    #[arg(long, value_name = "LETTERS")]
    pub prio: Option<String>,

    /// Minimum priority level
    #[arg(long, value_name = "LETTER")]
    pub min_prio: Option<String>,

    /// Also write the log to a file
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Regex filter on the log message
    #[arg(short, long, value_name = "REGEX")]
    pub grep: Option<String>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Do not print to stdout
    #[arg(long)]
    pub no_stdout: bool,

    /// Case sensitive filters
    #[arg(long)]
    pub case_sensitive: bool,

    /// Input: `adb`, `stdin` (or `-`), or a file path
    #[arg(short, long, value_name = "INPUT")]
    pub input: Option<String>,

    /// Device serial when several devices are attached
    #[arg(short = 's', long, value_name = "SERIAL")]
    pub device: Option<String>,

    /// Config file (defaults to ~/.adbscope/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Config file contents; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub tag_length: Option<usize>,
    pub process: Option<String>,
    pub tag: Option<String>,
    pub highlight: Option<String>,
    pub prio: Option<String>,
    pub min_prio: Option<String>,
    pub file: Option<PathBuf>,
    pub grep: Option<String>,
    pub color: Option<bool>,
    pub stdout: Option<bool>,
    pub case_sensitive: Option<bool>,
    pub input: Option<String>,
    pub device: Option<String>,
}

impl FileConfig {
    /// Parse config file contents
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load the explicit config file, or the default one if it exists
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file '{}'", path.display()))?;

        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }
}

/// Default config file location
fn default_config_path() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    Some(home.join(".adbscope").join("config.toml"))
}

/// Where raw log lines come from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputSource {
    /// Live device through `adb logcat`
    Adb,
    Stdin,
    File(PathBuf),
}

impl From<&str> for InputSource {
    fn from(s: &str) -> Self {
        match s {
            "adb" => Self::Adb,
            "stdin" | "-" => Self::Stdin,
            path => Self::File(PathBuf::from(path)),
        }
    }
}

/// Fully merged settings
#[derive(Clone, Debug)]
pub struct Settings {
    pub filter: FilterConfig,
    pub input: InputSource,
    pub device: Option<String>,
    pub output_file: Option<PathBuf>,
    pub stdout: bool,
}

impl Settings {
    /// Load the config file and apply command line overrides
    pub fn load(args: Args) -> Result<Self> {
        let file = FileConfig::load(args.config.as_deref())?;
        Ok(Self::merge(args, file))
    }

    /// Command line values win over config file values
    pub fn merge(args: Args, file: FileConfig) -> Self {
        let filter = FilterConfig {
            tag_length: args
                .tag_length
                .or(file.tag_length)
                .unwrap_or(DEFAULT_TAG_LENGTH),
            process: args.process.or(file.process),
            tag: args.tag.or(file.tag),
            highlight: args.highlight.or(file.highlight),
            priorities: args
                .prio
                .or(file.prio)
                .unwrap_or_else(|| DEFAULT_PRIORITIES.to_string()),
            min_priority: args
                .min_prio
                .or(file.min_prio)
                .unwrap_or_else(|| DEFAULT_MIN_PRIORITY.to_string()),
            grep: args.grep.or(file.grep),
            case_sensitive: args.case_sensitive || file.case_sensitive.unwrap_or(false),
            color: !args.no_color && file.color.unwrap_or(true),
        };

        let input = args
            .input
            .or(file.input)
            .map(|s| InputSource::from(s.as_str()))
            .unwrap_or(InputSource::Adb);

        Self {
            filter,
            input,
            device: args.device.or(file.device),
            output_file: args.file.or(file.file),
            stdout: !args.no_stdout && file.stdout.unwrap_or(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("adbscope").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::merge(args(&[]), FileConfig::default());
        assert_eq!(settings.filter, FilterConfig::default());
        assert_eq!(settings.input, InputSource::Adb);
        assert!(settings.stdout);
        assert!(settings.output_file.is_none());
    }

    #[test]
    fn test_flags() {
        let settings = Settings::merge(
            args(&[
                "-p", "com.foo", "-t", "Net*", "-H", "Camera", "--prio", "WEF", "--min-prio", "E",
                "-g", "fail", "-l", "20", "--no-color", "--case-sensitive", "-i", "-", "-s",
                "emulator-5554", "-f", "out.log",
            ]),
            FileConfig::default(),
        );
        let filter = &settings.filter;
        assert_eq!(filter.process.as_deref(), Some("com.foo"));
        assert_eq!(filter.tag.as_deref(), Some("Net*"));
        assert_eq!(filter.highlight.as_deref(), Some("Camera"));
        assert_eq!(filter.priorities, "WEF");
        assert_eq!(filter.min_priority, "E");
        assert_eq!(filter.grep.as_deref(), Some("fail"));
        assert_eq!(filter.tag_length, 20);
        assert!(!filter.color);
        assert!(filter.case_sensitive);
        assert_eq!(settings.input, InputSource::Stdin);
        assert_eq!(settings.device.as_deref(), Some("emulator-5554"));
        assert_eq!(settings.output_file, Some(PathBuf::from("out.log")));
    }

    #[test]
    fn test_command_line_overrides_file() {
        let file = FileConfig::parse(
            r#"
            tag_length = 24
            process = "com.file"
            min_prio = "W"
            color = false
            stdout = false
            input = "/tmp/saved.log"
            "#,
        )
        .unwrap();
        let settings = Settings::merge(args(&["-p", "com.cli"]), file);
        assert_eq!(settings.filter.process.as_deref(), Some("com.cli"));
        assert_eq!(settings.filter.tag_length, 24);
        assert_eq!(settings.filter.min_priority, "W");
        assert!(!settings.filter.color);
        assert!(!settings.stdout);
        assert_eq!(settings.input, InputSource::File(PathBuf::from("/tmp/saved.log")));
    }

    #[test]
    fn test_unknown_config_key_is_rejected() {
        assert!(FileConfig::parse("colour = true").is_err());
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let missing = Path::new("/nonexistent/adbscope/config.toml");
        assert!(FileConfig::load(Some(missing)).is_err());
    }

    #[test]
    fn test_input_source() {
        assert_eq!(InputSource::from("adb"), InputSource::Adb);
        assert_eq!(InputSource::from("stdin"), InputSource::Stdin);
        assert_eq!(InputSource::from("-"), InputSource::Stdin);
        assert_eq!(InputSource::from("log.txt"), InputSource::File(PathBuf::from("log.txt")));
    }
}
