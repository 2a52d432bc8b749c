use std::collections::HashSet;
use std::future::Future;

use adbscope_types::{FilterConfig, LogRecord};

use crate::error::{FilterError, ProcessListError};
use crate::filter::NamePattern;

/// Tag of the system service that announces process starts
pub const ACTIVITY_MANAGER_TAG: &str = "ActivityManager";

/// Column count of a well-formed process table row
const PS_COLUMNS: usize = 9;
/// Column holding the process id
const PS_PID_COLUMN: usize = 1;
/// Column holding the command name
const PS_NAME_COLUMN: usize = 8;

/// Source of the device's process table
///
/// Implementations return the raw line-oriented table (`ps` output), header
/// row included.
pub trait ProcessSource {
    fn process_table(&self) -> impl Future<Output = Result<String, ProcessListError>> + Send;
}

/// One row of the process table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
}

/// Parse `ps` output, skipping the header and any malformed rows
pub fn parse_process_table(table: &str) -> Vec<ProcessEntry> {
    table
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != PS_COLUMNS {
                return None;
            }
            let pid = fields[PS_PID_COLUMN].parse().ok()?;
            Some(ProcessEntry {
                pid,
                name: fields[PS_NAME_COLUMN].to_string(),
            })
        })
        .collect()
}

/// Process ids currently believed to belong to the filtered and highlighted processes
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetSet {
    process: HashSet<u32>,
    highlight: HashSet<u32>,
}

impl TargetSet {
    /// Membership in either subset
    pub fn contains(&self, pid: u32) -> bool {
        self.process.contains(&pid) || self.highlight.contains(&pid)
    }

    /// Membership in the highlight subset
    pub fn is_highlighted(&self, pid: u32) -> bool {
        self.highlight.contains(&pid)
    }

    pub fn process_ids(&self) -> &HashSet<u32> {
        &self.process
    }

    pub fn highlight_ids(&self) -> &HashSet<u32> {
        &self.highlight
    }

    pub fn is_empty(&self) -> bool {
        self.process.is_empty() && self.highlight.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn insert_process(&mut self, pid: u32) {
        self.process.insert(pid);
    }

    #[cfg(test)]
    pub(crate) fn insert_highlight(&mut self, pid: u32) {
        self.highlight.insert(pid);
    }
}

/// Resolves process name patterns to live process ids
///
/// Owns the [`TargetSet`]; it only changes when [`refresh`](Self::refresh)
/// runs, which the session does inline before reading the next line.
pub struct ProcessRegistry<S> {
    /// Process table collaborator
    source: S,

    /// Process filter glob
    process: Option<NamePattern>,

    /// Highlight glob (also matched against process names)
    highlight: Option<NamePattern>,

    /// Case rule for the restart trigger
    case_sensitive: bool,

    /// Current resolution
    targets: TargetSet,
}

impl<S: ProcessSource> ProcessRegistry<S> {
    /// Create a registry with an empty target set
    pub fn new(config: &FilterConfig, source: S) -> Result<Self, FilterError> {
        Ok(Self {
            source,
            process: NamePattern::from_config(
                "process",
                config.process.as_deref(),
                config.case_sensitive,
            )?,
            highlight: NamePattern::from_config(
                "highlight",
                config.highlight.as_deref(),
                config.case_sensitive,
            )?,
            case_sensitive: config.case_sensitive,
            targets: TargetSet::default(),
        })
    }

    pub fn targets(&self) -> &TargetSet {
        &self.targets
    }

    /// Check if any name pattern is tracked
    pub fn is_tracking(&self) -> bool {
        self.process.is_some() || self.highlight.is_some()
    }

    /// Query the process table and return the ids whose name matches
    ///
    /// An unavailable process list yields an empty set.
    pub async fn resolve(&self, pattern: &NamePattern) -> HashSet<u32> {
        match self.source.process_table().await {
            Ok(table) => select(&parse_process_table(&table), pattern),
            Err(e) => {
                tracing::warn!(error = %e, pattern = pattern.as_str(), "process list unavailable");
                HashSet::new()
            }
        }
    }

    /// Recompute the target set for every tracked pattern from one snapshot
    pub async fn refresh(&mut self) {
        if !self.is_tracking() {
            return;
        }

        let entries = match self.source.process_table().await {
            Ok(table) => parse_process_table(&table),
            Err(e) => {
                tracing::warn!(error = %e, "process list unavailable, clearing tracked processes");
                Vec::new()
            }
        };

        self.targets = TargetSet {
            process: self
                .process
                .as_ref()
                .map(|p| select(&entries, p))
                .unwrap_or_default(),
            highlight: self
                .highlight
                .as_ref()
                .map(|p| select(&entries, p))
                .unwrap_or_default(),
        };

        tracing::debug!(
            process = self.targets.process.len(),
            highlight = self.targets.highlight.len(),
            "resolved tracked processes"
        );
    }

    /// Check if a record announces a restart of a tracked process
    pub fn should_refresh(&self, record: &LogRecord) -> bool {
        if record.tag != ACTIVITY_MANAGER_TAG {
            return false;
        }

        let message = if self.case_sensitive {
            record.message.clone()
        } else {
            record.message.to_lowercase()
        };

        [&self.process, &self.highlight]
            .into_iter()
            .flatten()
            .any(|pattern| {
                if self.case_sensitive {
                    mentions(&message, pattern.as_str())
                } else {
                    mentions(&message, &pattern.as_str().to_lowercase())
                }
            })
    }
}

/// Check if the literal parts of a glob appear in the message, in order
fn mentions(message: &str, glob: &str) -> bool {
    let mut rest = message;
    for part in glob.split('*').filter(|p| !p.is_empty()) {
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    true
}

fn select(entries: &[ProcessEntry], pattern: &NamePattern) -> HashSet<u32> {
    entries
        .iter()
        .filter(|e| pattern.matches(&e.name))
        .map(|e| e.pid)
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use adbscope_types::Priority;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) const PS_HEADER: &str =
        "USER           PID  PPID     VSZ    RSS WCHAN            ADDR S NAME";

    pub(crate) fn ps_row(pid: u32, name: &str) -> String {
        format!("u0_a123      {pid}   612 1234567  89012 0                   0 S {name}")
    }

    /// In-memory process table that can be swapped between refreshes
    #[derive(Clone, Default)]
    pub(crate) struct FakeProcessSource {
        pub(crate) table: Arc<Mutex<Option<String>>>,
        pub(crate) calls: Arc<AtomicUsize>,
    }

    impl FakeProcessSource {
        pub(crate) fn with_rows(rows: &[(u32, &str)]) -> Self {
            let source = Self::default();
            source.set_rows(rows);
            source
        }

        pub(crate) fn set_rows(&self, rows: &[(u32, &str)]) {
            let mut table = vec![PS_HEADER.to_string()];
            table.extend(rows.iter().map(|(pid, name)| ps_row(*pid, name)));
            *self.table.lock().unwrap() = Some(table.join("\n"));
        }

        pub(crate) fn set_unavailable(&self) {
            *self.table.lock().unwrap() = None;
        }
    }

    impl ProcessSource for FakeProcessSource {
        async fn process_table(&self) -> Result<String, ProcessListError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.table
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ProcessListError::Failed("device offline".to_string()))
        }
    }

    fn config(process: Option<&str>, highlight: Option<&str>) -> FilterConfig {
        FilterConfig {
            process: process.map(String::from),
            highlight: highlight.map(String::from),
            ..FilterConfig::default()
        }
    }

    #[test]
    fn test_parse_process_table() {
        let table = format!(
            "{PS_HEADER}\n{}\n{}\nshort row\n{}\n",
            ps_row(1, "init"),
            ps_row(456, "com.foo"),
            "root 12 2 0 0 kthreadd 0 S kworker/0:0 extra"
        );
        let entries = parse_process_table(&table);
        assert_eq!(
            entries,
            vec![
                ProcessEntry { pid: 1, name: "init".to_string() },
                ProcessEntry { pid: 456, name: "com.foo".to_string() },
            ]
        );
    }

    #[test]
    fn test_parse_process_table_skips_header_only() {
        assert!(parse_process_table(PS_HEADER).is_empty());
        assert!(parse_process_table("").is_empty());
    }

    #[tokio::test]
    async fn test_refresh_resolves_both_patterns() {
        let source = FakeProcessSource::with_rows(&[
            (100, "com.foo"),
            (101, "com.foo:remote"),
            (200, "com.bar"),
            (300, "system_server"),
        ]);
        let mut registry =
            ProcessRegistry::new(&config(Some("com.foo*"), Some("COM.BAR")), source.clone())
                .unwrap();
        assert!(registry.targets().is_empty());

        registry.refresh().await;
        let targets = registry.targets();
        assert_eq!(targets.process_ids(), &HashSet::from([100, 101]));
        assert_eq!(targets.highlight_ids(), &HashSet::from([200]));
        assert!(targets.contains(200));
        assert!(!targets.contains(300));
        assert!(targets.is_highlighted(200));
        assert!(!targets.is_highlighted(100));
        // One snapshot per refresh
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_case_sensitive() {
        let source = FakeProcessSource::with_rows(&[(1, "com.Foo"), (2, "com.foo")]);
        let cfg = FilterConfig {
            case_sensitive: true,
            ..config(Some("com.foo"), None)
        };
        let mut registry = ProcessRegistry::new(&cfg, source).unwrap();
        registry.refresh().await;
        assert_eq!(registry.targets().process_ids(), &HashSet::from([2]));
    }

    #[tokio::test]
    async fn test_refresh_failure_empties_set() {
        let source = FakeProcessSource::with_rows(&[(456, "com.foo")]);
        let mut registry =
            ProcessRegistry::new(&config(Some("com.foo"), None), source.clone()).unwrap();
        registry.refresh().await;
        assert!(registry.targets().contains(456));

        source.set_unavailable();
        registry.refresh().await;
        assert!(registry.targets().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_single_pattern() {
        let source = FakeProcessSource::with_rows(&[(7, "surfaceflinger"), (8, "zygote")]);
        let registry = ProcessRegistry::new(&config(None, None), source.clone()).unwrap();
        let pattern = NamePattern::new("surface*", false).unwrap();
        assert_eq!(registry.resolve(&pattern).await, HashSet::from([7]));

        source.set_unavailable();
        assert!(registry.resolve(&pattern).await.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_without_patterns_skips_query() {
        let source = FakeProcessSource::with_rows(&[(1, "init")]);
        let mut registry = ProcessRegistry::new(&config(None, None), source.clone()).unwrap();
        assert!(!registry.is_tracking());
        registry.refresh().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_should_refresh() {
        let registry = ProcessRegistry::new(
            &config(Some("com.foo"), Some("com.bar")),
            FakeProcessSource::default(),
        )
        .unwrap();

        let start = LogRecord::new(Priority::Info, "ActivityManager", "Start proc com.foo for activity");
        assert!(registry.should_refresh(&start));

        let highlight = LogRecord::new(Priority::Info, "ActivityManager", "Killing 123:COM.BAR/u0a1");
        assert!(registry.should_refresh(&highlight));

        let other_tag = LogRecord::new(Priority::Info, "ActivityManagerX", "Start proc com.foo");
        assert!(!registry.should_refresh(&other_tag));

        let unrelated = LogRecord::new(Priority::Info, "ActivityManager", "Start proc com.baz");
        assert!(!registry.should_refresh(&unrelated));
    }

    #[test]
    fn test_should_refresh_with_wildcards() {
        let registry = ProcessRegistry::new(
            &config(Some("com.foo*"), Some("*.bar.*")),
            FakeProcessSource::default(),
        )
        .unwrap();

        let start = LogRecord::new(Priority::Info, "ActivityManager", "Start proc 456:com.foo/u0a1");
        assert!(registry.should_refresh(&start));

        let bar = LogRecord::new(Priority::Info, "ActivityManager", "Start proc 9:org.bar.app/u0a2");
        assert!(registry.should_refresh(&bar));

        let unrelated = LogRecord::new(Priority::Info, "ActivityManager", "Start proc 7:com.baz/u0a3");
        assert!(!registry.should_refresh(&unrelated));
    }

    #[test]
    fn test_mentions_keeps_segment_order() {
        assert!(mentions("start com.foo:remote", "com.*:remote"));
        assert!(!mentions(":remote com.foo", "com.*:remote"));
        assert!(mentions("anything", "*"));
    }

    #[test]
    fn test_should_refresh_case_sensitive() {
        let cfg = FilterConfig {
            case_sensitive: true,
            ..config(Some("com.foo"), None)
        };
        let registry = ProcessRegistry::new(&cfg, FakeProcessSource::default()).unwrap();
        let upper = LogRecord::new(Priority::Info, "ActivityManager", "Start proc COM.FOO");
        assert!(!registry.should_refresh(&upper));
    }
}
