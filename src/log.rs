use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warning => write!(f, "warning"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

/// Structured log stream for one import run. Entries are kept in order for
/// the host to drain; warnings and errors are mirrored to stderr so headless
/// runs still surface problems.
#[derive(Debug, Default)]
pub struct ImportLog {
    entries: Vec<LogEntry>,
    warnings: usize,
    errors: usize,
    mirror_to_stderr: bool,
}

impl ImportLog {
    pub fn new() -> Self {
        Self { mirror_to_stderr: true, ..Self::default() }
    }

    /// No stderr mirroring; used by tests.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings += 1;
        self.push(LogLevel::Warning, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors += 1;
        self.push(LogLevel::Error, message.into());
    }

    fn push(&mut self, level: LogLevel, message: String) {
        if self.mirror_to_stderr && level != LogLevel::Info {
            eprintln!("[import] {level}: {message}");
        }
        self.entries.push(LogEntry { level, message });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warnings_matching(&self, needle: &str) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.level == LogLevel::Warning && entry.message.contains(needle))
            .count()
    }

    pub fn summary(&self) -> String {
        format!(
            "Import complete: {} warning(s), {} error(s)",
            self.warnings, self.errors
        )
    }
}
