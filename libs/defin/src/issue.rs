//! Problems found while importing a DEF file.

use std::fmt::{Display, Formatter};

use tracing::Level;

/// How serious an issue is.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq)]
pub enum Severity {
    /// An informational message.
    Info,
    /// A warning.
    #[default]
    Warning,
    /// An error. Counted toward the import's error total.
    Error,
}

impl Severity {
    /// Returns log level corresponding to this severity.
    #[inline]
    pub const fn as_tracing_level(&self) -> Level {
        match *self {
            Self::Info => Level::INFO,
            Self::Warning => Level::WARN,
            Self::Error => Level::ERROR,
        }
    }
}

/// The class of an issue, which fixes how the import reacts to it.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum IssueKind {
    /// A construct appeared before the design it belongs to. Always stops the parse.
    Structural,
    /// A DEF feature the database cannot represent. Stops the parse unless
    /// errors are tolerated.
    Unsupported,
    /// A name that does not resolve to a layer, via, rule, component or site.
    /// The construct is skipped.
    Referential,
    /// A malformed or duplicate value. The construct is skipped.
    Invalid,
    /// An update of an object that does not exist in the target block.
    /// The construct is skipped.
    ModeMismatch,
    /// Informational.
    Note,
}

impl IssueKind {
    /// The severity issues of this kind are logged with.
    pub fn severity(&self) -> Severity {
        match self {
            Self::Structural | Self::Referential | Self::Invalid => Severity::Error,
            Self::Unsupported | Self::ModeMismatch => Severity::Warning,
            Self::Note => Severity::Info,
        }
    }

    /// Whether issues of this kind count toward [`IssueLog::num_errors`].
    ///
    /// Unsupported features are logged as warnings but still counted.
    pub fn is_counted(&self) -> bool {
        matches!(
            self,
            Self::Structural | Self::Unsupported | Self::Referential | Self::Invalid
        )
    }
}

/// One problem reported during an import.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Issue {
    /// A stable message number, one per distinct message.
    pub id: u32,
    pub kind: IssueKind,
    pub message: String,
}

impl Issue {
    pub fn new(id: u32, kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            message: message.into(),
        }
    }

    /// Creates a new issue and logs it immediately.
    ///
    /// The log level is selected according to the kind's severity.
    pub fn new_and_log(id: u32, kind: IssueKind, message: impl Into<String>) -> Self {
        let result = Self::new(id, kind, message);
        match kind.severity() {
            Severity::Info => tracing::event!(Level::INFO, id, kind = ?kind, "{}", result.message),
            Severity::Warning => {
                tracing::event!(Level::WARN, id, kind = ?kind, "{}", result.message)
            }
            Severity::Error => {
                tracing::event!(Level::ERROR, id, kind = ?kind, "{}", result.message)
            }
        }
        result
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl Display for Issue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[DEF-{:04}] {}", self.id, self.message)
    }
}

/// The issues of one or more imports.
#[derive(Debug, Clone, Default)]
pub struct IssueLog {
    issues: Vec<Issue>,
    num_errors: usize,
    num_warnings: usize,
}

impl IssueLog {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the given issue to the log.
    pub fn add(&mut self, issue: Issue) {
        if issue.kind.is_counted() {
            self.num_errors += 1;
        }
        if issue.severity() == Severity::Warning {
            self.num_warnings += 1;
        }
        self.issues.push(issue);
    }

    /// Moves every issue of `other` into this log.
    pub fn append(&mut self, other: IssueLog) {
        self.num_errors += other.num_errors;
        self.num_warnings += other.num_warnings;
        self.issues.extend(other.issues);
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// The number of issues counted as errors.
    #[inline]
    pub fn num_errors(&self) -> usize {
        self.num_errors
    }

    #[inline]
    pub fn num_warnings(&self) -> usize {
        self.num_warnings
    }

    pub fn has_error(&self) -> bool {
        self.num_errors > 0
    }

    /// Whether an issue with message number `id` was reported.
    pub fn contains(&self, id: u32) -> bool {
        self.issues.iter().any(|i| i.id == id)
    }
}

impl IntoIterator for IssueLog {
    type Item = Issue;
    type IntoIter = std::vec::IntoIter<Issue>;
    fn into_iter(self) -> Self::IntoIter {
        self.issues.into_iter()
    }
}
