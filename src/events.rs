use std::fmt;

use serde::{Deserialize, Serialize};

/// Content-affecting change kinds reported by the watcher.
///
/// The string labels are stable: they appear in JSON reports and are matched
/// on by consumers, so variants serialize to the same kebab-case names that
/// `label()` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    WriteClose,
    MoveIn,
    MoveOut,
    Delete,
    DirectoryDeleted,
}

impl ChangeKind {
    pub fn label(&self) -> &'static str {
        match self {
            ChangeKind::WriteClose => "write-close",
            ChangeKind::MoveIn => "move-in",
            ChangeKind::MoveOut => "move-out",
            ChangeKind::Delete => "delete",
            ChangeKind::DirectoryDeleted => "directory-deleted",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One deduplicated `(kind, filename)` pair delivered to flush callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileChange {
    pub kind: ChangeKind,
    pub name: String,
}

impl FileChange {
    pub fn new(kind: ChangeKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for FileChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// A single observation from the event source: the kind labels attached to
/// one filename. An empty `name` marks a directory-level event that is
/// observed for housekeeping only and never becomes a pending operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEvent {
    pub kinds: Vec<ChangeKind>,
    pub name: String,
}

impl DirEvent {
    pub fn new(kinds: Vec<ChangeKind>, name: impl Into<String>) -> Self {
        Self {
            kinds,
            name: name.into(),
        }
    }
}
