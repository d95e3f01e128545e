use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use notify::event::{AccessKind, AccessMode, CreateKind, EventKind, ModifyKind, RenameMode};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::events::{ChangeKind, DirEvent};

/// Adapter over the platform file-change backend for one directory,
/// non-recursive. Raw events arrive over a channel and are translated to the
/// fixed content-change vocabulary; everything else (opens, reads, metadata
/// touches, subdirectory creation) is filtered here and never reaches the
/// watcher loop.
pub struct EventSource {
    // Keeps the OS watch registered; dropping it unwatches the directory.
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    dir: PathBuf,
    queued: VecDeque<DirEvent>,
}

impl EventSource {
    /// Registers the watch. Fails synchronously when the directory is
    /// missing, not a directory, or cannot be watched.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let dir = dir
            .canonicalize()
            .with_context(|| format!("Failed to resolve watch directory {}", dir.display()))?;
        if !dir.is_dir() {
            anyhow::bail!("Watch path {} is not a directory", dir.display());
        }

        let (tx, rx) = crossbeam_channel::unbounded();
        let mut watcher = notify::recommended_watcher(move |result| {
            let _ = tx.send(result);
        })
        .context("Failed to create file system watcher")?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory {}", dir.display()))?;

        Ok(Self {
            _watcher: watcher,
            rx,
            dir,
            queued: VecDeque::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the next translated event, or `None` once `poll_timeout` has
    /// elapsed with no qualifying activity. Raw events that translate to
    /// nothing are skipped without extending the deadline. Backend errors
    /// surface as `Err` and mean the watch is no longer reliable.
    pub fn next_timeout(&mut self, poll_timeout: Duration) -> Result<Option<DirEvent>> {
        if let Some(event) = self.queued.pop_front() {
            return Ok(Some(event));
        }

        let deadline = Instant::now() + poll_timeout;
        loop {
            match self.rx.recv_deadline(deadline) {
                Ok(Ok(raw)) => {
                    let mut translated = translate_event(&self.dir, &raw);
                    if translated.is_empty() {
                        continue;
                    }
                    let first = translated.remove(0);
                    self.queued.extend(translated);
                    return Ok(Some(first));
                }
                Ok(Err(err)) => {
                    return Err(err).context("File system watch reported an error");
                }
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => {
                    anyhow::bail!("File system watch channel closed unexpectedly")
                }
            }
        }
    }
}

/// Maps one raw backend event onto zero or more `DirEvent`s.
///
/// Close-after-write, data modification, and file creation all count as
/// `write-close`: backends without close-write semantics report plain
/// modifies/creates, and on inotify the extra pair collapses in the dedup
/// set. A rename carrying both names becomes two events, old name out and
/// new name in; a rename with unknown direction is resolved by probing
/// whether the path still exists. Removal of the watched directory itself
/// yields `directory-deleted` with an empty filename.
pub fn translate_event(dir: &Path, event: &Event) -> Vec<DirEvent> {
    match &event.kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => {
            named_events(dir, event, ChangeKind::WriteClose)
        }
        EventKind::Modify(ModifyKind::Data(_))
        | EventKind::Modify(ModifyKind::Any)
        | EventKind::Modify(ModifyKind::Other) => named_events(dir, event, ChangeKind::WriteClose),
        EventKind::Create(kind) if !matches!(kind, CreateKind::Folder) => {
            named_events(dir, event, ChangeKind::WriteClose)
        }
        EventKind::Modify(ModifyKind::Name(mode)) => translate_rename(dir, event, *mode),
        EventKind::Remove(_) => event
            .paths
            .iter()
            .map(|path| {
                if path == dir {
                    DirEvent::new(vec![ChangeKind::DirectoryDeleted], String::new())
                } else {
                    DirEvent::new(vec![ChangeKind::Delete], entry_name(dir, path))
                }
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn translate_rename(dir: &Path, event: &Event, mode: RenameMode) -> Vec<DirEvent> {
    match mode {
        RenameMode::From => named_events(dir, event, ChangeKind::MoveOut),
        RenameMode::To => named_events(dir, event, ChangeKind::MoveIn),
        RenameMode::Both if event.paths.len() == 2 => vec![
            DirEvent::new(vec![ChangeKind::MoveOut], entry_name(dir, &event.paths[0])),
            DirEvent::new(vec![ChangeKind::MoveIn], entry_name(dir, &event.paths[1])),
        ],
        // Direction unknown: a path that still exists moved in, one that is
        // gone moved out.
        _ => event
            .paths
            .iter()
            .map(|path| {
                let kind = if path.exists() {
                    ChangeKind::MoveIn
                } else {
                    ChangeKind::MoveOut
                };
                DirEvent::new(vec![kind], entry_name(dir, path))
            })
            .collect(),
    }
}

fn named_events(dir: &Path, event: &Event, kind: ChangeKind) -> Vec<DirEvent> {
    event
        .paths
        .iter()
        .map(|path| DirEvent::new(vec![kind], entry_name(dir, path)))
        .collect()
}

fn entry_name(dir: &Path, path: &Path) -> String {
    if path == dir {
        return String::new();
    }
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_close_write_becomes_write_close() {
        let raw = event(
            EventKind::Access(AccessKind::Close(AccessMode::Write)),
            "/watched/a.txt",
        );
        let out = translate_event(Path::new("/watched"), &raw);
        assert_eq!(
            out,
            vec![DirEvent::new(vec![ChangeKind::WriteClose], "a.txt")]
        );
    }

    #[test]
    fn test_data_modify_and_create_also_become_write_close() {
        let dir = Path::new("/watched");

        let modify = event(
            EventKind::Modify(ModifyKind::Data(notify::event::DataChange::Any)),
            "/watched/a.txt",
        );
        assert_eq!(
            translate_event(dir, &modify),
            vec![DirEvent::new(vec![ChangeKind::WriteClose], "a.txt")]
        );

        let create = event(EventKind::Create(CreateKind::File), "/watched/a.txt");
        assert_eq!(
            translate_event(dir, &create),
            vec![DirEvent::new(vec![ChangeKind::WriteClose], "a.txt")]
        );
    }

    #[test]
    fn test_metadata_and_opens_are_dropped() {
        let dir = Path::new("/watched");

        let attrib = event(
            EventKind::Modify(ModifyKind::Metadata(notify::event::MetadataKind::Any)),
            "/watched/a.txt",
        );
        assert!(translate_event(dir, &attrib).is_empty());

        let open = event(
            EventKind::Access(AccessKind::Open(AccessMode::Any)),
            "/watched/a.txt",
        );
        assert!(translate_event(dir, &open).is_empty());
    }

    #[test]
    fn test_subdirectory_creation_is_dropped() {
        let raw = event(EventKind::Create(CreateKind::Folder), "/watched/subdir");
        assert!(translate_event(Path::new("/watched"), &raw).is_empty());
    }

    #[test]
    fn test_rename_from_and_to() {
        let dir = Path::new("/watched");

        let from = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            "/watched/old.txt",
        );
        assert_eq!(
            translate_event(dir, &from),
            vec![DirEvent::new(vec![ChangeKind::MoveOut], "old.txt")]
        );

        let to = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            "/watched/new.txt",
        );
        assert_eq!(
            translate_event(dir, &to),
            vec![DirEvent::new(vec![ChangeKind::MoveIn], "new.txt")]
        );
    }

    #[test]
    fn test_rename_both_yields_out_then_in() {
        let raw = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(PathBuf::from("/watched/old.txt"))
            .add_path(PathBuf::from("/watched/new.txt"));

        let out = translate_event(Path::new("/watched"), &raw);
        assert_eq!(
            out,
            vec![
                DirEvent::new(vec![ChangeKind::MoveOut], "old.txt"),
                DirEvent::new(vec![ChangeKind::MoveIn], "new.txt"),
            ]
        );
    }

    #[test]
    fn test_rename_with_unknown_direction_probes_existence() {
        let tmp = tempfile::tempdir().unwrap();
        let present = tmp.path().join("present.txt");
        std::fs::write(&present, "x").unwrap();

        let raw = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Any)))
            .add_path(present.clone());
        assert_eq!(
            translate_event(tmp.path(), &raw),
            vec![DirEvent::new(vec![ChangeKind::MoveIn], "present.txt")]
        );

        let raw = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Any)))
            .add_path(tmp.path().join("gone.txt"));
        assert_eq!(
            translate_event(tmp.path(), &raw),
            vec![DirEvent::new(vec![ChangeKind::MoveOut], "gone.txt")]
        );
    }

    #[test]
    fn test_remove_inside_dir_is_delete() {
        let raw = event(
            EventKind::Remove(notify::event::RemoveKind::File),
            "/watched/a.txt",
        );
        assert_eq!(
            translate_event(Path::new("/watched"), &raw),
            vec![DirEvent::new(vec![ChangeKind::Delete], "a.txt")]
        );
    }

    #[test]
    fn test_remove_of_watched_dir_has_empty_name() {
        let raw = event(
            EventKind::Remove(notify::event::RemoveKind::Folder),
            "/watched",
        );
        let out = translate_event(Path::new("/watched"), &raw);
        assert_eq!(
            out,
            vec![DirEvent::new(vec![ChangeKind::DirectoryDeleted], "")]
        );
        assert!(out[0].name.is_empty());
    }
}
