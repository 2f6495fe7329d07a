use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use notify::event::{AccessKind, AccessMode, ModifyKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};

/// Watches one directory (non-recursively) for files that were written,
/// created or removed.
///
/// Events are delivered by the platform notifier on a channel. A burst of
/// events is collected until the directory has been quiet for `debounce`, so
/// an editor's save produces a single rebuild.
pub struct Watcher {
    dir: PathBuf,
    debounce: Duration,
    ignored: BTreeSet<PathBuf>,
    events: Receiver<notify::Result<Event>>,
    // Dropping the notifier closes the channel.
    _notifier: RecommendedWatcher,
}

impl Watcher {
    pub fn new(dir: &Path, debounce: Duration) -> notify::Result<Self> {
        let dir = dir.canonicalize().map_err(notify::Error::io)?;
        let (tx, events) = mpsc::channel();
        let mut notifier = notify::recommended_watcher(tx)?;
        notifier.watch(&dir, RecursiveMode::NonRecursive)?;
        Ok(Watcher {
            dir,
            debounce,
            ignored: BTreeSet::new(),
            events,
            _notifier: notifier,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Never report changes to `path`. The file does not need to exist yet.
    pub fn ignore(&mut self, path: &Path) {
        self.ignored.insert(normalize(path));
    }

    /// Block until at least one relevant file changes.
    pub fn wait_for_change(&mut self) -> notify::Result<Vec<PathBuf>> {
        loop {
            let event = self.events.recv().map_err(|_| disconnected())?;
            let mut changed = BTreeSet::new();
            self.record(event?, &mut changed);
            self.settle(&mut changed)?;
            if !changed.is_empty() {
                return Ok(changed.into_iter().collect());
            }
        }
    }

    /// Like [`Watcher::wait_for_change`], but gives up after `timeout`.
    pub fn next_change(&mut self, timeout: Duration) -> notify::Result<Option<Vec<PathBuf>>> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = match self.events.recv_timeout(remaining) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => return Err(disconnected()),
            };
            let mut changed = BTreeSet::new();
            self.record(event?, &mut changed);
            self.settle(&mut changed)?;
            if !changed.is_empty() {
                return Ok(Some(changed.into_iter().collect()));
            }
        }
    }

    /// Drain follow-up events until none arrives within the debounce window.
    fn settle(&self, changed: &mut BTreeSet<PathBuf>) -> notify::Result<()> {
        loop {
            match self.events.recv_timeout(self.debounce) {
                Ok(event) => self.record(event?, changed),
                Err(RecvTimeoutError::Timeout) => return Ok(()),
                Err(RecvTimeoutError::Disconnected) => return Err(disconnected()),
            }
        }
    }

    fn record(&self, event: Event, changed: &mut BTreeSet<PathBuf>) {
        if !is_content_change(&event.kind) {
            return;
        }
        for path in event.paths {
            let path = normalize(&path);
            if path.parent() == Some(self.dir.as_path()) && !self.ignored.contains(&path) {
                changed.insert(path);
            }
        }
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any => true,
        _ => false,
    }
}

/// Absolute form of `path` with its directory resolved, so `out.html`,
/// `./out.html` and `/abs/dir/out.html` compare equal. Works for files that
/// do not exist (yet or any more) as long as their directory does.
pub fn normalize(path: &Path) -> PathBuf {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    match (parent.canonicalize(), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}

fn disconnected() -> notify::Error {
    notify::Error::generic("file watcher stopped")
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn normalize_resolves_dot_segments() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            normalize(&dir.path().join(".").join("out.html")),
            normalize(&dir.path().join("out.html"))
        );
        assert_eq!(
            normalize(&dir.path().join("out.html")),
            dir.path().canonicalize().unwrap().join("out.html")
        );
    }

    #[test]
    fn reports_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = Watcher::new(dir.path(), Duration::from_millis(50)).unwrap();

        let page = dir.path().join("page.tasse");
        std::fs::write(&page, "((a)(b))").unwrap();

        let changed = watcher.next_change(WAIT).unwrap().unwrap();
        assert_eq!(changed, vec![normalize(&page)]);
    }

    #[test]
    fn ignored_paths_are_not_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = Watcher::new(dir.path(), Duration::from_millis(50)).unwrap();
        watcher.ignore(&dir.path().join(".").join("out.html"));

        std::fs::write(dir.path().join("out.html"), "<html></html>").unwrap();
        assert_eq!(watcher.next_change(Duration::from_millis(300)).unwrap(), None);

        let page = dir.path().join("page.tasse");
        std::fs::write(&page, "(a)").unwrap();
        let changed = watcher.next_change(WAIT).unwrap().unwrap();
        assert_eq!(changed, vec![normalize(&page)]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Watcher::new(&dir.path().join("absent"), Duration::from_millis(1)).is_err());
    }
}
