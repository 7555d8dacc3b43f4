//! Directory watcher: turns filesystem notifications into loop wakes.
//!
//! Only the top level of the monitored directory is watched. The callback
//! runs on notify's own thread and does nothing but filter and `try_send`.

#![allow(missing_docs)]

use std::path::Path;

use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::core::errors::Result;
use crate::daemon::wake::{WakeReason, WakeSender};
use crate::scanner::walker::is_hidden;

/// Live watch on one directory. Dropping it stops delivery.
pub struct DirectoryWatcher {
    _watcher: RecommendedWatcher,
}

impl DirectoryWatcher {
    /// Start watching `dir`; relevant events wake the loop through `wake`.
    pub fn start(dir: &Path, wake: WakeSender) -> Result<Self> {
        // notify reports the watched directory by its absolute path.
        let watched = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_relevant(&event, &watched) => {
                    wake.wake(WakeReason::DirectoryChanged);
                }
                Ok(_) => {}
                Err(e) => eprintln!("[ISPY-WATCH] watcher error: {e}"),
            },
            Config::default(),
        )?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        Ok(Self { _watcher: watcher })
    }
}

/// Whether an event can change the outcome of a check.
///
/// Creations, removals, renames and content writes count. Metadata and access
/// events do not, and neither does anything that only touches hidden entries
/// (the report itself is dot-prefixed). Removal of the watched directory
/// `dir` always counts: the next check then fails to open it.
pub fn is_relevant(event: &Event, dir: &Path) -> bool {
    if matches!(event.kind, EventKind::Remove(_)) && event.paths.iter().any(|p| p == dir) {
        return true;
    }
    let kind_matters = match event.kind {
        EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => false,
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        EventKind::Access(_) | EventKind::Other => false,
        _ => true,
    };
    kind_matters && touches_visible_entry(event)
}

fn touches_visible_entry(event: &Event) -> bool {
    // Some backends deliver pathless rescan hints; treat those as relevant.
    event.paths.is_empty()
        || event
            .paths
            .iter()
            .any(|p| p.file_name().is_some_and(|name| !is_hidden(name)))
}
