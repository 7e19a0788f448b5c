//! `notify`-backed file watcher with debounce (spec §4.9): rapid edits
//! to the same path within one debounce window collapse to a single
//! emitted event carrying the last-seen kind. Adapted from the
//! teacher's watcher/events/filtering split, collapsed into one module
//! here since this build has a single coalescing rule rather than a
//! pluggable filter chain.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Changed(PathBuf),
    Removed(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    Changed,
    Removed,
}

struct Pending {
    kind: PendingKind,
    seen_at: Instant,
}

/// Entries whose debounce window has elapsed, removed from `map` as a
/// side effect. Split out from the watcher loop so coalescing can be
/// exercised without real filesystem timing.
fn drain_ready(map: &mut HashMap<PathBuf, Pending>, now: Instant, debounce: Duration) -> Vec<WatchEvent> {
    let ready_keys: Vec<PathBuf> = map
        .iter()
        .filter(|(_, p)| now.duration_since(p.seen_at) >= debounce)
        .map(|(k, _)| k.clone())
        .collect();

    ready_keys
        .into_iter()
        .filter_map(|key| {
            map.remove(&key).map(|pending| match pending.kind {
                PendingKind::Changed => WatchEvent::Changed(key),
                PendingKind::Removed => WatchEvent::Removed(key),
            })
        })
        .collect()
}

pub struct FileWatcher {
    _inner: notify::RecommendedWatcher,
}

impl FileWatcher {
    /// Start watching `root` recursively; coalesced events arrive on
    /// the returned channel no sooner than `debounce` after the last
    /// raw event for that path.
    pub fn start(root: &Path, debounce: Duration) -> anyhow::Result<(Self, mpsc::UnboundedReceiver<WatchEvent>)> {
        let pending: Arc<Mutex<HashMap<PathBuf, Pending>>> = Arc::new(Mutex::new(HashMap::new()));
        let pending_writer = pending.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let Ok(event) = res else { return };
            let kind = match event.kind {
                notify::EventKind::Remove(_) => PendingKind::Removed,
                notify::EventKind::Create(_) | notify::EventKind::Modify(_) => PendingKind::Changed,
                _ => return,
            };
            let mut guard = pending_writer.lock().unwrap();
            for path in event.paths {
                guard.insert(
                    path,
                    Pending {
                        kind,
                        seen_at: Instant::now(),
                    },
                );
            }
        })?;
        watcher.watch(root, RecursiveMode::Recursive)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let debounce_interval = debounce.max(Duration::from_millis(10));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(debounce_interval);
            loop {
                interval.tick().await;
                let ready = {
                    let mut guard = pending.lock().unwrap();
                    drain_ready(&mut guard, Instant::now(), debounce)
                };
                for event in ready {
                    if tx.send(event).is_err() {
                        return;
                    }
                }
            }
        });

        Ok((Self { _inner: watcher }, rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalesces_rapid_edits_to_one_event_after_debounce() {
        let mut map = HashMap::new();
        let debounce = Duration::from_millis(100);
        let base = Instant::now();
        map.insert(
            PathBuf::from("a.rs"),
            Pending {
                kind: PendingKind::Changed,
                seen_at: base,
            },
        );
        // overwritten twice in rapid succession, last write wins
        map.insert(
            PathBuf::from("a.rs"),
            Pending {
                kind: PendingKind::Removed,
                seen_at: base,
            },
        );

        assert!(drain_ready(&mut map, base, debounce).is_empty());

        let ready = drain_ready(&mut map, base + debounce, debounce);
        assert_eq!(ready, vec![WatchEvent::Removed(PathBuf::from("a.rs"))]);
        assert!(map.is_empty());
    }

    #[test]
    fn only_expired_paths_drain() {
        let mut map = HashMap::new();
        let debounce = Duration::from_millis(50);
        let now = Instant::now();
        map.insert(
            PathBuf::from("old.rs"),
            Pending {
                kind: PendingKind::Changed,
                seen_at: now,
            },
        );
        map.insert(
            PathBuf::from("new.rs"),
            Pending {
                kind: PendingKind::Changed,
                seen_at: now + debounce,
            },
        );

        let ready = drain_ready(&mut map, now + debounce, debounce);
        assert_eq!(ready, vec![WatchEvent::Changed(PathBuf::from("old.rs"))]);
        assert_eq!(map.len(), 1);
    }
}
