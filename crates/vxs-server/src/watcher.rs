// File: vxs-server/src/watcher.rs
// Purpose: Route directory scanning and rebuild-on-change

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use vxs_router::route::parser::ROUTE_EXTENSIONS;
use vxs_router::RouteTree;
use walkdir::WalkDir;

use crate::dispatcher::RequestDispatcher;
use crate::error::{Result, ServerError};

/// A route file appearing or disappearing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteChange {
    Added(String),
    Removed(String),
}

fn is_route_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ROUTE_EXTENSIONS.contains(&ext))
}

/// `root`-relative listing name (`users/[id].tsx`) of a route file.
fn route_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = relative.components().filter_map(|c| c.as_os_str().to_str()).collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Every route file under `root`, sorted.
pub fn scan_routes(root: &Path) -> Result<Vec<String>> {
    if !root.is_dir() {
        return Err(ServerError::RoutesDir(root.display().to_string()));
    }
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable route entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_route_file(entry.path()))
        .filter_map(|entry| route_name(root, entry.path()))
        .collect();
    files.sort();
    Ok(files)
}

/// Route changes described by one file-system event.
///
/// Content edits are not route changes: the tree only depends on names.
pub fn classify_event(root: &Path, event: &Event) -> Vec<RouteChange> {
    let added = match event.kind {
        EventKind::Create(_) => Some(true),
        EventKind::Remove(_) => Some(false),
        EventKind::Modify(ModifyKind::Name(_)) => None,
        _ => return Vec::new(),
    };

    event
        .paths
        .iter()
        .filter(|path| is_route_file(path))
        .filter_map(|path| {
            let name = route_name(root, path)?;
            // renames report both ends; the file tells which one this is
            Some(if added.unwrap_or_else(|| path.exists()) {
                RouteChange::Added(name)
            } else {
                RouteChange::Removed(name)
            })
        })
        .collect()
}

/// Applies a change; `true` when the tree was rebuilt.
pub fn apply_change(tree: &mut RouteTree, change: &RouteChange) -> bool {
    match change {
        RouteChange::Added(file) => tree.add_file(file),
        RouteChange::Removed(file) => tree.remove_file(file),
    }
}

/// Watches a routes directory for files being created or removed
pub struct RouteWatcher {
    root: PathBuf,
    tx: broadcast::Sender<RouteChange>,
    _watcher: notify::RecommendedWatcher,
}

impl RouteWatcher {
    pub fn new(routes_dir: impl AsRef<Path>) -> Result<Self> {
        let root = routes_dir.as_ref().canonicalize()?;
        let (tx, _) = broadcast::channel(100);
        let tx_clone = tx.clone();
        let event_root = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: std::result::Result<Event, notify::Error>| match res {
            Ok(event) => {
                for change in classify_event(&event_root, &event) {
                    info!(change = ?change, "Route file change");
                    // no receivers is fine
                    let _ = tx_clone.send(change);
                }
            }
            Err(e) => error!("Watch error: {:?}", e),
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        info!("Watching routes: {:?}", root);

        Ok(Self {
            root,
            tx,
            _watcher: watcher,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RouteChange> {
        self.tx.subscribe()
    }

    /// Keeps `tree` and the dispatcher's manifest in step with the directory.
    ///
    /// The watcher lives as long as the returned task.
    pub fn spawn_reloader(self, tree: Arc<RwLock<RouteTree>>, dispatcher: Arc<RequestDispatcher>) -> JoinHandle<()> {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            let watcher = self;
            loop {
                let manifest = match rx.recv().await {
                    Ok(change) => {
                        let mut tree = tree.write();
                        if !apply_change(&mut tree, &change) {
                            continue;
                        }
                        tree.manifest().clone()
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Route changes dropped, rescanning");
                        match scan_routes(watcher.root()) {
                            Ok(files) => {
                                let mut tree = tree.write();
                                let options = tree.options().clone();
                                *tree = RouteTree::build(files, options);
                                tree.manifest().clone()
                            }
                            Err(e) => {
                                error!(error = %e, "Route rescan failed");
                                continue;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                info!(pages = manifest.page_routes.len(), api = manifest.api_routes.len(), "Routes rebuilt");
                dispatcher.set_manifest(manifest);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind, RenameMode};
    use pretty_assertions::assert_eq;
    use vxs_router::TreeOptions;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut event = Event::new(kind);
        for path in paths {
            event = event.add_path(PathBuf::from(path));
        }
        event
    }

    #[test]
    fn test_create_and_remove_are_route_changes() {
        let root = Path::new("/srv/app");
        assert_eq!(
            classify_event(root, &event(EventKind::Create(CreateKind::File), &["/srv/app/users/[id].tsx"])),
            vec![RouteChange::Added("users/[id].tsx".into())]
        );
        assert_eq!(
            classify_event(root, &event(EventKind::Remove(RemoveKind::File), &["/srv/app/about.tsx"])),
            vec![RouteChange::Removed("about.tsx".into())]
        );
    }

    #[test]
    fn test_edits_and_foreign_files_are_ignored() {
        let root = Path::new("/srv/app");
        let edit = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/srv/app/about.tsx"],
        );
        assert!(classify_event(root, &edit).is_empty());

        let css = event(EventKind::Create(CreateKind::File), &["/srv/app/style.css"]);
        assert!(classify_event(root, &css).is_empty());

        let outside = event(EventKind::Create(CreateKind::File), &["/tmp/x.tsx"]);
        assert!(classify_event(root, &outside).is_empty());
    }

    #[test]
    fn test_rename_to_missing_path_is_removal() {
        let root = Path::new("/definitely/not/here");
        let rename = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/definitely/not/here/old.tsx"],
        );
        assert_eq!(classify_event(root, &rename), vec![RouteChange::Removed("old.tsx".into())]);
    }

    #[test]
    fn test_apply_change_rebuilds_manifest() {
        let mut tree = RouteTree::build(["index.tsx"], TreeOptions::default());
        assert!(tree.manifest().match_page("/about").unwrap().0.is_not_found());

        assert!(apply_change(&mut tree, &RouteChange::Added("about.tsx".into())));
        assert_eq!(tree.manifest().match_page("/about").unwrap().0.file, "./about.tsx");
        assert!(!apply_change(&mut tree, &RouteChange::Added("about.tsx".into())));

        assert!(apply_change(&mut tree, &RouteChange::Removed("about.tsx".into())));
        assert!(tree.manifest().match_page("/about").unwrap().0.is_not_found());
    }

    #[test]
    fn test_scan_missing_dir_is_an_error() {
        assert!(matches!(
            scan_routes(Path::new("/definitely/not/here")),
            Err(ServerError::RoutesDir(_))
        ));
    }
}
