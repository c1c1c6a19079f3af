//! Live reload of routing and middleware configuration.
//!
//! Watches the config file and invokes a rebuild callback on every change.
//! The callback re-derives the whole table and republishes it atomically
//! (see [`Dispatcher::install`](crate::dispatcher::Dispatcher::install));
//! a rebuild error is logged and the previous table stays live, so saving
//! a broken config never takes the gateway down.

use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Watch a config file and call `reload` when it changes.
///
/// `reload` returns the number of routes in the newly published table, or
/// an error when the new configuration was rejected. The returned watcher
/// must be kept alive for the watch to stay active.
pub fn watch_config<P, F>(config_path: P, mut reload: F) -> notify::Result<RecommendedWatcher>
where
    P: AsRef<Path>,
    F: FnMut() -> anyhow::Result<usize> + Send + 'static,
{
    let path: PathBuf = config_path.as_ref().to_path_buf();
    let log_path = path.clone();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    match reload() {
                        Ok(routes) => {
                            info!(
                                config = %log_path.display(),
                                routes,
                                "hot-reload: new route table published"
                            );
                        }
                        Err(e) => {
                            warn!(
                                config = %log_path.display(),
                                error = %e,
                                "hot-reload: new configuration rejected, keeping current table"
                            );
                        }
                    }
                }
            }
            Err(e) => warn!(error = %e, "config watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&path, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}
