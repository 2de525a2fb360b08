//! Configuration file watcher for hot reload.
//!
//! The parent directory is watched rather than the file itself: editors
//! that save by rename replace the inode, which would silently end a
//! file-level watch.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::RelayConfig;

/// Watches one configuration file and sends every valid new version.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<RelayConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for validated configurations.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<RelayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching on notify's background thread.
    ///
    /// Updates stop when the returned handle is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = self.path.file_name().map(OsStr::to_os_string);
        let path = self.path;
        let tx = self.update_tx;

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if is_config_change(&event, file_name.as_deref()) => reload(&path, &tx),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Config watch error"),
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(dir = %dir.display(), "Config watcher started");
        Ok(watcher)
    }
}

/// A create or modify event that names the watched file.
fn is_config_change(event: &Event, file_name: Option<&OsStr>) -> bool {
    let Some(file_name) = file_name else {
        return false;
    };
    (event.kind.is_modify() || event.kind.is_create())
        && event.paths.iter().any(|p| p.file_name() == Some(file_name))
}

/// Load, validate and publish. An invalid file keeps the running config.
fn reload(path: &Path, tx: &mpsc::UnboundedSender<RelayConfig>) {
    tracing::info!(path = %path.display(), "Config file changed, reloading");
    match load_config(path) {
        Ok(config) => {
            if tx.send(config).is_err() {
                tracing::debug!("Config receiver gone, dropping reload");
            }
        }
        Err(e) => tracing::error!(error = %e, "Config reload rejected, keeping current configuration"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind};
    use notify::EventKind;

    #[test]
    fn only_events_for_the_config_file_count() {
        let name = OsStr::new("relay.toml");
        let modify = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(PathBuf::from("/etc/relay/relay.toml"));
        let create = Event::new(EventKind::Create(CreateKind::File)).add_path(PathBuf::from("/etc/relay/relay.toml"));
        let other = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(PathBuf::from("/etc/relay/other.toml"));
        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("/etc/relay/relay.toml"));

        assert!(is_config_change(&modify, Some(name)));
        assert!(is_config_change(&create, Some(name)));
        assert!(!is_config_change(&other, Some(name)));
        assert!(!is_config_change(&access, Some(name)));
        assert!(!is_config_change(&modify, None));
    }

    #[test]
    fn reload_publishes_only_valid_configs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        let (tx, mut rx) = mpsc::unbounded_channel();

        std::fs::write(&path, "[relay]\nallow_client_target = true\n").unwrap();
        reload(&path, &tx);
        assert!(rx.try_recv().unwrap().relay.allow_client_target);

        std::fs::write(&path, "[relay]\nbuffer_size = 0\n").unwrap();
        reload(&path, &tx);
        assert!(rx.try_recv().is_err());
    }
}
