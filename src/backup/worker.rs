//! Running backup and restore off the calling thread.
//!
//! Progress arrives on a channel; the sender side closes when the job ends,
//! so iterating [`BackgroundTask::progress`] to completion and then calling
//! [`BackgroundTask::wait`] never blocks on a finished job.

use super::create::{backup_game, BackupSummary};
use super::progress::Progress;
use super::restore::{restore_game, RestoreSummary};
use crate::config::LauncherPaths;
use crate::error::{Result, VaultError};
use crate::metadata::GameManifest;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

/// A backup or restore running on its own thread
pub struct BackgroundTask<T> {
    pub progress: Receiver<Progress>,
    handle: JoinHandle<Result<T>>,
}

impl<T> BackgroundTask<T> {
    /// Block until the job ends and return its result
    pub fn wait(self) -> Result<T> {
        self.handle
            .join()
            .map_err(|_| VaultError::Internal("background task panicked".to_string()))?
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

fn spawn<T, F>(name: &str, job: F) -> Result<BackgroundTask<T>>
where
    T: Send + 'static,
    F: FnOnce(&mut dyn FnMut(Progress)) -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
        let mut report = |update: Progress| {
            // Receiver may have been dropped by a caller that only waits
            let _ = tx.send(update);
        };
        job(&mut report)
    })?;

    Ok(BackgroundTask {
        progress: rx,
        handle,
    })
}

/// Start [`backup_game`] on a worker thread
pub fn spawn_backup(
    manifest: GameManifest,
    paths: LauncherPaths,
    output: PathBuf,
) -> Result<BackgroundTask<BackupSummary>> {
    spawn("epicvault-backup", move |progress| {
        backup_game(&manifest, &paths, &output, progress)
    })
}

/// Start [`restore_game`] on a worker thread
pub fn spawn_restore(
    archive: PathBuf,
    destination: PathBuf,
    paths: LauncherPaths,
) -> Result<BackgroundTask<RestoreSummary>> {
    spawn("epicvault-restore", move |progress| {
        restore_game(&archive, &destination, &paths, progress)
    })
}
