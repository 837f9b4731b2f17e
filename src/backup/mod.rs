//! Game backup and restore on top of the archive layer.
//!
//! A backup archive holds the game tree under [`GAME_FILES_PREFIX`], the
//! launcher's registry record as [`LAUNCHER_RECORD_ENTRY`] and the game's
//! `<id>.item` manifest at the top level. Manifest and staging directories
//! living outside the install tree go under their own prefixes.

mod create;
mod location;
mod progress;
mod restore;
mod worker;

pub use create::{backup_game, plan_sources, tree_size, BackupSummary, SourceTree};
pub use location::{is_within, join_location, leaf_name, relative_to};
pub use progress::{Progress, ProgressSink};
pub use restore::{rebase_manifest, rebased_install_root, restore_game, RestoreSummary};
pub use worker::{spawn_backup, spawn_restore, BackgroundTask};

/// Prefix of the game's install tree inside a backup
pub const GAME_FILES_PREFIX: &str = "GameFiles/";

/// Prefix of an out-of-tree manifest directory
pub const MANIFESTS_PREFIX: &str = "Manifests/";

/// Prefix of an out-of-tree staging directory
pub const STAGING_PREFIX: &str = "Staging/";

/// Entry holding the game's launcher registry record
pub const LAUNCHER_RECORD_ENTRY: &str = "LauncherInstalled.json";
