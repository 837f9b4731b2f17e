use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use epicvault::archive::resolve_entry_path;
use epicvault::backup::{spawn_backup, spawn_restore, BackgroundTask};
use epicvault::metadata::load_installed_manifests;
use epicvault::{open_archive, GameManifest, LauncherPaths, OpenMode};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Resolution of the backup/restore progress bar
const PROGRESS_STEPS: u64 = 1000;

#[derive(Parser)]
#[command(name = "epicvault", version, about = "Indexed LZ4 archives and game backup/restore")]
struct Cli {
    /// Launcher paths (TOML with registry_file / manifests_dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List archive contents
    List { archive: PathBuf },
    /// Extract an archive, or a single entry of it
    Extract {
        archive: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
        /// Only extract this entry
        entry: Option<String>,
    },
    /// Back up an installed game
    Backup {
        /// The game's launcher manifest (.item)
        #[arg(short, long)]
        manifest: PathBuf,
        /// Output archive (.epiclz4 or .epiczip)
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Restore a game backup into a destination directory
    Restore {
        archive: PathBuf,
        destination: PathBuf,
    },
    /// List games installed by the launcher
    Games,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let paths = match &cli.config {
        Some(path) => LauncherPaths::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => LauncherPaths::default(),
    };

    match cli.command {
        Commands::List { archive } => {
            let mut ar = open_archive(&archive, OpenMode::Read)
                .with_context(|| format!("opening {}", archive.display()))?;
            println!("Archive: {}", archive.display());
            println!("{:<60} {:>14}", "Name", "Size");
            for name in ar.list_entries() {
                match ar.get_entry(&name)? {
                    Some(reader) => println!("{:<60} {:>14}", name, reader.content_length()),
                    None => println!("{:<60} {:>14}", name, "<dir>"),
                }
            }
            ar.close()?;
        }

        Commands::Extract {
            archive,
            output_dir,
            entry,
        } => {
            let mut ar = open_archive(&archive, OpenMode::Read)
                .with_context(|| format!("opening {}", archive.display()))?;
            match entry {
                Some(entry) => {
                    let target = resolve_entry_path(&output_dir, &entry)?;
                    ar.extract_to_file(&entry, &target)?;
                    println!("Extracted {} to {}", entry, target.display());
                }
                None => {
                    let bar = byte_bar(ar.total_extracted_size()?);
                    ar.extract_all(&output_dir, &mut |description, bytes| {
                        bar.set_message(description.to_string());
                        bar.inc(bytes);
                    })?;
                    bar.finish_with_message("done");
                    println!("Extracted to: {}", output_dir.display());
                }
            }
            ar.close()?;
        }

        Commands::Backup { manifest, output } => {
            let manifest = GameManifest::load(&manifest)
                .with_context(|| format!("loading manifest {}", manifest.display()))?;
            println!("Backing up {} to {}", manifest.title(), output.display());
            let summary = follow(spawn_backup(manifest, paths, output)?)?;
            println!(
                "Created: {} ({} entries, {} bytes)",
                summary.archive_path.display(),
                summary.entry_count,
                summary.total_bytes
            );
        }

        Commands::Restore {
            archive,
            destination,
        } => {
            let summary = follow(spawn_restore(archive, destination, paths)?)?;
            println!(
                "Restored {} to {} ({} files, {} bytes)",
                summary.app_name, summary.install_location, summary.files_restored, summary.bytes_restored
            );
        }

        Commands::Games => {
            let manifests = load_installed_manifests(&paths.manifests_dir)
                .with_context(|| format!("reading {}", paths.manifests_dir.display()))?;
            println!("{:<40} {:<32} {}", "Title", "AppName", "InstallLocation");
            for m in manifests {
                println!("{:<40} {:<32} {}", m.title(), m.app_name, m.install_location);
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn byte_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    if let Ok(style) =
        ProgressStyle::default_bar().template("[{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
    {
        bar.set_style(style.progress_chars("#>-"));
    }
    bar
}

/// Render a background task's progress until it ends
fn follow<T>(task: BackgroundTask<T>) -> Result<T> {
    let bar = ProgressBar::new(PROGRESS_STEPS);
    if let Ok(style) =
        ProgressStyle::default_bar().template("[{bar:40.cyan/blue}] {percent:>3}% {msg}")
    {
        bar.set_style(style.progress_chars("#>-"));
    }

    for update in task.progress.iter() {
        bar.set_position((update.fraction * PROGRESS_STEPS as f64) as u64);
        bar.set_message(update.description);
    }

    let result = task.wait();
    bar.finish_and_clear();
    Ok(result?)
}
