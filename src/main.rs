// src/main.rs

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fs2::FileExt;
use packsync::progress::{CliProgress, ProgressTracker, SilentProgress};
use packsync::{ArchivePackage, Profile, ReconcileOptions, Reconciler, StateFile, UpdateClient};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "packsync")]
#[command(author, version, about = "Modpack installation updater with non-destructive reconciliation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Update an installation from a release archive
    Update {
        /// Which installation variant to update
        #[arg(value_enum)]
        variant: Variant,

        /// Installation root (prompted for and remembered when omitted)
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Release archive to apply (default: the single *.tar.gz in the base directory)
        #[arg(short, long)]
        archive: Option<PathBuf>,

        /// Download the release archive from this URL first
        #[arg(short, long)]
        url: Option<String>,

        /// Custom variant profile (TOML) instead of the built-in policy
        #[arg(short, long)]
        profile: Option<PathBuf>,

        /// Directory holding the archive, overlay directories, and state file
        #[arg(short, long, default_value = ".")]
        base_dir: PathBuf,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },
}

/// Installation variants known to the updater
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Variant {
    Client,
    Server,
    /// Update the client first, then the server
    Both,
}

impl Variant {
    fn kinds(self) -> &'static [Variant] {
        match self {
            Variant::Client => &[Variant::Client],
            Variant::Server => &[Variant::Server],
            Variant::Both => &[Variant::Client, Variant::Server],
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Update {
            variant,
            root,
            archive,
            url,
            profile,
            base_dir,
            quiet,
        }) => run_update(variant, root, archive, url, profile, base_dir, quiet),
        None => {
            println!("packsync v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'packsync --help' for usage information");
            Ok(())
        }
    }
}

fn run_update(
    variant: Variant,
    root: Option<PathBuf>,
    archive: Option<PathBuf>,
    url: Option<String>,
    profile_path: Option<PathBuf>,
    base_dir: PathBuf,
    quiet: bool,
) -> Result<()> {
    let base_dir = base_dir
        .canonicalize()
        .with_context(|| format!("base directory {} does not exist", base_dir.display()))?;

    let mut state = StateFile::load(StateFile::default_path(Some(&base_dir)))?;

    for (i, kind) in variant.kinds().iter().enumerate() {
        if i > 0 {
            println!();
        }
        update_one(
            *kind,
            root.as_deref(),
            archive.as_deref(),
            url.as_deref(),
            profile_path.as_deref(),
            &base_dir,
            quiet,
            &mut state,
        )?;
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn update_one(
    variant: Variant,
    root_arg: Option<&Path>,
    archive_arg: Option<&Path>,
    url: Option<&str>,
    profile_path: Option<&Path>,
    base_dir: &Path,
    quiet: bool,
    state: &mut StateFile,
) -> Result<()> {
    let profile = match profile_path {
        Some(path) => Profile::load(path)?,
        None => match variant {
            Variant::Client => Profile::client(),
            Variant::Server => Profile::server(),
            Variant::Both => unreachable!("expanded before dispatch"),
        },
    };

    let root = resolve_root(&profile, root_arg, state)?;
    let prefs = resolve_preferences(&profile, state)?;

    let archive_path = acquire_archive(archive_arg, url, base_dir, profile.min_archive_bytes, quiet)?;
    println!("Release archive found: {}", archive_path.display());

    // Reconciliation consumes its archive; work on a staged copy inside the
    // tree so the user's original survives for the other variant or a re-run.
    let staged = stage_archive(&archive_path, &root)?;

    // Exclusive ownership of the tree for the duration of the run
    let _lock = InstanceLock::acquire(&root)?;

    let plan = profile.plan(base_dir, |key| prefs.get(key).copied().unwrap_or(false));
    let archive = ArchivePackage::open(&staged)?;

    let progress: Arc<dyn ProgressTracker> = if quiet {
        Arc::new(SilentProgress::new())
    } else {
        Arc::new(CliProgress::new(&format!("Updating {}", profile.name)))
    };
    let options = ReconcileOptions {
        progress: Some(progress),
    };

    let mut reconciler = Reconciler::new(&root, plan);
    let result = reconciler
        .run(archive, &options)
        .with_context(|| format!("update of {} halted in state {:?}", profile.name, reconciler.state()))?;

    info!(
        "{}: {} removed, {} extracted, {} merged",
        profile.name,
        result.removed.len(),
        result.extracted.len(),
        result.merged.len()
    );
    println!(
        "UPDATE COMPLETE: {} is up to date ({} extracted, {} already present, {} removed, {} merged, {} denied)",
        profile.name,
        result.extracted.len(),
        result.skipped.len(),
        result.removed.len(),
        result.merged.len(),
        result.denied.len()
    );

    Ok(())
}

/// Resolve the installation root: explicit flag first, then the remembered
/// path, then an interactive prompt. Invalid remembered paths are forgotten
/// so the next run asks again.
fn resolve_root(profile: &Profile, root_arg: Option<&Path>, state: &mut StateFile) -> Result<PathBuf> {
    let key = format!("{}.root", profile.name);

    if let Some(root) = root_arg {
        let root = root
            .canonicalize()
            .with_context(|| format!("installation root {} does not exist", root.display()))?;
        if !root.is_dir() {
            bail!("installation root {} is not a directory", root.display());
        }
        state.set(&key, root.to_string_lossy());
        state.save()?;
        return Ok(root);
    }

    if let Some(stored) = state.get(&key) {
        let path = PathBuf::from(stored);
        if path.is_dir() {
            println!(
                "NOTE: using stored {} installation path: {}",
                profile.name,
                path.display()
            );
            return Ok(path);
        }
        warn!("stored path {} no longer exists, forgetting it", path.display());
        state.remove(&key);
        state.save()?;
    }

    let path = prompt_line(&format!(
        "Where is the {} installation stored? (Where 'config', 'mods', etc, are stored.)",
        profile.name
    ))?;
    let path = PathBuf::from(path.trim());
    if !path.is_dir() {
        bail!("{} is not a directory", path.display());
    }
    state.set(&key, path.to_string_lossy());
    state.save()?;
    Ok(path)
}

/// Resolve the preference keys gating this profile's overlays, prompting
/// for and remembering any that are not stored yet.
fn resolve_preferences(profile: &Profile, state: &mut StateFile) -> Result<BTreeMap<String, bool>> {
    let mut prefs = BTreeMap::new();
    for key in profile.required_preferences() {
        let value = match state.get_bool(&key) {
            Some(value) => {
                println!(
                    "NOTE: saved preference '{}' = {}; edit {} to change it",
                    key,
                    if value { "yes" } else { "no" },
                    state.path().display()
                );
                value
            }
            None => {
                let answer = prompt_line(&format!("Would you like to install {}? (y/n)", key))?;
                let value = matches!(answer.trim().to_lowercase().as_str(), "y" | "yes");
                state.set(&key, if value { "y" } else { "n" });
                state.save()?;
                value
            }
        };
        prefs.insert(key, value);
    }
    Ok(prefs)
}

/// Pick the release archive: explicit path, URL download, or the single
/// *.tar.gz in the base directory.
fn acquire_archive(
    archive_arg: Option<&Path>,
    url: Option<&str>,
    base_dir: &Path,
    min_bytes: u64,
    quiet: bool,
) -> Result<PathBuf> {
    if let Some(path) = archive_arg {
        if !path.is_file() {
            bail!("release archive {} does not exist", path.display());
        }
        return Ok(path.to_path_buf());
    }

    if let Some(url) = url {
        let filename = url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("release.tar.gz");
        let dest = base_dir.join(filename);
        let client = UpdateClient::new()?;
        let bar = if quiet {
            None
        } else {
            Some(packsync::fetch::download_bar(filename))
        };
        client.download_file(url, &dest, bar.as_ref())?;
        return Ok(dest);
    }

    Ok(packsync::fetch::locate_archive(base_dir, min_bytes)?)
}

/// Copy the archive into the tree root unless it is already there.
/// The copy is what reconciliation consumes and deletes.
fn stage_archive(archive_path: &Path, root: &Path) -> Result<PathBuf> {
    let name = archive_path
        .file_name()
        .with_context(|| format!("{} has no file name", archive_path.display()))?;
    let staged = root.join(name);
    if staged != archive_path {
        fs::copy(archive_path, &staged)
            .with_context(|| format!("failed to stage archive into {}", root.display()))?;
    }
    Ok(staged)
}

/// Read one line from the user; refuses to prompt without a terminal.
fn prompt_line(question: &str) -> Result<String> {
    if !io::stdin().is_terminal() {
        bail!("cannot prompt ({}): no terminal attached; pass the value on the command line", question);
    }
    let mut stdout = io::stdout();
    writeln!(stdout, "{}", question)?;
    write!(stdout, "> ")?;
    stdout.flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    println!();
    Ok(input)
}

/// Exclusive advisory lock preventing two updates from running against the
/// same installation tree at once. The engine assumes a single writer; this
/// guard is how the caller keeps that promise.
struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    fn acquire(root: &Path) -> Result<Self> {
        let path = root.join(".packsync.lock");
        let file = File::create(&path)
            .with_context(|| format!("cannot create lock file {}", path.display()))?;
        file.try_lock_exclusive().map_err(|_| {
            anyhow::anyhow!(
                "another update is already running against {}",
                root.display()
            )
        })?;
        Ok(Self { file, path })
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        let _ = fs::remove_file(&self.path);
    }
}
