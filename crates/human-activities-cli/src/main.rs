mod commands;
mod logging;
mod progress;

use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use human_activities_core::scanner::ignore::find_ignore_file;
use human_activities_core::scanner::ScanMethod;
use human_activities_core::{
    format, snapshot_queue, storage, CancelToken, Config, Database, DirectoryViews,
    EngineOptions, Mode, RoundConfig, ScanEngine, Scheduler,
};
use progress::CliObserver;
use tracing::{error, info, warn};

const DEFAULT_CONFIG_PATH: &str = "./human_activities.json";
const DEFAULT_CACHE_PATH: &str = "./human_activities.db";
const BAR_WIDTH: usize = 24;

struct Paths {
    config: PathBuf,
    cache: PathBuf,
    ignore_file: Option<PathBuf>,
}

impl Paths {
    fn resolve(args: &Cli) -> Self {
        let config = args
            .config
            .clone()
            .or_else(|| env::var_os("HA_CONFIG_PATH").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let cache = args
            .cache
            .clone()
            .or_else(|| env::var_os("HA_CACHE_PATH").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_PATH));

        let mut candidates = vec![config.with_file_name("ignore")];
        if let Some(global) = env::var_os("HA_GLOBAL_IGNORE_FILE") {
            candidates.push(PathBuf::from(global));
        }
        let ignore_file = args
            .ignore_file
            .clone()
            .or_else(|| find_ignore_file(&candidates));

        Self {
            config,
            cache,
            ignore_file,
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args = Cli::parse();
    let _guard = logging::init_logger(args.verbose);

    let paths = Paths::resolve(&args);

    let config = match Config::load(&paths.config) {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    match args.command {
        Some(Commands::Scan) => run_scan(&config, &paths, args.external)?,
        Some(Commands::Watch) => run_watch(&config, &paths, args.external)?,
        Some(Commands::Clean) => {
            storage::clean(&paths.cache)
                .with_context(|| format!("Cannot remove {}", paths.cache.display()))?;
            println!("Cache {} removed", paths.cache.display());
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
        }
        Some(Commands::AddDir { path, name }) => add_dir(config, &paths.config, &path, name)?,
        Some(Commands::RemoveDir { path }) => remove_dir(config, &paths.config, &path)?,
        Some(Commands::ListCache) => list_cache(&paths.cache)?,
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn build_engine(paths: &Paths, external: bool) -> anyhow::Result<ScanEngine> {
    let db = Database::open_or_recreate(&paths.cache)
        .with_context(|| format!("Cannot open cache {}", paths.cache.display()))?;
    let options = EngineOptions {
        method: if external {
            ScanMethod::External
        } else {
            ScanMethod::Native
        },
        ignore_file: paths.ignore_file.clone(),
        ..EngineOptions::default()
    };
    Ok(ScanEngine::new(Arc::new(db), options)?)
}

fn warn_if_unconfigured(config: &Config) {
    if config.show_setup && config.mode == Mode::NamedDirs && config.named_dirs.is_empty() {
        println!(
            "{}",
            "No directories configured yet, add some with `human-activities add-dir PATH NAME`."
                .yellow()
        );
    }
}

fn run_scan(config: &Config, paths: &Paths, external: bool) -> anyhow::Result<()> {
    warn_if_unconfigured(config);
    let engine = build_engine(paths, external)?;
    let round = RoundConfig::from_config(config)?;
    let mut views = DirectoryViews::new(round.unit, round.threshold_days_ago);

    let result = engine.run_round(&mut views, &round, &CancelToken::new(), &CliObserver::new())?;
    print_views(&views);
    info!(
        "{} directories in {}",
        format!("{}", result.scanned).green(),
        format!("{:.2}s", result.duration.as_secs_f64()).green(),
    );
    Ok(())
}

fn run_watch(config: &Config, paths: &Paths, external: bool) -> anyhow::Result<()> {
    warn_if_unconfigured(config);
    let engine = Arc::new(build_engine(paths, external)?);
    let (queue, receiver) = snapshot_queue();
    let _scheduler = Scheduler::start(engine, config.clone(), Arc::new(queue));

    for views in receiver.iter() {
        if views.is_pending() {
            let done = views.iter().filter(|(_, view)| !view.pending).count();
            println!("{}", format!("{}/{} scanned", done, views.len()).dimmed());
        } else {
            print_views(&views);
        }
    }
    info!("Scan loop finished");
    Ok(())
}

fn print_views(views: &DirectoryViews) {
    println!();
    if views.is_empty() {
        println!("{}", views.tooltip().dimmed());
        return;
    }
    let label_width = views.iter().map(|(_, v)| v.label.len()).max().unwrap_or(0);
    for (_, view) in views.iter() {
        let filled = (view.fraction * BAR_WIDTH as f64).round() as usize;
        let bar = format!(
            "{}{}",
            "█".repeat(filled.min(BAR_WIDTH)),
            "░".repeat(BAR_WIDTH - filled.min(BAR_WIDTH))
        );
        let text = if view.pending {
            view.text().yellow()
        } else if view.value.is_none() {
            view.text().red()
        } else {
            view.text().normal()
        };
        println!(
            "{:<width$}  {}  {:>5}  {}",
            view.label.bold(),
            bar.truecolor_hex(view.color),
            format::format_percent(view.fraction),
            text,
            width = label_width,
        );
    }
}

trait HexColor {
    fn truecolor_hex(self, hex: &str) -> ColoredString;
}

impl HexColor for String {
    fn truecolor_hex(self, hex: &str) -> ColoredString {
        let channel = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|c| u8::from_str_radix(c, 16).ok())
                .unwrap_or(0xa3)
        };
        self.truecolor(channel(1), channel(3), channel(5))
    }
}

fn add_dir(
    mut config: Config,
    config_path: &Path,
    path: &Path,
    name: Option<String>,
) -> anyhow::Result<()> {
    let path_str = path.to_string_lossy().into_owned();
    let name = name.unwrap_or_else(|| {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path_str.clone())
    });
    if config.named_dirs.paths().contains(&path_str) {
        warn!("{} is already configured", path_str);
        return Ok(());
    }
    if !config.named_dirs.push(path_str.clone(), name.clone()) {
        anyhow::bail!(
            "Cannot add {}: at most {} directories can be configured",
            path_str,
            human_activities_core::named_dirs::MAX_NAMED_DIRS
        );
    }
    config.mode = Mode::NamedDirs;
    config.save(config_path)?;
    println!("Added {} as {}", path_str.bold(), name.bold());
    Ok(())
}

fn remove_dir(mut config: Config, config_path: &Path, path: &Path) -> anyhow::Result<()> {
    let path_str = path.to_string_lossy();
    match config.named_dirs.remove_path(&path_str) {
        Some(removed) => {
            config.save(config_path)?;
            println!("Removed {} ({})", removed.path.bold(), removed.name);
        }
        None => warn!("{} is not configured", path_str),
    }
    Ok(())
}

fn list_cache(cache_path: &Path) -> anyhow::Result<()> {
    let db = Database::open_or_recreate(cache_path)?;
    let directories = db.list_directories()?;
    if directories.is_empty() {
        println!("{}", "Cache is empty".dimmed());
    }
    for directory in directories {
        println!(
            "{} {}",
            directory.path.bold(),
            directory
                .scanned_at
                .as_deref()
                .unwrap_or("never scanned")
                .dimmed()
        );
        for stat in &directory.stats {
            let bucket = if stat.threshold_days_ago == 0 {
                "all files".to_string()
            } else {
                format!("last {} days", stat.threshold_days_ago)
            };
            let size = stat
                .size_bytes
                .and_then(|b| u64::try_from(b).ok())
                .map(format::format_bytes)
                .unwrap_or_else(|| format::UNKNOWN_TEXT.to_string());
            let files = stat
                .num_files
                .and_then(|n| u64::try_from(n).ok())
                .map(format::format_count)
                .unwrap_or_else(|| format::UNKNOWN_TEXT.to_string());
            println!("  {:<14} {:>10}  {}", bucket, size, files);
        }
    }
    Ok(())
}
