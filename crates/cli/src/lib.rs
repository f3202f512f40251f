use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use image::{DynamicImage, ImageError};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use thumbgrid_cache::{
    AssetBackend, AssetDecoder, AssetError, AssetState, CacheConfig, CacheStats, Item,
    ThreadedBackend, Window, WindowedAssetCache,
};
use thumbgrid_scheduler::{Direction, LoadCadence};
use walkdir::WalkDir;

/// File extensions picked up by `simulate`
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// Pause when a tick found nothing to do but decodes are still running
const IDLE_WAIT: Duration = Duration::from_millis(1);

#[derive(Debug, Parser)]
#[command(name = "thumbgrid")]
#[command(about = "Windowed thumbnail cache driver")]
pub struct Cli {
    /// Log cache activity at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Replay a cursor path over a directory of images.
    Simulate(SimulateArgs),
    /// Print the effective configuration as TOML.
    Config {
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        #[command(flatten)]
        overrides: ConfigOverrides,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Args)]
struct SimulateArgs {
    #[arg(value_name = "DIR")]
    dir: PathBuf,
    /// Cursor script: L R U D moves, `-` focus lost, `+` focus gained.
    #[arg(long, default_value = "")]
    moves: String,
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(flatten)]
    overrides: ConfigOverrides,
    /// Decode threads (default: logical CPU count).
    #[arg(long)]
    workers: Option<usize>,
    /// Longest thumbnail edge in pixels.
    #[arg(long, default_value_t = 128)]
    thumb_size: u32,
    /// Stop after this many frames even if loads are outstanding.
    #[arg(long, default_value_t = 10_000)]
    max_frames: u64,
}

/// Command-line overrides applied on top of file and environment config
#[derive(Debug, Args)]
struct ConfigOverrides {
    #[arg(long)]
    radius: Option<usize>,
    #[arg(long)]
    columns: Option<usize>,
    #[arg(long)]
    capacity: Option<usize>,
    #[arg(long)]
    load_budget: Option<usize>,
    #[arg(long)]
    ticks_per_load: Option<u32>,
}

impl ConfigOverrides {
    fn apply(&self, config: &mut CacheConfig) {
        if let Some(radius) = self.radius {
            config.window.radius = radius;
            if self.capacity.is_none() {
                config.capacity = config.capacity.max(config.window.max_width());
            }
        }
        if let Some(columns) = self.columns {
            config.window.columns = columns;
        }
        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if let Some(load_budget) = self.load_budget {
            config.load_budget = load_budget;
        }
        if let Some(ticks_per_load) = self.ticks_per_load {
            config.ticks_per_load = ticks_per_load;
        }
    }
}

/// One step of a cursor script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Move {
    Step(Direction),
    FocusLost,
    FocusGained,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    directory: String,
    items: usize,
    moves: usize,
    frames: u64,
    ticks: u64,
    settled: bool,
    focused: bool,
    window: Window,
    selected: Option<SelectedOutput>,
    resident: Vec<usize>,
    failed: Vec<usize>,
    pending: usize,
    peak_live: usize,
    stats: CacheStats,
    warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SelectedOutput {
    index: usize,
    id: String,
    name: String,
    thumbnail: Option<ThumbnailOutput>,
}

#[derive(Debug, Serialize)]
struct ThumbnailOutput {
    width: u32,
    height: u32,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    init_logging(cli.verbose);

    match cli.command {
        Commands::Simulate(args) => run_simulate(&args),
        Commands::Config { config, overrides } => {
            let config = effective_config(config.as_deref(), &overrides)?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    use env_logger::{Builder, Env};

    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // A logger may already be installed when `run` is called more than once
    let _ = builder.try_init();
}

/// Configuration file (or defaults), then environment, then flags
fn effective_config(file: Option<&Path>, overrides: &ConfigOverrides) -> Result<CacheConfig> {
    let base = match file {
        Some(path) => CacheConfig::from_file(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => {
            let path = CacheConfig::default_path();
            if path.is_file() {
                log::debug!("using config {}", path.display());
                CacheConfig::from_file(&path)
                    .with_context(|| format!("failed to read config {}", path.display()))?
            } else {
                CacheConfig::default()
            }
        }
    };

    let mut config = base.apply_env().context("invalid environment configuration")?;
    overrides.apply(&mut config);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn run_simulate(args: &SimulateArgs) -> Result<()> {
    ensure_directory(&args.dir)?;
    let moves = parse_moves(&args.moves)?;
    let config = effective_config(args.config.as_deref(), &args.overrides)?;

    let items = scan_images(&args.dir)?;
    log::debug!("found {} images in {}", items.len(), args.dir.display());

    let workers = args.workers.unwrap_or_else(num_cpus);
    let backend = ThreadedBackend::new(ThumbnailDecoder { size: args.thumb_size }, workers)
        .context("failed to start decode workers")?;
    let cache = WindowedAssetCache::new(config.clone(), backend).context("invalid configuration")?;

    let mut simulation = Simulation {
        cache,
        cadence: LoadCadence::new(config.ticks_per_load),
        max_frames: args.max_frames,
    };
    simulation.cache.on_collection_changed(items);
    if !simulation.cache.items().is_empty() {
        simulation.move_cursor(0)?;
    }
    let mut settled = simulation.run_until_settled();

    for step in &moves {
        simulation.apply(*step)?;
        settled = simulation.run_until_settled();
    }

    let report = simulation.report(&args.dir, moves.len(), settled);
    let json = serde_json::to_string_pretty(&report)?;
    println!("{json}");

    Ok(())
}

/// Frame loop around the cache
struct Simulation<B: AssetBackend> {
    cache: WindowedAssetCache<B>,
    cadence: LoadCadence,
    max_frames: u64,
}

impl<B: AssetBackend<Asset = DynamicImage>> Simulation<B> {
    fn apply(&mut self, step: Move) -> Result<()> {
        match step {
            Move::Step(direction) => {
                let Some(cursor) = self.cache.cursor() else {
                    return Ok(());
                };
                let columns = self.cache.config().window.columns;
                match direction.step(cursor, columns, self.cache.items().len()) {
                    Some(next) => self.move_cursor(next)?,
                    None => log::debug!("move {direction:?} from {cursor} blocked at the edge"),
                }
            }
            Move::FocusLost => self.cache.on_focus_lost(),
            Move::FocusGained => {
                self.cache.on_focus_gained();
                self.cadence.hurry();
            }
        }
        Ok(())
    }

    fn move_cursor(&mut self, index: usize) -> Result<()> {
        self.cache.on_cursor_moved(index)?;
        self.cadence.hurry();
        Ok(())
    }

    /// Run frames until the window is settled or the frame cap is hit.
    fn run_until_settled(&mut self) -> bool {
        while !self.cache.is_settled() {
            if self.cadence.frames() >= self.max_frames {
                log::warn!("stopped after {} frames with loads outstanding", self.max_frames);
                return false;
            }
            if self.cadence.advance() && self.cache.tick().is_idle() {
                thread::sleep(IDLE_WAIT);
            }
        }
        true
    }

    fn report(&mut self, dir: &Path, moves: usize, settled: bool) -> SimulationReport {
        let stats = self.cache.stats();
        let selected = self.cache.cursor().and_then(|index| {
            let item = self.cache.selected_item()?;
            let thumbnail = match self.cache.asset_for(index) {
                AssetState::Resident(image) => Some(ThumbnailOutput {
                    width: image.width(),
                    height: image.height(),
                }),
                AssetState::Pending | AssetState::Unloaded => None,
            };
            Some(SelectedOutput {
                index,
                id: item.id().to_string(),
                name: item.name().to_string(),
                thumbnail,
            })
        });

        SimulationReport {
            directory: dir.display().to_string(),
            items: self.cache.items().len(),
            moves,
            frames: self.cadence.frames(),
            ticks: self.cadence.ticks(),
            settled,
            focused: self.cache.is_focused(),
            window: *self.cache.window(),
            selected,
            resident: self.cache.resident_indices(),
            failed: self.cache.failed_indices(),
            pending: stats.pending,
            peak_live: stats.peak_live,
            stats,
            warnings: self
                .cache
                .drain_warnings()
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Decodes image files into thumbnails
struct ThumbnailDecoder {
    size: u32,
}

impl AssetDecoder for ThumbnailDecoder {
    type Asset = DynamicImage;

    fn decode(&self, source: &Path) -> Result<DynamicImage, AssetError> {
        if !source.is_file() {
            return Err(AssetError::NotFound(source.to_path_buf()));
        }
        let image = image::open(source).map_err(|err| match err {
            ImageError::IoError(err) => AssetError::Io(err),
            other => AssetError::Decode {
                path: source.to_path_buf(),
                reason: other.to_string(),
            },
        })?;
        Ok(image.thumbnail(self.size, self.size))
    }
}

fn parse_moves(script: &str) -> Result<Vec<Move>> {
    script
        .chars()
        .enumerate()
        .filter(|(_, c)| !c.is_whitespace())
        .map(|(position, c)| match c.to_ascii_uppercase() {
            'L' => Ok(Move::Step(Direction::Left)),
            'R' => Ok(Move::Step(Direction::Right)),
            'U' => Ok(Move::Step(Direction::Up)),
            'D' => Ok(Move::Step(Direction::Down)),
            '-' => Ok(Move::FocusLost),
            '+' => Ok(Move::FocusGained),
            _ => Err(anyhow::anyhow!(
                "invalid move {c:?} at position {position} (expected L, R, U, D, - or +)"
            )),
        })
        .collect()
}

/// Image files directly inside `dir`, sorted by file name
fn scan_images(dir: &Path) -> Result<Vec<Item>> {
    let mut items = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to read {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(extension) = path.extension() else {
            continue;
        };
        let extension = extension.to_string_lossy().to_lowercase();
        if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            continue;
        }

        let id = entry.file_name().to_string_lossy().into_owned();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| id.clone());
        items.push(Item::new(id, name, path));
    }
    Ok(items)
}

fn ensure_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("directory does not exist: {}", path.display());
    }

    if !path.is_dir() {
        anyhow::bail!("path is not a directory: {}", path.display());
    }

    Ok(())
}

/// Get the number of logical CPU cores.
fn num_cpus() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides() -> ConfigOverrides {
        ConfigOverrides {
            radius: None,
            columns: None,
            capacity: None,
            load_budget: None,
            ticks_per_load: None,
        }
    }

    #[test]
    fn test_parse_moves() {
        let moves = parse_moves("R r D -+ L U").unwrap();
        assert_eq!(
            moves,
            vec![
                Move::Step(Direction::Right),
                Move::Step(Direction::Right),
                Move::Step(Direction::Down),
                Move::FocusLost,
                Move::FocusGained,
                Move::Step(Direction::Left),
                Move::Step(Direction::Up),
            ]
        );
    }

    #[test]
    fn test_parse_moves_rejects_unknown() {
        let err = parse_moves("RRx").unwrap_err();
        assert!(err.to_string().contains("invalid move 'x' at position 2"));
    }

    #[test]
    fn test_radius_override_grows_capacity() {
        let mut config = CacheConfig::default();
        let flags = ConfigOverrides {
            radius: Some(20),
            ..overrides()
        };
        flags.apply(&mut config);
        assert_eq!(config.window.radius, 20);
        assert_eq!(config.capacity, 41);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_capacity_wins() {
        let mut config = CacheConfig::default();
        let flags = ConfigOverrides {
            radius: Some(2),
            capacity: Some(5),
            ..overrides()
        };
        flags.apply(&mut config);
        assert_eq!(config.capacity, 5);
    }
}
