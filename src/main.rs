use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, level_filters::LevelFilter, warn};

use polyevo::engine::{Engine, TiledEngine};
use polyevo::raster::Raster;
use polyevo::render::set_polygon_antialiasing;
use polyevo::settings::RunSettings;

#[derive(Parser)]
#[clap(version)]
#[command(about = "Evolve polygons until they look like an image")]
struct Args {
    /// Run configuration (JSON)
    #[arg(short, long)]
    config: PathBuf,
    /// Reference image, overrides image_path from the configuration
    #[arg(short, long)]
    image: Option<PathBuf>,
}

/// JSON-lines writer for per-generation statistics.
/// a failed write is logged once and further records are dropped.
struct MetricsSink {
    path: PathBuf,
    out: Option<BufWriter<File>>,
    error: Option<std::io::Error>,
}

impl MetricsSink {
    fn create(path: Option<&Path>) -> Result<Self> {
        let out = match path {
            Some(p) => {
                create_parent(p)?;
                let file = File::create(p).with_context(|| format!("creating {}", p.display()))?;
                Some(BufWriter::new(file))
            }
            None => None,
        };
        Ok(Self { path: path.map(Path::to_path_buf).unwrap_or_default(), out, error: None })
    }

    fn record<T: Serialize>(&mut self, stats: &T) {
        let Some(out) = self.out.as_mut() else { return };
        let written = serde_json::to_writer(&mut *out, stats)
            .map_err(std::io::Error::from)
            .and_then(|_| out.write_all(b"\n"));
        if let Err(e) = written {
            warn!(path = %self.path.display(), "metrics write failed, dropping further records: {e}");
            self.out = None;
            self.error = Some(e);
        }
    }

    fn finish(mut self) -> Result<()> {
        if let Some(e) = self.error.take() {
            return Err(e).with_context(|| format!("writing metrics to {}", self.path.display()));
        }
        if let Some(mut out) = self.out.take() {
            out.flush().with_context(|| format!("flushing {}", self.path.display()))?;
        }
        Ok(())
    }
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    Ok(())
}

fn save_png(raster: &Raster, path: &Path) -> Result<()> {
    create_parent(path)?;
    raster
        .to_image()
        .save(path)
        .with_context(|| format!("saving {}", path.display()))?;
    info!(path = %path.display(), "best render saved");
    Ok(())
}

fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    create_parent(path)?;
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "genome saved");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match std::env::var("POLYEVO_LOG")
        .unwrap_or_else(|_| "INFO".to_string())
        .to_uppercase()
        .as_str()
    {
        "OFF" => LevelFilter::OFF,
        "ERROR" => LevelFilter::ERROR,
        "WARN" => LevelFilter::WARN,
        "INFO" => LevelFilter::INFO,
        "DEBUG" => LevelFilter::DEBUG,
        "TRACE" => LevelFilter::TRACE,
        x => {
            eprintln!("Invalid log level: {}", x);
            eprintln!("Using default log level: INFO");
            LevelFilter::INFO
        }
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .init();

    // named worker threads show up as "rayon-N" in profilers
    let _ = rayon::ThreadPoolBuilder::new()
        .thread_name(|i| format!("rayon-{i}"))
        .build_global();

    let mut settings = RunSettings::load(&args.config)
        .with_context(|| format!("loading settings from {}", args.config.display()))?;
    if let Some(image) = args.image {
        settings.image_path = Some(image);
    }
    settings.validate().context("invalid settings")?;
    set_polygon_antialiasing(settings.polygon_antialiasing);

    let image_path = settings
        .image_path
        .clone()
        .context("no reference image: set image_path or pass --image")?;
    let img = image::open(&image_path).with_context(|| format!("opening {}", image_path.display()))?;
    let reference = Raster::from_image(&img);
    info!(
        path = %image_path.display(),
        width = reference.width(),
        height = reference.height(),
        "reference loaded"
    );

    let mut metrics = MetricsSink::create(settings.metrics_path.as_deref())?;

    if settings.tile_size.is_some() {
        let mut engine = TiledEngine::new(&settings, &reference).context("building tiled engine")?;
        let summary = engine.run(settings.log_every, |stats| metrics.record(stats));
        metrics.finish()?;
        info!(generations = summary.generations, min_best = summary.best_fitness, "done");

        if let Some(path) = &settings.output_image {
            save_png(&engine.compose(), path)?;
        }
        if let Some(path) = &settings.genome_output {
            save_json(&engine.best_genomes(), path)?;
        }
    } else {
        let mut engine = Engine::from_settings(&settings, Arc::new(reference)).context("building engine")?;
        let summary = engine.run(settings.log_every, |stats| metrics.record(stats));
        metrics.finish()?;
        info!(generations = summary.generations, best = summary.best_fitness, "done");

        let best = engine.best_individual().context("no individual was ever scored")?;
        if let Some(path) = &settings.output_image {
            save_png(&best.render_image(), path)?;
        }
        if let Some(path) = &settings.genome_output {
            save_json(best.genome(), path)?;
        }
    }

    Ok(())
}
