//! # Fairgrid CLI
//!
//! Command-line interface for the fairgrid library.
//! Surveys commute-time parity around two locations and writes the result
//! as a colored GeoJSON rectangle layer.

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use fairgrid::{
    cell_count, to_geojson, DirectionsConfig, GeoPoint, ParityRect, Sample, SurveyOptions,
    SurveyReport,
};
use log::error;

mod cli;

/// Command-line interface for fairgrid
#[derive(Parser)]
#[command(name = "fairgrid")]
#[command(about = "Commute-time parity sampler for two locations")]
#[command(long_about = "Samples a spiral grid around the midpoint of two locations and colors
each cell by how balanced the transit commute to both is:
  fairgrid 52.4595,13.3284 52.5433,13.4128            # Survey, write parity.geojson
  fairgrid 52.4595,13.3284 52.5433,13.4128 -          # Stream GeoJSON to stdout
  fairgrid 52.4595,13.3284 52.5433,13.4128 --max-ring 3 --spacing-km 0.5

File Overwrite Behavior:
  By default, you'll be prompted if the output file exists
  --force                          # Overwrite without asking
  --no-clobber                     # Never overwrite, fail if file exists")]
#[command(version)]
struct Cli {
    /// First location as "lat,lng" (e.g. "52.4595,13.3284")
    first: String,

    /// Second location as "lat,lng"
    second: String,

    /// Output file path, or "-" for stdout
    #[arg(default_value = "")]
    output: String,

    /// Kilometers between adjacent grid points
    #[arg(long, default_value_t = 1.0)]
    spacing_km: f64,

    /// Survey rings 0..MAX_RING of the spiral grid
    #[arg(long, default_value_t = 9)]
    max_ring: u32,

    /// Combined travel time (seconds) mapped to pure red
    #[arg(long, default_value_t = 10800)]
    cap_seconds: u32,

    /// Directions API key (defaults to $FAIRGRID_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Directions endpoint URL override
    #[arg(long)]
    base_url: Option<String>,

    /// Retries per lookup before a cell is given up
    #[arg(long, default_value_t = 30)]
    max_retries: u32,

    /// Retry rate-limited lookups forever (can starve the run)
    #[arg(long)]
    no_retry_cap: bool,

    /// Show what would be surveyed without issuing lookups
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Force overwrite existing files without prompting
    #[arg(short, long)]
    force: bool,

    /// Never overwrite existing files (fail if destination exists)
    #[arg(long)]
    no_clobber: bool,
}

/// Output destination types
#[derive(Debug)]
enum OutputDestination {
    File(String),
    Stdout,
}

/// Resolve output destination from CLI arguments
fn resolve_output(output: &str) -> OutputDestination {
    if output == "-" {
        OutputDestination::Stdout
    } else if output.is_empty() {
        OutputDestination::File("parity.geojson".to_string())
    } else {
        OutputDestination::File(output.to_string())
    }
}

/// Parse a "lat,lng" pair
fn parse_location(text: &str) -> anyhow::Result<GeoPoint> {
    let (lat, lng) = text
        .split_once(',')
        .with_context(|| format!("expected \"lat,lng\", got \"{text}\""))?;
    let lat: f64 = lat.trim().parse().with_context(|| format!("bad latitude in \"{text}\""))?;
    let lng: f64 = lng.trim().parse().with_context(|| format!("bad longitude in \"{text}\""))?;
    if !(-90.0..=90.0).contains(&lat) {
        bail!("latitude {lat} out of range");
    }
    if !(-180.0..=180.0).contains(&lng) {
        bail!("longitude {lng} out of range");
    }
    Ok(GeoPoint::new(lat, lng))
}

/// Check if destination file exists and handle overwrite behavior
fn check_overwrite_permission(file_path: &str, force: bool, no_clobber: bool) -> anyhow::Result<()> {
    if !std::path::Path::new(file_path).exists() {
        return Ok(());
    }

    if force {
        eprintln!("⚠️  Overwriting existing file: {file_path}");
        return Ok(());
    }
    if no_clobber {
        bail!("File already exists: {file_path} (use --force to overwrite)");
    }

    eprintln!("⚠️  File already exists: {file_path}");
    eprint!("Overwrite? [y/N]: ");
    use std::io::Write;
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => {
            eprintln!("✅ Overwriting file");
            Ok(())
        }
        _ => bail!("Survey cancelled by user"),
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Cli::parse();

    // Initialize logging to stderr
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    if args.verbose {
        eprintln!("🗺️  Fairgrid v{} starting...", env!("CARGO_PKG_VERSION"));
    }

    if args.force && args.no_clobber {
        bail!("--force and --no-clobber cannot be used together");
    }

    let first = parse_location(&args.first)?;
    let second = parse_location(&args.second)?;
    let center = GeoPoint::midpoint(first, second);
    let cells = cell_count(args.max_ring);

    let output = resolve_output(&args.output);

    if args.dry_run {
        eprintln!(
            "🔍 [DRY RUN] Would survey {} cells ({} lookups) around ({:.4}, {:.4}) to {:?}",
            cells,
            cells * 2,
            center.lat,
            center.lng,
            output
        );
        return Ok(());
    }

    let mut config = DirectionsConfig::from_env();
    if let Some(key) = args.api_key {
        config.api_key = Some(key);
    }
    if let Some(url) = args.base_url {
        config.base_url = url;
    }

    let cancel = tokio_util::sync::CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n🛑 Interrupt received, stopping survey...");
            ctrl_c_cancel.cancel();
        }
    });

    let quiet = matches!(output, OutputDestination::Stdout);
    let progress_manager = (!quiet).then(|| {
        cli::ProgressManager::new(
            cells * 2,
            &format!(
                "🚇 Surveying {} cells around ({:.4}, {:.4})",
                cells, center.lat, center.lng
            ),
        )
    });

    let options = SurveyOptions {
        spacing_km: args.spacing_km,
        max_ring: args.max_ring,
        max_retries: (!args.no_retry_cap).then_some(args.max_retries),
        cancel,
        progress: progress_manager.as_ref().map(|manager| {
            let pb = manager.pb.clone();
            Arc::new(move |done: u64, total: u64| {
                pb.set_position(done);
                if done >= total {
                    pb.finish_with_message("✅ Survey completed!");
                }
            }) as Arc<dyn Fn(u64, u64) + Send + Sync>
        }),
        ..Default::default()
    };

    let (samples, report) =
        fairgrid::survey_with_options(first, second, options, config).await?;

    let rects: Vec<ParityRect> = samples
        .iter()
        .map(|sample: &Sample| ParityRect::from_sample(sample, args.spacing_km, args.cap_seconds))
        .collect();
    let document = serde_json::to_string_pretty(&to_geojson(&rects))?;

    match output {
        OutputDestination::File(file_path) => {
            check_overwrite_permission(&file_path, args.force, args.no_clobber)?;
            std::fs::write(&file_path, document)
                .with_context(|| format!("writing {file_path}"))?;
            eprintln!("📁 Saved to: {file_path}");
        }
        OutputDestination::Stdout => {
            println!("{document}");
        }
    }

    print_summary(&report, args.verbose);
    Ok(())
}

fn print_summary(report: &SurveyReport, verbose: bool) {
    eprintln!(
        "📊 {} samples, {} lookups, {:.1}s",
        report.samples,
        report.lookups,
        report.elapsed.as_secs_f64()
    );
    if report.no_route_legs > 0 {
        eprintln!("ℹ️  {} legs had no transit route", report.no_route_legs);
    }
    if !report.failed_cells.is_empty() {
        eprintln!(
            "⚠️  {} cells gave up after rate-limit retries",
            report.failed_cells.len()
        );
    }
    if verbose && report.rate_limit_retries > 0 {
        eprintln!("ℹ️  {} rate-limit retries", report.rate_limit_retries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_location() {
        let p = parse_location("52.4595,13.3284").unwrap();
        assert_eq!(p, GeoPoint::new(52.4595, 13.3284));

        // Whitespace is tolerated.
        let p = parse_location(" -33.86 , 151.21 ").unwrap();
        assert_eq!(p, GeoPoint::new(-33.86, 151.21));

        assert!(parse_location("52.4595").is_err());
        assert!(parse_location("91.0,0.0").is_err());
        assert!(parse_location("0.0,181.0").is_err());
        assert!(parse_location("north,east").is_err());
    }

    #[test]
    fn test_resolve_output_auto() {
        match resolve_output("") {
            OutputDestination::File(path) => assert_eq!(path, "parity.geojson"),
            _ => panic!("Expected file output"),
        }
    }

    #[test]
    fn test_resolve_output_stdout() {
        match resolve_output("-") {
            OutputDestination::Stdout => {}
            _ => panic!("Expected stdout output"),
        }
    }

    #[test]
    fn test_resolve_output_custom_file() {
        match resolve_output("my-survey.geojson") {
            OutputDestination::File(path) => assert_eq!(path, "my-survey.geojson"),
            _ => panic!("Expected file output"),
        }
    }

    #[test]
    fn test_overwrite_force_and_no_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.geojson");
        let path_str = path.to_str().unwrap();

        // Non-existent file passes under any behavior.
        assert!(check_overwrite_permission(path_str, false, true).is_ok());

        std::fs::write(&path, "{}").unwrap();
        assert!(check_overwrite_permission(path_str, true, false).is_ok());
        assert!(check_overwrite_permission(path_str, false, true).is_err());
    }
}
