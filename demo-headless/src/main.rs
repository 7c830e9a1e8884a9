use clap::Parser;
use pheromone_field_core::{locate_below, run_pipeline, PipelineOutput, ScenarioConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Attractant dispersion and low-concentration analysis demo
#[derive(Parser, Debug)]
#[command(name = "pheromone-demo")]
#[command(about = "Models attractant dispersion and finds where to dispense more", long_about = None)]
struct Args {
    /// Scenario file (JSON); missing fields use the reference farm scenario
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Time step of the reported field
    #[arg(short, long)]
    time: Option<f64>,

    /// Number of synthetic readings
    #[arg(short, long)]
    samples: Option<usize>,

    /// Number of k-means clusters
    #[arg(short = 'k', long)]
    clusters: Option<usize>,

    /// Seed for sampling and clustering
    #[arg(long)]
    seed: Option<u64>,

    /// Points per axis of the interpolation grid
    #[arg(short, long)]
    resolution: Option<usize>,

    /// Also list interpolated cells below this concentration
    #[arg(long)]
    threshold: Option<f64>,

    /// Print the full result as JSON instead of a report
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(args: &Args) -> Result<ScenarioConfig, String> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
            serde_json::from_str(&text)
                .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?
        }
        None => ScenarioConfig::default(),
    };

    if let Some(time) = args.time {
        config.time_step = time;
    }
    if let Some(samples) = args.samples {
        config.sample_count = samples;
    }
    if let Some(clusters) = args.clusters {
        config.cluster_count = clusters;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(resolution) = args.resolution {
        config.interpolation_resolution = resolution;
    }
    Ok(config)
}

fn print_report(config: &ScenarioConfig, output: &PipelineOutput, threshold: Option<f64>) {
    println!("=== {} Dispersion ===\n", output.pheromone_name);

    let a = &output.annotation;
    println!("Time step:          {:.1}", a.time);
    println!("Decay factor:       {:.3} (multiplier {:.4})", a.decay_factor, a.decay_multiplier);
    println!("Wind influence:     {:.3}", a.wind_influence);
    println!("Dispersion radius:  {:.2}", a.dispersion_radius);
    println!("Peak concentration: {:.6}", a.peak_concentration);

    println!("\nSource | Peak nearby (x, y)     | Value");
    println!("-------|------------------------|---------");
    for (idx, source) in config.sources.iter().enumerate() {
        let displaced = source.position() + config.wind.displacement(a.time);
        let peak = output
            .field
            .peak_near(displaced.x, displaced.y, a.dispersion_radius);
        println!(
            "{:6} | ({:8.2}, {:8.2})     | {:.6}",
            idx, peak.x, peak.y, peak.value
        );
    }

    println!("\nFrame | Time  | Peak");
    println!("------|-------|---------");
    for (idx, frame) in output.frames.iter().enumerate() {
        println!("{:5} | {:5.1} | {:.6}", idx, frame.time(), frame.max_value());
    }

    println!(
        "\n=== Sampled Readings ({}) ===\n",
        output.samples.len()
    );
    println!("Cluster | Size | Latitude | Longitude | Mean conc | Range");
    println!("--------|------|----------|-----------|-----------|----------------");
    for s in &output.cluster_summaries {
        let marker = if output.dispensing_cluster == Some(s.label) { " *" } else { "" };
        println!(
            "{:7} | {:4} | {:8.3} | {:9.3} | {:9.2} | {:6.2} - {:6.2}{}",
            s.label,
            s.size,
            s.centroid_latitude,
            s.centroid_longitude,
            s.mean_concentration,
            s.min_concentration,
            s.max_concentration,
            marker
        );
    }
    println!(
        "k-means: inertia {:.3}, {} iterations, converged: {}",
        output.clusters.inertia, output.clusters.iterations, output.clusters.converged
    );

    if let Some(driest) = output
        .samples
        .iter()
        .min_by(|a, b| a.concentration.total_cmp(&b.concentration))
    {
        println!(
            "Lowest reading: {:.2} (wind {}, humidity {})",
            driest.concentration, driest.wind_speed, driest.humidity
        );
    }

    let grid = output.surface.grid();
    println!(
        "\nInterpolated {} of {} cells ({}x{}), gradients settled after {} iterations",
        output.surface.defined_count(),
        grid.len(),
        grid.nx,
        grid.ny,
        output.gradient_iterations
    );
    let low = &output.low_point;
    println!(
        "Lowest concentration: {:.2} at latitude {:.3}, longitude {:.3}",
        low.concentration, low.latitude, low.longitude
    );

    if let Some(threshold) = threshold {
        let below = locate_below(&output.surface, threshold);
        println!("\nCells below {:.2}: {}", threshold, below.len());
        for p in below.iter().take(10) {
            println!(
                "  ({:8.3}, {:8.3}) -> {:.2}",
                p.latitude, p.longitude, p.concentration
            );
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let output = match run_pipeline(&config) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("Pipeline failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Failed to serialize output: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_report(&config, &output, args.threshold);
    }
    ExitCode::SUCCESS
}
