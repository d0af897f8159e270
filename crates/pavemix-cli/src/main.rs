use clap::{Parser, Subcommand, ValueEnum};
use log::debug;
use std::path::{Path, PathBuf};

use pavemix_engine::{
    format_sieve, DesignOutcome, GradationEnvelope, MixDesignRequest, MixDesigner, MixReport,
};

#[derive(Parser)]
#[command(name = "pavemix")]
#[command(about = "Least-cost asphalt mix design", long_about = None)]
struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize a blend and report its gradation, volumetrics, and compliance
    Solve {
        /// The request file (target binder, materials, volumetric inputs)
        request: PathBuf,
        /// The gradation envelope file
        #[arg(short, long)]
        envelope: PathBuf,
        #[arg(short, long, value_enum, default_value_t = Format::Pretty)]
        format: Format,
    },
    /// Validate a request's materials without solving
    Check {
        /// The request file
        request: PathBuf,
    },
    /// Validate and print a gradation envelope
    Envelope {
        /// The envelope file
        file: PathBuf,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Pretty,
    Json,
}

fn setup_logger(level: log::LevelFilter) -> Result<(), fern::InitError> {
    use fern::colors::{Color, ColoredLevelConfig};
    let colors = ColoredLevelConfig::new()
        .debug(Color::White)
        .info(Color::Green)
        .warn(Color::BrightYellow)
        .error(Color::BrightRed);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} | {:5} | {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                colors.color(record.level()),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{}", message);
    std::process::exit(1);
}

fn load_request(path: &Path) -> MixDesignRequest {
    MixDesignRequest::from_path(path).unwrap_or_else(|e| fail(format!("✗ {}: {}", path.display(), e)))
}

fn load_envelope(path: &Path) -> GradationEnvelope {
    GradationEnvelope::from_path(path).unwrap_or_else(|e| fail(format!("✗ {}: {}", path.display(), e)))
}

fn print_report(report: &MixReport) {
    let results = &report.results;

    println!("Status: OPTIMAL");
    println!("Target binder: {:.2}%", report.target_binder_percent);
    println!("Total cost: {:.2} per unit mass", results.total_cost);
    for advisory in &report.advisories {
        println!("Note: {}", advisory);
    }
    println!();

    println!("Blend:");
    for line in &results.components {
        println!(
            "  {:24} {:>7.2}%  cost {:>9.2}  contributes {:>8.2}",
            line.name, line.percent, line.unit_cost, line.cost_contribution
        );
    }
    println!(
        "  aggregate mass {:.2}, total binder {:.2}%",
        results.aggregate_mass, results.total_binder
    );
    println!();

    println!("Gradation (% passing):");
    for sieve in &results.gradation {
        println!(
            "  {:>8} mm  {:>6.1}  [{:>5.1}, {:>5.1}]  {}",
            format_sieve(sieve.sieve_mm),
            sieve.passing,
            sieve.lower,
            sieve.upper,
            sieve.verdict
        );
    }
    println!();

    let vol = &results.volumetrics;
    println!("Volumetrics (Gsb {:.3}, Gmm {:.3}):", vol.gsb_blend, vol.gmm);
    for row in &vol.table {
        let value = row
            .value
            .map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| "-".to_string());
        println!("  {:34} {:>6}  {:12} {}", row.metric, value, row.requirement, row.verdict);
    }
    println!();

    println!("Compliance:");
    for check in &results.compliance {
        println!("  {:4} {:36} {}", check.verdict, check.name, check.detail);
    }

    if !report.violations.is_empty() {
        println!();
        println!("Constraint violations:");
        for v in &report.violations {
            println!("  - {}", v.description);
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    if let Err(e) = setup_logger(level) {
        eprintln!("Error setting up logging: {}", e);
    }

    match cli.command {
        Commands::Solve {
            request,
            envelope,
            format,
        } => {
            let envelope = load_envelope(&envelope);
            let request = load_request(&request);
            debug!("loaded {} materials", request.catalog.materials().len());

            let outcome = match MixDesigner::new(&envelope).design(&request) {
                Ok(outcome) => outcome,
                Err(e) => fail(format!("Design error: {}", e)),
            };

            if format == Format::Json {
                match serde_json::to_string_pretty(&outcome) {
                    Ok(json) => println!("{}", json),
                    Err(e) => fail(format!("Error writing report: {}", e)),
                }
            }

            match &outcome {
                DesignOutcome::Solved(report) => {
                    if format == Format::Pretty {
                        print_report(report);
                    }
                }
                DesignOutcome::Infeasible { advisories, .. } => {
                    if format == Format::Pretty {
                        for advisory in advisories {
                            println!("Note: {}", advisory);
                        }
                        println!("Status: INFEASIBLE");
                    }
                    fail("no feasible blend");
                }
            }
        }
        Commands::Check { request: path } => {
            let request = load_request(&path);
            let catalog = &request.catalog;

            println!("✓ {} is valid", path.display());
            println!("  target binder {}%", request.target_binder_percent);
            for m in catalog.materials() {
                let points = m.gradation.len();
                println!(
                    "  {:12} {:24} {:16} cost {:>8.2}  SG {:.3}  {} sieves",
                    m.id, m.name, m.category, m.unit_cost, m.specific_gravity, points
                );
            }
            for advisory in catalog.advisories() {
                println!("  note: {}", advisory);
            }
        }
        Commands::Envelope { file } => {
            let envelope = load_envelope(&file);

            println!("✓ {} is valid ({} sieves)", file.display(), envelope.len());
            for band in envelope.bands() {
                println!("  {:>8} mm  {:>6.1} - {:>6.1}", band.label(), band.lower, band.upper);
            }
        }
    }
}
