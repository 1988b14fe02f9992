use clap::{Arg, ArgMatches, Command};
use common::config::Settings;
use common::telemetry::{WorkerGuard, init_tracing};
use std::process;
use trips::processor::analysis::report;

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_name("FILE")
        .help("Sets a custom config file")
}

/// Loads settings and starts logging for a stage, exiting on failure.
fn setup(matches: &ArgMatches, stage: &str) -> (Settings, WorkerGuard) {
    let config_path = matches.get_one::<String>("config")
        .map(|s| s.as_str())
        .unwrap_or("config/pipeline.toml");

    let settings = match Settings::new(config_path) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load config {}: {}", config_path, e);
            process::exit(1);
        }
    };
    let guard = match init_tracing(&settings.logging, stage) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialise logging: {}", e);
            process::exit(1);
        }
    };

    println!("Starting {} stage with config: {}", stage, config_path);
    (settings, guard)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let matches = Command::new("Trip Analytics")
        .version("1.0")
        .about("Cleans taxi trips and reports emission extremes")
        .subcommand(
            Command::new("clean")
                .about("Validate, deduplicate and combine the raw trip tables")
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("analyze")
                .about("Report emission extremes and chart monthly totals")
                .arg(config_arg()),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("clean", clean_matches)) => {
            let (settings, guard) = setup(clean_matches, "clean");

            match trips::run_clean_stage(&settings).await {
                Ok(outcome) => {
                    for stats in &outcome.stats {
                        println!(
                            "[{}] raw={} dropped_invalid={} duplicates_removed={} clean={}",
                            stats.category,
                            stats.raw_rows,
                            stats.dropped_invalid,
                            stats.duplicates_removed,
                            stats.clean_rows
                        );
                    }
                    let report = &outcome.report;
                    println!(
                        "Combined rows: {} (pickup span {} .. {})",
                        report.total_rows(),
                        report.min_pickup.map(|t| t.to_string()).unwrap_or_else(|| "-".into()),
                        report.max_pickup.map(|t| t.to_string()).unwrap_or_else(|| "-".into())
                    );
                }
                Err(e) => {
                    eprintln!("Clean stage error: {}", e);
                    drop(guard);
                    process::exit(1);
                }
            }
        }

        Some(("analyze", analyze_matches)) => {
            let (settings, guard) = setup(analyze_matches, "analyze");

            match trips::run_analysis_stage(&settings).await {
                Ok(run) => {
                    for line in report::render(&run.results) {
                        println!("{}", line);
                    }
                    match run.chart {
                        Some(path) => println!("\nSaved plot: {}", path.display()),
                        None => println!("\nNo monthly totals to plot"),
                    }
                    println!("\nAnalysis complete.");
                }
                Err(e) => {
                    eprintln!("Analysis failed: {}", e);
                    drop(guard);
                    process::exit(1);
                }
            }
        }

        _ => {
            println!("No subcommand specified. Use --help for usage information.");
            process::exit(1);
        }
    }
}
