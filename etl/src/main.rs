use clap::{Arg, Command};
use common::config::Settings;
use common::telemetry::init_tracing;
use std::process;


#[tokio::main(flavor = "current_thread")]
async fn main() {
    let matches = Command::new("Trip Loader")
        .version("1.0")
        .about("Loads monthly taxi trip partitions into the table store")
        .subcommand(
            Command::new("load")
                .about("Fetch every configured month and build the raw tables")
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("FILE")
                        .help("Sets a custom config file"),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("load", load_matches)) => {
            let config_path = load_matches.get_one::<String>("config")
                .map(|s| s.as_str())
                .unwrap_or("config/pipeline.toml");

            let settings = match Settings::new(config_path) {
                Ok(settings) => settings,
                Err(e) => {
                    eprintln!("Failed to load config {}: {}", config_path, e);
                    process::exit(1);
                }
            };
            let guard = match init_tracing(&settings.logging, "load") {
                Ok(guard) => guard,
                Err(e) => {
                    eprintln!("Failed to initialise logging: {}", e);
                    process::exit(1);
                }
            };

            println!("Starting load stage with config: {}", config_path);
            match etl::run_load_stage(&settings).await {
                Ok(summaries) => {
                    for summary in summaries {
                        match summary.created_from {
                            Some(month) => println!(
                                "[{}] {}: {} rows (created from month {:02}, {} appended, {} skipped)",
                                summary.category,
                                summary.table,
                                summary.rows,
                                month,
                                summary.appended.len(),
                                summary.skipped.len()
                            ),
                            None => println!(
                                "[{}] ERROR: could not create {} from any month",
                                summary.category, summary.table
                            ),
                        }
                    }
                }
                Err(e) => {
                    eprintln!("Load stage error: {}", e);
                    drop(guard);
                    process::exit(1);
                }
            }
        },

        _ => {
            eprintln!("Please specify a valid subcommand");
            process::exit(1);
        }
    }
}
