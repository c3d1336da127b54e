use clap::Parser;
use log::{error, LevelFilter};
use screen_watch::cli::commands::{cmd_compare, cmd_run, cmd_validate, RunArgs};
use screen_watch::cli::config::{Cli, Commands, RunOverrides, load_config};

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            pages,
            storage_root,
            threshold,
            webhook_url,
            jobs,
            format,
            output,
            trace,
        } => {
            let args = RunArgs {
                pages,
                overrides: RunOverrides {
                    storage_root,
                    threshold,
                    webhook_url,
                    jobs,
                },
                format,
                output,
                trace,
            };
            // Per-page failures are in the report; they do not change the exit code.
            cmd_run(&args, &config)?;
        }
        Commands::Compare {
            baseline,
            current,
            out,
            threshold,
        } => {
            let breach = cmd_compare(
                &baseline,
                &current,
                out.as_deref(),
                threshold.unwrap_or(config.threshold),
            )?;
            if breach {
                std::process::exit(1);
            }
        }
        Commands::Validate { pages } => {
            let path = pages.unwrap_or_else(|| config.pages.clone());
            cmd_validate(&path, &config)?;
        }
    }

    Ok(())
}
