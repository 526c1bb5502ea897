use clap::{Parser, Subcommand};
use std::error::Error;
use std::process::ExitCode;
mod commands;
mod config;
mod logging;
mod prompt;
mod template;

#[derive(Parser, Debug)]
#[command(
    name = "goon-template",
    version,
    about = "goon CLI project template and installer",
    long_about = "The goon-template project is both the template and the template installer.\n\
                  `goon-template init PROGRAM_NAME` creates a new project and initializes\n\
                  it using the goon_init script."
)]
struct Args {
    #[command(flatten)]
    global: config::GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new CLI project from this template
    Init(commands::init::InitArgs),
    /// Print the effective configuration as JSON, or save it with --write
    Config(commands::config::ConfigArgs),
}

fn main() -> ExitCode {
    let args = Args::parse();

    let settings = match config::Settings::load(&args.global) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match logging::init_logging(&settings) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Error: failed to initialize logging: {}", err);
            return ExitCode::FAILURE;
        }
    };
    log::debug!("Command line args: {:?}", args);
    if settings.verbose {
        if let Some(path) = &settings.config_file {
            log::info!("Using config file: {}", path.display());
        }
    }

    match run(&args, &settings) {
        Ok(code) => code,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, settings: &config::Settings) -> Result<ExitCode, Box<dyn Error>> {
    match &args.command {
        Some(Commands::Init(init_args)) => {
            let outcome = commands::init::run(init_args, settings)?;
            Ok(ExitCode::from(exit_status_byte(outcome.exit_code())))
        }
        Some(Commands::Config(config_args)) => {
            commands::config::run(config_args, settings)?;
            Ok(ExitCode::SUCCESS)
        }
        None => {
            log::info!("No command specified, use --help for usage information");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Codes outside 0..=255 cannot be reported as-is and become a plain failure.
fn exit_status_byte(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}
