mod analysis;
mod cli;
mod error;
mod fmt;
mod frame;
mod models;
mod settings;
mod stats;
mod temporal;
mod tui;

use clap::{CommandFactory, Parser};
use tracing::Level;

use cli::{Cli, Commands, ConfigCommands};

fn init_logging(verbose: bool) {
    let level = if verbose {
        Level::DEBUG
    } else {
        settings::load_settings()
            .log_level
            .parse::<Level>()
            .unwrap_or(Level::WARN)
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Analyze {
            file,
            params,
            format,
            output,
        } => cli::report::run(&file, &params, format, output),
        Commands::Dashboard { file, params } => cli::dashboard::run(&file, &params),
        Commands::Operations => cli::operations::list(),
        Commands::Config { command } => match command {
            ConfigCommands::Show => cli::config::show(),
            ConfigCommands::Set { key, value } => cli::config::set(&key, &value),
        },
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "ledgerscope",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
