use clap::{Parser, Subcommand};

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "focusgate", version, about = "Focusgate CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gate as a message host over stdin/stdout (one JSON object per line)
    Serve,
    /// Focus requirement and allowance settings
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Blocked domain list
    Domains {
        #[command(subcommand)]
        action: commands::domains::DomainsAction,
    },
}

fn main() {
    logging::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Serve => commands::serve::run(),
        Commands::Config { action } => commands::config::run(action),
        Commands::Domains { action } => commands::domains::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
