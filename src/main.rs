use clap::Parser;
use dynamic_form::cli::commands::{cmd_extract, cmd_inspect};
use dynamic_form::cli::config::{Cli, Commands, load_config, resolve_settings};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // RUST_LOG wins over -v.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dynamic_form={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Inspect { form } => {
            let settings = resolve_settings(cli.base_url.as_deref(), &form, &config);
            cmd_inspect(&form, &settings)?;
        }
        Commands::Extract { form, external } => {
            let settings = resolve_settings(cli.base_url.as_deref(), &form, &config);
            cmd_extract(&form, &external, &settings)?;
        }
    }

    Ok(())
}
