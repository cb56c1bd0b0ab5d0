//! CLI entry point - the composition root.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use olladeck_cli::{
    BenchCommand, Cli, CliError, Commands, EndpointCommand, ModelsCommand, bootstrap, handlers,
};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command.as_ref() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let ctx = bootstrap(&cli).await?;

    match command {
        Commands::Status => handlers::status::execute(&ctx)?,
        Commands::Endpoint { command } => match command {
            EndpointCommand::Check { url } => handlers::endpoint::check(&ctx, url).await?,
        },
        Commands::Models { command } => match command {
            ModelsCommand::List => handlers::models::list(&ctx).await?,
            ModelsCommand::Ps => handlers::models::ps(&ctx).await?,
            ModelsCommand::Pull { name } => handlers::models::pull(&ctx, name).await?,
            ModelsCommand::Rm { name } => handlers::models::remove(&ctx, name).await?,
            ModelsCommand::Stop { name } => handlers::models::stop(&ctx, name).await?,
        },
        Commands::Bench { command } => match command {
            BenchCommand::Run { models, prompt } => {
                handlers::bench::run(&ctx, models, prompt.as_deref()).await?;
            }
        },
        Commands::Gpu { samples } => handlers::gpu::execute(&ctx, *samples).await?,
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Load .env before clap reads env-backed flags
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        let code = err.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        std::process::exit(code);
    }
}
