use clap::Parser;
use presentation::cli::{Cli, CliApp};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    shared::telemetry::init_tracing(cli.verbose);
    let app = CliApp::from_cli(&cli)?;
    app.run(cli).await?;
    Ok(())
}
