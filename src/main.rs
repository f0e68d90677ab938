use clap::Parser;
use mcp_api_client::config::{Cli, Settings};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let settings = match Settings::from_cli(&cli) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("mcp-api-client: {}", err);
            if let Some(hint) = &err.hint {
                eprintln!("hint: {}", hint);
            }
            std::process::exit(2);
        }
    };
    if let Err(err) = mcp_api_client::mcp::server::run_stdio(settings).await {
        eprintln!("mcp-api-client: {}", err);
        std::process::exit(1);
    }
}
