use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use herald_cli::wizard::{self, WizardArgs};

/// Herald dev-bridge setup wizard.
#[derive(Debug, Parser)]
#[command(name = "herald", version, about)]
struct Cli {
    /// Herald platform API base URL
    #[arg(long, default_value = "https://api.herald.dev")]
    api_url: String,

    /// Tunnel issuer endpoint
    #[arg(long, default_value = "https://tunnel.herald.dev/api/endpoints")]
    tunnel_issuer_url: String,

    /// Preferred local port for the dev server
    #[arg(long, short, default_value_t = 4000)]
    port: u16,

    /// Route the sample app serves its bridge endpoint on
    #[arg(long, default_value = "/api/herald")]
    route: String,

    /// API key (prompted for when omitted)
    #[arg(long, env = "HERALD_API_KEY")]
    api_key: Option<String>,

    /// Directory to scaffold the starter project into
    #[arg(long)]
    project_dir: Option<PathBuf>,

    /// Run without interactive prompts (use defaults or CLI flags)
    #[arg(long)]
    non_interactive: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    herald_core::tracing_init::init_tracing("herald=info", false);

    let cli = Cli::parse();
    wizard::run(WizardArgs {
        api_url: cli.api_url,
        tunnel_issuer_url: cli.tunnel_issuer_url,
        port: cli.port,
        route: cli.route,
        api_key: cli.api_key,
        project_dir: cli.project_dir,
        non_interactive: cli.non_interactive,
    })
    .await
}
