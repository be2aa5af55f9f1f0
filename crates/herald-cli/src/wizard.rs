//! The onboarding pipeline, stage by stage.
//!
//! Each stage gates the next: free port -> scaffold -> dev server ->
//! readiness -> tunnel -> health -> sync. Readiness and health exhaustion
//! degrade gracefully; everything else aborts the run.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::ProgressBar;

use herald_api::{ApiClient, EnvironmentMe};
use herald_core::SessionStore;
use herald_tunnel::{ReconnectPolicy, SessionState};

use crate::dev_server::DevServer;
use crate::{cmd, dev_server, health, port, prompt, scaffold};

/// Connection-attempt cap for a freshly issued relay endpoint. A relay
/// that stays unreachable past this fails the setup step instead of
/// retrying forever.
const TUNNEL_CONNECT_ATTEMPTS: u32 = 30;

/// Event triggered to the scaffolded subscriber after a successful sync.
const WELCOME_EVENT: &str = "welcome";

/// Everything the wizard needs, resolved from CLI flags.
#[derive(Debug)]
pub struct WizardArgs {
    pub api_url: String,
    pub tunnel_issuer_url: String,
    pub port: u16,
    pub route: String,
    pub api_key: Option<String>,
    pub project_dir: Option<PathBuf>,
    pub non_interactive: bool,
}

/// Run the setup wizard end to end, then serve the tunnel until
/// interrupted.
pub async fn run(args: WizardArgs) -> Result<()> {
    let (api, environment, secret_key) = validate_credential(&args).await?;
    tracing::info!(environment = %environment.name, "Credential accepted");

    let project_dir = match &args.project_dir {
        Some(dir) => dir.clone(),
        None => prompt::prompt_project_dir(
            args.non_interactive,
            &scaffold::default_project_dir().display().to_string(),
        )?,
    };
    if project_dir.exists() {
        tracing::info!(dir = %project_dir.display(), "Using existing project");
    } else {
        cmd::ensure_tools(&["git", "npm"])?;
        scaffold::clone_starter(&project_dir).await?;
        scaffold::install_dependencies(&project_dir).await?;
    }
    let subscriber_id =
        scaffold::ensure_env_file(&project_dir, &environment.identifier, &secret_key)?;

    let port = port::find_available_port(args.port)?;
    if port != args.port {
        tracing::info!(requested = args.port, port, "Preferred port busy, using next free one");
    }

    let server = DevServer::start(&project_dir, port).await?;

    if !dev_server::wait_for_server_ready(port).await {
        tracing::warn!(port, "Dev server is not answering yet -- continuing anyway");
    }

    let store = SessionStore::load(SessionStore::default_path())?;
    let mut session = SessionState::new(store, ReconnectPolicy::capped(TUNNEL_CONNECT_ATTEMPTS));
    let tunnel_origin = session
        .create_tunnel(port, &args.tunnel_issuer_url, &secret_key)
        .await?;
    let bridge_url = format!("{tunnel_origin}{}", args.route);
    tracing::info!(%bridge_url, "Tunnel established");

    // From here on the relay holds a registration for this session, so
    // every remaining stage races the interrupt signal: Ctrl-C at any
    // point lands in the single cleanup path below.
    let stages = async {
        let spinner = ProgressBar::new_spinner();
        spinner.enable_steady_tick(Duration::from_millis(100));
        let healthy =
            health::monitor_endpoint_health(&tunnel_origin, &args.route, |message| {
                spinner.set_message(message);
            })
            .await;
        spinner.finish_and_clear();

        let mut synced = false;
        if healthy {
            let outcome = herald_api::sync(&bridge_url, &secret_key, &args.api_url).await;
            if outcome.success {
                synced = true;
                tracing::info!("Bridge endpoint synced");
                match api.trigger_event(WELCOME_EVENT, &subscriber_id).await {
                    Ok(()) => {
                        tracing::info!(subscriber = %subscriber_id, "Welcome event triggered");
                    }
                    Err(e) => tracing::warn!(error = %e, "Welcome event was not accepted"),
                }
            } else {
                tracing::warn!(
                    error = outcome.error.as_deref().unwrap_or("unknown"),
                    "Sync failed"
                );
            }
        } else {
            tracing::warn!("Bridge endpoint never reported healthy -- skipping sync");
        }

        #[allow(clippy::print_stdout)]
        {
            println!();
            println!("Herald dev bridge is up!");
            println!();
            println!("  Environment: {}", environment.name);
            println!("  Local:       http://localhost:{port}");
            println!("  Public:      {bridge_url}");
            println!("  Synced:      {}", if synced { "yes" } else { "no" });
            println!();
            println!("Press Ctrl-C to close the tunnel and stop the dev server.");
        }
        anyhow::Ok(())
    };

    match race_interrupt(stages, interrupt_signal()).await {
        Some(result) => {
            result?;
            // Stages done; keep serving the tunnel until interrupted.
            tokio::signal::ctrl_c()
                .await
                .context("waiting for interrupt")?;
        }
        None => {
            tracing::info!("Interrupted mid-stage");
        }
    }

    tracing::info!("Closing tunnel session");
    session.close_all().await;
    server.stop().await;
    Ok(())
}

/// Race `work` against an interrupt future. Returns `None` when the
/// interrupt wins; `work` is dropped (cancelled) in that case.
async fn race_interrupt<W: Future>(work: W, interrupt: impl Future<Output = ()>) -> Option<W::Output> {
    tokio::select! {
        output = work => Some(output),
        () = interrupt => None,
    }
}

/// Resolves when the user interrupts the process.
async fn interrupt_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal stream on this platform; park instead of spuriously
        // cancelling the pipeline.
        std::future::pending::<()>().await;
    }
}

/// Prompt for and validate the API key, looping on rejection until a key
/// is accepted (or failing fast when the key came from a flag or the
/// environment).
async fn validate_credential(
    args: &WizardArgs,
) -> Result<(ApiClient, EnvironmentMe, String)> {
    loop {
        let key = match &args.api_key {
            Some(key) => key.clone(),
            None => prompt::prompt_api_key(args.non_interactive)?,
        };
        let client = ApiClient::new(&args.api_url, &key);
        match client.environment_me().await {
            Ok(environment) => return Ok((client, environment, key)),
            Err(e) => {
                tracing::warn!(error = %e, "API key rejected");
                if args.non_interactive || args.api_key.is_some() {
                    anyhow::bail!("invalid API key: {e}");
                }
            }
        }
    }
}
