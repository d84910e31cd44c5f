use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use client_core::{
    load_settings, AuditApi, Coordinator, HttpTransport, Store, SubmitOutcome, SyncClient,
    SyncSnapshot,
};
use shared::asm::AsmRole;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    /// Overrides `server_url` from rla-client.toml / APP__SERVER_URL.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    username: String,
    #[arg(long)]
    password: String,
    #[arg(long)]
    poll_delay_ms: Option<u64>,
    /// Logs every store action and enables action injection.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(url) = args.server_url {
        settings.server_url = url;
    }
    if let Some(delay) = args.poll_delay_ms {
        settings.poll_delay_ms = delay.max(1);
    }
    settings.debug |= args.debug;
    info!(server_url = %settings.server_url, poll_delay_ms = settings.poll_delay_ms, "starting");

    let transport = HttpTransport::new(&settings.server_url, settings.request_timeout())?;
    let store = Store::new();
    let api = AuditApi::new(SyncClient::new(Arc::new(transport), store.clone()));
    let handle = Coordinator::spawn(api, &settings);

    match handle
        .api()
        .login(&args.username, &args.password)?
        .outcome()
        .await
    {
        SubmitOutcome::Ok(_) => {}
        SubmitOutcome::Fail(err) => {
            handle.shutdown();
            bail!("login rejected: {err}");
        }
        SubmitOutcome::NetworkFail(err) => {
            handle.shutdown();
            bail!("server unreachable: {err}");
        }
    }

    let watcher = tokio::spawn(report_progress(store.clone()));

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    if let SubmitOutcome::NetworkFail(err) = handle.api().logout().outcome().await {
        warn!(%err, "logout did not reach the server");
    }
    handle.shutdown();
    watcher.abort();
    Ok(())
}

/// Logs a line whenever any mirrored state machine moves.
async fn report_progress(store: Store) {
    let mut rx = store.watch();
    let mut last: Option<SyncSnapshot> = None;
    loop {
        let snapshot = rx.borrow_and_update().sync_snapshot();
        if last.as_ref() != Some(&snapshot) {
            info!(
                dashboard = ?snapshot.dashboard,
                county = %snapshot.asm_state(AsmRole::County),
                audit_board = %snapshot.asm_state(AsmRole::AuditBoard),
                dos = %snapshot.asm_state(AsmRole::Dos),
                "audit progress"
            );
            last = Some(snapshot);
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}
