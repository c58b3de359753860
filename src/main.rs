mod app;
mod chat;
mod codec;
mod config;
mod error;
mod event;
mod identity;
mod remote;
mod session;
mod storage;
mod theme;

use anyhow::Context;
use app::CovenantApp;
use chat::{ChatClient, ChatService};
use clap::Parser;
use config::{ChatConfig, Cli};
use eframe::egui;
use remote::{HttpActor, MemoryActor, RemoteActor};
use session::{SessionStore, UnlockGate};
use std::sync::mpsc;
use std::sync::Arc;
use storage::{FileStorage, STORAGE_FILE};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn build_actor(config: &ChatConfig) -> anyhow::Result<Arc<dyn RemoteActor>> {
    if config.demo {
        info!("using in-process demo store");
        return Ok(Arc::new(MemoryActor::new(config.demo_password.clone())));
    }

    let endpoint = config
        .endpoint
        .clone()
        .context("no endpoint configured")?;
    info!(endpoint = %endpoint, "using remote store");
    Ok(Arc::new(HttpActor::new(endpoint, config.request_timeout())))
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ChatConfig::resolve(Cli::parse())?;
    let profile = FileStorage::open(config.data_dir.join(STORAGE_FILE))
        .context("failed to open device profile")?;
    let device_id = identity::get_or_create_device_id(&profile)?;
    info!(device_id = %device_id, profile = %profile.path().display(), "device profile loaded");

    let actor = build_actor(&config)?;
    let (tx, rx) = mpsc::channel();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("covenant-runtime")
        .build()?;

    let client = ChatClient::new(
        ChatService::new(actor),
        tx,
        runtime.handle().clone(),
        config.poll_interval(),
    );
    let gate = UnlockGate::new(SessionStore::default(), device_id);
    let password_hint = config.demo.then(|| config.demo_password.clone());

    let app = CovenantApp::new(rx, client, gate, password_hint);
    let _runtime = runtime;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Covenant Chat")
            .with_inner_size([720.0, 800.0])
            .with_min_inner_size([420.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Covenant Chat",
        native_options,
        Box::new(move |_creation_context| Ok(Box::new(app))),
    )
    .map_err(|err| anyhow::anyhow!("failed to run window: {err}"))?;

    Ok(())
}
