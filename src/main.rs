//! sov-herald — Binary entrypoint.
//! Polls the EVE notification feed on a fixed interval and announces new
//! sovereignty notifications to a chat room.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sov_herald::config::Settings;
use sov_herald::dedup::SeenStore;
use sov_herald::directory::XmlApiDirectory;
use sov_herald::feed::XmlApiFeed;
use sov_herald::notify::{RoomNotifier, WebhookNotifier};
use sov_herald::pipeline::Pipeline;
use sov_herald::scheduler::{self, PollerCfg};
use sov_herald::sde::SdeDataset;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sov_herald=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op where the environment is already set.
    let _ = dotenvy::dotenv();
    init_tracing();

    let settings = Settings::load_default()?;

    let client = reqwest::Client::new();
    let feed = Arc::new(XmlApiFeed::new(client.clone(), &settings.api));
    let directory = Arc::new(XmlApiDirectory::new(client));
    let seen = SeenStore::open(&settings.store.seen_db).await?;
    let sde = Arc::new(SdeDataset::open(&settings.store.sde_db)?);

    let pipeline = Arc::new(Pipeline::new(
        feed,
        directory,
        seen,
        sde,
        settings.supported_kinds(),
    ));
    let notifier: Arc<dyn RoomNotifier> =
        Arc::new(WebhookNotifier::new(settings.room.webhook_url.clone()));

    info!(
        interval_secs = settings.poll.interval_secs,
        "starting poll loop"
    );
    let poller = scheduler::spawn_poller(
        pipeline,
        notifier,
        PollerCfg {
            interval_secs: settings.poll.interval_secs,
        },
    );
    poller.await?;
    Ok(())
}
