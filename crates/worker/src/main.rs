//! Notification worker.
//!
//! Loads site data from a JSON fixture, replays change events from a
//! JSON-lines file through the event bus and delivers the resulting mail
//! over SMTP, or logs it when SMTP is not configured.
//!
//! | Env Var        | Default                                   |
//! |----------------|-------------------------------------------|
//! | `SITE_FIXTURE` | unset (empty site)                        |
//! | `EVENTS_FILE`  | `events.jsonl`                            |
//! | `RUST_LOG`     | `reviewmail_worker=debug,reviewmail=info` |
//!
//! SMTP and message settings are read by `EmailConfig::from_env` and
//! `NotifySettings::from_env`.

mod replay;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use reviewmail_events::{EmailConfig, EventBus, LogMailSender, NotificationRouter, SmtpMailSender};
use reviewmail_notify::{
    ChangeNotifier, Collaborators, HandlebarsRenderer, MailSender, NotifySettings,
};
use reviewmail_store::{MemoryStore, SiteFixture};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_EVENTS_FILE: &str = "events.jsonl";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "reviewmail_worker=debug,reviewmail_notify=info,reviewmail_events=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = match std::env::var("SITE_FIXTURE") {
        Ok(path) => {
            let store = SiteFixture::load(&path)
                .with_context(|| format!("failed to load site fixture {path}"))?
                .into_store();
            tracing::info!(path = %path, accounts = store.account_count(), "Site fixture loaded");
            store
        }
        Err(_) => {
            tracing::warn!("SITE_FIXTURE not set, starting with an empty site");
            MemoryStore::new()
        }
    };
    let events_file = PathBuf::from(
        std::env::var("EVENTS_FILE").unwrap_or_else(|_| DEFAULT_EVENTS_FILE.into()),
    );

    let settings = NotifySettings::from_env().context("invalid notification settings")?;
    let sender: Arc<dyn MailSender> = match EmailConfig::from_env() {
        Some(config) => {
            tracing::info!(host = %config.smtp_host, port = config.smtp_port, "SMTP delivery enabled");
            Arc::new(SmtpMailSender::new(config).context("failed to set up SMTP transport")?)
        }
        None => {
            tracing::warn!("SMTP_HOST not set, notifications will only be logged");
            Arc::new(LogMailSender::new())
        }
    };
    let renderer = Arc::new(HandlebarsRenderer::new().context("failed to compile templates")?);
    let deps = Collaborators::from_store(Arc::new(store), sender, renderer);
    let notifier = ChangeNotifier::new(deps, settings);

    let bus = EventBus::default();
    let cancel = CancellationToken::new();
    let router = tokio::spawn(NotificationRouter::new(notifier).run(bus.subscribe(), cancel.clone()));

    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, stopping notification router");
            ctrl_c_cancel.cancel();
        }
    });

    tracing::info!(path = %events_file.display(), "Worker starting, replaying change events");
    let published = replay::replay_file(&bus, &events_file).await?;
    drop(bus);

    let stats = router.await.context("notification router panicked")?;
    tracing::info!(
        published,
        sent = stats.sent,
        skipped = stats.skipped,
        failed = stats.failed,
        "Worker finished"
    );
    Ok(())
}
