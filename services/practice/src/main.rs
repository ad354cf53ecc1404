//! Practice backend HTTP service entry point.
//!
//! # Purpose
//! Wires configuration, storage, identity and email backends into the HTTP
//! router, then serves the API alongside the metrics listener.
//!
//! # Notes
//! The `build_state` helper keeps wiring testable and minimizes main setup logic.
use anyhow::Context;
use practice::app::{AppState, build_router_with_prefix};
use practice::auth::policy::AdminAllowlist;
use practice::config::{self, IdentityBackend, PracticeConfig, StorageBackend};
use practice::identity::IdentityProvider;
use practice::identity::gotrue::GoTrueIdentityProvider;
use practice::identity::local::LocalIdentityProvider;
use practice::notify::resend::ResendNotifier;
use practice::notify::{DisabledNotifier, Notifier};
use practice::observability;
use practice::store::KvStore;
use practice::store::memory::InMemoryKvStore;
use practice::store::postgres::PostgresKvStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = PracticeConfig::from_env_or_yaml().context("practice config")?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: PracticeConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability("practice-backend")?;
    let state = build_state(&config).await?;
    tracing::info!(
        storage = state.store.backend_name(),
        identity = state.identity.backend_name(),
        notifications = state.notifications.backend_name(),
        admins = config.admin_emails.len(),
        "backends ready"
    );

    let (metrics_stop_tx, metrics_stop_rx) = tokio::sync::oneshot::channel::<()>();
    let metrics_addr = config.metrics_bind;
    let metrics_task = tokio::spawn(async move {
        let stop = async move {
            let _ = metrics_stop_rx.await;
        };
        if let Err(err) = observability::serve_metrics(metrics_handle, metrics_addr, stop).await {
            tracing::warn!(error = %err, %metrics_addr, "metrics listener failed");
        }
    });

    let app = build_router_with_prefix(state, &config.route_prefix);
    let addr = config.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        addr = %listener.local_addr().unwrap_or(addr),
        prefix = %config.route_prefix,
        "practice backend listening"
    );
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {}
    }

    let _ = metrics_stop_tx.send(());
    let _ = metrics_task.await;
    Ok(())
}

async fn build_state(config: &PracticeConfig) -> anyhow::Result<AppState> {
    let store: Arc<dyn KvStore> = match config.storage {
        StorageBackend::Memory => Arc::new(InMemoryKvStore::new()),
        StorageBackend::Postgres => {
            let pg = config
                .postgres
                .as_ref()
                .context("postgres configuration missing")?;
            Arc::new(PostgresKvStore::connect(pg).await?)
        }
    };

    let identity = build_identity(&config.identity)?;
    let notifier = build_notifier(&config.email)?;
    let allowlist = AdminAllowlist::new(config.admin_emails.iter().cloned());
    if allowlist.is_empty() {
        tracing::warn!("no admin emails configured; admin routes will reject every caller");
    }

    Ok(AppState::new(
        store,
        identity,
        notifier,
        allowlist,
        config.bootstrap.clone(),
    ))
}

fn build_identity(config: &config::IdentityConfig) -> anyhow::Result<Arc<dyn IdentityProvider>> {
    match config.backend {
        IdentityBackend::Local => {
            let secret = match &config.local_token_secret {
                Some(secret) => secret.clone(),
                None => {
                    tracing::warn!(
                        "PRACTICE_LOCAL_TOKEN_SECRET unset; issued tokens will not survive a restart"
                    );
                    format!("{}{}", uuid::Uuid::new_v4(), uuid::Uuid::new_v4())
                }
            };
            Ok(Arc::new(LocalIdentityProvider::new(
                &secret,
                Duration::from_secs(config.local_token_ttl_secs),
            )))
        }
        IdentityBackend::GoTrue => {
            let url = config.url.as_deref().context("identity url missing")?;
            let anon_key = config.anon_key.as_deref().context("identity anon key missing")?;
            let service_key = config
                .service_key
                .as_deref()
                .context("identity service key missing")?;
            Ok(Arc::new(GoTrueIdentityProvider::new(
                url,
                anon_key,
                service_key,
                Duration::from_millis(config.request_timeout_ms),
            )?))
        }
    }
}

fn build_notifier(config: &config::EmailConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    match &config.api_key {
        Some(api_key) => Ok(Arc::new(ResendNotifier::new(
            config.api_url.clone(),
            api_key.clone(),
            config.from.clone(),
            Duration::from_millis(config.request_timeout_ms),
        )?)),
        None => {
            tracing::warn!("RESEND_API_KEY unset; email notifications are disabled");
            Ok(Arc::new(DisabledNotifier))
        }
    }
}
