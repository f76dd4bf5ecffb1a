use std::{convert::Infallible, sync::Arc, time::Duration};

use anyhow::Context;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use invoicedesk_infra::{
    AppConfig, InMemoryInvoiceRepository, InMemoryRouteCache, InvoiceMutationService,
    InvoiceRepository, MutationSettings, PostgresInvoiceRepository,
};

/// Everything the handlers share.
pub struct AppServices {
    pub mutations: InvoiceMutationService<Arc<dyn InvoiceRepository>>,
    pub route_cache: Arc<InMemoryRouteCache>,
}

impl AppServices {
    pub fn new(repo: Arc<dyn InvoiceRepository>, settings: MutationSettings) -> Self {
        Self {
            mutations: InvoiceMutationService::new(repo, settings),
            route_cache: Arc::new(InMemoryRouteCache::new()),
        }
    }

    /// Process-local storage; nothing survives a restart.
    pub fn in_memory(settings: MutationSettings) -> Self {
        Self::new(Arc::new(InMemoryInvoiceRepository::new()), settings)
    }
}

/// Pick storage from config: Postgres when `DATABASE_URL` is set, otherwise
/// the in-memory table.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let settings = MutationSettings {
        delete_enabled: config.delete_enabled,
        ..MutationSettings::default()
    };

    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set; invoices are kept in memory");
        if config.run_migrations {
            tracing::warn!("RUN_MIGRATIONS ignored without a database");
        }
        return Ok(AppServices::in_memory(settings));
    };

    let repo = PostgresInvoiceRepository::connect(url, config.database_max_connections)
        .await
        .context("failed to connect to postgres")?;

    if config.run_migrations {
        repo.migrate().await.context("failed to run migrations")?;
        tracing::info!("migrations applied");
    }

    Ok(AppServices::new(Arc::new(repo), settings))
}

/// SSE feed of revalidated route paths.
pub fn revalidation_sse_stream(
    services: Arc<AppServices>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.route_cache.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(r) => {
            let data = serde_json::to_string(&r).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event("revalidate").data(data)))
        }
        // Lagged receivers skip what they missed.
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
