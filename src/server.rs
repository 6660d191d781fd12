use crate::cli::ServeArgs;
use crate::infra::{AmiTableStatus, AppState, Catalog};
use crate::routes::with_search_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use metrolist::config::{AppConfig, SourceConfig};
use metrolist::error::AppError;
use metrolist::telemetry;
use metrolist::workflows::ami::AmiIncomeTable;
use metrolist::workflows::search::{load_listings_or_empty, AmiTableSource, DataSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let catalog = Arc::new(Catalog::new(config.search.page_size));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        catalog: catalog.clone(),
    };

    tokio::spawn(load_then_mark_ready(
        catalog.clone(),
        config.sources.clone(),
        readiness_flag.clone(),
    ));

    let app = with_search_routes(catalog)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(?config.environment, %addr, "metrolist search service listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Readiness flips only once the catalog load has finished, whatever its outcome.
pub(crate) async fn load_then_mark_ready(
    catalog: Arc<Catalog>,
    sources: SourceConfig,
    readiness: Arc<AtomicBool>,
) {
    load_catalog(catalog.clone(), sources).await;
    readiness.store(true, Ordering::Release);
    let status = catalog.status().await;
    info!(homes = status.homes, "catalog loaded; metrolist search service ready");
}

/// One-shot fetch of listings and the AMI table; failures leave the empty or unavailable state.
pub(crate) async fn load_catalog(catalog: Arc<Catalog>, sources: SourceConfig) {
    match sources.ami_table {
        Some(location) => {
            let source = DataSource::new(location);
            match source.fetch_ami_table().await {
                Ok(table) => catalog.set_ami_table(AmiTableStatus::Ready(table)).await,
                Err(err) => {
                    error!(source = %source.location(), error = %err, "AMI estimation unavailable");
                    catalog.set_ami_table(AmiTableStatus::Unavailable).await;
                }
            }
        }
        None => {
            catalog
                .set_ami_table(AmiTableStatus::Ready(AmiIncomeTable::default()))
                .await
        }
    }

    match sources.listings {
        Some(location) => {
            let homes = load_listings_or_empty(&DataSource::new(location)).await;
            catalog.install_listings(homes).await;
        }
        None => warn!("METROLIST_LISTINGS_SOURCE is not set; serving no listings"),
    }
}
