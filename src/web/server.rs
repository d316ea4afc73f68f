use axum::{
    extract::{Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;

use crate::cli::ServeArgs;
use crate::config::StoreConfig;
use crate::store::layout::{inspect, Database, DatabaseLayout, VariantReport};
use crate::store::StoreError;
use crate::utils::validation::validate_query;

/// Request timeout for a single lookup
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_CONCURRENT_REQUESTS: usize = 100;

/// Shared application state.
///
/// Stores swap partitions on demand and so need exclusive access; every
/// lookup holds the database lock for its duration.
pub struct AppState {
    pub database: Mutex<Database>,
    pub layout: DatabaseLayout,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_type: String,
    pub details: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LookupParams {
    pub chrom: String,
    pub pos: u64,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(rename = "alt")]
    pub alternate: String,
}

/// Build an error body; internal details are logged, never returned
pub fn create_safe_error_response(
    error_type: &str,
    user_message: &str,
    internal_error: Option<&str>,
) -> ErrorResponse {
    if let Some(internal_msg) = internal_error {
        tracing::error!("Internal error ({}): {}", error_type, internal_msg);
    }

    ErrorResponse {
        error: user_message.to_string(),
        error_type: error_type.to_string(),
        details: None,
    }
}

fn error_response(status: StatusCode, body: ErrorResponse) -> Response {
    (status, Json(body)).into_response()
}

/// Run the lookup service
///
/// # Errors
///
/// Returns an error if the database cannot be opened, the tokio runtime
/// cannot be created, or the server fails to start.
pub fn run(args: ServeArgs, config: &StoreConfig) -> anyhow::Result<()> {
    let layout = DatabaseLayout::resolve(args.database.as_deref(), &config.database);
    let database = Database::open(&layout, config)?;
    if database.open_count() == 0 {
        tracing::warn!("Serving an empty database; every lookup will report stores as unavailable");
    }
    let state = Arc::new(AppState {
        database: Mutex::new(database),
        layout,
    });

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move { run_server(args, state).await })
}

/// Create the application router with all routes and middleware configured.
///
/// # Errors
///
/// Returns an error if the rate limiter configuration is rejected.
pub fn create_router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(10)
        .burst_size(50)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limiter configuration"))?;

    let app = Router::new()
        .route("/api/lookup", get(lookup_handler))
        .route("/api/info", get(info_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("x-content-type-options"),
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("x-frame-options"),
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("referrer-policy"),
                    HeaderValue::from_static("no-referrer"),
                ))
                .layer(GovernorLayer {
                    config: Arc::new(governor_conf),
                })
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    REQUEST_TIMEOUT,
                ))
                .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS)),
        );

    Ok(app)
}

async fn run_server(args: ServeArgs, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state)?;

    let addr = format!("{}:{}", args.address, args.port);
    println!("Starting allele-store lookup service at http://{addr}");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// `GET /api/lookup?chrom=&pos=&ref=&alt=`
async fn lookup_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LookupParams>,
) -> Response {
    let (position, reference, alternate) =
        match validate_query(params.pos, &params.reference, &params.alternate) {
            Ok(query) => query,
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    create_safe_error_response("invalid_query", &e.to_string(), None),
                )
            }
        };

    // loads may decompress a whole partition; keep them off the async workers
    let result = tokio::task::spawn_blocking(move || -> Result<VariantReport, LookupFailure> {
        let mut database = state.database.lock().map_err(|_| LookupFailure::Poisoned)?;
        database
            .lookup(&params.chrom, position, &reference, &alternate)
            .map_err(LookupFailure::Store)
    })
    .await;

    match result {
        Ok(Ok(report)) => Json(report).into_response(),
        Ok(Err(LookupFailure::Store(StoreError::UnknownChromosome(e)))) => error_response(
            StatusCode::BAD_REQUEST,
            create_safe_error_response("unknown_chromosome", &e.to_string(), None),
        ),
        Ok(Err(failure)) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            create_safe_error_response(
                "lookup_failed",
                "Lookup failed",
                Some(&failure.to_string()),
            ),
        ),
        Err(join) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            create_safe_error_response("lookup_failed", "Lookup failed", Some(&join.to_string())),
        ),
    }
}

#[derive(Debug, thiserror::Error)]
enum LookupFailure {
    #[error("database lock poisoned by an earlier failed lookup")]
    Poisoned,
    #[error(transparent)]
    Store(StoreError),
}

/// `GET /api/info`
async fn info_handler(State(state): State<Arc<AppState>>) -> Response {
    match inspect(&state.layout) {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            create_safe_error_response("inspect_failed", "Could not read store headers", Some(&e.to_string())),
        ),
    }
}
