// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]
#![allow(clippy::multiple_crate_versions)]

use adserve::{Catalog, Stores};
use adserve_api::{
    AdServer, ApiError, AuctionApiRequest, AuctionResult, ServingConfig, TrackClickRequest,
    TrackClickResponse, TrackConversionRequest, TrackConversionResponse, TrackImpressionRequest,
    TrackImpressionResponse, VoidEventsResponse,
};
use adserve_domain::DEFAULT_SERVING_TIMEZONE;
use adserve_persistence::{Persistence, SharedPersistence};
use axum::{
    Json, Router,
    extract::{Path, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::task::JoinError;
use tracing::{error, info};

/// Ad Serve Server - HTTP server for the ad serving engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON catalog of campaigns, ad groups, creatives and placements.
    #[arg(short, long)]
    catalog: String,

    /// Path to the `SQLite` database file. If not provided, uses in-memory database.
    #[arg(short, long)]
    database: Option<String>,

    /// `MySQL`/`MariaDB` connection URL. Takes precedence over `--database`.
    #[arg(long)]
    mysql_url: Option<String>,

    /// Port to bind the server to
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// IANA timezone that bounds the serving day
    #[arg(short, long, default_value = DEFAULT_SERVING_TIMEZONE)]
    timezone: String,
}

/// Application state shared across handlers.
///
/// The façade is internally synchronized; handlers run it on the blocking
/// pool since every store call may touch the database.
#[derive(Clone)]
struct AppState {
    server: Arc<AdServer>,
}

/// API response for the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HealthResponse {
    status: String,
}

/// Error response type.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ErrorResponse {
    /// Error indicator.
    error: bool,
    /// Error message.
    message: String,
}

/// HTTP error wrapper that implements `IntoResponse`.
#[derive(Debug)]
struct HttpError {
    /// The HTTP status code.
    status: StatusCode,
    /// The error message.
    message: String,
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for HttpError {}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body: Json<ErrorResponse> = Json(ErrorResponse {
            error: true,
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        let status: StatusCode = match err {
            ApiError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            ApiError::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::DomainRuleViolation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal { .. } => {
                error!(error = %err, "Internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JoinError> for HttpError {
    fn from(err: JoinError) -> Self {
        error!(error = %err, "Handler task failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: String::from("Internal error"),
        }
    }
}

/// Runs a façade call on the blocking pool.
async fn run_blocking<T, F>(app_state: &AppState, call: F) -> Result<T, HttpError>
where
    T: Send + 'static,
    F: FnOnce(&AdServer) -> Result<T, ApiError> + Send + 'static,
{
    let server: Arc<AdServer> = Arc::clone(&app_state.server);
    let result: Result<T, ApiError> = tokio::task::spawn_blocking(move || call(&server)).await?;
    result.map_err(HttpError::from)
}

/// Handler for POST /ads/auction endpoint.
///
/// Answers 204 No Content when there is no ad to show.
async fn handle_auction(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<AuctionApiRequest>,
) -> Result<Response, HttpError> {
    info!(placement_id = %req.placement_id, "Handling auction request");

    let result: AuctionResult = run_blocking(&app_state, move |server| {
        server.auction(req, OffsetDateTime::now_utc())
    })
    .await?;

    match result {
        AuctionResult::Served(response) => Ok(Json(response).into_response()),
        AuctionResult::NoAd => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// Handler for POST /ads/impression endpoint.
async fn handle_track_impression(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<TrackImpressionRequest>,
) -> Result<Json<TrackImpressionResponse>, HttpError> {
    info!(impression_id = %req.impression_id, "Handling track_impression request");

    let response: TrackImpressionResponse =
        run_blocking(&app_state, move |server| server.track_impression(&req)).await?;

    Ok(Json(response))
}

/// Handler for POST /ads/click endpoint.
async fn handle_track_click(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<TrackClickRequest>,
) -> Result<Json<TrackClickResponse>, HttpError> {
    info!(impression_id = %req.impression_id, "Handling track_click request");

    let response: TrackClickResponse = run_blocking(&app_state, move |server| {
        server.track_click(req, OffsetDateTime::now_utc())
    })
    .await?;

    Ok(Json(response))
}

/// Handler for POST /ads/conversion endpoint.
async fn handle_track_conversion(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<TrackConversionRequest>,
) -> Result<Json<TrackConversionResponse>, HttpError> {
    info!(click_id = %req.click_id, "Handling track_conversion request");

    let response: TrackConversionResponse = run_blocking(&app_state, move |server| {
        server.track_conversion(req, OffsetDateTime::now_utc())
    })
    .await?;

    Ok(Json(response))
}

/// Handler for DELETE `/ads/impression/{impression_id}` endpoint.
async fn handle_void_impression(
    AxumState(app_state): AxumState<AppState>,
    Path(impression_id): Path<String>,
) -> Result<Json<VoidEventsResponse>, HttpError> {
    info!(impression_id = %impression_id, "Handling void_impression request");

    let response: VoidEventsResponse = run_blocking(&app_state, move |server| {
        server.void_impression(&impression_id)
    })
    .await?;

    Ok(Json(response))
}

/// Handler for DELETE `/ads/click/{click_id}` endpoint.
async fn handle_void_click(
    AxumState(app_state): AxumState<AppState>,
    Path(click_id): Path<String>,
) -> Result<Json<VoidEventsResponse>, HttpError> {
    info!(click_id = %click_id, "Handling void_click request");

    let response: VoidEventsResponse =
        run_blocking(&app_state, move |server| server.void_click(&click_id)).await?;

    Ok(Json(response))
}

/// Handler for DELETE `/ads/conversion/{conversion_id}` endpoint.
async fn handle_void_conversion(
    AxumState(app_state): AxumState<AppState>,
    Path(conversion_id): Path<String>,
) -> Result<Json<VoidEventsResponse>, HttpError> {
    info!(conversion_id = %conversion_id, "Handling void_conversion request");

    let response: VoidEventsResponse = run_blocking(&app_state, move |server| {
        server.void_conversion(&conversion_id)
    })
    .await?;

    Ok(Json(response))
}

/// Handler for GET /health endpoint.
#[allow(clippy::unused_async)]
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: String::from("ok"),
    })
}

/// Builds the application router with all endpoints.
fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/ads/auction", post(handle_auction))
        .route("/ads/impression", post(handle_track_impression))
        .route("/ads/click", post(handle_track_click))
        .route("/ads/conversion", post(handle_track_conversion))
        .route(
            "/ads/impression/{impression_id}",
            delete(handle_void_impression),
        )
        .route("/ads/click/{click_id}", delete(handle_void_click))
        .route(
            "/ads/conversion/{conversion_id}",
            delete(handle_void_conversion),
        )
        .route("/health", get(handle_health))
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args: Args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Initializing Ad Serve Server");

    info!("Loading catalog from: {}", args.catalog);
    let catalog_json: String = std::fs::read_to_string(&args.catalog)?;
    let catalog: Catalog = Catalog::from_json(&catalog_json)?;

    // Pick the backend: MySQL, file-based SQLite, or in-memory SQLite
    let persistence: Persistence = if let Some(url) = &args.mysql_url {
        info!("Using MySQL/MariaDB database");
        Persistence::new_with_mysql(url)?
    } else if let Some(db_path) = &args.database {
        info!("Using file-based database at: {}", db_path);
        Persistence::new_with_file(db_path)?
    } else {
        info!("Using in-memory database");
        Persistence::new_in_memory()?
    };
    let stores: Stores = Stores::shared(&Arc::new(SharedPersistence::new(persistence)));

    let config: ServingConfig = ServingConfig::with_timezone(&args.timezone);
    let server: AdServer = AdServer::new(catalog, &stores, config)?;

    let app_state: AppState = AppState {
        server: Arc::new(server),
    };

    // Build router
    let app: Router = build_router(app_state);

    // Bind to address
    let addr: std::net::SocketAddr = format!("127.0.0.1:{}", args.port).parse()?;
    info!("Server listening on {}", addr);

    // Run server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
