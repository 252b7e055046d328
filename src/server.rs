//! HTTP surface: one GET route per mapper, JSON in and out.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::{Query, QueryRejection};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::app::{
    App, AssociationCollection, DEFAULT_ASSOCIATION_LIMIT, DEFAULT_ASSOCIATION_OFFSET,
    DEFAULT_SEARCH_CATEGORY, DEFAULT_SEARCH_LIMIT, DEFAULT_SEARCH_OFFSET,
    DEFAULT_SIMILARITY_LIMIT, EntityDescriptor, SearchResults, SimilarityResults,
};
use crate::config::Settings;
use crate::domain::{Direction, EntityKind, Identifier};
use crate::error::BridgeError;

pub type SharedState = Arc<App>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorMessage,
}

#[derive(Debug, Serialize)]
struct ErrorMessage {
    message: String,
}

/// Maps [`BridgeError`] onto a status code and a `{"error": {"message"}}` body.
#[derive(Debug)]
pub struct ApiError(pub BridgeError);

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        ApiError(err)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(BridgeError::InvalidQuery(rejection.to_string()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        if self.0.is_invalid_input() {
            StatusCode::BAD_REQUEST
        } else if self.0.is_upstream() {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.0, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self.0, "rejected request");
        }
        let body = ErrorBody {
            error: ErrorMessage {
                message: self.0.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub term: Option<String>,
    pub category: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssociationParams {
    pub disease_id: Option<String>,
    pub gene_id: Option<String>,
    pub phenotype_id: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl AssociationParams {
    fn anchor(&self, direction: Direction) -> Option<&str> {
        match direction.anchor_kind() {
            EntityKind::Disease => self.disease_id.as_deref(),
            EntityKind::Gene => self.gene_id.as_deref(),
            EntityKind::Phenotype => self.phenotype_id.as_deref(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct IdsParams {
    #[serde(default)]
    pub ids: Vec<String>,
    pub limit: Option<u32>,
}

impl IdsParams {
    fn identifiers(&self) -> Result<Vec<Identifier>, BridgeError> {
        if self.ids.is_empty() {
            return Err(BridgeError::InvalidQuery(
                "at least one `ids` value is required".to_string(),
            ));
        }
        self.ids.iter().map(|id| id.parse()).collect()
    }
}

pub async fn search(
    State(app): State<SharedState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResults>, ApiError> {
    let Query(params) = params?;
    let term = params
        .term
        .ok_or_else(|| BridgeError::InvalidQuery("missing `term`".to_string()))?;
    let category = params
        .category
        .unwrap_or_else(|| DEFAULT_SEARCH_CATEGORY.to_string());
    let results = app
        .search_entity(
            &term,
            &category,
            params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
            params.offset.unwrap_or(DEFAULT_SEARCH_OFFSET),
        )
        .await?;
    Ok(Json(results))
}

pub async fn associations(
    direction: Direction,
    app: SharedState,
    params: Result<Query<AssociationParams>, QueryRejection>,
) -> Result<Json<AssociationCollection>, ApiError> {
    let Query(params) = params?;
    let anchor: Identifier = params
        .anchor(direction)
        .ok_or_else(|| {
            BridgeError::InvalidQuery(format!("missing `{}`", direction.anchor_param()))
        })?
        .parse()?;
    let collection = app
        .associations(
            direction,
            &anchor,
            params.limit.unwrap_or(DEFAULT_ASSOCIATION_LIMIT),
            params.offset.unwrap_or(DEFAULT_ASSOCIATION_OFFSET),
        )
        .await?;
    Ok(Json(collection))
}

pub async fn entity(
    State(app): State<SharedState>,
    params: Result<Query<IdsParams>, QueryRejection>,
) -> Result<Json<Vec<EntityDescriptor>>, ApiError> {
    let Query(params) = params?;
    let ids = params.identifiers()?;
    Ok(Json(app.get_entities(&ids).await?))
}

pub async fn phenotype_profile_search(
    State(app): State<SharedState>,
    params: Result<Query<IdsParams>, QueryRejection>,
) -> Result<Json<SimilarityResults>, ApiError> {
    let Query(params) = params?;
    let ids = params.identifiers()?;
    let limit = params.limit.unwrap_or(DEFAULT_SIMILARITY_LIMIT);
    Ok(Json(app.search_phenotype_profiles(ids, limit).await?))
}

/// Logs caller context forwarded by the assistant platform.
async fn log_request(request: Request, next: Next) -> Response {
    {
        let headers = request.headers();
        info!(
            method = %request.method(),
            path = request.uri().path(),
            query = request.uri().query().unwrap_or(""),
            origin = %header_value(headers, "origin"),
            conversation_id = %header_value(headers, "openai-conversation-id"),
            ephemeral_user_id = %header_value(headers, "openai-ephemeral-user-id"),
            "request"
        );
    }
    next.run(request).await
}

fn header_value(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

pub fn build_router(app: SharedState, static_dir: Option<&Utf8Path>) -> Router {
    let mut router: Router<SharedState> = Router::new()
        .route("/search", get(search))
        .route("/entity", get(entity))
        .route("/phenotype-profile-search", get(phenotype_profile_search));

    for direction in Direction::ALL {
        router = router.route(
            direction.path(),
            get(
                move |State(app): State<SharedState>,
                      params: Result<Query<AssociationParams>, QueryRejection>| {
                    associations(direction, app, params)
                },
            ),
        );
    }

    if let Some(dir) = static_dir {
        router = router
            .nest_service("/.well-known", ServeDir::new(dir.join(".well-known")))
            .nest_service("/static", ServeDir::new(dir.join("static")));
    }

    router
        .layer(middleware::from_fn(log_request))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app)
}

/// Binds `settings.bind` and serves until Ctrl-C.
pub async fn serve(app: App, settings: &Settings) -> Result<(), BridgeError> {
    let router = build_router(Arc::new(app), settings.static_dir.as_deref());
    let listener = tokio::net::TcpListener::bind(&settings.bind)
        .await
        .map_err(|err| BridgeError::Server(format!("bind {}: {err}", settings.bind)))?;
    info!(bind = %settings.bind, "listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| BridgeError::Server(err.to_string()))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to install Ctrl-C handler");
        return;
    }
    info!("shutting down");
}
