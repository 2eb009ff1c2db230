//! Thin HTTP adapter over the Query Surface (§6 `serve`), out of core scope:
//! `/api/repos, /api/graph, /api/query, /api/search, /api/file, /api/processes,
//! /api/process, /api/clusters, /api/cluster`. Every handler parses its
//! request, calls into [`QuerySurface`], and serializes the result — no
//! business logic lives here.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::graph::GraphStore;
use crate::model::GraphNode;
use crate::query::{CypherError, ExploreKind, QuerySurface, SearchDepth};

type SharedSurface = Arc<QuerySurface>;

/// Binds `bind` and serves the API until the process is killed.
pub async fn serve(surface: QuerySurface, bind: &str) -> crate::Result<()> {
    let state: SharedSurface = Arc::new(surface);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| crate::error::GitNexusError::General(format!("failed to bind {bind}: {e}")))?;
    tracing::info!("serving query API on {bind}");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::GitNexusError::General(format!("http server error: {e}")))?;
    Ok(())
}

fn router(state: SharedSurface) -> Router {
    Router::new()
        .route("/api/repos", get(repos))
        .route("/api/graph", get(graph))
        .route("/api/query", post(query))
        .route("/api/search", get(search))
        .route("/api/file", get(file))
        .route("/api/processes", get(processes))
        .route("/api/process", get(process))
        .route("/api/clusters", get(clusters))
        .route("/api/cluster", get(cluster))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct ApiError {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (status, Json(ApiError { error: message.into() })).into_response()
}

async fn repos(State(surface): State<SharedSurface>) -> Json<serde_json::Value> {
    let overview = surface.overview();
    Json(serde_json::json!({
        "clusters": overview.clusters.len(),
        "processes": overview.processes.len(),
    }))
}

async fn graph(State(surface): State<SharedSurface>) -> Json<GraphSummary> {
    let store: &GraphStore = surface.graph();
    let mut files = 0usize;
    let mut symbols = 0usize;
    let mut folders = 0usize;
    for node in store.nodes() {
        match node {
            GraphNode::File(_) => files += 1,
            GraphNode::Folder(_) => folders += 1,
            GraphNode::Symbol(_) => symbols += 1,
            _ => {}
        }
    }
    Json(GraphSummary { files, folders, symbols, relations: store.relations().count() })
}

#[derive(Serialize)]
struct GraphSummary {
    files: usize,
    folders: usize,
    symbols: usize,
    relations: usize,
}

#[derive(Deserialize)]
struct QueryRequest {
    cypher: String,
    /// Reserved for multi-repo deployments; the Query Surface is single-repo (§1).
    #[allow(dead_code)]
    repo: Option<String>,
}

async fn query(State(surface): State<SharedSurface>, Json(request): Json<QueryRequest>) -> impl IntoResponse {
    match surface.cypher(&request.cypher) {
        Ok(rows) => Json(serde_json::json!({ "result": rows })).into_response(),
        Err(CypherError::Unsupported(q)) => error_response(StatusCode::BAD_REQUEST, format!("unsupported query: {q}")),
        Err(CypherError::UnknownVariable(v)) => {
            error_response(StatusCode::BAD_REQUEST, format!("undeclared variable '{v}'"))
        }
    }
}

#[derive(Deserialize)]
struct SearchParams {
    q: String,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    full: bool,
}

fn default_limit() -> usize {
    10
}

async fn search(State(surface): State<SharedSurface>, Query(params): Query<SearchParams>) -> impl IntoResponse {
    let depth = if params.full { SearchDepth::Full } else { SearchDepth::Shallow };
    let hits = surface.search(&params.q, params.limit, depth);
    Json(hits).into_response()
}

#[derive(Deserialize)]
struct FileParams {
    path: String,
}

async fn file(State(surface): State<SharedSurface>, Query(params): Query<FileParams>) -> impl IntoResponse {
    let id = crate::model::file_id(&params.path);
    match surface.graph().get_node(&id) {
        Some(node) => Json(node).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("no file '{}'", params.path)),
    }
}

async fn processes(State(surface): State<SharedSurface>) -> Json<Vec<crate::query::ProcessSummary>> {
    Json(surface.overview().processes)
}

#[derive(Deserialize)]
struct NameParams {
    name: String,
}

async fn process(State(surface): State<SharedSurface>, Query(params): Query<NameParams>) -> impl IntoResponse {
    match surface.explore(&params.name, ExploreKind::Process) {
        Ok(report) => Json(report).into_response(),
        Err(e) => error_response(StatusCode::NOT_FOUND, e.to_string()),
    }
}

async fn clusters(State(surface): State<SharedSurface>) -> Json<Vec<crate::query::ClusterSummary>> {
    Json(surface.overview().clusters)
}

async fn cluster(State(surface): State<SharedSurface>, Query(params): Query<NameParams>) -> impl IntoResponse {
    match surface.explore(&params.name, ExploreKind::Cluster) {
        Ok(report) => Json(report).into_response(),
        Err(e) => error_response(StatusCode::NOT_FOUND, e.to_string()),
    }
}
