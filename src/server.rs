//! REST adapter built on actix-web.
//!
//! | Route | Method | Description |
//! |-------|--------|-------------|
//! | `/advisories` | GET | Filtered, sorted, paginated list |
//! | `/advisories/search?q=` | GET | Text search |
//! | `/advisories/{ghsa_id}` | GET | Single advisory or 404 |
//! | `/refresh` | POST | Drop cached data |
//! | `/health` | GET | Liveness and source kind |
//! | `/mcp` | POST | One JSON-RPC message per request |
//!
//! Rejected input is a 400 with `{"message": ...}`. Only failures of the
//! backing source produce a 5xx.

use actix_web::{error::InternalError, web, App, HttpResponse, HttpServer, Result};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::{QueryError, SourceError};
use crate::mcp::McpServer;
use crate::model::{ListParams, SearchParams};
use crate::source::AdvisorySource;

pub struct AppState {
    source: Arc<dyn AdvisorySource>,
    mcp: McpServer,
}

impl AppState {
    pub fn new(source: Arc<dyn AdvisorySource>) -> Self {
        Self {
            mcp: McpServer::new(Arc::clone(&source)),
            source,
        }
    }
}

/// Binds and runs the server until it is shut down.
pub async fn serve(source: Arc<dyn AdvisorySource>, bind: &str, port: u16) -> std::io::Result<()> {
    let kind = source.kind();
    let state = web::Data::new(AppState::new(source));

    info!("Serving {} advisories on http://{}:{}", kind, bind, port);

    HttpServer::new(move || App::new().app_data(state.clone()).configure(routes))
        .bind((bind, port))?
        .run()
        .await
}

/// Registers every route. Expects [`AppState`] in the app data.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _req| {
        let response = bad_request(err.to_string());
        InternalError::from_response(err, response).into()
    }))
    .route("/health", web::get().to(health))
    .route("/advisories", web::get().to(list_advisories))
    .route("/advisories/search", web::get().to(search_advisories))
    .route("/advisories/{ghsa_id}", web::get().to(get_advisory))
    .route("/refresh", web::post().to(refresh))
    .route("/mcp", web::post().to(mcp))
    .default_service(web::to(not_found));
}

async fn health(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "ok",
        "source": state.source.kind(),
    })))
}

async fn list_advisories(
    state: web::Data<AppState>,
    params: web::Query<ListParams>,
) -> Result<HttpResponse> {
    let options = match params.validate() {
        Ok(options) => options,
        Err(e) => return Ok(query_error(e)),
    };

    match state.source.list_advisories(&options).await {
        Ok(advisories) => Ok(HttpResponse::Ok().json(advisories)),
        Err(e) => Ok(source_error(e)),
    }
}

async fn search_advisories(
    state: web::Data<AppState>,
    params: web::Query<SearchParams>,
) -> Result<HttpResponse> {
    if !state.source.supports_search() {
        return Ok(source_error(SourceError::Unsupported(
            state.source.kind(),
            "search",
        )));
    }

    let (query, options) = match params.validate() {
        Ok(v) => v,
        Err(e) => return Ok(query_error(e)),
    };

    match state.source.search_advisories(&query, &options).await {
        Ok(advisories) => Ok(HttpResponse::Ok().json(advisories)),
        Err(e) => Ok(source_error(e)),
    }
}

async fn get_advisory(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match state.source.get_advisory(&path).await {
        Ok(Some(advisory)) => Ok(HttpResponse::Ok().json(advisory)),
        Ok(None) => Ok(not_found_response()),
        Err(e) => Ok(source_error(e)),
    }
}

async fn refresh(state: web::Data<AppState>) -> Result<HttpResponse> {
    state.source.refresh().await;
    Ok(HttpResponse::Ok().json(json!({"status": "refreshed"})))
}

async fn mcp(state: web::Data<AppState>, body: String) -> Result<HttpResponse> {
    match state.mcp.handle_message(body.trim()).await {
        Some(reply) => Ok(HttpResponse::Ok()
            .content_type("application/json")
            .body(reply)),
        None => Ok(HttpResponse::Accepted().finish()),
    }
}

async fn not_found() -> Result<HttpResponse> {
    Ok(not_found_response())
}

fn not_found_response() -> HttpResponse {
    HttpResponse::NotFound().json(json!({"message": "Not Found"}))
}

fn bad_request(message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(json!({"message": message}))
}

fn query_error(e: QueryError) -> HttpResponse {
    bad_request(e.to_string())
}

fn source_error(e: SourceError) -> HttpResponse {
    let message = json!({"message": e.to_string()});
    match e {
        SourceError::Query(_) => HttpResponse::BadRequest().json(message),
        SourceError::Unsupported(..) => HttpResponse::NotImplemented().json(message),
        SourceError::Http(_) | SourceError::Upstream { .. } => {
            error!("Advisory source failed: {}", e);
            HttpResponse::BadGateway().json(message)
        }
    }
}
