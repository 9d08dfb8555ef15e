// src/api/handlers/health.rs
use actix_web::{web, HttpResponse, Result};
use serde_json::json;
use crate::api::AppState;
use crate::client::JobApi;

pub async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse> {
    let backend = match state.client.health().await {
        Ok(health) => json!({ "reachable": true, "status": health.status }),
        Err(e) => json!({ "reachable": false, "error": e.to_string() }),
    };

    Ok(HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "grader-console",
        "version": env!("CARGO_PKG_VERSION"),
        "backendUrl": state.config.backend_url,
        "backend": backend,
        "phase": state.controller.phase(),
    })))
}
