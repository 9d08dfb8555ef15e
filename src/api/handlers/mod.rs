// src/api/handlers/mod.rs
mod health;
mod evaluations;
mod organizations;
mod results;
pub mod ws;

use actix_web::HttpResponse;
use serde_json::json;
use crate::errors::GraderError;

pub use health::health_check;
pub use evaluations::{start_evaluation, get_job};
pub use organizations::{list_organizations, reload_organizations};
pub use results::{list_results, get_result};
pub use ws::{ws_handler, WsBroker};

/// Maps a failure onto the status code the dashboard shows it with.
pub(crate) fn error_response(e: &GraderError) -> HttpResponse {
    let body = json!({ "error": e.to_string() });
    match e {
        GraderError::Validation(_) => HttpResponse::BadRequest().json(body),
        GraderError::Disposed => HttpResponse::ServiceUnavailable().json(body),
        e if e.is_transport() => HttpResponse::BadGateway().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}
