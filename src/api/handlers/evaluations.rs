// src/api/handlers/evaluations.rs
use actix_web::{web, HttpResponse, Result};
use serde::{Deserialize, Serialize};
use crate::api::AppState;
use crate::api::handlers::error_response;
use crate::controller::JobSnapshot;
use crate::filter::{grade_distribution, GradeDistribution};
use crate::models::StartEvaluationResponse;
use crate::selection::{validate_selection, QuestionList};

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartEvaluationBody {
    #[serde(default, alias = "churchIds")]
    pub organization_ids: Vec<String>,
    #[serde(default)]
    pub questions: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    #[serde(flatten)]
    pub snapshot: JobSnapshot,
    /// Progress clamped to 0..=100 for the progress bar.
    pub display_progress: u32,
    pub distribution: GradeDistribution,
}

/// POST /api/v1/evaluations - Validate the selection and start a job
pub async fn start_evaluation(
    state: web::Data<AppState>,
    body: web::Json<StartEvaluationBody>,
) -> Result<HttpResponse> {
    let body = body.into_inner();
    let questions: QuestionList = body.questions.iter().collect();

    let selected = {
        let listing = state.organizations.read().await;
        validate_selection(&listing.organizations, &body.organization_ids)
    };
    let selected = match selected {
        Ok(selected) => selected,
        Err(e) => return Ok(error_response(&e)),
    };

    match state.controller.start(&selected, questions.as_slice()).await {
        Ok(job_id) => Ok(HttpResponse::Ok().json(StartEvaluationResponse { job_id })),
        Err(e) => {
            log::warn!("Evaluation not started: {}", e);
            Ok(error_response(&e))
        }
    }
}

/// GET /api/v1/job - Current job state with the grade summary
pub async fn get_job(state: web::Data<AppState>) -> Result<HttpResponse> {
    let snapshot = state.controller.snapshot();
    let results = snapshot.job.as_ref().map(|job| job.results.as_slice()).unwrap_or(&[]);
    let distribution = grade_distribution(results);
    let display_progress = snapshot.job.as_ref().map(|job| job.display_progress()).unwrap_or(0);

    Ok(HttpResponse::Ok().json(JobResponse {
        snapshot,
        display_progress,
        distribution,
    }))
}
