// src/api/handlers/results.rs
use actix_web::{web, HttpResponse, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use crate::api::AppState;
use crate::filter::{distinct_questions, GradeFilter, QuestionFilter, ResultFilter};
use crate::models::EvaluationResult;
use crate::selection::organization_name;

#[derive(Deserialize)]
pub struct ResultsQuery {
    pub grade: Option<String>,
    pub question: Option<String>,
    pub search: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRow {
    /// Index into the job's full result list, used by the detail view.
    pub position: usize,
    pub organization_name: String,
    #[serde(flatten)]
    pub result: EvaluationResult,
}

#[derive(Serialize)]
pub struct ResultsResponse {
    pub results: Vec<ResultRow>,
    pub total: usize,
    pub matched: usize,
    pub questions: Vec<String>,
}

/// GET /api/v1/results - Filtered view over the current job's results
pub async fn list_results(
    state: web::Data<AppState>,
    query: web::Query<ResultsQuery>,
) -> Result<HttpResponse> {
    let Some(grade) = GradeFilter::parse(query.grade.as_deref()) else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": format!("Unknown grade filter '{}'", query.grade.as_deref().unwrap_or_default())
        })));
    };
    let filter = ResultFilter::new(
        grade,
        QuestionFilter::parse(query.question.as_deref()),
        query.search.clone().unwrap_or_default(),
    );

    let snapshot = state.controller.snapshot();
    let results = snapshot.job.map(|job| job.results).unwrap_or_default();
    let listing = state.organizations.read().await;

    let rows: Vec<ResultRow> = results
        .iter()
        .enumerate()
        .filter(|(_, r)| filter.matches(r))
        .map(|(position, r)| ResultRow {
            position,
            organization_name: organization_name(&listing.organizations, &r.organization_id).to_string(),
            result: r.clone(),
        })
        .collect();

    Ok(HttpResponse::Ok().json(ResultsResponse {
        matched: rows.len(),
        results: rows,
        total: results.len(),
        questions: distinct_questions(&results),
    }))
}

/// GET /api/v1/results/{position} - Detail view of one result
pub async fn get_result(
    state: web::Data<AppState>,
    path: web::Path<usize>,
) -> Result<HttpResponse> {
    let position = path.into_inner();
    let snapshot = state.controller.snapshot();
    let result = snapshot.job.and_then(|job| job.results.into_iter().nth(position));

    match result {
        Some(result) => {
            let listing = state.organizations.read().await;
            Ok(HttpResponse::Ok().json(ResultRow {
                position,
                organization_name: organization_name(&listing.organizations, &result.organization_id).to_string(),
                result,
            }))
        }
        None => Ok(HttpResponse::NotFound().json(json!({
            "error": format!("No result at position {}", position)
        }))),
    }
}
