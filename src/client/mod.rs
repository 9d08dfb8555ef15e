// src/client/mod.rs

use std::collections::BTreeSet;

use crate::errors::Result;
use crate::models::{BackendHealth, Job, Organization, StartEvaluationResponse};

pub mod http;

pub use http::HttpJobClient;

/// The remote operations the dashboard depends on.
///
/// Implementations perform exactly one request per call: no retries, no
/// caching. Every failure is returned to the caller as-is.
pub trait JobApi: Send + Sync + 'static {
    /// Lists the organizations that can be evaluated.
    fn list_organizations(&self) -> impl std::future::Future<Output = Result<Vec<Organization>>> + Send;

    /// Asks the backend to start a job. Inputs are not validated here.
    ///
    /// # Arguments
    /// * `organization_ids` - Ids of the organizations to evaluate.
    /// * `questions` - Questions to put to each organization's chatbot, in order.
    /// * `force` - Passed through to the backend untouched.
    fn start_evaluation(
        &self,
        organization_ids: &BTreeSet<String>,
        questions: &[String],
        force: bool,
    ) -> impl std::future::Future<Output = Result<StartEvaluationResponse>> + Send;

    /// Fetches the latest snapshot of a job. Consecutive calls may return
    /// identical snapshots.
    fn fetch_job_status(&self, job_id: &str) -> impl std::future::Future<Output = Result<Job>> + Send;

    fn health(&self) -> impl std::future::Future<Output = Result<BackendHealth>> + Send;
}
