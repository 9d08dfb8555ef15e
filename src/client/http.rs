// src/client/http.rs

use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::time::Instant;

use crate::config::AppConfig;
use crate::errors::{GraderError, Result};
use crate::models::{BackendHealth, Job, Organization, StartEvaluationRequest, StartEvaluationResponse};
use crate::client::JobApi;

/// Talks to the evaluation backend over HTTP/JSON.
#[derive(Clone)]
pub struct HttpJobClient {
    client: Client,
    base: Url,
}

impl HttpJobClient {
    /// Creates a client rooted at `base_url`.
    pub fn new(client: Client, base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| GraderError::Config(format!("Invalid backend URL '{}': {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(GraderError::Config(format!("Backend URL '{}' cannot be used as a base", base_url)));
        }
        Ok(Self { client, base })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Self::new(client, &config.backend_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// Turns a non-success status into `ApiError`, otherwise decodes the body.
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let error_body = resp
            .text()
            .await
            .unwrap_or_else(|_| "Could not read error body".to_string());
        return Err(GraderError::ApiError {
            status: status.as_u16(),
            body: error_body,
        });
    }
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

impl JobApi for HttpJobClient {
    async fn list_organizations(&self) -> Result<Vec<Organization>> {
        let url = self.endpoint(&["organizations"]);
        let start = Instant::now();
        let resp = self.client.get(url).send().await?;
        log::debug!("GET /organizations -> {} ({}ms)", resp.status(), start.elapsed().as_millis());
        decode(resp).await
    }

    async fn start_evaluation(
        &self,
        organization_ids: &BTreeSet<String>,
        questions: &[String],
        force: bool,
    ) -> Result<StartEvaluationResponse> {
        let url = self.endpoint(&["evaluate"]);
        let body = StartEvaluationRequest {
            organization_ids: organization_ids.iter().cloned().collect(),
            questions: questions.to_vec(),
            force,
        };

        let start = Instant::now();
        let resp = self.client.post(url).json(&body).send().await?;
        log::debug!("POST /evaluate -> {} ({}ms)", resp.status(), start.elapsed().as_millis());
        decode(resp).await
    }

    async fn fetch_job_status(&self, job_id: &str) -> Result<Job> {
        let url = self.endpoint(&["jobs", job_id]);
        let resp = self.client.get(url).send().await?;
        log::debug!("GET /jobs/{} -> {}", job_id, resp.status());
        decode(resp).await
    }

    async fn health(&self) -> Result<BackendHealth> {
        let resp = self.client.get(self.endpoint(&["health"])).send().await?;
        decode(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_segments() {
        let client = HttpJobClient::new(Client::new(), "http://localhost:8000").unwrap();
        assert_eq!(client.endpoint(&["organizations"]).as_str(), "http://localhost:8000/organizations");

        let nested = HttpJobClient::new(Client::new(), "https://grader.example.org/api/").unwrap();
        assert_eq!(
            nested.endpoint(&["jobs", "a b/c"]).as_str(),
            "https://grader.example.org/api/jobs/a%20b%2Fc"
        );
    }

    #[test]
    fn test_rejects_unusable_base() {
        assert!(matches!(
            HttpJobClient::new(Client::new(), "mailto:ops@example.org"),
            Err(GraderError::Config(_))
        ));
        assert!(matches!(
            HttpJobClient::new(Client::new(), "::nope"),
            Err(GraderError::Config(_))
        ));
    }
}
