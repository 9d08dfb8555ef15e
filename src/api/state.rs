// src/api/state.rs
use crate::client::{HttpJobClient, JobApi};
use crate::config::AppConfig;
use crate::controller::JobController;
use crate::models::Organization;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Organizations fetched from the backend, or why there are none.
#[derive(Debug, Clone, Default)]
pub struct OrganizationListing {
    pub organizations: Vec<Organization>,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub client: Arc<HttpJobClient>,
    pub controller: Arc<JobController<HttpJobClient>>,
    pub organizations: Arc<RwLock<OrganizationListing>>,
}

impl AppState {
    pub fn new(config: AppConfig, client: HttpJobClient) -> Self {
        let client = Arc::new(client);
        let controller = JobController::new(Arc::clone(&client), config.poll_interval);
        Self {
            config: Arc::new(config),
            client,
            controller: Arc::new(controller),
            organizations: Arc::new(RwLock::new(OrganizationListing::default())),
        }
    }

    /// Refreshes the organization listing. A failed call leaves the list
    /// empty and records the error for display.
    pub async fn load_organizations(&self) -> OrganizationListing {
        let listing = match self.client.list_organizations().await {
            Ok(organizations) => {
                log::info!("Loaded {} organizations", organizations.len());
                OrganizationListing { organizations, error: None }
            }
            Err(e) => {
                log::error!("Failed to load organizations: {}", e);
                OrganizationListing {
                    organizations: Vec::new(),
                    error: Some(format!("Failed to load organizations from backend: {}", e)),
                }
            }
        };
        *self.organizations.write().await = listing.clone();
        listing
    }
}
