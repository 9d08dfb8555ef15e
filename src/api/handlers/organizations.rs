// src/api/handlers/organizations.rs
use actix_web::{web, HttpResponse, Result};
use serde::{Deserialize, Serialize};
use crate::api::AppState;
use crate::api::state::OrganizationListing;
use crate::models::Organization;
use crate::selection;

#[derive(Deserialize)]
pub struct OrganizationQuery {
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Serialize)]
pub struct OrganizationView {
    #[serde(flatten)]
    pub organization: Organization,
    pub domain: String,
}

#[derive(Serialize)]
pub struct OrganizationsResponse {
    pub organizations: Vec<OrganizationView>,
    pub total: usize,
    pub error: Option<String>,
}

fn render(listing: &OrganizationListing, search: Option<&str>) -> OrganizationsResponse {
    let organizations = selection::search_organizations(&listing.organizations, search.unwrap_or(""))
        .into_iter()
        .map(|org| OrganizationView {
            organization: org.clone(),
            domain: selection::domain_of(&org.website_url),
        })
        .collect();

    OrganizationsResponse {
        organizations,
        total: listing.organizations.len(),
        error: listing.error.clone(),
    }
}

/// GET /api/v1/organizations - Cached listing, optionally narrowed by `search`
pub async fn list_organizations(
    state: web::Data<AppState>,
    query: web::Query<OrganizationQuery>,
) -> Result<HttpResponse> {
    let listing = state.organizations.read().await;
    Ok(HttpResponse::Ok().json(render(&listing, query.search.as_deref())))
}

/// POST /api/v1/organizations/reload - Fetch the listing from the backend again
pub async fn reload_organizations(state: web::Data<AppState>) -> Result<HttpResponse> {
    let listing = state.load_organizations().await;
    Ok(HttpResponse::Ok().json(render(&listing, None)))
}
