// src/selection.rs
//! Helpers behind the organization picker and the question editor.

use reqwest::Url;
use std::collections::BTreeSet;

use crate::errors::{GraderError, Result};
use crate::models::Organization;

/// Organizations whose name or website contains `term`, ignoring case.
pub fn search_organizations<'a>(organizations: &'a [Organization], term: &str) -> Vec<&'a Organization> {
    let needle = term.to_lowercase();
    organizations
        .iter()
        .filter(|org| {
            org.name.to_lowercase().contains(&needle) || org.website_url.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Host part of a website, tolerating a missing scheme. Falls back to the
/// input when it does not parse.
pub fn domain_of(website: &str) -> String {
    let candidate = if website.starts_with("http") {
        website.to_string()
    } else {
        format!("https://{}", website)
    };
    Url::parse(&candidate)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| website.to_string())
}

/// Display name for an organization id, or the id itself when unknown.
pub fn organization_name<'a>(organizations: &'a [Organization], id: &'a str) -> &'a str {
    organizations
        .iter()
        .find(|org| org.id == id)
        .map(|org| org.name.as_str())
        .unwrap_or(id)
}

/// Checks a requested selection against the listed organizations.
pub fn validate_selection(organizations: &[Organization], requested: &[String]) -> Result<BTreeSet<String>> {
    let selected: BTreeSet<String> = requested.iter().map(|id| id.trim().to_string()).collect();
    if selected.is_empty() {
        return Err(GraderError::validation("Please select at least one organization"));
    }
    let unknown: Vec<&str> = selected
        .iter()
        .filter(|id| !organizations.iter().any(|org| &org.id == *id))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(GraderError::validation(format!("Unknown organization ids: {}", unknown.join(", "))));
    }
    Ok(selected)
}

/// Ordered, duplicate-free list of non-blank questions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionList {
    questions: Vec<String>,
}

impl QuestionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one question. Returns false when it is blank or already present.
    pub fn add(&mut self, raw: &str) -> bool {
        let question = raw.trim();
        if question.is_empty() || self.questions.iter().any(|q| q == question) {
            return false;
        }
        self.questions.push(question.to_string());
        true
    }

    /// Adds every comma-separated entry of `raw`, returning how many were new.
    pub fn add_separated(&mut self, raw: &str) -> usize {
        raw.split(',').filter(|part| self.add(part)).count()
    }

    pub fn remove(&mut self, question: &str) -> bool {
        let before = self.questions.len();
        self.questions.retain(|q| q != question);
        self.questions.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.questions
    }

    pub fn into_vec(self) -> Vec<String> {
        self.questions
    }
}

impl<S: AsRef<str>> FromIterator<S> for QuestionList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = QuestionList::new();
        for question in iter {
            list.add(question.as_ref());
        }
        list
    }
}
