//! HTTP client for the scheduler API.
//!
//! Used by planning sessions that run against a remote server.
//! Configuration is via environment variables:
//! - `SCHEDULER_URL` - Base URL (default: `http://localhost:17020/api/v1`)

use std::future::Future;

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use crate::models::*;
use crate::session::ScheduleBackend;

/// Default URL for local development.
const DEFAULT_URL: &str = "http://localhost:17020/api/v1";

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Server error: {0}")]
    Server(String),
}

/// HTTP client for the scheduler API.
#[derive(Debug, Clone)]
pub struct SchedulerClient {
    base_url: String,
    client: Client,
}

impl SchedulerClient {
    /// Create client from environment variables.
    pub fn from_env() -> Self {
        let base_url = std::env::var("SCHEDULER_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        Self::new(base_url)
    }

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, &url)
    }

    /// Handle response, converting HTTP errors to ClientError.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::status_error(status, response).await)
        }
    }

    /// Handle response that may return empty body (204 No Content).
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<(), ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::status_error(status, response).await)
        }
    }

    async fn status_error(status: StatusCode, response: reqwest::Response) -> ClientError {
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => ClientError::NotFound(body),
            StatusCode::BAD_REQUEST => ClientError::BadRequest(body),
            StatusCode::CONFLICT => ClientError::Conflict(body),
            _ => ClientError::Server(format!("{}: {}", status, body)),
        }
    }

    // ============================================================
    // Projects
    // ============================================================

    pub async fn list_projects(&self) -> Result<Vec<Project>, ClientError> {
        let response = self.request(Method::GET, "/projects").send().await?;
        self.handle_response(response).await
    }

    pub async fn create_project(&self, input: &CreateProjectInput) -> Result<Project, ClientError> {
        let response = self
            .request(Method::POST, "/projects")
            .json(input)
            .send()
            .await?;
        self.handle_response(response).await
    }

    // ============================================================
    // Candidates and slots
    // ============================================================

    /// Fetch candidates, selected projects first.
    pub async fn get_candidates(
        &self,
        request: &CandidateRequest,
    ) -> Result<Vec<Candidate>, ClientError> {
        let selected = request
            .selected_ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let mut req = self
            .request(Method::GET, "/candidates")
            .query(&[("count", request.desired_count.to_string())]);
        if !selected.is_empty() {
            req = req.query(&[("selected", selected)]);
        }

        let response = req.send().await?;
        self.handle_response(response).await
    }

    pub async fn preview_slots(&self, config: &ScheduleConfig) -> Result<Vec<TimeSlot>, ClientError> {
        let response = self
            .request(Method::POST, "/slots/preview")
            .json(config)
            .send()
            .await?;
        self.handle_response(response).await
    }

    // ============================================================
    // Schedules
    // ============================================================

    pub async fn list_schedules(&self) -> Result<Vec<ScheduleSummary>, ClientError> {
        let response = self.request(Method::GET, "/schedules").send().await?;
        self.handle_response(response).await
    }

    pub async fn get_schedule(&self, id: Uuid) -> Result<ScheduleRecord, ClientError> {
        let response = self
            .request(Method::GET, &format!("/schedules/{}", id))
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// POST a new schedule, or PUT over an existing one when the input carries an id.
    pub async fn save_schedule(&self, input: &SaveScheduleInput) -> Result<ScheduleRecord, ClientError> {
        let request = match input.schedule_id {
            Some(id) => self.request(Method::PUT, &format!("/schedules/{}", id)),
            None => self.request(Method::POST, "/schedules"),
        };
        let response = request.json(input).send().await?;
        self.handle_response(response).await
    }

    pub async fn delete_schedule(&self, id: Uuid) -> Result<(), ClientError> {
        let response = self
            .request(Method::DELETE, &format!("/schedules/{}", id))
            .send()
            .await?;
        self.handle_empty_response(response).await
    }
}

impl ScheduleBackend for SchedulerClient {
    fn fetch_candidates(
        &self,
        request: &CandidateRequest,
    ) -> impl Future<Output = anyhow::Result<Vec<Candidate>>> + Send {
        async move { Ok(self.get_candidates(request).await?) }
    }

    fn persist_schedule(
        &self,
        input: &SaveScheduleInput,
    ) -> impl Future<Output = anyhow::Result<ScheduleRecord>> + Send {
        async move { Ok(self.save_schedule(input).await?) }
    }
}
