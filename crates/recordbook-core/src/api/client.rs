//! API client for the portal REST backend.
//!
//! `ApiClient` is the production [`RecordGateway`]: bearer-authenticated JSON
//! over reqwest. It makes exactly one attempt per call; callers decide whether
//! to try again.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use super::gateway::RecordGateway;
use super::wire::{
    ApprovalReviewBody, ApprovalsResponse, ClubsResponse, EnrollmentRequest, EnrollmentResponse,
    FacultyHomeResponse, LeaveRequestsResponse, LeaveReviewBody, ReviewResponse,
    StudentHomeResponse, SubmissionRecord,
};
use super::ApiError;
use crate::error::{ClientError, ClientResult};
use crate::models::{LeaveQuery, ResultsSheet, SubmissionKind, SubmissionPayload};

// ============================================================================
// Constants
// ============================================================================

/// Backend used when neither the config file nor the environment names one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// API client for the portal backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client for `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Every endpoint is authenticated, so a missing token fails here before
    /// anything is sent.
    fn auth_headers(&self) -> ClientResult<header::HeaderMap> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| ClientError::Auth("not signed in".to_string()))?;
        let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ClientError::Auth("session token is not a valid header value".to_string()))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value);
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response, url: &str) -> ClientResult<T> {
        let response = Self::check_response(response).await?;
        let text = response.text().await.map_err(ApiError::from)?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
                .into()
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> ClientResult<T> {
        let url = self.url(path);
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .query(query)
            .send()
            .await
            .map_err(ApiError::from)?;
        Self::decode(response, &url).await
    }

    async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let url = self.url(path);
        debug!(url = %url, method = %method, "Sending request");
        let response = self
            .client
            .request(method, &url)
            .headers(self.auth_headers()?)
            .json(body)
            .send()
            .await
            .map_err(ApiError::from)?;
        Self::decode(response, &url).await
    }
}

#[async_trait]
impl RecordGateway for ApiClient {
    async fn student_home(&self) -> ClientResult<StudentHomeResponse> {
        self.get("/student/home", &[]).await
    }

    async fn student_approvals(&self) -> ClientResult<ApprovalsResponse> {
        self.get("/student/all-approvals", &[]).await
    }

    async fn student_leave_requests(&self) -> ClientResult<LeaveRequestsResponse> {
        self.get("/student/leave-requests", &[]).await
    }

    async fn results(&self) -> ClientResult<ResultsSheet> {
        self.get("/student/results", &[]).await
    }

    async fn clubs(&self) -> ClientResult<ClubsResponse> {
        self.get("/api/clubs", &[]).await
    }

    async fn faculty_home(&self) -> ClientResult<FacultyHomeResponse> {
        self.get("/faculty/home", &[]).await
    }

    async fn faculty_leave_requests(&self, query: &LeaveQuery) -> ClientResult<LeaveRequestsResponse> {
        self.get("/faculty/leave-requests", &query.to_pairs()).await
    }

    async fn review_leave_request(
        &self,
        student_id: &str,
        request_id: &str,
        body: &LeaveReviewBody,
    ) -> ClientResult<ReviewResponse> {
        let path = format!("/faculty/leave-requests/{}/{}", student_id, request_id);
        self.send_json(Method::PUT, &path, body).await
    }

    async fn review_submission(
        &self,
        student_id: &str,
        submission_id: &str,
        body: &ApprovalReviewBody,
    ) -> ClientResult<ReviewResponse> {
        let path = format!("/faculty/approvals/{}/{}", student_id, submission_id);
        self.send_json(Method::PUT, &path, body).await
    }

    async fn create_submission(&self, payload: &SubmissionPayload) -> ClientResult<SubmissionRecord> {
        let path = match payload.kind() {
            SubmissionKind::Leave => "/student/leave-requests",
            _ => "/student/submissions",
        };
        self.send_json(Method::POST, path, payload).await
    }

    async fn enroll(&self, request: &EnrollmentRequest) -> ClientResult<EnrollmentResponse> {
        self.send_json(Method::POST, "/api/enrollments", request).await
    }
}
