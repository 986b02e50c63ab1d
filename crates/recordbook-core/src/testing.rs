//! In-memory gateway for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::api::wire::{
    ApprovalReviewBody, ApprovalsResponse, ClubsResponse, EnrollmentRequest, EnrollmentResponse,
    FacultyHomeResponse, LeaveRequestsResponse, LeaveReviewBody, ReviewResponse,
    StudentHomeResponse, SubmissionRecord,
};
use crate::api::RecordGateway;
use crate::error::{ClientError, ClientResult};
use crate::models::{LeaveQuery, ResultsSheet, SubmissionPayload};

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub endpoint: &'static str,
    pub args: Vec<String>,
    pub body: Option<Value>,
}

/// Gateway that answers from canned JSON and records every call.
///
/// Reads with no canned response fail. Writes with no canned response echo a
/// plausible acknowledgement built from the request body.
#[derive(Default)]
pub struct FakeGateway {
    responses: Mutex<HashMap<&'static str, Value>>,
    failures: Mutex<HashMap<&'static str, ClientError>>,
    gates: Mutex<HashMap<&'static str, Arc<Notify>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, endpoint: &'static str, body: Value) {
        self.failures.lock().unwrap().remove(endpoint);
        self.responses.lock().unwrap().insert(endpoint, body);
    }

    pub fn fail(&self, endpoint: &'static str, error: ClientError) {
        self.failures.lock().unwrap().insert(endpoint, error);
    }

    /// Hold calls to `endpoint` until the returned handle is notified.
    pub fn gate(&self, endpoint: &'static str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(endpoint, notify.clone());
        notify
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, endpoint: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.endpoint == endpoint).count()
    }

    async fn answer<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        args: Vec<String>,
        body: Option<Value>,
    ) -> ClientResult<T> {
        self.calls.lock().unwrap().push(Call {
            endpoint,
            args,
            body: body.clone(),
        });

        let gate = self.gates.lock().unwrap().get(endpoint).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(err) = self.failures.lock().unwrap().get(endpoint).cloned() {
            return Err(err);
        }
        let canned = self.responses.lock().unwrap().get(endpoint).cloned();
        let value = match canned {
            Some(value) => value,
            None => echo(endpoint, body.as_ref()).ok_or_else(|| {
                ClientError::InvalidResponse(format!("no canned response for {}", endpoint))
            })?,
        };
        serde_json::from_value(value).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

fn echo(endpoint: &str, body: Option<&Value>) -> Option<Value> {
    let body = body?;
    match endpoint {
        "review_leave_request" => Some(json!({
            "status": body["status"],
            "approvalRemarks": body["approvalRemarks"],
            "reviewedAt": "2024-03-02T12:00:00Z",
        })),
        "review_submission" => Some(json!({
            "status": body["status"],
            "remarks": body["remarks"],
            "reviewedAt": "2024-03-02T12:00:00Z",
        })),
        "create_submission" => {
            let mut record = body.clone();
            record["_id"] = json!("NEW1");
            record["status"] = json!("pending");
            Some(record)
        }
        "enroll" => Some(json!({"ok": true})),
        _ => None,
    }
}

fn to_value<T: serde::Serialize>(body: &T) -> Option<Value> {
    serde_json::to_value(body).ok()
}

#[async_trait]
impl RecordGateway for FakeGateway {
    async fn student_home(&self) -> ClientResult<StudentHomeResponse> {
        self.answer("student_home", vec![], None).await
    }

    async fn student_approvals(&self) -> ClientResult<ApprovalsResponse> {
        self.answer("student_approvals", vec![], None).await
    }

    async fn student_leave_requests(&self) -> ClientResult<LeaveRequestsResponse> {
        self.answer("student_leave_requests", vec![], None).await
    }

    async fn results(&self) -> ClientResult<ResultsSheet> {
        self.answer("results", vec![], None).await
    }

    async fn clubs(&self) -> ClientResult<ClubsResponse> {
        self.answer("clubs", vec![], None).await
    }

    async fn faculty_home(&self) -> ClientResult<FacultyHomeResponse> {
        self.answer("faculty_home", vec![], None).await
    }

    async fn faculty_leave_requests(&self, query: &LeaveQuery) -> ClientResult<LeaveRequestsResponse> {
        self.answer("faculty_leave_requests", vec![query.canonical()], None).await
    }

    async fn review_leave_request(
        &self,
        student_id: &str,
        request_id: &str,
        body: &LeaveReviewBody,
    ) -> ClientResult<ReviewResponse> {
        let args = vec![student_id.to_string(), request_id.to_string()];
        self.answer("review_leave_request", args, to_value(body)).await
    }

    async fn review_submission(
        &self,
        student_id: &str,
        submission_id: &str,
        body: &ApprovalReviewBody,
    ) -> ClientResult<ReviewResponse> {
        let args = vec![student_id.to_string(), submission_id.to_string()];
        self.answer("review_submission", args, to_value(body)).await
    }

    async fn create_submission(&self, payload: &SubmissionPayload) -> ClientResult<SubmissionRecord> {
        let args = vec![payload.kind().as_str().to_string()];
        self.answer("create_submission", args, to_value(payload)).await
    }

    async fn enroll(&self, request: &EnrollmentRequest) -> ClientResult<EnrollmentResponse> {
        self.answer("enroll", vec![request.club_id.clone()], to_value(request)).await
    }
}

// ===== Canned payloads =====

pub fn leave_record(id: &str, student_id: &str, status: &str) -> Value {
    json!({
        "_id": id,
        "studentId": student_id,
        "leaveType": "medical",
        "reason": "Fever",
        "fromDate": "2024-03-04",
        "toDate": "2024-03-06",
        "status": status,
        "createdAt": "2024-03-01T09:30:00Z"
    })
}

pub fn certificate_record(id: &str, student_id: &str, status: &str) -> Value {
    json!({
        "_id": id,
        "type": "certificate",
        "studentId": student_id,
        "title": "AWS Cloud Practitioner",
        "issuer": "Amazon",
        "status": status,
        "createdAt": "2024-03-01T09:30:00Z"
    })
}

pub fn clubs_response(enrolled: &[&str]) -> Value {
    json!({
        "clubs": [
            {"_id": "C1", "name": "Robotics", "membershipFee": 200},
            {"_id": "C2", "name": "Chess"},
            {"_id": "C3", "name": "Drama"}
        ],
        "enrolledClubIds": enrolled
    })
}
