//! The entry point views talk to.
//!
//! A `Portal` belongs to one signed-in actor. It owns the domain store and
//! hands the same store to the fetch coordinator and to every workflow, so a
//! decision made here is visible to the next read made here.

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use crate::api::wire::normalize_results;
use crate::api::RecordGateway;
use crate::cache::{
    Domain, DomainCacheEntry, DomainData, DomainKey, DomainStore, FetchCoordinator, FetchSource,
    StalenessPolicy,
};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{ClientError, ClientResult};
use crate::models::{
    Actor, ClubDirectory, ClubRole, Decision, FacultyDashboard, LeaveQuery, ResultsSheet,
    ReviewBoard, ReviewPatch, Role, StudentHome, Submission, SubmissionPayload,
};
use crate::workflow::{ApprovalService, EnrollmentFlow, EnrollmentOutcome, Notice, Notices};

#[derive(Clone)]
pub struct Portal {
    actor: Actor,
    gateway: Arc<dyn RecordGateway>,
    coordinator: FetchCoordinator,
    approvals: ApprovalService,
    enrollment: EnrollmentFlow,
    notices: Notices,
}

impl Portal {
    pub fn new(
        actor: Actor,
        gateway: Arc<dyn RecordGateway>,
        clock: Arc<dyn Clock>,
        policy: StalenessPolicy,
        notice_window: chrono::Duration,
    ) -> Self {
        let store = DomainStore::with_clock(Arc::clone(&clock));
        let notices = Notices::new(clock, notice_window);
        Self {
            coordinator: FetchCoordinator::new(store.clone(), policy),
            approvals: ApprovalService::new(Arc::clone(&gateway), store.clone()),
            enrollment: EnrollmentFlow::new(Arc::clone(&gateway), store, notices.clone()),
            notices,
            gateway,
            actor,
        }
    }

    /// Build a portal with the configured TTLs and notice window on the
    /// system clock.
    pub fn from_config(actor: Actor, gateway: Arc<dyn RecordGateway>, config: &Config) -> Self {
        Self::new(
            actor,
            gateway,
            Arc::new(SystemClock),
            config.staleness_policy(),
            config.notice_window(),
        )
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn store(&self) -> &DomainStore {
        self.coordinator.store()
    }

    /// Snapshot of one cache entry, for loading indicators and status lines.
    pub fn entry(&self, key: &DomainKey) -> DomainCacheEntry<DomainData> {
        self.store().get(key)
    }

    /// "just now", "4m ago", ... for the entry at `key`.
    pub fn age_display(&self, key: &DomainKey) -> String {
        self.entry(key).age_display(self.store().now())
    }

    /// Notices still inside their display window.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.active()
    }

    pub fn dismiss_notice(&self, id: u64) -> bool {
        self.notices.dismiss(id)
    }

    fn require(&self, role: Role, action: &'static str) -> ClientResult<()> {
        if self.actor.role == role {
            Ok(())
        } else {
            Err(ClientError::PermissionDenied {
                role: self.actor.role,
                action,
            })
        }
    }

    async fn load<Fut>(&self, key: DomainKey, force: bool, request: Fut) -> ClientResult<DomainData>
    where
        Fut: Future<Output = ClientResult<DomainData>> + Send + 'static,
    {
        let (data, source) = self
            .coordinator
            .fetch_with_source(key.clone(), move || request, force)
            .await?;
        debug!(key = %key, source = ?source, "Loaded domain");
        Ok(data)
    }

    // ===== Student reads =====

    pub async fn student_home(&self, force: bool) -> ClientResult<StudentHome> {
        self.require(Role::Student, "view the student home")?;
        let gateway = Arc::clone(&self.gateway);
        self.load(DomainKey::new(Domain::StudentHome), force, async move {
            let resp = gateway.student_home().await?;
            Ok(DomainData::StudentHome(resp.normalize()))
        })
        .await?
        .into_student_home()
        .ok_or_else(|| mismatched(Domain::StudentHome))
    }

    pub async fn student_approvals(&self, force: bool) -> ClientResult<ReviewBoard> {
        self.require(Role::Student, "view their approvals")?;
        let gateway = Arc::clone(&self.gateway);
        let owner = self.actor.id.clone();
        self.load(DomainKey::new(Domain::StudentApprovals), force, async move {
            let resp = gateway.student_approvals().await?;
            Ok(DomainData::StudentApprovals(resp.normalize(&owner)))
        })
        .await?
        .into_board()
        .ok_or_else(|| mismatched(Domain::StudentApprovals))
    }

    pub async fn student_leave_requests(&self, force: bool) -> ClientResult<ReviewBoard> {
        self.require(Role::Student, "view their leave requests")?;
        let gateway = Arc::clone(&self.gateway);
        let owner = self.actor.id.clone();
        self.load(DomainKey::new(Domain::StudentLeaveRequests), force, async move {
            let resp = gateway.student_leave_requests().await?;
            Ok(DomainData::StudentLeaveRequests(resp.normalize(Some(&owner))))
        })
        .await?
        .into_board()
        .ok_or_else(|| mismatched(Domain::StudentLeaveRequests))
    }

    pub async fn clubs(&self, force: bool) -> ClientResult<ClubDirectory> {
        self.require(Role::Student, "browse clubs")?;
        let gateway = Arc::clone(&self.gateway);
        self.load(DomainKey::new(Domain::Clubs), force, async move {
            let resp = gateway.clubs().await?;
            Ok(DomainData::Clubs(resp.normalize()))
        })
        .await?
        .into_clubs()
        .ok_or_else(|| mismatched(Domain::Clubs))
    }

    pub async fn results(&self, force: bool) -> ClientResult<ResultsSheet> {
        self.require(Role::Student, "view results")?;
        let gateway = Arc::clone(&self.gateway);
        self.load(DomainKey::new(Domain::Results), force, async move {
            let sheet = gateway.results().await?;
            Ok(DomainData::Results(normalize_results(sheet)))
        })
        .await?
        .into_results()
        .ok_or_else(|| mismatched(Domain::Results))
    }

    // ===== Faculty reads =====

    pub async fn faculty_dashboard(&self, force: bool) -> ClientResult<FacultyDashboard> {
        self.require(Role::Faculty, "view the review queue")?;
        let gateway = Arc::clone(&self.gateway);
        self.load(DomainKey::new(Domain::FacultyDashboard), force, async move {
            let resp = gateway.faculty_home().await?;
            Ok(DomainData::FacultyDashboard(resp.normalize()))
        })
        .await?
        .into_faculty_dashboard()
        .ok_or_else(|| mismatched(Domain::FacultyDashboard))
    }

    /// One page of the faculty leave-request list. Each distinct query is
    /// cached under its own key.
    pub async fn leave_requests(&self, query: &LeaveQuery, force: bool) -> ClientResult<ReviewBoard> {
        self.require(Role::Faculty, "view leave requests")?;
        let gateway = Arc::clone(&self.gateway);
        let owned_query = query.clone();
        self.load(DomainKey::leave_requests(query), force, async move {
            let resp = gateway.faculty_leave_requests(&owned_query).await?;
            Ok(DomainData::LeaveRequests(resp.normalize(None)))
        })
        .await?
        .into_board()
        .ok_or_else(|| mismatched(Domain::LeaveRequests))
    }

    /// Find a submission awaiting this faculty member, loading the review
    /// queues if they aren't cached.
    pub async fn find_reviewable(&self, id: &str, query: &LeaveQuery) -> ClientResult<Submission> {
        for domain in [Domain::FacultyDashboard, Domain::LeaveRequests] {
            if let Some(found) = self.store().find_submission(domain, id) {
                return Ok(found);
            }
        }
        if let Some(found) = self.faculty_dashboard(false).await?.queue.find(id) {
            return Ok(found.clone());
        }
        if let Some(found) = self.leave_requests(query, false).await?.find(id) {
            return Ok(found.clone());
        }
        Err(ClientError::Validation(format!(
            "Submission {} is not in the review queue",
            id
        )))
    }

    // ===== Writes =====

    pub async fn decide(
        &self,
        submission: &mut Submission,
        decision: Decision,
        remarks: &str,
    ) -> ClientResult<ReviewPatch> {
        self.approvals
            .decide(&self.actor, submission, decision, remarks)
            .await
    }

    pub async fn submit(&self, payload: SubmissionPayload) -> ClientResult<Submission> {
        self.approvals.submit(&self.actor, payload).await
    }

    pub async fn enroll(
        &self,
        club_id: &str,
        role: ClubRole,
        amount_paid: u32,
    ) -> ClientResult<EnrollmentOutcome> {
        self.enrollment
            .enroll(&self.actor, club_id, role, amount_paid)
            .await
    }

    /// Where the next read of `key` would be answered from.
    pub fn next_source(&self, key: &DomainKey) -> FetchSource {
        if self.coordinator.is_fetching(key) {
            return FetchSource::Joined;
        }
        let entry = self.entry(key);
        let stale = self
            .coordinator
            .policy()
            .is_stale(key.domain, entry.last_fetched_at, self.store().now());
        if entry.has_data() && !stale {
            FetchSource::Cache
        } else {
            FetchSource::Network
        }
    }
}

fn mismatched(domain: Domain) -> ClientError {
    ClientError::InvalidResponse(format!("cache entry for {} holds another domain", domain))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::clock::MockClock;
    use crate::models::SubmissionStatus;
    use crate::testing::{certificate_record, clubs_response, leave_record, FakeGateway};

    fn portal(actor: Actor) -> (Portal, Arc<FakeGateway>, MockClock) {
        let gateway = FakeGateway::new();
        let clock = MockClock::new();
        let portal = Portal::new(
            actor,
            gateway.clone(),
            Arc::new(clock.clone()),
            StalenessPolicy::new(),
            chrono::Duration::seconds(4),
        );
        (portal, gateway, clock)
    }

    fn student_home_json() -> serde_json::Value {
        json!({
            "student": {"_id": "STU1", "name": "Asha"},
            "counts": {"certificates": 1},
            "pendingApprovals": [certificate_record("S1", "STU1", "pending")]
        })
    }

    #[tokio::test]
    async fn test_student_home_respects_ttl() {
        let (portal, gateway, clock) = portal(Actor::student("STU1"));
        gateway.respond("student_home", student_home_json());

        let home = portal.student_home(false).await.unwrap();
        assert_eq!(home.student.name, "Asha");
        assert_eq!(gateway.call_count("student_home"), 1);

        clock.advance_minutes(1);
        portal.student_home(false).await.unwrap();
        assert_eq!(gateway.call_count("student_home"), 1);
        assert_eq!(portal.age_display(&DomainKey::new(Domain::StudentHome)), "1m ago");

        clock.advance_minutes(5);
        portal.student_home(false).await.unwrap();
        assert_eq!(gateway.call_count("student_home"), 2);
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_ttl() {
        let (portal, gateway, _clock) = portal(Actor::student("STU1"));
        gateway.respond("results", json!({"cgpa": 8.1, "semesters": []}));

        portal.results(false).await.unwrap();
        portal.results(true).await.unwrap();
        assert_eq!(gateway.call_count("results"), 2);
    }

    #[tokio::test]
    async fn test_concurrent_leave_request_reads_share_one_call() {
        let (portal, gateway, _clock) = portal(Actor::faculty("FAC1"));
        gateway.respond(
            "faculty_leave_requests",
            json!({"leaveRequests": [leave_record("L1", "STU1", "pending")]}),
        );
        let query = LeaveQuery::pending();

        let (a, b) = tokio::join!(
            portal.leave_requests(&query, false),
            portal.leave_requests(&query, false)
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(gateway.call_count("faculty_leave_requests"), 1);
    }

    #[tokio::test]
    async fn test_distinct_queries_are_cached_separately() {
        let (portal, gateway, _clock) = portal(Actor::faculty("FAC1"));
        gateway.respond("faculty_leave_requests", json!({"leaveRequests": []}));

        portal.leave_requests(&LeaveQuery::pending(), false).await.unwrap();
        portal.leave_requests(&LeaveQuery::pending().page(2), false).await.unwrap();
        portal.leave_requests(&LeaveQuery::pending(), false).await.unwrap();

        assert_eq!(gateway.call_count("faculty_leave_requests"), 2);
        assert_eq!(portal.store().keys(Domain::LeaveRequests).len(), 2);
    }

    #[tokio::test]
    async fn test_role_gates_reads_without_calls() {
        let (portal, gateway, _clock) = portal(Actor::student("STU1"));

        let err = portal.faculty_dashboard(false).await.unwrap_err();
        assert!(matches!(err, ClientError::PermissionDenied { role: Role::Student, .. }));
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_read_keeps_previous_data() {
        let (portal, gateway, clock) = portal(Actor::student("STU1"));
        gateway.respond("clubs", clubs_response(&["C1"]));
        portal.clubs(false).await.unwrap();

        clock.advance_minutes(10);
        gateway.fail("clubs", ClientError::Network("offline".to_string()));
        let err = portal.clubs(false).await.unwrap_err();
        assert!(err.is_retryable());

        let entry = portal.entry(&DomainKey::new(Domain::Clubs));
        assert!(entry.has_data());
        assert!(!entry.loading);
        assert_eq!(entry.error.as_deref(), Some("Network error: offline"));
    }

    #[tokio::test]
    async fn test_decision_is_visible_to_next_read() {
        let (portal, gateway, _clock) = portal(Actor::faculty("FAC1"));
        gateway.respond(
            "faculty_home",
            json!({
                "faculty": {"_id": "FAC1", "name": "Dr. Rao"},
                "pendingApprovals": [certificate_record("S1", "STU1", "pending")]
            }),
        );

        let mut submission = portal
            .find_reviewable("S1", &LeaveQuery::pending())
            .await
            .unwrap();
        portal
            .decide(&mut submission, Decision::Approve, "Verified")
            .await
            .unwrap();

        // Served from cache, already reflecting the decision.
        let dashboard = portal.faculty_dashboard(false).await.unwrap();
        assert_eq!(gateway.call_count("faculty_home"), 1);
        assert_eq!(
            dashboard.queue.find("S1").map(|s| s.status),
            Some(SubmissionStatus::Approved)
        );
        assert_eq!(dashboard.queue.stats.approved, 1);
    }

    #[tokio::test]
    async fn test_find_reviewable_falls_back_to_leave_list() {
        let (portal, gateway, _clock) = portal(Actor::faculty("FAC1"));
        gateway.respond("faculty_home", json!({"faculty": {"_id": "FAC1", "name": "Dr. Rao"}}));
        gateway.respond(
            "faculty_leave_requests",
            json!({"leaveRequests": [leave_record("L7", "STU3", "pending")]}),
        );

        let found = portal
            .find_reviewable("L7", &LeaveQuery::pending())
            .await
            .unwrap();
        assert_eq!(found.owner_id, "STU3");

        let missing = portal.find_reviewable("L8", &LeaveQuery::pending()).await;
        assert!(matches!(missing, Err(ClientError::Validation(_))));
    }

    #[tokio::test]
    async fn test_submission_invalidates_student_lists() {
        let (portal, gateway, _clock) = portal(Actor::student("STU1"));
        gateway.respond("student_leave_requests", json!({"leaveRequests": []}));
        portal.student_leave_requests(false).await.unwrap();

        let payload: SubmissionPayload = serde_json::from_value(json!({
            "type": "leave", "leaveType": "personal", "reason": "Family event",
            "fromDate": "2024-04-01", "toDate": "2024-04-02"
        }))
        .unwrap();
        portal.submit(payload).await.unwrap();

        portal.student_leave_requests(false).await.unwrap();
        assert_eq!(gateway.call_count("student_leave_requests"), 2);
    }

    #[tokio::test]
    async fn test_enroll_failure_raises_notice() {
        let (portal, gateway, clock) = portal(Actor::student("STU1"));
        gateway.respond("clubs", clubs_response(&[]));
        portal.clubs(false).await.unwrap();
        gateway.fail("enroll", ClientError::Network("offline".to_string()));

        assert!(portal.enroll("C1", ClubRole::Member, 200).await.is_err());
        assert!(!portal.clubs(false).await.unwrap().is_enrolled("C1"));
        assert_eq!(portal.notices().len(), 1);

        clock.advance(chrono::Duration::seconds(5));
        assert!(portal.notices().is_empty());
    }

    #[tokio::test]
    async fn test_next_source_reporting() {
        let (portal, gateway, clock) = portal(Actor::student("STU1"));
        let key = DomainKey::new(Domain::Results);
        assert_eq!(portal.next_source(&key), FetchSource::Network);

        gateway.respond("results", json!({"semesters": []}));
        portal.results(false).await.unwrap();
        assert_eq!(portal.next_source(&key), FetchSource::Cache);

        clock.advance_minutes(6);
        assert_eq!(portal.next_source(&key), FetchSource::Network);
    }
}
