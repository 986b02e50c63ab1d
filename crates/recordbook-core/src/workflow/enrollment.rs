//! Club enrollment with optimistic membership.
//!
//! The club shows as joined as soon as the student asks, before the server
//! answers. If the server refuses or the request fails, the membership is
//! taken back and a notice explains why.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::notice::Notices;
use crate::api::wire::EnrollmentRequest;
use crate::api::RecordGateway;
use crate::cache::{Domain, DomainData, DomainKey, DomainStore, EntityPatch};
use crate::error::{ClientError, ClientResult};
use crate::models::{Actor, ClubDirectory, ClubRole, Enrollment};

/// What an accepted enrollment changed locally.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentOutcome {
    pub club_id: String,
    /// False when the club list wasn't loaded, so nothing was shown early.
    pub optimistic: bool,
    pub enrollment: Option<Enrollment>,
}

#[derive(Clone)]
pub struct EnrollmentFlow {
    gateway: Arc<dyn RecordGateway>,
    store: DomainStore,
    notices: Notices,
}

impl EnrollmentFlow {
    pub fn new(gateway: Arc<dyn RecordGateway>, store: DomainStore, notices: Notices) -> Self {
        Self {
            gateway,
            store,
            notices,
        }
    }

    fn directory(&self) -> Option<ClubDirectory> {
        self.store
            .get(&DomainKey::new(Domain::Clubs))
            .data
            .and_then(DomainData::into_clubs)
    }

    pub async fn enroll(
        &self,
        actor: &Actor,
        club_id: &str,
        role: ClubRole,
        amount_paid: u32,
    ) -> ClientResult<EnrollmentOutcome> {
        if !actor.is_student() {
            return Err(ClientError::PermissionDenied {
                role: actor.role,
                action: "enroll in clubs",
            });
        }

        let directory = self.directory();
        let club_name = directory
            .as_ref()
            .and_then(|d| d.find(club_id))
            .map(|c| c.name.clone())
            .unwrap_or_else(|| club_id.to_string());
        if directory.as_ref().is_some_and(|d| d.is_enrolled(club_id)) {
            return Err(ClientError::Validation(format!(
                "Already enrolled in {}",
                club_name
            )));
        }

        let joined = EntityPatch::Membership { joined: true };
        let optimistic = self.store.patch(Domain::Clubs, club_id, &joined) > 0;
        if !optimistic {
            debug!(club_id, "Club list not loaded, enrolling without optimistic update");
        }

        let request = EnrollmentRequest {
            club_id: club_id.to_string(),
            role,
            amount_paid,
        };
        let result = match self.gateway.enroll(&request).await {
            Ok(response) => response.into_result(),
            Err(e) => Err(e),
        };

        match result {
            Ok(enrollment) => {
                info!(club_id, role = %role, "Enrolled in club");
                Ok(EnrollmentOutcome {
                    club_id: club_id.to_string(),
                    optimistic,
                    enrollment,
                })
            }
            Err(e) => {
                if optimistic {
                    let left = EntityPatch::Membership { joined: false };
                    self.store.patch(Domain::Clubs, club_id, &left);
                }
                warn!(club_id, error = %e, "Enrollment failed, membership rolled back");
                self.notices
                    .error(format!("Could not join {}: {}", club_name, e));
                Err(e)
            }
        }
    }
}
