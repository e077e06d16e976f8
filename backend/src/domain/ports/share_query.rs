//! Driving port for share read operations.
//!
//! Inbound adapters use this port to list shares from either side of the
//! exchange without depending on repository details.

use async_trait::async_trait;
use pagination::{PageParams, Paginated};
use serde::{Deserialize, Serialize};

use crate::domain::Error;
use crate::domain::share::ShareStatus;
use crate::domain::user::UserId;

use super::share_command::SharePayload;

/// Request to list a patient's shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPatientSharesRequest {
    pub patient_id: UserId,
    pub params: PageParams,
}

/// Request to list a doctor's received shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDoctorSharesRequest {
    pub doctor_id: UserId,
    pub status: Option<ShareStatus>,
    pub params: PageParams,
}

/// Driving port for share read operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShareQuery: Send + Sync {
    /// List a patient's shares, newest first.
    async fn list_for_patient(
        &self,
        request: ListPatientSharesRequest,
    ) -> Result<Paginated<SharePayload>, Error>;

    /// List a doctor's received shares, newest first, optionally filtered by
    /// status.
    async fn list_for_doctor(
        &self,
        request: ListDoctorSharesRequest,
    ) -> Result<Paginated<SharePayload>, Error>;
}

/// Fixture query implementation for tests that do not exercise shares.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureShareQuery;

#[async_trait]
impl ShareQuery for FixtureShareQuery {
    async fn list_for_patient(
        &self,
        request: ListPatientSharesRequest,
    ) -> Result<Paginated<SharePayload>, Error> {
        Ok(Paginated::assemble(Vec::new(), request.params, 0))
    }

    async fn list_for_doctor(
        &self,
        request: ListDoctorSharesRequest,
    ) -> Result<Paginated<SharePayload>, Error> {
        Ok(Paginated::assemble(Vec::new(), request.params, 0))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use super::*;

    #[tokio::test]
    async fn fixture_lists_are_empty() {
        let query = FixtureShareQuery;
        let page = query
            .list_for_doctor(ListDoctorSharesRequest {
                doctor_id: UserId::random(),
                status: Some(ShareStatus::Pending),
                params: PageParams::default(),
            })
            .await
            .expect("fixture list succeeds");
        assert!(page.items.is_empty());
        assert_eq!(page.pagination.total_items, 0);
    }
}
