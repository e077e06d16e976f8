//! Shared validation helpers for inbound HTTP adapters.

use pagination::PageParams;
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::domain::Error;

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(&self) -> &str {
        self.0
    }
}

/// Parse a UUID path or body segment, naming the field on failure.
pub(crate) fn parse_uuid(value: &str, field: FieldName) -> Result<Uuid, Error> {
    Uuid::parse_str(value).map_err(|_| {
        Error::invalid_request(format!("{} must be a valid UUID", field.as_str())).with_details(
            json!({
                "field": field.as_str(),
                "value": value,
                "code": "invalid_uuid",
            }),
        )
    })
}

/// Raw pagination query string accepted by list endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    /// 1-based page number; defaults to 1.
    pub page: Option<u32>,
    /// Page size; defaults to 10 and is clamped to 50.
    pub limit: Option<u32>,
}

impl PageQuery {
    /// Validate the raw query into page parameters.
    pub(crate) fn into_params(self) -> Result<PageParams, Error> {
        PageParams::from_query(self.page, self.limit).map_err(|err| {
            Error::invalid_request(err.to_string()).with_details(json!({
                "field": if self.page == Some(0) { "page" } else { "limit" },
                "code": "invalid_pagination",
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;

    use crate::domain::ErrorCode;

    use super::*;

    #[rstest]
    fn parse_uuid_names_the_field() {
        let error = parse_uuid("not-a-uuid", FieldName::new("predictionId"))
            .expect_err("invalid uuid");
        assert_eq!(error.code(), ErrorCode::InvalidRequest);
        let details = error.details().expect("details present");
        assert_eq!(details["field"], "predictionId");
    }

    #[rstest]
    fn empty_query_falls_back_to_defaults() {
        let params = PageQuery::default().into_params().expect("defaults valid");
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 10);
    }

    #[rstest]
    fn zero_page_is_rejected() {
        let query = PageQuery {
            page: Some(0),
            limit: None,
        };
        let error = query.into_params().expect_err("zero page");
        assert_eq!(error.code(), ErrorCode::InvalidRequest);
    }
}
