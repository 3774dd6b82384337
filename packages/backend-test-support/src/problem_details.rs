//! Assertions over the backend's RFC 7807 error bodies.
//!
//! Kept free of backend types so the contract is checked from the wire:
//! `type` is `https://telephone.game/errors/{CODE}`, `title` is the code in
//! words, and the body's `trace_id` equals the `x-trace-id` header.

use actix_web::body::BoxBody;
use actix_web::dev::ServiceResponse;
use actix_web::http::header::HeaderMap;
use actix_web::http::StatusCode;
use serde::Deserialize;

const TYPE_PREFIX: &str = "https://telephone.game/errors/";
const TRACE_HEADER: &str = "x-trace-id";

/// An error body as a client sees it.
#[derive(Debug, Deserialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub type_uri: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub code: String,
    pub trace_id: String,
}

impl Problem {
    /// Decode a body and check the parts every error shares.
    pub fn from_parts(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Self {
        let problem: Problem = serde_json::from_slice(body).unwrap_or_else(|e| {
            panic!(
                "expected a problem body for {status}: {e}; got {}",
                String::from_utf8_lossy(body)
            )
        });

        assert_eq!(problem.status, status.as_u16(), "body status differs from HTTP status");
        assert_eq!(
            problem.type_uri,
            format!("{TYPE_PREFIX}{}", problem.code),
            "type URI should name the code"
        );
        assert!(!problem.title.is_empty(), "title should be set");

        let header = headers
            .get(TRACE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_else(|| panic!("{TRACE_HEADER} header missing on {}", problem.code));
        assert_eq!(problem.trace_id, header, "body trace_id should echo the header");

        problem
    }

    pub fn assert_is(self, code: &str, status: StatusCode, detail_fragment: Option<&str>) -> Self {
        assert_eq!(self.code, code, "unexpected error code (detail: {})", self.detail);
        assert_eq!(self.status, status.as_u16(), "unexpected status for {code}");
        if let Some(fragment) = detail_fragment {
            assert!(
                self.detail.contains(fragment),
                "detail for {code} should mention '{fragment}', got '{}'",
                self.detail
            );
        }
        self
    }
}

/// Read a test-service response and assert it is the given problem.
pub async fn assert_problem_details_from_service_response(
    resp: ServiceResponse<BoxBody>,
    expected_code: &str,
    expected_status: StatusCode,
    expected_detail_contains: Option<&str>,
) -> Problem {
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = actix_web::test::read_body(resp).await;

    Problem::from_parts(status, &headers, &body).assert_is(
        expected_code,
        expected_status,
        expected_detail_contains,
    )
}
