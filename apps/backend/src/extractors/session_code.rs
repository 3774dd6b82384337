use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};

use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::utils::join_code::normalize_code;

/// Room code from the `{code}` path segment, trimmed and uppercased.
/// Existence is checked by the handler's own lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCode(pub String);

impl SessionCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromRequest for SessionCode {
    type Error = AppError;
    type Future = std::future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = match req.match_info().get("code") {
            Some(raw) => normalize_code(raw).map(SessionCode).map_err(AppError::from),
            None => Err(AppError::bad_request(
                ErrorCode::InvalidSessionCode,
                "Missing code parameter",
            )),
        };
        std::future::ready(result)
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    #[actix_web::test]
    async fn normalizes_path_code() {
        let req = TestRequest::default()
            .param("code", " ab12cd ")
            .to_http_request();
        let code = SessionCode::extract(&req).await.unwrap();
        assert_eq!(code.as_str(), "AB12CD");
    }

    #[actix_web::test]
    async fn rejects_non_alphanumeric_code() {
        let req = TestRequest::default()
            .param("code", "AB-12")
            .to_http_request();
        let err = SessionCode::extract(&req).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidSessionCode);
        assert_eq!(err.status().as_u16(), 400);
    }
}
