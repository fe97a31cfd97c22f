use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::{error, warn};
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (code, message) = if let Some(err) = err.find::<ApiErrorCode>() {
        (*err, err.to_string())
    } else if err.is_not_found() {
        (ApiErrorCode::NotFound, "No such route".to_string())
    } else if err.find::<reject::MissingHeader>().is_some() {
        let code = ApiErrorCode::InvalidToken;
        (code, code.to_string())
    } else if let Some(err) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (ApiErrorCode::BadRequest, err.to_string())
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        let json = warp::reply::json(&ApiResponse::<()>::err(
            ApiErrorCode::BadRequest,
            "Method not allowed",
        ));
        return Ok(warp::reply::with_status(json, StatusCode::METHOD_NOT_ALLOWED));
    } else {
        warn!("Unhandled rejection: {:?}", err);
        let code = ApiErrorCode::BadRequest;
        (code, code.to_string())
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(code, message));
    Ok(warp::reply::with_status(json, code.status()))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Credential was rejected")]
    InvalidCredential,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Token has been revoked")]
    Revoked,
    #[error("User not found")]
    NotFound,
    #[error("Malformed request")]
    BadRequest,
    #[error("Service temporarily unavailable")]
    Unavailable,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidCredential
            | ApiErrorCode::InvalidToken
            | ApiErrorCode::Revoked => StatusCode::UNAUTHORIZED,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ApiErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredential => ApiErrorCode::InvalidCredential,
            AuthError::InvalidToken => ApiErrorCode::InvalidToken,
            AuthError::Revoked => ApiErrorCode::Revoked,
            AuthError::NotFound => ApiErrorCode::NotFound,
            AuthError::IdentityProvider(e) | AuthError::Store(e) => {
                warn!("Backend unavailable: {}", e);
                ApiErrorCode::Unavailable
            }
            // Resolved inside the session service; reaching here is a bug.
            AuthError::UserExists => {
                error!("UserExists escaped the session service");
                ApiErrorCode::InternalError
            }
            AuthError::InternalError(e) => {
                error!("Internal error: {}", e);
                ApiErrorCode::InternalError
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warp::Reply;

    #[derive(Debug)]
    struct InternalRejection;

    impl reject::Reject for InternalRejection {}

    #[tokio::test]
    async fn unhandled_rejection_hides_details() {
        let reply = recover_error(reject::custom(InternalRejection))
            .await
            .unwrap()
            .into_response();
        assert_eq!(reply.status(), StatusCode::BAD_REQUEST);

        let body = warp::hyper::body::to_bytes(reply.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "BadRequest");
        assert_eq!(json["error"]["message"], "Malformed request");
        assert!(!String::from_utf8_lossy(&body).contains("InternalRejection"));
    }

    #[test]
    fn transient_failures_map_to_unavailable() {
        let code = ApiErrorCode::from(AuthError::Store("timeout".to_string()));
        assert_eq!(code, ApiErrorCode::Unavailable);
        assert_eq!(code.status(), StatusCode::SERVICE_UNAVAILABLE);

        let code = ApiErrorCode::from(AuthError::IdentityProvider("503".to_string()));
        assert_eq!(code, ApiErrorCode::Unavailable);
    }

    #[test]
    fn rejections_are_unauthorized() {
        for err in [
            AuthError::InvalidCredential,
            AuthError::InvalidToken,
            AuthError::Revoked,
        ] {
            assert_eq!(ApiErrorCode::from(err).status(), StatusCode::UNAUTHORIZED);
        }
        assert_eq!(
            ApiErrorCode::from(AuthError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
    }
}
