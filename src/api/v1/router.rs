use super::error::*;
use super::handler;
use crate::application_port::*;
use crate::domain_model::Claims;
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, http, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let login = warp::post()
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.session_service.clone()))
        .and_then(handler::login);

    let refresh = warp::post()
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.session_service.clone()))
        .and_then(handler::refresh);

    let revoke = warp::post()
        .and(warp::path("revoke"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.session_service.clone()))
        .and_then(handler::revoke);

    let whoami = warp::get()
        .and(warp::path("whoami"))
        .and(warp::path::end())
        .and(with_verification(server.access_verifier.clone()))
        .and_then(handler::whoami);

    let enable_test_tokens = server.enable_test_tokens;
    let test_token = warp::post()
        .and(warp::path("test_token"))
        .and(warp::path::end())
        .and_then(move || async move {
            if enable_test_tokens {
                Ok::<(), warp::Rejection>(())
            } else {
                Err(reject::custom(ApiErrorCode::NotFound))
            }
        })
        .untuple_one()
        .and(warp::body::json())
        .and(with(server.session_service.clone()))
        .and_then(handler::test_token);

    login.or(refresh).or(revoke).or(whoami).or(test_token)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_verification(
    verifier: Arc<dyn AuthClient>,
) -> impl Filter<Extract = (Claims,), Error = warp::Rejection> + Clone {
    warp::header::<String>(http::header::AUTHORIZATION.as_ref()).and_then(move |token: String| {
        let verifier = verifier.clone();
        async move {
            // The verifier strips the scheme itself; refuse anything without one.
            if !token.trim_start().to_ascii_lowercase().starts_with("bearer ") {
                return Err(reject::custom(ApiErrorCode::InvalidToken));
            }
            verifier
                .verify(&token)
                .await
                .map_err(|e| match e {
                    AuthError::InvalidCredential => ApiErrorCode::InvalidToken,
                    other => ApiErrorCode::from(other),
                })
                .map_err(reject::custom)
        }
    })
}
