use crate::error::app_error::AppError;
use crate::middleware::ClientIp;
use crate::models::account::{AccountResponse, LoginRequest};
use crate::service::auth::{AuthOutcome, Authenticator};
use chrono::Utc;
use rocket::http::{ContentType, Status};
use rocket::response::Responder;
use rocket::serde::json::Json;
use rocket::{Request, Response, State, post};
use rocket_okapi::OpenApiError;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::Responses;
use rocket_okapi::openapi;
use rocket_okapi::response::OpenApiResponderInner;
use std::io::Cursor;
use validator::Validate;

const LOCKED: Status = Status::new(423);

/// HTTP rendering of an [`AuthOutcome`].
#[derive(Debug)]
pub enum LoginResponse {
    Authenticated(AccountResponse),
    Rejected {
        status: Status,
        message: &'static str,
        retry_after_secs: Option<i64>,
    },
}

impl From<AuthOutcome> for LoginResponse {
    fn from(outcome: AuthOutcome) -> Self {
        match outcome {
            AuthOutcome::Success(account) => LoginResponse::Authenticated(account),
            AuthOutcome::CredentialsInvalid => LoginResponse::Rejected {
                status: Status::Unauthorized,
                message: "Invalid credentials",
                retry_after_secs: None,
            },
            AuthOutcome::AccountInactive => LoginResponse::Rejected {
                status: Status::Forbidden,
                message: "Account is inactive",
                retry_after_secs: None,
            },
            AuthOutcome::AccountLocked { retry_after, .. } => LoginResponse::Rejected {
                status: LOCKED,
                message: "Account is temporarily locked",
                // Round up so clients never retry a moment too early.
                retry_after_secs: Some(((retry_after.num_milliseconds() + 999) / 1000).max(1)),
            },
        }
    }
}

impl<'r> Responder<'r, 'static> for LoginResponse {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'static> {
        match self {
            LoginResponse::Authenticated(account) => Json(account).respond_to(req),
            LoginResponse::Rejected {
                status,
                message,
                retry_after_secs,
            } => {
                let body = serde_json::json!({ "message": message }).to_string();
                let mut response = Response::build();
                response.status(status).header(ContentType::JSON).sized_body(body.len(), Cursor::new(body));
                if let Some(secs) = retry_after_secs {
                    response.raw_header("Retry-After", secs.to_string());
                }
                response.ok()
            }
        }
    }
}

impl OpenApiResponderInner for LoginResponse {
    fn responses(generator: &mut OpenApiGenerator) -> Result<Responses, OpenApiError> {
        use rocket_okapi::okapi::openapi3::{RefOr, Response as OpenApiResponse};
        let mut responses = <Json<AccountResponse> as OpenApiResponderInner>::responses(generator)?;
        for (code, description) in [
            ("401", "Unknown identifier or wrong password"),
            ("403", "Account is inactive"),
            ("423", "Account is locked; see Retry-After"),
        ] {
            responses.responses.insert(
                code.to_string(),
                RefOr::Object(OpenApiResponse {
                    description: description.to_string(),
                    ..Default::default()
                }),
            );
        }
        Ok(responses)
    }
}

/// Log in to the admin console
///
/// Accepts an email address or phone number as identifier. Repeated failures
/// lock the account for a fixed period.
#[openapi(tag = "Authentication")]
#[post("/login", data = "<payload>")]
pub async fn post_login(authenticator: &State<Authenticator>, client_ip: ClientIp, payload: Json<LoginRequest>) -> Result<LoginResponse, AppError> {
    payload.validate()?;

    let outcome = authenticator
        .authenticate_at(&payload.identifier, &payload.password, client_ip.0.as_deref(), Utc::now())
        .await?;

    Ok(LoginResponse::from(outcome))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![post_login]
}
