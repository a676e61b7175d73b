use rocket::get;
use rocket::serde::json::Json;
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde::Serialize;

#[derive(Serialize, JsonSchema)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Liveness probe
#[openapi(tag = "Health")]
#[get("/")]
pub async fn healthcheck() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![healthcheck]
}

#[cfg(test)]
mod tests {
    use crate::database::memory::MemoryAccountStore;
    use crate::service::auth::Authenticator;
    use crate::service::lockout::LockoutPolicy;
    use crate::test_utils::test_hasher;
    use crate::{Config, build_rocket_with_authenticator};
    use rocket::http::Status;
    use rocket::local::asynchronous::Client;
    use std::sync::Arc;

    #[rocket::async_test]
    async fn health_check_works() {
        let authenticator = Authenticator::new(Arc::new(MemoryAccountStore::new()), test_hasher(), LockoutPolicy::default());
        let client = Client::tracked(build_rocket_with_authenticator(Config::default(), authenticator))
            .await
            .expect("valid rocket instance");

        let response = client.get("/api/health").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
    }

    #[rocket::async_test]
    async fn swagger_docs_are_served_when_enabled() {
        let mut config = Config::default();
        config.api.enable_swagger = true;
        let authenticator = Authenticator::new(Arc::new(MemoryAccountStore::new()), test_hasher(), LockoutPolicy::default());
        let client = Client::tracked(build_rocket_with_authenticator(config, authenticator))
            .await
            .expect("valid rocket instance");

        let response = client.get("/api/openapi.json").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let spec = response.into_string().await.unwrap_or_default();
        assert!(spec.contains("/api/auth/login") || spec.contains("/auth/login"));
    }
}
