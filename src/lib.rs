mod config;
pub mod database;
mod db;
pub mod error;
mod middleware;
pub mod models;
mod routes;
pub mod service;
mod tasks;

#[cfg(test)]
pub mod test_utils;

pub use config::Config;
pub use tasks::provision_admin_from_config;

use crate::db::stage_db;
use crate::middleware::RequestLogger;
use crate::routes as app_routes;
use crate::service::auth::Authenticator;
use rocket::{Build, Rocket, catchers, http::Method};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_okapi::swagger_ui::{SwaggerUIConfig, make_swagger_ui};
use rocket_okapi::{get_openapi_route, okapi::merge::marge_spec_list};
use tracing_subscriber::EnvFilter;

pub fn init_tracing(log_level: &str, json_format: bool) {
    // RUST_LOG takes precedence over the configured level, e.g.
    //   RUST_LOG=showroom_auth::service=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_line_number(true);

    // try_init: tests build several rockets in one process.
    let _ = if json_format { subscriber.json().try_init() } else { subscriber.try_init() };
}

fn build_cors(cors_config: &config::CorsConfig) -> CorsOptions {
    let is_wildcard = cors_config.allowed_origins.len() == 1 && cors_config.allowed_origins[0] == "*";

    if is_wildcard && cors_config.allow_credentials {
        panic!(
            "Invalid CORS configuration: Cannot use wildcard origins (*) with credentials enabled. \
            Either set specific origins or disable credentials."
        );
    }

    let allowed_origins = if is_wildcard {
        AllowedOrigins::all()
    } else {
        AllowedOrigins::some_exact(&cors_config.allowed_origins.iter().map(String::as_str).collect::<Vec<_>>())
    };

    CorsOptions {
        allowed_origins,
        allowed_methods: vec![Method::Get, Method::Post, Method::Options].into_iter().map(From::from).collect(),
        allowed_headers: rocket_cors::AllowedHeaders::some(&["Content-Type", "Accept"]),
        allow_credentials: cors_config.allow_credentials,
        ..Default::default()
    }
}

fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return config::DEFAULT_API_BASE_PATH.to_string();
    }

    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

struct RouteSpec {
    path: &'static str,
    routes: Vec<rocket::Route>,
    openapi: rocket_okapi::okapi::openapi3::OpenApi,
}

fn collect_route_specs() -> Vec<RouteSpec> {
    let (auth_routes, auth_openapi) = app_routes::auth::routes();
    let (health_routes, health_openapi) = app_routes::health::routes();

    vec![
        RouteSpec {
            path: "/auth",
            routes: auth_routes,
            openapi: auth_openapi,
        },
        RouteSpec {
            path: "/health",
            routes: health_routes,
            openapi: health_openapi,
        },
    ]
}

fn mount_api_routes(mut rocket: Rocket<Build>, base_path: &str, enable_swagger: bool) -> Rocket<Build> {
    let mut openapi_list = Vec::new();
    for spec in collect_route_specs() {
        rocket = rocket.mount(format!("{}{}", base_path, spec.path), spec.routes);
        openapi_list.push((spec.path, spec.openapi));
    }

    if enable_swagger {
        let openapi_docs = match marge_spec_list(&openapi_list) {
            Ok(docs) => docs,
            Err(err) => panic!("Could not merge OpenAPI spec: {}", err),
        };

        let settings = rocket_okapi::settings::OpenApiSettings::default();
        rocket = rocket.mount(base_path, vec![get_openapi_route(openapi_docs, &settings)]);
        rocket = rocket.mount(
            format!("{}/docs", base_path),
            make_swagger_ui(&SwaggerUIConfig {
                url: format!("{}/openapi.json", base_path),
                ..Default::default()
            }),
        );
    }

    rocket
}

fn base_rocket(config: &Config) -> Rocket<Build> {
    init_tracing(&config.logging.level, config.logging.json_format);

    let cors = build_cors(&config.cors).to_cors().expect("Failed to create CORS fairing");
    let base_path = normalize_base_path(&config.api.base_path);

    let figment = rocket::Config::figment()
        .merge(("address", config.server.address.clone()))
        .merge(("port", config.server.port));

    let rocket = rocket::custom(figment).attach(cors).attach(RequestLogger);
    let rocket = mount_api_routes(rocket, &base_path, config.api.enable_swagger);

    rocket.register(
        base_path.as_str(),
        catchers![app_routes::error::not_found, app_routes::error::unprocessable_entity],
    )
}

/// Rocket instance backed by Postgres, as configured.
pub fn build_rocket(config: Config) -> Rocket<Build> {
    base_rocket(&config).attach(stage_db(config))
}

/// Rocket instance around an already-built authenticator (any store).
pub fn build_rocket_with_authenticator(config: Config, authenticator: Authenticator) -> Rocket<Build> {
    base_rocket(&config).manage(authenticator)
}
