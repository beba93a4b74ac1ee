//! Integration tests for CORS policy resolution and the generated layers.

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use axum::routing::get;
use outpost::config::DEFAULT_DEVELOPMENT_ORIGIN;
use outpost::cors::policy::DEFAULT_ALLOWED_HEADERS;
use outpost::cors::resolver::resolve;
use outpost::prelude::*;
use tower::ServiceExt;

const CONSOLE: &str = "https://console.example.com";
const OPS: &str = "https://ops.example.com";

fn configured() -> CorsConfig {
    CorsConfig::with_origins([CONSOLE, OPS])
}

// ============================================================================
// Pure resolution
// ============================================================================

#[test]
fn test_development_includes_local_origin() {
    let registry = PolicyRegistry::standard();
    for name in PolicyName::ALL {
        let decision = resolve(
            registry.get(name).unwrap(),
            Environment::Development,
            &configured(),
        )
        .unwrap();
        assert!(decision.allows_origin(DEFAULT_DEVELOPMENT_ORIGIN), "{}", name);
        assert!(decision.allows_origin(CONSOLE), "{}", name);
    }
}

#[test]
fn test_production_equals_configured_list() {
    let registry = PolicyRegistry::standard();
    let decision = resolve(
        registry.get(PolicyName::UploadOriented).unwrap(),
        Environment::Production,
        &configured(),
    )
    .unwrap();

    let origins: Vec<&str> = decision.origins.iter().map(String::as_str).collect();
    assert_eq!(origins, vec![CONSOLE, OPS]);
    assert!(!decision.allows_origin(DEFAULT_DEVELOPMENT_ORIGIN));
}

#[test]
fn test_production_without_origins_is_fatal() {
    let registry = PolicyRegistry::standard();
    for name in PolicyName::ALL {
        let err = resolve(
            registry.get(name).unwrap(),
            Environment::Production,
            &CorsConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            OutpostError::Config(ConfigError::MissingField { .. })
        ));
    }
}

#[test]
fn test_matching_is_exact_and_scheme_sensitive() {
    let decision = CorsPolicyResolver::new(Environment::Production, configured())
        .unwrap()
        .resolve(PolicyName::MinimalRead)
        .unwrap();

    assert!(decision.allows_origin("https://CONSOLE.example.com:443"));
    assert!(!decision.allows_origin("http://console.example.com"));
    assert!(!decision.allows_origin("https://evil.console.example.com"));
    assert!(!decision.allows_origin("https://console.example.com.evil"));
    assert!(!decision.allows_origin("null"));
}

#[test]
fn test_every_policy_carries_default_headers() {
    let resolver = CorsPolicyResolver::new(Environment::Production, configured()).unwrap();
    for name in PolicyName::ALL {
        let decision = resolver.resolve(name).unwrap();
        for header in DEFAULT_ALLOWED_HEADERS.iter() {
            assert!(decision.headers.contains(header));
        }
    }
}

#[test]
fn test_configuration_update_is_observed_immediately() {
    let resolver = CorsPolicyResolver::new(Environment::Production, configured()).unwrap();
    let before = resolver.resolve(PolicyName::MinimalWrite).unwrap();
    assert!(!before.allows_origin("https://new.example.com"));

    resolver
        .update_config(CorsConfig::with_origins(["https://new.example.com"]))
        .unwrap();

    let after = resolver.resolve(PolicyName::MinimalWrite).unwrap();
    assert!(after.allows_origin("https://new.example.com"));
    assert!(!after.allows_origin(CONSOLE));
}

#[test]
fn test_invalid_origin_in_configuration_is_fatal() {
    let config = CorsConfig::with_origins(["https://console.example.com/app"]);
    assert!(matches!(
        CorsPolicyResolver::new(Environment::Development, config),
        Err(OutpostError::Config(ConfigError::InvalidValue { .. }))
    ));
}

// ============================================================================
// Tower layer
// ============================================================================

fn app(resolver: &CorsPolicyResolver, policy: PolicyName) -> Router {
    Router::new()
        .route("/agents", get(|| async { "[]" }))
        .layer(resolver.layer(policy).unwrap())
}

fn preflight(origin: &str, method: Method) -> Request<Body> {
    Request::builder()
        .method(Method::OPTIONS)
        .uri("/agents")
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, method.as_str())
        .body(Body::empty())
        .unwrap()
}

fn simple_get(origin: &str) -> Request<Body> {
    Request::builder()
        .uri("/agents")
        .header(header::ORIGIN, origin)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_layer_allows_configured_origin() {
    let resolver = CorsPolicyResolver::new(Environment::Production, configured()).unwrap();
    let response = app(&resolver, PolicyName::MinimalRead)
        .oneshot(simple_get(CONSOLE))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        CONSOLE
    );
}

#[tokio::test]
async fn test_layer_rejects_unknown_origin() {
    let resolver = CorsPolicyResolver::new(Environment::Production, configured()).unwrap();
    let response = app(&resolver, PolicyName::MinimalRead)
        .oneshot(simple_get("https://evil.example"))
        .await
        .unwrap();

    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}

#[tokio::test]
async fn test_layer_preflight_lists_policy_methods() {
    let resolver = CorsPolicyResolver::new(Environment::Production, configured()).unwrap();
    let response = app(&resolver, PolicyName::UploadOriented)
        .oneshot(preflight(CONSOLE, Method::PUT))
        .await
        .unwrap();

    let methods = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(methods.contains("PUT"));
    assert!(!methods.contains("DELETE"));

    let headers = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_HEADERS)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(headers.contains("cache-control"));
    assert!(headers.contains("x-requested-with"));
}

#[tokio::test]
async fn test_layer_observes_configuration_update() {
    let resolver = CorsPolicyResolver::new(Environment::Production, configured()).unwrap();
    let router = app(&resolver, PolicyName::MinimalWrite);

    resolver
        .update_config(CorsConfig::with_origins(["https://new.example.com"]))
        .unwrap();

    let response = router
        .clone()
        .oneshot(simple_get("https://new.example.com"))
        .await
        .unwrap();
    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_some()
    );

    let response = router.oneshot(simple_get(CONSOLE)).await.unwrap();
    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}

#[tokio::test]
async fn test_layer_in_development_allows_local_origin() {
    let host = ServerBuilder::new()
        .with_environment(Environment::Development)
        .build_host()
        .unwrap();
    let router = Router::new()
        .route("/agents", get(|| async { "[]" }))
        .layer(host.cors_layer(PolicyName::MinimalRead).unwrap());

    let response = router
        .oneshot(simple_get(DEFAULT_DEVELOPMENT_ORIGIN))
        .await
        .unwrap();
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        DEFAULT_DEVELOPMENT_ORIGIN
    );
}
