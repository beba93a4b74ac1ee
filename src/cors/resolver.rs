//! Resolution of a named policy into a concrete cross-origin decision
//!
//! The resolver owns the live [`CorsConfig`] and the execution
//! [`Environment`]. Every call to [`CorsPolicyResolver::resolve`] and every
//! request passing through a [`CorsPolicyResolver::layer`] reads the current
//! configuration, so an update is observed by the next request without
//! rebuilding the router.

use super::origin::normalize_origin;
use super::policy::{CorsPolicy, PolicyName, PolicyRegistry};
use crate::config::{CorsConfig, Environment};
use crate::core::error::{ConfigError, OutpostResult, StorageError};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, header};
use indexmap::IndexSet;
use std::sync::{Arc, RwLock};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// The outcome of resolving a policy under an environment and configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsDecision {
    pub policy: PolicyName,
    /// Normalized allowed origins, in configuration order
    pub origins: IndexSet<String>,
    pub headers: Vec<HeaderName>,
    pub methods: Vec<Method>,
}

impl CorsDecision {
    /// Whether a request `Origin` is allowed; invalid origins never are
    pub fn allows_origin(&self, origin: &str) -> bool {
        normalize_origin(origin)
            .map(|origin| self.origins.contains(&origin))
            .unwrap_or(false)
    }

    pub fn allows_method(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    /// Response headers for a request carrying `origin`
    ///
    /// The allow-origin header is only emitted for an allowed origin, and
    /// echoes it back rather than a wildcard.
    pub fn response_headers(&self, origin: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::VARY, HeaderValue::from_static("origin"));

        let Some(origin) = origin.filter(|origin| self.allows_origin(origin)) else {
            return headers;
        };
        let Ok(origin) = HeaderValue::from_str(origin.trim()) else {
            return headers;
        };

        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        if let Ok(methods) = HeaderValue::from_str(&join(self.methods.iter().map(Method::as_str)))
        {
            headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, methods);
        }
        if let Ok(allowed) =
            HeaderValue::from_str(&join(self.headers.iter().map(HeaderName::as_str)))
        {
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, allowed);
        }
        headers
    }
}

fn join<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.collect::<Vec<_>>().join(", ")
}

/// Resolve `policy` against an explicit environment and configuration
pub fn resolve(
    policy: &CorsPolicy,
    environment: Environment,
    config: &CorsConfig,
) -> OutpostResult<CorsDecision> {
    Ok(CorsDecision {
        policy: policy.name,
        origins: policy.origins(environment, config)?,
        headers: policy.allowed_headers.clone(),
        methods: policy.allowed_methods.clone(),
    })
}

/// Resolves named policies against the live configuration
#[derive(Debug, Clone)]
pub struct CorsPolicyResolver {
    registry: Arc<PolicyRegistry>,
    environment: Environment,
    config: Arc<RwLock<CorsConfig>>,
}

impl CorsPolicyResolver {
    /// Create a resolver over the standard policies
    ///
    /// Fails when `config` does not define a policy for `environment`, so a
    /// misconfigured production process never starts.
    pub fn new(environment: Environment, config: CorsConfig) -> OutpostResult<Self> {
        Self::with_registry(PolicyRegistry::standard(), environment, config)
    }

    pub fn with_registry(
        registry: PolicyRegistry,
        environment: Environment,
        config: CorsConfig,
    ) -> OutpostResult<Self> {
        config.validate(environment)?;
        Ok(Self {
            registry: Arc::new(registry),
            environment,
            config: Arc::new(RwLock::new(config)),
        })
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> OutpostResult<CorsConfig> {
        let config = self
            .config
            .read()
            .map_err(|_| StorageError::poisoned("cors.config"))?;
        Ok(config.clone())
    }

    /// Replace the configuration; an invalid one is rejected and the old kept
    pub fn update_config(&self, config: CorsConfig) -> OutpostResult<()> {
        config.validate(self.environment)?;
        let mut current = self
            .config
            .write()
            .map_err(|_| StorageError::poisoned("cors.config"))?;
        *current = config;
        tracing::info!(
            environment = %self.environment,
            origins = current.allowed_origins.len(),
            "CORS configuration updated"
        );
        Ok(())
    }

    /// Resolve `name` against the current configuration
    pub fn resolve(&self, name: PolicyName) -> OutpostResult<CorsDecision> {
        let policy = self.policy(name)?;
        let config = self
            .config
            .read()
            .map_err(|_| StorageError::poisoned("cors.config"))?;
        resolve(policy, self.environment, &config)
    }

    pub fn resolve_named(&self, name: &str) -> OutpostResult<CorsDecision> {
        self.resolve(name.parse()?)
    }

    fn policy(&self, name: PolicyName) -> OutpostResult<&CorsPolicy> {
        self.registry.get(name).ok_or_else(|| {
            ConfigError::InvalidValue {
                field: "cors.policy".to_string(),
                value: name.to_string(),
                message: "policy is not registered".to_string(),
            }
            .into()
        })
    }

    /// A tower layer enforcing `name` on every request
    ///
    /// The origin check reads the live configuration per request. A policy
    /// that cannot be resolved denies every origin.
    pub fn layer(&self, name: PolicyName) -> OutpostResult<CorsLayer> {
        let policy = self.policy(name)?.clone();
        let resolver = self.clone();

        let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _parts: &Parts| {
            let Ok(origin) = origin.to_str() else {
                return false;
            };
            match resolver.resolve(name) {
                Ok(decision) => decision.allows_origin(origin),
                Err(e) => {
                    tracing::warn!(policy = %name, error = %e, "CORS policy could not be resolved");
                    false
                }
            }
        });

        Ok(CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(policy.allowed_methods)
            .allow_headers(policy.allowed_headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn production() -> CorsPolicyResolver {
        CorsPolicyResolver::new(
            Environment::Production,
            CorsConfig::with_origins(["https://console.example.com"]),
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_empty_production_config() {
        assert!(CorsPolicyResolver::new(Environment::Production, CorsConfig::default()).is_err());
        assert!(CorsPolicyResolver::new(Environment::Development, CorsConfig::default()).is_ok());
    }

    #[test]
    fn test_resolve_production_origins() {
        let decision = production().resolve(PolicyName::MinimalWrite).unwrap();
        assert_eq!(decision.policy, PolicyName::MinimalWrite);
        assert!(decision.allows_origin("https://console.example.com"));
        assert!(!decision.allows_origin("http://localhost:3000"));
        assert!(decision.allows_method(&Method::DELETE));
    }

    #[test]
    fn test_update_config_is_observed() {
        let resolver = production();
        resolver
            .update_config(CorsConfig::with_origins(["https://ops.example.com"]))
            .unwrap();

        let decision = resolver.resolve(PolicyName::MinimalRead).unwrap();
        assert!(decision.allows_origin("https://ops.example.com"));
        assert!(!decision.allows_origin("https://console.example.com"));
    }

    #[test]
    fn test_invalid_update_keeps_previous_config() {
        let resolver = production();
        assert!(resolver.update_config(CorsConfig::default()).is_err());
        assert_eq!(
            resolver.config().unwrap().allowed_origins,
            vec!["https://console.example.com".to_string()]
        );
    }

    #[test]
    fn test_response_headers_for_allowed_origin() {
        let decision = production().resolve(PolicyName::MinimalRead).unwrap();
        let headers = decision.response_headers(Some("https://console.example.com"));

        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://console.example.com"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            "GET, HEAD, OPTIONS"
        );
        assert_eq!(headers.get(header::VARY).unwrap(), "origin");
    }

    #[test]
    fn test_response_headers_for_rejected_origin() {
        let decision = production().resolve(PolicyName::MinimalRead).unwrap();
        let headers = decision.response_headers(Some("https://evil.example"));
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());

        let headers = decision.response_headers(None);
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[test]
    fn test_resolve_named() {
        let resolver = production();
        assert_eq!(
            resolver.resolve_named("upload-oriented").unwrap().policy,
            PolicyName::UploadOriented
        );
        assert!(resolver.resolve_named("everything").is_err());
    }
}
