//! Named cross-origin policies and their registry

use crate::config::{CorsConfig, Environment};
use crate::core::error::{ConfigError, OutpostError, OutpostResult};
use axum::http::{HeaderName, Method, header};
use indexmap::{IndexMap, IndexSet};
use std::fmt;
use std::str::FromStr;

/// Computes the allowed origins of a policy for an environment
pub type OriginRule = fn(Environment, &CorsConfig) -> OutpostResult<IndexSet<String>>;

/// Headers every policy allows in addition to its own
pub const DEFAULT_ALLOWED_HEADERS: [HeaderName; 3] = [
    header::ACCEPT,
    header::ACCEPT_LANGUAGE,
    header::CONTENT_LANGUAGE,
];

/// The canonical policy names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PolicyName {
    /// Browser uploads: POST/PUT with cache and XHR headers
    UploadOriented,
    /// Plain JSON writes
    MinimalWrite,
    /// Read-only access
    MinimalRead,
}

impl PolicyName {
    pub const ALL: [PolicyName; 3] = [
        PolicyName::UploadOriented,
        PolicyName::MinimalWrite,
        PolicyName::MinimalRead,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyName::UploadOriented => "upload-oriented",
            PolicyName::MinimalWrite => "minimal-write",
            PolicyName::MinimalRead => "minimal-read",
        }
    }
}

impl fmt::Display for PolicyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyName {
    type Err = OutpostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PolicyName::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ConfigError::InvalidValue {
                    field: "cors.policy".to_string(),
                    value: s.to_string(),
                    message: "unknown policy name".to_string(),
                }
                .into()
            })
    }
}

/// A named bundle of allowed headers, methods and an origin rule
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    pub name: PolicyName,
    pub allowed_headers: Vec<HeaderName>,
    pub allowed_methods: Vec<Method>,
    pub origin_rule: OriginRule,
}

impl CorsPolicy {
    /// Build a policy; the default headers are prepended to `extra_headers`
    pub fn new(
        name: PolicyName,
        extra_headers: impl IntoIterator<Item = HeaderName>,
        allowed_methods: Vec<Method>,
        origin_rule: OriginRule,
    ) -> Self {
        let mut headers: Vec<HeaderName> = DEFAULT_ALLOWED_HEADERS.to_vec();
        for header in extra_headers {
            if !headers.contains(&header) {
                headers.push(header);
            }
        }

        Self {
            name,
            allowed_headers: headers,
            allowed_methods,
            origin_rule,
        }
    }

    /// Origins this policy allows under `environment`
    pub fn origins(
        &self,
        environment: Environment,
        config: &CorsConfig,
    ) -> OutpostResult<IndexSet<String>> {
        (self.origin_rule)(environment, config)
    }
}

/// Immutable set of policies, keyed by name
#[derive(Debug, Clone)]
pub struct PolicyRegistry {
    policies: IndexMap<PolicyName, CorsPolicy>,
}

impl PolicyRegistry {
    /// The three canonical policies, all sharing the environment origin rule
    pub fn standard() -> Self {
        let rule: OriginRule = super::origin::environment_origins;

        let policies = [
            CorsPolicy::new(
                PolicyName::UploadOriented,
                [header::CACHE_CONTROL, HeaderName::from_static("x-requested-with")],
                vec![Method::GET, Method::POST, Method::PUT, Method::OPTIONS],
                rule,
            ),
            CorsPolicy::new(
                PolicyName::MinimalWrite,
                [header::CONTENT_TYPE],
                vec![
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ],
                rule,
            ),
            CorsPolicy::new(
                PolicyName::MinimalRead,
                Vec::new(),
                vec![Method::GET, Method::HEAD, Method::OPTIONS],
                rule,
            ),
        ];

        Self {
            policies: policies
                .into_iter()
                .map(|policy| (policy.name, policy))
                .collect(),
        }
    }

    pub fn get(&self, name: PolicyName) -> Option<&CorsPolicy> {
        self.policies.get(&name)
    }

    /// Look up a policy by its string name
    pub fn get_by_name(&self, name: &str) -> OutpostResult<&CorsPolicy> {
        let name: PolicyName = name.parse()?;
        self.get(name).ok_or_else(|| {
            ConfigError::InvalidValue {
                field: "cors.policy".to_string(),
                value: name.to_string(),
                message: "policy is not registered".to_string(),
            }
            .into()
        })
    }

    pub fn names(&self) -> impl Iterator<Item = PolicyName> + '_ {
        self.policies.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_has_all_policies() {
        let registry = PolicyRegistry::standard();
        assert_eq!(registry.len(), 3);
        for name in PolicyName::ALL {
            assert_eq!(registry.get(name).unwrap().name, name);
        }
    }

    #[test]
    fn test_policy_name_parsing() {
        assert_eq!(
            "upload-oriented".parse::<PolicyName>().unwrap(),
            PolicyName::UploadOriented
        );
        assert_eq!(
            "Minimal-Read".parse::<PolicyName>().unwrap(),
            PolicyName::MinimalRead
        );
        assert!("allow-all".parse::<PolicyName>().is_err());
    }

    #[test]
    fn test_default_headers_on_every_policy() {
        let registry = PolicyRegistry::standard();
        for name in registry.names() {
            let policy = registry.get(name).unwrap();
            for header in DEFAULT_ALLOWED_HEADERS.iter() {
                assert!(policy.allowed_headers.contains(header), "{} lacks {}", name, header);
            }
        }
    }

    #[test]
    fn test_policy_specific_headers_and_methods() {
        let registry = PolicyRegistry::standard();

        let upload = registry.get(PolicyName::UploadOriented).unwrap();
        assert!(upload.allowed_headers.contains(&header::CACHE_CONTROL));
        assert!(upload.allowed_methods.contains(&Method::PUT));
        assert!(!upload.allowed_methods.contains(&Method::DELETE));

        let write = registry.get(PolicyName::MinimalWrite).unwrap();
        assert!(write.allowed_headers.contains(&header::CONTENT_TYPE));
        assert!(write.allowed_methods.contains(&Method::DELETE));

        let read = registry.get(PolicyName::MinimalRead).unwrap();
        assert_eq!(read.allowed_headers.len(), DEFAULT_ALLOWED_HEADERS.len());
        assert!(!read.allowed_methods.contains(&Method::POST));
    }

    #[test]
    fn test_get_by_name() {
        let registry = PolicyRegistry::standard();
        assert_eq!(
            registry.get_by_name("minimal-write").unwrap().name,
            PolicyName::MinimalWrite
        );
        assert!(registry.get_by_name("unknown").is_err());
    }

    #[test]
    fn test_policies_share_origin_rule() {
        let registry = PolicyRegistry::standard();
        let config = CorsConfig::with_origins(["https://console.example.com"]);
        let expected = registry
            .get(PolicyName::MinimalRead)
            .unwrap()
            .origins(Environment::Production, &config)
            .unwrap();
        for name in PolicyName::ALL {
            let origins = registry
                .get(name)
                .unwrap()
                .origins(Environment::Production, &config)
                .unwrap();
            assert_eq!(origins, expected);
        }
    }
}
