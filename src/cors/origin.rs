//! Origin normalization and the environment-aware origin rule
//!
//! # Matching rule
//!
//! Origins are compared as normalized `scheme://host[:port]` strings:
//!
//! - only `http` and `https` are accepted;
//! - scheme and host are lowercased;
//! - the default port of the scheme (80 / 443) is dropped;
//! - a trailing `/` is dropped; any other path, query or userinfo is rejected.
//!
//! Two origins match when their normalized forms are equal. Matching is
//! therefore scheme-sensitive (`http://a.example` does not match
//! `https://a.example`) and has no wildcard or subdomain semantics.

use crate::config::{CorsConfig, Environment};
use crate::core::error::{ConfigError, OutpostError, OutpostResult};
use axum::http::Uri;
use indexmap::IndexSet;

/// Normalize an origin string, or explain why it is not a valid origin
pub fn normalize_origin(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("origin is empty".to_string());
    }

    let uri: Uri = trimmed
        .parse()
        .map_err(|e| format!("not a valid URI: {}", e))?;

    let scheme = uri
        .scheme_str()
        .ok_or_else(|| "origin has no scheme".to_string())?
        .to_ascii_lowercase();
    let default_port = match scheme.as_str() {
        "http" => 80,
        "https" => 443,
        other => return Err(format!("unsupported scheme '{}'", other)),
    };

    let authority = uri
        .authority()
        .ok_or_else(|| "origin has no host".to_string())?;
    if authority.as_str().contains('@') {
        return Err("origin must not contain userinfo".to_string());
    }

    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("");
    if !path_and_query.is_empty() && path_and_query != "/" {
        return Err("origin must not contain a path or query".to_string());
    }

    let host = authority.host().to_ascii_lowercase();
    if host.is_empty() {
        return Err("origin has no host".to_string());
    }

    Ok(match authority.port_u16() {
        Some(port) if port != default_port => format!("{}://{}:{}", scheme, host, port),
        _ => format!("{}://{}", scheme, host),
    })
}

/// Whether two origins are equal under the matching rule
///
/// Invalid origins never match anything.
pub fn origins_match(left: &str, right: &str) -> bool {
    match (normalize_origin(left), normalize_origin(right)) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}

/// Normalize a configured list, keeping first-seen order and dropping duplicates
pub fn normalize_all(field: &str, origins: &[String]) -> OutpostResult<IndexSet<String>> {
    origins
        .iter()
        .map(|origin| {
            normalize_origin(origin).map_err(|message| {
                OutpostError::from(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: origin.clone(),
                    message,
                })
            })
        })
        .collect()
}

/// The origin rule shared by every canonical policy
///
/// - development: the configured origins plus the development origin;
/// - production: exactly the configured origins. An empty list is an error,
///   never an implicit "allow all".
pub fn environment_origins(
    environment: Environment,
    config: &CorsConfig,
) -> OutpostResult<IndexSet<String>> {
    let mut origins = normalize_all("cors.allowed_origins", &config.allowed_origins)?;

    match environment {
        Environment::Development => {
            let development = normalize_origin(&config.development_origin).map_err(|message| {
                ConfigError::InvalidValue {
                    field: "cors.development_origin".to_string(),
                    value: config.development_origin.clone(),
                    message,
                }
            })?;
            origins.insert(development);
        }
        Environment::Production => {
            if origins.is_empty() {
                return Err(ConfigError::MissingField {
                    field: "cors.allowed_origins".to_string(),
                    context: "production environment".to_string(),
                }
                .into());
            }
        }
    }

    Ok(origins)
}
