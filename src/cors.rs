//! # CORS
//!
//! Cross-origin headers for every response and the `OPTIONS` preflight short-circuit.
//!
//! The default policy is permissive: `Access-Control-Allow-Origin: *` and
//! `Access-Control-Allow-Methods: POST, GET, PUT, DELETE, OPTIONS`. With an explicit origin
//! list, the request's `Origin` is echoed back only when it is listed, together with
//! `Vary: Origin`.
//!
//! `OPTIONS` requests never reach routing: they are answered with `200` and no body.

use crate::server::HttpResponse;
use http::{Method, StatusCode};
use serde::Deserialize;
use std::fmt;
use tracing::debug;

/// CORS section of the server configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    /// `["*"]` allows any origin
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
    /// Preflight cache lifetime in seconds
    pub max_age: Option<u32>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            allowed_methods: ["POST", "GET", "PUT", "DELETE", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allowed_headers: Vec::new(),
            allow_credentials: false,
            max_age: None,
        }
    }
}

/// CORS configuration error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsConfigError {
    /// Wildcard origin (`*`) cannot be used with credentials
    WildcardWithCredentials,
    /// Credentials require at least one explicit origin
    EmptyOriginsWithCredentials,
    /// Origin is not of the form `scheme://host[:port]`
    InvalidOriginFormat { origin: String },
    /// Method name is not a valid HTTP token
    InvalidMethod { method: String },
}

impl fmt::Display for CorsConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorsConfigError::WildcardWithCredentials => write!(
                f,
                "CORS configuration error: cannot use wildcard origin (*) with credentials"
            ),
            CorsConfigError::EmptyOriginsWithCredentials => write!(
                f,
                "CORS configuration error: credentials require at least one allowed origin"
            ),
            CorsConfigError::InvalidOriginFormat { origin } => write!(
                f,
                "CORS configuration error: invalid origin '{origin}' (expected scheme://host[:port])"
            ),
            CorsConfigError::InvalidMethod { method } => {
                write!(f, "CORS configuration error: invalid method '{method}'")
            }
        }
    }
}

impl std::error::Error for CorsConfigError {}

/// Origin validation strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginValidation {
    /// Allow all origins
    Wildcard,
    /// Exact string matching
    Exact(Vec<String>),
}

impl OriginValidation {
    fn allowed<'o>(&self, origin: Option<&'o str>) -> Option<&'o str> {
        match self {
            OriginValidation::Wildcard => Some("*"),
            OriginValidation::Exact(list) => origin.filter(|o| list.iter().any(|a| a == o)),
        }
    }
}

/// Validated CORS settings applied by the request pipeline
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    enabled: bool,
    origins: OriginValidation,
    methods: String,
    headers: String,
    allow_credentials: bool,
    max_age: Option<u32>,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self::permissive()
    }
}

impl CorsPolicy {
    /// `*` origin with the default method list
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            enabled: true,
            origins: OriginValidation::Wildcard,
            methods: "POST, GET, PUT, DELETE, OPTIONS".to_string(),
            headers: String::new(),
            allow_credentials: false,
            max_age: None,
        }
    }

    /// Policy that adds no headers; `OPTIONS` is still short-circuited
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::permissive()
        }
    }

    pub fn from_config(config: &CorsConfig) -> Result<Self, CorsConfigError> {
        let origins = if config.allowed_origins.iter().any(|o| o == "*") {
            OriginValidation::Wildcard
        } else {
            for origin in &config.allowed_origins {
                validate_origin_format(origin)?;
            }
            OriginValidation::Exact(config.allowed_origins.clone())
        };

        if config.allow_credentials {
            match &origins {
                OriginValidation::Wildcard => return Err(CorsConfigError::WildcardWithCredentials),
                OriginValidation::Exact(list) if list.is_empty() => {
                    return Err(CorsConfigError::EmptyOriginsWithCredentials)
                }
                OriginValidation::Exact(_) => {}
            }
        }

        let mut methods = Vec::with_capacity(config.allowed_methods.len());
        for m in &config.allowed_methods {
            let parsed = Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes())
                .map_err(|_| CorsConfigError::InvalidMethod { method: m.clone() })?;
            methods.push(parsed.as_str().to_string());
        }

        Ok(Self {
            enabled: config.enabled,
            origins,
            methods: methods.join(", "),
            headers: config.allowed_headers.join(", "),
            allow_credentials: config.allow_credentials,
            max_age: config.max_age,
        })
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Add CORS headers for a request carrying `origin`
    pub fn apply(&self, origin: Option<&str>, resp: &mut HttpResponse) {
        if !self.enabled {
            return;
        }
        match self.origins.allowed(origin) {
            Some(allowed) => {
                resp.set_header("Access-Control-Allow-Origin", allowed);
                if allowed != "*" {
                    resp.set_header("Vary", "Origin");
                }
            }
            None => {
                debug!(origin = ?origin, "origin not allowed; omitting CORS headers");
                return;
            }
        }
        resp.set_header("Access-Control-Allow-Methods", self.methods.as_str());
        if !self.headers.is_empty() {
            resp.set_header("Access-Control-Allow-Headers", self.headers.as_str());
        }
        if self.allow_credentials {
            resp.set_header("Access-Control-Allow-Credentials", "true");
        }
    }

    /// Answer an `OPTIONS` request: `200`, CORS headers, no body
    #[must_use]
    pub fn preflight(&self, origin: Option<&str>) -> HttpResponse {
        let mut resp = HttpResponse::new(StatusCode::OK);
        self.apply(origin, &mut resp);
        if self.enabled {
            if let Some(age) = self.max_age {
                resp.set_header("Access-Control-Max-Age", age.to_string());
            }
        }
        resp
    }
}

fn validate_origin_format(origin: &str) -> Result<(), CorsConfigError> {
    let invalid = || CorsConfigError::InvalidOriginFormat {
        origin: origin.to_string(),
    };
    let parsed = url::Url::parse(origin).map_err(|_| invalid())?;
    let path_ok = parsed.path().is_empty() || parsed.path() == "/";
    if parsed.host_str().is_none() || !path_ok || parsed.query().is_some() {
        return Err(invalid());
    }
    Ok(())
}
