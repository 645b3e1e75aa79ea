//! # Server Configuration
//!
//! [`ServerConfig`] is loaded from a YAML or TOML file; every field has a default, so an
//! empty file is a valid configuration.
//!
//! ```yaml
//! bind: ["127.0.0.1:8080", "[::1]:8080"]
//! auth:
//!   scheme: cookie
//!   name: auth
//! cors:
//!   allowed_origins: ["https://app.example.com"]
//!   allow_credentials: true
//! collision_policy: reject
//! users:
//!   - name: alice
//!     password: secret
//!     roles: [Admin]
//!     keys: [alice-key]
//! workers:
//!   num_workers: 32
//!   stack_size: 65536
//! ```
//!
//! Worker settings can be overridden from the environment with
//! [`RuntimeConfig`](crate::runtime_config::RuntimeConfig).

use crate::cors::{CorsConfig, CorsConfigError, CorsPolicy};
use crate::router::CollisionPolicy;
use crate::security::AuthScheme;
use crate::worker_pool::WorkerPoolConfig;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default listening address
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Complete server configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Addresses to listen on
    pub bind: Vec<String>,
    pub auth: AuthScheme,
    pub cors: CorsConfig,
    pub collision_policy: CollisionPolicy,
    pub workers: WorkerPoolConfig,
    /// Users seeded into the built-in credential store
    pub users: Vec<UserConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: vec![DEFAULT_BIND.to_string()],
            auth: AuthScheme::default(),
            cors: CorsConfig::default(),
            collision_policy: CollisionPolicy::default(),
            workers: WorkerPoolConfig::default(),
            users: Vec::new(),
        }
    }
}

/// One user of the built-in credential store
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct UserConfig {
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Access keys accepted by the key scheme
    #[serde(default)]
    pub keys: Vec<String>,
}

impl fmt::Debug for UserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserConfig")
            .field("name", &self.name)
            .field("roles", &self.roles)
            .field("keys", &self.keys.len())
            .finish_non_exhaustive()
    }
}

/// `NAME:PASSWORD` or `NAME:PASSWORD:ROLE,ROLE`
impl FromStr for UserConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let name = parts.next().unwrap_or_default().trim();
        let password = parts
            .next()
            .ok_or_else(|| format!("expected NAME:PASSWORD[:ROLES], got {s:?}"))?;
        if name.is_empty() {
            return Err("user name is empty".to_string());
        }
        let roles = parts
            .next()
            .map(|roles| {
                roles
                    .split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            name: name.to_string(),
            password: password.to_string(),
            roles,
            keys: Vec::new(),
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, message: String },
    /// File extension is not `.yaml`, `.yml` or `.toml`
    UnsupportedFormat { path: PathBuf },
    Cors(CorsConfigError),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "cannot read {}: {source}", path.display())
            }
            ConfigError::Parse { path, message } => {
                write!(f, "invalid configuration in {}: {message}", path.display())
            }
            ConfigError::UnsupportedFormat { path } => write!(
                f,
                "unsupported configuration format {} (expected .yaml, .yml or .toml)",
                path.display()
            ),
            ConfigError::Cors(e) => write!(f, "{e}"),
            ConfigError::Invalid(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Cors(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CorsConfigError> for ConfigError {
    fn from(e: CorsConfigError) -> Self {
        ConfigError::Cors(e)
    }
}

impl ServerConfig {
    /// Load and validate a YAML or TOML file, chosen by extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let parse: fn(&str) -> Result<Self, String> = match ext.as_deref() {
            Some("yaml" | "yml") => Self::from_yaml_str,
            Some("toml") => Self::from_toml_str,
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    path: path.to_path_buf(),
                })
            }
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = parse(&text).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, String> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| e.to_string())
    }

    pub fn from_toml_str(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind.is_empty() {
            return Err(ConfigError::Invalid("at least one bind address is required".into()));
        }
        if self.workers.num_workers == 0 {
            return Err(ConfigError::Invalid("workers.num_workers must be at least 1".into()));
        }
        self.cors_policy()?;
        Ok(())
    }

    /// CORS policy built from the `cors` section
    pub fn cors_policy(&self) -> Result<CorsPolicy, CorsConfigError> {
        CorsPolicy::from_config(&self.cors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(ServerConfig::from_yaml_str("").unwrap(), ServerConfig::default());
        assert_eq!(ServerConfig::from_toml_str("").unwrap(), ServerConfig::default());
    }

    #[test]
    fn test_yaml_sections() {
        let yaml = r#"
bind: ["0.0.0.0:9000"]
auth:
  scheme: key
collision_policy: reject
workers:
  num_workers: 4
"#;
        let config = ServerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.bind, vec!["0.0.0.0:9000"]);
        assert_eq!(config.auth, AuthScheme::key());
        assert_eq!(config.collision_policy, CollisionPolicy::Reject);
        assert_eq!(config.workers.num_workers, 4);
        assert_eq!(config.workers.stack_size, 0x10000);
        assert!(config.cors.enabled);
    }

    #[test]
    fn test_toml_sections() {
        let toml = r#"
bind = ["127.0.0.1:0"]

[auth]
scheme = "basic"
realm = "ops"

[cors]
allowed_origins = ["https://a.example.com"]
max_age = 60
"#;
        let config = ServerConfig::from_toml_str(toml).unwrap();
        assert_eq!(
            config.auth,
            AuthScheme::Basic {
                realm: "ops".into()
            }
        );
        assert_eq!(config.cors.max_age, Some(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ServerConfig::default();
        config.bind.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = ServerConfig::default();
        config.cors.allow_credentials = true;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Cors(CorsConfigError::WildcardWithCredentials))
        ));
    }

    #[test]
    fn test_users_section() {
        let yaml = r#"
users:
  - name: alice
    password: secret
    roles: [Admin, User]
    keys: [alice-key]
  - name: bob
    password: hunter2
"#;
        let config = ServerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.users.len(), 2);
        assert_eq!(config.users[0].roles, vec!["Admin", "User"]);
        assert_eq!(config.users[0].keys, vec!["alice-key"]);
        assert!(config.users[1].roles.is_empty());
        assert!(!format!("{:?}", config.users[0]).contains("secret"));
    }

    #[test]
    fn test_user_flag_syntax() {
        let user: UserConfig = "alice:secret:Admin, User".parse().unwrap();
        assert_eq!(user.name, "alice");
        assert_eq!(user.password, "secret");
        assert_eq!(user.roles, vec!["Admin", "User"]);

        let user: UserConfig = "bob:hunter2".parse().unwrap();
        assert_eq!(user.password, "hunter2");
        assert!(user.roles.is_empty());

        assert!("bob".parse::<UserConfig>().is_err());
        assert!(":pw".parse::<UserConfig>().is_err());
    }
}
