//! Server configuration: `/etc/storeadmin/<name>.toml` plus environment
//! overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use storeadmin_catalog::outbox::OutboxConfig;

/// Directory bare context names resolve against.
pub const CONFIG_DIR: &str = "/etc/storeadmin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub admin: AdminConfig,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub outbox: OutboxSection,
}

/// The single staff account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_username")]
    pub username: String,
    /// argon2id PHC string.
    #[serde(default)]
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_expire_secs")]
    pub expire_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Base URL assets are published under.
    #[serde(default = "default_public_url")]
    pub public_url: String,
    #[serde(default = "default_image_bucket")]
    pub image_bucket: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub services: Vec<ItemServiceConfig>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            services: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemServiceConfig {
    pub name: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboxSection {
    pub poll_interval_secs: u64,
    pub batch_size: u32,
    pub max_attempts: u32,
    pub backoff_base_secs: i64,
    pub backoff_max_secs: i64,
    pub stale_after_secs: i64,
}

impl Default for OutboxSection {
    fn default() -> Self {
        let d = OutboxConfig::default();
        Self {
            poll_interval_secs: d.poll_interval.as_secs(),
            batch_size: d.batch_size,
            max_attempts: d.max_attempts,
            backoff_base_secs: d.backoff_base_secs,
            backoff_max_secs: d.backoff_max_secs,
            stale_after_secs: d.stale_after_secs,
        }
    }
}

impl OutboxSection {
    pub fn to_config(&self) -> OutboxConfig {
        OutboxConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            batch_size: self.batch_size.max(1),
            max_attempts: self.max_attempts.max(1),
            backoff_base_secs: self.backoff_base_secs,
            backoff_max_secs: self.backoff_max_secs,
            stale_after_secs: self.stale_after_secs,
        }
    }
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_expire_secs() -> u64 {
    86400
}

fn default_public_url() -> String {
    "http://localhost:8080/assets".to_string()
}

fn default_image_bucket() -> String {
    "product-images".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Environment variables that add or replace an item service endpoint.
const SERVICE_ENV: &[(&str, &str)] = &[
    ("similarity", "SIMILARITY_MODEL_URL"),
    ("compatibility", "COMPATIBILITY_MODEL_URL"),
    ("outfit", "OUTFIT_MODEL_URL"),
];

impl ServerConfig {
    /// A bare name maps to `/etc/storeadmin/<name>.toml`; anything with a
    /// `/` or `.` is taken as a path.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            Path::new(CONFIG_DIR).join(format!("{}.toml", name_or_path))
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
        let mut config: ServerConfig = toml::from_str(&content)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from `lookup` (the process environment in production).
    /// Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("ADMIN_USERNAME") {
            self.admin.username = v;
        }
        if let Some(v) = get("ADMIN_PASSWORD_HASH") {
            self.admin.password_hash = v;
        }
        if let Some(v) = get("JWT_SECRET") {
            self.jwt.secret = v;
        }
        for (name, key) in SERVICE_ENV {
            if let Some(endpoint) = get(key) {
                self.set_service(name, &endpoint);
            }
        }
    }

    fn set_service(&mut self, name: &str, endpoint: &str) {
        match self.matching.services.iter_mut().find(|s| s.name == name) {
            Some(existing) => existing.endpoint = endpoint.to_string(),
            None => self.matching.services.push(ItemServiceConfig {
                name: name.to_string(),
                endpoint: endpoint.to_string(),
            }),
        }
    }

    pub fn matching_timeout(&self) -> Duration {
        Duration::from_secs(self.matching.timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const MINIMAL: &str = r#"
[admin]
password_hash = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"

[jwt]
secret = "s3cret"

[storage]
data_dir = "/var/lib/storeadmin"
"#;

    #[test]
    fn resolve_bare_name_and_path() {
        assert_eq!(
            ServerConfig::resolve_path("prod"),
            PathBuf::from("/etc/storeadmin/prod.toml")
        );
        assert_eq!(
            ServerConfig::resolve_path("./local.toml"),
            PathBuf::from("./local.toml")
        );
    }

    #[test]
    fn defaults_fill_optional_sections() {
        let config: ServerConfig = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.admin.username, "admin");
        assert_eq!(config.jwt.expire_secs, 86400);
        assert_eq!(config.storage.image_bucket, "product-images");
        assert_eq!(config.matching.timeout_secs, 30);
        assert!(config.matching.services.is_empty());

        let outbox = config.outbox.to_config();
        assert_eq!(outbox.batch_size, 20);
        assert_eq!(outbox.max_attempts, 8);
        assert_eq!(outbox.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn full_file_parses() {
        let text = format!(
            "{MINIMAL}
[matching]
timeout_secs = 10

[[matching.services]]
name = \"similarity\"
endpoint = \"http://sim:8000\"

[outbox]
max_attempts = 3
"
        );
        let config: ServerConfig = toml::from_str(&text).unwrap();
        assert_eq!(config.matching_timeout(), Duration::from_secs(10));
        assert_eq!(config.matching.services[0].endpoint, "http://sim:8000");
        assert_eq!(config.outbox.max_attempts, 3);
        assert_eq!(config.outbox.batch_size, 20);
    }

    #[test]
    fn environment_overrides() {
        let mut config: ServerConfig = toml::from_str(
            &format!("{MINIMAL}\n[[matching.services]]\nname = \"similarity\"\nendpoint = \"http://old\"\n"),
        )
        .unwrap();
        let env: HashMap<&str, &str> = [
            ("ADMIN_USERNAME", "boss"),
            ("JWT_SECRET", "from-env"),
            ("ADMIN_PASSWORD_HASH", "  "),
            ("SIMILARITY_MODEL_URL", "http://sim"),
            ("OUTFIT_MODEL_URL", "http://outfit"),
        ]
        .into_iter()
        .collect();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.admin.username, "boss");
        assert_eq!(config.jwt.secret, "from-env");
        // Blank values do not clobber the file.
        assert!(config.admin.password_hash.starts_with("$argon2id$"));
        assert_eq!(
            config.matching.services,
            vec![
                ItemServiceConfig {
                    name: "similarity".into(),
                    endpoint: "http://sim".into()
                },
                ItemServiceConfig {
                    name: "outfit".into(),
                    endpoint: "http://outfit".into()
                },
            ]
        );
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.toml");
        std::fs::write(&path, MINIMAL).unwrap();
        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.storage.data_dir, "/var/lib/storeadmin");
        assert!(ServerConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
