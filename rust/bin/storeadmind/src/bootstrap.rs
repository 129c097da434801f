//! Startup checks and admin credential helpers.

use std::path::Path;

use tracing::info;

use crate::config::ServerConfig;

/// Refuse to start on a configuration that cannot authenticate anyone or
/// has nowhere to store data.
pub fn verify_config(config: &ServerConfig) -> anyhow::Result<()> {
    if config.admin.password_hash.is_empty() {
        anyhow::bail!(
            "No admin password hash found in configuration.\n\
             Run `storeadmind hash-password <password>` and set admin.password_hash \
             or ADMIN_PASSWORD_HASH."
        );
    }
    if config.admin.username.trim().is_empty() {
        anyhow::bail!("Admin username is empty in configuration.");
    }
    if config.jwt.secret.is_empty() {
        anyhow::bail!("JWT secret is empty in configuration.");
    }
    if config.storage.data_dir.is_empty() {
        anyhow::bail!("Storage data_dir is empty in configuration.");
    }
    for service in &config.matching.services {
        if service.endpoint.trim().is_empty() {
            anyhow::bail!("Item service {} has no endpoint.", service.name);
        }
    }
    Ok(())
}

/// Hash a password as an argon2id PHC string.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    use argon2::Argon2;
    use password_hash::rand_core::OsRng;
    use password_hash::{PasswordHasher, SaltString};

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {}", e))?
        .to_string();
    Ok(hash)
}

/// Check a login attempt against the stored argon2id hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::Argon2;
    use password_hash::{PasswordHash, PasswordVerifier};

    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Random 256-bit hex secret for signing tokens.
pub fn generate_jwt_secret() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..32).map(|_| format!("{:02x}", rng.gen::<u8>())).collect()
}

/// Write a fresh server config with a hashed admin password and a random
/// JWT secret. Refuses to overwrite an existing file.
pub fn write_initial_config(
    path: &Path,
    username: &str,
    password: &str,
    data_dir: &str,
) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    let password_hash = hash_password(password)?;
    let jwt_secret = generate_jwt_secret();
    let content = format!(
        r#"[admin]
username = "{username}"
password_hash = "{password_hash}"

[jwt]
secret = "{jwt_secret}"
expire_secs = 86400

[storage]
data_dir = "{data_dir}"
public_url = "http://localhost:8080/assets"
image_bucket = "product-images"

[matching]
timeout_secs = 30
"#
    );
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    std::fs::create_dir_all(data_dir)?;
    info!("Wrote server configuration to {}", path.display());
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{AdminConfig, JwtConfig, MatchingConfig, OutboxSection, StorageConfig};

    pub(crate) fn config(password_hash: &str) -> ServerConfig {
        ServerConfig {
            admin: AdminConfig {
                username: "admin".to_string(),
                password_hash: password_hash.to_string(),
            },
            jwt: JwtConfig {
                secret: "test-secret".to_string(),
                expire_secs: 3600,
            },
            storage: StorageConfig {
                data_dir: "/tmp".to_string(),
                public_url: "http://localhost:8080/assets".to_string(),
                image_bucket: "product-images".to_string(),
            },
            matching: MatchingConfig::default(),
            outbox: OutboxSection::default(),
        }
    }

    #[test]
    fn verify_config_rejects_missing_credentials() {
        assert!(verify_config(&config("")).is_err());

        let mut c = config("hash");
        c.jwt.secret.clear();
        assert!(verify_config(&c).is_err());

        let mut c = config("hash");
        c.storage.data_dir.clear();
        assert!(verify_config(&c).is_err());

        assert!(verify_config(&config("hash")).is_ok());
    }

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn invalid_hash_never_verifies() {
        assert!(!verify_password("test", "not-a-hash"));
    }

    #[test]
    fn secrets_are_random_hex() {
        let a = generate_jwt_secret();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, generate_jwt_secret());
    }

    #[test]
    fn initial_config_loads_and_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etc/dev.toml");
        let data = dir.path().join("data");
        write_initial_config(&path, "admin", "pw", data.to_str().unwrap()).unwrap();

        let loaded: ServerConfig = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        verify_config(&loaded).unwrap();
        assert!(verify_password("pw", &loaded.admin.password_hash));
        assert!(data.is_dir());

        assert!(write_initial_config(&path, "admin", "pw", data.to_str().unwrap()).is_err());
    }
}
