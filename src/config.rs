use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Where uploaded images end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageDriver {
    Local,
    S3,
    Memory,
}

impl StorageDriver {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "local" | "public" => Ok(Self::Local),
            "s3" | "minio" => Ok(Self::S3),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("unknown STORAGE_DRIVER {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub driver: StorageDriver,
    /// Root directory of the public disk (local driver only).
    pub root: PathBuf,
    /// Base URL under which stored files are publicly reachable.
    pub public_url: String,
    pub s3: Option<S3Config>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// `None` runs the API on the in-process store.
    pub database_url: Option<String>,
    pub app_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let app_url = env_or("APP_URL", "http://localhost:8080")
            .trim_end_matches('/')
            .to_string();

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: env_or("JWT_ISSUER", "wanderlist"),
            audience: env_or("JWT_AUDIENCE", "wanderlist-users"),
            ttl_minutes: env_parse("JWT_TTL", 60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL", 60 * 24 * 14),
        };

        let driver = StorageDriver::parse(&env_or("STORAGE_DRIVER", "local"))?;
        let s3 = match driver {
            StorageDriver::S3 => Some(S3Config {
                endpoint: std::env::var("S3_ENDPOINT").context("S3_ENDPOINT must be set")?,
                bucket: std::env::var("S3_BUCKET").context("S3_BUCKET must be set")?,
                access_key: std::env::var("S3_ACCESS_KEY").context("S3_ACCESS_KEY must be set")?,
                secret_key: std::env::var("S3_SECRET_KEY").context("S3_SECRET_KEY must be set")?,
                region: env_or("S3_REGION", "us-east-1"),
            }),
            _ => None,
        };
        let storage = StorageConfig {
            driver,
            root: PathBuf::from(env_or("STORAGE_ROOT", "storage/app/public")),
            public_url: std::env::var("STORAGE_PUBLIC_URL")
                .unwrap_or_else(|_| format!("{app_url}/storage"))
                .trim_end_matches('/')
                .to_string(),
            s3,
        };

        Ok(Self {
            database_url,
            host: env_or("APP_HOST", "0.0.0.0"),
            port: env_parse("APP_PORT", 8080),
            app_url,
            jwt,
            storage,
        })
    }

    /// Configuration used by `AppState::fake` and the HTTP tests.
    pub fn for_tests() -> Self {
        let app_url = "http://localhost:8080".to_string();
        Self {
            database_url: None,
            host: "127.0.0.1".into(),
            port: 0,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 60,
                refresh_ttl_minutes: 60 * 24 * 14,
            },
            storage: StorageConfig {
                driver: StorageDriver::Memory,
                root: PathBuf::from("storage/app/public"),
                public_url: format!("{app_url}/storage"),
                s3: None,
            },
            app_url,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_driver_aliases() {
        assert_eq!(StorageDriver::parse("public").unwrap(), StorageDriver::Local);
        assert_eq!(StorageDriver::parse(" S3 ").unwrap(), StorageDriver::S3);
        assert_eq!(StorageDriver::parse("minio").unwrap(), StorageDriver::S3);
        assert!(StorageDriver::parse("ftp").is_err());
    }

    #[test]
    fn test_config_uses_memory_backends() {
        let cfg = AppConfig::for_tests();
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.storage.driver, StorageDriver::Memory);
        assert_eq!(cfg.storage.public_url, "http://localhost:8080/storage");
    }
}
