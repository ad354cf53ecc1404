use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;

const DEFAULT_EMAIL_FROM: &str = "Practice <noreply@example.com>";

// Service configuration sourced from environment variables, optionally
// overridden by a YAML file named in PRACTICE_CONFIG.
#[derive(Debug, Clone)]
pub struct PracticeConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    /// Path prefix every route is mounted under, e.g. `/make-server-139d10cf`.
    /// Empty means the root.
    pub route_prefix: String,
    pub admin_emails: Vec<String>,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    pub identity: IdentityConfig,
    pub email: EmailConfig,
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityBackend {
    Local,
    #[serde(rename = "gotrue")]
    GoTrue,
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub backend: IdentityBackend,
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub service_key: Option<String>,
    /// HS256 secret for the local backend. A random per-process secret is
    /// used when unset, so tokens do not survive a restart.
    pub local_token_secret: Option<String>,
    pub local_token_ttl_secs: u64,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Resend API key. Without it every notification is dropped.
    pub api_key: Option<String>,
    pub from: String,
    pub api_url: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub enabled: bool,
    /// When set, bootstrap routes require a matching `X-Bootstrap-Token`.
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PracticeConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    route_prefix: Option<String>,
    admin_emails: Option<Vec<String>>,
    storage_backend: Option<StorageBackend>,
    database_url: Option<String>,
    database_max_connections: Option<u32>,
    identity_backend: Option<IdentityBackend>,
    identity_url: Option<String>,
    email_from: Option<String>,
    email_api_url: Option<String>,
    bootstrap_enabled: Option<bool>,
}

impl PracticeConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self::from_lookup(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let bind_addr = var("PRACTICE_BIND")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .with_context(|| "parse PRACTICE_BIND")?;
        let metrics_bind = var("PRACTICE_METRICS_BIND")
            .unwrap_or_else(|| "0.0.0.0:9090".to_string())
            .parse()
            .with_context(|| "parse PRACTICE_METRICS_BIND")?;
        let route_prefix = normalize_prefix(&var("PRACTICE_ROUTE_PREFIX").unwrap_or_default());
        let admin_emails = var("PRACTICE_ADMIN_EMAILS")
            .map(|value| split_list(&value))
            .unwrap_or_default();

        let storage = match var("PRACTICE_STORAGE_BACKEND").as_deref() {
            None | Some("memory") => StorageBackend::Memory,
            Some("postgres") => StorageBackend::Postgres,
            Some(other) => bail!("PRACTICE_STORAGE_BACKEND must be memory or postgres, got {other}"),
        };
        let postgres = match var("PRACTICE_DATABASE_URL") {
            Some(url) => Some(PostgresConfig {
                url,
                max_connections: parse_or(&var, "PRACTICE_DATABASE_MAX_CONNECTIONS", 10)?,
                acquire_timeout_ms: parse_or(&var, "PRACTICE_DATABASE_ACQUIRE_TIMEOUT_MS", 5_000)?,
            }),
            None => None,
        };

        let backend = match var("PRACTICE_IDENTITY_BACKEND").as_deref() {
            None | Some("local") => IdentityBackend::Local,
            Some("gotrue") => IdentityBackend::GoTrue,
            Some(other) => bail!("PRACTICE_IDENTITY_BACKEND must be local or gotrue, got {other}"),
        };
        let identity = IdentityConfig {
            backend,
            url: var("PRACTICE_IDENTITY_URL"),
            anon_key: var("PRACTICE_IDENTITY_ANON_KEY"),
            service_key: var("PRACTICE_IDENTITY_SERVICE_KEY"),
            local_token_secret: var("PRACTICE_LOCAL_TOKEN_SECRET"),
            local_token_ttl_secs: parse_or(&var, "PRACTICE_LOCAL_TOKEN_TTL_SECS", 3_600)?,
            request_timeout_ms: parse_or(&var, "PRACTICE_IDENTITY_TIMEOUT_MS", 10_000)?,
        };

        let email = EmailConfig {
            api_key: var("RESEND_API_KEY"),
            from: var("EMAIL_FROM").unwrap_or_else(|| DEFAULT_EMAIL_FROM.to_string()),
            api_url: var("PRACTICE_EMAIL_API_URL")
                .unwrap_or_else(|| crate::notify::resend::DEFAULT_API_URL.to_string()),
            request_timeout_ms: parse_or(&var, "PRACTICE_EMAIL_TIMEOUT_MS", 10_000)?,
        };

        let bootstrap = BootstrapConfig {
            enabled: match var("PRACTICE_BOOTSTRAP_ENABLED") {
                Some(value) => parse_bool(&value)
                    .with_context(|| "parse PRACTICE_BOOTSTRAP_ENABLED")?,
                None => true,
            },
            token: var("PRACTICE_BOOTSTRAP_TOKEN"),
        };

        Ok(Self {
            bind_addr,
            metrics_bind,
            route_prefix,
            admin_emails,
            storage,
            postgres,
            identity,
            email,
            bootstrap,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_lookup(|name| std::env::var(name).ok())?;
        if let Ok(path) = std::env::var("PRACTICE_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read PRACTICE_CONFIG: {path}"))?;
            config.apply_yaml(&contents)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn apply_yaml(&mut self, contents: &str) -> Result<()> {
        let override_cfg: PracticeConfigOverride =
            serde_yaml::from_str(contents).with_context(|| "parse practice config yaml")?;
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.route_prefix {
            self.route_prefix = normalize_prefix(&value);
        }
        if let Some(value) = override_cfg.admin_emails {
            self.admin_emails = value
                .into_iter()
                .map(|email| email.trim().to_string())
                .filter(|email| !email.is_empty())
                .collect();
        }
        if let Some(value) = override_cfg.storage_backend {
            self.storage = value;
        }
        if let Some(url) = override_cfg.database_url {
            let postgres = self.postgres.get_or_insert_with(|| PostgresConfig {
                url: String::new(),
                max_connections: 10,
                acquire_timeout_ms: 5_000,
            });
            postgres.url = url;
        }
        if let (Some(max), Some(postgres)) =
            (override_cfg.database_max_connections, self.postgres.as_mut())
        {
            postgres.max_connections = max;
        }
        if let Some(value) = override_cfg.identity_backend {
            self.identity.backend = value;
        }
        if let Some(value) = override_cfg.identity_url {
            self.identity.url = Some(value);
        }
        if let Some(value) = override_cfg.email_from {
            self.email.from = value;
        }
        if let Some(value) = override_cfg.email_api_url {
            self.email.api_url = value;
        }
        if let Some(value) = override_cfg.bootstrap_enabled {
            self.bootstrap.enabled = value;
        }
        Ok(())
    }

    /// Reject combinations that cannot start.
    pub fn validate(&self) -> Result<()> {
        if self.storage == StorageBackend::Postgres && self.postgres.is_none() {
            bail!("PRACTICE_DATABASE_URL is required when the storage backend is postgres");
        }
        if self.identity.backend == IdentityBackend::GoTrue {
            for (name, value) in [
                ("PRACTICE_IDENTITY_URL", &self.identity.url),
                ("PRACTICE_IDENTITY_ANON_KEY", &self.identity.anon_key),
                ("PRACTICE_IDENTITY_SERVICE_KEY", &self.identity.service_key),
            ] {
                if value.is_none() {
                    bail!("{name} is required when the identity backend is gotrue");
                }
            }
        }
        Ok(())
    }
}

fn parse_or<F, T>(var: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(name) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("parse {name}")),
        None => Ok(default),
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got {other}"),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_prefix(value: &str) -> String {
    let trimmed = value.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = PracticeConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().expect("addr"));
        assert_eq!(config.metrics_bind, "0.0.0.0:9090".parse().expect("addr"));
        assert_eq!(config.route_prefix, "");
        assert!(config.admin_emails.is_empty());
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.identity.backend, IdentityBackend::Local);
        assert_eq!(config.email.from, DEFAULT_EMAIL_FROM);
        assert!(config.email.api_key.is_none());
        assert!(config.bootstrap.enabled);
        config.validate().expect("valid");
    }

    #[test]
    fn parses_lists_prefixes_and_backends() {
        let config = PracticeConfig::from_lookup(lookup(&[
            ("PRACTICE_ROUTE_PREFIX", "make-server-139d10cf/"),
            ("PRACTICE_ADMIN_EMAILS", " a@x.com, ,b@x.com "),
            ("PRACTICE_STORAGE_BACKEND", "postgres"),
            ("PRACTICE_DATABASE_URL", "postgres://localhost/practice"),
            ("PRACTICE_DATABASE_MAX_CONNECTIONS", "4"),
            ("PRACTICE_BOOTSTRAP_ENABLED", "false"),
        ]))
        .expect("config");
        assert_eq!(config.route_prefix, "/make-server-139d10cf");
        assert_eq!(config.admin_emails, vec!["a@x.com", "b@x.com"]);
        assert_eq!(config.storage, StorageBackend::Postgres);
        let postgres = config.postgres.as_ref().expect("postgres");
        assert_eq!(postgres.max_connections, 4);
        assert_eq!(postgres.acquire_timeout_ms, 5_000);
        assert!(!config.bootstrap.enabled);
        config.validate().expect("valid");
    }

    #[test]
    fn rejects_unknown_backends_and_missing_requirements() {
        assert!(
            PracticeConfig::from_lookup(lookup(&[("PRACTICE_STORAGE_BACKEND", "redis")])).is_err()
        );
        assert!(PracticeConfig::from_lookup(lookup(&[("PRACTICE_BIND", "nope")])).is_err());

        let postgres_without_url =
            PracticeConfig::from_lookup(lookup(&[("PRACTICE_STORAGE_BACKEND", "postgres")]))
                .expect("parsed");
        assert!(postgres_without_url.validate().is_err());

        let gotrue_without_keys = PracticeConfig::from_lookup(lookup(&[
            ("PRACTICE_IDENTITY_BACKEND", "gotrue"),
            ("PRACTICE_IDENTITY_URL", "https://project.supabase.co"),
        ]))
        .expect("parsed");
        let err = gotrue_without_keys.validate().expect_err("invalid");
        assert!(err.to_string().contains("PRACTICE_IDENTITY_ANON_KEY"));
    }

    #[test]
    fn yaml_overrides_env_values() {
        let mut config = PracticeConfig::from_lookup(lookup(&[])).expect("config");
        config
            .apply_yaml(
                "bind_addr: 127.0.0.1:3000\nroute_prefix: /api\nadmin_emails:\n  - admin@example.com\nstorage_backend: postgres\ndatabase_url: postgres://db/practice\nbootstrap_enabled: false\n",
            )
            .expect("yaml");
        assert_eq!(config.bind_addr, "127.0.0.1:3000".parse().expect("addr"));
        assert_eq!(config.route_prefix, "/api");
        assert_eq!(config.admin_emails, vec!["admin@example.com"]);
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(
            config.postgres.as_ref().map(|pg| pg.url.as_str()),
            Some("postgres://db/practice")
        );
        assert!(!config.bootstrap.enabled);
        assert!(config.apply_yaml("bind_addr: [").is_err());
    }

    #[test]
    #[serial]
    fn from_env_or_yaml_reads_the_config_file() {
        let path = std::env::temp_dir().join(format!("practice-config-{}.yaml", uuid::Uuid::new_v4()));
        fs::write(&path, "metrics_bind: 127.0.0.1:9999\n").expect("write");
        unsafe {
            std::env::set_var("PRACTICE_CONFIG", &path);
            std::env::set_var("PRACTICE_ADMIN_EMAILS", "admin@example.com");
        }
        let config = PracticeConfig::from_env_or_yaml();
        unsafe {
            std::env::remove_var("PRACTICE_CONFIG");
            std::env::remove_var("PRACTICE_ADMIN_EMAILS");
        }
        let _ = fs::remove_file(&path);

        let config = config.expect("config");
        assert_eq!(config.metrics_bind, "127.0.0.1:9999".parse().expect("addr"));
        assert_eq!(config.admin_emails, vec!["admin@example.com"]);
    }
}
