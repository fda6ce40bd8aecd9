//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The OAuth client secret is loaded from the BEXIO_CLIENT_SECRET env
//! var or `client_secret_file`, never stored in the TOML directly to
//! avoid leaking secrets.

use common::Secret;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use bexio_auth::constants::{API_V2_BASE, API_V3_BASE, AUTHORIZE_ENDPOINT, TOKEN_ENDPOINT};
use bexio_post::CurrencyMode;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub api: ApiConfig,
    pub server: ServerConfig,
}

/// OAuth client registration for the bexio identity provider
#[derive(Debug, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    pub redirect_uri: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to the
    /// BEXIO_CLIENT_SECRET env var)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
}

/// Accounting API hosts and the tenant's currency convention
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_v2_base")]
    pub v2_base: String,
    #[serde(default = "default_v3_base")]
    pub v3_base: String,
    #[serde(default)]
    pub currency_mode: CurrencyMode,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            v2_base: default_v2_base(),
            v3_base: default_v3_base(),
            currency_mode: CurrencyMode::default(),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
}

fn default_authorize_url() -> String {
    AUTHORIZE_ENDPOINT.into()
}

fn default_token_url() -> String {
    TOKEN_ENDPOINT.into()
}

fn default_v2_base() -> String {
    API_V2_BASE.into()
}

fn default_v3_base() -> String {
    API_V3_BASE.into()
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Client secret resolution order:
    /// 1. BEXIO_CLIENT_SECRET env var
    /// 2. client_secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if config.oauth.client_id.trim().is_empty() {
            return Err(common::Error::Config("client_id must not be empty".into()));
        }

        if !config.oauth.redirect_uri.starts_with("http://")
            && !config.oauth.redirect_uri.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "redirect_uri must start with http:// or https://, got: {}",
                config.oauth.redirect_uri
            )));
        }

        // Resolve client secret: env var takes precedence over file
        if let Ok(secret) = std::env::var("BEXIO_CLIENT_SECRET") {
            config.oauth.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.oauth.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.oauth.client_secret = Some(Secret::new(secret));
            }
        }

        if config.oauth.client_secret.is_none() {
            return Err(common::Error::Config(
                "no client secret: set BEXIO_CLIENT_SECRET or client_secret_file".into(),
            ));
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("entry-poster.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn valid_toml() -> &'static str {
        r#"
[oauth]
client_id = "client-123"
redirect_uri = "https://localhost:8080/callback"

[server]
listen_addr = "127.0.0.1:8080"
"#
    }

    #[test]
    fn load_valid_config_with_env_secret() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = std::env::temp_dir().join("entry-poster-test-valid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, valid_toml()).unwrap();

        unsafe { set_env("BEXIO_CLIENT_SECRET", "secret-from-env") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("BEXIO_CLIENT_SECRET") };

        assert_eq!(config.oauth.client_id, "client-123");
        assert_eq!(
            config.oauth.client_secret.as_ref().unwrap().expose(),
            "secret-from-env"
        );
        assert_eq!(config.oauth.authorize_url, AUTHORIZE_ENDPOINT);
        assert_eq!(config.api.v3_base, API_V3_BASE);
        assert_eq!(config.api.currency_mode, CurrencyMode::Code);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_secret_is_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = std::env::temp_dir().join("entry-poster-test-nosecret");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, valid_toml()).unwrap();

        unsafe { remove_env("BEXIO_CLIENT_SECRET") };
        let result = Config::load(&path);
        assert!(result.is_err(), "config without a secret must be rejected");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn secret_from_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = std::env::temp_dir().join("entry-poster-test-secretfile");
        std::fs::create_dir_all(&dir).unwrap();
        let secret_path = dir.join("client_secret");
        std::fs::write(&secret_path, "secret-from-file\n").unwrap();

        let toml_content = format!(
            r#"
[oauth]
client_id = "client-123"
redirect_uri = "https://localhost:8080/callback"
client_secret_file = "{}"

[server]
listen_addr = "127.0.0.1:8080"
"#,
            secret_path.display()
        );
        let config_path = dir.join("config.toml");
        std::fs::write(&config_path, &toml_content).unwrap();

        unsafe { remove_env("BEXIO_CLIENT_SECRET") };
        let config = Config::load(&config_path).unwrap();
        assert_eq!(
            config.oauth.client_secret.as_ref().unwrap().expose(),
            "secret-from-file"
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn env_secret_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = std::env::temp_dir().join("entry-poster-test-override");
        std::fs::create_dir_all(&dir).unwrap();
        let secret_path = dir.join("client_secret");
        std::fs::write(&secret_path, "secret-from-file").unwrap();

        let toml_content = format!(
            r#"
[oauth]
client_id = "client-123"
redirect_uri = "https://localhost:8080/callback"
client_secret_file = "{}"

[server]
listen_addr = "127.0.0.1:8080"
"#,
            secret_path.display()
        );
        let config_path = dir.join("config.toml");
        std::fs::write(&config_path, &toml_content).unwrap();

        unsafe { set_env("BEXIO_CLIENT_SECRET", "secret-from-env") };
        let config = Config::load(&config_path).unwrap();
        unsafe { remove_env("BEXIO_CLIENT_SECRET") };

        assert_eq!(
            config.oauth.client_secret.as_ref().unwrap().expose(),
            "secret-from-env"
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn invalid_redirect_uri_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = std::env::temp_dir().join("entry-poster-test-badredirect");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            r#"
[oauth]
client_id = "client-123"
redirect_uri = "localhost:8080/callback"

[server]
listen_addr = "127.0.0.1:8080"
"#,
        )
        .unwrap();

        unsafe { set_env("BEXIO_CLIENT_SECRET", "s") };
        let result = Config::load(&path);
        unsafe { remove_env("BEXIO_CLIENT_SECRET") };

        assert!(result.is_err());
        let err = format!("{}", result.unwrap_err());
        assert!(
            err.contains("redirect_uri must start with http"),
            "error message should explain the issue, got: {err}"
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn currency_mode_and_hosts_are_overridable() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = std::env::temp_dir().join("entry-poster-test-apimode");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            r#"
[oauth]
client_id = "client-123"
redirect_uri = "https://localhost:8080/callback"

[api]
v3_base = "https://sandbox.bexio.test/3.0"
currency_mode = "id"

[server]
listen_addr = "127.0.0.1:8080"
"#,
        )
        .unwrap();

        unsafe { set_env("BEXIO_CLIENT_SECRET", "s") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("BEXIO_CLIENT_SECRET") };

        assert_eq!(config.api.v3_base, "https://sandbox.bexio.test/3.0");
        assert_eq!(config.api.v2_base, API_V2_BASE);
        assert_eq!(config.api.currency_mode, CurrencyMode::Id);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn load_missing_file_errors() {
        let result = Config::load(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn resolve_path_cli_overrides_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/should-lose.toml") };
        let path = Config::resolve_path(Some("/cli/wins.toml"));
        unsafe { remove_env("CONFIG_PATH") };
        assert_eq!(path, PathBuf::from("/cli/wins.toml"));
    }

    #[test]
    fn resolve_path_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONFIG_PATH") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("entry-poster.toml"));
    }
}
