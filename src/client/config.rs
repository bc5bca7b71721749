//! Elasticsearch connection settings

use super::Auth;
use eyre::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use url::Url;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 9200;

/// Connection settings, as found in the `elastic` section of a configuration file
///
/// Every field is optional. [`ElasticConfig::with_env_overrides`] lets the environment
/// (`ELASTIC_HOST`, `ELASTIC_USER`, `ELASTIC_PASSWORD`, `ELASTIC_APIKEY`, `ELASTIC_CAFILE`)
/// take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElasticConfig {
    /// Host name, or a full URL
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default, alias = "username")]
    pub user: Option<String>,
    #[serde(default, alias = "password")]
    pub pwd: Option<String>,
    #[serde(default, alias = "api_key")]
    pub apikey: Option<String>,
    /// PEM bundle of the certificate authority to trust
    #[serde(default)]
    pub cafile: Option<PathBuf>,
    /// `http` or `https` (default: `https` when `cafile` is set)
    #[serde(default)]
    pub scheme: Option<String>,
    #[serde(default, deserialize_with = "port_from_number_or_text")]
    pub port: Option<u16>,
}

impl ElasticConfig {
    /// Settings taken from the environment only
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Replace fields with the `ELASTIC_*` environment variables that are set
    pub fn with_env_overrides(mut self) -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        if let Some(host) = var("ELASTIC_HOST") {
            self.host = Some(host);
        }
        if let Some(user) = var("ELASTIC_USER") {
            self.user = Some(user);
        }
        if let Some(pwd) = var("ELASTIC_PASSWORD") {
            self.pwd = Some(pwd);
        }
        if let Some(apikey) = var("ELASTIC_APIKEY") {
            self.apikey = Some(apikey);
        }
        if let Some(cafile) = var("ELASTIC_CAFILE") {
            self.cafile = Some(PathBuf::from(cafile));
        }
        self
    }

    /// Base URL of the cluster
    ///
    /// # Errors
    /// Returns an error if the host does not make a valid URL
    pub fn url(&self) -> Result<Url> {
        let host = self.host.as_deref().unwrap_or(DEFAULT_HOST);
        let mut url = if host.contains("://") {
            Url::parse(host).with_context(|| format!("Invalid Elasticsearch host: {}", host))?
        } else {
            let scheme = self.scheme.as_deref().unwrap_or(match self.cafile {
                Some(_) => "https",
                None => "http",
            });
            let port = self.port.unwrap_or(DEFAULT_PORT);
            Url::parse(&format!("{scheme}://{host}:{port}/"))
                .with_context(|| format!("Invalid Elasticsearch host: {}", host))?
        };
        if let Some(port) = self.port
            && url.port().is_none()
        {
            url.set_port(Some(port))
                .map_err(|_| eyre::eyre!("Cannot set port on {}", url))?;
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub fn auth(&self) -> Auth {
        Auth::new(self.user.clone(), self.pwd.clone(), self.apikey.clone())
    }
}

fn port_from_number_or_text<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Option::<Port>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Port::Number(port)) => Ok(Some(port)),
        Some(Port::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid port {text:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn clear_env() {
        unsafe {
            for name in [
                "ELASTIC_HOST",
                "ELASTIC_USER",
                "ELASTIC_PASSWORD",
                "ELASTIC_APIKEY",
                "ELASTIC_CAFILE",
            ] {
                std::env::remove_var(name);
            }
        }
    }

    #[test]
    fn test_default_url() {
        let url = ElasticConfig::default().url().unwrap();
        assert_eq!(url.as_str(), "http://localhost:9200/");
    }

    #[test]
    fn test_cafile_implies_https() {
        let config: ElasticConfig = serde_json::from_value(json!({
            "host": "es.local",
            "cafile": "/etc/ca.pem",
            "port": "9243",
        }))
        .unwrap();
        assert_eq!(config.url().unwrap().as_str(), "https://es.local:9243/");
    }

    #[test]
    fn test_full_url_host() {
        let config = ElasticConfig {
            host: Some("http://proxy.local/es".to_string()),
            ..Default::default()
        };
        assert_eq!(config.url().unwrap().as_str(), "http://proxy.local/es/");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result: Result<ElasticConfig, _> = serde_json::from_value(json!({"hots": "x"}));
        assert!(result.is_err());
    }

    #[test]
    #[serial_test::serial]
    fn test_env_overrides_file() {
        clear_env();
        unsafe {
            std::env::set_var("ELASTIC_HOST", "from-env");
            std::env::set_var("ELASTIC_PASSWORD", "secret");
        }

        let config = ElasticConfig {
            host: Some("from-file".to_string()),
            user: Some("elastic".to_string()),
            ..Default::default()
        }
        .with_env_overrides();

        assert_eq!(config.host.as_deref(), Some("from-env"));
        assert_eq!(config.user.as_deref(), Some("elastic"));
        assert_eq!(config.auth().to_string(), "Basic");

        clear_env();
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_without_variables() {
        clear_env();
        let config = ElasticConfig::from_env();
        assert_eq!(config, ElasticConfig::default());
        assert_eq!(config.auth().to_string(), "None");
    }
}
