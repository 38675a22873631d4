use std::path::PathBuf;

pub const DEFAULT_LOCAL_API_BASE_URL: &str = "http://localhost:5328/api";
const CREDENTIAL_DIR: &str = "passgate-chat";
const CREDENTIAL_FILE_NAME: &str = "credentials.json";

/// Deploy-time configuration, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `API_BASE_URL`: overrides all endpoint resolution when set.
    pub api_base_url: Option<String>,
    /// `LOCAL_API_BASE_URL`: used only on a loopback origin without `API_BASE_URL`.
    pub local_api_base_url: String,
    /// `APP_ORIGIN`: origin of the hosting front-end, if any.
    pub app_origin: Option<String>,
    /// `CREDENTIAL_FILE`: where the access code is persisted. `None` keeps it in memory.
    pub credential_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            local_api_base_url: DEFAULT_LOCAL_API_BASE_URL.to_string(),
            app_origin: None,
            credential_file: default_credential_file(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            api_base_url: get("API_BASE_URL"),
            local_api_base_url: get("LOCAL_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LOCAL_API_BASE_URL.to_string()),
            app_origin: get("APP_ORIGIN"),
            credential_file: get("CREDENTIAL_FILE")
                .map(PathBuf::from)
                .or_else(default_credential_file),
        }
    }
}

fn default_credential_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CREDENTIAL_DIR).join(CREDENTIAL_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = AppConfig::from_lookup(lookup(&[]));
        assert_eq!(config.api_base_url, None);
        assert_eq!(config.local_api_base_url, DEFAULT_LOCAL_API_BASE_URL);
        assert_eq!(config.app_origin, None);
    }

    #[test]
    fn empty_values_are_treated_as_unset() {
        let config = AppConfig::from_lookup(lookup(&[
            ("API_BASE_URL", "   "),
            ("LOCAL_API_BASE_URL", ""),
        ]));
        assert_eq!(config.api_base_url, None);
        assert_eq!(config.local_api_base_url, DEFAULT_LOCAL_API_BASE_URL);
    }

    #[test]
    fn explicit_values_win() {
        let config = AppConfig::from_lookup(lookup(&[
            ("API_BASE_URL", "https://api.example.com/"),
            ("LOCAL_API_BASE_URL", "http://127.0.0.1:9000/api"),
            ("APP_ORIGIN", "http://localhost:3000"),
            ("CREDENTIAL_FILE", "/tmp/creds.json"),
        ]));
        assert_eq!(config.api_base_url.as_deref(), Some("https://api.example.com/"));
        assert_eq!(config.local_api_base_url, "http://127.0.0.1:9000/api");
        assert_eq!(config.app_origin.as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.credential_file, Some(PathBuf::from("/tmp/creds.json")));
    }
}
