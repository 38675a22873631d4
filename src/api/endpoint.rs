use std::net::IpAddr;

use reqwest::Url;

use crate::config::{AppConfig, DEFAULT_LOCAL_API_BASE_URL};

/// Relative root used when neither a base URL nor a runtime origin is known.
const RELATIVE_API_ROOT: &str = "/api";

/// Computes absolute API URLs so the same client works against a colocated
/// API, a separately deployed one, and a local development server.
///
/// Resolution order:
/// 1. a configured base URL, joined with the path;
/// 2. with a runtime origin: the local development base on loopback hosts,
///    `<origin>/api` otherwise;
/// 3. the relative `/api` root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointResolver {
    api_base_url: Option<String>,
    local_api_base_url: String,
    origin: Option<String>,
}

impl Default for EndpointResolver {
    fn default() -> Self {
        Self {
            api_base_url: None,
            local_api_base_url: DEFAULT_LOCAL_API_BASE_URL.to_string(),
            origin: None,
        }
    }
}

impl EndpointResolver {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            api_base_url: config.api_base_url.clone().filter(|b| !b.is_empty()),
            local_api_base_url: config.local_api_base_url.clone(),
            origin: config.app_origin.clone().filter(|o| !o.is_empty()),
        }
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        let base = base.into();
        self.api_base_url = (!base.is_empty()).then_some(base);
        self
    }

    pub fn with_local_base_url(mut self, base: impl Into<String>) -> Self {
        self.local_api_base_url = base.into();
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        let origin = origin.into();
        self.origin = (!origin.is_empty()).then_some(origin);
        self
    }

    /// Resolves a logical path such as `session/abc` to the URL to call.
    pub fn resolve(&self, path: &str) -> String {
        if let Some(base) = &self.api_base_url {
            return combine_url(base, path);
        }

        if let Some(origin) = &self.origin {
            return if is_loopback_origin(origin) {
                combine_url(&self.local_api_base_url, path)
            } else {
                combine_url(&format!("{}/api", origin.trim_end_matches('/')), path)
            };
        }

        combine_url(RELATIVE_API_ROOT, path)
    }
}

/// Joins `base` and `path` with exactly one `/` between them.
pub fn combine_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// True when the origin's host is `localhost` or a loopback IP address.
fn is_loopback_origin(origin: &str) -> bool {
    let Ok(url) = Url::parse(origin) else {
        return false;
    };
    match url.host_str() {
        Some(host) if host.eq_ignore_ascii_case("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false),
        None => false,
    }
}
