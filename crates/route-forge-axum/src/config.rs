use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for route generation and the HTTP surface.
///
/// Deserialized from the `[server]` table of the CLI configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Path prefix prepended to every generated route (default: none).
    #[serde(default)]
    pub route_prefix: String,

    /// How long a non-GET route waits for its request body (default: "10s").
    #[serde(default = "default_request_timeout", with = "humantime_duration")]
    pub request_timeout: Duration,

    /// Upper bound for multipart upload bodies, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    #[serde(default)]
    pub csrf: CsrfSettings,

    /// Directory used by the CLI's local file storage.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Per-client request budget. Unlimited when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limiting: Option<RateLimitSettings>,

    /// Serve a fixed `GET /ROBOTS.txt` that only admits Googlebot.
    #[serde(default)]
    pub robots: bool,
}

/// `requests` per `period`, refilled evenly. Bursts of up to `requests` are
/// allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub requests: NonZeroU32,
    #[serde(default = "default_rate_period", with = "humantime_duration")]
    pub period: Duration,
}

/// Anti-forgery settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrfSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Signing secret. A random one is generated at startup when absent,
    /// which invalidates crumbs across restarts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_rate_period() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_max_upload_bytes() -> usize {
    210_000_000
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            route_prefix: String::new(),
            request_timeout: default_request_timeout(),
            max_upload_bytes: default_max_upload_bytes(),
            csrf: CsrfSettings::default(),
            upload_dir: default_upload_dir(),
            rate_limiting: None,
            robots: false,
        }
    }
}

impl ServerSettings {
    /// The route prefix with a leading slash and no trailing slash; empty
    /// when no prefix is configured.
    pub fn normalized_prefix(&self) -> String {
        let trimmed = self.route_prefix.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        }
    }
}

mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&humantime::format_duration(*d).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_correct() {
        let settings = ServerSettings::default();
        assert_eq!(settings.route_prefix, "");
        assert_eq!(settings.request_timeout, Duration::from_secs(10));
        assert_eq!(settings.max_upload_bytes, 210_000_000);
        assert!(!settings.csrf.enabled);
        assert_eq!(settings.upload_dir, PathBuf::from("uploads"));
        assert!(settings.rate_limiting.is_none());
        assert!(!settings.robots);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let settings: ServerSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, ServerSettings::default());
    }

    #[test]
    fn humantime_timeout_parses() {
        let settings: ServerSettings =
            serde_json::from_str(r#"{"request_timeout": "1m 30s", "csrf": {"enabled": true}}"#)
                .unwrap();
        assert_eq!(settings.request_timeout, Duration::from_secs(90));
        assert!(settings.csrf.enabled);
        assert!(settings.csrf.secret.is_none());

        let bad = serde_json::from_str::<ServerSettings>(r#"{"request_timeout": "soon"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn serde_roundtrip_preserves_all_fields() {
        let settings = ServerSettings {
            route_prefix: "/api".into(),
            request_timeout: Duration::from_millis(2500),
            max_upload_bytes: 1024,
            csrf: CsrfSettings {
                enabled: true,
                secret: Some("s3cret".into()),
            },
            upload_dir: PathBuf::from("/var/uploads"),
            rate_limiting: Some(RateLimitSettings {
                requests: NonZeroU32::new(50).unwrap(),
                period: Duration::from_secs(60),
            }),
            robots: true,
        };
        let json = serde_json::to_string(&settings).unwrap();
        let back: ServerSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn rate_limiting_parses_with_default_period() {
        let settings: ServerSettings =
            serde_json::from_str(r#"{"rate_limiting": {"requests": 300}}"#).unwrap();
        let limits = settings.rate_limiting.unwrap();
        assert_eq!(limits.requests.get(), 300);
        assert_eq!(limits.period, Duration::from_secs(3600));

        let zero = serde_json::from_str::<ServerSettings>(r#"{"rate_limiting": {"requests": 0}}"#);
        assert!(zero.is_err());
    }

    #[test]
    fn prefix_normalization() {
        let mut settings = ServerSettings::default();
        assert_eq!(settings.normalized_prefix(), "");
        settings.route_prefix = "api/v1/".into();
        assert_eq!(settings.normalized_prefix(), "/api/v1");
        settings.route_prefix = "/".into();
        assert_eq!(settings.normalized_prefix(), "");
    }
}
