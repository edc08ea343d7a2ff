use std::{fmt, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};

// ---------------------------------------------------------------------------
// DigestCredentials
// ---------------------------------------------------------------------------

/// Username/password pair used to answer the projector's HTTP Digest challenge.
#[derive(Clone, PartialEq, Eq)]
pub struct DigestCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for DigestCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    /// Display name shown for the accessory.
    pub name: String,
    pub model: String,
    /// Serial number; seeds the accessory UUID.
    pub serial: String,
    pub ip_address: String,
    /// Effective `Referer` header value, always an absolute URL.
    pub referer: String,
    pub request_timeout: Duration,
    /// Reserved. Nothing polls the projector.
    pub polling_interval: Duration,
    /// `Some` when digest authentication is enabled.
    pub digest_auth: Option<DigestCredentials>,
    /// Raises the default log level to `debug` when `RUST_LOG` is unset.
    pub debug: bool,
    pub server_host: String,
    pub server_port: u16,
    /// JSON file the accessory registry is restored from and saved to.
    pub accessory_cache_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests do not have
    /// to touch the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("missing required env var: {key}"))
        };
        let optional = |key: &str, default: &str| -> String {
            lookup(key).unwrap_or_else(|| default.to_owned())
        };

        let ip_address = required("PROJECTOR_IP_ADDRESS")?;
        let referer = effective_referer(&ip_address, &required("PROJECTOR_REFERER")?);

        let use_digest_auth = parse_bool(&optional("PROJECTOR_USE_DIGEST_AUTH", "false"))
            .context("PROJECTOR_USE_DIGEST_AUTH must be a boolean")?;
        let digest_auth = if use_digest_auth {
            Some(DigestCredentials {
                username: required("PROJECTOR_DIGEST_USERNAME")?,
                password: lookup("PROJECTOR_DIGEST_PASSWORD")
                    .context("missing required env var: PROJECTOR_DIGEST_PASSWORD")?,
            })
        } else {
            None
        };

        Ok(Self {
            name: required("PROJECTOR_NAME")?,
            model: required("PROJECTOR_MODEL")?,
            serial: required("PROJECTOR_SERIAL")?,
            ip_address,
            referer,
            request_timeout: parse_millis(
                "PROJECTOR_REQUEST_TIMEOUT_MS",
                &optional("PROJECTOR_REQUEST_TIMEOUT_MS", "5000"),
            )?,
            polling_interval: parse_millis(
                "PROJECTOR_POLLING_INTERVAL_MS",
                &optional("PROJECTOR_POLLING_INTERVAL_MS", "10000"),
            )?,
            digest_auth,
            debug: parse_bool(&optional("PROJECTOR_DEBUG", "false"))
                .context("PROJECTOR_DEBUG must be a boolean")?,
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "8080")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            accessory_cache_path: lookup("ACCESSORY_CACHE_PATH")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        })
    }

    /// `http://{ip_address}` — the root every control URL hangs off.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.ip_address)
    }
}

/// The projector firmware checks the `Referer` header against its own
/// origin, so a bare path is expanded to `http://{ip_address}{path}`.
pub fn effective_referer(ip_address: &str, referer: &str) -> String {
    if referer.starts_with("http") {
        referer.to_owned()
    } else {
        format!("http://{ip_address}{referer}")
    }
}

/// A zero timeout would fail every request before it is sent.
fn parse_millis(key: &str, raw: &str) -> Result<Duration> {
    let millis: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a positive integer"))?;
    if millis == 0 {
        bail!("{key} must be a positive integer, got 0");
    }
    Ok(Duration::from_millis(millis))
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => bail!("expected a boolean, got: {other:?}"),
    }
}
