pub mod digest;
pub mod error;
pub mod models;

#[cfg(test)]
pub(crate) mod fake;

use std::sync::Arc;

use reqwest::{
    header::{AUTHORIZATION, REFERER, WWW_AUTHENTICATE},
    Client, Response, StatusCode,
};
use tracing::{debug, warn};

use crate::config::{Config, DigestCredentials};

use self::{
    digest::DigestChallenge,
    error::ProjectorError,
    models::{Command, ResponseEnvelope, PROJECTOR_ERR},
};

/// Control endpoint on the projector's built-in web server.
pub const CONTROL_PATH: &str = "/cgi-bin/json_query";

/// HTTP client for the projector's JSON control endpoint.
///
/// Every call is a single request. Nothing is cached and nothing is retried.
#[derive(Debug, Clone)]
pub struct ProjectorClient {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    http: Client,
    base_url: String,
    referer: String,
    digest_auth: Option<DigestCredentials>,
}

impl ProjectorClient {
    pub fn new(config: &Config) -> Result<Self, ProjectorError> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url: config.base_url(),
                referer: config.referer.clone(),
                digest_auth: config.digest_auth.clone(),
            }),
        })
    }

    /// Path and query for `command`, e.g. `/cgi-bin/json_query?jsoncallback=PWR%20ON`.
    ///
    /// Every byte outside `A-Z a-z 0-9 - _ . ~` is escaped. That is stricter
    /// than JavaScript's `encodeURIComponent`, which leaves `! ' ( ) *` as is;
    /// property codes and values never contain those characters, so the
    /// projector receives the same bytes for them.
    pub fn command_path(command: &Command) -> String {
        format!(
            "{CONTROL_PATH}?jsoncallback={}",
            urlencoding::encode(&command.token())
        )
    }

    /// Absolute URL for `command`.
    pub fn command_url(&self, command: &Command) -> String {
        format!("{}{}", self.inner.base_url, Self::command_path(command))
    }

    /// Query a property, returning the raw reply (e.g. `"01"` for `PWR`).
    pub async fn get_property(&self, property: &str) -> Result<String, ProjectorError> {
        self.run_command(&Command::query(property)).await
    }

    /// Write a property, returning the raw reply.
    pub async fn set_property(&self, property: &str, value: &str) -> Result<String, ProjectorError> {
        self.run_command(&Command::set(property, value)).await
    }

    /// Send `command` and return the validated reply.
    pub async fn run_command(&self, command: &Command) -> Result<String, ProjectorError> {
        let path = Self::command_path(command);
        let url = self.command_url(command);
        debug!(command = %command, url = %url, "Sending projector command");

        let mut response = self.send(&url, None).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            if let Some(credentials) = &self.inner.digest_auth {
                let authorization = answer_challenge(&response, credentials, &path)?;
                response = self.send(&url, Some(authorization)).await?;
                if response.status() == StatusCode::UNAUTHORIZED {
                    warn!(command = %command, "Projector rejected digest credentials");
                    return Err(ProjectorError::Unauthorized);
                }
            }
        }

        let status = response.status();
        let bytes = response.bytes().await?;
        let reply = parse_reply(command, status, &bytes)?;

        debug!(command = %command, reply = %reply, "Projector replied");
        Ok(reply)
    }

    async fn send(&self, url: &str, authorization: Option<String>) -> Result<Response, ProjectorError> {
        let mut request = self
            .inner
            .http
            .get(url)
            .header(REFERER, &self.inner.referer);
        if let Some(authorization) = authorization {
            request = request.header(AUTHORIZATION, authorization);
        }
        Ok(request.send().await?)
    }
}

fn answer_challenge(
    response: &Response,
    credentials: &DigestCredentials,
    path: &str,
) -> Result<String, ProjectorError> {
    let challenge = response
        .headers()
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(DigestChallenge::parse)
        .ok_or_else(|| {
            warn!("Projector answered 401 without a usable digest challenge");
            ProjectorError::Unauthorized
        })?;

    Ok(digest::authorization(credentials, &challenge, "GET", path))
}

/// Validate a raw HTTP reply, in order: status, envelope shape, error flag,
/// error sentinel.
pub(crate) fn parse_reply(
    command: &Command,
    status: StatusCode,
    body: &[u8],
) -> Result<String, ProjectorError> {
    if status != StatusCode::OK {
        warn!(command = %command, status = %status, "Projector returned non-200 status");
        return Err(ProjectorError::Status(status));
    }

    let envelope = serde_json::from_slice::<ResponseEnvelope>(body).map_err(|e| {
        warn!(command = %command, error = %e, "Failed to deserialize projector response");
        ProjectorError::from(e)
    })?;
    let feature = envelope.projector.feature;

    if feature.error || feature.reply == PROJECTOR_ERR {
        warn!(command = %command, reply = %feature.reply, "Projector reported an error");
        return Err(ProjectorError::DeviceRejected {
            command: command.token(),
            reply: feature.reply,
        });
    }

    Ok(feature.reply)
}
