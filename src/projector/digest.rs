//! HTTP Digest access authentication (RFC 7616) for the projector's web
//! server.
//!
//! Only the client half is implemented: parse the `WWW-Authenticate`
//! challenge from a `401` and build the matching `Authorization` header.

use md5::Md5;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::DigestCredentials;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Md5,
    Md5Sess,
    Sha256,
    Sha256Sess,
}

impl Algorithm {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "MD5" => Some(Self::Md5),
            "MD5-SESS" => Some(Self::Md5Sess),
            "SHA-256" => Some(Self::Sha256),
            "SHA-256-SESS" => Some(Self::Sha256Sess),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Md5Sess => "MD5-sess",
            Self::Sha256 => "SHA-256",
            Self::Sha256Sess => "SHA-256-sess",
        }
    }

    fn is_session(self) -> bool {
        matches!(self, Self::Md5Sess | Self::Sha256Sess)
    }

    fn hash(self, input: &str) -> String {
        match self {
            Self::Md5 | Self::Md5Sess => hex::encode(Md5::digest(input.as_bytes())),
            Self::Sha256 | Self::Sha256Sess => hex::encode(Sha256::digest(input.as_bytes())),
        }
    }
}

/// Parameters of a `WWW-Authenticate: Digest ...` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    /// `true` when the server offers `qop=auth`.
    pub qop_auth: bool,
    pub algorithm: Algorithm,
}

impl DigestChallenge {
    /// Parses a `WWW-Authenticate` header value.
    ///
    /// Returns `None` for non-digest schemes, missing `realm`/`nonce`, or an
    /// unsupported algorithm.
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let (scheme, rest) = header.split_once(char::is_whitespace)?;
        if !scheme.eq_ignore_ascii_case("digest") {
            return None;
        }

        let mut realm = None;
        let mut nonce = None;
        let mut opaque = None;
        let mut qop_auth = false;
        let mut algorithm = Algorithm::Md5;

        for (key, value) in parse_params(rest) {
            match key.to_ascii_lowercase().as_str() {
                "realm" => realm = Some(value),
                "nonce" => nonce = Some(value),
                "opaque" => opaque = Some(value),
                "qop" => qop_auth = value.split(',').any(|q| q.trim().eq_ignore_ascii_case("auth")),
                "algorithm" => algorithm = Algorithm::parse(&value)?,
                _ => {}
            }
        }

        Some(Self { realm: realm?, nonce: nonce?, opaque, qop_auth, algorithm })
    }
}

/// Splits `k1="v, 1", k2=v2` into key/value pairs, honouring quotes.
pub(crate) fn parse_params(input: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if *c == ',' || c.is_whitespace()) {
            chars.next();
        }
        let key: String = chars.by_ref().take_while(|c| *c != '=').collect();
        if key.trim().is_empty() {
            break;
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => break,
                    c => value.push(c),
                }
            }
        } else {
            while let Some(c) = chars.peek() {
                if *c == ',' {
                    break;
                }
                value.push(*c);
                chars.next();
            }
            value = value.trim().to_owned();
        }
        params.push((key.trim().to_owned(), value));
    }

    params
}

/// Deterministic inputs for a digest response, split out so tests can pin
/// the client nonce.
#[derive(Debug)]
pub(crate) struct DigestContext<'a> {
    pub credentials: &'a DigestCredentials,
    pub challenge: &'a DigestChallenge,
    pub method: &'a str,
    /// Request target as sent on the wire: path plus query string.
    pub uri: &'a str,
    pub cnonce: &'a str,
    pub nc: u32,
}

/// Builds the `Authorization` header answering `challenge`.
pub fn authorization(
    credentials: &DigestCredentials,
    challenge: &DigestChallenge,
    method: &str,
    uri: &str,
) -> String {
    let cnonce = Uuid::new_v4().simple().to_string();
    authorization_inner(&DigestContext {
        credentials,
        challenge,
        method,
        uri,
        cnonce: &cnonce,
        nc: 1,
    })
}

pub(crate) fn authorization_inner(ctx: &DigestContext<'_>) -> String {
    let DigestContext { credentials, challenge, method, uri, cnonce, nc } = ctx;
    let algorithm = challenge.algorithm;
    let nc = format!("{nc:08x}");

    // 1. HA1 = H(username:realm:password), session variants fold in the nonces.
    let mut ha1 = algorithm.hash(&format!(
        "{}:{}:{}",
        credentials.username, challenge.realm, credentials.password
    ));
    if algorithm.is_session() {
        ha1 = algorithm.hash(&format!("{ha1}:{}:{cnonce}", challenge.nonce));
    }

    // 2. HA2 = H(method:uri)
    let ha2 = algorithm.hash(&format!("{method}:{uri}"));

    // 3. response
    let response = if challenge.qop_auth {
        algorithm.hash(&format!("{ha1}:{}:{nc}:{cnonce}:auth:{ha2}", challenge.nonce))
    } else {
        algorithm.hash(&format!("{ha1}:{}:{ha2}", challenge.nonce))
    };

    // 4. Assemble.
    let mut header = format!(
        r#"Digest username="{}", realm="{}", nonce="{}", uri="{}", algorithm={}, response="{}""#,
        credentials.username,
        challenge.realm,
        challenge.nonce,
        uri,
        algorithm.as_str(),
        response,
    );
    if challenge.qop_auth {
        header.push_str(&format!(r#", qop=auth, nc={nc}, cnonce="{cnonce}""#));
    }
    if let Some(opaque) = &challenge.opaque {
        header.push_str(&format!(r#", opaque="{opaque}""#));
    }
    header
}
