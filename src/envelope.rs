//! Certified-message envelope: the marker-delimited text artifact combining
//! a public key, a message, and optionally a signature and access token.
//!
//! Section order is fixed: PUBLIC KEY, MESSAGE, SIGNATURE (optional),
//! ACCESS TOKEN (optional). Binary fields are Base58-encoded before
//! embedding. Parsing is marker-delimited scanning; a missing or unmatched
//! section yields `None`, never a panic.
use crate::base58;
use crate::error::{Error, Result};

const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";
const MESSAGE_LABEL: &str = "MESSAGE";
const SIGNATURE_LABEL: &str = "SIGNATURE";
const ACCESS_TOKEN_LABEL: &str = "ACCESS TOKEN";

/// A complete certified message ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub public_key: Vec<u8>,
    pub message: String,
    pub signature: Option<Vec<u8>>,
    pub access_token: Option<String>,
}

fn section(label: &str, body: &str) -> String {
    format!("\n----- START {label} -----\n{body}\n----- END {label} -----\n")
}

impl Envelope {
    /// Render the envelope to its flat text form.
    pub fn format(&self) -> String {
        let mut out = String::new();
        out.push_str(&section(
            PUBLIC_KEY_LABEL,
            &base58::encode(&self.public_key),
        ));
        out.push_str(&section(MESSAGE_LABEL, &self.message));
        if let Some(signature) = &self.signature {
            out.push_str(&section(SIGNATURE_LABEL, &base58::encode(signature)));
        }
        if let Some(token) = &self.access_token {
            out.push_str(&section(ACCESS_TOKEN_LABEL, token));
        }
        out
    }
}

/// Fields recovered from a text blob. Each is `None` when its section is
/// missing, its markers are unmatched, or a binary field fails to decode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parsed {
    pub public_key: Option<Vec<u8>>,
    pub message: Option<String>,
    pub signature: Option<Vec<u8>>,
    pub access_token: Option<String>,
}

impl Parsed {
    /// Promote to an [`Envelope`]; the required sections (public key and
    /// message) must have been recovered.
    pub fn into_envelope(self) -> Result<Envelope> {
        let public_key = self
            .public_key
            .ok_or_else(|| Error::Envelope("Missing PUBLIC KEY section".into()))?;
        let message = self
            .message
            .ok_or_else(|| Error::Envelope("Missing MESSAGE section".into()))?;
        Ok(Envelope {
            public_key,
            message,
            signature: self.signature,
            access_token: self.access_token,
        })
    }
}

fn extract(text: &str, label: &str) -> Option<String> {
    let start_marker = format!("----- START {label} -----\n");
    let end_marker = format!("\n----- END {label} -----");
    let body_start = text.find(&start_marker)? + start_marker.len();
    let body_len = text[body_start..].find(&end_marker)?;
    Some(text[body_start..body_start + body_len].to_string())
}

/// Scan a text blob for envelope sections.
pub fn parse(text: &str) -> Parsed {
    Parsed {
        public_key: extract(text, PUBLIC_KEY_LABEL)
            .and_then(|body| base58::decode(body.trim()).ok()),
        message: extract(text, MESSAGE_LABEL),
        signature: extract(text, SIGNATURE_LABEL)
            .and_then(|body| base58::decode(body.trim()).ok()),
        access_token: extract(text, ACCESS_TOKEN_LABEL).map(|body| body.trim().to_string()),
    }
}
