//! Message template engine.
//!
//! Substitutes placeholder tokens (`$PUBLIC_KEY`, `$CURRENT_DATE`,
//! `$EXPIRES_IN_<H><M><S>`, `$ACCESS_CODE`) in a template body. Every token
//! is computed from a single captured "now" instant, so the signing date and
//! the derived expiry are mutually consistent within one render call.
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::base58;
use crate::error::{Error, Result};

/// Template shipped with the crate, used when no local file exists yet.
pub const DEFAULT_TEMPLATE: &str = include_str!("../../template.txt");

/// Default expiry window when a template carries no `$EXPIRES_IN_` token.
pub const DEFAULT_EXPIRES_IN: ExpiresIn = ExpiresIn {
    hours: 0,
    minutes: 5,
    seconds: 33,
};

static EXPIRES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$EXPIRES_IN_([0-9]+H)?([0-9]+M)?([0-9]+S)?").unwrap());

/// A loaded template body plus whether it asks for an access code.
#[derive(Debug, Clone)]
pub struct Template {
    pub body: String,
    pub access_code_requested: bool,
}

impl Template {
    pub fn new(body: impl Into<String>) -> Self {
        let body = body.into();
        let access_code_requested = body.contains("$ACCESS_CODE");
        Self {
            body,
            access_code_requested,
        }
    }
}

/// Where template text comes from.
pub trait TemplateSource {
    fn load(&self) -> Result<Template>;
}

/// The embedded default template.
pub struct BuiltinSource;

impl TemplateSource for BuiltinSource {
    fn load(&self) -> Result<Template> {
        Ok(Template::new(DEFAULT_TEMPLATE))
    }
}

/// A template read from a file. A missing file is a recoverable "not found"
/// condition; any other read error propagates.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TemplateSource for FileSource {
    fn load(&self) -> Result<Template> {
        if !self.path.exists() {
            return Err(Error::NotFound(format!(
                "Template file {}",
                self.path.display()
            )));
        }
        let body = std::fs::read_to_string(&self.path)?;
        Ok(Template::new(body))
    }
}

/// Parsed `$EXPIRES_IN_` components. When the token is present, absent
/// components contribute zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiresIn {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl ExpiresIn {
    pub fn millis(&self) -> i64 {
        self.hours as i64 * 3_600_000 + self.minutes as i64 * 60_000 + self.seconds as i64 * 1_000
    }
}

impl fmt::Display for ExpiresIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}H{}M{}S", self.hours, self.minutes, self.seconds)
    }
}

/// The access code binds the public key, the signing instant and the expiry
/// instant. The textual form is stable and parseable for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCode {
    pub public_key: String,
    pub signed_at_ms: i64,
    pub expires_at_ms: i64,
}

impl fmt::Display for AccessCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}?signed={}&expires={}",
            self.public_key, self.signed_at_ms, self.expires_at_ms
        )
    }
}

impl FromStr for AccessCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || Error::Template(format!("Malformed access code '{s}'"));
        let (public_key, rest) = s.split_once('?').ok_or_else(malformed)?;
        let (signed, expires) = rest.split_once('&').ok_or_else(malformed)?;
        let signed_at_ms = signed
            .strip_prefix("signed=")
            .and_then(|v| v.parse().ok())
            .ok_or_else(malformed)?;
        let expires_at_ms = expires
            .strip_prefix("expires=")
            .and_then(|v| v.parse().ok())
            .ok_or_else(malformed)?;
        Ok(Self {
            public_key: public_key.to_string(),
            signed_at_ms,
            expires_at_ms,
        })
    }
}

/// Everything extracted while rendering.
#[derive(Debug, Clone)]
pub struct Variables {
    pub public_key: String,
    pub current_date: String,
    pub expiration_date: String,
    pub expiration_ms: i64,
    pub expires_in: ExpiresIn,
    pub access_code: Option<AccessCode>,
}

/// A rendered template: substituted content, the extracted variables, and
/// the untouched template body.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub content: String,
    pub variables: Variables,
    pub template: String,
}

fn parse_expires(body: &str) -> ExpiresIn {
    let Some(captures) = EXPIRES_RE.captures(body) else {
        return DEFAULT_EXPIRES_IN;
    };
    let component = |index: usize, suffix: char| -> u32 {
        captures
            .get(index)
            .and_then(|m| m.as_str().trim_end_matches(suffix).parse().ok())
            .unwrap_or(0)
    };
    ExpiresIn {
        hours: component(1, 'H'),
        minutes: component(2, 'M'),
        seconds: component(3, 'S'),
    }
}

/// Substitute all tokens in `template` for the given public key at `now`.
///
/// Pure function of its arguments: no clock reads, no filesystem access.
pub fn render(template: &Template, public_key: &str, now: DateTime<Utc>) -> Rendered {
    let expires_in = parse_expires(&template.body);
    let expiration_ms = expires_in.millis();
    let expiration = now + Duration::milliseconds(expiration_ms);

    let current_date = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let expiration_date = expiration.to_rfc3339_opts(SecondsFormat::Millis, true);

    let access_code = template.access_code_requested.then(|| AccessCode {
        public_key: public_key.to_string(),
        signed_at_ms: now.timestamp_millis(),
        expires_at_ms: expiration.timestamp_millis(),
    });

    debug!(%expires_in, "rendering template");

    let mut content = template
        .body
        .replace("$PUBLIC_KEY", public_key)
        .replace("$CURRENT_DATE", &current_date);
    content = EXPIRES_RE
        .replace_all(&content, expiration_date.as_str())
        .into_owned();
    if let Some(code) = &access_code {
        content = content.replace("$ACCESS_CODE", &code.to_string());
    }

    Rendered {
        content,
        variables: Variables {
            public_key: public_key.to_string(),
            current_date,
            expiration_date,
            expiration_ms,
            expires_in,
            access_code,
        },
        template: template.body.clone(),
    }
}

/// Compose the envelope access token: Base58 of the access code with the
/// Base58 signature embedded.
pub fn compose_access_token(code: &AccessCode, signature: &[u8]) -> String {
    let inner = format!("{code}|{}", base58::encode(signature));
    base58::encode(inner.as_bytes())
}

/// Split an access token back into its access code and signature bytes.
pub fn decompose_access_token(token: &str) -> Result<(AccessCode, Vec<u8>)> {
    let raw = base58::decode(token.trim())?;
    let text = String::from_utf8(raw)
        .map_err(|_| Error::Template("Access token is not UTF-8".into()))?;
    let (code, signature) = text
        .rsplit_once('|')
        .ok_or_else(|| Error::Template("Access token missing signature part".into()))?;
    Ok((code.parse()?, base58::decode(signature)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const PUBKEY: &str = "6d5f8kQbSBsWKDrUF7xM4FM9tLKBGKbyjoVbPPrFxHyQ";

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn test_default_expiry_is_5m33s() {
        let template = Template::new("no expiry token here");
        let now = at(1_700_000_000_000);
        let rendered = render(&template, PUBKEY, now);

        assert_eq!(rendered.variables.expires_in, DEFAULT_EXPIRES_IN);
        assert_eq!(rendered.variables.expiration_ms, 5 * 60_000 + 33_000);
        let expected = now + Duration::milliseconds(333_000);
        assert_eq!(
            rendered.variables.expiration_date,
            expected.to_rfc3339_opts(SecondsFormat::Millis, true)
        );
    }

    #[test]
    fn test_expiry_token_parsing() {
        let template = Template::new("Expires: $EXPIRES_IN_2H30M");
        let rendered = render(&template, PUBKEY, at(0));
        assert_eq!(
            rendered.variables.expiration_ms,
            2 * 3_600_000 + 30 * 60_000
        );

        let seconds_only = render(&Template::new("$EXPIRES_IN_45S"), PUBKEY, at(0));
        assert_eq!(seconds_only.variables.expiration_ms, 45_000);

        let full = render(&Template::new("$EXPIRES_IN_1H2M3S"), PUBKEY, at(0));
        assert_eq!(
            full.variables.expiration_ms,
            3_600_000 + 2 * 60_000 + 3_000
        );
    }

    #[test]
    fn test_all_tokens_substituted() {
        let template = Template::new(
            "key=$PUBLIC_KEY date=$CURRENT_DATE exp=$EXPIRES_IN_1M exp2=$EXPIRES_IN_1M",
        );
        let now = at(1_700_000_000_000);
        let rendered = render(&template, PUBKEY, now);

        assert!(!rendered.content.contains('$'));
        assert!(rendered.content.contains(PUBKEY));
        assert!(rendered
            .content
            .contains(&rendered.variables.current_date));
        // Every occurrence of the expiry token is replaced.
        assert_eq!(
            rendered
                .content
                .matches(&rendered.variables.expiration_date)
                .count(),
            2
        );
    }

    #[test]
    fn test_dates_share_one_instant() {
        let template = Template::new("$CURRENT_DATE / $EXPIRES_IN_1H");
        let now = at(1_699_999_999_123);
        let rendered = render(&template, PUBKEY, now);

        let current = DateTime::parse_from_rfc3339(&rendered.variables.current_date).unwrap();
        let expiry = DateTime::parse_from_rfc3339(&rendered.variables.expiration_date).unwrap();
        assert_eq!(
            expiry.timestamp_millis() - current.timestamp_millis(),
            3_600_000
        );
    }

    #[test]
    fn test_access_code_only_when_requested() {
        let without = render(&Template::new("plain"), PUBKEY, at(0));
        assert!(without.variables.access_code.is_none());

        let with = render(&Template::new("Code: $ACCESS_CODE"), PUBKEY, at(1_000));
        let code = with.variables.access_code.unwrap();
        assert_eq!(code.public_key, PUBKEY);
        assert_eq!(code.signed_at_ms, 1_000);
        assert_eq!(code.expires_at_ms, 1_000 + 333_000);
        assert!(with.content.contains(&code.to_string()));
    }

    #[test]
    fn test_access_code_display_parse_roundtrip() {
        let code = AccessCode {
            public_key: PUBKEY.to_string(),
            signed_at_ms: 1_700_000_000_000,
            expires_at_ms: 1_700_000_333_000,
        };
        let parsed: AccessCode = code.to_string().parse().unwrap();
        assert_eq!(parsed, code);

        assert!("garbage".parse::<AccessCode>().is_err());
    }

    #[test]
    fn test_access_token_roundtrip() {
        let code = AccessCode {
            public_key: PUBKEY.to_string(),
            signed_at_ms: 42,
            expires_at_ms: 375_042,
        };
        let signature = [7u8; 64];

        let token = compose_access_token(&code, &signature);
        let (recovered, sig) = decompose_access_token(&token).unwrap();
        assert_eq!(recovered, code);
        assert_eq!(sig, signature);
    }

    #[test]
    fn test_builtin_template_requests_access_code() {
        let template = BuiltinSource.load().unwrap();
        assert!(template.access_code_requested);
        assert!(template.body.contains("$PUBLIC_KEY"));
    }

    #[test]
    fn test_file_source_missing_is_not_found() {
        let source = FileSource::new("/definitely/not/here/attesta.txt");
        assert!(matches!(source.load(), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_file_source_reads_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attesta.txt");
        std::fs::write(&path, "hello $PUBLIC_KEY").unwrap();

        let template = FileSource::new(&path).load().unwrap();
        assert_eq!(template.body, "hello $PUBLIC_KEY");
        assert!(!template.access_code_requested);
    }
}
