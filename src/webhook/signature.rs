//! `x-signature` verification.
//!
//! Header format: `ts=<unix-seconds>,v1=<hex hmac>`. The MAC is HMAC-SHA256 over
//! `id:<resource id>;topic:<topic>;ts:<ts>` keyed with the shared webhook secret.

use super::notification;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Hex length of an HMAC-SHA256 digest
const SIGNATURE_HEX_LEN: usize = 64;

/// Signature header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub ts: String,
    pub v1: String,
}

impl SignatureHeader {
    /// Parses comma-separated `key=value` pairs. `None` when `ts` or `v1` is missing.
    pub fn parse(header: &str) -> Option<Self> {
        let mut ts = None;
        let mut v1 = None;

        for part in header.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.trim() {
                "ts" => ts = Some(value.to_string()),
                "v1" => v1 = Some(value.to_string()),
                _ => {}
            }
        }

        Some(Self { ts: ts?, v1: v1? })
    }
}

/// Manifest string the provider signs.
pub fn manifest(resource_id: &str, topic: &str, ts: &str) -> String {
    format!("id:{};topic:{};ts:{}", resource_id, topic, ts)
}

/// Lowercase hex HMAC-SHA256 of `manifest`.
pub fn sign(manifest: &str, secret: &str) -> String {
    hex::encode(mac_for(manifest, secret).finalize().into_bytes())
}

fn mac_for(manifest: &str, secret: &str) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(manifest.as_bytes());
    mac
}

/// Verifies a notification's signature header against its body.
///
/// Never fails: malformed headers, bodies without a resource id or topic, and
/// mismatching MACs all return `false`. The digest comparison is constant-time.
pub fn validate_signature(header: &str, body: &Value, secret: &str) -> bool {
    let Some(signature) = SignatureHeader::parse(header) else {
        debug!("Signature header missing ts or v1");
        return false;
    };
    let (Some(resource_id), Some(topic)) = (notification::resource_id(body), notification::topic(body)) else {
        debug!("Cannot build signature manifest without resource id and topic");
        return false;
    };

    // The provider emits lowercase hex; anything else cannot match.
    let well_formed = signature.v1.len() == SIGNATURE_HEX_LEN
        && signature
            .v1
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if !well_formed {
        return false;
    }
    let Ok(expected) = hex::decode(&signature.v1) else {
        return false;
    };

    mac_for(&manifest(&resource_id, &topic, &signature.ts), secret)
        .verify_slice(&expected)
        .is_ok()
}
