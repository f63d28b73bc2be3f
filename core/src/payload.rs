//! Sealed verification payload carried by a ticket's QR code.
//!
//! Format: `<base64url(json)>.<base64url(hmac_sha256(secret, body))>`. The body
//! is readable by anyone; the tag binds it to the deployment secret so a
//! scanner can reject forged or edited codes before touching the ledger.
//!
//! The payload is frozen when the ticket is minted. Later ledger changes are
//! never re-sealed into an issued code.

use crate::types::{BookingId, PassClassId, TicketCode};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Data bound into a ticket's QR code
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPayload {
    /// Ticket code
    pub code: TicketCode,
    /// Holder display name, when an identity was generated
    pub holder: Option<String>,
    /// Pass class
    pub pass_class: PassClassId,
    /// Owning booking
    pub booking_id: BookingId,
}

/// Errors opening or sealing a payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// Not two dot-separated base64url segments
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// Tag does not match the body
    #[error("payload tag mismatch")]
    Tampered,

    /// The secret cannot key the MAC
    #[error("invalid sealing key: {0}")]
    Key(String),

    /// JSON (de)serialization failed
    #[error("payload encoding failed: {0}")]
    Encoding(String),
}

/// Seals and opens [`TicketPayload`]s with a deployment secret
#[derive(Clone)]
pub struct PayloadSealer {
    secret: Vec<u8>,
}

impl PayloadSealer {
    /// Creates a sealer keyed with `secret`
    #[must_use]
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    /// Serializes and seals a payload
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Encoding`] if JSON serialization fails.
    pub fn seal(&self, payload: &TicketPayload) -> Result<String, PayloadError> {
        let json =
            serde_json::to_vec(payload).map_err(|e| PayloadError::Encoding(e.to_string()))?;
        let body = URL_SAFE_NO_PAD.encode(json);
        let tag = URL_SAFE_NO_PAD.encode(self.mac(&body)?.finalize().into_bytes());
        Ok(format!("{body}.{tag}"))
    }

    /// Verifies the tag and decodes the payload
    ///
    /// # Errors
    ///
    /// - [`PayloadError::Malformed`] if the text is not `<body>.<tag>` base64url
    /// - [`PayloadError::Tampered`] if the tag does not match
    /// - [`PayloadError::Encoding`] if the body is not a payload document
    pub fn open(&self, sealed: &str) -> Result<TicketPayload, PayloadError> {
        let (body, tag) = sealed
            .trim()
            .split_once('.')
            .ok_or_else(|| PayloadError::Malformed("missing tag segment".to_string()))?;

        let presented = URL_SAFE_NO_PAD
            .decode(tag)
            .map_err(|e| PayloadError::Malformed(e.to_string()))?;

        self.mac(body)?
            .verify_slice(&presented)
            .map_err(|_| PayloadError::Tampered)?;

        let json = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|e| PayloadError::Malformed(e.to_string()))?;
        serde_json::from_slice(&json).map_err(|e| PayloadError::Encoding(e.to_string()))
    }

    fn mac(&self, body: &str) -> Result<HmacSha256, PayloadError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| PayloadError::Key(e.to_string()))?;
        mac.update(body.as_bytes());
        Ok(mac)
    }
}

impl fmt::Debug for PayloadSealer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadSealer")
            .field("secret", &"<redacted>")
            .finish()
    }
}
