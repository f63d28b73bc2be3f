//! Identity generation seam.
//!
//! The admission controller asks an [`IdentityProvider`] for a display
//! identity and upserts the result onto the booking. Providers run outside
//! any ledger lock.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use soulpass_core::AdmissionError;
use soulpass_core::types::BuyerIdentity;
use thiserror::Error;

/// Hints passed to the provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRequest {
    /// Buyer's stated gender, free text
    pub gender: Option<String>,
    /// Mood the name should evoke, free text
    pub mood: Option<String>,
}

/// Errors from identity generation
#[derive(Error, Debug)]
pub enum IdentityError {
    /// No provider is configured
    #[error("identity generation is not configured")]
    Unavailable,

    /// The provider call failed
    #[error("identity provider failed: {0}")]
    Provider(String),

    /// The provider answered with something that is not an identity
    #[error("identity provider returned an unusable answer: {0}")]
    Malformed(String),

    /// The ledger refused the upsert
    #[error(transparent)]
    Ledger(#[from] AdmissionError),
}

/// Source of generated identities.
///
/// Returns a boxed future so the trait stays dyn-compatible.
pub trait IdentityProvider: Send + Sync {
    /// Generates an identity for the given hints
    fn generate<'a>(
        &'a self,
        request: &'a IdentityRequest,
    ) -> BoxFuture<'a, Result<BuyerIdentity, IdentityError>>;
}
