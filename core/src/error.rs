//! Error taxonomy for the admission engine.
//!
//! Every mutating operation returns `Result<_, AdmissionError>`. Errors are
//! grouped into a small set of [`ErrorKind`]s that the HTTP layer maps onto
//! status codes. None of them is retryable: conflicts are definitive
//! business outcomes.

use crate::types::{BookingId, Money, PassClassId, PaymentId, PaymentStatus, TicketCode};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Coarse classification of an [`AdmissionError`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Referenced entity does not exist
    NotFound,
    /// Definitive business conflict
    Conflict,
    /// Caller supplied invalid input for the current state
    Invalid,
    /// Administrative gate denied the call
    Unauthorized,
    /// Ledger invariant broken; the transaction was rolled back
    Internal,
}

/// Errors returned by the admission engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    /// Unknown booking id
    #[error("booking {0} not found")]
    BookingNotFound(BookingId),

    /// Unknown payment id
    #[error("payment {0} not found")]
    PaymentNotFound(PaymentId),

    /// Unknown ticket code or booking without ticket
    #[error("ticket {0} not found")]
    TicketNotFound(String),

    /// Unknown pass class
    #[error("pass class '{0}' not found")]
    PassClassNotFound(PassClassId),

    /// Payment was already approved or rejected
    #[error("payment {payment_id} already decided ({status})")]
    AlreadyDecided {
        /// Payment that was decided
        payment_id: PaymentId,
        /// Terminal status it holds
        status: PaymentStatus,
    },

    /// No seat left in the pass class
    #[error("pass class '{0}' is sold out")]
    SoldOut(PassClassId),

    /// Declared price differs from the catalog price
    #[error("declared price {declared} does not match current price {current}")]
    PriceMismatch {
        /// Price the caller saw
        declared: Money,
        /// Current catalog price
        current: Money,
    },

    /// Ticket was already scanned
    #[error("ticket {code} already scanned at {scanned_at}")]
    AlreadyScanned {
        /// Ticket code
        code: TicketCode,
        /// Time of the first accepted scan
        scanned_at: DateTime<Utc>,
    },

    /// Booking is paid or cancelled and accepts no more payments
    #[error("booking {0} is closed")]
    BookingClosed(BookingId),

    /// Amount is zero
    #[error("amount must be positive")]
    InvalidAmount,

    /// Sender reference is blank
    #[error("sender phone is required")]
    InvalidSender,

    /// Amount is larger than what is still owed
    #[error("amount {amount} exceeds remaining balance {remaining}")]
    ExceedsBalance {
        /// Amount submitted or approved
        amount: Money,
        /// Amount still owed
        remaining: Money,
    },

    /// Ticket requested before the total is covered
    #[error("booking not fully paid ({paid} of {total})")]
    NotFullyPaid {
        /// Confirmed amount
        paid: Money,
        /// Total owed
        total: Money,
    },

    /// Scanned payload failed verification
    #[error("ticket payload rejected: {0}")]
    ForgedPayload(String),

    /// Ticket was voided
    #[error("ticket {0} has been voided")]
    TicketVoided(TicketCode),

    /// Identity cannot change once a ticket has sealed the holder name
    #[error("identity is locked by issued ticket {0}")]
    IdentityLocked(TicketCode),

    /// Capacity below the number of seats already sold
    #[error("capacity {requested} is below the {sold} seats already sold")]
    InvalidCapacity {
        /// Requested capacity
        requested: u32,
        /// Seats already sold
        sold: u32,
    },

    /// Status change not allowed by the transition table
    #[error("booking cannot move from {from} to {to}")]
    InvalidTransition {
        /// Current status
        from: crate::types::BookingStatus,
        /// Requested status
        to: crate::types::BookingStatus,
    },

    /// Administrative gate denied the call
    #[error("operation requires administrator authorization")]
    Unauthorized,

    /// Ledger invariant broken
    #[error("ledger invariant violated: {0}")]
    InvariantViolation(String),
}

impl AdmissionError {
    /// Returns the coarse classification
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::BookingNotFound(_)
            | Self::PaymentNotFound(_)
            | Self::TicketNotFound(_)
            | Self::PassClassNotFound(_) => ErrorKind::NotFound,
            Self::AlreadyDecided { .. }
            | Self::SoldOut(_)
            | Self::PriceMismatch { .. }
            | Self::AlreadyScanned { .. }
            | Self::BookingClosed(_)
            | Self::IdentityLocked(_) => ErrorKind::Conflict,
            Self::InvalidAmount
            | Self::InvalidSender
            | Self::ExceedsBalance { .. }
            | Self::NotFullyPaid { .. }
            | Self::ForgedPayload(_)
            | Self::TicketVoided(_)
            | Self::InvalidCapacity { .. }
            | Self::InvalidTransition { .. } => ErrorKind::Invalid,
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::InvariantViolation(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::BookingNotFound(_) => "BOOKING_NOT_FOUND",
            Self::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            Self::TicketNotFound(_) => "TICKET_NOT_FOUND",
            Self::PassClassNotFound(_) => "PASS_CLASS_NOT_FOUND",
            Self::AlreadyDecided { .. } => "ALREADY_DECIDED",
            Self::SoldOut(_) => "SOLD_OUT",
            Self::PriceMismatch { .. } => "PRICE_MISMATCH",
            Self::AlreadyScanned { .. } => "ALREADY_SCANNED",
            Self::BookingClosed(_) => "BOOKING_CLOSED",
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::InvalidSender => "INVALID_SENDER",
            Self::ExceedsBalance { .. } => "EXCEEDS_BALANCE",
            Self::NotFullyPaid { .. } => "NOT_FULLY_PAID",
            Self::ForgedPayload(_) => "FORGED_PAYLOAD",
            Self::TicketVoided(_) => "TICKET_VOIDED",
            Self::IdentityLocked(_) => "IDENTITY_LOCKED",
            Self::InvalidCapacity { .. } => "INVALID_CAPACITY",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvariantViolation(_) => "INVARIANT_VIOLATION",
        }
    }

    /// Always `false`; the engine never asks callers to retry
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        false
    }

    /// Shorthand for an arithmetic overflow inside the ledger
    #[must_use]
    pub fn overflow(context: &str) -> Self {
        Self::InvariantViolation(format!("amount overflow while {context}"))
    }
}

/// Result alias used throughout the ledger
pub type AdmissionResult<T> = Result<T, AdmissionError>;
