//! Domain types for the booking ledger.
//!
//! Identifiers, value objects and the entity records owned by the ledger.
//! Every entity is plain owned data so a whole [`Ledger`](crate::ledger::Ledger)
//! can be cloned into a draft, mutated, and committed atomically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a booking
    BookingId
);
uuid_id!(
    /// Unique identifier for a payment attempt
    PaymentId
);
uuid_id!(
    /// Unique identifier for an issued ticket
    TicketId
);
uuid_id!(
    /// Reference to the buyer account that owns a booking
    BuyerId
);

/// Catalog identifier of a pass class (`seoul-entry`, `neon-vibe`, ...)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PassClassId(String);

impl PassClassId {
    /// Identifier of the entry-level pass.
    pub const SEOUL_ENTRY: &'static str = "seoul-entry";
    /// Identifier of the premium pass.
    pub const NEON_VIBE: &'static str = "neon-vibe";

    /// Creates a pass class identifier from its slug
    #[must_use]
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    /// Returns the slug
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PassClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PassClassId {
    fn from(slug: &str) -> Self {
        Self::new(slug)
    }
}

/// Printable ticket code, `SAH-<unix-millis>-<9 uppercase alphanumerics>`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketCode(String);

impl TicketCode {
    /// Prefix shared by every ticket code.
    pub const PREFIX: &'static str = "SAH";

    /// Wraps a code string without checking its shape
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Builds a code from an issue timestamp and a random suffix
    #[must_use]
    pub fn compose(issued_at: DateTime<Utc>, suffix: &str) -> Self {
        Self(format!(
            "{}-{}-{}",
            Self::PREFIX,
            issued_at.timestamp_millis(),
            suffix.to_ascii_uppercase()
        ))
    }

    /// Returns the code text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the code has the `SAH-<digits>-<alphanumerics>` shape
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let mut parts = self.0.splitn(3, '-');
        let (Some(prefix), Some(millis), Some(suffix)) = (parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        prefix == Self::PREFIX
            && !millis.is_empty()
            && millis.chars().all(|c| c.is_ascii_digit())
            && !suffix.is_empty()
            && suffix
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    }
}

impl fmt::Display for TicketCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Value Objects
// ============================================================================

/// Amount of money in whole currency units (XOF has no minor unit).
///
/// Arithmetic is checked; callers decide what an overflow means.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Creates an amount from whole units
    #[must_use]
    pub const fn new(units: u64) -> Self {
        Self(units)
    }

    /// Returns the amount in whole units
    #[must_use]
    pub const fn units(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }

    /// Subtracts with underflow checking
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(diff) => Some(Self(diff)),
            None => None,
        }
    }

    /// Subtracts, clamping at zero
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Number of whole `unit` increments contained in this amount.
    ///
    /// A zero unit yields zero.
    #[must_use]
    pub const fn whole_units_of(&self, unit: Self) -> u64 {
        match self.0.checked_div(unit.0) {
            Some(count) => count,
            None => 0,
        }
    }

    /// Sums amounts, returning `None` on overflow
    pub fn checked_sum<I: IntoIterator<Item = Self>>(amounts: I) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, amount| acc.checked_add(amount))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} F", self.0)
    }
}

/// Seat capacity of a pass class
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capacity(u32);

impl Capacity {
    /// Creates a capacity
    #[must_use]
    pub const fn new(seats: u32) -> Self {
        Self(seats)
    }

    /// Returns the number of seats
    #[must_use]
    pub const fn seats(&self) -> u32 {
        self.0
    }
}

/// Mobile-money operator the buyer paid through
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentChannel {
    /// MTN Mobile Money
    Mtn,
    /// Celtiis Cash
    Celtiis,
}

impl PaymentChannel {
    /// Wire name of the channel
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mtn => "mtn",
            Self::Celtiis => "celtiis",
        }
    }
}

impl fmt::Display for PaymentChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mtn" => Ok(Self::Mtn),
            "celtiis" => Ok(Self::Celtiis),
            other => Err(format!("unknown payment channel '{other}'")),
        }
    }
}

// ============================================================================
// Statuses
// ============================================================================

/// Stored lifecycle status of a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// Created, no confirmed money yet
    Pending,
    /// At least one confirmed installment, total not yet covered
    Tontine,
    /// Fully paid and ticketed
    Paid,
    /// Cancelled by an administrator
    Cancelled,
}

impl BookingStatus {
    /// The single transition table for booking statuses.
    ///
    /// Self-transitions of non-terminal states are allowed (a failed payment or
    /// an additional partial installment leaves the status where it is).
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (
                Self::Pending,
                Self::Pending | Self::Tontine | Self::Paid | Self::Cancelled
            ) | (Self::Tontine, Self::Tontine | Self::Paid | Self::Cancelled)
        )
    }

    /// Paid and Cancelled accept no further transitions
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }

    /// Whether a booking in this status counts as a sold seat
    #[must_use]
    pub const fn consumes_inventory(self) -> bool {
        matches!(self, Self::Tontine | Self::Paid)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "PENDING",
            Self::Tontine => "TONTINE",
            Self::Paid => "PAID",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(label)
    }
}

/// Buyer-facing phase of a booking, derived on read.
///
/// `PendingPayment` is never stored: it overlays `Pending` or `Tontine`
/// while a submitted payment awaits an operator decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingPhase {
    /// No confirmed money, nothing awaiting review
    Pending,
    /// A payment proof awaits the operator
    PendingPayment,
    /// Partially paid
    Tontine,
    /// Fully paid and ticketed
    Paid,
    /// Cancelled
    Cancelled,
}

impl BookingPhase {
    /// Derives the phase from the stored status and the pending-payment condition
    #[must_use]
    pub const fn derive(status: BookingStatus, has_pending_payment: bool) -> Self {
        match status {
            BookingStatus::Pending | BookingStatus::Tontine if has_pending_payment => {
                Self::PendingPayment
            }
            BookingStatus::Pending => Self::Pending,
            BookingStatus::Tontine => Self::Tontine,
            BookingStatus::Paid => Self::Paid,
            BookingStatus::Cancelled => Self::Cancelled,
        }
    }
}

/// Status of a payment attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Awaiting operator decision
    Pending,
    /// Approved; counts toward the booking total
    Success,
    /// Rejected
    Failed,
}

impl PaymentStatus {
    /// Whether the operator already decided this payment
    #[must_use]
    pub const fn is_decided(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "PENDING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        };
        f.write_str(label)
    }
}

/// Progress status of an installment plan
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TontineStatus {
    /// Some of the total remains unpaid
    InProgress,
    /// The total is covered
    Complete,
}

// ============================================================================
// Entities
// ============================================================================

/// Catalog entry for a class of passes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassClass {
    /// Catalog identifier
    pub id: PassClassId,
    /// Display name
    pub name: String,
    /// Current price for new bookings
    pub unit_price: Money,
    /// Total number of seats
    pub capacity: Capacity,
}

impl PassClass {
    /// Creates a catalog entry
    #[must_use]
    pub fn new(
        id: impl Into<PassClassId>,
        name: impl Into<String>,
        unit_price: Money,
        capacity: Capacity,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_price,
            capacity,
        }
    }

    /// The default two-class catalog
    #[must_use]
    pub fn default_catalog() -> Vec<Self> {
        vec![
            Self::new(
                PassClassId::SEOUL_ENTRY,
                "Seoul Entry Pass",
                Money::new(7_000),
                Capacity::new(100),
            ),
            Self::new(
                PassClassId::NEON_VIBE,
                "Neon Vibe Pass",
                Money::new(10_000),
                Capacity::new(50),
            ),
        ]
    }
}

impl From<String> for PassClassId {
    fn from(slug: String) -> Self {
        Self(slug)
    }
}

/// One buyer's reservation for one pass
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Booking identifier
    pub id: BookingId,
    /// Buyer account
    pub buyer: BuyerId,
    /// Pass class reserved
    pub pass_class: PassClassId,
    /// Catalog price at creation time
    pub unit_price: Money,
    /// Amount owed; fixed at creation
    pub total_amount: Money,
    /// Stored lifecycle status
    pub status: BookingStatus,
    /// When the booking was created
    pub created_at: DateTime<Utc>,
    /// When the status last changed
    pub updated_at: DateTime<Utc>,
}

/// One attempted transfer toward a booking
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Payment identifier
    pub id: PaymentId,
    /// Owning booking
    pub booking_id: BookingId,
    /// Declared amount
    pub amount: Money,
    /// Operator the money was sent through
    pub channel: PaymentChannel,
    /// Sender phone number
    pub sender_ref: String,
    /// Decision status
    pub status: PaymentStatus,
    /// Operator note attached on rejection
    pub note: Option<String>,
    /// Submission time
    pub created_at: DateTime<Utc>,
    /// Confirmation time, set on approval
    pub paid_at: Option<DateTime<Utc>>,
}

/// Installment progress for a booking, cached from confirmed payments
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tontine {
    /// Owning booking
    pub booking_id: BookingId,
    /// Increments needed to cover the total
    pub total_boxes: u64,
    /// Increments covered by confirmed payments
    pub paid_boxes: u64,
    /// Sum of confirmed payments
    pub amount_paid: Money,
    /// Amount still owed
    pub remaining_amount: Money,
    /// Progress status
    pub status: TontineStatus,
    /// Last recomputation time
    pub updated_at: DateTime<Utc>,
}

/// Admission credential for a fully-paid booking
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Ticket identifier
    pub id: TicketId,
    /// Owning booking
    pub booking_id: BookingId,
    /// Printable code
    pub code: TicketCode,
    /// Sealed verification payload rendered into the QR code
    pub payload: String,
    /// Cleared when the ticket is voided
    pub is_valid: bool,
    /// Reason recorded when voided
    pub void_reason: Option<String>,
    /// Set at most once, on the first accepted scan
    pub scanned_at: Option<DateTime<Utc>>,
    /// Issue time
    pub issued_at: DateTime<Utc>,
}

/// Generated display identity attached to a booking
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerIdentity {
    /// Name in native script
    pub native_script: String,
    /// Romanized display name
    pub display_name: String,
    /// Pronunciation guide
    pub pronunciation: String,
    /// Meaning of the name
    pub meaning: String,
}
