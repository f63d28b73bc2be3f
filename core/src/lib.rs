//! # SoulPass Core
//!
//! Booking ledger and admission rules for limited-inventory event passes.
//!
//! This crate is the functional core of the admission engine. It holds no
//! locks and performs no I/O: every operation is a reducer that validates a
//! command against the [`Ledger`](ledger::Ledger), applies the resulting
//! events in place, and returns them so the runtime can journal them.
//!
//! ## Core Concepts
//!
//! - **Ledger**: the single state value (catalog, bookings, payments, tontines, tickets)
//! - **Action**: commands and events of one aggregate
//! - **Reducer**: `(Ledger, Action, Environment) → Result<Events, AdmissionError>`
//! - **Environment**: injected clock, ticket code generator, policy and payload sealer
//!
//! ## Aggregates
//!
//! - [`aggregates::inventory`]: pass class capacity and price, availability queries
//! - [`aggregates::booking`]: the booking state machine and admission check
//! - [`aggregates::payment`]: payment submission and the operator decision
//! - [`aggregates::tontine`]: installment progress recomputed from confirmed payments
//! - [`aggregates::ticket`]: issuance, validation and voiding of tickets
//!
//! ## Example
//!
//! ```ignore
//! use soulpass_core::aggregates::booking::{BookingAction, BookingReducer};
//! use soulpass_core::reducer::Reducer;
//!
//! let mut ledger = Ledger::new(PassClass::default_catalog());
//! let events = BookingReducer::new().reduce(
//!     &mut ledger,
//!     BookingAction::CreateBooking {
//!         booking_id: BookingId::new(),
//!         buyer: BuyerId::new(),
//!         pass_class: PassClassId::new("neon-vibe"),
//!         declared_price: Money::new(10_000),
//!     },
//!     &env,
//! )?;
//! ```

pub mod aggregates;
pub mod error;
pub mod event;
pub mod ledger;
pub mod payload;
pub mod types;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use error::{AdmissionError, AdmissionResult, ErrorKind};
pub use event::{JournalEntry, LedgerEvent};
pub use ledger::Ledger;
pub use smallvec::{SmallVec, smallvec};

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions over the ledger:
/// `(Ledger, Action, Environment) → Result<Events, Error>`.
///
/// A reducer validates a command before touching state, so an `Err` normally
/// leaves the ledger as it was. Callers that chain several reducers in one
/// unit of work run them against a draft copy and discard it on error.
pub mod reducer {
    use smallvec::SmallVec;

    /// Events produced by a single reduction
    pub type Events<E> = SmallVec<[E; 4]>;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Event`: The journaled fact type this reducer emits
    /// - `Error`: The rejection type for invalid commands
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The event type this reducer emits
        type Event;

        /// The error type returned for rejected commands
        type Error;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and the events that describe them
        ///
        /// 1. Validates the action against current state
        /// 2. Applies the resulting events in place
        /// 3. Returns those events for journaling
        ///
        /// Passing an event action replays it without validation.
        ///
        /// # Errors
        ///
        /// Returns `Self::Error` when the command is rejected.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Result<Events<Self::Event>, Self::Error>;
    }
}

/// Environment module - Injected dependencies
///
/// All sources of non-determinism (time, ticket code randomness) and the
/// deployment policy are abstracted here and injected into reducers.
pub mod environment {
    use crate::payload::PayloadSealer;
    use crate::types::{Money, TicketCode};
    use chrono::{DateTime, Duration, Utc};
    use rand::Rng;
    use std::sync::Arc;

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Source of printable ticket codes
    pub trait TicketCodeGenerator: Send + Sync {
        /// Produces a code for a ticket issued at `issued_at`
        fn generate(&self, issued_at: DateTime<Utc>) -> TicketCode;
    }

    /// Codes of the form `SAH-<millis>-<9 random base36 characters>`
    #[derive(Debug, Clone, Copy, Default)]
    pub struct RandomTicketCodes;

    impl RandomTicketCodes {
        const ALPHABET: &'static [u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
        const SUFFIX_LEN: usize = 9;
    }

    impl TicketCodeGenerator for RandomTicketCodes {
        fn generate(&self, issued_at: DateTime<Utc>) -> TicketCode {
            let mut rng = rand::thread_rng();
            let suffix: String = (0..Self::SUFFIX_LEN)
                .map(|_| char::from(Self::ALPHABET[rng.gen_range(0..Self::ALPHABET.len())]))
                .collect();
            TicketCode::compose(issued_at, &suffix)
        }
    }

    /// Deployment-level admission rules
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AdmissionPolicy {
        /// Installment increment
        pub box_unit: Money,
        /// How long a fresh Pending booking holds its seat
        pub hold_window: Duration,
    }

    impl Default for AdmissionPolicy {
        fn default() -> Self {
            Self {
                box_unit: Money::new(1_000),
                hold_window: Duration::minutes(15),
            }
        }
    }

    /// Environment shared by every ledger reducer
    #[derive(Clone)]
    pub struct LedgerEnvironment {
        /// Clock for timestamps
        pub clock: Arc<dyn Clock>,
        /// Ticket code generator
        pub codes: Arc<dyn TicketCodeGenerator>,
        /// Admission rules
        pub policy: AdmissionPolicy,
        /// Seals ticket payloads
        pub sealer: PayloadSealer,
    }

    impl LedgerEnvironment {
        /// Creates a new environment
        #[must_use]
        pub fn new(
            clock: Arc<dyn Clock>,
            codes: Arc<dyn TicketCodeGenerator>,
            policy: AdmissionPolicy,
            sealer: PayloadSealer,
        ) -> Self {
            Self {
                clock,
                codes,
                policy,
                sealer,
            }
        }

        /// Production wiring: system clock and random codes
        #[must_use]
        pub fn production(policy: AdmissionPolicy, sealer: PayloadSealer) -> Self {
            Self::new(
                Arc::new(SystemClock),
                Arc::new(RandomTicketCodes),
                policy,
                sealer,
            )
        }
    }

    impl std::fmt::Debug for LedgerEnvironment {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("LedgerEnvironment")
                .field("now", &self.clock.now())
                .field("policy", &self.policy)
                .field("sealer", &self.sealer)
                .finish_non_exhaustive()
        }
    }

}
