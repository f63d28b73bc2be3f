//! # SoulPass Testing
//!
//! Testing utilities and fixtures for the SoulPass booking ledger.
//!
//! This crate provides:
//! - Deterministic implementations of the environment traits
//! - A canned identity provider
//! - Ledger and controller fixtures
//! - proptest strategies for installment plans
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//!
//! ## Example
//!
//! ```ignore
//! use soulpass_testing::{fixtures, test_clock};
//!
//! #[tokio::test]
//! async fn test_booking_flow() {
//!     let controller = fixtures::controller(10, 10);
//!     let booking = controller
//!         .create_booking(BuyerId::new(), &fixtures::neon_vibe(), Money::new(10_000))
//!         .await
//!         .unwrap();
//!     assert_eq!(booking.status, BookingStatus::Pending);
//! }
//! ```

use chrono::{DateTime, Utc};
use soulpass_core::environment::Clock;


/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use futures::future::{BoxFuture, FutureExt};
    use soulpass_core::environment::TicketCodeGenerator;
    use soulpass_core::types::{BuyerIdentity, TicketCode};
    use soulpass_runtime::identity::{IdentityError, IdentityProvider, IdentityRequest};
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::{Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use soulpass_testing::mocks::FixedClock;
    /// use soulpass_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(epoch())
    }

    /// 2025-01-01 00:00:00 UTC
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn epoch() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc)
    }

    /// Clock that only moves when told to
    ///
    /// Used to push Pending bookings past the hold window.
    #[derive(Debug)]
    pub struct ManualClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Create a clock starting at `time`
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new(epoch())
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Ticket codes with a zero-padded counter suffix: `SAH-<millis>-000000001`, ...
    #[derive(Debug, Default)]
    pub struct SequentialTicketCodes {
        next: AtomicU64,
    }

    impl SequentialTicketCodes {
        /// Create a generator starting at 1
        #[must_use]
        pub const fn new() -> Self {
            Self {
                next: AtomicU64::new(0),
            }
        }
    }

    impl TicketCodeGenerator for SequentialTicketCodes {
        fn generate(&self, issued_at: DateTime<Utc>) -> TicketCode {
            let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
            TicketCode::compose(issued_at, &format!("{n:09}"))
        }
    }

    /// Always returns the same code; exercises the collision path
    #[derive(Debug, Clone)]
    pub struct ConstantTicketCodes(pub TicketCode);

    impl TicketCodeGenerator for ConstantTicketCodes {
        fn generate(&self, _issued_at: DateTime<Utc>) -> TicketCode {
            self.0.clone()
        }
    }

    /// Identity provider returning a canned identity and counting calls
    #[derive(Debug)]
    pub struct StaticIdentityProvider {
        identity: BuyerIdentity,
        calls: AtomicUsize,
    }

    impl StaticIdentityProvider {
        /// Provider answering with `identity`
        #[must_use]
        pub const fn new(identity: BuyerIdentity) -> Self {
            Self {
                identity,
                calls: AtomicUsize::new(0),
            }
        }

        /// Number of generate calls so far
        #[must_use]
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl IdentityProvider for StaticIdentityProvider {
        fn generate<'a>(
            &'a self,
            _request: &'a IdentityRequest,
        ) -> BoxFuture<'a, Result<BuyerIdentity, IdentityError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let identity = self.identity.clone();
            async move { Ok(identity) }.boxed()
        }
    }

    /// Identity provider that always fails with a provider error
    #[derive(Debug, Clone, Copy, Default)]
    pub struct FailingIdentityProvider;

    impl IdentityProvider for FailingIdentityProvider {
        fn generate<'a>(
            &'a self,
            _request: &'a IdentityRequest,
        ) -> BoxFuture<'a, Result<BuyerIdentity, IdentityError>> {
            async { Err(IdentityError::Provider("upstream returned 502".to_string())) }.boxed()
        }
    }
}

/// Ledger, environment and controller fixtures
pub mod fixtures {
    use crate::mocks::{SequentialTicketCodes, test_clock};
    use soulpass_core::environment::{AdmissionPolicy, Clock, LedgerEnvironment};
    use soulpass_core::payload::PayloadSealer;
    use soulpass_core::types::{BuyerIdentity, Capacity, Money, PassClass, PassClassId};
    use soulpass_core::Ledger;
    use soulpass_runtime::AdmissionController;
    use std::sync::Arc;

    /// Secret used to seal ticket payloads in tests
    pub const TEST_SECRET: &str = "test-ticket-secret";

    /// Seoul Entry price
    pub const SEOUL_PRICE: Money = Money::new(7_000);

    /// Neon Vibe price
    pub const NEON_PRICE: Money = Money::new(10_000);

    /// The `seoul-entry` class id
    #[must_use]
    pub fn seoul_entry() -> PassClassId {
        PassClassId::new(PassClassId::SEOUL_ENTRY)
    }

    /// The `neon-vibe` class id
    #[must_use]
    pub fn neon_vibe() -> PassClassId {
        PassClassId::new(PassClassId::NEON_VIBE)
    }

    /// Both pass classes at the standard prices with the given capacities
    #[must_use]
    pub fn catalog(seoul_capacity: u32, neon_capacity: u32) -> Vec<PassClass> {
        vec![
            PassClass::new(
                seoul_entry(),
                "Seoul Entry",
                SEOUL_PRICE,
                Capacity::new(seoul_capacity),
            ),
            PassClass::new(
                neon_vibe(),
                "Neon Vibe",
                NEON_PRICE,
                Capacity::new(neon_capacity),
            ),
        ]
    }

    /// Empty ledger over [`catalog`]
    #[must_use]
    pub fn ledger(seoul_capacity: u32, neon_capacity: u32) -> Ledger {
        Ledger::new(catalog(seoul_capacity, neon_capacity))
    }

    /// Environment with a fixed clock and sequential ticket codes
    #[must_use]
    pub fn test_environment() -> LedgerEnvironment {
        environment_with_clock(Arc::new(test_clock()))
    }

    /// Environment with the given clock and sequential ticket codes
    #[must_use]
    pub fn environment_with_clock(clock: Arc<dyn Clock>) -> LedgerEnvironment {
        LedgerEnvironment::new(
            clock,
            Arc::new(SequentialTicketCodes::new()),
            AdmissionPolicy::default(),
            PayloadSealer::new(TEST_SECRET),
        )
    }

    /// Controller over a fresh ledger with the test environment
    #[must_use]
    pub fn controller(seoul_capacity: u32, neon_capacity: u32) -> AdmissionController {
        AdmissionController::new(catalog(seoul_capacity, neon_capacity), test_environment())
    }

    /// Controller reading time from `clock`
    #[must_use]
    pub fn controller_with_clock(
        clock: Arc<dyn Clock>,
        seoul_capacity: u32,
        neon_capacity: u32,
    ) -> AdmissionController {
        AdmissionController::new(
            catalog(seoul_capacity, neon_capacity),
            environment_with_clock(clock),
        )
    }

    /// A complete generated identity
    #[must_use]
    pub fn identity() -> BuyerIdentity {
        BuyerIdentity {
            native_script: "하늘".to_string(),
            display_name: "Haneul".to_string(),
            pronunciation: "ha-nool".to_string(),
            meaning: "Sky".to_string(),
        }
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::collection::vec;
    use proptest::prelude::*;

    /// Installment amounts (in whole box units) that sum exactly to `total_boxes`
    pub fn installment_plan(total_boxes: u64) -> impl Strategy<Value = Vec<u64>> {
        vec(1..=total_boxes.max(1), 1..8).prop_map(move |draws| {
            let mut remaining = total_boxes;
            let mut plan = Vec::new();
            for draw in draws {
                if remaining == 0 {
                    break;
                }
                let step = draw.min(remaining);
                plan.push(step);
                remaining -= step;
            }
            if remaining > 0 {
                plan.push(remaining);
            }
            plan
        })
    }

    /// A payment decision: `true` approves, `false` rejects
    pub fn decisions(len: usize) -> impl Strategy<Value = Vec<bool>> {
        vec(any::<bool>(), len)
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, test_clock};
pub use reducer_test::ReducerTest;
