//! Inventory aggregate for the booking ledger.
//!
//! Owns the pass class catalog (capacity and price) and answers admission
//! queries. Seats sold are never stored: they are derived from booking
//! statuses on every read, so capacity edits never touch bookings.

use crate::error::{AdmissionError, AdmissionResult};
use crate::event::LedgerEvent;
use crate::environment::{AdmissionPolicy, LedgerEnvironment};
use crate::ledger::Ledger;
use crate::reducer::{Events, Reducer};
use crate::types::{Capacity, Money, PassClass, PassClassId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::smallvec;

// ============================================================================
// Data Structures
// ============================================================================

/// Availability snapshot for one pass class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    /// Pass class identifier
    pub pass_class: PassClassId,
    /// Display name
    pub name: String,
    /// Current price
    pub unit_price: Money,
    /// Total seats
    pub capacity: u32,
    /// Bookings in Tontine or Paid
    pub sold: u32,
    /// Pending bookings currently holding a seat
    pub held: u32,
    /// `capacity - sold`, clamped at zero
    pub remaining: u32,
    /// Seats a new booking could still claim: `capacity - sold - held`, clamped at zero
    pub open: u32,
}

impl Availability {
    /// Computes availability of `class` from the ledger at `now`
    #[must_use]
    pub fn compute(ledger: &Ledger, class: &PassClass, now: DateTime<Utc>, policy: &AdmissionPolicy) -> Self {
        let capacity = class.capacity.seats();
        let sold = ledger.sold(&class.id);
        let held = ledger.held(&class.id, now, policy.hold_window);
        Self {
            pass_class: class.id.clone(),
            name: class.name.clone(),
            unit_price: class.unit_price,
            capacity,
            sold,
            held,
            remaining: capacity.saturating_sub(sold),
            open: capacity.saturating_sub(sold).saturating_sub(held),
        }
    }

    /// Whether a new booking would be admitted
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open > 0
    }
}

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Actions for the Inventory aggregate
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryAction {
    // Commands
    /// Change the capacity of a pass class
    SetCapacity {
        /// Pass class to edit
        pass_class: PassClassId,
        /// New capacity
        capacity: Capacity,
    },

    /// Change the price offered to new bookings
    SetUnitPrice {
        /// Pass class to edit
        pass_class: PassClassId,
        /// New price
        unit_price: Money,
    },

    // Events
    /// Capacity was changed
    CapacityChanged {
        /// Pass class
        pass_class: PassClassId,
        /// Capacity before the change
        previous: Capacity,
        /// Capacity after the change
        capacity: Capacity,
        /// When changed
        changed_at: DateTime<Utc>,
    },

    /// Price was changed
    UnitPriceChanged {
        /// Pass class
        pass_class: PassClassId,
        /// Price before the change
        previous: Money,
        /// Price after the change
        unit_price: Money,
        /// When changed
        changed_at: DateTime<Utc>,
    },
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the Inventory aggregate
#[derive(Debug, Clone, Copy)]
pub struct InventoryReducer;

impl InventoryReducer {
    /// Creates a new `InventoryReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Availability of one pass class
    ///
    /// # Errors
    ///
    /// [`AdmissionError::PassClassNotFound`] for unknown classes.
    pub fn availability(
        ledger: &Ledger,
        pass_class: &PassClassId,
        now: DateTime<Utc>,
        policy: &AdmissionPolicy,
    ) -> AdmissionResult<Availability> {
        let class = ledger.pass_class(pass_class)?;
        Ok(Availability::compute(ledger, class, now, policy))
    }

    /// Availability of every pass class, in catalog order
    #[must_use]
    pub fn list_availability(
        ledger: &Ledger,
        now: DateTime<Utc>,
        policy: &AdmissionPolicy,
    ) -> Vec<Availability> {
        ledger
            .catalog
            .values()
            .map(|class| Availability::compute(ledger, class, now, policy))
            .collect()
    }

    /// Validates a capacity edit and returns the current capacity
    fn validate_capacity(
        ledger: &Ledger,
        pass_class: &PassClassId,
        capacity: Capacity,
    ) -> AdmissionResult<Capacity> {
        let class = ledger.pass_class(pass_class)?;
        let sold = ledger.sold(pass_class);
        if capacity.seats() < sold {
            return Err(AdmissionError::InvalidCapacity {
                requested: capacity.seats(),
                sold,
            });
        }
        Ok(class.capacity)
    }

    /// Applies an event to the ledger
    pub fn apply_event(ledger: &mut Ledger, action: &InventoryAction) {
        match action {
            InventoryAction::CapacityChanged {
                pass_class,
                capacity,
                ..
            } => {
                if let Some(class) = ledger.catalog.get_mut(pass_class) {
                    class.capacity = *capacity;
                }
            }
            InventoryAction::UnitPriceChanged {
                pass_class,
                unit_price,
                ..
            } => {
                if let Some(class) = ledger.catalog.get_mut(pass_class) {
                    class.unit_price = *unit_price;
                }
            }
            // Commands don't modify state
            InventoryAction::SetCapacity { .. } | InventoryAction::SetUnitPrice { .. } => {}
        }
    }

    fn emit(ledger: &mut Ledger, event: InventoryAction) -> Events<LedgerEvent> {
        Self::apply_event(ledger, &event);
        smallvec![LedgerEvent::Inventory(event)]
    }
}

impl Default for InventoryReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for InventoryReducer {
    type State = Ledger;
    type Action = InventoryAction;
    type Event = LedgerEvent;
    type Error = AdmissionError;
    type Environment = LedgerEnvironment;

    fn reduce(
        &self,
        ledger: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Result<Events<Self::Event>, Self::Error> {
        match action {
            InventoryAction::SetCapacity {
                pass_class,
                capacity,
            } => {
                let previous = Self::validate_capacity(ledger, &pass_class, capacity)?;
                if previous == capacity {
                    return Ok(Events::new());
                }
                Ok(Self::emit(
                    ledger,
                    InventoryAction::CapacityChanged {
                        pass_class,
                        previous,
                        capacity,
                        changed_at: env.clock.now(),
                    },
                ))
            }

            InventoryAction::SetUnitPrice {
                pass_class,
                unit_price,
            } => {
                if unit_price.is_zero() {
                    return Err(AdmissionError::InvalidAmount);
                }
                let previous = ledger.pass_class(&pass_class)?.unit_price;
                if previous == unit_price {
                    return Ok(Events::new());
                }
                Ok(Self::emit(
                    ledger,
                    InventoryAction::UnitPriceChanged {
                        pass_class,
                        previous,
                        unit_price,
                        changed_at: env.clock.now(),
                    },
                ))
            }

            // ========== Events (replay) ==========
            event => Ok(Self::emit(ledger, event)),
        }
    }
}
