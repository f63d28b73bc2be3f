//! Aggregates of the booking ledger.
//!
//! Each aggregate owns one concern of the [`Ledger`](crate::ledger::Ledger)
//! and exposes a reducer over the whole ledger, so cross-aggregate rules
//! (seat admission, settlement, ticket issuance) read the facts they need
//! without a saga.

pub mod booking;
pub mod inventory;
pub mod payment;
pub mod ticket;
pub mod tontine;
