//! Booking pipeline building blocks: slot availability, promo resolution,
//! bonus ledger mutations and schedule grouping. Route handlers compose these
//! inside a single database transaction.

pub mod availability;
pub mod ledger;
pub mod promo;
pub mod schedule;
