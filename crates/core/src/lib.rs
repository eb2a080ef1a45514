//! `finops-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, fixed-point money, calendar arithmetic and the error model shared by
//! the payables, matching and accounting crates.

pub mod aggregate;
pub mod calendar;
pub mod clock;
pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod text;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, DomainEvent, ExpectedVersion};
pub use calendar::{DateRange, Period};
pub use clock::{Clock, FixedClock, SystemClock};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    ConfirmationId, InstallmentId, InvoiceId, JournalEntryId, ObligationId, PaymentId,
    RecurringRuleId,
};
pub use money::Money;
pub use value_object::ValueObject;
