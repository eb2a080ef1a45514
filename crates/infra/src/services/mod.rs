//! Application services.
//!
//! Each service reads what its engine needs from the [`LedgerStore`](crate::store::LedgerStore)
//! right before invoking it and writes results back through the same store. Services
//! hold no state of their own beyond configuration, so they are shared across
//! requests behind an `Arc`.

pub mod invoices;
pub mod payables;
pub mod reconciliation;
pub mod recurring;
pub mod statements;

pub use invoices::{InvoiceDetail, InvoiceList, InvoiceService};
pub use payables::{NewObligation, ObligationList, PayablesService, PayablesSummary};
pub use reconciliation::{ConfirmMatch, ConfirmedMatch, MatchCandidate, ReconciliationService};
pub use recurring::{MaterializeReport, RecurringService, ScheduledRule};
pub use statements::StatementService;
