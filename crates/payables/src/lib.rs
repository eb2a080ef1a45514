//! `finops-payables`: accounts-payable domain.
//!
//! Obligations with their installments and payments, the supplier invoices and
//! recurring rules that issue them, and the scheduler that turns a rule into the
//! next cycle's obligation.

pub mod category;
pub mod filter;
pub mod invoice;
pub mod obligation;
pub mod payee;
pub mod recurring;
pub mod scheduler;

pub use category::{Category, ExpenseType};
pub use filter::{ObligationFilter, ObligationTotals};
pub use invoice::{Invoice, InvoiceFilter, InvoiceItem, NewInvoice, Quantity};
pub use obligation::{
    CancelObligation, CreateObligation, Installment, InstallmentDraft, InstallmentPlan,
    InstallmentStatus, Lifecycle, Obligation, ObligationCommand, ObligationEvent,
    ObligationStatus, Payment, PaymentMethod, RegisterPayment,
};
pub use payee::Payee;
pub use recurring::{NewRecurringRule, Periodicity, RecurringRule};
