//! Accounting module: chart of accounts, journal entries, the income statement
//! (DRE) and obligation → ledger synchronization.
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns.

pub mod balances;
pub mod chart;
pub mod journal;
pub mod statement;
pub mod sync;

pub use balances::AccountBalance;
pub use chart::{AccountNode, AccountPlan, AccountType};
pub use journal::{EntrySource, JournalEntry, NewJournalEntry};
pub use statement::{
    BreakdownLine, IncomeStatement, Margins, OperatingExpenses, StatementGroup, StatementSection,
};
pub use sync::{
    CategoryAccountMap, LedgerDatePolicy, SyncBatch, SyncReport, SyncSettings,
    UnmappedInstallment,
};
