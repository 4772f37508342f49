//! Cross-run progress tracking
//!
//! The [`ResumeLedger`] is the restart guard: a scheme whose key is recorded is
//! never fetched again.

mod ledger;

pub use ledger::ResumeLedger;
