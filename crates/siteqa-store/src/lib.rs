//! Storage layer: a JSON ledger of ITP approval state, and the session that
//! confirms each approval action with a sink before committing it.

mod error;
pub use error::StoreError;

mod ledger;
pub use ledger::{ApprovalLedger, LedgerSink};

mod session;
pub use session::{ApprovalSink, CommandOutcome, ItpSession};
