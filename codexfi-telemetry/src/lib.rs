//! # codexfi-telemetry
//!
//! Observability state: the persistent cost ledger, the bounded activity
//! log, and the id → display-name registry. All three are constructed at
//! startup and passed explicitly; cross-process readers call `load()`
//! before reading. Persistence is best-effort — telemetry must never
//! break ingest or search.

mod activity;
mod ledger;
mod names;
mod tracing_setup;

pub use activity::{ActivityEntry, ActivityLog};
pub use ledger::{CallUsage, CostLedger, LedgerSnapshot, Provider, ProviderTotals};
pub use names::NameRegistry;
pub use tracing_setup::init_tracing;
