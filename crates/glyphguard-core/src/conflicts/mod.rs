//! Conflict detection: observations, the durable aggregate and the scanner
//! switch stored in the user options.

mod aggregator;
mod observations;
mod options;
mod snapshot;

pub use aggregator::{ConflictAggregator, RejectReason, ReportOutcome};
pub use observations::{observation_id, ObservationId, UnregisteredClients};
pub use options::UserOptions;
pub use snapshot::{troubleshoot_tab_url, ClientSnapshot};
