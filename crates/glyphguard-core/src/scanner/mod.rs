//! Client-side scan session: status derivation, countdown and the event loop
//! that talks to the REST routes.

mod driver;
mod facts;
mod session;
mod status;
mod timer;
mod transport;

pub use driver::{ScanDriver, ScanHandle, ScanView};
pub use facts::ScanFacts;
pub use session::{DoneTally, ScanEvent, ScanSession, ScanSessionState, ScannerEnablementState};
pub use status::{derive_status, ScanStatus};
pub use timer::ScanTimer;
pub use transport::{HttpScanTransport, ScanTransport};
