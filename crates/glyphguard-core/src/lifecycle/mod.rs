//! Boot and lifecycle management shared by co-installed copies.

mod activator;
mod hooks;
mod loader;
mod notice;

pub use activator::OptionsActivator;
pub use hooks::InstallationHooks;
pub use loader::{BootOutcome, Loader};
pub use notice::AdminNotice;
