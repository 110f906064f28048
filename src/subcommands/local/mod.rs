//! Subcommands that only read or rewrite local state.

mod commit;
pub use commit::{AmendCmd, CommitCmd};

mod log;
pub use log::LogCmd;

mod sync;
pub use sync::{print_sync_report, AbortCmd, ContinueCmd, SyncCmd};
