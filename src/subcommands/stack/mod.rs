//! Subcommands pertaining to stack management.

mod create;
pub use create::CreateCmd;

mod adopt;
pub use adopt::AdoptCmd;

mod upstack;
pub use upstack::UpstackCmd;
