//! Subcommands pertaining to remote stack management.

mod push;
pub use push::PushCmd;

mod update;
pub use update::UpdateCmd;

mod land;
pub use land::LandCmd;
