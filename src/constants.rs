//! Constants for the `stk` application.

use nu_ansi_term::Color;

/// Name of the metadata store file, kept inside the repository's git directory.
pub(crate) const STK_STORE_FILE_NAME: &str = ".stk_store.toml";
/// Name of the configuration file, looked up in the home directory and the repository root.
pub(crate) const STK_CFG_FILE_NAME: &str = ".stk_config.toml";

/// Trunk branch names recognized when no configuration overrides them.
pub(crate) const DEFAULT_TRUNKS: [&str; 2] = ["main", "master"];
/// The remote that branches are pushed to when no configuration overrides it.
pub(crate) const DEFAULT_REMOTE: &str = "origin";

pub(crate) const COLORS: [Color; 6] = [
    Color::Blue,
    Color::Cyan,
    Color::Green,
    Color::Red,
    Color::Yellow,
    Color::Purple,
];

pub(crate) const FILLED_CIRCLE: char = '●';
pub(crate) const EMPTY_CIRCLE: char = '○';
pub(crate) const BOTTOM_LEFT_BOX: char = '└';
pub(crate) const LEFT_FORK_BOX: char = '├';
pub(crate) const VERTICAL_BOX: char = '│';
pub(crate) const HORIZONTAL_BOX: char = '─';
