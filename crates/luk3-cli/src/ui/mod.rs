//! Console UI.

pub mod output;
pub mod theme;

pub use output::{ConsoleReporter, wait_for_enter};
pub use theme::Theme;
