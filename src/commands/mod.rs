pub mod app_command;

pub use app_command::{completion_hint, AppCommand, HELP_TEXT};
