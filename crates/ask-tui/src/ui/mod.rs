//! UI module for the ask TUI.

pub mod layout;
pub mod theme;
pub mod widgets;

pub use layout::{centered_fixed, chat_layout};
