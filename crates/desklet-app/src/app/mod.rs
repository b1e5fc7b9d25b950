//! Wiring between the CLI, the on-disk collaborators and the manager.

mod commands;
mod core;
mod run;

#[cfg(test)]
mod tests;

pub use self::core::DeskletApp;
