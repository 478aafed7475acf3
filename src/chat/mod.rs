//! Chat command handling for the friend-message collaborator

pub mod commands;

pub use commands::CommandService;
