//! Persistence Layer

pub mod state_file;

pub use state_file::JsonStateStore;
