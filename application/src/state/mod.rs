//! Page state tracking

pub mod manager;

pub use manager::{StateEvent, StateManager};
