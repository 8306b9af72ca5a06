//! Cross-run learning

pub mod service;

pub use service::MemoryService;
