pub mod error;
pub mod metrics;
pub mod page;
pub mod settings;
pub mod slot;
pub mod translate;
