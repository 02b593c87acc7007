pub mod classify;
pub mod fallback;
pub mod metrics;
pub mod providers;

pub use fallback::{Generated, ModelResolver};
