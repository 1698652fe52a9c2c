pub mod debounce;
pub mod display;
pub mod snapshot;
pub mod templates;
