#[allow(clippy::module_inception)]
mod store;

pub use store::MacroStore;
