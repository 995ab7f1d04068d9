mod store;

pub use store::JsonConfigStore;
