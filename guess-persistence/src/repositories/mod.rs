pub mod sql_store;

pub use sql_store::SqlOrderedStore;
