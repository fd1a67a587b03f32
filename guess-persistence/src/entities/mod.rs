pub mod prelude;

pub mod ordered_members;
pub mod store_keys;
