pub use super::ordered_members::Entity as OrderedMembers;
pub use super::store_keys::Entity as StoreKeys;
