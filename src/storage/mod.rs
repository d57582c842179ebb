mod policy_store;

pub use policy_store::{PolicyStore, DEFAULT_DEBOUNCE, POLICY_VERSION};
