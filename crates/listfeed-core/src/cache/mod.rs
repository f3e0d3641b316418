mod store;

pub use store::{is_fresh, CacheEntry, CacheStore};
