pub mod store;

pub use store::{CategoryStore, StorageError};
