pub mod driver;
pub mod error;
pub mod freshness;
pub mod store;

pub use driver::{DiskDriver, Driver, MemoryDriver};
pub use error::StoreError;
pub use store::{HttpStore, LockStatus};
