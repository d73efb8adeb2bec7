pub mod error;
pub mod blockmap;
pub mod dump;
pub mod fixtures;

pub use error::{StoreError, Result};
