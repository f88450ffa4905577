pub mod error;
pub mod types;

pub use error::{LukaError, LukaResult};
pub use types::*;
