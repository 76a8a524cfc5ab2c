pub mod env;
pub mod schema;
pub mod storage;

pub use env::*;
pub use schema::*;
pub use storage::*;
