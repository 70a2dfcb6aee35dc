pub mod error;
pub mod json;
pub mod request_id;

pub use error::*;
pub use json::*;
pub use request_id::*;
