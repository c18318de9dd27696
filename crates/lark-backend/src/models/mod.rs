pub mod payload;
pub mod response;

pub use payload::*;
pub use response::*;
