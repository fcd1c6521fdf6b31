pub mod booking;
pub mod intent;
pub mod retrieval;

pub use booking::*;
pub use intent::*;
pub use retrieval::*;
