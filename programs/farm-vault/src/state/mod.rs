pub mod accounting;
pub mod position;
pub mod vault;

pub use accounting::*;
pub use position::*;
pub use vault::*;
