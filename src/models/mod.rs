pub mod allocation;
pub mod points;
pub mod schedule;

pub use allocation::*;
pub use points::*;
pub use schedule::*;
