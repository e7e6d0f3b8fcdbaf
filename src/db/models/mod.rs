mod availability_slot;
mod reservation;
mod schedule;

pub use availability_slot::*;
pub use reservation::*;
pub use schedule::*;
