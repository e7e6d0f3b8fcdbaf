mod reservation_repository;
mod slot_repository;

#[cfg(test)]
pub mod memory;

pub use reservation_repository::{
    PgReservationRepository, ReservationInsert, ReservationRepository,
};
pub use slot_repository::{PgSlotRepository, SlotInsert, SlotRepository};
