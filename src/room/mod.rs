pub mod catalog;
pub mod grid;
pub mod label;
pub mod layout;

pub use catalog::RoomCatalog;
pub use grid::{Cell, RoomGrid};
pub use label::{SeatLabel, SeatLabeler, SnakePolicy};
pub use layout::RoomSource;
