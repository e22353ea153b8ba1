pub mod errors;
pub mod events;
pub mod inventory;
pub mod order;
pub mod outbox;
pub mod ports;
pub mod product;
