pub mod diesel_store;
pub mod kafka;
pub mod memory_store;
pub mod models;

pub use diesel_store::DieselStore;
pub use memory_store::InMemoryStore;
