pub mod app_config;
pub mod database;
pub mod memory_store;
pub mod pg_store;

pub use database::DbClient;
pub use memory_store::InMemorySeatStore;
pub use pg_store::PostgresSeatStore;
