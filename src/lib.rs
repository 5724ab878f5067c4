pub mod assistant;
pub mod command;
pub mod config;
pub mod customer_db;
pub mod export;
pub mod format;
pub mod ids;
pub mod invoice;
pub mod ledger;
pub mod render;
pub mod sanitize;
pub mod session;
