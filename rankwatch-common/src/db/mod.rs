//! SQLite persistence for rankwatch
//!
//! Two stores share one database file: the tracked-product set (operator
//! managed) and the append-only rank observation history.

pub mod history;
pub mod init;
pub mod products;

pub use init::init_database;
