//! SeaORM repository implementations
//!
//! These work across SQLite, PostgreSQL and MySQL.

pub mod settings;

pub use settings::SettingsSeaOrmRepository;
