//! Settings store abstraction
//!
//! The status service only needs a tiny slice of the site's settings table:
//! read a value by key and upsert a value. [`SettingsRepository`] is that
//! slice; the SeaORM implementation lives in `database::repositories` and
//! [`InMemorySettingsRepository`] backs deployments without a database.

pub mod memory;
pub mod traits;

pub use memory::InMemorySettingsRepository;
pub use traits::*;
