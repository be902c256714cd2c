//! Infrastructure layer: storage, migrations, configuration and the engines
//! that run domain rules inside units of work.

pub mod capabilities;
pub mod config;
pub mod engine;
pub mod error;
pub mod store;

pub use capabilities::Capabilities;
pub use config::AppConfig;
pub use engine::Engines;
pub use error::{EngineError, EngineResult, StoreError, StoreResult};
pub use store::{InventoryStore, StoreTx};
