pub mod engine;
pub mod orderbook;
pub mod price_level;
pub mod recovery;
pub mod snapshot;
pub mod ticks;

pub use engine::{run_worker, Engine};
pub use orderbook::{BookSnapshot, OrderBook};
pub use recovery::recover;
pub use snapshot::{run_snapshot_producer, SnapshotMessage, SymbolSnapshot};
pub use ticks::Ticks;
