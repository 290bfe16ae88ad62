// Operations module
// Inventory scanning, diff computation and per-file repair

pub mod diff;
pub mod inventory;
pub mod sync;

pub use diff::{DiffEngine, DiffRecord, DiffStatus, FileRecord, PairDiff};
pub use inventory::{Inventories, InventoryProducer, LocalInventory, RemoteInventory, TransportInventories};
pub use sync::{select_repairable, RepairAction, RsyncRepair, SyncCoordinator};
