pub mod inventory;
pub mod revision;

pub use inventory::InventoryServices;
pub use revision::RevisionSignal;
