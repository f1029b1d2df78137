pub mod aggregate;
pub mod lifecycle;
pub mod summary;

pub use aggregate::{
    AddQuantityRequest, Pallet, PalletClassification, PalletCreateDto, PalletId, StatusRequest,
};
pub use lifecycle::{PalletOperation, PalletStatus};
pub use summary::{summarize, PalletSummary, TypeTotals};
