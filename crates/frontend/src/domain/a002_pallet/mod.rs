pub mod add_quantity;
pub mod api;
