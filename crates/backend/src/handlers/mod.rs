pub mod a001_inbound_order;
pub mod a002_pallet;
pub mod a003_customer_order;
