pub mod api_utils;
pub mod cache;
pub mod cache_graph;
pub mod clock;
pub mod config;
pub mod edit_coordinator;
pub mod event_bus;
pub mod state;
