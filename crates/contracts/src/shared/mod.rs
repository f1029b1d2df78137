pub mod capacity;
pub mod errors;
