pub mod aggregate;
pub mod availability;

pub use aggregate::{CustomerOrder, CustomerOrderCreateDto, CustomerOrderId, CustomerOrderLine};
pub use availability::{compute_availability, AvailabilityQuery, CustomerOrderAvailability};
