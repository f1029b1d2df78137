pub mod aggregate;
pub mod lifecycle;

pub use aggregate::{
    ClassificationLimit, InboundOrder, InboundOrderCreateDto, InboundOrderId, TransitionRequest,
};
pub use lifecycle::OrderState;
