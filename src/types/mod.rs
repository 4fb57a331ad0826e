mod frame;
mod message;

pub use frame::{InboundFrame, StructuredRecord, TERMINAL_SENTINEL};
pub use message::{Message, RequestId, Role};
