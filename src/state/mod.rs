mod assembler;
mod session;
mod transcript;

pub use assembler::{FrameOutcome, OpenRequest, ResponseAssembler, ERROR_PREFIX};
pub use session::{ChatSession, Notice, NoticeLevel};
pub use transcript::{DeltaPlacement, Transcript};
