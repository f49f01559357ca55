pub mod generation_flow;
pub mod session_ctx;

pub use generation_flow::{GenerationFlow, GenerationReport};
pub use session_ctx::SessionCtx;
