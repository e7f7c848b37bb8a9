pub mod guard;
pub mod item_ctx;
pub mod item_flow;
pub mod poller;

pub use guard::safe_execute;
pub use item_ctx::ItemCtx;
pub use item_flow::{ItemFlow, ItemStage};
pub use poller::{poll_until, PollOutcome, PollSpec, PollTarget};
