pub mod publish_ctx;
pub mod publish_flow;
pub mod request;
pub mod state;

pub use publish_ctx::PublishCtx;
pub use publish_flow::{
    goto_with_recovery, is_authenticated, PublishDetails, PublishFlow, PublishResult,
    NAVIGATION_TIMEOUT, PAGE_SETTLE,
};
pub use request::{PreparedPost, PublishRequest};
pub use state::PublishState;
