//! Stop mode: hold the mode slot, write nothing.

use std::rc::Rc;

use altazkit_core::CancelToken;

use crate::manager::{ModeContext, ModeExit};

pub async fn run(_ctx: Rc<ModeContext>, cancel: CancelToken) -> ModeExit {
    tracing::info!("stop mode active");
    cancel.cancelled().await;
    tracing::info!("stop mode exited");
    ModeExit::Cancelled
}
