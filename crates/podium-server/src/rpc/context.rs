//! Shared state handed to method handlers.

use std::sync::Arc;

use podium_live::CommandProcessor;

/// Dependencies available to every handler.
#[derive(Clone)]
pub struct RpcContext {
    /// Serialized live-session command processor.
    pub processor: Arc<CommandProcessor>,
}

impl RpcContext {
    /// Wrap a processor.
    pub fn new(processor: Arc<CommandProcessor>) -> Self {
        Self { processor }
    }
}
