//! Inbound frame dispatch: parse as [`RpcRequest`] and route through the
//! [`MethodRegistry`].

use podium_core::{EventEnvelope, Identity};
use tracing::{debug, instrument, warn};

use crate::rpc::context::RpcContext;
use crate::rpc::errors::RpcError;
use crate::rpc::registry::{MethodRegistry, error_envelope};
use crate::rpc::types::RpcRequest;

/// Handle one inbound text frame from `caller`.
///
/// Returns the unicast reply, if any. Malformed frames yield an
/// `INVALID_PARAMS` command error.
#[instrument(skip_all, fields(method))]
pub async fn handle_message(
    message: &str,
    registry: &MethodRegistry,
    ctx: &RpcContext,
    caller: &Identity,
) -> Option<EventEnvelope> {
    let request: RpcRequest = match serde_json::from_str(message) {
        Ok(r) => r,
        Err(e) => {
            warn!(user_id = %caller.user_id, "invalid JSON received");
            let err = RpcError::invalid_params(format!("Invalid JSON: {e}"));
            return Some(error_envelope(&err, None));
        }
    };

    let _ = tracing::Span::current().record("method", request.method.as_str());
    debug!(method = %request.method, id = ?request.id, user_id = %caller.user_id, "dispatching command");
    if !registry.has_method(&request.method) {
        warn!(method = %request.method, "unknown method");
    }

    registry.dispatch(request, ctx, caller).await
}
