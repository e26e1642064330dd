//! Live-session command handlers.

use async_trait::async_trait;
use podium_core::{EventEnvelope, Identity, LiveError};
use podium_live::Command;
use serde_json::Value;
use tracing::instrument;

use crate::rpc::context::RpcContext;
use crate::rpc::errors::RpcError;
use crate::rpc::registry::MethodHandler;
use crate::rpc::validation::{opt_page_number, opt_song_ref, require_page_number, require_song_ref};

/// Reject non-conducting roles before their params are even looked at.
fn ensure_conductor(caller: &Identity, command: &'static str) -> Result<(), RpcError> {
    if caller.role.can_conduct() {
        Ok(())
    } else {
        Err(LiveError::Forbidden {
            role: caller.role,
            command,
        }
        .into())
    }
}

/// Parse `changeSong` params: `{songRef, pageNumber?}`.
pub fn change_song_command(caller: &Identity, params: Option<&Value>) -> Result<Command, RpcError> {
    ensure_conductor(caller, "changeSong")?;
    Ok(Command::ChangeSong {
        song_ref: require_song_ref(params, "songRef")?,
        page_number: opt_page_number(params, "pageNumber")?,
    })
}

/// Parse `changePage` params: `{pageNumber, songRef?}`.
pub fn change_page_command(caller: &Identity, params: Option<&Value>) -> Result<Command, RpcError> {
    ensure_conductor(caller, "changePage")?;
    Ok(Command::ChangePage {
        page_number: require_page_number(params, "pageNumber")?,
        song_ref: opt_song_ref(params, "songRef")?,
    })
}

async fn run(ctx: &RpcContext, caller: &Identity, command: Command) -> Result<Option<EventEnvelope>, RpcError> {
    let _event = ctx.processor.execute(caller, command).await?;
    Ok(None)
}

/// Begin or take over the session.
pub struct StartHandler;

#[async_trait]
impl MethodHandler for StartHandler {
    #[instrument(skip(self, _params, ctx, caller), fields(method = "start", user_id = %caller.user_id))]
    async fn handle(
        &self,
        _params: Option<Value>,
        ctx: &RpcContext,
        caller: &Identity,
    ) -> Result<Option<EventEnvelope>, RpcError> {
        run(ctx, caller, Command::Start).await
    }
}

/// Display a song.
pub struct ChangeSongHandler;

#[async_trait]
impl MethodHandler for ChangeSongHandler {
    #[instrument(skip(self, params, ctx, caller), fields(method = "changeSong", user_id = %caller.user_id))]
    async fn handle(
        &self,
        params: Option<Value>,
        ctx: &RpcContext,
        caller: &Identity,
    ) -> Result<Option<EventEnvelope>, RpcError> {
        let command = change_song_command(caller, params.as_ref())?;
        run(ctx, caller, command).await
    }
}

/// Turn the page of the current song.
pub struct ChangePageHandler;

#[async_trait]
impl MethodHandler for ChangePageHandler {
    #[instrument(skip(self, params, ctx, caller), fields(method = "changePage", user_id = %caller.user_id))]
    async fn handle(
        &self,
        params: Option<Value>,
        ctx: &RpcContext,
        caller: &Identity,
    ) -> Result<Option<EventEnvelope>, RpcError> {
        let command = change_page_command(caller, params.as_ref())?;
        run(ctx, caller, command).await
    }
}

/// End the session.
pub struct StopHandler;

#[async_trait]
impl MethodHandler for StopHandler {
    #[instrument(skip(self, _params, ctx, caller), fields(method = "stop", user_id = %caller.user_id))]
    async fn handle(
        &self,
        _params: Option<Value>,
        ctx: &RpcContext,
        caller: &Identity,
    ) -> Result<Option<EventEnvelope>, RpcError> {
        run(ctx, caller, Command::Stop).await
    }
}

/// Unicast the current session to the caller. Open to every role.
pub struct RequestSnapshotHandler;

#[async_trait]
impl MethodHandler for RequestSnapshotHandler {
    async fn handle(
        &self,
        _params: Option<Value>,
        ctx: &RpcContext,
        _caller: &Identity,
    ) -> Result<Option<EventEnvelope>, RpcError> {
        Ok(Some(EventEnvelope::snapshot(&ctx.processor.snapshot())))
    }
}
