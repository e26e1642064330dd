//! Method handlers.

pub mod live;

use super::registry::MethodRegistry;

/// Method names accepted over the `WebSocket`.
pub mod methods {
    /// Begin or take over the session.
    pub const START: &str = "start";
    /// Display a song.
    pub const CHANGE_SONG: &str = "changeSong";
    /// Turn the page.
    pub const CHANGE_PAGE: &str = "changePage";
    /// End the session.
    pub const STOP: &str = "stop";
    /// Catch-up request.
    pub const REQUEST_SNAPSHOT: &str = "requestSnapshot";
}

/// Register every live-session handler.
pub fn register_all(registry: &mut MethodRegistry) {
    registry.register(methods::START, live::StartHandler);
    registry.register(methods::CHANGE_SONG, live::ChangeSongHandler);
    registry.register(methods::CHANGE_PAGE, live::ChangePageHandler);
    registry.register(methods::STOP, live::StopHandler);
    registry.register(methods::REQUEST_SNAPSHOT, live::RequestSnapshotHandler);
}
