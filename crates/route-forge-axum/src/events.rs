//! Lifecycle notifications.

use std::net::SocketAddr;

use tokio::sync::broadcast;

use crate::route::RouteKey;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Emitted once, after every model's routes are registered.
    RoutesGenerated { routes: Vec<RouteKey> },
    ServerStarting,
    ServerStarted { addr: SocketAddr },
    ServerStopping,
    ServerStopped,
}

/// Broadcast fan-out of [`ServerEvent`]s. Events with no subscribers are
/// dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ServerEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }
}

impl EventBus {
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ServerEvent) {
        tracing::debug!(?event, "server event");
        let _ = self.sender.send(event);
    }
}
