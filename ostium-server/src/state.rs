use ostium_core::Broker;
use tokio_util::sync::CancellationToken;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub broker: Broker,
    /// Root cancellation token of the process; catalog requests derive
    /// child tokens from it so their graph walks stop when the server
    /// goes away.
    pub shutdown: CancellationToken,
}
