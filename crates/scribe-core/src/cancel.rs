use crate::ids::ChatSessionId;

/// Connectivity/cancel flag shared between the transport layer and the
/// turn loop. The transport clears the flag when the client disconnects;
/// the turn loop polls it between events and treats a disconnected
/// session as a cancel request.
///
/// Both methods are idempotent and callable from any thread.
pub trait CancelFlagStore: Send + Sync {
    fn is_connected(&self, id: &ChatSessionId) -> bool;

    /// Clears the cancel request after the turn has acted on it, so the
    /// next turn on this session starts clean.
    fn reset_cancel_status(&self, id: &ChatSessionId);
}
