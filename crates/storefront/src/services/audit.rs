//! Security audit trail.
//!
//! Writes happen on spawned tasks. A failed write is logged and otherwise
//! ignored, so auditing can never change a response.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::db::AuditSink;
use crate::models::AuditEvent;

/// Handle for emitting audit records.
#[derive(Clone)]
pub struct AuditLog {
    sink: Arc<dyn AuditSink>,
}

impl AuditLog {
    #[must_use]
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Record `event` in the background.
    ///
    /// The returned handle may be dropped; tests await it.
    pub fn emit(&self, event: AuditEvent) -> JoinHandle<()> {
        tracing::info!(
            event = %event.event,
            user_id = ?event.user_id.map(|id| id.as_i32()),
            path = %event.path,
            ip = ?event.ip,
            "audit"
        );

        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            if let Err(e) = sink.record(&event).await {
                tracing::warn!(
                    error = %e,
                    event = %event.event,
                    "Failed to write audit record"
                );
            }
        })
    }
}
