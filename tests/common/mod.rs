//! Shared utilities for integration testing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use stallguard::wire::{ErrorCode, FrameSink, SinkError, StreamId};

/// One frame the supervisor attempted to send, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    GoAway(StreamId),
    Reset(StreamId, ErrorCode),
}

/// Frame sink that records every outbound frame and can simulate a dead
/// transport.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingSink {
    /// Everything sent so far, in send order.
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Make every subsequent send fail as if the transport were gone.
    pub fn fail_sends(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

impl FrameSink for RecordingSink {
    fn send_go_away(&self, last_processed: StreamId) -> Result<(), SinkError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SinkError::TransportClosed);
        }
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::GoAway(last_processed));
        Ok(())
    }

    fn reset_stream(&self, id: StreamId, code: ErrorCode) -> Result<(), SinkError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SinkError::TransportClosed);
        }
        self.events.lock().unwrap().push(SinkEvent::Reset(id, code));
        Ok(())
    }
}
