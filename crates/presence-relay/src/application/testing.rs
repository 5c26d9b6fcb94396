//! Test doubles shared by the application-layer unit tests.

use std::sync::Mutex;

use crate::application::outbound::{OutboundSink, SendError};

/// Sink that records every frame and close request.
#[derive(Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<String>>,
    closed: Mutex<bool>,
}

impl RecordingSink {
    /// Copy of every frame received so far.
    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().unwrap().clone()
    }

    /// Returns and clears the frames received so far.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.frames.lock().unwrap())
    }

    pub fn was_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }
}

impl OutboundSink for RecordingSink {
    fn send_text(&self, payload: &str) -> Result<(), SendError> {
        self.frames.lock().unwrap().push(payload.to_string());
        Ok(())
    }

    fn close(&self) -> Result<(), SendError> {
        *self.closed.lock().unwrap() = true;
        Ok(())
    }
}
