//! Recording collaborators for window tests.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::identifiers::{ConnId, ProcessId, TransportId};
use crate::protocol::Frame;
use crate::transport::{ProcessManager, Transport};

/// Transport that keeps every frame it is handed.
#[derive(Default)]
pub(crate) struct RecordingTransport {
    frames: Mutex<Vec<(TransportId, Frame)>>,
}

impl RecordingTransport {
    pub fn with_frames<R>(&self, f: impl FnOnce(&[(TransportId, Frame)]) -> R) -> R {
        f(&self.frames.lock())
    }

    pub fn texts(&self) -> Vec<String> {
        self.frames
            .lock()
            .iter()
            .map(|(_, frame)| String::from_utf8_lossy(&frame.to_bytes()).into_owned())
            .collect()
    }

    pub fn texts_for(&self, transport_id: TransportId) -> Vec<String> {
        self.frames
            .lock()
            .iter()
            .filter(|(id, _)| *id == transport_id)
            .map(|(_, frame)| String::from_utf8_lossy(&frame.to_bytes()).into_owned())
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn send_text(&self, transport_id: TransportId, frame: String) -> Result<()> {
        self.frames.lock().push((transport_id, Frame::Text(frame)));
        Ok(())
    }

    fn send_binary(&self, transport_id: TransportId, header: String, body: Vec<u8>) -> Result<()> {
        self.frames
            .lock()
            .push((transport_id, Frame::Binary { header, body }));
        Ok(())
    }
}

/// Process manager that remembers halted processes.
#[derive(Default)]
pub(crate) struct RecordingProcesses {
    halted: Mutex<Vec<ProcessId>>,
}

impl RecordingProcesses {
    pub fn halted(&self) -> Vec<ProcessId> {
        self.halted.lock().clone()
    }
}

impl ProcessManager for RecordingProcesses {
    fn halt_process(&self, process_id: ProcessId) {
        self.halted.lock().push(process_id);
    }
}

/// Data callback sink.
pub(crate) type Events = Arc<Mutex<Vec<(ConnId, String)>>>;
