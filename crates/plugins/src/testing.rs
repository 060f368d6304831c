//! Shared fixtures for plugin tests.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempDir;
use tether::proto::Packet;
use tether::store::MemoryEngine;
use tether::{Framework, FrameworkConfig, LineDst, PacketSink, TransportError};

#[derive(Default)]
pub(crate) struct RecordingSink {
    sent: Mutex<Vec<Packet>>,
}

impl RecordingSink {
    pub(crate) fn command_lines(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter_map(|p| match p {
                Packet::CommandRequest(r) => Some(r.command_line.clone()),
                _ => None,
            })
            .collect()
    }
}

impl PacketSink for RecordingSink {
    fn write_packet(&self, packet: Packet) -> Result<(), TransportError> {
        self.sent.lock().push(packet);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct CaptureDisplay {
    lines: Mutex<Vec<String>>,
}

impl CaptureDisplay {
    pub(crate) fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl LineDst for CaptureDisplay {
    fn write_line(&self, line: &str) {
        self.lines.lock().push(line.to_owned());
    }
}

pub(crate) struct Harness {
    pub(crate) frame: Arc<Framework>,
    pub(crate) sink: Arc<RecordingSink>,
    pub(crate) display: Arc<CaptureDisplay>,
    dir: TempDir,
}

impl Harness {
    pub(crate) fn root(&self) -> &Path {
        self.dir.path()
    }
}

/// A framework over in-memory tables, with logs under a fresh temp dir.
pub(crate) fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut config = FrameworkConfig::default();
    config.storage.root = dir.path().to_path_buf();

    let sink = Arc::new(RecordingSink::default());
    let display = Arc::new(CaptureDisplay::default());
    let frame = Framework::builder()
        .config(config)
        .sink(Arc::clone(&sink) as Arc<dyn PacketSink>)
        .display(Arc::clone(&display) as Arc<dyn LineDst>)
        .engine(MemoryEngine)
        .build()
        .unwrap();

    Harness {
        frame,
        sink,
        display,
        dir,
    }
}
