//! JSON-lines event sink.
//!
//! One JSON object per event, newline terminated, written to any
//! [`io::Write`].  The binary points it at stdout under `--json` so the
//! run can be piped into plotting or analysis tools.

use std::io::{self, Write};

use log::warn;

use crate::app::events::DeviceEvent;
use crate::app::ports::EventSink;

pub struct JsonLinesSink<W: Write> {
    out: W,
    snapshots_only: bool,
    write_failures: u32,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            snapshots_only: false,
            write_failures: 0,
        }
    }

    /// Emit only end-of-tick snapshots.
    pub fn snapshots_only(mut self) -> Self {
        self.snapshots_only = true;
        self
    }

    pub fn write_failures(&self) -> u32 {
        self.write_failures
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_event(&mut self, event: &DeviceEvent) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, event)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn emit(&mut self, event: &DeviceEvent) {
        if self.snapshots_only && !matches!(event, DeviceEvent::Snapshot(_)) {
            return;
        }
        if let Err(e) = self.write_event(event) {
            // Only the first failure is logged; a closed pipe would flood.
            if self.write_failures == 0 {
                warn!("JSON sink: write failed: {e}");
            }
            self.write_failures = self.write_failures.saturating_add(1);
        }
    }
}
