//! Arena observability - pluggable sinks for allocation events
//!
//! The arena never writes to a fixed output. Each event goes to one
//! [`ArenaObserver`], which may log it, print it, buffer it or drop it.

use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{trace, warn};

/// Event emitted by a [`FixedBlockResource`](super::FixedBlockResource)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ArenaEvent {
    /// Block carved from never-used space
    AllocNew { address: usize, offset: usize, size: usize },
    /// Previously freed block handed out again
    AllocReuse { address: usize, offset: usize, size: usize },
    /// Block returned to the free list
    DeallocFree { address: usize, offset: usize, size: usize },
    /// Arena dropped while blocks were still in use
    Leak { blocks: usize, bytes: usize },
}

impl ArenaEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AllocNew { .. } => "alloc-new",
            Self::AllocReuse { .. } => "alloc-reuse",
            Self::DeallocFree { .. } => "dealloc-free",
            Self::Leak { .. } => "leak",
        }
    }

    /// Address of the affected block, if the event concerns a single block
    pub fn address(&self) -> Option<usize> {
        match *self {
            Self::AllocNew { address, .. }
            | Self::AllocReuse { address, .. }
            | Self::DeallocFree { address, .. } => Some(address),
            Self::Leak { .. } => None,
        }
    }
}

/// Console line format
impl fmt::Display for ArenaEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocNew { address, .. } => write!(f, "ALLOC - new:{:#x}", address),
            Self::AllocReuse { address, .. } => write!(f, "ALLOC - reuse:{:#x}", address),
            Self::DeallocFree { address, .. } => write!(f, "DEALLOC - free:{:#x}", address),
            Self::Leak { blocks, .. } => write!(f, "RES-LEAK DETECTED {} blocks lost", blocks),
        }
    }
}

/// Receiver of arena events
pub trait ArenaObserver {
    fn on_event(&self, event: &ArenaEvent);
}

impl<F: Fn(&ArenaEvent)> ArenaObserver for F {
    fn on_event(&self, event: &ArenaEvent) {
        self(event)
    }
}

/// Forwards events to `tracing` under the `pmr_stack::arena` target
///
/// Block events are logged at TRACE; leaks at WARN.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ArenaObserver for TracingObserver {
    fn on_event(&self, event: &ArenaEvent) {
        match *event {
            ArenaEvent::Leak { blocks, bytes } => {
                warn!(target: "pmr_stack::arena", blocks, bytes, "arena dropped with blocks in use");
            }
            ArenaEvent::AllocNew { address, offset, size }
            | ArenaEvent::AllocReuse { address, offset, size }
            | ArenaEvent::DeallocFree { address, offset, size } => {
                trace!(
                    target: "pmr_stack::arena",
                    kind = event.kind(),
                    address = format_args!("{:#x}", address),
                    offset,
                    size,
                    "arena event"
                );
            }
        }
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ArenaObserver for NullObserver {
    fn on_event(&self, _event: &ArenaEvent) {}
}

/// Buffers events in memory
///
/// Clones share one buffer, so a handle kept by the caller still sees the
/// events after the arena has taken ownership of another clone.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<ArenaEvent>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all events recorded so far
    pub fn events(&self) -> Vec<ArenaEvent> {
        self.events.lock().clone()
    }

    pub fn last(&self) -> Option<ArenaEvent> {
        self.events.lock().last().copied()
    }

    /// Take all recorded events, leaving the buffer empty
    pub fn drain(&self) -> Vec<ArenaEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl ArenaObserver for RecordingObserver {
    fn on_event(&self, event: &ArenaEvent) {
        self.events.lock().push(*event);
    }
}

/// Line format used by [`WriterObserver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFormat {
    /// `ALLOC - new:0x...` lines
    Console,
    /// One JSON object per line
    Json,
}

/// Writes one line per event to `W`
///
/// Write errors are ignored; an observer cannot fail the allocation it reports.
pub struct WriterObserver<W: Write> {
    out: RefCell<W>,
    format: EventFormat,
}

impl<W: Write> WriterObserver<W> {
    pub fn new(out: W, format: EventFormat) -> Self {
        Self {
            out: RefCell::new(out),
            format,
        }
    }

    pub fn console(out: W) -> Self {
        Self::new(out, EventFormat::Console)
    }

    pub fn json(out: W) -> Self {
        Self::new(out, EventFormat::Json)
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write> ArenaObserver for WriterObserver<W> {
    fn on_event(&self, event: &ArenaEvent) {
        let mut out = self.out.borrow_mut();
        let _ = match self.format {
            EventFormat::Console => writeln!(out, "{}", event),
            EventFormat::Json => serde_json::to_writer(&mut *out, event)
                .map_err(std::io::Error::from)
                .and_then(|()| writeln!(out)),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_lines_match_legacy_format() {
        let observer = WriterObserver::console(Vec::new());
        observer.on_event(&ArenaEvent::AllocNew { address: 0x10, offset: 0, size: 16 });
        observer.on_event(&ArenaEvent::Leak { blocks: 2, bytes: 32 });

        let text = String::from_utf8(observer.into_inner()).unwrap();
        assert_eq!(text, "ALLOC - new:0x10\nRES-LEAK DETECTED 2 blocks lost\n");
    }

    #[test]
    fn json_lines_are_tagged_by_kind() {
        let observer = WriterObserver::json(Vec::new());
        observer.on_event(&ArenaEvent::DeallocFree { address: 32, offset: 16, size: 16 });

        let text = String::from_utf8(observer.into_inner()).unwrap();
        let value: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(value["kind"], "dealloc-free");
        assert_eq!(value["offset"], 16);
    }

    #[test]
    fn recording_clones_share_buffer() {
        let recorder = RecordingObserver::new();
        let handle = recorder.clone();
        recorder.on_event(&ArenaEvent::Leak { blocks: 1, bytes: 8 });

        assert_eq!(handle.len(), 1);
        assert_eq!(handle.drain()[0].kind(), "leak");
        assert!(recorder.is_empty());
    }

    #[test]
    fn closures_are_observers() {
        let seen = std::cell::Cell::new(0);
        let observer = |_: &ArenaEvent| seen.set(seen.get() + 1);
        observer.on_event(&ArenaEvent::Leak { blocks: 0, bytes: 0 });
        assert_eq!(seen.get(), 1);
    }
}
