//! pmr-stack - fixed-capacity block arena and an arena-backed LIFO stack
//!
//! The arena hands out byte blocks from one pre-allocated buffer, reusing
//! returned blocks first-fit before bumping its high-water mark. The stack
//! stores each node in a block obtained from any [`MemoryResource`].

pub mod allocator;
pub mod config;
pub mod errors;
pub mod logging;
pub mod shell;
pub mod stack;

// Re-export commonly used items
pub use allocator::{
    ArenaEvent, ArenaObserver, ArenaStats, EventFormat, FixedBlockResource, MemoryBlock,
    MemoryResource, NullObserver, RecordingObserver, TracingObserver, WriterObserver,
};
pub use config::{ArenaConfig, Config, EventSink, LoggingConfig};
pub use errors::{AllocError, ConfigError, StackError};
pub use logging::{init_logging, LogConfig, LogFormat, LogOutput};
pub use shell::{Command, Shell};
pub use stack::{node_layout, Iter, PmrStack};
