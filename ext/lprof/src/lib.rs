//! Function-level call profiler for scripting hosts.
//!
//! The host reports every function entry and exit to a [`Session`]. The
//! session keeps a model of the call stack, measures each frame's exclusive
//! time, and writes a call tree to its sink every time the stack runs empty.

extern crate serde;
#[macro_use]
extern crate serde_derive;

pub mod clock;
pub mod error;
pub mod ffi;
pub mod filter;
pub mod frame;
pub mod serialization;
pub mod session;
pub mod sink;
pub mod stack;
pub mod timer;
mod util;

pub use crate::error::ProfilerError;
pub use crate::filter::{CallFilter, FilterRule};
pub use crate::frame::{CallEvent, CallKind, FrameRecord};
pub use crate::session::configuration::{Configuration, TimeMode, TraceFormat};
pub use crate::session::{Session, SessionStats};
pub use crate::sink::{FileSink, MemorySink, TraceSink, WriterSink};

/// Installs `env_logger` when built with the `debug` feature. Safe to call
/// more than once.
pub fn init_logger() {
    #[cfg(feature = "debug")]
    {
        let _ = env_logger::builder()
            .format_timestamp(None)
            .format_module_path(false)
            .try_init();
    }
}
