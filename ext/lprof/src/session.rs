pub mod configuration;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crate::clock::{self, Clock};
use crate::error::ProfilerError;
use crate::filter::CallFilter;
use crate::frame::{CallEvent, CallFrame, FrameRecord};
use crate::sink::{FileSink, TraceSink};
use crate::stack::CallStack;

use self::configuration::Configuration;

/// Diagnostic counters. None of these conditions is an error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Enter events that opened a frame.
    pub enters: u64,
    /// Events rejected by the call filter.
    pub filtered: u64,
    /// Enter events at or above the current top frame's depth.
    pub depth_guarded: u64,
    /// Exit events that closed a frame.
    pub exits: u64,
    /// Exit events arriving while the stack is empty.
    pub unmatched_exits: u64,
    /// Frames force-closed by stack repair or by `close`.
    pub orphaned_frames: u64,
    pub trees_emitted: u64,
    pub emit_failures: u64,
}

/// One profiling run over a single execution context.
///
/// The host drives the session with `enter`/`exit` from one thread. Every
/// time the stack runs empty the completed tree goes to the sink.
pub struct Session {
    configuration: Configuration,
    filter: CallFilter,
    clock: Box<dyn Clock + Send>,
    call_overhead: Duration,
    stack: CallStack,
    completed: Vec<FrameRecord>,
    sink: Option<Box<dyn TraceSink + Send>>,
    stats: SessionStats,
}

impl Session {
    /// Opens the trace file named by `configuration.output`.
    pub fn init(configuration: Configuration) -> Result<Self, ProfilerError> {
        let sink = match &configuration.output {
            Some(path) => FileSink::create(
                path,
                configuration.format,
                configuration.print_header,
            )?,
            None => {
                return Err(ProfilerError::SinkUnavailable {
                    path: PathBuf::new(),
                    source: io::Error::new(io::ErrorKind::NotFound, "no output path configured"),
                })
            }
        };
        Self::with_sink(configuration, Box::new(sink))
    }

    /// Profiles into a caller-provided sink. Fails only when the configured
    /// filter rules exceed the rule capacity.
    pub fn with_sink(
        configuration: Configuration,
        sink: Box<dyn TraceSink + Send>,
    ) -> Result<Self, ProfilerError> {
        let filter = CallFilter::from_rules(configuration.filter_rules.iter().cloned())?;
        let clock = clock::clock_for(&configuration.time_mode);
        let call_overhead = configuration.effective_call_overhead();

        log::debug!(
            "Session started (time_mode={:?}, format={:?}, {} filter rules, call_overhead={:?})",
            configuration.time_mode,
            configuration.format,
            filter.len(),
            call_overhead,
        );

        Ok(Self {
            configuration,
            filter,
            clock,
            call_overhead,
            stack: CallStack::new(),
            completed: vec![],
            sink: Some(sink),
            stats: SessionStats::default(),
        })
    }

    /// Replaces the time source. Only meaningful before the first event.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send>) -> Self {
        self.clock = clock;
        self
    }

    pub fn enter(&mut self, event: &CallEvent<'_>) {
        if self.is_closed() {
            return;
        }
        if !self.filter.should_track(event.name, event.source) {
            self.stats.filtered += 1;
            return;
        }
        // Not a genuine deeper call as far as the host's depth numbering
        // tells us. This also drops same-depth siblings; see DESIGN.md.
        if let Some(top) = self.stack.top() {
            if event.depth <= top.depth {
                log::trace!(
                    "Ignoring enter of {:?} at depth {} (top frame {:?} at depth {})",
                    event.name,
                    event.depth,
                    top.name,
                    top.depth
                );
                self.stats.depth_guarded += 1;
                return;
            }
        }

        let now = self.clock.now();
        let frame = match CallFrame::open(event, now) {
            Some(frame) => frame,
            None => return,
        };
        if let Some(parent) = self.stack.top_mut() {
            parent.timer.pause(now);
        }
        self.stack.push(frame);
        self.stats.enters += 1;
    }

    /// Returns whether any frame was closed.
    pub fn exit(&mut self, event: &CallEvent<'_>) -> bool {
        if self.is_closed() {
            return false;
        }
        if !self.filter.should_track(event.name, event.source) {
            self.stats.filtered += 1;
            return false;
        }
        if self.stack.is_empty() {
            log::trace!("Unmatched exit of {:?} at depth {}", event.name, event.depth);
            self.stats.unmatched_exits += 1;
            return false;
        }

        let now = self.clock.now();
        let overhead = self.call_overhead;
        let completed = &mut self.completed;
        let orphans = self.stack.repair_to(event.depth, |frame| {
            completed.push(frame.finish(now, overhead, true));
        });
        if orphans > 0 {
            log::trace!(
                "Exit of {:?} at depth {} closed {} orphaned frames",
                event.name,
                event.depth,
                orphans
            );
            self.stats.orphaned_frames += orphans as u64;
        }

        if let Some(frame) = self.stack.pop() {
            self.completed.push(frame.finish(now, overhead, false));
            self.stats.exits += 1;
        }

        if self.stack.is_empty() {
            self.emit_completed();
        } else if let Some(parent) = self.stack.top_mut() {
            parent.timer.resume(now);
        }
        true
    }

    /// Closes open frames, writes what is left and releases the sink.
    /// Calling it again is a no-op.
    pub fn close(&mut self) {
        if self.is_closed() {
            return;
        }

        let now = self.clock.now();
        let overhead = self.call_overhead;
        let completed = &mut self.completed;
        let drained = self.stack.drain(|frame| {
            completed.push(frame.finish(now, overhead, true));
        });
        if drained > 0 {
            log::debug!("Closing session with {} open frames", drained);
            self.stats.orphaned_frames += drained as u64;
        }
        self.emit_completed();

        if let Some(mut sink) = self.sink.take() {
            if let Err(e) = sink.flush() {
                log::warn!("Failed to flush trace output: {}", e);
                self.stats.emit_failures += 1;
            }
        }
        log::debug!("Session closed: {:?}", self.stats);
    }

    fn emit_completed(&mut self) {
        if self.completed.is_empty() {
            return;
        }
        if let Some(sink) = self.sink.as_mut() {
            match sink.emit(&self.completed) {
                Ok(()) => {
                    self.stats.trees_emitted += 1;
                    log::trace!("Emitted call tree with {} frames", self.completed.len());
                }
                Err(e) => {
                    self.stats.emit_failures += 1;
                    log::warn!(
                        "Failed to write call tree ({} frames): {}",
                        self.completed.len(),
                        e
                    );
                }
            }
        }
        self.completed.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.sink.is_none()
    }

    /// Number of open frames.
    pub fn depth(&self) -> usize {
        self.stack.occupancy()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
