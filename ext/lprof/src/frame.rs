use std::str::FromStr;
use std::time::Duration;

use crate::error::ProfilerError;
use crate::timer::FrameTimer;

/// How the host entered the function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    /// A function written in the scripting language.
    Script,
    /// A native (C-level) function exposed to scripts.
    Native,
    /// The main chunk of a script.
    Main,
    Tail,
}

impl CallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::Script => "script",
            CallKind::Native => "native",
            CallKind::Main => "main",
            CallKind::Tail => "tail",
        }
    }
}

/// Accepts both our own names and the host's debug-info spelling
/// (`"Lua"`, `"C"`, `"main"`, `"tail"`).
impl FromStr for CallKind {
    type Err = ProfilerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "script" | "Lua" | "lua" => Ok(Self::Script),
            "native" | "C" | "c" => Ok(Self::Native),
            "main" => Ok(Self::Main),
            "tail" => Ok(Self::Tail),
            _ => Err(ProfilerError::InvalidOption {
                option: "call_kind",
                value: s.to_owned(),
            }),
        }
    }
}

/// One enter or exit notification from the host. Borrows the host's strings;
/// nothing is copied unless the event opens a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallEvent<'a> {
    pub name: Option<&'a str>,
    /// Module or chunk name; this is what the call filter matches against.
    pub source: Option<&'a str>,
    /// File the host reports for the call site. Recorded in place of
    /// `source` when present, never used for filtering.
    pub file: Option<&'a str>,
    pub native_function: Option<&'a str>,
    pub line_defined: i32,
    pub current_line: i32,
    pub kind: CallKind,
    /// Nesting level as reported by the host.
    pub depth: i32,
}

impl<'a> CallEvent<'a> {
    pub fn new(name: &'a str, depth: i32) -> Self {
        Self {
            name: Some(name),
            ..Self::anonymous(depth)
        }
    }

    pub fn anonymous(depth: i32) -> Self {
        Self {
            name: None,
            source: None,
            file: None,
            native_function: None,
            line_defined: 0,
            current_line: 0,
            kind: CallKind::Script,
            depth,
        }
    }

    pub fn with_source(mut self, source: &'a str) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_file(mut self, file: &'a str) -> Self {
        self.file = Some(file);
        self
    }

    pub fn with_lines(mut self, line_defined: i32, current_line: i32) -> Self {
        self.line_defined = line_defined;
        self.current_line = current_line;
        self
    }

    pub fn with_kind(mut self, kind: CallKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_native_function(mut self, native_function: &'a str) -> Self {
        self.native_function = Some(native_function);
        self
    }
}

/// An open invocation on the call stack.
#[derive(Debug)]
pub struct CallFrame {
    pub name: String,
    pub source: Option<String>,
    pub native_function: Option<String>,
    pub line_defined: i32,
    pub current_line: i32,
    pub kind: CallKind,
    pub depth: i32,
    pub timer: FrameTimer,
    entered_at: Duration,
}

impl CallFrame {
    /// Returns `None` for events without a function name.
    pub fn open(event: &CallEvent<'_>, now: Duration) -> Option<Self> {
        let name = event.name.filter(|name| !name.is_empty())?;
        Some(Self {
            name: name.to_owned(),
            source: event.file.or(event.source).map(str::to_owned),
            native_function: event.native_function.map(str::to_owned),
            line_defined: event.line_defined,
            current_line: event.current_line,
            kind: event.kind,
            depth: event.depth,
            timer: FrameTimer::start(now),
            entered_at: now,
        })
    }

    /// Stops the frame's timer and turns it into a trace record.
    /// `overhead` is taken off the exclusive time once, saturating at zero.
    pub fn finish(mut self, now: Duration, overhead: Duration, orphaned: bool) -> FrameRecord {
        self.timer.pause(now);
        FrameRecord {
            name: self.name,
            source: self.source,
            native_function: self.native_function,
            line_defined: self.line_defined,
            current_line: self.current_line,
            kind: self.kind,
            depth: self.depth,
            elapsed: self.timer.elapsed(now).saturating_sub(overhead),
            total: now.saturating_sub(self.entered_at),
            orphaned,
        }
    }
}

/// A completed frame, as handed to the trace sink.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub name: String,
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_function: Option<String>,
    pub line_defined: i32,
    pub current_line: i32,
    pub kind: CallKind,
    pub depth: i32,
    /// Exclusive time.
    #[serde(with = "crate::util::duration_secs")]
    pub elapsed: Duration,
    /// Inclusive time, children included.
    #[serde(with = "crate::util::duration_secs")]
    pub total: Duration,
    #[serde(default)]
    pub orphaned: bool,
}

impl FrameRecord {
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn total_secs(&self) -> f64 {
        self.total.as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_kind_from_host_spelling() {
        assert_eq!("Lua".parse::<CallKind>().unwrap(), CallKind::Script);
        assert_eq!("C".parse::<CallKind>().unwrap(), CallKind::Native);
        assert_eq!("main".parse::<CallKind>().unwrap(), CallKind::Main);
        assert_eq!("tail".parse::<CallKind>().unwrap(), CallKind::Tail);
        assert!("coroutine".parse::<CallKind>().is_err());
    }

    #[test]
    fn test_open_records_file_over_source() {
        let event = CallEvent::new("f", 1).with_source("game");
        let frame = CallFrame::open(&event, Duration::ZERO).unwrap();
        assert_eq!(frame.source.as_deref(), Some("game"));

        let frame = CallFrame::open(&event.with_file("@game.lua"), Duration::ZERO).unwrap();
        assert_eq!(frame.source.as_deref(), Some("@game.lua"));
    }

    #[test]
    fn test_open_requires_name() {
        assert!(CallFrame::open(&CallEvent::anonymous(1), Duration::ZERO).is_none());
        assert!(CallFrame::open(&CallEvent::new("", 1), Duration::ZERO).is_none());

        let event = CallEvent::new("update", 2)
            .with_source("game.lua")
            .with_lines(10, 12)
            .with_kind(CallKind::Tail);
        let frame = CallFrame::open(&event, Duration::ZERO).unwrap();
        assert_eq!(frame.name, "update");
        assert_eq!(frame.source.as_deref(), Some("game.lua"));
        assert_eq!((frame.line_defined, frame.current_line), (10, 12));
        assert_eq!(frame.kind, CallKind::Tail);
        assert_eq!(frame.depth, 2);
        assert!(frame.timer.is_running());
    }

    #[test]
    fn test_finish() {
        let ms = Duration::from_millis;
        let mut frame = CallFrame::open(&CallEvent::new("f", 1), ms(100)).unwrap();
        frame.timer.pause(ms(110));
        frame.timer.resume(ms(140));

        let record = frame.finish(ms(150), ms(0), false);
        assert_eq!(record.elapsed, ms(20));
        assert_eq!(record.total, ms(50));
        assert!(!record.orphaned);
    }

    #[test]
    fn test_finish_subtracts_overhead_once() {
        let ms = Duration::from_millis;
        let frame = CallFrame::open(&CallEvent::new("f", 1), ms(0)).unwrap();
        let record = frame.finish(ms(10), ms(3), true);
        assert_eq!(record.elapsed, ms(7));
        assert!(record.orphaned);

        let frame = CallFrame::open(&CallEvent::new("g", 1), ms(0)).unwrap();
        assert_eq!(frame.finish(ms(2), ms(3), false).elapsed, Duration::ZERO);
    }

    #[test]
    fn test_record_serializes_seconds() {
        let record = FrameRecord {
            name: "f".to_owned(),
            source: None,
            native_function: None,
            line_defined: 1,
            current_line: 2,
            kind: CallKind::Native,
            depth: 3,
            elapsed: Duration::from_millis(250),
            total: Duration::from_millis(500),
            orphaned: false,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["elapsed"], 0.25);
        assert_eq!(value["total"], 0.5);
        assert_eq!(value["kind"], "native");
        assert!(value.get("native_function").is_none());
    }
}
