#![deny(unsafe_op_in_unsafe_fn)]

//! C ABI for host adapters.
//!
//! A host registers its call/return hooks and forwards them here. The
//! configuration and session are opaque heap objects owned by the caller:
//!
//! ```c
//! LprofConfig *config = lprof_config_new();
//! lprof_config_add_filter(config, "*", "*");
//! lprof_config_set_output(config, "lprof.out");
//! LprofSession *session = lprof_init(config);   /* consumes config */
//! /* ... lprof_callhook_in / lprof_callhook_out ... */
//! lprof_close(session);
//! lprof_free(session);
//! ```

use std::ffi::{c_char, c_double, c_int};
use std::path::PathBuf;
use std::ptr::null_mut;
use std::time::Duration;

use crate::filter::{FilterRule, WILDCARD};
use crate::frame::{CallEvent, CallKind};
use crate::session::configuration::Configuration;
use crate::session::Session;
use crate::util::str_from_ptr;

/// Debug information the host resolved for the current call frame.
#[repr(C)]
pub struct LprofDebugInfo {
    pub name: *const c_char,
    pub source: *const c_char,
    pub depth: c_int,
}

fn status(ok: bool) -> c_int {
    if ok {
        1
    } else {
        0
    }
}

#[no_mangle]
pub extern "C" fn lprof_init_logger() {
    crate::init_logger();
}

#[no_mangle]
pub extern "C" fn lprof_config_new() -> *mut Configuration {
    Box::into_raw(Box::new(Configuration::default()))
}

/// # Safety
///
/// `config` must be null or come from `lprof_config_new` and not have been
/// passed to `lprof_init` or freed already.
#[no_mangle]
pub unsafe extern "C" fn lprof_config_free(config: *mut Configuration) {
    if !config.is_null() {
        drop(unsafe { Box::from_raw(config) });
    }
}

/// # Safety
///
/// `config` must be null or a live configuration; `path` a C string or null.
#[no_mangle]
pub unsafe extern "C" fn lprof_config_set_output(config: *mut Configuration, path: *const c_char) -> c_int {
    let (Some(config), Some(path)) = (unsafe { config.as_mut() }, unsafe { str_from_ptr(path) }) else {
        return 0;
    };
    config.output = Some(PathBuf::from(path));
    1
}

/// Accepts `"wall"` or `"cpu"`.
///
/// # Safety
///
/// Same as `lprof_config_set_output`.
#[no_mangle]
pub unsafe extern "C" fn lprof_config_set_time_mode(config: *mut Configuration, mode: *const c_char) -> c_int {
    let (Some(config), Some(mode)) = (unsafe { config.as_mut() }, unsafe { str_from_ptr(mode) }) else {
        return 0;
    };
    match mode.parse() {
        Ok(time_mode) => {
            config.time_mode = time_mode;
            1
        }
        Err(e) => {
            log::warn!("{}", e);
            0
        }
    }
}

/// Accepts `"text"` or `"json"`.
///
/// # Safety
///
/// Same as `lprof_config_set_output`.
#[no_mangle]
pub unsafe extern "C" fn lprof_config_set_format(config: *mut Configuration, format: *const c_char) -> c_int {
    let (Some(config), Some(format)) = (unsafe { config.as_mut() }, unsafe { str_from_ptr(format) }) else {
        return 0;
    };
    match format.parse() {
        Ok(format) => {
            config.format = format;
            1
        }
        Err(e) => {
            log::warn!("{}", e);
            0
        }
    }
}

/// # Safety
///
/// `config` must be null or a live configuration.
#[no_mangle]
pub unsafe extern "C" fn lprof_config_set_print_header(config: *mut Configuration, print_header: c_int) -> c_int {
    match unsafe { config.as_mut() } {
        Some(config) => {
            config.print_header = print_header != 0;
            1
        }
        None => 0,
    }
}

/// Sets the per-call overhead estimate in seconds. Negative or non-finite
/// values are rejected.
///
/// # Safety
///
/// `config` must be null or a live configuration.
#[no_mangle]
pub unsafe extern "C" fn lprof_config_set_call_overhead(
    config: *mut Configuration,
    seconds: c_double,
    compensate: c_int,
) -> c_int {
    let Some(config) = (unsafe { config.as_mut() }) else {
        return 0;
    };
    match Duration::try_from_secs_f64(seconds) {
        Ok(overhead) => {
            config.call_overhead = overhead;
            config.compensate_call_overhead = compensate != 0;
            1
        }
        Err(_) => 0,
    }
}

/// Adds an allow rule. A null `source` means any source. Returns 0 once the
/// rule set is full.
///
/// # Safety
///
/// `config` must be null or a live configuration; strings must be C strings
/// or null.
#[no_mangle]
pub unsafe extern "C" fn lprof_config_add_filter(
    config: *mut Configuration,
    function: *const c_char,
    source: *const c_char,
) -> c_int {
    let (Some(config), Some(function)) = (unsafe { config.as_mut() }, unsafe { str_from_ptr(function) }) else {
        return 0;
    };
    let source = unsafe { str_from_ptr(source) }.unwrap_or(WILDCARD);
    match config.add_filter_rule(FilterRule::new(function, source)) {
        Ok(()) => 1,
        Err(e) => {
            log::warn!("{}", e);
            0
        }
    }
}

/// Adds an allow rule written as `function` or `function@source`.
///
/// # Safety
///
/// `config` must be null or a live configuration; `rule` a C string or null.
#[no_mangle]
pub unsafe extern "C" fn lprof_config_add_filter_rule(config: *mut Configuration, rule: *const c_char) -> c_int {
    let (Some(config), Some(rule)) = (unsafe { config.as_mut() }, unsafe { str_from_ptr(rule) }) else {
        return 0;
    };
    match rule.parse::<FilterRule>().and_then(|rule| config.add_filter_rule(rule)) {
        Ok(()) => 1,
        Err(e) => {
            log::warn!("{}", e);
            0
        }
    }
}

/// Consumes `config` and opens a session. Returns null when the trace output
/// cannot be opened; `config` is freed either way.
///
/// # Safety
///
/// `config` must be null or come from `lprof_config_new`.
#[no_mangle]
pub unsafe extern "C" fn lprof_init(config: *mut Configuration) -> *mut Session {
    if config.is_null() {
        return null_mut();
    }
    let config = unsafe { Box::from_raw(config) };
    match Session::init(*config) {
        Ok(session) => Box::into_raw(Box::new(session)),
        Err(e) => {
            log::warn!("Profiling disabled: {}", e);
            null_mut()
        }
    }
}

/// Function entry hook.
///
/// # Safety
///
/// `session` must be null or a live session; every string must be a C string
/// or null; `debug_info` must be null or point to a valid `LprofDebugInfo`.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn lprof_callhook_in(
    session: *mut Session,
    function_name: *const c_char,
    file: *const c_char,
    line_defined: c_int,
    current_line: c_int,
    what: *const c_char,
    native_function: *const c_char,
    debug_info: *const LprofDebugInfo,
) {
    let (Some(session), Some(debug_info)) = (unsafe { session.as_mut() }, unsafe { debug_info.as_ref() }) else {
        return;
    };
    let Some(mut event) = (unsafe { event_from(debug_info, function_name) }) else {
        return;
    };
    if let Some(file) = unsafe { str_from_ptr(file) } {
        event = event.with_file(file);
    }

    let kind = unsafe { str_from_ptr(what) }
        .and_then(|what| what.parse::<CallKind>().ok())
        .unwrap_or(CallKind::Script);
    event = event.with_lines(line_defined, current_line).with_kind(kind);
    if let Some(native_function) = unsafe { str_from_ptr(native_function) } {
        event = event.with_native_function(native_function);
    }
    session.enter(&event);
}

/// Function return hook. Returns 1 when a frame was closed.
///
/// # Safety
///
/// `session` must be null or a live session; `debug_info` must be null or
/// point to a valid `LprofDebugInfo`.
#[no_mangle]
pub unsafe extern "C" fn lprof_callhook_out(session: *mut Session, debug_info: *const LprofDebugInfo) -> c_int {
    let (Some(session), Some(debug_info)) = (unsafe { session.as_mut() }, unsafe { debug_info.as_ref() }) else {
        return 0;
    };
    match unsafe { event_from(debug_info, debug_info.name) } {
        Some(event) => status(session.exit(&event)),
        None => 0,
    }
}

/// Flushes and releases the trace output. Safe to call repeatedly and with
/// null; the session object stays allocated until `lprof_free`.
///
/// # Safety
///
/// `session` must be null or a live session.
#[no_mangle]
pub unsafe extern "C" fn lprof_close(session: *mut Session) {
    if let Some(session) = unsafe { session.as_mut() } {
        session.close();
    }
}

/// # Safety
///
/// `session` must be null or come from `lprof_init` and not be freed already.
#[no_mangle]
pub unsafe extern "C" fn lprof_free(session: *mut Session) {
    if !session.is_null() {
        drop(unsafe { Box::from_raw(session) });
    }
}

/// Both the hook's function name and the debug-info name must be present.
/// The filter always sees the debug-info source, on enter and on exit alike.
unsafe fn event_from<'a>(
    debug_info: &'a LprofDebugInfo,
    function_name: *const c_char,
) -> Option<CallEvent<'a>> {
    unsafe { str_from_ptr(debug_info.name) }?;
    let name = unsafe { str_from_ptr(function_name) }?;
    let mut event = CallEvent::new(name, debug_info.depth);
    if let Some(source) = unsafe { str_from_ptr(debug_info.source) } {
        event = event.with_source(source);
    }
    Some(event)
}
