//! Bridge bindings for JavaScript
//!
//! This module installs the bridge facade into a script context. The
//! Rust side exposes a handful of string-typed hook functions; a small
//! JS prelude assembles them into the bridge object the script sees
//! (property-style `pasteboard`, frozen `args`, `alert`, `routeTo`).
//! Values cross the boundary as JSON text; the prelude keeps the
//! script's last pasteboard write live so reads preserve identity.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::{Arc, Mutex, PoisonError};

use rquickjs::function::Func;
use rquickjs::{Ctx, Object};
use tokio::sync::mpsc;

use crate::{HostRequest, HostResponse, ScriptConfig, ScriptError, ScriptEvent};
use tether_protocol::{
    validate_route_target, AlertRequest, AlertTicket, BridgeError, CellValue, InvocationArgs,
    RunId,
};

/// Shared scalar cell ("pasteboard") for one script run.
///
/// A single untyped slot, seeded empty at run start and discarded with
/// the run. Reads observe the most recent write of the same run; runs
/// never share a cell unless they share a [`Bridge`].
#[derive(Debug, Clone, Default)]
pub struct SharedCell {
    slot: Arc<Mutex<CellValue>>,
}

impl SharedCell {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self) -> CellValue {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, value: CellValue) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }
}

/// The bridge facade for one script run: the argument store plus a fresh
/// cell. Construction is initialization; a `Bridge` is Ready from birth
/// and torn down silently with the run.
#[derive(Debug, Clone, Default)]
pub struct Bridge {
    args: InvocationArgs,
    cell: SharedCell,
}

impl Bridge {
    #[must_use]
    pub fn new(args: InvocationArgs) -> Self {
        Self {
            args,
            cell: SharedCell::new(),
        }
    }

    #[must_use]
    pub fn args(&self) -> &InvocationArgs {
        &self.args
    }

    #[must_use]
    pub fn cell(&self) -> &SharedCell {
        &self.cell
    }
}

/// Collects script output and forwards it as events
#[derive(Clone)]
pub(crate) struct OutputSink {
    run_id: RunId,
    buffer: Rc<RefCell<String>>,
    events: mpsc::Sender<ScriptEvent>,
}

impl OutputSink {
    pub(crate) fn new(
        run_id: RunId,
        buffer: Rc<RefCell<String>>,
        events: mpsc::Sender<ScriptEvent>,
    ) -> Self {
        Self {
            run_id,
            buffer,
            events,
        }
    }

    fn emit(&self, text: &str) {
        {
            let mut buf = self.buffer.borrow_mut();
            if !buf.is_empty() {
                buf.push('\n');
            }
            buf.push_str(text);
        }
        // Lossy under backpressure; the full output survives in the buffer
        let _ = self.events.try_send(ScriptEvent::Output {
            run_id: self.run_id,
            text: text.to_string(),
        });
    }
}

/// JS prelude that assembles the bridge object from the raw hooks.
///
/// `__BRIDGE_NAME__` is replaced with [`ScriptConfig::global_name`]. The
/// prelude keeps its own FIFO of alert callbacks; the Rust side keeps the
/// matching FIFO of completion tickets and shifts both in lockstep via
/// `__tether_next_completion`.
const BRIDGE_PRELUDE: &str = r#"
(function (g) {
    'use strict';
    const cellGet = g.__tether_cell_get;
    const cellSet = g.__tether_cell_set;
    const alertRaw = g.__tether_alert;
    const routeRaw = g.__tether_route_to;
    const printRaw = g.__tether_print;
    const rawArgs = g.__tether_args;
    delete g.__tether_cell_get;
    delete g.__tether_cell_set;
    delete g.__tether_alert;
    delete g.__tether_route_to;
    delete g.__tether_print;
    delete g.__tether_args;

    // Entries live in a prototype-less backing store so that get() can
    // resolve every invocation key, including one literally named "get".
    const entries = Object.create(null);
    for (const key in rawArgs) {
        entries[key] = rawArgs[key];
    }
    const args = {};
    for (const key in entries) {
        if (key !== 'get') {
            Object.defineProperty(args, key, { value: entries[key], enumerable: true });
        }
    }
    Object.defineProperty(args, 'get', {
        value: function (key) {
            const v = entries[String(key)];
            return typeof v === 'string' ? v : undefined;
        },
    });
    Object.freeze(args);

    const pending = [];
    const bridge = {
        args: args,
        alert: function (request, onComplete) {
            if (request === null || typeof request !== 'object') {
                throw new TypeError('alert: request must be an object');
            }
            if (onComplete !== undefined && typeof onComplete !== 'function') {
                throw new TypeError('alert: onComplete must be a function');
            }
            const err = alertRaw(JSON.stringify({
                title: request.title,
                message: request.message,
                action: request.action,
            }));
            if (err !== undefined && err !== null) {
                throw new Error(err);
            }
            pending.push(onComplete);
        },
        routeTo: function (url) {
            const err = routeRaw(typeof url === 'string' ? url : String(url ?? ''));
            if (err !== undefined && err !== null) {
                throw new Error(err);
            }
        },
    };
    // The live value written by the script is kept here so reads return
    // the same object, not a parsed copy; the host cell holds a JSON
    // mirror taken at write time.
    let cellCached = false;
    let cellValue;
    Object.defineProperty(bridge, 'pasteboard', {
        get: function () {
            if (cellCached) {
                return cellValue;
            }
            const raw = cellGet();
            return raw === undefined || raw === null ? undefined : JSON.parse(raw);
        },
        set: function (value) {
            cellValue = value;
            cellCached = true;
            cellSet(value === undefined ? undefined : JSON.stringify(value));
        },
    });
    Object.defineProperty(g, '__tether_next_completion', {
        value: function (fire) {
            const cb = pending.shift();
            if (fire && cb !== undefined && cb !== null) {
                cb();
            }
        },
    });
    g.console = {
        log: function () {
            printRaw(Array.prototype.map.call(arguments, function (v) {
                if (typeof v === 'object' && v !== null) {
                    return JSON.stringify(v);
                }
                return String(v);
            }).join(' '));
        },
    };
    g["__BRIDGE_NAME__"] = bridge;
})(globalThis);
"#;

/// Install the bridge bindings into the script context
pub(crate) fn create_bridge_bindings<'js, F>(
    ctx: &Ctx<'js>,
    globals: &Object<'js>,
    bridge: &Bridge,
    handler: Arc<F>,
    sink: OutputSink,
    pending: Rc<RefCell<VecDeque<AlertTicket>>>,
    config: &ScriptConfig,
) -> Result<(), ScriptError>
where
    F: Fn(HostRequest) -> HostResponse + Send + Sync + 'static,
{
    let init = |e: rquickjs::Error| ScriptError::InitError(e.to_string());

    // Argument store, one own property per entry
    let args_obj = Object::new(ctx.clone()).map_err(init)?;
    for (key, value) in bridge.args().iter() {
        args_obj.set(key, value).map_err(init)?;
    }
    globals.set("__tether_args", args_obj).map_err(init)?;

    // Cell accessors; values travel as JSON text
    let cell = bridge.cell().clone();
    let cell_get = Func::from(move || -> Option<String> { cell_to_json_text(&cell.get()) });
    globals.set("__tether_cell_get", cell_get).map_err(init)?;

    let cell = bridge.cell().clone();
    let cell_set = Func::from(move |raw: Option<String>| {
        cell.set(match raw {
            None => CellValue::Empty,
            Some(text) => cell_from_json_text(&text),
        });
    });
    globals.set("__tether_cell_set", cell_set).map_err(init)?;

    // Alert: validate the request, ask the host to present it, queue the
    // completion ticket. The prelude queues the callback under the same
    // condition, keeping both FIFOs aligned.
    let handler_clone = handler.clone();
    let pending_clone = pending.clone();
    let alert_fn = Func::from(move |payload: String| -> Option<String> {
        let request = match parse_alert_payload(&payload) {
            Ok(request) => request,
            Err(e) => return Some(e.to_string()),
        };
        match handler_clone(HostRequest::PresentAlert { request }) {
            HostResponse::AlertPending(ticket) => {
                pending_clone.borrow_mut().push_back(ticket);
                None
            }
            HostResponse::Error(e) => Some(e.to_string()),
            HostResponse::Ok => Some("alert: host returned no completion ticket".into()),
        }
    });
    globals.set("__tether_alert", alert_fn).map_err(init)?;

    // routeTo: reject bad targets before touching the host
    let handler_clone = handler.clone();
    let route_fn = Func::from(move |url: String| -> Option<String> {
        if let Err(e) = validate_route_target(&url) {
            return Some(e.to_string());
        }
        match handler_clone(HostRequest::RouteTo { url }) {
            HostResponse::Ok => None,
            HostResponse::Error(e) => Some(e.to_string()),
            HostResponse::AlertPending(_) => Some("routeTo: unexpected host response".into()),
        }
    });
    globals.set("__tether_route_to", route_fn).map_err(init)?;

    let print_fn = Func::from(move |message: String| sink.emit(&message));
    globals.set("__tether_print", print_fn).map_err(init)?;

    let prelude = BRIDGE_PRELUDE.replace("__BRIDGE_NAME__", &config.global_name);
    ctx.eval::<(), _>(prelude)
        .map_err(|e| ScriptError::InitError(format!("bridge prelude: {e}")))?;

    Ok(())
}

fn cell_to_json_text(value: &CellValue) -> Option<String> {
    value.to_json().map(|v| v.to_string())
}

fn cell_from_json_text(text: &str) -> CellValue {
    match serde_json::from_str(text) {
        Ok(value) => CellValue::from_json(value),
        // JSON.stringify output should always parse; keep the raw text
        // rather than dropping the write
        Err(_) => CellValue::Text(text.to_string()),
    }
}

/// Parse the JSON alert payload the prelude builds from the script's
/// request object. `title` and `action` must be strings; `message`
/// accepts any value and is converted to its display string form.
fn parse_alert_payload(payload: &str) -> Result<AlertRequest, BridgeError> {
    let root: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| BridgeError::InvalidRequest(format!("alert request: {e}")))?;
    let obj = root
        .as_object()
        .ok_or_else(|| BridgeError::InvalidRequest("alert request must be an object".into()))?;
    let title = obj
        .get("title")
        .and_then(serde_json::Value::as_str)
        .ok_or(BridgeError::MissingField("title"))?;
    let action = obj
        .get("action")
        .and_then(serde_json::Value::as_str)
        .ok_or(BridgeError::MissingField("action"))?;
    let message = obj
        .get("message")
        .map(|v| CellValue::from_json(v.clone()).display_string())
        .unwrap_or_default();
    Ok(AlertRequest::new(title, message, action))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_payload_with_string_fields() {
        let request =
            parse_alert_payload(r#"{"title":"Title","message":"hello","action":"ok"}"#)
                .expect("parse");
        assert_eq!(request.title, "Title");
        assert_eq!(request.message, "hello");
        assert_eq!(request.action_label, "ok");
    }

    #[test]
    fn alert_payload_stringifies_numeric_message() {
        let request = parse_alert_payload(r#"{"title":"T","message":123,"action":"ok"}"#)
            .expect("parse");
        assert_eq!(request.message, "123");
    }

    #[test]
    fn alert_payload_stringifies_structured_message() {
        let request =
            parse_alert_payload(r#"{"title":"T","message":{"x":[1,2]},"action":"ok"}"#)
                .expect("parse");
        assert_eq!(request.message, r#"{"x":[1,2]}"#);
    }

    #[test]
    fn alert_payload_requires_title_and_action() {
        assert_eq!(
            parse_alert_payload(r#"{"message":"m","action":"ok"}"#),
            Err(BridgeError::MissingField("title"))
        );
        assert_eq!(
            parse_alert_payload(r#"{"title":"T","message":"m"}"#),
            Err(BridgeError::MissingField("action"))
        );
        assert_eq!(
            parse_alert_payload(r#"{"title":7,"message":"m","action":"ok"}"#),
            Err(BridgeError::MissingField("title"))
        );
    }

    #[test]
    fn alert_payload_message_is_optional() {
        let request = parse_alert_payload(r#"{"title":"T","action":"ok"}"#).expect("parse");
        assert_eq!(request.message, "");
    }

    #[test]
    fn cell_json_text_round_trip() {
        let values = [
            CellValue::Number(123.0),
            CellValue::Text("hi".into()),
            CellValue::Structured(serde_json::json!({"a": [1, 2, 3]})),
        ];
        for value in values {
            let text = cell_to_json_text(&value).expect("non-empty");
            assert_eq!(cell_from_json_text(&text), value);
        }
        assert_eq!(cell_to_json_text(&CellValue::Empty), None);
    }

    #[test]
    fn fresh_cells_are_independent() {
        let a = SharedCell::new();
        let b = SharedCell::new();
        a.set(CellValue::Number(1.0));
        assert!(b.get().is_empty());
        assert_eq!(a.get(), CellValue::Number(1.0));
    }
}
