//! QuickJS runtime with sandbox limits

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rquickjs::{Context, Runtime};
use tokio::sync::mpsc;

use crate::bindings::{create_bridge_bindings, Bridge, OutputSink};
use crate::{
    HostRequest, HostResponse, ScriptConfig, ScriptError, ScriptEvent, ScriptResult, ScriptStatus,
};
use tether_protocol::{AlertTicket, RunId};

/// Thread-safe cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Script execution context with host communication
pub struct ScriptHost {
    config: ScriptConfig,
    cancellation: CancellationToken,
}

impl ScriptHost {
    pub fn new(config: ScriptConfig) -> Self {
        Self {
            config,
            cancellation: CancellationToken::new(),
        }
    }

    /// Get the cancellation token for this host
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Execute a script against a bridge.
    ///
    /// The host handler services native requests (alert presentation, URL
    /// dispatch). Alert completions are delivered back into the script on
    /// the same logical thread after top-level evaluation finishes, in
    /// issue order, exactly once per presented prompt.
    pub async fn execute<F>(
        &self,
        run_id: RunId,
        source: &str,
        bridge: Bridge,
        host_handler: F,
        event_sender: mpsc::Sender<ScriptEvent>,
    ) -> Result<ScriptResult, ScriptError>
    where
        F: Fn(HostRequest) -> HostResponse + Send + Sync + 'static,
    {
        let config = self.config.clone();
        let cancellation = self.cancellation.clone();
        let source = source.to_string();
        let handler = Arc::new(host_handler);
        let events = event_sender.clone();

        // Run the script in a blocking task
        let handle = tokio::task::spawn_blocking(move || {
            execute_script_sync(run_id, &source, &config, &cancellation, &bridge, handler, events)
        });

        // Wait with timeout
        let timeout = Duration::from_millis(self.config.timeout_ms);
        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(result)) => {
                let status = match &result {
                    Ok(_) => ScriptStatus::Success,
                    Err(ScriptError::Cancelled) => ScriptStatus::Cancelled,
                    Err(ScriptError::Timeout) => ScriptStatus::Timeout,
                    Err(e) => ScriptStatus::Error {
                        message: e.to_string(),
                    },
                };
                let _ = event_sender
                    .send(ScriptEvent::Finished { run_id, status })
                    .await;
                result
            }
            Ok(Err(e)) => {
                let _ = event_sender
                    .send(ScriptEvent::Finished {
                        run_id,
                        status: ScriptStatus::Error {
                            message: e.to_string(),
                        },
                    })
                    .await;
                Err(ScriptError::InitError(e.to_string()))
            }
            Err(_) => {
                // Timeout - cancel the script
                self.cancellation.cancel();
                let _ = event_sender
                    .send(ScriptEvent::Finished {
                        run_id,
                        status: ScriptStatus::Timeout,
                    })
                    .await;
                Err(ScriptError::Timeout)
            }
        }
    }

    /// Cancel a running script
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }
}

impl Default for ScriptHost {
    fn default() -> Self {
        Self::new(ScriptConfig::default())
    }
}

/// Synchronous script execution (runs in blocking task)
fn execute_script_sync<F>(
    run_id: RunId,
    source: &str,
    config: &ScriptConfig,
    cancellation: &CancellationToken,
    bridge: &Bridge,
    host_handler: Arc<F>,
    events: mpsc::Sender<ScriptEvent>,
) -> Result<ScriptResult, ScriptError>
where
    F: Fn(HostRequest) -> HostResponse + Send + Sync + 'static,
{
    // Create runtime with memory limit
    let runtime = Runtime::new().map_err(|e| ScriptError::InitError(e.to_string()))?;
    runtime.set_memory_limit(config.memory_limit);

    // Set up interrupt handler for cancellation and timeout
    let start_time = Instant::now();
    let timeout_ms = config.timeout_ms;
    let cancel_flag = cancellation.clone();

    runtime.set_interrupt_handler(Some(Box::new(move || {
        if cancel_flag.is_cancelled() {
            return true; // Interrupt
        }
        if start_time.elapsed().as_millis() as u64 > timeout_ms {
            return true; // Interrupt
        }
        false // Continue
    })));

    // Create context
    let context = Context::full(&runtime).map_err(|e| ScriptError::InitError(e.to_string()))?;

    // Collected output and pending alert completions, FIFO
    let output = Rc::new(RefCell::new(String::new()));
    let pending: Rc<RefCell<VecDeque<AlertTicket>>> = Rc::new(RefCell::new(VecDeque::new()));
    let mut return_value = None;

    // Execute in context
    let result = context.with(|ctx| {
        let globals = ctx.globals();
        let sink = OutputSink::new(run_id, output.clone(), events);

        create_bridge_bindings(
            &ctx,
            &globals,
            bridge,
            host_handler,
            sink,
            pending.clone(),
            config,
        )?;

        // Evaluate the script's top-level code
        match ctx.eval::<rquickjs::Value, _>(source) {
            Ok(val) => {
                // Try to convert return value to string
                if !val.is_undefined() && !val.is_null() {
                    if let Ok(s) = val.get::<String>() {
                        return_value = Some(s);
                    } else if let Ok(n) = val.get::<f64>() {
                        return_value = Some(n.to_string());
                    } else if let Ok(b) = val.get::<bool>() {
                        return_value = Some(b.to_string());
                    }
                }
            }
            Err(e) => {
                return Err(classify_eval_error(e, cancellation, start_time, timeout_ms));
            }
        }

        // Deliver alert completions on this same thread, in issue order
        deliver_completions(&ctx, &pending, cancellation, start_time, timeout_ms)
    });

    result?;

    let output_str = output.borrow().clone();
    Ok(ScriptResult {
        output: output_str,
        return_value,
    })
}

/// Drain pending alert completions, invoking each queued callback after
/// its prompt finishes. Callbacks may issue further bridge calls,
/// including new alerts; the loop runs until the queue is empty.
fn deliver_completions(
    ctx: &rquickjs::Ctx<'_>,
    pending: &Rc<RefCell<VecDeque<AlertTicket>>>,
    cancellation: &CancellationToken,
    start_time: Instant,
    timeout_ms: u64,
) -> Result<(), ScriptError> {
    loop {
        if cancellation.is_cancelled() {
            return Err(ScriptError::Cancelled);
        }
        if start_time.elapsed().as_millis() as u64 > timeout_ms {
            return Err(ScriptError::Timeout);
        }
        let Some(ticket) = pending.borrow_mut().pop_front() else {
            return Ok(());
        };
        if ticket.wait() {
            ctx.eval::<(), _>("__tether_next_completion(true)")
                .map_err(|e| classify_eval_error(e, cancellation, start_time, timeout_ms))?;
        } else {
            // Presenter went away without completing; the completion is
            // never delivered. Shift the callback queue to stay aligned.
            tracing::debug!("alert completer dropped before completion");
            ctx.eval::<(), _>("__tether_next_completion(false)")
                .map_err(|e| classify_eval_error(e, cancellation, start_time, timeout_ms))?;
        }
    }
}

fn classify_eval_error(
    error: rquickjs::Error,
    cancellation: &CancellationToken,
    start_time: Instant,
    timeout_ms: u64,
) -> ScriptError {
    if cancellation.is_cancelled() {
        ScriptError::Cancelled
    } else if start_time.elapsed().as_millis() as u64 > timeout_ms {
        ScriptError::Timeout
    } else {
        ScriptError::JsError(error.to_string())
    }
}
