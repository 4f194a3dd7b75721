use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use serde::Deserialize;

/// Events surfaced by a service subprocess, already decoded from the JSONL
/// wire contract. Malformed lines are reported as `System` text instead of
/// being silently dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    Progress(WireProgress),
    ChatReply {
        content: String,
        tokens_used: Option<u32>,
        processing_time_ms: Option<u32>,
    },
    System(String),
    Failed {
        code: WireErrorCode,
        message: String,
    },
    Completed {
        success: bool,
        exit_code: i32,
    },
}

/// Typed wire error codes. Unrecognized codes collapse to `Internal` rather
/// than failing deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireErrorCode {
    Connectivity,
    RateLimited,
    #[serde(other)]
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    Progress(WireProgress),
    ChatReply {
        content: String,
        #[serde(default)]
        tokens_used: Option<u32>,
        #[serde(default)]
        processing_time_ms: Option<u32>,
    },
    Error {
        code: WireErrorCode,
        #[serde(default)]
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WireProgress {
    pub step: String,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub current_step: Option<u32>,
    #[serde(default)]
    pub total_steps: Option<u32>,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub result: Option<WireStepResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WireStepResult {
    #[serde(default)]
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone)]
pub struct ServiceCommandConfig {
    pub program: String,
    pub args_prefix: Vec<String>,
    pub probe_args: Vec<String>,
}

/// Channel adapter around one service subprocess family. Each request spawns
/// the configured program with the JSON request as the final argument, parses
/// stdout as JSONL events, and forwards stderr lines as system text.
pub struct ServiceAdapter {
    config: ServiceCommandConfig,
    event_tx: Sender<ServiceEvent>,
    event_rx: Receiver<ServiceEvent>,
    cancelled: Arc<AtomicBool>,
}

impl ServiceAdapter {
    pub fn with_config(config: ServiceCommandConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        Self {
            config,
            event_tx,
            event_rx,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Synchronous connectivity probe. Runs the program with the probe
    /// arguments and reports whether it exited cleanly.
    pub fn probe(&self) -> bool {
        Command::new(&self.config.program)
            .args(&self.config.probe_args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    pub fn send_request(&self, request: String) {
        let config = self.config.clone();
        let tx = self.event_tx.clone();
        let cancelled = self.cancelled.clone();
        cancelled.store(false, Ordering::SeqCst);
        thread::spawn(move || {
            let mut command = Command::new(&config.program);
            command
                .args(&config.args_prefix)
                .arg(request)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());

            let mut child = match command.spawn() {
                Ok(child) => child,
                Err(err) => {
                    let _ = tx.send(ServiceEvent::System(format!(
                        "Service adapter failed to start: {err}"
                    )));
                    let _ = tx.send(ServiceEvent::Failed {
                        code: WireErrorCode::Connectivity,
                        message: format!("could not launch {}", config.program),
                    });
                    let _ = tx.send(ServiceEvent::Completed {
                        success: false,
                        exit_code: -1,
                    });
                    return;
                }
            };

            let mut readers = Vec::new();
            if let Some(stdout) = child.stdout.take() {
                readers.push(spawn_event_reader(stdout, tx.clone(), cancelled.clone()));
            }
            if let Some(stderr) = child.stderr.take() {
                readers.push(spawn_stderr_reader(stderr, tx.clone(), cancelled.clone()));
            }

            let wait_result = child.wait();
            for reader in readers {
                let _ = reader.join();
            }
            if cancelled.load(Ordering::SeqCst) {
                return;
            }
            match wait_result {
                Ok(status) => {
                    let exit_code = status.code().unwrap_or(-1);
                    let _ = tx.send(ServiceEvent::Completed {
                        success: status.success(),
                        exit_code,
                    });
                    if !status.success() {
                        let _ = tx.send(ServiceEvent::System(format!(
                            "Service exited with status code {exit_code}"
                        )));
                    }
                }
                Err(err) => {
                    let _ = tx.send(ServiceEvent::System(format!(
                        "Service adapter failed while waiting for process: {err}"
                    )));
                    let _ = tx.send(ServiceEvent::Completed {
                        success: false,
                        exit_code: -1,
                    });
                }
            }
        });
    }

    pub fn drain_events_limited(&self, max_events: usize) -> Vec<ServiceEvent> {
        let mut events = Vec::new();
        if max_events == 0 {
            return events;
        }
        while events.len() < max_events {
            let Ok(event) = self.event_rx.try_recv() else {
                break;
            };
            events.push(event);
        }
        events
    }

    /// Stops event delivery for the in-flight request. The subprocess is left
    /// to exit on its own; its remaining output is discarded.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

fn spawn_event_reader<R: std::io::Read + Send + 'static>(
    reader: R,
    tx: Sender<ServiceEvent>,
    cancelled: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for line in BufReader::new(reader).lines().map_while(Result::ok) {
            if cancelled.load(Ordering::SeqCst) {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            let _ = tx.send(decode_wire_line(&line));
        }
    })
}

fn spawn_stderr_reader<R: std::io::Read + Send + 'static>(
    reader: R,
    tx: Sender<ServiceEvent>,
    cancelled: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for line in BufReader::new(reader).lines().map_while(Result::ok) {
            if cancelled.load(Ordering::SeqCst) {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            let _ = tx.send(ServiceEvent::System(line));
        }
    })
}

fn decode_wire_line(line: &str) -> ServiceEvent {
    match serde_json::from_str::<WireEvent>(line) {
        Ok(WireEvent::Progress(progress)) => ServiceEvent::Progress(progress),
        Ok(WireEvent::ChatReply {
            content,
            tokens_used,
            processing_time_ms,
        }) => ServiceEvent::ChatReply {
            content,
            tokens_used,
            processing_time_ms,
        },
        Ok(WireEvent::Error { code, message }) => ServiceEvent::Failed { code, message },
        Err(_) => ServiceEvent::System(format!("Unparseable service line: {line}")),
    }
}

#[cfg(test)]
#[path = "../tests/unit/backend_tests.rs"]
mod tests;
