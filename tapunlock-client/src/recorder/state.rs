//! Recording session state machine
//!
//! The session walks the operator through recording a pattern, confirming
//! it by tapping it again, and installing it:
//!
//! ```text
//! Init -> Recording -> PatternRecorded -> Confirming -> Final -> Init
//! ```
//!
//! [`RecordingSession::handle`] is a pure function of the current state and
//! one [`Event`]. It performs no I/O and never reads the clock; the caller
//! executes the returned [`Effect`]s.

use std::fmt;

use tracing::debug;

use tapunlock_protocol::{ClientMessage, ErrorCode, ServerMessage, TapPattern};

/// A recorded pattern, or the request that will deliver it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// Window requested, taps not yet received
    Pending,
    Ready(TapPattern),
}

/// Where the operator is in the recording flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Recording { started_at: u64 },
    PatternRecorded { candidate: Candidate },
    Confirming { pattern: TapPattern, subscription_id: u64 },
    Final { pattern: TapPattern },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Init => "init",
            SessionState::Recording { .. } => "recording",
            SessionState::PatternRecorded { .. } => "pattern recorded",
            SessionState::Confirming { .. } => "confirming",
            SessionState::Final { .. } => "confirmed",
        }
    }
}

/// Input to the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Operator starts recording at `now`
    Start { now: u64 },
    /// Operator stops recording at `now`
    Stop { now: u64 },
    Confirm,
    Retry,
    Finish,
    /// Handshake with the detection service completed
    Connected,
    /// Transport to the detection service failed
    ConnectionLost,
    /// Reply or push from the detection service
    Server(ServerMessage),
    /// The installer rejected the pattern handed out by `Finish`
    InstallFailed(TapPattern),
}

/// Work the caller must carry out
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Send(ClientMessage),
    Notice(Notice),
    /// Make the pattern the active one
    Install(TapPattern),
    /// Schedule a reconnect attempt
    Reconnect,
}

/// Why an operator command was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NotConnected,
    InvalidInState,
    EmptyPattern,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NotConnected => write!(f, "the detection service is not connected"),
            RejectReason::InvalidInState => write!(f, "not possible right now"),
            RejectReason::EmptyPattern => write!(f, "no taps were recorded"),
        }
    }
}

/// Something the operator should be told
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    ServiceAvailable,
    ServiceUnavailable,
    RecordingStarted,
    PatternRecorded(TapPattern),
    WaitingForConfirmation,
    Confirmed(TapPattern),
    Installed,
    InstallFailed(String),
    GaveUpReconnecting,
    Status { state: &'static str, connected: bool },
    ServerError { code: ErrorCode, message: String },
    Rejected(RejectReason),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::ServiceAvailable => write!(f, "connected to the detection service"),
            Notice::ServiceUnavailable => {
                write!(f, "detection service unavailable, retrying ('connect' to retry now)")
            }
            Notice::RecordingStarted => write!(f, "recording, tap your pattern then type 'stop'"),
            Notice::PatternRecorded(p) if p.is_empty() => {
                write!(f, "no taps recorded, type 'retry' to record again")
            }
            Notice::PatternRecorded(p) => write!(
                f,
                "recorded {} taps: {} ('confirm' or 'retry')",
                p.size(),
                p
            ),
            Notice::WaitingForConfirmation => write!(f, "tap the pattern again to confirm it"),
            Notice::Confirmed(_) => write!(f, "pattern confirmed ('finish' to install, 'retry' to start over)"),
            Notice::Installed => write!(f, "pattern installed"),
            Notice::InstallFailed(e) => {
                write!(f, "failed to install pattern: {} ('finish' to try again)", e)
            }
            Notice::GaveUpReconnecting => {
                write!(f, "gave up reconnecting, type 'connect' to try again")
            }
            Notice::Status { state, connected } => write!(
                f,
                "{}, {}",
                state,
                if *connected { "connected" } else { "disconnected" }
            ),
            Notice::ServerError { code, message } => {
                write!(f, "detection service error ({:?}): {}", code, message)
            }
            Notice::Rejected(reason) => write!(f, "rejected: {}", reason),
        }
    }
}

/// One operator's pass through recording and confirming a pattern
#[derive(Debug)]
pub struct RecordingSession {
    state: SessionState,
    connected: bool,
    /// Last subscription id handed out; ids only grow
    last_subscription_id: u64,
    /// Taps within this distance of `Stop` are left out of the window
    cutoff_ns: u64,
}

impl RecordingSession {
    pub fn new(cutoff_ns: u64) -> Self {
        Self {
            state: SessionState::Init,
            connected: false,
            last_subscription_id: 0,
            cutoff_ns,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Apply one event and return the effects to execute, in order
    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::Start { now } => self.on_start(now),
            Event::Stop { now } => self.on_stop(now),
            Event::Confirm => self.on_confirm(),
            Event::Retry => self.on_retry(),
            Event::Finish => self.on_finish(),
            Event::Connected => {
                self.connected = true;
                vec![Effect::Notice(Notice::ServiceAvailable)]
            }
            Event::ConnectionLost => self.on_connection_lost(),
            Event::Server(msg) => self.on_server_message(msg),
            Event::InstallFailed(pattern) => self.on_install_failed(pattern),
        }
    }

    fn reject(reason: RejectReason) -> Vec<Effect> {
        vec![Effect::Notice(Notice::Rejected(reason))]
    }

    fn on_start(&mut self, now: u64) -> Vec<Effect> {
        if self.state != SessionState::Init {
            return Self::reject(RejectReason::InvalidInState);
        }
        if !self.connected {
            return Self::reject(RejectReason::NotConnected);
        }

        self.state = SessionState::Recording { started_at: now };
        vec![Effect::Send(ClientMessage::BeginRecording {
            from_timestamp: now,
        })]
    }

    fn on_stop(&mut self, now: u64) -> Vec<Effect> {
        let SessionState::Recording { started_at } = self.state else {
            return Self::reject(RejectReason::InvalidInState);
        };

        // Never ask for a window that ends before it starts
        let until = now.saturating_sub(self.cutoff_ns).max(started_at);
        self.state = SessionState::PatternRecorded {
            candidate: Candidate::Pending,
        };
        vec![Effect::Send(ClientMessage::RequestTapsInWindow {
            from_timestamp: started_at,
            until_timestamp: until,
        })]
    }

    fn on_confirm(&mut self) -> Vec<Effect> {
        let SessionState::PatternRecorded {
            candidate: Candidate::Ready(pattern),
        } = &self.state
        else {
            return Self::reject(RejectReason::InvalidInState);
        };
        if !self.connected {
            return Self::reject(RejectReason::NotConnected);
        }
        if pattern.is_empty() {
            return Self::reject(RejectReason::EmptyPattern);
        }

        let pattern = pattern.clone();
        self.last_subscription_id += 1;
        let subscription_id = self.last_subscription_id;
        let wire = pattern.to_wire();
        self.state = SessionState::Confirming {
            pattern,
            subscription_id,
        };
        vec![Effect::Send(ClientMessage::WatchForMatch {
            subscription_id,
            pattern: wire,
        })]
    }

    fn on_retry(&mut self) -> Vec<Effect> {
        match std::mem::replace(&mut self.state, SessionState::Init) {
            SessionState::Init => Self::reject(RejectReason::InvalidInState),
            SessionState::Recording { .. } => self.unsubscribe(),
            SessionState::PatternRecorded { .. } | SessionState::Final { .. } => Vec::new(),
            SessionState::Confirming { pattern, .. } => {
                self.state = SessionState::PatternRecorded {
                    candidate: Candidate::Ready(pattern),
                };
                self.unsubscribe()
            }
        }
    }

    fn unsubscribe(&self) -> Vec<Effect> {
        if self.connected {
            vec![Effect::Send(ClientMessage::Unsubscribe)]
        } else {
            Vec::new()
        }
    }

    fn on_finish(&mut self) -> Vec<Effect> {
        match std::mem::replace(&mut self.state, SessionState::Init) {
            SessionState::Final { pattern } => vec![Effect::Install(pattern)],
            other => {
                self.state = other;
                Self::reject(RejectReason::InvalidInState)
            }
        }
    }

    /// Hand the confirmed pattern back so `Finish` can be repeated
    fn on_install_failed(&mut self, pattern: TapPattern) -> Vec<Effect> {
        if self.state == SessionState::Init {
            self.state = SessionState::Final { pattern };
        } else {
            debug!(
                "Install failure arrived in state {}, keeping it",
                self.state.name()
            );
        }
        Vec::new()
    }

    /// Fall back to the last state that does not depend on the service
    fn revert_in_flight(&mut self) {
        self.state = match std::mem::replace(&mut self.state, SessionState::Init) {
            SessionState::Recording { .. }
            | SessionState::PatternRecorded {
                candidate: Candidate::Pending,
            } => SessionState::Init,
            SessionState::Confirming { pattern, .. } => SessionState::PatternRecorded {
                candidate: Candidate::Ready(pattern),
            },
            unchanged => unchanged,
        };
    }

    fn on_connection_lost(&mut self) -> Vec<Effect> {
        self.connected = false;
        self.revert_in_flight();
        vec![
            Effect::Notice(Notice::ServiceUnavailable),
            Effect::Reconnect,
        ]
    }

    fn on_server_message(&mut self, msg: ServerMessage) -> Vec<Effect> {
        match (&self.state, msg) {
            (
                SessionState::Recording { started_at },
                ServerMessage::RecordingStarted { from_timestamp },
            ) if *started_at == from_timestamp => vec![Effect::Notice(Notice::RecordingStarted)],

            (
                SessionState::PatternRecorded {
                    candidate: Candidate::Pending,
                },
                ServerMessage::TapsInWindow { pattern },
            ) => match TapPattern::try_from(pattern) {
                Ok(pattern) => {
                    self.state = SessionState::PatternRecorded {
                        candidate: Candidate::Ready(pattern.clone()),
                    };
                    vec![Effect::Notice(Notice::PatternRecorded(pattern))]
                }
                Err(e) => {
                    self.state = SessionState::Init;
                    vec![Effect::Notice(Notice::ServerError {
                        code: ErrorCode::MalformedPattern,
                        message: e.to_string(),
                    })]
                }
            },

            (
                SessionState::Confirming {
                    subscription_id, ..
                },
                ServerMessage::Watching {
                    subscription_id: id,
                },
            ) if *subscription_id == id => vec![Effect::Notice(Notice::WaitingForConfirmation)],

            (
                SessionState::Confirming {
                    pattern,
                    subscription_id,
                },
                ServerMessage::Match {
                    subscription_id: id,
                    ..
                },
            ) if *subscription_id == id => {
                let pattern = pattern.clone();
                self.state = SessionState::Final {
                    pattern: pattern.clone(),
                };
                let mut effects = self.unsubscribe();
                effects.push(Effect::Notice(Notice::Confirmed(pattern)));
                effects
            }

            (_, ServerMessage::Match {
                subscription_id, ..
            }) => {
                debug!("Discarding match for stale subscription {}", subscription_id);
                Vec::new()
            }

            (_, ServerMessage::Error { code, message }) => {
                self.revert_in_flight();
                vec![Effect::Notice(Notice::ServerError { code, message })]
            }

            (state, other) => {
                debug!("Ignoring {} in state {}", other.type_name(), state.name());
                Vec::new()
            }
        }
    }
}
