//! Drives a [`RecordingSession`] against the detection service
//!
//! The driver owns the connection and the installer. It turns operator
//! commands and server messages into session events and executes the
//! effects the session returns.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use tapunlock_utils::{monotonic_nanos, Result};

use super::state::{Effect, Event, Notice, RecordingSession};
use crate::commands::Command;
use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::installer::PatternInstaller;

/// Reconnect policy
#[derive(Debug, Clone, Copy)]
struct Backoff {
    delay: Duration,
    max_attempts: u32,
    /// Failed attempts since the last successful handshake
    attempts: u32,
}

pub struct Recorder<I: PatternInstaller> {
    session: RecordingSession,
    connection: Connection,
    installer: I,
    client_id: Uuid,
    handshake_timeout: Duration,
    backoff: Backoff,
    reconnect_at: Option<Instant>,
    notices: mpsc::Sender<Notice>,
}

impl<I: PatternInstaller> Recorder<I> {
    pub fn new(config: &ClientConfig, installer: I, notices: mpsc::Sender<Notice>) -> Self {
        Self {
            session: RecordingSession::new(config.recording.cutoff_nanos()),
            connection: Connection::with_socket_path(config.connection.socket_path()),
            installer,
            client_id: Uuid::new_v4(),
            handshake_timeout: config.connection.handshake_timeout(),
            backoff: Backoff {
                delay: config.connection.reconnect_delay(),
                max_attempts: config.connection.max_reconnect_attempts,
                attempts: 0,
            },
            reconnect_at: None,
            notices,
        }
    }

    /// Process commands until the command channel closes
    ///
    /// Transport failures are retried. Only errors that a reconnect cannot
    /// fix, such as a protocol mismatch, end the loop early.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> Result<()> {
        if !self.try_connect().await? {
            self.dispatch(Event::ConnectionLost).await;
        }

        loop {
            let connected = self.connection.is_connected();
            let deadline = self.reconnect_at;

            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.on_command(command).await?,
                    None => break,
                },

                msg = self.connection.recv(), if connected => match msg {
                    Some(msg) => self.dispatch(Event::Server(msg)).await,
                    None => {
                        info!("Detection service closed the connection");
                        self.connection.disconnect().await;
                        self.dispatch(Event::ConnectionLost).await;
                    }
                },

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.reconnect_at = None;
                    if !self.try_connect().await? {
                        self.schedule_reconnect().await;
                    }
                }
            }
        }

        self.connection.disconnect().await;
        debug!("Recorder stopped in state {}", self.session.state().name());
        Ok(())
    }

    async fn on_command(&mut self, command: Command) -> Result<()> {
        let event = match command {
            Command::Start => Event::Start {
                now: monotonic_nanos(),
            },
            Command::Stop => Event::Stop {
                now: monotonic_nanos(),
            },
            Command::Confirm => Event::Confirm,
            Command::Retry => Event::Retry,
            Command::Finish => Event::Finish,
            Command::Connect => {
                if self.connection.is_connected() {
                    self.notify(Notice::ServiceAvailable).await;
                } else {
                    self.backoff.attempts = 0;
                    self.reconnect_at = None;
                    if !self.try_connect().await? {
                        self.dispatch(Event::ConnectionLost).await;
                    }
                }
                return Ok(());
            }
            Command::Status => {
                let status = Notice::Status {
                    state: self.session.state().name(),
                    connected: self.session.is_connected(),
                };
                self.notify(status).await;
                return Ok(());
            }
            Command::Help | Command::Quit => return Ok(()),
        };

        self.dispatch(event).await;
        Ok(())
    }

    /// Connect and handshake once; `Ok(false)` means try again later
    async fn try_connect(&mut self) -> Result<bool> {
        match self
            .connection
            .connect_and_handshake(self.client_id, self.handshake_timeout)
            .await
        {
            Ok(_) => {
                self.backoff.attempts = 0;
                self.dispatch(Event::Connected).await;
                Ok(true)
            }
            Err(e) if e.is_retryable() => {
                self.backoff.attempts += 1;
                debug!(
                    "Connection attempt {} to {} failed: {}",
                    self.backoff.attempts,
                    self.connection.socket_path().display(),
                    e
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn schedule_reconnect(&mut self) {
        if self.reconnect_at.is_some() || self.connection.is_connected() {
            return;
        }
        if self.backoff.attempts >= self.backoff.max_attempts {
            warn!(
                "Giving up after {} connection attempts",
                self.backoff.attempts
            );
            self.notify(Notice::GaveUpReconnecting).await;
            return;
        }
        self.reconnect_at = Some(Instant::now() + self.backoff.delay);
    }

    /// Feed `event` to the session and execute what it asks for
    async fn dispatch(&mut self, event: Event) {
        let mut pending = VecDeque::from([event]);

        while let Some(event) = pending.pop_front() {
            for effect in self.session.handle(event) {
                match effect {
                    Effect::Send(msg) => {
                        let name = msg.type_name();
                        if let Err(e) = self.connection.send(msg).await {
                            warn!("Failed to send {}: {}", name, e);
                            if self.connection.is_connected() {
                                self.connection.disconnect().await;
                                pending.push_back(Event::ConnectionLost);
                            }
                        }
                    }
                    Effect::Notice(notice) => self.notify(notice).await,
                    Effect::Install(pattern) => match self.installer.install(&pattern) {
                        Ok(()) => self.notify(Notice::Installed).await,
                        Err(e) => {
                            warn!("Install failed: {}", e);
                            self.notify(Notice::InstallFailed(e.to_string())).await;
                            pending.push_back(Event::InstallFailed(pattern));
                        }
                    },
                    Effect::Reconnect => self.schedule_reconnect().await,
                }
            }
        }
    }

    async fn notify(&mut self, notice: Notice) {
        if self.notices.send(notice).await.is_err() {
            debug!("Notice receiver dropped");
        }
    }
}
