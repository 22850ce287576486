//! Serializing owner of the classroom.
//!
//! The [`Coordinator`] task owns the [`Classroom`] and applies connection
//! commands and countdown ticks strictly one at a time. Connection tasks talk
//! to it through a cloneable [`CoordinatorHandle`].

use pollcast_protocol::ClientFrame;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::classroom::{Classroom, ClassroomConfig, ClassroomStats};
use crate::dispatch::{OutboundReceiver, OutboundSender};
use crate::ids::generate_id;
use crate::timer::TickTicket;

/// Coordinator errors.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The coordinator task has exited.
    #[error("Coordinator stopped")]
    Stopped,
}

enum Command {
    Connect {
        connection_id: String,
        sender: OutboundSender,
    },
    Frame {
        connection_id: String,
        frame: ClientFrame,
    },
    Disconnect {
        connection_id: String,
    },
    Stats {
        reply: oneshot::Sender<ClassroomStats>,
    },
}

/// The classroom actor.
pub struct Coordinator {
    classroom: Classroom,
    commands: mpsc::UnboundedReceiver<Command>,
    ticks: mpsc::UnboundedReceiver<TickTicket>,
}

impl Coordinator {
    /// Create a coordinator and the handle used to reach it.
    #[must_use]
    pub fn new(config: ClassroomConfig) -> (Self, CoordinatorHandle) {
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (tick_tx, ticks) = mpsc::unbounded_channel();
        let coordinator = Self {
            classroom: Classroom::new(config, tick_tx),
            commands,
            ticks,
        };
        (coordinator, CoordinatorHandle { commands: command_tx })
    }

    /// Spawn a coordinator on the current runtime.
    #[must_use]
    pub fn spawn(config: ClassroomConfig) -> CoordinatorHandle {
        let (coordinator, handle) = Self::new(config);
        tokio::spawn(coordinator.run());
        handle
    }

    /// Process inputs until every handle is dropped.
    pub async fn run(mut self) {
        info!("Coordinator started");
        loop {
            tokio::select! {
                biased;

                Some(ticket) = self.ticks.recv() => self.classroom.tick(ticket),

                command = self.commands.recv() => match command {
                    Some(command) => self.apply(command),
                    None => break,
                },
            }
        }
        info!("Coordinator stopped");
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Connect {
                connection_id,
                sender,
            } => self.classroom.connect(&connection_id, sender),
            Command::Frame {
                connection_id,
                frame,
            } => {
                debug!(connection = %connection_id, command = frame.kind(), "Command");
                self.classroom.handle(&connection_id, frame);
            }
            Command::Disconnect { connection_id } => self.classroom.disconnect(&connection_id),
            Command::Stats { reply } => {
                let _ = reply.send(self.classroom.stats());
            }
        }
    }
}

/// Cloneable handle to a running coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl CoordinatorHandle {
    /// Register a new connection.
    ///
    /// Returns the generated connection id and the connection's outbound
    /// queue, whose first frame is `connected`.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinator has stopped.
    pub fn connect(&self) -> Result<(String, OutboundReceiver), CoordinatorError> {
        let connection_id = generate_id("conn");
        let (sender, receiver) = mpsc::unbounded_channel();
        self.send_command(Command::Connect {
            connection_id: connection_id.clone(),
            sender,
        })?;
        Ok((connection_id, receiver))
    }

    /// Forward a decoded client frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinator has stopped.
    pub fn send(&self, connection_id: &str, frame: ClientFrame) -> Result<(), CoordinatorError> {
        self.send_command(Command::Frame {
            connection_id: connection_id.to_string(),
            frame,
        })
    }

    /// Report a closed connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinator has stopped.
    pub fn disconnect(&self, connection_id: &str) -> Result<(), CoordinatorError> {
        self.send_command(Command::Disconnect {
            connection_id: connection_id.to_string(),
        })
    }

    /// Fetch classroom counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinator has stopped.
    pub async fn stats(&self) -> Result<ClassroomStats, CoordinatorError> {
        let (reply, rx) = oneshot::channel();
        self.send_command(Command::Stats { reply })?;
        rx.await.map_err(|_| CoordinatorError::Stopped)
    }

    fn send_command(&self, command: Command) -> Result<(), CoordinatorError> {
        self.commands
            .send(command)
            .map_err(|_| CoordinatorError::Stopped)
    }
}
