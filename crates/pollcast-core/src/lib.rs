//! # pollcast-core
//!
//! The realtime coordination service behind a live classroom poll.
//!
//! This crate provides the building blocks:
//!
//! - **Registry** - Connected participants and their answered flags
//! - **Results** - Per-option tallies for the active poll
//! - **Timer** - Cancelable one-second countdown
//! - **Classroom** - Poll lifecycle, history and termination rules
//! - **Chat** - Bounded chat log
//! - **Dispatcher** - In-order fan-out to every connection
//! - **Coordinator** - Actor that serializes commands and ticks
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐  commands  ┌─────────────┐        ┌─────────────┐
//! │  Connection │──────────▶│ Coordinator │───────▶│  Classroom  │
//! └─────────────┘            └─────────────┘        └─────────────┘
//!        ▲                          ▲                      │
//!        │                    ticks │   ┌──────────────────┤
//!        │                   ┌─────────────┐               ▼
//!        │                   │    Timer    │        ┌─────────────┐
//!        │                   └─────────────┘        │  Registry   │
//!        │                                          │  Results    │
//!        │          frames   ┌─────────────┐        │  Chat       │
//!        └───────────────────│ Dispatcher  │◀───────┴─────────────┘
//!                            └─────────────┘
//! ```

pub mod chat;
pub mod classroom;
pub mod coordinator;
pub mod dispatch;
pub mod ids;
pub mod poll;
pub mod registry;
pub mod results;
pub mod timer;

pub use chat::ChatLog;
pub use classroom::{Classroom, ClassroomConfig, ClassroomStats, PollPhase};
pub use coordinator::{Coordinator, CoordinatorError, CoordinatorHandle};
pub use dispatch::{Dispatcher, Outbound, OutboundReceiver};
pub use poll::{ActivePoll, PollError};
pub use registry::Registry;
pub use results::Results;
pub use timer::{Countdown, TickTicket, TimerHandle};
