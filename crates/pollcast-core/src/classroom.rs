//! Poll lifecycle for a single classroom.
//!
//! [`Classroom`] owns every piece of mutable state: roster, active poll,
//! countdown, history, chat and the dispatcher. It is driven one input at a
//! time by the coordinator, so each command or tick is applied atomically.
//!
//! ```text
//!             create                 timeout / all answered
//!   NoPoll ───────────▶ Active ──────────────────────────▶ Ended
//!     ▲                  │  ▲                                │
//!     │      clear       │  └────────── create ──────────────┤
//!     └──────────────────┴─────────────── clear ─────────────┘
//! ```

use pollcast_protocol::{
    ChatMessage, ClientFrame, Participant, Poll, Role, ServerFrame, PROTOCOL_VERSION,
};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::chat::{ChatLog, DEFAULT_CHAT_CAPACITY};
use crate::dispatch::{Dispatcher, OutboundSender};
use crate::ids::{generate_id, now_millis};
use crate::poll::{ActivePoll, PollError};
use crate::registry::Registry;
use crate::timer::{Countdown, TickTicket};

/// Classroom configuration.
#[derive(Debug, Clone)]
pub struct ClassroomConfig {
    /// Number of chat messages retained for late joiners.
    pub chat_capacity: usize,
    /// Countdown tick period.
    pub tick_period: Duration,
    /// Largest accepted poll time limit in seconds.
    pub max_time_limit_secs: u32,
}

impl Default for ClassroomConfig {
    fn default() -> Self {
        Self {
            chat_capacity: DEFAULT_CHAT_CAPACITY,
            tick_period: Duration::from_secs(1),
            max_time_limit_secs: 600,
        }
    }
}

/// Lifecycle phase of the current poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    NoPoll,
    Active,
    Ended,
}

/// Why an active poll finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndReason {
    Timeout,
    AllAnswered,
}

enum PollState {
    NoPoll,
    Active {
        poll: ActivePoll,
        countdown: Countdown,
    },
    Ended,
}

/// Point-in-time counters for health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassroomStats {
    /// Attached connections, joined or not.
    pub connections: usize,
    /// Students on the roster.
    pub participants: usize,
    /// Whether a poll is currently accepting answers.
    pub active_poll: bool,
    /// Completed polls in history.
    pub history_len: usize,
    /// Retained chat messages.
    pub chat_len: usize,
}

/// The authoritative classroom state.
pub struct Classroom {
    config: ClassroomConfig,
    registry: Registry,
    state: PollState,
    history: VecDeque<Poll>,
    chat: ChatLog,
    dispatcher: Dispatcher,
    ticks: mpsc::UnboundedSender<TickTicket>,
    next_generation: u64,
}

impl Classroom {
    /// Create a classroom whose countdown ticks are delivered to `ticks`.
    #[must_use]
    pub fn new(config: ClassroomConfig, ticks: mpsc::UnboundedSender<TickTicket>) -> Self {
        info!("Creating classroom with config: {:?}", config);
        Self {
            chat: ChatLog::with_capacity(config.chat_capacity),
            config,
            registry: Registry::new(),
            state: PollState::NoPoll,
            history: VecDeque::new(),
            dispatcher: Dispatcher::new(),
            ticks,
            next_generation: 0,
        }
    }

    /// Attach a new connection and greet it.
    pub fn connect(&mut self, connection_id: &str, sender: OutboundSender) {
        self.dispatcher.attach(connection_id, sender);
        self.dispatcher.send_to(
            connection_id,
            ServerFrame::connected(connection_id, PROTOCOL_VERSION),
        );
    }

    /// Detach a closed connection and drop it from the roster.
    pub fn disconnect(&mut self, connection_id: &str) {
        self.dispatcher.detach(connection_id);
        self.leave(connection_id);
    }

    /// Apply a client command.
    pub fn handle(&mut self, connection_id: &str, frame: ClientFrame) {
        match frame {
            ClientFrame::Join { name, role } => self.join(connection_id, &name, role),
            ClientFrame::RequestCurrentPoll => self.send_current_poll(connection_id),
            ClientFrame::CreatePoll {
                question,
                options,
                time_limit,
            } => {
                if let Err(e) = self.create_poll(&question, &options, time_limit) {
                    debug!(connection = %connection_id, error = %e, "Create poll rejected");
                    self.dispatcher
                        .send_to(connection_id, ServerFrame::error(e.code(), e.to_string()));
                }
            }
            ClientFrame::SubmitAnswer { poll_id, option } => {
                self.submit_answer(connection_id, &poll_id, &option);
            }
            ClientFrame::ClearPoll => self.clear_poll(),
            ClientFrame::Kick { connection_id: target } => self.kick(&target),
            ClientFrame::SendChatMessage { text } => {
                self.post_chat(connection_id, &text);
            }
            ClientFrame::RequestPollHistory => {
                let polls = self.history();
                self.dispatcher
                    .send_to(connection_id, ServerFrame::PollHistory { polls });
            }
        }
    }

    /// Register a connection under a display name.
    pub fn join(&mut self, connection_id: &str, name: &str, role: Role) {
        let name = name.trim();
        if name.is_empty() {
            debug!(connection = %connection_id, "Dropping join with empty name");
            return;
        }

        match role {
            Role::Student => {
                let participant = self.registry.join(connection_id, name);
                self.dispatcher
                    .broadcast(ServerFrame::ParticipantJoined { participant });
                self.broadcast_roster();
            }
            Role::Teacher => {
                // A student turning into a teacher leaves the roster.
                self.leave(connection_id);
                self.registry.join_teacher(connection_id, name);
                let participants = self.registry.snapshot();
                self.dispatcher
                    .send_to(connection_id, ServerFrame::Roster { participants });
                let polls = self.history();
                self.dispatcher
                    .send_to(connection_id, ServerFrame::PollHistory { polls });
            }
        }

        self.send_current_poll(connection_id);
        let messages = self.chat.history();
        self.dispatcher
            .send_to(connection_id, ServerFrame::ChatHistory { messages });
    }

    /// Remove a connection from the roster, if it was on it.
    pub fn leave(&mut self, connection_id: &str) {
        if self.registry.leave(connection_id).is_some() {
            self.announce_departure(connection_id);
            self.finish_if_all_answered();
        }
    }

    /// Remove a participant on the teacher's request.
    ///
    /// The target alone receives `kicked`, then its connection is closed.
    pub fn kick(&mut self, connection_id: &str) {
        if !self.registry.contains(connection_id) {
            debug!(connection = %connection_id, "Dropping kick for unknown participant");
            return;
        }

        self.dispatcher.send_to(connection_id, ServerFrame::Kicked);
        self.dispatcher.detach(connection_id);
        self.registry.leave(connection_id);
        info!(connection = %connection_id, "Participant kicked");

        self.announce_departure(connection_id);
        self.finish_if_all_answered();
    }

    /// Start a new poll, replacing any current one.
    ///
    /// An unfinished poll that gets replaced is discarded, not recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails validation; state is unchanged.
    pub fn create_poll(
        &mut self,
        question: &str,
        options: &[String],
        time_limit: u32,
    ) -> Result<(), PollError> {
        let poll = ActivePoll::new(question, options, time_limit, self.config.max_time_limit_secs)?;

        if let PollState::Active { poll: old, .. } = &self.state {
            info!(poll = %old.id(), "Discarding unfinished poll");
        }
        // Dropping the previous state aborts its ticker.
        self.state = PollState::NoPoll;

        let ticket = TickTicket::new(self.next_generation);
        self.next_generation += 1;
        let countdown = Countdown::start(
            ticket,
            poll.time_limit(),
            self.config.tick_period,
            self.ticks.clone(),
        );

        self.registry.reset_answers();
        let snapshot = poll.snapshot();
        info!(
            poll = %snapshot.id,
            question = %snapshot.question,
            options = snapshot.options.len(),
            time_limit = snapshot.time_limit,
            "Poll created"
        );
        let seconds = countdown.remaining();
        self.state = PollState::Active { poll, countdown };

        self.dispatcher
            .broadcast(ServerFrame::PollCreated { poll: snapshot });
        self.broadcast_roster();
        self.dispatcher
            .broadcast(ServerFrame::TimeRemaining { seconds });
        Ok(())
    }

    /// Record an answer.
    ///
    /// Returns `false` and changes nothing if there is no active poll, the
    /// poll id does not match, the connection is not on the roster, it has
    /// already answered, or the option is not offered.
    pub fn submit_answer(&mut self, connection_id: &str, poll_id: &str, option: &str) -> bool {
        let PollState::Active { poll, .. } = &mut self.state else {
            debug!(connection = %connection_id, "Dropping answer: no active poll");
            return false;
        };
        if poll.id() != poll_id {
            debug!(connection = %connection_id, poll = %poll_id, "Dropping answer: stale poll");
            return false;
        }
        if self.registry.has_answered(connection_id) != Some(false) {
            debug!(connection = %connection_id, "Dropping answer: unknown or already answered");
            return false;
        }
        if !poll.record_answer(option) {
            debug!(connection = %connection_id, option = %option, "Dropping answer: unknown option");
            return false;
        }
        self.registry.mark_answered(connection_id);

        let results = poll.results().counts().clone();
        let total_votes = poll.results().total();
        debug!(connection = %connection_id, option = %option, total_votes, "Answer recorded");

        self.dispatcher.broadcast(ServerFrame::AnswerRecorded {
            connection_id: connection_id.to_string(),
            option: option.to_string(),
        });
        self.dispatcher
            .broadcast(ServerFrame::TallyUpdated { results, total_votes });
        self.broadcast_roster();

        self.finish_if_all_answered();
        true
    }

    /// Drop the current poll without writing history.
    pub fn clear_poll(&mut self) {
        if let PollState::Active { poll, .. } = &self.state {
            info!(poll = %poll.id(), "Clearing active poll");
        }
        self.state = PollState::NoPoll;
        self.dispatcher.broadcast(ServerFrame::PollCleared);
    }

    /// Apply a countdown tick.
    pub fn tick(&mut self, ticket: TickTicket) {
        let PollState::Active { countdown, .. } = &mut self.state else {
            trace!(generation = ticket.generation(), "Ignoring tick: no active poll");
            return;
        };
        let Some(seconds) = countdown.tick(ticket) else {
            trace!(generation = ticket.generation(), "Ignoring stale tick");
            return;
        };

        self.dispatcher
            .broadcast(ServerFrame::TimeRemaining { seconds });
        if seconds == 0 {
            self.finish(EndReason::Timeout);
        }
    }

    /// Post a chat message on behalf of a joined connection.
    ///
    /// Returns `false` if the sender never joined or the text is blank.
    pub fn post_chat(&mut self, connection_id: &str, text: &str) -> bool {
        let Some((sender, role)) = self.registry.sender(connection_id) else {
            debug!(connection = %connection_id, "Dropping chat from unknown sender");
            return false;
        };
        if text.trim().is_empty() {
            return false;
        }

        let message = ChatMessage {
            id: generate_id("msg"),
            sender: sender.to_string(),
            is_teacher: role == Role::Teacher,
            text: text.to_string(),
            timestamp: now_millis(),
        };
        self.chat.post(message.clone());
        self.dispatcher.broadcast(ServerFrame::ChatMessage { message });
        true
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> PollPhase {
        match self.state {
            PollState::NoPoll => PollPhase::NoPoll,
            PollState::Active { .. } => PollPhase::Active,
            PollState::Ended => PollPhase::Ended,
        }
    }

    /// Snapshot of the active poll.
    #[must_use]
    pub fn current_poll(&self) -> Option<Poll> {
        match &self.state {
            PollState::Active { poll, .. } => Some(poll.snapshot()),
            _ => None,
        }
    }

    /// Completed polls, most recent first.
    #[must_use]
    pub fn history(&self) -> Vec<Poll> {
        self.history.iter().cloned().collect()
    }

    /// Current roster.
    #[must_use]
    pub fn roster(&self) -> Vec<Participant> {
        self.registry.snapshot()
    }

    /// Retained chat messages, oldest first.
    #[must_use]
    pub fn chat_history(&self) -> Vec<ChatMessage> {
        self.chat.history()
    }

    #[must_use]
    pub fn stats(&self) -> ClassroomStats {
        ClassroomStats {
            connections: self.dispatcher.recipient_count(),
            participants: self.registry.len(),
            active_poll: self.phase() == PollPhase::Active,
            history_len: self.history.len(),
            chat_len: self.chat.len(),
        }
    }

    /// Ticket of the running countdown.
    #[must_use]
    pub(crate) fn countdown_ticket(&self) -> Option<TickTicket> {
        match &self.state {
            PollState::Active { countdown, .. } => Some(countdown.ticket()),
            _ => None,
        }
    }

    fn send_current_poll(&mut self, connection_id: &str) {
        if let Some(poll) = self.current_poll() {
            self.dispatcher
                .send_to(connection_id, ServerFrame::PollCreated { poll });
        }
    }

    fn broadcast_roster(&mut self) {
        let participants = self.registry.snapshot();
        self.dispatcher
            .broadcast(ServerFrame::Roster { participants });
    }

    fn announce_departure(&mut self, connection_id: &str) {
        self.dispatcher.broadcast(ServerFrame::ParticipantLeft {
            connection_id: connection_id.to_string(),
        });
        self.broadcast_roster();
    }

    fn finish_if_all_answered(&mut self) {
        if matches!(self.state, PollState::Active { .. }) && self.registry.all_answered() {
            self.finish(EndReason::AllAnswered);
        }
    }

    fn finish(&mut self, reason: EndReason) {
        let (poll, mut countdown) = match std::mem::replace(&mut self.state, PollState::Ended) {
            PollState::Active { poll, countdown } => (poll, countdown),
            other => {
                self.state = other;
                return;
            }
        };
        countdown.cancel();

        let record = poll.finish();
        info!(
            poll = %record.id,
            reason = ?reason,
            total_votes = record.total_votes,
            "Poll ended"
        );
        self.history.push_front(record);

        self.dispatcher.broadcast(ServerFrame::PollEnded);
        let polls = self.history();
        self.dispatcher
            .broadcast(ServerFrame::PollHistory { polls });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::OutboundReceiver;

    fn classroom() -> (Classroom, mpsc::UnboundedReceiver<TickTicket>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Classroom::new(ClassroomConfig::default(), tx), rx)
    }

    fn connect(classroom: &mut Classroom, id: &str) -> OutboundReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        classroom.connect(id, tx);
        rx
    }

    fn drain(rx: &mut OutboundReceiver) -> Vec<ServerFrame> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push((*frame).clone());
        }
        frames
    }

    fn count(frames: &[ServerFrame], kind: &str) -> usize {
        frames.iter().filter(|f| f.kind() == kind).count()
    }

    fn options() -> Vec<String> {
        vec!["Paris".to_string(), "London".to_string()]
    }

    struct Scenario {
        classroom: Classroom,
        _ticks: mpsc::UnboundedReceiver<TickTicket>,
        teacher: OutboundReceiver,
        _students: Vec<OutboundReceiver>,
        poll_id: String,
    }

    /// Teacher plus two students, with a 30 second poll running.
    fn scenario() -> Scenario {
        let (mut classroom, ticks) = classroom();
        let teacher = connect(&mut classroom, "teacher");
        let students = vec![connect(&mut classroom, "s1"), connect(&mut classroom, "s2")];
        classroom.join("teacher", "Ms. Frizzle", Role::Teacher);
        classroom.join("s1", "Alice", Role::Student);
        classroom.join("s2", "Bob", Role::Student);
        classroom
            .create_poll("Capital of France?", &options(), 30)
            .unwrap();
        let poll_id = classroom.current_poll().unwrap().id;
        Scenario {
            classroom,
            _ticks: ticks,
            teacher,
            _students: students,
            poll_id,
        }
    }

    #[tokio::test]
    async fn test_connect_greets_first() {
        let (mut classroom, _ticks) = classroom();
        let mut rx = connect(&mut classroom, "conn-1");

        let frames = drain(&mut rx);
        assert_eq!(
            frames,
            vec![ServerFrame::connected("conn-1", PROTOCOL_VERSION)]
        );
    }

    #[tokio::test]
    async fn test_join_broadcasts_and_catches_up() {
        let (mut classroom, _ticks) = classroom();
        let mut rx1 = connect(&mut classroom, "s1");
        classroom.join("s1", "Alice", Role::Student);
        classroom.create_poll("Q?", &options(), 30).unwrap();
        classroom.post_chat("s1", "hi");
        drain(&mut rx1);

        let mut rx2 = connect(&mut classroom, "s2");
        drain(&mut rx2);
        classroom.join("s2", "Bob", Role::Student);

        let seen_by_first = drain(&mut rx1);
        assert_eq!(count(&seen_by_first, "participant-joined"), 1);
        assert_eq!(count(&seen_by_first, "roster"), 1);
        assert_eq!(count(&seen_by_first, "poll-created"), 0);

        let seen_by_joiner = drain(&mut rx2);
        assert_eq!(count(&seen_by_joiner, "poll-created"), 1);
        assert!(seen_by_joiner.contains(&ServerFrame::ChatHistory {
            messages: classroom.chat_history()
        }));
    }

    #[tokio::test]
    async fn test_blank_name_ignored() {
        let (mut classroom, _ticks) = classroom();
        let mut rx = connect(&mut classroom, "s1");
        drain(&mut rx);

        classroom.join("s1", "   ", Role::Student);
        assert!(drain(&mut rx).is_empty());
        assert!(classroom.roster().is_empty());
    }

    #[tokio::test]
    async fn test_all_answered_ends_early() {
        let Scenario {
            mut classroom,
            mut teacher,
            poll_id,
            ..
        } = scenario();
        drain(&mut teacher);

        assert!(classroom.submit_answer("s1", &poll_id, "Paris"));
        let poll = classroom.current_poll().unwrap();
        assert_eq!(poll.results.get("Paris"), Some(&1));
        assert_eq!(poll.total_votes, 1);
        assert_eq!(classroom.phase(), PollPhase::Active);

        assert!(classroom.submit_answer("s2", &poll_id, "London"));
        assert_eq!(classroom.phase(), PollPhase::Ended);
        assert!(classroom.countdown_ticket().is_none());

        let history = classroom.history();
        assert_eq!(history.len(), 1);
        assert!(!history[0].is_active);
        assert_eq!(history[0].total_votes, 2);
        assert_eq!(history[0].results.get("London"), Some(&1));

        let frames = drain(&mut teacher);
        assert_eq!(count(&frames, "poll-ended"), 1);
        let ended = frames.iter().position(|f| *f == ServerFrame::PollEnded).unwrap();
        assert!(matches!(frames[ended + 1], ServerFrame::PollHistory { ref polls } if polls.len() == 1));
        assert!(frames.iter().all(|f| f.kind() != "time-remaining"));
    }

    #[tokio::test]
    async fn test_timeout_ends_poll() {
        let Scenario {
            mut classroom,
            mut teacher,
            poll_id,
            ..
        } = scenario();
        classroom.submit_answer("s1", &poll_id, "Paris");
        let ticket = classroom.countdown_ticket().unwrap();
        drain(&mut teacher);

        for _ in 0..30 {
            classroom.tick(ticket);
        }
        assert_eq!(classroom.phase(), PollPhase::Ended);

        // Ticks already queued for the finished countdown change nothing.
        classroom.tick(ticket);

        let frames = drain(&mut teacher);
        let seconds: Vec<u32> = frames
            .iter()
            .filter_map(|f| match f {
                ServerFrame::TimeRemaining { seconds } => Some(*seconds),
                _ => None,
            })
            .collect();
        assert_eq!(seconds, (0..30).rev().collect::<Vec<u32>>());
        assert_eq!(count(&frames, "poll-ended"), 1);
        assert_eq!(frames.last().map(ServerFrame::kind), Some("poll-history"));

        let history = classroom.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].total_votes, 1);
    }

    #[tokio::test]
    async fn test_clear_discards_poll() {
        let Scenario {
            mut classroom,
            mut teacher,
            poll_id,
            ..
        } = scenario();
        let ticket = classroom.countdown_ticket().unwrap();
        classroom.submit_answer("s1", &poll_id, "Paris");
        drain(&mut teacher);

        classroom.clear_poll();
        assert_eq!(classroom.phase(), PollPhase::NoPoll);
        assert!(classroom.history().is_empty());

        classroom.tick(ticket);
        assert!(!classroom.submit_answer("s2", &poll_id, "Paris"));
        assert_eq!(drain(&mut teacher), vec![ServerFrame::PollCleared]);
    }

    #[tokio::test]
    async fn test_invalid_answers_dropped() {
        let Scenario {
            mut classroom,
            poll_id,
            ..
        } = scenario();

        assert!(!classroom.submit_answer("s1", "poll_other", "Paris"));
        assert!(!classroom.submit_answer("s1", &poll_id, "Berlin"));
        assert!(!classroom.submit_answer("teacher", &poll_id, "Paris"));
        assert!(!classroom.submit_answer("ghost", &poll_id, "Paris"));
        assert_eq!(classroom.roster().iter().filter(|p| p.has_answered).count(), 0);

        assert!(classroom.submit_answer("s1", &poll_id, "Paris"));
        assert!(!classroom.submit_answer("s1", &poll_id, "London"));

        let poll = classroom.current_poll().unwrap();
        assert_eq!(poll.total_votes, 1);
        assert_eq!(poll.results.values().sum::<u32>(), poll.total_votes);
    }

    #[tokio::test]
    async fn test_answer_after_end_dropped() {
        let Scenario {
            mut classroom,
            poll_id,
            ..
        } = scenario();
        classroom.submit_answer("s1", &poll_id, "Paris");
        classroom.submit_answer("s2", &poll_id, "Paris");
        assert_eq!(classroom.phase(), PollPhase::Ended);

        let _ = connect(&mut classroom, "s3");
        classroom.join("s3", "Carol", Role::Student);
        assert!(!classroom.submit_answer("s3", &poll_id, "Paris"));
        assert_eq!(classroom.history()[0].total_votes, 2);
    }

    #[tokio::test]
    async fn test_create_resets_answers() {
        let Scenario {
            mut classroom,
            poll_id,
            ..
        } = scenario();
        classroom.submit_answer("s1", &poll_id, "Paris");
        assert!(classroom.roster()[0].has_answered);

        classroom.create_poll("Next?", &options(), 30).unwrap();
        assert!(classroom.roster().iter().all(|p| !p.has_answered));
    }

    #[tokio::test]
    async fn test_replacing_active_poll_discards_it() {
        let Scenario {
            mut classroom,
            mut teacher,
            poll_id,
            ..
        } = scenario();
        let old_ticket = classroom.countdown_ticket().unwrap();
        classroom.submit_answer("s1", &poll_id, "Paris");

        classroom.create_poll("Largest ocean?", &options(), 20).unwrap();
        let new_ticket = classroom.countdown_ticket().unwrap();
        assert_ne!(old_ticket, new_ticket);
        assert!(classroom.history().is_empty());
        drain(&mut teacher);

        // A tick from the replaced countdown must not touch the new one.
        classroom.tick(old_ticket);
        assert!(drain(&mut teacher).is_empty());

        classroom.tick(new_ticket);
        assert_eq!(
            drain(&mut teacher),
            vec![ServerFrame::TimeRemaining { seconds: 19 }]
        );
    }

    #[tokio::test]
    async fn test_create_rejection_reaches_issuer_only() {
        let (mut classroom, _ticks) = classroom();
        let mut teacher = connect(&mut classroom, "teacher");
        let mut student = connect(&mut classroom, "s1");
        drain(&mut teacher);
        drain(&mut student);

        classroom.handle(
            "teacher",
            ClientFrame::CreatePoll {
                question: "Q?".into(),
                options: vec!["Only".into()],
                time_limit: 30,
            },
        );

        assert_eq!(
            drain(&mut teacher),
            vec![ServerFrame::error(2002, PollError::TooFewOptions(1).to_string())]
        );
        assert!(drain(&mut student).is_empty());
        assert_eq!(classroom.phase(), PollPhase::NoPoll);
    }

    #[tokio::test]
    async fn test_kick() {
        let (mut classroom, _ticks) = classroom();
        let mut teacher = connect(&mut classroom, "teacher");
        let mut target = connect(&mut classroom, "s1");
        let _other = connect(&mut classroom, "s2");
        classroom.join("teacher", "Ms. Frizzle", Role::Teacher);
        classroom.join("s1", "Alice", Role::Student);
        classroom.join("s2", "Bob", Role::Student);
        drain(&mut teacher);
        drain(&mut target);

        classroom.handle(
            "teacher",
            ClientFrame::Kick {
                connection_id: "s1".into(),
            },
        );

        assert_eq!(drain(&mut target), vec![ServerFrame::Kicked]);
        assert!(matches!(
            target.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));

        let frames = drain(&mut teacher);
        assert!(frames.contains(&ServerFrame::ParticipantLeft {
            connection_id: "s1".into()
        }));
        for frame in &frames {
            if let ServerFrame::Roster { participants } = frame {
                assert!(participants.iter().all(|p| p.id != "s1"));
            }
        }

        // The socket closing afterwards is a no-op.
        classroom.disconnect("s1");
        assert!(drain(&mut teacher).is_empty());
        assert_eq!(classroom.roster().len(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_rechecks_termination() {
        let Scenario {
            mut classroom,
            poll_id,
            ..
        } = scenario();
        classroom.submit_answer("s1", &poll_id, "Paris");
        assert_eq!(classroom.phase(), PollPhase::Active);

        classroom.disconnect("s2");
        assert_eq!(classroom.phase(), PollPhase::Ended);
        assert_eq!(classroom.history().len(), 1);
    }

    #[tokio::test]
    async fn test_last_student_leaving_keeps_poll_running() {
        let Scenario { mut classroom, .. } = scenario();
        classroom.disconnect("s1");
        classroom.disconnect("s2");
        assert_eq!(classroom.phase(), PollPhase::Active);
    }

    #[tokio::test]
    async fn test_chat() {
        let (mut classroom, _ticks) = classroom();
        let mut rx = connect(&mut classroom, "teacher");
        let _ = connect(&mut classroom, "stranger");
        classroom.join("teacher", "Ms. Frizzle", Role::Teacher);
        drain(&mut rx);

        assert!(!classroom.post_chat("stranger", "hello?"));
        assert!(!classroom.post_chat("teacher", "   "));
        assert!(classroom.post_chat("teacher", "Welcome!"));

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1);
        let ServerFrame::ChatMessage { message } = &frames[0] else {
            panic!("Expected chat message, got {:?}", frames[0]);
        };
        assert_eq!(message.sender, "Ms. Frizzle");
        assert!(message.is_teacher);
        assert_eq!(message.text, "Welcome!");
    }

    #[tokio::test]
    async fn test_chat_log_bounded() {
        let (mut classroom, _ticks) = classroom();
        let _ = connect(&mut classroom, "s1");
        classroom.join("s1", "Alice", Role::Student);

        for n in 0..101 {
            classroom.post_chat("s1", &format!("message {n}"));
        }

        let texts: Vec<String> = classroom.chat_history().into_iter().map(|m| m.text).collect();
        let expected: Vec<String> = (1..101).map(|n| format!("message {n}")).collect();
        assert_eq!(texts, expected);
    }

    #[tokio::test]
    async fn test_requests_answer_issuer_only() {
        let Scenario {
            mut classroom,
            mut teacher,
            poll_id,
            ..
        } = scenario();
        let mut bystander = connect(&mut classroom, "s3");
        classroom.submit_answer("s1", &poll_id, "Paris");
        classroom.submit_answer("s2", &poll_id, "Paris");
        drain(&mut teacher);
        drain(&mut bystander);

        classroom.handle("teacher", ClientFrame::RequestPollHistory);
        classroom.handle("teacher", ClientFrame::RequestCurrentPoll);

        let frames = drain(&mut teacher);
        assert_eq!(frames.len(), 1);
        assert!(matches!(&frames[0], ServerFrame::PollHistory { polls } if polls.len() == 1));
        assert!(drain(&mut bystander).is_empty());
    }

    #[tokio::test]
    async fn test_current_poll_request_while_active() {
        let Scenario {
            mut classroom,
            mut teacher,
            _students: mut students,
            ..
        } = scenario();
        drain(&mut teacher);
        for student in &mut students {
            drain(student);
        }

        classroom.handle("s1", ClientFrame::RequestCurrentPoll);

        let frames = drain(&mut students[0]);
        assert_eq!(frames.len(), 1);
        let ServerFrame::PollCreated { poll } = &frames[0] else {
            panic!("Expected poll-created, got {:?}", frames[0]);
        };
        assert_eq!(Some(poll.clone()), classroom.current_poll());
        assert!(drain(&mut students[1]).is_empty());
        assert!(drain(&mut teacher).is_empty());
    }

    #[tokio::test]
    async fn test_teacher_join_catch_up_is_private() {
        let (mut classroom, _ticks) = classroom();
        let mut student = connect(&mut classroom, "s1");
        let mut teacher = connect(&mut classroom, "teacher");
        classroom.join("s1", "Alice", Role::Student);
        classroom.create_poll("Q?", &options(), 30).unwrap();
        let poll_id = classroom.current_poll().unwrap().id;
        classroom.submit_answer("s1", &poll_id, "Paris");
        drain(&mut student);
        drain(&mut teacher);

        classroom.join("teacher", "Ms. Frizzle", Role::Teacher);

        let frames = drain(&mut teacher);
        let kinds: Vec<&str> = frames.iter().map(ServerFrame::kind).collect();
        assert_eq!(kinds, ["roster", "poll-history", "chat-history"]);
        assert!(matches!(&frames[0], ServerFrame::Roster { participants } if participants.len() == 1));
        assert!(matches!(&frames[1], ServerFrame::PollHistory { polls } if polls.len() == 1));

        assert!(drain(&mut student).is_empty());
        assert!(classroom.roster().iter().all(|p| p.id != "teacher"));
    }

    #[tokio::test]
    async fn test_stats() {
        let Scenario { classroom, .. } = scenario();
        let stats = classroom.stats();
        assert_eq!(stats.connections, 3);
        assert_eq!(stats.participants, 2);
        assert!(stats.active_poll);
        assert_eq!(stats.history_len, 0);
    }
}
