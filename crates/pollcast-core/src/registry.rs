//! Connection registry.
//!
//! Tracks which connections have joined the classroom and under which name.
//! Students form the roster; teachers are tracked separately so they can chat
//! without ever counting toward "everyone has answered".

use pollcast_protocol::{Participant, Role};
use std::collections::HashMap;
use tracing::debug;

use crate::ids::now_millis;

#[derive(Debug)]
struct Entry {
    /// Join order, used to keep snapshots stable.
    seq: u64,
    participant: Participant,
}

/// Live participants keyed by connection id.
#[derive(Debug, Default)]
pub struct Registry {
    students: HashMap<String, Entry>,
    teachers: HashMap<String, String>,
    next_seq: u64,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of students on the roster.
    #[must_use]
    pub fn len(&self) -> usize {
        self.students.len()
    }

    /// Check if the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    /// Check if a connection is on the roster.
    #[must_use]
    pub fn contains(&self, connection_id: &str) -> bool {
        self.students.contains_key(connection_id)
    }

    /// Get the roster entry for a connection.
    #[must_use]
    pub fn get(&self, connection_id: &str) -> Option<&Participant> {
        self.students.get(connection_id).map(|e| &e.participant)
    }

    /// Add a student, or rename one that already joined on this connection.
    ///
    /// A rename keeps the answered flag so re-joining cannot unlock a second
    /// vote. Returns the stored participant.
    pub fn join(&mut self, connection_id: &str, name: &str) -> Participant {
        self.teachers.remove(connection_id);

        if let Some(entry) = self.students.get_mut(connection_id) {
            entry.participant.name = name.to_string();
            entry.participant.is_online = true;
            debug!(connection = %connection_id, name = %name, "Registry: student renamed");
            return entry.participant.clone();
        }

        let participant = Participant {
            id: connection_id.to_string(),
            name: name.to_string(),
            has_answered: false,
            is_online: true,
            joined_at: now_millis(),
        };
        let seq = self.next_seq;
        self.next_seq += 1;
        self.students.insert(
            connection_id.to_string(),
            Entry {
                seq,
                participant: participant.clone(),
            },
        );

        debug!(connection = %connection_id, name = %name, "Registry: student joined");
        participant
    }

    /// Register a teacher connection.
    pub fn join_teacher(&mut self, connection_id: &str, name: &str) {
        self.students.remove(connection_id);
        self.teachers
            .insert(connection_id.to_string(), name.to_string());
        debug!(connection = %connection_id, name = %name, "Registry: teacher joined");
    }

    /// Remove a connection.
    ///
    /// Returns the removed roster entry if the connection was a student.
    pub fn leave(&mut self, connection_id: &str) -> Option<Participant> {
        self.teachers.remove(connection_id);
        let removed = self.students.remove(connection_id).map(|e| e.participant);
        if removed.is_some() {
            debug!(connection = %connection_id, "Registry: student left");
        }
        removed
    }

    /// Name and role of whoever joined on this connection.
    #[must_use]
    pub fn sender(&self, connection_id: &str) -> Option<(&str, Role)> {
        if let Some(name) = self.teachers.get(connection_id) {
            return Some((name.as_str(), Role::Teacher));
        }
        self.get(connection_id)
            .map(|p| (p.name.as_str(), Role::Student))
    }

    /// Clear every student's answered flag.
    pub fn reset_answers(&mut self) {
        for entry in self.students.values_mut() {
            entry.participant.has_answered = false;
        }
    }

    /// Answered flag for a student, `None` if not on the roster.
    #[must_use]
    pub fn has_answered(&self, connection_id: &str) -> Option<bool> {
        self.get(connection_id).map(|p| p.has_answered)
    }

    /// Mark a student as answered.
    ///
    /// Returns `false` if the student is unknown or had already answered.
    pub fn mark_answered(&mut self, connection_id: &str) -> bool {
        match self.students.get_mut(connection_id) {
            Some(entry) if !entry.participant.has_answered => {
                entry.participant.has_answered = true;
                true
            }
            _ => false,
        }
    }

    /// True when the roster is non-empty and every student has answered.
    #[must_use]
    pub fn all_answered(&self) -> bool {
        !self.students.is_empty()
            && self
                .students
                .values()
                .all(|e| e.participant.has_answered)
    }

    /// Roster in join order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Participant> {
        let mut entries: Vec<&Entry> = self.students.values().collect();
        entries.sort_by_key(|e| e.seq);
        entries.into_iter().map(|e| e.participant.clone()).collect()
    }
}
