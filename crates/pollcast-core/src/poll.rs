//! The active poll aggregate.
//!
//! An [`ActivePoll`] is the only mutable form of a poll. Finishing it consumes
//! it and yields a plain [`Poll`] record, which is what history stores.

use pollcast_protocol::Poll;
use std::collections::HashSet;
use thiserror::Error;

use crate::ids::{generate_id, now_millis};
use crate::results::Results;

/// Reasons a poll cannot be created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    /// Question text is blank.
    #[error("Question cannot be empty")]
    EmptyQuestion,

    /// Fewer than two options.
    #[error("A poll needs at least 2 options, got {0}")]
    TooFewOptions(usize),

    /// An option label is blank.
    #[error("Option {0} is empty")]
    EmptyOption(usize),

    /// Two options share a label.
    #[error("Duplicate option: {0}")]
    DuplicateOption(String),

    /// Time limit outside `1..=max`.
    #[error("Time limit {0}s must be between 1 and {1} seconds")]
    InvalidTimeLimit(u32, u32),
}

impl PollError {
    /// Numeric code carried in `error` frames.
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            PollError::EmptyQuestion => 2001,
            PollError::TooFewOptions(_) => 2002,
            PollError::EmptyOption(_) => 2003,
            PollError::DuplicateOption(_) => 2004,
            PollError::InvalidTimeLimit(..) => 2005,
        }
    }
}

/// A poll that is accepting answers.
#[derive(Debug, Clone)]
pub struct ActivePoll {
    id: String,
    question: String,
    options: Vec<String>,
    time_limit: u32,
    created_at: u64,
    results: Results,
}

impl ActivePoll {
    /// Validate a create-poll request and build the poll.
    ///
    /// Question and option labels are trimmed.
    ///
    /// # Errors
    ///
    /// Returns an error if the question is blank, there are fewer than two
    /// options, an option is blank or repeated, or the time limit is outside
    /// `1..=max_time_limit`.
    pub fn new(
        question: &str,
        options: &[String],
        time_limit: u32,
        max_time_limit: u32,
    ) -> Result<Self, PollError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PollError::EmptyQuestion);
        }
        if options.len() < 2 {
            return Err(PollError::TooFewOptions(options.len()));
        }

        let mut seen = HashSet::new();
        let mut labels = Vec::with_capacity(options.len());
        for (index, option) in options.iter().enumerate() {
            let label = option.trim();
            if label.is_empty() {
                return Err(PollError::EmptyOption(index));
            }
            if !seen.insert(label) {
                return Err(PollError::DuplicateOption(label.to_string()));
            }
            labels.push(label.to_string());
        }

        if time_limit == 0 || time_limit > max_time_limit {
            return Err(PollError::InvalidTimeLimit(time_limit, max_time_limit));
        }

        Ok(Self {
            id: generate_id("poll"),
            question: question.to_string(),
            options: labels,
            time_limit,
            created_at: now_millis(),
            results: Results::new(),
        })
    }

    /// Poll id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Time limit in seconds.
    #[must_use]
    pub fn time_limit(&self) -> u32 {
        self.time_limit
    }

    /// Current tally.
    #[must_use]
    pub fn results(&self) -> &Results {
        &self.results
    }

    /// Count an answer. Returns `false` for options the poll does not offer.
    pub fn record_answer(&mut self, option: &str) -> bool {
        self.results.record(&self.options, option)
    }

    /// Snapshot for broadcasting while the poll runs.
    #[must_use]
    pub fn snapshot(&self) -> Poll {
        self.to_record(true)
    }

    /// End the poll, producing its immutable record.
    #[must_use]
    pub fn finish(self) -> Poll {
        self.to_record(false)
    }

    fn to_record(&self, is_active: bool) -> Poll {
        Poll {
            id: self.id.clone(),
            question: self.question.clone(),
            options: self.options.clone(),
            is_active,
            time_limit: self.time_limit,
            results: self.results.counts().clone(),
            total_votes: self.results.total(),
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_validation() {
        let ok = opts(&["Paris", "London"]);

        assert_eq!(
            ActivePoll::new("  ", &ok, 30, 600).unwrap_err(),
            PollError::EmptyQuestion
        );
        assert_eq!(
            ActivePoll::new("Q?", &opts(&["Paris"]), 30, 600).unwrap_err(),
            PollError::TooFewOptions(1)
        );
        assert_eq!(
            ActivePoll::new("Q?", &opts(&["Paris", " "]), 30, 600).unwrap_err(),
            PollError::EmptyOption(1)
        );
        assert_eq!(
            ActivePoll::new("Q?", &opts(&["Paris", "Paris "]), 30, 600).unwrap_err(),
            PollError::DuplicateOption("Paris".into())
        );
        assert_eq!(
            ActivePoll::new("Q?", &ok, 0, 600).unwrap_err(),
            PollError::InvalidTimeLimit(0, 600)
        );
        assert_eq!(
            ActivePoll::new("Q?", &ok, 601, 600).unwrap_err().code(),
            2005
        );
    }

    #[test]
    fn test_snapshot_and_finish() {
        let mut poll =
            ActivePoll::new(" Capital of France? ", &opts(&["Paris", "London"]), 30, 600).unwrap();
        assert!(poll.id().starts_with("poll_"));

        assert!(poll.record_answer("Paris"));
        assert!(!poll.record_answer("Berlin"));

        let live = poll.snapshot();
        assert!(live.is_active);
        assert_eq!(live.question, "Capital of France?");
        assert_eq!(live.total_votes, 1);

        let done = poll.finish();
        assert!(!done.is_active);
        assert_eq!(done.id, live.id);
        assert_eq!(done.results.get("Paris"), Some(&1));
    }
}
