//! Answer tallying for a single poll.

use pollcast_protocol::Tally;

/// Vote counts for one poll.
///
/// Counts only ever grow, and only for options the poll offered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Results {
    counts: Tally,
    total: u32,
}

impl Results {
    /// Create an empty tally.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one vote for `option`.
    ///
    /// Returns `false` without counting if `option` is not one of `options`.
    pub fn record(&mut self, options: &[String], option: &str) -> bool {
        if !options.iter().any(|o| o == option) {
            return false;
        }
        *self.counts.entry(option.to_string()).or_insert(0) += 1;
        self.total += 1;
        true
    }

    /// Votes per option.
    #[must_use]
    pub fn counts(&self) -> &Tally {
        &self.counts
    }

    /// Total accepted votes.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }
}
