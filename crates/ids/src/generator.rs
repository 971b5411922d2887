//! Identifier generation over an injected clock and random source.

use crate::{Clock, RandomSource, SystemClock, ThreadRandom};
use chrono::{DateTime, Utc};

const MESSAGE_ID_BOUND: u32 = 100_000;
const RECORD_NUMBER_BOUND: u32 = 10_000;
const ENCOUNTER_SUFFIX_BOUND: u32 = 1_000;
const LOG_SUFFIX_BOUND: u32 = 1_000_000;

/// Mints identifiers, timestamps and coin flips for one pipeline.
///
/// # Monotonicity Guarantee
///
/// The millisecond component embedded in record and log identifiers is strictly greater
/// than the one handed out by the previous call (incremented by 1ms if the clock has not
/// moved).
pub struct IdGenerator {
    clock: Box<dyn Clock>,
    random: Box<dyn RandomSource>,
    last_millis: Option<i64>,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(Box::new(SystemClock), Box::new(ThreadRandom))
    }
}

impl IdGenerator {
    pub fn new(clock: Box<dyn Clock>, random: Box<dyn RandomSource>) -> Self {
        Self {
            clock,
            random,
            last_millis: None,
        }
    }

    /// Returns the current instant from the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn coin_flip(&mut self) -> bool {
        self.random.coin_flip()
    }

    /// `MSG<n>` message control id.
    pub fn message_id(&mut self) -> String {
        format!("MSG{}", self.random.below(MESSAGE_ID_BOUND))
    }

    /// Synthetic medical record number for forms that carry no identifier.
    pub fn medical_record_number(&mut self) -> String {
        self.random.below(RECORD_NUMBER_BOUND).to_string()
    }

    pub fn encounter_id(&mut self) -> String {
        let millis = self.next_millis();
        let suffix = self.random.below(ENCOUNTER_SUFFIX_BOUND);
        format!("e-{millis}-{suffix}")
    }

    pub fn observation_id(&mut self, index: usize) -> String {
        let millis = self.next_millis();
        format!("obs-{millis}-{index}")
    }

    pub fn log_id(&mut self) -> String {
        let millis = self.next_millis();
        let suffix = self.random.below(LOG_SUFFIX_BOUND);
        format!("log-{millis}-{suffix}")
    }

    pub fn failure_log_id(&mut self) -> String {
        format!("log-err-{}", self.next_millis())
    }

    fn next_millis(&mut self) -> i64 {
        let now = self.clock.now().timestamp_millis();
        let next = match self.last_millis {
            Some(prev) if now <= prev => prev + 1,
            _ => now,
        };
        self.last_millis = Some(next);
        next
    }
}

impl std::fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdGenerator")
            .field("last_millis", &self.last_millis)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FixedClock, SequenceRandom};
    use chrono::TimeZone;

    fn pinned(values: Vec<u32>) -> IdGenerator {
        let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        IdGenerator::new(
            Box::new(FixedClock::new(at)),
            Box::new(SequenceRandom::new(values)),
        )
    }

    #[test]
    fn message_id_and_record_number_use_bounds() {
        let mut ids = pinned(vec![123_456, 98_765]);
        assert_eq!(ids.message_id(), "MSG23456");
        assert_eq!(ids.medical_record_number(), "8765");
    }

    #[test]
    fn record_ids_are_monotonic_under_a_frozen_clock() {
        let mut ids = pinned(vec![5]);
        assert_eq!(ids.encounter_id(), "e-1700000000000-5");
        assert_eq!(ids.observation_id(0), "obs-1700000000001-0");
        assert_eq!(ids.observation_id(1), "obs-1700000000002-1");
        assert_eq!(ids.log_id(), "log-1700000000003-5");
        assert_eq!(ids.failure_log_id(), "log-err-1700000000004");
    }

    #[test]
    fn coin_flip_follows_the_random_source() {
        let mut ids = pinned(vec![1, 0]);
        assert!(ids.coin_flip());
        assert!(!ids.coin_flip());
    }

    #[test]
    fn default_generator_produces_distinct_log_ids() {
        let mut ids = IdGenerator::default();
        let first = ids.log_id();
        let second = ids.log_id();
        assert_ne!(first, second);
    }
}
