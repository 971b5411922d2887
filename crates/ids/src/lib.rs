//! Clock, randomness and identifier generation.
//!
//! Every nondeterministic value the intake pipeline produces flows through this crate:
//! - the encoding instant stamped into message headers,
//! - the synthetic message id and synthetic medical record number,
//! - the sex coin-flip used when a form does not supply one,
//! - record and log identifiers.
//!
//! Production code uses [`SystemClock`] and [`ThreadRandom`]. Tests swap in [`FixedClock`]
//! and [`SequenceRandom`] so that encoded messages and record ids can be pinned exactly.
//!
//! ## Identifier formats
//! - message id: `MSG<n>` with `n < 100000`
//! - medical record number: `<n>` with `n < 10000`
//! - encounter: `e-<millis>-<n>` with `n < 1000`
//! - observation: `obs-<millis>-<index>`
//! - log entry: `log-<millis>-<n>`, batch failures `log-err-<millis>`
//!
//! The `<millis>` component is strictly increasing per [`IdGenerator`], so identifiers minted
//! by one generator never collide even when the clock does not advance between calls.

mod clock;
mod generator;
mod random;

pub use clock::{Clock, FixedClock, SystemClock};
pub use generator::IdGenerator;
pub use random::{RandomSource, SequenceRandom, ThreadRandom};
