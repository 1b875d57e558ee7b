//! Deterministic, engine-agnostic primitives consumed by the behavior tree runtime.
//!
//! Nothing in here reads global state: time arrives as explicit deltas and randomness comes from
//! generators the host seeds.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod rng;
pub mod tick;

pub use rng::{derive_seed, mix64, shuffle, DeterministicRng, SplitMix64};
pub use tick::{FixedStep, SystemClock, TickContext, TimeSource};
