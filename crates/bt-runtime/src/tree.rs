#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use bt_core::{TickContext, TimeSource};
use tracing::trace;

use crate::bt::BtStatus;
use crate::error::{check_duration, BtError, Result};
use crate::node::Node;

/// Timing and seeding for a [`BehaviorTree`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TreeConfig {
    /// Seconds between root evaluations. Zero or negative evaluates on every tick.
    pub update_period: f32,
    /// Seed the builder derives per-node random streams from.
    pub seed: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            update_period: 0.2,
            seed: 0,
        }
    }
}

impl TreeConfig {
    pub fn every_frame() -> Self {
        Self {
            update_period: 0.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_period(self.update_period).map(|_| ())
    }
}

fn check_period(update_period: f32) -> Result<f32> {
    if update_period.is_finite() {
        Ok(update_period)
    } else {
        Err(BtError::InvalidConfig {
            what: "update period",
            value: f64::from(update_period),
            reason: "must be finite",
        })
    }
}

/// Owns a root node and the host context, and decides on each host tick whether the root is due.
///
/// With a positive update period, frame deltas accumulate and the root is evaluated once when a
/// full period has built up; whole periods are then subtracted and the remainder carries over.
/// After the root finishes (anything but `Running`) it is invalidated so the next evaluation
/// starts a fresh cycle.
pub struct BehaviorTree<C> {
    root: Node<C>,
    context: C,
    update_period: f32,
    accumulated: f32,
    since_last_evaluation: f32,
    now_seconds: f64,
    evaluations: u64,
    last_status: BtStatus,
}

impl<C> BehaviorTree<C> {
    pub fn new(context: C, root: Node<C>, update_period: f32) -> Result<Self> {
        Ok(Self {
            root,
            context,
            update_period: check_period(update_period)?,
            accumulated: 0.0,
            since_last_evaluation: 0.0,
            now_seconds: 0.0,
            evaluations: 0,
            last_status: BtStatus::Invalid,
        })
    }

    pub fn from_config(context: C, root: Node<C>, config: TreeConfig) -> Result<Self> {
        Self::new(context, root, config.update_period)
    }

    /// Advance by `dt_seconds`. Returns the root's status if it was evaluated this call.
    ///
    /// A negative or non-finite delta is rejected before any state changes.
    pub fn tick(&mut self, dt_seconds: f32) -> Result<Option<BtStatus>> {
        let dt_seconds = check_duration("frame delta", dt_seconds)?;
        self.now_seconds += f64::from(dt_seconds);
        self.since_last_evaluation += dt_seconds;

        if self.update_period > 0.0 {
            self.accumulated += dt_seconds;
            if self.accumulated < self.update_period {
                return Ok(None);
            }
            // One evaluation however many periods elapsed; only the remainder carries.
            self.accumulated = if self.accumulated.is_finite() {
                self.accumulated % self.update_period
            } else {
                0.0
            };
        }

        self.evaluate_root().map(Some)
    }

    /// Advance by whatever `time` reports.
    pub fn tick_with(&mut self, time: &mut dyn TimeSource) -> Result<Option<BtStatus>> {
        let dt_seconds = time.delta_seconds();
        self.tick(dt_seconds)
    }

    fn evaluate_root(&mut self) -> Result<BtStatus> {
        let tick = TickContext::new(
            self.evaluations,
            self.since_last_evaluation,
            self.now_seconds,
        );
        self.evaluations = self.evaluations.wrapping_add(1);
        self.since_last_evaluation = 0.0;

        let status = self.root.tick(&tick, &mut self.context)?;
        trace!(
            tick = tick.tick,
            dt_seconds = tick.dt_seconds,
            root = self.root.name(),
            status = ?status,
            "evaluated root"
        );

        self.last_status = status;
        if status != BtStatus::Running {
            self.root.invalidate();
        }
        Ok(status)
    }

    /// Invalidate the whole tree and restart the period accumulator.
    pub fn reset(&mut self) {
        self.root.invalidate();
        self.accumulated = 0.0;
        self.since_last_evaluation = 0.0;
        self.last_status = BtStatus::Invalid;
    }

    /// Status of the most recent root evaluation, `Invalid` before the first one.
    pub fn last_status(&self) -> BtStatus {
        self.last_status
    }

    /// Number of root evaluations so far.
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Total time fed into this tree.
    pub fn now_seconds(&self) -> f64 {
        self.now_seconds
    }

    pub fn update_period(&self) -> f32 {
        self.update_period
    }

    pub fn set_update_period(&mut self, update_period: f32) -> Result<()> {
        self.update_period = check_period(update_period)?;
        Ok(())
    }

    pub fn root(&self) -> &Node<C> {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Node<C> {
        &mut self.root
    }

    /// Swap the root, returning the previous one. The new root starts its first cycle on the
    /// next evaluation.
    pub fn set_root(&mut self, mut root: Node<C>) -> Node<C> {
        root.invalidate();
        self.last_status = BtStatus::Invalid;
        std::mem::replace(&mut self.root, root)
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    /// Swap the context, returning the previous one.
    pub fn set_context(&mut self, context: C) -> C {
        std::mem::replace(&mut self.context, context)
    }

    pub fn into_parts(self) -> (C, Node<C>) {
        (self.context, self.root)
    }
}
