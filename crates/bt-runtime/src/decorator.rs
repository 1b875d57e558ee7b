//! Single-child nodes that gate or transform their child's result.
//!
//! Decorators are constructed without a child and receive it through [`Decorator::set_child`]
//! (or [`Decorator::with_child`]); ticking one that never got a child is a
//! [`BtError::MissingChild`] error.

use std::num::NonZeroU32;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use bt_core::{DeterministicRng, TickContext};
use tracing::{debug, trace};

use crate::bt::{BtNode, BtStatus, Conditional};
use crate::error::{check_duration, check_probability, BtError, Result};
use crate::node::Node;

/// A node with exactly one child.
pub trait Decorator<C>: BtNode<C> {
    fn child(&self) -> Option<&Node<C>>;

    fn set_child(&mut self, child: Node<C>);

    fn into_node(self: Box<Self>) -> Node<C>;

    fn with_child(mut self, child: Node<C>) -> Self
    where
        Self: Sized,
    {
        self.set_child(child);
        self
    }
}

macro_rules! decorator {
    ($ty:ident) => {
        impl<C: 'static> Decorator<C> for $ty<C> {
            fn child(&self) -> Option<&Node<C>> {
                self.child.as_ref()
            }

            fn set_child(&mut self, child: Node<C>) {
                self.child = Some(child);
            }

            fn into_node(self: Box<Self>) -> Node<C> {
                Node::new(self as Box<dyn BtNode<C>>)
            }
        }
    };
}

fn child_of<'a, C>(child: &'a mut Option<Node<C>>, node: &'static str) -> Result<&'a mut Node<C>> {
    child.as_mut().ok_or(BtError::MissingChild { node })
}

fn invalidate_child<C>(child: &mut Option<Node<C>>) {
    if let Some(child) = child.as_mut() {
        child.invalidate();
    }
}

/// Swaps `Success` and `Failure`. `Running` passes through.
pub struct Inverter<C> {
    child: Option<Node<C>>,
}

impl<C> Inverter<C> {
    pub fn new() -> Self {
        Self { child: None }
    }
}

impl<C> Default for Inverter<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> BtNode<C> for Inverter<C> {
    fn update(&mut self, tick: &TickContext, ctx: &mut C) -> Result<BtStatus> {
        let child = child_of(&mut self.child, "Inverter")?;
        Ok(child.tick(tick, ctx)?.invert())
    }

    fn on_invalidate(&mut self) {
        invalidate_child(&mut self.child);
    }

    fn name(&self) -> &'static str {
        "Inverter"
    }
}

decorator!(Inverter);

/// Forces any finished child result to `Success`.
pub struct AlwaysSucceed<C> {
    child: Option<Node<C>>,
}

impl<C> AlwaysSucceed<C> {
    pub fn new() -> Self {
        Self { child: None }
    }
}

impl<C> Default for AlwaysSucceed<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> BtNode<C> for AlwaysSucceed<C> {
    fn update(&mut self, tick: &TickContext, ctx: &mut C) -> Result<BtStatus> {
        let child = child_of(&mut self.child, "AlwaysSucceed")?;
        Ok(match child.tick(tick, ctx)? {
            BtStatus::Running => BtStatus::Running,
            _ => BtStatus::Success,
        })
    }

    fn on_invalidate(&mut self) {
        invalidate_child(&mut self.child);
    }

    fn name(&self) -> &'static str {
        "AlwaysSucceed"
    }
}

decorator!(AlwaysSucceed);

/// Forces any finished child result to `Failure`.
pub struct AlwaysFail<C> {
    child: Option<Node<C>>,
}

impl<C> AlwaysFail<C> {
    pub fn new() -> Self {
        Self { child: None }
    }
}

impl<C> Default for AlwaysFail<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> BtNode<C> for AlwaysFail<C> {
    fn update(&mut self, tick: &TickContext, ctx: &mut C) -> Result<BtStatus> {
        let child = child_of(&mut self.child, "AlwaysFail")?;
        Ok(match child.tick(tick, ctx)? {
            BtStatus::Running => BtStatus::Running,
            _ => BtStatus::Failure,
        })
    }

    fn on_invalidate(&mut self) {
        invalidate_child(&mut self.child);
    }

    fn name(&self) -> &'static str {
        "AlwaysFail"
    }
}

decorator!(AlwaysFail);

/// Keeps running until the child succeeds. A failed child is invalidated and retried on the
/// next tick.
pub struct UntilSuccess<C> {
    child: Option<Node<C>>,
}

impl<C> UntilSuccess<C> {
    pub fn new() -> Self {
        Self { child: None }
    }
}

impl<C> Default for UntilSuccess<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> BtNode<C> for UntilSuccess<C> {
    fn update(&mut self, tick: &TickContext, ctx: &mut C) -> Result<BtStatus> {
        let child = child_of(&mut self.child, "UntilSuccess")?;
        match child.tick(tick, ctx)? {
            BtStatus::Success => Ok(BtStatus::Success),
            BtStatus::Failure => {
                child.invalidate();
                Ok(BtStatus::Running)
            }
            _ => Ok(BtStatus::Running),
        }
    }

    fn on_invalidate(&mut self) {
        invalidate_child(&mut self.child);
    }

    fn name(&self) -> &'static str {
        "UntilSuccess"
    }
}

decorator!(UntilSuccess);

/// Keeps running until the child fails. A succeeded child is invalidated and retried on the
/// next tick.
pub struct UntilFail<C> {
    child: Option<Node<C>>,
}

impl<C> UntilFail<C> {
    pub fn new() -> Self {
        Self { child: None }
    }
}

impl<C> Default for UntilFail<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> BtNode<C> for UntilFail<C> {
    fn update(&mut self, tick: &TickContext, ctx: &mut C) -> Result<BtStatus> {
        let child = child_of(&mut self.child, "UntilFail")?;
        match child.tick(tick, ctx)? {
            BtStatus::Failure => Ok(BtStatus::Success),
            BtStatus::Success => {
                child.invalidate();
                Ok(BtStatus::Running)
            }
            _ => Ok(BtStatus::Running),
        }
    }

    fn on_invalidate(&mut self) {
        invalidate_child(&mut self.child);
    }

    fn name(&self) -> &'static str {
        "UntilFail"
    }
}

decorator!(UntilFail);

/// How many times a [`Repeater`] runs its child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RepeatCount {
    Times(NonZeroU32),
    Forever,
}

impl TryFrom<i64> for RepeatCount {
    type Error = BtError;

    /// `-1` repeats forever; any other value must be a positive count.
    fn try_from(value: i64) -> Result<Self> {
        if value == -1 {
            return Ok(RepeatCount::Forever);
        }
        u32::try_from(value)
            .ok()
            .and_then(NonZeroU32::new)
            .map(RepeatCount::Times)
            .ok_or(BtError::InvalidRepeatCount(value))
    }
}

/// Re-runs its child a fixed number of times, or forever.
///
/// Only completed child runs count. After each one the child is invalidated so the next run
/// starts clean, unless the configured end condition matched or the count is used up, in which
/// case the repeater succeeds.
pub struct Repeater<C> {
    child: Option<Node<C>>,
    count: RepeatCount,
    end_on_failure: bool,
    end_on_success: bool,
    iteration_count: u32,
}

impl<C> Repeater<C> {
    pub fn new(count: RepeatCount) -> Self {
        Self {
            child: None,
            count,
            end_on_failure: false,
            end_on_success: false,
            iteration_count: 0,
        }
    }

    pub fn forever() -> Self {
        Self::new(RepeatCount::Forever)
    }

    /// Build from a raw count; `-1` means forever, `0` and anything below `-1` are rejected.
    pub fn try_new(count: i64) -> Result<Self> {
        Ok(Self::new(RepeatCount::try_from(count)?))
    }

    pub fn end_on_failure(mut self, end_on_failure: bool) -> Self {
        self.end_on_failure = end_on_failure;
        self
    }

    pub fn end_on_success(mut self, end_on_success: bool) -> Self {
        self.end_on_success = end_on_success;
        self
    }

    pub fn count(&self) -> RepeatCount {
        self.count
    }

    /// Completed child runs in the current evaluation cycle.
    pub fn iteration_count(&self) -> u32 {
        self.iteration_count
    }
}

impl<C> BtNode<C> for Repeater<C> {
    fn update(&mut self, tick: &TickContext, ctx: &mut C) -> Result<BtStatus> {
        let child = child_of(&mut self.child, "Repeater")?;
        let status = child.tick(tick, ctx)?;
        if status == BtStatus::Running {
            return Ok(BtStatus::Running);
        }

        self.iteration_count = self.iteration_count.saturating_add(1);

        let ended_early = (self.end_on_failure && status == BtStatus::Failure)
            || (self.end_on_success && status == BtStatus::Success);
        let exhausted = match self.count {
            RepeatCount::Times(n) => self.iteration_count >= n.get(),
            RepeatCount::Forever => false,
        };
        if ended_early || exhausted {
            trace!(
                iterations = self.iteration_count,
                child_status = ?status,
                "repeater finished"
            );
            return Ok(BtStatus::Success);
        }

        child.invalidate();
        Ok(BtStatus::Running)
    }

    fn on_start(&mut self, _tick: &TickContext) {
        self.iteration_count = 0;
    }

    fn on_invalidate(&mut self) {
        invalidate_child(&mut self.child);
    }

    fn name(&self) -> &'static str {
        "Repeater"
    }
}

decorator!(Repeater);

/// Fails the subtree if it has not finished within `duration_seconds` of starting.
pub struct TimeoutDecorator<C> {
    child: Option<Node<C>>,
    duration_seconds: f32,
    started_at: f64,
}

impl<C> TimeoutDecorator<C> {
    pub fn new(duration_seconds: f32) -> Result<Self> {
        Ok(Self {
            child: None,
            duration_seconds: check_duration("timeout", duration_seconds)?,
            started_at: 0.0,
        })
    }

    pub fn duration_seconds(&self) -> f32 {
        self.duration_seconds
    }
}

impl<C> BtNode<C> for TimeoutDecorator<C> {
    fn update(&mut self, tick: &TickContext, ctx: &mut C) -> Result<BtStatus> {
        let child = child_of(&mut self.child, "TimeoutDecorator")?;
        let elapsed = tick.now_seconds - self.started_at;
        if elapsed > f64::from(self.duration_seconds) {
            debug!(
                elapsed_seconds = elapsed,
                timeout_seconds = self.duration_seconds,
                "subtree timed out"
            );
            child.invalidate();
            return Ok(BtStatus::Failure);
        }
        child.tick(tick, ctx)
    }

    fn on_start(&mut self, tick: &TickContext) {
        self.started_at = tick.now_seconds;
    }

    fn on_invalidate(&mut self) {
        invalidate_child(&mut self.child);
    }

    fn name(&self) -> &'static str {
        "TimeoutDecorator"
    }
}

decorator!(TimeoutDecorator);

/// Runs the child only if a per-start random roll falls below `probability`.
///
/// A failed roll reports `Failure` for the whole evaluation cycle without touching the child.
pub struct ChanceDecorator<C> {
    child: Option<Node<C>>,
    probability: f32,
    rng: Box<dyn DeterministicRng>,
    roll_passed: bool,
}

impl<C> ChanceDecorator<C> {
    pub fn new(probability: f32, rng: impl DeterministicRng + 'static) -> Result<Self> {
        Ok(Self {
            child: None,
            probability: check_probability("chance probability", probability)?,
            rng: Box::new(rng),
            roll_passed: false,
        })
    }

    pub fn probability(&self) -> f32 {
        self.probability
    }
}

impl<C> BtNode<C> for ChanceDecorator<C> {
    fn update(&mut self, tick: &TickContext, ctx: &mut C) -> Result<BtStatus> {
        let child = child_of(&mut self.child, "ChanceDecorator")?;
        if self.roll_passed {
            child.tick(tick, ctx)
        } else {
            Ok(BtStatus::Failure)
        }
    }

    fn on_start(&mut self, _tick: &TickContext) {
        self.roll_passed = self.rng.next_f32_unit() < self.probability;
    }

    fn on_invalidate(&mut self) {
        invalidate_child(&mut self.child);
    }

    fn name(&self) -> &'static str {
        "ChanceDecorator"
    }
}

decorator!(ChanceDecorator);

/// Gates the child behind a conditional.
///
/// With `reevaluate` the condition runs every tick; without it, the first result is cached
/// until the decorator starts again or is invalidated.
pub struct ConditionalDecorator<C> {
    child: Option<Node<C>>,
    condition: Box<dyn Conditional<C>>,
    reevaluate: bool,
    conditional_status: BtStatus,
}

impl<C> ConditionalDecorator<C> {
    pub fn new(condition: impl Conditional<C> + 'static, reevaluate: bool) -> Self {
        Self {
            child: None,
            condition: Box::new(condition),
            reevaluate,
            conditional_status: BtStatus::Invalid,
        }
    }

    /// The cached result of the last condition evaluation.
    pub fn conditional_status(&self) -> BtStatus {
        self.conditional_status
    }
}

impl<C> Conditional<C> for ConditionalDecorator<C> {
    fn evaluate_condition(
        &mut self,
        tick: &TickContext,
        ctx: &mut C,
        force_update: bool,
    ) -> Result<BtStatus> {
        if force_update || self.reevaluate || self.conditional_status == BtStatus::Invalid {
            self.conditional_status = self.condition.evaluate_condition(tick, ctx, force_update)?;
        }
        Ok(self.conditional_status)
    }
}

impl<C> BtNode<C> for ConditionalDecorator<C> {
    fn update(&mut self, tick: &TickContext, ctx: &mut C) -> Result<BtStatus> {
        if self.child.is_none() {
            return Err(BtError::MissingChild {
                node: "ConditionalDecorator",
            });
        }

        if self.evaluate_condition(tick, ctx, false)? != BtStatus::Success {
            return Ok(BtStatus::Failure);
        }
        child_of(&mut self.child, "ConditionalDecorator")?.tick(tick, ctx)
    }

    fn on_start(&mut self, _tick: &TickContext) {
        self.conditional_status = BtStatus::Invalid;
    }

    fn on_invalidate(&mut self) {
        self.conditional_status = BtStatus::Invalid;
        invalidate_child(&mut self.child);
    }

    fn name(&self) -> &'static str {
        "ConditionalDecorator"
    }

    fn is_conditional(&self) -> bool {
        true
    }

    fn as_conditional(&mut self) -> Option<&mut dyn Conditional<C>> {
        Some(self)
    }
}

decorator!(ConditionalDecorator);
