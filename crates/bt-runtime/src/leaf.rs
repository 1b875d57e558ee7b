//! Leaf adapters: host functions, conditions, logging, timed waits and nested trees.

use std::borrow::Cow;
use std::error::Error;
use std::marker::PhantomData;

use bt_core::{DeterministicRng, TickContext};
use tracing::{error, info};

use crate::bt::{BtNode, BtStatus, Conditional};
use crate::error::{check_duration, check_probability, BtError, Result};
use crate::tree::BehaviorTree;

/// Runs a host function every tick and reports its status directly.
pub struct Action<F> {
    action: F,
}

impl<F> Action<F> {
    pub fn new<C>(action: F) -> Self
    where
        F: FnMut(&mut C) -> BtStatus,
    {
        Self { action }
    }
}

impl<C, F> BtNode<C> for Action<F>
where
    F: FnMut(&mut C) -> BtStatus,
{
    fn update(&mut self, _tick: &TickContext, ctx: &mut C) -> Result<BtStatus> {
        Ok((self.action)(ctx))
    }

    fn name(&self) -> &'static str {
        "Action"
    }
}

/// Like [`Action`], but the host function may fail. Failures surface as [`BtError::Callback`].
pub struct TryAction<F, E> {
    action: F,
    _error: PhantomData<fn() -> E>,
}

impl<F, E> TryAction<F, E> {
    pub fn new<C>(action: F) -> Self
    where
        F: FnMut(&mut C) -> std::result::Result<BtStatus, E>,
    {
        Self {
            action,
            _error: PhantomData,
        }
    }
}

impl<C, F, E> BtNode<C> for TryAction<F, E>
where
    F: FnMut(&mut C) -> std::result::Result<BtStatus, E>,
    E: Into<Box<dyn Error + Send + Sync>>,
{
    fn update(&mut self, _tick: &TickContext, ctx: &mut C) -> Result<BtStatus> {
        (self.action)(ctx).map_err(|err| BtError::Callback(err.into()))
    }

    fn name(&self) -> &'static str {
        "TryAction"
    }
}

/// Read-only check of the context. Must return `Success` or `Failure`.
pub struct Condition<F> {
    cond: F,
}

impl<F> Condition<F> {
    pub fn new<C>(cond: F) -> Self
    where
        F: FnMut(&C) -> BtStatus,
    {
        Self { cond }
    }
}

impl<C, F> Conditional<C> for Condition<F>
where
    F: FnMut(&C) -> BtStatus,
{
    fn evaluate_condition(
        &mut self,
        _tick: &TickContext,
        ctx: &mut C,
        _force_update: bool,
    ) -> Result<BtStatus> {
        match (self.cond)(&*ctx) {
            status @ (BtStatus::Success | BtStatus::Failure) => Ok(status),
            status => Err(BtError::ConditionalContract {
                node: "Condition",
                status,
            }),
        }
    }
}

impl<C, F> BtNode<C> for Condition<F>
where
    F: FnMut(&C) -> BtStatus,
{
    fn update(&mut self, tick: &TickContext, ctx: &mut C) -> Result<BtStatus> {
        Conditional::<C>::evaluate_condition(self, tick, ctx, false)
    }

    fn name(&self) -> &'static str {
        "Condition"
    }

    fn is_conditional(&self) -> bool {
        true
    }

    fn as_conditional(&mut self) -> Option<&mut dyn Conditional<C>> {
        Some(self)
    }
}

/// Conditional that succeeds with a fixed probability, drawing once per evaluation.
pub struct RandomChance {
    probability: f32,
    rng: Box<dyn DeterministicRng>,
}

impl RandomChance {
    pub fn new(probability: f32, rng: impl DeterministicRng + 'static) -> Result<Self> {
        Ok(Self {
            probability: check_probability("chance probability", probability)?,
            rng: Box::new(rng),
        })
    }

    pub fn probability(&self) -> f32 {
        self.probability
    }
}

impl<C> Conditional<C> for RandomChance {
    fn evaluate_condition(
        &mut self,
        _tick: &TickContext,
        _ctx: &mut C,
        _force_update: bool,
    ) -> Result<BtStatus> {
        Ok(BtStatus::from(self.rng.next_f32_unit() < self.probability))
    }
}

impl<C> BtNode<C> for RandomChance {
    fn update(&mut self, tick: &TickContext, ctx: &mut C) -> Result<BtStatus> {
        Conditional::<C>::evaluate_condition(self, tick, ctx, false)
    }

    fn name(&self) -> &'static str {
        "RandomChance"
    }

    fn is_conditional(&self) -> bool {
        true
    }

    fn as_conditional(&mut self) -> Option<&mut dyn Conditional<C>> {
        Some(self)
    }
}

/// Emits a log line and succeeds.
#[derive(Debug, Clone)]
pub struct Log {
    text: Cow<'static, str>,
    is_error: bool,
}

impl Log {
    pub fn info(text: impl Into<Cow<'static, str>>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<Cow<'static, str>>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl<C> BtNode<C> for Log {
    fn update(&mut self, tick: &TickContext, _ctx: &mut C) -> Result<BtStatus> {
        if self.is_error {
            error!(tick = tick.tick, "{}", self.text);
        } else {
            info!(tick = tick.tick, "{}", self.text);
        }
        Ok(BtStatus::Success)
    }

    fn name(&self) -> &'static str {
        "Log"
    }
}

/// Runs until `duration_seconds` have passed since the node started, then succeeds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wait {
    duration_seconds: f32,
    started_at: f64,
}

impl Wait {
    pub fn new(duration_seconds: f32) -> Result<Self> {
        Ok(Self {
            duration_seconds: check_duration("wait duration", duration_seconds)?,
            started_at: 0.0,
        })
    }

    pub fn duration_seconds(&self) -> f32 {
        self.duration_seconds
    }
}

impl<C> BtNode<C> for Wait {
    fn update(&mut self, tick: &TickContext, _ctx: &mut C) -> Result<BtStatus> {
        if tick.now_seconds - self.started_at >= f64::from(self.duration_seconds) {
            Ok(BtStatus::Success)
        } else {
            Ok(BtStatus::Running)
        }
    }

    fn on_start(&mut self, tick: &TickContext) {
        self.started_at = tick.now_seconds;
    }

    fn name(&self) -> &'static str {
        "Wait"
    }
}

/// Embeds an independently owned tree as a leaf.
///
/// Each update ticks the nested tree with the embedding tree's frame delta. The nested tree
/// keeps its own context and update period. By default the leaf reports the nested root's last
/// status, or `Running` while the nested root has not been evaluated since this leaf started;
/// [`SubTree::always_succeed`] reports `Success` no matter what the nested tree did.
pub struct SubTree<S> {
    tree: BehaviorTree<S>,
    always_succeed: bool,
    evaluations_at_start: u64,
}

impl<S> SubTree<S> {
    pub fn new(tree: BehaviorTree<S>) -> Self {
        Self {
            tree,
            always_succeed: false,
            evaluations_at_start: 0,
        }
    }

    pub fn always_succeed(mut self) -> Self {
        self.always_succeed = true;
        self
    }

    pub fn tree(&self) -> &BehaviorTree<S> {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut BehaviorTree<S> {
        &mut self.tree
    }

    pub fn into_tree(self) -> BehaviorTree<S> {
        self.tree
    }
}

impl<C, S> BtNode<C> for SubTree<S> {
    fn update(&mut self, tick: &TickContext, _ctx: &mut C) -> Result<BtStatus> {
        self.tree.tick(tick.dt_seconds)?;

        if self.always_succeed {
            return Ok(BtStatus::Success);
        }
        if self.tree.evaluations() == self.evaluations_at_start {
            return Ok(BtStatus::Running);
        }
        Ok(match self.tree.last_status() {
            BtStatus::Invalid => BtStatus::Running,
            status => status,
        })
    }

    fn on_start(&mut self, _tick: &TickContext) {
        self.evaluations_at_start = self.tree.evaluations();
    }

    fn name(&self) -> &'static str {
        "SubTree"
    }
}
