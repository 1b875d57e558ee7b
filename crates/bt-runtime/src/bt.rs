#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use bt_core::TickContext;

use crate::composite::Composite;
use crate::error::Result;

/// Result of evaluating a node.
///
/// `Invalid` means the node has not run since it was created or last invalidated. Statuses are
/// only ever compared for equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BtStatus {
    #[default]
    Invalid,
    Success,
    Failure,
    Running,
}

impl BtStatus {
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, BtStatus::Success)
    }

    #[inline]
    pub fn is_failure(self) -> bool {
        matches!(self, BtStatus::Failure)
    }

    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, BtStatus::Running)
    }

    /// `Success` or `Failure`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, BtStatus::Success | BtStatus::Failure)
    }

    /// Swaps `Success` and `Failure`; other values pass through.
    #[inline]
    pub fn invert(self) -> Self {
        match self {
            BtStatus::Success => BtStatus::Failure,
            BtStatus::Failure => BtStatus::Success,
            other => other,
        }
    }
}

impl From<bool> for BtStatus {
    fn from(value: bool) -> Self {
        if value {
            BtStatus::Success
        } else {
            BtStatus::Failure
        }
    }
}

/// Behavior of a single tree node.
///
/// Implementors only describe what happens on each hook; the status bookkeeping that decides
/// when the hooks fire lives in [`Node`](crate::Node). `C` is the host's execution context and
/// is handed through untouched.
pub trait BtNode<C> {
    /// Evaluate the node for one tick.
    fn update(&mut self, tick: &TickContext, ctx: &mut C) -> Result<BtStatus>;

    /// Called once when the node leaves `Invalid`, right before the first `update`.
    fn on_start(&mut self, _tick: &TickContext) {}

    /// Called once when `update` returns anything other than `Running`.
    fn on_end(&mut self) {}

    /// Called when the owning [`Node`](crate::Node) is invalidated. Nodes with children must
    /// invalidate all of them here.
    fn on_invalidate(&mut self) {}

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Whether this node is a conditional. Must agree with [`BtNode::as_conditional`].
    fn is_conditional(&self) -> bool {
        false
    }

    /// Capability access used by the conditional-abort scans.
    fn as_conditional(&mut self) -> Option<&mut dyn Conditional<C>> {
        None
    }

    fn as_composite(&mut self) -> Option<&mut Composite<C>> {
        None
    }
}

/// A node whose result is only ever `Success` or `Failure`.
///
/// Composites re-run conditionals through this side channel when checking for aborts, so the
/// conditional's own lifecycle hooks and stored status are left alone.
pub trait Conditional<C> {
    fn evaluate_condition(
        &mut self,
        tick: &TickContext,
        ctx: &mut C,
        force_update: bool,
    ) -> Result<BtStatus>;
}

impl<C, T: BtNode<C> + ?Sized> BtNode<C> for Box<T> {
    #[inline]
    fn update(&mut self, tick: &TickContext, ctx: &mut C) -> Result<BtStatus> {
        (**self).update(tick, ctx)
    }

    #[inline]
    fn on_start(&mut self, tick: &TickContext) {
        (**self).on_start(tick)
    }

    #[inline]
    fn on_end(&mut self) {
        (**self).on_end()
    }

    #[inline]
    fn on_invalidate(&mut self) {
        (**self).on_invalidate()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn is_conditional(&self) -> bool {
        (**self).is_conditional()
    }

    fn as_conditional(&mut self) -> Option<&mut dyn Conditional<C>> {
        (**self).as_conditional()
    }

    fn as_composite(&mut self) -> Option<&mut Composite<C>> {
        (**self).as_composite()
    }
}
