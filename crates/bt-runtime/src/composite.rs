//! Multi-child nodes and the conditional-abort protocol.
//!
//! Sequence-style composites advance one child per tick and remember where they are, so a long
//! running child is resumed rather than re-selected. Conditional aborts let an earlier branch
//! reclaim control: before resuming, the composite re-checks the conditionals guarding earlier
//! branches and rewinds to the first one whose result changed.

use bitflags::bitflags;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use bt_core::{shuffle, DeterministicRng, TickContext};
use tracing::debug;

use crate::bt::{BtNode, BtStatus};
use crate::error::{BtError, Result};
use crate::node::Node;

bitflags! {
    /// Which conditional changes may interrupt a composite.
    ///
    /// `LOWER_PRIORITY` lets the parent abort whatever later sibling is running when this
    /// composite's first conditional changes. `SELF` lets this composite abort its own running
    /// child when one of its earlier conditional children changes.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct AbortType: u8 {
        const LOWER_PRIORITY = 1 << 0;
        const SELF           = 1 << 1;
        const BOTH           = Self::LOWER_PRIORITY.bits() | Self::SELF.bits();
    }
}

impl AbortType {
    pub const NONE: Self = Self::empty();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositeKind {
    Sequence,
    Selector,
    Parallel,
    ParallelSelector,
    RandomSequence,
    RandomSelector,
}

impl CompositeKind {
    pub fn name(self) -> &'static str {
        match self {
            CompositeKind::Sequence => "Sequence",
            CompositeKind::Selector => "Selector",
            CompositeKind::Parallel => "Parallel",
            CompositeKind::ParallelSelector => "ParallelSelector",
            CompositeKind::RandomSequence => "RandomSequence",
            CompositeKind::RandomSelector => "RandomSelector",
        }
    }
}

pub struct Composite<C> {
    kind: CompositeKind,
    abort_type: AbortType,
    children: Vec<Node<C>>,
    current_child_index: usize,
    has_lower_priority_conditional_abort: bool,
    rng: Option<Box<dyn DeterministicRng>>,
}

impl<C> Composite<C> {
    fn with_kind(kind: CompositeKind, children: Vec<Node<C>>) -> Self {
        Self {
            kind,
            abort_type: AbortType::NONE,
            children,
            current_child_index: 0,
            has_lower_priority_conditional_abort: false,
            rng: None,
        }
    }

    /// Ticks children in order; any non-`Success` result is returned as-is.
    pub fn sequence(children: Vec<Node<C>>) -> Self {
        Self::with_kind(CompositeKind::Sequence, children)
    }

    /// Ticks children in order; any non-`Failure` result is returned as-is.
    pub fn selector(children: Vec<Node<C>>) -> Self {
        Self::with_kind(CompositeKind::Selector, children)
    }

    /// Ticks every child every tick; fails on the first failure, succeeds once all succeed.
    pub fn parallel(children: Vec<Node<C>>) -> Self {
        Self::with_kind(CompositeKind::Parallel, children)
    }

    /// Ticks every child every tick; succeeds on the first success, fails once all fail.
    pub fn parallel_selector(children: Vec<Node<C>>) -> Self {
        Self::with_kind(CompositeKind::ParallelSelector, children)
    }

    /// A sequence whose children are shuffled at the start of every evaluation cycle.
    pub fn random_sequence(children: Vec<Node<C>>, rng: impl DeterministicRng + 'static) -> Self {
        let mut composite = Self::with_kind(CompositeKind::RandomSequence, children);
        composite.rng = Some(Box::new(rng));
        composite
    }

    /// A selector whose children are shuffled at the start of every evaluation cycle.
    pub fn random_selector(children: Vec<Node<C>>, rng: impl DeterministicRng + 'static) -> Self {
        let mut composite = Self::with_kind(CompositeKind::RandomSelector, children);
        composite.rng = Some(Box::new(rng));
        composite
    }

    pub fn with_abort_type(mut self, abort_type: AbortType) -> Self {
        self.abort_type = abort_type;
        self
    }

    pub fn add_child(&mut self, child: Node<C>) {
        self.children.push(child);
    }

    pub fn kind(&self) -> CompositeKind {
        self.kind
    }

    pub fn abort_type(&self) -> AbortType {
        self.abort_type
    }

    pub fn children(&self) -> &[Node<C>] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Node<C>] {
        &mut self.children
    }

    pub fn current_child_index(&self) -> usize {
        self.current_child_index
    }

    /// Cached at `on_start`: whether any child can abort lower-priority siblings.
    pub fn has_lower_priority_conditional_abort(&self) -> bool {
        self.has_lower_priority_conditional_abort
    }

    pub fn is_first_child_conditional(&self) -> bool {
        self.children
            .first()
            .is_some_and(|child| child.is_conditional())
    }

    fn has_lower_priority_conditional_abort_in_children(&mut self) -> bool {
        self.children.iter_mut().any(|child| {
            child.behavior_mut().as_composite().is_some_and(|composite| {
                composite.abort_type.contains(AbortType::LOWER_PRIORITY)
                    && composite.is_first_child_conditional()
            })
        })
    }

    fn rewind_to(&mut self, index: usize, reason: &'static str) {
        debug!(
            composite = self.kind.name(),
            from = self.current_child_index,
            to = index,
            reason,
            "conditional abort"
        );
        self.current_child_index = index;
        for child in &mut self.children[index..] {
            child.invalidate();
        }
    }

    /// Re-check the leading conditional of every earlier `LOWER_PRIORITY` child. The first one
    /// whose result differs from `status_check` takes over.
    fn update_lower_priority_abort_conditional(
        &mut self,
        tick: &TickContext,
        ctx: &mut C,
        status_check: BtStatus,
    ) -> Result<()> {
        let mut rewind = None;
        for i in 0..self.current_child_index {
            let Some(composite) = self.children[i].behavior_mut().as_composite() else {
                continue;
            };
            if !composite.abort_type.contains(AbortType::LOWER_PRIORITY) {
                continue;
            }
            let Some(condition) = composite
                .children
                .first_mut()
                .and_then(|first| first.behavior_mut().as_conditional())
            else {
                continue;
            };
            if condition.evaluate_condition(tick, ctx, true)? != status_check {
                rewind = Some(i);
                break;
            }
        }

        if let Some(i) = rewind {
            self.rewind_to(i, "lower_priority");
        }
        Ok(())
    }

    /// Re-check this composite's own earlier conditional children.
    fn update_self_abort_conditional(
        &mut self,
        tick: &TickContext,
        ctx: &mut C,
        status_check: BtStatus,
    ) -> Result<()> {
        let mut rewind = None;
        for i in 0..self.current_child_index {
            let Some(condition) = self.children[i].behavior_mut().as_conditional() else {
                continue;
            };
            if condition.evaluate_condition(tick, ctx, true)? != status_check {
                rewind = Some(i);
                break;
            }
        }

        if let Some(i) = rewind {
            self.rewind_to(i, "self");
        }
        Ok(())
    }

    fn handle_conditional_aborts(
        &mut self,
        tick: &TickContext,
        ctx: &mut C,
        status_check: BtStatus,
    ) -> Result<()> {
        if self.has_lower_priority_conditional_abort {
            self.update_lower_priority_abort_conditional(tick, ctx, status_check)?;
        }
        if self.abort_type.contains(AbortType::SELF) {
            self.update_self_abort_conditional(tick, ctx, status_check)?;
        }
        Ok(())
    }

    /// One child per tick. `continue_on` is the child result that moves on to the next child;
    /// anything else is returned immediately.
    fn update_in_order(
        &mut self,
        tick: &TickContext,
        ctx: &mut C,
        continue_on: BtStatus,
    ) -> Result<BtStatus> {
        if self.current_child_index != 0 {
            self.handle_conditional_aborts(tick, ctx, continue_on)?;
        }

        let status = self.children[self.current_child_index].tick(tick, ctx)?;
        if status != continue_on {
            return Ok(status);
        }

        self.current_child_index += 1;
        if self.current_child_index == self.children.len() {
            self.current_child_index = 0;
            return Ok(continue_on);
        }
        Ok(BtStatus::Running)
    }

    /// Every child every tick. `short_circuit` ends the whole node as soon as one child reports
    /// it; the opposite result is reported once every child agrees on it.
    fn update_parallel(
        &mut self,
        tick: &TickContext,
        ctx: &mut C,
        short_circuit: BtStatus,
    ) -> Result<BtStatus> {
        let settled = short_circuit.invert();
        let mut all_settled = true;
        for child in &mut self.children {
            let status = child.tick(tick, ctx)?;
            if status == short_circuit {
                return Ok(short_circuit);
            }
            if status != settled {
                all_settled = false;
            }
        }

        if all_settled {
            Ok(settled)
        } else {
            Ok(BtStatus::Running)
        }
    }

    fn invalidate_children(&mut self) {
        for child in &mut self.children {
            child.invalidate();
        }
    }
}

impl<C> BtNode<C> for Composite<C> {
    fn update(&mut self, tick: &TickContext, ctx: &mut C) -> Result<BtStatus> {
        if self.children.is_empty() {
            return Err(BtError::EmptyComposite {
                node: self.kind.name(),
            });
        }

        match self.kind {
            CompositeKind::Sequence | CompositeKind::RandomSequence => {
                self.update_in_order(tick, ctx, BtStatus::Success)
            }
            CompositeKind::Selector | CompositeKind::RandomSelector => {
                self.update_in_order(tick, ctx, BtStatus::Failure)
            }
            CompositeKind::Parallel => self.update_parallel(tick, ctx, BtStatus::Failure),
            CompositeKind::ParallelSelector => self.update_parallel(tick, ctx, BtStatus::Success),
        }
    }

    fn on_start(&mut self, _tick: &TickContext) {
        if let Some(rng) = self.rng.as_mut() {
            shuffle(&mut **rng, &mut self.children);
        }
        self.has_lower_priority_conditional_abort =
            self.has_lower_priority_conditional_abort_in_children();
        self.current_child_index = 0;
    }

    fn on_end(&mut self) {
        self.invalidate_children();
    }

    fn on_invalidate(&mut self) {
        self.invalidate_children();
    }

    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn as_composite(&mut self) -> Option<&mut Composite<C>> {
        Some(self)
    }
}
