//! Fluent, top-down tree assembly.
//!
//! The builder keeps a stack of open parents. Composites stay open until
//! [`end_composite`](BehaviorTreeBuilder::end_composite); decorators close themselves as soon as
//! they receive their single child, and a closed node is attached to whatever is open beneath
//! it. Leaves must always have an open parent.
//!
//! ```
//! use bt_runtime::{AbortType, BehaviorTreeBuilder, BtStatus};
//!
//! # fn main() -> bt_runtime::Result<()> {
//! let mut tree = BehaviorTreeBuilder::new(0u32)
//!     .selector(AbortType::NONE)?
//!         .sequence(AbortType::LOWER_PRIORITY)?
//!             .conditional(|n: &u32| (*n >= 3).into())?
//!             .log("enough")?
//!         .end_composite()?
//!         .action(|n: &mut u32| {
//!             *n += 1;
//!             BtStatus::Running
//!         })?
//!     .end_composite()?
//!     .build(0.0)?;
//!
//! tree.tick(0.016)?;
//! # Ok(())
//! # }
//! ```

use std::borrow::Cow;
use std::error::Error;

use bt_core::{derive_seed, SplitMix64};
use tracing::warn;

use crate::bt::{BtNode, BtStatus};
use crate::composite::{AbortType, Composite};
use crate::decorator::{
    AlwaysFail, AlwaysSucceed, ChanceDecorator, ConditionalDecorator, Decorator, Inverter,
    RepeatCount, Repeater, TimeoutDecorator, UntilFail, UntilSuccess,
};
use crate::error::{BtError, Result};
use crate::leaf::{Action, Condition, Log, RandomChance, SubTree, TryAction, Wait};
use crate::node::Node;
use crate::tree::{BehaviorTree, TreeConfig};

const RNG_STREAM: u64 = 0xB7_0000_0001;

enum OpenNode<C> {
    Composite(Composite<C>),
    Decorator(Box<dyn Decorator<C>>),
}

impl<C> OpenNode<C> {
    fn name(&self) -> &'static str {
        match self {
            OpenNode::Composite(composite) => composite.kind().name(),
            OpenNode::Decorator(decorator) => decorator.name(),
        }
    }
}

pub struct BehaviorTreeBuilder<C> {
    context: C,
    stack: Vec<OpenNode<C>>,
    root: Option<Node<C>>,
    config: TreeConfig,
    next_node_id: u64,
}

impl<C: 'static> BehaviorTreeBuilder<C> {
    pub fn new(context: C) -> Self {
        Self {
            context,
            stack: Vec::new(),
            root: None,
            config: TreeConfig::default(),
            next_node_id: 0,
        }
    }

    /// Period and seed used by [`finish`](Self::finish). Set this before adding random nodes.
    pub fn with_config(mut self, config: TreeConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed for every random node added afterwards. Each node gets its own derived stream.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    fn next_rng(&mut self) -> SplitMix64 {
        let node_id = self.next_node_id;
        self.next_node_id += 1;
        SplitMix64::new(derive_seed(self.config.seed, node_id, RNG_STREAM))
    }

    /// Attach a finished node to the open parent, closing decorators as they fill up.
    fn attach(&mut self, mut node: Node<C>) {
        while let Some(open) = self.stack.pop() {
            match open {
                OpenNode::Composite(mut composite) => {
                    composite.add_child(node);
                    self.stack.push(OpenNode::Composite(composite));
                    return;
                }
                OpenNode::Decorator(mut decorator) => {
                    decorator.set_child(node);
                    node = decorator.into_node();
                }
            }
        }
        self.root = Some(node);
    }

    fn push(mut self, open: OpenNode<C>) -> Result<Self> {
        if self.stack.is_empty() && self.root.is_some() {
            let node = open.name();
            warn!(node, "builder already produced a root");
            return Err(BtError::MultipleRoots { node });
        }
        self.stack.push(open);
        Ok(self)
    }

    fn push_composite(self, composite: Composite<C>) -> Result<Self> {
        self.push(OpenNode::Composite(composite))
    }

    fn push_decorator(self, decorator: impl Decorator<C> + 'static) -> Result<Self> {
        self.push(OpenNode::Decorator(Box::new(decorator)))
    }

    /// Attach any leaf behavior to the open parent.
    pub fn leaf(mut self, behavior: impl BtNode<C> + 'static) -> Result<Self> {
        if self.stack.is_empty() {
            let node = behavior.name();
            warn!(node, "leaf added without an open parent");
            return Err(BtError::NoOpenParent { node });
        }
        self.attach(Node::boxed(behavior));
        Ok(self)
    }

    // Leaves

    pub fn action(self, action: impl FnMut(&mut C) -> BtStatus + 'static) -> Result<Self> {
        self.leaf(Action::new(action))
    }

    pub fn action_bool(self, mut action: impl FnMut(&mut C) -> bool + 'static) -> Result<Self> {
        self.action(move |ctx: &mut C| BtStatus::from(action(ctx)))
    }

    pub fn try_action<E>(
        self,
        action: impl FnMut(&mut C) -> std::result::Result<BtStatus, E> + 'static,
    ) -> Result<Self>
    where
        E: Into<Box<dyn Error + Send + Sync>> + 'static,
    {
        self.leaf(TryAction::new(action))
    }

    pub fn conditional(self, cond: impl FnMut(&C) -> BtStatus + 'static) -> Result<Self> {
        self.leaf(Condition::new(cond))
    }

    pub fn conditional_bool(self, mut cond: impl FnMut(&C) -> bool + 'static) -> Result<Self> {
        self.conditional(move |ctx: &C| BtStatus::from(cond(ctx)))
    }

    pub fn random_chance(mut self, probability: f32) -> Result<Self> {
        let rng = self.next_rng();
        self.leaf(RandomChance::new(probability, rng)?)
    }

    pub fn log(self, text: impl Into<Cow<'static, str>>) -> Result<Self> {
        self.leaf(Log::info(text))
    }

    pub fn log_error(self, text: impl Into<Cow<'static, str>>) -> Result<Self> {
        self.leaf(Log::error(text))
    }

    pub fn wait(self, duration_seconds: f32) -> Result<Self> {
        self.leaf(Wait::new(duration_seconds)?)
    }

    /// Embed another tree as a leaf; see [`SubTree`].
    pub fn sub_tree<S: 'static>(self, tree: BehaviorTree<S>) -> Result<Self> {
        self.leaf(SubTree::new(tree))
    }

    // Decorators

    pub fn inverter(self) -> Result<Self> {
        self.push_decorator(Inverter::new())
    }

    pub fn always_succeed(self) -> Result<Self> {
        self.push_decorator(AlwaysSucceed::new())
    }

    pub fn always_fail(self) -> Result<Self> {
        self.push_decorator(AlwaysFail::new())
    }

    pub fn until_success(self) -> Result<Self> {
        self.push_decorator(UntilSuccess::new())
    }

    pub fn until_fail(self) -> Result<Self> {
        self.push_decorator(UntilFail::new())
    }

    /// `-1` repeats forever.
    pub fn repeater(self, count: i64) -> Result<Self> {
        self.push_decorator(Repeater::try_new(count)?)
    }

    pub fn repeat_forever(self) -> Result<Self> {
        self.push_decorator(Repeater::forever())
    }

    pub fn repeater_with(
        self,
        count: RepeatCount,
        end_on_failure: bool,
        end_on_success: bool,
    ) -> Result<Self> {
        self.push_decorator(
            Repeater::new(count)
                .end_on_failure(end_on_failure)
                .end_on_success(end_on_success),
        )
    }

    pub fn timeout(self, duration_seconds: f32) -> Result<Self> {
        self.push_decorator(TimeoutDecorator::new(duration_seconds)?)
    }

    pub fn chance(mut self, probability: f32) -> Result<Self> {
        let rng = self.next_rng();
        self.push_decorator(ChanceDecorator::new(probability, rng)?)
    }

    pub fn conditional_decorator(
        self,
        cond: impl FnMut(&C) -> BtStatus + 'static,
        reevaluate: bool,
    ) -> Result<Self> {
        self.push_decorator(ConditionalDecorator::new(Condition::new(cond), reevaluate))
    }

    // Composites

    pub fn sequence(self, abort_type: AbortType) -> Result<Self> {
        self.push_composite(Composite::sequence(Vec::new()).with_abort_type(abort_type))
    }

    pub fn selector(self, abort_type: AbortType) -> Result<Self> {
        self.push_composite(Composite::selector(Vec::new()).with_abort_type(abort_type))
    }

    pub fn parallel(self) -> Result<Self> {
        self.push_composite(Composite::parallel(Vec::new()))
    }

    pub fn parallel_selector(self) -> Result<Self> {
        self.push_composite(Composite::parallel_selector(Vec::new()))
    }

    pub fn random_sequence(mut self, abort_type: AbortType) -> Result<Self> {
        let rng = self.next_rng();
        self.push_composite(Composite::random_sequence(Vec::new(), rng).with_abort_type(abort_type))
    }

    pub fn random_selector(mut self, abort_type: AbortType) -> Result<Self> {
        let rng = self.next_rng();
        self.push_composite(Composite::random_selector(Vec::new(), rng).with_abort_type(abort_type))
    }

    /// Close the innermost open composite.
    pub fn end_composite(mut self) -> Result<Self> {
        match self.stack.pop() {
            Some(OpenNode::Composite(composite)) => {
                self.attach(Node::boxed(composite));
                Ok(self)
            }
            Some(OpenNode::Decorator(decorator)) => {
                let node = decorator.name();
                warn!(node, "end_composite called while a decorator is open");
                Err(BtError::EndCompositeOnDecorator { node })
            }
            None => {
                warn!("end_composite called with nothing open");
                Err(BtError::NoOpenComposite)
            }
        }
    }

    /// Finish assembly and hand back the root node together with the context.
    pub fn into_parts(self) -> Result<(C, Node<C>)> {
        if !self.stack.is_empty() {
            let open = self.stack.len();
            warn!(open, "building with open nodes");
            return Err(BtError::UnclosedNodes { open });
        }
        let root = self.root.ok_or(BtError::EmptyTree)?;
        Ok((self.context, root))
    }

    pub fn build(self, update_period: f32) -> Result<BehaviorTree<C>> {
        let (context, root) = self.into_parts()?;
        BehaviorTree::new(context, root, update_period)
    }

    /// Build using the configured update period.
    pub fn finish(self) -> Result<BehaviorTree<C>> {
        let config = self.config;
        let (context, root) = self.into_parts()?;
        BehaviorTree::from_config(context, root, config)
    }
}
