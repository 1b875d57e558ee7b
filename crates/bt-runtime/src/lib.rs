//! Priority behavior tree runtime built on `bt-core`.
//!
//! Trees are evaluated incrementally: each [`BehaviorTree::tick`] advances the tree by at most one
//! root evaluation, and `Running` nodes keep whatever progress they need in their own fields.
//! Composites support conditional aborts ([`AbortType`]) so a higher-priority branch can take
//! over from a running lower-priority one the moment its guard changes.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod bt;
pub mod builder;
pub mod composite;
pub mod decorator;
pub mod error;
pub mod leaf;
pub mod node;
pub mod tree;

pub use bt::{BtNode, BtStatus, Conditional};
pub use builder::BehaviorTreeBuilder;
pub use composite::{AbortType, Composite, CompositeKind};
pub use decorator::{
    AlwaysFail, AlwaysSucceed, ChanceDecorator, ConditionalDecorator, Decorator, Inverter,
    RepeatCount, Repeater, TimeoutDecorator, UntilFail, UntilSuccess,
};
pub use error::{BtError, Result};
pub use leaf::{Action, Condition, Log, RandomChance, SubTree, TryAction, Wait};
pub use node::Node;
pub use tree::{BehaviorTree, TreeConfig};

// Primitives hosts need to drive a tree.
pub use bt_core::{DeterministicRng, FixedStep, SplitMix64, SystemClock, TickContext, TimeSource};
