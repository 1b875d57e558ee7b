mod common;

use std::cell::RefCell;
use std::rc::Rc;

use bt_runtime::{
    BehaviorTree, BtError, BtNode, BtStatus, Composite, FixedStep, Node, Result, TickContext,
    TreeConfig, Wait,
};
use common::{Events, Probe};

/// Records the tick context of every update.
struct Clocked(Rc<RefCell<Vec<TickContext>>>);

impl BtNode<()> for Clocked {
    fn update(&mut self, tick: &TickContext, _ctx: &mut ()) -> Result<BtStatus> {
        self.0.borrow_mut().push(*tick);
        Ok(BtStatus::Running)
    }
}

fn probe_tree(update_period: f32, status: BtStatus, events: &Events) -> BehaviorTree<()> {
    let root = Node::boxed(Probe::fixed("root", status, events));
    BehaviorTree::new((), root, update_period).unwrap()
}

#[test]
fn period_throttles_root_evaluation() {
    let events = Events::default();
    let mut tree = probe_tree(0.1, BtStatus::Running, &events);

    assert_eq!(tree.tick(0.05).unwrap(), None);
    assert_eq!(events.count("root:update"), 0);

    assert_eq!(tree.tick(0.06).unwrap(), Some(BtStatus::Running));
    assert_eq!(events.count("root:update"), 1);

    // 0.01 carried over.
    assert_eq!(tree.tick(0.08).unwrap(), None);
    assert_eq!(tree.tick(0.02).unwrap(), Some(BtStatus::Running));
    assert_eq!(events.count("root:update"), 2);
    assert_eq!(tree.evaluations(), 2);
}

#[test]
fn reaching_the_period_exactly_evaluates_once() {
    let events = Events::default();
    let mut tree = probe_tree(0.1, BtStatus::Running, &events);

    assert_eq!(tree.tick(0.05).unwrap(), None);
    assert_eq!(tree.tick(0.05).unwrap(), Some(BtStatus::Running));
    assert_eq!(events.count("root:update"), 1);
    assert_eq!(tree.evaluations(), 1);

    // Nothing left over, so the next half period is not enough.
    assert_eq!(tree.tick(0.05).unwrap(), None);
}

#[test]
fn long_frames_do_not_stall_the_controller() {
    let events = Events::default();
    let mut tree = probe_tree(0.1, BtStatus::Running, &events);

    assert_eq!(tree.tick(1.0e7).unwrap(), Some(BtStatus::Running));
    assert_eq!(tree.tick(f32::MAX).unwrap(), Some(BtStatus::Running));
    assert_eq!(events.count("root:update"), 2);
}

#[test]
fn invalid_frame_delta_is_an_error() {
    let events = Events::default();
    let mut tree = probe_tree(1.0, BtStatus::Running, &events);

    assert!(matches!(
        tree.tick(f32::NAN),
        Err(BtError::InvalidConfig {
            what: "frame delta",
            ..
        })
    ));
    for _ in 0..10 {
        assert_eq!(tree.tick(0.001).unwrap(), None);
    }
    assert_eq!(events.count("root:update"), 0);
    assert!(tree.now_seconds().is_finite());
}

#[test]
fn tick_context_covers_skipped_frames() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut tree = BehaviorTree::new((), Node::boxed(Clocked(seen.clone())), 0.1).unwrap();

    tree.tick(0.05).unwrap();
    tree.tick(0.06).unwrap();
    tree.tick(0.1).unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].tick, 0);
    assert!((seen[0].dt_seconds - 0.11).abs() < 1e-6);
    assert!((seen[0].now_seconds - 0.11).abs() < 1e-6);
    assert_eq!(seen[1].tick, 1);
    assert!((seen[1].dt_seconds - 0.1).abs() < 1e-6);
    assert!((tree.now_seconds() - 0.21).abs() < 1e-6);
}

#[test]
fn finished_root_starts_a_new_cycle() {
    let events = Events::default();
    let mut tree = probe_tree(0.0, BtStatus::Success, &events);

    for _ in 0..3 {
        assert_eq!(tree.tick(0.016).unwrap(), Some(BtStatus::Success));
        assert_eq!(tree.root().status(), BtStatus::Invalid);
    }
    assert_eq!(tree.last_status(), BtStatus::Success);
    assert_eq!(events.count("root:start"), 3);
    assert_eq!(events.count("root:end"), 3);
}

#[test]
fn running_root_is_resumed() {
    let events = Events::default();
    let mut tree = probe_tree(0.0, BtStatus::Running, &events);

    for _ in 0..3 {
        tree.tick(0.016).unwrap();
    }
    assert_eq!(tree.root().status(), BtStatus::Running);
    assert_eq!(events.count("root:start"), 1);
}

#[test]
fn reset_clears_accumulated_time_and_status() {
    let events = Events::default();
    let mut tree = probe_tree(0.1, BtStatus::Running, &events);

    tree.tick(0.1).unwrap();
    tree.tick(0.05).unwrap();
    assert_eq!(tree.last_status(), BtStatus::Running);

    tree.reset();
    assert_eq!(tree.last_status(), BtStatus::Invalid);
    assert_eq!(tree.root().status(), BtStatus::Invalid);
    assert_eq!(tree.tick(0.06).unwrap(), None);
    assert_eq!(tree.tick(0.05).unwrap(), Some(BtStatus::Running));
    assert_eq!(events.count("root:start"), 2);
}

#[test]
fn set_root_hands_back_the_previous_root() {
    let events = Events::default();
    let mut tree = probe_tree(0.0, BtStatus::Running, &events);
    tree.tick(0.0).unwrap();

    let old = tree.set_root(Node::boxed(Probe::fixed("next", BtStatus::Failure, &events)));
    assert_eq!(old.name(), "root");
    assert_eq!(old.status(), BtStatus::Running);
    assert_eq!(tree.last_status(), BtStatus::Invalid);

    assert_eq!(tree.tick(0.0).unwrap(), Some(BtStatus::Failure));
    assert_eq!(events.count("next:update"), 1);
}

#[test]
fn time_source_drives_the_tree() {
    let events = Events::default();
    let mut tree = probe_tree(0.1, BtStatus::Running, &events);
    let mut clock = FixedStep::new(0.05);

    let results: Vec<_> = (0..4).map(|_| tree.tick_with(&mut clock).unwrap()).collect();
    assert_eq!(
        results,
        [None, Some(BtStatus::Running), None, Some(BtStatus::Running)]
    );
}

#[test]
fn wait_measures_tree_time() {
    let root = Node::boxed(Wait::new(1.0).unwrap());
    let mut tree: BehaviorTree<()> =
        BehaviorTree::from_config((), root, TreeConfig::every_frame()).unwrap();

    for _ in 0..4 {
        assert_eq!(tree.tick(0.25).unwrap(), Some(BtStatus::Running));
    }
    assert_eq!(tree.tick(0.25).unwrap(), Some(BtStatus::Success));
}

#[test]
fn errors_propagate_and_keep_the_last_status() {
    let events = Events::default();
    let mut tree = probe_tree(0.0, BtStatus::Running, &events);
    tree.tick(0.0).unwrap();

    tree.set_root(Node::boxed(Composite::sequence(Vec::new())));
    tree.tick(0.0).unwrap_err();
    assert!(matches!(
        tree.tick(0.0),
        Err(BtError::EmptyComposite { node: "Sequence" })
    ));
    assert_eq!(tree.last_status(), BtStatus::Invalid);
}

#[test]
fn update_period_can_change_at_runtime() {
    let events = Events::default();
    let mut tree = probe_tree(1.0, BtStatus::Running, &events);
    assert_eq!(tree.tick(0.5).unwrap(), None);

    tree.set_update_period(0.0).unwrap();
    assert_eq!(tree.tick(0.0).unwrap(), Some(BtStatus::Running));
    assert!(tree.set_update_period(f32::NAN).is_err());
    assert_eq!(tree.update_period(), 0.0);
}
