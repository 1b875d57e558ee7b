use std::marker::PhantomData;

use bt_core::TickContext;

use crate::bt::{BtNode, BtStatus};
use crate::error::Result;

/// A tree element: a behavior plus the status that drives its lifecycle hooks.
///
/// `B` defaults to a boxed trait object so composites can own heterogeneous children; tests and
/// hosts that want typed access to a behavior can keep it concrete.
pub struct Node<C, B = Box<dyn BtNode<C>>> {
    status: BtStatus,
    behavior: B,
    _context: PhantomData<fn(&mut C)>,
}

impl<C> Node<C> {
    /// Box `behavior` into a node that can be stored alongside any other node.
    pub fn boxed(behavior: impl BtNode<C> + 'static) -> Self {
        Self::new(Box::new(behavior) as Box<dyn BtNode<C>>)
    }
}

impl<C, B> Node<C, B> {
    pub fn new(behavior: B) -> Self {
        Self {
            status: BtStatus::Invalid,
            behavior,
            _context: PhantomData,
        }
    }

    pub fn status(&self) -> BtStatus {
        self.status
    }

    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    pub fn behavior_mut(&mut self) -> &mut B {
        &mut self.behavior
    }

}

impl<C, B> Node<C, B>
where
    B: BtNode<C>,
{
    /// Advance this node by one tick.
    ///
    /// `on_start` fires first if the node is `Invalid`; `on_end` fires after any result other
    /// than `Running`. An error from `update` leaves the stored status untouched.
    pub fn tick(&mut self, tick: &TickContext, ctx: &mut C) -> Result<BtStatus> {
        if self.status == BtStatus::Invalid {
            self.behavior.on_start(tick);
        }

        self.status = self.behavior.update(tick, ctx)?;

        if self.status != BtStatus::Running {
            self.behavior.on_end();
        }

        Ok(self.status)
    }

    /// Reset this node and every descendant to `Invalid`.
    ///
    /// `on_end` is not called, even for a node that was `Running`: an invalidated node is treated
    /// as if it never ran.
    pub fn invalidate(&mut self) {
        self.status = BtStatus::Invalid;
        self.behavior.on_invalidate();
    }

    /// Whether the behavior exposes the conditional capability.
    pub fn is_conditional(&self) -> bool {
        self.behavior.is_conditional()
    }

    pub fn name(&self) -> &'static str {
        self.behavior.name()
    }

    /// Erase the behavior type, keeping the current status.
    pub fn into_boxed(self) -> Node<C>
    where
        B: 'static,
    {
        Node {
            status: self.status,
            behavior: Box::new(self.behavior),
            _context: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Probe {
        starts: u32,
        ends: u32,
        invalidations: u32,
        script: Vec<BtStatus>,
    }

    impl BtNode<()> for Probe {
        fn update(&mut self, _tick: &TickContext, _ctx: &mut ()) -> Result<BtStatus> {
            Ok(self.script.remove(0))
        }

        fn on_start(&mut self, _tick: &TickContext) {
            self.starts += 1;
        }

        fn on_end(&mut self) {
            self.ends += 1;
        }

        fn on_invalidate(&mut self) {
            self.invalidations += 1;
        }
    }

    fn probe(script: &[BtStatus]) -> Node<(), Probe> {
        Node::new(Probe {
            script: script.to_vec(),
            ..Probe::default()
        })
    }

    #[test]
    fn start_and_end_bracket_running_ticks() {
        let tick = TickContext::default();
        let mut node = probe(&[BtStatus::Running, BtStatus::Running, BtStatus::Success]);

        assert_eq!(node.tick(&tick, &mut ()).unwrap(), BtStatus::Running);
        assert_eq!(node.tick(&tick, &mut ()).unwrap(), BtStatus::Running);
        assert_eq!((node.behavior().starts, node.behavior().ends), (1, 0));

        assert_eq!(node.tick(&tick, &mut ()).unwrap(), BtStatus::Success);
        assert_eq!((node.behavior().starts, node.behavior().ends), (1, 1));
    }

    #[test]
    fn terminal_status_without_invalidation_does_not_restart() {
        let tick = TickContext::default();
        let mut node = probe(&[BtStatus::Failure, BtStatus::Success]);

        node.tick(&tick, &mut ()).unwrap();
        node.tick(&tick, &mut ()).unwrap();
        assert_eq!(node.behavior().starts, 1);
        assert_eq!(node.behavior().ends, 2);
    }

    #[test]
    fn invalidate_skips_on_end_and_restarts_next_tick() {
        let tick = TickContext::default();
        let mut node = probe(&[BtStatus::Running, BtStatus::Running]);

        node.tick(&tick, &mut ()).unwrap();
        node.invalidate();
        assert_eq!(node.status(), BtStatus::Invalid);
        assert_eq!(node.behavior().ends, 0);
        assert_eq!(node.behavior().invalidations, 1);

        node.tick(&tick, &mut ()).unwrap();
        assert_eq!(node.behavior().starts, 2);
    }

    #[test]
    fn into_boxed_keeps_status() {
        let tick = TickContext::default();
        let mut node = probe(&[BtStatus::Running]);
        node.tick(&tick, &mut ()).unwrap();

        let boxed = node.into_boxed();
        assert_eq!(boxed.status(), BtStatus::Running);
    }
}
