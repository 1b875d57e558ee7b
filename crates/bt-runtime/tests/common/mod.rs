#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bt_runtime::{BtNode, BtStatus, Conditional, Result, TickContext};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("bt_runtime=trace"))
        .with_test_writer()
        .try_init();
}

/// Shared, ordered record of lifecycle events.
#[derive(Clone, Default)]
pub struct Events(Rc<RefCell<Vec<String>>>);

impl Events {
    pub fn push(&self, event: String) {
        self.0.borrow_mut().push(event);
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.borrow().iter().filter(|e| e.as_str() == event).count()
    }
}

/// Leaf whose result is controlled from the test through a shared cell.
pub struct Probe {
    label: &'static str,
    result: Rc<Cell<BtStatus>>,
    events: Events,
}

impl Probe {
    pub fn new(label: &'static str, result: BtStatus, events: &Events) -> (Self, Rc<Cell<BtStatus>>) {
        let cell = Rc::new(Cell::new(result));
        (
            Self {
                label,
                result: cell.clone(),
                events: events.clone(),
            },
            cell,
        )
    }

    pub fn fixed(label: &'static str, result: BtStatus, events: &Events) -> Self {
        Self::new(label, result, events).0
    }
}

impl<C> BtNode<C> for Probe {
    fn update(&mut self, _tick: &TickContext, _ctx: &mut C) -> Result<BtStatus> {
        self.events.push(format!("{}:update", self.label));
        Ok(self.result.get())
    }

    fn on_start(&mut self, _tick: &TickContext) {
        self.events.push(format!("{}:start", self.label));
    }

    fn on_end(&mut self) {
        self.events.push(format!("{}:end", self.label));
    }

    fn name(&self) -> &'static str {
        self.label
    }
}

/// Conditional leaf driven by a shared flag that records how it was evaluated.
pub struct Guard {
    label: &'static str,
    flag: Rc<Cell<bool>>,
    events: Events,
}

impl Guard {
    pub fn new(label: &'static str, initial: bool, events: &Events) -> (Self, Rc<Cell<bool>>) {
        let flag = Rc::new(Cell::new(initial));
        (
            Self {
                label,
                flag: flag.clone(),
                events: events.clone(),
            },
            flag,
        )
    }
}

impl<C> Conditional<C> for Guard {
    fn evaluate_condition(
        &mut self,
        _tick: &TickContext,
        _ctx: &mut C,
        _force_update: bool,
    ) -> Result<BtStatus> {
        self.events.push(format!("{}:eval", self.label));
        Ok(BtStatus::from(self.flag.get()))
    }
}

impl<C> BtNode<C> for Guard {
    fn update(&mut self, tick: &TickContext, ctx: &mut C) -> Result<BtStatus> {
        Conditional::<C>::evaluate_condition(self, tick, ctx, false)
    }

    fn on_start(&mut self, _tick: &TickContext) {
        self.events.push(format!("{}:start", self.label));
    }

    fn name(&self) -> &'static str {
        self.label
    }

    fn is_conditional(&self) -> bool {
        true
    }

    fn as_conditional(&mut self) -> Option<&mut dyn Conditional<C>> {
        Some(self)
    }
}

pub fn at(tick: u64, now_seconds: f64) -> TickContext {
    TickContext::new(tick, 0.0, now_seconds)
}
