//! Scene-level tests
//!
//! `scenarios` covers hierarchy, deferral and rendering end to end;
//! `lifecycle` checks hook ordering with a recording probe component.

mod scenarios;

use std::cell::RefCell;
use std::rc::Rc;

use crate::ecs::{Component, ComponentContext, ComponentError};

/// Shared hook log
pub(super) type HookLog = Rc<RefCell<Vec<String>>>;

pub(super) fn hook_log() -> HookLog {
    Rc::new(RefCell::new(Vec::new()))
}

pub(super) fn entries(log: &HookLog) -> Vec<String> {
    log.borrow().clone()
}

/// Component that records every hook as `tag:hook`
pub(super) struct Probe {
    pub tag: &'static str,
    pub log: HookLog,
}

impl Probe {
    pub fn new(tag: &'static str, log: &HookLog) -> Self {
        Self { tag, log: Rc::clone(log) }
    }

    fn record(&self, hook: &str) {
        self.log.borrow_mut().push(format!("{}:{}", self.tag, hook));
    }
}

impl Component for Probe {
    fn awake(&mut self, _ctx: &mut ComponentContext<'_>) {
        self.record("awake");
    }

    fn start(&mut self, _ctx: &mut ComponentContext<'_>) {
        self.record("start");
    }

    fn update(&mut self, _ctx: &mut ComponentContext<'_>, _delta_time: f64) -> Result<(), ComponentError> {
        self.record("update");
        Ok(())
    }

    fn on_enable(&mut self, _ctx: &mut ComponentContext<'_>) {
        self.record("enable");
    }

    fn on_disable(&mut self, _ctx: &mut ComponentContext<'_>) {
        self.record("disable");
    }

    fn on_destroy(&mut self, _ctx: &mut ComponentContext<'_>) {
        self.record("destroy");
    }
}
