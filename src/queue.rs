//! Registration requests received before the runtime is ready
//!
//! Profiling libraries register while the tool is still starting, before the
//! runtime has handed over `ompt_set_callback`. Requests are kept in arrival
//! order and replayed once from the tool's initialize.

use std::collections::VecDeque;

use crate::acc::{AccProfCallback, AccRegister};
use crate::error::EventRef;

/// One deferred `acc_prof_register` or `acc_prof_unregister` call
#[derive(Debug, Clone, Copy)]
pub struct RegistrationAction {
    /// `true` for register, `false` for unregister
    pub register: bool,
    pub event: EventRef,
    pub callback: Option<AccProfCallback>,
    pub mode: AccRegister,
}

impl RegistrationAction {
    pub fn register(event: EventRef, callback: Option<AccProfCallback>, mode: AccRegister) -> Self {
        RegistrationAction {
            register: true,
            event,
            callback,
            mode,
        }
    }

    pub fn unregister(event: EventRef, callback: Option<AccProfCallback>, mode: AccRegister) -> Self {
        RegistrationAction {
            register: false,
            event,
            callback,
            mode,
        }
    }
}

/// FIFO of deferred registration actions
#[derive(Debug, Default)]
pub struct ActionQueue {
    actions: VecDeque<RegistrationAction>,
}

impl ActionQueue {
    pub const fn new() -> Self {
        ActionQueue {
            actions: VecDeque::new(),
        }
    }

    pub fn enqueue(&mut self, action: RegistrationAction) {
        self.actions.push_back(action);
    }

    /// Pop the oldest action.
    pub fn dequeue(&mut self) -> Option<RegistrationAction> {
        self.actions.pop_front()
    }

    /// Take every queued action, oldest first, leaving the queue empty.
    pub fn drain(&mut self) -> impl Iterator<Item = RegistrationAction> {
        std::mem::take(&mut self.actions).into_iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
