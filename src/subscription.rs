//! Callback registration and OMPT subscription reference counting
//!
//! Each OpenACC event holds at most one profiling callback. Several events
//! share the same OMPT callback (all eight data events need
//! `ompt_callback_target_data_op`), so OMPT subscriptions are reference
//! counted: the runtime is asked to subscribe on the first dependent
//! registration and to unsubscribe when the last one goes away.

use crate::acc::{same_callback, AccEvent, AccProfCallback, AccRegister};
use crate::dispatch;
use crate::error::UsageError;
use crate::host::ToolHost;
use crate::ompt::{OmptCallbackKind, OmptSetResult};

/// Registered profiling callback per event
#[derive(Debug, Clone, Copy)]
pub struct CallbackTable {
    slots: [Option<AccProfCallback>; AccEvent::COUNT],
}

impl Default for CallbackTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackTable {
    pub const fn new() -> Self {
        CallbackTable {
            slots: [None; AccEvent::COUNT],
        }
    }

    pub fn get(&self, event: AccEvent) -> Option<AccProfCallback> {
        self.slots[event.index()]
    }

    fn set(&mut self, event: AccEvent, callback: Option<AccProfCallback>) {
        self.slots[event.index()] = callback;
    }

    /// Events that currently have a callback, in enumeration order.
    pub fn registered(&self) -> impl Iterator<Item = AccEvent> + '_ {
        AccEvent::ALL
            .into_iter()
            .filter(|event| self.slots[event.index()].is_some())
    }
}

/// Outcome of a reference count change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// 0 -> 1: the OMPT callback must be subscribed.
    Subscribe,
    /// 1 -> 0: the OMPT callback must be unsubscribed.
    Unsubscribe,
    /// Count changed without crossing zero.
    Unchanged,
}

/// Reference counts of the OMPT callbacks the adapter depends on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefCounts {
    counts: [u32; OmptCallbackKind::COUNT],
}

impl RefCounts {
    pub const fn new() -> Self {
        RefCounts {
            counts: [0; OmptCallbackKind::COUNT],
        }
    }

    pub fn get(&self, kind: OmptCallbackKind) -> u32 {
        self.counts[kind.index()]
    }

    /// Whether the adapter is subscribed to `kind` with the runtime.
    pub fn is_subscribed(&self, kind: OmptCallbackKind) -> bool {
        self.get(kind) > 0
    }

    pub fn acquire(&mut self, kind: OmptCallbackKind) -> Transition {
        let count = &mut self.counts[kind.index()];
        *count += 1;
        if *count == 1 {
            Transition::Subscribe
        } else {
            Transition::Unchanged
        }
    }

    /// # Panics
    ///
    /// Panics if `kind` has no outstanding references.
    pub fn release(&mut self, kind: OmptCallbackKind) -> Transition {
        let count = &mut self.counts[kind.index()];
        assert!(
            *count > 0,
            "expected OMPT callback registration count to be non-zero: {}",
            kind.name()
        );
        *count -= 1;
        if *count == 0 {
            Transition::Unsubscribe
        } else {
            Transition::Unchanged
        }
    }
}

/// Registered callbacks plus the OMPT subscriptions they imply
#[derive(Debug, Clone, Copy, Default)]
pub struct Subscriptions {
    callbacks: CallbackTable,
    counts: RefCounts,
}

impl Subscriptions {
    pub const fn new() -> Self {
        Subscriptions {
            callbacks: CallbackTable::new(),
            counts: RefCounts::new(),
        }
    }

    pub fn callback(&self, event: AccEvent) -> Option<AccProfCallback> {
        self.callbacks.get(event)
    }

    pub fn callbacks(&self) -> &CallbackTable {
        &self.callbacks
    }

    pub fn counts(&self) -> &RefCounts {
        &self.counts
    }

    /// Store `callback` for `event` and subscribe the OMPT callbacks it needs.
    ///
    /// A subscription the runtime reports as unavailable is logged and kept:
    /// the event stays registered so that a later unregister is symmetric.
    pub fn register(
        &mut self,
        host: &dyn ToolHost,
        event: AccEvent,
        callback: Option<AccProfCallback>,
        mode: AccRegister,
    ) -> Result<(), UsageError> {
        if mode != AccRegister::REG {
            return Err(UsageError::UnsupportedToggle(event.into()));
        }
        let kinds = dispatch::required_callbacks(event)
            .ok_or(UsageError::UnsupportedRegister(event.into()))?;
        let callback = callback.ok_or(UsageError::NullCallback(event.into()))?;
        // TODO: keep a list of callbacks per event so that several profiling
        // libraries can observe the same event.
        if self.callbacks.get(event).is_some() {
            return Err(UsageError::AlreadyRegistered(event));
        }

        self.callbacks.set(event, Some(callback));
        tracing::debug!(event = event.name(), "registered callback");
        for &kind in kinds {
            if self.counts.acquire(kind) != Transition::Subscribe {
                continue;
            }
            let result = host.set_callback(kind, true);
            tracing::trace!(kind = kind.name(), result = result.name(), "subscribed");
            match result {
                OmptSetResult::Error | OmptSetResult::Never | OmptSetResult::Impossible => {
                    tracing::warn!("{} result when registering event: {event}", result.name());
                }
                OmptSetResult::Sometimes | OmptSetResult::SometimesPaired | OmptSetResult::Always => {}
            }
        }
        Ok(())
    }

    /// Clear the callback for `event` and drop the OMPT callbacks nothing
    /// else needs.
    pub fn unregister(
        &mut self,
        host: &dyn ToolHost,
        event: AccEvent,
        callback: Option<AccProfCallback>,
        mode: AccRegister,
    ) -> Result<(), UsageError> {
        if mode != AccRegister::REG {
            return Err(UsageError::UnsupportedToggle(event.into()));
        }
        let kinds = dispatch::required_callbacks(event)
            .ok_or(UsageError::UnsupportedUnregister(event.into()))?;
        let registered = self
            .callbacks
            .get(event)
            .ok_or(UsageError::NotRegistered(event))?;
        if !callback.is_some_and(|callback| same_callback(registered, callback)) {
            return Err(UsageError::WrongCallback(event));
        }

        self.callbacks.set(event, None);
        tracing::debug!(event = event.name(), "unregistered callback");
        for &kind in kinds {
            if self.counts.release(kind) != Transition::Unsubscribe {
                continue;
            }
            let result = host.set_callback(kind, false);
            tracing::trace!(kind = kind.name(), result = result.name(), "unsubscribed");
            if result == OmptSetResult::Error {
                tracing::warn!("ompt_set_error result when unregistering event: {event}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acc::{AccApiInfo, AccEventInfo, AccProfInfo};
    use crate::host::DirectiveInfo;
    use std::cell::RefCell;
    use std::ffi::CString;

    #[derive(Default)]
    struct CountingHost {
        calls: RefCell<Vec<(OmptCallbackKind, bool)>>,
    }

    impl ToolHost for CountingHost {
        fn set_callback(&self, kind: OmptCallbackKind, enable: bool) -> OmptSetResult {
            self.calls.borrow_mut().push((kind, enable));
            OmptSetResult::Always
        }

        fn directive_info(&self) -> Option<DirectiveInfo> {
            None
        }

        fn data_expression(&self) -> Option<CString> {
            None
        }
    }

    unsafe extern "C" fn cb_a(_: *mut AccProfInfo, _: *mut AccEventInfo, _: *mut AccApiInfo) {}
    unsafe extern "C" fn cb_b(_: *mut AccProfInfo, _: *mut AccEventInfo, _: *mut AccApiInfo) {}

    #[test]
    fn test_ref_count_transitions() {
        let mut counts = RefCounts::new();
        assert_eq!(counts.acquire(OmptCallbackKind::Target), Transition::Subscribe);
        assert_eq!(counts.acquire(OmptCallbackKind::Target), Transition::Unchanged);
        assert!(counts.is_subscribed(OmptCallbackKind::Target));
        assert_eq!(counts.release(OmptCallbackKind::Target), Transition::Unchanged);
        assert_eq!(counts.release(OmptCallbackKind::Target), Transition::Unsubscribe);
        assert!(!counts.is_subscribed(OmptCallbackKind::Target));
    }

    #[test]
    #[should_panic(expected = "registration count to be non-zero")]
    fn test_release_underflow_is_fatal() {
        RefCounts::new().release(OmptCallbackKind::TargetSubmit);
    }

    #[test]
    fn test_launch_registration_subscribes_in_table_order() {
        let host = CountingHost::default();
        let mut subs = Subscriptions::new();
        subs.register(&host, AccEvent::EnqueueLaunchStart, Some(cb_a), AccRegister::REG)
            .unwrap();

        assert_eq!(
            *host.calls.borrow(),
            vec![
                (OmptCallbackKind::Target, true),
                (OmptCallbackKind::TargetSubmit, true)
            ]
        );
    }

    #[test]
    fn test_runtime_shutdown_touches_no_subscription() {
        let host = CountingHost::default();
        let mut subs = Subscriptions::new();
        subs.register(&host, AccEvent::RuntimeShutdown, Some(cb_a), AccRegister::REG)
            .unwrap();
        subs.unregister(&host, AccEvent::RuntimeShutdown, Some(cb_a), AccRegister::REG)
            .unwrap();
        assert!(host.calls.borrow().is_empty());
    }

    #[test]
    fn test_usage_errors_leave_state_alone() {
        let host = CountingHost::default();
        let mut subs = Subscriptions::new();

        assert_eq!(
            subs.register(&host, AccEvent::Create, Some(cb_a), AccRegister::TOGGLE),
            Err(UsageError::UnsupportedToggle(AccEvent::Create.into()))
        );
        assert_eq!(
            subs.register(&host, AccEvent::WaitStart, Some(cb_a), AccRegister::REG),
            Err(UsageError::UnsupportedRegister(AccEvent::WaitStart.into()))
        );
        assert_eq!(
            subs.unregister(&host, AccEvent::Create, Some(cb_a), AccRegister::REG),
            Err(UsageError::NotRegistered(AccEvent::Create))
        );

        subs.register(&host, AccEvent::Create, Some(cb_a), AccRegister::REG)
            .unwrap();
        assert_eq!(
            subs.register(&host, AccEvent::Create, Some(cb_b), AccRegister::REG),
            Err(UsageError::AlreadyRegistered(AccEvent::Create))
        );
        assert_eq!(
            subs.unregister(&host, AccEvent::Create, Some(cb_b), AccRegister::REG),
            Err(UsageError::WrongCallback(AccEvent::Create))
        );
        assert_eq!(
            subs.unregister(&host, AccEvent::Create, None, AccRegister::REG),
            Err(UsageError::WrongCallback(AccEvent::Create))
        );
        assert_eq!(
            subs.register(&host, AccEvent::Free, None, AccRegister::REG),
            Err(UsageError::NullCallback(AccEvent::Free.into()))
        );
        assert!(same_callback(subs.callback(AccEvent::Create).unwrap(), cb_a));
        assert_eq!(subs.counts().get(OmptCallbackKind::TargetDataOp), 1);
        assert_eq!(host.calls.borrow().len(), 1);
    }

    #[test]
    fn test_registered_events_listing() {
        let host = CountingHost::default();
        let mut subs = Subscriptions::new();
        subs.register(&host, AccEvent::Free, Some(cb_a), AccRegister::REG).unwrap();
        subs.register(&host, AccEvent::Create, Some(cb_b), AccRegister::REG).unwrap();

        let events: Vec<_> = subs.callbacks().registered().collect();
        assert_eq!(events, vec![AccEvent::Create, AccEvent::Free]);
    }
}
