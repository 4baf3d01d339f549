//! The profiling context
//!
//! [`ProfContext`] owns all adapter state: registered callbacks, OMPT
//! subscription counts, deferred registrations, and device tracking. Its
//! lifecycle follows the runtime:
//!
//! - `Bootstrap`: registrations are queued; the runtime has not called the
//!   tool's initialize yet.
//! - `Active`: initialize replayed the queue; registrations take effect
//!   immediately and OMPT callbacks are translated into OpenACC events.
//! - `Finalized`: the runtime shut down; registrations are refused.
//!
//! State sits behind one mutex. Payloads are built under the lock and
//! delivered after it is released, so a profiling callback may call back
//! into `acc_prof_register` or `acc_prof_unregister`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::acc::{AccEvent, AccProfCallback, AccRegister};
use crate::device::{DeviceNumbering, DeviceTracker};
use crate::dispatch;
use crate::error::{EventRef, UsageError};
use crate::host::ToolHost;
use crate::info::Payload;
use crate::ompt::{OmptCallbackKind, OmptId, OmptScopeEndpoint, OmptTarget, OmptTargetDataOp};
use crate::queue::{ActionQueue, RegistrationAction};
use crate::subscription::Subscriptions;

/// Lifecycle phase of a [`ProfContext`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Bootstrap,
    Active,
    Finalized,
}

enum Runtime {
    Bootstrap,
    Active(Box<dyn ToolHost>),
    Finalized,
}

struct State {
    runtime: Runtime,
    subscriptions: Subscriptions,
    queue: ActionQueue,
    devices: DeviceTracker,
}

impl State {
    fn host(&self) -> Option<&dyn ToolHost> {
        match &self.runtime {
            Runtime::Active(host) => Some(host.as_ref()),
            Runtime::Bootstrap | Runtime::Finalized => None,
        }
    }

    /// Callback for `event` and the host to query, if the event would be
    /// delivered right now.
    fn listener(&self, event: AccEvent) -> Option<(AccProfCallback, &dyn ToolHost)> {
        let callback = self.subscriptions.callback(event)?;
        Some((callback, self.host()?))
    }
}

/// Replay one registration request against the subscriptions.
fn apply(
    subscriptions: &mut Subscriptions,
    host: &dyn ToolHost,
    action: RegistrationAction,
) -> Result<(), UsageError> {
    if action.mode != AccRegister::REG {
        return Err(UsageError::UnsupportedToggle(action.event));
    }
    let event = match action.event {
        EventRef::Known(event) => event,
        unknown @ EventRef::Unknown(_) if action.register => {
            return Err(UsageError::UnsupportedRegister(unknown))
        }
        unknown @ EventRef::Unknown(_) => return Err(UsageError::UnsupportedUnregister(unknown)),
    };
    if action.register {
        subscriptions.register(host, event, action.callback, action.mode)
    } else {
        subscriptions.unregister(host, event, action.callback, action.mode)
    }
}

/// OpenACC event raised by an `ompt_callback_target` call, and whether the
/// call describes a sub-region of an already open region.
///
/// # Panics
///
/// Panics on `nowait` region kinds and on `ompt_scope_beginend`, which the
/// runtime does not emit for the constructs the adapter supports.
pub fn target_event(kind: OmptTarget, endpoint: OmptScopeEndpoint) -> (AccEvent, bool) {
    use OmptScopeEndpoint::{Begin, End};
    match (kind, endpoint) {
        (OmptTarget::Target, Begin) => (AccEvent::ComputeConstructStart, false),
        (OmptTarget::Target, End) => (AccEvent::ComputeConstructEnd, false),
        (OmptTarget::EnterData, Begin) => (AccEvent::EnterDataStart, false),
        (OmptTarget::EnterData, End) => (AccEvent::EnterDataEnd, false),
        (OmptTarget::RegionEnterData, Begin) => (AccEvent::EnterDataStart, true),
        (OmptTarget::RegionEnterData, End) => (AccEvent::EnterDataEnd, true),
        (OmptTarget::ExitData, Begin) => (AccEvent::ExitDataStart, false),
        (OmptTarget::ExitData, End) => (AccEvent::ExitDataEnd, false),
        (OmptTarget::RegionExitData, Begin) => (AccEvent::ExitDataStart, true),
        (OmptTarget::RegionExitData, End) => (AccEvent::ExitDataEnd, true),
        (OmptTarget::Update, Begin) => (AccEvent::UpdateStart, false),
        (OmptTarget::Update, End) => (AccEvent::UpdateEnd, false),
        (kind, endpoint) => {
            unreachable!("unexpected ompt_target_t {kind:?} with endpoint {endpoint:?}")
        }
    }
}

/// Classified `ompt_callback_target_data_op` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataOp {
    pub event: AccEvent,
    pub device_num: i32,
    pub host_ptr: usize,
    pub device_ptr: usize,
}

/// OpenACC event, device, and host/device addresses of a data operation.
///
/// Transfers from the device run in the opposite direction, so the source is
/// the device side and the destination the host side.
///
/// # Panics
///
/// Panics on the asynchronous operation kinds.
pub fn data_op(
    optype: OmptTargetDataOp,
    src_addr: usize,
    src_device_num: i32,
    dest_addr: usize,
    dest_device_num: i32,
) -> DataOp {
    let to_device = |event| DataOp {
        event,
        device_num: dest_device_num,
        host_ptr: src_addr,
        device_ptr: dest_addr,
    };
    let from_device = |event| DataOp {
        event,
        device_num: src_device_num,
        host_ptr: dest_addr,
        device_ptr: src_addr,
    };
    match optype {
        OmptTargetDataOp::Associate => to_device(AccEvent::Create),
        OmptTargetDataOp::Disassociate => to_device(AccEvent::Delete),
        OmptTargetDataOp::Alloc => to_device(AccEvent::Alloc),
        OmptTargetDataOp::Delete => to_device(AccEvent::Free),
        OmptTargetDataOp::TransferToDevice => to_device(AccEvent::EnqueueUploadStart),
        OmptTargetDataOp::TransferToDeviceEnd => to_device(AccEvent::EnqueueUploadEnd),
        OmptTargetDataOp::TransferFromDevice => from_device(AccEvent::EnqueueDownloadStart),
        OmptTargetDataOp::TransferFromDeviceEnd => from_device(AccEvent::EnqueueDownloadEnd),
        OmptTargetDataOp::AllocAsync
        | OmptTargetDataOp::TransferToDeviceAsync
        | OmptTargetDataOp::TransferFromDeviceAsync
        | OmptTargetDataOp::DeleteAsync => {
            unreachable!("unexpected ompt_target_data_op_t {optype:?}")
        }
    }
}

/// Process-wide adapter state and the OMPT callback translation
pub struct ProfContext {
    state: Mutex<State>,
}

impl Default for ProfContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfContext {
    pub const fn new() -> Self {
        ProfContext {
            state: Mutex::new(State {
                runtime: Runtime::Bootstrap,
                subscriptions: Subscriptions::new(),
                queue: ActionQueue::new(),
                devices: DeviceTracker::new(),
            }),
        }
    }

    // State is consistent whenever the lock is released, even by a panic.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `acc_prof_register`
    pub fn register(
        &self,
        event: impl Into<EventRef>,
        callback: Option<AccProfCallback>,
        mode: AccRegister,
    ) {
        self.request(RegistrationAction::register(event.into(), callback, mode));
    }

    /// `acc_prof_unregister`
    pub fn unregister(
        &self,
        event: impl Into<EventRef>,
        callback: Option<AccProfCallback>,
        mode: AccRegister,
    ) {
        self.request(RegistrationAction::unregister(event.into(), callback, mode));
    }

    fn request(&self, action: RegistrationAction) {
        let mut guard = self.lock();
        let state = &mut *guard;
        let result = match &state.runtime {
            Runtime::Bootstrap => {
                tracing::trace!(event = %action.event, register = action.register, "deferred");
                state.queue.enqueue(action);
                Ok(())
            }
            Runtime::Active(host) => apply(&mut state.subscriptions, host.as_ref(), action),
            Runtime::Finalized => Err(UsageError::ShutDown(action.event)),
        };
        if let Err(err) = result {
            tracing::warn!("{err}");
        }
    }

    /// Tool initialize: adopt the runtime, replay deferred registrations.
    ///
    /// # Panics
    ///
    /// Panics unless the context is still in bootstrap. The runtime
    /// initializes a tool once, so a second call is fatal even after
    /// finalize.
    pub fn initialize(&self, host: Box<dyn ToolHost>, initial_device_num: i32) {
        let mut guard = self.lock();
        let state = &mut *guard;
        assert!(
            matches!(state.runtime, Runtime::Bootstrap),
            "profiling interface initialized twice"
        );
        state.devices.set_initial_device(initial_device_num);
        tracing::debug!(
            initial_device_num,
            deferred = state.queue.len(),
            "initializing profiling interface"
        );
        for action in state.queue.drain() {
            if let Err(err) = apply(&mut state.subscriptions, host.as_ref(), action) {
                tracing::warn!("{err}");
            }
        }
        state.runtime = Runtime::Active(host);
    }

    /// Tool finalize: raise `acc_ev_runtime_shutdown`, then drop the runtime.
    pub fn finalize(&self) {
        let prepared = {
            let state = self.lock();
            let device = state.devices.classify(state.devices.initial_device());
            state.listener(AccEvent::RuntimeShutdown).map(|(callback, host)| {
                (callback, Payload::other(AccEvent::RuntimeShutdown, device, host))
            })
        };
        if let Some((callback, payload)) = prepared {
            payload.deliver(callback);
        }

        let mut state = self.lock();
        state.devices.clear_regions();
        state.runtime = Runtime::Finalized;
        tracing::debug!("profiling interface finalized");
    }

    /// Install a translation from runtime device numbers to OpenACC device
    /// types. Without one, only host and not-host are distinguished.
    pub fn set_device_numbering(&self, numbering: Option<Box<dyn DeviceNumbering>>) {
        self.lock().devices.set_numbering(numbering);
    }

    fn device_event(&self, kind: OmptCallbackKind, event: AccEvent, device_num: i32) {
        debug_assert!(dispatch::requires(event, kind));
        let prepared = {
            let state = self.lock();
            let device = state.devices.classify(device_num);
            state
                .listener(event)
                .map(|(callback, host)| (callback, Payload::other(event, device, host)))
        };
        if let Some((callback, payload)) = prepared {
            payload.deliver(callback);
        }
    }

    /// `ompt_callback_device_initialize_start`
    pub fn on_device_initialize_start(&self, device_num: i32) {
        self.device_event(
            OmptCallbackKind::DeviceInitializeStart,
            AccEvent::DeviceInitStart,
            device_num,
        );
    }

    /// `ompt_callback_device_initialize`
    pub fn on_device_initialize(&self, device_num: i32) {
        self.device_event(
            OmptCallbackKind::DeviceInitialize,
            AccEvent::DeviceInitEnd,
            device_num,
        );
    }

    /// `ompt_callback_device_finalize_start`
    pub fn on_device_finalize_start(&self, device_num: i32) {
        self.device_event(
            OmptCallbackKind::DeviceFinalizeStart,
            AccEvent::DeviceShutdownStart,
            device_num,
        );
    }

    /// `ompt_callback_device_finalize`
    pub fn on_device_finalize(&self, device_num: i32) {
        self.device_event(
            OmptCallbackKind::DeviceFinalize,
            AccEvent::DeviceShutdownEnd,
            device_num,
        );
    }

    /// `ompt_callback_target`
    ///
    /// Top-level regions open a region session on begin and close it on
    /// end, whether or not anyone listens for the region's own event.
    pub fn on_target(
        &self,
        kind: OmptTarget,
        endpoint: OmptScopeEndpoint,
        device_num: i32,
        target_id: OmptId,
    ) {
        let (event, sub_region) = target_event(kind, endpoint);
        debug_assert!(dispatch::requires(event, OmptCallbackKind::Target));

        let prepared = {
            let mut state = self.lock();
            if !sub_region && endpoint == OmptScopeEndpoint::Begin {
                state.devices.begin_region(target_id, device_num);
            }
            let device = state.devices.classify(device_num);
            let prepared = state
                .listener(event)
                .map(|(callback, host)| (callback, Payload::other(event, device, host)));
            if !sub_region && endpoint == OmptScopeEndpoint::End {
                state.devices.end_region(target_id);
            }
            prepared
        };
        if let Some((callback, payload)) = prepared {
            payload.deliver(callback);
        }
    }

    fn launch_event(&self, kind: OmptCallbackKind, event: AccEvent, target_id: OmptId) {
        debug_assert!(dispatch::requires(event, kind));
        let prepared = {
            let state = self.lock();
            let device_num = state
                .devices
                .region_device(target_id)
                .unwrap_or_else(|| {
                    panic!("unexpected target_id {target_id} for {event}: no open region")
                });
            let device = state.devices.classify(device_num);
            state
                .listener(event)
                .map(|(callback, host)| (callback, Payload::launch(event, device, host)))
        };
        if let Some((callback, payload)) = prepared {
            payload.deliver(callback);
        }
    }

    /// `ompt_callback_target_submit`
    ///
    /// # Panics
    ///
    /// Panics if `target_id` has no open region session.
    pub fn on_target_submit(&self, target_id: OmptId) {
        self.launch_event(
            OmptCallbackKind::TargetSubmit,
            AccEvent::EnqueueLaunchStart,
            target_id,
        );
    }

    /// `ompt_callback_target_submit_end`
    ///
    /// # Panics
    ///
    /// Panics if `target_id` has no open region session.
    pub fn on_target_submit_end(&self, target_id: OmptId) {
        self.launch_event(
            OmptCallbackKind::TargetSubmitEnd,
            AccEvent::EnqueueLaunchEnd,
            target_id,
        );
    }

    /// `ompt_callback_target_data_op`
    pub fn on_target_data_op(
        &self,
        optype: OmptTargetDataOp,
        src_addr: usize,
        src_device_num: i32,
        dest_addr: usize,
        dest_device_num: i32,
        bytes: usize,
    ) {
        let op = data_op(optype, src_addr, src_device_num, dest_addr, dest_device_num);
        debug_assert!(dispatch::requires(op.event, OmptCallbackKind::TargetDataOp));

        let prepared = {
            let state = self.lock();
            // Checked before building the payload: usually nobody listens.
            state.listener(op.event).map(|(callback, host)| {
                let device = state.devices.classify(op.device_num);
                let payload =
                    Payload::data(op.event, device, host, bytes, op.host_ptr, op.device_ptr);
                (callback, payload)
            })
        };
        if let Some((callback, payload)) = prepared {
            payload.deliver(callback);
        }
    }

    pub fn phase(&self) -> Phase {
        match self.lock().runtime {
            Runtime::Bootstrap => Phase::Bootstrap,
            Runtime::Active(_) => Phase::Active,
            Runtime::Finalized => Phase::Finalized,
        }
    }

    /// Number of registrations waiting for initialize.
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn callback(&self, event: AccEvent) -> Option<AccProfCallback> {
        self.lock().subscriptions.callback(event)
    }

    /// Events with a registered callback, in enumeration order.
    pub fn registered_events(&self) -> Vec<AccEvent> {
        self.lock().subscriptions.callbacks().registered().collect()
    }

    pub fn ref_count(&self, kind: OmptCallbackKind) -> u32 {
        self.lock().subscriptions.counts().get(kind)
    }

    pub fn is_subscribed(&self, kind: OmptCallbackKind) -> bool {
        self.lock().subscriptions.counts().is_subscribed(kind)
    }

    pub fn open_regions(&self) -> usize {
        self.lock().devices.open_regions()
    }

    /// Device of the open region `target_id`, if any.
    pub fn region_device(&self, target_id: OmptId) -> Option<i32> {
        self.lock().devices.region_device(target_id)
    }

    pub fn initial_device(&self) -> i32 {
        self.lock().devices.initial_device()
    }
}
