//! Event dispatch table
//!
//! Maps every OpenACC event to the OMPT callbacks that must be subscribed to
//! observe it. Both the subscription path and the OMPT handlers consult this
//! table, so they cannot disagree about which callbacks matter.
//!
//! `ompt_callback_target` appears in the launch entries because the launch
//! handlers need the target-id to device mapping it maintains.

use crate::acc::AccEvent;
use crate::ompt::OmptCallbackKind;

const DEVICE_INIT_START: &[OmptCallbackKind] = &[OmptCallbackKind::DeviceInitializeStart];
const DEVICE_INIT_END: &[OmptCallbackKind] = &[OmptCallbackKind::DeviceInitialize];
const DEVICE_SHUTDOWN_START: &[OmptCallbackKind] = &[OmptCallbackKind::DeviceFinalizeStart];
const DEVICE_SHUTDOWN_END: &[OmptCallbackKind] = &[OmptCallbackKind::DeviceFinalize];
const DATA_OP: &[OmptCallbackKind] = &[OmptCallbackKind::TargetDataOp];
const TARGET: &[OmptCallbackKind] = &[OmptCallbackKind::Target];
const LAUNCH_START: &[OmptCallbackKind] =
    &[OmptCallbackKind::Target, OmptCallbackKind::TargetSubmit];
const LAUNCH_END: &[OmptCallbackKind] =
    &[OmptCallbackKind::Target, OmptCallbackKind::TargetSubmitEnd];

/// OMPT callbacks required to observe `event`, in subscription order.
///
/// Returns `None` for events this implementation cannot deliver
/// (`acc_ev_none`, `acc_ev_wait_*`, `acc_ev_last`). `acc_ev_runtime_shutdown`
/// needs no OMPT callback since it is raised from the tool's finalize.
pub fn required_callbacks(event: AccEvent) -> Option<&'static [OmptCallbackKind]> {
    let kinds = match event {
        AccEvent::DeviceInitStart => DEVICE_INIT_START,
        AccEvent::DeviceInitEnd => DEVICE_INIT_END,
        AccEvent::DeviceShutdownStart => DEVICE_SHUTDOWN_START,
        AccEvent::DeviceShutdownEnd => DEVICE_SHUTDOWN_END,
        AccEvent::RuntimeShutdown => &[],
        AccEvent::Create
        | AccEvent::Delete
        | AccEvent::Alloc
        | AccEvent::Free
        | AccEvent::EnqueueUploadStart
        | AccEvent::EnqueueUploadEnd
        | AccEvent::EnqueueDownloadStart
        | AccEvent::EnqueueDownloadEnd => DATA_OP,
        AccEvent::EnterDataStart
        | AccEvent::EnterDataEnd
        | AccEvent::ExitDataStart
        | AccEvent::ExitDataEnd
        | AccEvent::UpdateStart
        | AccEvent::UpdateEnd
        | AccEvent::ComputeConstructStart
        | AccEvent::ComputeConstructEnd => TARGET,
        AccEvent::EnqueueLaunchStart => LAUNCH_START,
        AccEvent::EnqueueLaunchEnd => LAUNCH_END,
        AccEvent::None | AccEvent::WaitStart | AccEvent::WaitEnd | AccEvent::Last => {
            return None
        }
    };
    Some(kinds)
}

/// Whether `event` can be registered at all.
pub fn is_supported(event: AccEvent) -> bool {
    required_callbacks(event).is_some()
}

/// Whether a handler bound to `kind` may dispatch `event`.
pub fn requires(event: AccEvent, kind: OmptCallbackKind) -> bool {
    required_callbacks(event).is_some_and(|kinds| kinds.contains(&kind))
}

/// Events whose registration keeps `kind` subscribed.
pub fn events_requiring(kind: OmptCallbackKind) -> impl Iterator<Item = AccEvent> {
    AccEvent::ALL
        .into_iter()
        .filter(move |event| requires(*event, kind))
}
