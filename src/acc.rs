//! OpenACC Profiling Interface ABI (`acc_prof.h`)
//!
//! Everything a profiling library sees: the event enumeration, the three
//! payload records handed to every callback, and the registration function
//! pointer types. Record layouts are `#[repr(C)]` and must stay
//! bit-compatible with the C header; the `*_VALID_BYTES` constants tell
//! callers which trailing fields this implementation fills in.

use std::ffi::{c_char, c_int, c_void};
use std::fmt;
use std::mem::{offset_of, size_of};

use serde::Serialize;

/// Value reported in `acc_prof_info::version`.
///
/// Keep in sync with the compiler's `_OPENACC` macro.
pub const OPENACC_VERSION: c_int = 202011;

/// `acc_async_noval`
pub const ACC_ASYNC_NOVAL: isize = -1;
/// `acc_async_sync`: every event is currently reported as synchronous.
pub const ACC_ASYNC_SYNC: isize = -2;
/// Reported in `async_queue` since no queue numbers are assigned yet.
pub const ACC_ASYNC_QUEUE_NONE: isize = -1;

/// OpenACC event kinds (`acc_event_t`)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "&'static str")]
pub enum AccEvent {
    None = 0,
    DeviceInitStart = 1,
    DeviceInitEnd = 2,
    DeviceShutdownStart = 3,
    DeviceShutdownEnd = 4,
    RuntimeShutdown = 5,
    Create = 6,
    Delete = 7,
    Alloc = 8,
    Free = 9,
    EnterDataStart = 10,
    EnterDataEnd = 11,
    ExitDataStart = 12,
    ExitDataEnd = 13,
    UpdateStart = 14,
    UpdateEnd = 15,
    ComputeConstructStart = 16,
    ComputeConstructEnd = 17,
    EnqueueLaunchStart = 18,
    EnqueueLaunchEnd = 19,
    EnqueueUploadStart = 20,
    EnqueueUploadEnd = 21,
    EnqueueDownloadStart = 22,
    EnqueueDownloadEnd = 23,
    WaitStart = 24,
    WaitEnd = 25,
    Last = 26,
}

impl AccEvent {
    /// Number of `acc_event_t` values, `acc_ev_last` included.
    pub const COUNT: usize = 27;

    /// All events in enumeration order.
    pub const ALL: [AccEvent; Self::COUNT] = [
        AccEvent::None,
        AccEvent::DeviceInitStart,
        AccEvent::DeviceInitEnd,
        AccEvent::DeviceShutdownStart,
        AccEvent::DeviceShutdownEnd,
        AccEvent::RuntimeShutdown,
        AccEvent::Create,
        AccEvent::Delete,
        AccEvent::Alloc,
        AccEvent::Free,
        AccEvent::EnterDataStart,
        AccEvent::EnterDataEnd,
        AccEvent::ExitDataStart,
        AccEvent::ExitDataEnd,
        AccEvent::UpdateStart,
        AccEvent::UpdateEnd,
        AccEvent::ComputeConstructStart,
        AccEvent::ComputeConstructEnd,
        AccEvent::EnqueueLaunchStart,
        AccEvent::EnqueueLaunchEnd,
        AccEvent::EnqueueUploadStart,
        AccEvent::EnqueueUploadEnd,
        AccEvent::EnqueueDownloadStart,
        AccEvent::EnqueueDownloadEnd,
        AccEvent::WaitStart,
        AccEvent::WaitEnd,
        AccEvent::Last,
    ];

    /// Canonical C enumerator name, used in every diagnostic.
    pub fn name(self) -> &'static str {
        match self {
            AccEvent::None => "acc_ev_none",
            AccEvent::DeviceInitStart => "acc_ev_device_init_start",
            AccEvent::DeviceInitEnd => "acc_ev_device_init_end",
            AccEvent::DeviceShutdownStart => "acc_ev_device_shutdown_start",
            AccEvent::DeviceShutdownEnd => "acc_ev_device_shutdown_end",
            AccEvent::RuntimeShutdown => "acc_ev_runtime_shutdown",
            AccEvent::Create => "acc_ev_create",
            AccEvent::Delete => "acc_ev_delete",
            AccEvent::Alloc => "acc_ev_alloc",
            AccEvent::Free => "acc_ev_free",
            AccEvent::EnterDataStart => "acc_ev_enter_data_start",
            AccEvent::EnterDataEnd => "acc_ev_enter_data_end",
            AccEvent::ExitDataStart => "acc_ev_exit_data_start",
            AccEvent::ExitDataEnd => "acc_ev_exit_data_end",
            AccEvent::UpdateStart => "acc_ev_update_start",
            AccEvent::UpdateEnd => "acc_ev_update_end",
            AccEvent::ComputeConstructStart => "acc_ev_compute_construct_start",
            AccEvent::ComputeConstructEnd => "acc_ev_compute_construct_end",
            AccEvent::EnqueueLaunchStart => "acc_ev_enqueue_launch_start",
            AccEvent::EnqueueLaunchEnd => "acc_ev_enqueue_launch_end",
            AccEvent::EnqueueUploadStart => "acc_ev_enqueue_upload_start",
            AccEvent::EnqueueUploadEnd => "acc_ev_enqueue_upload_end",
            AccEvent::EnqueueDownloadStart => "acc_ev_enqueue_download_start",
            AccEvent::EnqueueDownloadEnd => "acc_ev_enqueue_download_end",
            AccEvent::WaitStart => "acc_ev_wait_start",
            AccEvent::WaitEnd => "acc_ev_wait_end",
            AccEvent::Last => "acc_ev_last",
        }
    }

    /// Position of this event's callback slot.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<c_int> for AccEvent {
    type Error = c_int;

    fn try_from(raw: c_int) -> Result<Self, Self::Error> {
        usize::try_from(raw)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(raw)
    }
}

impl From<AccEvent> for &'static str {
    fn from(event: AccEvent) -> Self {
        event.name()
    }
}

impl fmt::Display for AccEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Device types (`acc_device_t`)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccDeviceType {
    None = 0,
    Default = 1,
    Host = 2,
    NotHost = 3,
    Current = 4,
    Nvidia = 5,
    Radeon = 6,
    X86_64 = 7,
    Ppc64le = 8,
}

/// Construct that triggered an event (`acc_construct_t`)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccConstruct {
    Parallel = 0,
    Kernels,
    Loop,
    Data,
    EnterData,
    ExitData,
    HostData,
    Atomic,
    Declare,
    Init,
    Shutdown,
    Set,
    Update,
    Routine,
    Wait,
    RuntimeApi,
    Serial,
}

/// Device-specific API family (`acc_device_api`)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccDeviceApi {
    None = 0,
    Cuda,
    Opencl,
    Coi,
    Other,
}

/// Registration mode (`acc_register_t`).
///
/// Kept open because callers may pass any integer; only [`AccRegister::REG`]
/// is accepted by this implementation.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccRegister(pub c_int);

impl AccRegister {
    pub const REG: AccRegister = AccRegister(0);
    pub const TOGGLE: AccRegister = AccRegister(1);
    pub const TOGGLE_PER_THREAD: AccRegister = AccRegister(2);
}

/// First callback argument: general information (`acc_prof_info`)
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AccProfInfo {
    pub event_type: AccEvent,
    pub valid_bytes: c_int,
    pub version: c_int,
    pub device_type: AccDeviceType,
    pub device_number: c_int,
    pub thread_id: c_int,
    pub r#async: isize,
    pub async_queue: isize,
    pub src_file: *const c_char,
    pub func_name: *const c_char,
    pub line_no: c_int,
    pub end_line_no: c_int,
    pub func_line_no: c_int,
    pub func_end_line_no: c_int,
}

/// Second callback argument for events without extra data
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AccOtherEventInfo {
    pub event_type: AccEvent,
    pub valid_bytes: c_int,
    pub parent_construct: AccConstruct,
    pub implicit: c_int,
    pub tool_info: *mut c_void,
}

/// Second callback argument for data events
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AccDataEventInfo {
    pub event_type: AccEvent,
    pub valid_bytes: c_int,
    pub parent_construct: AccConstruct,
    pub implicit: c_int,
    pub tool_info: *mut c_void,
    pub var_name: *const c_char,
    pub bytes: usize,
    pub host_ptr: *const c_void,
    pub device_ptr: *const c_void,
}

/// Second callback argument for kernel launch events
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AccLaunchEventInfo {
    pub event_type: AccEvent,
    pub valid_bytes: c_int,
    pub parent_construct: AccConstruct,
    pub implicit: c_int,
    pub tool_info: *mut c_void,
    pub kernel_name: *const c_char,
    pub num_gangs: usize,
    pub num_workers: usize,
    pub vector_length: usize,
}

/// Second callback argument (`acc_event_info`), discriminated by `event_type`
#[repr(C)]
#[derive(Clone, Copy)]
pub union AccEventInfo {
    pub event_type: AccEvent,
    pub data_event: AccDataEventInfo,
    pub launch_event: AccLaunchEventInfo,
    pub other_event: AccOtherEventInfo,
}

/// Third callback argument: device API information (`acc_api_info`)
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AccApiInfo {
    pub device_api: AccDeviceApi,
    pub valid_bytes: c_int,
    pub device_type: AccDeviceType,
    pub vendor: c_int,
    pub device_handle: *const c_void,
    pub context_handle: *const c_void,
    pub async_handle: *const c_void,
}

/// Bytes of `acc_prof_info` filled in (through `func_end_line_no`).
pub const PROF_INFO_VALID_BYTES: c_int =
    (offset_of!(AccProfInfo, func_end_line_no) + size_of::<c_int>()) as c_int;
/// Bytes of `acc_other_event_info` filled in (through `tool_info`).
pub const OTHER_EVENT_INFO_VALID_BYTES: c_int =
    (offset_of!(AccOtherEventInfo, tool_info) + size_of::<*mut c_void>()) as c_int;
/// Bytes of `acc_data_event_info` filled in (through `device_ptr`).
pub const DATA_EVENT_INFO_VALID_BYTES: c_int =
    (offset_of!(AccDataEventInfo, device_ptr) + size_of::<*const c_void>()) as c_int;
/// Bytes of `acc_launch_event_info` filled in (through `kernel_name`).
pub const LAUNCH_EVENT_INFO_VALID_BYTES: c_int =
    (offset_of!(AccLaunchEventInfo, kernel_name) + size_of::<*const c_char>()) as c_int;
/// Bytes of `acc_api_info` filled in (through `device_type`).
pub const API_INFO_VALID_BYTES: c_int =
    (offset_of!(AccApiInfo, device_type) + size_of::<AccDeviceType>()) as c_int;

/// `acc_prof_callback`
pub type AccProfCallback =
    unsafe extern "C" fn(*mut AccProfInfo, *mut AccEventInfo, *mut AccApiInfo);

/// `acc_prof_reg`: signature of `acc_prof_register` and `acc_prof_unregister`.
///
/// The event and mode travel as raw integers so that out-of-range values
/// from C callers can be diagnosed instead of being undefined behavior.
pub type AccProfReg = unsafe extern "C" fn(c_int, Option<AccProfCallback>, AccRegister);

/// `acc_query_fn`
pub type AccQueryFn = unsafe extern "C" fn();

/// `acc_prof_lookup_func`
pub type AccProfLookupFunc = unsafe extern "C" fn(*const c_char) -> Option<AccQueryFn>;

/// `acc_register_library`, the entry point every profiling library exports.
pub type AccRegisterLibraryFn =
    unsafe extern "C" fn(AccProfReg, AccProfReg, Option<AccProfLookupFunc>);

/// Symbol name of [`AccRegisterLibraryFn`].
pub const REGISTER_LIBRARY_SYMBOL: &str = "acc_register_library";

/// Compare two callbacks by address.
pub fn same_callback(a: AccProfCallback, b: AccProfCallback) -> bool {
    a as usize == b as usize
}
