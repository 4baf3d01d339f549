//! OMPT tool interface ABI (`omp-tools.h`), restricted to what the adapter uses
//!
//! Enumerations received from the runtime arrive as raw integers and are
//! decoded with `TryFrom<c_int>`; the error value is the raw integer.
//! Values beyond the OpenMP 5.1 set (`*_start`, `*_end` callback and data-op
//! kinds, region sub-kinds, directive info) are runtime extensions made for
//! OpenACC support.

use std::ffi::{c_char, c_int, c_uint, c_void, CStr};

use serde::Serialize;

/// `ompt_id_t`
pub type OmptId = u64;

/// `ompt_data_t`
#[repr(C)]
#[derive(Clone, Copy)]
pub union OmptData {
    pub value: u64,
    pub ptr: *mut c_void,
}

/// Opaque `ompt_device_t`
#[repr(C)]
pub struct OmptDevice {
    _private: [u8; 0],
}

/// `ompt_interface_fn_t`
pub type OmptInterfaceFn = unsafe extern "C" fn();

/// `ompt_function_lookup_t`
pub type OmptFunctionLookup = unsafe extern "C" fn(*const c_char) -> Option<OmptInterfaceFn>;

/// `ompt_callback_t`: type-erased callback handed to `ompt_set_callback`
pub type OmptCallback = unsafe extern "C" fn();

/// `ompt_set_callback_t`
pub type OmptSetCallbackFn = unsafe extern "C" fn(c_int, Option<OmptCallback>) -> c_int;

/// `ompt_get_directive_info_t`
pub type OmptGetDirectiveInfoFn = unsafe extern "C" fn() -> *mut OmptDirectiveInfo;

/// `ompt_get_data_expression_t`
pub type OmptGetDataExpressionFn = unsafe extern "C" fn() -> *const c_char;

/// `ompt_initialize_t`
pub type OmptInitializeFn = unsafe extern "C" fn(OmptFunctionLookup, c_int, *mut OmptData) -> c_int;

/// `ompt_finalize_t`
pub type OmptFinalizeFn = unsafe extern "C" fn(*mut OmptData);

/// `ompt_start_tool_result_t`
#[repr(C)]
pub struct OmptStartToolResult {
    pub initialize: OmptInitializeFn,
    pub finalize: OmptFinalizeFn,
    pub tool_data: OmptData,
}

/// `ompt_callback_device_initialize_t`, also used for the `_start` variant
pub type OmptDeviceInitializeFn = unsafe extern "C" fn(
    c_int,
    *const c_char,
    *mut OmptDevice,
    Option<OmptFunctionLookup>,
    *const c_char,
);

/// `ompt_callback_device_finalize_t`, also used for the `_start` variant
pub type OmptDeviceFinalizeFn = unsafe extern "C" fn(c_int);

/// `ompt_callback_target_t`
pub type OmptTargetFn =
    unsafe extern "C" fn(c_int, c_int, c_int, *mut OmptData, OmptId, *const c_void);

/// `ompt_callback_target_submit_t`, also used for the `_end` variant
pub type OmptTargetSubmitFn = unsafe extern "C" fn(OmptId, OmptId, c_uint);

/// `ompt_callback_target_data_op_t`
pub type OmptTargetDataOpFn = unsafe extern "C" fn(
    OmptId,
    OmptId,
    c_int,
    *mut c_void,
    c_int,
    *mut c_void,
    c_int,
    usize,
    *const c_void,
);

/// Entry points looked up during `initialize`.
pub const SET_CALLBACK_ENTRY: &CStr = c"ompt_set_callback";
pub const GET_DIRECTIVE_INFO_ENTRY: &CStr = c"ompt_get_directive_info";
pub const GET_DATA_EXPRESSION_ENTRY: &CStr = c"ompt_get_data_expression";

/// The OMPT callbacks this adapter may subscribe to (`ompt_callbacks_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "&'static str")]
pub enum OmptCallbackKind {
    DeviceInitializeStart,
    DeviceInitialize,
    DeviceFinalizeStart,
    DeviceFinalize,
    Target,
    TargetSubmit,
    TargetSubmitEnd,
    TargetDataOp,
}

impl OmptCallbackKind {
    pub const COUNT: usize = 8;

    pub const ALL: [OmptCallbackKind; Self::COUNT] = [
        OmptCallbackKind::DeviceInitializeStart,
        OmptCallbackKind::DeviceInitialize,
        OmptCallbackKind::DeviceFinalizeStart,
        OmptCallbackKind::DeviceFinalize,
        OmptCallbackKind::Target,
        OmptCallbackKind::TargetSubmit,
        OmptCallbackKind::TargetSubmitEnd,
        OmptCallbackKind::TargetDataOp,
    ];

    /// Value passed to `ompt_set_callback`.
    pub fn raw(self) -> c_int {
        match self {
            OmptCallbackKind::Target => 8,
            OmptCallbackKind::TargetDataOp => 9,
            OmptCallbackKind::TargetSubmit => 10,
            OmptCallbackKind::DeviceInitialize => 12,
            OmptCallbackKind::DeviceFinalize => 13,
            OmptCallbackKind::DeviceInitializeStart => 38,
            OmptCallbackKind::DeviceFinalizeStart => 39,
            OmptCallbackKind::TargetSubmitEnd => 40,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OmptCallbackKind::DeviceInitializeStart => "ompt_callback_device_initialize_start",
            OmptCallbackKind::DeviceInitialize => "ompt_callback_device_initialize",
            OmptCallbackKind::DeviceFinalizeStart => "ompt_callback_device_finalize_start",
            OmptCallbackKind::DeviceFinalize => "ompt_callback_device_finalize",
            OmptCallbackKind::Target => "ompt_callback_target",
            OmptCallbackKind::TargetSubmit => "ompt_callback_target_submit",
            OmptCallbackKind::TargetSubmitEnd => "ompt_callback_target_submit_end",
            OmptCallbackKind::TargetDataOp => "ompt_callback_target_data_op",
        }
    }

    /// Position of this kind's reference count.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl From<OmptCallbackKind> for &'static str {
    fn from(kind: OmptCallbackKind) -> Self {
        kind.name()
    }
}

/// `ompt_set_result_t`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OmptSetResult {
    Error,
    Never,
    Impossible,
    Sometimes,
    SometimesPaired,
    Always,
}

impl OmptSetResult {
    pub fn name(self) -> &'static str {
        match self {
            OmptSetResult::Error => "ompt_set_error",
            OmptSetResult::Never => "ompt_set_never",
            OmptSetResult::Impossible => "ompt_set_impossible",
            OmptSetResult::Sometimes => "ompt_set_sometimes",
            OmptSetResult::SometimesPaired => "ompt_set_sometimes_paired",
            OmptSetResult::Always => "ompt_set_always",
        }
    }

    /// Whether events can be expected after a subscription with this result.
    pub fn is_available(self) -> bool {
        matches!(
            self,
            OmptSetResult::Sometimes | OmptSetResult::SometimesPaired | OmptSetResult::Always
        )
    }
}

impl TryFrom<c_int> for OmptSetResult {
    type Error = c_int;

    fn try_from(raw: c_int) -> Result<Self, c_int> {
        Ok(match raw {
            0 => OmptSetResult::Error,
            1 => OmptSetResult::Never,
            2 => OmptSetResult::Impossible,
            3 => OmptSetResult::Sometimes,
            4 => OmptSetResult::SometimesPaired,
            5 => OmptSetResult::Always,
            other => return Err(other),
        })
    }
}

/// `ompt_target_t`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OmptTarget {
    Target,
    EnterData,
    ExitData,
    Update,
    /// Enter-data nested inside an already open region.
    RegionEnterData,
    /// Exit-data nested inside an already open region.
    RegionExitData,
    TargetNowait,
    EnterDataNowait,
    ExitDataNowait,
    UpdateNowait,
}

impl TryFrom<c_int> for OmptTarget {
    type Error = c_int;

    fn try_from(raw: c_int) -> Result<Self, c_int> {
        Ok(match raw {
            1 => OmptTarget::Target,
            2 => OmptTarget::EnterData,
            3 => OmptTarget::ExitData,
            4 => OmptTarget::Update,
            5 => OmptTarget::RegionEnterData,
            6 => OmptTarget::RegionExitData,
            9 => OmptTarget::TargetNowait,
            10 => OmptTarget::EnterDataNowait,
            11 => OmptTarget::ExitDataNowait,
            12 => OmptTarget::UpdateNowait,
            other => return Err(other),
        })
    }
}

impl From<OmptTarget> for c_int {
    fn from(kind: OmptTarget) -> Self {
        match kind {
            OmptTarget::Target => 1,
            OmptTarget::EnterData => 2,
            OmptTarget::ExitData => 3,
            OmptTarget::Update => 4,
            OmptTarget::RegionEnterData => 5,
            OmptTarget::RegionExitData => 6,
            OmptTarget::TargetNowait => 9,
            OmptTarget::EnterDataNowait => 10,
            OmptTarget::ExitDataNowait => 11,
            OmptTarget::UpdateNowait => 12,
        }
    }
}

/// `ompt_scope_endpoint_t`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OmptScopeEndpoint {
    Begin,
    End,
    BeginEnd,
}

impl TryFrom<c_int> for OmptScopeEndpoint {
    type Error = c_int;

    fn try_from(raw: c_int) -> Result<Self, c_int> {
        Ok(match raw {
            1 => OmptScopeEndpoint::Begin,
            2 => OmptScopeEndpoint::End,
            3 => OmptScopeEndpoint::BeginEnd,
            other => return Err(other),
        })
    }
}

impl From<OmptScopeEndpoint> for c_int {
    fn from(endpoint: OmptScopeEndpoint) -> Self {
        match endpoint {
            OmptScopeEndpoint::Begin => 1,
            OmptScopeEndpoint::End => 2,
            OmptScopeEndpoint::BeginEnd => 3,
        }
    }
}

/// `ompt_target_data_op_t`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OmptTargetDataOp {
    Alloc,
    TransferToDevice,
    TransferFromDevice,
    Delete,
    Associate,
    Disassociate,
    TransferToDeviceEnd,
    TransferFromDeviceEnd,
    AllocAsync,
    TransferToDeviceAsync,
    TransferFromDeviceAsync,
    DeleteAsync,
}

impl TryFrom<c_int> for OmptTargetDataOp {
    type Error = c_int;

    fn try_from(raw: c_int) -> Result<Self, c_int> {
        Ok(match raw {
            1 => OmptTargetDataOp::Alloc,
            2 => OmptTargetDataOp::TransferToDevice,
            3 => OmptTargetDataOp::TransferFromDevice,
            4 => OmptTargetDataOp::Delete,
            5 => OmptTargetDataOp::Associate,
            6 => OmptTargetDataOp::Disassociate,
            7 => OmptTargetDataOp::TransferToDeviceEnd,
            8 => OmptTargetDataOp::TransferFromDeviceEnd,
            17 => OmptTargetDataOp::AllocAsync,
            18 => OmptTargetDataOp::TransferToDeviceAsync,
            19 => OmptTargetDataOp::TransferFromDeviceAsync,
            20 => OmptTargetDataOp::DeleteAsync,
            other => return Err(other),
        })
    }
}

impl From<OmptTargetDataOp> for c_int {
    fn from(op: OmptTargetDataOp) -> Self {
        match op {
            OmptTargetDataOp::Alloc => 1,
            OmptTargetDataOp::TransferToDevice => 2,
            OmptTargetDataOp::TransferFromDevice => 3,
            OmptTargetDataOp::Delete => 4,
            OmptTargetDataOp::Associate => 5,
            OmptTargetDataOp::Disassociate => 6,
            OmptTargetDataOp::TransferToDeviceEnd => 7,
            OmptTargetDataOp::TransferFromDeviceEnd => 8,
            OmptTargetDataOp::AllocAsync => 17,
            OmptTargetDataOp::TransferToDeviceAsync => 18,
            OmptTargetDataOp::TransferFromDeviceAsync => 19,
            OmptTargetDataOp::DeleteAsync => 20,
        }
    }
}

/// `ompt_directive_kind_t`: the directive currently executing, as the
/// compiler reported it to the runtime.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OmptDirectiveKind {
    Unknown = 0,
    TargetTeams = 1,
    TargetData = 2,
    TargetEnterData = 3,
    TargetExitData = 4,
    TargetUpdate = 5,
    RuntimeApi = 6,
}

impl TryFrom<c_int> for OmptDirectiveKind {
    type Error = c_int;

    fn try_from(raw: c_int) -> Result<Self, c_int> {
        Ok(match raw {
            0 => OmptDirectiveKind::Unknown,
            1 => OmptDirectiveKind::TargetTeams,
            2 => OmptDirectiveKind::TargetData,
            3 => OmptDirectiveKind::TargetEnterData,
            4 => OmptDirectiveKind::TargetExitData,
            5 => OmptDirectiveKind::TargetUpdate,
            6 => OmptDirectiveKind::RuntimeApi,
            other => return Err(other),
        })
    }
}

/// `ompt_directive_info_t`, owned by the runtime and overwritten per directive.
///
/// `kind` is kept raw for the same reason as every other inbound enumeration.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OmptDirectiveInfo {
    pub kind: c_int,
    pub is_explicit_event: c_int,
    pub src_file: *const c_char,
    pub func_name: *const c_char,
    pub line_no: c_int,
    pub end_line_no: c_int,
    pub func_line_no: c_int,
    pub func_end_line_no: c_int,
}

impl Default for OmptDirectiveInfo {
    fn default() -> Self {
        OmptDirectiveInfo {
            kind: OmptDirectiveKind::Unknown as c_int,
            is_explicit_event: 0,
            src_file: std::ptr::null(),
            func_name: std::ptr::null(),
            line_no: 0,
            end_line_no: 0,
            func_line_no: 0,
            func_end_line_no: 0,
        }
    }
}
