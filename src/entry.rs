//! C entry points
//!
//! The process-wide [`ProfContext`] and everything the outside world calls:
//! the OpenMP runtime (`ompt_start_tool`, the tool's initialize/finalize,
//! and one handler per OMPT callback kind) and profiling libraries
//! (`acc_prof_register`, `acc_prof_unregister`).
//!
//! Handlers decode the runtime's integer enumerations and forward to the
//! context. A value outside the OMPT contract panics, which aborts the
//! process at the `extern "C"` boundary.

use std::ffi::{c_char, c_int, c_uint, c_void, CStr};
use std::ptr;

use crate::acc::{AccProfCallback, AccRegister};
use crate::adapter::ProfContext;
use crate::config::ProfConfig;
use crate::host::OmptHost;
use crate::logging;
use crate::ompt::{
    OmptCallback, OmptCallbackKind, OmptData, OmptDevice, OmptDeviceFinalizeFn,
    OmptDeviceInitializeFn, OmptFunctionLookup, OmptId, OmptScopeEndpoint, OmptStartToolResult,
    OmptTarget, OmptTargetDataOp, OmptTargetDataOpFn, OmptTargetFn, OmptTargetSubmitFn,
};
use crate::proflib;

static CONTEXT: ProfContext = ProfContext::new();

/// The context driven by the exported entry points.
pub fn context() -> &'static ProfContext {
    &CONTEXT
}

/// `acc_prof_register`
#[no_mangle]
pub extern "C" fn acc_prof_register(
    event: c_int,
    callback: Option<AccProfCallback>,
    mode: AccRegister,
) {
    CONTEXT.register(event, callback, mode);
}

/// `acc_prof_unregister`
#[no_mangle]
pub extern "C" fn acc_prof_unregister(
    event: c_int,
    callback: Option<AccProfCallback>,
    mode: AccRegister,
) {
    CONTEXT.unregister(event, callback, mode);
}

extern "C" fn on_device_initialize_start(
    device_num: c_int,
    _type: *const c_char,
    _device: *mut OmptDevice,
    _lookup: Option<OmptFunctionLookup>,
    _documentation: *const c_char,
) {
    CONTEXT.on_device_initialize_start(device_num);
}

extern "C" fn on_device_initialize(
    device_num: c_int,
    _type: *const c_char,
    _device: *mut OmptDevice,
    _lookup: Option<OmptFunctionLookup>,
    _documentation: *const c_char,
) {
    CONTEXT.on_device_initialize(device_num);
}

extern "C" fn on_device_finalize_start(device_num: c_int) {
    CONTEXT.on_device_finalize_start(device_num);
}

extern "C" fn on_device_finalize(device_num: c_int) {
    CONTEXT.on_device_finalize(device_num);
}

extern "C" fn on_target(
    kind: c_int,
    endpoint: c_int,
    device_num: c_int,
    _task_data: *mut OmptData,
    target_id: OmptId,
    _codeptr_ra: *const c_void,
) {
    let kind =
        OmptTarget::try_from(kind).unwrap_or_else(|raw| panic!("unexpected ompt_target_t {raw}"));
    let endpoint = OmptScopeEndpoint::try_from(endpoint)
        .unwrap_or_else(|raw| panic!("unexpected ompt_scope_endpoint_t {raw}"));
    CONTEXT.on_target(kind, endpoint, device_num, target_id);
}

extern "C" fn on_target_submit(target_id: OmptId, _host_op_id: OmptId, _requested_num_teams: c_uint) {
    CONTEXT.on_target_submit(target_id);
}

extern "C" fn on_target_submit_end(
    target_id: OmptId,
    _host_op_id: OmptId,
    _requested_num_teams: c_uint,
) {
    CONTEXT.on_target_submit_end(target_id);
}

#[allow(clippy::too_many_arguments)]
extern "C" fn on_target_data_op(
    _target_id: OmptId,
    _host_op_id: OmptId,
    optype: c_int,
    src_addr: *mut c_void,
    src_device_num: c_int,
    dest_addr: *mut c_void,
    dest_device_num: c_int,
    bytes: usize,
    _codeptr_ra: *const c_void,
) {
    let optype = OmptTargetDataOp::try_from(optype)
        .unwrap_or_else(|raw| panic!("unexpected ompt_target_data_op_t {raw}"));
    CONTEXT.on_target_data_op(
        optype,
        src_addr as usize,
        src_device_num,
        dest_addr as usize,
        dest_device_num,
        bytes,
    );
}

/// Handler subscribed for `kind`, cast to the generic `ompt_callback_t`.
pub fn handler(kind: OmptCallbackKind) -> OmptCallback {
    // SAFETY: function pointers share one representation, and the runtime
    // calls each handler with the signature of the kind it was set for.
    unsafe {
        match kind {
            OmptCallbackKind::DeviceInitializeStart => {
                std::mem::transmute::<OmptDeviceInitializeFn, OmptCallback>(
                    on_device_initialize_start,
                )
            }
            OmptCallbackKind::DeviceInitialize => {
                std::mem::transmute::<OmptDeviceInitializeFn, OmptCallback>(on_device_initialize)
            }
            OmptCallbackKind::DeviceFinalizeStart => {
                std::mem::transmute::<OmptDeviceFinalizeFn, OmptCallback>(on_device_finalize_start)
            }
            OmptCallbackKind::DeviceFinalize => {
                std::mem::transmute::<OmptDeviceFinalizeFn, OmptCallback>(on_device_finalize)
            }
            OmptCallbackKind::Target => {
                std::mem::transmute::<OmptTargetFn, OmptCallback>(on_target)
            }
            OmptCallbackKind::TargetSubmit => {
                std::mem::transmute::<OmptTargetSubmitFn, OmptCallback>(on_target_submit)
            }
            OmptCallbackKind::TargetSubmitEnd => {
                std::mem::transmute::<OmptTargetSubmitFn, OmptCallback>(on_target_submit_end)
            }
            OmptCallbackKind::TargetDataOp => {
                std::mem::transmute::<OmptTargetDataOpFn, OmptCallback>(on_target_data_op)
            }
        }
    }
}

unsafe extern "C" fn tool_initialize(
    lookup: OmptFunctionLookup,
    initial_device_num: c_int,
    _tool_data: *mut OmptData,
) -> c_int {
    // SAFETY: the runtime passes its own lookup function to initialize.
    let host = unsafe { OmptHost::from_lookup(lookup, handler) };
    CONTEXT.initialize(Box::new(host), initial_device_num);
    1
}

unsafe extern "C" fn tool_finalize(_tool_data: *mut OmptData) {
    CONTEXT.finalize();
}

fn fatal(err: &dyn std::error::Error) -> ! {
    tracing::error!("failure using library from ACC_PROFLIB: {err}");
    std::process::exit(1);
}

/// Start the OpenACC profiling interface.
///
/// Registers the profiling libraries (one linked into the process, then
/// each library listed in `ACC_PROFLIB`) and activates the tool only if at
/// least one of them asked for something.
///
/// # Safety
///
/// `runtime_version` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn acc2omp_ompt_start_tool(
    omp_version: c_uint,
    runtime_version: *const c_char,
) -> *mut OmptStartToolResult {
    logging::init();
    let runtime = if runtime_version.is_null() {
        None
    } else {
        // SAFETY: non-null and NUL-terminated per the caller's contract.
        Some(unsafe { CStr::from_ptr(runtime_version) }.to_string_lossy())
    };
    tracing::debug!(omp_version, runtime = ?runtime, "starting OpenACC profiling interface");

    if let Some(register_library) = proflib::linked_register_library() {
        // SAFETY: a linked acc_register_library has the standard signature.
        unsafe { register_library(acc_prof_register, acc_prof_unregister, None) };
    }
    for path in ProfConfig::default().proflibs() {
        if let Err(err) = proflib::load_and_register(&path, acc_prof_register, acc_prof_unregister)
        {
            fatal(&err);
        }
    }

    if CONTEXT.pending() == 0 {
        tracing::debug!("no profiling callbacks requested, staying inactive");
        return ptr::null_mut();
    }
    // Owned by the runtime until the process exits.
    Box::into_raw(Box::new(OmptStartToolResult {
        initialize: tool_initialize,
        finalize: tool_finalize,
        tool_data: OmptData { value: 0 },
    }))
}

/// OMPT tool discovery entry point.
///
/// # Safety
///
/// Same contract as [`acc2omp_ompt_start_tool`].
#[no_mangle]
pub unsafe extern "C" fn ompt_start_tool(
    omp_version: c_uint,
    runtime_version: *const c_char,
) -> *mut OmptStartToolResult {
    // SAFETY: forwarded from the caller.
    unsafe { acc2omp_ompt_start_tool(omp_version, runtime_version) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handlers_are_distinct() {
        let mut addresses: Vec<usize> = OmptCallbackKind::ALL
            .iter()
            .map(|kind| handler(*kind) as usize)
            .collect();
        addresses.sort_unstable();
        addresses.dedup();
        assert_eq!(addresses.len(), OmptCallbackKind::COUNT);
    }
}
