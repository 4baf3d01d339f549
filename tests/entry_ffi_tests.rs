//! Integration tests driving the exported C entry points the way an OpenMP
//! runtime and a profiling library would
//!
//! The entry points share one process-wide context, so everything runs in a
//! single serialized lifecycle test.

mod utils;

use std::ffi::{c_char, c_int, c_void, CStr};
use std::ptr;
use std::sync::Mutex;

use accprof::acc::{AccDeviceType, AccEvent, AccRegister};
use accprof::entry::{acc2omp_ompt_start_tool, acc_prof_register, acc_prof_unregister, context, handler};
use accprof::ompt::{
    OmptCallback, OmptCallbackKind, OmptData, OmptDeviceInitializeFn, OmptInterfaceFn,
    OmptTargetDataOpFn,
};
use accprof::Phase;
use serial_test::serial;
use utils::{recorder_a, recorder_b, take_recorded};

/// (kind, handler address) for every ompt_set_callback call
static SET_CALLS: Mutex<Vec<(c_int, Option<usize>)>> = Mutex::new(Vec::new());

unsafe extern "C" fn fake_set_callback(which: c_int, callback: Option<OmptCallback>) -> c_int {
    SET_CALLS
        .lock()
        .unwrap()
        .push((which, callback.map(|f| f as usize)));
    5 // ompt_set_always
}

unsafe extern "C" fn fake_lookup(name: *const c_char) -> Option<OmptInterfaceFn> {
    let name = unsafe { CStr::from_ptr(name) };
    if name == c"ompt_set_callback" {
        Some(unsafe {
            std::mem::transmute::<
                unsafe extern "C" fn(c_int, Option<OmptCallback>) -> c_int,
                OmptInterfaceFn,
            >(fake_set_callback)
        })
    } else {
        None
    }
}

fn subscribed_handler(kind: OmptCallbackKind) -> usize {
    SET_CALLS
        .lock()
        .unwrap()
        .iter()
        .find(|(which, _)| *which == kind.raw())
        .and_then(|(_, callback)| *callback)
        .unwrap_or_else(|| panic!("{} was not subscribed", kind.name()))
}

#[test]
#[serial]
fn test_full_tool_lifecycle() {
    std::env::remove_var("ACC_PROFLIB");

    // Nothing registered: the tool declines to be activated.
    let declined = unsafe { acc2omp_ompt_start_tool(201811, ptr::null()) };
    assert!(declined.is_null());

    acc_prof_register(AccEvent::Create as c_int, Some(recorder_a), AccRegister::REG);
    acc_prof_register(AccEvent::DeviceInitStart as c_int, Some(recorder_a), AccRegister::REG);
    acc_prof_register(AccEvent::RuntimeShutdown as c_int, Some(recorder_b), AccRegister::REG);
    assert_eq!(context().phase(), Phase::Bootstrap);
    assert_eq!(context().pending(), 3);

    let result = unsafe { acc2omp_ompt_start_tool(201811, c"test runtime".as_ptr()) };
    assert!(!result.is_null());
    let mut result = unsafe { Box::from_raw(result) };

    let initialized = unsafe { (result.initialize)(fake_lookup, 0, &mut result.tool_data) };
    assert_eq!(initialized, 1);
    assert_eq!(context().phase(), Phase::Active);
    assert_eq!(context().pending(), 0);

    // Each subscription installs the handler for its own kind.
    let data_op = subscribed_handler(OmptCallbackKind::TargetDataOp);
    let device_init = subscribed_handler(OmptCallbackKind::DeviceInitializeStart);
    assert_eq!(data_op, handler(OmptCallbackKind::TargetDataOp) as usize);
    assert_eq!(device_init, handler(OmptCallbackKind::DeviceInitializeStart) as usize);
    assert_eq!(SET_CALLS.lock().unwrap().len(), 2);

    take_recorded();
    unsafe {
        let device_init: OmptDeviceInitializeFn = std::mem::transmute(device_init);
        device_init(1, c"gpu".as_ptr(), ptr::null_mut(), None, ptr::null());

        let data_op: OmptTargetDataOpFn = std::mem::transmute(data_op);
        data_op(
            1,
            2,
            5, // ompt_target_data_associate
            0x100 as *mut c_void,
            0,
            0x200 as *mut c_void,
            1,
            32,
            ptr::null(),
        );
        // ompt_target_data_alloc: nobody listens for acc_ev_alloc.
        data_op(1, 3, 1, 0x100 as *mut c_void, 0, 0x200 as *mut c_void, 1, 32, ptr::null());
    }
    let recorded = take_recorded();
    let events: Vec<_> = recorded.iter().map(|r| r.event).collect();
    assert_eq!(events, vec![AccEvent::DeviceInitStart, AccEvent::Create]);
    assert_eq!(recorded[0].device_type, AccDeviceType::NotHost);
    let data = recorded[1].data.as_ref().unwrap();
    assert_eq!((data.host_ptr, data.device_ptr, data.bytes), (0x100, 0x200, 32));

    acc_prof_unregister(AccEvent::Create as c_int, Some(recorder_a), AccRegister::REG);
    assert_eq!(
        SET_CALLS.lock().unwrap().last(),
        Some(&(OmptCallbackKind::TargetDataOp.raw(), None))
    );

    unsafe { (result.finalize)(&mut result.tool_data as *mut OmptData) };
    assert_eq!(context().phase(), Phase::Finalized);
    let recorded = take_recorded();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].event, AccEvent::RuntimeShutdown);
    assert_eq!(recorded[0].device_type, AccDeviceType::Host);
    assert_eq!(recorded[0].device_number, 0);

    acc_prof_register(AccEvent::Delete as c_int, Some(recorder_a), AccRegister::REG);
    assert!(context().callback(AccEvent::Delete).is_none());
}
