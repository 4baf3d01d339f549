// Shared test doubles: a scripted host runtime and recording profiling callbacks
#![allow(dead_code)]

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::sync::{Arc, Mutex};

use accprof::acc::{
    AccApiInfo, AccConstruct, AccDeviceType, AccEvent, AccEventInfo, AccProfInfo,
};
use accprof::host::{DirectiveInfo, SourceLocation, ToolHost};
use accprof::ompt::{OmptCallbackKind, OmptDirectiveKind, OmptSetResult};

/// Every `set_callback` call a [`FakeHost`] received, in order
pub type SetCalls = Arc<Mutex<Vec<(OmptCallbackKind, bool)>>>;

/// Host runtime double answering `set_callback` with a fixed result
pub struct FakeHost {
    calls: SetCalls,
    result: OmptSetResult,
    directive: Option<DirectiveInfo>,
    expression: Option<CString>,
}

impl FakeHost {
    /// Host that accepts every subscription and offers no queries.
    pub fn new() -> (Self, SetCalls) {
        Self::with_result(OmptSetResult::Always)
    }

    pub fn with_result(result: OmptSetResult) -> (Self, SetCalls) {
        let calls = SetCalls::default();
        let host = FakeHost {
            calls: Arc::clone(&calls),
            result,
            directive: None,
            expression: None,
        };
        (host, calls)
    }

    pub fn directive(mut self, directive: DirectiveInfo) -> Self {
        self.directive = Some(directive);
        self
    }

    pub fn expression(mut self, name: &str) -> Self {
        self.expression = Some(CString::new(name).unwrap());
        self
    }
}

impl ToolHost for FakeHost {
    fn set_callback(&self, kind: OmptCallbackKind, enable: bool) -> OmptSetResult {
        self.calls.lock().unwrap().push((kind, enable));
        self.result
    }

    fn directive_info(&self) -> Option<DirectiveInfo> {
        self.directive.clone()
    }

    fn data_expression(&self) -> Option<CString> {
        self.expression.clone()
    }
}

/// Explicit directive of `kind` at `file:line`.
pub fn explicit_directive(kind: OmptDirectiveKind, file: &str, line: i32) -> DirectiveInfo {
    DirectiveInfo {
        kind,
        is_explicit_event: true,
        location: SourceLocation {
            src_file: Some(CString::new(file).unwrap()),
            func_name: Some(CString::new("main").unwrap()),
            line_no: line,
            end_line_no: line + 2,
            func_line_no: 1,
            func_end_line_no: 40,
        },
    }
}

/// Which recording callback was invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorder {
    A,
    B,
}

/// Owned copy of one callback invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub recorder: Recorder,
    pub event: AccEvent,
    pub prof_valid_bytes: i32,
    pub version: i32,
    pub device_type: AccDeviceType,
    pub device_number: i32,
    pub src_file: Option<String>,
    pub line_no: i32,
    pub info_event: AccEvent,
    pub info_valid_bytes: i32,
    pub parent_construct: AccConstruct,
    pub implicit: bool,
    pub data: Option<DataFields>,
    pub api_valid_bytes: i32,
    pub api_device_type: AccDeviceType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataFields {
    pub var_name: Option<String>,
    pub bytes: usize,
    pub host_ptr: usize,
    pub device_ptr: usize,
}

thread_local! {
    // Payloads are delivered on the thread that raised the event.
    static RECORDED: RefCell<Vec<Recorded>> = const { RefCell::new(Vec::new()) };
}

/// Take everything recorded on this thread so far.
pub fn take_recorded() -> Vec<Recorded> {
    RECORDED.with(|r| std::mem::take(&mut *r.borrow_mut()))
}

pub fn is_data_event(event: AccEvent) -> bool {
    matches!(
        event,
        AccEvent::Create
            | AccEvent::Delete
            | AccEvent::Alloc
            | AccEvent::Free
            | AccEvent::EnqueueUploadStart
            | AccEvent::EnqueueUploadEnd
            | AccEvent::EnqueueDownloadStart
            | AccEvent::EnqueueDownloadEnd
    )
}

fn owned(ptr: *const std::ffi::c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }
}

unsafe fn record(
    recorder: Recorder,
    prof: *mut AccProfInfo,
    info: *mut AccEventInfo,
    api: *mut AccApiInfo,
) {
    let (prof, info, api) = unsafe { (&*prof, &*info, &*api) };
    let info_event = unsafe { info.event_type };
    let (info_valid_bytes, parent_construct, implicit, data) = if is_data_event(info_event) {
        let d = unsafe { info.data_event };
        let fields = DataFields {
            var_name: owned(d.var_name),
            bytes: d.bytes,
            host_ptr: d.host_ptr as usize,
            device_ptr: d.device_ptr as usize,
        };
        (d.valid_bytes, d.parent_construct, d.implicit != 0, Some(fields))
    } else if matches!(
        info_event,
        AccEvent::EnqueueLaunchStart | AccEvent::EnqueueLaunchEnd
    ) {
        let l = unsafe { info.launch_event };
        assert!(l.kernel_name.is_null());
        (l.valid_bytes, l.parent_construct, l.implicit != 0, None)
    } else {
        let o = unsafe { info.other_event };
        (o.valid_bytes, o.parent_construct, o.implicit != 0, None)
    };

    let entry = Recorded {
        recorder,
        event: prof.event_type,
        prof_valid_bytes: prof.valid_bytes,
        version: prof.version,
        device_type: prof.device_type,
        device_number: prof.device_number,
        src_file: owned(prof.src_file),
        line_no: prof.line_no,
        info_event,
        info_valid_bytes,
        parent_construct,
        implicit,
        data,
        api_valid_bytes: api.valid_bytes,
        api_device_type: api.device_type,
    };
    RECORDED.with(|r| r.borrow_mut().push(entry));
}

pub unsafe extern "C" fn recorder_a(
    prof: *mut AccProfInfo,
    info: *mut AccEventInfo,
    api: *mut AccApiInfo,
) {
    unsafe { record(Recorder::A, prof, info, api) }
}

pub unsafe extern "C" fn recorder_b(
    prof: *mut AccProfInfo,
    info: *mut AccEventInfo,
    api: *mut AccApiInfo,
) {
    unsafe { record(Recorder::B, prof, info, api) }
}
