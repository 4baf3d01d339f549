//! Event payload construction
//!
//! Payloads are assembled as owned Rust values from the OMPT callback
//! arguments, the runtime's directive and data-expression queries, and the
//! device classification. [`Payload::deliver`] lowers them to the C records
//! of `acc_prof.h` only for the duration of one callback invocation, so every
//! string handed to a profiling library is a copy the adapter owns.

use std::ffi::{c_int, c_void, CString};
use std::ptr;

use crate::acc::{
    AccApiInfo, AccConstruct, AccDataEventInfo, AccDeviceApi, AccDeviceType, AccEvent,
    AccEventInfo, AccLaunchEventInfo, AccOtherEventInfo, AccProfCallback, AccProfInfo,
    ACC_ASYNC_QUEUE_NONE, ACC_ASYNC_SYNC, API_INFO_VALID_BYTES, DATA_EVENT_INFO_VALID_BYTES,
    LAUNCH_EVENT_INFO_VALID_BYTES, OPENACC_VERSION, OTHER_EVENT_INFO_VALID_BYTES,
    PROF_INFO_VALID_BYTES,
};
use crate::device::DeviceClass;
use crate::host::{DirectiveInfo, SourceLocation, ToolHost};
use crate::ompt::OmptDirectiveKind;

/// General information (`acc_prof_info`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfInfo {
    pub event: AccEvent,
    pub device: DeviceClass,
    /// Null fields when the runtime offers no directive info
    pub location: SourceLocation,
}

/// Fields shared by every event-specific record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtherEventInfo {
    pub event: AccEvent,
    pub parent_construct: AccConstruct,
    pub implicit: bool,
}

/// Event-specific information (`acc_event_info`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventInfo {
    Other(OtherEventInfo),
    Data {
        other: OtherEventInfo,
        var_name: Option<CString>,
        bytes: usize,
        host_ptr: usize,
        device_ptr: usize,
    },
    /// Kernel name and launch geometry are not available from the runtime.
    Launch(OtherEventInfo),
}

impl EventInfo {
    pub fn other(&self) -> &OtherEventInfo {
        match self {
            EventInfo::Other(other) | EventInfo::Launch(other) => other,
            EventInfo::Data { other, .. } => other,
        }
    }
}

/// Device API information (`acc_api_info`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiInfo {
    pub device_api: AccDeviceApi,
    pub device_type: AccDeviceType,
}

/// The three arguments of one profiling callback invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub prof: ProfInfo,
    pub event: EventInfo,
    pub api: ApiInfo,
}

/// Build the general information record.
pub fn prof_info(event: AccEvent, device: DeviceClass, directive: Option<&DirectiveInfo>) -> ProfInfo {
    ProfInfo {
        event,
        device,
        location: directive.map(|d| d.location.clone()).unwrap_or_default(),
    }
}

/// Build the fields common to every event-specific record.
///
/// Without directive info the event is attributed to the runtime API and
/// marked implicit, which is also what shutdown events outside any directive
/// report.
///
/// # Panics
///
/// Panics unless the event is implicit exactly when the directive kind is
/// unknown.
pub fn other_event_info(event: AccEvent, directive: Option<&DirectiveInfo>) -> OtherEventInfo {
    let Some(directive) = directive else {
        return OtherEventInfo {
            event,
            parent_construct: AccConstruct::RuntimeApi,
            implicit: true,
        };
    };
    if directive.kind == OmptDirectiveKind::Unknown {
        assert!(
            !directive.is_explicit_event,
            "expected is_explicit_event=false for kind=ompt_directive_unknown"
        );
    } else {
        assert!(
            directive.is_explicit_event,
            "expected is_explicit_event=true for kind={:?}",
            directive.kind
        );
    }
    let parent_construct = match directive.kind {
        OmptDirectiveKind::Unknown => AccConstruct::RuntimeApi,
        OmptDirectiveKind::RuntimeApi => AccConstruct::RuntimeApi,
        OmptDirectiveKind::TargetUpdate => AccConstruct::Update,
        OmptDirectiveKind::TargetEnterData => AccConstruct::EnterData,
        OmptDirectiveKind::TargetExitData => AccConstruct::ExitData,
        OmptDirectiveKind::TargetData => AccConstruct::Data,
        OmptDirectiveKind::TargetTeams => AccConstruct::Parallel,
    };
    OtherEventInfo {
        event,
        parent_construct,
        implicit: !directive.is_explicit_event,
    }
}

/// Build a data event record.
pub fn data_event_info(
    event: AccEvent,
    directive: Option<&DirectiveInfo>,
    var_name: Option<CString>,
    bytes: usize,
    host_ptr: usize,
    device_ptr: usize,
) -> EventInfo {
    EventInfo::Data {
        other: other_event_info(event, directive),
        var_name,
        bytes,
        host_ptr,
        device_ptr,
    }
}

/// Build a launch event record.
pub fn launch_event_info(event: AccEvent, directive: Option<&DirectiveInfo>) -> EventInfo {
    EventInfo::Launch(other_event_info(event, directive))
}

/// Build the device API record. No device-specific API is exposed.
pub fn api_info(device: DeviceClass) -> ApiInfo {
    ApiInfo {
        device_api: AccDeviceApi::None,
        device_type: device.device_type,
    }
}

impl Payload {
    /// Payload for events without extra data.
    pub fn other(event: AccEvent, device: DeviceClass, host: &dyn ToolHost) -> Self {
        let directive = host.directive_info();
        Payload {
            prof: prof_info(event, device, directive.as_ref()),
            event: EventInfo::Other(other_event_info(event, directive.as_ref())),
            api: api_info(device),
        }
    }

    /// Payload for a data event; the variable name comes from the runtime.
    pub fn data(
        event: AccEvent,
        device: DeviceClass,
        host: &dyn ToolHost,
        bytes: usize,
        host_ptr: usize,
        device_ptr: usize,
    ) -> Self {
        let directive = host.directive_info();
        Payload {
            prof: prof_info(event, device, directive.as_ref()),
            event: data_event_info(
                event,
                directive.as_ref(),
                host.data_expression(),
                bytes,
                host_ptr,
                device_ptr,
            ),
            api: api_info(device),
        }
    }

    /// Payload for a kernel launch event.
    pub fn launch(event: AccEvent, device: DeviceClass, host: &dyn ToolHost) -> Self {
        let directive = host.directive_info();
        Payload {
            prof: prof_info(event, device, directive.as_ref()),
            event: launch_event_info(event, directive.as_ref()),
            api: api_info(device),
        }
    }

    fn lower_prof_info(&self) -> AccProfInfo {
        let location = &self.prof.location;
        AccProfInfo {
            event_type: self.prof.event,
            valid_bytes: PROF_INFO_VALID_BYTES,
            version: OPENACC_VERSION,
            device_type: self.prof.device.device_type,
            device_number: self.prof.device.device_number,
            thread_id: 0,
            r#async: ACC_ASYNC_SYNC,
            async_queue: ACC_ASYNC_QUEUE_NONE,
            src_file: c_str_ptr(&location.src_file),
            func_name: c_str_ptr(&location.func_name),
            line_no: location.line_no,
            end_line_no: location.end_line_no,
            func_line_no: location.func_line_no,
            func_end_line_no: location.func_end_line_no,
        }
    }

    fn lower_event_info(&self) -> AccEventInfo {
        match &self.event {
            EventInfo::Other(other) => AccEventInfo {
                other_event: AccOtherEventInfo {
                    event_type: other.event,
                    valid_bytes: OTHER_EVENT_INFO_VALID_BYTES,
                    parent_construct: other.parent_construct,
                    implicit: c_int::from(other.implicit),
                    tool_info: ptr::null_mut(),
                },
            },
            EventInfo::Data {
                other,
                var_name,
                bytes,
                host_ptr,
                device_ptr,
            } => AccEventInfo {
                data_event: AccDataEventInfo {
                    event_type: other.event,
                    valid_bytes: DATA_EVENT_INFO_VALID_BYTES,
                    parent_construct: other.parent_construct,
                    implicit: c_int::from(other.implicit),
                    tool_info: ptr::null_mut(),
                    var_name: c_str_ptr(var_name),
                    bytes: *bytes,
                    host_ptr: *host_ptr as *const c_void,
                    device_ptr: *device_ptr as *const c_void,
                },
            },
            EventInfo::Launch(other) => AccEventInfo {
                launch_event: AccLaunchEventInfo {
                    event_type: other.event,
                    valid_bytes: LAUNCH_EVENT_INFO_VALID_BYTES,
                    parent_construct: other.parent_construct,
                    implicit: c_int::from(other.implicit),
                    tool_info: ptr::null_mut(),
                    kernel_name: ptr::null(),
                    num_gangs: 0,
                    num_workers: 0,
                    vector_length: 0,
                },
            },
        }
    }

    fn lower_api_info(&self) -> AccApiInfo {
        AccApiInfo {
            device_api: self.api.device_api,
            valid_bytes: API_INFO_VALID_BYTES,
            device_type: self.api.device_type,
            vendor: 0,
            device_handle: ptr::null(),
            context_handle: ptr::null(),
            async_handle: ptr::null(),
        }
    }

    /// Invoke a profiling callback with this payload.
    pub fn deliver(&self, callback: AccProfCallback) {
        let mut prof = self.lower_prof_info();
        let mut event = self.lower_event_info();
        let mut api = self.lower_api_info();
        // SAFETY: the callback was registered through acc_prof_register with
        // the acc_prof_callback signature; the records and the strings they
        // point to outlive the call.
        unsafe { callback(&mut prof, &mut event, &mut api) };
    }
}

fn c_str_ptr(s: &Option<CString>) -> *const std::ffi::c_char {
    s.as_ref().map_or(ptr::null(), |s| s.as_ptr())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(device_type: AccDeviceType, device_number: i32) -> DeviceClass {
        DeviceClass {
            device_type,
            device_number,
        }
    }

    fn directive(kind: OmptDirectiveKind, is_explicit_event: bool) -> DirectiveInfo {
        DirectiveInfo {
            kind,
            is_explicit_event,
            location: SourceLocation {
                src_file: Some(CString::new("vadd.c").unwrap()),
                func_name: Some(CString::new("main").unwrap()),
                line_no: 14,
                end_line_no: 16,
                func_line_no: 5,
                func_end_line_no: 30,
            },
        }
    }

    #[test]
    fn test_without_directive_info_reports_runtime_api() {
        let other = other_event_info(AccEvent::RuntimeShutdown, None);
        assert_eq!(other.parent_construct, AccConstruct::RuntimeApi);
        assert!(other.implicit);

        let prof = prof_info(AccEvent::RuntimeShutdown, device(AccDeviceType::Host, 0), None);
        assert_eq!(prof.location, SourceLocation::default());
    }

    #[test]
    fn test_directive_kind_to_parent_construct() {
        let cases = [
            (OmptDirectiveKind::RuntimeApi, AccConstruct::RuntimeApi),
            (OmptDirectiveKind::TargetUpdate, AccConstruct::Update),
            (OmptDirectiveKind::TargetEnterData, AccConstruct::EnterData),
            (OmptDirectiveKind::TargetExitData, AccConstruct::ExitData),
            (OmptDirectiveKind::TargetData, AccConstruct::Data),
            (OmptDirectiveKind::TargetTeams, AccConstruct::Parallel),
        ];
        for (kind, construct) in cases {
            let info = other_event_info(AccEvent::Create, Some(&directive(kind, true)));
            assert_eq!(info.parent_construct, construct, "{kind:?}");
            assert!(!info.implicit);
        }
    }

    #[test]
    fn test_unknown_directive_is_implicit_runtime_api() {
        let info = other_event_info(
            AccEvent::DeviceShutdownStart,
            Some(&directive(OmptDirectiveKind::Unknown, false)),
        );
        assert_eq!(info.parent_construct, AccConstruct::RuntimeApi);
        assert!(info.implicit);
    }

    #[test]
    #[should_panic(expected = "expected is_explicit_event=false")]
    fn test_explicit_unknown_directive_is_fatal() {
        other_event_info(
            AccEvent::Create,
            Some(&directive(OmptDirectiveKind::Unknown, true)),
        );
    }

    #[test]
    #[should_panic(expected = "expected is_explicit_event=true for kind=TargetEnterData")]
    fn test_implicit_known_directive_is_fatal() {
        other_event_info(
            AccEvent::EnterDataStart,
            Some(&directive(OmptDirectiveKind::TargetEnterData, false)),
        );
    }

    #[test]
    fn test_api_info_follows_device_classification() {
        let api = api_info(device(AccDeviceType::NotHost, 1));
        assert_eq!(api.device_api, AccDeviceApi::None);
        assert_eq!(api.device_type, AccDeviceType::NotHost);
    }

    #[test]
    fn test_lowered_records() {
        let d = directive(OmptDirectiveKind::TargetEnterData, true);
        let payload = Payload {
            prof: prof_info(AccEvent::Alloc, device(AccDeviceType::NotHost, 1), Some(&d)),
            event: data_event_info(
                AccEvent::Alloc,
                Some(&d),
                Some(CString::new("a[0:n]").unwrap()),
                128,
                0x1000,
                0x2000,
            ),
            api: api_info(device(AccDeviceType::NotHost, 1)),
        };

        let prof = payload.lower_prof_info();
        assert_eq!(prof.version, OPENACC_VERSION);
        assert_eq!(prof.r#async, ACC_ASYNC_SYNC);
        assert_eq!(prof.async_queue, -1);
        assert_eq!(prof.thread_id, 0);
        assert_eq!(prof.line_no, 14);
        assert!(!prof.src_file.is_null());

        let event = payload.lower_event_info();
        let data = unsafe { event.data_event };
        assert_eq!(data.valid_bytes, DATA_EVENT_INFO_VALID_BYTES);
        assert_eq!(data.bytes, 128);
        assert_eq!(data.host_ptr as usize, 0x1000);
        assert_eq!(data.device_ptr as usize, 0x2000);
        assert_eq!(data.implicit, 0);
        assert!(data.tool_info.is_null());
        assert_eq!(unsafe { event.event_type }, AccEvent::Alloc);

        let api = payload.lower_api_info();
        assert_eq!(api.valid_bytes, API_INFO_VALID_BYTES);
        assert_eq!(api.device_type, AccDeviceType::NotHost);
    }

    #[test]
    fn test_launch_record_leaves_geometry_unset() {
        let payload = Payload {
            prof: prof_info(AccEvent::EnqueueLaunchStart, device(AccDeviceType::NotHost, 0), None),
            event: launch_event_info(AccEvent::EnqueueLaunchStart, None),
            api: api_info(device(AccDeviceType::NotHost, 0)),
        };
        let launch = unsafe { payload.lower_event_info().launch_event };
        assert!(launch.kernel_name.is_null());
        assert_eq!(launch.valid_bytes, LAUNCH_EVENT_INFO_VALID_BYTES);
        assert_eq!(launch.implicit, 1);
        assert_eq!(launch.parent_construct, AccConstruct::RuntimeApi);
    }
}
