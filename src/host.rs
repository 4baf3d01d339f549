//! The host runtime as seen by the adapter
//!
//! [`ToolHost`] is everything the adapter asks of the OpenMP runtime after
//! initialization: toggling OMPT callbacks and two queries describing the
//! directive and variable currently being processed. [`OmptHost`] implements
//! it over the entry points obtained from the runtime's `lookup` function.

use std::ffi::{c_char, CStr, CString};
use std::fmt;

use crate::ompt::{
    OmptCallbackKind, OmptDirectiveInfo, OmptDirectiveKind, OmptFunctionLookup,
    OmptGetDataExpressionFn, OmptGetDirectiveInfoFn, OmptInterfaceFn, OmptSetCallbackFn,
    OmptSetResult, GET_DATA_EXPRESSION_ENTRY, GET_DIRECTIVE_INFO_ENTRY, SET_CALLBACK_ENTRY,
};

/// Source location of the directive that triggered an event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLocation {
    pub src_file: Option<CString>,
    pub func_name: Option<CString>,
    pub line_no: i32,
    pub end_line_no: i32,
    pub func_line_no: i32,
    pub func_end_line_no: i32,
}

/// Owned copy of the runtime's current directive info
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveInfo {
    pub kind: OmptDirectiveKind,
    pub is_explicit_event: bool,
    pub location: SourceLocation,
}

impl Default for DirectiveInfo {
    fn default() -> Self {
        DirectiveInfo {
            kind: OmptDirectiveKind::Unknown,
            is_explicit_event: false,
            location: SourceLocation::default(),
        }
    }
}

impl DirectiveInfo {
    /// Copy a runtime-owned directive info record.
    ///
    /// # Safety
    ///
    /// The string fields of `raw` must be null or point to valid
    /// NUL-terminated strings.
    ///
    /// # Panics
    ///
    /// Panics if `raw.kind` is not a known directive kind.
    pub unsafe fn copy_from(raw: &OmptDirectiveInfo) -> Self {
        let kind = OmptDirectiveKind::try_from(raw.kind)
            .unwrap_or_else(|k| panic!("unexpected ompt_directive_kind_t {k}"));
        DirectiveInfo {
            kind,
            is_explicit_event: raw.is_explicit_event != 0,
            location: SourceLocation {
                // SAFETY: forwarded from the caller.
                src_file: unsafe { copy_c_string(raw.src_file) },
                // SAFETY: forwarded from the caller.
                func_name: unsafe { copy_c_string(raw.func_name) },
                line_no: raw.line_no,
                end_line_no: raw.end_line_no,
                func_line_no: raw.func_line_no,
                func_end_line_no: raw.func_end_line_no,
            },
        }
    }
}

/// Copy a C string the runtime may invalidate later.
///
/// # Safety
///
/// `ptr` must be null or point to a valid NUL-terminated string.
pub unsafe fn copy_c_string(ptr: *const c_char) -> Option<CString> {
    if ptr.is_null() {
        None
    } else {
        // SAFETY: non-null and NUL-terminated per the caller's contract.
        Some(unsafe { CStr::from_ptr(ptr) }.to_owned())
    }
}

/// Capabilities the adapter needs from the host runtime.
pub trait ToolHost: Send {
    /// Subscribe (`enable`) or unsubscribe the adapter's handler for `kind`.
    fn set_callback(&self, kind: OmptCallbackKind, enable: bool) -> OmptSetResult;

    /// Current directive info, or `None` when the runtime has no such query.
    fn directive_info(&self) -> Option<DirectiveInfo>;

    /// Name of the variable currently being mapped, if known.
    fn data_expression(&self) -> Option<CString>;
}

/// Host runtime reached through OMPT entry points
pub struct OmptHost {
    set_callback: Option<OmptSetCallbackFn>,
    get_directive_info: Option<OmptGetDirectiveInfoFn>,
    get_data_expression: Option<OmptGetDataExpressionFn>,
    handler: fn(OmptCallbackKind) -> crate::ompt::OmptCallback,
}

impl fmt::Debug for OmptHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OmptHost")
            .field("set_callback", &self.set_callback.is_some())
            .field("get_directive_info", &self.get_directive_info.is_some())
            .field("get_data_expression", &self.get_data_expression.is_some())
            .finish()
    }
}

impl OmptHost {
    /// Resolve the three entry points the adapter uses.
    ///
    /// `handler` maps each callback kind to the function subscribed for it.
    ///
    /// # Safety
    ///
    /// `lookup` must be the lookup function the runtime passed to the tool's
    /// initialize, and the entry points it returns must have the OMPT
    /// signatures for their names.
    pub unsafe fn from_lookup(
        lookup: OmptFunctionLookup,
        handler: fn(OmptCallbackKind) -> crate::ompt::OmptCallback,
    ) -> Self {
        // SAFETY: lookup is a valid OMPT lookup per the caller's contract.
        let find = |name: &CStr| unsafe { lookup(name.as_ptr()) };

        // SAFETY (all three): the runtime returns the entry point registered
        // under that name, whose signature is fixed by the OMPT interface.
        let set_callback = find(SET_CALLBACK_ENTRY)
            .map(|f| unsafe { std::mem::transmute::<OmptInterfaceFn, OmptSetCallbackFn>(f) });
        let get_directive_info = find(GET_DIRECTIVE_INFO_ENTRY)
            .map(|f| unsafe { std::mem::transmute::<OmptInterfaceFn, OmptGetDirectiveInfoFn>(f) });
        let get_data_expression = find(GET_DATA_EXPRESSION_ENTRY).map(|f| unsafe {
            std::mem::transmute::<OmptInterfaceFn, OmptGetDataExpressionFn>(f)
        });

        if set_callback.is_none() {
            tracing::warn!("runtime does not provide ompt_set_callback; no events will be delivered");
        }
        tracing::debug!(
            directive_info = get_directive_info.is_some(),
            data_expression = get_data_expression.is_some(),
            "resolved OMPT entry points"
        );

        OmptHost {
            set_callback,
            get_directive_info,
            get_data_expression,
            handler,
        }
    }
}

impl ToolHost for OmptHost {
    fn set_callback(&self, kind: OmptCallbackKind, enable: bool) -> OmptSetResult {
        let Some(set_callback) = self.set_callback else {
            return OmptSetResult::Error;
        };
        let callback = enable.then(|| (self.handler)(kind));
        // SAFETY: set_callback came from the runtime's lookup, and the handler
        // for `kind` has the signature the runtime expects for it.
        let raw = unsafe { set_callback(kind.raw(), callback) };
        OmptSetResult::try_from(raw).unwrap_or_else(|raw| {
            tracing::warn!("unexpected ompt_set_result_t {raw} for {}", kind.name());
            OmptSetResult::Error
        })
    }

    fn directive_info(&self) -> Option<DirectiveInfo> {
        let get_directive_info = self.get_directive_info?;
        // SAFETY: entry point from the runtime's lookup.
        let raw = unsafe { get_directive_info() };
        if raw.is_null() {
            return Some(DirectiveInfo::default());
        }
        // SAFETY: the runtime keeps the record and its strings alive until the
        // next directive starts, which cannot happen during this callback.
        Some(unsafe { DirectiveInfo::copy_from(&*raw) })
    }

    fn data_expression(&self) -> Option<CString> {
        let get_data_expression = self.get_data_expression?;
        // SAFETY: entry point from the runtime's lookup; the returned string
        // is null or NUL-terminated.
        unsafe { copy_c_string(get_data_expression()) }
    }
}
