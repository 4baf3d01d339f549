//! Profiling library loading
//!
//! A profiling library is any shared object exporting
//! `acc_register_library`. Libraries are loaded with `dlopen` and never
//! unloaded: the callbacks they register are invoked until the process exits.

use std::ffi::{c_void, CStr, CString};

use crate::acc::{AccProfReg, AccRegisterLibraryFn, REGISTER_LIBRARY_SYMBOL};
use crate::error::ProfLibError;

/// Split a library list on any of `separators`, skipping empty entries.
pub fn split_list<'a>(value: &'a str, separators: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    value
        .split(move |c| separators.contains(c))
        .filter(|entry| !entry.is_empty())
}

/// Most recent loader error, or a generic reason when there is none.
fn last_dl_error() -> String {
    // SAFETY: dlerror returns null or a NUL-terminated string that stays
    // valid until the next loader call on this thread.
    let message = unsafe { libc::dlerror() };
    if message.is_null() {
        "unknown dynamic loader error".to_string()
    } else {
        // SAFETY: checked non-null above.
        unsafe { CStr::from_ptr(message) }
            .to_string_lossy()
            .into_owned()
    }
}

/// A loaded profiling library
#[derive(Debug)]
pub struct ProfLib {
    path: String,
    handle: *mut c_void,
}

impl ProfLib {
    /// `dlopen` the library at `path`.
    pub fn open(path: &str) -> Result<Self, ProfLibError> {
        let c_path = CString::new(path).map_err(|_| ProfLibError::InvalidPath(path.to_string()))?;
        // SAFETY: c_path is NUL-terminated. Running the library's
        // initializers is what loading a profiling library means.
        let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_LAZY) };
        if handle.is_null() {
            return Err(ProfLibError::Open {
                path: path.to_string(),
                reason: last_dl_error(),
            });
        }
        tracing::debug!(path, "loaded profiling library");
        Ok(ProfLib {
            path: path.to_string(),
            handle,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Resolve the library's `acc_register_library`.
    pub fn register_library(&self) -> Result<AccRegisterLibraryFn, ProfLibError> {
        // SAFETY: handle came from a successful dlopen and is never closed.
        let symbol = unsafe { lookup_register_library(self.handle) };
        symbol.ok_or_else(|| ProfLibError::MissingEntryPoint {
            path: self.path.clone(),
            reason: last_dl_error(),
        })
    }
}

/// Resolve `acc_register_library` in `handle`.
///
/// # Safety
///
/// `handle` must be a live `dlopen` handle or a pseudo-handle such as
/// `RTLD_DEFAULT`.
unsafe fn lookup_register_library(handle: *mut c_void) -> Option<AccRegisterLibraryFn> {
    let name = CString::new(REGISTER_LIBRARY_SYMBOL).ok()?;
    // SAFETY: forwarded from the caller; name is NUL-terminated.
    let symbol = unsafe { libc::dlsym(handle, name.as_ptr()) };
    if symbol.is_null() {
        None
    } else {
        // SAFETY: acc_register_library has the acc_register_library
        // signature in every conforming profiling library.
        Some(unsafe { std::mem::transmute::<*mut c_void, AccRegisterLibraryFn>(symbol) })
    }
}

/// `acc_register_library` already present in the process, e.g. linked into
/// the application itself.
pub fn linked_register_library() -> Option<AccRegisterLibraryFn> {
    // SAFETY: RTLD_DEFAULT searches the global symbol namespace.
    unsafe { lookup_register_library(libc::RTLD_DEFAULT) }
}

/// Load `path` and call its `acc_register_library` with `register` and
/// `unregister`. No lookup function is offered.
pub fn load_and_register(
    path: &str,
    register: AccProfReg,
    unregister: AccProfReg,
) -> Result<(), ProfLibError> {
    let lib = ProfLib::open(path)?;
    let register_library = lib.register_library()?;
    tracing::debug!(path = lib.path(), "calling acc_register_library");
    // SAFETY: the entry point was resolved from a profiling library and is
    // called with the acc_prof_reg pair it expects.
    unsafe { register_library(register, unregister, None) };
    Ok(())
}
