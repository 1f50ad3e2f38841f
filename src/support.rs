use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use llvm_sys::core::LLVMDisposeMessage;

/// Scoped owner of a message buffer the native library allocated for us.
///
/// Several entry points (`LLVMPrintModuleToString`, the out-parameters of
/// `LLVMVerifyModule` and `LLVMPrintModuleToFile`) hand back a `char*` that
/// the caller must release with `LLVMDisposeMessage`. Wrapping the pointer
/// here means the release happens exactly once, on every exit path, and the
/// text only crosses into Rust as an owned copy.
pub(crate) struct Message {
    ptr: *mut c_char,
}

impl Message {
    /// Takes ownership of `ptr`. A null pointer is allowed and reads back
    /// as the empty string, so out-parameters left untouched by a
    /// succeeding native call are still safe to inspect.
    pub(crate) unsafe fn from_raw(ptr: *mut c_char) -> Message {
        Message { ptr }
    }

    pub(crate) fn to_string(&self) -> String {
        if self.ptr.is_null() {
            return String::new();
        }
        unsafe { CStr::from_ptr(self.ptr) }
            .to_string_lossy()
            .into_owned()
    }
}

impl Drop for Message {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { LLVMDisposeMessage(self.ptr) };
        }
    }
}

/// Converts a Rust string into the null-terminated form the C API takes.
///
/// Panics if `s` contains an interior nul byte. Names and triples handed to
/// a code generator come from the embedding compiler, not from end-user
/// input, so an interior nul is a caller bug rather than a runtime
/// condition worth threading through every signature.
pub(crate) fn c_string(s: &str) -> CString {
    CString::new(s).expect("string passed to LLVM contains an interior nul byte")
}
