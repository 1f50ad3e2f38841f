use std::os::raw::c_char;
use std::slice;

use llvm_sys::core::{
    LLVMCreateMemoryBufferWithMemoryRangeCopy, LLVMDisposeMemoryBuffer, LLVMGetBufferSize,
    LLVMGetBufferStart,
};
use llvm_sys::prelude::LLVMMemoryBufferRef;

use crate::support::c_string;

/// Owning wrapper over an `LLVMMemoryBufferRef`.
///
/// Produced by [`Module::write_bitcode_to_memory_buffer`] and consumed by
/// [`Module::parse_bitcode`]; the native buffer is released when the
/// wrapper is dropped.
///
/// [`Module::write_bitcode_to_memory_buffer`]: crate::Module::write_bitcode_to_memory_buffer
/// [`Module::parse_bitcode`]: crate::Module::parse_bitcode
pub struct MemoryBuffer {
    raw: LLVMMemoryBufferRef,
}

impl MemoryBuffer {
    /// Copies `data` into a fresh native buffer tagged with `name`.
    pub fn from_bytes(data: &[u8], name: &str) -> MemoryBuffer {
        let name = c_string(name);
        let raw = unsafe {
            LLVMCreateMemoryBufferWithMemoryRangeCopy(
                data.as_ptr() as *const c_char,
                data.len(),
                name.as_ptr(),
            )
        };
        MemoryBuffer { raw }
    }

    /// Takes ownership of a raw buffer handle.
    ///
    /// # Safety
    /// `raw` must be a live buffer handle not owned by anything else.
    pub unsafe fn from_raw(raw: LLVMMemoryBufferRef) -> MemoryBuffer {
        MemoryBuffer { raw }
    }

    pub fn as_raw(&self) -> LLVMMemoryBufferRef {
        self.raw
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe {
            let start = LLVMGetBufferStart(self.raw) as *const u8;
            let len = LLVMGetBufferSize(self.raw);
            slice::from_raw_parts(start, len)
        }
    }

    pub fn len(&self) -> usize {
        unsafe { LLVMGetBufferSize(self.raw) }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for MemoryBuffer {
    fn drop(&mut self) {
        unsafe { LLVMDisposeMemoryBuffer(self.raw) };
    }
}
