use std::marker::PhantomData;
use std::slice;

use llvm_sys::core::{LLVMCountParams, LLVMGetNextFunction, LLVMGetNextGlobal, LLVMGetValueName2};
use llvm_sys::prelude::{LLVMTypeRef, LLVMValueRef};

/// A type handle, owned by the context it was created in.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Type<'ctx> {
    raw: LLVMTypeRef,
    _ctx: PhantomData<&'ctx ()>,
}

impl<'ctx> Type<'ctx> {
    /// Wraps a raw type handle.
    ///
    /// # Safety
    /// `raw` must be a live type handle belonging to the context `'ctx`.
    pub unsafe fn from_raw(raw: LLVMTypeRef) -> Type<'ctx> {
        debug_assert!(!raw.is_null());
        Type {
            raw,
            _ctx: PhantomData,
        }
    }

    pub fn as_raw(self) -> LLVMTypeRef {
        self.raw
    }
}

/// A non-owning view of a value node inside some module's graph.
///
/// Views identify a node without owning it: they stay cheap to copy, and
/// they become dangling if the owning [`Module`](crate::Module) is dropped
/// or the node is removed. Using a dangling view is undefined behavior on
/// the native side, exactly as with the raw C API.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Value<'ctx> {
    raw: LLVMValueRef,
    _ctx: PhantomData<&'ctx ()>,
}

impl<'ctx> Value<'ctx> {
    /// # Safety
    /// `raw` must be a live value handle belonging to the context `'ctx`.
    pub unsafe fn from_raw(raw: LLVMValueRef) -> Value<'ctx> {
        debug_assert!(!raw.is_null());
        Value {
            raw,
            _ctx: PhantomData,
        }
    }

    pub(crate) fn from_nullable(raw: LLVMValueRef) -> Option<Value<'ctx>> {
        if raw.is_null() {
            None
        } else {
            Some(Value {
                raw,
                _ctx: PhantomData,
            })
        }
    }

    pub fn as_raw(self) -> LLVMValueRef {
        self.raw
    }

    pub fn name(self) -> String {
        value_name(self.raw)
    }
}

/// View of a function defined or declared in a module.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Function<'ctx> {
    raw: LLVMValueRef,
    _ctx: PhantomData<&'ctx ()>,
}

impl<'ctx> Function<'ctx> {
    /// # Safety
    /// `raw` must be a live function handle belonging to the context `'ctx`.
    pub unsafe fn from_raw(raw: LLVMValueRef) -> Function<'ctx> {
        debug_assert!(!raw.is_null());
        Function {
            raw,
            _ctx: PhantomData,
        }
    }

    pub(crate) fn from_nullable(raw: LLVMValueRef) -> Option<Function<'ctx>> {
        if raw.is_null() {
            None
        } else {
            Some(Function {
                raw,
                _ctx: PhantomData,
            })
        }
    }

    pub fn as_raw(self) -> LLVMValueRef {
        self.raw
    }

    pub fn as_value(self) -> Value<'ctx> {
        Value {
            raw: self.raw,
            _ctx: PhantomData,
        }
    }

    pub fn name(self) -> String {
        value_name(self.raw)
    }

    pub fn param_count(self) -> u32 {
        unsafe { LLVMCountParams(self.raw) }
    }

    /// The next function in the module's list, if any.
    pub fn next(self) -> Option<Function<'ctx>> {
        Function::from_nullable(unsafe { LLVMGetNextFunction(self.raw) })
    }
}

/// View of a global variable or alias owned by a module.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct GlobalValue<'ctx> {
    raw: LLVMValueRef,
    _ctx: PhantomData<&'ctx ()>,
}

impl<'ctx> GlobalValue<'ctx> {
    /// # Safety
    /// `raw` must be a live global handle belonging to the context `'ctx`.
    pub unsafe fn from_raw(raw: LLVMValueRef) -> GlobalValue<'ctx> {
        debug_assert!(!raw.is_null());
        GlobalValue {
            raw,
            _ctx: PhantomData,
        }
    }

    pub(crate) fn from_nullable(raw: LLVMValueRef) -> Option<GlobalValue<'ctx>> {
        if raw.is_null() {
            None
        } else {
            Some(GlobalValue {
                raw,
                _ctx: PhantomData,
            })
        }
    }

    pub fn as_raw(self) -> LLVMValueRef {
        self.raw
    }

    pub fn as_value(self) -> Value<'ctx> {
        Value {
            raw: self.raw,
            _ctx: PhantomData,
        }
    }

    pub fn name(self) -> String {
        value_name(self.raw)
    }

    pub fn next(self) -> Option<GlobalValue<'ctx>> {
        GlobalValue::from_nullable(unsafe { LLVMGetNextGlobal(self.raw) })
    }
}

/// Iterator over the functions of a module, front to back.
pub struct Functions<'ctx> {
    pub(crate) current: Option<Function<'ctx>>,
}

impl<'ctx> Iterator for Functions<'ctx> {
    type Item = Function<'ctx>;

    fn next(&mut self) -> Option<Function<'ctx>> {
        let item = self.current?;
        self.current = item.next();
        Some(item)
    }
}

/// Iterator over the global variables of a module, front to back.
pub struct Globals<'ctx> {
    pub(crate) current: Option<GlobalValue<'ctx>>,
}

impl<'ctx> Iterator for Globals<'ctx> {
    type Item = GlobalValue<'ctx>;

    fn next(&mut self) -> Option<GlobalValue<'ctx>> {
        let item = self.current?;
        self.current = item.next();
        Some(item)
    }
}

fn value_name(raw: LLVMValueRef) -> String {
    let mut len = 0usize;
    let ptr = unsafe { LLVMGetValueName2(raw, &mut len) };
    if ptr.is_null() {
        return String::new();
    }
    let bytes = unsafe { slice::from_raw_parts(ptr as *const u8, len) };
    String::from_utf8_lossy(bytes).into_owned()
}

impl std::fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Value").field(&self.raw).finish()
    }
}

impl std::fmt::Debug for Function<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function").field("name", &self.name()).finish()
    }
}

impl std::fmt::Debug for GlobalValue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalValue")
            .field("name", &self.name())
            .finish()
    }
}

impl std::fmt::Debug for Type<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Type").field(&self.raw).finish()
    }
}
