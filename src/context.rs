use std::marker::PhantomData;
use std::os::raw::c_char;

use llvm_sys::core::{
    LLVMContextCreate, LLVMContextDispose, LLVMDoubleTypeInContext, LLVMFloatTypeInContext,
    LLVMFunctionType, LLVMInt1TypeInContext, LLVMInt32TypeInContext, LLVMInt64TypeInContext,
    LLVMInt8TypeInContext, LLVMMDNodeInContext2, LLVMMDStringInContext2, LLVMMetadataAsValue,
    LLVMStructCreateNamed, LLVMStructTypeInContext, LLVMValueAsMetadata, LLVMVoidTypeInContext,
};
use llvm_sys::prelude::{LLVMContextRef, LLVMMetadataRef, LLVMTypeRef};
use log::trace;

use crate::values::{Type, Value};

/// An owned LLVM context.
///
/// Every module, type and metadata node lives inside some context; the
/// context must outlive them all, which the `'ctx` lifetime on
/// [`Module`](crate::Module) and the view types enforces. Contexts are not
/// thread-safe in LLVM; this wrapper is deliberately neither `Send` nor
/// `Sync`.
pub struct Context {
    raw: LLVMContextRef,
}

impl Context {
    pub fn new() -> Context {
        let raw = unsafe { LLVMContextCreate() };
        trace!("created LLVM context {raw:?}");
        Context { raw }
    }

    pub fn as_raw(&self) -> LLVMContextRef {
        self.raw
    }

    pub fn void_type(&self) -> Type<'_> {
        unsafe { Type::from_raw(LLVMVoidTypeInContext(self.raw)) }
    }

    pub fn int1_type(&self) -> Type<'_> {
        unsafe { Type::from_raw(LLVMInt1TypeInContext(self.raw)) }
    }

    pub fn int8_type(&self) -> Type<'_> {
        unsafe { Type::from_raw(LLVMInt8TypeInContext(self.raw)) }
    }

    pub fn int32_type(&self) -> Type<'_> {
        unsafe { Type::from_raw(LLVMInt32TypeInContext(self.raw)) }
    }

    pub fn int64_type(&self) -> Type<'_> {
        unsafe { Type::from_raw(LLVMInt64TypeInContext(self.raw)) }
    }

    pub fn float_type(&self) -> Type<'_> {
        unsafe { Type::from_raw(LLVMFloatTypeInContext(self.raw)) }
    }

    pub fn double_type(&self) -> Type<'_> {
        unsafe { Type::from_raw(LLVMDoubleTypeInContext(self.raw)) }
    }

    /// A function type with the given return and parameter types.
    pub fn function_type<'ctx>(
        &'ctx self,
        ret: Type<'ctx>,
        params: &[Type<'ctx>],
        is_var_arg: bool,
    ) -> Type<'ctx> {
        let mut raw_params: Vec<LLVMTypeRef> = params.iter().map(|t| t.as_raw()).collect();
        unsafe {
            Type::from_raw(LLVMFunctionType(
                ret.as_raw(),
                raw_params.as_mut_ptr(),
                raw_params.len() as u32,
                is_var_arg as i32,
            ))
        }
    }

    /// An anonymous struct type over the given element types.
    pub fn struct_type<'ctx>(&'ctx self, elements: &[Type<'ctx>], packed: bool) -> Type<'ctx> {
        let mut raw_elems: Vec<LLVMTypeRef> = elements.iter().map(|t| t.as_raw()).collect();
        unsafe {
            Type::from_raw(LLVMStructTypeInContext(
                self.raw,
                raw_elems.as_mut_ptr(),
                raw_elems.len() as u32,
                packed as i32,
            ))
        }
    }

    /// An opaque struct type registered under `name`, resolvable later
    /// through [`Module::type_by_name`](crate::Module::type_by_name).
    pub fn named_struct_type(&self, name: &str) -> Type<'_> {
        let cname = crate::support::c_string(name);
        unsafe { Type::from_raw(LLVMStructCreateNamed(self.raw, cname.as_ptr())) }
    }

    /// A metadata string, wrapped as a value so it can be attached as a
    /// named-metadata operand.
    pub fn md_string(&self, s: &str) -> Value<'_> {
        unsafe {
            let md = LLVMMDStringInContext2(self.raw, s.as_ptr() as *const c_char, s.len());
            Value::from_raw(LLVMMetadataAsValue(self.raw, md))
        }
    }

    /// A metadata tuple over the given values.
    pub fn md_node<'ctx>(&'ctx self, values: &[Value<'ctx>]) -> Value<'ctx> {
        let mut raw_mds: Vec<LLVMMetadataRef> = values
            .iter()
            .map(|v| unsafe { LLVMValueAsMetadata(v.as_raw()) })
            .collect();
        unsafe {
            let md = LLVMMDNodeInContext2(self.raw, raw_mds.as_mut_ptr(), raw_mds.len());
            Value::from_raw(LLVMMetadataAsValue(self.raw, md))
        }
    }
}

impl Default for Context {
    fn default() -> Context {
        Context::new()
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        trace!("disposing LLVM context {:?}", self.raw);
        unsafe { LLVMContextDispose(self.raw) };
    }
}

/// A non-owning reference to a context, as handed back by
/// [`Module::context`](crate::Module::context).
///
/// This is an identifier for interop only; it never disposes the context
/// it points at.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ContextRef<'ctx> {
    raw: LLVMContextRef,
    _ctx: PhantomData<&'ctx Context>,
}

impl<'ctx> ContextRef<'ctx> {
    pub(crate) fn new(raw: LLVMContextRef) -> ContextRef<'ctx> {
        ContextRef {
            raw,
            _ctx: PhantomData,
        }
    }

    pub fn as_raw(self) -> LLVMContextRef {
        self.raw
    }
}

impl std::fmt::Debug for ContextRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ContextRef").field(&self.raw).finish()
    }
}
