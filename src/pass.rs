use std::marker::PhantomData;

use llvm_sys::core::{
    LLVMCreateFunctionPassManagerForModule, LLVMCreateModuleProviderForExistingModule,
    LLVMDisposePassManager, LLVMFinalizeFunctionPassManager, LLVMInitializeFunctionPassManager,
    LLVMRunFunctionPassManager,
};
use llvm_sys::prelude::{LLVMModuleProviderRef, LLVMPassManagerRef};

use crate::module::Module;
use crate::values::Function;

/// A module provider over an existing [`Module`], for the older native
/// APIs that still consume one.
///
/// Deliberately has no `Drop`: disposing a provider created for an
/// existing module destroys the module itself, and the module already has
/// an owner. The borrow keeps the provider from outliving it.
pub struct ModuleProvider<'m> {
    raw: LLVMModuleProviderRef,
    _module: PhantomData<&'m ()>,
}

impl<'m> ModuleProvider<'m> {
    pub(crate) fn for_module(module: &'m Module<'_>) -> ModuleProvider<'m> {
        let raw = unsafe { LLVMCreateModuleProviderForExistingModule(module.as_raw()) };
        ModuleProvider {
            raw,
            _module: PhantomData,
        }
    }

    pub fn as_raw(&self) -> LLVMModuleProviderRef {
        self.raw
    }
}

/// A function-level pass manager attached to a module.
pub struct FunctionPassManager<'m> {
    raw: LLVMPassManagerRef,
    _module: PhantomData<&'m ()>,
}

impl<'m> FunctionPassManager<'m> {
    pub(crate) fn for_module(module: &'m Module<'_>) -> FunctionPassManager<'m> {
        let raw = unsafe { LLVMCreateFunctionPassManagerForModule(module.as_raw()) };
        FunctionPassManager {
            raw,
            _module: PhantomData,
        }
    }

    pub fn as_raw(&self) -> LLVMPassManagerRef {
        self.raw
    }

    /// Runs all scheduled initialization passes. Returns true if any of
    /// them modified the module.
    pub fn initialize(&self) -> bool {
        unsafe { LLVMInitializeFunctionPassManager(self.raw) != 0 }
    }

    /// Runs the scheduled passes over `function`. Returns true if any of
    /// them modified it.
    pub fn run(&self, function: Function<'_>) -> bool {
        unsafe { LLVMRunFunctionPassManager(self.raw, function.as_raw()) != 0 }
    }

    /// Runs all scheduled finalization passes. Returns true if any of
    /// them modified the module.
    pub fn finalize(&self) -> bool {
        unsafe { LLVMFinalizeFunctionPassManager(self.raw) != 0 }
    }
}

impl Drop for FunctionPassManager<'_> {
    fn drop(&mut self) {
        unsafe { LLVMDisposePassManager(self.raw) };
    }
}
