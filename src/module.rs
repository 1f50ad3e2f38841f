use std::fmt;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::ptr;

use llvm_sys::analysis::{LLVMVerifierFailureAction, LLVMVerifyModule};
use llvm_sys::bit_reader::LLVMParseBitcodeInContext2;
use llvm_sys::bit_writer::{
    LLVMWriteBitcodeToFD, LLVMWriteBitcodeToFile, LLVMWriteBitcodeToFileHandle,
    LLVMWriteBitcodeToMemoryBuffer,
};
use llvm_sys::core::{
    LLVMAddAlias2, LLVMAddFunction, LLVMAddGlobal, LLVMAddGlobalInAddressSpace,
    LLVMAddNamedMetadataOperand, LLVMCloneModule, LLVMDisposeModule, LLVMDumpModule,
    LLVMGetDataLayoutStr, LLVMGetFirstFunction, LLVMGetFirstGlobal, LLVMGetLastFunction,
    LLVMGetLastGlobal, LLVMGetModuleContext, LLVMGetNamedFunction, LLVMGetNamedGlobal,
    LLVMGetNamedMetadataNumOperands, LLVMGetNamedMetadataOperands, LLVMGetTarget,
    LLVMGetTypeByName, LLVMModuleCreateWithName, LLVMModuleCreateWithNameInContext,
    LLVMPrintModuleToFile, LLVMPrintModuleToString, LLVMSetDataLayout, LLVMSetModuleInlineAsm2,
    LLVMSetTarget,
};
use llvm_sys::prelude::{LLVMModuleRef, LLVMValueRef};
use log::{debug, trace};

use crate::buffer::MemoryBuffer;
use crate::context::{Context, ContextRef};
use crate::error::{Error, Result};
use crate::pass::{FunctionPassManager, ModuleProvider};
use crate::support::{c_string, Message};
use crate::values::{Function, Functions, GlobalValue, Globals, Type, Value};

/// How the native verifier reacts to a broken module.
///
/// Passed through to `LLVMVerifyModule` unmodified, since the choice
/// changes native-side control flow: `AbortProcess` terminates the whole
/// process from inside the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifierAction {
    /// Print the diagnostic to stderr and abort the process.
    AbortProcess,
    /// Print the diagnostic to stderr and return the status.
    PrintMessage,
    /// Return the status and diagnostic without printing anything.
    #[default]
    ReturnStatus,
}

impl From<VerifierAction> for LLVMVerifierFailureAction {
    fn from(action: VerifierAction) -> LLVMVerifierFailureAction {
        match action {
            VerifierAction::AbortProcess => LLVMVerifierFailureAction::LLVMAbortProcessAction,
            VerifierAction::PrintMessage => LLVMVerifierFailureAction::LLVMPrintMessageAction,
            VerifierAction::ReturnStatus => LLVMVerifierFailureAction::LLVMReturnStatusAction,
        }
    }
}

/// An owned LLVM module: a container of global variables, functions and
/// metadata, backed by exactly one native `LLVMModuleRef`.
///
/// Ownership follows the native contract. The `Module` value is the sole
/// owner of its handle; it is released exactly once, when the value is
/// dropped. Everything handed out by lookup and mutation methods
/// ([`Function`], [`GlobalValue`], [`Value`], [`Type`]) is a non-owning
/// view into the module's object graph and must not be used after the
/// module is gone.
///
/// Every method is a direct, synchronous forwarding call into the native
/// library: no caching, no reordering, no locking. Thread safety is
/// whatever the native library provides, which is why `Module` is neither
/// `Send` nor `Sync`.
pub struct Module<'ctx> {
    raw: LLVMModuleRef,
    _ctx: PhantomData<&'ctx Context>,
}

impl Module<'static> {
    /// Creates an empty module in the global context.
    pub fn new(name: &str) -> Module<'static> {
        let cname = c_string(name);
        let raw = unsafe { LLVMModuleCreateWithName(cname.as_ptr()) };
        trace!("created module {name:?} ({raw:?})");
        Module {
            raw,
            _ctx: PhantomData,
        }
    }
}

impl<'ctx> Module<'ctx> {
    /// Creates an empty module inside `context`. The module must be
    /// dropped before the context is, which the borrow enforces.
    pub fn new_in_context(name: &str, context: &'ctx Context) -> Module<'ctx> {
        let cname = c_string(name);
        let raw = unsafe { LLVMModuleCreateWithNameInContext(cname.as_ptr(), context.as_raw()) };
        trace!("created module {name:?} ({raw:?}) in context {:?}", context.as_raw());
        Module {
            raw,
            _ctx: PhantomData,
        }
    }

    /// Rebuilds a module from bitcode previously produced by one of the
    /// `write_bitcode_to_*` methods.
    pub fn parse_bitcode(context: &'ctx Context, buffer: &MemoryBuffer) -> Result<Module<'ctx>> {
        let mut raw: LLVMModuleRef = ptr::null_mut();
        let failed =
            unsafe { LLVMParseBitcodeInContext2(context.as_raw(), buffer.as_raw(), &mut raw) };
        if failed != 0 || raw.is_null() {
            debug!("bitcode parse failed ({} bytes)", buffer.len());
            return Err(Error::BitcodeParse);
        }
        Ok(Module {
            raw,
            _ctx: PhantomData,
        })
    }

    /// Wraps a raw module handle, taking ownership of it.
    ///
    /// # Safety
    /// `raw` must be a live module handle owned by nothing else, created
    /// in a context that outlives `'ctx`.
    pub unsafe fn from_raw(raw: LLVMModuleRef) -> Module<'ctx> {
        debug_assert!(!raw.is_null());
        Module {
            raw,
            _ctx: PhantomData,
        }
    }

    /// The raw handle, for interop with direct `llvm-sys` calls. The
    /// module keeps ownership.
    pub fn as_raw(&self) -> LLVMModuleRef {
        self.raw
    }

    /// Releases ownership of the handle without disposing it.
    pub fn into_raw(self) -> LLVMModuleRef {
        let this = ManuallyDrop::new(self);
        this.raw
    }

    // ---- properties -----------------------------------------------------

    /// The module's data-layout string. Re-fetched from the native side on
    /// every call; nothing is cached in the wrapper.
    pub fn data_layout(&self) -> String {
        unsafe { copy_native_str(LLVMGetDataLayoutStr(self.raw)) }
    }

    pub fn set_data_layout(&self, layout: &str) {
        let layout = c_string(layout);
        unsafe { LLVMSetDataLayout(self.raw, layout.as_ptr()) };
    }

    /// The target-triple string.
    pub fn target_triple(&self) -> String {
        unsafe { copy_native_str(LLVMGetTarget(self.raw)) }
    }

    pub fn set_target_triple(&self, triple: &str) {
        let triple = c_string(triple);
        unsafe { LLVMSetTarget(self.raw, triple.as_ptr()) };
    }

    /// The context this module was created in. A back-reference for
    /// interop, not an ownership relation.
    pub fn context(&self) -> ContextRef<'ctx> {
        ContextRef::new(unsafe { LLVMGetModuleContext(self.raw) })
    }

    // ---- lookup ---------------------------------------------------------

    /// Finds a function by name. Absence is `None`, mirroring the native
    /// null-pointer convention; it is never an error.
    pub fn function(&self, name: &str) -> Option<Function<'ctx>> {
        let cname = c_string(name);
        Function::from_nullable(unsafe { LLVMGetNamedFunction(self.raw, cname.as_ptr()) })
    }

    /// Finds a global variable by name.
    pub fn global(&self, name: &str) -> Option<GlobalValue<'ctx>> {
        let cname = c_string(name);
        GlobalValue::from_nullable(unsafe { LLVMGetNamedGlobal(self.raw, cname.as_ptr()) })
    }

    /// Finds a named struct type by name.
    pub fn type_by_name(&self, name: &str) -> Option<Type<'ctx>> {
        let cname = c_string(name);
        let raw = unsafe { LLVMGetTypeByName(self.raw, cname.as_ptr()) };
        if raw.is_null() {
            None
        } else {
            Some(unsafe { Type::from_raw(raw) })
        }
    }

    pub fn first_function(&self) -> Option<Function<'ctx>> {
        Function::from_nullable(unsafe { LLVMGetFirstFunction(self.raw) })
    }

    pub fn last_function(&self) -> Option<Function<'ctx>> {
        Function::from_nullable(unsafe { LLVMGetLastFunction(self.raw) })
    }

    pub fn first_global(&self) -> Option<GlobalValue<'ctx>> {
        GlobalValue::from_nullable(unsafe { LLVMGetFirstGlobal(self.raw) })
    }

    pub fn last_global(&self) -> Option<GlobalValue<'ctx>> {
        GlobalValue::from_nullable(unsafe { LLVMGetLastGlobal(self.raw) })
    }

    /// Iterates over all functions, in module order.
    pub fn functions(&self) -> Functions<'ctx> {
        Functions {
            current: self.first_function(),
        }
    }

    /// Iterates over all global variables, in module order.
    pub fn globals(&self) -> Globals<'ctx> {
        Globals {
            current: self.first_global(),
        }
    }

    // ---- mutation -------------------------------------------------------

    /// Declares a function with the given signature. The returned view is
    /// owned by this module.
    pub fn add_function(&self, name: &str, function_type: Type<'ctx>) -> Function<'ctx> {
        let cname = c_string(name);
        unsafe {
            Function::from_raw(LLVMAddFunction(
                self.raw,
                cname.as_ptr(),
                function_type.as_raw(),
            ))
        }
    }

    /// Declares a global variable of the given type.
    pub fn add_global(&self, ty: Type<'ctx>, name: &str) -> GlobalValue<'ctx> {
        let cname = c_string(name);
        unsafe { GlobalValue::from_raw(LLVMAddGlobal(self.raw, ty.as_raw(), cname.as_ptr())) }
    }

    /// Declares a global variable in a specific address space.
    pub fn add_global_in_address_space(
        &self,
        ty: Type<'ctx>,
        name: &str,
        address_space: u32,
    ) -> GlobalValue<'ctx> {
        let cname = c_string(name);
        unsafe {
            GlobalValue::from_raw(LLVMAddGlobalInAddressSpace(
                self.raw,
                ty.as_raw(),
                cname.as_ptr(),
                address_space,
            ))
        }
    }

    /// Adds an alias for `aliasee` under a new name. `value_type` is the
    /// type of the aliased value (address space 0).
    pub fn add_alias(
        &self,
        value_type: Type<'ctx>,
        aliasee: Value<'ctx>,
        name: &str,
    ) -> GlobalValue<'ctx> {
        let cname = c_string(name);
        unsafe {
            GlobalValue::from_raw(LLVMAddAlias2(
                self.raw,
                value_type.as_raw(),
                0,
                aliasee.as_raw(),
                cname.as_ptr(),
            ))
        }
    }

    /// Appends `value` to the named metadata node `name`, creating the
    /// node if it does not exist yet.
    pub fn add_named_metadata_operand(&self, name: &str, value: Value<'ctx>) {
        let cname = c_string(name);
        unsafe { LLVMAddNamedMetadataOperand(self.raw, cname.as_ptr(), value.as_raw()) };
    }

    /// Replaces the module-level inline assembly block.
    pub fn set_inline_asm(&self, asm: &str) {
        unsafe { LLVMSetModuleInlineAsm2(self.raw, asm.as_ptr() as *const c_char, asm.len()) };
    }

    // ---- metadata query -------------------------------------------------

    pub fn named_metadata_num_operands(&self, name: &str) -> u32 {
        let cname = c_string(name);
        unsafe { LLVMGetNamedMetadataNumOperands(self.raw, cname.as_ptr()) }
    }

    /// The operands of the named metadata node `name`, empty if the node
    /// does not exist.
    pub fn named_metadata_operands(&self, name: &str) -> Vec<Value<'ctx>> {
        let cname = c_string(name);
        let count = unsafe { LLVMGetNamedMetadataNumOperands(self.raw, cname.as_ptr()) } as usize;
        let mut raw_ops: Vec<LLVMValueRef> = vec![ptr::null_mut(); count];
        if count > 0 {
            unsafe {
                LLVMGetNamedMetadataOperands(self.raw, cname.as_ptr(), raw_ops.as_mut_ptr())
            };
        }
        raw_ops.into_iter().filter_map(Value::from_nullable).collect()
    }

    // ---- serialization --------------------------------------------------

    /// Renders the module as textual IR. The native buffer is copied into
    /// the returned `String` and released before this method returns.
    pub fn print_to_string(&self) -> String {
        let msg = unsafe { Message::from_raw(LLVMPrintModuleToString(self.raw)) };
        msg.to_string()
    }

    /// Writes the textual IR to `path`. On failure the native error
    /// message is copied into the returned error and the native buffer is
    /// released.
    pub fn print_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref().to_str().ok_or(Error::NonUtf8Path)?;
        let cpath = c_string(path);
        let mut raw_msg: *mut c_char = ptr::null_mut();
        let failed = unsafe { LLVMPrintModuleToFile(self.raw, cpath.as_ptr(), &mut raw_msg) };
        let msg = unsafe { Message::from_raw(raw_msg) };
        if failed != 0 {
            let text = msg.to_string();
            debug!("print_to_file({path}) failed: {text}");
            return Err(Error::PrintToFile(text));
        }
        Ok(())
    }

    /// Dumps the textual IR to stderr, via the native printer.
    pub fn dump(&self) {
        unsafe { LLVMDumpModule(self.raw) };
    }

    /// Writes bitcode to `path`. The native status code is preserved in
    /// the error; zero means success.
    pub fn write_bitcode_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref().to_str().ok_or(Error::NonUtf8Path)?;
        let cpath = c_string(path);
        let status = unsafe { LLVMWriteBitcodeToFile(self.raw, cpath.as_ptr()) };
        bitcode_status(status)
    }

    /// Writes bitcode to an open file descriptor.
    pub fn write_bitcode_to_fd(&self, fd: i32, should_close: bool, unbuffered: bool) -> Result<()> {
        let status = unsafe {
            LLVMWriteBitcodeToFD(
                self.raw,
                fd as c_int,
                should_close as c_int,
                unbuffered as c_int,
            )
        };
        bitcode_status(status)
    }

    /// Writes bitcode to a native file handle.
    pub fn write_bitcode_to_file_handle(&self, handle: i32) -> Result<()> {
        let status = unsafe { LLVMWriteBitcodeToFileHandle(self.raw, handle as c_int) };
        bitcode_status(status)
    }

    /// Serializes the module to an in-memory bitcode buffer.
    pub fn write_bitcode_to_memory_buffer(&self) -> MemoryBuffer {
        unsafe { MemoryBuffer::from_raw(LLVMWriteBitcodeToMemoryBuffer(self.raw)) }
    }

    // ---- verification ---------------------------------------------------

    /// Runs the native verifier. `action` selects how the native side
    /// reacts to a broken module and is forwarded unmodified. On failure
    /// the diagnostic is copied into the error; the native buffer is
    /// released either way.
    pub fn verify(&self, action: VerifierAction) -> Result<()> {
        let mut raw_msg: *mut c_char = ptr::null_mut();
        let broken = unsafe { LLVMVerifyModule(self.raw, action.into(), &mut raw_msg) };
        let msg = unsafe { Message::from_raw(raw_msg) };
        if broken != 0 {
            let text = msg.to_string();
            debug!("module verification failed: {text}");
            return Err(Error::Verify(text));
        }
        Ok(())
    }

    // ---- linking --------------------------------------------------------

    /// Merges `src` into `self`.
    ///
    /// The native linker consumes the source module whether or not the
    /// link succeeds, so `src` is taken by value: reusing it afterwards is
    /// a compile error rather than undefined behavior.
    pub fn link(&mut self, src: Module<'_>) -> Result<()> {
        // The native call frees the source handle; suppress our own Drop.
        let src = ManuallyDrop::new(src);
        trace!("linking module {:?} into {:?}", src.raw, self.raw);
        let failed = unsafe { llvm_sys::linker::LLVMLinkModules2(self.raw, src.raw) };
        if failed != 0 {
            return Err(Error::Link);
        }
        Ok(())
    }

    // ---- pass-manager interop -------------------------------------------

    /// A module provider for this module, for native APIs that still take
    /// one. The provider borrows the module and must not outlive it.
    pub fn create_module_provider(&self) -> ModuleProvider<'_> {
        ModuleProvider::for_module(self)
    }

    /// A function-level pass manager attached to this module.
    pub fn create_function_pass_manager(&self) -> FunctionPassManager<'_> {
        FunctionPassManager::for_module(self)
    }
}

impl Clone for Module<'_> {
    /// Requests a native deep copy. The clone owns its own handle;
    /// mutations on either side are invisible to the other.
    fn clone(&self) -> Self {
        let raw = unsafe { LLVMCloneModule(self.raw) };
        trace!("cloned module {:?} -> {raw:?}", self.raw);
        Module {
            raw,
            _ctx: PhantomData,
        }
    }
}

impl Drop for Module<'_> {
    fn drop(&mut self) {
        trace!("disposing module {:?}", self.raw);
        unsafe { LLVMDisposeModule(self.raw) };
    }
}

impl fmt::Display for Module<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.print_to_string())
    }
}

impl fmt::Debug for Module<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module").field("raw", &self.raw).finish()
    }
}

fn bitcode_status(status: c_int) -> Result<()> {
    if status == 0 {
        Ok(())
    } else {
        Err(Error::BitcodeWrite(status))
    }
}

/// Copies a native-owned (not caller-freed) C string into Rust memory.
unsafe fn copy_native_str(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    std::ffi::CStr::from_ptr(ptr).to_string_lossy().into_owned()
}
