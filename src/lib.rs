//! Typed, ownership-correct wrappers over the LLVM-C module API.
//!
//! This crate is a thin binding layer: every public operation forwards
//! directly to one `llvm-sys` entry point, in the order the caller issued
//! it, with no caching and no translation of native semantics. What the
//! crate adds is the lifecycle contract the raw C API leaves to
//! convention:
//!
//! - a [`Module`] owns its native handle and disposes it exactly once, on
//!   drop; [`Clone`](Module::clone) is a native deep copy;
//! - [`Module::link`] takes the source module by value, because the
//!   native linker consumes its handle;
//! - lookups return [`Option`] instead of a null sentinel;
//! - every native-allocated message buffer is copied out and released
//!   before a call returns, on all paths.
//!
//! ```no_run
//! use llvm_module::{Context, Module, VerifierAction};
//!
//! let ctx = Context::new();
//! let module = Module::new_in_context("demo", &ctx);
//! let fn_ty = ctx.function_type(ctx.void_type(), &[], false);
//! module.add_function("main", fn_ty);
//! module.verify(VerifierAction::ReturnStatus).unwrap();
//! println!("{module}");
//! ```

pub mod buffer;
pub mod context;
pub mod error;
pub mod module;
pub mod pass;
mod support;
pub mod values;

pub use buffer::MemoryBuffer;
pub use context::{Context, ContextRef};
pub use error::{Error, Result};
pub use module::{Module, VerifierAction};
pub use pass::{FunctionPassManager, ModuleProvider};
pub use values::{Function, Functions, GlobalValue, Globals, Type, Value};
