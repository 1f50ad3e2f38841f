use thiserror::Error;

/// Failures reported by the native library through its boolean/status
/// conventions.
///
/// The binding translates nothing: every variant carries the native
/// diagnostic (or status code) verbatim. Lookups are not represented here
/// at all, since the native library treats an absent name as a normal
/// `null` result rather than an error.
#[derive(Debug, Error)]
pub enum Error {
    /// `LLVMVerifyModule` reported a broken module. The message is the
    /// verifier's own diagnostic, copied out of the native buffer.
    #[error("module verification failed: {0}")]
    Verify(String),

    /// `LLVMPrintModuleToFile` failed, usually because the path could not
    /// be opened for writing.
    #[error("could not print module to file: {0}")]
    PrintToFile(String),

    /// A bitcode writer entry point returned a nonzero status. The native
    /// code is preserved as-is (zero always means success).
    #[error("bitcode emission failed with status {0}")]
    BitcodeWrite(i32),

    /// The bitcode reader rejected the buffer. LLVM reports the details
    /// through the context diagnostic handler, not a return value.
    #[error("could not parse bitcode buffer")]
    BitcodeParse,

    /// `LLVMLinkModules2` failed. As with bitcode parsing, the diagnostic
    /// goes to the context handler; only the boolean reaches us.
    #[error("module linking failed")]
    Link,

    /// A path argument could not be converted to the C string the native
    /// API expects.
    #[error("path is not valid UTF-8")]
    NonUtf8Path,
}

pub type Result<T> = std::result::Result<T, Error>;
