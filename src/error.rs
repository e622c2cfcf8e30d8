use thiserror::Error;

use crate::handle::NativeHandle;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The variants follow the failure taxonomy of the resolution engine. Some failures are fatal
/// for the feature that depends on them (an export that cannot be found, a class-initialization
/// routine no heuristic could locate), others are deferred: a missing method or internal call
/// produces a stand-in, and the error only surfaces once that stand-in is actually used.
///
/// # Error Categories
///
/// ## Unresolvable Exports
/// - [`Error::ExportNotFound`] - A required symbol is not exported by the native module
/// - [`Error::ClassInitNotFound`] - No class-initialization heuristic produced an address
/// - [`Error::UnresolvedHook`] - A hook target already failed to resolve and is not retried
/// - [`Error::ModuleNotFound`] - The native runtime module is not loaded in this process
///
/// ## Deferred Failures (raised by stand-ins)
/// - [`Error::MissingMember`] - A missing class/method/field stand-in was used
/// - [`Error::UnresolvedInternalCall`] - A missing internal-call binding was invoked
///
/// ## Matching
/// - [`Error::AmbiguousMethod`] - Several overloads matched and the policy forbids guessing
///
/// ## Registry
/// - [`Error::DuplicateInjectedClass`] - A different class is already indexed under a name
///
/// ## Binary Access
/// - [`Error::Malformed`], [`Error::OutOfBounds`], [`Error::Empty`], [`Error::NotSupported`],
///   [`Error::FileError`], [`Error::GoblinErr`], [`Error::LibraryError`], [`Error::Decode`]
///
/// # Examples
///
/// ```rust,no_run
/// use il2scope::{Error, ResolverConfig, ResolverContext};
///
/// match ResolverContext::attach(ResolverConfig::default()) {
///     Ok(context) => println!("attached to {}", context.module().name()),
///     Err(Error::ModuleNotFound(candidates)) => eprintln!("not loaded: {candidates}"),
///     Err(e) => eprintln!("other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A required export is not present in the native module.
    ///
    /// The logical name is the stable name callers ask for, the symbol is what was actually
    /// looked up after applying the export name table.
    #[error("Couldn't find {logical} (symbol {symbol}) in {module}'s exports")]
    ExportNotFound {
        /// Logical entry-point name requested by the caller
        logical: String,
        /// Actual symbol that was searched for
        symbol: String,
        /// Name of the module whose export directory was searched
        module: String,
    },

    /// None of the class-initialization heuristics produced a usable address.
    ///
    /// Class injection cannot work without this routine, so the error carries the module base
    /// address to make the report actionable.
    #[error("Failed to locate the class initialization routine in {module} (base 0x{base:X}); no heuristic matched")]
    ClassInitNotFound {
        /// Name of the native module
        module: String,
        /// Base address the module is mapped at
        base: u64,
    },

    /// A hook target failed to resolve earlier; the failure is permanent.
    #[error("{name} could not be resolved: {reason}")]
    UnresolvedHook {
        /// Logical name of the hook target
        name: &'static str,
        /// Message of the original failure
        reason: String,
    },

    /// The native runtime module is not loaded in the current process.
    ///
    /// The associated string lists the module names that were tried.
    #[error("No native runtime module is loaded (tried {0})")]
    ModuleNotFound(String),

    /// A missing-entity stand-in was used as if it were real.
    #[error("{kind} {name} was not found in the native runtime")]
    MissingMember {
        /// What kind of entity was requested
        kind: &'static str,
        /// Name (or signature) that was requested
        name: String,
    },

    /// An internal call with no native counterpart was invoked.
    #[error("ICall with signature {0} was not resolved")]
    UnresolvedInternalCall(String),

    /// Several overloads share name, arity and generic flag but none matched exactly.
    #[error("Ambiguous method {class}::{method}; {candidates} candidates share its name and arity")]
    AmbiguousMethod {
        /// Name of the owning class
        class: String,
        /// Requested method name
        method: String,
        /// Number of same-name candidates seen
        candidates: usize,
    },

    /// A different class is already indexed under the same (namespace, name, image) key.
    #[error("Injected class {namespace}.{name} is already registered for image {image} as {existing}")]
    DuplicateInjectedClass {
        /// Namespace of the injected type
        namespace: String,
        /// Simple name of the injected type
        name: String,
        /// Image the key belongs to
        image: NativeHandle,
        /// Class handle already stored under the key
        existing: NativeHandle,
    },

    /// A resolved address was bound to a type that is not pointer sized.
    #[error("Cannot bind an address to a {0}-byte type; function pointers must be pointer sized")]
    BindingSize(usize),

    /// The native image is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while reading an image or code window.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// This image format is not supported.
    ///
    /// Only PE and ELF images carry the export directories the resolver understands.
    #[error("This file type is not supported")]
    NotSupported,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Error from the goblin crate during PE/ELF parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    /// Error from the dynamic loader while opening the runtime module or one of its symbols.
    #[error("{0}")]
    LibraryError(#[from] libloading::Error),

    /// Machine code could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}
