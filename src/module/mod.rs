//! Native module access.
//!
//! Everything the resolver needs from the native runtime binary goes through the
//! [`NativeModule`] trait: its name and base address (for diagnostics), its export directory
//! (for symbol resolution) and read access to its machine code (for jump-target scanning).
//!
//! # Key Components
//!
//! - [`NativeModule`] - The abstraction consumed by the export resolver and the scanner
//! - [`LoadedModule`] - The runtime module mapped into the current process
//! - [`ModuleImage`] - A PE or ELF image parsed from disk or memory, for offline analysis
//! - [`Backend`] - Data source of a [`ModuleImage`] (memory-mapped file or owned buffer)
//!
//! # Address Spaces
//!
//! All addresses handed out and accepted by a [`NativeModule`] are absolute virtual addresses
//! in the module's load space: for a [`LoadedModule`] that is the process address space, for a
//! [`ModuleImage`] it is the preferred image base unless another load base is configured.
//!
//! # Examples
//!
//! ```rust,no_run
//! use il2scope::module::{ModuleImage, NativeModule};
//! use std::path::Path;
//!
//! let image = ModuleImage::from_file(Path::new("GameAssembly.dll"))?;
//! if let Some(address) = image.export("il2cpp_domain_get") {
//!     println!("il2cpp_domain_get at 0x{address:X}");
//! }
//! # Ok::<(), il2scope::Error>(())
//! ```

mod image;
mod loaded;
mod memory;
mod physical;

use std::borrow::Cow;

pub use image::ModuleImage;
pub use loaded::LoadedModule;
pub use memory::Memory;
pub use physical::Physical;

use crate::Result;

/// Instruction set of a native module, as far as the jump-target scanner cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Machine {
    /// 32-bit x86
    X86,
    /// 64-bit x86
    X64,
    /// Anything the scanner cannot decode (ARM, ...)
    Other,
}

impl Machine {
    /// The machine the current process runs on
    #[must_use]
    pub fn host() -> Self {
        if cfg!(target_arch = "x86_64") {
            Machine::X64
        } else if cfg!(target_arch = "x86") {
            Machine::X86
        } else {
            Machine::Other
        }
    }

    /// Decoder bitness, `None` if the machine cannot be decoded
    #[must_use]
    pub fn bitness(&self) -> Option<u32> {
        match self {
            Machine::X86 => Some(32),
            Machine::X64 => Some(64),
            Machine::Other => None,
        }
    }
}

/// A loaded or parsed native runtime binary.
///
/// Implementations must be thread-safe; the resolver shares one module between all of its
/// lookups.
pub trait NativeModule: Send + Sync {
    /// File name of the module, used in diagnostics
    fn name(&self) -> &str;

    /// Address the module is mapped at
    fn base_address(&self) -> u64;

    /// Instruction set of the module's code
    fn machine(&self) -> Machine;

    /// Looks up an exported symbol.
    ///
    /// Returns `None` when the symbol is not exported at all. An export whose address is zero
    /// is reported as `Some(0)`, never as `None`.
    fn export(&self, symbol: &str) -> Option<u64>;

    /// Reads up to `len` bytes of code starting at `address`.
    ///
    /// The returned slice may be shorter than `len` when the readable region ends first.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `address` does not lie inside the module.
    fn read_code(&self, address: u64, len: usize) -> Result<Cow<'_, [u8]>>;
}

/// Backend trait for image data sources.
///
/// This trait abstracts over the source of a [`ModuleImage`]'s bytes, allowing both in-memory
/// and on-disk representations. All implementations must be thread-safe.
pub trait Backend: Send + Sync {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_bitness() {
        assert_eq!(Machine::X86.bitness(), Some(32));
        assert_eq!(Machine::X64.bitness(), Some(64));
        assert_eq!(Machine::Other.bitness(), None);
    }

    #[test]
    fn test_machine_host() {
        let host = Machine::host();
        if cfg!(target_arch = "x86_64") {
            assert_eq!(host, Machine::X64);
        } else if cfg!(target_arch = "x86") {
            assert_eq!(host, Machine::X86);
        } else {
            assert_eq!(host, Machine::Other);
        }
    }
}
