//! PE/ELF runtime images parsed from disk or memory.
//!
//! A [`ModuleImage`] gives the resolver the same view of a runtime binary that a
//! [`crate::module::LoadedModule`] gives of the mapped module: exports, base address and code
//! bytes. It is used to run the export resolver and the class-initialization heuristics
//! against a dumped `GameAssembly.dll` or `libil2cpp.so` without loading it.
//!
//! # Architecture
//!
//! The image is parsed once with `goblin` and reduced to two indices:
//!
//! - **Exports**: symbol name → address relative to the image base. PE forwarders and
//!   undefined ELF symbols are skipped.
//! - **Segments**: file-backed ranges of the virtual image (PE sections, ELF `PT_LOAD`
//!   program headers), used to translate a virtual address to a file offset.
//!
//! # Thread Safety
//!
//! [`ModuleImage`] is immutable after construction and can be shared freely.

use std::{borrow::Cow, path::Path};

use goblin::{
    elf::{header as elf_header, program_header::PT_LOAD, Elf},
    pe::{header as pe_header, PE},
    Object,
};
use rustc_hash::FxHashMap;

use super::{Backend, Machine, Memory, NativeModule, Physical};
use crate::{
    Error::{Empty, NotSupported, OutOfBounds},
    Result,
};

/// A file-backed range of the virtual image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    /// Address relative to the image base
    rva: u64,
    /// Number of bytes backed by the file
    size: u64,
    /// File offset of the first byte
    offset: usize,
}

impl Segment {
    fn contains(&self, rva: u64) -> bool {
        rva >= self.rva && rva - self.rva < self.size
    }
}

/// A PE or ELF image of the native runtime.
///
/// # Examples
///
/// ```rust,no_run
/// use il2scope::module::{ModuleImage, NativeModule};
/// use std::path::Path;
///
/// let image = ModuleImage::from_file(Path::new("libil2cpp.so"))?.with_load_base(0x7000_0000);
/// println!("{} mapped at 0x{:X}", image.name(), image.base_address());
/// # Ok::<(), il2scope::Error>(())
/// ```
pub struct ModuleImage {
    name: String,
    data: Box<dyn Backend>,
    preferred_base: u64,
    load_base: u64,
    machine: Machine,
    exports: FxHashMap<String, u64>,
    segments: Vec<Segment>,
}

impl ModuleImage {
    /// Loads and memory-maps an image from the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, is empty, or is neither PE nor ELF.
    pub fn from_file(path: &Path) -> Result<ModuleImage> {
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        Self::load(name, Physical::new(path)?)
    }

    /// Parses an image that is already in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is empty or is neither PE nor ELF.
    pub fn from_mem(name: impl Into<String>, data: Vec<u8>) -> Result<ModuleImage> {
        Self::load(name.into(), Memory::new(data))
    }

    fn load<T: Backend + 'static>(name: String, data: T) -> Result<ModuleImage> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let (preferred_base, machine, exports, segments) = match Object::parse(data.data())? {
            Object::PE(pe) => Self::index_pe(&pe)?,
            Object::Elf(elf) => Self::index_elf(&elf)?,
            _ => return Err(NotSupported),
        };

        Ok(ModuleImage {
            name,
            data: Box::new(data),
            preferred_base,
            load_base: preferred_base,
            machine,
            exports,
            segments,
        })
    }

    #[allow(clippy::type_complexity)]
    fn index_pe(pe: &PE) -> Result<(u64, Machine, FxHashMap<String, u64>, Vec<Segment>)> {
        let machine = match pe.header.coff_header.machine {
            pe_header::COFF_MACHINE_X86 => Machine::X86,
            pe_header::COFF_MACHINE_X86_64 => Machine::X64,
            _ => Machine::Other,
        };

        let mut exports = FxHashMap::default();
        for export in &pe.exports {
            if export.reexport.is_some() {
                continue;
            }
            if let Some(name) = export.name {
                exports.insert(name.to_string(), export.rva as u64);
            }
        }

        let mut segments = Vec::with_capacity(pe.sections.len());
        for section in &pe.sections {
            let size = u64::from(section.virtual_size.min(section.size_of_raw_data));
            if size == 0 {
                continue;
            }
            segments.push(Segment {
                rva: u64::from(section.virtual_address),
                size,
                offset: section.pointer_to_raw_data as usize,
            });
        }

        if segments.is_empty() {
            return Err(malformed_error!("PE image has no file-backed sections"));
        }

        #[allow(clippy::unnecessary_cast)]
        Ok((pe.image_base as u64, machine, exports, segments))
    }

    #[allow(clippy::type_complexity)]
    fn index_elf(elf: &Elf) -> Result<(u64, Machine, FxHashMap<String, u64>, Vec<Segment>)> {
        let machine = match elf.header.e_machine {
            elf_header::EM_386 => Machine::X86,
            elf_header::EM_X86_64 => Machine::X64,
            _ => Machine::Other,
        };

        let mut exports = FxHashMap::default();
        for symbol in elf.dynsyms.iter() {
            // SHN_UNDEF: imported, not exported
            if symbol.st_shndx == 0 {
                continue;
            }
            if let Some(name) = elf.dynstrtab.get_at(symbol.st_name) {
                if !name.is_empty() {
                    exports.insert(name.to_string(), symbol.st_value);
                }
            }
        }

        let mut segments = Vec::new();
        for header in &elf.program_headers {
            if header.p_type != PT_LOAD || header.p_filesz == 0 {
                continue;
            }
            let Ok(offset) = usize::try_from(header.p_offset) else {
                return Err(malformed_error!(
                    "ELF segment offset 0x{:X} does not fit the address space",
                    header.p_offset
                ));
            };
            segments.push(Segment {
                rva: header.p_vaddr,
                size: header.p_filesz,
                offset,
            });
        }

        if segments.is_empty() {
            return Err(malformed_error!("ELF image has no loadable segments"));
        }

        // Shared objects are linked at 0 and rebased by the loader
        Ok((0, machine, exports, segments))
    }

    /// Rebase the image so that addresses match a process it was dumped from.
    #[must_use]
    pub fn with_load_base(mut self, base: u64) -> Self {
        self.load_base = base;
        self
    }

    /// Override the name used in diagnostics.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The base address the image was linked for
    #[must_use]
    pub fn preferred_base(&self) -> u64 {
        self.preferred_base
    }

    /// Number of exported symbols
    #[must_use]
    pub fn export_count(&self) -> usize {
        self.exports.len()
    }

    /// Iterate over all exported symbol names
    pub fn export_names(&self) -> impl Iterator<Item = &str> {
        self.exports.keys().map(String::as_str)
    }

    /// Total size of the underlying image data in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the image has a length of zero
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }
}

impl NativeModule for ModuleImage {
    fn name(&self) -> &str {
        &self.name
    }

    fn base_address(&self) -> u64 {
        self.load_base
    }

    fn machine(&self) -> Machine {
        self.machine
    }

    fn export(&self, symbol: &str) -> Option<u64> {
        self.exports
            .get(symbol)
            .map(|rva| self.load_base.wrapping_add(*rva))
    }

    fn read_code(&self, address: u64, len: usize) -> Result<Cow<'_, [u8]>> {
        let Some(rva) = address.checked_sub(self.load_base) else {
            return Err(OutOfBounds);
        };

        let Some(segment) = self.segments.iter().find(|s| s.contains(rva)) else {
            return Err(OutOfBounds);
        };

        let delta = rva - segment.rva;
        let available = usize::try_from(segment.size - delta).unwrap_or(usize::MAX);
        let Ok(delta) = usize::try_from(delta) else {
            return Err(OutOfBounds);
        };
        let Some(offset) = segment.offset.checked_add(delta) else {
            return Err(OutOfBounds);
        };

        let wanted = len.min(available).min(self.data.len().saturating_sub(offset));
        Ok(Cow::Borrowed(self.data.data_slice(offset, wanted)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_contains() {
        let segment = Segment {
            rva: 0x1000,
            size: 0x200,
            offset: 0x400,
        };
        assert!(!segment.contains(0xFFF));
        assert!(segment.contains(0x1000));
        assert!(segment.contains(0x11FF));
        assert!(!segment.contains(0x1200));
    }

    #[test]
    fn test_empty_image() {
        assert!(matches!(
            ModuleImage::from_mem("empty", vec![]),
            Err(crate::Error::Empty)
        ));
    }

    #[test]
    fn test_garbage_image() {
        let result = ModuleImage::from_mem("garbage", vec![0x11; 64]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = ModuleImage::from_file(Path::new("/nonexistent/GameAssembly.dll"));
        assert!(matches!(result, Err(crate::Error::FileError(_))));
    }

    fn fake_image() -> ModuleImage {
        let mut exports = FxHashMap::default();
        exports.insert("il2cpp_domain_get".to_string(), 0x1010);
        exports.insert("il2cpp_zero".to_string(), 0);

        let mut data = vec![0u8; 0x300];
        data[0x210..0x215].copy_from_slice(&[0xE9, 0x00, 0x00, 0x00, 0x00]);

        ModuleImage {
            name: "GameAssembly.dll".to_string(),
            data: Box::new(Memory::new(data)),
            preferred_base: 0x1_8000_0000,
            load_base: 0x1_8000_0000,
            machine: Machine::X64,
            exports,
            segments: vec![Segment {
                rva: 0x1000,
                size: 0x100,
                offset: 0x200,
            }],
        }
    }

    #[test]
    fn test_export_lookup() {
        let image = fake_image();
        assert_eq!(image.export("il2cpp_domain_get"), Some(0x1_8000_1010));
        assert_eq!(image.export("il2cpp_zero"), Some(0x1_8000_0000));
        assert_eq!(image.export("il2cpp_missing"), None);
        assert_eq!(image.export_count(), 2);

        let rebased = fake_image().with_load_base(0x7000_0000);
        assert_eq!(rebased.export("il2cpp_domain_get"), Some(0x7000_1010));
        assert_eq!(rebased.preferred_base(), 0x1_8000_0000);
    }

    #[test]
    fn test_read_code() {
        let image = fake_image();
        let code = image.read_code(0x1_8000_1010, 5).unwrap();
        assert_eq!(code.as_ref(), &[0xE9, 0x00, 0x00, 0x00, 0x00]);

        // Clamped to the end of the segment
        let tail = image.read_code(0x1_8000_10F0, 0x100).unwrap();
        assert_eq!(tail.len(), 0x10);

        assert!(matches!(
            image.read_code(0x1_8000_2000, 4),
            Err(OutOfBounds)
        ));
        assert!(matches!(image.read_code(0x10, 4), Err(OutOfBounds)));
    }

    #[test]
    fn test_parse_pe() {
        use crate::test::{minimal_pe64, PE_IMAGE_BASE, PE_TEXT_OFFSET, PE_TEXT_RVA};

        // call [rip+0xFFA]; call 0x3000; ret
        let text = [
            0xFF, 0x15, 0xFA, 0x0F, 0x00, 0x00, 0xE8, 0xF5, 0x1F, 0x00, 0x00, 0xC3,
        ];
        let image = ModuleImage::from_mem("tiny.dll", minimal_pe64(&text)).unwrap();

        assert_eq!(image.name(), "tiny.dll");
        assert_eq!(image.machine(), Machine::X64);
        assert_eq!(image.preferred_base(), PE_IMAGE_BASE);
        assert_eq!(image.base_address(), PE_IMAGE_BASE);
        assert_eq!(image.export_count(), 0);
        assert_eq!(
            image.segments,
            vec![Segment {
                rva: PE_TEXT_RVA,
                size: text.len() as u64,
                offset: PE_TEXT_OFFSET,
            }]
        );

        // Clamped to the section's virtual size
        let code = image.read_code(PE_IMAGE_BASE + PE_TEXT_RVA, 0x100).unwrap();
        assert_eq!(code.as_ref(), &text);

        let rebased = image.with_load_base(0x7FF6_0000_0000);
        let code = rebased.read_code(0x7FF6_0000_1006, 5).unwrap();
        assert_eq!(code.as_ref(), &text[6..11]);
        assert!(rebased.read_code(PE_IMAGE_BASE + PE_TEXT_RVA, 1).is_err());
    }

    #[test]
    #[cfg(any(target_os = "linux", windows))]
    fn test_parse_own_executable() {
        let path = std::env::current_exe().unwrap();
        let file = std::fs::read(&path).unwrap();
        let image = ModuleImage::from_file(&path)
            .unwrap()
            .with_load_base(0x5555_0000_0000);

        assert_eq!(image.len(), file.len());
        assert_eq!(image.machine(), Machine::host());
        assert!(!image.segments.is_empty());

        for segment in &image.segments {
            let address = image.base_address() + segment.rva;
            let code = image.read_code(address, 64).unwrap();
            assert!(!code.is_empty());
            assert_eq!(
                code.as_ref(),
                &file[segment.offset..segment.offset + code.len()]
            );
        }

        for name in image.export_names() {
            let address = image.export(name).unwrap();
            assert!(address >= image.base_address());
        }
        assert_eq!(image.export_names().count(), image.export_count());
    }

    #[test]
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    fn test_own_executable_imports_not_exported() {
        let image = ModuleImage::from_file(&std::env::current_exe().unwrap()).unwrap();

        // Resolved from libc at load time, so only present as undefined symbols
        assert_eq!(image.export("malloc"), None);
        assert_eq!(image.export("pthread_create"), None);
    }
}
