//! The native runtime module mapped into the current process.
//!
//! Locating the module is the first step of every resolution: exports are looked up through
//! its dynamic-loader handle and the scanner reads its code directly from memory.
//!
//! On Linux and Android the module is found in `/proc/self/maps`, which also yields its base
//! address and the readable ranges the scanner may touch. On Windows the loader is asked for an
//! already-loaded module of one of the candidate names; the module handle is the base address and
//! the in-memory PE header gives the extent of the image (`SizeOfImage`).
//!
//! Where neither source is available the module has no known extent, and every code read fails
//! with [`crate::Error::OutOfBounds`].

use std::{borrow::Cow, ffi::c_void, ops::Range, path::Path};

use libloading::Library;

use super::{Machine, NativeModule};
use crate::{
    Error::{ModuleNotFound, OutOfBounds},
    Result,
};

/// The native runtime module loaded in this process.
pub struct LoadedModule {
    name: String,
    library: Library,
    base: u64,
    /// Readable ranges belonging to the module; empty when the platform cannot tell, in which
    /// case no code is read
    regions: Vec<Range<u64>>,
}

impl LoadedModule {
    /// Finds the runtime module among the modules already loaded in this process.
    ///
    /// When several loaded modules match, the last one in load order wins.
    ///
    /// # Errors
    /// Returns [`crate::Error::ModuleNotFound`] if none of the candidates is loaded, or
    /// [`crate::Error::LibraryError`] if the loader refuses to hand out a handle.
    pub fn locate(candidates: &[String]) -> Result<LoadedModule> {
        let module = Self::locate_impl(candidates)?;
        log::trace!(
            "{}: 0x{:X} ({} mapped regions)",
            module.name,
            module.base,
            module.regions.len()
        );
        Ok(module)
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    fn locate_impl(candidates: &[String]) -> Result<LoadedModule> {
        let maps = std::fs::read_to_string("/proc/self/maps")?;
        let regions = parse_maps(&maps);

        let Some(mapping) = find_mapping(&regions, candidates) else {
            return Err(ModuleNotFound(candidates.join(", ")));
        };

        let library = unsafe { Library::new(&mapping.path) }?;
        Ok(LoadedModule {
            name: file_name(&mapping.path),
            library,
            base: mapping.base,
            regions: mapping.readable,
        })
    }

    #[cfg(windows)]
    fn locate_impl(candidates: &[String]) -> Result<LoadedModule> {
        use libloading::os::windows;

        let mut found = None;
        for name in candidates {
            if let Ok(library) = windows::Library::open_already_loaded(name) {
                found = Some((name.clone(), library));
            }
        }

        let Some((name, library)) = found else {
            return Err(ModuleNotFound(candidates.join(", ")));
        };

        let raw = library.into_raw();
        let base = raw as u64;
        let library = unsafe { windows::Library::from_raw(raw) };

        // The headers always occupy the first page of a mapped image.
        let headers = unsafe { std::slice::from_raw_parts(base as usize as *const u8, 0x1000) };
        let extent = pe_image_extent(headers, base)?;

        Ok(LoadedModule {
            name,
            library: library.into(),
            base,
            regions: vec![extent],
        })
    }

    #[cfg(not(any(target_os = "linux", target_os = "android", windows)))]
    fn locate_impl(candidates: &[String]) -> Result<LoadedModule> {
        for name in candidates.iter().rev() {
            if let Ok(library) = unsafe { Library::new(name) } {
                return Ok(LoadedModule {
                    name: name.clone(),
                    library,
                    base: 0,
                    regions: Vec::new(),
                });
            }
        }

        Err(ModuleNotFound(candidates.join(", ")))
    }
}

impl NativeModule for LoadedModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn base_address(&self) -> u64 {
        self.base
    }

    fn machine(&self) -> Machine {
        Machine::host()
    }

    fn export(&self, symbol: &str) -> Option<u64> {
        let symbol = unsafe { self.library.get::<*const c_void>(symbol.as_bytes()) }.ok()?;
        Some(*symbol as u64)
    }

    fn read_code(&self, address: u64, len: usize) -> Result<Cow<'_, [u8]>> {
        if address == 0 {
            return Err(OutOfBounds);
        }
        let len = clamp_to_regions(&self.regions, address, len)?;

        // The module stays mapped for as long as `library` holds its reference count.
        let bytes = unsafe { std::slice::from_raw_parts(address as usize as *const u8, len) };
        Ok(Cow::Borrowed(bytes))
    }
}

/// Clamps a read of `len` bytes at `address` to the region containing `address`
fn clamp_to_regions(regions: &[Range<u64>], address: u64, len: usize) -> Result<usize> {
    let Some(region) = regions.iter().find(|r| r.contains(&address)) else {
        return Err(OutOfBounds);
    };
    Ok(len.min(usize::try_from(region.end - address).unwrap_or(usize::MAX)))
}

/// The address range a PE image mapped at `base` occupies, from its headers
#[cfg_attr(not(windows), allow(dead_code))]
fn pe_image_extent(headers: &[u8], base: u64) -> Result<Range<u64>> {
    let header = goblin::pe::header::Header::parse(headers)?;
    let Some(optional) = header.optional_header else {
        return Err(malformed_error!(
            "PE header of the module at 0x{:X} has no optional header",
            base
        ));
    };

    let size = u64::from(optional.windows_fields.size_of_image);
    if size == 0 {
        return Err(malformed_error!("PE image at 0x{:X} has a zero SizeOfImage", base));
    }
    Ok(base..base.saturating_add(size))
}

/// One line of `/proc/self/maps`
#[derive(Debug, Clone, PartialEq, Eq)]
struct MappedRegion {
    range: Range<u64>,
    readable: bool,
    path: String,
}

/// All regions of one mapped file
#[derive(Debug, Clone, PartialEq, Eq)]
struct ModuleMapping {
    path: String,
    base: u64,
    readable: Vec<Range<u64>>,
}

fn parse_maps(maps: &str) -> Vec<MappedRegion> {
    let mut regions = Vec::new();

    for line in maps.lines() {
        let mut fields = line.split_whitespace();
        let (Some(range), Some(perms)) = (fields.next(), fields.next()) else {
            continue;
        };
        // offset, dev, inode
        let path = fields.nth(3).unwrap_or_default();
        if path.is_empty() {
            continue;
        }

        let Some((start, end)) = range.split_once('-') else {
            continue;
        };
        let (Ok(start), Ok(end)) = (
            u64::from_str_radix(start, 16),
            u64::from_str_radix(end, 16),
        ) else {
            continue;
        };

        regions.push(MappedRegion {
            range: start..end,
            readable: perms.starts_with('r'),
            path: path.to_string(),
        });
    }

    regions
}

fn find_mapping(regions: &[MappedRegion], candidates: &[String]) -> Option<ModuleMapping> {
    let path = regions
        .iter()
        .rev()
        .find(|region| candidates.iter().any(|c| file_name(&region.path) == *c))?
        .path
        .clone();

    let own: Vec<&MappedRegion> = regions.iter().filter(|r| r.path == path).collect();
    let base = own.iter().map(|r| r.range.start).min()?;
    let readable = own
        .iter()
        .filter(|r| r.readable)
        .map(|r| r.range.clone())
        .collect();

    Some(ModuleMapping {
        path,
        base,
        readable,
    })
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map_or_else(|| path.to_string(), |n| n.to_string_lossy().into_owned())
}
