//! Locating the runtime's class-initialization routine.
//!
//! Class injection has to call the runtime's internal `Class::Init`, which no build exports.
//! The locator tries a list of named heuristics in order and returns the first address one of
//! them produces:
//!
//! 1. `array_new_specific_xref` - `il2cpp_array_new_specific` tail-calls the array allocator,
//!    whose first call is `Class::Init`. The two-hop jump chain lands on it directly.
//! 2. `mono_class_instance_size` - builds exporting the Mono-compatible API
//! 3. `mono_class_setup_vtable` - same, older builds
//! 4. `class_has_references_placeholder` - `il2cpp_class_has_references` initializes the class
//!    as a side effect. It is always exported but it is not the right function, so picking it is
//!    logged as a warning.
//!
//! The list is data: callers can append, replace or remove heuristics on a
//! [`ClassInitLocator`] without touching the code that asks for the routine.

use std::fmt;

use crate::{
    exports::ExportResolver, handle::NativeHandle, xref::first_jump_target,
    Error::ClassInitNotFound, Result,
};

/// What a heuristic gets to work with
pub struct ScanContext<'a> {
    /// Export lookups against the runtime module
    pub exports: &'a ExportResolver,
    /// Bytes decoded per jump-target scan
    pub window: usize,
}

impl ScanContext<'_> {
    /// The first call or jump target of the function at `function`.
    ///
    /// Returns `None` if the function contains no resolvable branch or lies outside the module.
    #[must_use]
    pub fn first_jump_target(&self, function: NativeHandle) -> Option<NativeHandle> {
        match first_jump_target(
            self.exports.module().as_ref(),
            function.address() as u64,
            self.window,
        ) {
            Ok(target) => target
                .and_then(|address| usize::try_from(address).ok())
                .map(NativeHandle),
            Err(e) => {
                log::debug!("Cannot scan {function}: {e}");
                None
            }
        }
    }

    /// A non-null export, if the module has it
    #[must_use]
    pub fn export(&self, logical: &str) -> Option<NativeHandle> {
        self.exports.try_resolve(logical)?.non_null()
    }
}

type Locate = dyn Fn(&ScanContext<'_>) -> Option<NativeHandle> + Send + Sync;

/// A named producer of class-initialization candidates
pub struct ClassInitHeuristic {
    name: String,
    locate: Box<Locate>,
}

impl ClassInitHeuristic {
    /// Creates a heuristic from a name and a candidate producer
    pub fn new<F>(name: impl Into<String>, locate: F) -> Self
    where
        F: Fn(&ScanContext<'_>) -> Option<NativeHandle> + Send + Sync + 'static,
    {
        ClassInitHeuristic {
            name: name.into(),
            locate: Box::new(locate),
        }
    }

    /// Name used in diagnostics
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the heuristic
    #[must_use]
    pub fn locate(&self, scan: &ScanContext<'_>) -> Option<NativeHandle> {
        (self.locate)(scan)
    }
}

impl fmt::Debug for ClassInitHeuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassInitHeuristic")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

fn array_new_specific_xref(scan: &ScanContext<'_>) -> Option<NativeHandle> {
    let array_new_specific = scan.export("il2cpp_array_new_specific")?;
    let allocator = scan.first_jump_target(array_new_specific)?;
    scan.first_jump_target(allocator)?.non_null()
}

fn class_has_references_placeholder(scan: &ScanContext<'_>) -> Option<NativeHandle> {
    let address = scan.export("il2cpp_class_has_references")?;
    log::warn!(
        "Falling back to il2cpp_class_has_references as the class initialization routine; \
         injected classes may misbehave"
    );
    Some(address)
}

/// Ordered list of class-initialization heuristics.
#[derive(Debug)]
pub struct ClassInitLocator {
    heuristics: Vec<ClassInitHeuristic>,
}

impl Default for ClassInitLocator {
    fn default() -> Self {
        Self {
            heuristics: vec![
                ClassInitHeuristic::new("array_new_specific_xref", array_new_specific_xref),
                ClassInitHeuristic::new("mono_class_instance_size", |scan| {
                    scan.export("mono_class_instance_size")
                }),
                ClassInitHeuristic::new("mono_class_setup_vtable", |scan| {
                    scan.export("mono_class_setup_vtable")
                }),
                ClassInitHeuristic::new(
                    "class_has_references_placeholder",
                    class_has_references_placeholder,
                ),
            ],
        }
    }
}

impl ClassInitLocator {
    /// A locator with no heuristics at all
    #[must_use]
    pub fn empty() -> Self {
        Self {
            heuristics: Vec::new(),
        }
    }

    /// Appends a heuristic, tried after all existing ones
    pub fn push(&mut self, heuristic: ClassInitHeuristic) {
        self.heuristics.push(heuristic);
    }

    /// Builder form of [`ClassInitLocator::push`]
    #[must_use]
    pub fn with(mut self, heuristic: ClassInitHeuristic) -> Self {
        self.push(heuristic);
        self
    }

    /// Replaces the heuristic called `name` in place, keeping its position.
    ///
    /// Returns `false` (and drops `heuristic`) if there is no heuristic of that name.
    pub fn replace(&mut self, name: &str, heuristic: ClassInitHeuristic) -> bool {
        match self.heuristics.iter_mut().find(|h| h.name == name) {
            Some(slot) => {
                *slot = heuristic;
                true
            }
            None => false,
        }
    }

    /// Removes the heuristic called `name`
    pub fn remove(&mut self, name: &str) -> Option<ClassInitHeuristic> {
        let index = self.heuristics.iter().position(|h| h.name == name)?;
        Some(self.heuristics.remove(index))
    }

    /// Names of all heuristics in evaluation order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.heuristics.iter().map(ClassInitHeuristic::name)
    }

    /// Runs the heuristics in order and returns the first candidate produced.
    ///
    /// # Errors
    /// Returns [`crate::Error::ClassInitNotFound`] with the module name and base address if no
    /// heuristic produces an address.
    pub fn locate(&self, exports: &ExportResolver, window: usize) -> Result<NativeHandle> {
        let scan = ScanContext { exports, window };

        for heuristic in &self.heuristics {
            if let Some(address) = heuristic.locate(&scan) {
                log::trace!(
                    "Picked {} as the class initialization routine at {}",
                    heuristic.name,
                    address
                );
                return Ok(address);
            }
        }

        let module = exports.module();
        log::error!(
            "{}: 0x{:X}; no class initialization heuristic matched",
            module.name(),
            module.base_address()
        );
        Err(ClassInitNotFound {
            module: module.name().to_string(),
            base: module.base_address(),
        })
    }
}
