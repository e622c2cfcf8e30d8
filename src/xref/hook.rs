use once_cell::sync::OnceCell;

use crate::{handle::NativeHandle, Error, Result};

/// An internal native function that is resolved once and then cached.
///
/// Concurrent first callers race to resolve, but only one outcome is ever stored; every caller
/// observes the same address afterwards. A failure is stored as well: resolution is attempted
/// exactly once, and later calls fail with [`Error::UnresolvedHook`].
#[derive(Debug)]
pub struct HookTarget {
    name: &'static str,
    outcome: OnceCell<std::result::Result<NativeHandle, String>>,
}

impl HookTarget {
    /// Creates an unresolved hook target
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        HookTarget {
            name,
            outcome: OnceCell::new(),
        }
    }

    /// Logical name of the target, used in diagnostics
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The cached address, if resolution succeeded
    #[must_use]
    pub fn get(&self) -> Option<NativeHandle> {
        self.outcome.get().and_then(|outcome| outcome.as_ref().ok().copied())
    }

    /// Returns `true` once an address has been cached
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.get().is_some()
    }

    /// Returns `true` if resolution was attempted and failed
    #[must_use]
    pub fn has_failed(&self) -> bool {
        matches!(self.outcome.get(), Some(Err(_)))
    }

    /// Returns the cached address, running `resolve` if nothing was attempted yet.
    ///
    /// # Errors
    /// The first failing call returns the error of `resolve`; every later call returns
    /// [`Error::UnresolvedHook`] carrying its message.
    pub fn get_or_resolve<F>(&self, resolve: F) -> Result<NativeHandle>
    where
        F: FnOnce() -> Result<NativeHandle>,
    {
        let mut failure = None;
        let outcome = self.outcome.get_or_init(|| match resolve() {
            Ok(address) => {
                log::trace!("{}: {}", self.name, address);
                Ok(address)
            }
            Err(error) => {
                let reason = error.to_string();
                failure = Some(error);
                Err(reason)
            }
        });

        if let Some(error) = failure {
            return Err(error);
        }

        match outcome {
            Ok(address) => Ok(*address),
            Err(reason) => Err(Error::UnresolvedHook {
                name: self.name,
                reason: reason.clone(),
            }),
        }
    }
}
