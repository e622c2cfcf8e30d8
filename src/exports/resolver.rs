use std::sync::Arc;

use crate::{
    exports::ExportNameTable, handle::NativeHandle, module::NativeModule, Error::ExportNotFound,
    Result,
};

/// Resolves logical entry-point names to addresses inside a native module.
///
/// Resolution has no side effects; the resolver can be shared between threads and queried
/// concurrently.
pub struct ExportResolver {
    module: Arc<dyn NativeModule>,
    table: ExportNameTable,
}

impl ExportResolver {
    /// Creates a resolver over `module` using `table` for symbol renames
    pub fn new(module: Arc<dyn NativeModule>, table: ExportNameTable) -> Self {
        ExportResolver { module, table }
    }

    /// The module exports are resolved against
    #[must_use]
    pub fn module(&self) -> &Arc<dyn NativeModule> {
        &self.module
    }

    /// The rename table in use
    #[must_use]
    pub fn table(&self) -> &ExportNameTable {
        &self.table
    }

    /// Looks up a logical name without failing.
    ///
    /// `None` means the symbol is not exported. An export that exists but sits at address zero
    /// yields `Some(NativeHandle::NULL)`.
    #[must_use]
    pub fn try_resolve(&self, logical: &str) -> Option<NativeHandle> {
        let symbol = self.table.symbol_for(logical);
        let address = self.module.export(symbol)?;
        usize::try_from(address).ok().map(NativeHandle)
    }

    /// Looks up a logical name that must be exported.
    ///
    /// # Errors
    /// Returns [`crate::Error::ExportNotFound`] naming the logical name, the symbol that was
    /// searched for and the module, if the symbol is not exported.
    pub fn resolve(&self, logical: &str) -> Result<NativeHandle> {
        match self.try_resolve(logical) {
            Some(handle) => Ok(handle),
            None => Err(ExportNotFound {
                logical: logical.to_string(),
                symbol: self.table.symbol_for(logical).to_string(),
                module: self.module.name().to_string(),
            }),
        }
    }
}
