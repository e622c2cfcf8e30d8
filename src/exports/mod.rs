//! Export name resolution.
//!
//! Callers always speak in logical entry-point names (`il2cpp_domain_get`,
//! `il2cpp_class_get_methods`, ...). The [`ExportNameTable`] translates a logical name into the
//! symbol the current binary exports it under, and the [`ExportResolver`] looks that symbol up
//! in a [`crate::module::NativeModule`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use il2scope::exports::{ExportNameTable, ExportResolver};
//! use il2scope::module::ModuleImage;
//! use std::{path::Path, sync::Arc};
//!
//! let image = Arc::new(ModuleImage::from_file(Path::new("GameAssembly.dll"))?);
//! let resolver = ExportResolver::new(image, ExportNameTable::builtin());
//!
//! let domain_get = resolver.resolve("il2cpp_domain_get")?;
//! println!("il2cpp_domain_get at {domain_get}");
//! # Ok::<(), il2scope::Error>(())
//! ```

mod resolver;
mod table;

pub use resolver::ExportResolver;
pub use table::{ExportEntry, ExportNameTable};
