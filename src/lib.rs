// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
// - 'module/physical.rs' uses mmap to map a file into memory
// - 'module/loaded.rs' reads code of the mapped runtime module in place
// - 'runtime/exported.rs' calls the runtime's exported accessors

//! # il2scope
//!
//! Native symbol and method resolution for ahead-of-time compiled managed runtimes.
//!
//! Interop layers that drive an IL2CPP-style runtime from the outside have to find things the
//! runtime never meant to expose: exports renamed by obfuscating builds, internal functions that
//! are not exported at all, the one overload of a method whose signature matches a managed
//! declaration, and a name for every managed type the way the runtime spells it. `il2scope`
//! bundles these lookups into one thread-safe [`ResolverContext`].
//!
//! ## Features
//!
//! - **Export resolution** - Logical entry-point names mapped to obfuscated symbols
//! - **Call-graph scanning** - Unexported routines located by following calls out of exported ones
//! - **Method matching** - Overload selection by name, arity, generic flag and full signature
//! - **Type naming** - Managed type shapes rendered as native type names
//! - **Stand-ins** - Missing members and internal calls that fail only when used
//! - **Injected classes** - Synthetic tokens and name lookup for classes created at runtime
//! - **Offline analysis** - The same resolvers run over PE/ELF images loaded from disk
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use il2scope::prelude::*;
//!
//! let context = ResolverContext::attach(ResolverConfig::default())?;
//! let domain_get = context.resolve_export("il2cpp_domain_get")?;
//! println!("il2cpp_domain_get at {domain_get}");
//!
//! let class_init = context.find_class_init()?;
//! println!("Class::Init at {class_init}");
//! # Ok::<(), il2scope::Error>(())
//! ```
//!
//! ### Offline Analysis
//!
//! ```rust,no_run
//! use il2scope::exports::{ExportNameTable, ExportResolver};
//! use il2scope::module::ModuleImage;
//! use il2scope::xref::ClassInitLocator;
//! use std::{path::Path, sync::Arc};
//!
//! let image = ModuleImage::from_file(Path::new("GameAssembly.dll"))?;
//! let exports = ExportResolver::new(Arc::new(image), ExportNameTable::builtin());
//!
//! let class_init = ClassInitLocator::default().locate(&exports, 0x1000)?;
//! println!("Class::Init at {class_init}");
//! # Ok::<(), il2scope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`module`] - The native runtime binary, loaded in-process or parsed from disk
//! - [`exports`] - Logical export names and their resolution
//! - [`xref`] - Jump-target scanning and the class-initialization heuristics
//! - [`runtime`] - The runtime's reflection accessors
//! - [`methods`] - Method signature matching
//! - [`typename`] - Native type-name rendering
//! - [`standin`] - Missing-entity stand-ins
//! - [`injection`] - Injected-class tokens and lookup
//!
//! ## Logging
//!
//! Diagnostics go through the [`log`](https://docs.rs/log) facade; the library installs no
//! logger. Heuristic picks are logged at `trace`, best-effort matches and unresolved internal
//! calls at `debug`, missing methods at `warn` and missing classes, fields and nested types at
//! `error`.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use il2scope::prelude::*;
///
/// let context = ResolverContext::attach(ResolverConfig::default())?;
/// println!("{} images loaded", context.images().len());
/// # Ok::<(), il2scope::Error>(())
/// ```
pub mod prelude;

/// Resolver configuration.
///
/// See [`ResolverConfig`] for the available settings and presets.
pub mod config;

mod context;

/// Logical export names and their resolution against a native module.
///
/// # Key Types
///
/// - [`exports::ExportNameTable`] - Logical name → actual symbol
/// - [`exports::ExportResolver`] - Looks the actual symbol up in a module
pub mod exports;

/// Opaque native handles, injection tokens and enumeration cursors.
pub mod handle;

/// Injected-class tokens and name lookup.
pub mod injection;

/// Method signature matching.
///
/// # Examples
///
/// ```rust
/// use il2scope::methods::normalize_type_name;
///
/// assert_eq!(normalize_type_name("System.Collections.Generic.List`1<System.Int32>"),
///            "System.Collections.Generic.List<System.Int32>");
/// ```
pub mod methods;

/// The native runtime binary, in-process or on disk.
pub mod module;

/// The native runtime's reflection accessors.
pub mod runtime;

/// Stand-ins for classes, methods and internal calls the runtime does not have.
pub mod standin;

/// Native type-name rendering.
pub mod typename;

/// Jump-target scanning and the class-initialization heuristics.
pub mod xref;

/// `il2scope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `il2scope` Error type
///
/// The main error type for all operations in this crate.
///
/// # Examples
///
/// ```rust,no_run
/// use il2scope::{Error, ResolverConfig, ResolverContext};
///
/// let context = ResolverContext::attach(ResolverConfig::default())?;
/// match context.resolve_export("il2cpp_gc_collect") {
///     Ok(address) => println!("gc_collect at {address}"),
///     Err(Error::ExportNotFound { symbol, .. }) => println!("{symbol} is not exported"),
///     Err(e) => println!("Error: {e}"),
/// }
/// # Ok::<(), il2scope::Error>(())
/// ```
pub use error::Error;

/// Main entry point of the resolution engine.
///
/// See [`ResolverContext`] for the available lookups.
pub use context::ResolverContext;

pub use config::{AmbiguousMatchPolicy, ResolverConfig};
pub use handle::{Cursor, InjectionToken, NativeHandle};
