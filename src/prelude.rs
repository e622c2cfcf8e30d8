//! # il2scope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the il2scope library. Import this module to get quick access to the essential
//! types for resolving symbols and methods of a native runtime.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all il2scope operations
pub use crate::Error;

/// The result type used throughout il2scope
pub use crate::Result;

/// Resolver configuration and the overload tie-break policy
pub use crate::{AmbiguousMatchPolicy, ResolverConfig};

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// The resolution engine
pub use crate::ResolverContext;

/// Opaque handles into the native runtime
pub use crate::handle::{Cursor, InjectionToken, NativeHandle};

// ================================================================================================
// Native Modules
// ================================================================================================

/// Access to the runtime binary
pub use crate::module::{LoadedModule, Machine, ModuleImage, NativeModule};

/// Export resolution
pub use crate::exports::{ExportNameTable, ExportResolver};

// ================================================================================================
// Lookups
// ================================================================================================

/// Method matching
pub use crate::methods::{MethodQuery, MethodResolution};

/// Type-name rendering
pub use crate::typename::{NamedType, TypeNameRenderer, TypeShape};

/// Runtime accessors
pub use crate::runtime::RuntimeApi;

/// Stand-ins
pub use crate::standin::{InternalCall, MemberKind, MissingMember};

/// Injected classes
pub use crate::injection::{InjectedClassRegistry, InjectedType};

/// Call-graph scanning
pub use crate::xref::{ClassInitHeuristic, ClassInitLocator, HookTarget};
