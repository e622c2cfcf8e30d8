//! The native runtime's reflection primitives.
//!
//! The resolver never touches runtime structures directly. Everything it needs to know about
//! classes, methods and images comes through [`RuntimeApi`], which mirrors the runtime's own
//! exported accessors: cursor-based enumeration of methods and nested types, name and signature
//! accessors, and the domain's image list.
//!
//! [`ExportedRuntime`] is the production implementation, calling the accessors exported by the
//! native module. Tests and offline tools provide their own implementations.

mod exported;

pub use exported::ExportedRuntime;

use crate::handle::{Cursor, NativeHandle};

/// Native runtime reflection accessors.
///
/// Handles passed in are assumed to be valid runtime records; implementations return
/// [`NativeHandle::NULL`] for "nothing" and empty strings for missing names.
pub trait RuntimeApi: Send + Sync {
    /// Next method of `class`, or the zero handle once the cursor is exhausted
    fn class_methods(&self, class: NativeHandle, cursor: &mut Cursor) -> NativeHandle;

    /// Next nested type of `class`, or the zero handle once the cursor is exhausted
    fn class_nested_types(&self, class: NativeHandle, cursor: &mut Cursor) -> NativeHandle;

    /// Simple name of a class
    fn class_name(&self, class: NativeHandle) -> String;

    /// Whether the class is a constructed generic instance
    fn class_is_inflated(&self, class: NativeHandle) -> bool;

    /// Field of `class` called `name`
    fn class_field(&self, class: NativeHandle, name: &str) -> NativeHandle;

    /// Class `namespace.name` defined in `image`
    fn class_from_name(&self, image: NativeHandle, namespace: &str, name: &str) -> NativeHandle;

    /// Name of a method
    fn method_name(&self, method: NativeHandle) -> String;

    /// Number of parameters of a method
    fn method_param_count(&self, method: NativeHandle) -> u32;

    /// Type of parameter `index` of a method
    fn method_param_type(&self, method: NativeHandle, index: u32) -> NativeHandle;

    /// Return type of a method
    fn method_return_type(&self, method: NativeHandle) -> NativeHandle;

    /// Whether the method has generic parameters of its own
    fn method_is_generic(&self, method: NativeHandle) -> bool;

    /// Metadata token of a method
    fn method_token(&self, method: NativeHandle) -> u32;

    /// Name of a type as the runtime prints it
    fn type_name(&self, ty: NativeHandle) -> String;

    /// Images of every assembly loaded into the domain
    fn images(&self) -> Vec<NativeHandle>;

    /// Name of an image, e.g. `Assembly-CSharp.dll`
    fn image_name(&self, image: NativeHandle) -> String;

    /// Address of the internal call with the given signature
    fn resolve_icall(&self, signature: &str) -> NativeHandle;
}

#[derive(Debug, Clone, Copy)]
enum Members {
    Methods,
    NestedTypes,
}

/// Iterator over a cursor-enumerated member list of a class.
///
/// Created by [`methods`] and [`nested_types`]. A zero class handle enumerates nothing.
pub struct CursorIter<'a> {
    api: &'a dyn RuntimeApi,
    class: NativeHandle,
    cursor: Cursor,
    members: Members,
    done: bool,
}

impl Iterator for CursorIter<'_> {
    type Item = NativeHandle;

    fn next(&mut self) -> Option<NativeHandle> {
        if self.done || self.class.is_null() {
            return None;
        }

        let next = match self.members {
            Members::Methods => self.api.class_methods(self.class, &mut self.cursor),
            Members::NestedTypes => self.api.class_nested_types(self.class, &mut self.cursor),
        };

        if next.is_null() {
            self.done = true;
            return None;
        }
        Some(next)
    }
}

/// Enumerates the methods of `class`
pub fn methods(api: &dyn RuntimeApi, class: NativeHandle) -> CursorIter<'_> {
    CursorIter {
        api,
        class,
        cursor: Cursor::start(),
        members: Members::Methods,
        done: false,
    }
}

/// Enumerates the nested types of `class`
pub fn nested_types(api: &dyn RuntimeApi, class: NativeHandle) -> CursorIter<'_> {
    CursorIter {
        api,
        class,
        cursor: Cursor::start(),
        members: Members::NestedTypes,
        done: false,
    }
}

/// Renders a method as `return name(param, param)` for diagnostics
pub fn describe_method(api: &dyn RuntimeApi, method: NativeHandle) -> String {
    let params = (0..api.method_param_count(method))
        .map(|i| api.type_name(api.method_param_type(method, i)))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{} {}({})",
        api.type_name(api.method_return_type(method)),
        api.method_name(method),
        params
    )
}
