//! Rendering managed types as native runtime type names.
//!
//! The method matcher compares type names as the native runtime prints them
//! (`System.Collections.Generic.List<System.Int32>`, `System.String[]`, `System.Int32&`). On the
//! managed side every type is described by a [`TypeShape`], and the [`TypeNameRenderer`] turns
//! that shape into the native spelling.
//!
//! # Rendering Rules
//!
//! Applied in order:
//!
//! 1. array: `element[]`
//! 2. by-reference: `element&`
//! 3. pointer: `element*`
//! 4. generic parameter: the bare parameter name
//! 5. constructed generic: `definition<arg,arg>`, except array wrapper proxies, which render as
//!    `first_arg[]`
//! 6. named type: the obfuscated name if the type carries one, else the full name. The string
//!    array proxy renders as `System.String[]`.
//!
//! Names from rules 5 and 6 lose the generated-proxy prefix (`Il2Cpp` by default).
//!
//! # Examples
//!
//! ```rust
//! use il2scope::typename::{NamedType, TypeNameRenderer, TypeShape};
//!
//! let renderer = TypeNameRenderer::default();
//!
//! let list = TypeShape::generic(
//!     NamedType::new("Il2CppSystem.Collections.Generic.List`1"),
//!     vec![TypeShape::named("System.Int32")],
//! );
//! assert_eq!(
//!     renderer.render(&list),
//!     "System.Collections.Generic.List`1<System.Int32>"
//! );
//!
//! let by_ref = TypeShape::named("System.Single").array().by_ref();
//! assert_eq!(renderer.render(&by_ref), "System.Single[]&");
//! ```

use rustc_hash::FxHashSet;

use crate::config::ResolverConfig;

/// A named (non-constructed) managed type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedType {
    /// Namespace-qualified name, with generic arity suffix for generic definitions
    pub full_name: String,
    /// Original native name, for types whose proxy was renamed during deobfuscation
    pub obfuscated_name: Option<String>,
    /// The type derives from an array wrapper proxy and should render as a native array
    pub array_wrapper: bool,
}

impl NamedType {
    /// A plain named type
    pub fn new(full_name: impl Into<String>) -> Self {
        NamedType {
            full_name: full_name.into(),
            obfuscated_name: None,
            array_wrapper: false,
        }
    }

    /// Attach the native name the proxy was generated from
    #[must_use]
    pub fn with_obfuscated_name(mut self, name: impl Into<String>) -> Self {
        self.obfuscated_name = Some(name.into());
        self
    }

    /// Mark the type as an array wrapper
    #[must_use]
    pub fn as_array_wrapper(mut self) -> Self {
        self.array_wrapper = true;
        self
    }

    fn native_name(&self) -> &str {
        self.obfuscated_name.as_deref().unwrap_or(&self.full_name)
    }
}

/// The structure of a managed type, as far as naming is concerned
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeShape {
    /// Single-dimensional array of the element
    Array(Box<TypeShape>),
    /// Managed reference to the element
    ByRef(Box<TypeShape>),
    /// Unmanaged pointer to the element
    Pointer(Box<TypeShape>),
    /// Unbound generic parameter, e.g. `T`
    GenericParameter(String),
    /// Constructed generic type
    Generic {
        /// The generic type definition
        definition: NamedType,
        /// Type arguments in declaration order
        arguments: Vec<TypeShape>,
    },
    /// Any other type
    Named(NamedType),
}

impl TypeShape {
    /// A plain named type
    pub fn named(full_name: impl Into<String>) -> Self {
        TypeShape::Named(NamedType::new(full_name))
    }

    /// A generic parameter
    pub fn generic_parameter(name: impl Into<String>) -> Self {
        TypeShape::GenericParameter(name.into())
    }

    /// A constructed generic type
    #[must_use]
    pub fn generic(definition: NamedType, arguments: Vec<TypeShape>) -> Self {
        TypeShape::Generic {
            definition,
            arguments,
        }
    }

    /// An array of `self`
    #[must_use]
    pub fn array(self) -> Self {
        TypeShape::Array(Box::new(self))
    }

    /// A by-reference `self`
    #[must_use]
    pub fn by_ref(self) -> Self {
        TypeShape::ByRef(Box::new(self))
    }

    /// A pointer to `self`
    #[must_use]
    pub fn pointer(self) -> Self {
        TypeShape::Pointer(Box::new(self))
    }
}

impl From<NamedType> for TypeShape {
    fn from(named: NamedType) -> Self {
        TypeShape::Named(named)
    }
}

/// Renders [`TypeShape`]s as native type names.
///
/// The renderer is pure; the same shape always yields the same name.
#[derive(Debug, Clone)]
pub struct TypeNameRenderer {
    proxy_prefix: String,
    array_wrappers: FxHashSet<String>,
    string_array: String,
}

impl Default for TypeNameRenderer {
    fn default() -> Self {
        Self::new(&ResolverConfig::default())
    }
}

impl TypeNameRenderer {
    /// Creates a renderer with the prefix and wrapper names of `config`
    #[must_use]
    pub fn new(config: &ResolverConfig) -> Self {
        TypeNameRenderer {
            proxy_prefix: config.proxy_prefix.clone(),
            array_wrappers: config.array_wrappers.iter().cloned().collect(),
            string_array: config.string_array.clone(),
        }
    }

    /// Renders `shape` as the native runtime spells it
    #[must_use]
    pub fn render(&self, shape: &TypeShape) -> String {
        let mut name = String::new();
        self.write(shape, &mut name);
        name
    }

    /// Renders `shape`, marking it by-reference when `by_ref` is set.
    ///
    /// Used for parameters whose by-reference-ness is declared on the parameter rather than
    /// carried by the type.
    #[must_use]
    pub fn render_with_ref_marker(&self, shape: &TypeShape, by_ref: bool) -> String {
        let mut name = self.render(shape);
        if by_ref {
            name.push('&');
        }
        name
    }

    fn write(&self, shape: &TypeShape, out: &mut String) {
        match shape {
            TypeShape::Array(element) => {
                self.write(element, out);
                out.push_str("[]");
            }
            TypeShape::ByRef(element) => {
                self.write(element, out);
                out.push('&');
            }
            TypeShape::Pointer(element) => {
                self.write(element, out);
                out.push('*');
            }
            TypeShape::GenericParameter(name) => out.push_str(name),
            TypeShape::Generic {
                definition,
                arguments,
            } => {
                if self.is_array_wrapper(definition) {
                    if let Some(element) = arguments.first() {
                        self.write(element, out);
                    }
                    out.push_str("[]");
                    return;
                }

                out.push_str(self.trim_prefix(definition.native_name()));
                out.push('<');
                for (i, argument) in arguments.iter().enumerate() {
                    if i != 0 {
                        out.push(',');
                    }
                    self.write(argument, out);
                }
                out.push('>');
            }
            TypeShape::Named(named) => {
                if named.full_name == self.string_array {
                    out.push_str("System.String[]");
                } else {
                    out.push_str(self.trim_prefix(named.native_name()));
                }
            }
        }
    }

    fn is_array_wrapper(&self, definition: &NamedType) -> bool {
        definition.array_wrapper || self.array_wrappers.contains(&definition.full_name)
    }

    fn trim_prefix<'a>(&self, name: &'a str) -> &'a str {
        name.strip_prefix(self.proxy_prefix.as_str()).unwrap_or(name)
    }
}
