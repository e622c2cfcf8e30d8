//! Resolver configuration
//!
//! Everything in the resolution engine that is versioned against particular native-runtime
//! builds, or that depends on how the managed proxy assemblies were generated, lives here
//! instead of being hard-wired into the algorithms.

use strum::{Display, EnumString};

/// What the method matcher does when several overloads share a name, arity and generic flag
/// but none of them matches the requested signature exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AmbiguousMatchPolicy {
    /// Log the full candidate set and return the last candidate seen
    #[default]
    LastCandidate,
    /// Log the full candidate set and fail with [`crate::Error::AmbiguousMethod`]
    Fatal,
}

/// Configuration for a [`crate::ResolverContext`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// File names the native runtime module may be loaded under, tried in order
    pub module_names: Vec<String>,

    /// Use the built-in logical → obfuscated export table (disable for unobfuscated builds)
    pub use_obfuscated_exports: bool,

    /// Prefix carried by generated proxy types, stripped when rendering type names
    pub proxy_prefix: String,

    /// Full names (generic definitions) of proxy types that stand in for native arrays
    pub array_wrappers: Vec<String>,

    /// Full name of the non-generic string array proxy, rendered as `System.String[]`
    pub string_array: String,

    /// Behaviour on ambiguous overloads
    pub ambiguous_policy: AmbiguousMatchPolicy,

    /// Number of code bytes decoded when following jump targets
    pub scan_window: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            module_names: vec![
                "GameAssembly.dll".to_string(),
                "GameAssembly.so".to_string(),
                "UserAssembly.dll".to_string(),
                "libil2cpp.so".to_string(),
            ],
            use_obfuscated_exports: true,
            proxy_prefix: "Il2Cpp".to_string(),
            array_wrappers: vec![
                "Il2CppInterop.Runtime.InteropTypes.Arrays.Il2CppArrayBase`1".to_string(),
                "Il2CppInterop.Runtime.InteropTypes.Arrays.Il2CppStructArray`1".to_string(),
                "Il2CppInterop.Runtime.InteropTypes.Arrays.Il2CppReferenceArray`1".to_string(),
            ],
            string_array: "Il2CppInterop.Runtime.InteropTypes.Arrays.Il2CppStringArray"
                .to_string(),
            ambiguous_policy: AmbiguousMatchPolicy::LastCandidate,
            scan_window: 0x1000,
        }
    }
}

impl ResolverConfig {
    /// Configuration for runtime builds that export their API under the plain logical names
    #[must_use]
    pub fn unobfuscated() -> Self {
        Self {
            use_obfuscated_exports: false,
            ..Self::default()
        }
    }

    /// Configuration that refuses to guess between overloads
    #[must_use]
    pub fn strict() -> Self {
        Self {
            ambiguous_policy: AmbiguousMatchPolicy::Fatal,
            ..Self::default()
        }
    }

    /// Replace the candidate module names
    #[must_use]
    pub fn with_module_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.module_names = names.into_iter().map(Into::into).collect();
        self
    }
}
