//! Overload resolution against the native method tables.
//!
//! Managed proxies know a method by its declaring class, name, generic flag and rendered return
//! and parameter type names. The [`MethodMatcher`] walks the native class's method list and
//! picks the native method that fits best.
//!
//! # Matching
//!
//! Type names on both sides are canonicalized first: generic arity suffixes (`` `1 ``) are
//! removed and nested-type separators (`/`, `+`) become `.`. Methods whose name, parameter count
//! or generic flag differ are skipped; the rest are candidates. Then:
//!
//! - the first candidate whose return type and every parameter type match is returned as an
//!   exact match
//! - with no exact match and a single candidate, that candidate is returned as a best-effort
//!   match and the type mismatch is logged
//! - with several candidates, every same-name method is logged with its signature and the
//!   [`AmbiguousMatchPolicy`] decides between the last candidate and an error
//! - with no candidate, a [`MissingMember`] stand-in is returned
//!
//! # Examples
//!
//! ```rust,no_run
//! use il2scope::methods::MethodQuery;
//! use il2scope::{ResolverConfig, ResolverContext};
//!
//! let context = ResolverContext::attach(ResolverConfig::default())?;
//! let player = context.class("Assembly-CSharp.dll", "Game", "Player");
//!
//! let query = MethodQuery::new(player.unwrap_or_default(), "Jump")
//!     .returns("System.Void")
//!     .with_parameters(["System.Single"]);
//! let jump = context.find_method(&query)?.require()?;
//! println!("Player::Jump at {jump}");
//! # Ok::<(), il2scope::Error>(())
//! ```

use std::{borrow::Cow, sync::Arc};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    config::AmbiguousMatchPolicy,
    handle::NativeHandle,
    runtime::{describe_method, methods, RuntimeApi},
    standin::{MemberKind, MissingMember},
    Error::AmbiguousMethod,
    Result,
};

static ARITY_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`\d+").expect("arity suffix pattern is valid"));

/// Canonicalizes a type name for comparison.
///
/// ```rust
/// use il2scope::methods::normalize_type_name;
///
/// assert_eq!(
///     normalize_type_name("System.Collections.Generic.List`1+Enumerator"),
///     "System.Collections.Generic.List.Enumerator"
/// );
/// ```
#[must_use]
pub fn normalize_type_name(name: &str) -> Cow<'_, str> {
    let stripped = ARITY_SUFFIX.replace_all(name, "");
    if stripped.contains(['/', '+']) {
        Cow::Owned(stripped.replace(['/', '+'], "."))
    } else {
        stripped
    }
}

/// A managed method declaration to find in the native runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodQuery {
    /// Native class declaring the method
    pub class: NativeHandle,
    /// Method name
    pub name: String,
    /// Whether the method has generic parameters of its own
    pub is_generic: bool,
    /// Rendered return type name
    pub return_type: String,
    /// Rendered parameter type names, in order
    pub parameter_types: Vec<String>,
}

impl MethodQuery {
    /// A query for a non-generic, parameterless `void` method
    pub fn new(class: NativeHandle, name: impl Into<String>) -> Self {
        MethodQuery {
            class,
            name: name.into(),
            is_generic: false,
            return_type: "System.Void".to_string(),
            parameter_types: Vec::new(),
        }
    }

    /// Sets the return type name
    #[must_use]
    pub fn returns(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = return_type.into();
        self
    }

    /// Sets the parameter type names
    #[must_use]
    pub fn with_parameters<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameter_types = parameters.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the method as generic
    #[must_use]
    pub fn generic(mut self, is_generic: bool) -> Self {
        self.is_generic = is_generic;
        self
    }

    /// `name(param, param)`
    #[must_use]
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.parameter_types.join(", "))
    }
}

/// A native method picked by the matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodCandidate {
    /// The native method
    pub handle: NativeHandle,
    /// `false` when the method was picked despite a type mismatch
    pub matched_exactly: bool,
}

/// Outcome of a method lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodResolution {
    /// A native method was picked
    Found(MethodCandidate),
    /// Nothing fits; the stand-in names what was requested
    Missing(MissingMember),
}

impl MethodResolution {
    /// The native method, failing if the lookup produced a stand-in.
    ///
    /// # Errors
    /// Returns [`crate::Error::MissingMember`] naming the requested method.
    pub fn require(&self) -> Result<NativeHandle> {
        match self {
            MethodResolution::Found(candidate) => Ok(candidate.handle),
            MethodResolution::Missing(missing) => Err(missing.error()),
        }
    }

    /// The native method, if one was picked
    #[must_use]
    pub fn handle(&self) -> Option<NativeHandle> {
        match self {
            MethodResolution::Found(candidate) => Some(candidate.handle),
            MethodResolution::Missing(_) => None,
        }
    }

    /// Returns `true` for an exact signature match
    #[must_use]
    pub fn is_exact(&self) -> bool {
        matches!(
            self,
            MethodResolution::Found(MethodCandidate {
                matched_exactly: true,
                ..
            })
        )
    }

    /// Returns `true` if the lookup produced a stand-in
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, MethodResolution::Missing(_))
    }
}

/// Finds native methods for managed method declarations.
pub struct MethodMatcher {
    api: Arc<dyn RuntimeApi>,
    policy: AmbiguousMatchPolicy,
}

impl MethodMatcher {
    /// Creates a matcher over `api`
    pub fn new(api: Arc<dyn RuntimeApi>, policy: AmbiguousMatchPolicy) -> Self {
        MethodMatcher { api, policy }
    }

    /// The policy applied to ambiguous lookups
    #[must_use]
    pub fn policy(&self) -> AmbiguousMatchPolicy {
        self.policy
    }

    /// Resolves `query` to a native method.
    ///
    /// # Errors
    /// Returns [`crate::Error::AmbiguousMethod`] if several candidates fit, none exactly, and the
    /// policy is [`AmbiguousMatchPolicy::Fatal`].
    pub fn find_method(&self, query: &MethodQuery) -> Result<MethodResolution> {
        if query.class.is_null() {
            log::warn!("Cannot look up {}: class handle is null", query.signature());
            return Ok(MethodResolution::Missing(MissingMember::new(
                MemberKind::Method,
                query.signature(),
            )));
        }

        let api = self.api.as_ref();
        let return_type = normalize_type_name(&query.return_type);
        let parameter_types: Vec<Cow<'_, str>> = query
            .parameter_types
            .iter()
            .map(|p| normalize_type_name(p))
            .collect();

        let mut candidates = 0usize;
        let mut last = NativeHandle::NULL;

        for method in methods(api, query.class) {
            if api.method_name(method) != query.name
                || api.method_param_count(method) as usize != parameter_types.len()
                || api.method_is_generic(method) != query.is_generic
            {
                continue;
            }

            candidates += 1;
            last = method;

            if normalize_type_name(&api.type_name(api.method_return_type(method))) != return_type {
                continue;
            }

            let exact = parameter_types.iter().enumerate().all(|(i, wanted)| {
                let actual = api.type_name(api.method_param_type(method, i as u32));
                normalize_type_name(&actual) == *wanted
            });
            if exact {
                return Ok(MethodResolution::Found(MethodCandidate {
                    handle: method,
                    matched_exactly: true,
                }));
            }
        }

        let class_name = api.class_name(query.class);
        match candidates {
            0 => {
                log::warn!(
                    "Unable to find method {}::{}",
                    class_name,
                    query.signature()
                );
                self.log_same_name(query, &class_name);
                Ok(MethodResolution::Missing(MissingMember::new(
                    MemberKind::Method,
                    format!("{}::{}", class_name, query.signature()),
                )))
            }
            1 => {
                self.log_stand_in(query, &class_name, last, &return_type, &parameter_types);
                Ok(MethodResolution::Found(MethodCandidate {
                    handle: last,
                    matched_exactly: false,
                }))
            }
            _ => {
                log::warn!(
                    "Method {}::{} is ambiguous: {} candidates share its name and arity, none matches exactly",
                    class_name,
                    query.signature(),
                    candidates
                );
                log::warn!("    requested return {}", return_type);
                self.log_same_name(query, &class_name);

                match self.policy {
                    AmbiguousMatchPolicy::LastCandidate => {
                        Ok(MethodResolution::Found(MethodCandidate {
                            handle: last,
                            matched_exactly: false,
                        }))
                    }
                    AmbiguousMatchPolicy::Fatal => Err(AmbiguousMethod {
                        class: class_name,
                        method: query.name.clone(),
                        candidates,
                    }),
                }
            }
        }
    }

    /// Resolves a method of `class` by metadata token.
    #[must_use]
    pub fn find_method_by_token(&self, class: NativeHandle, token: u32) -> MethodResolution {
        if class.is_null() {
            log::warn!("Cannot look up method token 0x{token:08X}: class handle is null");
            return MethodResolution::Missing(MissingMember::new(
                MemberKind::Method,
                token.to_string(),
            ));
        }

        let api = self.api.as_ref();
        if let Some(method) = methods(api, class).find(|m| api.method_token(*m) == token) {
            return MethodResolution::Found(MethodCandidate {
                handle: method,
                matched_exactly: true,
            });
        }

        let class_name = api.class_name(class);
        log::warn!("Unable to find method {class_name}::0x{token:08X}");
        MethodResolution::Missing(MissingMember::new(
            MemberKind::Method,
            format!("{class_name}::{token}"),
        ))
    }

    fn log_stand_in(
        &self,
        query: &MethodQuery,
        class_name: &str,
        method: NativeHandle,
        return_type: &str,
        parameter_types: &[Cow<'_, str>],
    ) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }

        let api = self.api.as_ref();
        log::debug!(
            "Method {}::{} was stubbed with the only method of the same name and arity",
            class_name,
            query.name
        );
        log::debug!(
            "    return {} / {}",
            api.type_name(api.method_return_type(method)),
            return_type
        );
        for (i, wanted) in parameter_types.iter().enumerate() {
            log::debug!(
                "    {} / {}",
                api.type_name(api.method_param_type(method, i as u32)),
                wanted
            );
        }
    }

    fn log_same_name(&self, query: &MethodQuery, class_name: &str) {
        let api = self.api.as_ref();
        let same_name: Vec<String> = methods(api, query.class)
            .filter(|m| api.method_name(*m) == query.name)
            .map(|m| describe_method(api, m))
            .collect();

        if same_name.is_empty() {
            log::warn!("    {} has no method named {}", class_name, query.name);
            return;
        }
        log::warn!("    available methods named {}:", query.name);
        for signature in same_name {
            log::warn!("        {signature}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test::FakeRuntime, Error};

    struct Fixture {
        runtime: Arc<FakeRuntime>,
        class: NativeHandle,
        get_int: NativeHandle,
        foo_two: NativeHandle,
        bar_string: NativeHandle,
        bar_object: NativeHandle,
        generic_map: NativeHandle,
    }

    fn fixture() -> Fixture {
        let mut runtime = FakeRuntime::new();
        let image = runtime.add_image("Assembly-CSharp.dll");
        let class = runtime.add_class(image, "Game", "C");

        let get_int = runtime.add_method(class, "Get", "System.Int32", &[]);
        runtime.add_method(class, "Get", "System.String", &["System.Int32"]);
        runtime.add_method(class, "Foo", "System.Void", &["System.Int32"]);
        let foo_two = runtime.add_method(class, "Foo", "System.Void", &["System.Int32", "System.Int32"]);
        let bar_string = runtime.add_method(class, "Bar", "System.Void", &["System.String"]);
        let bar_object = runtime.add_method(class, "Bar", "System.Void", &["System.Object"]);
        runtime.add_method(
            class,
            "Enumerate",
            "System.Collections.Generic.List`1+Enumerator",
            &["Game.Outer/Inner"],
        );
        let generic_map = runtime.add_method(class, "Map", "T", &["T"]);
        runtime.set_generic(generic_map);

        Fixture {
            runtime: Arc::new(runtime),
            class,
            get_int,
            foo_two,
            bar_string,
            bar_object,
            generic_map,
        }
    }

    fn matcher(fixture: &Fixture, policy: AmbiguousMatchPolicy) -> MethodMatcher {
        MethodMatcher::new(fixture.runtime.clone(), policy)
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_type_name("System.Int32"), "System.Int32");
        assert!(matches!(normalize_type_name("System.Int32"), Cow::Borrowed(_)));
        assert_eq!(
            normalize_type_name("System.Collections.Generic.Dictionary`2<System.String,System.Int32>"),
            "System.Collections.Generic.Dictionary<System.String,System.Int32>"
        );
        assert_eq!(normalize_type_name("A.B/C+D`12"), "A.B.C.D");
    }

    #[test]
    fn test_exact_match() {
        let fixture = fixture();
        let matcher = matcher(&fixture, AmbiguousMatchPolicy::LastCandidate);

        let query = MethodQuery::new(fixture.class, "Get").returns("System.Int32");
        let resolution = matcher.find_method(&query).unwrap();
        assert!(resolution.is_exact());
        assert_eq!(resolution.require().unwrap(), fixture.get_int);
    }

    #[test]
    fn test_arity_unique_stand_in() {
        let fixture = fixture();
        let matcher = matcher(&fixture, AmbiguousMatchPolicy::Fatal);

        let query = MethodQuery::new(fixture.class, "Foo")
            .with_parameters(["System.Int32", "System.String"]);
        let resolution = matcher.find_method(&query).unwrap();
        assert_eq!(
            resolution,
            MethodResolution::Found(MethodCandidate {
                handle: fixture.foo_two,
                matched_exactly: false,
            })
        );
    }

    #[test]
    fn test_canonicalized_names_match() {
        let fixture = fixture();
        let matcher = matcher(&fixture, AmbiguousMatchPolicy::Fatal);

        let query = MethodQuery::new(fixture.class, "Enumerate")
            .returns("System.Collections.Generic.List`1/Enumerator")
            .with_parameters(["Game.Outer+Inner"]);
        assert!(matcher.find_method(&query).unwrap().is_exact());
    }

    #[test]
    fn test_ambiguous_last_candidate() {
        let fixture = fixture();
        let matcher = matcher(&fixture, AmbiguousMatchPolicy::LastCandidate);

        let query = MethodQuery::new(fixture.class, "Bar").with_parameters(["System.Int64"]);
        let resolution = matcher.find_method(&query).unwrap();
        assert_eq!(resolution.handle(), Some(fixture.bar_object));
        assert!(!resolution.is_exact());

        let exact = MethodQuery::new(fixture.class, "Bar").with_parameters(["System.String"]);
        assert_eq!(
            matcher.find_method(&exact).unwrap().handle(),
            Some(fixture.bar_string)
        );
    }

    #[test]
    fn test_ambiguous_fatal() {
        let fixture = fixture();
        let matcher = matcher(&fixture, AmbiguousMatchPolicy::Fatal);
        assert_eq!(matcher.policy(), AmbiguousMatchPolicy::Fatal);

        let query = MethodQuery::new(fixture.class, "Bar").with_parameters(["System.Int64"]);
        match matcher.find_method(&query) {
            Err(Error::AmbiguousMethod {
                class,
                method,
                candidates,
            }) => {
                assert_eq!(class, "C");
                assert_eq!(method, "Bar");
                assert_eq!(candidates, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_generic_flag() {
        let fixture = fixture();
        let matcher = matcher(&fixture, AmbiguousMatchPolicy::LastCandidate);

        let generic = MethodQuery::new(fixture.class, "Map")
            .returns("T")
            .with_parameters(["T"])
            .generic(true);
        assert_eq!(
            matcher.find_method(&generic).unwrap().handle(),
            Some(fixture.generic_map)
        );

        let plain = generic.clone().generic(false);
        assert!(matcher.find_method(&plain).unwrap().is_missing());
    }

    #[test]
    fn test_no_candidate() {
        let fixture = fixture();
        let matcher = matcher(&fixture, AmbiguousMatchPolicy::LastCandidate);

        let query = MethodQuery::new(fixture.class, "Get")
            .returns("System.Int32")
            .with_parameters(["System.Int32", "System.Int32"]);
        let resolution = matcher.find_method(&query).unwrap();
        match &resolution {
            MethodResolution::Missing(missing) => {
                assert_eq!(missing.kind(), MemberKind::Method);
                assert_eq!(missing.name(), "C::Get(System.Int32, System.Int32)");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            resolution.require(),
            Err(Error::MissingMember { kind: "method", .. })
        ));
    }

    #[test]
    fn test_null_class() {
        let fixture = fixture();
        let matcher = matcher(&fixture, AmbiguousMatchPolicy::Fatal);

        let query = MethodQuery::new(NativeHandle::NULL, "Jump").with_parameters(["System.Single"]);
        let resolution = matcher.find_method(&query).unwrap();
        let err = resolution.require().unwrap_err();
        assert_eq!(
            err.to_string(),
            "method Jump(System.Single) was not found in the native runtime"
        );
    }

    #[test]
    fn test_by_token() {
        let fixture = fixture();
        let matcher = matcher(&fixture, AmbiguousMatchPolicy::LastCandidate);
        let token = fixture.runtime.method_token(fixture.foo_two);

        let resolution = matcher.find_method_by_token(fixture.class, token);
        assert_eq!(resolution.handle(), Some(fixture.foo_two));
        assert!(resolution.is_exact());

        match matcher.find_method_by_token(fixture.class, 0x0600_FFFF) {
            MethodResolution::Missing(missing) => {
                assert_eq!(missing.name(), format!("C::{}", 0x0600_FFFFu32));
            }
            other => panic!("unexpected {other:?}"),
        }

        match matcher.find_method_by_token(NativeHandle::NULL, 7) {
            MethodResolution::Missing(missing) => assert_eq!(missing.name(), "7"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
