//! Stand-ins for entities the native runtime does not have.
//!
//! A lookup that finds nothing never hands a null handle to code that would call through it or
//! dereference it. It returns a stand-in instead: a value that is safe to store and pass around
//! and that only fails, with an error naming what was asked for, once it is actually used.
//!
//! - [`MissingMember`] stands in for a class, method, field or nested type.
//! - [`InternalCall`] is an internal-call binding that may or may not have a native target.

use std::fmt;

use strum::{Display, IntoStaticStr};

use crate::{
    handle::NativeHandle,
    Error::{self, UnresolvedInternalCall},
    Result,
};

/// The kind of entity a [`MissingMember`] stands in for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum MemberKind {
    /// A class
    Class,
    /// A method
    Method,
    /// A field
    Field,
    /// A nested type
    #[strum(serialize = "nested type")]
    NestedType,
}

/// Sentinel for a requested entity that does not exist in the native runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MissingMember {
    kind: MemberKind,
    name: String,
}

impl MissingMember {
    /// Creates a stand-in for `name`
    pub fn new(kind: MemberKind, name: impl Into<String>) -> Self {
        MissingMember {
            kind,
            name: name.into(),
        }
    }

    /// What kind of entity was requested
    #[must_use]
    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    /// The requested name or signature
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The error raised when the stand-in is used
    #[must_use]
    pub fn error(&self) -> Error {
        Error::MissingMember {
            kind: self.kind.into(),
            name: self.name.clone(),
        }
    }
}

impl fmt::Display for MissingMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing {} {}", self.kind, self.name)
    }
}

/// An internal-call binding of function-pointer type `F`.
///
/// Resolved calls carry the native function; unresolved ones only carry the signature and fail
/// when invoked. The foreign call itself is made by the caller's closure:
///
/// ```rust
/// use il2scope::standin::InternalCall;
///
/// type GetLength = extern "C" fn(usize) -> i32;
///
/// let missing = InternalCall::<GetLength>::missing("UnityEngine.Object::GetLength()");
/// let result = missing.invoke(|get_length| get_length(0x1000));
/// assert!(result.is_err());
/// ```
#[derive(Clone)]
pub struct InternalCall<F> {
    signature: String,
    target: Option<F>,
}

impl<F: Copy> InternalCall<F> {
    /// A binding with no native target
    pub fn missing(signature: impl Into<String>) -> Self {
        InternalCall {
            signature: signature.into(),
            target: None,
        }
    }

    /// A binding to an already typed function
    pub fn bound(signature: impl Into<String>, target: F) -> Self {
        InternalCall {
            signature: signature.into(),
            target: Some(target),
        }
    }

    /// Binds `address` as `F`; the zero handle produces a missing binding.
    ///
    /// # Errors
    /// Returns [`crate::Error::BindingSize`] if `F` is not pointer sized.
    ///
    /// # Safety
    /// A non-null `address` must point at a function matching `F`.
    pub unsafe fn bind(signature: impl Into<String>, address: NativeHandle) -> Result<Self> {
        Ok(InternalCall {
            signature: signature.into(),
            target: address.to_fn::<F>()?,
        })
    }

    /// The internal-call signature this binding was requested for
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Returns `true` if a native target is bound
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.target.is_some()
    }

    /// The bound function, if any
    #[must_use]
    pub fn target(&self) -> Option<F> {
        self.target
    }

    /// Calls `call` with the bound function.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnresolvedInternalCall`] naming the signature if nothing is bound.
    pub fn invoke<R>(&self, call: impl FnOnce(F) -> R) -> Result<R> {
        match self.target {
            Some(target) => Ok(call(target)),
            None => Err(UnresolvedInternalCall(self.signature.clone())),
        }
    }
}

impl<F> fmt::Debug for InternalCall<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternalCall")
            .field("signature", &self.signature)
            .field("resolved", &self.target.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Twice = extern "C" fn(i32) -> i32;

    extern "C" fn twice(value: i32) -> i32 {
        value * 2
    }

    #[test]
    fn test_missing_member() {
        let missing = MissingMember::new(MemberKind::Method, "Player::Jump(System.Single)");
        assert_eq!(missing.kind(), MemberKind::Method);
        assert_eq!(missing.name(), "Player::Jump(System.Single)");
        assert_eq!(missing.to_string(), "missing method Player::Jump(System.Single)");

        match missing.error() {
            Error::MissingMember { kind, name } => {
                assert_eq!(kind, "method");
                assert_eq!(name, "Player::Jump(System.Single)");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            missing.error().to_string(),
            "method Player::Jump(System.Single) was not found in the native runtime"
        );
    }

    #[test]
    fn test_member_kind_names() {
        assert_eq!(MemberKind::Class.to_string(), "class");
        assert_eq!(MemberKind::Field.to_string(), "field");
        let nested: &'static str = MemberKind::NestedType.into();
        assert_eq!(nested, "nested type");
    }

    #[test]
    fn test_internal_call_missing() {
        let call = InternalCall::<Twice>::missing("UnityEngine.Time::get_time()");
        assert!(!call.is_resolved());
        assert!(call.target().is_none());

        let err = call.invoke(|f| f(1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "ICall with signature UnityEngine.Time::get_time() was not resolved"
        );
    }

    #[test]
    fn test_internal_call_bound() {
        let call = InternalCall::<Twice>::bound("Twice", twice);
        assert!(call.is_resolved());
        assert_eq!(call.invoke(|f| f(21)).unwrap(), 42);

        let bound = unsafe { InternalCall::<Twice>::bind("Twice", NativeHandle(twice as usize)) }
            .unwrap();
        assert_eq!(bound.invoke(|f| f(4)).unwrap(), 8);
        assert_eq!(bound.signature(), "Twice");

        let null = unsafe { InternalCall::<Twice>::bind("Twice", NativeHandle::NULL) }.unwrap();
        assert!(!null.is_resolved());
    }

    #[test]
    fn test_internal_call_debug() {
        let call = InternalCall::<Twice>::missing("A::B()");
        assert_eq!(
            format!("{call:?}"),
            "InternalCall { signature: \"A::B()\", resolved: false }"
        );
    }
}
