//! Opaque handles into the native runtime.
//!
//! The native runtime owns every class, method, field, type and image record; this crate only
//! ever holds their addresses. [`NativeHandle`] is that address, [`InjectionToken`] is the
//! synthetic identity handed to types injected at runtime, and [`Cursor`] is the opaque
//! iteration state the runtime's enumeration functions thread through repeated calls.

use std::{ffi::c_void, fmt, mem};

use crate::{Error::BindingSize, Result};

/// An opaque address identifying a native runtime entity.
///
/// Handles own no memory and their validity is tied to the native runtime's lifetime. Two
/// handles are equal when they point at the same address.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NativeHandle(pub usize);

impl NativeHandle {
    /// The zero handle.
    pub const NULL: NativeHandle = NativeHandle(0);

    /// Creates a handle from a raw address
    #[must_use]
    pub fn new(address: usize) -> Self {
        NativeHandle(address)
    }

    /// Creates a handle from a raw pointer
    #[must_use]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        NativeHandle(ptr as usize)
    }

    /// Returns the raw address
    #[must_use]
    pub fn address(&self) -> usize {
        self.0
    }

    /// Returns the handle as a pointer for passing back into the runtime
    #[must_use]
    pub fn as_ptr(&self) -> *mut c_void {
        self.0 as *mut c_void
    }

    /// Returns true if this is the zero handle
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Returns `None` for the zero handle, `Some(self)` otherwise
    #[must_use]
    pub fn non_null(self) -> Option<Self> {
        if self.is_null() {
            None
        } else {
            Some(self)
        }
    }

    /// Reinterprets the address as a function pointer of type `F`.
    ///
    /// The zero handle yields `None`, since function pointers are never null.
    ///
    /// # Errors
    /// Returns [`crate::Error::BindingSize`] if `F` is not pointer sized.
    ///
    /// # Safety
    /// The handle must point at a function whose calling convention and signature match `F`.
    pub unsafe fn to_fn<F: Copy>(self) -> Result<Option<F>> {
        if mem::size_of::<F>() != mem::size_of::<usize>() {
            return Err(BindingSize(mem::size_of::<F>()));
        }

        if self.is_null() {
            return Ok(None);
        }

        Ok(Some(mem::transmute_copy::<usize, F>(&self.0)))
    }
}

impl From<usize> for NativeHandle {
    fn from(value: usize) -> Self {
        NativeHandle(value)
    }
}

impl From<NativeHandle> for usize {
    fn from(handle: NativeHandle) -> Self {
        handle.0
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeHandle(0x{:x})", self.0)
    }
}

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// Synthetic metadata token assigned to an injected type.
///
/// Real metadata tokens are non-negative, so injected types count downwards from `-2`. A token
/// is never reused for the lifetime of the process.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InjectionToken(pub i64);

impl InjectionToken {
    /// The first token handed out by a fresh registry
    pub const FIRST: InjectionToken = InjectionToken(-2);

    /// Returns the raw token value
    #[must_use]
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Debug for InjectionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InjectionToken({})", self.0)
    }
}

impl fmt::Display for InjectionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Iteration state for the runtime's `get_methods` / `get_nested_types` style enumerators.
///
/// The runtime writes whatever it needs into the cursor between calls; callers start from
/// [`Cursor::start`] and stop once the enumerator returns nothing.
#[derive(Debug, Default)]
#[repr(transparent)]
pub struct Cursor(pub usize);

impl Cursor {
    /// A cursor positioned before the first element
    #[must_use]
    pub fn start() -> Self {
        Cursor(0)
    }

    /// Pointer to the cursor slot, as expected by the native enumerators
    pub fn as_mut_ptr(&mut self) -> *mut *mut c_void {
        std::ptr::addr_of_mut!(self.0).cast()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_handle_null() {
        assert!(NativeHandle::NULL.is_null());
        assert!(NativeHandle::default().is_null());
        assert!(!NativeHandle::new(0x1000).is_null());
        assert_eq!(NativeHandle::NULL.non_null(), None);
        assert_eq!(
            NativeHandle::new(0x10).non_null(),
            Some(NativeHandle::new(0x10))
        );
    }

    #[test]
    fn test_handle_from_ptr() {
        let value = 42u32;
        let handle = NativeHandle::from_ptr(&value as *const u32);
        assert_eq!(handle.address(), &value as *const u32 as usize);
        assert_eq!(handle.as_ptr() as usize, handle.address());
    }

    #[test]
    fn test_handle_display_debug() {
        let handle = NativeHandle::new(0x7ff6_1234);
        assert_eq!(format!("{}", handle), "0x7FF61234");
        assert_eq!(format!("{:?}", handle), "NativeHandle(0x7ff61234)");
    }

    #[test]
    fn test_handle_conversion() {
        let handle: NativeHandle = 0x2000usize.into();
        let back: usize = handle.into();
        assert_eq!(back, 0x2000);
    }

    #[test]
    fn test_handle_hash_equality() {
        let mut map = HashMap::new();
        map.insert(NativeHandle::new(1), "a");
        map.insert(NativeHandle::new(2), "b");
        assert_eq!(map.get(&NativeHandle::new(1)), Some(&"a"));
        assert_eq!(NativeHandle::new(2), NativeHandle::new(2));
        assert_ne!(NativeHandle::new(2), NativeHandle::new(3));
    }

    #[test]
    fn test_handle_to_fn() {
        extern "C" fn add(a: i32, b: i32) -> i32 {
            a + b
        }
        type Add = extern "C" fn(i32, i32) -> i32;

        let handle = NativeHandle(add as usize);
        let bound = unsafe { handle.to_fn::<Add>() }.unwrap().unwrap();
        assert_eq!(bound(2, 3), 5);

        assert!(unsafe { NativeHandle::NULL.to_fn::<Add>() }.unwrap().is_none());
        assert!(matches!(
            unsafe { handle.to_fn::<u8>() },
            Err(crate::Error::BindingSize(1))
        ));
    }

    #[test]
    fn test_injection_token() {
        assert_eq!(InjectionToken::FIRST.value(), -2);
        assert!(InjectionToken(-3) < InjectionToken::FIRST);
        assert_eq!(format!("{}", InjectionToken(-5)), "-5");
        assert_eq!(format!("{:?}", InjectionToken(-5)), "InjectionToken(-5)");
    }

    #[test]
    fn test_cursor_pointer() {
        let mut cursor = Cursor::start();
        let ptr = cursor.as_mut_ptr();
        unsafe { *ptr = 0x40 as *mut c_void };
        assert_eq!(cursor.0, 0x40);
    }
}
