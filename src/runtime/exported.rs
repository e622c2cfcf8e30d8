//! [`RuntimeApi`] backed by the runtime's own exported accessors.

use std::{
    ffi::{c_char, c_void, CStr, CString},
    slice,
};

use crate::{
    exports::ExportResolver,
    handle::{Cursor, NativeHandle},
    runtime::RuntimeApi,
    Error, Result,
};

type DomainGet = unsafe extern "C" fn() -> *mut c_void;
type DomainGetAssemblies = unsafe extern "C" fn(*mut c_void, *mut usize) -> *mut *mut c_void;
type AssemblyGetImage = unsafe extern "C" fn(*mut c_void) -> *mut c_void;
type ImageGetName = unsafe extern "C" fn(*mut c_void) -> *const c_char;
type ClassFromName =
    unsafe extern "C" fn(*mut c_void, *const c_char, *const c_char) -> *mut c_void;
type ClassIterate = unsafe extern "C" fn(*mut c_void, *mut *mut c_void) -> *mut c_void;
type ClassGetName = unsafe extern "C" fn(*mut c_void) -> *const c_char;
type ClassIsInflated = unsafe extern "C" fn(*mut c_void) -> bool;
type ClassGetFieldFromName = unsafe extern "C" fn(*mut c_void, *const c_char) -> *mut c_void;
type MethodGetName = unsafe extern "C" fn(*mut c_void) -> *const c_char;
type MethodGetParamCount = unsafe extern "C" fn(*mut c_void) -> u32;
type MethodGetParam = unsafe extern "C" fn(*mut c_void, u32) -> *mut c_void;
type MethodGetReturnType = unsafe extern "C" fn(*mut c_void) -> *mut c_void;
type MethodIsGeneric = unsafe extern "C" fn(*mut c_void) -> bool;
type MethodGetToken = unsafe extern "C" fn(*mut c_void) -> u32;
type TypeGetName = unsafe extern "C" fn(*mut c_void) -> *mut c_char;
type ResolveIcall = unsafe extern "C" fn(*const c_char) -> *mut c_void;
type Free = unsafe extern "C" fn(*mut c_void);

native_exports! {
    struct Accessors {
        domain_get: DomainGet = "il2cpp_domain_get",
        domain_get_assemblies: DomainGetAssemblies = "il2cpp_domain_get_assemblies",
        assembly_get_image: AssemblyGetImage = "il2cpp_assembly_get_image",
        image_get_name: ImageGetName = "il2cpp_image_get_name",
        class_from_name: ClassFromName = "il2cpp_class_from_name",
        class_get_methods: ClassIterate = "il2cpp_class_get_methods",
        class_get_nested_types: ClassIterate = "il2cpp_class_get_nested_types",
        class_get_name: ClassGetName = "il2cpp_class_get_name",
        class_is_inflated: ClassIsInflated = "il2cpp_class_is_inflated",
        class_get_field_from_name: ClassGetFieldFromName = "il2cpp_class_get_field_from_name",
        method_get_name: MethodGetName = "il2cpp_method_get_name",
        method_get_param_count: MethodGetParamCount = "il2cpp_method_get_param_count",
        method_get_param: MethodGetParam = "il2cpp_method_get_param",
        method_get_return_type: MethodGetReturnType = "il2cpp_method_get_return_type",
        method_is_generic: MethodIsGeneric = "il2cpp_method_is_generic",
        method_get_token: MethodGetToken = "il2cpp_method_get_token",
        type_get_name: TypeGetName = "il2cpp_type_get_name",
        resolve_icall: ResolveIcall = "il2cpp_resolve_icall",
    }
}

/// Resolves `logical` and binds it as `F`.
///
/// # Safety
/// The export must be a function whose signature matches `F`.
pub(crate) unsafe fn bind_export<F: Copy>(exports: &ExportResolver, logical: &str) -> Result<F> {
    exports
        .resolve(logical)?
        .to_fn::<F>()?
        .ok_or_else(|| Error::MissingMember {
            kind: "export",
            name: logical.to_string(),
        })
}

/// Copies a runtime-owned C string.
///
/// # Safety
/// `ptr` must be null or point at a NUL-terminated string.
unsafe fn c_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

/// The native runtime reached through its exported C API.
///
/// Every accessor is bound once at construction; construction fails if one of them is not
/// exported. Type names returned by the runtime are heap allocated and released through
/// `il2cpp_free` when the module exports it.
pub struct ExportedRuntime {
    accessors: Accessors,
    free: Option<Free>,
}

impl ExportedRuntime {
    /// Binds the runtime accessors through `exports`.
    ///
    /// # Errors
    /// Returns [`crate::Error::ExportNotFound`] for the first accessor that is not exported.
    ///
    /// # Safety
    /// The module behind `exports` must be a loaded native runtime whose exports have the
    /// standard C signatures; the bound functions are called directly.
    pub unsafe fn bind(exports: &ExportResolver) -> Result<ExportedRuntime> {
        let accessors = Accessors::bind(exports)?;
        let free = match exports.try_resolve("il2cpp_free") {
            Some(address) => address.to_fn::<Free>()?,
            None => None,
        };

        if free.is_none() {
            log::debug!("il2cpp_free is not exported; type names will not be released");
        }
        log::trace!("Bound {} runtime accessors", Accessors::COUNT);

        Ok(ExportedRuntime { accessors, free })
    }
}

impl RuntimeApi for ExportedRuntime {
    fn class_methods(&self, class: NativeHandle, cursor: &mut Cursor) -> NativeHandle {
        NativeHandle::from_ptr(unsafe {
            (self.accessors.class_get_methods)(class.as_ptr(), cursor.as_mut_ptr())
        })
    }

    fn class_nested_types(&self, class: NativeHandle, cursor: &mut Cursor) -> NativeHandle {
        NativeHandle::from_ptr(unsafe {
            (self.accessors.class_get_nested_types)(class.as_ptr(), cursor.as_mut_ptr())
        })
    }

    fn class_name(&self, class: NativeHandle) -> String {
        unsafe { c_string((self.accessors.class_get_name)(class.as_ptr())) }
    }

    fn class_is_inflated(&self, class: NativeHandle) -> bool {
        unsafe { (self.accessors.class_is_inflated)(class.as_ptr()) }
    }

    fn class_field(&self, class: NativeHandle, name: &str) -> NativeHandle {
        let Ok(name) = CString::new(name) else {
            return NativeHandle::NULL;
        };
        NativeHandle::from_ptr(unsafe {
            (self.accessors.class_get_field_from_name)(class.as_ptr(), name.as_ptr())
        })
    }

    fn class_from_name(&self, image: NativeHandle, namespace: &str, name: &str) -> NativeHandle {
        let (Ok(namespace), Ok(name)) = (CString::new(namespace), CString::new(name)) else {
            return NativeHandle::NULL;
        };
        NativeHandle::from_ptr(unsafe {
            (self.accessors.class_from_name)(image.as_ptr(), namespace.as_ptr(), name.as_ptr())
        })
    }

    fn method_name(&self, method: NativeHandle) -> String {
        unsafe { c_string((self.accessors.method_get_name)(method.as_ptr())) }
    }

    fn method_param_count(&self, method: NativeHandle) -> u32 {
        unsafe { (self.accessors.method_get_param_count)(method.as_ptr()) }
    }

    fn method_param_type(&self, method: NativeHandle, index: u32) -> NativeHandle {
        NativeHandle::from_ptr(unsafe { (self.accessors.method_get_param)(method.as_ptr(), index) })
    }

    fn method_return_type(&self, method: NativeHandle) -> NativeHandle {
        NativeHandle::from_ptr(unsafe { (self.accessors.method_get_return_type)(method.as_ptr()) })
    }

    fn method_is_generic(&self, method: NativeHandle) -> bool {
        unsafe { (self.accessors.method_is_generic)(method.as_ptr()) }
    }

    fn method_token(&self, method: NativeHandle) -> u32 {
        unsafe { (self.accessors.method_get_token)(method.as_ptr()) }
    }

    fn type_name(&self, ty: NativeHandle) -> String {
        if ty.is_null() {
            return String::new();
        }

        unsafe {
            let raw = (self.accessors.type_get_name)(ty.as_ptr());
            let name = c_string(raw);
            if let (Some(free), false) = (self.free, raw.is_null()) {
                free(raw.cast());
            }
            name
        }
    }

    fn images(&self) -> Vec<NativeHandle> {
        unsafe {
            let domain = (self.accessors.domain_get)();
            if domain.is_null() {
                log::error!("No native runtime domain found");
                return Vec::new();
            }

            let mut count = 0usize;
            let assemblies = (self.accessors.domain_get_assemblies)(domain, &mut count);
            if assemblies.is_null() || count == 0 {
                return Vec::new();
            }

            slice::from_raw_parts(assemblies, count)
                .iter()
                .map(|assembly| NativeHandle::from_ptr((self.accessors.assembly_get_image)(*assembly)))
                .filter(|image| !image.is_null())
                .collect()
        }
    }

    fn image_name(&self, image: NativeHandle) -> String {
        unsafe { c_string((self.accessors.image_get_name)(image.as_ptr())) }
    }

    fn resolve_icall(&self, signature: &str) -> NativeHandle {
        let Ok(signature) = CString::new(signature) else {
            return NativeHandle::NULL;
        };
        NativeHandle::from_ptr(unsafe { (self.accessors.resolve_icall)(signature.as_ptr()) })
    }
}
