/// Declares a struct of native runtime accessors bound from the module's exports.
///
/// Every field is a function-pointer type paired with the logical export name it is bound
/// from. The generated `bind` resolves all of them and fails on the first missing export.
///
/// ```rust, ignore
/// native_exports! {
///     struct Accessors {
///         domain_get: DomainGet = "il2cpp_domain_get",
///         class_get_name: ClassGetName = "il2cpp_class_get_name",
///     }
/// }
///
/// let accessors = Accessors::bind(&exports)?;
/// ```
macro_rules! native_exports {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $field:ident : $ty:ty = $logical:literal ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $field: $ty, )*
        }

        impl $name {
            /// Number of accessors in the table
            const COUNT: usize = [$( $logical ),*].len();

            /// Resolves and binds every accessor of the table
            fn bind(exports: &crate::exports::ExportResolver) -> crate::Result<Self> {
                Ok(Self {
                    $( $field: unsafe {
                        crate::runtime::exported::bind_export::<$ty>(exports, $logical)?
                    }, )*
                })
            }
        }
    };
}
