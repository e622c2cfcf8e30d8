//! The resolution engine as one shareable service.
//!
//! [`ResolverContext`] owns every table the engine needs: the located runtime module with its
//! export resolver, the runtime accessors, the method matcher and type-name renderer, the
//! injected-class registry and the once-resolved class-initialization hook target. A context
//! can only be built from a module, so no export is ever resolved before the module is known.
//!
//! # Thread Safety
//!
//! [`ResolverContext`] is `Send + Sync` and meant to be shared through an `Arc`. Lookups do not
//! mutate state except for the lazily built image map and the class-initialization target,
//! both of which are initialized at most once.
//!
//! # Examples
//!
//! ```rust,no_run
//! use il2scope::{methods::MethodQuery, ResolverConfig, ResolverContext};
//!
//! let context = ResolverContext::attach(ResolverConfig::default())?;
//! if let Some(player) = context.class("Assembly-CSharp.dll", "", "Player") {
//!     let jump = context.find_method(
//!         &MethodQuery::new(player, "Jump").with_parameters(["System.Single"]),
//!     )?;
//!     println!("Player::Jump -> {:?}", jump.handle());
//! }
//! # Ok::<(), il2scope::Error>(())
//! ```

use std::sync::Arc;

use once_cell::sync::OnceCell;
use rustc_hash::FxHashMap;

use crate::{
    config::ResolverConfig,
    exports::{ExportNameTable, ExportResolver},
    handle::{InjectionToken, NativeHandle},
    injection::{InjectedClassRegistry, InjectedType},
    methods::{MethodMatcher, MethodQuery, MethodResolution},
    module::{LoadedModule, NativeModule},
    runtime::{nested_types, ExportedRuntime, RuntimeApi},
    standin::InternalCall,
    typename::{TypeNameRenderer, TypeShape},
    xref::{ClassInitLocator, HookTarget},
    Result,
};

/// Shared state and entry points of the resolution engine.
pub struct ResolverContext {
    config: ResolverConfig,
    exports: ExportResolver,
    api: Arc<dyn RuntimeApi>,
    matcher: MethodMatcher,
    renderer: TypeNameRenderer,
    registry: InjectedClassRegistry,
    class_init: HookTarget,
    class_init_locator: ClassInitLocator,
    images: OnceCell<FxHashMap<String, NativeHandle>>,
}

impl ResolverContext {
    /// Builds a context over an already located module and runtime API.
    pub fn new(
        module: Arc<dyn NativeModule>,
        api: Arc<dyn RuntimeApi>,
        config: ResolverConfig,
    ) -> ResolverContext {
        let exports = ExportResolver::new(module, Self::export_table(&config));
        Self::from_parts(exports, api, config)
    }

    /// Locates the runtime module in this process and binds the runtime API through its
    /// exports.
    ///
    /// # Errors
    /// Returns [`crate::Error::ModuleNotFound`] if no candidate module is loaded, or
    /// [`crate::Error::ExportNotFound`] if a runtime accessor is not exported.
    pub fn attach(config: ResolverConfig) -> Result<ResolverContext> {
        let module = LoadedModule::locate(&config.module_names)?;
        let exports = ExportResolver::new(Arc::new(module), Self::export_table(&config));

        // The exports belong to the runtime module mapped in this process
        let runtime = unsafe { ExportedRuntime::bind(&exports) }?;
        Ok(Self::from_parts(exports, Arc::new(runtime), config))
    }

    fn export_table(config: &ResolverConfig) -> ExportNameTable {
        if config.use_obfuscated_exports {
            ExportNameTable::builtin()
        } else {
            ExportNameTable::empty()
        }
    }

    fn from_parts(
        exports: ExportResolver,
        api: Arc<dyn RuntimeApi>,
        config: ResolverConfig,
    ) -> ResolverContext {
        ResolverContext {
            exports,
            matcher: MethodMatcher::new(api.clone(), config.ambiguous_policy),
            renderer: TypeNameRenderer::new(&config),
            registry: InjectedClassRegistry::new(),
            class_init: HookTarget::new("Class::Init"),
            class_init_locator: ClassInitLocator::default(),
            images: OnceCell::new(),
            api,
            config,
        }
    }

    /// Replaces the class-initialization heuristics.
    ///
    /// Has no effect once [`ResolverContext::find_class_init`] has been called.
    #[must_use]
    pub fn with_class_init_locator(mut self, locator: ClassInitLocator) -> Self {
        self.class_init_locator = locator;
        self
    }

    /// The runtime module
    #[must_use]
    pub fn module(&self) -> &dyn NativeModule {
        self.exports.module().as_ref()
    }

    /// The export resolver bound to the runtime module
    #[must_use]
    pub fn exports(&self) -> &ExportResolver {
        &self.exports
    }

    /// The runtime accessors
    #[must_use]
    pub fn api(&self) -> &dyn RuntimeApi {
        self.api.as_ref()
    }

    /// The configuration this context was built with
    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// The injected-class registry
    #[must_use]
    pub fn registry(&self) -> &InjectedClassRegistry {
        &self.registry
    }

    /// Resolves an export by logical name.
    ///
    /// # Errors
    /// Returns [`crate::Error::ExportNotFound`] if the symbol is not exported.
    pub fn resolve_export(&self, logical: &str) -> Result<NativeHandle> {
        self.exports.resolve(logical)
    }

    /// Resolves an export by logical name, `None` if it is not exported
    #[must_use]
    pub fn try_resolve_export(&self, logical: &str) -> Option<NativeHandle> {
        self.exports.try_resolve(logical)
    }

    /// Finds the method matching `query`.
    ///
    /// # Errors
    /// Returns [`crate::Error::AmbiguousMethod`] under the `Fatal` policy.
    pub fn find_method(&self, query: &MethodQuery) -> Result<MethodResolution> {
        self.matcher.find_method(query)
    }

    /// Finds a method of `class` by metadata token
    #[must_use]
    pub fn find_method_by_token(&self, class: NativeHandle, token: u32) -> MethodResolution {
        self.matcher.find_method_by_token(class, token)
    }

    /// Renders the runtime's name for a managed type
    #[must_use]
    pub fn render_type_name(&self, shape: &TypeShape) -> String {
        self.renderer.render(shape)
    }

    /// Renders the runtime's name, appending `&` when `by_ref` is set
    #[must_use]
    pub fn render_type_name_with_ref_marker(&self, shape: &TypeShape, by_ref: bool) -> String {
        self.renderer.render_with_ref_marker(shape, by_ref)
    }

    /// Assigns a synthetic token to an injected class
    pub fn register_injected_class(&self, class: NativeHandle) -> InjectionToken {
        self.registry.register(class)
    }

    /// Makes an injected class findable by name in its target images, or in every image of
    /// the domain.
    ///
    /// # Errors
    /// Returns [`crate::Error::DuplicateInjectedClass`] if a different class holds the name.
    pub fn add_injected_class_to_lookup(
        &self,
        ty: &InjectedType,
        class: NativeHandle,
    ) -> Result<usize> {
        let all_images: Vec<NativeHandle> = self.images().values().copied().collect();
        self.registry.add_to_lookup(ty, class, &all_images)
    }

    /// The injected class indexed under `(namespace, name, image)`
    #[must_use]
    pub fn lookup_injected_class(
        &self,
        namespace: &str,
        name: &str,
        image: NativeHandle,
    ) -> Option<NativeHandle> {
        self.registry.lookup_by_name(namespace, name, image)
    }

    /// The injected class that received `token`
    #[must_use]
    pub fn injected_class_for_token(&self, token: InjectionToken) -> Option<NativeHandle> {
        self.registry.class_for_token(token)
    }

    /// Address of the runtime's class-initialization routine.
    ///
    /// Resolved once; later calls return the cached outcome without scanning again.
    ///
    /// # Errors
    /// Returns [`crate::Error::ClassInitNotFound`] if no heuristic matched, and
    /// [`crate::Error::UnresolvedHook`] on every call after that.
    pub fn find_class_init(&self) -> Result<NativeHandle> {
        self.class_init.get_or_resolve(|| {
            self.class_init_locator
                .locate(&self.exports, self.config.scan_window)
        })
    }

    /// The image loaded under `name` (e.g. `Assembly-CSharp.dll`)
    #[must_use]
    pub fn image(&self, name: &str) -> Option<NativeHandle> {
        self.images().get(name).copied()
    }

    /// All images of the domain by name, collected on first use
    pub fn images(&self) -> &FxHashMap<String, NativeHandle> {
        self.images.get_or_init(|| {
            let api = self.api.as_ref();
            api.images()
                .into_iter()
                .map(|image| (api.image_name(image), image))
                .collect()
        })
    }

    /// Finds a class by assembly, namespace and name
    #[must_use]
    pub fn class(&self, assembly: &str, namespace: &str, name: &str) -> Option<NativeHandle> {
        let Some(image) = self.image(assembly) else {
            log::error!("Assembly {assembly} is not registered in il2cpp");
            return None;
        };

        self.api.class_from_name(image, namespace, name).non_null()
    }

    /// Finds a field of `class` by name
    #[must_use]
    pub fn field(&self, class: NativeHandle, name: &str) -> Option<NativeHandle> {
        if class.is_null() {
            return None;
        }

        let field = self.api.class_field(class, name).non_null();
        if field.is_none() {
            log::error!(
                "Field {} was not found on class {}",
                name,
                self.api.class_name(class)
            );
        }
        field
    }

    /// Finds a nested type of `class` by simple name.
    ///
    /// Inflated generic classes are not searched.
    #[must_use]
    pub fn nested_type(&self, class: NativeHandle, name: &str) -> Option<NativeHandle> {
        if class.is_null() {
            return None;
        }

        let api = self.api.as_ref();
        if api.class_is_inflated(class) {
            log::trace!("Original class was inflated, falling back to reflection");
            return None;
        }

        let nested = nested_types(api, class).find(|n| api.class_name(*n) == name);
        if nested.is_none() {
            log::error!(
                "Nested type {} on {} not found!",
                name,
                api.class_name(class)
            );
        }
        nested
    }

    /// Binds an internal call by signature; a missing call yields a stand-in that fails when
    /// invoked.
    ///
    /// # Errors
    /// Returns [`crate::Error::BindingSize`] if `F` is not pointer sized.
    ///
    /// # Safety
    /// `F` must match the native signature of the internal call.
    pub unsafe fn resolve_icall<F: Copy>(&self, signature: &str) -> Result<InternalCall<F>> {
        let address = self.api.resolve_icall(signature);
        if address.is_null() {
            log::debug!("ICall {signature} not resolved");
            return Ok(InternalCall::missing(signature));
        }

        InternalCall::bind(signature, address)
    }
}
