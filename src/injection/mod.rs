//! Identity and name lookup for classes injected into the native runtime.
//!
//! Classes created at runtime have no metadata of their own, yet the runtime identifies classes
//! by metadata token and finds them by `(namespace, name, image)`. The [`InjectedClassRegistry`]
//! hands out synthetic tokens and keeps the name index the lookup hooks consult.
//!
//! # Tokens
//!
//! Real metadata tokens are non-negative. Injected classes count downwards from `-2`, so the
//! first registration yields `-2`, the next `-3`, and so on. Tokens are never reused.
//!
//! # Name Index
//!
//! A name lookup only knows `(namespace, name, image)`, so an injected class is indexed once per
//! image it should be visible in: every image of the domain, unless the type names its target
//! images. A key keeps its first class; adding a different class under an existing key fails
//! unless done through [`InjectedClassRegistry::replace_in_lookup`].
//!
//! # Thread Safety
//!
//! The registry is lock-free: the token counter is atomic, tokens live in a `SkipMap` and the
//! name index in a `DashMap`. Registration may happen from any thread.
//!
//! # Examples
//!
//! ```rust
//! use il2scope::handle::{InjectionToken, NativeHandle};
//! use il2scope::injection::{InjectedClassRegistry, InjectedType};
//!
//! let registry = InjectedClassRegistry::new();
//! let class = NativeHandle::new(0x7000_1000);
//! let image = NativeHandle::new(0x7000_0000);
//!
//! assert_eq!(registry.register(class), InjectionToken(-2));
//!
//! let ty = InjectedType::new("Mods", "Spawner");
//! registry.add_to_lookup(&ty, class, &[image])?;
//! assert_eq!(registry.lookup_by_name("Mods", "Spawner", image), Some(class));
//! # Ok::<(), il2scope::Error>(())
//! ```

use std::sync::atomic::{AtomicI64, Ordering};

use crossbeam_skiplist::SkipMap;
use dashmap::{mapref::entry::Entry, DashMap};

use crate::{
    handle::{InjectionToken, NativeHandle},
    Error::DuplicateInjectedClass,
    Result,
};

/// Key of the injected-class name index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassNameKey {
    /// Namespace, empty for the global namespace
    pub namespace: String,
    /// Simple class name
    pub name: String,
    /// Image the class is visible in
    pub image: NativeHandle,
}

impl ClassNameKey {
    /// Creates a key
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, image: NativeHandle) -> Self {
        ClassNameKey {
            namespace: namespace.into(),
            name: name.into(),
            image,
        }
    }
}

/// A managed type being injected, as far as name lookup is concerned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedType {
    /// Namespace, empty for the global namespace
    pub namespace: String,
    /// Simple class name
    pub name: String,
    /// Images the class should be visible in; `None` for every image
    pub target_images: Option<Vec<NativeHandle>>,
}

impl InjectedType {
    /// A type visible in every image
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        InjectedType {
            namespace: namespace.into(),
            name: name.into(),
            target_images: None,
        }
    }

    /// Restricts the type to the given images
    #[must_use]
    pub fn with_target_images(mut self, images: Vec<NativeHandle>) -> Self {
        self.target_images = Some(images);
        self
    }

    fn images<'a>(&'a self, all_images: &'a [NativeHandle]) -> &'a [NativeHandle] {
        self.target_images.as_deref().unwrap_or(all_images)
    }
}

/// Tokens and name index of injected classes.
pub struct InjectedClassRegistry {
    next_token: AtomicI64,
    classes: SkipMap<i64, NativeHandle>,
    names: DashMap<ClassNameKey, NativeHandle>,
}

impl Default for InjectedClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InjectedClassRegistry {
    /// Creates an empty registry
    #[must_use]
    pub fn new() -> Self {
        InjectedClassRegistry {
            next_token: AtomicI64::new(InjectionToken::FIRST.value()),
            classes: SkipMap::new(),
            names: DashMap::new(),
        }
    }

    /// Assigns the next token to `class`
    pub fn register(&self, class: NativeHandle) -> InjectionToken {
        let token = self.next_token.fetch_sub(1, Ordering::SeqCst);
        self.classes.insert(token, class);
        log::trace!("Injected class {class} got token {token}");
        InjectionToken(token)
    }

    /// Indexes `class` under the name of `ty` for each of its images.
    ///
    /// `all_images` is used when `ty` has no target images. Returns the number of new keys;
    /// adding the same class again is a no-op.
    ///
    /// # Errors
    /// Returns [`crate::Error::DuplicateInjectedClass`] if a different class already holds one
    /// of the keys. Keys for images processed before the conflicting one stay indexed.
    pub fn add_to_lookup(
        &self,
        ty: &InjectedType,
        class: NativeHandle,
        all_images: &[NativeHandle],
    ) -> Result<usize> {
        let mut added = 0;

        for image in ty.images(all_images) {
            match self
                .names
                .entry(ClassNameKey::new(&ty.namespace, &ty.name, *image))
            {
                Entry::Occupied(entry) => {
                    let existing = *entry.get();
                    if existing != class {
                        log::error!(
                            "Injected class {}.{} is already registered for image {} as {}",
                            ty.namespace,
                            ty.name,
                            image,
                            existing
                        );
                        return Err(DuplicateInjectedClass {
                            namespace: ty.namespace.clone(),
                            name: ty.name.clone(),
                            image: *image,
                            existing,
                        });
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(class);
                    added += 1;
                }
            }
        }

        Ok(added)
    }

    /// Indexes `class` under the name of `ty`, replacing whatever the keys held before.
    ///
    /// Returns the number of keys written.
    pub fn replace_in_lookup(
        &self,
        ty: &InjectedType,
        class: NativeHandle,
        all_images: &[NativeHandle],
    ) -> usize {
        let images = ty.images(all_images);
        for image in images {
            let key = ClassNameKey::new(&ty.namespace, &ty.name, *image);
            if let Some(previous) = self.names.insert(key, class) {
                if previous != class {
                    log::debug!(
                        "Replaced injected class {}.{} for image {}: {} -> {}",
                        ty.namespace,
                        ty.name,
                        image,
                        previous,
                        class
                    );
                }
            }
        }
        images.len()
    }

    /// The injected class indexed under `(namespace, name, image)`
    #[must_use]
    pub fn lookup_by_name(
        &self,
        namespace: &str,
        name: &str,
        image: NativeHandle,
    ) -> Option<NativeHandle> {
        self.names
            .get(&ClassNameKey::new(namespace, name, image))
            .map(|entry| *entry.value())
    }

    /// The injected class that received `token`
    #[must_use]
    pub fn class_for_token(&self, token: InjectionToken) -> Option<NativeHandle> {
        self.classes.get(&token.value()).map(|entry| *entry.value())
    }

    /// Number of registered classes
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if no class has been registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Number of keys in the name index
    #[must_use]
    pub fn name_count(&self) -> usize {
        self.names.len()
    }

    /// All `(token, class)` pairs in registration order
    #[must_use]
    pub fn tokens(&self) -> Vec<(InjectionToken, NativeHandle)> {
        self.classes
            .iter()
            .rev()
            .map(|entry| (InjectionToken(*entry.key()), *entry.value()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::collections::HashSet;

    const IMAGE_A: NativeHandle = NativeHandle(0xA000);
    const IMAGE_B: NativeHandle = NativeHandle(0xB000);
    const IMAGE_C: NativeHandle = NativeHandle(0xC000);

    #[test]
    fn test_tokens_count_down() {
        let registry = InjectedClassRegistry::new();
        assert!(registry.is_empty());

        assert_eq!(registry.register(NativeHandle(1)), InjectionToken(-2));
        assert_eq!(registry.register(NativeHandle(2)), InjectionToken(-3));
        assert_eq!(registry.register(NativeHandle(3)), InjectionToken(-4));

        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.class_for_token(InjectionToken(-3)),
            Some(NativeHandle(2))
        );
        assert_eq!(registry.class_for_token(InjectionToken(-1)), None);
        assert_eq!(
            registry.tokens(),
            vec![
                (InjectionToken(-2), NativeHandle(1)),
                (InjectionToken(-3), NativeHandle(2)),
                (InjectionToken(-4), NativeHandle(3)),
            ]
        );
    }

    #[test]
    fn test_concurrent_register() {
        let registry = InjectedClassRegistry::new();

        let tokens: Vec<InjectionToken> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|t| {
                    let registry = &registry;
                    scope.spawn(move || {
                        (0..100)
                            .map(|i| registry.register(NativeHandle(t * 1000 + i + 1)))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        let unique: HashSet<i64> = tokens.iter().map(InjectionToken::value).collect();
        assert_eq!(unique.len(), 800);
        assert_eq!(unique.iter().max(), Some(&-2));
        assert_eq!(unique.iter().min(), Some(&-801));
        assert_eq!(registry.len(), 800);
    }

    #[test]
    fn test_lookup_all_images() {
        let registry = InjectedClassRegistry::new();
        let ty = InjectedType::new("Mods", "Spawner");
        let class = NativeHandle(0x5000);

        let added = registry
            .add_to_lookup(&ty, class, &[IMAGE_A, IMAGE_B])
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(registry.lookup_by_name("Mods", "Spawner", IMAGE_A), Some(class));
        assert_eq!(registry.lookup_by_name("Mods", "Spawner", IMAGE_B), Some(class));
        assert_eq!(registry.lookup_by_name("Mods", "Spawner", IMAGE_C), None);
        assert_eq!(registry.lookup_by_name("", "Spawner", IMAGE_A), None);

        // Same class again
        assert_eq!(registry.add_to_lookup(&ty, class, &[IMAGE_A, IMAGE_B]).unwrap(), 0);
        assert_eq!(registry.name_count(), 2);
    }

    #[test]
    fn test_lookup_target_images() {
        let registry = InjectedClassRegistry::new();
        let ty = InjectedType::new("", "Global").with_target_images(vec![IMAGE_C]);
        let class = NativeHandle(0x6000);

        assert_eq!(
            registry
                .add_to_lookup(&ty, class, &[IMAGE_A, IMAGE_B])
                .unwrap(),
            1
        );
        assert_eq!(registry.lookup_by_name("", "Global", IMAGE_C), Some(class));
        assert_eq!(registry.lookup_by_name("", "Global", IMAGE_A), None);
    }

    #[test]
    fn test_duplicate_and_replace() {
        let registry = InjectedClassRegistry::new();
        let ty = InjectedType::new("Mods", "Spawner");

        registry
            .add_to_lookup(&ty, NativeHandle(0x1), &[IMAGE_A])
            .unwrap();

        match registry.add_to_lookup(&ty, NativeHandle(0x2), &[IMAGE_A]) {
            Err(Error::DuplicateInjectedClass {
                namespace,
                name,
                image,
                existing,
            }) => {
                assert_eq!(namespace, "Mods");
                assert_eq!(name, "Spawner");
                assert_eq!(image, IMAGE_A);
                assert_eq!(existing, NativeHandle(0x1));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            registry.lookup_by_name("Mods", "Spawner", IMAGE_A),
            Some(NativeHandle(0x1))
        );

        assert_eq!(registry.replace_in_lookup(&ty, NativeHandle(0x2), &[IMAGE_A, IMAGE_B]), 2);
        assert_eq!(
            registry.lookup_by_name("Mods", "Spawner", IMAGE_A),
            Some(NativeHandle(0x2))
        );
        assert_eq!(
            registry.lookup_by_name("Mods", "Spawner", IMAGE_B),
            Some(NativeHandle(0x2))
        );
    }
}
