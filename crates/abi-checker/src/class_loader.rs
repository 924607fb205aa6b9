use std::num::NonZeroUsize;
use std::sync::Arc;

use abi_classfile::ClassDecoder;
use abi_classpath::ClassLocation;
use abi_model::DeclaredClass;
use lru::LruCache;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::error::{CheckError, LoadError, Result};

/// Default bound on the number of decoded classes kept in memory.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

type Slot = Arc<OnceCell<Arc<DeclaredClass>>>;

/// Decodes class files on demand and caches the result per location.
///
/// The loader is meant to be shared (by reference or behind an `Arc`) between
/// checker runs. Concurrent loads of the same location decode it once; every
/// caller observes the same `Arc<DeclaredClass>` while the entry stays cached.
pub struct ClassLoader {
    decoder: ClassDecoder,
    cache: Mutex<LruCache<ClassLocation, Slot>>,
}

impl Default for ClassLoader {
    fn default() -> Self {
        Self::new(ClassDecoder::default(), DEFAULT_MAX_ENTRIES)
    }
}

impl std::fmt::Debug for ClassLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cache = self.cache.lock();
        f.debug_struct("ClassLoader")
            .field("cached", &cache.len())
            .field("capacity", &cache.cap())
            .finish()
    }
}

impl ClassLoader {
    /// `max_entries` of zero is treated as one.
    pub fn new(decoder: ClassDecoder, max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            decoder,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self::new(ClassDecoder::default(), max_entries)
    }

    pub fn decoder(&self) -> &ClassDecoder {
        &self.decoder
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn load(&self, location: &ClassLocation) -> Result<Arc<DeclaredClass>> {
        let slot = {
            let mut cache = self.cache.lock();
            match cache.get(location) {
                Some(slot) => slot.clone(),
                None => {
                    let slot = Slot::default();
                    cache.put(location.clone(), slot.clone());
                    slot
                }
            }
        };

        slot.get_or_try_init(|| {
            tracing::trace!(target = "abi.checker", location = %location, "decoding class");
            self.decode(location)
                .map(Arc::new)
                .map_err(|source| CheckError::Decode {
                    location: location.to_string(),
                    source,
                })
        })
        .cloned()
    }

    fn decode(&self, location: &ClassLocation) -> std::result::Result<DeclaredClass, LoadError> {
        let bytes = location.read_bytes()?;
        Ok(self.decoder.decode(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use abi_model::ClassType;
    use abi_test_utils::{write_class_dir, ClassFileBuilder};

    use super::*;

    fn location(root: &Path, internal: &str) -> ClassLocation {
        let class = ClassType::from_class_name(internal).unwrap();
        ClassLocation::Directory {
            relative: class.class_file_path().into_boxed_str(),
            class,
            root: Arc::from(root),
        }
    }

    #[test]
    fn decodes_each_location_once() {
        let dir = tempfile::tempdir().unwrap();
        write_class_dir(
            dir.path(),
            &[("com/example/A", ClassFileBuilder::new("com/example/A").build())],
        )
        .unwrap();

        let loader = ClassLoader::default();
        let location = location(dir.path(), "com/example/A");
        let first = loader.load(&location).unwrap();
        let second = loader.load(&location).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.name().class_name(), "com.example.A");
        assert_eq!(loader.cached_len(), 1);
    }

    #[test]
    fn concurrent_loads_share_one_declaration() {
        let dir = tempfile::tempdir().unwrap();
        write_class_dir(
            dir.path(),
            &[("com/example/A", ClassFileBuilder::new("com/example/A").build())],
        )
        .unwrap();

        let loader = ClassLoader::default();
        let location = location(dir.path(), "com/example/A");
        let loaded: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| loader.load(&location).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(loaded.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn evicts_least_recently_used() {
        let dir = tempfile::tempdir().unwrap();
        write_class_dir(
            dir.path(),
            &[
                ("com/example/A", ClassFileBuilder::new("com/example/A").build()),
                ("com/example/B", ClassFileBuilder::new("com/example/B").build()),
            ],
        )
        .unwrap();

        let loader = ClassLoader::with_capacity(1);
        let a = location(dir.path(), "com/example/A");
        let first = loader.load(&a).unwrap();
        loader.load(&location(dir.path(), "com/example/B")).unwrap();
        assert_eq!(loader.cached_len(), 1);

        let reloaded = loader.load(&a).unwrap();
        assert!(!Arc::ptr_eq(&first, &reloaded));
        assert_eq!(first, reloaded);
    }

    #[test]
    fn failures_carry_the_location() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("com/example")).unwrap();
        std::fs::write(dir.path().join("com/example/Bad.class"), b"not a class").unwrap();

        let loader = ClassLoader::default();
        let err = loader
            .load(&location(dir.path(), "com/example/Bad"))
            .unwrap_err();
        match err {
            CheckError::Decode { location, source } => {
                assert!(location.ends_with("Bad.class"), "{location}");
                assert!(matches!(source, LoadError::Decode(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
