use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use abi_classpath::{ClassIndex, ClassLocation};
use abi_model::{ClassType, DeclaredClass, FieldReference, MethodReference, Reference};
use indexmap::IndexMap;

use crate::class_loader::ClassLoader;
use crate::error::Result;

/// The reachable part of a classpath, with the path that reached each class.
///
/// Parents and outbound edges are looked up by name in the [`ClassIndex`]
/// rather than linked directly, so cyclic hierarchies are representable.
#[derive(Debug)]
pub struct ClassGraph<'a> {
    loader: &'a ClassLoader,
    index: &'a ClassIndex,
    reachable: IndexMap<ClassType, Vec<ClassType>>,
}

impl<'a> ClassGraph<'a> {
    /// Every indexed class is reachable through a path containing only itself.
    pub fn create_all_reachable(loader: &'a ClassLoader, index: &'a ClassIndex) -> Self {
        let reachable = index
            .known_classes()
            .keys()
            .map(|class| (class.clone(), vec![class.clone()]))
            .collect();
        Self {
            loader,
            index,
            reachable,
        }
    }

    /// Breadth-first walk from `entry_points` over parents, class literals and
    /// the owners of every call and field access. Each class keeps the first
    /// path that reached it, which is a shortest one.
    pub fn create_with_entry_points<'e>(
        loader: &'a ClassLoader,
        index: &'a ClassIndex,
        entry_points: impl IntoIterator<Item = &'e ClassLocation>,
    ) -> Result<Self> {
        let mut queue: VecDeque<(&ClassLocation, Vec<ClassType>)> = entry_points
            .into_iter()
            .map(|location| (location, vec![location.class_type().clone()]))
            .collect();
        let mut reachable: IndexMap<ClassType, Vec<ClassType>> = IndexMap::new();

        while let Some((location, path)) = queue.pop_front() {
            let current = location.class_type();
            if reachable.contains_key(current) {
                continue;
            }
            reachable.insert(current.clone(), path.clone());

            let declared = loader.load(location)?;
            let methods = declared.methods().values();
            let outbound = declared
                .parents()
                .iter()
                .chain(declared.loaded_classes())
                .chain(methods.clone().flat_map(|m| m.method_calls().iter().map(|c| c.owner())))
                .chain(methods.flat_map(|m| m.field_accesses().iter().map(|c| c.owner())));

            for next in outbound {
                if reachable.contains_key(next) {
                    continue;
                }
                let Some(next_location) = index.location(next) else {
                    continue;
                };
                let mut next_path = Vec::with_capacity(path.len() + 1);
                next_path.extend_from_slice(&path);
                next_path.push(next.clone());
                queue.push_back((next_location, next_path));
            }
        }

        tracing::debug!(
            target = "abi.checker",
            reachable = reachable.len(),
            indexed = index.len(),
            "computed reachable classes"
        );
        Ok(Self {
            loader,
            index,
            reachable,
        })
    }

    pub fn reachable_classes(&self) -> impl Iterator<Item = &ClassType> + '_ {
        self.reachable.keys()
    }

    pub fn is_reachable(&self, class: &ClassType) -> bool {
        self.reachable.contains_key(class)
    }

    /// Classes traversed from an entry point up to and including `class`.
    /// Empty when `class` was never reached.
    pub fn reachability_path(&self, class: &ClassType) -> &[ClassType] {
        self.reachable.get(class).map(Vec::as_slice).unwrap_or_default()
    }

    /// Loads the canonical declaration of `class`, or `None` when no artifact
    /// on the classpath defines it.
    pub fn load_class(&self, class: &ClassType) -> Result<Option<Arc<DeclaredClass>>> {
        match self.index.location(class) {
            Some(location) => self.loader.load(location).map(Some),
            None => Ok(None),
        }
    }

    pub fn resolve_method_reference(
        &self,
        target: &DeclaredClass,
        method: &MethodReference,
    ) -> Result<Option<MethodReference>> {
        self.resolve_member(target, method, &|class: &DeclaredClass, wanted: &MethodReference| {
            class
                .method(wanted.descriptor())
                .map(|declared| declared.reference().clone())
        })
    }

    pub fn resolve_field_reference(
        &self,
        target: &DeclaredClass,
        field: &FieldReference,
    ) -> Result<Option<FieldReference>> {
        self.resolve_member(target, field, &|class: &DeclaredClass, wanted: &FieldReference| {
            class.field(wanted.descriptor()).cloned()
        })
    }

    fn resolve_member<T, F>(&self, target: &DeclaredClass, wanted: &T, lookup: &F) -> Result<Option<T>>
    where
        T: Reference,
        F: Fn(&DeclaredClass, &T) -> Option<T>,
    {
        let mut visited = HashSet::new();
        self.resolve_in(target, wanted, lookup, &mut visited)
    }

    fn resolve_in<T, F>(
        &self,
        class: &DeclaredClass,
        wanted: &T,
        lookup: &F,
        visited: &mut HashSet<ClassType>,
    ) -> Result<Option<T>>
    where
        T: Reference,
        F: Fn(&DeclaredClass, &T) -> Option<T>,
    {
        if !visited.insert(class.name().clone()) {
            tracing::debug!(
                target = "abi.checker",
                class = %class.name(),
                "cyclic inheritance while resolving member"
            );
            return Ok(None);
        }

        // A same-descriptor member decides the outcome even when its
        // staticness does not match; parents are not consulted.
        if let Some(member) = lookup(class, wanted) {
            return Ok((member.is_static() == wanted.is_static()).then_some(member));
        }

        for parent in class.parents() {
            // An unloadable parent surfaces as its own class-not-found conflict.
            let Some(declared) = self.load_class(parent)? else {
                continue;
            };
            if let Some(found) = self.resolve_in(&declared, wanted, lookup, visited)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}
