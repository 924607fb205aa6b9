use abi_classpath::{Artifact, ClassIndex, ClassLocation};
use abi_model::{ArtifactName, CallSite, ClassType, DeclaredMethod, MemberReference, Reference};

use crate::class_loader::ClassLoader;
use crate::config::ConflictCheckerConfiguration;
use crate::conflict::{Conflict, ConflictCategory, Dependency};
use crate::error::{CheckError, Result};
use crate::exceptions;
use crate::graph::ClassGraph;

/// Finds references in reachable classes that do not link against the
/// classpath.
///
/// The classpath order matters: when several artifacts define the same class,
/// the first one is the one the runtime would load.
pub struct ConflictChecker<'a> {
    configuration: &'a ConflictCheckerConfiguration,
    index: &'a ClassIndex,
    graph: ClassGraph<'a>,
}

impl<'a> ConflictChecker<'a> {
    /// Checks every class reachable from `entry_points` (or every class, with
    /// `check_completely`) and returns the conflicts in classpath order.
    pub fn check_with_entry_points<'e>(
        configuration: &ConflictCheckerConfiguration,
        loader: &ClassLoader,
        artifacts: &[Artifact],
        entry_points: impl IntoIterator<Item = &'e ClassLocation>,
    ) -> Result<Vec<Conflict>> {
        let index = ClassIndex::from_artifacts(artifacts);
        let graph = if configuration.check_completely {
            ClassGraph::create_all_reachable(loader, &index)
        } else {
            ClassGraph::create_with_entry_points(loader, &index, entry_points)?
        };

        ConflictChecker {
            configuration,
            index: &index,
            graph,
        }
        .check()
    }

    fn check(&self) -> Result<Vec<Conflict>> {
        let mut conflicts = Vec::new();
        let mut checked = 0usize;

        for class in self.graph.reachable_classes() {
            if self.configuration.should_ignore_class(class) {
                continue;
            }

            let owning_artifact = self
                .index
                .artifact_of(class)
                .ok_or_else(|| CheckError::InconsistentIndex(class.clone()))?;
            if self.configuration.should_ignore_artifact(owning_artifact) {
                continue;
            }

            let declared = self
                .graph
                .load_class(class)?
                .ok_or_else(|| CheckError::InconsistentIndex(class.clone()))?;
            let path = self.graph.reachability_path(class);

            for method in declared.methods().values() {
                self.check_method_calls(owning_artifact, method, path, &mut conflicts)?;
                self.check_field_accesses(owning_artifact, method, path, &mut conflicts)?;
            }
            checked += 1;
        }

        tracing::debug!(
            target = "abi.checker",
            checked,
            conflicts = conflicts.len(),
            "finished checking classes"
        );
        Ok(conflicts)
    }

    fn check_method_calls(
        &self,
        used_by: &ArtifactName,
        method: &DeclaredMethod,
        path: &[ClassType],
        conflicts: &mut Vec<Conflict>,
    ) -> Result<()> {
        for call in method.method_calls() {
            let owner = call.owner();
            if self.configuration.should_ignore_class(owner) {
                continue;
            }

            let category = match self.graph.load_class(owner)? {
                None if !call.catches(exceptions::is_class_loading_failure) => {
                    ConflictCategory::ClassNotFound
                }
                Some(target)
                    if self
                        .graph
                        .resolve_method_reference(&target, call.reference())?
                        .is_none()
                        && !call.catches(exceptions::is_method_not_found) =>
                {
                    ConflictCategory::MethodSignatureNotFound
                }
                _ => continue,
            };
            conflicts.push(self.conflict(category, used_by, method, path, call));
        }
        Ok(())
    }

    fn check_field_accesses(
        &self,
        used_by: &ArtifactName,
        method: &DeclaredMethod,
        path: &[ClassType],
        conflicts: &mut Vec<Conflict>,
    ) -> Result<()> {
        for access in method.field_accesses() {
            let owner = access.owner();
            if self.configuration.should_ignore_class(owner) {
                continue;
            }

            let category = match self.graph.load_class(owner)? {
                None if !access.catches(exceptions::is_class_loading_failure) => {
                    ConflictCategory::ClassNotFound
                }
                Some(target)
                    if self
                        .graph
                        .resolve_field_reference(&target, access.reference())?
                        .is_none()
                        && !access.catches(exceptions::is_field_not_found) =>
                {
                    ConflictCategory::FieldNotFound
                }
                _ => continue,
            };
            conflicts.push(self.conflict(category, used_by, method, path, access));
        }
        Ok(())
    }

    fn conflict<T>(
        &self,
        category: ConflictCategory,
        used_by: &ArtifactName,
        method: &DeclaredMethod,
        path: &[ClassType],
        site: &CallSite<T>,
    ) -> Conflict
    where
        T: Reference + Clone + Into<MemberReference>,
    {
        tracing::trace!(
            target = "abi.checker",
            category = %category,
            from = %method.reference().pretty(),
            line = site.line_number(),
            "conflict"
        );
        Conflict::new(
            category,
            Dependency::new(
                path.to_vec(),
                method.reference().clone(),
                site.line_number(),
                site.reference().clone(),
            ),
            used_by.clone(),
            self.index.artifact_of(site.owner()).cloned(),
        )
    }
}
