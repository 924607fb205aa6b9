//! Library half of the `abi-check` binary: classpath assembly and report
//! rendering.

pub mod report;

use abi_checker::{ClassLoader, Conflict, ConflictChecker, ConflictCheckerConfiguration};
use abi_classfile::ClassDecoder;
use abi_classpath::{
    Artifact, ArtifactLoader, ClassLocation, JdkInstallation, JdkModuleLoader,
    DEFAULT_RUNTIME_VERSION,
};
use abi_config::{AbiCheckConfig, ClasspathEntry};
use abi_model::ArtifactName;
use anyhow::{Context, Result};

/// Everything the checker needs, resolved from an [`AbiCheckConfig`].
#[derive(Debug)]
pub struct CheckInput {
    pub configuration: ConflictCheckerConfiguration,
    /// JDK modules, then the entry-point artifacts, then the runtime entries.
    pub classpath: Vec<Artifact>,
    pub entry_points: Vec<ClassLocation>,
    pub runtime_version: u32,
}

impl CheckInput {
    pub fn assemble(config: &AbiCheckConfig) -> Result<Self> {
        let mut configuration = config.checker.clone();
        let mut classpath = Vec::new();

        let jdk = if config.classpath.include_jdk {
            let installation = JdkInstallation::discover(config.classpath.jdk_home.as_deref())
                .context("failed to locate a JDK (set `classpath.jdk_home` or `include_jdk = false`)")?;
            Some(JdkModuleLoader::new(installation))
        } else {
            None
        };

        let runtime_version = match (config.classpath.release, &jdk) {
            (Some(release), _) => release,
            (None, Some(jdk)) => jdk
                .installation()
                .java_version()?
                .unwrap_or(DEFAULT_RUNTIME_VERSION),
            (None, None) => DEFAULT_RUNTIME_VERSION,
        };

        if let Some(jdk) = &jdk {
            let modules = jdk.artifacts().with_context(|| {
                format!(
                    "failed to read JDK modules from {}",
                    jdk.installation().jmods_dir().display()
                )
            })?;
            for module in modules {
                configuration
                    .ignored_artifact_prefixes
                    .insert(module.name().to_string());
            }
            classpath.extend(modules.iter().cloned());
        }

        let loader = ArtifactLoader::new(runtime_version);
        let mut entry_points = Vec::new();
        for entry in &config.classpath.entry_points {
            let artifact = load_entry(&loader, entry)?;
            configuration
                .ignored_artifact_prefixes
                .insert(entry.name.clone());
            entry_points.extend(artifact.classes().values().cloned());
            classpath.push(artifact);
        }
        for entry in &config.classpath.entries {
            classpath.push(load_entry(&loader, entry)?);
        }

        tracing::debug!(
            target = "abi.cli",
            artifacts = classpath.len(),
            entry_points = entry_points.len(),
            runtime_version,
            "assembled classpath"
        );
        Ok(Self {
            configuration,
            classpath,
            entry_points,
            runtime_version,
        })
    }

    pub fn check(&self, loader: &ClassLoader) -> Result<Vec<Conflict>> {
        let conflicts = ConflictChecker::check_with_entry_points(
            &self.configuration,
            loader,
            &self.classpath,
            &self.entry_points,
        )?;
        Ok(conflicts)
    }
}

fn load_entry(loader: &ArtifactLoader, entry: &ClasspathEntry) -> Result<Artifact> {
    loader
        .load(ArtifactName::new(entry.name.as_str()), &entry.path)
        .with_context(|| format!("failed to load classpath entry `{}`", entry.name))
}

/// Assembles the classpath described by `config` and checks it.
pub fn check_config(config: &AbiCheckConfig) -> Result<Vec<Conflict>> {
    let input = CheckInput::assemble(config)?;
    let loader = ClassLoader::new(ClassDecoder::default(), config.cache.max_entries);
    input.check(&loader)
}
