//! Version selection for multi-release jars.
//!
//! Entries under `META-INF/versions/<n>/` target Java `n`; everything else
//! targets version 0. Versions are layered in ascending order up to the
//! running version, so the highest qualifying entry for each class wins.

use std::collections::BTreeMap;

use abi_model::ClassType;
use indexmap::IndexMap;

use crate::error::Result;

const VERSIONS_PREFIX: &str = "META-INF/versions/";

/// Splits an archive entry into its target version and the class-file path
/// it stands for. Returns `None` for entries that are not class declarations.
pub(crate) fn classify_entry(name: &str) -> Option<(u32, &str)> {
    if !name.ends_with(".class") {
        return None;
    }

    let (version, path) = match name.strip_prefix(VERSIONS_PREFIX) {
        Some(rest) => {
            let (version, path) = rest.split_once('/')?;
            (version.parse::<u32>().ok()?, path)
        }
        None => (0, name),
    };

    if is_pseudo_class(path) {
        return None;
    }
    Some((version, path))
}

/// `module-info` and `package-info` carry no class declaration.
pub(crate) fn is_pseudo_class(path: &str) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    file_name == "module-info.class" || file_name == "package-info.class"
}

/// Picks, for every class, the entry to load when running on
/// `runtime_version`. The result maps each class to its entry name.
pub fn select_entries<'a>(
    entries: impl IntoIterator<Item = &'a str>,
    runtime_version: u32,
) -> Result<IndexMap<ClassType, &'a str>> {
    let mut by_version: BTreeMap<u32, Vec<(ClassType, &'a str)>> = BTreeMap::new();
    for entry in entries {
        let Some((version, path)) = classify_entry(entry) else {
            continue;
        };
        let class = ClassType::from_class_filename(path)?;
        by_version.entry(version).or_default().push((class, entry));
    }

    let mut selected = IndexMap::new();
    for (version, classes) in by_version {
        if version > runtime_version {
            break;
        }
        for (class, entry) in classes {
            selected.insert(class, entry);
        }
    }
    selected.sort_keys();
    Ok(selected)
}

/// Parses a `java.version`-style string into its feature release:
/// `1.8.0_40` is 8, `17.0.2` is 17, `21-ea` is 21.
pub fn parse_java_version(raw: &str) -> Option<u32> {
    let raw = raw.trim().trim_matches('"').replace("-ea", "");
    let mut parts = raw.split(|c: char| c == '.' || c == '_' || c == '+' || c == '-');
    let first = parts.next()?;
    let feature = if first == "1" { parts.next()? } else { first };
    feature.parse().ok()
}
