//! Human and machine renderings of a conflict list.
//!
//! The text report groups conflicts as a tree:
//!
//! ```text
//! Breaks found in: <artifact containing the caller>
//!   \- Using transitive: <artifact defining the target>
//!      \- In class: <calling class>
//!         |  With path:
//!         |    *  <entry point>
//!         |    -> <calling class>
//!         |
//!         \- <reason>
//!            \- In <method> (line 12, 40)
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write};

use abi_checker::{Conflict, UNKNOWN_ARTIFACT_NAME};
use serde::Serialize;

#[derive(Serialize)]
struct ConflictsOutput<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    conflicts: &'a [Conflict],
}

pub fn render_json(conflicts: &[Conflict]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ConflictsOutput {
        kind: "conflicts",
        conflicts,
    })
}

pub fn render_text(conflicts: &[Conflict]) -> Result<String, fmt::Error> {
    let mut out = String::new();
    if conflicts.is_empty() {
        out.push_str("No ABI conflicts found.\n");
        return Ok(out);
    }

    let by_user = group_by(conflicts, |c| c.used_by().to_string());
    write_recommendations(&mut out, &by_user)?;

    for (artifact, conflicts) in &by_user {
        writeln!(out, "Breaks found in: {artifact}")?;
        let by_transitive = group_by(conflicts.iter().copied(), |c| c.exists_in_name().to_owned());
        for_each_marking_last(&by_transitive, |transitive, conflicts, last| {
            writeln!(out, "  {}- Using transitive: {transitive}", item(last))?;
            write_classes(&mut out, &format!("  {}", sub_items(last)), conflicts)
        })?;
        out.push_str("===========================\n\n");
    }
    Ok(out)
}

fn write_recommendations(
    out: &mut String,
    by_user: &BTreeMap<String, Vec<&Conflict>>,
) -> fmt::Result {
    out.push_str(
        "ABI incompatibilities were detected between the following libraries. \
         You should upgrade or downgrade one for each pair. Exact conflicts are detailed below.\n\n",
    );

    for (artifact, conflicts) in by_user {
        let transitives: BTreeSet<&str> = conflicts.iter().map(|c| c.exists_in_name()).collect();
        if transitives.contains(UNKNOWN_ARTIFACT_NAME) {
            writeln!(
                out,
                "\t{artifact} refers to unknown classes, so the library that broke its ABI could not be determined."
            )?;
        }

        let known: Vec<&str> = transitives
            .into_iter()
            .filter(|name| *name != UNKNOWN_ARTIFACT_NAME)
            .collect();
        match known.as_slice() {
            [] => out.push('\n'),
            [single] => writeln!(out, "\t{artifact} with {single}\n")?,
            many => {
                writeln!(out, "\t{artifact} with:")?;
                for name in many {
                    writeln!(out, "\t\t{name}")?;
                }
                out.push('\n');
            }
        }
    }
    Ok(())
}

fn write_classes(out: &mut String, indent: &str, conflicts: &[&Conflict]) -> fmt::Result {
    let by_class = group_by(conflicts.iter().copied(), |c| {
        c.dependency().from_class().to_string()
    });
    for_each_marking_last(&by_class, |class, conflicts, last| {
        writeln!(out, "{indent}  {}- In class: {class}", item(last))?;
        let indent = format!("{indent}  {}", sub_items(last));

        // Every conflict of one calling class shares its reachability path.
        if let Some(first) = conflicts.first() {
            let path: Vec<String> = first
                .dependency()
                .reachability_path()
                .iter()
                .map(ToString::to_string)
                .collect();
            writeln!(out, "{indent}  |  With path:")?;
            let separator = format!("\n{indent}  |    -> ");
            writeln!(out, "{indent}  |    *  {}", path.join(separator.as_str()))?;
        }

        let by_reason = group_by(conflicts.iter().copied(), Conflict::reason);
        for_each_marking_last(&by_reason, |reason, conflicts, last| {
            writeln!(out, "{indent}  |")?;
            writeln!(out, "{indent}  {}- {reason}", item(last))?;
            let indent = format!("{indent}  {}", sub_items(last));

            let by_method = group_by(conflicts.iter().copied(), |c| {
                c.dependency().from_method().descriptor().pretty()
            });
            for_each_marking_last(&by_method, |method, conflicts, last| {
                let lines: BTreeSet<u32> =
                    conflicts.iter().map(|c| c.dependency().from_line()).collect();
                let lines: Vec<String> = lines.iter().map(u32::to_string).collect();
                writeln!(
                    out,
                    "{indent}  {}- In {method} (line {})",
                    item(last),
                    lines.join(", ")
                )
            })
        })
    })
}

fn group_by<'a>(
    conflicts: impl IntoIterator<Item = &'a Conflict>,
    key: impl Fn(&Conflict) -> String,
) -> BTreeMap<String, Vec<&'a Conflict>> {
    let mut groups: BTreeMap<String, Vec<&Conflict>> = BTreeMap::new();
    for conflict in conflicts {
        groups.entry(key(conflict)).or_default().push(conflict);
    }
    groups
}

fn for_each_marking_last<V>(
    groups: &BTreeMap<String, V>,
    mut f: impl FnMut(&str, &V, bool) -> fmt::Result,
) -> fmt::Result {
    let len = groups.len();
    for (i, (key, value)) in groups.iter().enumerate() {
        f(key, value, i + 1 == len)?;
    }
    Ok(())
}

fn item(last: bool) -> char {
    if last {
        '\\'
    } else {
        '|'
    }
}

fn sub_items(last: bool) -> char {
    if last {
        ' '
    } else {
        '|'
    }
}
