use std::collections::BTreeSet;
use std::path::Path;

use abi_checker::{
    CheckError, ClassLoader, Conflict, ConflictCategory, ConflictChecker,
    ConflictCheckerConfiguration,
};
use abi_classpath::{Artifact, ArtifactLoader};
use abi_model::{ArtifactName, ClassType};
use abi_test_utils::{write_class_dir, ClassFileBuilder, CodeBuilder, ACC_PUBLIC, ACC_STATIC};
use tempfile::TempDir;

const PUBLIC_STATIC: u16 = ACC_PUBLIC | ACC_STATIC;

fn class(name: &str) -> ClassType {
    ClassType::from_class_name(name).unwrap()
}

fn config() -> ConflictCheckerConfiguration {
    ConflictCheckerConfiguration {
        ignored_class_prefixes: BTreeSet::from(["java.".to_owned()]),
        ..Default::default()
    }
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn artifact(&self, name: &str, classes: &[(&str, Vec<u8>)]) -> Artifact {
        let root = self.dir.path().join(name);
        std::fs::create_dir_all(&root).unwrap();
        write_class_dir(&root, classes).unwrap();
        ArtifactLoader::default()
            .load(ArtifactName::new(name), &root)
            .unwrap()
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }
}

fn check(
    config: &ConflictCheckerConfiguration,
    classpath: &[Artifact],
    entry: &Artifact,
) -> Vec<Conflict> {
    let loader = ClassLoader::default();
    ConflictChecker::check_with_entry_points(config, &loader, classpath, entry.classes().values())
        .unwrap()
}

fn main_calling(code: CodeBuilder) -> Vec<u8> {
    ClassFileBuilder::new("com/app/Main")
        .method(PUBLIC_STATIC, "main", "()V", code.return_void())
        .build()
}

#[test]
fn missing_class_is_reported_per_call_site() {
    let ws = Workspace::new();
    let app = ws.artifact(
        "app",
        &[(
            "com/app/Main",
            main_calling(
                CodeBuilder::new()
                    .line(10)
                    .invoke_static("com/lib/Helper", "help", "()V")
                    .line(11)
                    .invoke_static("com/lib/Helper", "help", "()V")
                    .line(12)
                    .invoke_static("com/lib/Middle", "go", "()V"),
            ),
        )],
    );
    let lib = ws.artifact(
        "lib",
        &[(
            "com/lib/Middle",
            ClassFileBuilder::new("com/lib/Middle")
                .method(
                    PUBLIC_STATIC,
                    "go",
                    "()V",
                    CodeBuilder::new()
                        .line(3)
                        .get_static("com/lib/Helper", "INSTANCE", "Lcom/lib/Helper;")
                        .return_void(),
                )
                .build(),
        )],
    );

    let conflicts = check(&config(), &[app.clone(), lib], &app);
    assert_eq!(conflicts.len(), 3, "{conflicts:#?}");
    for conflict in &conflicts {
        assert_eq!(conflict.category(), ConflictCategory::ClassNotFound);
        assert_eq!(conflict.reason(), "Class not found: com.lib.Helper");
        assert_eq!(conflict.exists_in(), None);
    }

    let lines: Vec<_> = conflicts
        .iter()
        .filter(|c| c.used_by().as_str() == "app")
        .map(|c| c.dependency().from_line())
        .collect();
    assert_eq!(lines, vec![10, 11]);

    let transitive = conflicts
        .iter()
        .find(|c| c.used_by().as_str() == "lib")
        .unwrap();
    assert_eq!(transitive.dependency().from_class(), &class("com.lib.Middle"));
    assert_eq!(
        transitive.dependency().reachability_path(),
        &[class("com.app.Main"), class("com.lib.Middle")]
    );
}

#[test]
fn guarded_class_loading_is_not_a_conflict() {
    let ws = Workspace::new();
    let app = ws.artifact(
        "app",
        &[(
            "com/app/Main",
            main_calling(
                CodeBuilder::new()
                    .try_catch(Some("java/lang/NoClassDefFoundError"), |code| {
                        code.line(5).invoke_static("com/lib/Optional", "lookup", "()V")
                    })
                    .try_catch(Some("java/lang/ClassNotFoundException"), |code| {
                        code.line(6).get_static("com/lib/Optional", "FLAG", "Z")
                    }),
            ),
        )],
    );

    assert!(check(&config(), &[app.clone()], &app).is_empty());
}

#[test]
fn finally_blocks_do_not_guard() {
    let ws = Workspace::new();
    let app = ws.artifact(
        "app",
        &[(
            "com/app/Main",
            main_calling(CodeBuilder::new().try_catch(None, |code| {
                code.line(5).invoke_static("com/lib/Optional", "lookup", "()V")
            })),
        )],
    );

    let conflicts = check(&config(), &[app.clone()], &app);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].category(), ConflictCategory::ClassNotFound);
}

#[test]
fn removed_or_retyped_field_reports_the_referenced_field() {
    let ws = Workspace::new();
    let app = ws.artifact(
        "app",
        &[(
            "com/app/Main",
            main_calling(
                CodeBuilder::new()
                    .line(7)
                    .get_static("com/lib/Target", "count", "I")
                    .line(8)
                    .get_static("com/lib/Target", "present", "J"),
            ),
        )],
    );
    let lib = ws.artifact(
        "lib",
        &[(
            "com/lib/Target",
            ClassFileBuilder::new("com/lib/Target")
                .field(PUBLIC_STATIC, "count", "J")
                .field(PUBLIC_STATIC, "present", "J")
                .build(),
        )],
    );

    let conflicts = check(&config(), &[app.clone(), lib], &app);
    assert_eq!(conflicts.len(), 1, "{conflicts:#?}");
    let conflict = &conflicts[0];
    assert_eq!(conflict.category(), ConflictCategory::FieldNotFound);
    assert_eq!(conflict.reason(), "Field not found: com.lib.Target#count (int)");
    assert_eq!(conflict.exists_in(), Some(&ArtifactName::new("lib")));
    assert_eq!(conflict.used_by(), &ArtifactName::new("app"));
    assert_eq!(conflict.dependency().from_line(), 7);
}

#[test]
fn caught_no_such_field_error_suppresses_field_conflicts() {
    let ws = Workspace::new();
    let app = ws.artifact(
        "app",
        &[(
            "com/app/Main",
            main_calling(CodeBuilder::new().try_catch(Some("java/lang/NoSuchFieldError"), |code| {
                code.get_static("com/lib/Target", "count", "I")
            })),
        )],
    );
    let lib = ws.artifact(
        "lib",
        &[("com/lib/Target", ClassFileBuilder::new("com/lib/Target").build())],
    );

    assert!(check(&config(), &[app.clone(), lib], &app).is_empty());
}

#[test]
fn static_mismatch_is_a_missing_method() {
    let ws = Workspace::new();
    let app = ws.artifact(
        "app",
        &[(
            "com/app/Main",
            main_calling(
                CodeBuilder::new()
                    .line(20)
                    .op(0x01)
                    .invoke_virtual("com/lib/TargetClass", "method", "()V"),
            ),
        )],
    );
    let lib = ws.artifact(
        "lib",
        &[
            (
                "com/lib/Base",
                ClassFileBuilder::new("com/lib/Base")
                    .method(ACC_PUBLIC, "method", "()V", CodeBuilder::new().return_void())
                    .build(),
            ),
            (
                "com/lib/TargetClass",
                ClassFileBuilder::new("com/lib/TargetClass")
                    .extends("com/lib/Base")
                    .method(PUBLIC_STATIC, "method", "()V", CodeBuilder::new().return_void())
                    .build(),
            ),
        ],
    );

    let conflicts = check(&config(), &[app.clone(), lib], &app);
    assert_eq!(conflicts.len(), 1, "{conflicts:#?}");
    assert_eq!(conflicts[0].category(), ConflictCategory::MethodSignatureNotFound);
    assert_eq!(
        conflicts[0].reason(),
        "Method not found: void com.lib.TargetClass.method()"
    );
}

#[test]
fn caught_no_such_method_error_suppresses_method_conflicts() {
    let ws = Workspace::new();
    let app = ws.artifact(
        "app",
        &[(
            "com/app/Main",
            main_calling(CodeBuilder::new().try_catch(Some("java/lang/NoSuchMethodError"), |code| {
                code.invoke_static("com/lib/Target", "gone", "()V")
            })),
        )],
    );
    let lib = ws.artifact(
        "lib",
        &[("com/lib/Target", ClassFileBuilder::new("com/lib/Target").build())],
    );

    assert!(check(&config(), &[app.clone(), lib], &app).is_empty());
}

#[test]
fn members_resolve_through_superclasses_and_interfaces() {
    let ws = Workspace::new();
    let app = ws.artifact(
        "app",
        &[(
            "com/app/Main",
            main_calling(
                CodeBuilder::new()
                    .invoke_virtual("com/lib/Impl", "inherited", "()V")
                    .invoke_interface("com/lib/Impl", "fromDefault", "()I")
                    .get_field("com/lib/Impl", "state", "Ljava/lang/String;")
                    .get_static("com/lib/Impl", "CONSTANT", "I"),
            ),
        )],
    );
    let lib = ws.artifact(
        "lib",
        &[
            (
                "com/lib/Base",
                ClassFileBuilder::new("com/lib/Base")
                    .field(ACC_PUBLIC, "state", "Ljava/lang/String;")
                    .method(ACC_PUBLIC, "inherited", "()V", CodeBuilder::new().return_void())
                    .build(),
            ),
            (
                "com/lib/Iface",
                ClassFileBuilder::interface("com/lib/Iface")
                    .field(PUBLIC_STATIC, "CONSTANT", "I")
                    .method(ACC_PUBLIC, "fromDefault", "()I", CodeBuilder::new().return_void())
                    .build(),
            ),
            (
                "com/lib/Impl",
                ClassFileBuilder::new("com/lib/Impl")
                    .extends("com/lib/Base")
                    .implements("com/lib/Iface")
                    .build(),
            ),
        ],
    );

    let conflicts = check(&config(), &[app.clone(), lib], &app);
    assert!(conflicts.is_empty(), "{conflicts:#?}");
}

#[test]
fn bridge_methods_keep_the_erased_signature_linkable() {
    let ws = Workspace::new();
    let app = ws.artifact(
        "app",
        &[(
            "com/app/Main",
            main_calling(CodeBuilder::new().invoke_virtual(
                "com/lib/Narrowed",
                "get",
                "()Ljava/lang/Object;",
            )),
        )],
    );
    let lib = ws.artifact(
        "lib",
        &[(
            "com/lib/Narrowed",
            ClassFileBuilder::new("com/lib/Narrowed")
                .method(ACC_PUBLIC, "get", "()Ljava/lang/String;", CodeBuilder::new().return_void())
                .method(
                    ACC_PUBLIC | 0x0040 | 0x1000,
                    "get",
                    "()Ljava/lang/Object;",
                    CodeBuilder::new().invoke_virtual("com/lib/Narrowed", "get", "()Ljava/lang/String;"),
                )
                .build(),
        )],
    );

    assert!(check(&config(), &[app.clone(), lib], &app).is_empty());
}

fn broken_target(ws: &Workspace) -> Artifact {
    ws.artifact(
        "lib",
        &[
            ("com/lib/Target", ClassFileBuilder::new("com/lib/Target").build()),
            (
                "com/lib/ViaCall",
                caller_of_missing("com/lib/ViaCall"),
            ),
            (
                "com/lib/ViaField",
                ClassFileBuilder::new("com/lib/ViaField")
                    .field(PUBLIC_STATIC, "VALUE", "I")
                    .method(PUBLIC_STATIC, "init", "()V", missing_call())
                    .build(),
            ),
            ("com/lib/ViaLiteral", caller_of_missing("com/lib/ViaLiteral")),
            (
                "com/lib/ViaDefault",
                ClassFileBuilder::interface("com/lib/ViaDefault")
                    .method(ACC_PUBLIC, "helper", "()V", missing_call())
                    .build(),
            ),
            (
                "com/lib/DefaultImpl",
                ClassFileBuilder::new("com/lib/DefaultImpl")
                    .implements("com/lib/ViaDefault")
                    .build(),
            ),
            ("com/lib/Sibling", caller_of_missing("com/lib/Sibling")),
        ],
    )
}

fn missing_call() -> CodeBuilder {
    CodeBuilder::new()
        .line(1)
        .invoke_static("com/lib/Target", "removed", "()V")
        .return_void()
}

fn caller_of_missing(name: &str) -> Vec<u8> {
    ClassFileBuilder::new(name)
        .method(PUBLIC_STATIC, "run", "()V", missing_call())
        .build()
}

#[test]
fn transitively_reachable_classes_are_checked_and_siblings_are_not() {
    let ws = Workspace::new();
    let app = ws.artifact(
        "app",
        &[(
            "com/app/Main",
            main_calling(
                CodeBuilder::new()
                    .invoke_static("com/lib/ViaCall", "run", "()V")
                    .get_static("com/lib/ViaField", "VALUE", "I")
                    .ldc_class("com/lib/ViaLiteral")
                    .op(0x57)
                    .op(0x01)
                    .invoke_virtual("com/lib/DefaultImpl", "helper", "()V"),
            ),
        )],
    );
    let lib = broken_target(&ws);

    let conflicts = check(&config(), &[app.clone(), lib], &app);
    let callers: BTreeSet<_> = conflicts
        .iter()
        .map(|c| c.dependency().from_class().class_name().to_owned())
        .collect();
    assert_eq!(
        callers,
        BTreeSet::from([
            "com.lib.ViaCall".to_owned(),
            "com.lib.ViaField".to_owned(),
            "com.lib.ViaLiteral".to_owned(),
            "com.lib.ViaDefault".to_owned(),
        ])
    );
    assert_eq!(conflicts.len(), 4);

    let via_default = conflicts
        .iter()
        .find(|c| c.dependency().from_class() == &class("com.lib.ViaDefault"))
        .unwrap();
    assert_eq!(
        via_default.dependency().reachability_path(),
        &[
            class("com.app.Main"),
            class("com.lib.DefaultImpl"),
            class("com.lib.ViaDefault")
        ]
    );
    assert!(conflicts
        .iter()
        .all(|c| c.category() == ConflictCategory::MethodSignatureNotFound));
}

#[test]
fn complete_checks_include_unreachable_classes() {
    let ws = Workspace::new();
    let app = ws.artifact(
        "app",
        &[("com/app/Main", main_calling(CodeBuilder::new()))],
    );
    let lib = broken_target(&ws);

    let config = ConflictCheckerConfiguration {
        check_completely: true,
        ..config()
    };
    let conflicts = check(&config, &[app.clone(), lib], &app);
    assert_eq!(conflicts.len(), 5, "{conflicts:#?}");
    let sibling = conflicts
        .iter()
        .find(|c| c.dependency().from_class() == &class("com.lib.Sibling"))
        .unwrap();
    assert_eq!(
        sibling.dependency().reachability_path(),
        &[class("com.lib.Sibling")]
    );
}

#[test]
fn first_artifact_on_the_classpath_wins() {
    let ws = Workspace::new();
    let app = ws.artifact(
        "app",
        &[(
            "com/app/Main",
            main_calling(CodeBuilder::new().invoke_static("com/lib/X", "added", "()V")),
        )],
    );
    let old = ws.artifact("lib-old", &[("com/lib/X", ClassFileBuilder::new("com/lib/X").build())]);
    let new = ws.artifact(
        "lib-new",
        &[(
            "com/lib/X",
            ClassFileBuilder::new("com/lib/X")
                .method(PUBLIC_STATIC, "added", "()V", CodeBuilder::new().return_void())
                .build(),
        )],
    );

    let conflicts = check(&config(), &[app.clone(), old.clone(), new.clone()], &app);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].exists_in(), Some(&ArtifactName::new("lib-old")));

    assert!(check(&config(), &[app.clone(), new, old], &app).is_empty());
}

#[test]
fn artifact_and_class_filters_apply() {
    let ws = Workspace::new();
    let app = ws.artifact(
        "app",
        &[(
            "com/app/Main",
            main_calling(
                CodeBuilder::new()
                    .invoke_static("com/lib/ViaCall", "run", "()V")
                    .invoke_static("com/shaded/Gone", "run", "()V"),
            ),
        )],
    );
    let lib = broken_target(&ws);
    let classpath = [app.clone(), lib];

    let all = check(&config(), &classpath, &app);
    assert_eq!(all.len(), 2, "{all:#?}");

    let keyword = ConflictCheckerConfiguration {
        ignored_classname_keywords: BTreeSet::from(["SHADED".to_owned()]),
        ..config()
    };
    assert_eq!(check(&keyword, &classpath, &app).len(), 1);

    let ignore_lib = ConflictCheckerConfiguration {
        ignored_artifact_prefixes: BTreeSet::from(["lib".to_owned()]),
        ..config()
    };
    let only_app = check(&ignore_lib, &classpath, &app);
    assert_eq!(only_app.len(), 1);
    assert_eq!(only_app[0].used_by().as_str(), "app");

    let errors_only_for_lib = ConflictCheckerConfiguration {
        error_artifact_prefixes: BTreeSet::from(["lib".to_owned()]),
        ..config()
    };
    let only_lib = check(&errors_only_for_lib, &classpath, &app);
    assert_eq!(only_lib.len(), 1);
    assert_eq!(only_lib[0].used_by().as_str(), "lib");

    let ignore_wins = ConflictCheckerConfiguration {
        error_artifact_prefixes: BTreeSet::from(["lib".to_owned()]),
        ignored_artifact_prefixes: BTreeSet::from(["lib".to_owned()]),
        ..config()
    };
    assert!(check(&ignore_wins, &classpath, &app).is_empty());
}

#[test]
fn cyclic_hierarchies_terminate() {
    let ws = Workspace::new();
    let app = ws.artifact(
        "app",
        &[(
            "com/app/Main",
            main_calling(CodeBuilder::new().invoke_static("com/lib/A", "missing", "()V")),
        )],
    );
    let lib = ws.artifact(
        "lib",
        &[
            ("com/lib/A", ClassFileBuilder::new("com/lib/A").extends("com/lib/B").build()),
            ("com/lib/B", ClassFileBuilder::new("com/lib/B").extends("com/lib/A").build()),
        ],
    );

    let conflicts = check(&config(), &[app.clone(), lib], &app);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].category(), ConflictCategory::MethodSignatureNotFound);
}

#[test]
fn undecodable_reachable_class_fails_the_run() {
    let ws = Workspace::new();
    let app = ws.artifact(
        "app",
        &[(
            "com/app/Main",
            main_calling(CodeBuilder::new().invoke_static("com/lib/Corrupt", "run", "()V")),
        )],
    );
    let lib_root = ws.root().join("lib/com/lib");
    std::fs::create_dir_all(&lib_root).unwrap();
    std::fs::write(lib_root.join("Corrupt.class"), [0xCA, 0xFE, 0xBA, 0xBE, 0x00]).unwrap();
    let lib = ArtifactLoader::default()
        .load(ArtifactName::new("lib"), &ws.root().join("lib"))
        .unwrap();

    let loader = ClassLoader::default();
    let err = ConflictChecker::check_with_entry_points(
        &config(),
        &loader,
        &[app.clone(), lib],
        app.classes().values(),
    )
    .unwrap_err();
    match err {
        CheckError::Decode { location, .. } => assert!(location.ends_with("Corrupt.class")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn shared_loader_serves_repeated_runs() {
    let ws = Workspace::new();
    let app = ws.artifact(
        "app",
        &[(
            "com/app/Main",
            main_calling(CodeBuilder::new().invoke_static("com/lib/ViaCall", "run", "()V")),
        )],
    );
    let lib = broken_target(&ws);
    let classpath = [app.clone(), lib];

    let loader = ClassLoader::default();
    let first = ConflictChecker::check_with_entry_points(
        &config(),
        &loader,
        &classpath,
        app.classes().values(),
    )
    .unwrap();
    let cached = loader.cached_len();
    let second = ConflictChecker::check_with_entry_points(
        &config(),
        &loader,
        &classpath,
        app.classes().values(),
    )
    .unwrap();
    assert_eq!(first, second);
    assert_eq!(loader.cached_len(), cached);
}
