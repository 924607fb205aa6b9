use std::collections::BTreeSet;

use abi_classfile::{ClassDecoder, ClassFile, Error};
use abi_model::{
    CallSite, ClassType, FieldDescriptor, FieldReference, MethodDescriptor, MethodReference,
    TypeDescriptor,
};
use abi_test_utils::{ClassFileBuilder, CodeBuilder, Handle, ACC_PUBLIC, ACC_STATIC};

fn class(name: &str) -> ClassType {
    ClassType::from_class_name(name).unwrap()
}

fn method_ref(owner: &str, ret: &str, name: &str, params: &[&str], is_static: bool) -> MethodReference {
    MethodReference::new(
        class(owner),
        MethodDescriptor::of(ret, name, params).unwrap(),
        is_static,
    )
}

fn field_ref(owner: &str, ty: &str, name: &str, is_static: bool) -> FieldReference {
    FieldReference::new(
        class(owner),
        FieldDescriptor::new(TypeDescriptor::parse(ty).unwrap(), name),
        is_static,
    )
}

fn caught(names: &[&str]) -> BTreeSet<ClassType> {
    names.iter().map(|name| class(name)).collect()
}

#[test]
fn declares_name_parents_and_fields() {
    let bytes = ClassFileBuilder::new("com/example/Impl")
        .extends("com/example/Base")
        .implements("com/example/First")
        .implements("com/example/Second")
        .field(ACC_PUBLIC, "counter", "J")
        .field(ACC_PUBLIC | ACC_STATIC, "NAMES", "[Ljava/lang/String;")
        .build();

    let declared = ClassDecoder::default().decode(&bytes).unwrap();
    assert_eq!(declared.name(), &class("com.example.Impl"));
    assert_eq!(
        declared.parents(),
        &[
            class("com.example.Base"),
            class("com.example.First"),
            class("com.example.Second")
        ]
    );

    let counter = FieldDescriptor::new(TypeDescriptor::parse("J").unwrap(), "counter");
    assert_eq!(
        declared.field(&counter),
        Some(&field_ref("com/example/Impl", "J", "counter", false))
    );
    let names = FieldDescriptor::new(TypeDescriptor::parse("[Ljava/lang/String;").unwrap(), "NAMES");
    assert!(declared.field(&names).unwrap().is_static());
}

#[test]
fn object_has_no_parents() {
    let bytes = ClassFileBuilder::new("java/lang/Object").without_super().build();
    let declared = ClassDecoder::default().decode(&bytes).unwrap();
    assert!(declared.parents().is_empty());
}

#[test]
fn call_sites_carry_dispatch_kind_and_line() {
    let code = CodeBuilder::new()
        .line(10)
        .invoke_virtual("com/example/Target", "method", "(Ljava/lang/Object;)V")
        .line(11)
        .invoke_static("com/example/Target", "create", "()Lcom/example/Target;")
        .invoke_interface("com/example/Api", "call", "()I")
        .line(12)
        .invoke_special("java/lang/Object", "<init>", "()V")
        .get_field("com/example/Target", "value", "I")
        .put_static("com/example/Target", "CACHE", "Ljava/util/Map;")
        .return_void();
    let bytes = ClassFileBuilder::new("com/example/Caller")
        .method(ACC_PUBLIC | ACC_STATIC, "run", "()V", code)
        .build();

    let declared = ClassDecoder::default().decode(&bytes).unwrap();
    let run = declared
        .method(&MethodDescriptor::of("V", "run", &[]).unwrap())
        .unwrap();
    assert!(run.is_static());

    let expected_calls: BTreeSet<_> = [
        CallSite::new(
            method_ref("com/example/Target", "V", "method", &["Ljava/lang/Object;"], false),
            10,
            BTreeSet::new(),
        ),
        CallSite::new(
            method_ref("com/example/Target", "Lcom/example/Target;", "create", &[], true),
            11,
            BTreeSet::new(),
        ),
        CallSite::new(method_ref("com/example/Api", "I", "call", &[], false), 11, BTreeSet::new()),
        CallSite::new(method_ref("java/lang/Object", "V", "<init>", &[], false), 12, BTreeSet::new()),
    ]
    .into_iter()
    .collect();
    assert_eq!(run.method_calls(), &expected_calls);

    let expected_fields: BTreeSet<_> = [
        CallSite::new(field_ref("com/example/Target", "I", "value", false), 12, BTreeSet::new()),
        CallSite::new(
            field_ref("com/example/Target", "Ljava/util/Map;", "CACHE", true),
            12,
            BTreeSet::new(),
        ),
    ]
    .into_iter()
    .collect();
    assert_eq!(run.field_accesses(), &expected_fields);
}

#[test]
fn instructions_before_any_line_marker_are_line_zero() {
    let code = CodeBuilder::new()
        .invoke_static("com/example/Target", "early", "()V")
        .line(7)
        .return_void();
    let bytes = ClassFileBuilder::new("com/example/Caller")
        .method(ACC_STATIC, "run", "()V", code)
        .build();

    let declared = ClassDecoder::default().decode(&bytes).unwrap();
    let run = declared.methods().values().next().unwrap();
    let site = run.method_calls().iter().next().unwrap();
    assert_eq!(site.line_number(), 0);
}

#[test]
fn caught_exceptions_cover_enclosed_instructions_only() {
    let code = CodeBuilder::new()
        .line(1)
        .try_catch(Some("java/lang/NoSuchMethodError"), |code| {
            code.try_catch(Some("java/lang/NoClassDefFoundError"), |code| {
                code.invoke_static("com/example/Target", "inner", "()V")
            })
            .invoke_static("com/example/Target", "outer", "()V")
        })
        .try_catch(None, |code| {
            code.invoke_static("com/example/Target", "finallyOnly", "()V")
        })
        .invoke_static("com/example/Target", "unguarded", "()V")
        .return_void();
    let bytes = ClassFileBuilder::new("com/example/Caller")
        .method(ACC_STATIC, "run", "()V", code)
        .build();

    let declared = ClassDecoder::default().decode(&bytes).unwrap();
    let run = declared.methods().values().next().unwrap();
    let by_name = |name: &str| {
        run.method_calls()
            .iter()
            .find(|site| site.reference().descriptor().name() == name)
            .unwrap()
            .caught_exceptions()
            .clone()
    };

    assert_eq!(
        by_name("inner"),
        caught(&["java.lang.NoClassDefFoundError", "java.lang.NoSuchMethodError"])
    );
    assert_eq!(by_name("outer"), caught(&["java.lang.NoSuchMethodError"]));
    assert_eq!(by_name("finallyOnly"), caught(&[]));
    assert_eq!(by_name("unguarded"), caught(&[]));
}

#[test]
fn invokedynamic_handles_become_call_sites() {
    let code = CodeBuilder::new()
        .line(20)
        .invoke_dynamic(
            "run",
            "()Ljava/lang/Runnable;",
            &[
                Handle::invoke_static("com/example/Lambdas", "lambda$0", "()V"),
                Handle::new_invoke_special("com/example/Widget", "()V"),
                Handle::invoke_virtual("com/example/Widget", "render", "()V"),
                Handle::invoke_interface("com/example/Api", "call", "()I"),
                Handle::get_field("com/example/Record", "id", "J"),
                Handle::get_static("com/example/Record", "EMPTY", "Lcom/example/Record;"),
            ],
        )
        .return_void();
    let bytes = ClassFileBuilder::new("com/example/Caller")
        .method(ACC_STATIC, "run", "()V", code)
        .build();

    let declared = ClassDecoder::default().decode(&bytes).unwrap();
    let run = declared.methods().values().next().unwrap();

    let calls: BTreeSet<_> = run
        .method_calls()
        .iter()
        .map(|site| (site.reference().clone(), site.line_number()))
        .collect();
    let expected: BTreeSet<_> = [
        method_ref("com/example/Lambdas", "V", "lambda$0", &[], true),
        method_ref("com/example/Widget", "V", "<init>", &[], false),
        method_ref("com/example/Widget", "V", "render", &[], false),
        method_ref("com/example/Api", "I", "call", &[], false),
    ]
    .into_iter()
    .map(|reference| (reference, 20))
    .collect();
    assert_eq!(calls, expected);

    let fields: BTreeSet<_> = run
        .field_accesses()
        .iter()
        .map(|site| site.reference().clone())
        .collect();
    let expected: BTreeSet<_> = [
        field_ref("com/example/Record", "J", "id", false),
        field_ref("com/example/Record", "Lcom/example/Record;", "EMPTY", true),
    ]
    .into_iter()
    .collect();
    assert_eq!(fields, expected);
}

#[test]
fn class_literals_are_loaded_classes() {
    let code = CodeBuilder::new()
        .ldc_class("com/example/Plain")
        .ldc_class("[[Lcom/example/Element;")
        .ldc_class("[I")
        .return_void();
    let bytes = ClassFileBuilder::new("com/example/Caller")
        .method(ACC_STATIC, "run", "()V", code)
        .build();

    let declared = ClassDecoder::default().decode(&bytes).unwrap();
    assert_eq!(
        declared.loaded_classes(),
        &caught(&["com.example.Plain", "com.example.Element"])
    );
}

#[test]
fn array_and_intrinsic_owners_are_skipped() {
    let code = CodeBuilder::new()
        .invoke_virtual("[Ljava/lang/String;", "clone", "()Ljava/lang/Object;")
        .invoke_virtual(
            "java/lang/invoke/MethodHandle",
            "invokeExact",
            "(Ljava/lang/String;)V",
        )
        .invoke_virtual("java/lang/invoke/VarHandle", "get", "()I")
        .invoke_virtual("com/example/Target", "kept", "()V")
        .return_void();
    let bytes = ClassFileBuilder::new("com/example/Caller")
        .method(ACC_PUBLIC, "run", "()V", code)
        .build();

    let declared = ClassDecoder::default().decode(&bytes).unwrap();
    let run = declared.methods().values().next().unwrap();
    let owners: Vec<_> = run.method_calls().iter().map(|site| site.owner().clone()).collect();
    assert_eq!(owners, vec![class("com.example.Target")]);

    let permissive = ClassDecoder::with_unverifiable_owners(Vec::<String>::new());
    let declared = permissive.decode(&bytes).unwrap();
    let run = declared.methods().values().next().unwrap();
    assert_eq!(run.method_calls().len(), 3);
}

#[test]
fn abstract_methods_are_declared_without_references() {
    let bytes = ClassFileBuilder::interface("com/example/Api")
        .abstract_method(ACC_PUBLIC, "call", "()I")
        .build();

    let declared = ClassDecoder::default().decode(&bytes).unwrap();
    let call = declared
        .method(&MethodDescriptor::of("I", "call", &[]).unwrap())
        .unwrap();
    assert!(!call.is_static());
    assert!(call.method_calls().is_empty());
    assert!(call.field_accesses().is_empty());
}

#[test]
fn duplicate_method_signatures_are_fatal() {
    let bytes = ClassFileBuilder::new("com/example/Broken")
        .method(ACC_PUBLIC, "run", "()V", CodeBuilder::new().return_void())
        .method(ACC_PUBLIC | ACC_STATIC, "run", "()V", CodeBuilder::new().return_void())
        .build();

    let err = ClassDecoder::default().decode(&bytes).unwrap_err();
    match err {
        Error::DuplicateMethodSignature { class, method } => {
            assert_eq!(class, "com.example.Broken");
            assert_eq!(method, "void run()");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn return_type_distinguishes_methods() {
    let bytes = ClassFileBuilder::new("com/example/Bridge")
        .method(ACC_PUBLIC, "get", "()Ljava/lang/Object;", CodeBuilder::new().return_void())
        .method(ACC_PUBLIC, "get", "()Ljava/lang/String;", CodeBuilder::new().return_void())
        .build();

    let declared = ClassDecoder::default().decode(&bytes).unwrap();
    assert_eq!(declared.methods().len(), 2);
}

#[test]
fn structural_errors_abort_decoding() {
    assert!(matches!(
        ClassDecoder::default().decode(b"not a class"),
        Err(Error::InvalidMagic(_))
    ));

    let bytes = ClassFileBuilder::new("com/example/Truncated").build();
    assert!(matches!(
        ClassFile::parse(&bytes[..bytes.len() - 1]),
        Err(Error::UnexpectedEof)
    ));

    let code = CodeBuilder::new().op(0xd3).return_void();
    let bytes = ClassFileBuilder::new("com/example/BadCode")
        .method(ACC_STATIC, "run", "()V", code)
        .build();
    assert!(matches!(
        ClassDecoder::default().decode(&bytes),
        Err(Error::InvalidOpcode { opcode: 0xd3, offset: 0 })
    ));
}

#[test]
fn string_literals_with_unpaired_surrogates_decode() {
    let bytes = ClassFileBuilder::new("com/example/Strings")
        .method(
            ACC_PUBLIC | ACC_STATIC,
            "lone",
            "()V",
            CodeBuilder::new()
                .line(4)
                .ldc_utf16(&[0xD800])
                .op(0x57) // pop
                .invoke_static("com/example/Target", "run", "()V")
                .return_void(),
        )
        .build();
    assert!(
        bytes.windows(6).any(|w| w == [1, 0, 3, 0xED, 0xA0, 0x80]),
        "expected a raw `ED A0 80` Utf8 entry"
    );

    let declared = ClassDecoder::default().decode(&bytes).unwrap();
    let lone = declared
        .method(&MethodDescriptor::of("V", "lone", &[]).unwrap())
        .unwrap();
    let calls: Vec<_> = lone.method_calls().iter().map(|site| site.reference().clone()).collect();
    assert_eq!(calls, vec![method_ref("com/example/Target", "V", "run", &[], true)]);
}
