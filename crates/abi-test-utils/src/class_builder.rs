use crate::constant_pool::{push_u16, push_u32, ConstantPoolBuilder};

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;

const MAJOR_JAVA_17: u16 = 61;

const INVOKEVIRTUAL: u8 = 0xb6;
const INVOKESPECIAL: u8 = 0xb7;
const INVOKESTATIC: u8 = 0xb8;
const INVOKEINTERFACE: u8 = 0xb9;
const INVOKEDYNAMIC: u8 = 0xba;
const GETSTATIC: u8 = 0xb2;
const PUTSTATIC: u8 = 0xb3;
const GETFIELD: u8 = 0xb4;
const PUTFIELD: u8 = 0xb5;
const LDC_W: u8 = 0x13;
const ATHROW: u8 = 0xbf;
const RETURN: u8 = 0xb1;

/// A `CONSTANT_MethodHandle` passed as a bootstrap argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handle {
    kind: u8,
    owner: String,
    name: String,
    descriptor: String,
    interface: bool,
}

impl Handle {
    fn new(kind: u8, owner: &str, name: &str, descriptor: &str) -> Self {
        Self {
            kind,
            owner: owner.to_owned(),
            name: name.to_owned(),
            descriptor: descriptor.to_owned(),
            interface: false,
        }
    }

    pub fn get_field(owner: &str, name: &str, descriptor: &str) -> Self {
        Self::new(1, owner, name, descriptor)
    }

    pub fn get_static(owner: &str, name: &str, descriptor: &str) -> Self {
        Self::new(2, owner, name, descriptor)
    }

    pub fn put_field(owner: &str, name: &str, descriptor: &str) -> Self {
        Self::new(3, owner, name, descriptor)
    }

    pub fn put_static(owner: &str, name: &str, descriptor: &str) -> Self {
        Self::new(4, owner, name, descriptor)
    }

    pub fn invoke_virtual(owner: &str, name: &str, descriptor: &str) -> Self {
        Self::new(5, owner, name, descriptor)
    }

    pub fn invoke_static(owner: &str, name: &str, descriptor: &str) -> Self {
        Self::new(6, owner, name, descriptor)
    }

    pub fn invoke_special(owner: &str, name: &str, descriptor: &str) -> Self {
        Self::new(7, owner, name, descriptor)
    }

    pub fn new_invoke_special(owner: &str, descriptor: &str) -> Self {
        Self::new(8, owner, "<init>", descriptor)
    }

    pub fn invoke_interface(owner: &str, name: &str, descriptor: &str) -> Self {
        Self {
            interface: true,
            ..Self::new(9, owner, name, descriptor)
        }
    }

    fn is_field(&self) -> bool {
        self.kind <= 4
    }
}

#[derive(Debug, Clone)]
enum Op {
    Raw(u8),
    Invoke {
        opcode: u8,
        owner: String,
        name: String,
        descriptor: String,
    },
    Field {
        opcode: u8,
        owner: String,
        name: String,
        descriptor: String,
    },
    LdcClass(String),
    LdcString(Vec<u16>),
    InvokeDynamic {
        name: String,
        descriptor: String,
        handles: Vec<Handle>,
    },
}

impl Op {
    fn len(&self) -> u16 {
        match self {
            Op::Raw(_) => 1,
            Op::Invoke { opcode, .. } if *opcode == INVOKEINTERFACE => 5,
            Op::Invoke { .. } | Op::Field { .. } | Op::LdcClass(_) | Op::LdcString(_) => 3,
            Op::InvokeDynamic { .. } => 5,
        }
    }
}

#[derive(Debug, Clone)]
struct Handler {
    start_pc: u16,
    end_pc: u16,
    handler_pc: u16,
    catch_type: Option<String>,
}

/// Builds the body of one method.
///
/// Instructions are appended in order; [`CodeBuilder::line`] marks the line
/// of everything emitted after it.
#[derive(Debug, Clone, Default)]
pub struct CodeBuilder {
    ops: Vec<Op>,
    pc: u16,
    lines: Vec<(u16, u16)>,
    handlers: Vec<Handler>,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, op: Op) -> Self {
        self.pc += op.len();
        self.ops.push(op);
        self
    }

    fn invoke(self, opcode: u8, owner: &str, name: &str, descriptor: &str) -> Self {
        self.push(Op::Invoke {
            opcode,
            owner: owner.to_owned(),
            name: name.to_owned(),
            descriptor: descriptor.to_owned(),
        })
    }

    fn field(self, opcode: u8, owner: &str, name: &str, descriptor: &str) -> Self {
        self.push(Op::Field {
            opcode,
            owner: owner.to_owned(),
            name: name.to_owned(),
            descriptor: descriptor.to_owned(),
        })
    }

    pub fn line(mut self, line: u16) -> Self {
        self.lines.push((self.pc, line));
        self
    }

    /// Appends a single-byte instruction such as `nop` or `aload_0`.
    pub fn op(self, opcode: u8) -> Self {
        self.push(Op::Raw(opcode))
    }

    pub fn return_void(self) -> Self {
        self.op(RETURN)
    }

    pub fn invoke_virtual(self, owner: &str, name: &str, descriptor: &str) -> Self {
        self.invoke(INVOKEVIRTUAL, owner, name, descriptor)
    }

    pub fn invoke_special(self, owner: &str, name: &str, descriptor: &str) -> Self {
        self.invoke(INVOKESPECIAL, owner, name, descriptor)
    }

    pub fn invoke_static(self, owner: &str, name: &str, descriptor: &str) -> Self {
        self.invoke(INVOKESTATIC, owner, name, descriptor)
    }

    pub fn invoke_interface(self, owner: &str, name: &str, descriptor: &str) -> Self {
        self.invoke(INVOKEINTERFACE, owner, name, descriptor)
    }

    pub fn get_field(self, owner: &str, name: &str, descriptor: &str) -> Self {
        self.field(GETFIELD, owner, name, descriptor)
    }

    pub fn put_field(self, owner: &str, name: &str, descriptor: &str) -> Self {
        self.field(PUTFIELD, owner, name, descriptor)
    }

    pub fn get_static(self, owner: &str, name: &str, descriptor: &str) -> Self {
        self.field(GETSTATIC, owner, name, descriptor)
    }

    pub fn put_static(self, owner: &str, name: &str, descriptor: &str) -> Self {
        self.field(PUTSTATIC, owner, name, descriptor)
    }

    /// `ldc_w` of a class literal; `internal_name` may be an array descriptor.
    pub fn ldc_class(self, internal_name: &str) -> Self {
        self.push(Op::LdcClass(internal_name.to_owned()))
    }

    /// `ldc_w` of a string literal.
    pub fn ldc_string(self, value: &str) -> Self {
        self.ldc_utf16(&value.encode_utf16().collect::<Vec<_>>())
    }

    /// `ldc_w` of a string literal spelled as UTF-16 units, which may hold
    /// unpaired surrogates the way `javac` writes `"\uD800"`.
    pub fn ldc_utf16(self, units: &[u16]) -> Self {
        self.push(Op::LdcString(units.to_vec()))
    }

    /// `invokedynamic` bootstrapped by `LambdaMetafactory.metafactory` with
    /// `handles` as its method-handle arguments.
    pub fn invoke_dynamic(self, name: &str, descriptor: &str, handles: &[Handle]) -> Self {
        self.push(Op::InvokeDynamic {
            name: name.to_owned(),
            descriptor: descriptor.to_owned(),
            handles: handles.to_vec(),
        })
    }

    /// Wraps `body` in an exception handler for `catch_type` (`None` models a
    /// `finally` block). The handler itself rethrows.
    pub fn try_catch(self, catch_type: Option<&str>, body: impl FnOnce(Self) -> Self) -> Self {
        let start_pc = self.pc;
        let mut code = body(self);
        let end_pc = code.pc;
        code.handlers.push(Handler {
            start_pc,
            end_pc,
            handler_pc: end_pc,
            catch_type: catch_type.map(str::to_owned),
        });
        code.op(ATHROW)
    }

    fn encode(
        &self,
        cp: &mut ConstantPoolBuilder,
        bootstrap_methods: &mut Vec<(u16, Vec<u16>)>,
    ) -> Vec<u8> {
        let mut bytecode = Vec::with_capacity(self.pc as usize);
        for op in &self.ops {
            match op {
                Op::Raw(opcode) => bytecode.push(*opcode),
                Op::Invoke {
                    opcode,
                    owner,
                    name,
                    descriptor,
                } => {
                    let interface = *opcode == INVOKEINTERFACE;
                    let index = cp.method_ref(owner, name, descriptor, interface);
                    bytecode.push(*opcode);
                    push_u16(&mut bytecode, index);
                    if interface {
                        bytecode.extend_from_slice(&[1, 0]);
                    }
                }
                Op::Field {
                    opcode,
                    owner,
                    name,
                    descriptor,
                } => {
                    let index = cp.field_ref(owner, name, descriptor);
                    bytecode.push(*opcode);
                    push_u16(&mut bytecode, index);
                }
                Op::LdcClass(name) => {
                    let index = cp.class(name);
                    bytecode.push(LDC_W);
                    push_u16(&mut bytecode, index);
                }
                Op::LdcString(units) => {
                    let index = cp.string(units);
                    bytecode.push(LDC_W);
                    push_u16(&mut bytecode, index);
                }
                Op::InvokeDynamic {
                    name,
                    descriptor,
                    handles,
                } => {
                    let metafactory = cp.method_ref(
                        "java/lang/invoke/LambdaMetafactory",
                        "metafactory",
                        "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;\
                         Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodType;\
                         Ljava/lang/invoke/MethodHandle;Ljava/lang/invoke/MethodType;)\
                         Ljava/lang/invoke/CallSite;",
                        false,
                    );
                    let bootstrap = cp.method_handle(6, metafactory);
                    let mut arguments = vec![cp.method_type("()V")];
                    for handle in handles {
                        let reference = if handle.is_field() {
                            cp.field_ref(&handle.owner, &handle.name, &handle.descriptor)
                        } else {
                            cp.method_ref(
                                &handle.owner,
                                &handle.name,
                                &handle.descriptor,
                                handle.interface,
                            )
                        };
                        arguments.push(cp.method_handle(handle.kind, reference));
                    }
                    let bootstrap_index = bootstrap_methods.len() as u16;
                    bootstrap_methods.push((bootstrap, arguments));

                    let index = cp.invoke_dynamic(bootstrap_index, name, descriptor);
                    bytecode.push(INVOKEDYNAMIC);
                    push_u16(&mut bytecode, index);
                    bytecode.extend_from_slice(&[0, 0]);
                }
            }
        }

        let mut attribute = Vec::new();
        push_u16(&mut attribute, 8); // max_stack
        push_u16(&mut attribute, 8); // max_locals
        push_u32(&mut attribute, bytecode.len() as u32);
        attribute.extend_from_slice(&bytecode);

        push_u16(&mut attribute, self.handlers.len() as u16);
        for handler in &self.handlers {
            push_u16(&mut attribute, handler.start_pc);
            push_u16(&mut attribute, handler.end_pc);
            push_u16(&mut attribute, handler.handler_pc);
            let catch_type = handler.catch_type.as_deref().map_or(0, |name| cp.class(name));
            push_u16(&mut attribute, catch_type);
        }

        if self.lines.is_empty() {
            push_u16(&mut attribute, 0);
        } else {
            push_u16(&mut attribute, 1);
            push_u16(&mut attribute, cp.utf8("LineNumberTable"));
            push_u32(&mut attribute, 2 + self.lines.len() as u32 * 4);
            push_u16(&mut attribute, self.lines.len() as u16);
            for (start_pc, line) in &self.lines {
                push_u16(&mut attribute, *start_pc);
                push_u16(&mut attribute, *line);
            }
        }

        attribute
    }
}

#[derive(Debug, Clone)]
struct MethodDef {
    access_flags: u16,
    name: String,
    descriptor: String,
    code: Option<CodeBuilder>,
}

/// Assembles a complete class file.
///
/// ```
/// use abi_test_utils::{ClassFileBuilder, CodeBuilder, ACC_PUBLIC};
///
/// let bytes = ClassFileBuilder::new("com/example/Caller")
///     .method(
///         ACC_PUBLIC,
///         "run",
///         "()V",
///         CodeBuilder::new()
///             .line(10)
///             .invoke_static("com/example/Target", "method", "()V")
///             .return_void(),
///     )
///     .build();
/// assert_eq!(&bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
/// ```
#[derive(Debug, Clone)]
pub struct ClassFileBuilder {
    access_flags: u16,
    name: String,
    super_class: Option<String>,
    interfaces: Vec<String>,
    fields: Vec<(u16, String, String)>,
    methods: Vec<MethodDef>,
}

impl ClassFileBuilder {
    /// A public class extending `java/lang/Object`.
    pub fn new(internal_name: &str) -> Self {
        Self {
            access_flags: ACC_PUBLIC | ACC_SUPER,
            name: internal_name.to_owned(),
            super_class: Some("java/lang/Object".to_owned()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn interface(internal_name: &str) -> Self {
        Self::new(internal_name).access(ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT)
    }

    pub fn access(mut self, access_flags: u16) -> Self {
        self.access_flags = access_flags;
        self
    }

    pub fn extends(mut self, super_class: &str) -> Self {
        self.super_class = Some(super_class.to_owned());
        self
    }

    /// Only `java/lang/Object` has no superclass.
    pub fn without_super(mut self) -> Self {
        self.super_class = None;
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_owned());
        self
    }

    pub fn field(mut self, access_flags: u16, name: &str, descriptor: &str) -> Self {
        self.fields
            .push((access_flags, name.to_owned(), descriptor.to_owned()));
        self
    }

    pub fn method(
        mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        code: CodeBuilder,
    ) -> Self {
        self.methods.push(MethodDef {
            access_flags,
            name: name.to_owned(),
            descriptor: descriptor.to_owned(),
            code: Some(code),
        });
        self
    }

    pub fn abstract_method(mut self, access_flags: u16, name: &str, descriptor: &str) -> Self {
        self.methods.push(MethodDef {
            access_flags: access_flags | ACC_ABSTRACT,
            name: name.to_owned(),
            descriptor: descriptor.to_owned(),
            code: None,
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut cp = ConstantPoolBuilder::default();
        let mut bootstrap_methods = Vec::new();
        let mut body = Vec::new();

        push_u16(&mut body, self.access_flags);
        push_u16(&mut body, cp.class(&self.name));
        let super_index = self.super_class.as_deref().map_or(0, |name| cp.class(name));
        push_u16(&mut body, super_index);

        push_u16(&mut body, self.interfaces.len() as u16);
        for interface in &self.interfaces {
            push_u16(&mut body, cp.class(interface));
        }

        push_u16(&mut body, self.fields.len() as u16);
        for (access_flags, name, descriptor) in &self.fields {
            push_u16(&mut body, *access_flags);
            push_u16(&mut body, cp.utf8(name));
            push_u16(&mut body, cp.utf8(descriptor));
            push_u16(&mut body, 0);
        }

        push_u16(&mut body, self.methods.len() as u16);
        for method in &self.methods {
            push_u16(&mut body, method.access_flags);
            push_u16(&mut body, cp.utf8(&method.name));
            push_u16(&mut body, cp.utf8(&method.descriptor));
            match &method.code {
                Some(code) => {
                    let attribute = code.encode(&mut cp, &mut bootstrap_methods);
                    push_u16(&mut body, 1);
                    push_u16(&mut body, cp.utf8("Code"));
                    push_u32(&mut body, attribute.len() as u32);
                    body.extend_from_slice(&attribute);
                }
                None => push_u16(&mut body, 0),
            }
        }

        if bootstrap_methods.is_empty() {
            push_u16(&mut body, 0);
        } else {
            let mut attribute = Vec::new();
            push_u16(&mut attribute, bootstrap_methods.len() as u16);
            for (method_ref, arguments) in &bootstrap_methods {
                push_u16(&mut attribute, *method_ref);
                push_u16(&mut attribute, arguments.len() as u16);
                for argument in arguments {
                    push_u16(&mut attribute, *argument);
                }
            }
            push_u16(&mut body, 1);
            push_u16(&mut body, cp.utf8("BootstrapMethods"));
            push_u32(&mut body, attribute.len() as u32);
            body.extend_from_slice(&attribute);
        }

        let mut bytes = Vec::with_capacity(body.len() + 256);
        push_u32(&mut bytes, 0xCAFEBABE);
        push_u16(&mut bytes, 0);
        push_u16(&mut bytes, MAJOR_JAVA_17);
        cp.write(&mut bytes);
        bytes.extend_from_slice(&body);
        bytes
    }
}
