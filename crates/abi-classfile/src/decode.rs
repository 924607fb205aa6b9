use std::collections::{BTreeMap, BTreeSet, HashSet};

use abi_model::{
    CallSite, ClassType, DeclaredClass, DeclaredMethod, FieldDescriptor, FieldReference,
    MethodDescriptor, MethodReference, TypeDescriptor,
};

use crate::classfile::{ClassFile, ClassMember, Code};
use crate::code::{Instruction, Instructions, GETSTATIC, INVOKESTATIC, PUTSTATIC};
use crate::constant_pool::CpInfo;
use crate::error::{Error, Result};

/// Owners whose methods are signature-polymorphic intrinsics: the class file
/// declares them with a single `(Object[])Object` shape, so call sites can
/// never be matched against a declaration.
pub const DEFAULT_UNVERIFIABLE_OWNERS: &[&str] =
    &["java/lang/invoke/MethodHandle", "java/lang/invoke/VarHandle"];

const REF_GET_FIELD: u8 = 1;
const REF_GET_STATIC: u8 = 2;
const REF_PUT_FIELD: u8 = 3;
const REF_PUT_STATIC: u8 = 4;
const REF_INVOKE_VIRTUAL: u8 = 5;
const REF_INVOKE_STATIC: u8 = 6;
const REF_INVOKE_SPECIAL: u8 = 7;
const REF_NEW_INVOKE_SPECIAL: u8 = 8;
const REF_INVOKE_INTERFACE: u8 = 9;

/// Turns class-file bytes into a [`DeclaredClass`].
#[derive(Debug, Clone)]
pub struct ClassDecoder {
    unverifiable_owners: HashSet<String>,
}

impl Default for ClassDecoder {
    fn default() -> Self {
        Self::with_unverifiable_owners(DEFAULT_UNVERIFIABLE_OWNERS.iter().copied())
    }
}

impl ClassDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the set of call-target owners (internal names) whose member
    /// references are dropped at decode time.
    pub fn with_unverifiable_owners<I, S>(owners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unverifiable_owners: owners.into_iter().map(Into::into).collect(),
        }
    }

    pub fn unverifiable_owners(&self) -> impl Iterator<Item = &str> {
        self.unverifiable_owners.iter().map(String::as_str)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<DeclaredClass> {
        let class = ClassFile::parse(bytes)?;
        self.declare(&class)
    }

    pub fn declare(&self, class: &ClassFile) -> Result<DeclaredClass> {
        let name = ClassType::from_class_name(&class.this_class)?;

        let mut parents = Vec::with_capacity(class.interfaces.len() + 1);
        if let Some(super_class) = &class.super_class {
            parents.push(ClassType::from_class_name(super_class)?);
        }
        for interface in &class.interfaces {
            parents.push(ClassType::from_class_name(interface)?);
        }

        let mut fields = BTreeMap::new();
        for field in &class.fields {
            let descriptor =
                FieldDescriptor::new(TypeDescriptor::parse(&field.descriptor)?, field.name.as_str());
            let reference = FieldReference::new(name.clone(), descriptor.clone(), field.is_static());
            fields.insert(descriptor, reference);
        }

        let mut loaded_classes = BTreeSet::new();
        let mut methods = BTreeMap::new();
        for method in &class.methods {
            let declared = MethodScan {
                decoder: self,
                class,
                owner: &name,
                loaded_classes: &mut loaded_classes,
            }
            .scan(method)?;

            let descriptor = declared.descriptor().clone();
            if methods.insert(descriptor.clone(), declared).is_some() {
                return Err(Error::DuplicateMethodSignature {
                    class: name.to_string(),
                    method: descriptor.to_string(),
                });
            }
        }

        Ok(DeclaredClass::new(name, parents, loaded_classes, methods, fields))
    }

    fn is_verifiable_owner(&self, owner: &str) -> bool {
        !owner.starts_with('[') && !self.unverifiable_owners.contains(owner)
    }
}

/// State for analysing one method body.
struct MethodScan<'a> {
    decoder: &'a ClassDecoder,
    class: &'a ClassFile,
    owner: &'a ClassType,
    loaded_classes: &'a mut BTreeSet<ClassType>,
}

#[derive(Default)]
struct References {
    method_calls: BTreeSet<CallSite<MethodReference>>,
    field_accesses: BTreeSet<CallSite<FieldReference>>,
}

impl MethodScan<'_> {
    fn scan(mut self, method: &ClassMember) -> Result<DeclaredMethod> {
        let descriptor = MethodDescriptor::from_descriptor(&method.descriptor, method.name.as_str())?;
        let reference = MethodReference::new(self.owner.clone(), descriptor, method.is_static());

        let mut references = References::default();
        if let Some(code) = &method.code {
            self.scan_code(code, &mut references)?;
        }

        Ok(DeclaredMethod::new(
            reference,
            references.method_calls,
            references.field_accesses,
        ))
    }

    fn scan_code(&mut self, code: &Code, references: &mut References) -> Result<()> {
        let class = self.class;
        let cp = &class.constant_pool;

        let mut line_table = code.line_numbers.clone();
        line_table.sort_by_key(|entry| entry.start_pc);
        let mut next_line = line_table.iter().peekable();
        let mut line_number = 0u32;

        for instruction in Instructions::new(&code.bytecode) {
            let (pc, instruction) = instruction?;
            while let Some(entry) = next_line.next_if(|entry| entry.start_pc as usize <= pc) {
                line_number = entry.line_number as u32;
            }

            match instruction {
                Instruction::Invoke { opcode, index } => {
                    let member = cp.get_member_ref(index)?;
                    self.add_method_call(
                        references,
                        member.class_name,
                        member.name,
                        member.descriptor,
                        opcode == INVOKESTATIC,
                        code,
                        pc,
                        line_number,
                    )?;
                }
                Instruction::Field { opcode, index } => {
                    let member = cp.get_member_ref(index)?;
                    self.add_field_access(
                        references,
                        member.class_name,
                        member.name,
                        member.descriptor,
                        opcode == GETSTATIC || opcode == PUTSTATIC,
                        code,
                        pc,
                        line_number,
                    )?;
                }
                Instruction::InvokeDynamic { index } => {
                    self.add_bootstrap_handles(references, index, code, pc, line_number)?;
                }
                Instruction::LoadConstant { index } => {
                    if let CpInfo::Class { name_index } = cp.get(index)? {
                        self.add_loaded_class(cp.get_utf8(*name_index)?)?;
                    }
                }
                Instruction::Other => {}
            }
        }

        Ok(())
    }

    /// Every method handle bound as a static argument of the call site's
    /// bootstrap method becomes a reference of its own.
    fn add_bootstrap_handles(
        &self,
        references: &mut References,
        index: u16,
        code: &Code,
        pc: usize,
        line_number: u32,
    ) -> Result<()> {
        let cp = &self.class.constant_pool;
        let bootstrap_index = match cp.get(index)? {
            CpInfo::InvokeDynamic {
                bootstrap_method_attr_index,
                ..
            } => *bootstrap_method_attr_index,
            _ => return Err(Error::Other("invokedynamic operand is not an InvokeDynamic entry")),
        };
        let bootstrap = self
            .class
            .bootstrap_methods
            .get(bootstrap_index as usize)
            .ok_or(Error::MalformedAttribute("BootstrapMethods"))?;

        for argument in &bootstrap.arguments {
            if !matches!(cp.get(*argument)?, CpInfo::MethodHandle { .. }) {
                continue;
            }
            let (kind, reference_index) = cp.get_method_handle(*argument)?;
            let member = cp.get_member_ref(reference_index)?;
            let is_static = matches!(kind, REF_GET_STATIC | REF_PUT_STATIC | REF_INVOKE_STATIC);
            match kind {
                REF_GET_FIELD | REF_GET_STATIC | REF_PUT_FIELD | REF_PUT_STATIC => {
                    self.add_field_access(
                        references,
                        member.class_name,
                        member.name,
                        member.descriptor,
                        is_static,
                        code,
                        pc,
                        line_number,
                    )?;
                }
                REF_INVOKE_VIRTUAL | REF_INVOKE_STATIC | REF_INVOKE_SPECIAL
                | REF_NEW_INVOKE_SPECIAL | REF_INVOKE_INTERFACE => {
                    self.add_method_call(
                        references,
                        member.class_name,
                        member.name,
                        member.descriptor,
                        is_static,
                        code,
                        pc,
                        line_number,
                    )?;
                }
                _ => return Err(Error::Other("invalid method handle kind")),
            }
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn add_method_call(
        &self,
        references: &mut References,
        owner: &str,
        name: &str,
        descriptor: &str,
        is_static: bool,
        code: &Code,
        pc: usize,
        line_number: u32,
    ) -> Result<()> {
        if !self.decoder.is_verifiable_owner(owner) {
            return Ok(());
        }
        let reference = MethodReference::new(
            ClassType::from_class_name(owner)?,
            MethodDescriptor::from_descriptor(descriptor, name)?,
            is_static,
        );
        references
            .method_calls
            .insert(CallSite::new(reference, line_number, caught_exceptions(code, pc)?));
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn add_field_access(
        &self,
        references: &mut References,
        owner: &str,
        name: &str,
        descriptor: &str,
        is_static: bool,
        code: &Code,
        pc: usize,
        line_number: u32,
    ) -> Result<()> {
        if !self.decoder.is_verifiable_owner(owner) {
            return Ok(());
        }
        let reference = FieldReference::new(
            ClassType::from_class_name(owner)?,
            FieldDescriptor::new(TypeDescriptor::parse(descriptor)?, name),
            is_static,
        );
        references
            .field_accesses
            .insert(CallSite::new(reference, line_number, caught_exceptions(code, pc)?));
        Ok(())
    }

    /// Records the class named by a `Class` constant; array constants record
    /// their element class and primitive arrays record nothing.
    fn add_loaded_class(&mut self, internal_name: &str) -> Result<()> {
        let loaded = if internal_name.starts_with('[') {
            TypeDescriptor::parse(internal_name)?.element_class().cloned()
        } else {
            Some(ClassType::from_class_name(internal_name)?)
        };
        if let Some(loaded) = loaded {
            self.loaded_classes.insert(loaded);
        }
        Ok(())
    }
}

fn caught_exceptions(code: &Code, pc: usize) -> Result<BTreeSet<ClassType>> {
    code.exception_table
        .iter()
        .filter(|handler| handler.covers(pc))
        .filter_map(|handler| handler.catch_type.as_deref())
        .map(|catch_type| ClassType::from_class_name(catch_type).map_err(Error::from))
        .collect()
}
