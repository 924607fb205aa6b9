use std::collections::{BTreeMap, BTreeSet};

use crate::field::{FieldDescriptor, FieldReference};
use crate::method::{MethodDescriptor, MethodReference};
use crate::reference::CallSite;
use crate::types::ClassType;

/// A method defined by a class, with the references its body makes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredMethod {
    reference: MethodReference,
    method_calls: BTreeSet<CallSite<MethodReference>>,
    field_accesses: BTreeSet<CallSite<FieldReference>>,
}

impl DeclaredMethod {
    pub fn new(
        reference: MethodReference,
        method_calls: BTreeSet<CallSite<MethodReference>>,
        field_accesses: BTreeSet<CallSite<FieldReference>>,
    ) -> Self {
        Self {
            reference,
            method_calls,
            field_accesses,
        }
    }

    pub fn reference(&self) -> &MethodReference {
        &self.reference
    }

    pub fn descriptor(&self) -> &MethodDescriptor {
        self.reference.descriptor()
    }

    pub fn is_static(&self) -> bool {
        self.reference.is_static()
    }

    pub fn method_calls(&self) -> &BTreeSet<CallSite<MethodReference>> {
        &self.method_calls
    }

    pub fn field_accesses(&self) -> &BTreeSet<CallSite<FieldReference>> {
        &self.field_accesses
    }
}

/// The linker-relevant surface of one class file.
///
/// `parents` lists the superclass first (when present) followed by the
/// directly implemented interfaces in declaration order. `loaded_classes`
/// holds every class the body refers to in a way that requires loading it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredClass {
    name: ClassType,
    parents: Vec<ClassType>,
    loaded_classes: BTreeSet<ClassType>,
    methods: BTreeMap<MethodDescriptor, DeclaredMethod>,
    fields: BTreeMap<FieldDescriptor, FieldReference>,
}

impl DeclaredClass {
    pub fn new(
        name: ClassType,
        parents: Vec<ClassType>,
        loaded_classes: BTreeSet<ClassType>,
        methods: BTreeMap<MethodDescriptor, DeclaredMethod>,
        fields: BTreeMap<FieldDescriptor, FieldReference>,
    ) -> Self {
        Self {
            name,
            parents,
            loaded_classes,
            methods,
            fields,
        }
    }

    pub fn name(&self) -> &ClassType {
        &self.name
    }

    pub fn parents(&self) -> &[ClassType] {
        &self.parents
    }

    pub fn loaded_classes(&self) -> &BTreeSet<ClassType> {
        &self.loaded_classes
    }

    pub fn methods(&self) -> &BTreeMap<MethodDescriptor, DeclaredMethod> {
        &self.methods
    }

    pub fn fields(&self) -> &BTreeMap<FieldDescriptor, FieldReference> {
        &self.fields
    }

    pub fn method(&self, descriptor: &MethodDescriptor) -> Option<&DeclaredMethod> {
        self.methods.get(descriptor)
    }

    pub fn field(&self, descriptor: &FieldDescriptor) -> Option<&FieldReference> {
        self.fields.get(descriptor)
    }
}
