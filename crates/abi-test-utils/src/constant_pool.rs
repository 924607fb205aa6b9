use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Entry {
    Utf8(Vec<u8>),
    Class(u16),
    String(u16),
    NameAndType(u16, u16),
    Fieldref(u16, u16),
    Methodref(u16, u16),
    InterfaceMethodref(u16, u16),
    MethodHandle(u8, u16),
    MethodType(u16),
    InvokeDynamic(u16, u16),
}

/// Deduplicating constant pool writer.
#[derive(Debug, Default)]
pub(crate) struct ConstantPoolBuilder {
    entries: Vec<Entry>,
    lookup: HashMap<Entry, u16>,
}

impl ConstantPoolBuilder {
    fn intern(&mut self, entry: Entry) -> u16 {
        if let Some(index) = self.lookup.get(&entry) {
            return *index;
        }
        self.entries.push(entry.clone());
        let index = self.entries.len() as u16;
        self.lookup.insert(entry, index);
        index
    }

    pub(crate) fn utf8(&mut self, value: &str) -> u16 {
        let units: Vec<u16> = value.encode_utf16().collect();
        self.intern(Entry::Utf8(modified_utf8(&units)))
    }

    /// A `CONSTANT_String` whose text is given as raw UTF-16 units, so
    /// unpaired surrogates can be written.
    pub(crate) fn string(&mut self, units: &[u16]) -> u16 {
        let value = self.intern(Entry::Utf8(modified_utf8(units)));
        self.intern(Entry::String(value))
    }

    pub(crate) fn class(&mut self, internal_name: &str) -> u16 {
        let name = self.utf8(internal_name);
        self.intern(Entry::Class(name))
    }

    fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        self.intern(Entry::NameAndType(name, descriptor))
    }

    pub(crate) fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(owner);
        let nat = self.name_and_type(name, descriptor);
        self.intern(Entry::Fieldref(class, nat))
    }

    pub(crate) fn method_ref(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
        interface: bool,
    ) -> u16 {
        let class = self.class(owner);
        let nat = self.name_and_type(name, descriptor);
        if interface {
            self.intern(Entry::InterfaceMethodref(class, nat))
        } else {
            self.intern(Entry::Methodref(class, nat))
        }
    }

    pub(crate) fn method_handle(&mut self, kind: u8, reference: u16) -> u16 {
        self.intern(Entry::MethodHandle(kind, reference))
    }

    pub(crate) fn method_type(&mut self, descriptor: &str) -> u16 {
        let descriptor = self.utf8(descriptor);
        self.intern(Entry::MethodType(descriptor))
    }

    pub(crate) fn invoke_dynamic(&mut self, bootstrap: u16, name: &str, descriptor: &str) -> u16 {
        let nat = self.name_and_type(name, descriptor);
        self.intern(Entry::InvokeDynamic(bootstrap, nat))
    }

    pub(crate) fn write(&self, out: &mut Vec<u8>) {
        push_u16(out, self.entries.len() as u16 + 1);
        for entry in &self.entries {
            match entry {
                Entry::Utf8(bytes) => {
                    out.push(1);
                    push_u16(out, bytes.len() as u16);
                    out.extend_from_slice(bytes);
                }
                Entry::Class(name) => {
                    out.push(7);
                    push_u16(out, *name);
                }
                Entry::String(value) => {
                    out.push(8);
                    push_u16(out, *value);
                }
                Entry::NameAndType(name, descriptor) => {
                    out.push(12);
                    push_u16(out, *name);
                    push_u16(out, *descriptor);
                }
                Entry::Fieldref(class, nat) => {
                    out.push(9);
                    push_u16(out, *class);
                    push_u16(out, *nat);
                }
                Entry::Methodref(class, nat) => {
                    out.push(10);
                    push_u16(out, *class);
                    push_u16(out, *nat);
                }
                Entry::InterfaceMethodref(class, nat) => {
                    out.push(11);
                    push_u16(out, *class);
                    push_u16(out, *nat);
                }
                Entry::MethodHandle(kind, reference) => {
                    out.push(15);
                    out.push(*kind);
                    push_u16(out, *reference);
                }
                Entry::MethodType(descriptor) => {
                    out.push(16);
                    push_u16(out, *descriptor);
                }
                Entry::InvokeDynamic(bootstrap, nat) => {
                    out.push(18);
                    push_u16(out, *bootstrap);
                    push_u16(out, *nat);
                }
            }
        }
    }
}

fn modified_utf8(units: &[u16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(units.len());
    for &unit in units {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

pub(crate) fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub(crate) fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}
