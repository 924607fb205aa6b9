use crate::constant_pool::ConstantPool;
use crate::error::{Error, Result};
use crate::reader::Reader;

pub(crate) const ACC_STATIC: u16 = 0x0008;

/// Structural view of a class file: names are kept in internal (`/`) form and
/// nothing beyond what linkage checking needs is retained.
#[derive(Debug, Clone)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub access_flags: u16,
    pub this_class: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<ClassMember>,
    pub methods: Vec<ClassMember>,
    pub(crate) bootstrap_methods: Vec<BootstrapMethod>,
    pub(crate) constant_pool: ConstantPool,
}

#[derive(Debug, Clone)]
pub struct ClassMember {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    /// Present for methods that are neither `abstract` nor `native`.
    pub code: Option<Code>,
}

impl ClassMember {
    pub fn is_static(&self) -> bool {
        self.access_flags & ACC_STATIC != 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct Code {
    pub bytecode: Vec<u8>,
    pub exception_table: Vec<ExceptionHandler>,
    pub line_numbers: Vec<LineNumber>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionHandler {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// `None` for `finally` handlers.
    pub catch_type: Option<String>,
}

impl ExceptionHandler {
    pub fn covers(&self, pc: usize) -> bool {
        (self.start_pc as usize) <= pc && pc < (self.end_pc as usize)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumber {
    pub start_pc: u16,
    pub line_number: u16,
}

#[derive(Debug, Clone)]
pub(crate) struct BootstrapMethod {
    pub(crate) arguments: Vec<u16>,
}

impl ClassFile {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let magic = reader.read_u4()?;
        if magic != 0xCAFEBABE {
            return Err(Error::InvalidMagic(magic));
        }

        let minor_version = reader.read_u2()?;
        let major_version = reader.read_u2()?;
        let cp = ConstantPool::parse(&mut reader)?;

        let access_flags = reader.read_u2()?;
        let this_class = cp.get_class_name(reader.read_u2()?)?.to_string();
        let super_class_idx = reader.read_u2()?;
        let super_class = if super_class_idx == 0 {
            None
        } else {
            Some(cp.get_class_name(super_class_idx)?.to_string())
        };

        let interfaces_count = reader.read_u2()? as usize;
        let mut interfaces = Vec::with_capacity(interfaces_count);
        for _ in 0..interfaces_count {
            interfaces.push(cp.get_class_name(reader.read_u2()?)?.to_string());
        }

        let fields_count = reader.read_u2()? as usize;
        let mut fields = Vec::with_capacity(fields_count);
        for _ in 0..fields_count {
            fields.push(parse_member(&mut reader, &cp)?);
        }

        let methods_count = reader.read_u2()? as usize;
        let mut methods = Vec::with_capacity(methods_count);
        for _ in 0..methods_count {
            methods.push(parse_member(&mut reader, &cp)?);
        }

        let mut bootstrap_methods = Vec::new();
        let attributes_count = reader.read_u2()? as usize;
        for _ in 0..attributes_count {
            let name_index = reader.read_u2()?;
            let length = reader.read_u4()? as usize;
            let info = reader.read_bytes(length)?;
            if cp.get_utf8(name_index)? == "BootstrapMethods" {
                let mut sub = Reader::new(info);
                bootstrap_methods = parse_bootstrap_methods(&mut sub)?;
                sub.ensure_empty().map_err(|_| Error::MalformedAttribute("BootstrapMethods"))?;
            }
        }

        reader.ensure_empty()?;

        Ok(Self {
            minor_version,
            major_version,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            bootstrap_methods,
            constant_pool: cp,
        })
    }
}

fn parse_member(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<ClassMember> {
    let access_flags = reader.read_u2()?;
    let name = cp.get_utf8(reader.read_u2()?)?.to_string();
    let descriptor = cp.get_utf8(reader.read_u2()?)?.to_string();

    let mut code = None;
    let attributes_count = reader.read_u2()? as usize;
    for _ in 0..attributes_count {
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let info = reader.read_bytes(length)?;
        if cp.get_utf8(name_index)? == "Code" {
            let mut sub = Reader::new(info);
            code = Some(parse_code(&mut sub, cp)?);
            sub.ensure_empty().map_err(|_| Error::MalformedAttribute("Code"))?;
        }
    }

    Ok(ClassMember {
        access_flags,
        name,
        descriptor,
        code,
    })
}

fn parse_code(reader: &mut Reader<'_>, cp: &ConstantPool) -> Result<Code> {
    let _max_stack = reader.read_u2()?;
    let _max_locals = reader.read_u2()?;
    let code_length = reader.read_u4()? as usize;
    let bytecode = reader.read_bytes(code_length)?.to_vec();

    let exception_table_length = reader.read_u2()? as usize;
    let mut exception_table = Vec::with_capacity(exception_table_length);
    for _ in 0..exception_table_length {
        let start_pc = reader.read_u2()?;
        let end_pc = reader.read_u2()?;
        let handler_pc = reader.read_u2()?;
        let catch_type_idx = reader.read_u2()?;
        let catch_type = if catch_type_idx == 0 {
            None
        } else {
            Some(cp.get_class_name(catch_type_idx)?.to_string())
        };
        exception_table.push(ExceptionHandler {
            start_pc,
            end_pc,
            handler_pc,
            catch_type,
        });
    }

    let mut line_numbers = Vec::new();
    let attributes_count = reader.read_u2()? as usize;
    for _ in 0..attributes_count {
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let info = reader.read_bytes(length)?;
        if cp.get_utf8(name_index)? == "LineNumberTable" {
            let mut sub = Reader::new(info);
            let count = sub.read_u2()? as usize;
            for _ in 0..count {
                line_numbers.push(LineNumber {
                    start_pc: sub.read_u2()?,
                    line_number: sub.read_u2()?,
                });
            }
            sub.ensure_empty().map_err(|_| Error::MalformedAttribute("LineNumberTable"))?;
        }
    }

    Ok(Code {
        bytecode,
        exception_table,
        line_numbers,
    })
}

fn parse_bootstrap_methods(reader: &mut Reader<'_>) -> Result<Vec<BootstrapMethod>> {
    let count = reader.read_u2()? as usize;
    let mut methods = Vec::with_capacity(count);
    for _ in 0..count {
        let _method_ref = reader.read_u2()?;
        let num_arguments = reader.read_u2()? as usize;
        let mut arguments = Vec::with_capacity(num_arguments);
        for _ in 0..num_arguments {
            arguments.push(reader.read_u2()?);
        }
        methods.push(BootstrapMethod { arguments });
    }
    Ok(methods)
}
