use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::error::{ModelError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveType {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Boolean,
    Char,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 8] = [
        PrimitiveType::Byte,
        PrimitiveType::Short,
        PrimitiveType::Int,
        PrimitiveType::Long,
        PrimitiveType::Float,
        PrimitiveType::Double,
        PrimitiveType::Boolean,
        PrimitiveType::Char,
    ];

    /// The one-character descriptor code (`I` for `int`).
    pub fn raw(self) -> char {
        match self {
            PrimitiveType::Byte => 'B',
            PrimitiveType::Short => 'S',
            PrimitiveType::Int => 'I',
            PrimitiveType::Long => 'J',
            PrimitiveType::Float => 'F',
            PrimitiveType::Double => 'D',
            PrimitiveType::Boolean => 'Z',
            PrimitiveType::Char => 'C',
        }
    }

    /// The Java source spelling (`int`).
    pub fn pretty(self) -> &'static str {
        match self {
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Char => "char",
        }
    }

    pub fn from_raw(raw: char) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.raw() == raw)
    }
}

/// A fully qualified class name in dotted form.
///
/// Cloning is cheap; the name is shared.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassType(Arc<str>);

impl ClassType {
    /// Build a class type from either an internal (`foo/Bar`) or a dotted
    /// (`foo.Bar`) name.
    ///
    /// Inputs that are still descriptors (`Lfoo/Bar;`) are rejected.
    pub fn from_class_name(name: &str) -> Result<Self> {
        if name.is_empty() || name.ends_with(';') {
            return Err(ModelError::MalformedClassName(name.to_owned()));
        }
        if name.contains('/') {
            Ok(Self(Arc::from(name.replace('/', "."))))
        } else {
            Ok(Self(Arc::from(name)))
        }
    }

    /// Build a class type from an archive entry or root-relative file name
    /// (`foo/Bar.class`).
    ///
    /// Multi-release prefixes must be stripped by the caller.
    pub fn from_class_filename(filename: &str) -> Result<Self> {
        if filename.starts_with("META-INF/versions") {
            return Err(ModelError::MalformedClassName(filename.to_owned()));
        }
        let name = filename.strip_suffix(".class").unwrap_or(filename);
        Self::from_class_name(name)
    }

    pub fn class_name(&self) -> &str {
        &self.0
    }

    /// `java/lang/String`
    pub fn internal_name(&self) -> String {
        self.0.replace('.', "/")
    }

    /// `java/lang/String.class`
    pub fn class_file_path(&self) -> String {
        format!("{}.class", self.internal_name())
    }
}

impl fmt::Display for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassType({:?})", &*self.0)
    }
}

impl Serialize for ClassType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArrayType {
    element: Box<TypeDescriptor>,
    dimensions: u8,
}

impl ArrayType {
    /// The element must be a primitive or class type and there must be at least
    /// one dimension.
    pub fn new(element: TypeDescriptor, dimensions: u8) -> Result<Self> {
        let valid_element = matches!(
            element,
            TypeDescriptor::Primitive(_) | TypeDescriptor::Class(_)
        );
        if dimensions == 0 || !valid_element {
            let raw = format!("{}{}", "[".repeat(dimensions as usize), element.to_raw());
            return Err(ModelError::MalformedDescriptor(raw));
        }
        Ok(Self {
            element: Box::new(element),
            dimensions,
        })
    }

    pub fn element(&self) -> &TypeDescriptor {
        &self.element
    }

    pub fn dimensions(&self) -> u8 {
        self.dimensions
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeDescriptor {
    Primitive(PrimitiveType),
    Class(ClassType),
    Array(ArrayType),
    Void,
}

impl TypeDescriptor {
    /// Parse one complete field (or `V`) descriptor.
    pub fn parse(raw: &str) -> Result<Self> {
        match split_type(raw, true) {
            Some((ty, "")) => Ok(ty),
            _ => Err(ModelError::MalformedDescriptor(raw.to_owned())),
        }
    }

    pub fn as_class(&self) -> Option<&ClassType> {
        match self {
            TypeDescriptor::Class(class) => Some(class),
            _ => None,
        }
    }

    /// The class an array ultimately holds, or the class itself.
    pub fn element_class(&self) -> Option<&ClassType> {
        match self {
            TypeDescriptor::Class(class) => Some(class),
            TypeDescriptor::Array(array) => array.element.as_class(),
            TypeDescriptor::Primitive(_) | TypeDescriptor::Void => None,
        }
    }

    /// Render back into descriptor form (`[Ljava/lang/String;`).
    pub fn to_raw(&self) -> String {
        let mut out = String::new();
        self.render_raw(&mut out);
        out
    }

    fn render_raw(&self, out: &mut String) {
        match self {
            TypeDescriptor::Primitive(p) => out.push(p.raw()),
            TypeDescriptor::Class(class) => {
                out.push('L');
                out.push_str(&class.internal_name());
                out.push(';');
            }
            TypeDescriptor::Array(array) => {
                for _ in 0..array.dimensions {
                    out.push('[');
                }
                array.element.render_raw(out);
            }
            TypeDescriptor::Void => out.push('V'),
        }
    }
}

impl From<ClassType> for TypeDescriptor {
    fn from(value: ClassType) -> Self {
        TypeDescriptor::Class(value)
    }
}

impl From<PrimitiveType> for TypeDescriptor {
    fn from(value: PrimitiveType) -> Self {
        TypeDescriptor::Primitive(value)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Primitive(p) => f.write_str(p.pretty()),
            TypeDescriptor::Class(class) => fmt::Display::fmt(class, f),
            TypeDescriptor::Array(array) => {
                fmt::Display::fmt(&array.element, f)?;
                for _ in 0..array.dimensions {
                    f.write_str("[]")?;
                }
                Ok(())
            }
            TypeDescriptor::Void => f.write_str("void"),
        }
    }
}

impl Serialize for TypeDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Split the leading type off `input`, returning it with the unparsed rest.
///
/// `V` is only accepted when `allow_void` is set and there are no array
/// dimensions.
pub(crate) fn split_type(input: &str, allow_void: bool) -> Option<(TypeDescriptor, &str)> {
    let dimensions = input.bytes().take_while(|b| *b == b'[').count();
    let rest = &input[dimensions..];
    let tag = rest.chars().next()?;

    let (simple, rest) = match tag {
        'V' if allow_void && dimensions == 0 => (TypeDescriptor::Void, &rest[1..]),
        'L' => {
            let end = rest.find(';')?;
            let class = ClassType::from_class_name(&rest[1..end]).ok()?;
            (TypeDescriptor::Class(class), &rest[end + 1..])
        }
        other => {
            let primitive = PrimitiveType::from_raw(other)?;
            (TypeDescriptor::Primitive(primitive), &rest[other.len_utf8()..])
        }
    };

    if dimensions == 0 {
        return Some((simple, rest));
    }
    let dimensions = u8::try_from(dimensions).ok()?;
    let array = ArrayType::new(simple, dimensions).ok()?;
    Some((TypeDescriptor::Array(array), rest))
}
