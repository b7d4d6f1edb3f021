//! Type codes and option flags carried by every node.
//!
//! A type code packs a category into the high nibble and a size or
//! subtype into the low nibble. The string type is the one exception and
//! uses the fixed code `0x81`.

use std::fmt;

/// Semantic type tag of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeCode(u8);

impl TypeCode {
    /// Unsigned integer category.
    pub const CATEGORY_UINT: u8 = 0x00;
    /// Signed integer category.
    pub const CATEGORY_INT: u8 = 0x10;
    /// Floating point category.
    pub const CATEGORY_FLOAT: u8 = 0x20;
    /// Enumeration category.
    pub const CATEGORY_ENUM: u8 = 0x30;
    /// Composed (struct) category.
    pub const CATEGORY_COMPOSED: u8 = 0x40;

    /// 8 bit unsigned integer.
    pub const UINT8: TypeCode = TypeCode(Self::CATEGORY_UINT | 0x01);
    /// 16 bit unsigned integer.
    pub const UINT16: TypeCode = TypeCode(Self::CATEGORY_UINT | 0x02);
    /// 32 bit unsigned integer.
    pub const UINT32: TypeCode = TypeCode(Self::CATEGORY_UINT | 0x04);
    /// 64 bit unsigned integer.
    pub const UINT64: TypeCode = TypeCode(Self::CATEGORY_UINT | 0x08);
    /// 8 bit signed integer.
    pub const INT8: TypeCode = TypeCode(Self::CATEGORY_INT | 0x01);
    /// 16 bit signed integer.
    pub const INT16: TypeCode = TypeCode(Self::CATEGORY_INT | 0x02);
    /// 32 bit signed integer.
    pub const INT32: TypeCode = TypeCode(Self::CATEGORY_INT | 0x04);
    /// 64 bit signed integer.
    pub const INT64: TypeCode = TypeCode(Self::CATEGORY_INT | 0x08);
    /// 32 bit float.
    pub const FLOAT32: TypeCode = TypeCode(Self::CATEGORY_FLOAT | 0x04);
    /// 64 bit float.
    pub const FLOAT64: TypeCode = TypeCode(Self::CATEGORY_FLOAT | 0x08);
    /// 8 bit enumeration.
    pub const ENUM8: TypeCode = TypeCode(Self::CATEGORY_ENUM | 0x01);
    /// Struct of child nodes.
    pub const STRUCT: TypeCode = TypeCode(Self::CATEGORY_COMPOSED | 0x02);
    /// Text value.
    pub const STRING: TypeCode = TypeCode(0x81);

    /// Wraps a raw code. Any byte is representable; validity is checked by [`kind`](Self::kind).
    pub const fn new(code: u8) -> Self {
        Self(code)
    }

    /// Returns the raw code.
    pub const fn code(self) -> u8 {
        self.0
    }

    /// Returns the category nibble.
    pub const fn category(self) -> u8 {
        self.0 & 0xF0
    }

    /// Classifies the code into a base type.
    pub fn base_type(self) -> BaseType {
        if self == Self::STRING {
            return BaseType::String;
        }
        match self.category() {
            Self::CATEGORY_ENUM => BaseType::Enum,
            Self::CATEGORY_INT => BaseType::Int,
            Self::CATEGORY_UINT => BaseType::Uint,
            Self::CATEGORY_FLOAT => BaseType::Float,
            Self::CATEGORY_COMPOSED => BaseType::Struct,
            _ => BaseType::Invalid,
        }
    }

    /// Returns the node variant constructed for this code, or `None` if
    /// the code is not one of the known subtypes.
    pub fn kind(self) -> Option<NodeKind> {
        match self {
            Self::UINT8 | Self::UINT16 | Self::UINT32 | Self::UINT64 => Some(NodeKind::Number),
            Self::INT8 | Self::INT16 | Self::INT32 | Self::INT64 => Some(NodeKind::Number),
            Self::FLOAT32 | Self::FLOAT64 => Some(NodeKind::Number),
            Self::ENUM8 => Some(NodeKind::Enum),
            Self::STRUCT => Some(NodeKind::Struct),
            Self::STRING => Some(NodeKind::String),
            _ => None,
        }
    }
}

impl From<u8> for TypeCode {
    fn from(code: u8) -> Self {
        Self(code)
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

/// Coarse classification of a type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    /// Signed integer.
    Int,
    /// Unsigned integer.
    Uint,
    /// Floating point.
    Float,
    /// Enumeration.
    Enum,
    /// Struct.
    Struct,
    /// Text.
    String,
    /// Unknown category.
    Invalid,
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BaseType::Int => "int",
            BaseType::Uint => "uint",
            BaseType::Float => "float",
            BaseType::Enum => "enum",
            BaseType::Struct => "struct",
            BaseType::String => "string",
            BaseType::Invalid => "invalid",
        };
        f.write_str(name)
    }
}

/// Node variant selected once at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Finite numeric leaf.
    Number,
    /// Enumeration leaf.
    Enum,
    /// Text leaf.
    String,
    /// Struct holding ordered children.
    Struct,
}

bitflags::bitflags! {
    /// Option bitset of a node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeOptions: u8 {
        /// The value must not be edited locally.
        const READONLY = 0x01;
        /// Bits holding the show mode.
        const SHOW_MASK = 0x0E;
        /// The node has further details on the device.
        const FURTHER = 0x20;
        /// The node is flagged as important.
        const IMPORTANT = 0x40;
        /// The device persists the value.
        const SAVEVAL = 0x80;
    }
}

impl NodeOptions {
    /// Returns true if the readonly flag is set.
    pub fn readonly(self) -> bool {
        self.contains(NodeOptions::READONLY)
    }

    /// Decodes the show mode bits. Unassigned bit patterns return `None`.
    pub fn show_mode(self) -> Option<ShowMode> {
        match self.bits() & NodeOptions::SHOW_MASK.bits() {
            0x00 => Some(ShowMode::TimeAbsolute),
            0x02 => Some(ShowMode::TimeRelative),
            0x04 => Some(ShowMode::Hex),
            0x06 => Some(ShowMode::Bin),
            0x08 => Some(ShowMode::String),
            _ => None,
        }
    }
}

/// How a value prefers to be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShowMode {
    /// Absolute timestamp.
    TimeAbsolute,
    /// Relative duration.
    TimeRelative,
    /// Hexadecimal integer.
    Hex,
    /// Binary integer.
    Bin,
    /// Plain string.
    String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_map_to_variants() {
        assert_eq!(TypeCode::new(0x01).kind(), Some(NodeKind::Number));
        assert_eq!(TypeCode::new(0x18).kind(), Some(NodeKind::Number));
        assert_eq!(TypeCode::new(0x24).kind(), Some(NodeKind::Number));
        assert_eq!(TypeCode::new(0x31).kind(), Some(NodeKind::Enum));
        assert_eq!(TypeCode::new(0x42).kind(), Some(NodeKind::Struct));
        assert_eq!(TypeCode::new(0x81).kind(), Some(NodeKind::String));
    }

    #[test]
    fn unknown_codes_have_no_variant() {
        assert_eq!(TypeCode::new(0x03).kind(), None);
        assert_eq!(TypeCode::new(0x32).kind(), None);
        assert_eq!(TypeCode::new(0x99).kind(), None);
    }

    #[test]
    fn base_type_classification() {
        assert_eq!(TypeCode::UINT16.base_type(), BaseType::Uint);
        assert_eq!(TypeCode::INT64.base_type(), BaseType::Int);
        assert_eq!(TypeCode::FLOAT32.base_type(), BaseType::Float);
        assert_eq!(TypeCode::ENUM8.base_type(), BaseType::Enum);
        assert_eq!(TypeCode::STRUCT.base_type(), BaseType::Struct);
        assert_eq!(TypeCode::STRING.base_type(), BaseType::String);
        assert_eq!(TypeCode::new(0x91).base_type(), BaseType::Invalid);
        assert_eq!(BaseType::Uint.to_string(), "uint");
    }

    #[test]
    fn option_flags() {
        let opts = NodeOptions::from_bits_retain(0x01 | 0x04 | 0x80);
        assert!(opts.readonly());
        assert!(opts.contains(NodeOptions::SAVEVAL));
        assert!(!opts.contains(NodeOptions::IMPORTANT));
        assert_eq!(opts.show_mode(), Some(ShowMode::Hex));

        assert_eq!(NodeOptions::empty().show_mode(), Some(ShowMode::TimeAbsolute));
        assert_eq!(NodeOptions::from_bits_retain(0x06).show_mode(), Some(ShowMode::Bin));
        assert_eq!(NodeOptions::from_bits_retain(0x0E).show_mode(), None);
    }
}
