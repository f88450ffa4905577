pub const MIN_DOCUMENT_LEN: usize = 5;
pub const MAX_DOCUMENT_SIZE: usize = 16 * 1024 * 1024;
pub const MAX_NESTING_DEPTH: usize = 100;

pub const SUBTYPE_GENERIC: u8 = 0x00;
pub const SUBTYPE_FUNCTION: u8 = 0x01;
pub const SUBTYPE_BINARY_OLD: u8 = 0x02;
pub const SUBTYPE_UUID_OLD: u8 = 0x03;
pub const SUBTYPE_UUID: u8 = 0x04;
pub const SUBTYPE_MD5: u8 = 0x05;
pub const SUBTYPE_USER_DEFINED: u8 = 0x80;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    EndOfObject = 0x00,
    Double = 0x01,
    String = 0x02,
    Document = 0x03,
    Array = 0x04,
    Binary = 0x05,
    Undefined = 0x06,
    ObjectId = 0x07,
    Boolean = 0x08,
    DateTime = 0x09,
    Null = 0x0A,
    Regex = 0x0B,
    DbRef = 0x0C,
    Code = 0x0D,
    Symbol = 0x0E,
    CodeWithScope = 0x0F,
    Int32 = 0x10,
    Timestamp = 0x11,
    Int64 = 0x12,
    MaxKey = 0x7F,
    MinKey = 0xFF,
}

impl ElementType {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::EndOfObject),
            0x01 => Some(Self::Double),
            0x02 => Some(Self::String),
            0x03 => Some(Self::Document),
            0x04 => Some(Self::Array),
            0x05 => Some(Self::Binary),
            0x06 => Some(Self::Undefined),
            0x07 => Some(Self::ObjectId),
            0x08 => Some(Self::Boolean),
            0x09 => Some(Self::DateTime),
            0x0A => Some(Self::Null),
            0x0B => Some(Self::Regex),
            0x0C => Some(Self::DbRef),
            0x0D => Some(Self::Code),
            0x0E => Some(Self::Symbol),
            0x0F => Some(Self::CodeWithScope),
            0x10 => Some(Self::Int32),
            0x11 => Some(Self::Timestamp),
            0x12 => Some(Self::Int64),
            0x7F => Some(Self::MaxKey),
            0xFF => Some(Self::MinKey),
            _ => None,
        }
    }

    pub fn is_string_like(self) -> bool {
        matches!(self, Self::String | Self::Code | Self::Symbol)
    }

    pub fn is_container(self) -> bool {
        matches!(self, Self::Document | Self::Array)
    }
}
