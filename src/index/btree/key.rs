//! Index keys and their on-page encoding.

use std::fmt;

use crate::common::{Error, Result};

/// The type of every key in one tree.
///
/// Every type has a fixed encoded width, so a node's capacity depends only
/// on the page size and the key type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// 32-bit signed integer, 4 bytes.
    Int,
    /// 64-bit signed integer, 8 bytes.
    Long,
    /// Boolean, 1 byte.
    Bool,
    /// UTF-8 string of at most `n` bytes, NUL padded to exactly `n`.
    String(u16),
}

impl KeyType {
    /// Encoded size of one key of this type.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            KeyType::Int => 4,
            KeyType::Long => 8,
            KeyType::Bool => 1,
            KeyType::String(n) => *n as usize,
        }
    }

    pub(crate) fn tag(&self) -> u8 {
        match self {
            KeyType::Int => 1,
            KeyType::Long => 2,
            KeyType::Bool => 3,
            KeyType::String(_) => 4,
        }
    }

    pub(crate) fn width(&self) -> u16 {
        match self {
            KeyType::String(n) => *n,
            _ => 0,
        }
    }

    pub(crate) fn from_tag(tag: u8, width: u16) -> Option<KeyType> {
        match tag {
            1 => Some(KeyType::Int),
            2 => Some(KeyType::Long),
            3 => Some(KeyType::Bool),
            4 if width > 0 => Some(KeyType::String(width)),
            _ => None,
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyType::Int => write!(f, "int"),
            KeyType::Long => write!(f, "long"),
            KeyType::Bool => write!(f, "bool"),
            KeyType::String(n) => write!(f, "string({})", n),
        }
    }
}

/// A key value.
///
/// Keys of one variant are totally ordered; a tree only ever stores keys
/// of its own [`KeyType`], which [`Key::check`] enforces at the API edge.
///
/// # Example
/// ```
/// use pagedex::index::btree::{Key, KeyType};
///
/// let key = Key::from(42);
/// let mut buf = [0u8; 4];
/// key.encode_into(KeyType::Int, &mut buf);
/// assert_eq!(Key::decode(KeyType::Int, &buf), Some(key));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Int(i32),
    Long(i64),
    Bool(bool),
    Str(String),
}

impl Key {
    /// Reject keys that cannot be stored in a tree of `key_type`.
    pub fn check(&self, key_type: KeyType) -> Result<()> {
        let fits = match (self, key_type) {
            (Key::Int(_), KeyType::Int) => true,
            (Key::Long(_), KeyType::Long) => true,
            (Key::Bool(_), KeyType::Bool) => true,
            (Key::Str(s), KeyType::String(n)) => s.len() <= n as usize && !s.contains('\0'),
            _ => false,
        };

        if fits {
            Ok(())
        } else {
            Err(Error::KeyTypeMismatch {
                expected: key_type.to_string(),
                actual: self.describe(),
            })
        }
    }

    fn describe(&self) -> String {
        match self {
            Key::Int(_) => "int".to_string(),
            Key::Long(_) => "long".to_string(),
            Key::Bool(_) => "bool".to_string(),
            Key::Str(s) => format!("string of {} bytes", s.len()),
        }
    }

    /// Write the key into `buf`, which must be exactly
    /// `key_type.size_in_bytes()` long. The key must have passed
    /// [`Key::check`] for `key_type`.
    pub fn encode_into(&self, key_type: KeyType, buf: &mut [u8]) {
        debug_assert_eq!(buf.len(), key_type.size_in_bytes());
        match self {
            Key::Int(v) => buf.copy_from_slice(&v.to_le_bytes()),
            Key::Long(v) => buf.copy_from_slice(&v.to_le_bytes()),
            Key::Bool(v) => buf[0] = u8::from(*v),
            Key::Str(s) => {
                buf.fill(0);
                buf[..s.len()].copy_from_slice(s.as_bytes());
            }
        }
    }

    /// Read a key of `key_type` from `buf`. Returns None for bytes no key
    /// of that type encodes to.
    pub fn decode(key_type: KeyType, buf: &[u8]) -> Option<Key> {
        if buf.len() != key_type.size_in_bytes() {
            return None;
        }
        match key_type {
            KeyType::Int => buf.try_into().ok().map(|b| Key::Int(i32::from_le_bytes(b))),
            KeyType::Long => buf.try_into().ok().map(|b| Key::Long(i64::from_le_bytes(b))),
            KeyType::Bool => match buf[0] {
                0 => Some(Key::Bool(false)),
                1 => Some(Key::Bool(true)),
                _ => None,
            },
            KeyType::String(_) => {
                let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
                std::str::from_utf8(&buf[..end])
                    .ok()
                    .map(|s| Key::Str(s.to_string()))
            }
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(v) => write!(f, "{}", v),
            Key::Long(v) => write!(f, "{}", v),
            Key::Bool(v) => write!(f, "{}", v),
            Key::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i32> for Key {
    fn from(v: i32) -> Self {
        Key::Int(v)
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Key::Long(v)
    }
}

impl From<bool> for Key {
    fn from(v: bool) -> Self {
        Key::Bool(v)
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Key::Str(v.to_string())
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Key::Str(v)
    }
}
