//! Record identifiers stored as index values.

use std::fmt;

use crate::common::PageId;

/// Location of a record in a heap file: its page and slot.
///
/// The index never interprets a `RecordId`; it only stores and returns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: u16,
}

impl RecordId {
    /// Encoded size: page id (4) + slot (2).
    pub const SIZE: usize = 6;

    pub fn new(page_id: PageId, slot: u16) -> Self {
        Self { page_id, slot }
    }

    pub(crate) fn encode_into(&self, buf: &mut [u8]) {
        PageId::write_le(buf, 0, self.page_id.0);
        buf[4..6].copy_from_slice(&self.slot.to_le_bytes());
    }

    pub(crate) fn decode(buf: &[u8]) -> Self {
        Self {
            page_id: PageId(PageId::read_le(buf, 0)),
            slot: u16::from_le_bytes([buf[4], buf[5]]),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {})", self.page_id.0, self.slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let rid = RecordId::new(PageId::new(0x0102_0304), 0xBEEF);
        let mut buf = [0u8; RecordId::SIZE];
        rid.encode_into(&mut buf);

        assert_eq!(&buf[..4], &[4, 3, 2, 1]);
        assert_eq!(RecordId::decode(&buf), rid);
    }

    #[test]
    fn test_display() {
        assert_eq!(RecordId::new(PageId::new(3), 3).to_string(), "(3 3)");
    }
}
