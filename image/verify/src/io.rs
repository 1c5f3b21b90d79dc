/*++

Licensed under the Apache-2.0 license.

File Name:

   io.rs

Abstract:

    Gather list describing the bytes fed to the verification stages.

--*/

use arrayvec::ArrayVec;
use boot0_error::{BootError, BootResult};
use boot0_image_types::SIG_INDEX_CAPACITY;

/// Signed prefix plus one segment per signed tag.
pub const MAX_IO_SEGMENTS: usize = 1 + SIG_INDEX_CAPACITY;

/// Ordered list of byte segments processed as one logical message.
#[derive(Debug, Default, Clone)]
pub struct IoPair<'a> {
    segments: ArrayVec<&'a [u8], MAX_IO_SEGMENTS>,
}

impl<'a> IoPair<'a> {
    /// Single segment message.
    pub fn new(data: &'a [u8]) -> Self {
        let mut segments = ArrayVec::new();
        segments.push(data);
        Self { segments }
    }

    pub fn push(&mut self, segment: &'a [u8]) -> BootResult<()> {
        self.segments
            .try_push(segment)
            .map_err(|_| BootError::CAPACITY_ERR_IO_SEGMENTS_FULL)
    }

    pub fn segments(&self) -> &[&'a [u8]] {
        &self.segments
    }

    /// Total number of message bytes.
    pub fn len(&self) -> usize {
        self.segments.iter().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over the message bytes in order.
    pub fn bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.segments.iter().flat_map(|s| s.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_order() {
        let mut io = IoPair::new(b"ab");
        io.push(b"").unwrap();
        io.push(b"cde").unwrap();
        assert_eq!(io.len(), 5);
        assert_eq!(io.bytes().collect::<Vec<_>>(), b"abcde".to_vec());
    }

    #[test]
    fn test_segment_capacity() {
        let mut io = IoPair::default();
        for _ in 0..MAX_IO_SEGMENTS {
            io.push(b"x").unwrap();
        }
        assert_eq!(io.push(b"x"), Err(BootError::CAPACITY_ERR_IO_SEGMENTS_FULL));
        assert_eq!(io.segments().len(), MAX_IO_SEGMENTS);
    }
}
