//! Size-capped content buffer owned by the governor

use crate::error::{FetchError, Result};

/// Accumulates transfer bytes up to a hard limit
///
/// Once a push would cross the limit the buffered content is dropped and
/// every later push fails, so no more than `limit` bytes are ever retained.
#[derive(Debug)]
pub struct BoundedBuffer {
    data: Vec<u8>,
    limit: usize,
    overflowed: bool,
}

impl BoundedBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            data: Vec::new(),
            limit,
            overflowed: false,
        }
    }

    /// Append a chunk, failing with `SizeExceeded` past the limit
    pub fn push(&mut self, chunk: &[u8]) -> Result<()> {
        if self.overflowed || self.data.len() + chunk.len() > self.limit {
            self.discard();
            return Err(FetchError::SizeExceeded { limit: self.limit });
        }
        self.data.extend_from_slice(chunk);
        Ok(())
    }

    /// Reject an announced length before reading anything
    pub fn ensure_fits(&mut self, announced: u64) -> Result<()> {
        let fits = usize::try_from(announced)
            .map(|n| self.data.len().saturating_add(n) <= self.limit)
            .unwrap_or(false);
        if fits {
            Ok(())
        } else {
            self.discard();
            Err(FetchError::SizeExceeded { limit: self.limit })
        }
    }

    fn discard(&mut self) {
        self.data = Vec::new();
        self.overflowed = true;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes still accepted before the limit
    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.data.len())
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_within_limit() {
        let mut buf = BoundedBuffer::new(8);
        buf.push(b"abcd").unwrap();
        buf.push(b"efgh").unwrap();
        assert_eq!(buf.len(), 8);
        assert_eq!(buf.remaining(), 0);
        assert_eq!(buf.into_inner(), b"abcdefgh");
    }

    #[test]
    fn test_overflow_discards_content() {
        let mut buf = BoundedBuffer::new(8);
        buf.push(b"abcdef").unwrap();

        let err = buf.push(b"ghi").unwrap_err();
        assert!(matches!(err, FetchError::SizeExceeded { limit: 8 }));
        assert!(buf.is_empty());
        assert!(buf.overflowed());

        // Stays failed even for chunks that would fit again
        assert!(buf.push(b"a").is_err());
        assert!(buf.len() <= buf.limit());
    }

    #[test]
    fn test_announced_length() {
        let mut buf = BoundedBuffer::new(100);
        assert!(buf.ensure_fits(100).is_ok());
        assert!(buf.ensure_fits(101).is_err());
        assert!(buf.overflowed());
    }
}
