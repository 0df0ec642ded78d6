//! A safe, bounds-checked, fixed-capacity I/O buffer.
//!
//! A stack-allocated scratch buffer with a write cursor (`append_*`) and a
//! separate read cursor
//! (`read_*`) threaded explicitly by the caller, so the same buffer can be
//! filled once on encode and walked twice on decode (header peek, then
//! payload parse) without re-allocating.

use std::io::Write;

fn overflow_err() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "buffer overflow")
}

/// Fixed-capacity buffer of `L` bytes with a write cursor tracking how much
/// has been filled so far.
pub struct Buffer<const L: usize>(usize, [u8; L]);

impl<const L: usize> Default for Buffer<L> {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}

impl<const L: usize> Buffer<L> {
    pub const CAPACITY: usize = L;

    /// An empty, zeroed buffer.
    #[inline(always)]
    pub fn new() -> Self {
        Self(0, [0_u8; L])
    }

    #[inline(always)]
    pub fn from_bytes(b: &[u8]) -> std::io::Result<Self> {
        let l = b.len();
        if l <= L {
            let mut tmp = Self::new();
            tmp.0 = l;
            tmp.1[0..l].copy_from_slice(b);
            Ok(tmp)
        } else {
            Err(overflow_err())
        }
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.1[0..self.0]
    }

    #[inline(always)]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.1[0..self.0]
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.0
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// All bytes from `start` to the end of the written region.
    #[inline(always)]
    pub fn as_bytes_starting_at(&self, start: usize) -> std::io::Result<&[u8]> {
        if start <= self.0 {
            Ok(&self.1[start..self.0])
        } else {
            Err(overflow_err())
        }
    }

    #[inline(always)]
    pub fn append_bytes(&mut self, buf: &[u8]) -> std::io::Result<()> {
        let ptr = self.0;
        let end = ptr + buf.len();
        if end <= L {
            self.0 = end;
            self.1[ptr..end].copy_from_slice(buf);
            Ok(())
        } else {
            Err(overflow_err())
        }
    }

    #[inline(always)]
    pub fn append_bytes_fixed<const S: usize>(&mut self, buf: &[u8; S]) -> std::io::Result<()> {
        self.append_bytes(buf)
    }

    #[inline(always)]
    pub fn append_u8(&mut self, i: u8) -> std::io::Result<()> {
        let ptr = self.0;
        if ptr < L {
            self.0 = ptr + 1;
            self.1[ptr] = i;
            Ok(())
        } else {
            Err(overflow_err())
        }
    }

    #[inline(always)]
    pub fn append_u32(&mut self, i: u32) -> std::io::Result<()> {
        self.append_bytes(&i.to_be_bytes())
    }

    /// Reserve `s` bytes at the current write position and return them as a
    /// mutable slice, advancing the cursor as if they had been written.
    ///
    /// Used by the codec to hand ChaCha20 a destination slice it can encrypt
    /// into directly without an intermediate copy.
    #[inline(always)]
    pub fn append_reserved(&mut self, s: usize) -> std::io::Result<&mut [u8]> {
        let ptr = self.0;
        let end = ptr + s;
        if end <= L {
            self.0 = end;
            Ok(&mut self.1[ptr..end])
        } else {
            Err(overflow_err())
        }
    }

    #[inline(always)]
    pub fn read_bytes_fixed<const S: usize>(&self, cursor: &mut usize) -> std::io::Result<[u8; S]> {
        let ptr = *cursor;
        let end = ptr + S;
        if end <= self.0 {
            *cursor = end;
            let mut out = [0_u8; S];
            out.copy_from_slice(&self.1[ptr..end]);
            Ok(out)
        } else {
            Err(overflow_err())
        }
    }

    #[inline(always)]
    pub fn read_bytes(&self, l: usize, cursor: &mut usize) -> std::io::Result<&[u8]> {
        let ptr = *cursor;
        let end = ptr + l;
        if end <= self.0 {
            *cursor = end;
            Ok(&self.1[ptr..end])
        } else {
            Err(overflow_err())
        }
    }

    #[inline(always)]
    pub fn read_u8(&self, cursor: &mut usize) -> std::io::Result<u8> {
        let ptr = *cursor;
        if ptr < self.0 {
            *cursor = ptr + 1;
            Ok(self.1[ptr])
        } else {
            Err(overflow_err())
        }
    }

    #[inline(always)]
    pub fn read_u32(&self, cursor: &mut usize) -> std::io::Result<u32> {
        self.read_bytes_fixed::<4>(cursor).map(u32::from_be_bytes)
    }
}

impl<const L: usize> Write for Buffer<L> {
    #[inline(always)]
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.append_bytes(buf)?;
        Ok(buf.len())
    }

    #[inline(always)]
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<const L: usize> AsRef<[u8]> for Buffer<L> {
    #[inline(always)]
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_read_round_trip() {
        let mut b: Buffer<64> = Buffer::new();
        b.append_u32(0x0a0b0c0d).unwrap();
        b.append_u8(0xff).unwrap();
        b.append_bytes(&[1, 2, 3]).unwrap();
        assert_eq!(b.len(), 8);

        let mut cursor = 0;
        assert_eq!(b.read_u32(&mut cursor).unwrap(), 0x0a0b0c0d);
        assert_eq!(b.read_u8(&mut cursor).unwrap(), 0xff);
        assert_eq!(b.read_bytes(3, &mut cursor).unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn overflow_is_rejected() {
        let mut b: Buffer<4> = Buffer::new();
        assert!(b.append_bytes(&[0_u8; 5]).is_err());
        assert!(b.append_u32(1).is_ok());
        assert!(b.append_u8(1).is_err());
    }
}
