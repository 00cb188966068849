//! # Byte Cursor
//!
//! All primitive codecs in `dlis::types` and `lis::types` take a `Cursor` and
//! advance it.  The cursor carries the remaining byte count so every read is
//! bounds checked; a read past the end yields `ShortRead` rather than panicking.

use std::fmt;

/// Error for a read that runs off the end of the buffer.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub struct ShortRead {
    pub wanted: usize,
    pub remaining: usize
}

impl fmt::Display for ShortRead {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,"short read: wanted {} bytes, {} remaining",self.wanted,self.remaining)
    }
}

impl std::error::Error for ShortRead {}

/// Read-only cursor over a byte buffer.
#[derive(Clone,Copy)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }
    /// offset of the next unread byte
    pub fn offset(&self) -> usize {
        self.pos
    }
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }
    /// look at the next byte without advancing
    pub fn peek(&self) -> Result<u8,ShortRead> {
        match self.buf.get(self.pos) {
            Some(b) => Ok(*b),
            None => Err(ShortRead { wanted: 1, remaining: 0 })
        }
    }
    /// take the next `n` bytes, advancing the cursor
    pub fn take(&mut self,n: usize) -> Result<&'a [u8],ShortRead> {
        if self.remaining() < n {
            return Err(ShortRead { wanted: n, remaining: self.remaining() });
        }
        let slice = &self.buf[self.pos..self.pos+n];
        self.pos += n;
        Ok(slice)
    }
    /// take the next `n` bytes as a fixed size array
    pub fn take_array<const N: usize>(&mut self) -> Result<[u8;N],ShortRead> {
        let slice = self.take(N)?;
        let mut ans = [0u8;N];
        ans.copy_from_slice(slice);
        Ok(ans)
    }
    /// skip `n` bytes
    pub fn skip(&mut self,n: usize) -> Result<(),ShortRead> {
        self.take(n)?;
        Ok(())
    }
}

#[test]
fn bounded_reads() {
    let buf = [1,2,3,4];
    let mut cur = Cursor::new(&buf);
    assert_eq!(cur.take(2).unwrap(),&[1,2]);
    assert_eq!(cur.offset(),2);
    assert_eq!(cur.remaining(),2);
    assert_eq!(cur.take(3),Err(ShortRead { wanted: 3, remaining: 2 }));
    assert_eq!(cur.take(2).unwrap(),&[3,4]);
    assert!(cur.is_empty());
}
