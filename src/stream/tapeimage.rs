//! # Tape Image Layer
//!
//! Files copied off 9-track tape are often wrapped in the tape image format:
//! every block of data is preceded by a 12-byte tape mark holding the offsets
//! of the previous and next marks.  This layer strips the marks so that upper
//! layers see the original byte sequence.
//!
//! Marks are discovered lazily as reads progress, and remembered, so seeking
//! backwards never re-walks the chain.

use binrw::BinRead;
use log::{debug,trace};
use super::{Stream,Error};

pub const TAPEMARK_SIZE: usize = 12;

/// A tape mark.  All three fields are little-endian, unlike everything else
/// in the wrapped formats.
#[derive(BinRead,Debug,Clone,Copy)]
#[br(little)]
pub struct Tapemark {
    /// 0 for a data mark, 1 for an end-of-medium mark
    pub mark_type: u32,
    /// absolute offset of the previous mark
    pub prev: u32,
    /// absolute offset of the next mark
    pub next: u32
}

impl Tapemark {
    pub fn parse(buf: &[u8]) -> Result<Self,Error> {
        let mut curs = std::io::Cursor::new(buf);
        Self::read(&mut curs).or(Err(Error::BadTapemark))
    }
    pub fn is_valid(&self) -> bool {
        if self.mark_type != 0 && self.mark_type != 1 {
            return false;
        }
        self.prev < self.next
    }
}

/// Check whether a stream starts with a plausible tape mark.
/// The stream is left positioned at 0.
pub fn hastapemark(stream: &mut dyn Stream) -> Result<bool,Error> {
    stream.seek(0)?;
    let mut buf = [0u8;TAPEMARK_SIZE];
    let nread = stream.read(&mut buf)?;
    stream.seek(0)?;
    if nread < TAPEMARK_SIZE {
        return Ok(false);
    }
    let mark = Tapemark::parse(&buf)?;
    Ok(mark.is_valid())
}

struct Block {
    /// logical offset of the first payload byte
    lstart: i64,
    /// inner tell of the first payload byte
    pstart: i64,
    len: i64
}

/// Stream wrapper that strips tape marks from the byte sequence.
pub struct TapeImage {
    inner: Box<dyn Stream>,
    blocks: Vec<Block>,
    /// inner tell of the next undiscovered mark, None once an EOM mark or EOF was seen
    next_mark: Option<i64>,
    pos: i64,
    at_end: bool
}

impl TapeImage {
    /// Wrap a stream positioned at its first tape mark.
    pub fn new(inner: Box<dyn Stream>) -> Self {
        Self { inner, blocks: Vec::new(), next_mark: Some(0), pos: 0, at_end: false }
    }
    /// Read the mark at `self.next_mark` and append the block it introduces.
    /// Returns false when the tape is exhausted.
    fn discover(&mut self) -> Result<bool,Error> {
        let tell = match self.next_mark {
            Some(t) => t,
            None => return Ok(false)
        };
        self.inner.seek(tell)?;
        let mut buf = [0u8;TAPEMARK_SIZE];
        let nread = self.inner.read(&mut buf)?;
        if nread < TAPEMARK_SIZE {
            trace!("tape exhausted at inner tell {}",tell);
            self.next_mark = None;
            return Ok(false);
        }
        let mark = Tapemark::parse(&buf)?;
        if mark.mark_type != 0 {
            debug!("tape mark type {} at inner tell {}, stopping",mark.mark_type,tell);
            self.next_mark = None;
            return Ok(false);
        }
        if !mark.is_valid() || (mark.next as i64) <= tell + TAPEMARK_SIZE as i64 {
            return Err(Error::BadTapemark);
        }
        let lstart = match self.blocks.last() {
            Some(blk) => blk.lstart + blk.len,
            None => 0
        };
        let len = mark.next as i64 - tell - TAPEMARK_SIZE as i64;
        trace!("tape block at inner tell {}, {} payload bytes",tell,len);
        self.blocks.push(Block { lstart, pstart: tell + TAPEMARK_SIZE as i64, len });
        self.next_mark = Some(mark.next as i64);
        Ok(true)
    }
    /// index of the block containing the logical offset, discovering as needed
    fn block_of(&mut self,loffset: i64) -> Result<Option<usize>,Error> {
        loop {
            for (i,blk) in self.blocks.iter().enumerate() {
                if loffset >= blk.lstart && loffset < blk.lstart + blk.len {
                    return Ok(Some(i));
                }
            }
            if !self.discover()? {
                return Ok(None);
            }
        }
    }
}

impl Stream for TapeImage {
    fn read(&mut self,buf: &mut [u8]) -> Result<usize,Error> {
        if buf.len() == 0 {
            return Ok(0);
        }
        let mut count = 0;
        while count < buf.len() {
            let idx = match self.block_of(self.pos)? {
                Some(i) => i,
                None => {
                    self.at_end = true;
                    break;
                }
            };
            let in_block = self.pos - self.blocks[idx].lstart;
            let avail = (self.blocks[idx].len - in_block) as usize;
            let want = usize::min(avail,buf.len() - count);
            self.inner.seek(self.blocks[idx].pstart + in_block)?;
            let nread = self.inner.read(&mut buf[count..count+want])?;
            self.pos += nread as i64;
            count += nread;
            if nread < want {
                self.at_end = true;
                break;
            }
        }
        Ok(count)
    }
    fn seek(&mut self,offset: i64) -> Result<(),Error> {
        if offset < 0 {
            return Err(Error::InvalidArgs);
        }
        self.pos = offset;
        self.at_end = false;
        Ok(())
    }
    fn ltell(&self) -> i64 {
        self.pos
    }
    fn ptell(&self) -> i64 {
        for blk in &self.blocks {
            if self.pos >= blk.lstart && self.pos < blk.lstart + blk.len {
                return self.inner.ptell() - self.inner.ltell() + blk.pstart + (self.pos - blk.lstart);
            }
        }
        self.inner.ptell()
    }
    fn eof(&self) -> bool {
        self.at_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::ByteStream;

    fn mark(mark_type: u32,prev: u32,next: u32) -> Vec<u8> {
        let mut ans = Vec::new();
        ans.extend_from_slice(&mark_type.to_le_bytes());
        ans.extend_from_slice(&prev.to_le_bytes());
        ans.extend_from_slice(&next.to_le_bytes());
        ans
    }

    #[test]
    fn strips_marks() {
        // two data blocks of 4 and 2 bytes, then an EOM mark
        let mut file = Vec::new();
        file.append(&mut mark(0,0,16));
        file.extend_from_slice(&[1,2,3,4]);
        file.append(&mut mark(0,0,30));
        file.extend_from_slice(&[5,6]);
        file.append(&mut mark(1,16,42));
        let inner = ByteStream::from_bytes(file);
        let mut tape = TapeImage::new(Box::new(inner));
        let mut buf = [0u8;8];
        assert_eq!(tape.read(&mut buf).unwrap(),6);
        assert_eq!(&buf[0..6],&[1,2,3,4,5,6]);
        assert!(tape.eof());
        tape.seek(4).unwrap();
        let mut buf = [0u8;2];
        assert_eq!(tape.read(&mut buf).unwrap(),2);
        assert_eq!(buf,[5,6]);
    }

    #[test]
    fn detects_tapemark() {
        let mut file = mark(0,0,16);
        file.extend_from_slice(&[1,2,3,4]);
        let mut stream = ByteStream::from_bytes(file);
        assert!(hastapemark(&mut stream).unwrap());
        let mut stream = ByteStream::from_bytes(vec![0xff;20]);
        assert!(!hastapemark(&mut stream).unwrap());
    }
}
