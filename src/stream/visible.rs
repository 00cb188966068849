//! # Visible Record Layer
//!
//! DLIS groups logical record segments into visible records, each introduced
//! by a 4-byte visible record label (VRL).  This layer strips the labels so
//! the envelope walker upstairs sees an uninterrupted sequence of segments.
//!
//! The layer begins at whatever offset the inner stream is positioned to when
//! the wrapper is built, normally right after the storage unit label.

use binrw::BinRead;
use log::{debug,trace};
use super::{Stream,Error};

pub const VRL_SIZE: usize = 4;

/// Visible Record Label.  The length covers the label itself.
#[derive(BinRead,Debug,Clone,Copy)]
#[br(big)]
pub struct Vrl {
    pub length: u16,
    /// should be 0xFF, not enforced
    pub padding: u8,
    /// major DLIS version, must be 1
    pub version: u8
}

impl Vrl {
    pub fn parse(buf: &[u8]) -> Result<Self,Error> {
        let mut curs = std::io::Cursor::new(buf);
        let vrl = Self::read(&mut curs).or(Err(Error::BadVisibleRecord))?;
        if vrl.version != 1 {
            debug!("visible record version was {}, expected 1",vrl.version);
            return Err(Error::BadVisibleRecord);
        }
        if (vrl.length as usize) < VRL_SIZE {
            return Err(Error::BadVisibleRecord);
        }
        if vrl.padding != 0xff {
            trace!("visible record pad byte was {:02X}, expected FF",vrl.padding);
        }
        Ok(vrl)
    }
}

struct Block {
    lstart: i64,
    pstart: i64,
    len: i64
}

/// Stream wrapper that strips visible record labels from the byte sequence.
pub struct VisibleRecords {
    inner: Box<dyn Stream>,
    /// inner tell of the first VRL
    origin: i64,
    blocks: Vec<Block>,
    next_vrl: Option<i64>,
    pos: i64,
    at_end: bool
}

impl VisibleRecords {
    /// Wrap a stream whose current position is the first visible record label.
    pub fn new(inner: Box<dyn Stream>) -> Self {
        let origin = inner.ltell();
        Self { inner, origin, blocks: Vec::new(), next_vrl: Some(origin), pos: 0, at_end: false }
    }
    fn discover(&mut self) -> Result<bool,Error> {
        let tell = match self.next_vrl {
            Some(t) => t,
            None => return Ok(false)
        };
        self.inner.seek(tell)?;
        let mut buf = [0u8;VRL_SIZE];
        let nread = self.inner.read(&mut buf)?;
        if nread == 0 {
            self.next_vrl = None;
            return Ok(false);
        }
        if nread < VRL_SIZE {
            return Err(Error::BadVisibleRecord);
        }
        let vrl = Vrl::parse(&buf)?;
        let lstart = match self.blocks.last() {
            Some(blk) => blk.lstart + blk.len,
            None => 0
        };
        let len = vrl.length as i64 - VRL_SIZE as i64;
        trace!("visible record at inner tell {}, {} payload bytes",tell,len);
        self.blocks.push(Block { lstart, pstart: tell + VRL_SIZE as i64, len });
        self.next_vrl = Some(tell + vrl.length as i64);
        Ok(true)
    }
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

impl Stream for VisibleRecords {
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
        self.inner.ptell() - self.inner.ltell() + self.origin
    }
    fn eof(&self) -> bool {
        self.at_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::ByteStream;

    #[test]
    fn strips_labels() {
        // two visible records carrying 4 + 2 payload bytes
        let file = vec![
            0x00,0x08,0xff,0x01, 1,2,3,4,
            0x00,0x06,0xff,0x01, 5,6
        ];
        let inner = ByteStream::from_bytes(file);
        let mut vis = VisibleRecords::new(Box::new(inner));
        let mut buf = [0u8;8];
        assert_eq!(vis.read(&mut buf).unwrap(),6);
        assert_eq!(&buf[0..6],&[1,2,3,4,5,6]);
        assert!(vis.eof());
        vis.seek(3).unwrap();
        let mut buf = [0u8;2];
        assert_eq!(vis.read(&mut buf).unwrap(),2);
        assert_eq!(buf,[4,5]);
        assert_eq!(vis.ltell(),5);
    }

    #[test]
    fn rejects_wrong_version() {
        let file = vec![0x00,0x08,0xff,0x02, 1,2,3,4];
        let inner = ByteStream::from_bytes(file);
        let mut vis = VisibleRecords::new(Box::new(inner));
        let mut buf = [0u8;4];
        assert!(vis.read(&mut buf).is_err());
    }
}
