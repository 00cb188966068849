//! # Stream Module
//!
//! A well log file is read through a stack of `Stream` objects.  The bottom of
//! the stack is a raw byte source (`RawStream` over a file or an in-memory
//! buffer).  On top of that the caller may push wrappers that strip their own
//! envelope from the byte sequence: `tapeimage::TapeImage` removes 12-byte
//! tape marks, `visible::VisibleRecords` removes DLIS visible record labels.
//! The layer above a wrapper only ever sees payload bytes.
//!
//! Every stream keeps two tells.  The *logical* tell counts payload bytes of
//! the innermost view and is what record indexes store.  The *physical* tell
//! reaches through all layers to the absolute file offset, and is what error
//! messages cite.
//!
//! Streams are released by dropping them; ownership follows the stack, with
//! each wrapper owning its inner stream.

pub mod tapeimage;
pub mod visible;

use std::io::{Read,Seek,SeekFrom};

/// Enumerates stream errors.  The `Display` trait will print equivalent long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("i/o error during read or seek")]
    Io(#[from] std::io::Error),
    #[error("operation not implemented for this layer")]
    NotImplemented,
    #[error("bad argument to read or seek")]
    InvalidArgs,
    #[error("tape mark did not parse")]
    BadTapemark,
    #[error("visible record label did not parse")]
    BadVisibleRecord
}

/// An ordered byte source with logical and physical tells.
///
/// `read` returns the number of bytes read; hitting the end of the source
/// gives a short count and sets `eof`.  A zero-length read is a no-op
/// returning 0.  Whether a short read is an error is the caller's policy.
pub trait Stream {
    fn read(&mut self,buf: &mut [u8]) -> Result<usize,Error>;
    fn seek(&mut self,offset: i64) -> Result<(),Error>;
    /// position within this layer's view, in payload bytes
    fn ltell(&self) -> i64;
    /// absolute offset in the underlying file, reaching through all layers
    fn ptell(&self) -> i64;
    fn eof(&self) -> bool;
}

/// Raw byte source backed by anything that can `Read` and `Seek`.
///
/// The `base` offset allows a logical view that starts somewhere inside the
/// file, e.g. after a storage unit label.
pub struct RawStream<R> {
    inner: R,
    base: u64,
    pos: u64,
    at_end: bool
}

/// Raw stream over an open file
pub type FileStream = RawStream<std::fs::File>;
/// Raw stream over an in-memory buffer
pub type ByteStream = RawStream<std::io::Cursor<Vec<u8>>>;

impl<R: Read + Seek> RawStream<R> {
    pub fn new(mut inner: R,base: u64) -> Result<Self,Error> {
        inner.seek(SeekFrom::Start(base))?;
        Ok(Self { inner, base, pos: 0, at_end: false })
    }
}

impl ByteStream {
    pub fn from_bytes(buf: Vec<u8>) -> Self {
        Self { inner: std::io::Cursor::new(buf), base: 0, pos: 0, at_end: false }
    }
}

impl FileStream {
    pub fn open(path: &str,base: u64) -> Result<Self,Error> {
        let file = std::fs::File::open(path)?;
        Self::new(file,base)
    }
}

impl<R: Read + Seek> Stream for RawStream<R> {
    fn read(&mut self,buf: &mut [u8]) -> Result<usize,Error> {
        if buf.len() == 0 {
            return Ok(0);
        }
        let mut count = 0;
        while count < buf.len() {
            let n = self.inner.read(&mut buf[count..])?;
            if n == 0 {
                self.at_end = true;
                break;
            }
            count += n;
        }
        self.pos += count as u64;
        Ok(count)
    }
    fn seek(&mut self,offset: i64) -> Result<(),Error> {
        if offset < 0 {
            return Err(Error::InvalidArgs);
        }
        self.inner.seek(SeekFrom::Start(self.base + offset as u64))?;
        self.pos = offset as u64;
        self.at_end = false;
        Ok(())
    }
    fn ltell(&self) -> i64 {
        self.pos as i64
    }
    fn ptell(&self) -> i64 {
        (self.base + self.pos) as i64
    }
    fn eof(&self) -> bool {
        self.at_end
    }
}

#[test]
fn raw_stream_tells() {
    let mut stream = ByteStream::from_bytes(vec![0,1,2,3,4,5,6,7]);
    let mut buf = [0u8;4];
    assert_eq!(stream.read(&mut buf).unwrap(),4);
    assert_eq!(buf,[0,1,2,3]);
    assert_eq!(stream.ltell(),4);
    assert_eq!(stream.ptell(),4);
    assert!(!stream.eof());
    assert_eq!(stream.read(&mut buf).unwrap(),4);
    assert!(!stream.eof());
    assert_eq!(stream.read(&mut buf).unwrap(),0);
    assert!(stream.eof());
    stream.seek(6).unwrap();
    assert!(!stream.eof());
    assert_eq!(stream.read(&mut buf).unwrap(),2);
    assert_eq!(&buf[0..2],&[6,7]);
}

#[test]
fn raw_stream_with_base() {
    let mut stream = RawStream::new(std::io::Cursor::new(vec![9,9,9,0,1,2]),3).unwrap();
    let mut buf = [0u8;3];
    assert_eq!(stream.read(&mut buf).unwrap(),3);
    assert_eq!(buf,[0,1,2]);
    assert_eq!(stream.ltell(),3);
    assert_eq!(stream.ptell(),6);
}
