//! # DLIS Module
//!
//! Reader for DLIS (RP66 v1) files.  The format is a stack of envelopes: an
//! 80-byte ASCII storage unit label, then visible records, each carrying one
//! or more logical record segments.  Segments are stitched into logical
//! records, and logical records are either explicitly formatted (EFLR: sets of
//! typed objects, see `eflr`) or implicitly formatted (IFLR: frame data, see
//! `frame`).
//!
//! The walker in this module discovers the storage unit label, parses segment
//! headers, trims segment trailers, and produces a seekable index of logical
//! record tells.  It expects to run on top of a `stream::visible::VisibleRecords`
//! layer so that visible record labels are already stripped.
//!
//! Anything bit-valid but standard-violating is reported through the caller's
//! `ErrorHandler` rather than silently dropped.

pub mod types;
pub mod packf;
pub mod eflr;
pub mod pool;
pub mod frame;
#[cfg(test)]
mod types_test;

use binrw::BinRead;
use log::{debug,trace};
use regex::Regex;
use crate::cursor::{Cursor,ShortRead};
use crate::stream::Stream;
use crate::diag::{Severity,ErrorHandler};
use crate::DYNERR;

/// Enumerates DLIS reader errors.  The `Display` trait will print equivalent long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("unexpected end of data inside a declared-length region")]
    Truncated,
    #[error("stream failure")]
    Stream(#[from] crate::stream::Error),
    #[error("bit-valid but standard-violating content")]
    Inconsistent,
    #[error("enumeration or tag outside its defined range")]
    UnexpectedValue,
    #[error("bad argument")]
    InvalidArgs,
    #[error("computed length exceeds its container")]
    BadSize,
    #[error("feature is not supported by this reader")]
    NotImplemented,
    #[error("search exhausted without a match")]
    NotFound
}

impl From<ShortRead> for Error {
    fn from(_: ShortRead) -> Self {
        Self::Truncated
    }
}

pub const SUL_SIZE: usize = 80;
pub const LRSH_SIZE: usize = 4;

/* logical record segment attribute bits */
pub const SEGATTR_EXFMTLR: u8 = 1 << 7;
pub const SEGATTR_PREDSEG: u8 = 1 << 6;
pub const SEGATTR_SUCCSEG: u8 = 1 << 5;
pub const SEGATTR_ENCRYPT: u8 = 1 << 4;
pub const SEGATTR_ENCRPKT: u8 = 1 << 3;
pub const SEGATTR_CHCKSUM: u8 = 1 << 2;
pub const SEGATTR_TRAILEN: u8 = 1 << 1;
pub const SEGATTR_PADDING: u8 = 1 << 0;

/// storage unit structure named by the SUL, only RECORD is defined for v1
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum Layout {
    Record,
    Unknown
}

/// Parsed storage unit label.
///
/// `maxlen == 0` means the producer declared no upper limit on visible record
/// length.  `consistent` is false when the label was readable but violates the
/// standard; the remaining fields then hold a best effort.
#[derive(Debug,Clone,PartialEq,Eq)]
pub struct Sul {
    pub seqnum: i32,
    pub major: i32,
    pub minor: i32,
    pub layout: Layout,
    pub maxlen: i64,
    pub id: String,
    pub consistent: bool
}

/// atoi-like: leading spaces, then digits, anything else ends the number
fn ascii_int(bytes: &[u8]) -> i64 {
    let mut ans: i64 = 0;
    let mut seen = false;
    for b in bytes {
        match b {
            b' ' if !seen => continue,
            b'0'..=b'9' => {
                seen = true;
                ans = ans * 10 + (b - b'0') as i64;
            },
            _ => break
        }
    }
    ans
}

/// Parse the version field, `V N . m m`.
/// Returns None when the field is not on that form at all.
fn parse_revision(bytes: &[u8]) -> Option<(i32,i32)> {
    let text = String::from_utf8_lossy(bytes);
    let patt = Regex::new(r"^V(\d)\.(\d\d)$").expect("unreachable");
    match patt.captures(&text) {
        Some(caps) => {
            let major = caps[1].parse::<i32>().expect("unreachable");
            let minor = caps[2].parse::<i32>().expect("unreachable");
            Some((major,minor))
        },
        None => None
    }
}

/// legitimately-zero text: optional leading spaces, then all zeros
fn is_zero_string(bytes: &[u8]) -> bool {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim_end_matches('\0');
    let patt = Regex::new(r"^ *0+$").expect("unreachable");
    patt.is_match(trimmed)
}

/// Parse the 80-byte storage unit label.
///
/// A version field that is unparseable is optimistically assumed to mean
/// v1.0 and the rest of the label is parsed anyway, with `consistent` false.
/// A well-formed version other than 1.0 fails with `UnexpectedValue`.
pub fn sul(buf: &[u8]) -> Result<Sul,Error> {
    if buf.len() < SUL_SIZE {
        return Err(Error::Truncated);
    }
    let mut consistent = true;
    let (major,minor) = match parse_revision(&buf[4..9]) {
        Some((1,0)) => (1,0),
        Some((_major,_minor)) => return Err(Error::UnexpectedValue),
        None => {
            // probably not DLIS or badly corrupted, but assume revision 1 and
            // let a later protocol violation prove us wrong
            debug!("unparseable SUL version field {:?}, assuming V1.00",&buf[4..9]);
            consistent = false;
            (1,0)
        }
    };

    let seqnum = ascii_int(&buf[0..4]);
    let maxlen = ascii_int(&buf[15..20]);
    let layout = match &buf[9..15] == b"RECORD" {
        true => Layout::Record,
        false => Layout::Unknown
    };
    let id = crate::decode_string(&buf[20..80],&[crate::TextEncoding::Latin1])
        .trim_end_matches([' ','\0']).to_string();

    if seqnum <= 0 || layout == Layout::Unknown {
        consistent = false;
    }
    // a max-length of zero is valid if the text was an explicit zero
    if maxlen <= 0 && !is_zero_string(&buf[15..20]) {
        consistent = false;
    }

    Ok(Sul {
        seqnum: seqnum as i32,
        major,
        minor,
        layout,
        maxlen: i64::max(maxlen,0),
        id,
        consistent
    })
}

/// Search `buf` for something that is probably the storage unit label.
///
/// Some files carry random bytes ahead of the SUL; often the rest of the file
/// is fine.  The check is not exhaustive, call `sul` on the result to know it
/// really is one.  `Inconsistent` means the signature is there but too close
/// to the start of the buffer to ever form a proper label; that usually takes
/// manual inspection to untangle.
pub fn find_sul(buf: &[u8]) -> Result<usize,Error> {
    const STRUCTURE_OFFSET: usize = 9;
    match buf.windows(6).position(|w| w == b"RECORD") {
        Some(pos) if pos >= STRUCTURE_OFFSET => Ok(pos - STRUCTURE_OFFSET),
        Some(_) => Err(Error::Inconsistent),
        None => Err(Error::NotFound)
    }
}

/// Search `buf` for the visible record envelope pattern `0xFF 0x01`.
/// Behaves like `find_sul`.
pub fn find_vrl(buf: &[u8]) -> Result<usize,Error> {
    match buf.windows(2).position(|w| w == [0xff,0x01]) {
        Some(pos) if pos >= 2 => Ok(pos - 2),
        Some(_) => Err(Error::Inconsistent),
        None => Err(Error::NotFound)
    }
}

/// Read up to `search_limit` bytes from the start of the stream and locate
/// the storage unit label.  Leaves the stream positioned at the label.
pub fn locate_sul(stream: &mut dyn Stream,search_limit: usize) -> Result<i64,Error> {
    stream.seek(0)?;
    let mut buf = vec![0u8;search_limit];
    let nread = stream.read(&mut buf)?;
    let offset = find_sul(&buf[0..nread])? as i64;
    stream.seek(offset)?;
    Ok(offset)
}

/// Read up to `search_limit` bytes starting at `from` and locate a visible
/// record label.  Leaves the stream positioned at the label.
pub fn locate_vrl(stream: &mut dyn Stream,from: i64,search_limit: usize) -> Result<i64,Error> {
    if from < 0 {
        return Err(Error::InvalidArgs);
    }
    stream.seek(from)?;
    let mut buf = vec![0u8;search_limit];
    let nread = stream.read(&mut buf)?;
    let offset = from + find_vrl(&buf[0..nread])? as i64;
    stream.seek(offset)?;
    Ok(offset)
}

/// Logical Record Segment Header
#[derive(BinRead,Debug,Clone,Copy)]
#[br(big)]
pub struct Lrsh {
    /// segment length including this header
    pub length: u16,
    pub attrs: u8,
    pub rtype: u8
}

impl Lrsh {
    pub fn parse(buf: &[u8]) -> Result<Self,Error> {
        let mut curs = std::io::Cursor::new(buf);
        Self::read(&mut curs).or(Err(Error::Truncated))
    }
}

/// Query the encryption packet without reading it.
/// Returns the length of the packet body and the company code.
pub fn encryption_packet_info(buf: &[u8]) -> Result<(u16,u16),Error> {
    let mut cur = Cursor::new(buf);
    let len = types::unorm(&mut cur)?;
    let cc = types::unorm(&mut cur)?;
    if len < 4 {
        return Err(Error::Inconsistent);
    }
    if len % 2 != 0 {
        return Err(Error::UnexpectedValue);
    }
    Ok((len - 4,cc))
}

/// How many trailing bytes of a segment body are trailer, not payload:
/// pad bytes (count in the last byte), trailing length (2), checksum (2).
/// Encrypted segments are never trimmed, the trailer is encrypted with the
/// rest.  A pad count exceeding the body fails with `BadSize`; the caller may
/// elect to drop the segment, see `extract`.
pub fn trim_record_segment(attrs: u8,body: &[u8]) -> Result<usize,Error> {
    let trim = raw_trim(attrs,body)?;
    if trim > body.len() {
        return Err(Error::BadSize);
    }
    Ok(trim)
}

fn raw_trim(attrs: u8,body: &[u8]) -> Result<usize,Error> {
    if attrs & SEGATTR_ENCRYPT != 0 {
        return Ok(0);
    }
    let mut trim = 0usize;
    if attrs & SEGATTR_TRAILEN != 0 {
        trim += 2;
    }
    if attrs & SEGATTR_CHCKSUM != 0 {
        trim += 2;
    }
    if attrs & SEGATTR_PADDING != 0 {
        if body.len() < trim + 1 {
            return Err(Error::BadSize);
        }
        trim += body[body.len() - trim - 1] as usize;
    }
    Ok(trim)
}

/// An assembled logical record.  Per-segment attribute bits are consumed
/// during assembly; only explicit-format and encrypted survive.
#[derive(Debug,Clone)]
pub struct Record {
    pub rtype: u8,
    pub attributes: u8,
    pub consistent: bool,
    pub data: Vec<u8>
}

impl Record {
    pub fn is_explicit(&self) -> bool {
        self.attributes & SEGATTR_EXFMTLR != 0
    }
    pub fn is_encrypted(&self) -> bool {
        self.attributes & SEGATTR_ENCRYPT != 0
    }
}

/// segment attributes are consistent if the first lacks a predecessor, the
/// last lacks a successor, interior segments have both, and the explicit and
/// encrypted bits agree across all of them
fn attr_consistent(attrs: &[u8]) -> bool {
    if attrs.len() == 0 {
        return true;
    }
    if attrs[0] & SEGATTR_PREDSEG != 0 {
        return false;
    }
    if attrs[attrs.len()-1] & SEGATTR_SUCCSEG != 0 {
        return false;
    }
    for i in 0..attrs.len() {
        if i > 0 && attrs[i] & SEGATTR_PREDSEG == 0 {
            return false;
        }
        if i < attrs.len()-1 && attrs[i] & SEGATTR_SUCCSEG == 0 {
            return false;
        }
        let fmtenc = SEGATTR_EXFMTLR | SEGATTR_ENCRYPT;
        if attrs[i] & fmtenc != attrs[0] & fmtenc {
            return false;
        }
    }
    true
}

/// Extract the full logical record starting at `tell`.
pub fn extract(stream: &mut dyn Stream,tell: i64,handler: &mut dyn ErrorHandler) -> Result<Record,DYNERR> {
    extract_limited(stream,tell,i64::MAX,handler)
}

/// Extract the logical record at `tell`, stopping after roughly `bytes` of
/// payload.  The budget lets callers peel off just a record's leading obname
/// without assembling megabytes of frame data.
pub fn extract_limited(stream: &mut dyn Stream,tell: i64,bytes: i64,
    handler: &mut dyn ErrorHandler) -> Result<Record,DYNERR> {
    let mut attributes: Vec<u8> = Vec::new();
    let mut types_seen: Vec<u8> = Vec::new();
    let mut data: Vec<u8> = Vec::new();

    stream.seek(tell).map_err(Error::Stream)?;

    loop {
        let mut buf = [0u8;LRSH_SIZE];
        let nread = stream.read(&mut buf).map_err(Error::Stream)?;
        if nread < LRSH_SIZE {
            log::error!("unable to read segment header at ltell {}, file truncated",stream.ltell());
            return Err(Box::new(Error::Truncated));
        }
        let lrsh = Lrsh::parse(&buf)?;
        if (lrsh.length as usize) < LRSH_SIZE {
            return Err(Box::new(Error::BadSize));
        }
        let len = lrsh.length as usize - LRSH_SIZE;
        trace!("segment at ltell {}: {} body bytes, attrs {:02X}, type {}",
            stream.ltell() as i64 - LRSH_SIZE as i64,len,lrsh.attrs,lrsh.rtype);

        attributes.push(lrsh.attrs);
        types_seen.push(lrsh.rtype);

        let prevsize = data.len();
        let remaining = bytes - prevsize as i64;

        // a partial segment read is fine when nothing needs trimming
        let mut to_read = len;
        let no_trailer = lrsh.attrs & (SEGATTR_PADDING | SEGATTR_TRAILEN | SEGATTR_CHCKSUM) == 0;
        if no_trailer && remaining < len as i64 {
            to_read = remaining as usize;
        }

        data.resize(prevsize + to_read,0);
        let nread = stream.read(&mut data[prevsize..]).map_err(Error::Stream)?;
        if nread < to_read {
            log::error!("unable to read segment body at ltell {}, file truncated",stream.ltell());
            return Err(Box::new(Error::Truncated));
        }

        match trim_record_segment(lrsh.attrs,&data[prevsize..]) {
            Ok(trim) => data.truncate(data.len() - trim),
            Err(Error::BadSize) => {
                let trim = match raw_trim(lrsh.attrs,&data[prevsize..]) {
                    Ok(t) => t,
                    Err(e) => return Err(Box::new(e))
                };
                // a common misreading of the standard counts the header in the
                // pad count; drop the whole segment in that case
                if trim != len + LRSH_SIZE {
                    return Err(Box::new(Error::BadSize));
                }
                handler.log(Severity::Minor,"extract (trim segment)",
                    "trim size (padbytes + checksum + trailing length) equals the full segment length",
                    "2.2.2.1 Logical Record Segment Header (LRSH); 2.2.2.4 Logical Record Segment Trailer (LRST)",
                    "segment is skipped","")?;
                data.truncate(prevsize);
            },
            Err(e) => return Err(Box::new(e))
        }

        let has_successor = lrsh.attrs & SEGATTR_SUCCSEG != 0;
        let bytes_left = bytes - data.len() as i64;
        if has_successor && bytes_left > 0 {
            continue;
        }

        let fmtenc = SEGATTR_EXFMTLR | SEGATTR_ENCRYPT;
        let mut rec = Record {
            rtype: types_seen[0],
            attributes: attributes[0] & fmtenc,
            consistent: attr_consistent(&attributes) && types_seen.iter().all(|t| *t == types_seen[0]),
            data
        };
        if bytes_left < 0 {
            rec.data.truncate(bytes as usize);
        }
        return Ok(rec);
    }
}

/// One entry of the logical record index.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub struct RecordInfo {
    pub ltell: i64,
    pub rtype: u8,
    /// total byte count of the logical record, headers included
    pub size: usize,
    pub consistent: bool
}

/// Index of one logical file, partitioned by record format.
/// A `broken` entry marks the last known-good tell when indexing aborted.
#[derive(Debug,Clone,Default)]
pub struct Index {
    pub explicits: Vec<RecordInfo>,
    pub implicits: Vec<RecordInfo>,
    pub broken: Vec<i64>
}

impl Index {
    pub fn size(&self) -> usize {
        self.explicits.len() + self.implicits.len()
    }
    pub fn is_incomplete(&self) -> bool {
        self.broken.len() > 0
    }
}

/// Walk logical record segments from the current tell and build the index of
/// one logical file.
///
/// Indexing stops cleanly at EOF, or just before the FILE-HEADER record that
/// opens the next logical file (the stream is then positioned to re-enter at
/// that record).  Irrecoverable structural errors log CRITICAL, record the
/// current tell in `broken`, and stop.
pub fn index_records(stream: &mut dyn Stream,handler: &mut dyn ErrorHandler) -> Result<Index,DYNERR> {
    let mut index = Index::default();

    let mut lr_tell = stream.ltell();
    let mut lrs_tell = lr_tell;
    let mut has_successor = false;
    let mut seg_attrs: Vec<u8> = Vec::new();
    let mut lr_type = 0u8;
    let mut lr_size = 0usize;

    loop {
        let mut buf = [0u8;LRSH_SIZE];
        let nread = match stream.read(&mut buf) {
            Ok(n) => n,
            Err(e) => {
                handler.log(Severity::Critical,"dlis::index_records",&e.to_string(),"",
                    "indexing is suspended at last valid logical record","")?;
                index.broken.push(lr_tell);
                break;
            }
        };

        if stream.eof() && nread == 0 {
            if has_successor {
                handler.log(Severity::Critical,"dlis::index_records",
                    "reached EOF, but last logical record segment expects successor","",
                    "indexing is suspended at last valid logical record","")?;
                index.broken.push(lr_tell);
            }
            break;
        }
        if nread < LRSH_SIZE {
            handler.log(Severity::Critical,"dlis::index_records",
                "file truncated in logical record segment header","",
                "indexing is suspended at last valid logical record","")?;
            index.broken.push(lr_tell);
            break;
        }

        let lrsh = Lrsh::parse(&buf)?;
        if (lrsh.length as usize) < LRSH_SIZE {
            handler.log(Severity::Critical,"dlis::index_records",
                &format!("too short logical record segment, length was {}",lrsh.length),"",
                "indexing is suspended at last valid logical record","")?;
            index.broken.push(lr_tell);
            break;
        }

        let is_explicit = lrsh.attrs & SEGATTR_EXFMTLR != 0;
        let has_predecessor = lrsh.attrs & SEGATTR_PREDSEG != 0;

        if !has_predecessor && is_explicit && lrsh.rtype == 0 && index.explicits.len() > 0 {
            // a FILE-HEADER that is not the first record starts the next
            // logical file; leave the tell on it for the next indexing pass
            if has_successor {
                handler.log(Severity::Critical,"dlis::index_records",
                    "end of logical file, but last logical record segment expects successor","",
                    "indexing is suspended at last valid logical record","")?;
                index.broken.push(lr_tell);
                break;
            }
            stream.seek(lrs_tell).map_err(Error::Stream)?;
            break;
        }

        if !has_predecessor {
            seg_attrs.clear();
            lr_type = lrsh.rtype;
            lr_size = 0;
        }
        seg_attrs.push(lrsh.attrs);
        has_successor = lrsh.attrs & SEGATTR_SUCCSEG != 0;
        lr_size += lrsh.length as usize;
        lrs_tell += lrsh.length as i64;

        // a seek alone cannot prove the segment is all there, so probe its
        // final byte
        let mut tmp = [0u8;1];
        let probe = match stream.seek(lrs_tell - 1) {
            Ok(()) => stream.read(&mut tmp),
            Err(e) => Err(e)
        };
        match probe {
            Ok(1) => {},
            _ => {
                handler.log(Severity::Critical,"dlis::index_records",
                    "file truncated in logical record segment","",
                    "indexing is suspended at last valid logical record","")?;
                index.broken.push(lr_tell);
                break;
            }
        }

        if !has_successor {
            let info = RecordInfo {
                ltell: lr_tell,
                rtype: lr_type,
                size: lr_size,
                consistent: attr_consistent(&seg_attrs)
            };
            trace!("indexed logical record at ltell {}: type {}, {} bytes",info.ltell,info.rtype,info.size);
            if seg_attrs[0] & SEGATTR_EXFMTLR != 0 {
                index.explicits.push(info);
            } else {
                index.implicits.push(info);
            }
            lr_tell = lrs_tell;
        }
    }

    debug!("indexed {} explicit, {} implicit, {} broken",
        index.explicits.len(),index.implicits.len(),index.broken.len());
    Ok(index)
}
