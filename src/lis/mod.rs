//! # LIS Module
//!
//! Reader for LIS79 files.  LIS is the simpler, older sibling of DLIS: the
//! file is a sequence of physical records, each with a 4-byte header, and a
//! logical record may span several physical records.  The logical record
//! header with the record type only appears at the start of the first one.
//!
//! The main aggravation of real-world LIS is padding: between two physical
//! records a writer may have inserted any number of null or space bytes, with
//! nothing announcing them.  `read_physical_header` hunts for the next real
//! header on the assumption that it starts on a 4-byte boundary; see the
//! comments there for what happens when that assumption is wrong.
//!
//! Indexing partitions records into *implicit* data records and everything
//! else (*explicit*), and stops at logical-file boundaries the way a tape
//! would: file trailers and logical EOFs end the file, reel/tape marks end it
//! and hand the tell back to the caller.

pub mod types;
pub mod packf;
pub mod protocol;
pub mod frame;
#[cfg(test)]
mod protocol_test;

use binrw::BinRead;
use log::{debug,warn,error,trace};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use crate::cursor::ShortRead;
use crate::stream::Stream;

/// Enumerates LIS reader errors.  The `Display` trait will print equivalent long message.
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("clean end of file")]
    Eof,
    #[error("unexpected end of data inside a record")]
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

pub const PRH_SIZE: usize = 4;
pub const LRH_SIZE: usize = 2;

/// Physical Record Header.  The length covers the header itself and the
/// trailer, if any.
#[derive(BinRead,Debug,Clone,Copy)]
#[br(big)]
pub struct Prh {
    pub length: u16,
    pub attributes: u16
}

impl Prh {
    pub const RECTYPE: u16 = 1 << 14;
    pub const CHCKSUM: u16 = 1 << 13 | 1 << 12;
    pub const FILENUM: u16 = 1 << 10;
    pub const RECONUM: u16 = 1 << 9;
    pub const PARIERR: u16 = 1 << 6;
    pub const CHCKERR: u16 = 1 << 5;
    pub const PREDCES: u16 = 1 << 1;
    pub const SUCCSES: u16 = 1 << 0;

    pub fn parse(buf: &[u8]) -> Result<Self,Error> {
        let mut curs = std::io::Cursor::new(buf);
        Self::read(&mut curs).or(Err(Error::Truncated))
    }
    /// byte count of the physical record trailer
    pub fn trailer_len(&self) -> usize {
        let mut ans = 0;
        if self.attributes & Self::RECONUM != 0 {
            ans += 2;
        }
        if self.attributes & Self::FILENUM != 0 {
            ans += 2;
        }
        if self.attributes & Self::CHCKSUM != 0 {
            ans += 2;
        }
        ans
    }
}

/// Logical Record Header.  Only present at the start of the first physical
/// record of a logical record.  The second byte is undefined by the standard.
#[derive(Debug,Clone,Copy)]
pub struct Lrh {
    pub rtype: u8,
    pub undefined: u8
}

impl Lrh {
    pub fn parse(buf: &[u8]) -> Result<Self,Error> {
        if buf.len() < LRH_SIZE {
            return Err(Error::Truncated);
        }
        Ok(Self { rtype: buf[0], undefined: buf[1] })
    }
}

/// All record types defined by LIS79.
#[derive(FromPrimitive,Debug,Clone,Copy,PartialEq,Eq)]
pub enum RecordType {
    NormalData = 0,
    AlternateData = 1,
    JobIdentification = 32,
    WellsiteData = 34,
    ToolStringInfo = 39,
    EncTableDump = 42,
    TableDump = 47,
    DataFormatSpec = 64,
    DataDescriptor = 65,
    Picture = 85,
    Image = 86,
    Tu10SoftwareBoot = 95,
    BootstrapLoader = 96,
    CpKernelLoader = 97,
    ProgFileHeader = 100,
    ProgOverlayHeader = 101,
    ProgOverlayLoad = 102,
    FileHeader = 128,
    FileTrailer = 129,
    TapeHeader = 130,
    TapeTrailer = 131,
    ReelHeader = 132,
    ReelTrailer = 133,
    LogicalEof = 137,
    LogicalBot = 138,
    LogicalEot = 139,
    LogicalEom = 141,
    OpCommandInputs = 224,
    OpResponseInputs = 225,
    SystemOutputs = 227,
    FlicComment = 232,
    BlankRecord = 234
}

impl RecordType {
    pub fn from_byte(x: u8) -> Option<Self> {
        FromPrimitive::from_u8(x)
    }
    pub fn name(&self) -> &'static str {
        match self {
            Self::NormalData => "Normal Data",
            Self::AlternateData => "Alternate Data",
            Self::JobIdentification => "Job Identification",
            Self::WellsiteData => "Wellsite Data",
            Self::ToolStringInfo => "Tool String Info",
            Self::EncTableDump => "Encrypted Table Dump",
            Self::TableDump => "Table Dump",
            Self::DataFormatSpec => "Data Format Specification",
            Self::DataDescriptor => "Data Descriptor",
            Self::Picture => "Picture",
            Self::Image => "Image",
            Self::Tu10SoftwareBoot => "TU10 Software Boot",
            Self::BootstrapLoader => "Bootstrap Loader",
            Self::CpKernelLoader => "CP-Kernel Loader Boot",
            Self::ProgFileHeader => "Program File Header",
            Self::ProgOverlayHeader => "Program Overlay Header",
            Self::ProgOverlayLoad => "Program Overlay Load",
            Self::FileHeader => "File Header",
            Self::FileTrailer => "File Trailer",
            Self::TapeHeader => "Tape Header",
            Self::TapeTrailer => "Tape Trailer",
            Self::ReelHeader => "Reel Header",
            Self::ReelTrailer => "Reel Trailer",
            Self::LogicalEof => "Logical EOF",
            Self::LogicalBot => "Logical BOT",
            Self::LogicalEot => "Logical EOT",
            Self::LogicalEom => "Logical EOM",
            Self::OpCommandInputs => "Operator Command Inputs",
            Self::OpResponseInputs => "Operator Response Inputs",
            Self::SystemOutputs => "System Outputs to Operator",
            Self::FlicComment => "FLIC Comment",
            Self::BlankRecord => "Blank Record/CSU Comment"
        }
    }
}

/// pad bytes are nulls or spaces, uniformly one or the other
pub fn is_padbytes(buf: &[u8]) -> bool {
    if buf.len() == 0 {
        return false;
    }
    let padfmt = buf[0];
    if padfmt != 0x00 && padfmt != 0x20 {
        return false;
    }
    buf.iter().all(|b| *b == padfmt)
}

/// Everything needed to find and extract one logical record.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub struct RecordInfo {
    /// logical tell of the first physical record
    pub ltell: i64,
    pub rtype: RecordType,
    /// total length of all physical records composing the logical record
    pub size: usize,
    pub consistent: bool
}

/// A raw logical record: the concatenation of all physical record payloads.
#[derive(Debug,Clone)]
pub struct Record {
    pub info: RecordInfo,
    pub data: Vec<u8>
}

/// Index of one logical file, partitioned by record kind.
#[derive(Debug,Clone,Default)]
pub struct RecordIndex {
    expls: Vec<RecordInfo>,
    impls: Vec<RecordInfo>,
    incomplete: bool,
    err: String
}

impl RecordIndex {
    pub fn size(&self) -> usize {
        self.expls.len() + self.impls.len()
    }
    /// true when indexing stopped on a structural error
    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }
    pub fn errmsg(&self) -> &str {
        &self.err
    }
    pub fn explicits(&self) -> &[RecordInfo] {
        &self.expls
    }
    pub fn implicits(&self) -> &[RecordInfo] {
        &self.impls
    }
    /// The contiguous run of implicit records governed by the DFSR at
    /// `dfsr_tell`: every tell strictly between the DFSR and the next one
    /// (or the end of the logical file).
    pub fn implicits_of(&self,dfsr_tell: i64) -> Result<&[RecordInfo],Error> {
        let pos = match self.expls.iter().position(|info| info.ltell == dfsr_tell) {
            Some(pos) => pos,
            None => {
                error!("could not find DFS record at tell {}",dfsr_tell);
                return Err(Error::InvalidArgs);
            }
        };
        let next_dfsr = self.expls[pos+1..].iter()
            .find(|info| info.rtype == RecordType::DataFormatSpec)
            .map(|info| info.ltell);
        let begin = self.impls.partition_point(|info| info.ltell <= dfsr_tell);
        let end = match next_dfsr {
            Some(tell) => self.impls.partition_point(|info| info.ltell <= tell),
            None => self.impls.len()
        };
        Ok(&self.impls[begin..end])
    }
}

/// Read the next physical record header, skipping any pad bytes in front of
/// it.
///
/// There is no telling whether pad bytes are present nor how many, so when
/// the first two bytes of the header candidate look like padding the reader
/// assumes the next real header starts on a 4-byte boundary, realigns, and
/// then walks 4-byte chunks until one is not all padding.  Hitting EOF while
/// walking padding is a clean EOF.
pub fn read_physical_header(stream: &mut dyn Stream) -> Result<Prh,Error> {
    // short reads end up here to be told apart: pad-into-EOF is clean,
    // anything else is truncation
    fn short(stream: &dyn Stream,buf: &[u8]) -> Error {
        if stream.eof() && (buf.len() == 0 || is_padbytes(buf)) {
            return Error::Eof;
        }
        Error::Truncated
    }

    let mut buf = [0u8;PRH_SIZE];
    let nread = stream.read(&mut buf)?;
    if nread < PRH_SIZE {
        return Err(short(stream,&buf[0..nread]));
    }

    if is_padbytes(&buf[0..2]) {
        let alignment = (stream.ptell() % PRH_SIZE as i64) as usize;
        if alignment != 0 {
            // the padding started on an uneven tell; keep the trailing bytes
            // and top up to a full aligned chunk
            warn!("pad bytes not aligned to physical record boundary at ptell {}, realigning",stream.ptell());
            let skip = PRH_SIZE - alignment;
            let mut tmp = [0u8;PRH_SIZE];
            tmp[0..alignment].copy_from_slice(&buf[skip..]);
            let nread = stream.read(&mut tmp[alignment..])?;
            if nread < skip {
                return Err(short(stream,&tmp[0..alignment+nread]));
            }
            buf = tmp;
        }
        while is_padbytes(&buf) {
            let nread = stream.read(&mut buf)?;
            if nread < PRH_SIZE {
                return Err(short(stream,&buf[0..nread]));
            }
        }
    }

    let prh = Prh::parse(&buf)?;

    // the first PR of a logical record must also hold the LRH, so the minimum
    // valid length depends on the predecessor bit and the trailer entries
    let mut mvl = match prh.attributes & Prh::PREDCES != 0 {
        true => PRH_SIZE,
        false => PRH_SIZE + LRH_SIZE
    };
    mvl += prh.trailer_len();
    if (prh.length as usize) < mvl {
        error!("too short physical record length (was {} bytes)",prh.length);
        return Err(Error::BadSize);
    }
    Ok(prh)
}

fn read_logical_header(stream: &mut dyn Stream) -> Result<Lrh,Error> {
    let mut buf = [0u8;LRH_SIZE];
    let nread = stream.read(&mut buf)?;
    if nread < LRH_SIZE {
        return Err(Error::Truncated);
    }
    Lrh::parse(&buf)
}

/// physical record attributes are consistent if the predecessor bit is set on
/// all but the first and the successor bit on all but the last
fn attr_consistent(attrs: &[u16]) -> bool {
    for (i,attr) in attrs.iter().enumerate() {
        if i == 0 && attr & Prh::PREDCES != 0 {
            return false;
        }
        if i > 0 && attr & Prh::PREDCES == 0 {
            return false;
        }
        if i == attrs.len()-1 && attr & Prh::SUCCSES != 0 {
            return false;
        }
        if i < attrs.len()-1 && attr & Prh::SUCCSES == 0 {
            return false;
        }
    }
    true
}

/// Walk one logical record from the current tell and describe it.
///
/// `Err(Eof)` is the valid termination of a logical file; truncation inside
/// the record raises `Truncated`.
pub fn index_record(stream: &mut dyn Stream) -> Result<RecordInfo,Error> {
    let mut attributes: Vec<u16> = Vec::new();

    let mut prh = read_physical_header(stream)?;
    // record the tell after the header so pad bytes never shift it
    let ltell = stream.ltell() - PRH_SIZE as i64;
    let mut length = prh.length as usize;
    attributes.push(prh.attributes);

    let lrh = match read_logical_header(stream) {
        Ok(lrh) => lrh,
        Err(_) => {
            error!("physical record at ltell {} holds no logical record header",ltell);
            return Err(Error::Truncated);
        }
    };
    let rtype = match RecordType::from_byte(lrh.rtype) {
        Some(rtype) => rtype,
        None => {
            // a fully zero'd out record also lands here eventually; 0 is a
            // valid type so only the walk itself can prove that case
            error!("invalid record type ({}) in header at ptell {}",
                lrh.rtype,stream.ptell() - LRH_SIZE as i64);
            return Err(Error::UnexpectedValue);
        }
    };

    loop {
        if prh.attributes & Prh::SUCCSES == 0 {
            // prove the record is all there by touching its last byte
            let mut tmp = [0u8;1];
            stream.seek(ltell + length as i64 - 1)?;
            let nread = stream.read(&mut tmp)?;
            if nread < 1 || stream.eof() {
                error!("physical record truncated at ltell {}",ltell);
                return Err(Error::Truncated);
            }
            break;
        }
        stream.seek(ltell + length as i64)?;
        match read_physical_header(stream) {
            Ok(next) => {
                prh = next;
                length += prh.length as usize;
                attributes.push(prh.attributes);
            },
            Err(Error::Eof) => {
                error!("missing successor physical record at ltell {}",ltell);
                return Err(Error::Truncated);
            },
            Err(e) => return Err(e)
        }
    }

    if !attr_consistent(&attributes) {
        error!("predecessor/successor inconsistency at ltell {}",ltell);
        return Err(Error::Inconsistent);
    }

    Ok(RecordInfo { ltell, rtype, size: length, consistent: true })
}

/// Index the logical file starting at the current tell.
///
/// Never fails: structural errors set the `incomplete` flag with a message
/// and the index holds everything up to the failure.  On return the stream is
/// positioned after the logical file, ready for the next one.
pub fn index_records(stream: &mut dyn Stream) -> RecordIndex {
    let mut index = RecordIndex::default();

    // leave the tell past any padding after the closing record, so the
    // caller can re-enter right at the next record
    fn reposition_tell(stream: &mut dyn Stream) {
        if let Ok(next) = index_record(stream) {
            let _ = stream.seek(next.ltell);
        }
    }

    loop {
        let info = match index_record(stream) {
            Ok(info) => info,
            Err(Error::Eof) => break,
            Err(e) => {
                index.err = e.to_string();
                index.incomplete = true;
                break;
            }
        };
        trace!("indexed {} at ltell {}, {} bytes",info.rtype.name(),info.ltell,info.size);

        if info.rtype == RecordType::NormalData || info.rtype == RecordType::AlternateData {
            index.impls.push(info);
        } else {
            index.expls.push(info);
        }

        match info.rtype {
            RecordType::ReelHeader | RecordType::ReelTrailer |
            RecordType::TapeHeader | RecordType::TapeTrailer => {
                // reel and tape records delimit physical files and are indexed
                // separately; mid-file they signal a missing file trailer
                if index.expls.len() > 1 {
                    let _ = stream.seek(info.ltell);
                    index.expls.pop();
                } else {
                    reposition_tell(stream);
                }
            },
            RecordType::FileHeader => {
                if index.expls.len() == 1 {
                    continue;
                }
                // a second file header means the file trailer went missing and
                // we have walked into the next logical file
                let _ = stream.seek(info.ltell);
                index.expls.pop();
            },
            RecordType::LogicalEof | RecordType::FileTrailer => {
                reposition_tell(stream);
            },
            _ => continue
        }
        break;
    }

    debug!("indexed {} explicit and {} implicit records{}",
        index.expls.len(),index.impls.len(),
        if index.incomplete { " (incomplete)" } else { "" });
    index
}

/// Extract the logical record described by `info`: seek to it, walk its
/// physical records and concatenate their payloads.
pub fn read_record(stream: &mut dyn Stream,info: &RecordInfo) -> Result<Record,Error> {
    let mut rec = Record { info: *info, data: Vec::new() };

    stream.seek(info.ltell)?;
    let mut prevlen = 0usize;

    loop {
        let prh = read_physical_header(stream)?;
        let trlen = prh.trailer_len();

        let mut toread = prh.length as usize - PRH_SIZE - trlen;
        // the LRH only exists in the first PR and is already in the info
        if prh.attributes & Prh::PREDCES == 0 {
            stream.seek(stream.ltell() + LRH_SIZE as i64)?;
            toread -= LRH_SIZE;
        }

        rec.data.resize(prevlen + toread,0);
        let nread = stream.read(&mut rec.data[prevlen..])?;
        if nread < toread {
            error!("record at ltell {} truncated",info.ltell);
            return Err(Error::Truncated);
        }

        if trlen > 0 {
            stream.seek(stream.ltell() + trlen as i64)?;
        }
        prevlen += toread;

        if prh.attributes & Prh::SUCCSES == 0 {
            break;
        }
    }
    Ok(rec)
}
