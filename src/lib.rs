//! # `wellkit` main library
//!
//! This library reads the two classic well log interchange formats, DLIS
//! (RP66 v1) and LIS79.  Both are binary, record-oriented formats; the work
//! is reconstructing logical records from their layered envelopes and turning
//! them into typed, named objects and tabular frame data.
//!
//! ## Architecture
//!
//! Reading a file goes through three layers:
//! * `stream` presents a uniform read/seek/tell view over a stack of byte
//!   sources: a raw file, optionally wrapped in a tape image layer, optionally
//!   wrapped in the DLIS visible record layer
//! * the envelope walkers in `dlis` and `lis` stitch logical records out of
//!   segmented physical records and build a seekable index of record tells
//! * the semantic layers turn record bodies into data: `dlis::eflr` parses
//!   object sets with template defaults, `lis::protocol` parses data format
//!   specifications, and the `frame` modules decode frame data into row-major
//!   buffers
//!
//! Files in the wild violate their standards constantly, so parsers log
//! structured `diag::Diagnostic`s and keep going where recovery is plausible.
//! Hard failures are typed errors per module.
//!
//! ## Example
//!
//! Indexing a DLIS file and querying its channels:
//!
//! ```no_run
//! use wellkit::{dlis,diag};
//!
//! let (label,mut stream) = wellkit::create_dlis_stream_from_file("log.dlis").expect("open failed");
//! let mut handler = diag::LogHandler;
//! let index = dlis::index_records(stream.as_mut(),&mut handler).expect("indexing failed");
//! let mut sets = Vec::new();
//! for info in &index.explicits {
//!     let rec = dlis::extract(stream.as_mut(),info.ltell,&mut handler).expect("extract failed");
//!     if let Ok(set) = dlis::eflr::ObjectSet::new(rec) {
//!         sets.push(set);
//!     }
//! }
//! let mut pool = dlis::pool::Pool::new(sets);
//! let channels = pool.get("CHANNEL",&dlis::pool::ExactMatcher,&mut handler).expect("query failed");
//! println!("{} ({} channels)",label.id,channels.len());
//! ```

pub mod cursor;
pub mod diag;
pub mod stream;
pub mod dlis;
pub mod lis;

use log::{info,warn};
use stream::{Stream,FileStream};
use stream::tapeimage::{self,TapeImage};
use stream::visible::VisibleRecords;

type DYNERR = Box<dyn std::error::Error>;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

/// how far into the file headers are searched for by default
pub const DEFAULT_SEARCH_LIMIT: usize = 200;

/// Fallback encodings for on-disk text that is not UTF-8.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum TextEncoding {
    /// ISO 8859-1, every byte maps to the code point of the same value
    Latin1
}

/// Decode on-disk text: try UTF-8 first, then each fallback in order; if
/// nothing fits, warn and hex-escape the raw bytes.  Embedded NULs survive.
pub fn decode_string(bytes: &[u8],fallbacks: &[TextEncoding]) -> String {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }
    for encoding in fallbacks {
        match encoding {
            TextEncoding::Latin1 => {
                return bytes.iter().map(|b| *b as char).collect();
            }
        }
    }
    warn!("string is not valid in any candidate encoding, escaping raw bytes");
    let mut ans = String::new();
    for b in bytes {
        if *b >= 0x20 && *b < 0x7f {
            ans.push(*b as char);
        } else {
            ans += &format!("\\x{}",hex::encode([*b]));
        }
    }
    ans
}

/// Inverse of `decode_string` for the Latin-1 range: characters at or below
/// U+00FF become single bytes, anything else is dropped with a warning.
pub fn encode_string(s: &str) -> Vec<u8> {
    let mut ans = Vec::new();
    for c in s.chars() {
        if (c as u32) < 0x100 {
            ans.push(c as u8);
        } else {
            warn!("dropping character `{}` (codepoint {}) outside the on-disk range",c,c as u32);
        }
    }
    ans
}

/// Open a DLIS file and build the stream stack for it: raw file, tape image
/// layer if a tape mark is sniffed, then the visible record layer positioned
/// just past the storage unit label.  Returns the parsed label and the
/// stacked stream, ready for `dlis::index_records`.
pub fn create_dlis_stream_from_file(img_path: &str) -> Result<(dlis::Sul,Box<dyn Stream>),DYNERR> {
    let file = FileStream::open(img_path,0)?;
    let mut stream: Box<dyn Stream> = Box::new(file);
    if tapeimage::hastapemark(stream.as_mut())? {
        info!("identified tape image wrapping");
        stream = Box::new(TapeImage::new(stream));
    }
    let offset = dlis::locate_sul(stream.as_mut(),DEFAULT_SEARCH_LIMIT)?;
    if offset > 0 {
        info!("storage unit label found at offset {}",offset);
    }
    let mut buf = [0u8;dlis::SUL_SIZE];
    let nread = stream.read(&mut buf).map_err(dlis::Error::Stream)?;
    if nread < dlis::SUL_SIZE {
        return Err(Box::new(dlis::Error::Truncated));
    }
    let label = dlis::sul(&buf)?;
    info!("storage set `{}`, sequence {}",label.id,label.seqnum);
    Ok((label,Box::new(VisibleRecords::new(stream))))
}

/// Open a LIS file and build the stream stack for it: raw file, plus the tape
/// image layer if a tape mark is sniffed.  Ready for `lis::index_records`.
pub fn create_lis_stream_from_file(img_path: &str) -> Result<Box<dyn Stream>,DYNERR> {
    let file = FileStream::open(img_path,0)?;
    let mut stream: Box<dyn Stream> = Box::new(file);
    if tapeimage::hastapemark(stream.as_mut())? {
        info!("identified tape image wrapping");
        stream = Box::new(TapeImage::new(stream));
    }
    Ok(stream)
}

#[test]
fn string_fallbacks() {
    assert_eq!(decode_string(b"plain",&[]),"plain");
    assert_eq!(decode_string(b"with\x00nul",&[]),"with\x00nul");
    // invalid UTF-8 falls back to Latin-1
    assert_eq!(decode_string(&[0x61,0xE9,0x62],&[TextEncoding::Latin1]),"a\u{e9}b");
    // no fallback escapes the bad byte
    assert_eq!(decode_string(&[0x61,0xE9,0x62],&[]),"a\\xe9b");
    assert_eq!(encode_string("a\u{e9}b"),vec![0x61,0xE9,0x62]);
}
