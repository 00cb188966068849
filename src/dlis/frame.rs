//! # Frame Data
//!
//! Implicitly formatted logical records of type 0 carry frame data: a leading
//! obname naming the frame, then one or more rows of channel samples packed
//! back to back.  The format string for a frame is built elsewhere (from the
//! CHANNEL objects of the frame's metadata); this module applies it.
//!
//! Rows are packed into one contiguous host-native buffer with a fixed
//! stride.  Variable-width cells (idents, ascii, object references) cannot
//! live inline in a fixed stride, so each such cell is written as a
//! pointer-sized handle into a side pool owned by the same buffer.  A zero
//! handle is null; decode failures part way through a row therefore never
//! leave a cell pointing at garbage.

use std::collections::BTreeMap;
use log::trace;
use super::{packf,types,Error,RecordInfo};
use super::packf::*;
use crate::cursor::Cursor;
use crate::stream::Stream;
use crate::diag::{Severity,ErrorHandler};
use crate::DYNERR;

/// an obname is at most uvari(4) + copy(1) + ident(1+255) plus safety
const OBNAME_SIZE_MAX: i64 = 262;

/// Owned cell contents referenced from the row buffer by handle.
#[derive(Debug,Clone,PartialEq)]
pub enum Handle {
    Str(String),
    Name(types::Obname),
    Ref(types::Objref),
    AttRef(types::Attref)
}

/// Row-major frame data in host-native layout.
///
/// A cell of a variable-width column holds a `u64` handle; 0 is null,
/// any other value k refers to `handles[k-1]`.
pub struct FrameBuffer {
    pub data: Vec<u8>,
    pub rows: usize,
    pub stride: usize,
    pub handles: Vec<Handle>
}

impl FrameBuffer {
    pub fn row(&self,i: usize) -> &[u8] {
        &self.data[i*self.stride..(i+1)*self.stride]
    }
    /// resolve a handle cell, None when null
    pub fn handle(&self,row: usize,offset: usize) -> Option<&Handle> {
        let cell = u64::from_ne_bytes(self.row(row)[offset..offset+8].try_into().expect("unreachable"));
        match cell {
            0 => None,
            k => self.handles.get(k as usize - 1)
        }
    }
}

/// bytes one row of this format occupies in the buffer
pub fn row_stride(fmt: &str) -> Result<usize,Error> {
    let mut stride = 0;
    for c in fmt.chars() {
        stride += match c {
            FMT_FSHORT | FMT_FSINGL | FMT_ISINGL | FMT_VSINGL => 4,
            FMT_FSING1 | FMT_CSINGL | FMT_FDOUBL => 8,
            FMT_FSING2 => 12,
            FMT_FDOUB1 | FMT_CDOUBL => 16,
            FMT_FDOUB2 => 24,
            FMT_SSHORT | FMT_USHORT | FMT_STATUS => 1,
            FMT_SNORM | FMT_UNORM => 2,
            FMT_SLONG | FMT_ULONG | FMT_UVARI | FMT_ORIGIN => 4,
            FMT_DTIME => 32,
            FMT_IDENT | FMT_ASCII | FMT_UNITS | FMT_OBNAME | FMT_OBJREF | FMT_ATTREF => 8,
            _ => return Err(Error::InvalidArgs)
        };
    }
    Ok(stride)
}

fn push_handle(dst: &mut Vec<u8>,handles: &mut Vec<Handle>,h: Handle) {
    handles.push(h);
    dst.extend_from_slice(&(handles.len() as u64).to_ne_bytes());
}

/// decode one row, appending exactly `row_stride(fmt)` bytes
fn pack_row(fmt: &str,cur: &mut Cursor,dst: &mut Vec<u8>,handles: &mut Vec<Handle>) -> Result<(),Error> {
    for c in fmt.chars() {
        match c {
            FMT_IDENT | FMT_UNITS => {
                let s = types::ident(cur)?;
                push_handle(dst,handles,Handle::Str(s));
            },
            FMT_ASCII => {
                let s = types::ascii(cur)?;
                push_handle(dst,handles,Handle::Str(s));
            },
            FMT_OBNAME => {
                let name = types::obname(cur)?;
                push_handle(dst,handles,Handle::Name(name));
            },
            FMT_OBJREF => {
                let objref = types::objref(cur)?;
                push_handle(dst,handles,Handle::Ref(objref));
            },
            FMT_ATTREF => {
                let attref = types::attref(cur)?;
                push_handle(dst,handles,Handle::AttRef(attref));
            },
            _ => {
                packf::pack(&c.to_string(),cur,dst)?;
            }
        }
    }
    Ok(())
}

/// Decode every logical record in `tells` against one frame format.
///
/// All the tells must belong to the same frame, so every record is rows of
/// the same format.  A record that fails to decode logs CRITICAL with its
/// physical tell and row index; the rows before the failure are kept and
/// decoding continues with the next record.
pub fn read_frames(stream: &mut dyn Stream,fmt: &str,tells: &[i64],
    handler: &mut dyn ErrorHandler) -> Result<FrameBuffer,DYNERR> {
    let stride = row_stride(fmt)?;
    if stride == 0 {
        return Err(Box::new(Error::InvalidArgs));
    }
    let mut data: Vec<u8> = Vec::with_capacity(tells.len() * stride);
    let mut handles: Vec<Handle> = Vec::new();
    let mut rows = 0;

    for tell in tells {
        let rec = super::extract(stream,*tell,handler)?;
        if rec.is_encrypted() {
            handler.log(Severity::Critical,"dlis::read_frames",
                &format!("encrypted record at ltell {}",tell),"",
                "record is skipped","")?;
            continue;
        }
        let mut cur = Cursor::new(&rec.data);
        // the leading obname identifies the frame, the caller already knows it
        if let Err(e) = types::obname(&mut cur) {
            handler.log(Severity::Critical,"dlis::read_frames",
                &format!("could not read obname of record at ltell {}: {}",tell,e),"",
                "record is skipped","")?;
            continue;
        }
        while !cur.is_empty() {
            let row_start = data.len();
            let n_handles = handles.len();
            match pack_row(fmt,&mut cur,&mut data,&mut handles) {
                Ok(()) => rows += 1,
                Err(e) => {
                    handler.log(Severity::Critical,"dlis::read_frames",
                        &format!("error parsing frame data: {}",e),"",
                        "row is dropped, continue with next record",
                        &format!("physical tell {}, row {}",stream.ptell(),rows))?;
                    data.truncate(row_start);
                    handles.truncate(n_handles);
                    break;
                }
            }
        }
    }
    data.shrink_to_fit();
    trace!("decoded {} rows of stride {}",rows,stride);
    Ok(FrameBuffer { data, rows, stride, handles })
}

/// Group implicit records by the frame they belong to.
///
/// Reads just the leading obname of every type-0 implicit record and maps the
/// frame fingerprint to the tells that carry its data, in file order.
pub fn find_fdata(stream: &mut dyn Stream,implicits: &[RecordInfo],
    handler: &mut dyn ErrorHandler) -> Result<BTreeMap<String,Vec<i64>>,DYNERR> {
    let mut index: BTreeMap<String,Vec<i64>> = BTreeMap::new();

    for info in implicits {
        let rec = match super::extract_limited(stream,info.ltell,OBNAME_SIZE_MAX,handler) {
            Ok(rec) => rec,
            Err(e) => {
                handler.log(Severity::Critical,"dlis::find_fdata",&e.to_string(),"",
                    "record is skipped","")?;
                continue;
            }
        };
        if rec.is_encrypted() || rec.rtype != 0 || rec.data.len() == 0 {
            continue;
        }
        let mut cur = Cursor::new(&rec.data);
        let name = match types::obname(&mut cur) {
            Ok(name) => name,
            Err(_) => {
                handler.log(Severity::Critical,"dlis::find_fdata",
                    "fdata record corrupted, error on reading obname","",
                    "record is skipped","")?;
                continue;
            }
        };
        index.entry(name.fingerprint("FRAME")).or_insert_with(Vec::new).push(info.ltell);
    }
    Ok(index)
}
