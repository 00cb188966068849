//! # LIS Frame Data
//!
//! Applies a DFSR-derived format string to the implicit (normal/alternate
//! data) records that follow it.  LIS frames never carry variable-width
//! values, so unlike the DLIS counterpart the output is a plain fixed-stride
//! buffer with no side pool.

use log::trace;
use super::{packf,Error,Record,RecordInfo};
use crate::cursor::Cursor;
use crate::stream::Stream;
use crate::diag::{Severity,ErrorHandler};
use crate::DYNERR;

/// Row-major frame data in host-native layout.
pub struct FrameBuffer {
    pub data: Vec<u8>,
    pub rows: usize,
    pub stride: usize
}

impl FrameBuffer {
    pub fn row(&self,i: usize) -> &[u8] {
        &self.data[i*self.stride..(i+1)*self.stride]
    }
}

/// Decode every implicit record in `infos` against one frame format.
///
/// A record that fails to decode logs CRITICAL with its physical tell and row
/// index; rows decoded before the failure are kept and decoding continues
/// with the next record.
pub fn read_frames(stream: &mut dyn Stream,fmt: &str,infos: &[RecordInfo],
    handler: &mut dyn ErrorHandler) -> Result<FrameBuffer,DYNERR> {
    let stride = match packf::packed_size(fmt)? {
        (_,Some(stride)) if stride > 0 => stride,
        _ => return Err(Box::new(Error::InvalidArgs))
    };
    let mut data: Vec<u8> = Vec::with_capacity(infos.len() * stride);
    let mut rows = 0;

    for info in infos {
        let rec = match super::read_record(stream,info) {
            Ok(rec) => rec,
            Err(e) => {
                handler.log(Severity::Critical,"lis::read_frames",
                    &format!("could not read record at ltell {}: {}",info.ltell,e),"",
                    "record is skipped","")?;
                continue;
            }
        };
        decode_rows(&rec,fmt,&mut data,&mut rows,stream.ptell(),handler)?;
    }
    data.shrink_to_fit();
    trace!("decoded {} rows of stride {}",rows,stride);
    Ok(FrameBuffer { data, rows, stride })
}

fn decode_rows(rec: &Record,fmt: &str,data: &mut Vec<u8>,rows: &mut usize,
    ptell: i64,handler: &mut dyn ErrorHandler) -> crate::STDRESULT {
    let mut cur = Cursor::new(&rec.data);
    while !cur.is_empty() {
        let row_start = data.len();
        match packf::pack(fmt,&mut cur,data) {
            Ok(_written) => *rows += 1,
            Err(e) => {
                handler.log(Severity::Critical,"lis::read_frames",
                    &format!("error parsing frame data: {}",e),"",
                    "row is dropped, continue with next record",
                    &format!("physical tell {}, row {}",ptell,rows))?;
                data.truncate(row_start);
                break;
            }
        }
    }
    Ok(())
}
