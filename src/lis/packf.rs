//! # LIS Format Descriptors
//!
//! The LIS counterpart of `dlis::packf`, considerably simpler because frames
//! never carry variable-width values: the alphanumeric and mask codes do not
//! encode their own length and therefore refuse to participate here.
//!
//! The suppress character marks bytes a spec block reserved but asked the
//! consumer to hide; `pack` skips one source byte per suppress with no output.

use super::types::{self,Reprc};
use super::Error;
use crate::cursor::Cursor;

pub const FMT_EOL: char = '\0';
pub const FMT_I8: char = 's';
pub const FMT_I16: char = 'i';
pub const FMT_I32: char = 'l';
pub const FMT_F16: char = 'e';
pub const FMT_F32: char = 'f';
pub const FMT_F32LOW: char = 'r';
pub const FMT_F32FIX: char = 'p';
pub const FMT_STRING: char = 'a';
pub const FMT_BYTE: char = 'b';
pub const FMT_MASK: char = 'm';
pub const FMT_SUPPRESS: char = 'S';

/// format character for a representation code
pub fn fmt_of_reprc(reprc: Reprc) -> char {
    match reprc {
        Reprc::I8 => FMT_I8,
        Reprc::I16 => FMT_I16,
        Reprc::I32 => FMT_I32,
        Reprc::F16 => FMT_F16,
        Reprc::F32 => FMT_F32,
        Reprc::F32Low => FMT_F32LOW,
        Reprc::F32Fix => FMT_F32FIX,
        Reprc::String => FMT_STRING,
        Reprc::Byte => FMT_BYTE,
        Reprc::Mask => FMT_MASK
    }
}

/// Disk and memory size of one instance of the format.
///
/// The string and mask codes make both sizes unknowable; suppress consumes a
/// disk byte and writes nothing.  Unknown characters fail with `InvalidArgs`.
pub fn packed_size(fmt: &str) -> Result<(Option<usize>,Option<usize>),Error> {
    let mut disk = Some(0usize);
    let mut mem = Some(0usize);
    for c in fmt.chars() {
        let (d,m) = match c {
            FMT_I8 | FMT_BYTE => (Some(1),Some(1)),
            FMT_I16 => (Some(2),Some(2)),
            // floats widen to the host single
            FMT_F16 => (Some(2),Some(4)),
            FMT_I32 => (Some(4),Some(4)),
            FMT_F32 | FMT_F32LOW | FMT_F32FIX => (Some(4),Some(4)),
            FMT_SUPPRESS => (Some(1),Some(0)),
            FMT_STRING | FMT_MASK => (None,None),
            _ => return Err(Error::InvalidArgs)
        };
        disk = match (disk,d) {
            (Some(a),Some(b)) => Some(a + b),
            _ => None
        };
        mem = match (mem,m) {
            (Some(a),Some(b)) => Some(a + b),
            _ => None
        };
    }
    Ok((disk,mem))
}

/// Decode one instance of every character in `fmt` and append the host-native
/// representation to `dst`.  Floating point codes widen to host `f32`.
/// The string and mask codes fail with `UnexpectedValue`.
pub fn pack(fmt: &str,cur: &mut Cursor,dst: &mut Vec<u8>) -> Result<usize,Error> {
    let start = dst.len();
    for c in fmt.chars() {
        match c {
            FMT_EOL => break,
            FMT_I8 => dst.extend_from_slice(&types::i8(cur)?.to_ne_bytes()),
            FMT_I16 => dst.extend_from_slice(&types::i16(cur)?.to_ne_bytes()),
            FMT_I32 => dst.extend_from_slice(&types::i32(cur)?.to_ne_bytes()),
            FMT_F16 => dst.extend_from_slice(&types::f16(cur)?.to_ne_bytes()),
            FMT_F32 => dst.extend_from_slice(&types::f32(cur)?.to_ne_bytes()),
            FMT_F32LOW => dst.extend_from_slice(&types::f32low(cur)?.to_ne_bytes()),
            FMT_F32FIX => dst.extend_from_slice(&types::f32fix(cur)?.to_ne_bytes()),
            FMT_BYTE => dst.push(types::byte(cur)?),
            FMT_SUPPRESS => {
                cur.skip(1)?;
            },
            // string and mask do not encode their own length and so cannot
            // appear in a frame format
            _ => return Err(Error::UnexpectedValue)
        }
    }
    Ok(dst.len() - start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::Cursor;

    #[test]
    fn sizes() {
        assert_eq!(packed_size("fff").unwrap(),(Some(12),Some(12)));
        assert_eq!(packed_size("sb").unwrap(),(Some(2),Some(2)));
        // f16 widens in memory
        assert_eq!(packed_size("e").unwrap(),(Some(2),Some(4)));
        // suppressed bytes vanish
        assert_eq!(packed_size("SSf").unwrap(),(Some(6),Some(4)));
        assert_eq!(packed_size("a").unwrap(),(None,None));
        assert!(packed_size("?").is_err());
    }

    #[test]
    fn packs_a_row() {
        let src = [
            0x2A,                 // i8 42
            0x44,0x4C,0x80,0x00,  // f32 153.0
            0x99,                 // suppressed
            0x07                  // byte 7
        ];
        let mut cur = Cursor::new(&src);
        let mut dst = Vec::new();
        let written = pack("sfSb",&mut cur,&mut dst).unwrap();
        assert_eq!(written,6);
        assert_eq!(dst[0] as i8,42);
        assert_eq!(f32::from_ne_bytes(dst[1..5].try_into().unwrap()),153.0);
        assert_eq!(dst[5],7);
    }

    #[test]
    fn refuses_unsized_types() {
        let src = [0x41,0x42];
        let mut cur = Cursor::new(&src);
        let mut dst = Vec::new();
        assert!(pack("a",&mut cur,&mut dst).is_err());
        assert!(pack("m",&mut cur,&mut dst).is_err());
    }
}
