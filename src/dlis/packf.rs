//! # DLIS Format Descriptors
//!
//! A format string names one primitive per ASCII character and drives batch
//! decoding of frame rows.  `pack` decodes one instance of every character and
//! writes the host-native representation into a byte sink with no padding, so
//! a value can be recovered by computing its offset and copying it out.
//!
//! Strings are written as an `i32` length followed by the raw bytes.  Compound
//! types are written field by field in the same packed form.

use super::types;
use super::Error;
use crate::cursor::Cursor;

pub const FMT_EOL: char = '\0';
pub const FMT_FSHORT: char = 'r';
pub const FMT_FSINGL: char = 'f';
pub const FMT_FSING1: char = 'b';
pub const FMT_FSING2: char = 'B';
pub const FMT_ISINGL: char = 'x';
pub const FMT_VSINGL: char = 'V';
pub const FMT_FDOUBL: char = 'F';
pub const FMT_FDOUB1: char = 'z';
pub const FMT_FDOUB2: char = 'Z';
pub const FMT_CSINGL: char = 'c';
pub const FMT_CDOUBL: char = 'C';
pub const FMT_SSHORT: char = 'd';
pub const FMT_SNORM: char = 'D';
pub const FMT_SLONG: char = 'l';
pub const FMT_USHORT: char = 'u';
pub const FMT_UNORM: char = 'U';
pub const FMT_ULONG: char = 'L';
pub const FMT_UVARI: char = 'i';
pub const FMT_IDENT: char = 's';
pub const FMT_ASCII: char = 'S';
pub const FMT_DTIME: char = 'j';
pub const FMT_ORIGIN: char = 'J';
pub const FMT_OBNAME: char = 'o';
pub const FMT_OBJREF: char = 'O';
pub const FMT_ATTREF: char = 'A';
pub const FMT_STATUS: char = 'q';
pub const FMT_UNITS: char = 'Q';

/// format character for a representation code
pub fn fmt_of_reprc(reprc: types::Reprc) -> char {
    match reprc {
        types::Reprc::Fshort => FMT_FSHORT,
        types::Reprc::Fsingl => FMT_FSINGL,
        types::Reprc::Fsing1 => FMT_FSING1,
        types::Reprc::Fsing2 => FMT_FSING2,
        types::Reprc::Isingl => FMT_ISINGL,
        types::Reprc::Vsingl => FMT_VSINGL,
        types::Reprc::Fdoubl => FMT_FDOUBL,
        types::Reprc::Fdoub1 => FMT_FDOUB1,
        types::Reprc::Fdoub2 => FMT_FDOUB2,
        types::Reprc::Csingl => FMT_CSINGL,
        types::Reprc::Cdoubl => FMT_CDOUBL,
        types::Reprc::Sshort => FMT_SSHORT,
        types::Reprc::Snorm => FMT_SNORM,
        types::Reprc::Slong => FMT_SLONG,
        types::Reprc::Ushort => FMT_USHORT,
        types::Reprc::Unorm => FMT_UNORM,
        types::Reprc::Ulong => FMT_ULONG,
        types::Reprc::Uvari => FMT_UVARI,
        types::Reprc::Ident => FMT_IDENT,
        types::Reprc::Ascii => FMT_ASCII,
        types::Reprc::Dtime => FMT_DTIME,
        types::Reprc::Origin => FMT_ORIGIN,
        types::Reprc::Obname => FMT_OBNAME,
        types::Reprc::Objref => FMT_OBJREF,
        types::Reprc::Attref => FMT_ATTREF,
        types::Reprc::Status => FMT_STATUS,
        types::Reprc::Units => FMT_UNITS
    }
}

/// representation code for a format character
pub fn reprc_of_fmt(c: char) -> Option<types::Reprc> {
    match c {
        FMT_FSHORT => Some(types::Reprc::Fshort),
        FMT_FSINGL => Some(types::Reprc::Fsingl),
        FMT_FSING1 => Some(types::Reprc::Fsing1),
        FMT_FSING2 => Some(types::Reprc::Fsing2),
        FMT_ISINGL => Some(types::Reprc::Isingl),
        FMT_VSINGL => Some(types::Reprc::Vsingl),
        FMT_FDOUBL => Some(types::Reprc::Fdoubl),
        FMT_FDOUB1 => Some(types::Reprc::Fdoub1),
        FMT_FDOUB2 => Some(types::Reprc::Fdoub2),
        FMT_CSINGL => Some(types::Reprc::Csingl),
        FMT_CDOUBL => Some(types::Reprc::Cdoubl),
        FMT_SSHORT => Some(types::Reprc::Sshort),
        FMT_SNORM => Some(types::Reprc::Snorm),
        FMT_SLONG => Some(types::Reprc::Slong),
        FMT_USHORT => Some(types::Reprc::Ushort),
        FMT_UNORM => Some(types::Reprc::Unorm),
        FMT_ULONG => Some(types::Reprc::Ulong),
        FMT_UVARI => Some(types::Reprc::Uvari),
        FMT_IDENT => Some(types::Reprc::Ident),
        FMT_ASCII => Some(types::Reprc::Ascii),
        FMT_DTIME => Some(types::Reprc::Dtime),
        FMT_ORIGIN => Some(types::Reprc::Origin),
        FMT_OBNAME => Some(types::Reprc::Obname),
        FMT_OBJREF => Some(types::Reprc::Objref),
        FMT_ATTREF => Some(types::Reprc::Attref),
        FMT_STATUS => Some(types::Reprc::Status),
        FMT_UNITS => Some(types::Reprc::Units),
        _ => None
    }
}

/// memory size of one packed value, None when it depends on the data
fn memory_size(c: char) -> Result<Option<usize>,Error> {
    match c {
        FMT_FSHORT | FMT_FSINGL | FMT_ISINGL | FMT_VSINGL => Ok(Some(4)),
        FMT_FSING1 | FMT_CSINGL | FMT_FDOUBL => Ok(Some(8)),
        FMT_FSING2 => Ok(Some(12)),
        FMT_FDOUB1 | FMT_CDOUBL => Ok(Some(16)),
        FMT_FDOUB2 => Ok(Some(24)),
        FMT_SSHORT | FMT_USHORT | FMT_STATUS => Ok(Some(1)),
        FMT_SNORM | FMT_UNORM => Ok(Some(2)),
        FMT_SLONG | FMT_ULONG => Ok(Some(4)),
        // variable on disk, fixed in memory
        FMT_UVARI | FMT_ORIGIN => Ok(Some(4)),
        // dtime unpacks to eight i32 fields
        FMT_DTIME => Ok(Some(32)),
        FMT_IDENT | FMT_ASCII | FMT_UNITS | FMT_OBNAME | FMT_OBJREF | FMT_ATTREF => Ok(None),
        _ => Err(Error::InvalidArgs)
    }
}

/// Disk and memory size of one instance of the format.
///
/// Either element is None when a variable-width primitive makes the size
/// depend on the data: `i J s S o O A Q` are variable on disk, `s S o O A Q`
/// also in memory.  An unknown character fails with `InvalidArgs`.
pub fn packed_size(fmt: &str) -> Result<(Option<usize>,Option<usize>),Error> {
    let mut disk = Some(0usize);
    let mut mem = Some(0usize);
    for c in fmt.chars() {
        let reprc = match reprc_of_fmt(c) {
            Some(r) => r,
            None => return Err(Error::InvalidArgs)
        };
        disk = match (disk,reprc.size_on_disk()) {
            (Some(d),s) if s != types::VARIABLE_LENGTH => Some(d + s),
            _ => None
        };
        mem = match (mem,memory_size(c)?) {
            (Some(m),Some(s)) => Some(m + s),
            _ => None
        };
    }
    Ok((disk,mem))
}

/// Report whether the format is variable-sized on disk and in memory.
pub fn pack_varsize(fmt: &str) -> Result<(bool,bool),Error> {
    let (disk,mem) = packed_size(fmt)?;
    Ok((disk.is_none(),mem.is_none()))
}

fn pack_str(dst: &mut Vec<u8>,s: &str) {
    let bytes = crate::encode_string(s);
    dst.extend_from_slice(&(bytes.len() as i32).to_ne_bytes());
    dst.extend_from_slice(&bytes);
}

fn pack_obname(dst: &mut Vec<u8>,name: &types::Obname) {
    dst.extend_from_slice(&name.origin.to_ne_bytes());
    dst.push(name.copy);
    pack_str(dst,&name.id);
}

/// Decode one instance of every character in `fmt` and append the host-native
/// representation to `dst`.  Returns the number of bytes written.
pub fn pack(fmt: &str,cur: &mut Cursor,dst: &mut Vec<u8>) -> Result<usize,Error> {
    let start = dst.len();
    for c in fmt.chars() {
        match c {
            FMT_EOL => break,
            FMT_FSHORT => dst.extend_from_slice(&types::fshort(cur)?.to_ne_bytes()),
            FMT_FSINGL => dst.extend_from_slice(&types::fsingl(cur)?.to_ne_bytes()),
            FMT_ISINGL => dst.extend_from_slice(&types::isingl(cur)?.to_ne_bytes()),
            FMT_VSINGL => dst.extend_from_slice(&types::vsingl(cur)?.to_ne_bytes()),
            FMT_FDOUBL => dst.extend_from_slice(&types::fdoubl(cur)?.to_ne_bytes()),
            FMT_FSING1 => {
                let (v,a) = types::fsing1(cur)?;
                dst.extend_from_slice(&v.to_ne_bytes());
                dst.extend_from_slice(&a.to_ne_bytes());
            },
            FMT_FSING2 => {
                let (v,a,b) = types::fsing2(cur)?;
                dst.extend_from_slice(&v.to_ne_bytes());
                dst.extend_from_slice(&a.to_ne_bytes());
                dst.extend_from_slice(&b.to_ne_bytes());
            },
            FMT_CSINGL => {
                let (re,im) = types::csingl(cur)?;
                dst.extend_from_slice(&re.to_ne_bytes());
                dst.extend_from_slice(&im.to_ne_bytes());
            },
            FMT_FDOUB1 => {
                let (v,a) = types::fdoub1(cur)?;
                dst.extend_from_slice(&v.to_ne_bytes());
                dst.extend_from_slice(&a.to_ne_bytes());
            },
            FMT_FDOUB2 => {
                let (v,a,b) = types::fdoub2(cur)?;
                dst.extend_from_slice(&v.to_ne_bytes());
                dst.extend_from_slice(&a.to_ne_bytes());
                dst.extend_from_slice(&b.to_ne_bytes());
            },
            FMT_CDOUBL => {
                let (re,im) = types::cdoubl(cur)?;
                dst.extend_from_slice(&re.to_ne_bytes());
                dst.extend_from_slice(&im.to_ne_bytes());
            },
            FMT_SSHORT => dst.extend_from_slice(&types::sshort(cur)?.to_ne_bytes()),
            FMT_SNORM => dst.extend_from_slice(&types::snorm(cur)?.to_ne_bytes()),
            FMT_SLONG => dst.extend_from_slice(&types::slong(cur)?.to_ne_bytes()),
            FMT_USHORT => dst.push(types::ushort(cur)?),
            FMT_UNORM => dst.extend_from_slice(&types::unorm(cur)?.to_ne_bytes()),
            FMT_ULONG => dst.extend_from_slice(&types::ulong(cur)?.to_ne_bytes()),
            FMT_UVARI | FMT_ORIGIN => dst.extend_from_slice(&types::uvari(cur)?.to_ne_bytes()),
            FMT_STATUS => dst.push(types::status(cur)? as u8),
            FMT_IDENT | FMT_UNITS => {
                let s = types::ident(cur)?;
                pack_str(dst,&s);
            },
            FMT_ASCII => {
                let s = types::ascii(cur)?;
                pack_str(dst,&s);
            },
            FMT_DTIME => {
                let dt = types::dtime(cur)?;
                for field in [dt.year,dt.tz as i32,dt.month as i32,dt.day as i32,
                    dt.hour as i32,dt.minute as i32,dt.second as i32,dt.ms as i32] {
                    dst.extend_from_slice(&field.to_ne_bytes());
                }
            },
            FMT_OBNAME => {
                let name = types::obname(cur)?;
                pack_obname(dst,&name);
            },
            FMT_OBJREF => {
                let objref = types::objref(cur)?;
                pack_str(dst,&objref.rtype);
                pack_obname(dst,&objref.name);
            },
            FMT_ATTREF => {
                let attref = types::attref(cur)?;
                pack_str(dst,&attref.rtype);
                pack_obname(dst,&attref.name);
                pack_str(dst,&attref.label);
            },
            _ => return Err(Error::UnexpectedValue)
        }
    }
    Ok(dst.len() - start)
}
