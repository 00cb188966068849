//! # DLIS Primitive Types
//!
//! Decoders and encoders for the 27 representation codes of RP66 v1 Appendix B.
//! Everything on disk is big-endian.  Decoders take a `Cursor` and advance it;
//! encoders append to a `Vec<u8>` sink.
//!
//! The floating point family needs care: besides IEEE singles and doubles the
//! standard carries a 16-bit validity float (`fshort`), the IBM System/360
//! single (`isingl`) and the VAX F-float (`vsingl`), all of which are decoded
//! to host IEEE values.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use chrono::NaiveDateTime;
use crate::cursor::{Cursor,ShortRead};

/// value for sizes that are not knowable from the representation code alone
pub const VARIABLE_LENGTH: usize = 0;

/// Enumerates the RP66 v1 representation codes, numbered 1 through 27.
#[derive(FromPrimitive,Debug,Clone,Copy,PartialEq,Eq)]
pub enum Reprc {
    Fshort = 1,
    Fsingl = 2,
    Fsing1 = 3,
    Fsing2 = 4,
    Isingl = 5,
    Vsingl = 6,
    Fdoubl = 7,
    Fdoub1 = 8,
    Fdoub2 = 9,
    Csingl = 10,
    Cdoubl = 11,
    Sshort = 12,
    Snorm = 13,
    Slong = 14,
    Ushort = 15,
    Unorm = 16,
    Ulong = 17,
    Uvari = 18,
    Ident = 19,
    Ascii = 20,
    Dtime = 21,
    Origin = 22,
    Obname = 23,
    Objref = 24,
    Attref = 25,
    Status = 26,
    Units = 27
}

impl Reprc {
    pub fn from_byte(x: u8) -> Option<Self> {
        FromPrimitive::from_u8(x)
    }
    /// bytes on disk, or `VARIABLE_LENGTH` for self- or externally-sized codes
    pub fn size_on_disk(&self) -> usize {
        match self {
            Self::Fshort => 2,
            Self::Fsingl => 4,
            Self::Fsing1 => 8,
            Self::Fsing2 => 12,
            Self::Isingl => 4,
            Self::Vsingl => 4,
            Self::Fdoubl => 8,
            Self::Fdoub1 => 16,
            Self::Fdoub2 => 24,
            Self::Csingl => 8,
            Self::Cdoubl => 16,
            Self::Sshort => 1,
            Self::Snorm => 2,
            Self::Slong => 4,
            Self::Ushort => 1,
            Self::Unorm => 2,
            Self::Ulong => 4,
            Self::Dtime => 8,
            Self::Status => 1,
            _ => VARIABLE_LENGTH
        }
    }
}

/// Date and time with the 1900 year offset already applied.
#[derive(Debug,Clone,Copy,PartialEq,Eq,Default)]
pub struct Dtime {
    pub year: i32,
    /// timezone nibble: 0 = local standard, 1 = local daylight savings, 2 = GMT
    pub tz: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub ms: u16
}

impl Dtime {
    /// convert to a chrono timestamp, None if the fields are out of range
    pub fn naive(&self) -> Option<NaiveDateTime> {
        let date = chrono::NaiveDate::from_ymd_opt(self.year,self.month as u32,self.day as u32)?;
        date.and_hms_milli_opt(self.hour as u32,self.minute as u32,self.second as u32,self.ms as u32)
    }
}

/// Object name: the identity triple carried by every DLIS object.
#[derive(Debug,Clone,PartialEq,Eq,Default)]
pub struct Obname {
    pub origin: i32,
    pub copy: u8,
    pub id: String
}

impl Obname {
    /// Stable string rendering of `(type,origin,copy,id)`, suitable as a
    /// dictionary key.
    pub fn fingerprint(&self,rtype: &str) -> String {
        format!("T.{}-I.{}-O.{}-C.{}",rtype,self.id,self.origin,self.copy)
    }
}

impl std::fmt::Display for Obname {
    fn fmt(&self,f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f,"({},{},{})",self.origin,self.copy,self.id)
    }
}

/// Object reference: an obname qualified by the type of the set it lives in.
#[derive(Debug,Clone,PartialEq,Eq,Default)]
pub struct Objref {
    pub rtype: String,
    pub name: Obname
}

impl Objref {
    pub fn fingerprint(&self) -> String {
        self.name.fingerprint(&self.rtype)
    }
}

/// Attribute reference: an objref further qualified by an attribute label.
#[derive(Debug,Clone,PartialEq,Eq,Default)]
pub struct Attref {
    pub rtype: String,
    pub name: Obname,
    pub label: String
}

/*
 * decoders
 */

pub fn sshort(cur: &mut Cursor) -> Result<i8,ShortRead> {
    Ok(i8::from_be_bytes(cur.take_array::<1>()?))
}

pub fn snorm(cur: &mut Cursor) -> Result<i16,ShortRead> {
    Ok(i16::from_be_bytes(cur.take_array::<2>()?))
}

pub fn slong(cur: &mut Cursor) -> Result<i32,ShortRead> {
    Ok(i32::from_be_bytes(cur.take_array::<4>()?))
}

pub fn ushort(cur: &mut Cursor) -> Result<u8,ShortRead> {
    Ok(cur.take_array::<1>()?[0])
}

pub fn unorm(cur: &mut Cursor) -> Result<u16,ShortRead> {
    Ok(u16::from_be_bytes(cur.take_array::<2>()?))
}

pub fn ulong(cur: &mut Cursor) -> Result<u32,ShortRead> {
    Ok(u32::from_be_bytes(cur.take_array::<4>()?))
}

/// Variable-length unsigned integer.  The top two bits of the first byte give
/// the width: `0x` 1 byte, `10` 2 bytes, `11` 4 bytes.  Never reads more than
/// 4 bytes.
pub fn uvari(cur: &mut Cursor) -> Result<i32,ShortRead> {
    let high = cur.peek()? & 0xC0;
    match high {
        0xC0 => Ok((u32::from_be_bytes(cur.take_array::<4>()?) & 0x3FFFFFFF) as i32),
        0x80 => Ok((u16::from_be_bytes(cur.take_array::<2>()?) & 0x3FFF) as i32),
        _ => Ok(cur.take_array::<1>()?[0] as i32)
    }
}

pub fn fsingl(cur: &mut Cursor) -> Result<f32,ShortRead> {
    Ok(f32::from_be_bytes(cur.take_array::<4>()?))
}

pub fn fdoubl(cur: &mut Cursor) -> Result<f64,ShortRead> {
    Ok(f64::from_be_bytes(cur.take_array::<8>()?))
}

/// 16-bit validity float: 12-bit fraction in the high bits, 4-bit exponent in
/// the low nibble.  Negative values store the fraction in two's complement.
pub fn fshort(cur: &mut Cursor) -> Result<f32,ShortRead> {
    let v = unorm(cur)?;
    let sign_bit = v & 0x8000;
    let exp_bits = v & 0x000F;
    let mut frac_bits = (v & 0xFFF0) >> 4;
    if sign_bit != 0 {
        frac_bits = (!frac_bits & 0x0FFF).wrapping_add(1);
    }
    let sign = if sign_bit != 0 { -1.0f32 } else { 1.0f32 };
    let fractional = frac_bits as f32 / 0x0800 as f32;
    Ok(sign * fractional * (exp_bits as f32).exp2())
}

/// IBM System/360 single precision, via the usual table-driven normalisation.
pub fn isingl(cur: &mut Cursor) -> Result<f32,ShortRead> {
    const IEEEMAX: u32 = 0x7FFFFFFF;
    const IEMAXIB: u32 = 0x611FFFFF;
    const IEMINIB: u32 = 0x21200000;
    const IT: [u32;8] = [
        0x21800000, 0x21400000, 0x21000000, 0x21000000,
        0x20c00000, 0x20c00000, 0x20c00000, 0x20c00000 ];
    const MT: [u32;8] = [8, 4, 2, 2, 1, 1, 1, 1];

    let u = u32::from_be_bytes(cur.take_array::<4>()?);
    let mut manthi = u & 0x00FFFFFF;
    let ix = (manthi >> 21) as usize;
    let iexp = (u & 0x7f000000).wrapping_sub(IT[ix]) << 1;
    manthi = manthi.wrapping_mul(MT[ix]).wrapping_add(iexp);
    let inabs = u & 0x7FFFFFFF;
    if inabs > IEMAXIB {
        manthi = IEEEMAX;
    }
    manthi = manthi | (u & 0x80000000);
    let out = if inabs < IEMINIB { 0 } else { manthi };
    Ok(f32::from_bits(out))
}

/// VAX F-float.  Word-swapped byte order, exponent bias 128, hidden bit
/// before the point.  `e=0,s=0` is zero, `e=0,s=1` is undefined (NaN out).
pub fn vsingl(cur: &mut Cursor) -> Result<f32,ShortRead> {
    let x = cur.take_array::<4>()?;
    let v = (x[1] as u32) << 24 | (x[0] as u32) << 16 | (x[3] as u32) << 8 | x[2] as u32;

    let sign_bit = v & 0x80000000;
    let frac_bits = v & 0x007FFFFF;
    let exp_bits = (v & 0x7F800000) >> 23;

    let sign = if sign_bit != 0 { -1.0f32 } else { 1.0f32 };
    let exponent = exp_bits as f32 - 128.0;
    let significand = (frac_bits | 0x00800000) as f32 / (1u32 << 24) as f32;

    if exp_bits != 0 {
        Ok(sign * significand * exponent.exp2())
    } else if sign_bit == 0 {
        Ok(0.0)
    } else {
        Ok(f32::NAN)
    }
}

pub fn fsing1(cur: &mut Cursor) -> Result<(f32,f32),ShortRead> {
    Ok((fsingl(cur)?,fsingl(cur)?))
}

pub fn fsing2(cur: &mut Cursor) -> Result<(f32,f32,f32),ShortRead> {
    Ok((fsingl(cur)?,fsingl(cur)?,fsingl(cur)?))
}

pub fn csingl(cur: &mut Cursor) -> Result<(f32,f32),ShortRead> {
    Ok((fsingl(cur)?,fsingl(cur)?))
}

pub fn fdoub1(cur: &mut Cursor) -> Result<(f64,f64),ShortRead> {
    Ok((fdoubl(cur)?,fdoubl(cur)?))
}

pub fn fdoub2(cur: &mut Cursor) -> Result<(f64,f64,f64),ShortRead> {
    Ok((fdoubl(cur)?,fdoubl(cur)?,fdoubl(cur)?))
}

pub fn cdoubl(cur: &mut Cursor) -> Result<(f64,f64),ShortRead> {
    Ok((fdoubl(cur)?,fdoubl(cur)?))
}

pub fn status(cur: &mut Cursor) -> Result<bool,ShortRead> {
    Ok(ushort(cur)? != 0)
}

/// 1-byte length prefix plus that many bytes, never NUL-terminated.
pub fn ident(cur: &mut Cursor) -> Result<String,ShortRead> {
    let len = ushort(cur)? as usize;
    let raw = cur.take(len)?;
    Ok(crate::decode_string(raw,&[crate::TextEncoding::Latin1]))
}

pub fn units(cur: &mut Cursor) -> Result<String,ShortRead> {
    ident(cur)
}

/// UVARI length prefix plus that many bytes.
pub fn ascii(cur: &mut Cursor) -> Result<String,ShortRead> {
    let len = uvari(cur)? as usize;
    let raw = cur.take(len)?;
    Ok(crate::decode_string(raw,&[crate::TextEncoding::Latin1]))
}

pub fn origin(cur: &mut Cursor) -> Result<i32,ShortRead> {
    uvari(cur)
}

/// 8 bytes: year offset from 1900, timezone and month packed in one byte,
/// then day, hour, minute, second and a big-endian millisecond count.
pub fn dtime(cur: &mut Cursor) -> Result<Dtime,ShortRead> {
    let x = cur.take_array::<6>()?;
    let ms = unorm(cur)?;
    Ok(Dtime {
        year: x[0] as i32 + 1900,
        tz: (x[1] & 0xF0) >> 4,
        month: x[1] & 0x0F,
        day: x[2],
        hour: x[3],
        minute: x[4],
        second: x[5],
        ms
    })
}

pub fn obname(cur: &mut Cursor) -> Result<Obname,ShortRead> {
    let origin = uvari(cur)?;
    let copy = ushort(cur)?;
    let id = ident(cur)?;
    Ok(Obname { origin, copy, id })
}

pub fn objref(cur: &mut Cursor) -> Result<Objref,ShortRead> {
    let rtype = ident(cur)?;
    let name = obname(cur)?;
    Ok(Objref { rtype, name })
}

pub fn attref(cur: &mut Cursor) -> Result<Attref,ShortRead> {
    let rtype = ident(cur)?;
    let name = obname(cur)?;
    let label = ident(cur)?;
    Ok(Attref { rtype, name, label })
}

/*
 * encoders
 */

pub fn encode_sshort(dst: &mut Vec<u8>,x: i8) {
    dst.extend_from_slice(&x.to_be_bytes());
}

pub fn encode_snorm(dst: &mut Vec<u8>,x: i16) {
    dst.extend_from_slice(&x.to_be_bytes());
}

pub fn encode_slong(dst: &mut Vec<u8>,x: i32) {
    dst.extend_from_slice(&x.to_be_bytes());
}

pub fn encode_ushort(dst: &mut Vec<u8>,x: u8) {
    dst.push(x);
}

pub fn encode_unorm(dst: &mut Vec<u8>,x: u16) {
    dst.extend_from_slice(&x.to_be_bytes());
}

pub fn encode_ulong(dst: &mut Vec<u8>,x: u32) {
    dst.extend_from_slice(&x.to_be_bytes());
}

pub fn encode_fsingl(dst: &mut Vec<u8>,x: f32) {
    dst.extend_from_slice(&x.to_be_bytes());
}

pub fn encode_fdoubl(dst: &mut Vec<u8>,x: f64) {
    dst.extend_from_slice(&x.to_be_bytes());
}

/// split `x` into (fraction,exponent) with fraction in ±[0.5,1)
fn frexp(x: f32) -> (f32,i32) {
    if x == 0.0 || !x.is_finite() {
        return (x,0);
    }
    let bits = x.to_bits();
    let mut exp = ((bits >> 23) & 0xFF) as i32;
    let mut mant = x;
    if exp == 0 {
        // subnormal, normalise first
        mant = x * (24.0f32).exp2();
        let bits = mant.to_bits();
        exp = ((bits >> 23) & 0xFF) as i32 - 24;
    }
    let frac = f32::from_bits((mant.to_bits() & 0x807FFFFF) | (126 << 23));
    (frac,exp - 126)
}

pub fn encode_fshort(dst: &mut Vec<u8>,x: f32) {
    if x == 0.0 {
        encode_unorm(dst,0);
        return;
    }
    let (frac,mut exp) = frexp(x.abs());
    let mut mantissa = frac;
    // exponent range is 0..=15; fold small values into the fraction
    if exp < 0 {
        mantissa = mantissa * (exp as f32).exp2();
        exp = 0;
    }
    if exp > 15 {
        // saturate
        mantissa = 1.0;
        exp = 15;
    }
    let mut frac_bits = (mantissa * 2048.0).round() as u16 & 0x0FFF;
    let mut sign_bit = 0u16;
    if x < 0.0 {
        if frac_bits == 0 {
            encode_unorm(dst,0);
            return;
        }
        sign_bit = 0x8000;
        frac_bits = (!frac_bits).wrapping_add(1) & 0x0FFF;
    } else if frac_bits >= 0x800 {
        // the top fraction bit doubles as the sign, positive magnitudes stop at 2047/2048
        if exp < 15 {
            frac_bits = 0x400;
            exp += 1;
        } else {
            frac_bits = 0x7FF;
        }
    }
    encode_unorm(dst,sign_bit | frac_bits << 4 | exp as u16);
}

/// IBM single, the inverse System/360 transform
pub fn encode_isingl(dst: &mut Vec<u8>,x: f32) {
    const IT: [u32;4] = [0x21200000, 0x21400000, 0x21800000, 0x22100000];
    const MT: [u32;4] = [2, 4, 8, 1];

    let u = x.to_bits();
    let ix = ((u & 0x01800000) >> 23) as usize;
    let iexp = ((u & 0x7e000000) >> 1).wrapping_add(IT[ix]);
    let mut manthi = (MT[ix].wrapping_mul(u & 0x007fffff)) >> 3;
    manthi = manthi.wrapping_add(iexp) | (u & 0x80000000);
    let out = if u & 0x7fffffff != 0 { manthi } else { 0 };
    dst.extend_from_slice(&out.to_be_bytes());
}

/// VAX single, the inverse word-swapped transform
pub fn encode_vsingl(dst: &mut Vec<u8>,x: f32) {
    let u = x.to_bits();
    let sign_bit = u & 0x80000000;
    let mut exp_bits = (u & 0x7F800000) >> 23;
    let frac_bits = u & 0x007FFFFF;

    if exp_bits == 0 {
        dst.extend_from_slice(&[0,0,0,0]);
        return;
    }

    exp_bits += 2;
    let v = sign_bit | exp_bits << 23 | frac_bits;
    let z = (v & 0x00FF0000) << 8
          | (v & 0xFF000000) >> 8
          | (v & 0x000000FF) << 8
          | (v & 0x0000FF00) >> 8;
    dst.extend_from_slice(&z.to_be_bytes());
}

pub fn encode_fsing1(dst: &mut Vec<u8>,v: f32,a: f32) {
    encode_fsingl(dst,v);
    encode_fsingl(dst,a);
}

pub fn encode_fsing2(dst: &mut Vec<u8>,v: f32,a: f32,b: f32) {
    encode_fsingl(dst,v);
    encode_fsingl(dst,a);
    encode_fsingl(dst,b);
}

pub fn encode_csingl(dst: &mut Vec<u8>,re: f32,im: f32) {
    encode_fsingl(dst,re);
    encode_fsingl(dst,im);
}

pub fn encode_fdoub1(dst: &mut Vec<u8>,v: f64,a: f64) {
    encode_fdoubl(dst,v);
    encode_fdoubl(dst,a);
}

pub fn encode_fdoub2(dst: &mut Vec<u8>,v: f64,a: f64,b: f64) {
    encode_fdoubl(dst,v);
    encode_fdoubl(dst,a);
    encode_fdoubl(dst,b);
}

pub fn encode_cdoubl(dst: &mut Vec<u8>,re: f64,im: f64) {
    encode_fdoubl(dst,re);
    encode_fdoubl(dst,im);
}

/// Encode with the minimum width that holds the value, unless the caller
/// forces a wider one.  Values above 2^30-1 do not fit at all and saturate
/// the 4-byte form.
pub fn encode_uvari(dst: &mut Vec<u8>,x: i32,width: Option<usize>) {
    let width = width.unwrap_or(1);
    if x <= 0x7F && width <= 1 {
        dst.push(x as u8);
        return;
    }
    if x <= 0x3FFF && width <= 2 {
        encode_unorm(dst,x as u16 | 0x8000);
        return;
    }
    encode_ulong(dst,(x as u32 & 0x3FFFFFFF) | 0xC0000000);
}

pub fn encode_ident(dst: &mut Vec<u8>,s: &str) {
    let bytes = crate::encode_string(s);
    encode_ushort(dst,bytes.len() as u8);
    dst.extend_from_slice(&bytes);
}

pub fn encode_units(dst: &mut Vec<u8>,s: &str) {
    encode_ident(dst,s);
}

pub fn encode_ascii(dst: &mut Vec<u8>,s: &str,width: Option<usize>) {
    let bytes = crate::encode_string(s);
    encode_uvari(dst,bytes.len() as i32,width);
    dst.extend_from_slice(&bytes);
}

pub fn encode_origin(dst: &mut Vec<u8>,x: i32) {
    encode_uvari(dst,x,Some(4));
}

pub fn encode_status(dst: &mut Vec<u8>,x: bool) {
    dst.push(x as u8);
}

pub fn encode_dtime(dst: &mut Vec<u8>,dt: &Dtime) {
    dst.push((dt.year - 1900) as u8);
    dst.push(dt.tz << 4 | dt.month & 0x0F);
    dst.push(dt.day);
    dst.push(dt.hour);
    dst.push(dt.minute);
    dst.push(dt.second);
    encode_unorm(dst,dt.ms);
}

pub fn encode_obname(dst: &mut Vec<u8>,name: &Obname) {
    encode_origin(dst,name.origin);
    encode_ushort(dst,name.copy);
    encode_ident(dst,&name.id);
}

pub fn encode_objref(dst: &mut Vec<u8>,objref: &Objref) {
    encode_ident(dst,&objref.rtype);
    encode_obname(dst,&objref.name);
}

pub fn encode_attref(dst: &mut Vec<u8>,attref: &Attref) {
    encode_ident(dst,&attref.rtype);
    encode_obname(dst,&attref.name);
    encode_ident(dst,&attref.label);
}
