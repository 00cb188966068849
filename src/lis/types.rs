//! # LIS Primitive Types
//!
//! The ten data types of LIS79 Appendix B.  Two of them, string and mask, do
//! not carry their own length; the caller supplies it from context.
//!
//! The three floating point layouts deserve a note.  `f16` keeps a 12-bit
//! fraction with a 4-bit exponent.  `f32` is sign / 8-bit excess-128 exponent
//! / 23-bit fraction, where negative numbers store the fraction in two's
//! complement.  `f32low` trades fraction bits for a 16-bit exponent whose
//! dynamic range exceeds the host float; decoding may saturate to infinity.
//! `f32fix` is plain two's complement fixed point with the binary point in
//! the middle.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use crate::cursor::{Cursor,ShortRead};

/// size value for codes whose size comes from context
pub const VARIABLE_LENGTH: usize = 0;

/// Enumerates the LIS79 representation codes.
#[derive(FromPrimitive,Debug,Clone,Copy,PartialEq,Eq)]
pub enum Reprc {
    F16 = 49,
    F32Low = 50,
    I8 = 56,
    String = 65,
    Byte = 66,
    F32 = 68,
    F32Fix = 70,
    I32 = 73,
    Mask = 77,
    I16 = 79
}

impl Reprc {
    pub fn from_byte(x: u8) -> Option<Self> {
        FromPrimitive::from_u8(x)
    }
    pub fn size_on_disk(&self) -> usize {
        match self {
            Self::I8 | Self::Byte => 1,
            Self::I16 | Self::F16 => 2,
            Self::I32 | Self::F32 | Self::F32Low | Self::F32Fix => 4,
            Self::String | Self::Mask => VARIABLE_LENGTH
        }
    }
}

/*
 * decoders
 */

pub fn i8(cur: &mut Cursor) -> Result<i8,ShortRead> {
    Ok(i8::from_be_bytes(cur.take_array::<1>()?))
}

pub fn i16(cur: &mut Cursor) -> Result<i16,ShortRead> {
    Ok(i16::from_be_bytes(cur.take_array::<2>()?))
}

pub fn i32(cur: &mut Cursor) -> Result<i32,ShortRead> {
    Ok(i32::from_be_bytes(cur.take_array::<4>()?))
}

pub fn byte(cur: &mut Cursor) -> Result<u8,ShortRead> {
    Ok(cur.take_array::<1>()?[0])
}

/// 16-bit float: 12-bit fraction over a 4-bit exponent, negative fractions in
/// two's complement
pub fn f16(cur: &mut Cursor) -> Result<f32,ShortRead> {
    let v = u16::from_be_bytes(cur.take_array::<2>()?);
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

/// 32-bit float.
///
/// The fraction is a binary fraction of 23 bits; reading it as a two's
/// complement integer and folding the precision into the exponent turns the
/// whole decode into one `ldexp`:
///
///   value = frac * 2^(E - 151)    if S = 0
///   value = frac * 2^(104 - E)    if S = 1, frac sign-extended
pub fn f32(cur: &mut Cursor) -> Result<f32,ShortRead> {
    const PRECISION: i32 = 23;
    let u = u32::from_be_bytes(cur.take_array::<4>()?);
    let sign_bit = u & 0x80000000;
    let frac_bits = u & 0x007FFFFF;
    let exp_bits = ((u & 0x7F800000) >> 23) as i32;

    let exponent = match sign_bit != 0 {
        true => 127 - exp_bits,
        false => exp_bits - 128
    } - PRECISION;

    let mask: u32 = if sign_bit != 0 { 0xFF800000 } else { 0 };
    let fraction = (mask | frac_bits) as i32;

    Ok(fraction as f32 * (exponent as f32).exp2())
}

/// 32-bit low resolution float: 16-bit exponent over a 16-bit two's
/// complement fraction.  The exponent range is far beyond IEEE singles, so
/// large values saturate to infinity.
pub fn f32low(cur: &mut Cursor) -> Result<f32,ShortRead> {
    const PRECISION: i32 = 15;
    let u = u32::from_be_bytes(cur.take_array::<4>()?);
    let fraction = (u & 0x0000FFFF) as u16 as i16;
    let exp_bits = ((u & 0xFFFF0000) >> 16) as i32;
    Ok(fraction as f32 * ((exp_bits - PRECISION) as f32).exp2())
}

/// 32-bit fixed point: two's complement with the binary point in the middle.
pub fn f32fix(cur: &mut Cursor) -> Result<f32,ShortRead> {
    let v = i32::from_be_bytes(cur.take_array::<4>()?);
    Ok(v as f32 / 65536.0)
}

/// Alphanumeric.  The length is not self-describing, the caller passes it in.
pub fn string(cur: &mut Cursor,len: usize) -> Result<String,ShortRead> {
    let raw = cur.take(len)?;
    Ok(crate::decode_string(raw,&[crate::TextEncoding::Latin1]))
}

/// Bitmask.  Externally sized, kept as raw bytes.
pub fn mask(cur: &mut Cursor,len: usize) -> Result<Vec<u8>,ShortRead> {
    Ok(cur.take(len)?.to_vec())
}

/*
 * encoders
 */

pub fn encode_i8(dst: &mut Vec<u8>,x: i8) {
    dst.extend_from_slice(&x.to_be_bytes());
}

pub fn encode_i16(dst: &mut Vec<u8>,x: i16) {
    dst.extend_from_slice(&x.to_be_bytes());
}

pub fn encode_i32(dst: &mut Vec<u8>,x: i32) {
    dst.extend_from_slice(&x.to_be_bytes());
}

pub fn encode_byte(dst: &mut Vec<u8>,x: u8) {
    dst.push(x);
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
        mant = x * (24.0f32).exp2();
        let bits = mant.to_bits();
        exp = ((bits >> 23) & 0xFF) as i32 - 24;
    }
    let frac = f32::from_bits((mant.to_bits() & 0x807FFFFF) | (126 << 23));
    (frac,exp - 126)
}

pub fn encode_f16(dst: &mut Vec<u8>,x: f32) {
    if x == 0.0 {
        dst.extend_from_slice(&[0,0]);
        return;
    }
    let (frac,mut exp) = frexp(x.abs());
    let mut mantissa = frac;
    if exp < 0 {
        mantissa = mantissa * (exp as f32).exp2();
        exp = 0;
    }
    if exp > 15 {
        mantissa = 1.0;
        exp = 15;
    }
    let mut frac_bits = (mantissa * 2048.0).round() as u16 & 0x0FFF;
    let mut sign_bit = 0u16;
    if x < 0.0 {
        if frac_bits == 0 {
            dst.extend_from_slice(&[0,0]);
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
    dst.extend_from_slice(&(sign_bit | frac_bits << 4 | exp as u16).to_be_bytes());
}

pub fn encode_f32(dst: &mut Vec<u8>,x: f32) {
    if x == 0.0 {
        dst.extend_from_slice(&[0,0,0,0]);
        return;
    }
    let (frac,mut exp) = frexp(x);
    let mut bf = (frac * (1 << 23) as f32).round() as i32;
    // rounding can push the fraction to a full 2^23, fold that into the exponent
    if bf >= 1 << 23 {
        bf >>= 1;
        exp += 1;
    }
    let u: u32 = match x < 0.0 {
        false => {
            let e = (exp + 128) as u32;
            e << 23 | bf as u32 & 0x007FFFFF
        },
        true => {
            let e = (127 - exp) as u32;
            0x80000000 | e << 23 | (bf as u32 & 0x007FFFFF)
        }
    };
    dst.extend_from_slice(&u.to_be_bytes());
}

pub fn encode_f32low(dst: &mut Vec<u8>,x: f32) {
    if x == 0.0 {
        dst.extend_from_slice(&[0,0,0,0]);
        return;
    }
    let (frac,mut exp) = frexp(x);
    let mut fraction = (frac * (1 << 15) as f32).round() as i32;
    // the fraction must fit i16; 1.0 rounds up to 2^15, fold into the exponent
    if fraction >= i16::MAX as i32 + 1 || fraction < i16::MIN as i32 {
        fraction /= 2;
        exp += 1;
    }
    if exp < 0 {
        // no negative exponent field, shift the fraction instead
        fraction = (fraction as f32 * (exp as f32).exp2()).round() as i32;
        exp = 0;
    }
    let u = (exp as u32) << 16 | (fraction as u16 as u32);
    dst.extend_from_slice(&u.to_be_bytes());
}

pub fn encode_f32fix(dst: &mut Vec<u8>,x: f32) {
    let v = (x * 65536.0).round() as i32;
    dst.extend_from_slice(&v.to_be_bytes());
}

pub fn encode_string(dst: &mut Vec<u8>,s: &str) {
    dst.extend_from_slice(&crate::encode_string(s));
}

pub fn encode_mask(dst: &mut Vec<u8>,m: &[u8]) {
    dst.extend_from_slice(m);
}
