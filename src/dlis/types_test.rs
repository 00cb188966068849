// Decoder values are checked against byte patterns worked out by hand from
// RP66 v1 Appendix B; encoders are checked by round trip.

use super::types::*;
use super::packf;
use crate::cursor::Cursor;

fn cur(bytes: &[u8]) -> Cursor {
    Cursor::new(bytes)
}

#[test]
fn fixed_width_integers() {
    assert_eq!(sshort(&mut cur(&[0xFF])).unwrap(),-1);
    assert_eq!(sshort(&mut cur(&[0x59])).unwrap(),89);
    assert_eq!(snorm(&mut cur(&[0xFF,0x67])).unwrap(),-153);
    assert_eq!(snorm(&mut cur(&[0x00,0x99])).unwrap(),153);
    assert_eq!(slong(&mut cur(&[0xFF,0xFF,0xFF,0x67])).unwrap(),-153);
    assert_eq!(slong(&mut cur(&[0x7F,0xFF,0xFF,0xFF])).unwrap(),i32::MAX);
    assert_eq!(ushort(&mut cur(&[0xA7])).unwrap(),167);
    assert_eq!(unorm(&mut cur(&[0x80,0x00])).unwrap(),32768);
    assert_eq!(ulong(&mut cur(&[0xFF,0xFF,0xFF,0x67])).unwrap(),4294967143);
}

#[test]
fn uvari_widths() {
    assert_eq!(uvari(&mut cur(&[0x00])).unwrap(),0);
    assert_eq!(uvari(&mut cur(&[0x7F])).unwrap(),127);
    assert_eq!(uvari(&mut cur(&[0x80,0x01])).unwrap(),1);
    assert_eq!(uvari(&mut cur(&[0xBF,0xFF])).unwrap(),16383);
    assert_eq!(uvari(&mut cur(&[0xC0,0x00,0x8F,0xFF])).unwrap(),36863);
    assert_eq!(uvari(&mut cur(&[0xF0,0x00,0xBF,0xFF])).unwrap(),805355519);
    // never reads more than the declared width
    let mut c = cur(&[0x7F,0xFF]);
    uvari(&mut c).unwrap();
    assert_eq!(c.offset(),1);
    let mut c = cur(&[0xBF,0xFF,0x00]);
    uvari(&mut c).unwrap();
    assert_eq!(c.offset(),2);
}

#[test]
fn uvari_encode_minimum_width() {
    let mut dst = Vec::new();
    encode_uvari(&mut dst,127,None);
    assert_eq!(dst,vec![0x7F]);
    dst.clear();
    encode_uvari(&mut dst,128,None);
    assert_eq!(dst,vec![0x80,0x80]);
    dst.clear();
    encode_uvari(&mut dst,16383,None);
    assert_eq!(dst,vec![0xBF,0xFF]);
    dst.clear();
    encode_uvari(&mut dst,16384,None);
    assert_eq!(dst,vec![0xC0,0x00,0x40,0x00]);
    // forced widths
    dst.clear();
    encode_uvari(&mut dst,1,Some(2));
    assert_eq!(dst,vec![0x80,0x01]);
    dst.clear();
    encode_uvari(&mut dst,1,Some(4));
    assert_eq!(dst,vec![0xC0,0x00,0x00,0x01]);
}

#[test]
fn ieee_floats() {
    assert_eq!(fsingl(&mut cur(&[0x43,0x19,0x00,0x00])).unwrap(),153.0);
    assert_eq!(fsingl(&mut cur(&[0xC3,0x19,0x00,0x00])).unwrap(),-153.0);
    assert_eq!(fdoubl(&mut cur(&[0x40,0x63,0x20,0,0,0,0,0])).unwrap(),153.0);
    let (v,a) = fsing1(&mut cur(&[0x43,0x19,0x00,0x00,0x3F,0x80,0x00,0x00])).unwrap();
    assert_eq!((v,a),(153.0,1.0));
    let (v,a,b) = fsing2(&mut cur(&[
        0x43,0x19,0x00,0x00,0x3F,0x80,0x00,0x00,0x40,0x00,0x00,0x00])).unwrap();
    assert_eq!((v,a,b),(153.0,1.0,2.0));
}

#[test]
fn validity_float() {
    assert_eq!(fshort(&mut cur(&[0x4C,0x88])).unwrap(),153.0);
    assert_eq!(fshort(&mut cur(&[0xB3,0x88])).unwrap(),-153.0);
    assert_eq!(fshort(&mut cur(&[0x00,0x00])).unwrap(),0.0);
    assert_eq!(fshort(&mut cur(&[0xC0,0x01])).unwrap(),-1.0);
    for v in [0.0f32,1.0,-1.0,0.5,153.0,-153.0,2047.0] {
        let mut dst = Vec::new();
        encode_fshort(&mut dst,v);
        assert_eq!(fshort(&mut cur(&dst)).unwrap(),v,"fshort round trip of {}",v);
    }
}

#[test]
fn ibm_float() {
    assert_eq!(isingl(&mut cur(&[0x42,0x99,0x00,0x00])).unwrap(),153.0);
    assert_eq!(isingl(&mut cur(&[0xC2,0x99,0x00,0x00])).unwrap(),-153.0);
    assert_eq!(isingl(&mut cur(&[0x00,0x00,0x00,0x00])).unwrap(),0.0);
    for v in [0.0f32,1.0,-1.0,153.0,-153.0,0.25] {
        let mut dst = Vec::new();
        encode_isingl(&mut dst,v);
        assert_eq!(isingl(&mut cur(&dst)).unwrap(),v,"isingl round trip of {}",v);
    }
}

#[test]
fn vax_float() {
    assert_eq!(vsingl(&mut cur(&[0x19,0x44,0x00,0x00])).unwrap(),153.0);
    assert_eq!(vsingl(&mut cur(&[0x19,0xC4,0x00,0x00])).unwrap(),-153.0);
    // e=0, s=0 is zero
    assert_eq!(vsingl(&mut cur(&[0x00,0x00,0x00,0x00])).unwrap(),0.0);
    // e=0, s=1 is undefined
    assert!(vsingl(&mut cur(&[0x00,0x80,0x00,0x00])).unwrap().is_nan());
    for v in [1.0f32,-1.0,153.0,-153.0,0.25] {
        let mut dst = Vec::new();
        encode_vsingl(&mut dst,v);
        assert_eq!(vsingl(&mut cur(&dst)).unwrap(),v,"vsingl round trip of {}",v);
    }
}

#[test]
fn strings_keep_their_bytes() {
    let mut c = cur(&[0x05,b'H',b'E',b'L',0x00,b'O']);
    assert_eq!(ident(&mut c).unwrap(),"HEL\x00O");
    assert!(c.is_empty());
    // zero length is the empty string, not an error
    assert_eq!(ident(&mut cur(&[0x00])).unwrap(),"");
    // ascii carries a uvari length
    let mut body = vec![0x80,0x03];
    body.extend_from_slice(b"abc");
    assert_eq!(ascii(&mut cur(&body)).unwrap(),"abc");
    // round trip
    let mut dst = Vec::new();
    encode_ident(&mut dst,"HEL\x00O");
    assert_eq!(ident(&mut cur(&dst)).unwrap(),"HEL\x00O");
}

#[test]
fn ident_is_bounds_checked() {
    // declared length runs past the buffer
    assert!(ident(&mut cur(&[0x05,b'A'])).is_err());
}

#[test]
fn datetime() {
    // 255Y 2TZ 12M 31D 0H 32MN 16S 0MS
    let dt = dtime(&mut cur(&[0xFF,0x2C,0x1F,0x00,0x20,0x10,0x00,0x00])).unwrap();
    assert_eq!(dt.year,2155);
    assert_eq!(dt.tz,2);
    assert_eq!(dt.month,12);
    assert_eq!(dt.day,31);
    assert_eq!(dt.hour,0);
    assert_eq!(dt.minute,32);
    assert_eq!(dt.second,16);
    assert_eq!(dt.ms,0);
    let naive = dt.naive().unwrap();
    assert_eq!(naive.to_string(),"2155-12-31 00:32:16");
    let mut dst = Vec::new();
    encode_dtime(&mut dst,&dt);
    assert_eq!(dtime(&mut cur(&dst)).unwrap(),dt);
}

#[test]
fn object_names() {
    // origin 1, copy 0, id "CHANN"
    let bytes = [0x01,0x00,0x05,b'C',b'H',b'A',b'N',b'N'];
    let name = obname(&mut cur(&bytes)).unwrap();
    assert_eq!(name.origin,1);
    assert_eq!(name.copy,0);
    assert_eq!(name.id,"CHANN");
    assert_eq!(name.fingerprint("CHANNEL"),"T.CHANNEL-I.CHANN-O.1-C.0");
    let mut dst = Vec::new();
    encode_obname(&mut dst,&name);
    // origin is written with forced 4-byte width
    assert_eq!(dst.len(),4 + 1 + 6);
    assert_eq!(obname(&mut cur(&dst)).unwrap(),name);
}

#[test]
fn obname_fails_fast_when_short() {
    // 4 bytes can never hold origin + copy + prefixed ident
    assert!(obname(&mut cur(&[0x01,0x00,0x05,b'C'])).is_err());
}

#[test]
fn object_references() {
    let mut dst = Vec::new();
    let objref_in = Objref {
        rtype: "FRAME".to_string(),
        name: Obname { origin: 2, copy: 1, id: "MAIN".to_string() }
    };
    encode_objref(&mut dst,&objref_in);
    assert_eq!(objref(&mut cur(&dst)).unwrap(),objref_in);
    assert_eq!(objref_in.fingerprint(),"T.FRAME-I.MAIN-O.2-C.1");

    let mut dst = Vec::new();
    let attref_in = Attref {
        rtype: "TOOL".to_string(),
        name: Obname { origin: 0, copy: 0, id: "GR".to_string() },
        label: "SERIAL".to_string()
    };
    encode_attref(&mut dst,&attref_in);
    assert_eq!(attref(&mut cur(&dst)).unwrap(),attref_in);
}

#[test]
fn status_byte() {
    assert_eq!(status(&mut cur(&[0x00])).unwrap(),false);
    assert_eq!(status(&mut cur(&[0x01])).unwrap(),true);
}

#[test]
fn disk_sizes_match_format_table() {
    // every fixed-width code agrees between the size table and packed_size
    for code in 1..=27u8 {
        let reprc = Reprc::from_byte(code).unwrap();
        let c = packf::fmt_of_reprc(reprc);
        let (disk,_mem) = packf::packed_size(&c.to_string()).unwrap();
        match reprc.size_on_disk() {
            VARIABLE_LENGTH => assert!(disk.is_none(),"code {} should be variable",code),
            n => assert_eq!(disk,Some(n),"code {} disk size",code)
        }
    }
    assert!(Reprc::from_byte(0).is_none());
    assert!(Reprc::from_byte(28).is_none());
}
