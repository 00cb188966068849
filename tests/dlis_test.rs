// test of the DLIS envelope walker and object pool on synthetic files
use std::io::Write;
use wellkit::stream::{Stream,ByteStream};
use wellkit::stream::visible::VisibleRecords;
use wellkit::dlis;
use wellkit::dlis::types::{self,Obname};
use wellkit::dlis::eflr::{ObjectSet,ValueVector};
use wellkit::dlis::pool::{Pool,ExactMatcher};
use wellkit::diag::{Collector,Severity};

fn visible(file: Vec<u8>) -> VisibleRecords {
    VisibleRecords::new(Box::new(ByteStream::from_bytes(file)))
}

/// wrap logical-record-segment bytes in a single visible record
fn vr(segments: &[u8]) -> Vec<u8> {
    let mut ans = Vec::new();
    ans.extend_from_slice(&((segments.len() + 4) as u16).to_be_bytes());
    ans.extend_from_slice(&[0xff,0x01]);
    ans.extend_from_slice(segments);
    ans
}

fn lrsh(body_len: usize,attrs: u8,rtype: u8) -> Vec<u8> {
    let mut ans = Vec::new();
    ans.extend_from_slice(&((body_len + 4) as u16).to_be_bytes());
    ans.push(attrs);
    ans.push(rtype);
    ans
}

#[test]
fn single_unsegmented_record() {
    // one visible record, one explicit LR of 16 zero body bytes, type 0
    let mut segments = lrsh(16,0x80,0);
    segments.extend_from_slice(&[0u8;16]);
    let file = vr(&segments);
    assert_eq!(&file[0..8],&[0x00,0x18,0xff,0x01,0x00,0x14,0x80,0x00]);

    let mut stream = visible(file);
    let mut handler = Collector::new();
    let index = dlis::index_records(&mut stream,&mut handler).unwrap();
    assert_eq!(index.explicits.len(),1);
    assert_eq!(index.implicits.len(),0);
    assert_eq!(index.broken.len(),0);
    assert_eq!(index.explicits[0],dlis::RecordInfo { ltell: 0, rtype: 0, size: 20, consistent: true });
    assert!(stream.eof());

    let rec = dlis::extract(&mut stream,0,&mut handler).unwrap();
    assert_eq!(rec.rtype,0);
    assert!(rec.is_explicit());
    assert!(!rec.is_encrypted());
    assert_eq!(rec.data,vec![0u8;16]);
}

#[test]
fn record_split_across_visible_records() {
    // the same logical record continues in a second visible record
    let mut seg1 = lrsh(16,0x80 | 0x20,0);        // successor follows
    seg1.extend_from_slice(&[1u8;16]);
    let mut seg2 = lrsh(16,0x80 | 0x40,0);        // predecessor exists
    seg2.extend_from_slice(&[2u8;16]);
    let mut file = vr(&seg1);
    file.append(&mut vr(&seg2));

    let mut stream = visible(file);
    let mut handler = Collector::new();
    let index = dlis::index_records(&mut stream,&mut handler).unwrap();
    assert_eq!(index.explicits.len(),1);
    assert_eq!(index.explicits[0].size,40);
    assert!(index.explicits[0].consistent);

    let rec = dlis::extract(&mut stream,0,&mut handler).unwrap();
    assert_eq!(rec.data.len(),32);
    assert_eq!(&rec.data[0..16],&[1u8;16]);
    assert_eq!(&rec.data[16..32],&[2u8;16]);
}

#[test]
fn trimming_and_encryption() {
    // pad bytes: body of 6 where the last byte says 2 bytes are padding
    let body = [9,9,9,9,0,2];
    assert_eq!(dlis::trim_record_segment(0x01,&body).unwrap(),2);
    // trailing length and checksum add 2 each
    assert_eq!(dlis::trim_record_segment(0x01 | 0x02 | 0x04,&[9,9,9,0,0,0,0,2]).unwrap(),6);
    // encrypted records are never trimmed
    assert_eq!(dlis::trim_record_segment(0x10 | 0x01,&body).unwrap(),0);
    // pad count exceeding the body is a size error
    assert!(dlis::trim_record_segment(0x01,&[0,9]).is_err());
}

#[test]
fn truncated_file_is_reported() {
    // segment claims 20 body bytes but the file ends after 4
    let mut segments = lrsh(20,0x80,0);
    segments.extend_from_slice(&[0u8;4]);
    let file = vr(&segments);

    let mut stream = visible(file);
    let mut handler = Collector::new();
    let index = dlis::index_records(&mut stream,&mut handler).unwrap();
    assert!(index.is_incomplete());
    assert_eq!(index.broken,vec![0]);
    assert_eq!(handler.count_at_least(Severity::Critical),1);
}

#[test]
fn indexing_stops_at_next_logical_file() {
    // two logical files, each opened by a FILE-HEADER (explicit type 0)
    let mut seg = lrsh(8,0x80,0);
    seg.extend_from_slice(&[0u8;8]);
    let mut file = vr(&seg);
    let first_len = 4 + 12;
    file.append(&mut vr(&seg));

    let mut stream = visible(file);
    let mut handler = Collector::new();
    let index = dlis::index_records(&mut stream,&mut handler).unwrap();
    assert_eq!(index.explicits.len(),1);
    // the stream was left at the second FILE-HEADER, ready to re-enter
    assert_eq!(stream.ltell(),(first_len - 4) as i64);
    let index = dlis::index_records(&mut stream,&mut handler).unwrap();
    assert_eq!(index.explicits.len(),1);
    assert_eq!(index.explicits[0].ltell,12);
}

#[test]
fn sul_search() {
    let mut sul_bytes = Vec::new();
    sul_bytes.extend_from_slice(b"   1V1.00RECORD 8192Default Storage Set");
    sul_bytes.resize(80,b' ');

    // a conforming file has the label at offset 0
    assert_eq!(dlis::find_sul(&sul_bytes).unwrap(),0);
    let label = dlis::sul(&sul_bytes).unwrap();
    assert_eq!(label.seqnum,1);
    assert_eq!(label.maxlen,8192);
    assert_eq!(label.layout,dlis::Layout::Record);
    assert_eq!(label.id,"Default Storage Set");
    assert!(label.consistent);

    // up to a few hundred garbage bytes ahead of the label are tolerated
    let mut padded = vec![0xAAu8;300];
    padded.extend_from_slice(&sul_bytes);
    assert_eq!(dlis::find_sul(&padded).unwrap(),300);

    // no false positive on garbage
    assert!(matches!(dlis::find_sul(&vec![0xAAu8;400]),Err(dlis::Error::NotFound)));

    // explicit zero maxlen means undefined and stays consistent
    let mut zeroed = sul_bytes.clone();
    zeroed[15..20].copy_from_slice(b"00000");
    let label = dlis::sul(&zeroed).unwrap();
    assert_eq!(label.maxlen,0);
    assert!(label.consistent);
}

#[test]
fn vrl_search() {
    let mut buf = vec![0u8;100];
    buf[40] = 0x20;
    buf[41] = 0x00;
    buf[42] = 0xff;
    buf[43] = 0x01;
    assert_eq!(dlis::find_vrl(&buf).unwrap(),40);
    assert!(matches!(dlis::find_vrl(&vec![0u8;50]),Err(dlis::Error::NotFound)));
}

#[test]
fn encryption_packet() {
    assert_eq!(dlis::encryption_packet_info(&[0x00,0x08,0x00,0x2A]).unwrap(),(4,42));
    // too short to even hold itself
    assert!(dlis::encryption_packet_info(&[0x00,0x02,0x00,0x2A]).is_err());
    // odd length
    assert!(dlis::encryption_packet_info(&[0x00,0x07,0x00,0x2A]).is_err());
}

/// an EFLR body declaring one set of the given type with one defaulted
/// attribute and the named objects
fn eflr_body(set_type: &str,label: &str,value: &str,objects: &[&str]) -> Vec<u8> {
    let mut body = Vec::new();
    body.push(0xF0);
    types::encode_ident(&mut body,set_type);
    body.push(0x20 | 0x10 | 0x04 | 0x01);
    types::encode_ident(&mut body,label);
    types::encode_ushort(&mut body,19);
    types::encode_ident(&mut body,value);
    for id in objects {
        body.push(0x70);
        types::encode_obname(&mut body,&Obname { origin: 0, copy: 0, id: id.to_string() });
    }
    body
}

#[test]
fn full_file_through_pool() {
    // storage unit label + one visible record per object set, read back off
    // disk through the convenience opener
    let mut file = Vec::new();
    file.extend_from_slice(b"   1V1.00RECORD 8192synthetic tool file");
    file.resize(80,b' ');

    for (set_type,objects) in [("TOOL",vec!["OB1","OB2"]),("CHANNEL",vec!["DEPT"])] {
        let body = eflr_body(set_type,"L","def",&objects);
        let mut seg = lrsh(body.len(),0x80,3);
        seg.extend_from_slice(&body);
        file.append(&mut vr(&seg));
    }

    let mut tmp = tempfile::NamedTempFile::new().expect("no temp file");
    tmp.write_all(&file).expect("write failed");
    let path = tmp.path().to_str().unwrap().to_string();

    let (label,mut stream) = wellkit::create_dlis_stream_from_file(&path).unwrap();
    assert_eq!(label.id,"synthetic tool file");

    let mut handler = Collector::new();
    let index = dlis::index_records(stream.as_mut(),&mut handler).unwrap();
    assert_eq!(index.explicits.len(),2);

    let mut sets = Vec::new();
    for info in &index.explicits {
        let rec = dlis::extract(stream.as_mut(),info.ltell,&mut handler).unwrap();
        sets.push(ObjectSet::new(rec).unwrap());
    }
    let mut pool = Pool::new(sets);
    assert_eq!(pool.types(),vec!["TOOL".to_string(),"CHANNEL".to_string()]);

    let tools = pool.get("TOOL",&ExactMatcher,&mut handler).unwrap();
    assert_eq!(tools.len(),2);
    assert_eq!(tools[0].name.id,"OB1");
    assert_eq!(tools[0].at("L").unwrap().value,ValueVector::Ident(vec!["def".to_string()]));

    let named = pool.get_named("CHANNEL","DEPT",&ExactMatcher,&mut handler).unwrap();
    assert_eq!(named.len(),1);
    // matching is exact and case-sensitive
    let named = pool.get_named("CHANNEL","dept",&ExactMatcher,&mut handler).unwrap();
    assert_eq!(named.len(),0);
}

#[test]
fn frame_data_decoding() {
    // one implicit record carrying the frame obname and two rows of (unorm,fsingl)
    let frame_name = Obname { origin: 1, copy: 0, id: "60B".to_string() };
    let mut body = Vec::new();
    types::encode_obname(&mut body,&frame_name);
    types::encode_unorm(&mut body,1);
    types::encode_fsingl(&mut body,0.5);
    types::encode_unorm(&mut body,2);
    types::encode_fsingl(&mut body,1.5);

    let mut seg = lrsh(body.len(),0x00,0);
    seg.extend_from_slice(&body);
    let file = vr(&seg);

    let mut stream = visible(file);
    let mut handler = Collector::new();
    let index = dlis::index_records(&mut stream,&mut handler).unwrap();
    assert_eq!(index.implicits.len(),1);

    let fdata = dlis::frame::find_fdata(&mut stream,&index.implicits,&mut handler).unwrap();
    let tells = fdata.get(&frame_name.fingerprint("FRAME")).expect("frame not indexed");
    assert_eq!(tells,&vec![0i64]);

    let frames = dlis::frame::read_frames(&mut stream,"Uf",tells,&mut handler).unwrap();
    assert_eq!(frames.rows,2);
    assert_eq!(frames.stride,6);
    let row = frames.row(0);
    assert_eq!(u16::from_ne_bytes(row[0..2].try_into().unwrap()),1);
    assert_eq!(f32::from_ne_bytes(row[2..6].try_into().unwrap()),0.5);
    let row = frames.row(1);
    assert_eq!(u16::from_ne_bytes(row[0..2].try_into().unwrap()),2);
    assert_eq!(f32::from_ne_bytes(row[2..6].try_into().unwrap()),1.5);
}

#[test]
fn frame_data_with_variable_columns() {
    // a string column decodes to a handle into the buffer's side pool
    let frame_name = Obname { origin: 1, copy: 0, id: "900T".to_string() };
    let mut body = Vec::new();
    types::encode_obname(&mut body,&frame_name);
    types::encode_unorm(&mut body,7);
    types::encode_ident(&mut body,"pass");
    types::encode_unorm(&mut body,8);
    types::encode_ident(&mut body,"fail");

    let mut seg = lrsh(body.len(),0x00,0);
    seg.extend_from_slice(&body);
    let file = vr(&seg);

    let mut stream = visible(file);
    let mut handler = Collector::new();
    let index = dlis::index_records(&mut stream,&mut handler).unwrap();
    let tells: Vec<i64> = index.implicits.iter().map(|info| info.ltell).collect();

    let frames = dlis::frame::read_frames(&mut stream,"Us",&tells,&mut handler).unwrap();
    assert_eq!(frames.rows,2);
    assert_eq!(frames.stride,10);
    assert_eq!(u16::from_ne_bytes(frames.row(0)[0..2].try_into().unwrap()),7);
    match frames.handle(0,2).unwrap() {
        dlis::frame::Handle::Str(s) => assert_eq!(s,"pass"),
        _ => panic!("expected a string handle")
    }
    match frames.handle(1,2).unwrap() {
        dlis::frame::Handle::Str(s) => assert_eq!(s,"fail"),
        _ => panic!("expected a string handle")
    }
}
