// test of the LIS envelope walker, DFSR parsing and frame decoding on
// synthetic files
use std::io::Write;
use wellkit::stream::ByteStream;
use wellkit::lis::{self,RecordType};
use wellkit::lis::protocol;
use wellkit::diag::Collector;

/// one physical record: PRH + optional LRH + payload
fn pr(rtype: Option<u8>,attrs: u16,payload: &[u8]) -> Vec<u8> {
    let mut ans = Vec::new();
    let lrh_len = if rtype.is_some() { 2 } else { 0 };
    ans.extend_from_slice(&((4 + lrh_len + payload.len()) as u16).to_be_bytes());
    ans.extend_from_slice(&attrs.to_be_bytes());
    if let Some(rtype) = rtype {
        ans.push(rtype);
        ans.push(0);
    }
    ans.extend_from_slice(payload);
    ans
}

fn stream_of(file: Vec<u8>) -> ByteStream {
    ByteStream::from_bytes(file)
}

#[test]
fn indexing_with_padding() {
    // reel header, 4 pad bytes, tape header
    let mut file = pr(Some(132),0,&[1,2]);
    file.extend_from_slice(&[0,0,0,0]);
    file.append(&mut pr(Some(130),0,&[3]));
    assert_eq!(file.len(),19);

    let mut stream = stream_of(file);
    // reel and tape records each close their index, so two passes see both
    let index = lis::index_records(&mut stream);
    assert!(!index.is_incomplete());
    assert_eq!(index.size(),1);
    assert_eq!(index.explicits()[0],
        lis::RecordInfo { ltell: 0, rtype: RecordType::ReelHeader, size: 8, consistent: true });

    let index = lis::index_records(&mut stream);
    assert_eq!(index.size(),1);
    assert_eq!(index.explicits()[0],
        lis::RecordInfo { ltell: 12, rtype: RecordType::TapeHeader, size: 7, consistent: true });
}

#[test]
fn padding_on_uneven_boundary() {
    // first record ends at tell 7, padding runs to the next 4-byte boundary
    let mut file = pr(Some(232),0,&[b'x']);
    assert_eq!(file.len(),7);
    file.extend_from_slice(&[0x20,0x20,0x20,0x20,0x20]);
    file.append(&mut pr(Some(234),0,&[1,2]));

    let mut stream = stream_of(file);
    let index = lis::index_records(&mut stream);
    assert!(!index.is_incomplete());
    assert_eq!(index.explicits().len(),2);
    assert_eq!(index.explicits()[1].ltell,12);
    assert_eq!(index.explicits()[1].rtype,RecordType::BlankRecord);
}

#[test]
fn record_split_across_three_physical_records() {
    let mut file = pr(Some(234),lis::Prh::SUCCSES,&[1,2,3]);
    file.append(&mut pr(None,lis::Prh::PREDCES | lis::Prh::SUCCSES,&[4,5]));
    file.append(&mut pr(None,lis::Prh::PREDCES,&[6]));

    let mut stream = stream_of(file);
    let index = lis::index_records(&mut stream);
    assert!(!index.is_incomplete());
    assert_eq!(index.size(),1);
    let info = index.explicits()[0];
    assert_eq!(info.size,9 + 6 + 5);

    let rec = lis::read_record(&mut stream,&info).unwrap();
    assert_eq!(rec.data,vec![1,2,3,4,5,6]);
}

#[test]
fn trailing_padding_is_a_clean_eof() {
    let mut file = pr(Some(234),0,&[1,2]);
    file.extend_from_slice(&[0,0,0]);

    let mut stream = stream_of(file);
    let index = lis::index_records(&mut stream);
    assert!(!index.is_incomplete());
    assert_eq!(index.size(),1);
}

#[test]
fn truncation_is_not_a_clean_eof() {
    // the header claims more bytes than remain
    let mut file = pr(Some(234),0,&[1,2]);
    file.extend_from_slice(&[0x00,0x64,0x00,0x00,234,0]);

    let mut stream = stream_of(file);
    let index = lis::index_records(&mut stream);
    assert!(index.is_incomplete());
    assert_eq!(index.size(),1);
    assert!(index.errmsg().len() > 0);
}

#[test]
fn inconsistent_attributes_are_rejected() {
    // second physical record is missing its predecessor bit
    let mut file = pr(Some(234),lis::Prh::SUCCSES,&[1,2]);
    file.append(&mut pr(None,0,&[3]));

    let mut stream = stream_of(file);
    let index = lis::index_records(&mut stream);
    assert!(index.is_incomplete());
}

/// 40-byte spec block for the frame tests
fn spec40(mnemonic: &str,reserved_size: i16,samples: u8,reprc: u8) -> Vec<u8> {
    let mut ans = Vec::new();
    ans.extend_from_slice(&{
        let mut m = mnemonic.as_bytes().to_vec();
        m.resize(4,b' ');
        m
    });
    ans.resize(22,b' ');
    ans.extend_from_slice(&[0;4]);
    ans.extend_from_slice(&1i16.to_be_bytes());
    ans.extend_from_slice(&reserved_size.to_be_bytes());
    ans.extend_from_slice(&[0,0,0]);
    ans.push(samples);
    ans.push(reprc);
    ans.resize(40,0);
    ans
}

#[test]
fn dfsr_drives_frame_decoding() {
    // logical file: file header, DFSR with channels DEPT (1 sample) and
    // GR (2 samples), two one-row data records, file trailer
    let mut fthlr = vec![b' ';56];
    fthlr[0..4].copy_from_slice(b"FILE");

    let mut dfsr_body = vec![0,0,66];             // terminator entry
    dfsr_body.append(&mut spec40("DEPT",4,1,68));
    dfsr_body.append(&mut spec40("GR",8,2,68));

    fn row(depth: f32,gr1: f32,gr2: f32) -> Vec<u8> {
        let mut ans = Vec::new();
        wellkit::lis::types::encode_f32(&mut ans,depth);
        wellkit::lis::types::encode_f32(&mut ans,gr1);
        wellkit::lis::types::encode_f32(&mut ans,gr2);
        ans
    }

    let mut file = pr(Some(128),0,&fthlr);
    let dfsr_tell = file.len() as i64;
    file.append(&mut pr(Some(64),0,&dfsr_body));
    file.append(&mut pr(Some(0),0,&row(1000.0,85.5,86.5)));
    file.append(&mut pr(Some(0),0,&row(1000.5,90.0,91.0)));
    fthlr[0..4].copy_from_slice(b"TRLR");
    file.append(&mut pr(Some(129),0,&fthlr));

    let mut stream = stream_of(file);
    let index = lis::index_records(&mut stream);
    assert!(!index.is_incomplete());
    assert_eq!(index.explicits().len(),3);
    assert_eq!(index.implicits().len(),2);

    // every implicit between this DFSR and EOF belongs to it
    let implicits = index.implicits_of(dfsr_tell).unwrap();
    assert_eq!(implicits.len(),2);
    assert!(implicits[0].ltell > dfsr_tell);
    assert!(implicits[1].ltell > implicits[0].ltell);

    let dfsr_info = index.explicits().iter()
        .find(|info| info.rtype == RecordType::DataFormatSpec).unwrap();
    let rec = lis::read_record(&mut stream,dfsr_info).unwrap();
    let dfsr = protocol::parse_dfsr(&rec).unwrap();
    assert_eq!(dfsr.specs.len(),2);
    let fmt = protocol::dfs_fmtstr(&dfsr).unwrap();
    assert_eq!(fmt,"fff");

    let mut handler = Collector::new();
    let frames = lis::frame::read_frames(&mut stream,&fmt,implicits,&mut handler).unwrap();
    assert_eq!(frames.rows,2);
    assert_eq!(frames.stride,12);
    let row0 = frames.row(0);
    assert_eq!(f32::from_ne_bytes(row0[0..4].try_into().unwrap()),1000.0);
    assert_eq!(f32::from_ne_bytes(row0[4..8].try_into().unwrap()),85.5);
    assert_eq!(f32::from_ne_bytes(row0[8..12].try_into().unwrap()),86.5);
    let row1 = frames.row(1);
    assert_eq!(f32::from_ne_bytes(row1[0..4].try_into().unwrap()),1000.5);

    // the file header parses as its fixed layout
    let fh_info = index.explicits()[0];
    let rec = lis::read_record(&mut stream,&fh_info).unwrap();
    let head = protocol::parse_file_header(&rec).unwrap();
    assert_eq!(head.file_name,"FILE      ");
}

#[test]
fn multiple_dfsr_partition_their_implicits() {
    let mut dfsr_body = vec![0,0,66];
    dfsr_body.append(&mut spec40("DEPT",4,1,68));

    let mut file = pr(Some(64),0,&dfsr_body);
    let first_dfsr = 0i64;
    let mut one_row = Vec::new();
    wellkit::lis::types::encode_f32(&mut one_row,1.0);
    file.append(&mut pr(Some(0),0,&one_row));
    let second_dfsr = file.len() as i64;
    file.append(&mut pr(Some(64),0,&dfsr_body));
    file.append(&mut pr(Some(0),0,&one_row));
    file.append(&mut pr(Some(0),0,&one_row));

    let mut stream = stream_of(file);
    let index = lis::index_records(&mut stream);
    assert_eq!(index.implicits().len(),3);

    let first = index.implicits_of(first_dfsr).unwrap();
    assert_eq!(first.len(),1);
    assert!(first[0].ltell > first_dfsr && first[0].ltell < second_dfsr);
    let second = index.implicits_of(second_dfsr).unwrap();
    assert_eq!(second.len(),2);
    assert!(second[0].ltell > second_dfsr);

    // asking for a tell that is not a DFSR is refused
    assert!(index.implicits_of(999).is_err());
}

#[test]
fn tape_image_wrapped_lis() {
    // the same logical bytes, wrapped in tape marks, read through the opener
    let inner = pr(Some(234),0,&[1,2,3]);
    let mut file = Vec::new();
    file.extend_from_slice(&0u32.to_le_bytes());
    file.extend_from_slice(&0u32.to_le_bytes());
    file.extend_from_slice(&((12 + inner.len()) as u32).to_le_bytes());
    file.extend_from_slice(&inner);
    let eom_tell = file.len() as u32;
    file.extend_from_slice(&1u32.to_le_bytes());
    file.extend_from_slice(&0u32.to_le_bytes());
    file.extend_from_slice(&(eom_tell + 12).to_le_bytes());

    let mut tmp = tempfile::NamedTempFile::new().expect("no temp file");
    tmp.write_all(&file).expect("write failed");
    let path = tmp.path().to_str().unwrap().to_string();

    let mut stream = wellkit::create_lis_stream_from_file(&path).unwrap();
    let index = lis::index_records(stream.as_mut());
    assert!(!index.is_incomplete());
    assert_eq!(index.size(),1);
    let rec = lis::read_record(stream.as_mut(),&index.explicits()[0]).unwrap();
    assert_eq!(rec.data,vec![1,2,3]);
}
