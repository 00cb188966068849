// Block parsers are tested on synthetic record bodies; byte layouts follow
// LIS79 ch 4.1.6 (entry/spec blocks) and the Appendix A record layouts.

use super::protocol::*;
use super::{Record,RecordInfo,RecordType};

fn record(rtype: RecordType,data: Vec<u8>) -> Record {
    let size = data.len() + 6;
    Record {
        info: RecordInfo { ltell: 0, rtype, size, consistent: true },
        data
    }
}

fn padded(s: &str,len: usize) -> Vec<u8> {
    let mut ans = s.as_bytes().to_vec();
    ans.resize(len,b' ');
    ans
}

/// 40-byte spec block; the subtype-specific regions are left zeroed
fn spec40(mnemonic: &str,units: &str,reserved_size: i16,samples: u8,reprc: u8) -> Vec<u8> {
    let mut ans = Vec::new();
    ans.append(&mut padded(mnemonic,4));
    ans.append(&mut padded("SRVC",6));
    ans.append(&mut padded("ORDER",8));
    ans.append(&mut padded(units,4));
    ans.extend_from_slice(&[0;4]);
    ans.extend_from_slice(&1i16.to_be_bytes());
    ans.extend_from_slice(&reserved_size.to_be_bytes());
    ans.extend_from_slice(&[0,0]);
    ans.push(0);
    ans.push(samples);
    ans.push(reprc);
    ans.resize(40,0);
    ans
}

fn terminator() -> Vec<u8> {
    vec![0,0,66]
}

#[test]
fn entry_blocks() {
    // up/down flag, one byte, value 1
    let rec = record(RecordType::DataFormatSpec,vec![4,1,66,1]);
    let entry = read_entry_block(&rec,0).unwrap();
    assert_eq!(entry.etype,EntryType::UpDownFlag);
    assert_eq!(entry.size,1);
    assert_eq!(entry.value,LisValue::Byte(1));
    assert_eq!(entry.value.as_f32(),Some(1.0));

    // zero size means no value
    let rec = record(RecordType::DataFormatSpec,terminator());
    let entry = read_entry_block(&rec,0).unwrap();
    assert_eq!(entry.etype,EntryType::Terminator);
    assert_eq!(entry.value,LisValue::Absent);

    // type out of range
    let rec = record(RecordType::DataFormatSpec,vec![17,0,66]);
    assert!(read_entry_block(&rec,0).is_err());

    // size disagrees with the code
    let rec = record(RecordType::DataFormatSpec,vec![8,3,68,0,0,0]);
    assert!(read_entry_block(&rec,0).is_err());

    // unknown representation code
    let rec = record(RecordType::DataFormatSpec,vec![8,4,99,0,0,0,0]);
    assert!(read_entry_block(&rec,0).is_err());
}

#[test]
fn dfsr_with_two_channels() {
    let mut body = terminator();
    body.append(&mut spec40("DEPT","M",4,1,68));
    body.append(&mut spec40("GR","GAPI",8,2,68));
    let rec = record(RecordType::DataFormatSpec,body);

    let dfsr = parse_dfsr(&rec).unwrap();
    assert_eq!(dfsr.entries.len(),1);
    assert_eq!(dfsr.specs.len(),2);
    assert_eq!(dfsr.specs[0].mnemonic,"DEPT");
    assert_eq!(dfsr.specs[0].samples,1);
    assert_eq!(dfsr.specs[1].mnemonic,"GR  ");
    assert_eq!(dfsr.specs[1].samples,2);
    assert_eq!(dfsr.specs[1].units,"GAPI");
    match dfsr.specs[0].api {
        SpecApi::Subtype0 {..} => {},
        _ => panic!("expected subtype 0")
    }

    let fmt = dfs_fmtstr(&dfsr).unwrap();
    assert_eq!(fmt,"fff");
    assert_eq!(super::packf::packed_size(&fmt).unwrap(),(Some(12),Some(12)));
}

#[test]
fn dfsr_subtype_selection() {
    // entry 16 selects spec block subtype 1
    let mut body = vec![16,1,66,1];
    body.append(&mut terminator());
    let mut spec = spec40("SP","MV",4,1,68);
    spec[35] = 0b0100_0001;     // logging direction 1, derived
    spec[36] = 0b0000_0100;     // pressure correction
    body.append(&mut spec);
    let rec = record(RecordType::DataFormatSpec,body);

    let dfsr = parse_dfsr(&rec).unwrap();
    assert_eq!(dfsr.entry(EntryType::SpecBlockSubtype).unwrap().value,LisValue::Byte(1));
    match &dfsr.specs[0].api {
        SpecApi::Subtype1 { api_codes: _, process_indicators } => {
            assert_eq!(process_indicators.original_logging_direction,1);
            assert!(process_indicators.derived);
            assert!(process_indicators.pressure_correction);
            assert!(!process_indicators.computed);
        },
        _ => panic!("expected subtype 1")
    }
}

#[test]
fn suppressed_channels() {
    let mut body = terminator();
    body.append(&mut spec40("DEPT","M",4,1,68));
    body.append(&mut spec40("HIDE","",-4,1,68));
    let rec = record(RecordType::DataFormatSpec,body);

    let dfsr = parse_dfsr(&rec).unwrap();
    let fmt = dfs_fmtstr(&dfsr).unwrap();
    assert_eq!(fmt,"fSSSS");
    assert_eq!(super::packf::packed_size(&fmt).unwrap(),(Some(8),Some(4)));
}

#[test]
fn information_record() {
    let mut body = Vec::new();
    body.push(73);                       // type
    body.push(65);                       // reprc string
    body.push(4);                        // size
    body.push(0);                        // category
    body.append(&mut padded("WN",4));    // mnemonic
    body.append(&mut padded("",4));      // units
    body.extend_from_slice(b"15/9");     // value
    let rec = record(RecordType::WellsiteData,body);

    let inforec = parse_info_record(&rec).unwrap();
    assert_eq!(inforec.components.len(),1);
    assert_eq!(inforec.components[0].mnemonic,"WN  ");
    assert_eq!(inforec.components[0].component,LisValue::Str("15/9".to_string()));

    // component type outside {0,69,73} is rejected
    let mut body = vec![5,65,0,0];
    body.append(&mut padded("XX",4));
    body.append(&mut padded("",4));
    let rec = record(RecordType::WellsiteData,body);
    assert!(parse_info_record(&rec).is_err());
}

#[test]
fn text_records() {
    let rec = record(RecordType::FlicComment,b"all quiet on the rig".to_vec());
    let text = parse_text_record(&rec).unwrap();
    assert_eq!(text.message,"all quiet on the rig");

    let rec = record(RecordType::NormalData,b"not text".to_vec());
    assert!(parse_text_record(&rec).is_err());
}

#[test]
fn file_header_layout() {
    let mut body = Vec::new();
    body.append(&mut padded("LIS1",10));
    body.append(&mut padded("",2));
    body.append(&mut padded("SUBLV",6));
    body.append(&mut padded("V1.0",8));
    body.append(&mut padded("81/02/28",8));
    body.append(&mut padded("",1));
    body.append(&mut padded("1024",5));
    body.append(&mut padded("",2));
    body.append(&mut padded("LO",2));
    body.append(&mut padded("",2));
    body.append(&mut padded("Prev",10));
    assert_eq!(body.len(),FILE_RECORD_SIZE);
    let rec = record(RecordType::FileHeader,body);

    let head = parse_file_header(&rec).unwrap();
    assert_eq!(head.file_name,"LIS1      ");
    assert_eq!(head.service_sublvl_name,"SUBLV ");
    assert_eq!(head.date_of_generation,"81/02/28");
    assert_eq!(head.max_pr_length,"1024 ");
    assert_eq!(head.file_type,"LO");
    assert_eq!(head.prev_file_name,"Prev      ");

    // short records are rejected
    let rec = record(RecordType::FileHeader,vec![0;40]);
    assert!(parse_file_header(&rec).is_err());
    // and so is the wrong type
    let rec = record(RecordType::FileTrailer,vec![b' ';56]);
    assert!(parse_file_header(&rec).is_err());
}

#[test]
fn reel_header_layout() {
    let mut body = Vec::new();
    body.append(&mut padded("SRVC",6));
    body.append(&mut padded("",6));
    body.append(&mut padded("81/02/28",8));
    body.append(&mut padded("",2));
    body.append(&mut padded("ORGN",4));
    body.append(&mut padded("",2));
    body.append(&mut padded("REEL0001",8));
    body.append(&mut padded("",2));
    body.append(&mut padded("01",2));
    body.append(&mut padded("",2));
    body.append(&mut padded("REEL0000",8));
    body.append(&mut padded("",2));
    body.append(&mut padded("a comment",74));
    assert_eq!(body.len(),REEL_TAPE_RECORD_SIZE);
    let rec = record(RecordType::ReelHeader,body);

    let head = parse_reel_header(&rec).unwrap();
    assert_eq!(head.service_name,"SRVC  ");
    assert_eq!(head.name,"REEL0001");
    assert_eq!(head.continuation_number,"01");
    assert_eq!(head.linked_name,"REEL0000");
    assert!(head.comment.starts_with("a comment"));

    // tape parser refuses a reel record
    assert!(parse_tape_header(&rec).is_err());
}
