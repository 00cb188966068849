//! # LIS Semantic Blocks
//!
//! Parsed forms of the record bodies that matter: the data format
//! specification record (DFSR) with its entry and spec blocks, information
//! records made of component blocks, the fixed-layout file/reel/tape headers
//! and trailers, and free-text records.
//!
//! The DFSR is the keystone.  Its ordered spec blocks describe one channel
//! each, and together they determine the format string used to decode every
//! implicit data record that follows, until the next DFSR or the end of the
//! logical file.

use log::error;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use super::types::{self,Reprc};
use super::packf;
use super::{Error,Record,RecordInfo,RecordType};
use crate::cursor::Cursor;

/// Tagged value of an entry or component block.
#[derive(Debug,Clone,PartialEq)]
pub enum LisValue {
    Absent,
    I8(i8),
    I16(i16),
    I32(i32),
    F16(f32),
    F32(f32),
    F32Low(f32),
    F32Fix(f32),
    Str(String),
    Byte(u8),
    Mask(Vec<u8>)
}

impl LisValue {
    /// the numeric content regardless of width, None for non-numeric values
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::I8(x) => Some(*x as f32),
            Self::I16(x) => Some(*x as f32),
            Self::I32(x) => Some(*x as f32),
            Self::F16(x) | Self::F32(x) | Self::F32Low(x) | Self::F32Fix(x) => Some(*x),
            Self::Byte(x) => Some(*x as f32),
            _ => None
        }
    }
}

/// decode one value of the given code, `size` feeding the externally-sized types
fn element(cur: &mut Cursor,size: usize,reprc: Reprc) -> Result<LisValue,Error> {
    match reprc {
        Reprc::I8 => Ok(LisValue::I8(types::i8(cur)?)),
        Reprc::I16 => Ok(LisValue::I16(types::i16(cur)?)),
        Reprc::I32 => Ok(LisValue::I32(types::i32(cur)?)),
        Reprc::F16 => Ok(LisValue::F16(types::f16(cur)?)),
        Reprc::F32 => Ok(LisValue::F32(types::f32(cur)?)),
        Reprc::F32Low => Ok(LisValue::F32Low(types::f32low(cur)?)),
        Reprc::F32Fix => Ok(LisValue::F32Fix(types::f32fix(cur)?)),
        Reprc::String => Ok(LisValue::Str(types::string(cur,size)?)),
        Reprc::Byte => Ok(LisValue::Byte(types::byte(cur)?)),
        Reprc::Mask => Ok(LisValue::Mask(types::mask(cur,size)?))
    }
}

/// All entry block types of LIS79 ch 4.1.6.
#[derive(FromPrimitive,Debug,Clone,Copy,PartialEq,Eq)]
pub enum EntryType {
    Terminator = 0,
    DataRecType = 1,
    SpecBlockType = 2,
    FrameSize = 3,
    UpDownFlag = 4,
    DepthScaleUnits = 5,
    RefPoint = 6,
    RefPointUnits = 7,
    Spacing = 8,
    SpacingUnits = 9,
    Undefined = 10,
    MaxFramesPrRec = 11,
    AbsentValue = 12,
    DepthRecMode = 13,
    UnitsOfDepth = 14,
    ReprcOutputDepth = 15,
    SpecBlockSubtype = 16
}

/// Entry block: one general fact about the frame, minimum 3 bytes.
#[derive(Debug,Clone,PartialEq)]
pub struct EntryBlock {
    pub etype: EntryType,
    pub size: u8,
    pub reprc: Reprc,
    pub value: LisValue
}

pub const ENTRY_BLOCK_FIXED_SIZE: usize = 3;

/// the declared size must be zero, the code's own size, or anything for
/// externally-sized codes
fn size_plausible(size: u8,reprc: Reprc) -> bool {
    let reprc_size = reprc.size_on_disk();
    size as usize == reprc_size || size == 0 || reprc_size == types::VARIABLE_LENGTH
}

/// Read the entry block at `offset` into the record.
pub fn read_entry_block(rec: &Record,offset: usize) -> Result<EntryBlock,Error> {
    if rec.data.len() < offset + ENTRY_BLOCK_FIXED_SIZE {
        error!("{} bytes left in record, entry block needs at least {}",
            rec.data.len() as i64 - offset as i64,ENTRY_BLOCK_FIXED_SIZE);
        return Err(Error::Truncated);
    }
    let mut cur = Cursor::new(&rec.data[offset..]);
    let raw_type = types::byte(&mut cur)?;
    let size = types::byte(&mut cur)?;
    let raw_reprc = types::byte(&mut cur)?;

    let etype = match EntryType::from_u8(raw_type) {
        Some(etype) => etype,
        None => {
            error!("unknown entry type {}",raw_type);
            return Err(Error::UnexpectedValue);
        }
    };
    let reprc = match Reprc::from_byte(raw_reprc) {
        Some(reprc) => reprc,
        None => {
            error!("unknown representation code {} for entry (type: {})",raw_reprc,raw_type);
            return Err(Error::UnexpectedValue);
        }
    };
    if !size_plausible(size,reprc) {
        error!("invalid entry (type: {}): expected size for reprc {} is {}, was {}",
            raw_type,raw_reprc,reprc.size_on_disk(),size);
        return Err(Error::Inconsistent);
    }
    if cur.remaining() < size as usize {
        error!("{} bytes left in record, entry value needs {}",cur.remaining(),size);
        return Err(Error::Truncated);
    }

    let value = match size {
        0 => LisValue::Absent,
        _ => element(&mut cur,size as usize,reprc)?
    };
    Ok(EntryBlock { etype, size, reprc, value })
}

pub const SPEC_BLOCK_SIZE: usize = 40;

/// The decoded 5-byte process indicator mask of a subtype 1 spec block.
#[derive(Debug,Clone,Copy,PartialEq,Eq,Default)]
pub struct ProcessIndicators {
    /// 2-bit field, 0..=3
    pub original_logging_direction: u8,
    pub true_vertical_depth_correction: bool,
    pub data_channel_not_on_depth: bool,
    pub data_channel_is_filtered: bool,
    pub data_channel_is_calibrated: bool,
    pub computed: bool,
    pub derived: bool,
    pub tool_defined_correction_nb_2: bool,
    pub tool_defined_correction_nb_1: bool,
    pub mudcake_correction: bool,
    pub lithology_correction: bool,
    pub inclinometry_correction: bool,
    pub pressure_correction: bool,
    pub hole_size_correction: bool,
    pub temperature_correction: bool,
    pub auxiliary_data_flag: bool,
    pub schlumberger_proprietary: bool
}

impl ProcessIndicators {
    pub fn from_mask(mask: &[u8]) -> Result<Self,Error> {
        if mask.len() != 5 {
            error!("invalid process indicator mask length {}",mask.len());
            return Err(Error::BadSize);
        }
        Ok(Self {
            original_logging_direction: (mask[0] & (1 << 7 | 1 << 6)) >> 6,
            true_vertical_depth_correction: mask[0] & 1 << 5 != 0,
            data_channel_not_on_depth: mask[0] & 1 << 4 != 0,
            data_channel_is_filtered: mask[0] & 1 << 3 != 0,
            data_channel_is_calibrated: mask[0] & 1 << 2 != 0,
            computed: mask[0] & 1 << 1 != 0,
            derived: mask[0] & 1 << 0 != 0,
            tool_defined_correction_nb_2: mask[1] & 1 << 7 != 0,
            tool_defined_correction_nb_1: mask[1] & 1 << 6 != 0,
            mudcake_correction: mask[1] & 1 << 5 != 0,
            lithology_correction: mask[1] & 1 << 4 != 0,
            inclinometry_correction: mask[1] & 1 << 3 != 0,
            pressure_correction: mask[1] & 1 << 2 != 0,
            hole_size_correction: mask[1] & 1 << 1 != 0,
            temperature_correction: mask[1] & 1 << 0 != 0,
            auxiliary_data_flag: mask[2] & 1 << 1 != 0,
            schlumberger_proprietary: mask[2] & 1 << 0 != 0
        })
    }
}

/// Fields that differ between the two spec block subtypes.
#[derive(Debug,Clone,PartialEq)]
pub enum SpecApi {
    Subtype0 {
        log_type: u8,
        curve_type: u8,
        curve_class: u8,
        modifier: u8,
        process_level: u8
    },
    Subtype1 {
        api_codes: i32,
        process_indicators: ProcessIndicators
    }
}

/// Data specification block: per-channel metadata, fixed 40 bytes.
/// Subtypes 0 and 1 share the frame and differ in API-code interpretation.
#[derive(Debug,Clone,PartialEq)]
pub struct SpecBlock {
    pub mnemonic: String,
    pub service_id: String,
    pub service_order_nr: String,
    pub units: String,
    pub file_nr: i16,
    /// bytes this channel occupies per frame; negative means suppressed output
    pub reserved_size: i16,
    pub samples: u8,
    /// raw code byte, validated when the format string is built
    pub reprc: u8,
    pub api: SpecApi
}

fn read_spec_common(buf: &[u8]) -> Result<SpecBlock,Error> {
    let mut cur = Cursor::new(buf);
    let mnemonic = types::string(&mut cur,4)?;
    let service_id = types::string(&mut cur,6)?;
    let service_order_nr = types::string(&mut cur,8)?;
    let units = types::string(&mut cur,4)?;
    cur.skip(4)?;                     // subtype-specific, read by the caller
    let file_nr = types::i16(&mut cur)?;
    let reserved_size = types::i16(&mut cur)?;
    cur.skip(2)?;                     // padding
    cur.skip(1)?;                     // subtype-specific
    let samples = types::byte(&mut cur)?;
    let reprc = types::byte(&mut cur)?;
    Ok(SpecBlock {
        mnemonic, service_id, service_order_nr, units,
        file_nr, reserved_size, samples, reprc,
        api: SpecApi::Subtype0 { log_type: 0, curve_type: 0, curve_class: 0, modifier: 0, process_level: 0 }
    })
}

/// Read a subtype 0 spec block at `offset` into the record.
pub fn read_spec_block0(rec: &Record,offset: usize) -> Result<SpecBlock,Error> {
    if rec.data.len() < offset + SPEC_BLOCK_SIZE {
        error!("{} bytes left in record, spec block needs {}",
            rec.data.len() as i64 - offset as i64,SPEC_BLOCK_SIZE);
        return Err(Error::Truncated);
    }
    let buf = &rec.data[offset..offset+SPEC_BLOCK_SIZE];
    let mut spec = read_spec_common(buf)?;
    spec.api = SpecApi::Subtype0 {
        log_type: buf[22],
        curve_type: buf[23],
        curve_class: buf[24],
        modifier: buf[25],
        process_level: buf[32]
    };
    Ok(spec)
}

/// Read a subtype 1 spec block at `offset` into the record.
pub fn read_spec_block1(rec: &Record,offset: usize) -> Result<SpecBlock,Error> {
    if rec.data.len() < offset + SPEC_BLOCK_SIZE {
        error!("{} bytes left in record, spec block needs {}",
            rec.data.len() as i64 - offset as i64,SPEC_BLOCK_SIZE);
        return Err(Error::Truncated);
    }
    let buf = &rec.data[offset..offset+SPEC_BLOCK_SIZE];
    let mut spec = read_spec_common(buf)?;
    let mut cur = Cursor::new(&buf[22..26]);
    spec.api = SpecApi::Subtype1 {
        api_codes: types::i32(&mut cur)?,
        process_indicators: ProcessIndicators::from_mask(&buf[35..40])?
    };
    Ok(spec)
}

/// Parsed data format specification record.
#[derive(Debug,Clone)]
pub struct Dfsr {
    pub info: RecordInfo,
    pub entries: Vec<EntryBlock>,
    pub specs: Vec<SpecBlock>
}

impl Dfsr {
    /// the entry of the given type, if any
    pub fn entry(&self,etype: EntryType) -> Option<&EntryBlock> {
        self.entries.iter().find(|e| e.etype == etype)
    }
}

/// Parse a DFSR: entry blocks up to and including the terminator, then
/// fixed-size spec blocks until the record is consumed.  The subtype entry
/// selects how the spec blocks' API fields are read.
pub fn parse_dfsr(rec: &Record) -> Result<Dfsr,Error> {
    let mut formatspec = Dfsr { info: rec.info, entries: Vec::new(), specs: Vec::new() };

    let mut subtype = 0;
    let mut offset = 0usize;

    loop {
        let entry = read_entry_block(rec,offset)?;
        let etype = entry.etype;

        if etype == EntryType::SpecBlockSubtype {
            if entry.value.as_f32() == Some(1.0) {
                subtype = 1;
            }
        }

        offset += ENTRY_BLOCK_FIXED_SIZE + entry.size as usize;
        formatspec.entries.push(entry);

        if etype == EntryType::Terminator {
            break;
        }
    }

    while offset < rec.data.len() {
        let spec = match subtype {
            0 => read_spec_block0(rec,offset)?,
            _ => read_spec_block1(rec,offset)?
        };
        formatspec.specs.push(spec);
        offset += SPEC_BLOCK_SIZE;
    }

    Ok(formatspec)
}

/// Build the row format string for the implicit records governed by a DFSR.
///
/// Each spec block contributes `samples` copies of its code's format
/// character.  A negative reserved size marks a suppressed channel: it
/// contributes that many suppress bytes instead, which decode to nothing.
pub fn dfs_fmtstr(dfs: &Dfsr) -> Result<String,Error> {
    let mut fmt = String::new();
    for spec in &dfs.specs {
        if spec.reserved_size < 0 {
            for _i in 0..spec.reserved_size.unsigned_abs() {
                fmt.push(packf::FMT_SUPPRESS);
            }
            continue;
        }
        let reprc = match Reprc::from_byte(spec.reprc) {
            Some(reprc) => reprc,
            None => {
                error!("unknown representation code {} in spec block {}",spec.reprc,spec.mnemonic);
                return Err(Error::UnexpectedValue);
            }
        };
        if reprc == Reprc::String || reprc == Reprc::Mask {
            // no externally-sized codes inside a frame
            error!("representation code {} cannot appear in frame data",spec.reprc);
            return Err(Error::UnexpectedValue);
        }
        for _i in 0..spec.samples {
            fmt.push(packf::fmt_of_reprc(reprc));
        }
    }
    Ok(fmt)
}

/// Component block of an information record.
#[derive(Debug,Clone,PartialEq)]
pub struct ComponentBlock {
    pub type_nb: u8,
    pub reprc: Reprc,
    pub size: u8,
    pub category: u8,
    pub mnemonic: String,
    pub units: String,
    pub component: LisValue
}

pub const COMPONENT_BLOCK_FIXED_SIZE: usize = 12;

/// Read the component block at `offset` into the record.
pub fn read_component_block(rec: &Record,offset: usize) -> Result<ComponentBlock,Error> {
    if rec.data.len() < offset + COMPONENT_BLOCK_FIXED_SIZE {
        error!("{} bytes left in record, component block needs at least {}",
            rec.data.len() as i64 - offset as i64,COMPONENT_BLOCK_FIXED_SIZE);
        return Err(Error::Truncated);
    }
    let mut cur = Cursor::new(&rec.data[offset..]);
    let type_nb = types::byte(&mut cur)?;
    let raw_reprc = types::byte(&mut cur)?;
    let size = types::byte(&mut cur)?;
    let category = types::byte(&mut cur)?;
    let mnemonic = types::string(&mut cur,4)?;
    let units = types::string(&mut cur,4)?;

    // Customer Tape Subset Appendix G also names types 1-4, not seen in the wild
    match type_nb {
        0 | 69 | 73 => {},
        _ => {
            error!("unknown component type {} in component {}",type_nb,mnemonic);
            return Err(Error::UnexpectedValue);
        }
    }
    let reprc = match Reprc::from_byte(raw_reprc) {
        Some(reprc) => reprc,
        None => {
            error!("unknown representation code {} in component {}",raw_reprc,mnemonic);
            return Err(Error::UnexpectedValue);
        }
    };
    if !size_plausible(size,reprc) {
        error!("invalid component (mnem: {}): expected size for reprc {} is {}, was {}",
            mnemonic,raw_reprc,reprc.size_on_disk(),size);
        return Err(Error::Inconsistent);
    }
    if cur.remaining() < size as usize {
        error!("{} bytes left in record, component value needs {}",cur.remaining(),size);
        return Err(Error::Truncated);
    }

    let component = match size {
        0 => LisValue::Absent,
        _ => element(&mut cur,size as usize,reprc)?
    };
    Ok(ComponentBlock { type_nb, reprc, size, category, mnemonic, units, component })
}

/// Information record: job identification, wellsite data or tool string info,
/// a flat sequence of component blocks.
#[derive(Debug,Clone)]
pub struct InformationRecord {
    pub info: RecordInfo,
    pub components: Vec<ComponentBlock>
}

pub fn parse_info_record(rec: &Record) -> Result<InformationRecord,Error> {
    let mut inforec = InformationRecord { info: rec.info, components: Vec::new() };
    let mut offset = 0usize;
    while offset < rec.data.len() {
        let component = read_component_block(rec,offset)?;
        offset += COMPONENT_BLOCK_FIXED_SIZE + component.size as usize;
        inforec.components.push(component);
    }
    Ok(inforec)
}

/// Free-text record, the whole body is one string.
#[derive(Debug,Clone,PartialEq)]
pub struct TextRecord {
    pub rtype: RecordType,
    pub message: String
}

pub fn parse_text_record(rec: &Record) -> Result<TextRecord,Error> {
    match rec.info.rtype {
        RecordType::OpCommandInputs | RecordType::OpResponseInputs |
        RecordType::SystemOutputs | RecordType::FlicComment => {},
        _ => {
            error!("invalid record type for text record, {} ({})",
                rec.info.rtype as u8,rec.info.rtype.name());
            return Err(Error::UnexpectedValue);
        }
    }
    let mut cur = Cursor::new(&rec.data);
    let message = types::string(&mut cur,rec.data.len())?;
    Ok(TextRecord { rtype: rec.info.rtype, message })
}

pub const FILE_RECORD_SIZE: usize = 56;

/// File header record, fixed 56-byte ASCII layout.
#[derive(Debug,Clone,PartialEq,Default)]
pub struct FileHeader {
    pub file_name: String,
    pub service_sublvl_name: String,
    pub version_number: String,
    pub date_of_generation: String,
    pub max_pr_length: String,
    pub file_type: String,
    pub prev_file_name: String
}

/// File trailer record; same layout as the header but pointing forward.
#[derive(Debug,Clone,PartialEq,Default)]
pub struct FileTrailer {
    pub file_name: String,
    pub service_sublvl_name: String,
    pub version_number: String,
    pub date_of_generation: String,
    pub max_pr_length: String,
    pub file_type: String,
    pub next_file_name: String
}

fn parse_file_fields(rec: &Record) -> Result<[String;7],Error> {
    if rec.data.len() < FILE_RECORD_SIZE {
        error!("unable to parse {}: expected {} bytes, raw record is only {}",
            rec.info.rtype.name(),FILE_RECORD_SIZE,rec.data.len());
        return Err(Error::BadSize);
    }
    let mut cur = Cursor::new(&rec.data);
    let file_name = types::string(&mut cur,10)?;
    cur.skip(2)?;
    let service_sublvl_name = types::string(&mut cur,6)?;
    let version_number = types::string(&mut cur,8)?;
    let date_of_generation = types::string(&mut cur,8)?;
    cur.skip(1)?;
    let max_pr_length = types::string(&mut cur,5)?;
    cur.skip(2)?;
    let file_type = types::string(&mut cur,2)?;
    cur.skip(2)?;
    let other_name = types::string(&mut cur,10)?;
    Ok([file_name,service_sublvl_name,version_number,date_of_generation,
        max_pr_length,file_type,other_name])
}

pub fn parse_file_header(rec: &Record) -> Result<FileHeader,Error> {
    if rec.info.rtype != RecordType::FileHeader {
        error!("invalid record type for file header, {} ({})",
            rec.info.rtype as u8,rec.info.rtype.name());
        return Err(Error::UnexpectedValue);
    }
    let [file_name,service_sublvl_name,version_number,date_of_generation,
        max_pr_length,file_type,prev_file_name] = parse_file_fields(rec)?;
    Ok(FileHeader { file_name, service_sublvl_name, version_number,
        date_of_generation, max_pr_length, file_type, prev_file_name })
}

pub fn parse_file_trailer(rec: &Record) -> Result<FileTrailer,Error> {
    if rec.info.rtype != RecordType::FileTrailer {
        error!("invalid record type for file trailer, {} ({})",
            rec.info.rtype as u8,rec.info.rtype.name());
        return Err(Error::UnexpectedValue);
    }
    let [file_name,service_sublvl_name,version_number,date_of_generation,
        max_pr_length,file_type,next_file_name] = parse_file_fields(rec)?;
    Ok(FileTrailer { file_name, service_sublvl_name, version_number,
        date_of_generation, max_pr_length, file_type, next_file_name })
}

pub const REEL_TAPE_RECORD_SIZE: usize = 126;

/// Reel or tape header/trailer record, fixed 126-byte ASCII layout.
/// `linked_name` is the previous reel/tape for headers, the next for trailers.
#[derive(Debug,Clone,PartialEq,Default)]
pub struct ReelTapeRecord {
    pub rkind: Option<RecordType>,
    pub service_name: String,
    pub date: String,
    pub origin_of_data: String,
    pub name: String,
    pub continuation_number: String,
    pub linked_name: String,
    pub comment: String
}

fn parse_reel_tape_record(rec: &Record,expected: &[RecordType]) -> Result<ReelTapeRecord,Error> {
    if !expected.contains(&rec.info.rtype) {
        error!("invalid record type for reel/tape record, {} ({})",
            rec.info.rtype as u8,rec.info.rtype.name());
        return Err(Error::UnexpectedValue);
    }
    if rec.data.len() < REEL_TAPE_RECORD_SIZE {
        error!("unable to parse {}: expected {} bytes, raw record is only {}",
            rec.info.rtype.name(),REEL_TAPE_RECORD_SIZE,rec.data.len());
        return Err(Error::BadSize);
    }
    let mut cur = Cursor::new(&rec.data);
    let service_name = types::string(&mut cur,6)?;
    cur.skip(6)?;
    let date = types::string(&mut cur,8)?;
    cur.skip(2)?;
    let origin_of_data = types::string(&mut cur,4)?;
    cur.skip(2)?;
    let name = types::string(&mut cur,8)?;
    cur.skip(2)?;
    let continuation_number = types::string(&mut cur,2)?;
    cur.skip(2)?;
    let linked_name = types::string(&mut cur,8)?;
    cur.skip(2)?;
    let comment = types::string(&mut cur,74)?;
    Ok(ReelTapeRecord { rkind: Some(rec.info.rtype), service_name, date,
        origin_of_data, name, continuation_number, linked_name, comment })
}

pub fn parse_reel_header(rec: &Record) -> Result<ReelTapeRecord,Error> {
    parse_reel_tape_record(rec,&[RecordType::ReelHeader])
}

pub fn parse_reel_trailer(rec: &Record) -> Result<ReelTapeRecord,Error> {
    parse_reel_tape_record(rec,&[RecordType::ReelTrailer])
}

pub fn parse_tape_header(rec: &Record) -> Result<ReelTapeRecord,Error> {
    parse_reel_tape_record(rec,&[RecordType::TapeHeader])
}

pub fn parse_tape_trailer(rec: &Record) -> Result<ReelTapeRecord,Error> {
    parse_reel_tape_record(rec,&[RecordType::TapeTrailer])
}
