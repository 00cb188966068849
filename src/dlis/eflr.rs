//! # Explicitly Formatted Logical Records
//!
//! An EFLR body is a stream of components.  The first is always a SET, which
//! carries a type and optionally a name.  Then comes the template, a run of
//! attribute components that declares the default shape of every object in the
//! set.  The rest of the record is objects: each OBJECT component is followed
//! by attribute components that override the template defaults by position.
//!
//! Files violate this grammar in every way imaginable, so the parse routines
//! log `Diagnostic`s on whatever they were building and keep going whenever
//! recovery is plausible.  The consumer is responsible for checking the logs
//! before trusting the content.
//!
//! An `ObjectSet` is self parsing: it holds the raw record and only parses on
//! the first query for objects.  Most sets in a typical file are never
//! queried, and a broken set must not take the rest of the file down with it.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use log::error;
use super::types::{self,Reprc,Obname,Dtime,Objref,Attref};
use super::{Record,Error};
use crate::cursor::Cursor;
use crate::diag::{Severity,Diagnostic,is_log_clear};

pub const DESCRIPTOR_SIZE: usize = 1;

/// Component role, the top three bits of the descriptor byte.
#[derive(FromPrimitive,Debug,Clone,Copy,PartialEq,Eq)]
pub enum Role {
    Absatr = 0x00,
    Attrib = 0x20,
    Invatr = 0x40,
    Object = 0x60,
    Reserved = 0x80,
    Rdset = 0xA0,
    Rset = 0xC0,
    Set = 0xE0
}

impl Role {
    pub fn from_descriptor(desc: u8) -> Self {
        FromPrimitive::from_u8(desc & 0xE0).expect("unreachable")
    }
    pub fn name(&self) -> &'static str {
        match self {
            Self::Absatr => "ABSATR",
            Self::Attrib => "ATTRIB",
            Self::Invatr => "INVATR",
            Self::Object => "OBJECT",
            Self::Reserved => "reserved",
            Self::Rdset => "RDSET",
            Self::Rset => "RSET",
            Self::Set => "SET"
        }
    }
}

/// Typed value sequence of an attribute.  A variant of vectors rather than a
/// vector of variants: the type resolution happens once per attribute.
#[derive(Debug,Clone,PartialEq)]
pub enum ValueVector {
    Absent,
    Fshort(Vec<f32>),
    Fsingl(Vec<f32>),
    Fsing1(Vec<(f32,f32)>),
    Fsing2(Vec<(f32,f32,f32)>),
    Isingl(Vec<f32>),
    Vsingl(Vec<f32>),
    Fdoubl(Vec<f64>),
    Fdoub1(Vec<(f64,f64)>),
    Fdoub2(Vec<(f64,f64,f64)>),
    Csingl(Vec<(f32,f32)>),
    Cdoubl(Vec<(f64,f64)>),
    Sshort(Vec<i8>),
    Snorm(Vec<i16>),
    Slong(Vec<i32>),
    Ushort(Vec<u8>),
    Unorm(Vec<u16>),
    Ulong(Vec<u32>),
    Uvari(Vec<i32>),
    Ident(Vec<String>),
    Ascii(Vec<String>),
    Dtime(Vec<Dtime>),
    Origin(Vec<i32>),
    Obname(Vec<Obname>),
    Objref(Vec<Objref>),
    Attref(Vec<Attref>),
    Status(Vec<bool>),
    Units(Vec<String>)
}

impl ValueVector {
    /// element count, None when the value is absent
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Absent => None,
            Self::Fshort(v) | Self::Fsingl(v) | Self::Isingl(v) | Self::Vsingl(v) => Some(v.len()),
            Self::Fsing1(v) | Self::Csingl(v) => Some(v.len()),
            Self::Fsing2(v) => Some(v.len()),
            Self::Fdoubl(v) => Some(v.len()),
            Self::Fdoub1(v) | Self::Cdoubl(v) => Some(v.len()),
            Self::Fdoub2(v) => Some(v.len()),
            Self::Sshort(v) => Some(v.len()),
            Self::Snorm(v) => Some(v.len()),
            Self::Slong(v) | Self::Uvari(v) | Self::Origin(v) => Some(v.len()),
            Self::Ushort(v) => Some(v.len()),
            Self::Unorm(v) => Some(v.len()),
            Self::Ulong(v) => Some(v.len()),
            Self::Ident(v) | Self::Ascii(v) | Self::Units(v) => Some(v.len()),
            Self::Dtime(v) => Some(v.len()),
            Self::Obname(v) => Some(v.len()),
            Self::Objref(v) => Some(v.len()),
            Self::Attref(v) => Some(v.len()),
            Self::Status(v) => Some(v.len())
        }
    }
    pub fn truncate(&mut self,count: usize) {
        match self {
            Self::Absent => {},
            Self::Fshort(v) | Self::Fsingl(v) | Self::Isingl(v) | Self::Vsingl(v) => v.truncate(count),
            Self::Fsing1(v) | Self::Csingl(v) => v.truncate(count),
            Self::Fsing2(v) => v.truncate(count),
            Self::Fdoubl(v) => v.truncate(count),
            Self::Fdoub1(v) | Self::Cdoubl(v) => v.truncate(count),
            Self::Fdoub2(v) => v.truncate(count),
            Self::Sshort(v) => v.truncate(count),
            Self::Snorm(v) => v.truncate(count),
            Self::Slong(v) | Self::Uvari(v) | Self::Origin(v) => v.truncate(count),
            Self::Ushort(v) => v.truncate(count),
            Self::Unorm(v) => v.truncate(count),
            Self::Ulong(v) => v.truncate(count),
            Self::Ident(v) | Self::Ascii(v) | Self::Units(v) => v.truncate(count),
            Self::Dtime(v) => v.truncate(count),
            Self::Obname(v) => v.truncate(count),
            Self::Objref(v) => v.truncate(count),
            Self::Attref(v) => v.truncate(count),
            Self::Status(v) => v.truncate(count)
        }
    }
    /// a vector of `count` default elements of the given code
    pub fn defaulted(reprc: Reprc,count: usize) -> Self {
        match reprc {
            Reprc::Fshort => Self::Fshort(vec![0.0;count]),
            Reprc::Fsingl => Self::Fsingl(vec![0.0;count]),
            Reprc::Fsing1 => Self::Fsing1(vec![(0.0,0.0);count]),
            Reprc::Fsing2 => Self::Fsing2(vec![(0.0,0.0,0.0);count]),
            Reprc::Isingl => Self::Isingl(vec![0.0;count]),
            Reprc::Vsingl => Self::Vsingl(vec![0.0;count]),
            Reprc::Fdoubl => Self::Fdoubl(vec![0.0;count]),
            Reprc::Fdoub1 => Self::Fdoub1(vec![(0.0,0.0);count]),
            Reprc::Fdoub2 => Self::Fdoub2(vec![(0.0,0.0,0.0);count]),
            Reprc::Csingl => Self::Csingl(vec![(0.0,0.0);count]),
            Reprc::Cdoubl => Self::Cdoubl(vec![(0.0,0.0);count]),
            Reprc::Sshort => Self::Sshort(vec![0;count]),
            Reprc::Snorm => Self::Snorm(vec![0;count]),
            Reprc::Slong => Self::Slong(vec![0;count]),
            Reprc::Ushort => Self::Ushort(vec![0;count]),
            Reprc::Unorm => Self::Unorm(vec![0;count]),
            Reprc::Ulong => Self::Ulong(vec![0;count]),
            Reprc::Uvari => Self::Uvari(vec![0;count]),
            Reprc::Ident => Self::Ident(vec![String::new();count]),
            Reprc::Ascii => Self::Ascii(vec![String::new();count]),
            Reprc::Dtime => Self::Dtime(vec![Dtime::default();count]),
            Reprc::Origin => Self::Origin(vec![0;count]),
            Reprc::Obname => Self::Obname(vec![Obname::default();count]),
            Reprc::Objref => Self::Objref(vec![Objref::default();count]),
            Reprc::Attref => Self::Attref(vec![Attref::default();count]),
            Reprc::Status => Self::Status(vec![false;count]),
            Reprc::Units => Self::Units(vec![String::new();count])
        }
    }
}

/// Decode `count` elements of the given code into a typed vector.
pub fn extract_elements(cur: &mut Cursor,count: i32,reprc: Option<Reprc>) -> Result<ValueVector,Error> {
    if count == 0 {
        return Ok(ValueVector::Absent);
    }
    let n = count as usize;
    let reprc = match reprc {
        Some(r) => r,
        None => return Err(Error::UnexpectedValue)
    };
    fn gather<T,F: FnMut(&mut Cursor) -> Result<T,crate::cursor::ShortRead>>
        (cur: &mut Cursor,n: usize,mut f: F) -> Result<Vec<T>,Error> {
        let mut ans = Vec::with_capacity(n);
        for _i in 0..n {
            ans.push(f(cur)?);
        }
        Ok(ans)
    }
    match reprc {
        Reprc::Fshort => Ok(ValueVector::Fshort(gather(cur,n,types::fshort)?)),
        Reprc::Fsingl => Ok(ValueVector::Fsingl(gather(cur,n,types::fsingl)?)),
        Reprc::Fsing1 => Ok(ValueVector::Fsing1(gather(cur,n,types::fsing1)?)),
        Reprc::Fsing2 => Ok(ValueVector::Fsing2(gather(cur,n,types::fsing2)?)),
        Reprc::Isingl => Ok(ValueVector::Isingl(gather(cur,n,types::isingl)?)),
        Reprc::Vsingl => Ok(ValueVector::Vsingl(gather(cur,n,types::vsingl)?)),
        Reprc::Fdoubl => Ok(ValueVector::Fdoubl(gather(cur,n,types::fdoubl)?)),
        Reprc::Fdoub1 => Ok(ValueVector::Fdoub1(gather(cur,n,types::fdoub1)?)),
        Reprc::Fdoub2 => Ok(ValueVector::Fdoub2(gather(cur,n,types::fdoub2)?)),
        Reprc::Csingl => Ok(ValueVector::Csingl(gather(cur,n,types::csingl)?)),
        Reprc::Cdoubl => Ok(ValueVector::Cdoubl(gather(cur,n,types::cdoubl)?)),
        Reprc::Sshort => Ok(ValueVector::Sshort(gather(cur,n,types::sshort)?)),
        Reprc::Snorm => Ok(ValueVector::Snorm(gather(cur,n,types::snorm)?)),
        Reprc::Slong => Ok(ValueVector::Slong(gather(cur,n,types::slong)?)),
        Reprc::Ushort => Ok(ValueVector::Ushort(gather(cur,n,types::ushort)?)),
        Reprc::Unorm => Ok(ValueVector::Unorm(gather(cur,n,types::unorm)?)),
        Reprc::Ulong => Ok(ValueVector::Ulong(gather(cur,n,types::ulong)?)),
        Reprc::Uvari => Ok(ValueVector::Uvari(gather(cur,n,types::uvari)?)),
        Reprc::Ident => Ok(ValueVector::Ident(gather(cur,n,types::ident)?)),
        Reprc::Ascii => Ok(ValueVector::Ascii(gather(cur,n,types::ascii)?)),
        Reprc::Dtime => Ok(ValueVector::Dtime(gather(cur,n,types::dtime)?)),
        Reprc::Origin => Ok(ValueVector::Origin(gather(cur,n,types::origin)?)),
        Reprc::Obname => Ok(ValueVector::Obname(gather(cur,n,types::obname)?)),
        Reprc::Objref => Ok(ValueVector::Objref(gather(cur,n,types::objref)?)),
        Reprc::Attref => Ok(ValueVector::Attref(gather(cur,n,types::attref)?)),
        Reprc::Status => Ok(ValueVector::Status(gather(cur,n,types::status)?)),
        Reprc::Units => Ok(ValueVector::Units(gather(cur,n,types::units)?))
    }
}

/// One attribute of an object, or one template default.
#[derive(Debug,Clone)]
pub struct ObjectAttribute {
    pub label: String,
    pub count: i32,
    /// None when the file declared a code outside 1..=27
    pub reprc: Option<Reprc>,
    pub units: String,
    pub value: ValueVector,
    pub invariant: bool,
    pub log: Vec<Diagnostic>
}

impl Default for ObjectAttribute {
    fn default() -> Self {
        Self {
            label: String::new(),
            count: 1,
            reprc: Some(Reprc::Ident),
            units: String::new(),
            value: ValueVector::Absent,
            invariant: false,
            log: Vec::new()
        }
    }
}

/// invariance is metadata, not part of attribute identity
impl PartialEq for ObjectAttribute {
    fn eq(&self,other: &Self) -> bool {
        self.label == other.label
            && self.count == other.count
            && self.reprc == other.reprc
            && self.units == other.units
            && self.value == other.value
    }
}

/// The object set template: an ordered run of attribute defaults.
pub type ObjectTemplate = Vec<ObjectAttribute>;

/// One parsed object.  Attributes are keyed by label with insertion order
/// preserved.
#[derive(Debug,Clone,Default)]
pub struct BasicObject {
    pub name: Obname,
    pub rtype: String,
    pub attributes: Vec<ObjectAttribute>,
    pub log: Vec<Diagnostic>
}

impl BasicObject {
    /// insert-or-update by label; the first occurrence is the key
    pub fn set(&mut self,attr: ObjectAttribute) {
        match self.attributes.iter_mut().find(|x| x.label == attr.label) {
            Some(existing) => *existing = attr,
            None => self.attributes.push(attr)
        }
    }
    /// remove every attribute with this label
    pub fn remove(&mut self,label: &str) {
        self.attributes.retain(|x| x.label != label);
    }
    pub fn len(&self) -> usize {
        self.attributes.len()
    }
    pub fn at(&self,label: &str) -> Option<&ObjectAttribute> {
        self.attributes.iter().find(|x| x.label == label)
    }
}

impl PartialEq for BasicObject {
    fn eq(&self,other: &Self) -> bool {
        self.name == other.name && self.attributes == other.attributes
    }
}

struct AttribFlags {
    label: bool,
    count: bool,
    reprc: bool,
    units: bool,
    value: bool,
    object: bool,
    absent: bool,
    invariant: bool
}

fn parse_attribute_descriptor(desc: u8) -> Result<AttribFlags,Error> {
    let role = Role::from_descriptor(desc);
    let mut flags = AttribFlags {
        label: false, count: false, reprc: false, units: false, value: false,
        object: false, absent: false, invariant: false
    };
    match role {
        Role::Absatr => {
            flags.absent = true;
            return Ok(flags);
        },
        Role::Object => {
            flags.object = true;
            return Ok(flags);
        },
        Role::Invatr => flags.invariant = true,
        Role::Attrib => {},
        _ => {
            error!("expected ATTRIB, INVATR, ABSATR or OBJECT, was {} ({:08b})",role.name(),desc);
            return Err(Error::UnexpectedValue);
        }
    }
    flags.label = desc & (1 << 4) != 0;
    flags.count = desc & (1 << 3) != 0;
    flags.reprc = desc & (1 << 2) != 0;
    flags.units = desc & (1 << 1) != 0;
    flags.value = desc & (1 << 0) != 0;
    Ok(flags)
}

/// read the representation code byte; an unknown code logs MINOR on the
/// attribute and leaves the code undefined
fn repcode(cur: &mut Cursor,attr: &mut ObjectAttribute) -> Result<(),Error> {
    let x = types::ushort(cur)?;
    attr.reprc = Reprc::from_byte(x);
    if attr.reprc.is_none() {
        attr.log.push(Diagnostic::new(Severity::Minor,
            &format!("invalid representation code {}",x),
            "Appendix B: Representation Codes",
            "continue, postpone dealing with this until later"));
    }
    Ok(())
}

/// Expand a defaulted value to the attribute's count when the object did not
/// supply one of its own.
fn patch_missing_value(attr: &mut ObjectAttribute) {
    let count = attr.count as usize;

    if let Some(size) = attr.value.len() {
        if size == count {
            return;
        }
        if size > count {
            attr.value.truncate(count);
            attr.log.push(Diagnostic::new(Severity::Major,
                &format!("template value is not overridden by object attribute, but count is. count ({}) < template count ({})",count,size),
                "3.2.2.1 Component Descriptor: The number of Elements that make up the Value is specified by the Count Characteristic.",
                "shrank template value to new attribute count"));
            return;
        }
        attr.log.push(Diagnostic::new(Severity::Major,
            &format!("template value is not overridden by object attribute, but count is. count ({}) > template count ({})",count,size),
            "3.2.2.1 Component Descriptor: The number of Elements that make up the Value is specified by the Count Characteristic.",
            "value is left as in template"));
        return;
    }

    // no default at all, so build one from whatever code is declared
    match attr.reprc {
        Some(reprc) => attr.value = ValueVector::defaulted(reprc,count),
        None => {
            attr.log.push(Diagnostic::new(Severity::Critical,
                "invalid representation code and no value to default from",
                "Appendix B: Representation Codes",
                "attribute value is left absent, continue"));
        }
    }
}

fn defaulted_object(tmpl: &ObjectTemplate) -> BasicObject {
    let mut def = BasicObject::default();
    for attr in tmpl {
        def.set(attr.clone());
    }
    def
}

/// A set of objects cut from one template, with role SET, REDUNDANT-SET or
/// REPLACEMENT-SET.
///
/// The raw record stays on the set and is parsed on the first call to
/// `objects`.  A second parse is a no-op even if the first one logged errors.
pub struct ObjectSet {
    pub role: Role,
    pub rtype: String,
    pub name: String,
    pub log: Vec<Diagnostic>,
    record: Record,
    body_offset: usize,
    tmpl: ObjectTemplate,
    objs: Vec<BasicObject>,
    parsed: bool
}

struct SetInfo {
    role: Role,
    rtype: String,
    name: String,
    offset: usize,
    log: Vec<Diagnostic>
}

fn parse_set_component(data: &[u8]) -> Result<SetInfo,Error> {
    if data.len() == 0 {
        error!("eflr must be non-empty");
        return Err(Error::Truncated);
    }
    let desc = data[0];
    let role = Role::from_descriptor(desc);
    let mut log = Vec::new();
    match role {
        Role::Set => {},
        Role::Rdset => {
            log.push(Diagnostic::new(Severity::Minor,
                "redundant sets are not supported",
                "3.2.2.2 Component Usage: A Redundant Set is an identical copy of some Set written previously in the same Logical File",
                "redundant set is treated as a normal set, which might lead to issues with duplicated objects"));
        },
        Role::Rset => {
            log.push(Diagnostic::new(Severity::Major,
                "replacement sets are not supported",
                "3.2.2.2 Component Usage: Attributes of the Replacement Set reflect all updates that may have been applied since the original Set was written",
                "replacement set is treated as a normal set, which might lead to issues with duplicated objects and invalid information"));
        },
        _ => {
            error!("expected SET, RSET or RDSET, was {} ({:08b})",role.name(),desc);
            return Err(Error::UnexpectedValue);
        }
    }
    let has_type = desc & (1 << 4) != 0;
    let has_name = desc & (1 << 3) != 0;
    if !has_type {
        log.push(Diagnostic::new(Severity::Major,
            "SET:type not set",
            "3.2.2.1 Component Descriptor: A Set's Type Characteristic must be non-null and must always be explicitly present in the Set Component",
            "assumed set descriptor corrupted, attempt to read type anyway"));
    }
    let mut cur = Cursor::new(&data[DESCRIPTOR_SIZE..]);
    if cur.is_empty() {
        error!("unexpected end-of-record after SET descriptor");
        return Err(Error::Truncated);
    }
    let rtype = types::ident(&mut cur)?;
    let name = match has_name {
        true => types::ident(&mut cur)?,
        false => String::new()
    };
    Ok(SetInfo { role, rtype, name, offset: DESCRIPTOR_SIZE + cur.offset(), log })
}

fn parse_template(cur: &mut Cursor,log: &mut Vec<Diagnostic>) -> Result<ObjectTemplate,Error> {
    let mut tmpl = ObjectTemplate::new();
    loop {
        if cur.is_empty() {
            error!("unexpected end-of-record in template");
            return Err(Error::Truncated);
        }
        let flags = parse_attribute_descriptor(cur.peek()?)?;
        if flags.object {
            return Ok(tmpl);
        }
        cur.skip(DESCRIPTOR_SIZE)?;

        if flags.absent {
            log.push(Diagnostic::new(Severity::Major,
                "absent attribute in object set template",
                "3.2.2.2 Component Usage: A Template consists of a collection of Attribute Components and/or Invariant Attribute Components, mixed in any fashion.",
                "attribute not included in template"));
            continue;
        }

        let mut attr = ObjectAttribute::default();
        if !flags.label {
            log.push(Diagnostic::new(Severity::Major,
                "label not set in template",
                "3.2.2.2 Component Usage: All Components in the Template must have distinct, non-null Labels.",
                "assumed attribute descriptor corrupted, attempt to read label anyway"));
        }
        attr.label = types::ident(cur)?;
        if flags.count {
            attr.count = types::uvari(cur)?;
        }
        if flags.reprc {
            repcode(cur,&mut attr)?;
        }
        if flags.units {
            attr.units = types::units(cur)?;
        }
        if flags.value {
            attr.value = extract_elements(cur,attr.count,attr.reprc)?;
        }
        attr.invariant = flags.invariant;
        tmpl.push(attr);

        if cur.is_empty() {
            log.push(Diagnostic::new(Severity::Info,
                "set contains no objects",
                "3.2.2.2 Component Usage: A Set consists of one or more Objects",
                "leave the set empty and return"));
            return Ok(tmpl);
        }
    }
}

fn parse_objects(cur: &mut Cursor,tmpl: &ObjectTemplate,rtype: &str) -> Result<Vec<BasicObject>,Error> {
    let mut objs = Vec::new();
    let default_object = defaulted_object(tmpl);

    while !cur.is_empty() {
        let desc = cur.peek()?;
        let role = Role::from_descriptor(desc);
        if role != Role::Object {
            error!("expected OBJECT, was {} ({:08b})",role.name(),desc);
            return Err(Error::UnexpectedValue);
        }
        let has_name = desc & (1 << 4) != 0;
        cur.skip(DESCRIPTOR_SIZE)?;

        let mut current = default_object.clone();
        current.rtype = rtype.to_string();
        let mut object_clear = true;

        if !has_name {
            current.log.push(Diagnostic::new(Severity::Major,
                "OBJECT:name was not set",
                "3.2.2.1 Component Descriptor: That is, every Object has a non-null Name",
                "assumed object descriptor corrupted, attempt to read name anyway"));
        }
        current.name = types::obname(cur)?;

        for template_attr in tmpl {
            if template_attr.invariant {
                continue;
            }
            if cur.is_empty() {
                break;
            }
            let flags = parse_attribute_descriptor(cur.peek()?)?;
            if flags.object {
                break;
            }
            // only consume once this is surely not the next object
            cur.skip(DESCRIPTOR_SIZE)?;

            let mut attr = template_attr.clone();
            // absent means no meaning, so unset whatever is there
            if flags.absent {
                current.remove(&attr.label);
                continue;
            }

            if flags.invariant {
                attr.log.push(Diagnostic::new(Severity::Major,
                    "invariant attribute in object attributes",
                    "3.2.2.2 Component Usage: Invariant Attribute Components, which may only appear in the Template [...]",
                    "ignored invariant bit, assumed that attribute followed"));
            }
            if flags.label {
                attr.log.push(Diagnostic::new(Severity::Major,
                    "label bit set in object attribute",
                    "3.2.2.2 Component Usage: Attribute Components that follow Object Components must not have Attribute Labels",
                    "ignored label bit, assumed that label never followed"));
            }

            if flags.count {
                attr.count = types::uvari(cur)?;
            }
            if flags.reprc {
                repcode(cur,&mut attr)?;
            }
            if flags.units {
                attr.units = types::units(cur)?;
            }
            if flags.value {
                attr.value = extract_elements(cur,attr.count,attr.reprc)?;
            }

            if attr.count == 0 {
                // a zero count explicitly undefines the value, default or not
                attr.value = ValueVector::Absent;
            } else if !flags.value {
                if flags.reprc && attr.reprc != template_attr.reprc {
                    attr.log.push(Diagnostic::new(Severity::Major,
                        &format!("count ({}) isn't 0 and representation code changed, but value is not explicitly set",attr.count),
                        "",
                        "value defaulted based on representation code from attribute"));
                    attr.value = ValueVector::Absent;
                }
                patch_missing_value(&mut attr);
            }

            object_clear = object_clear && is_log_clear(&attr.log);
            current.set(attr);
        }

        if !object_clear {
            current.log.push(Diagnostic::new(Severity::Minor,
                "one or more attributes of this object violate specification. This can potentially corrupt the entire object",
                "",""));
        }
        objs.push(current);
    }
    Ok(objs)
}

impl ObjectSet {
    /// Parse the leading SET component so the set is queryable by type and
    /// name; the rest of the record is kept raw until first use.  Encrypted
    /// records cannot be parsed without being decrypted first.
    pub fn new(record: Record) -> Result<Self,Error> {
        if record.is_encrypted() {
            return Err(Error::NotImplemented);
        }
        let info = parse_set_component(&record.data)?;
        Ok(Self {
            role: info.role,
            rtype: info.rtype,
            name: info.name,
            log: info.log,
            record,
            body_offset: info.offset,
            tmpl: ObjectTemplate::new(),
            objs: Vec::new(),
            parsed: false
        })
    }

    /// Parse if not already parsed.  Errors are captured into the set's log;
    /// objects parsed before the failure remain queryable.  Idempotent even
    /// when the first parse logged errors.
    fn parse(&mut self) {
        if self.parsed {
            return;
        }
        self.parsed = true;
        let data = std::mem::take(&mut self.record.data);
        let result = self.parse_body(&data);
        self.record.data = data;
        if let Err(e) = result {
            self.log.push(Diagnostic::new(Severity::Critical,
                &e.to_string(),"","object set parse has been interrupted"));
        }
    }

    fn parse_body(&mut self,data: &[u8]) -> Result<(),Error> {
        let mut cur = Cursor::new(&data[self.body_offset..]);
        self.tmpl = parse_template(&mut cur,&mut self.log)?;
        self.objs = parse_objects(&mut cur,&self.tmpl,&self.rtype)?;
        Ok(())
    }

    pub fn objects(&mut self) -> &[BasicObject] {
        self.parse();
        &self.objs
    }

    pub fn template(&mut self) -> &[ObjectAttribute] {
        self.parse();
        &self.tmpl
    }

    pub fn len(&mut self) -> usize {
        self.parse();
        self.objs.len()
    }
}
