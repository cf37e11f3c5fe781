/*!
Record view over one unit of stream output.

A record corresponds to one dump entry or update message, together with
source metadata (project, collector, router) and a status. The elems it
carries are pulled one at a time with [`BgpRecord::next_elem`]; the elem
cursor lives inside libbgpstream, keyed off the record handle.
*/
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;

use num_enum::{FromPrimitive, IntoPrimitive};

use crate::elem::BgpElem;
use crate::error::BgpStreamError;
use crate::sys;
use crate::sys::Api;
use crate::util;
use crate::util::OptionToStr;

/// Whether the record came from a RIB dump or an update file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u32)]
pub enum RecordType {
    Rib = sys::BGPSTREAM_RIB,
    Update = sys::BGPSTREAM_UPDATE,
    #[num_enum(default)]
    Unknown = 2,
}

impl RecordType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RecordType::Rib => "rib",
            RecordType::Update => "update",
            RecordType::Unknown => "unknown",
        }
    }
}

impl Display for RecordType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome the stream engine attached to the record.
///
/// Anything other than [`Valid`](RecordStatus::Valid) means the record
/// carries no usable elems; the source-level statuses describe what went
/// wrong while acquiring the dump the record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[repr(u32)]
pub enum RecordStatus {
    Valid = sys::BGPSTREAM_RECORD_STATUS_VALID_RECORD,
    FilteredSource = sys::BGPSTREAM_RECORD_STATUS_FILTERED_SOURCE,
    EmptySource = sys::BGPSTREAM_RECORD_STATUS_EMPTY_SOURCE,
    CorruptedSource = sys::BGPSTREAM_RECORD_STATUS_CORRUPTED_SOURCE,
    CorruptedRecord = sys::BGPSTREAM_RECORD_STATUS_CORRUPTED_RECORD,
    #[num_enum(default)]
    Unknown = 5,
}

impl RecordStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Valid => "valid",
            RecordStatus::FilteredSource => "filtered-source",
            RecordStatus::EmptySource => "empty-source",
            RecordStatus::CorruptedSource => "corrupted-source",
            RecordStatus::CorruptedRecord => "corrupted-record",
            RecordStatus::Unknown => "unknown",
        }
    }
}

impl Display for RecordStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Position of the record within the dump it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u32)]
pub enum DumpPosition {
    Start = sys::BGPSTREAM_DUMP_START,
    Middle = sys::BGPSTREAM_DUMP_MIDDLE,
    End = sys::BGPSTREAM_DUMP_END,
    #[num_enum(default)]
    Unknown = 3,
}

impl DumpPosition {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DumpPosition::Start => "start",
            DumpPosition::Middle => "middle",
            DumpPosition::End => "end",
            DumpPosition::Unknown => "unknown",
        }
    }
}

impl Display for DumpPosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A borrowed view over the record most recently pulled from a
/// [`BgpStream`](crate::BgpStream).
///
/// The record storage is owned and reused by the stream; the `'s` lifetime
/// keeps the stream exclusively borrowed while the view is alive, so the
/// next pull cannot invalidate it underneath the caller.
///
/// Holds a raw pointer, so the type is neither `Send` nor `Sync`.
pub struct BgpRecord<'s> {
    api: Api,
    raw: *mut sys::bgpstream_record_t,
    _stream: PhantomData<&'s ()>,
}

impl<'s> BgpRecord<'s> {
    pub(crate) fn new(api: Api, raw: *mut sys::bgpstream_record_t) -> BgpRecord<'s> {
        BgpRecord {
            api,
            raw,
            _stream: PhantomData,
        }
    }

    fn raw(&self) -> &sys::bgpstream_record_t {
        // SAFETY: the pointer stays valid while the stream borrow held
        // through `'s` is alive.
        unsafe { &*self.raw }
    }

    /// Project name, `None` when the stream did not set one.
    pub fn project(&self) -> Option<String> {
        util::name_to_option(&self.raw().project_name)
    }

    /// Collector name, `None` when the stream did not set one.
    pub fn collector(&self) -> Option<String> {
        util::name_to_option(&self.raw().collector_name)
    }

    /// Router name, `None` when the stream did not set one.
    pub fn router(&self) -> Option<String> {
        util::name_to_option(&self.raw().router_name)
    }

    /// Presentation form of the router IP. `Ok(None)` when no address
    /// version is set, which is a normal state for most data sources.
    pub fn router_ip(&self) -> Result<Option<String>, BgpStreamError> {
        let raw = self.raw();
        if raw.router_ip.version == sys::BGPSTREAM_ADDR_VERSION_UNKNOWN {
            return Ok(None);
        }
        util::addr_to_string(&self.api, &raw.router_ip, "router IP").map(Some)
    }

    pub fn record_type(&self) -> RecordType {
        RecordType::from(self.raw().type_)
    }

    pub fn status(&self) -> RecordStatus {
        RecordStatus::from(self.raw().status)
    }

    pub fn dump_position(&self) -> DumpPosition {
        DumpPosition::from(self.raw().dump_pos)
    }

    /// Timestamp of the dump the record belongs to, in epoch seconds.
    pub fn dump_time(&self) -> u32 {
        self.raw().dump_time_sec
    }

    /// Record timestamp in whole epoch seconds.
    pub fn time_sec(&self) -> u32 {
        self.raw().time_sec
    }

    /// Sub-second part of the record timestamp, in microseconds.
    pub fn time_usec(&self) -> u32 {
        self.raw().time_usec
    }

    /// Record timestamp as floating-point seconds
    /// (`time_sec + time_usec / 1_000_000`).
    ///
    /// The composition is lossy for large timestamps; use
    /// [`time_sec`](BgpRecord::time_sec) and
    /// [`time_usec`](BgpRecord::time_usec) when exact microseconds matter.
    pub fn time(&self) -> f64 {
        let raw = self.raw();
        f64::from(raw.time_sec) + f64::from(raw.time_usec) / 1_000_000.0
    }

    /// Pull the next elem out of the record.
    ///
    /// Returns `Ok(None)` when the record is exhausted; exhaustion is
    /// terminal per record, and further calls keep returning `Ok(None)`.
    /// A negative status from the library surfaces as
    /// [`BgpStreamError::NextElem`].
    pub fn next_elem(&self) -> Result<Option<BgpElem<'_>>, BgpStreamError> {
        let mut elem: *mut sys::bgpstream_elem_t = std::ptr::null_mut();
        let ret = unsafe { (self.api.record_get_next_elem)(self.raw, &mut elem) };
        if ret < 0 {
            return Err(BgpStreamError::NextElem);
        }
        if ret == 0 {
            return Ok(None);
        }
        if elem.is_null() {
            return Err(BgpStreamError::NullPointer("elem"));
        }
        Ok(Some(BgpElem::new(self.api.clone(), elem)))
    }

    /// Iterate over the remaining elems of the record. The iterator fuses
    /// after the first error.
    pub fn elems(&self) -> ElemIter<'_, 's> {
        ElemIter {
            record: self,
            done: false,
        }
    }

    /// Pipe-separated line form:
    /// `type|dump_position|time|project|collector|router|router_ip|status|dump_time`,
    /// absent names rendered empty.
    pub fn to_line(&self) -> Result<String, BgpStreamError> {
        let project = self.project();
        let collector = self.collector();
        let router = self.router();
        let router_ip = self.router_ip()?;
        Ok(format!(
            "{}|{}|{:.6}|{}|{}|{}|{}|{}|{}",
            self.record_type(),
            self.dump_position(),
            self.time(),
            OptionToStr(&project),
            OptionToStr(&collector),
            OptionToStr(&router),
            OptionToStr(&router_ip),
            self.status(),
            self.dump_time(),
        ))
    }
}

/// Iterator over the elems of one record, yielded by
/// [`BgpRecord::elems`].
pub struct ElemIter<'r, 's> {
    record: &'r BgpRecord<'s>,
    done: bool,
}

impl<'r> Iterator for ElemIter<'r, '_> {
    type Item = Result<BgpElem<'r>, BgpStreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.record.next_elem() {
            Ok(Some(elem)) => Some(Ok(elem)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
