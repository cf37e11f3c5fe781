/*!
The stream handle: configuration, filters, and record iteration.

All stream semantics (opening data sources, filter evaluation, sorting,
retry) live inside libbgpstream; this module owns the `bgpstream_t` handle
and maps the C call conventions onto `Result` values.
*/
use std::collections::VecDeque;
use std::ffi::CString;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime};
use log::debug;

use crate::elem::OwnedBgpElem;
use crate::error::BgpStreamError;
use crate::record::BgpRecord;
use crate::sys;
use crate::sys::Api;

/// An owned libbgpstream instance.
///
/// Records are pulled one at a time with [`next_record`](BgpStream::next_record);
/// the returned [`BgpRecord`] keeps the stream exclusively borrowed, because
/// the library reuses the record storage on the next pull and the elem
/// cursor must not be advanced from two places at once.
///
/// Holds a raw pointer, so the type is neither `Send` nor `Sync`.
pub struct BgpStream {
    api: Api,
    raw: *mut sys::bgpstream_t,
    started: bool,
}

impl BgpStream {
    /// Create a stream, loading libbgpstream from `LIBBGPSTREAM_PATH` if
    /// set, otherwise from the platform's default sonames.
    pub fn new() -> Result<BgpStream, BgpStreamError> {
        Self::from_api(Api::load()?)
    }

    /// Create a stream backed by the shared object at `path`.
    pub fn with_library<P: AsRef<Path>>(path: P) -> Result<BgpStream, BgpStreamError> {
        Self::from_api(Api::load_from(path.as_ref())?)
    }

    pub(crate) fn from_api(api: Api) -> Result<BgpStream, BgpStreamError> {
        let raw = unsafe { (api.create)() };
        if raw.is_null() {
            return Err(BgpStreamError::Allocation("stream"));
        }
        debug!("created bgpstream instance");
        Ok(BgpStream {
            api,
            raw,
            started: false,
        })
    }

    /// Add a string-keyed filter. Accepted filter types are `project`,
    /// `collector`, `router`, `record-type`, `elem-type`, `peer-asn`,
    /// `origin-asn`, `prefix`, `prefix-any`, `prefix-more`, `prefix-less`,
    /// `prefix-exact`, `community`, `aspath`, and `ipversion`.
    ///
    /// Unknown filter types fail without touching the C library.
    pub fn add_filter(&mut self, filter_type: &str, value: &str) -> Result<(), BgpStreamError> {
        let ft = filter_type_by_name(filter_type)?;
        let cvalue = CString::new(value)?;
        let ret = unsafe { (self.api.add_filter)(self.raw, ft, cvalue.as_ptr()) };
        if ret == 0 {
            return Err(BgpStreamError::FilterRejected(format!(
                "{filter_type}={value}"
            )));
        }
        Ok(())
    }

    /// Restrict the stream to records with timestamps in
    /// `[from_time, until_time]` (epoch seconds, `0` meaning unbounded).
    pub fn add_interval_filter(
        &mut self,
        from_time: u32,
        until_time: u32,
    ) -> Result<(), BgpStreamError> {
        let ret = unsafe { (self.api.add_interval_filter)(self.raw, from_time, until_time) };
        if ret == 0 {
            return Err(BgpStreamError::FilterRejected(format!(
                "interval {from_time}..{until_time}"
            )));
        }
        Ok(())
    }

    /// Like [`add_interval_filter`](BgpStream::add_interval_filter) but
    /// accepting the time forms of [`parse_time_str`].
    pub fn add_interval_filter_str(
        &mut self,
        from_time: &str,
        until_time: &str,
    ) -> Result<(), BgpStreamError> {
        let from = parse_time_str(from_time)?;
        let until = parse_time_str(until_time)?;
        self.add_interval_filter(from, until)
    }

    /// Keep only one RIB dump per `period` seconds per collector.
    pub fn add_rib_period_filter(&mut self, period: u32) -> Result<(), BgpStreamError> {
        let ret = unsafe { (self.api.add_rib_period_filter)(self.raw, period) };
        if ret == 0 {
            return Err(BgpStreamError::FilterRejected(format!(
                "rib-period {period}"
            )));
        }
        Ok(())
    }

    /// Hand a full filter expression (the `filter` language of the
    /// library, e.g. `"collector rrc00 and type updates"`) to libbgpstream.
    pub fn parse_filter_string(&mut self, filter: &str) -> Result<(), BgpStreamError> {
        let cfilter = CString::new(filter)?;
        let ret = unsafe { (self.api.parse_filter_string)(self.raw, cfilter.as_ptr()) };
        if ret == 0 {
            return Err(BgpStreamError::InvalidFilterString(filter.to_string()));
        }
        Ok(())
    }

    /// Select the data interface (e.g. `"broker"`, `"singlefile"`,
    /// `"kafka"`) records are acquired from.
    pub fn set_data_interface(&mut self, name: &str) -> Result<(), BgpStreamError> {
        let cname = CString::new(name)?;
        let id = unsafe { (self.api.get_data_interface_id_by_name)(self.raw, cname.as_ptr()) };
        if id == 0 {
            return Err(BgpStreamError::UnknownDataInterface(name.to_string()));
        }
        unsafe { (self.api.set_data_interface)(self.raw, id) };
        Ok(())
    }

    /// Set one option of a data interface, e.g.
    /// `set_data_interface_option("singlefile", "rib-file", "./rib.mrt")`.
    pub fn set_data_interface_option(
        &mut self,
        interface: &str,
        option: &str,
        value: &str,
    ) -> Result<(), BgpStreamError> {
        let cinterface = CString::new(interface)?;
        let id = unsafe { (self.api.get_data_interface_id_by_name)(self.raw, cinterface.as_ptr()) };
        if id == 0 {
            return Err(BgpStreamError::UnknownDataInterface(interface.to_string()));
        }
        let coption = CString::new(option)?;
        let opt =
            unsafe { (self.api.get_data_interface_option_by_name)(self.raw, id, coption.as_ptr()) };
        if opt.is_null() {
            return Err(BgpStreamError::UnknownDataInterfaceOption {
                interface: interface.to_string(),
                option: option.to_string(),
            });
        }
        let cvalue = CString::new(value)?;
        let ret = unsafe { (self.api.set_data_interface_option)(self.raw, opt, cvalue.as_ptr()) };
        if ret != 0 {
            return Err(BgpStreamError::DataInterfaceOptionRejected {
                interface: interface.to_string(),
                option: option.to_string(),
            });
        }
        Ok(())
    }

    /// Start the stream. Filters and data-interface options must be in
    /// place before starting. Calling `start` again on a started stream is
    /// a no-op.
    pub fn start(&mut self) -> Result<(), BgpStreamError> {
        if self.started {
            return Ok(());
        }
        let ret = unsafe { (self.api.start)(self.raw) };
        if ret < 0 {
            return Err(BgpStreamError::Start);
        }
        debug!("stream started");
        self.started = true;
        Ok(())
    }

    /// Pull the next record. Starts the stream first if the caller never
    /// did.
    ///
    /// Returns `Ok(None)` when the stream is exhausted. The record borrows
    /// the stream mutably: it must be dropped before the next pull, since
    /// the library reuses the underlying storage.
    pub fn next_record(&mut self) -> Result<Option<BgpRecord<'_>>, BgpStreamError> {
        self.start()?;
        let mut record: *mut sys::bgpstream_record_t = std::ptr::null_mut();
        let ret = unsafe { (self.api.get_next_record)(self.raw, &mut record) };
        if ret < 0 {
            return Err(BgpStreamError::NextRecord);
        }
        if ret == 0 {
            return Ok(None);
        }
        if record.is_null() {
            return Err(BgpStreamError::NullPointer("record"));
        }
        Ok(Some(BgpRecord::new(self.api.clone(), record)))
    }

    /// Flattening iterator over the elems of every remaining record.
    ///
    /// Each elem is deep-copied out of its record, so the yielded
    /// [`OwnedBgpElem`]s carry no lifetime tie to the stream. The iterator
    /// fuses after the first error.
    pub fn elems(&mut self) -> StreamElemIter<'_> {
        StreamElemIter {
            stream: self,
            cache: VecDeque::new(),
            done: false,
        }
    }
}

impl Drop for BgpStream {
    fn drop(&mut self) {
        unsafe { (self.api.destroy)(self.raw) };
    }
}

/// Iterator yielded by [`BgpStream::elems`].
pub struct StreamElemIter<'a> {
    stream: &'a mut BgpStream,
    cache: VecDeque<OwnedBgpElem>,
    done: bool,
}

impl Iterator for StreamElemIter<'_> {
    type Item = Result<OwnedBgpElem, BgpStreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(elem) = self.cache.pop_front() {
                return Some(Ok(elem));
            }
            if self.done {
                return None;
            }
            let record = match self.stream.next_record() {
                Ok(Some(record)) => record,
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            for elem in record.elems() {
                let owned = elem.and_then(|e| e.to_owned());
                match owned {
                    Ok(owned) => self.cache.push_back(owned),
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                }
            }
        }
    }
}

fn filter_type_by_name(name: &str) -> Result<sys::bgpstream_filter_type_t, BgpStreamError> {
    let ft = match name {
        "project" => sys::BGPSTREAM_FILTER_TYPE_PROJECT,
        "collector" => sys::BGPSTREAM_FILTER_TYPE_COLLECTOR,
        "router" => sys::BGPSTREAM_FILTER_TYPE_ROUTER,
        "record-type" => sys::BGPSTREAM_FILTER_TYPE_RECORD_TYPE,
        "elem-type" => sys::BGPSTREAM_FILTER_TYPE_ELEM_TYPE,
        "peer-asn" => sys::BGPSTREAM_FILTER_TYPE_ELEM_PEER_ASN,
        "origin-asn" => sys::BGPSTREAM_FILTER_TYPE_ELEM_ORIGIN_ASN,
        "prefix" => sys::BGPSTREAM_FILTER_TYPE_ELEM_PREFIX,
        "prefix-any" => sys::BGPSTREAM_FILTER_TYPE_ELEM_PREFIX_ANY,
        "prefix-more" => sys::BGPSTREAM_FILTER_TYPE_ELEM_PREFIX_MORE,
        "prefix-less" => sys::BGPSTREAM_FILTER_TYPE_ELEM_PREFIX_LESS,
        "prefix-exact" => sys::BGPSTREAM_FILTER_TYPE_ELEM_PREFIX_EXACT,
        "community" => sys::BGPSTREAM_FILTER_TYPE_ELEM_COMMUNITY,
        "aspath" => sys::BGPSTREAM_FILTER_TYPE_ELEM_ASPATH,
        "ipversion" => sys::BGPSTREAM_FILTER_TYPE_ELEM_IP_VERSION,
        _ => return Err(BgpStreamError::UnknownFilterType(name.to_string())),
    };
    Ok(ft)
}

/// Parse a time string into epoch seconds. Accepts a bare epoch value, an
/// RFC 3339 timestamp, or `"%Y-%m-%d %H:%M:%S"` (optionally suffixed with
/// ` UTC`); naive forms are read as UTC.
pub fn parse_time_str(time: &str) -> Result<u32, BgpStreamError> {
    let trimmed = time.trim();
    if let Ok(epoch) = trimmed.parse::<u32>() {
        return Ok(epoch);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return epoch_from_i64(dt.timestamp(), time);
    }
    let naive = trimmed.strip_suffix(" UTC").unwrap_or(trimmed);
    if let Ok(dt) = NaiveDateTime::parse_from_str(naive, "%Y-%m-%d %H:%M:%S") {
        return epoch_from_i64(dt.and_utc().timestamp(), time);
    }
    Err(BgpStreamError::InvalidTimeString(time.to_string()))
}

fn epoch_from_i64(epoch: i64, original: &str) -> Result<u32, BgpStreamError> {
    u32::try_from(epoch).map_err(|_| BgpStreamError::InvalidTimeString(original.to_string()))
}
