/*!
Elem view over one BGP routing event carried inside a record.

An elem is one announcement, withdrawal, RIB entry, or peer-state change.
[`BgpElem`] borrows the elem storage owned by the record that produced it;
[`OwnedBgpElem`] is a deep copy that lives independently of the stream.
*/
use std::collections::BTreeSet;
use std::marker::PhantomData;

use itertools::Itertools;
use libc::c_char;
use num_enum::{FromPrimitive, IntoPrimitive};

use crate::error::BgpStreamError;
use crate::sys;
use crate::sys::Api;
use crate::util;
use crate::util::OptionToStr;

/// AS-path formatting buffer. Assuming 10 characters per ASN this holds
/// paths of more than 400 hops.
const AS_PATH_BUF_LEN: usize = 4096;
const COMMUNITY_BUF_LEN: usize = 128;
const ELEM_TYPE_BUF_LEN: usize = 128;

/// The raw elem type enumerant as reported by libbgpstream.
///
/// Unrecognized enumerants map to [`ElemType::Unknown`]. The human-readable
/// spelling of each type belongs to the C library; see
/// [`BgpElem::type_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u32)]
pub enum ElemType {
    #[num_enum(default)]
    Unknown = sys::BGPSTREAM_ELEM_TYPE_UNKNOWN,
    Rib = sys::BGPSTREAM_ELEM_TYPE_RIB,
    Announcement = sys::BGPSTREAM_ELEM_TYPE_ANNOUNCEMENT,
    Withdrawal = sys::BGPSTREAM_ELEM_TYPE_WITHDRAWAL,
    PeerState = sys::BGPSTREAM_ELEM_TYPE_PEERSTATE,
}

/// Type-dependent fields of an elem.
///
/// Each variant carries exactly the fields defined for its elem type:
///
/// - RIB entries and announcements carry the announced prefix plus the
///   next hop, the AS path, and the community set.
/// - Withdrawals carry only the withdrawn prefix.
/// - Peer-state changes carry the old and new FSM state names.
/// - Elems of an unrecognized type carry nothing.
///
/// The key-presence accessors ([`prefix`](ElemFields::prefix),
/// [`next_hop`](ElemFields::next_hop), ...) return `None` whenever the
/// variant does not define the field.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ElemFields {
    Route {
        prefix: String,
        next_hop: String,
        as_path: String,
        communities: BTreeSet<String>,
    },
    Withdrawal {
        prefix: String,
    },
    PeerState {
        old_state: String,
        new_state: String,
    },
    Empty,
}

impl ElemFields {
    pub fn prefix(&self) -> Option<&str> {
        match self {
            ElemFields::Route { prefix, .. } | ElemFields::Withdrawal { prefix } => Some(prefix),
            _ => None,
        }
    }

    pub fn next_hop(&self) -> Option<&str> {
        match self {
            ElemFields::Route { next_hop, .. } => Some(next_hop),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&str> {
        match self {
            ElemFields::Route { as_path, .. } => Some(as_path),
            _ => None,
        }
    }

    pub fn communities(&self) -> Option<&BTreeSet<String>> {
        match self {
            ElemFields::Route { communities, .. } => Some(communities),
            _ => None,
        }
    }

    pub fn old_state(&self) -> Option<&str> {
        match self {
            ElemFields::PeerState { old_state, .. } => Some(old_state),
            _ => None,
        }
    }

    pub fn new_state(&self) -> Option<&str> {
        match self {
            ElemFields::PeerState { new_state, .. } => Some(new_state),
            _ => None,
        }
    }
}

/// A borrowed view over one elem of a [`BgpRecord`](crate::BgpRecord).
///
/// The elem storage is owned by the record's cursor inside libbgpstream;
/// the `'r` lifetime ties the view to the record borrow that produced it,
/// so an elem can never be read after its record was released or advanced.
/// Call [`to_owned`](BgpElem::to_owned) to keep an elem past its record.
///
/// Holds a raw pointer, so the type is neither `Send` nor `Sync`.
pub struct BgpElem<'r> {
    api: Api,
    raw: *const sys::bgpstream_elem_t,
    fields: Option<ElemFields>,
    _record: PhantomData<&'r ()>,
}

impl<'r> BgpElem<'r> {
    pub(crate) fn new(api: Api, raw: *const sys::bgpstream_elem_t) -> BgpElem<'r> {
        BgpElem {
            api,
            raw,
            fields: None,
            _record: PhantomData,
        }
    }

    fn raw(&self) -> &sys::bgpstream_elem_t {
        // SAFETY: the pointer stays valid while the record borrow held
        // through `'r` is alive.
        unsafe { &*self.raw }
    }

    /// The elem type enumerant.
    pub fn elem_type(&self) -> ElemType {
        ElemType::from(self.raw().type_)
    }

    /// Human-readable elem type, as spelled by the library's formatter
    /// (`"rib"`, `"announcement"`, `"withdrawal"`, `"state"`, `"unknown"`).
    pub fn type_str(&self) -> Result<String, BgpStreamError> {
        let mut buf = [0 as c_char; ELEM_TYPE_BUF_LEN];
        let ret =
            unsafe { (self.api.elem_type_snprintf)(buf.as_mut_ptr(), buf.len(), self.raw().type_) };
        util::ensure_fits(ret, buf.len(), "elem type")?;
        Ok(util::cstr_to_string(&buf))
    }

    /// Presentation form of the peer's IP address.
    pub fn peer_address(&self) -> Result<String, BgpStreamError> {
        util::addr_to_string(&self.api, &self.raw().peer_ip, "peer address")
    }

    /// The peer's AS number.
    pub fn peer_asn(&self) -> u32 {
        self.raw().peer_asn
    }

    /// The type-dependent fields, built by the library's formatters on the
    /// first access and cached for the lifetime of the view.
    ///
    /// Repeated calls return the same cached value; mutations made through
    /// [`fields_mut`](BgpElem::fields_mut) stay visible here. A failed
    /// build caches nothing, so a later call formats again.
    pub fn fields(&mut self) -> Result<&ElemFields, BgpStreamError> {
        let fields = match self.fields.take() {
            Some(fields) => fields,
            None => build_fields(&self.api, self.raw())?,
        };
        Ok(self.fields.insert(fields))
    }

    /// Mutable access to the cached fields, building them first if needed.
    pub fn fields_mut(&mut self) -> Result<&mut ElemFields, BgpStreamError> {
        let fields = match self.fields.take() {
            Some(fields) => fields,
            None => build_fields(&self.api, self.raw())?,
        };
        Ok(self.fields.insert(fields))
    }

    /// Deep-copy the elem out of its record, so it can outlive the record
    /// and the stream.
    pub fn to_owned(&self) -> Result<OwnedBgpElem, BgpStreamError> {
        let copy = unsafe { (self.api.elem_create)() };
        if copy.is_null() {
            return Err(BgpStreamError::Allocation("elem"));
        }
        let ret = unsafe { (self.api.elem_copy)(copy, self.raw) };
        if ret.is_null() {
            unsafe { (self.api.elem_destroy)(copy) };
            return Err(BgpStreamError::Allocation("elem copy"));
        }
        Ok(OwnedBgpElem {
            inner: BgpElem {
                api: self.api.clone(),
                raw: copy,
                fields: self.fields.clone(),
                _record: PhantomData,
            },
        })
    }

    /// Pipe-separated line form:
    /// `type|peer_asn|peer_address|prefix|next_hop|as_path|communities|old_state|new_state`,
    /// absent fields rendered empty.
    pub fn to_line(&mut self) -> Result<String, BgpStreamError> {
        let type_str = self.type_str()?;
        let peer_asn = self.peer_asn();
        let peer_address = self.peer_address()?;
        let fields = self.fields()?;
        let communities = fields.communities().map(|set| set.iter().join(" "));
        let prefix = fields.prefix();
        let next_hop = fields.next_hop();
        let as_path = fields.as_path();
        let old_state = fields.old_state();
        let new_state = fields.new_state();
        Ok(format!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}",
            type_str,
            peer_asn,
            peer_address,
            OptionToStr(&prefix),
            OptionToStr(&next_hop),
            OptionToStr(&as_path),
            OptionToStr(&communities),
            OptionToStr(&old_state),
            OptionToStr(&new_state),
        ))
    }
}

/// An elem deep-copied out of its record via `bgpstream_elem_create` and
/// `bgpstream_elem_copy`. Owns the copy and frees it on drop.
///
/// Exposes the same accessors and fields cache as [`BgpElem`].
pub struct OwnedBgpElem {
    inner: BgpElem<'static>,
}

impl OwnedBgpElem {
    pub fn elem_type(&self) -> ElemType {
        self.inner.elem_type()
    }

    pub fn type_str(&self) -> Result<String, BgpStreamError> {
        self.inner.type_str()
    }

    pub fn peer_address(&self) -> Result<String, BgpStreamError> {
        self.inner.peer_address()
    }

    pub fn peer_asn(&self) -> u32 {
        self.inner.peer_asn()
    }

    pub fn fields(&mut self) -> Result<&ElemFields, BgpStreamError> {
        self.inner.fields()
    }

    pub fn fields_mut(&mut self) -> Result<&mut ElemFields, BgpStreamError> {
        self.inner.fields_mut()
    }

    pub fn to_line(&mut self) -> Result<String, BgpStreamError> {
        self.inner.to_line()
    }
}

impl Drop for OwnedBgpElem {
    fn drop(&mut self) {
        unsafe { (self.inner.api.elem_destroy)(self.inner.raw as *mut sys::bgpstream_elem_t) };
    }
}

fn build_fields(
    api: &Api,
    elem: &sys::bgpstream_elem_t,
) -> Result<ElemFields, BgpStreamError> {
    let fields = match ElemType::from(elem.type_) {
        // route-ish elems carry the announced prefix on top of the path
        // attributes
        ElemType::Rib | ElemType::Announcement => ElemFields::Route {
            prefix: util::pfx_to_string(api, &elem.prefix)?,
            next_hop: util::addr_to_string(api, &elem.nexthop, "next hop")?,
            as_path: as_path_to_string(api, elem.as_path)?,
            communities: communities_to_set(api, elem.communities)?,
        },
        ElemType::Withdrawal => ElemFields::Withdrawal {
            prefix: util::pfx_to_string(api, &elem.prefix)?,
        },
        ElemType::PeerState => ElemFields::PeerState {
            old_state: util::peerstate_to_string(api, elem.old_state, "old state")?,
            new_state: util::peerstate_to_string(api, elem.new_state, "new state")?,
        },
        ElemType::Unknown => ElemFields::Empty,
    };
    Ok(fields)
}

fn as_path_to_string(
    api: &Api,
    path: *mut sys::bgpstream_as_path_t,
) -> Result<String, BgpStreamError> {
    if path.is_null() {
        return Err(BgpStreamError::NullPointer("AS path"));
    }
    let mut buf = [0 as c_char; AS_PATH_BUF_LEN];
    let ret = unsafe { (api.as_path_snprintf)(buf.as_mut_ptr(), buf.len(), path) };
    util::ensure_fits(ret, buf.len(), "as-path")?;
    Ok(util::cstr_to_string(&buf))
}

fn communities_to_set(
    api: &Api,
    set: *mut sys::bgpstream_community_set_t,
) -> Result<BTreeSet<String>, BgpStreamError> {
    if set.is_null() {
        return Err(BgpStreamError::NullPointer("community set"));
    }
    let mut out = BTreeSet::new();
    let count = unsafe { (api.community_set_size)(set) };
    for i in 0..count {
        let community = unsafe { (api.community_set_get)(set, i) };
        if community.is_null() {
            return Err(BgpStreamError::NullPointer("community"));
        }
        let mut buf = [0 as c_char; COMMUNITY_BUF_LEN];
        let ret = unsafe { (api.community_snprintf)(buf.as_mut_ptr(), buf.len(), community) };
        util::ensure_fits(ret, buf.len(), "community")?;
        out.insert(util::cstr_to_string(&buf));
    }
    Ok(out)
}
