/*!
Raw FFI surface of libBGPStream v2.

This module mirrors the public structs, enumerant values, and calls of the
`bgpstream` 2.x headers that the safe layer touches. The library itself is
opened at runtime with `libloading` (see [`Api`]); nothing here links
against it at build time.

Struct declarations follow the 2.x headers. Fields the safe layer never
reads are still declared where they affect the offsets of fields it does
read.
*/
#![allow(non_camel_case_types)]

use libc::{c_char, in6_addr, in_addr};

mod api;

pub use api::Api;

/// Length of the fixed name buffers carried by a record
/// (`BGPSTREAM_UTILS_STR_NAME_LEN`).
pub const BGPSTREAM_UTILS_STR_NAME_LEN: usize = 64;

/// `INET6_ADDRSTRLEN` from `<netinet/in.h>`, the buffer size
/// `bgpstream_addr_ntop` expects.
pub const INET6_ADDRSTRLEN: usize = 46;

pub type bgpstream_addr_version_t = libc::c_uint;
pub const BGPSTREAM_ADDR_VERSION_UNKNOWN: bgpstream_addr_version_t = 0;
pub const BGPSTREAM_ADDR_VERSION_IPV4: bgpstream_addr_version_t =
    libc::AF_INET as bgpstream_addr_version_t;
pub const BGPSTREAM_ADDR_VERSION_IPV6: bgpstream_addr_version_t =
    libc::AF_INET6 as bgpstream_addr_version_t;

pub type bgpstream_elem_type_t = libc::c_uint;
pub const BGPSTREAM_ELEM_TYPE_UNKNOWN: bgpstream_elem_type_t = 0;
pub const BGPSTREAM_ELEM_TYPE_RIB: bgpstream_elem_type_t = 1;
pub const BGPSTREAM_ELEM_TYPE_ANNOUNCEMENT: bgpstream_elem_type_t = 2;
pub const BGPSTREAM_ELEM_TYPE_WITHDRAWAL: bgpstream_elem_type_t = 3;
pub const BGPSTREAM_ELEM_TYPE_PEERSTATE: bgpstream_elem_type_t = 4;

pub type bgpstream_elem_peerstate_t = libc::c_uint;
pub const BGPSTREAM_ELEM_PEERSTATE_UNKNOWN: bgpstream_elem_peerstate_t = 0;
pub const BGPSTREAM_ELEM_PEERSTATE_IDLE: bgpstream_elem_peerstate_t = 1;
pub const BGPSTREAM_ELEM_PEERSTATE_CONNECT: bgpstream_elem_peerstate_t = 2;
pub const BGPSTREAM_ELEM_PEERSTATE_ACTIVE: bgpstream_elem_peerstate_t = 3;
pub const BGPSTREAM_ELEM_PEERSTATE_OPENSENT: bgpstream_elem_peerstate_t = 4;
pub const BGPSTREAM_ELEM_PEERSTATE_OPENCONFIRM: bgpstream_elem_peerstate_t = 5;
pub const BGPSTREAM_ELEM_PEERSTATE_ESTABLISHED: bgpstream_elem_peerstate_t = 6;
pub const BGPSTREAM_ELEM_PEERSTATE_CLEARING: bgpstream_elem_peerstate_t = 7;
pub const BGPSTREAM_ELEM_PEERSTATE_DELETED: bgpstream_elem_peerstate_t = 8;

pub type bgpstream_record_type_t = libc::c_uint;
pub const BGPSTREAM_RIB: bgpstream_record_type_t = 0;
pub const BGPSTREAM_UPDATE: bgpstream_record_type_t = 1;

pub type bgpstream_record_status_t = libc::c_uint;
pub const BGPSTREAM_RECORD_STATUS_VALID_RECORD: bgpstream_record_status_t = 0;
pub const BGPSTREAM_RECORD_STATUS_FILTERED_SOURCE: bgpstream_record_status_t = 1;
pub const BGPSTREAM_RECORD_STATUS_EMPTY_SOURCE: bgpstream_record_status_t = 2;
pub const BGPSTREAM_RECORD_STATUS_CORRUPTED_SOURCE: bgpstream_record_status_t = 3;
pub const BGPSTREAM_RECORD_STATUS_CORRUPTED_RECORD: bgpstream_record_status_t = 4;

pub type bgpstream_dump_position_t = libc::c_uint;
pub const BGPSTREAM_DUMP_START: bgpstream_dump_position_t = 0;
pub const BGPSTREAM_DUMP_MIDDLE: bgpstream_dump_position_t = 1;
pub const BGPSTREAM_DUMP_END: bgpstream_dump_position_t = 2;

pub type bgpstream_filter_type_t = libc::c_uint;
pub const BGPSTREAM_FILTER_TYPE_PROJECT: bgpstream_filter_type_t = 0;
pub const BGPSTREAM_FILTER_TYPE_COLLECTOR: bgpstream_filter_type_t = 1;
pub const BGPSTREAM_FILTER_TYPE_RECORD_TYPE: bgpstream_filter_type_t = 2;
pub const BGPSTREAM_FILTER_TYPE_ELEM_TYPE: bgpstream_filter_type_t = 3;
pub const BGPSTREAM_FILTER_TYPE_ELEM_PEER_ASN: bgpstream_filter_type_t = 4;
pub const BGPSTREAM_FILTER_TYPE_ELEM_ORIGIN_ASN: bgpstream_filter_type_t = 5;
pub const BGPSTREAM_FILTER_TYPE_ELEM_PREFIX: bgpstream_filter_type_t = 6;
pub const BGPSTREAM_FILTER_TYPE_ELEM_COMMUNITY: bgpstream_filter_type_t = 7;
pub const BGPSTREAM_FILTER_TYPE_ELEM_IP_VERSION: bgpstream_filter_type_t = 8;
pub const BGPSTREAM_FILTER_TYPE_ELEM_PREFIX_ANY: bgpstream_filter_type_t = 9;
pub const BGPSTREAM_FILTER_TYPE_ELEM_PREFIX_MORE: bgpstream_filter_type_t = 10;
pub const BGPSTREAM_FILTER_TYPE_ELEM_PREFIX_LESS: bgpstream_filter_type_t = 11;
pub const BGPSTREAM_FILTER_TYPE_ELEM_PREFIX_EXACT: bgpstream_filter_type_t = 12;
pub const BGPSTREAM_FILTER_TYPE_ROUTER: bgpstream_filter_type_t = 13;
pub const BGPSTREAM_FILTER_TYPE_ELEM_ASPATH: bgpstream_filter_type_t = 14;

pub type bgpstream_data_interface_id_t = libc::c_uint;

/// An opaque stream instance.
#[repr(C)]
pub struct bgpstream_t {
    _unused: [u8; 0],
}

/// Opaque AS path storage owned by the library.
#[repr(C)]
pub struct bgpstream_as_path_t {
    _unused: [u8; 0],
}

/// Opaque community set storage owned by the library.
#[repr(C)]
pub struct bgpstream_community_set_t {
    _unused: [u8; 0],
}

/// Opaque handle to one option of a data interface.
#[repr(C)]
pub struct bgpstream_data_interface_option_t {
    _unused: [u8; 0],
}

/// Opaque per-record internals (the elem generator lives here).
#[repr(C)]
pub struct bgpstream_record_internal_t {
    _unused: [u8; 0],
}

/// Storage for either address family, tagged by
/// [`bgpstream_ip_addr_t::version`].
#[repr(C)]
#[derive(Clone, Copy)]
pub union bgpstream_ip_addr_storage_t {
    pub ipv4: in_addr,
    pub ipv6: in6_addr,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct bgpstream_ip_addr_t {
    pub version: bgpstream_addr_version_t,
    pub addr: bgpstream_ip_addr_storage_t,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct bgpstream_pfx_t {
    pub address: bgpstream_ip_addr_t,
    pub mask_len: u8,
    /// Match mode used by prefix filters; never read by the safe layer.
    pub allowed_matches: u8,
}

/// One community value, `asn:value` in canonical text form.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct bgpstream_community_t {
    pub asn: u16,
    pub value: u16,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct bgpstream_elem_t {
    pub type_: bgpstream_elem_type_t,
    pub orig_time_sec: u32,
    pub orig_time_usec: u32,
    pub peer_ip: bgpstream_ip_addr_t,
    pub peer_asn: u32,
    pub prefix: bgpstream_pfx_t,
    pub nexthop: bgpstream_ip_addr_t,
    pub as_path: *mut bgpstream_as_path_t,
    pub communities: *mut bgpstream_community_set_t,
    pub old_state: bgpstream_elem_peerstate_t,
    pub new_state: bgpstream_elem_peerstate_t,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct bgpstream_record_t {
    pub project_name: [c_char; BGPSTREAM_UTILS_STR_NAME_LEN],
    pub collector_name: [c_char; BGPSTREAM_UTILS_STR_NAME_LEN],
    pub router_name: [c_char; BGPSTREAM_UTILS_STR_NAME_LEN],
    pub router_ip: bgpstream_ip_addr_t,
    pub type_: bgpstream_record_type_t,
    pub dump_time_sec: u32,
    pub time_sec: u32,
    pub time_usec: u32,
    pub status: bgpstream_record_status_t,
    pub dump_pos: bgpstream_dump_position_t,
    pub __int: *mut bgpstream_record_internal_t,
}
