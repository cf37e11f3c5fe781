/*!
Fake libbgpstream backend for unit tests.

Fills the [`Api`] table with in-crate `extern "C"` functions over boxed
fixture structs, so every code path of the binding can run on hosts
without the C library installed. The fake stream is scripted per test
through a thread-local slot: build a [`FakeStream`], `install` it, then
create the [`BgpStream`](crate::BgpStream) under test. Each `#[test]`
runs on its own thread, so scripts never leak between tests.
*/
use std::cell::{Cell, RefCell};
use std::ffi::CStr;
use std::net::IpAddr;

use libc::{c_char, c_int, size_t};

use crate::sys::*;

thread_local! {
    static NEXT_STREAM: RefCell<Option<Box<FakeStream>>> = const { RefCell::new(None) };
    static LIVE_STREAMS: RefCell<Vec<*mut FakeStream>> = const { RefCell::new(Vec::new()) };
    static ELEM_ALLOCS: Cell<isize> = const { Cell::new(0) };
    static FAIL_STREAM_CREATE: Cell<bool> = const { Cell::new(false) };
    static FAIL_ELEM_CREATE: Cell<bool> = const { Cell::new(false) };
    static FAIL_ELEM_COPY: Cell<bool> = const { Cell::new(false) };
}

/// Number of elems created through `elem_create` and not yet destroyed.
pub(crate) fn live_elem_allocs() -> isize {
    ELEM_ALLOCS.get()
}

/// Make `bgpstream_create` report allocation failure (return NULL).
pub(crate) fn set_fail_stream_create(fail: bool) {
    FAIL_STREAM_CREATE.set(fail);
}

/// Make `bgpstream_elem_create` report allocation failure (return NULL).
pub(crate) fn set_fail_elem_create(fail: bool) {
    FAIL_ELEM_CREATE.set(fail);
}

/// Make `bgpstream_elem_copy` report failure (return NULL).
pub(crate) fn set_fail_elem_copy(fail: bool) {
    FAIL_ELEM_COPY.set(fail);
}

/// An [`Api`] table backed entirely by the fakes in this module.
pub(crate) fn test_api() -> Api {
    Api {
        create: fake_create,
        destroy: fake_destroy,
        start: fake_start,
        get_next_record: fake_get_next_record,
        add_filter: fake_add_filter,
        add_interval_filter: fake_add_interval_filter,
        add_rib_period_filter: fake_add_rib_period_filter,
        parse_filter_string: fake_parse_filter_string,
        get_data_interface_id_by_name: fake_get_data_interface_id_by_name,
        get_data_interface_option_by_name: fake_get_data_interface_option_by_name,
        set_data_interface: fake_set_data_interface,
        set_data_interface_option: fake_set_data_interface_option,
        record_get_next_elem: fake_record_get_next_elem,
        elem_create: fake_elem_create,
        elem_destroy: fake_elem_destroy,
        elem_copy: fake_elem_copy,
        elem_type_snprintf: fake_elem_type_snprintf,
        elem_peerstate_snprintf: fake_elem_peerstate_snprintf,
        addr_ntop: fake_addr_ntop,
        pfx_snprintf: fake_pfx_snprintf,
        as_path_snprintf: fake_as_path_snprintf,
        community_set_size: fake_community_set_size,
        community_set_get: fake_community_set_get,
        community_snprintf: fake_community_snprintf,
        _lib: None,
    }
}

/* ---------------------------------------------------------------------- */
/* scripted stream                                                        */
/* ---------------------------------------------------------------------- */

/// Script and call log for one fake stream instance.
#[derive(Default)]
pub(crate) struct FakeStream {
    pub records: Vec<RecordFixture>,
    next_record: usize,
    pub start_calls: u32,
    pub fail_start: bool,
    pub fail_next_record: bool,
    pub filters: Vec<(bgpstream_filter_type_t, String)>,
    pub intervals: Vec<(u32, u32)>,
    pub rib_periods: Vec<u32>,
    pub filter_strings: Vec<String>,
    pub reject_filter_strings: bool,
    pub data_interface: Option<bgpstream_data_interface_id_t>,
    pub options: Vec<(bgpstream_data_interface_id_t, String, String)>,
}

impl FakeStream {
    /// Stage this script for the next `bgpstream_create` call on the
    /// current thread.
    pub fn install(self) {
        NEXT_STREAM.with(|slot| *slot.borrow_mut() = Some(Box::new(self)));
    }

    /// Inspect the most recently created, still-live fake stream.
    pub fn with_live<R>(f: impl FnOnce(&FakeStream) -> R) -> R {
        LIVE_STREAMS.with(|live| {
            let live = live.borrow();
            let ptr = *live.last().expect("no live fake stream");
            f(unsafe { &*ptr })
        })
    }
}

unsafe extern "C" fn fake_create() -> *mut bgpstream_t {
    if FAIL_STREAM_CREATE.get() {
        return std::ptr::null_mut();
    }
    let fake = NEXT_STREAM
        .with(|slot| slot.borrow_mut().take())
        .unwrap_or_default();
    let ptr = Box::into_raw(fake);
    LIVE_STREAMS.with(|live| live.borrow_mut().push(ptr));
    ptr as *mut bgpstream_t
}

unsafe extern "C" fn fake_destroy(bs: *mut bgpstream_t) {
    let ptr = bs as *mut FakeStream;
    LIVE_STREAMS.with(|live| live.borrow_mut().retain(|p| *p != ptr));
    drop(Box::from_raw(ptr));
}

unsafe extern "C" fn fake_start(bs: *mut bgpstream_t) -> c_int {
    let fake = &mut *(bs as *mut FakeStream);
    if fake.fail_start {
        return -1;
    }
    fake.start_calls += 1;
    0
}

unsafe extern "C" fn fake_get_next_record(
    bs: *mut bgpstream_t,
    record: *mut *mut bgpstream_record_t,
) -> c_int {
    let fake = &mut *(bs as *mut FakeStream);
    if fake.fail_next_record {
        return -1;
    }
    if fake.next_record >= fake.records.len() {
        return 0;
    }
    *record = fake.records[fake.next_record].ptr();
    fake.next_record += 1;
    1
}

unsafe extern "C" fn fake_add_filter(
    bs: *mut bgpstream_t,
    filter_type: bgpstream_filter_type_t,
    filter_value: *const c_char,
) -> c_int {
    let fake = &mut *(bs as *mut FakeStream);
    fake.filters.push((filter_type, from_cstr(filter_value)));
    1
}

unsafe extern "C" fn fake_add_interval_filter(
    bs: *mut bgpstream_t,
    begin_time: u32,
    end_time: u32,
) -> c_int {
    let fake = &mut *(bs as *mut FakeStream);
    fake.intervals.push((begin_time, end_time));
    1
}

unsafe extern "C" fn fake_add_rib_period_filter(bs: *mut bgpstream_t, period: u32) -> c_int {
    let fake = &mut *(bs as *mut FakeStream);
    fake.rib_periods.push(period);
    1
}

unsafe extern "C" fn fake_parse_filter_string(
    bs: *mut bgpstream_t,
    filter_string: *const c_char,
) -> c_int {
    let fake = &mut *(bs as *mut FakeStream);
    if fake.reject_filter_strings {
        return 0;
    }
    fake.filter_strings.push(from_cstr(filter_string));
    1
}

// (id, option name) pairs the fake broker/singlefile/kafka/csvfile
// interfaces understand; option handles encode the table index
const DATA_INTERFACES: &[(&str, bgpstream_data_interface_id_t)] =
    &[("broker", 1), ("singlefile", 2), ("kafka", 3), ("csvfile", 4)];

const DATA_INTERFACE_OPTIONS: &[(bgpstream_data_interface_id_t, &str)] = &[
    (1, "url"),
    (1, "cache-dir"),
    (2, "rib-file"),
    (2, "upd-file"),
    (3, "brokers"),
    (3, "topic"),
    (3, "group"),
    (4, "csv-file"),
];

unsafe extern "C" fn fake_get_data_interface_id_by_name(
    _bs: *mut bgpstream_t,
    name: *const c_char,
) -> bgpstream_data_interface_id_t {
    let name = from_cstr(name);
    DATA_INTERFACES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, id)| *id)
        .unwrap_or(0)
}

unsafe extern "C" fn fake_get_data_interface_option_by_name(
    _bs: *mut bgpstream_t,
    if_id: bgpstream_data_interface_id_t,
    name: *const c_char,
) -> *const bgpstream_data_interface_option_t {
    let name = from_cstr(name);
    match DATA_INTERFACE_OPTIONS
        .iter()
        .position(|(id, n)| *id == if_id && *n == name)
    {
        Some(idx) => (idx + 1) as *const bgpstream_data_interface_option_t,
        None => std::ptr::null(),
    }
}

unsafe extern "C" fn fake_set_data_interface(
    bs: *mut bgpstream_t,
    if_id: bgpstream_data_interface_id_t,
) {
    let fake = &mut *(bs as *mut FakeStream);
    fake.data_interface = Some(if_id);
}

unsafe extern "C" fn fake_set_data_interface_option(
    bs: *mut bgpstream_t,
    option: *const bgpstream_data_interface_option_t,
    value: *const c_char,
) -> c_int {
    let fake = &mut *(bs as *mut FakeStream);
    let idx = option as usize - 1;
    let (id, name) = DATA_INTERFACE_OPTIONS[idx];
    fake.options.push((id, name.to_string(), from_cstr(value)));
    0
}

/* ---------------------------------------------------------------------- */
/* record and elem fixtures                                               */
/* ---------------------------------------------------------------------- */

struct FakeElemCursor {
    elems: Vec<*mut bgpstream_elem_t>,
    next: usize,
    fail: bool,
}

/// One record plus the elems its cursor serves. The boxed storage keeps
/// every pointer stable while fixtures move between owners.
pub(crate) struct RecordFixture {
    record: Box<bgpstream_record_t>,
    cursor: Box<FakeElemCursor>,
    _elems: Vec<ElemFixture>,
}

impl RecordFixture {
    pub fn new(
        type_: bgpstream_record_type_t,
        status: bgpstream_record_status_t,
        dump_pos: bgpstream_dump_position_t,
    ) -> RecordFixture {
        let mut cursor = Box::new(FakeElemCursor {
            elems: Vec::new(),
            next: 0,
            fail: false,
        });
        let record = Box::new(bgpstream_record_t {
            project_name: [0; BGPSTREAM_UTILS_STR_NAME_LEN],
            collector_name: [0; BGPSTREAM_UTILS_STR_NAME_LEN],
            router_name: [0; BGPSTREAM_UTILS_STR_NAME_LEN],
            router_ip: unset_addr(),
            type_,
            dump_time_sec: 0,
            time_sec: 0,
            time_usec: 0,
            status,
            dump_pos,
            __int: &mut *cursor as *mut FakeElemCursor as *mut bgpstream_record_internal_t,
        });
        RecordFixture {
            record,
            cursor,
            _elems: Vec::new(),
        }
    }

    pub fn with_names(mut self, project: &str, collector: &str, router: &str) -> RecordFixture {
        fill_name(&mut self.record.project_name, project);
        fill_name(&mut self.record.collector_name, collector);
        fill_name(&mut self.record.router_name, router);
        self
    }

    pub fn with_router_ip(mut self, addr: &str) -> RecordFixture {
        self.record.router_ip = ip_addr(addr);
        self
    }

    pub fn with_times(
        mut self,
        dump_time_sec: u32,
        time_sec: u32,
        time_usec: u32,
    ) -> RecordFixture {
        self.record.dump_time_sec = dump_time_sec;
        self.record.time_sec = time_sec;
        self.record.time_usec = time_usec;
        self
    }

    pub fn with_elems(mut self, elems: Vec<ElemFixture>) -> RecordFixture {
        self.cursor.elems = elems.iter().map(|e| e.ptr()).collect();
        self._elems = elems;
        self
    }

    /// Make the elem cursor report a negative status on every advance.
    pub fn fail_elems(mut self) -> RecordFixture {
        self.cursor.fail = true;
        self
    }

    pub fn ptr(&self) -> *mut bgpstream_record_t {
        &*self.record as *const bgpstream_record_t as *mut bgpstream_record_t
    }
}

unsafe extern "C" fn fake_record_get_next_elem(
    record: *mut bgpstream_record_t,
    elem: *mut *mut bgpstream_elem_t,
) -> c_int {
    let cursor = &mut *((*record).__int as *mut FakeElemCursor);
    if cursor.fail {
        return -1;
    }
    if cursor.next >= cursor.elems.len() {
        return 0;
    }
    *elem = cursor.elems[cursor.next];
    cursor.next += 1;
    1
}

struct FakeAsPath(String);

struct FakeCommunitySet(Vec<bgpstream_community_t>);

/// One elem plus the AS-path and community storage its opaque pointers
/// refer to.
pub(crate) struct ElemFixture {
    elem: Box<bgpstream_elem_t>,
    _as_path: Option<Box<FakeAsPath>>,
    _communities: Option<Box<FakeCommunitySet>>,
}

impl ElemFixture {
    /// A RIB or announcement elem carrying the full route fields.
    pub fn route(
        type_: bgpstream_elem_type_t,
        peer: &str,
        peer_asn: u32,
        prefix: &str,
        next_hop: &str,
        as_path: &str,
        communities: &[(u16, u16)],
    ) -> ElemFixture {
        let mut path = Box::new(FakeAsPath(as_path.to_string()));
        let mut comms = Box::new(FakeCommunitySet(
            communities
                .iter()
                .map(|&(asn, value)| bgpstream_community_t { asn, value })
                .collect(),
        ));
        let mut fixture = ElemFixture::bare(type_, peer, peer_asn);
        fixture.elem.prefix = pfx(prefix);
        fixture.elem.nexthop = ip_addr(next_hop);
        fixture.elem.as_path = &mut *path as *mut FakeAsPath as *mut bgpstream_as_path_t;
        fixture.elem.communities =
            &mut *comms as *mut FakeCommunitySet as *mut bgpstream_community_set_t;
        fixture._as_path = Some(path);
        fixture._communities = Some(comms);
        fixture
    }

    pub fn withdrawal(peer: &str, peer_asn: u32, prefix: &str) -> ElemFixture {
        let mut fixture = ElemFixture::bare(BGPSTREAM_ELEM_TYPE_WITHDRAWAL, peer, peer_asn);
        fixture.elem.prefix = pfx(prefix);
        fixture
    }

    pub fn peer_state(
        peer: &str,
        peer_asn: u32,
        old_state: bgpstream_elem_peerstate_t,
        new_state: bgpstream_elem_peerstate_t,
    ) -> ElemFixture {
        let mut fixture = ElemFixture::bare(BGPSTREAM_ELEM_TYPE_PEERSTATE, peer, peer_asn);
        fixture.elem.old_state = old_state;
        fixture.elem.new_state = new_state;
        fixture
    }

    pub fn unknown(peer: &str, peer_asn: u32) -> ElemFixture {
        ElemFixture::bare(BGPSTREAM_ELEM_TYPE_UNKNOWN, peer, peer_asn)
    }

    fn bare(type_: bgpstream_elem_type_t, peer: &str, peer_asn: u32) -> ElemFixture {
        let mut elem = Box::new(empty_elem());
        elem.type_ = type_;
        elem.peer_ip = ip_addr(peer);
        elem.peer_asn = peer_asn;
        ElemFixture {
            elem,
            _as_path: None,
            _communities: None,
        }
    }

    pub fn ptr(&self) -> *mut bgpstream_elem_t {
        &*self.elem as *const bgpstream_elem_t as *mut bgpstream_elem_t
    }
}

fn empty_elem() -> bgpstream_elem_t {
    bgpstream_elem_t {
        type_: BGPSTREAM_ELEM_TYPE_UNKNOWN,
        orig_time_sec: 0,
        orig_time_usec: 0,
        peer_ip: unset_addr(),
        peer_asn: 0,
        prefix: bgpstream_pfx_t {
            address: unset_addr(),
            mask_len: 0,
            allowed_matches: 0,
        },
        nexthop: unset_addr(),
        as_path: std::ptr::null_mut(),
        communities: std::ptr::null_mut(),
        old_state: BGPSTREAM_ELEM_PEERSTATE_UNKNOWN,
        new_state: BGPSTREAM_ELEM_PEERSTATE_UNKNOWN,
    }
}

unsafe extern "C" fn fake_elem_create() -> *mut bgpstream_elem_t {
    if FAIL_ELEM_CREATE.get() {
        return std::ptr::null_mut();
    }
    ELEM_ALLOCS.set(ELEM_ALLOCS.get() + 1);
    Box::into_raw(Box::new(empty_elem()))
}

unsafe extern "C" fn fake_elem_destroy(elem: *mut bgpstream_elem_t) {
    ELEM_ALLOCS.set(ELEM_ALLOCS.get() - 1);
    drop(Box::from_raw(elem));
}

// shallow copy; fixtures keep the referenced path/community storage alive
// for the duration of the test
unsafe extern "C" fn fake_elem_copy(
    dst: *mut bgpstream_elem_t,
    src: *const bgpstream_elem_t,
) -> *mut bgpstream_elem_t {
    if FAIL_ELEM_COPY.get() {
        return std::ptr::null_mut();
    }
    *dst = *src;
    dst
}

/* ---------------------------------------------------------------------- */
/* formatters                                                             */
/* ---------------------------------------------------------------------- */

unsafe extern "C" fn fake_elem_type_snprintf(
    buf: *mut c_char,
    len: size_t,
    elem_type: bgpstream_elem_type_t,
) -> c_int {
    let text = match elem_type {
        BGPSTREAM_ELEM_TYPE_RIB => "rib",
        BGPSTREAM_ELEM_TYPE_ANNOUNCEMENT => "announcement",
        BGPSTREAM_ELEM_TYPE_WITHDRAWAL => "withdrawal",
        BGPSTREAM_ELEM_TYPE_PEERSTATE => "state",
        _ => "unknown",
    };
    write_buf(buf, len, text)
}

const PEERSTATE_NAMES: &[&str] = &[
    "unknown",
    "idle",
    "connect",
    "active",
    "opensent",
    "openconfirm",
    "established",
    "clearing",
    "deleted",
];

unsafe extern "C" fn fake_elem_peerstate_snprintf(
    buf: *mut c_char,
    len: size_t,
    state: bgpstream_elem_peerstate_t,
) -> c_int {
    let text = PEERSTATE_NAMES
        .get(state as usize)
        .copied()
        .unwrap_or("unknown");
    write_buf(buf, len, text)
}

unsafe extern "C" fn fake_addr_ntop(
    buf: *mut c_char,
    len: size_t,
    addr: *const bgpstream_ip_addr_t,
) -> *mut c_char {
    match format_addr(&*addr) {
        Some(text) if write_buf(buf, len, &text) < len as c_int => buf,
        _ => std::ptr::null_mut(),
    }
}

unsafe extern "C" fn fake_pfx_snprintf(
    buf: *mut c_char,
    len: size_t,
    pfx: *const bgpstream_pfx_t,
) -> *mut c_char {
    let pfx = &*pfx;
    let text = match format_addr(&pfx.address) {
        Some(addr) => format!("{}/{}", addr, pfx.mask_len),
        None => return std::ptr::null_mut(),
    };
    if write_buf(buf, len, &text) >= len as c_int {
        return std::ptr::null_mut();
    }
    buf
}

unsafe extern "C" fn fake_as_path_snprintf(
    buf: *mut c_char,
    len: size_t,
    path: *mut bgpstream_as_path_t,
) -> c_int {
    let path = &*(path as *const FakeAsPath);
    write_buf(buf, len, &path.0)
}

unsafe extern "C" fn fake_community_set_size(set: *mut bgpstream_community_set_t) -> c_int {
    let set = &*(set as *const FakeCommunitySet);
    set.0.len() as c_int
}

unsafe extern "C" fn fake_community_set_get(
    set: *mut bgpstream_community_set_t,
    i: c_int,
) -> *const bgpstream_community_t {
    let set = &*(set as *const FakeCommunitySet);
    match set.0.get(i as usize) {
        Some(community) => community as *const bgpstream_community_t,
        None => std::ptr::null(),
    }
}

unsafe extern "C" fn fake_community_snprintf(
    buf: *mut c_char,
    len: size_t,
    community: *const bgpstream_community_t,
) -> c_int {
    let community = &*community;
    write_buf(buf, len, &format!("{}:{}", community.asn, community.value))
}

/* ---------------------------------------------------------------------- */
/* helpers                                                                */
/* ---------------------------------------------------------------------- */

/// snprintf-style write: copy what fits, always return the would-be
/// length.
unsafe fn write_buf(buf: *mut c_char, len: size_t, text: &str) -> c_int {
    let bytes = text.as_bytes();
    if bytes.len() + 1 <= len {
        std::ptr::copy_nonoverlapping(bytes.as_ptr() as *const c_char, buf, bytes.len());
        *buf.add(bytes.len()) = 0;
    }
    bytes.len() as c_int
}

unsafe fn from_cstr(ptr: *const c_char) -> String {
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

fn format_addr(addr: &bgpstream_ip_addr_t) -> Option<String> {
    unsafe {
        match addr.version {
            BGPSTREAM_ADDR_VERSION_IPV4 => Some(
                std::net::Ipv4Addr::from(u32::from_be(addr.addr.ipv4.s_addr)).to_string(),
            ),
            BGPSTREAM_ADDR_VERSION_IPV6 => {
                Some(std::net::Ipv6Addr::from(addr.addr.ipv6.s6_addr).to_string())
            }
            _ => None,
        }
    }
}

pub(crate) fn ip_addr(addr: &str) -> bgpstream_ip_addr_t {
    match addr.parse::<IpAddr>().expect("fixture address") {
        IpAddr::V4(v4) => {
            let mut ipv4: libc::in_addr = unsafe { std::mem::zeroed() };
            ipv4.s_addr = u32::from(v4).to_be();
            bgpstream_ip_addr_t {
                version: BGPSTREAM_ADDR_VERSION_IPV4,
                addr: bgpstream_ip_addr_storage_t { ipv4 },
            }
        }
        IpAddr::V6(v6) => {
            let mut ipv6: libc::in6_addr = unsafe { std::mem::zeroed() };
            ipv6.s6_addr = v6.octets();
            bgpstream_ip_addr_t {
                version: BGPSTREAM_ADDR_VERSION_IPV6,
                addr: bgpstream_ip_addr_storage_t { ipv6 },
            }
        }
    }
}

pub(crate) fn unset_addr() -> bgpstream_ip_addr_t {
    let ipv4: libc::in_addr = unsafe { std::mem::zeroed() };
    bgpstream_ip_addr_t {
        version: BGPSTREAM_ADDR_VERSION_UNKNOWN,
        addr: bgpstream_ip_addr_storage_t { ipv4 },
    }
}

pub(crate) fn pfx(prefix: &str) -> bgpstream_pfx_t {
    let (addr, mask_len) = prefix.split_once('/').expect("fixture prefix");
    bgpstream_pfx_t {
        address: ip_addr(addr),
        mask_len: mask_len.parse().expect("fixture mask length"),
        allowed_matches: 0,
    }
}

fn fill_name(buf: &mut [c_char; BGPSTREAM_UTILS_STR_NAME_LEN], name: &str) {
    assert!(name.len() < buf.len(), "fixture name too long");
    for (dst, src) in buf.iter_mut().zip(name.bytes()) {
        *dst = src as c_char;
    }
}
