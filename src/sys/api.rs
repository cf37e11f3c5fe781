/*!
Runtime loading of the libbgpstream entry points.

The crate never links against libbgpstream at build time. [`Api`] holds one
function pointer per C call the safe layer makes, resolved with `libloading`
when a stream is created. Tests fill the same table with in-crate fakes, so
the crate builds and tests on hosts without the library installed.

Call contracts relied on by the safe layer:

- `get_next_record` and `record_get_next_elem` return a positive value when
  an item was produced, `0` on normal exhaustion, and a negative value on
  error.
- The `*_snprintf` formatters return the would-be length of the formatted
  string; a result of `len` or more means the buffer was too small and the
  contents must not be used.
- `addr_ntop` and `pfx_snprintf` return the buffer pointer, or NULL on
  failure.
- The filter calls and `parse_filter_string` return nonzero on success and
  `0` on rejection; `start` returns a negative value on failure;
  `set_data_interface_option` returns `0` on success.
- `get_data_interface_id_by_name` returns `0` for names the build of the
  library does not know; `get_data_interface_option_by_name` returns NULL
  for unknown options.
*/
use std::env;
use std::path::Path;
use std::sync::Arc;

use libc::{c_char, c_int, size_t};
use libloading::Library;
use log::debug;

use super::*;
use crate::error::BgpStreamError;

/// Environment variable naming the shared object to load, checked before
/// the default sonames.
pub const ENV_LIBBGPSTREAM_PATH: &str = "LIBBGPSTREAM_PATH";

const SONAME_CANDIDATES: &[&str] = &[
    "libbgpstream.so.2",
    "libbgpstream.so",
    "libbgpstream.2.dylib",
    "libbgpstream.dylib",
];

/// Resolved libbgpstream entry points plus a handle keeping the shared
/// object mapped. Cloning is cheap and keeps the mapping alive.
#[derive(Clone)]
pub struct Api {
    // stream lifecycle
    pub(crate) create: unsafe extern "C" fn() -> *mut bgpstream_t,
    pub(crate) destroy: unsafe extern "C" fn(bs: *mut bgpstream_t),
    pub(crate) start: unsafe extern "C" fn(bs: *mut bgpstream_t) -> c_int,
    pub(crate) get_next_record:
        unsafe extern "C" fn(bs: *mut bgpstream_t, record: *mut *mut bgpstream_record_t) -> c_int,

    // filters and data interfaces
    pub(crate) add_filter: unsafe extern "C" fn(
        bs: *mut bgpstream_t,
        filter_type: bgpstream_filter_type_t,
        filter_value: *const c_char,
    ) -> c_int,
    pub(crate) add_interval_filter:
        unsafe extern "C" fn(bs: *mut bgpstream_t, begin_time: u32, end_time: u32) -> c_int,
    pub(crate) add_rib_period_filter:
        unsafe extern "C" fn(bs: *mut bgpstream_t, period: u32) -> c_int,
    pub(crate) parse_filter_string:
        unsafe extern "C" fn(bs: *mut bgpstream_t, filter_string: *const c_char) -> c_int,
    pub(crate) get_data_interface_id_by_name: unsafe extern "C" fn(
        bs: *mut bgpstream_t,
        name: *const c_char,
    ) -> bgpstream_data_interface_id_t,
    pub(crate) get_data_interface_option_by_name: unsafe extern "C" fn(
        bs: *mut bgpstream_t,
        if_id: bgpstream_data_interface_id_t,
        name: *const c_char,
    ) -> *const bgpstream_data_interface_option_t,
    pub(crate) set_data_interface:
        unsafe extern "C" fn(bs: *mut bgpstream_t, if_id: bgpstream_data_interface_id_t),
    pub(crate) set_data_interface_option: unsafe extern "C" fn(
        bs: *mut bgpstream_t,
        option: *const bgpstream_data_interface_option_t,
        value: *const c_char,
    ) -> c_int,

    // records and elems
    pub(crate) record_get_next_elem: unsafe extern "C" fn(
        record: *mut bgpstream_record_t,
        elem: *mut *mut bgpstream_elem_t,
    ) -> c_int,
    pub(crate) elem_create: unsafe extern "C" fn() -> *mut bgpstream_elem_t,
    pub(crate) elem_destroy: unsafe extern "C" fn(elem: *mut bgpstream_elem_t),
    pub(crate) elem_copy: unsafe extern "C" fn(
        dst: *mut bgpstream_elem_t,
        src: *const bgpstream_elem_t,
    ) -> *mut bgpstream_elem_t,

    // formatters
    pub(crate) elem_type_snprintf: unsafe extern "C" fn(
        buf: *mut c_char,
        len: size_t,
        elem_type: bgpstream_elem_type_t,
    ) -> c_int,
    pub(crate) elem_peerstate_snprintf: unsafe extern "C" fn(
        buf: *mut c_char,
        len: size_t,
        state: bgpstream_elem_peerstate_t,
    ) -> c_int,
    pub(crate) addr_ntop: unsafe extern "C" fn(
        buf: *mut c_char,
        len: size_t,
        addr: *const bgpstream_ip_addr_t,
    ) -> *mut c_char,
    pub(crate) pfx_snprintf: unsafe extern "C" fn(
        buf: *mut c_char,
        len: size_t,
        pfx: *const bgpstream_pfx_t,
    ) -> *mut c_char,
    pub(crate) as_path_snprintf: unsafe extern "C" fn(
        buf: *mut c_char,
        len: size_t,
        path: *mut bgpstream_as_path_t,
    ) -> c_int,
    pub(crate) community_set_size:
        unsafe extern "C" fn(set: *mut bgpstream_community_set_t) -> c_int,
    pub(crate) community_set_get: unsafe extern "C" fn(
        set: *mut bgpstream_community_set_t,
        i: c_int,
    ) -> *const bgpstream_community_t,
    pub(crate) community_snprintf: unsafe extern "C" fn(
        buf: *mut c_char,
        len: size_t,
        community: *const bgpstream_community_t,
    ) -> c_int,

    // keeps the shared object mapped for as long as any clone of the
    // table is alive; None when the table was built by tests
    pub(crate) _lib: Option<Arc<Library>>,
}

impl Api {
    /// Load the library from `LIBBGPSTREAM_PATH` if set, otherwise try the
    /// platform's default sonames.
    pub(crate) fn load() -> Result<Api, BgpStreamError> {
        if let Ok(path) = env::var(ENV_LIBBGPSTREAM_PATH) {
            debug!("loading libbgpstream from {}={}", ENV_LIBBGPSTREAM_PATH, path);
            return Api::load_from(Path::new(&path));
        }
        for name in SONAME_CANDIDATES {
            match unsafe { Library::new(name) } {
                Ok(lib) => {
                    debug!("loaded {}", name);
                    return Api::from_library(lib);
                }
                Err(e) => debug!("could not load {}: {}", name, e),
            }
        }
        Err(BgpStreamError::LibraryNotFound)
    }

    pub(crate) fn load_from(path: &Path) -> Result<Api, BgpStreamError> {
        let lib = unsafe { Library::new(path) }?;
        Api::from_library(lib)
    }

    fn from_library(lib: Library) -> Result<Api, BgpStreamError> {
        let lib = Arc::new(lib);
        // SAFETY: the requested types match the 2.x header declarations
        // mirrored in this module.
        unsafe {
            Ok(Api {
                create: *lib.get(b"bgpstream_create\0")?,
                destroy: *lib.get(b"bgpstream_destroy\0")?,
                start: *lib.get(b"bgpstream_start\0")?,
                get_next_record: *lib.get(b"bgpstream_get_next_record\0")?,
                add_filter: *lib.get(b"bgpstream_add_filter\0")?,
                add_interval_filter: *lib.get(b"bgpstream_add_interval_filter\0")?,
                add_rib_period_filter: *lib.get(b"bgpstream_add_rib_period_filter\0")?,
                parse_filter_string: *lib.get(b"bgpstream_parse_filter_string\0")?,
                get_data_interface_id_by_name: *lib
                    .get(b"bgpstream_get_data_interface_id_by_name\0")?,
                get_data_interface_option_by_name: *lib
                    .get(b"bgpstream_get_data_interface_option_by_name\0")?,
                set_data_interface: *lib.get(b"bgpstream_set_data_interface\0")?,
                set_data_interface_option: *lib.get(b"bgpstream_set_data_interface_option\0")?,
                record_get_next_elem: *lib.get(b"bgpstream_record_get_next_elem\0")?,
                elem_create: *lib.get(b"bgpstream_elem_create\0")?,
                elem_destroy: *lib.get(b"bgpstream_elem_destroy\0")?,
                elem_copy: *lib.get(b"bgpstream_elem_copy\0")?,
                elem_type_snprintf: *lib.get(b"bgpstream_elem_type_snprintf\0")?,
                elem_peerstate_snprintf: *lib.get(b"bgpstream_elem_peerstate_snprintf\0")?,
                addr_ntop: *lib.get(b"bgpstream_addr_ntop\0")?,
                pfx_snprintf: *lib.get(b"bgpstream_pfx_snprintf\0")?,
                as_path_snprintf: *lib.get(b"bgpstream_as_path_snprintf\0")?,
                community_set_size: *lib.get(b"bgpstream_community_set_size\0")?,
                community_set_get: *lib.get(b"bgpstream_community_set_get\0")?,
                community_snprintf: *lib.get(b"bgpstream_community_snprintf\0")?,
                _lib: Some(Arc::clone(&lib)),
            })
        }
    }
}
