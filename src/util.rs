//! Small helpers shared by the record and elem views.

use std::fmt::{Display, Formatter};

use libc::{c_char, c_int};

use crate::error::BgpStreamError;
use crate::sys;
use crate::sys::Api;

/// Collect a NUL-terminated C string out of a fixed buffer.
pub(crate) fn cstr_to_string(buf: &[c_char]) -> String {
    let bytes: Vec<u8> = buf
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Record name buffers use the empty string for "not set".
pub(crate) fn name_to_option(buf: &[c_char]) -> Option<String> {
    let name = cstr_to_string(buf);
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Check an snprintf-style would-be length against the buffer size. A
/// negative result wraps to a huge value and fails the check, the same way
/// the C `int >= size_t` comparison promotes.
pub(crate) fn ensure_fits(
    ret: c_int,
    len: usize,
    what: &'static str,
) -> Result<(), BgpStreamError> {
    if ret as usize >= len {
        return Err(BgpStreamError::FormatOverflow(what));
    }
    Ok(())
}

/// Presentation form of an address, `bgpstream_addr_ntop` underneath.
pub(crate) fn addr_to_string(
    api: &Api,
    addr: &sys::bgpstream_ip_addr_t,
    what: &'static str,
) -> Result<String, BgpStreamError> {
    let mut buf = [0 as c_char; sys::INET6_ADDRSTRLEN];
    let ret = unsafe { (api.addr_ntop)(buf.as_mut_ptr(), buf.len(), addr) };
    if ret.is_null() {
        return Err(BgpStreamError::FormatOverflow(what));
    }
    Ok(cstr_to_string(&buf))
}

/// Presentation form of a prefix, `bgpstream_pfx_snprintf` underneath.
pub(crate) fn pfx_to_string(
    api: &Api,
    pfx: &sys::bgpstream_pfx_t,
) -> Result<String, BgpStreamError> {
    let mut buf = [0 as c_char; sys::INET6_ADDRSTRLEN + 3];
    let ret = unsafe { (api.pfx_snprintf)(buf.as_mut_ptr(), buf.len(), pfx) };
    if ret.is_null() {
        return Err(BgpStreamError::FormatOverflow("prefix"));
    }
    Ok(cstr_to_string(&buf))
}

/// Name of a peer FSM state, lowercase (`"idle"`, `"established"`, ...).
pub(crate) fn peerstate_to_string(
    api: &Api,
    state: sys::bgpstream_elem_peerstate_t,
    what: &'static str,
) -> Result<String, BgpStreamError> {
    let mut buf = [0 as c_char; 128];
    let ret = unsafe { (api.elem_peerstate_snprintf)(buf.as_mut_ptr(), buf.len(), state) };
    ensure_fits(ret, buf.len(), what)?;
    Ok(cstr_to_string(&buf))
}

/// Wraps an `Option` so absent values render as the empty string in the
/// pipe-separated line forms.
pub(crate) struct OptionToStr<'a, T>(pub &'a Option<T>);

impl<T: Display> Display for OptionToStr<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            None => Ok(()),
            Some(x) => write!(f, "{x}"),
        }
    }
}
