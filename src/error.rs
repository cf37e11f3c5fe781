/*!
error module defines the error types used in bgpstream.
*/
use std::ffi::NulError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BgpStreamError {
    /// The shared library could not be opened, or a required symbol is
    /// missing from the library that was opened.
    ///
    /// ## Occurs during:
    ///  - [`BgpStream::new`](crate::BgpStream::new)
    ///  - [`BgpStream::with_library`](crate::BgpStream::with_library)
    #[error(transparent)]
    Load(#[from] libloading::Error),
    /// None of the default library names could be resolved on this system.
    #[error("libbgpstream not found; install libbgpstream 2.x or point LIBBGPSTREAM_PATH at it")]
    LibraryNotFound,
    /// The C library failed to allocate an object.
    #[error("could not allocate a new {0}")]
    Allocation(&'static str),
    /// A formatted value did not fit the buffer sized for it. Values are
    /// never silently truncated.
    ///
    /// ## Occurs during:
    ///  - [`BgpElem::fields`](crate::BgpElem::fields) and the other
    ///    formatting accessors
    #[error("{0} does not fit its formatting buffer")]
    FormatOverflow(&'static str),
    /// The library returned NULL where a value was promised.
    #[error("libbgpstream returned a null {0}")]
    NullPointer(&'static str),
    #[error("could not start the stream")]
    Start,
    #[error("could not get the next record from the stream")]
    NextRecord,
    /// The elem cursor of a record reported an error. The usual cause is
    /// pulling elems from a stream that was never started.
    #[error("could not get the next elem (is the stream started?)")]
    NextElem,
    #[error("unknown filter type: {0}")]
    UnknownFilterType(String),
    #[error("the stream rejected filter {0}")]
    FilterRejected(String),
    #[error("invalid filter string: {0}")]
    InvalidFilterString(String),
    #[error("unknown data interface: {0}")]
    UnknownDataInterface(String),
    #[error("unknown option {option} for data interface {interface}")]
    UnknownDataInterfaceOption { interface: String, option: String },
    #[error("could not set option {option} on data interface {interface}")]
    DataInterfaceOptionRejected { interface: String, option: String },
    #[error("cannot parse time string {0:?}; expected a unix timestamp, RFC 3339, or YYYY-MM-DD HH:MM:SS")]
    InvalidTimeString(String),
    /// A caller-supplied string contains an interior NUL byte and cannot
    /// cross the C boundary.
    #[error(transparent)]
    Nul(#[from] NulError),
}
