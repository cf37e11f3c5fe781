/*!
Safe Rust bindings for [libBGPStream](https://bgpstream.caida.org/), CAIDA's
BGP data stream library.

The C library does all the heavy lifting: it opens data sources (RIB dumps,
update files, live feeds), applies filters, and hands back records sorted by
time. This crate owns none of those semantics. It loads the shared library
at runtime, wraps the stream handle in [`BgpStream`], and exposes the
records and elems the library produces as typed views:

- [`BgpRecord`] — one unit of stream output with its source metadata,
  borrowed from the stream until the next pull;
- [`BgpElem`] — one routing event (announcement, withdrawal, RIB entry, or
  peer-state change) inside a record, borrowed from the record's cursor;
- [`OwnedBgpElem`] — an elem deep-copied out of its record, free of
  lifetime ties.

libbgpstream 2.x must be installed at runtime (or named through the
`LIBBGPSTREAM_PATH` environment variable); nothing links against it at
build time.

## Example

```no_run
use bgpstream::BgpStream;

fn main() -> Result<(), bgpstream::BgpStreamError> {
    let mut stream = BgpStream::new()?;
    stream.add_filter("collector", "rrc00")?;
    stream.add_filter("record-type", "updates")?;
    stream.add_interval_filter_str("2020-01-01 00:00:00", "2020-01-01 01:00:00")?;

    while let Some(record) = stream.next_record()? {
        while let Some(mut elem) = record.next_elem()? {
            println!("{}", elem.to_line()?);
        }
    }
    Ok(())
}
```

## Feature flags

- `serde`: `Serialize`/`Deserialize` on [`ElemFields`] and the record
  vocabulary enums.
*/
pub mod error;
pub mod sys;

mod elem;
mod record;
mod stream;
#[cfg(test)]
mod testing;
mod util;

pub use crate::elem::{BgpElem, ElemFields, ElemType, OwnedBgpElem};
pub use crate::error::BgpStreamError;
pub use crate::record::{BgpRecord, DumpPosition, ElemIter, RecordStatus, RecordType};
pub use crate::stream::{parse_time_str, BgpStream, StreamElemIter};

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
