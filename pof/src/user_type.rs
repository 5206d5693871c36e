//! Property-indexed frames opened by [`crate::writer::PofWriter::write_user_type`]
//! and [`crate::reader::PofReader::read_user_type`]: enforces strictly
//! increasing property indices within one frame and carries the opaque tail
//! of properties a reader's static type doesn't model, so that
//! round-tripping through an older reader preserves what it can't parse
//! (the [`crate::evolvable::Evolvable`] forward-compatibility pattern).

use pof_types::packed::{read_packed_i32, write_packed_i32};
use pof_types::PofSource;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::reader::PofReader;
use crate::reflect::{PofDecode, PofEncode};
use crate::skip::skip_body;
use crate::writer::PofWriter;

/// An open user-type frame being written into.
pub struct UserTypeWriter<'a, 'b> {
    writer: &'a mut PofWriter<'b>,
    last_index: i32,
}

impl<'a, 'b> UserTypeWriter<'a, 'b> {
    pub(crate) fn new(writer: &'a mut PofWriter<'b>) -> Self {
        Self {
            writer,
            last_index: -1,
        }
    }

    /// The registry this writer's stream is bound to.
    pub fn context(&self) -> &Context {
        self.writer.context()
    }

    /// Writes `value` as the property at `index`. `index` must be strictly
    /// greater than every index already written in this frame.
    pub fn write_property<T: PofEncode>(&mut self, index: i32, value: &T) -> Result<()> {
        if index <= self.last_index {
            return Err(Error::Wire(pof_types::Error::InvalidOrder {
                index,
                last: self.last_index,
            }));
        }
        write_packed_i32(self.writer.sink_mut(), index)?;
        value.pof_encode(self.writer)?;
        self.last_index = index;
        Ok(())
    }

    /// Writes `remainder` (already-encoded `(index, value)` pairs, as
    /// captured by [`UserTypeReader::finish`]) and the frame's `-1`
    /// terminator.
    pub(crate) fn finish(self, remainder: &[u8]) -> Result<()> {
        self.writer.sink_mut().write_bytes(remainder)?;
        write_packed_i32(self.writer.sink_mut(), -1)
    }
}

/// An open user-type frame being read from.
pub struct UserTypeReader<'a, 'b> {
    reader: &'a mut PofReader<'b>,
    last_index: i32,
    version_id: i32,
}

impl<'a, 'b> UserTypeReader<'a, 'b> {
    pub(crate) fn new(reader: &'a mut PofReader<'b>, version_id: i32) -> Self {
        Self {
            reader,
            last_index: -1,
            version_id,
        }
    }

    /// The registry this reader's stream is bound to.
    pub fn context(&self) -> &Context {
        self.reader.context()
    }

    /// The version id stamped on this frame by its writer.
    pub fn version_id(&self) -> i32 {
        self.version_id
    }

    /// Reads the property at `index`, skipping over any lower-indexed
    /// properties present in the stream that the caller's type doesn't
    /// model (a newer writer's extra fields).
    pub fn read_property<T: PofDecode>(&mut self, index: i32) -> Result<T> {
        loop {
            let next = read_packed_i32(self.reader.source_mut())?;
            if next == -1 {
                return Err(Error::malformed("property index was not present in frame"));
            }
            if next <= self.last_index {
                return Err(Error::Wire(pof_types::Error::InvalidOrder {
                    index: next,
                    last: self.last_index,
                }));
            }
            if next < index {
                skip_body(self.reader.source_mut(), {
                    // the value's own tag follows the index we just read
                    read_packed_i32(self.reader.source_mut())?
                })?;
                self.last_index = next;
                continue;
            }
            if next > index {
                return Err(Error::malformed("requested property index was not written"));
            }
            self.last_index = next;
            return T::pof_decode(self.reader);
        }
    }

    /// Drains the remaining `(index, value)` pairs up to the frame's `-1`
    /// terminator, returning their exact encoded bytes so an [`crate::evolvable::Evolvable`]
    /// wrapper can replay them verbatim on re-encode.
    pub(crate) fn read_remainder(self) -> Result<Vec<u8>> {
        let start = self.reader.offset();
        loop {
            let before = self.reader.offset();
            let next = read_packed_i32(self.reader.source_mut())?;
            if next == -1 {
                let end = before;
                return Ok(self.reader.full()[start..end].to_vec());
            }
            if next <= self.last_index {
                return Err(Error::Wire(pof_types::Error::InvalidOrder {
                    index: next,
                    last: self.last_index,
                }));
            }
            crate::skip::skip_value(self.reader.source_mut())?;
        }
    }
}
