//! WARC record header data structures.

use std::io::Write;
use std::str;

pub use fieldkind::FieldKind;
pub use fieldname::FieldName;
pub use recordkind::RecordKind;

use crate::record::RecordWriter;
use crate::version::Version;

mod fieldkind;
mod fieldname;
mod recordkind;

// Fields are kept as a list rather than a map: write order is significant and a name may
// legitimately appear more than once.
type FieldList = Vec<(FieldName, Vec<u8>)>;

/// The header of a WARC record.
///
/// Field values can be read using the [`get_field`](Self::get_field) family of functions and
/// added with [`append_field`](Self::append_field) or [`set_field`](Self::set_field). Fields
/// are written in the order they were first added.
///
/// ```
/// # use warcfmt::{Header, Version, FieldKind};
/// let mut header = Header::new(Version::WARC1_0);
/// header.append_field(FieldKind::RecordId, "<urn:uuid:b4beb26f-54c4-4277-8e23-51aa9fc4476d>");
/// header.append_field(FieldKind::ContentLength, "0");
/// header.append_field("WARC-Type", "resource");
///
/// assert_eq!(header.get_field("content-length"), Some("0"));
/// assert_eq!(header.content_length(), Some(0));
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Header {
    version: Version,
    fields: FieldList,
}

impl Header {
    pub fn new<V: Into<Version>>(version: V) -> Self {
        Header {
            version: version.into(),
            fields: Default::default(),
        }
    }

    /// Serialize the header to the given output stream.
    ///
    /// The returned `Write`r will accept only as many bytes as the
    /// [`Content-Length`](FieldKind::ContentLength) field declares; further bytes are silently
    /// dropped. Call [`RecordWriter::finish`] once the block has been written to emit the record
    /// trailer. An error of kind `InvalidInput` is returned without writing anything if the header
    /// has no valid `Content-Length`.
    pub fn write_to<W: Write>(&self, mut dest: W) -> std::io::Result<RecordWriter<W>> {
        let content_length = self.content_length().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "record header has no valid Content-Length",
            )
        })?;

        write!(dest, "{}\r\n", self.version)?;
        for (name, value) in self.iter_field_bytes() {
            dest.write_all(name.as_ref().as_bytes())?;
            dest.write_all(b": ")?;
            dest.write_all(value)?;
            dest.write_all(b"\r\n")?;
        }
        dest.write_all(b"\r\n")?;

        Ok(RecordWriter::new(dest, content_length))
    }

    /// Get the value of the first header field with the given name as bytes, or None if no
    /// such field exists.
    pub fn get_field_bytes<F: Into<FieldName>>(&self, field: F) -> Option<&[u8]> {
        let field = field.into();
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value.as_slice())
    }

    /// Get the value of the first header field with the given name, or None if it does not exist
    /// or is not valid UTF-8.
    pub fn get_field<F: Into<FieldName>>(&self, field: F) -> Option<&str> {
        str::from_utf8(self.get_field_bytes(field)?).ok()
    }

    /// Get every value of the fields with the given name, in header order.
    pub fn get_all<F: Into<FieldName>>(&self, field: F) -> impl Iterator<Item = &[u8]> {
        let field = field.into();
        self.fields
            .iter()
            .filter(move |(name, _)| *name == field)
            .map(|(_, value)| value.as_slice())
    }

    /// Add a field after all existing fields, even if a field of the same name is already present.
    pub fn append_field<N: Into<FieldName>, V: Into<Vec<u8>>>(&mut self, name: N, value: V) {
        let name = name.into();
        debug_assert!(
            crate::is_token(name.as_ref()),
            "field name {:?} contains illegal characters",
            name
        );
        self.fields.push((name, value.into()));
    }

    /// Set the value of a header field, returning the old value (if any).
    ///
    /// If the field exists its first occurrence is replaced in place, keeping its position.
    /// Otherwise the field is appended.
    pub fn set_field<N: Into<FieldName>, V: Into<Vec<u8>>>(
        &mut self,
        name: N,
        value: V,
    ) -> Option<Vec<u8>> {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, value.into())),
            None => {
                self.append_field(name, value);
                None
            }
        }
    }

    /// Get an iterator over the fields in this header, in write order.
    pub fn iter_field_bytes(&self) -> impl Iterator<Item = (&FieldName, &[u8])> {
        self.fields.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Get the WARC version of this record.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Get the record `Content-Length`, if present and a valid integer.
    pub fn content_length(&self) -> Option<u64> {
        self.get_field(FieldKind::ContentLength)?.parse().ok()
    }
}
