use std::convert::TryFrom;

use pretty_assertions::assert_eq;

use crate::{FieldKind, FieldName, Header, RecordKind, Version};


/// Split one serialized record into its version line, header fields and block, checking that
/// the block matches `Content-Length` and is followed by the record trailer.
pub(crate) fn split_record(bytes: &[u8]) -> (String, Vec<(String, String)>, &[u8]) {
    let header_end = bytes
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("record has no end of header")
        + 4;
    let text = std::str::from_utf8(&bytes[..header_end - 4]).expect("header is not UTF-8");
    let mut lines = text.split("\r\n");
    let version = lines.next().expect("missing version line").to_owned();
    let fields: Vec<(String, String)> = lines
        .map(|line| {
            let colon = line.find(": ").expect("field has no separator");
            (line[..colon].to_owned(), line[colon + 2..].to_owned())
        })
        .collect();

    let length: usize = fields
        .iter()
        .find(|(name, _)| name == "Content-Length")
        .expect("record has no Content-Length")
        .1
        .parse()
        .expect("Content-Length is not an integer");
    let rest = &bytes[header_end..];
    assert_eq!(rest.len(), length + 4, "record has trailing or missing bytes");
    assert_eq!(&rest[length..], b"\r\n\r\n", "record trailer is missing");

    (version, fields, &rest[..length])
}

#[test]
fn field_names_are_case_insensitive() {
    let parsed: FieldName = "content-LENGTH".into();
    assert_eq!(parsed, FieldKind::ContentLength);
    assert_eq!(parsed.as_ref(), "Content-Length");

    let other: FieldName = "X-Something".into();
    assert_eq!(other, FieldName::from("x-something"));
    assert!(matches!(other, FieldName::Other(_)));
}

#[test]
fn record_kinds_convert() {
    assert_eq!(RecordKind::try_from("WARCINFO"), Ok(RecordKind::Info));
    assert_eq!(RecordKind::Resource.as_ref(), "resource");
    assert_eq!(RecordKind::try_from("request"), Err("request"));
}

#[test]
fn header_keeps_order_and_duplicates() {
    let mut header = Header::new(Version::WARC1_0);
    header.append_field("X-B", "1");
    header.append_field(FieldKind::ContentLength, "0");
    header.append_field("X-A", "2");
    header.append_field("x-b", "3");

    let names: Vec<&str> = header.iter_field_bytes().map(|(n, _)| n.as_ref()).collect();
    assert_eq!(names, vec!["X-B", "Content-Length", "X-A", "x-b"]);
    assert_eq!(header.get_field("X-B"), Some("1"));
    assert_eq!(
        header.get_all("X-B").collect::<Vec<_>>(),
        vec![&b"1"[..], &b"3"[..]]
    );

    assert_eq!(header.set_field("X-B", "4"), Some(b"1".to_vec()));
    assert_eq!(header.get_field("x-b"), Some("4"));
    assert_eq!(header.set_field("X-C", "5"), None);
    assert_eq!(header.iter_field_bytes().count(), 5);
    assert_eq!(header.get_field(FieldKind::ContentLength), Some("0"));
    assert_eq!(header.get_field(FieldKind::Date), None);
}
