#![allow(missing_docs)]

use bytes::Bytes;
use couchstream::{
    BodyStream, CouchError, DocAttachmentsMultipartReader, OpenRevsMultipartReader, PartBody,
};
use futures::stream;
use http::{HeaderMap, HeaderValue, header};
use serde_json::json;

fn whole(body: &[u8]) -> BodyStream {
    Box::pin(stream::iter([Ok::<Bytes, CouchError>(
        Bytes::copy_from_slice(body),
    )]))
}

fn multipart_headers(content_type: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers
}

#[tokio::test]
async fn revision_with_attachments_decodes_doc_then_attachment_then_sentinels() {
    let body = concat!(
        "--:\r\n",
        "Content-Type: multipart/related;boundary=\"--:--\"\r\n",
        "\r\n",
        "----:--\r\n",
        "Content-Type: application/json\r\n",
        "\r\n",
        "{\"_id\": \"foo\"}\r\n",
        "----:--\r\n",
        "Content-Disposition: attachment; filename=\"att.txt\"\r\n",
        "Content-Type: text/plain\r\n",
        "Content-Length: 9\r\n",
        "\r\n",
        "some data\r\n",
        "----:----\r\n",
        "--:--"
    );

    let headers = multipart_headers("multipart/mixed;boundary=\":\"");
    let mut reader = OpenRevsMultipartReader::from_response(&headers, whole(body.as_bytes()))
        .expect("boundary should extract");

    let (doc, attachments) = reader
        .next()
        .await
        .expect("first revision should decode")
        .expect("first revision should exist");
    assert_eq!(doc, json!({"_id": "foo"}));

    let PartBody::Multipart(mut sub) = attachments else {
        panic!("expected an attachments sub-reader");
    };

    let part = sub
        .next()
        .await
        .expect("attachment pull should decode")
        .expect("attachment part should exist");
    assert_eq!(part.filename().as_deref(), Some("att.txt"));
    assert_eq!(part.content_type(), Some("text/plain"));

    let PartBody::Raw(mut part_reader) = part.body else {
        panic!("expected a raw attachment part");
    };
    let data = part_reader.next().await.expect("chunk should decode");
    assert_eq!(data, Some(Bytes::from_static(b"some data")));

    // sentinel cascade: attachment part, sub-reader, then the top reader
    assert!(part_reader.next().await.expect("part sentinel").is_none());
    assert!(part_reader.at_eof());

    assert!(sub.next().await.expect("sub sentinel").is_none());
    assert!(sub.at_eof());

    assert!(reader.next().await.expect("top sentinel").is_none());
    assert!(reader.at_eof());
}

#[tokio::test]
async fn revision_without_attachments_yields_an_exhausted_part_reader() {
    let body = concat!(
        "--:\r\n",
        "Content-Type: application/json\r\n",
        "\r\n",
        "{\"_id\": \"foo\"}\r\n",
        "--:--"
    );

    let headers = multipart_headers("multipart/mixed;boundary=\":\"");
    let mut reader = OpenRevsMultipartReader::from_response(&headers, whole(body.as_bytes()))
        .expect("boundary should extract");

    let (doc, attachments) = reader
        .next()
        .await
        .expect("revision should decode")
        .expect("revision should exist");
    assert_eq!(doc, json!({"_id": "foo"}));

    let PartBody::Raw(mut part_reader) = attachments else {
        panic!("expected an exhausted raw reader");
    };
    assert!(part_reader.at_eof());
    assert!(part_reader.next().await.expect("part sentinel").is_none());

    assert!(reader.next().await.expect("top sentinel").is_none());
    assert!(reader.at_eof());
}

#[tokio::test]
async fn two_bare_revisions_come_out_in_wire_order() {
    let body = concat!(
        "--REVS\r\n",
        "Content-Type: application/json\r\n",
        "\r\n",
        "{\"_id\": \"foo\", \"_rev\": \"1-ABC\"}\r\n",
        "--REVS\r\n",
        "Content-Type: application/json\r\n",
        "\r\n",
        "{\"_id\": \"foo\", \"_rev\": \"2-CDE\"}\r\n",
        "--REVS--\r\n"
    );

    let headers = multipart_headers("multipart/mixed; boundary=REVS");
    let mut reader = OpenRevsMultipartReader::from_response(&headers, whole(body.as_bytes()))
        .expect("boundary should extract");

    let (first, _) = reader
        .next()
        .await
        .expect("first revision should decode")
        .expect("first revision should exist");
    assert_eq!(first["_rev"], "1-ABC");

    let (second, _) = reader
        .next()
        .await
        .expect("second revision should decode")
        .expect("second revision should exist");
    assert_eq!(second["_rev"], "2-CDE");

    assert!(reader.next().await.expect("sentinel").is_none());
}

#[tokio::test]
async fn doc_attachments_reader_walks_document_then_attachments() {
    let body = concat!(
        "--REL\r\n",
        "Content-Type: application/json\r\n",
        "\r\n",
        "{\"_id\": \"foo\", \"bar\": \"baz\"}\r\n",
        "--REL\r\n",
        "Content-Disposition: attachment; filename=\"a.txt\"\r\n",
        "Content-Type: text/plain\r\n",
        "\r\n",
        "alpha\r\n",
        "--REL\r\n",
        "Content-Disposition: attachment; filename=\"b.txt\"\r\n",
        "Content-Type: text/plain\r\n",
        "\r\n",
        "bravo\r\n",
        "--REL--\r\n"
    );

    let headers = multipart_headers("multipart/related; boundary=REL");
    let mut reader = DocAttachmentsMultipartReader::from_response(&headers, whole(body.as_bytes()))
        .expect("boundary should extract");

    let doc = reader.document().await.expect("document should decode");
    assert_eq!(doc, json!({"_id": "foo", "bar": "baz"}));

    let mut att = reader
        .next_attachment()
        .await
        .expect("first attachment should decode")
        .expect("first attachment should exist");
    assert_eq!(att.filename.as_deref(), Some("a.txt"));
    assert_eq!(
        att.reader.bytes().await.expect("body should decode"),
        Bytes::from_static(b"alpha")
    );

    let mut att = reader
        .next_attachment()
        .await
        .expect("second attachment should decode")
        .expect("second attachment should exist");
    assert_eq!(att.filename.as_deref(), Some("b.txt"));
    assert_eq!(
        att.reader.bytes().await.expect("body should decode"),
        Bytes::from_static(b"bravo")
    );

    assert!(reader
        .next_attachment()
        .await
        .expect("sentinel")
        .is_none());
    assert!(reader.at_eof());
}

#[tokio::test]
async fn synthesized_json_envelope_round_trips_the_payload_bytes() {
    let payload = Bytes::from_static(b"{\"_id\": \"foo\"}");
    let mut reader = DocAttachmentsMultipartReader::from_json_bytes(payload);

    let doc = reader.document().await.expect("document should decode");
    assert_eq!(doc, json!({"_id": "foo"}));

    assert!(reader
        .next_attachment()
        .await
        .expect("sentinel")
        .is_none());
    assert!(reader.at_eof());
}
