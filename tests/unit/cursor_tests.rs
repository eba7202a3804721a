use slack_conduit::mcp::tools::util::{
    decode_key_cursor, decode_page_cursor, encode_key_cursor, encode_page_cursor,
};

#[test]
fn page_cursor_round_trips_to_the_next_page() {
    for page in 1u32..=5 {
        let cursor = encode_page_cursor(page + 1);
        assert_eq!(decode_page_cursor(&cursor).unwrap(), page + 1);
    }
}

#[test]
fn page_cursor_is_opaque_base64() {
    let cursor = encode_page_cursor(3);
    assert!(!cursor.contains("page"));
    assert_ne!(cursor, "3");
}

#[test]
fn malformed_page_cursors_are_rejected() {
    assert!(decode_page_cursor("not base64 !!!").is_err());
    // Valid base64, wrong payload.
    assert!(decode_page_cursor("aGVsbG8=").is_err());
    // page:0 was never issued.
    assert!(decode_page_cursor(&encode_page_cursor(0)).is_err());
}

#[test]
fn key_cursor_round_trips() {
    let cursor = encode_key_cursor("C0123ABCD");
    assert_eq!(decode_key_cursor(&cursor).unwrap(), "C0123ABCD");
    assert!(decode_key_cursor("!!!").is_err());
}
