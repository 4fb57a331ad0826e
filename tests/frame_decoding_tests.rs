use wschat::types::{InboundFrame, StructuredRecord};

#[test]
fn test_sentinel_wins_over_everything_else() {
    assert_eq!(InboundFrame::decode("[END]"), InboundFrame::Sentinel);
    assert_eq!(InboundFrame::decode("done [END] trailing"), InboundFrame::Sentinel);
    assert_eq!(
        InboundFrame::decode(r#"{"type":"error","message":"[END]"}"#),
        InboundFrame::Sentinel
    );
}

#[test]
fn test_structured_records_are_recognised() {
    assert_eq!(
        InboundFrame::decode(r#"{"type":"image","query":"q","url":"http://x/y.png"}"#),
        InboundFrame::Record(StructuredRecord::Image {
            query: "q".to_string(),
            url: "http://x/y.png".to_string(),
        })
    );
    assert_eq!(
        InboundFrame::decode(r#"{"type":"error","message":"boom"}"#),
        InboundFrame::Record(StructuredRecord::Error {
            message: "boom".to_string(),
        })
    );
    assert_eq!(
        InboundFrame::decode(r#"{"type":"progress","pct":40}"#),
        InboundFrame::Record(StructuredRecord::Unknown)
    );
}

#[test]
fn test_non_record_payloads_are_text() {
    assert_eq!(InboundFrame::decode("Hello"), InboundFrame::Text("Hello"));
    assert_eq!(InboundFrame::decode("{not json"), InboundFrame::Text("{not json"));
    assert_eq!(
        InboundFrame::decode(r#"{"message":"no type"}"#),
        InboundFrame::Text(r#"{"message":"no type"}"#)
    );
    assert_eq!(InboundFrame::decode("[1,2]"), InboundFrame::Text("[1,2]"));
}
