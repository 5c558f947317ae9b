//! Wire encoding of event-stream frames.

use actix_web::web::Bytes;
use std::time::Duration;

/// `retry: <ms>` directive telling EventSource how long to wait before reconnecting
pub fn retry(interval: Duration) -> Bytes {
    Bytes::from(format!("retry: {}\n\n", interval.as_millis()))
}

/// Comment frame, ignored by clients but keeps proxies from closing an idle stream
pub fn ping() -> Bytes {
    Bytes::from_static(b": ping\n\n")
}

/// Default (`message`) event carrying `data`
///
/// Every line of the payload gets its own `data:` field so embedded newlines
/// survive the trip. `\r\n`, `\r` and `\n` all end a line, as they do for
/// the client's parser.
pub fn data(payload: &str) -> Bytes {
    let mut frame = String::with_capacity(payload.len() + 8);
    for line in payload.replace("\r\n", "\n").split(['\r', '\n']) {
        frame.push_str("data: ");
        frame.push_str(line);
        frame.push('\n');
    }
    frame.push('\n');
    Bytes::from(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_frame() {
        assert_eq!(retry(Duration::from_secs(5)), Bytes::from_static(b"retry: 5000\n\n"));
    }

    #[test]
    fn test_data_frame_single_line() {
        assert_eq!(data(r#"{"x":1}"#), Bytes::from_static(b"data: {\"x\":1}\n\n"));
    }

    #[test]
    fn test_data_frame_multi_line() {
        assert_eq!(
            data("first\r\nsecond"),
            Bytes::from_static(b"data: first\ndata: second\n\n")
        );
    }

    #[test]
    fn test_data_frame_bare_carriage_return() {
        let frame = data("a\rretry: 1");
        assert_eq!(frame, Bytes::from_static(b"data: a\ndata: retry: 1\n\n"));

        // Every line a client would see is still a data field
        let text = std::str::from_utf8(&frame).unwrap();
        for line in text.split(['\r', '\n']).filter(|line| !line.is_empty()) {
            assert!(line.starts_with("data: "), "unexpected field {:?}", line);
        }
    }

    #[test]
    fn test_data_frame_mixed_line_endings() {
        assert_eq!(
            data("one\r\ntwo\rthree\nfour"),
            Bytes::from_static(b"data: one\ndata: two\ndata: three\ndata: four\n\n")
        );
    }

    #[test]
    fn test_ping_frame() {
        assert_eq!(ping(), Bytes::from_static(b": ping\n\n"));
    }
}
