use callroster_notify::{ChannelId, NotificationSink, NotifyError, WahaConfig, WahaSink};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

struct Captured {
    path: String,
    body: serde_json::Value,
}

/// Answers `requests` HTTP calls, one per connection, with `status` and `body`.
fn serve(requests: usize, status: &'static str, body: &'static str) -> (String, mpsc::Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for stream in listener.incoming().take(requests) {
            let mut stream = stream.expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone"));

            let mut request_line = String::new();
            reader.read_line(&mut request_line).expect("request line");
            let path = request_line
                .split_whitespace()
                .nth(1)
                .unwrap_or_default()
                .to_string();

            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("header");
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().expect("length");
                    }
                }
            }
            let mut raw = vec![0u8; content_length];
            reader.read_exact(&mut raw).expect("body");
            let payload = serde_json::from_slice(&raw).unwrap_or(serde_json::Value::Null);
            tx.send(Captured { path, body: payload }).expect("capture");

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).expect("respond");
        }
    });
    (format!("http://{addr}"), rx)
}

fn sink(base_url: String) -> WahaSink {
    WahaSink::new(WahaConfig {
        base_url,
        session: "us-phone-bot".to_string(),
        typing: Duration::ZERO,
        timeout: Duration::from_secs(5),
    })
}

#[test]
fn send_wraps_message_in_typing_indicator() {
    let (base_url, captured) = serve(3, "200 OK", r#"{"id":"true_120@g.us_ABC"}"#);
    let channel = ChannelId::parse("120363418230720597@g.us").expect("channel");

    let receipt = sink(base_url).send(&channel, "hello team").expect("sent");
    assert_eq!(receipt.message_id.as_deref(), Some("true_120@g.us_ABC"));

    let calls: Vec<Captured> = captured.iter().take(3).collect();
    let paths: Vec<&str> = calls.iter().map(|call| call.path.as_str()).collect();
    assert_eq!(paths, vec!["/api/startTyping", "/api/stopTyping", "/api/sendText"]);
    assert_eq!(calls[0].body["chatId"], "120363418230720597@g.us");
    assert_eq!(calls[2].body["text"], "hello team");
    assert_eq!(calls[2].body["session"], "us-phone-bot");
}

#[test]
fn rejected_send_is_a_status_error() {
    let (base_url, _captured) = serve(3, "500 Internal Server Error", r#"{"error":"session stopped"}"#);
    let channel = ChannelId::parse("919800000000").expect("channel");

    let err = sink(base_url).send(&channel, "hello").expect_err("rejected");
    match err {
        NotifyError::Status { endpoint, code, body } => {
            assert_eq!(endpoint, "sendText");
            assert_eq!(code, 500);
            assert!(body.contains("session stopped"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unreachable_server_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let channel = ChannelId::parse("919800000000").expect("channel");
    let err = sink(format!("http://{addr}"))
        .send(&channel, "hello")
        .expect_err("unreachable");
    assert!(matches!(err, NotifyError::Transport { .. }));
}
