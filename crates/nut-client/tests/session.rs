//! End-to-end session tests against a scripted TCP stand-in for `upsd`.
//!
//! Each scenario is expressed as a JSON-deserialized script of
//! request/reply steps, mirroring the JSON-fixture style the daemon this
//! client is extracted alongside uses for its own synthetic test
//! devices: declare the shape as data, let serde build it, drive the real
//! client code against it.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::JoinHandle;
use std::time::Duration;

use nut_client::{TrackingResult, UpsClient};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ScriptStep {
    /// Exact request line expected from the client, if checked.
    expect: Option<String>,
    /// Reply lines written back, each followed by `\n`.
    reply: Vec<String>,
}

fn spawn_mock_server(script: Vec<ScriptStep>) -> (JoinHandle<()>, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
    let port = listener.local_addr().unwrap().port();

    let handle = std::thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept client connection");
        serve(stream, script);
    });

    (handle, port)
}

fn serve(stream: TcpStream, script: Vec<ScriptStep>) {
    let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
    let mut writer = stream;

    for step in script {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let line = line.trim_end_matches(['\n', '\r']);
        if let Some(expected) = &step.expect {
            assert_eq!(line, expected, "unexpected request from client");
        }
        for reply_line in &step.reply {
            writer.write_all(reply_line.as_bytes()).unwrap();
            writer.write_all(b"\n").unwrap();
        }
    }
}

fn script_from_json(json: &str) -> Vec<ScriptStep> {
    serde_json::from_str(json).expect("valid scripted session fixture")
}

#[test]
fn s1_authenticates_and_enumerates_devices() {
    let script = script_from_json(
        r#"[
            {"expect": "USERNAME alice", "reply": ["OK"]},
            {"expect": "PASSWORD pw", "reply": ["OK"]},
            {"expect": "LIST UPS", "reply": [
                "BEGIN LIST UPS",
                "UPS ups1 \"Lab\"",
                "UPS ups2 \"Rack\"",
                "END LIST UPS"
            ]}
        ]"#,
    );
    let (_handle, port) = spawn_mock_server(script);

    let mut client = nut_client::TcpUpsClient::new("127.0.0.1", port);
    client.connect().unwrap();
    client.authenticate("alice", "pw").unwrap();

    let mut names = client.device_names().unwrap();
    names.sort();
    assert_eq!(names, vec!["ups1".to_string(), "ups2".to_string()]);
}

#[test]
fn s3_tracked_set_polls_to_terminal_state() {
    let script = script_from_json(
        r#"[
            {"expect": "SET VAR ups1 ups.id \"lab-A\"", "reply": ["OK TRACKING abc"]},
            {"expect": "GET TRACKING abc", "reply": ["PENDING"]},
            {"expect": "GET TRACKING abc", "reply": ["SUCCESS"]}
        ]"#,
    );
    let (_handle, port) = spawn_mock_server(script);

    let mut client = nut_client::TcpUpsClient::new("127.0.0.1", port);
    client.connect().unwrap();

    let id = client.set_device_variable("ups1", "ups.id", "lab-A").unwrap();
    assert_eq!(id, "abc");
    assert_eq!(client.tracking_result(&id).unwrap(), TrackingResult::Pending);
    assert_eq!(client.tracking_result(&id).unwrap(), TrackingResult::Success);
}

#[test]
fn s6_batched_fetch_tolerates_partial_failure() {
    // The mock writes both devices' replies after reading both requests,
    // since the client pipelines both LIST VAR writes before reading
    // either reply back; the generic ScriptStep fixture doesn't model
    // that interleaving, so this scenario drives the raw socket directly.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut l1 = String::new();
        reader.read_line(&mut l1).unwrap();
        assert_eq!(l1.trim_end(), "LIST VAR ups1");
        let mut l2 = String::new();
        reader.read_line(&mut l2).unwrap();
        assert_eq!(l2.trim_end(), "LIST VAR ups2");
        stream
            .write_all(
                b"BEGIN LIST VAR ups1\nVAR ups1 battery.charge \"87\"\nEND LIST VAR ups1\nERR UNKNOWN-UPS\n",
            )
            .unwrap();
    });

    let mut client = nut_client::TcpUpsClient::new("127.0.0.1", port);
    client.connect().unwrap();

    let devs = vec!["ups1".to_string(), "ups2".to_string()];
    let result = client.devices_variable_values_pipelined(&devs).unwrap();
    assert!(result.contains_key("ups1"));
    assert!(!result.contains_key("ups2"));
    assert_eq!(
        result["ups1"]["battery.charge"],
        vec!["87".to_string()]
    );

    handle.join().unwrap();
}

#[test]
fn s7_read_timeout_does_not_disconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        // Hold the connection open without replying, to trigger the
        // client's read timeout.
        std::thread::sleep(Duration::from_millis(500));
        drop(stream);
    });

    let mut client = nut_client::TcpUpsClient::new("127.0.0.1", port);
    client.connect().unwrap();
    client.set_timeout(Some(0.2));

    let result = client.authenticate("alice", "pw");
    assert!(matches!(result, Err(nut_client::Error::Timeout)));
    assert!(client.is_connected());

    handle.join().unwrap();
}
