use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use nut_proto::wire::{encode_request, encode_request_with_value, is_begin, is_end, parse_reply_line, Reply};
use nut_proto::{Error, Result, TrackingId, TrackingResult};
use tracing::{debug, info, warn};

use crate::client_trait::UpsClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    Disconnected,
    Connected,
    Authenticated,
}

/// A session with a real `upsd`-compatible server over TCP.
///
/// Single-threaded per connection: every call writes exactly one request
/// and (except [`TcpUpsClient::send_async_queries`]) reads exactly one
/// reply before returning, so responses are never interleaved across
/// concurrent callers sharing a client.
pub struct TcpUpsClient {
    host: String,
    port: u16,
    timeout: Option<Duration>,
    state: ConnectionState,
    stream: Option<TcpStream>,
    reader: Option<BufReader<TcpStream>>,
}

const DEFAULT_PORT: u16 = 3493;

impl TcpUpsClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        TcpUpsClient {
            host: host.into(),
            port,
            timeout: None,
            state: ConnectionState::Disconnected,
            stream: None,
            reader: None,
        }
    }

    pub fn with_default_port(host: impl Into<String>) -> Self {
        Self::new(host, DEFAULT_PORT)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn set_timeout(&mut self, secs: Option<f64>) {
        self.timeout = secs.map(Duration::from_secs_f64);
        if let Some(stream) = &self.stream {
            let _ = stream.set_read_timeout(self.timeout);
            let _ = stream.set_write_timeout(self.timeout);
        }
    }

    pub fn timeout(&self) -> Option<f64> {
        self.timeout.map(|d| d.as_secs_f64())
    }

    pub fn is_connected(&self) -> bool {
        self.state != ConnectionState::Disconnected
    }

    /// Resolve the configured host and establish a TCP connection, trying
    /// every resolved address in turn and succeeding on the first one that
    /// connects, honoring the configured timeout for each attempt.
    pub fn connect(&mut self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::UnknownHost);
        }

        let addrs: Vec<_> = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|_| Error::UnknownHost)?
            .collect();

        let mut last_err = None;
        let mut connected = None;
        for addr in &addrs {
            let attempt = match self.timeout {
                Some(d) => TcpStream::connect_timeout(addr, d),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(s) => {
                    connected = Some(s);
                    break;
                }
                Err(e) => last_err = Some(e),
            }
        }

        let stream = match connected {
            Some(s) => s,
            None => {
                return Err(match last_err {
                    Some(e) if e.kind() == std::io::ErrorKind::TimedOut => Error::Timeout,
                    Some(e) => Error::Io(e),
                    None => Error::UnknownHost,
                });
            }
        };

        stream.set_read_timeout(self.timeout).map_err(Error::Io)?;
        stream.set_write_timeout(self.timeout).map_err(Error::Io)?;
        let reader_stream = stream.try_clone().map_err(Error::Io)?;

        self.stream = Some(stream);
        self.reader = Some(BufReader::new(reader_stream));
        self.state = ConnectionState::Connected;
        info!(host = %self.host, port = self.port, "connected to UPS server");
        Ok(())
    }

    /// Tear down the local socket unconditionally, without attempting a
    /// protocol-level `LOGOUT` first. Prefer [`UpsClient::logout`] for a
    /// graceful close; this is for abandoning a connection that is
    /// already known to be broken.
    pub fn disconnect(&mut self) {
        self.force_disconnect();
    }

    fn force_disconnect(&mut self) {
        self.stream = None;
        self.reader = None;
        self.state = ConnectionState::Disconnected;
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        debug!(%line, "-> ");
        let result = stream
            .write_all(line.as_bytes())
            .and_then(|_| stream.write_all(b"\n"));
        match result {
            Ok(()) => Ok(()),
            Err(e) if is_timeout(&e) => Err(Error::Timeout),
            Err(e) => {
                self.force_disconnect();
                Err(Error::Io(e))
            }
        }
    }

    fn read_line(&mut self) -> Result<String> {
        let reader = self.reader.as_mut().ok_or(Error::NotConnected)?;
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => {
                self.force_disconnect();
                Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed by server",
                )))
            }
            Ok(_) => {
                let trimmed = line.trim_end_matches(['\n', '\r']).to_string();
                debug!(line = %trimmed, "<- ");
                Ok(trimmed)
            }
            Err(e) if is_timeout(&e) => Err(Error::Timeout),
            Err(e) => {
                self.force_disconnect();
                Err(Error::Io(e))
            }
        }
    }

    /// Send one request and read its single reply line, raising
    /// [`Error::Protocol`] if the server answered `ERR`.
    fn send_query(&mut self, line: &str) -> Result<String> {
        self.write_line(line)?;
        let reply = self.read_line()?;
        if let Some(code) = reply.strip_prefix("ERR ") {
            return Err(Error::Protocol {
                code: code.to_string(),
            });
        }
        if reply == "ERR" {
            return Err(Error::Protocol {
                code: String::new(),
            });
        }
        Ok(reply)
    }

    /// Write several requests back to back without reading any replies;
    /// the caller reads each corresponding reply afterwards, in order.
    fn send_async_queries(&mut self, lines: &[String]) -> Result<()> {
        for line in lines {
            self.write_line(line)?;
        }
        Ok(())
    }

    /// Send a `GET <subcmd> <params...>` request. The reply echoes
    /// `<subcmd> <params...>` (without the leading `GET`) followed by the
    /// queried value; this returns only the trailing value tokens.
    fn get(&mut self, tokens: &[&str]) -> Result<Vec<String>> {
        debug_assert_eq!(tokens.first().copied(), Some("GET"));
        let echo = &tokens[1..];
        let line = encode_request(tokens);
        let reply = self.send_query(&line)?;
        let parsed = nut_proto::tokenizer::tokenize(&reply);
        if parsed.len() < echo.len() || !parsed[..echo.len()].iter().eq(echo.iter()) {
            return Err(Error::InvalidResponse(reply));
        }
        Ok(parsed[echo.len()..].to_vec())
    }

    fn list(&mut self, topic: &[&str]) -> Result<Vec<Vec<String>>> {
        let request_tokens: Vec<&str> = std::iter::once("LIST").chain(topic.iter().copied()).collect();
        self.write_line(&encode_request(&request_tokens))?;
        self.read_list_body(topic)
    }

    /// Read a `BEGIN LIST <topic> ... END LIST <topic>` block. `topic`
    /// excludes the leading `LIST` keyword, which this adds itself to
    /// build the full `BEGIN`/`END` marker.
    fn read_list_body(&mut self, topic: &[&str]) -> Result<Vec<Vec<String>>> {
        let marker: Vec<&str> = std::iter::once("LIST").chain(topic.iter().copied()).collect();

        let first = self.read_line()?;
        if let Some(code) = first.strip_prefix("ERR ") {
            return Err(Error::Protocol {
                code: code.to_string(),
            });
        }
        let first_tokens = nut_proto::tokenizer::tokenize(&first);
        if !is_begin(&first_tokens, &marker) {
            return Err(Error::InvalidResponse(first));
        }

        let mut rows = Vec::new();
        loop {
            let line = self.read_line()?;
            let tokens = nut_proto::tokenizer::tokenize(&line);
            if is_end(&tokens, &marker) {
                break;
            }
            rows.push(tokens);
        }
        Ok(rows)
    }

    fn require_authenticated_or_connected(&self) -> Result<()> {
        match self.state {
            ConnectionState::Disconnected => Err(Error::NotConnected),
            _ => Ok(()),
        }
    }

    /// Pipelined variant of [`UpsClient::devices_variable_values`]: every
    /// `LIST VAR` request is written before any reply is read, so the
    /// round trip cost is one network latency for the whole batch rather
    /// than one per device.
    pub fn devices_variable_values_pipelined(
        &mut self,
        devs: &[String],
    ) -> Result<HashMap<String, HashMap<String, Vec<String>>>> {
        self.require_authenticated_or_connected()?;
        if devs.is_empty() {
            return Ok(HashMap::new());
        }

        let requests: Vec<String> = devs
            .iter()
            .map(|dev| encode_request(&["LIST", "VAR", dev]))
            .collect();
        self.send_async_queries(&requests)?;

        let mut result = HashMap::new();
        let mut last_err = None;
        for dev in devs {
            match self.read_list_body(&["VAR", dev]) {
                Ok(rows) => {
                    let mut vars = HashMap::new();
                    for row in rows {
                        if row.len() >= 3 && row[0] == "VAR" {
                            vars.entry(row[2].clone())
                                .or_insert_with(Vec::new)
                                .push(row.get(3).cloned().unwrap_or_default());
                        }
                    }
                    result.insert(dev.clone(), vars);
                }
                Err(err) => {
                    warn!(device = %dev, error = %err, "batched variable fetch failed for device");
                    last_err = Some(err);
                }
            }
        }
        if result.is_empty() {
            if let Some(err) = last_err {
                return Err(err);
            }
        }
        Ok(result)
    }
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

impl UpsClient for TcpUpsClient {
    fn authenticate(&mut self, username: &str, password: &str) -> Result<()> {
        self.send_query(&encode_request(&["USERNAME", username]))?;
        self.send_query(&encode_request(&["PASSWORD", password]))?;
        self.state = ConnectionState::Authenticated;
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        // Best-effort: a server that has already hung up or errors on
        // LOGOUT still leaves us wanting to be Disconnected locally.
        let _ = self.send_query("LOGOUT");
        self.force_disconnect();
        Ok(())
    }

    fn device_names(&mut self) -> Result<Vec<String>> {
        self.list(&["UPS"]).map(|rows| {
            rows.into_iter()
                .filter(|r| r.len() >= 2 && r[0] == "UPS")
                .map(|r| r[1].clone())
                .collect()
        })
    }

    fn device_description(&mut self, dev: &str) -> Result<String> {
        let value = self.get(&["GET", "UPSDESC", dev])?;
        Ok(value.into_iter().next().unwrap_or_default())
    }

    fn device_variable_names(&mut self, dev: &str) -> Result<Vec<String>> {
        self.list(&["VAR", dev]).map(|rows| {
            rows.into_iter()
                .filter(|r| r.len() >= 3 && r[0] == "VAR")
                .map(|r| r[2].clone())
                .collect()
        })
    }

    fn device_rw_variable_names(&mut self, dev: &str) -> Result<Vec<String>> {
        self.list(&["RW", dev]).map(|rows| {
            rows.into_iter()
                .filter(|r| r.len() >= 3 && r[0] == "RW")
                .map(|r| r[2].clone())
                .collect()
        })
    }

    fn device_variable_description(&mut self, dev: &str, name: &str) -> Result<String> {
        let value = self.get(&["GET", "DESC", dev, name])?;
        Ok(value.into_iter().next().unwrap_or_default())
    }

    fn device_variable_value(&mut self, dev: &str, name: &str) -> Result<Vec<String>> {
        self.get(&["GET", "VAR", dev, name])
    }

    fn set_device_variable(&mut self, dev: &str, name: &str, value: &str) -> Result<TrackingId> {
        let line = encode_request_with_value(&["SET", "VAR", dev, name], value);
        let reply = self.send_query(&line)?;
        parse_ok_reply(&reply)
    }

    fn set_device_variable_values(
        &mut self,
        dev: &str,
        name: &str,
        values: &[String],
    ) -> Result<TrackingId> {
        let mut line = encode_request(&["SET", "VAR", dev, name]);
        for value in values {
            line.push(' ');
            line.push_str(&nut_proto::tokenizer::quote_for_wire(value));
        }
        let reply = self.send_query(&line)?;
        parse_ok_reply(&reply)
    }

    fn device_command_names(&mut self, dev: &str) -> Result<Vec<String>> {
        self.list(&["CMD", dev]).map(|rows| {
            rows.into_iter()
                .filter(|r| r.len() >= 3 && r[0] == "CMD")
                .map(|r| r[2].clone())
                .collect()
        })
    }

    fn device_command_description(&mut self, dev: &str, name: &str) -> Result<String> {
        let value = self.get(&["GET", "CMDDESC", dev, name])?;
        Ok(value.into_iter().next().unwrap_or_default())
    }

    fn execute_device_command(
        &mut self,
        dev: &str,
        name: &str,
        param: Option<&str>,
    ) -> Result<TrackingId> {
        let line = match param {
            Some(p) => encode_request_with_value(&["INSTCMD", dev, name], p),
            None => encode_request(&["INSTCMD", dev, name]),
        };
        let reply = self.send_query(&line)?;
        parse_ok_reply(&reply)
    }

    fn device_login(&mut self, dev: &str) -> Result<()> {
        self.send_query(&encode_request(&["LOGIN", dev])).map(|_| ())
    }

    fn device_get_num_logins(&mut self, dev: &str) -> Result<i32> {
        let value = self.get(&["GET", "NUMLOGINS", dev])?;
        value
            .into_iter()
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::InvalidResponse("GET NUMLOGINS".to_string()))
    }

    fn device_primary(&mut self, dev: &str) -> Result<()> {
        self.send_query(&encode_request(&["PRIMARY", dev])).map(|_| ())
    }

    fn device_master(&mut self, dev: &str) -> Result<()> {
        self.send_query(&encode_request(&["MASTER", dev])).map(|_| ())
    }

    fn device_forced_shutdown(&mut self, dev: &str) -> Result<()> {
        self.send_query(&encode_request(&["FSD", dev])).map(|_| ())
    }

    fn list_device_clients(&mut self) -> Result<HashMap<String, Vec<String>>> {
        let names = self.device_names()?;
        let mut result = HashMap::new();
        for dev in names {
            result.insert(dev.clone(), self.device_get_clients(&dev)?);
        }
        Ok(result)
    }

    fn device_get_clients(&mut self, dev: &str) -> Result<Vec<String>> {
        self.list(&["CLIENT", dev]).map(|rows| {
            rows.into_iter()
                .filter(|r| r.len() >= 3 && r[0] == "CLIENT")
                .map(|r| r[2].clone())
                .collect()
        })
    }

    fn tracking_result(&mut self, id: &TrackingId) -> Result<TrackingResult> {
        if id.is_empty() {
            return Ok(TrackingResult::Success);
        }
        let line = encode_request(&["GET", "TRACKING", id]);
        match self.send_query(&line) {
            Ok(reply) => match reply.as_str() {
                "PENDING" => Ok(TrackingResult::Pending),
                "SUCCESS" => Ok(TrackingResult::Success),
                other => {
                    warn!(reply = %other, "unrecognized tracking reply, treating as failure");
                    Ok(TrackingResult::Failure)
                }
            },
            Err(Error::Protocol { code }) if code == "INVALID-ARGUMENT" => {
                Ok(TrackingResult::InvalidArgument)
            }
            Err(Error::Protocol { code }) if code == "UNKNOWN" => Ok(TrackingResult::Unknown),
            Err(Error::Protocol { .. }) => Ok(TrackingResult::Failure),
            Err(e) => Err(e),
        }
    }

    fn is_feature_enabled(&mut self, feature: &str) -> Result<bool> {
        let reply = self.send_query(&encode_request(&["GET", feature]))?;
        match reply.as_str() {
            "ON" => Ok(true),
            "OFF" => Ok(false),
            other => Err(Error::InvalidResponse(other.to_string())),
        }
    }

    fn set_feature(&mut self, feature: &str, status: bool) -> Result<()> {
        let flag = if status { "ON" } else { "OFF" };
        self.send_query(&encode_request(&["SET", feature, flag]))
            .map(|_| ())
    }
}

fn parse_ok_reply(reply: &str) -> Result<TrackingId> {
    match parse_reply_line(reply) {
        Reply::Ok => Ok(TrackingId::new()),
        Reply::OkTracking(id) => Ok(id),
        Reply::Err(code) => Err(Error::Protocol { code }),
        Reply::Tokens(_) => Err(Error::InvalidResponse(reply.to_string())),
    }
}

impl Drop for TcpUpsClient {
    fn drop(&mut self) {
        // Best-effort: never panics, never blocks indefinitely thanks to
        // the configured socket timeout.
        if self.is_connected() {
            self.force_disconnect();
        }
    }
}
