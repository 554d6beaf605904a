//! Packet framing for the session's stdio channel.
//!
//! Every packet is `qbsmsg:<N>\n` followed by N bytes of base64 that decode
//! to one compact JSON object.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::request::Request;
use crate::response::Response;

pub const PACKET_MAGIC: &[u8] = b"qbsmsg:";

/// Largest payload a header may announce; bigger lengths are framing errors
pub const MAX_PACKET_LENGTH: usize = 64 * 1024 * 1024;

/// Frame a request for the wire.
pub fn encode(request: &Request) -> Result<Vec<u8>> {
    let value = serde_json::to_value(request)?;
    Ok(encode_value(&value))
}

/// Frame an arbitrary JSON object.
pub fn encode_value(value: &Value) -> Vec<u8> {
    let payload = STANDARD.encode(value.to_string());
    let mut packet = Vec::with_capacity(PACKET_MAGIC.len() + 12 + payload.len());
    packet.extend_from_slice(PACKET_MAGIC);
    packet.extend_from_slice(payload.len().to_string().as_bytes());
    packet.push(b'\n');
    packet.extend_from_slice(payload.as_bytes());
    packet
}

/// Decode one packet payload (the base64 body) into a typed response.
pub fn decode(payload: &[u8]) -> Result<Response> {
    Ok(Response::from_value(&decode_value(payload)?))
}

/// Decode one packet payload into the raw JSON object it carries.
pub fn decode_value(payload: &[u8]) -> Result<Value> {
    let json = STANDARD.decode(trim_ascii(payload))?;
    Ok(serde_json::from_slice(&json)?)
}

/// Incremental splitter for the inbound byte stream.
///
/// Feed raw reads with `push`, then drain complete payloads with
/// `next_payload` until it returns `None`.
#[derive(Debug, Default)]
pub struct PacketReader {
    buf: Vec<u8>,
}

impl PacketReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Next complete payload, or a framing error for bytes that were skipped.
    ///
    /// Errors are not sticky: the reader resynchronizes on the next magic.
    pub fn next_payload(&mut self) -> Option<Result<Vec<u8>>> {
        let Some(start) = find(&self.buf, PACKET_MAGIC) else {
            // Keep a tail that may be the beginning of a split magic.
            let keep = PACKET_MAGIC.len() - 1;
            if self.buf.len() > keep {
                let dropped = self.buf.len() - keep;
                self.buf.drain(..dropped);
                return Some(Err(Error::Framing(format!(
                    "discarded {} bytes of non-packet output",
                    dropped
                ))));
            }
            return None;
        };

        if start > 0 {
            self.buf.drain(..start);
            return Some(Err(Error::Framing(format!(
                "discarded {} bytes before packet header",
                start
            ))));
        }

        let header_end = self.buf.iter().position(|&b| b == b'\n')?;
        let header = &self.buf[PACKET_MAGIC.len()..header_end];
        let length = std::str::from_utf8(header)
            .ok()
            .and_then(|text| text.split(':').next())
            .and_then(|text| text.trim().parse::<usize>().ok());

        let Some(length) = length.filter(|&n| n <= MAX_PACKET_LENGTH) else {
            let text = String::from_utf8_lossy(header).into_owned();
            self.buf.drain(..=header_end);
            return Some(Err(Error::Framing(format!(
                "invalid packet length '{}'",
                text
            ))));
        };

        let body_start = header_end + 1;
        if self.buf.len() < body_start + length {
            return None;
        }

        let payload = self.buf[body_start..body_start + length].to_vec();
        self.buf.drain(..body_start + length);
        Some(Ok(payload))
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationType;
    use crate::request::{
        BuildRequest, CleanRequest, InstallRequest, ResolveRequest, RunEnvironmentRequest,
    };
    use crate::settings::DefaultSettings;
    use serde_json::json;

    fn read_all(reader: &mut PacketReader) -> Vec<Result<Vec<u8>>> {
        let mut out = Vec::new();
        while let Some(item) = reader.next_payload() {
            out.push(item);
        }
        out
    }

    fn decode_request(packet: &[u8]) -> Value {
        let mut reader = PacketReader::new();
        reader.push(packet);
        let payload = reader.next_payload().unwrap().unwrap();
        decode_value(&payload).unwrap()
    }

    #[test]
    fn test_request_and_matching_result_round_trip() {
        let settings = DefaultSettings;
        let cases = [
            (
                Request::Resolve(ResolveRequest::new(&settings)),
                "project-resolved",
                OperationType::Resolve,
            ),
            (
                Request::Build(BuildRequest::new(&settings)),
                "project-built",
                OperationType::Build,
            ),
            (
                Request::Clean(CleanRequest::new(&settings)),
                "project-cleaned",
                OperationType::Clean,
            ),
            (
                Request::Install(InstallRequest::new(&settings)),
                "install-done",
                OperationType::Install,
            ),
        ];

        for (request, reply_type, expected) in cases {
            let sent = decode_request(&encode(&request).unwrap());
            assert_eq!(sent["type"], request.type_name());
            assert_eq!(request.kind().operation_type(), Some(expected));

            let reply = encode_value(&json!({ "type": reply_type }));
            let mut reader = PacketReader::new();
            reader.push(&reply);
            let response = decode(&reader.next_payload().unwrap().unwrap()).unwrap();
            match response {
                Response::OperationResult(result) => assert_eq!(result.operation, expected),
                other => panic!("unexpected response {:?}", other),
            }
        }

        let request = Request::GetRunEnvironment(RunEnvironmentRequest::for_product("app"));
        let sent = decode_request(&encode(&request).unwrap());
        assert_eq!(sent["product"], "app");
        let reply = encode_value(&json!({ "type": "run-environment", "full-environment": {} }));
        let mut reader = PacketReader::new();
        reader.push(&reply);
        let response = decode(&reader.next_payload().unwrap().unwrap()).unwrap();
        assert!(matches!(response, Response::RunEnvironment(_)));
    }

    #[test]
    fn test_split_reads_reassemble() {
        let packet = encode_value(&json!({ "type": "task-progress", "progress": 4 }));
        let mut reader = PacketReader::new();

        let (head, tail) = packet.split_at(5);
        reader.push(head);
        assert!(reader.next_payload().is_none());

        let (mid, rest) = tail.split_at(tail.len() / 2);
        reader.push(mid);
        assert!(reader.next_payload().is_none());

        reader.push(rest);
        let payload = reader.next_payload().unwrap().unwrap();
        assert_eq!(
            decode(&payload).unwrap(),
            Response::TaskProgress { progress: 4 }
        );
        assert!(reader.next_payload().is_none());
    }

    #[test]
    fn test_back_to_back_packets() {
        let mut bytes = encode_value(&json!({ "type": "task-progress", "progress": 1 }));
        bytes.extend(encode_value(&json!({ "type": "task-progress", "progress": 2 })));

        let mut reader = PacketReader::new();
        reader.push(&bytes);
        let payloads = read_all(&mut reader);

        assert_eq!(payloads.len(), 2);
        let second = decode(payloads[1].as_ref().unwrap()).unwrap();
        assert_eq!(second, Response::TaskProgress { progress: 2 });
    }

    #[test]
    fn test_garbage_is_reported_and_skipped() {
        let mut bytes = b"Qt: warning\n".to_vec();
        bytes.extend(encode_value(&json!({ "type": "hello", "api-level": 2, "api-compat-level": 2 })));

        let mut reader = PacketReader::new();
        reader.push(&bytes);
        let items = read_all(&mut reader);

        assert_eq!(items.len(), 2);
        assert!(matches!(items[0], Err(Error::Framing(_))));
        let hello = decode(items[1].as_ref().unwrap()).unwrap();
        assert_eq!(
            hello,
            Response::Hello {
                api_level: 2,
                api_compat_level: 2
            }
        );
    }

    #[test]
    fn test_bad_length_header_resynchronizes() {
        let mut bytes = b"qbsmsg:xyz\n".to_vec();
        bytes.extend(encode_value(&json!({ "type": "task-progress", "progress": 9 })));

        let mut reader = PacketReader::new();
        reader.push(&bytes);
        let items = read_all(&mut reader);

        assert!(matches!(items[0], Err(Error::Framing(_))));
        let last = items.last().unwrap().as_ref().unwrap();
        assert_eq!(decode(last).unwrap(), Response::TaskProgress { progress: 9 });
    }

    #[test]
    fn test_oversized_length_is_skipped() {
        let mut reader = PacketReader::new();
        reader.push(b"qbsmsg:99999999999\n");
        reader.push(&encode_value(&json!({ "type": "project-built" })));

        let items = read_all(&mut reader);
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0], Err(Error::Framing(_))));
        let payload = items[1].as_ref().unwrap();
        assert!(matches!(
            decode(payload).unwrap(),
            Response::OperationResult(_)
        ));
    }

    #[test]
    fn test_invalid_payload_is_a_decode_error() {
        assert!(matches!(decode(b"!!!"), Err(Error::Base64(_))));
        let not_json = STANDARD.encode("not json");
        assert!(matches!(decode(not_json.as_bytes()), Err(Error::Json(_))));
    }
}
