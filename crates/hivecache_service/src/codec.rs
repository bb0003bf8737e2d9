// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Path and response codecs for the peer wire format.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use hivecache::Error;
use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Path prefix under which peers address each other.
pub const DEFAULT_BASE_PATH: &str = "/api/cache/";

/// Builds the request path `<base>/<group>/<key>`.
///
/// Group and key are percent-escaped, so keys containing `/` or arbitrary
/// UTF-8 survive the round trip through [`parse_path`].
#[must_use]
pub fn request_path(base: &str, group: &str, key: &str) -> String {
    let group = utf8_percent_encode(group, NON_ALPHANUMERIC);
    let key = utf8_percent_encode(key, NON_ALPHANUMERIC);
    let slash = if base.ends_with('/') { "" } else { "/" };
    format!("{base}{slash}{group}/{key}")
}

/// Splits a request path into its group and key components.
///
/// # Errors
///
/// [`Error::BadPath`] when the path is outside `base`, lacks a group/key
/// pair, or a component does not decode as UTF-8.
pub fn parse_path(base: &str, path: &str) -> Result<(String, String), Error> {
    let rest = path
        .strip_prefix(base)
        .ok_or_else(|| Error::BadPath(format!("{path} is outside {base}")))?;
    let rest = rest.strip_prefix('/').unwrap_or(rest);

    let (group, key) = rest
        .split_once('/')
        .ok_or_else(|| Error::BadPath(format!("{path} is missing a group/key pair")))?;

    Ok((decode_component(group, path)?, decode_component(key, path)?))
}

fn decode_component(component: &str, path: &str) -> Result<String, Error> {
    percent_decode_str(component)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| Error::BadPath(format!("{path} contains a non-utf8 component")))
}

/// Frames a value as a length-prefixed message: a big-endian u32 length
/// followed by the value bytes.
#[must_use]
pub fn encode_response(value: &[u8]) -> Bytes {
    let mut frame = BytesMut::with_capacity(4 + value.len());
    frame.put_u32(value.len() as u32);
    frame.put_slice(value);
    frame.freeze()
}

/// Recovers the value from a length-prefixed message.
///
/// # Errors
///
/// [`Error::BadFrame`] when the frame is shorter than its header or its
/// length prefix disagrees with the body.
pub fn decode_response(frame: &[u8]) -> Result<Bytes, Error> {
    let mut buf = frame;
    if buf.remaining() < 4 {
        return Err(Error::BadFrame(format!("frame of {} bytes has no length prefix", frame.len())));
    }
    let declared = buf.get_u32() as usize;
    if buf.remaining() != declared {
        return Err(Error::BadFrame(format!(
            "length prefix says {declared} bytes but the body has {}",
            buf.remaining()
        )));
    }
    Ok(Bytes::copy_from_slice(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_round_trips_awkward_components() {
        let path = request_path(DEFAULT_BASE_PATH, "user profiles", "a/b c%d");
        let (group, key) = parse_path(DEFAULT_BASE_PATH, &path).expect("round trip should parse");
        assert_eq!(group, "user profiles");
        assert_eq!(key, "a/b c%d");
    }

    #[test]
    fn base_without_trailing_slash_is_joined() {
        let path = request_path("/api/cache", "g", "k");
        assert_eq!(path, "/api/cache/g/k");
        let (group, key) = parse_path("/api/cache", &path).expect("round trip should parse");
        assert_eq!((group.as_str(), key.as_str()), ("g", "k"));
    }

    #[test]
    fn foreign_paths_are_rejected() {
        let result = parse_path(DEFAULT_BASE_PATH, "/metrics");
        assert!(matches!(result, Err(Error::BadPath(_))));
    }

    #[test]
    fn paths_without_a_key_are_rejected() {
        let result = parse_path(DEFAULT_BASE_PATH, "/api/cache/only-a-group");
        assert!(matches!(result, Err(Error::BadPath(_))));
    }

    #[test]
    fn response_frame_round_trips() {
        let frame = encode_response(b"cached bytes");
        let value = decode_response(&frame).expect("frame should decode");
        assert_eq!(&value[..], b"cached bytes");
    }

    #[test]
    fn empty_value_frames_cleanly() {
        let frame = encode_response(b"");
        assert_eq!(frame.len(), 4);
        let value = decode_response(&frame).expect("frame should decode");
        assert!(value.is_empty());
    }

    #[test]
    fn truncated_frames_are_rejected() {
        assert!(matches!(decode_response(b"\x00"), Err(Error::BadFrame(_))));

        let mut frame = encode_response(b"cached bytes").to_vec();
        frame.truncate(frame.len() - 3);
        assert!(matches!(decode_response(&frame), Err(Error::BadFrame(_))));
    }
}
