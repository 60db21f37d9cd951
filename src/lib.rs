use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use serde::{Deserialize, Serialize};

pub mod config;
pub mod error;
pub mod export;
pub mod listener;
pub mod monitor;
pub mod param;
pub mod report;
pub mod sample;
pub mod session;
pub mod status;
pub mod validate;

pub use config::{MonitorConfig, Retention};
pub use error::{DecodeError, MonitorError, WireError};
pub use listener::Listener;
pub use monitor::{Monitor, StoppedMonitor};
pub use param::{AuxField, Param, Slot};
pub use report::{LogSink, ReportSink};
pub use sample::{PendingSample, Sample};
pub use session::MonitorSession;
pub use status::{StatusObservation, StatusReporter};
pub use validate::{FinalReport, MismatchEvent, Summary, ValidationAggregate, Verdict};

/// Smallest valid message: a 4-byte address block plus a 4-byte type tag block.
pub const MIN_PACKET_LEN: usize = 8;

/// How the decoder treats type tags other than `f` and `i`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagPolicy {
    /// Skip 4 bytes per unknown tag and keep going.
    #[default]
    Lenient,
    /// Reject the whole message.
    Strict,
}

/// Argument accepted by [`encode`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum OscArg {
    Float(f32),
    Int(i32),
}

impl OscArg {
    pub fn tag(self) -> char {
        match self {
            OscArg::Float(_) => 'f',
            OscArg::Int(_) => 'i',
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            OscArg::Float(v) => f64::from(v),
            OscArg::Int(v) => f64::from(v),
        }
    }
}

/// A decoded message: address plus its numeric arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct OscMessage {
    pub path: String,
    /// Floats and integers both widen losslessly to `f64`.
    pub args: Vec<f64>,
}

impl OscMessage {
    pub fn first_arg(&self) -> Option<f64> {
        self.args.first().copied()
    }
}

/// Length of a NUL-terminated string of `n` bytes once padded to 4 bytes.
pub fn padded_len(n: usize) -> usize {
    (n + 4) & !3
}

/// Read a NUL-terminated, 4-byte aligned string starting at `offset`.
///
/// Returns the string and the offset just past its padding. An unterminated
/// string yields `""` and the buffer length.
fn read_padded_str(data: &[u8], offset: usize) -> (String, usize) {
    let rest = data.get(offset..).unwrap_or(&[]);
    match rest.iter().position(|&b| b == 0) {
        Some(end) => (
            String::from_utf8_lossy(&rest[..end]).into_owned(),
            offset + padded_len(end),
        ),
        None => (String::new(), data.len()),
    }
}

/// The 4 bytes at `offset`, or zeros if the packet is truncated there.
fn word_at(data: &[u8], offset: usize) -> [u8; 4] {
    data.get(offset..offset + 4)
        .and_then(|w| w.try_into().ok())
        .unwrap_or([0; 4])
}

/// Decode one datagram, reporting why it was rejected.
pub fn try_decode(data: &[u8], policy: TagPolicy) -> Result<OscMessage, DecodeError> {
    if data.len() < MIN_PACKET_LEN {
        return Err(DecodeError::TooShort(data.len()));
    }

    let (path, offset) = read_padded_str(data, 0);
    if !path.starts_with('/') {
        return Err(DecodeError::BadAddress(path));
    }

    let (type_tags, mut offset) = read_padded_str(data, offset);
    let tags = match type_tags.strip_prefix(',') {
        Some(tags) => tags,
        None => return Err(DecodeError::BadTypeTag(type_tags)),
    };

    if policy == TagPolicy::Strict {
        if let Some(c) = tags.chars().find(|c| !matches!(c, 'f' | 'i')) {
            return Err(DecodeError::UnsupportedTag(c));
        }
    }

    let mut args = Vec::with_capacity(tags.len());
    for tag in tags.chars() {
        let word = word_at(data, offset);
        offset += 4;
        match tag {
            'f' => args.push(f64::from(BigEndian::read_f32(&word))),
            'i' => args.push(f64::from(BigEndian::read_i32(&word))),
            // Fixed-width assumption: variable-width arguments desync what follows.
            _ => {}
        }
    }

    Ok(OscMessage { path, args })
}

/// Decode one datagram, dropping anything malformed.
pub fn decode(data: &[u8]) -> Option<OscMessage> {
    decode_with(data, TagPolicy::Lenient)
}

/// Like [`decode`], but rejects messages carrying non-`f`/`i` arguments.
pub fn decode_strict(data: &[u8]) -> Option<OscMessage> {
    decode_with(data, TagPolicy::Strict)
}

pub fn decode_with(data: &[u8], policy: TagPolicy) -> Option<OscMessage> {
    match try_decode(data, policy) {
        Ok(msg) => Some(msg),
        Err(e) => {
            tracing::debug!(len = data.len(), error = %e, "dropping malformed packet");
            None
        }
    }
}

fn write_padded_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(s.as_bytes());
    buf.resize(buf.len() + padded_len(s.len()) - s.len(), 0);
}

/// Encode a single message in the wire format accepted by [`decode`].
pub fn encode(path: &str, args: &[OscArg]) -> Result<Vec<u8>, WireError> {
    if !path.starts_with('/') || path.contains('\0') {
        return Err(WireError::BadAddress(path.to_string()));
    }

    let mut type_tags = String::with_capacity(args.len() + 1);
    type_tags.push(',');
    type_tags.extend(args.iter().map(|a| a.tag()));

    let capacity = padded_len(path.len()) + padded_len(type_tags.len()) + 4 * args.len();
    let mut buf = Vec::with_capacity(capacity);
    write_padded_str(&mut buf, path);
    write_padded_str(&mut buf, &type_tags);

    for arg in args {
        match *arg {
            OscArg::Float(v) => buf.write_f32::<BigEndian>(v)?,
            OscArg::Int(v) => buf.write_i32::<BigEndian>(v)?,
        }
    }

    Ok(buf)
}
