// ── Binary record decoder ──
//
// Linux input devices emit fixed-size `struct input_event` records:
// a `timeval` (two platform words), then type u16, code u16, value i32,
// all little-endian on every platform this runs on.

use bytes::{Buf, BufMut, BytesMut};
use futures_util::{Stream, StreamExt};
use tokio::io::AsyncRead;
use tokio_util::codec::{Decoder, Encoder, FramedRead};

use crate::error::CoreError;

/// Record layout, selected by the word size of the kernel that wrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLayout {
    /// 32-bit `timeval`: 16-byte records.
    Timeval32,
    /// 64-bit `timeval`: 24-byte records.
    Timeval64,
}

impl RecordLayout {
    /// Layout matching the host's pointer width.
    pub const fn native() -> Self {
        if cfg!(target_pointer_width = "64") {
            Self::Timeval64
        } else {
            Self::Timeval32
        }
    }

    pub const fn record_size(self) -> usize {
        match self {
            Self::Timeval32 => 16,
            Self::Timeval64 => 24,
        }
    }

    pub fn from_record_size(size: usize) -> Option<Self> {
        match size {
            16 => Some(Self::Timeval32),
            24 => Some(Self::Timeval64),
            _ => None,
        }
    }
}

impl Default for RecordLayout {
    fn default() -> Self {
        Self::native()
    }
}

/// One decoded hardware input record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub timestamp_secs: i64,
    pub timestamp_micros: i64,
    pub type_code: u16,
    pub code: u16,
    pub value: i32,
}

/// `tokio_util` codec for input records.
///
/// Incomplete records stay in the read buffer until the rest arrives;
/// [`FramedRead`] hands every complete record out before reading again.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventCodec {
    layout: RecordLayout,
}

impl EventCodec {
    pub fn new(layout: RecordLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> RecordLayout {
        self.layout
    }
}

impl Decoder for EventCodec {
    type Item = RawEvent;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<RawEvent>, Self::Error> {
        let size = self.layout.record_size();
        if src.len() < size {
            src.reserve(size - src.len());
            return Ok(None);
        }

        let mut record = src.split_to(size);
        let (timestamp_secs, timestamp_micros) = match self.layout {
            RecordLayout::Timeval32 => (
                i64::from(record.get_i32_le()),
                i64::from(record.get_i32_le()),
            ),
            RecordLayout::Timeval64 => (record.get_i64_le(), record.get_i64_le()),
        };

        Ok(Some(RawEvent {
            timestamp_secs,
            timestamp_micros,
            type_code: record.get_u16_le(),
            code: record.get_u16_le(),
            value: record.get_i32_le(),
        }))
    }

    /// A partial record at end of stream is left in the buffer, not
    /// reported as a framing error.
    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<RawEvent>, Self::Error> {
        self.decode(buf)
    }
}

impl Encoder<RawEvent> for EventCodec {
    type Error = std::io::Error;

    fn encode(&mut self, event: RawEvent, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(self.layout.record_size());
        match self.layout {
            RecordLayout::Timeval32 => {
                dst.put_i32_le(narrow(event.timestamp_secs)?);
                dst.put_i32_le(narrow(event.timestamp_micros)?);
            }
            RecordLayout::Timeval64 => {
                dst.put_i64_le(event.timestamp_secs);
                dst.put_i64_le(event.timestamp_micros);
            }
        }
        dst.put_u16_le(event.type_code);
        dst.put_u16_le(event.code);
        dst.put_i32_le(event.value);
        Ok(())
    }
}

fn narrow(value: i64) -> Result<i32, std::io::Error> {
    i32::try_from(value).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
}

/// Lazily decode `reader` into raw events.
///
/// The stream is infinite for a live device. When the source hits end of
/// stream or a read error it yields exactly one
/// [`CoreError::StreamClosed`] and ends; it never retries.
pub fn event_stream<R>(reader: R, layout: RecordLayout) -> impl Stream<Item = Result<RawEvent, CoreError>>
where
    R: AsyncRead + Unpin,
{
    async_stream::stream! {
        let mut frames = FramedRead::new(reader, EventCodec::new(layout));
        loop {
            match frames.next().await {
                Some(Ok(event)) => yield Ok(event),
                Some(Err(e)) => {
                    yield Err(CoreError::StreamClosed { reason: e.to_string() });
                    break;
                }
                None => {
                    yield Err(CoreError::StreamClosed { reason: "end of stream".into() });
                    break;
                }
            }
        }
    }
}
