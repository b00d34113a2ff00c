//! Durable message log
//!
//! # Format
//!
//! One JSON object per line, appended in arrival order:
//!
//! ```text
//! {"data":[16,25,1,212],"timestamp":{"secs_since_epoch":1700000000,"nanos_since_epoch":0}}
//! ```
//!
//! There is no header and no index. Every record is flushed as soon as it is
//! written, so an interrupted capture loses at most the record in flight.
//! A clean end of input ends replay; a record cut short is a decode error.

use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};

use serde_json::de::IoRead;
use serde_json::StreamDeserializer;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::RecordError;
use crate::message::Message;

/// Appends messages to a byte sink
///
/// The writer is only set up when the first message arrives.
pub struct Recorder<W: Write> {
    dest: Option<W>,
    writer: Option<BufWriter<W>>,
    written: u64,
}

impl<W: Write> Recorder<W> {
    pub fn new(dest: W) -> Self {
        Self {
            dest: Some(dest),
            writer: None,
            written: 0,
        }
    }

    /// Number of messages recorded so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Append one message and flush it through to the sink
    pub fn record(&mut self, msg: &Message) -> Result<(), RecordError> {
        if self.writer.is_none() {
            if let Some(dest) = self.dest.take() {
                debug!("Recorder opened");
                self.writer = Some(BufWriter::new(dest));
            }
        }
        let Some(writer) = self.writer.as_mut() else {
            return Err(RecordError::Io(ErrorKind::BrokenPipe.into()));
        };

        serde_json::to_writer(&mut *writer, msg).map_err(RecordError::Encode)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        self.written += 1;
        Ok(())
    }

    /// Flush and give back the sink
    pub fn into_inner(self) -> Result<W, RecordError> {
        match (self.writer, self.dest) {
            (Some(writer), _) => writer.into_inner().map_err(|e| e.into_error().into()),
            (None, Some(dest)) => Ok(dest),
            (None, None) => Err(RecordError::Io(ErrorKind::BrokenPipe.into())),
        }
    }
}

/// Record everything arriving on `rx` until the sender side closes
///
/// Blocking; run it on a blocking thread.
pub fn record_from<W: Write>(
    rx: &mut mpsc::Receiver<Message>,
    recorder: &mut Recorder<W>,
) -> Result<u64, RecordError> {
    while let Some(msg) = rx.blocking_recv() {
        recorder.record(&msg)?;
    }
    Ok(recorder.written())
}

/// Streams messages back out of a log, in order
pub struct Reader<R: Read> {
    stream: StreamDeserializer<'static, IoRead<BufReader<R>>, Message>,
    index: u64,
    failed: bool,
}

impl<R: Read> Reader<R> {
    pub fn new(source: R) -> Self {
        Self {
            stream: serde_json::Deserializer::from_reader(BufReader::new(source)).into_iter(),
            index: 0,
            failed: false,
        }
    }
}

impl<R: Read> Iterator for Reader<R> {
    type Item = Result<Message, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let item = match self.stream.next()? {
            Ok(msg) => Ok(msg),
            Err(source) => {
                self.failed = true;
                Err(RecordError::Decode {
                    index: self.index,
                    source,
                })
            }
        };
        self.index += 1;
        Some(item)
    }
}

/// Replay a log into `tx`, stopping at end of input
///
/// Blocking; run it on a blocking thread. Dropping `tx` on return closes the
/// channel, which is how the consumer learns the replay has finished.
pub fn read_in<R: Read>(source: R, tx: mpsc::Sender<Message>) -> Result<u64, RecordError> {
    let mut count = 0;
    for msg in Reader::new(source) {
        tx.blocking_send(msg?)
            .map_err(|_| RecordError::ReceiverGone)?;
        count += 1;
    }
    debug!("Replayed {} messages", count);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn msg(data: &[u8], ms: u64) -> Message {
        Message::new(data, SystemTime::UNIX_EPOCH + Duration::from_millis(ms))
    }

    #[test]
    fn test_nothing_written_until_first_record() {
        let recorder = Recorder::new(Vec::new());
        assert!(recorder.into_inner().unwrap().is_empty());
    }

    #[test]
    fn test_one_line_per_record() {
        let mut recorder = Recorder::new(Vec::new());
        recorder.record(&msg(&[0x11, 0xFE, 0xBA], 1)).unwrap();
        recorder.record(&msg(&[0x10], 2)).unwrap();
        assert_eq!(recorder.written(), 2);

        let out = String::from_utf8(recorder.into_inner().unwrap()).unwrap();
        assert_eq!(out.lines().count(), 2);
        assert!(out.starts_with("{\"data\":[17,254,186]"));
    }

    #[test]
    fn test_empty_log_is_clean_end() {
        assert!(Reader::new(&b""[..]).next().is_none());
        assert!(Reader::new(&b"\n\n"[..]).next().is_none());
    }

    #[test]
    fn test_truncated_record_is_error() {
        let mut recorder = Recorder::new(Vec::new());
        recorder.record(&msg(&[0x10, 0x19], 1)).unwrap();
        recorder.record(&msg(&[0x11, 0xFE], 2)).unwrap();
        let mut bytes = recorder.into_inner().unwrap();
        bytes.truncate(bytes.len() - 10);

        let items: Vec<_> = Reader::new(&bytes[..]).collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), &msg(&[0x10, 0x19], 1));
        assert!(matches!(items[1], Err(RecordError::Decode { index: 1, .. })));
    }

    #[test]
    fn test_garbage_is_error() {
        let mut reader = Reader::new(&b"not json"[..]);
        assert!(matches!(reader.next(), Some(Err(RecordError::Decode { index: 0, .. }))));
        assert!(reader.next().is_none());
    }
}
