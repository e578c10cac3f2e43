use std::io::Read;
use std::mem;
use std::thread;

use tracing::{debug, warn};

/// Bytes that close a complete message.
pub const TRAILER: &[u8] = b"\nf\n";
/// A message consisting of nothing but the end marker.
const BARE_END: &[u8] = b"f\n";
pub const MAX_MESSAGE_LEN: usize = 65_535 - 128;
const READ_CHUNK: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("message exceeds {max} bytes without a trailer")]
    MessageTooLong { max: usize },
    #[error("input closed")]
    Closed,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One complete protocol message, trailer included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    bytes: Vec<u8>,
}

impl Message {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Splits a byte stream into [`Message`]s.
pub struct Framer {
    pending: Vec<u8>,
    max_len: usize,
}

impl Framer {
    pub fn new() -> Self {
        Self::with_limit(MAX_MESSAGE_LEN)
    }

    pub fn with_limit(max_len: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_len,
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn advance(&mut self, input: &[u8], messages: &mut Vec<Message>) -> Result<(), FeedError> {
        for &byte in input {
            self.pending.push(byte);
            if self.pending.ends_with(TRAILER) || self.pending == BARE_END {
                messages.push(Message {
                    bytes: mem::take(&mut self.pending),
                });
            } else if self.pending.len() >= self.max_len {
                self.pending.clear();
                return Err(FeedError::MessageTooLong { max: self.max_len });
            }
        }
        Ok(())
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub enum FeedEvent {
    Message(Message),
    Failed(FeedError),
}

/// Reads `reader` on a background thread and hands every complete message to
/// `sink`. The thread stops after the first failure or when `sink` returns
/// `false`.
pub fn spawn_reader<R, F>(reader: R, sink: F) -> thread::JoinHandle<()>
where
    R: Read + Send + 'static,
    F: FnMut(FeedEvent) -> bool + Send + 'static,
{
    thread::spawn(move || read_messages(reader, sink))
}

fn read_messages<R, F>(mut reader: R, mut sink: F)
where
    R: Read,
    F: FnMut(FeedEvent) -> bool,
{
    let mut framer = Framer::new();
    let mut buffer = [0u8; READ_CHUNK];
    let mut messages = Vec::new();
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => {
                let _ = sink(FeedEvent::Failed(FeedError::Closed));
                break;
            }
            Ok(n) => n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => {
                warn!("input read failed: {err}");
                let _ = sink(FeedEvent::Failed(err.into()));
                break;
            }
        };

        if let Err(err) = framer.advance(&buffer[..read], &mut messages) {
            let _ = sink(FeedEvent::Failed(err));
            break;
        }
        for message in messages.drain(..) {
            debug!("received message of {} bytes", message.len());
            if !sink(FeedEvent::Message(message)) {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn frames_on_trailer() {
        let mut framer = Framer::new();
        let mut messages = Vec::new();
        framer.advance(b"0\n1hi\ne", &mut messages).unwrap();
        assert!(messages.is_empty());
        framer.advance(b"\nf\n", &mut messages).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].as_bytes(), b"0\n1hi\ne\nf\n");
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn splits_several_messages_in_one_chunk() {
        let mut framer = Framer::new();
        let mut messages = Vec::new();
        framer
            .advance(b"a\n1x\ne\nf\na\n1y\ne\nf\na\n", &mut messages)
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].as_bytes(), b"a\n1y\ne\nf\n");
        assert_eq!(framer.pending_len(), 2);
    }

    #[test]
    fn bare_end_marker_is_a_message() {
        let mut framer = Framer::new();
        let mut messages = Vec::new();
        framer.advance(b"f\n", &mut messages).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].as_bytes(), b"f\n");
    }

    #[test]
    fn text_containing_f_does_not_end_message() {
        let mut framer = Framer::new();
        let mut messages = Vec::new();
        framer.advance(b"0\n1f\n", &mut messages).unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn rejects_oversized_message() {
        let mut framer = Framer::with_limit(8);
        let mut messages = Vec::new();
        let err = framer.advance(b"0\n1abcdefgh", &mut messages).unwrap_err();
        assert!(matches!(err, FeedError::MessageTooLong { max: 8 }));
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn reader_delivers_messages_then_reports_close() {
        let input = Cursor::new(b"0\n1a\ne\nf\n0\n1b\ne\nf\n".to_vec());
        let mut events = Vec::new();
        read_messages(input, |event| {
            events.push(event);
            true
        });
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], FeedEvent::Message(m) if m.as_bytes() == b"0\n1a\ne\nf\n"));
        assert!(matches!(&events[1], FeedEvent::Message(m) if m.as_bytes() == b"0\n1b\ne\nf\n"));
        assert!(matches!(events[2], FeedEvent::Failed(FeedError::Closed)));
    }

    #[test]
    fn reader_stops_when_sink_refuses() {
        let input = Cursor::new(b"f\nf\nf\n".to_vec());
        let mut count = 0;
        read_messages(input, |_| {
            count += 1;
            false
        });
        assert_eq!(count, 1);
    }

    #[test]
    fn spawned_reader_runs_to_close() {
        let (tx, rx) = std::sync::mpsc::channel();
        let handle = spawn_reader(Cursor::new(b"f\n".to_vec()), move |event| tx.send(event).is_ok());
        handle.join().unwrap();
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], FeedEvent::Failed(FeedError::Closed)));
    }
}
