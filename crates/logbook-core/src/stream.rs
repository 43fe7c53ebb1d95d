//! Line-oriented journal reader.
//!
//! Journal files are newline-delimited JSON. [`JournalReader`] decodes them
//! in order with a single [`Decoder`], so sequence ids follow line order.
//! Lines that cannot be attributed to any kind are logged, counted and
//! skipped; they never stop the stream.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::warn;

use crate::event::{DecodedEvent, EventData, PassthroughReason};
use crate::registry::Decoder;

/// Counters kept while reading a journal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    /// Non-blank lines read.
    pub lines: u64,
    /// Events produced, passthrough included.
    pub decoded: u64,
    /// Unregistered tags.
    pub unknown: u64,
    /// Withdrawn tags.
    pub withdrawn: u64,
    /// Registered tags whose mandatory fields were unusable.
    pub malformed: u64,
    /// Lines that were not a JSON object with an `event` tag.
    pub unreadable: u64,
    /// Events per journal tag.
    pub per_tag: BTreeMap<String, u64>,
}

impl StreamStats {
    fn record(&mut self, event: &DecodedEvent) {
        self.decoded += 1;
        *self.per_tag.entry(event.tag().to_string()).or_insert(0) += 1;
        if let EventData::Passthrough(p) = event.data() {
            match p.reason {
                PassthroughReason::Malformed { .. } => self.malformed += 1,
                PassthroughReason::Withdrawn => self.withdrawn += 1,
                PassthroughReason::Unknown => self.unknown += 1,
            }
        }
    }

    /// Events that decoded into a typed or generic payload.
    #[must_use]
    pub const fn typed(&self) -> u64 {
        self.decoded - self.unknown - self.withdrawn - self.malformed
    }
}

/// Decodes a journal one line at a time.
pub struct JournalReader<R> {
    reader: R,
    decoder: Decoder,
    stats: StreamStats,
    line_no: u64,
    buf: Vec<u8>,
}

impl JournalReader<BufReader<File>> {
    /// Open a journal file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: &Path, decoder: Decoder) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?), decoder))
    }
}

impl<R: BufRead> JournalReader<R> {
    /// Wrap a reader.
    pub const fn new(reader: R, decoder: Decoder) -> Self {
        Self {
            reader,
            decoder,
            stats: StreamStats {
                lines: 0,
                decoded: 0,
                unknown: 0,
                withdrawn: 0,
                malformed: 0,
                unreadable: 0,
                per_tag: BTreeMap::new(),
            },
            line_no: 0,
            buf: Vec::new(),
        }
    }

    /// Counters so far.
    pub const fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// The decoder, for completion with the same tables.
    pub const fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Give back the decoder and the final counters.
    pub fn finish(self) -> (Decoder, StreamStats) {
        (self.decoder, self.stats)
    }

    /// Decode the next event, skipping blank and unreadable lines.
    ///
    /// # Errors
    ///
    /// Returns an error only when the underlying reader fails.
    pub fn next_event(&mut self) -> io::Result<Option<DecodedEvent>> {
        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let line_no = self.line_no;

            let Ok(text) = std::str::from_utf8(&self.buf) else {
                self.stats.lines += 1;
                self.stats.unreadable += 1;
                warn!(line = line_no, "journal line is not UTF-8");
                continue;
            };
            let line = text.trim_start_matches('\u{feff}').trim();
            if line.is_empty() {
                continue;
            }
            self.stats.lines += 1;

            match self.decoder.decode_line(line) {
                Ok(event) => {
                    self.stats.record(&event);
                    return Ok(Some(event));
                }
                Err(error) => {
                    self.stats.unreadable += 1;
                    warn!(line = line_no, %error, code = %error.code(), "unreadable journal line");
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for JournalReader<R> {
    type Item = io::Result<DecodedEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOURNAL: &str = concat!(
        "\u{feff}{\"timestamp\":\"2023-01-01T00:00:00Z\",\"event\":\"Fileheader\",\"part\":1,\"language\":\"English/UK\",\"gameversion\":\"4.0.0.1450\",\"build\":\"r286858/r0 \"}\n",
        "\n",
        "{\"timestamp\":\"2023-01-01T00:00:01Z\",\"event\":\"Commander\",\"FID\":\"F1\",\"Name\":\"Jameson\"}\n",
        "not json at all\n",
        "{\"timestamp\":\"2023-01-01T00:00:02Z\",\"event\":\"CarrierStats\",\"CarrierID\":1}\r\n",
        "{\"timestamp\":\"2023-01-01T00:00:03Z\",\"event\":\"EngineerApply\",\"Engineer\":\"Felicity Farseer\"}\n",
        "{\"timestamp\":\"2023-01-01T00:00:04Z\",\"event\":\"Docked\"}\n",
        "{\"timestamp\":\"2023-01-01T00:00:05Z\",\"event\":\"Shutdown\"}",
    );

    #[test]
    fn reads_every_attributable_line_in_order() {
        let mut reader = JournalReader::new(JOURNAL.as_bytes(), Decoder::builtin());
        let events: Vec<DecodedEvent> = reader
            .by_ref()
            .collect::<io::Result<_>>()
            .expect("read");
        let tags: Vec<&str> = events.iter().map(DecodedEvent::tag).collect();
        assert_eq!(
            tags,
            [
                "Fileheader",
                "Commander",
                "CarrierStats",
                "EngineerApply",
                "Docked",
                "Shutdown"
            ]
        );
        let ids: Vec<u64> = events.iter().map(DecodedEvent::sequence_id).collect();
        assert_eq!(ids, [0, 1, 2, 3, 4, 5]);

        let stats = reader.stats();
        assert_eq!(stats.lines, 7);
        assert_eq!(stats.decoded, 6);
        assert_eq!(stats.unreadable, 1);
        assert_eq!(stats.unknown, 1);
        assert_eq!(stats.withdrawn, 1);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.typed(), 3);
        assert_eq!(stats.per_tag.get("Docked"), Some(&1));
    }

    #[test]
    fn invalid_utf8_is_unreadable() {
        let bytes: &[u8] = b"\xff\xfe\n{\"timestamp\":\"2023-01-01T00:00:00Z\",\"event\":\"Shutdown\"}\n";
        let mut reader = JournalReader::new(bytes, Decoder::builtin());
        let event = reader.next_event().expect("read").expect("event");
        assert_eq!(event.tag(), "Shutdown");
        assert!(reader.next_event().expect("read").is_none());
        let (_, stats) = reader.finish();
        assert_eq!(stats.unreadable, 1);
    }
}
