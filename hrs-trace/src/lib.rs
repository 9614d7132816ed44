//! Raw PPG traces (`hrs.data`) for tuning the heart rate detection offline.
//!
//! A trace is a sequence of records made of little endian `u16` words:
//! a resync marker (`0xffff`), a timestamp (year, month, day, hour, minute,
//! second) and then the raw sensor samples of one estimation window.
#![cfg_attr(not(test), no_std)]

use arrayvec::ArrayVec;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use core::fmt;

pub const RESYNC_MARKER: [u8; 2] = [0xff, 0xff];
pub const HEADER_LEN: usize = 14;

/// Largest raw value that can be stored without being mistaken for a marker.
pub const MAX_SAMPLE: u16 = 0xfffe;

pub fn encode_header(now: NaiveDateTime) -> [u8; HEADER_LEN] {
    let words = [
        now.year().clamp(0, u16::MAX as i32 - 1) as u16,
        now.month() as u16,
        now.day() as u16,
        now.hour() as u16,
        now.minute() as u16,
        now.second() as u16,
    ];

    let mut header = [0; HEADER_LEN];
    header[..2].copy_from_slice(&RESYNC_MARKER);
    for (o, w) in header[2..].chunks_exact_mut(2).zip(words) {
        o.copy_from_slice(&w.to_le_bytes());
    }
    header
}

/// Collects the raw samples of a session for one estimation window.
pub struct TraceRecorder<const N: usize> {
    raw: ArrayVec<u16, N>,
    dropped: usize,
}

impl<const N: usize> Default for TraceRecorder<N> {
    fn default() -> Self {
        Self {
            raw: ArrayVec::new(),
            dropped: 0,
        }
    }
}

impl<const N: usize> hrm::TraceSink for TraceRecorder<N> {
    fn record_sample(&mut self, raw: u16, _processed: i8) {
        if self.raw.try_push(raw.min(MAX_SAMPLE)).is_err() {
            self.dropped += 1;
        }
    }
}

impl<const N: usize> TraceRecorder<N> {
    /// Append one record with everything collected so far and start over.
    pub fn write_record(&mut self, now: NaiveDateTime, out: &mut impl Extend<u8>) {
        out.extend(encode_header(now));
        out.extend(self.raw.iter().flat_map(|s| s.to_le_bytes()));
        self.raw.clear();
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Samples lost because the recorder was full.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TraceError {
    /// Trace ends in the middle of a record header.
    Truncated,
    InvalidTimestamp,
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceError::Truncated => write!(f, "trace ends inside a record header"),
            TraceError::InvalidTimestamp => write!(f, "record has an invalid timestamp"),
        }
    }
}

pub struct TraceRecord<'a> {
    pub start: NaiveDateTime,
    data: &'a [u8],
}

impl<'a> TraceRecord<'a> {
    pub fn samples(&self) -> impl Iterator<Item = u16> + 'a {
        self.data
            .chunks_exact(2)
            .map(|w| u16::from_le_bytes([w[0], w[1]]))
    }

    pub fn len(&self) -> usize {
        self.data.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Iterates over the records of a trace, skipping anything in front of the
/// first marker.
///
/// Markers are searched byte by byte so a torn write of odd length does not
/// lose the records after it. Inside a record, a marker only ends it if a
/// valid timestamp (or the end of the trace) follows, since two samples may
/// happen to contain `0xff 0xff` across their boundary.
pub struct TraceReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> TraceReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn markers(&self, from: usize) -> impl Iterator<Item = usize> + 'a {
        let data: &'a [u8] = self.data;
        data.get(from..)
            .unwrap_or_default()
            .windows(2)
            .enumerate()
            .filter(|(_, w)| *w == &RESYNC_MARKER[..])
            .map(move |(i, _)| from + i)
    }

    fn header_at(&self, pos: usize) -> Option<[u16; 6]> {
        let header = self.data.get(pos + 2..pos + HEADER_LEN)?;
        let mut words = [0u16; 6];
        for (w, b) in words.iter_mut().zip(header.chunks_exact(2)) {
            *w = u16::from_le_bytes([b[0], b[1]]);
        }
        Some(words)
    }

    fn record_end(&self, body: usize) -> usize {
        self.markers(body)
            .find(|&pos| match self.header_at(pos) {
                Some(words) => parse_timestamp(words).is_some(),
                None => true,
            })
            .unwrap_or(self.data.len())
    }
}

fn parse_timestamp(w: [u16; 6]) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(w[0] as i32, w[1] as u32, w[2] as u32)?.and_hms_opt(
        w[3] as u32,
        w[4] as u32,
        w[5] as u32,
    )
}

impl<'a> Iterator for TraceReader<'a> {
    type Item = Result<TraceRecord<'a>, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        let Some(start) = self.markers(self.pos).next() else {
            self.pos = self.data.len();
            return None;
        };

        let Some(words) = self.header_at(start) else {
            self.pos = self.data.len();
            return Some(Err(TraceError::Truncated));
        };

        let body = start + HEADER_LEN;
        let end = self.record_end(body);
        self.pos = end;

        let data: &'a [u8] = self.data;
        let data = &data[body..end - (end - body) % 2];
        match parse_timestamp(words) {
            Some(start) => Some(Ok(TraceRecord { start, data })),
            None => Some(Err(TraceError::InvalidTimestamp)),
        }
    }
}
