//! Incremental newline-delimited JSON decoding.
//!
//! The feed body arrives in arbitrary chunks: one chunk may hold several
//! records and one record may span several chunks. `LineDecoder` carries the
//! unterminated tail of the previous chunk over to the next one.

use std::collections::VecDeque;

use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;
use vine_core::error::VineError;

use crate::FollowResult;

/// Splits a byte stream into JSON values, one per line
#[derive(Debug, Default)]
pub struct LineDecoder {
    carry: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every value it completes, in order.
    ///
    /// Blank lines are skipped. A line that is not valid JSON ends the
    /// output: it is returned as the last item and the lines after it in
    /// this chunk are dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<FollowResult<Value>> {
        // The carry never holds a newline, so only the new bytes are scanned
        let scanned = self.carry.len();
        self.carry.extend_from_slice(chunk);

        let Some(last_newline) = self.carry[scanned..].iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let rest = self.carry.split_off(scanned + last_newline + 1);
        let complete = std::mem::replace(&mut self.carry, rest);

        let mut values = Vec::new();
        for line in complete.split(|&b| b == b'\n') {
            match parse_line(line) {
                Ok(Some(value)) => values.push(Ok(value)),
                Ok(None) => {},
                Err(e) => {
                    values.push(Err(e));
                    break;
                },
            }
        }
        values
    }

    /// Decode whatever is left once the body has ended
    pub fn finish(&mut self) -> FollowResult<Option<Value>> {
        let tail = std::mem::take(&mut self.carry);
        parse_line(&tail)
    }

    /// Bytes waiting for their line to complete
    pub fn pending(&self) -> usize {
        self.carry.len()
    }
}

fn parse_line(line: &[u8]) -> FollowResult<Option<Value>> {
    let start = line.iter().position(|b| !b.is_ascii_whitespace());
    let end = line.iter().rposition(|b| !b.is_ascii_whitespace());
    let (Some(start), Some(end)) = (start, end) else {
        return Ok(None);
    };
    let line = &line[start..=end];

    serde_json::from_slice(line)
        .map(Some)
        .map_err(|e| VineError::malformed_line(&String::from_utf8_lossy(line), e))
}

struct DecodeState<S> {
    source: S,
    decoder: LineDecoder,
    ready: VecDeque<FollowResult<Value>>,
    done: bool,
}

/// Turn a stream of byte chunks into a stream of JSON values.
///
/// Source errors and malformed lines are yielded as errors, after every value
/// that came before them; the stream ends after the first one.
pub fn decode_stream<S>(source: S) -> impl Stream<Item = FollowResult<Value>> + Send
where
    S: Stream<Item = FollowResult<Vec<u8>>> + Send + Unpin,
{
    let state = DecodeState {
        source,
        decoder: LineDecoder::new(),
        ready: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.ready.pop_front() {
                return Some((item, state));
            }
            if state.done {
                return None;
            }

            match state.source.next().await {
                Some(Ok(chunk)) => {
                    let values = state.decoder.push(&chunk);
                    if values.last().is_some_and(|item| item.is_err()) {
                        state.done = true;
                    }
                    state.ready.extend(values);
                },
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e), state));
                },
                None => {
                    state.done = true;
                    match state.decoder.finish() {
                        Ok(Some(value)) => return Some((Ok(value), state)),
                        Ok(None) => return None,
                        Err(e) => return Some((Err(e), state)),
                    }
                },
            }
        }
    })
}
