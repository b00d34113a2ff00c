//! Frame boundaries from inter-read timing
//!
//! The bus has no length field and no delimiter, so frames are recovered from
//! silence: a gap between reads at least as long as the active threshold
//! closes the frame in progress.
//!
//! The threshold adapts to the frame that was just closed. A keypad answers
//! immediately, so its reply lands in the same frame as the master frame
//! that prompted it:
//!
//! - empty frame, or frame starting `0x10`: next threshold `inter_message`
//! - anything else: next threshold `slave_reply`
//!
//! Gaps are measured between reads that returned data; idle reads do not
//! move the clock.

use std::time::{Duration, SystemTime};

use galaxy_protocol::MASTER_MARKER;

use crate::message::Message;

/// Gap thresholds for frame segmentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapThresholds {
    /// Silence that separates one master frame from the next
    pub inter_message: Duration,
    /// Silence allowed before a slave's reply is considered finished
    pub slave_reply: Duration,
}

impl Default for GapThresholds {
    fn default() -> Self {
        Self {
            inter_message: Duration::from_millis(10),
            slave_reply: Duration::from_millis(5),
        }
    }
}

impl GapThresholds {
    /// Threshold to use after `frame` has been closed
    pub fn after(&self, frame: &[u8]) -> Duration {
        match frame.first() {
            None | Some(&MASTER_MARKER) => self.inter_message,
            Some(_) => self.slave_reply,
        }
    }
}

/// A frame closed by the segmenter, with the details shown in summaries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedFrame {
    /// The frame, stamped with its first read
    pub message: Message,
    /// Time of the read that closed the frame
    pub end: SystemTime,
    /// Threshold that was active while the frame was collected
    pub gap: Duration,
    /// Time from the frame's first read to the closing read
    pub span: Duration,
}

/// Incremental gap-based frame segmenter
#[derive(Debug, Clone)]
pub struct FrameSegmenter {
    thresholds: GapThresholds,
    active: Duration,
    last_read: Option<SystemTime>,
    start: Option<SystemTime>,
    buf: Vec<u8>,
}

impl FrameSegmenter {
    pub fn new(thresholds: GapThresholds) -> Self {
        Self {
            thresholds,
            active: thresholds.inter_message,
            last_read: None,
            start: None,
            buf: Vec::new(),
        }
    }

    /// Threshold that will decide the next boundary
    pub fn active_gap(&self) -> Duration {
        self.active
    }

    /// Bytes collected for the frame in progress
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    /// Feed one read taken at `at`
    ///
    /// Returns the previous frame if this read starts a new one. Empty reads
    /// are ignored.
    pub fn push(&mut self, data: &[u8], at: SystemTime) -> Option<CompletedFrame> {
        if data.is_empty() {
            return None;
        }

        // A clock step backwards counts as no gap at all
        let boundary = match self.last_read {
            None => true,
            Some(last) => at.duration_since(last).unwrap_or(Duration::ZERO) >= self.active,
        };
        self.last_read = Some(at);

        let completed = if boundary { self.close(at) } else { None };
        self.buf.extend_from_slice(data);
        completed
    }

    /// Take the frame in progress, if any, without a closing read
    pub fn finish(mut self) -> Option<Message> {
        let start = self.start.take()?;
        if self.buf.is_empty() {
            return None;
        }
        Some(Message::new(std::mem::take(&mut self.buf), start))
    }

    fn close(&mut self, at: SystemTime) -> Option<CompletedFrame> {
        let gap = self.active;
        let data = std::mem::take(&mut self.buf);
        self.active = self.thresholds.after(&data);

        let completed = match self.start {
            Some(start) if !data.is_empty() => Some(CompletedFrame {
                span: at.duration_since(start).unwrap_or(Duration::ZERO),
                message: Message::new(data, start),
                end: at,
                gap,
            }),
            _ => None,
        };

        self.start = Some(at);
        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn t(ms: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000) + Duration::from_millis(ms)
    }

    fn thresholds() -> GapThresholds {
        GapThresholds {
            inter_message: Duration::from_millis(10),
            slave_reply: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_threshold_after() {
        let g = thresholds();
        assert_eq!(g.after(&[]), g.inter_message);
        assert_eq!(g.after(&[0x10, 0x19]), g.inter_message);
        assert_eq!(g.after(&[0x11, 0xFE]), g.slave_reply);
        assert_eq!(g.after(&[0x90]), g.slave_reply);
    }

    #[test]
    fn test_first_read_opens_frame() {
        let mut seg = FrameSegmenter::new(thresholds());
        assert_eq!(seg.push(&[0x10], t(0)), None);
        assert_eq!(seg.pending(), &[0x10]);
    }

    #[test]
    fn test_end_to_end_split() {
        let mut seg = FrameSegmenter::new(thresholds());
        let mut frames = Vec::new();

        frames.extend(seg.push(&[0x10, 0x19, 0x01, 0xD4], t(0)));
        frames.extend(seg.push(&[0x11, 0xFE, 0xBA], t(0)));
        let closed = seg.push(&[0x10, 0x0D, 0x01, 0xC8], t(20));
        frames.extend(closed.clone());
        let mut messages: Vec<Message> = frames.into_iter().map(|c| c.message).collect();
        messages.extend(seg.finish());

        assert_eq!(
            messages,
            vec![
                Message::new([0x10, 0x19, 0x01, 0xD4, 0x11, 0xFE, 0xBA], t(0)),
                Message::new([0x10, 0x0D, 0x01, 0xC8], t(20)),
            ]
        );

        let closed = closed.unwrap();
        assert_eq!(closed.end, t(20));
        assert_eq!(closed.span, Duration::from_millis(20));
        assert_eq!(closed.gap, Duration::from_millis(10));
    }

    #[test]
    fn test_gap_at_threshold_splits() {
        let mut seg = FrameSegmenter::new(thresholds());
        seg.push(&[0x10, 0x19], t(0));
        assert!(seg.push(&[0x01], t(9)).is_none());
        assert!(seg.push(&[0x10], t(19)).is_some());
    }

    #[test]
    fn test_slave_frame_tightens_threshold() {
        let mut seg = FrameSegmenter::new(thresholds());
        seg.push(&[0x11, 0xFE, 0xBA], t(0));

        // Closing a slave-originated frame
        let closed = seg.push(&[0x90, 0x01], t(15)).unwrap();
        assert_eq!(closed.gap, Duration::from_millis(10));
        assert_eq!(seg.active_gap(), Duration::from_millis(5));

        // 6ms is now enough to split
        let closed = seg.push(&[0x10, 0x19], t(21)).unwrap();
        assert_eq!(closed.message.data, vec![0x90, 0x01]);
        assert_eq!(closed.gap, Duration::from_millis(5));
        assert_eq!(seg.active_gap(), Duration::from_millis(5));
    }

    #[test]
    fn test_master_frame_restores_threshold() {
        let mut seg = FrameSegmenter::new(thresholds());
        seg.push(&[0x11], t(0));
        seg.push(&[0x10, 0x19], t(20));
        assert_eq!(seg.active_gap(), Duration::from_millis(5));

        // 6ms splits, and the closed frame was a master frame
        seg.push(&[0x11, 0xFE], t(26)).unwrap();
        assert_eq!(seg.active_gap(), Duration::from_millis(10));
    }

    #[test]
    fn test_empty_reads_ignored() {
        let mut seg = FrameSegmenter::new(thresholds());
        seg.push(&[0x10], t(0));
        assert!(seg.push(&[], t(50)).is_none());
        // Gap still measured from the last read with data
        assert!(seg.push(&[0x19], t(60)).is_some());
    }

    #[test]
    fn test_clock_going_backwards_is_no_gap() {
        let mut seg = FrameSegmenter::new(thresholds());
        seg.push(&[0x10], t(100));
        assert!(seg.push(&[0x19], t(0)).is_none());
        assert_eq!(seg.pending(), &[0x10, 0x19]);
    }

    #[test]
    fn test_finish_without_data() {
        let seg = FrameSegmenter::new(thresholds());
        assert_eq!(seg.finish(), None);
    }

    proptest! {
        #[test]
        fn small_gaps_make_one_frame(
            chunks in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 1..8), 1..20),
            gaps in proptest::collection::vec(0u64..10, 20),
        ) {
            let mut seg = FrameSegmenter::new(thresholds());
            let mut now = 0;
            let mut expected = Vec::new();

            for (chunk, gap) in chunks.iter().zip(&gaps) {
                now += gap;
                prop_assert!(seg.push(chunk, t(now)).is_none());
                expected.extend_from_slice(chunk);
            }

            let frame = seg.finish().unwrap();
            prop_assert_eq!(frame.data, expected);
            prop_assert_eq!(frame.timestamp, t(gaps[0]));
        }

        #[test]
        fn large_gaps_split_every_read(
            chunks in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 1..8), 2..20),
        ) {
            let mut seg = FrameSegmenter::new(thresholds());
            let mut closed = Vec::new();

            for (i, chunk) in chunks.iter().enumerate() {
                closed.extend(seg.push(chunk, t(i as u64 * 10)).map(|c| c.message.data));
            }
            closed.extend(seg.finish().map(|m| m.data));

            prop_assert_eq!(closed, chunks);
        }
    }
}
