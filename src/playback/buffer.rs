//! Frame reassembly and the playback jitter queue
//!
//! Network reads arrive on arbitrary boundaries. [`FrameAssembler`] carves
//! them into fixed-size [`AudioFrame`]s and [`PlaybackQueue`] holds those
//! frames until the scheduler picks them up.

use bytes::BytesMut;
use std::collections::VecDeque;

use crate::audio::frame::AudioFrame;
use crate::constants::{BYTES_PER_SAMPLE_PAIR, FRAME_SIZE, QUEUE_HIGH_WATER, QUEUE_TRIM_TO};

/// Accumulates stream bytes and emits whole frames
#[derive(Debug)]
pub struct FrameAssembler {
    pending: BytesMut,
    frame_size: usize,
}

impl FrameAssembler {
    /// `frame_size` must be a non-zero multiple of 4
    pub fn new(frame_size: usize) -> Self {
        assert!(
            frame_size > 0 && frame_size % BYTES_PER_SAMPLE_PAIR == 0,
            "Frame size must be a multiple of {}",
            BYTES_PER_SAMPLE_PAIR
        );
        Self {
            pending: BytesMut::with_capacity(frame_size * 2),
            frame_size,
        }
    }

    /// Append received bytes and hand every completed frame to `emit`
    pub fn push(&mut self, data: &[u8], mut emit: impl FnMut(AudioFrame)) {
        self.pending.extend_from_slice(data);
        while self.pending.len() >= self.frame_size {
            let chunk = self.pending.split_to(self.frame_size).freeze();
            // frame_size is a multiple of 4, so this always succeeds
            if let Some(frame) = AudioFrame::new(chunk) {
                emit(frame);
            }
        }
    }

    /// Bytes waiting for the rest of their frame
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Discard any partial frame
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new(FRAME_SIZE)
    }
}

/// FIFO of frames awaiting playback, trimmed from the front on overflow
#[derive(Debug)]
pub struct PlaybackQueue {
    frames: VecDeque<AudioFrame>,
    high_water: usize,
    trim_to: usize,
    dropped: u64,
}

impl PlaybackQueue {
    pub fn new(high_water: usize, trim_to: usize) -> Self {
        assert!(trim_to <= high_water, "Trim target must not exceed the high-water mark");
        Self {
            frames: VecDeque::with_capacity(high_water + 1),
            high_water,
            trim_to,
            dropped: 0,
        }
    }

    /// Enqueue a frame, trimming if the backlog grew past the high-water mark
    pub fn push(&mut self, frame: AudioFrame) {
        self.frames.push_back(frame);
        self.trim();
    }

    pub fn pop(&mut self) -> Option<AudioFrame> {
        self.frames.pop_front()
    }

    /// Keep only the newest `trim_to` frames once the length exceeds the
    /// high-water mark. Returns the number of frames dropped.
    pub fn trim(&mut self) -> usize {
        if self.frames.len() <= self.high_water {
            return 0;
        }
        let excess = self.frames.len() - self.trim_to;
        self.frames.drain(..excess);
        self.dropped += excess as u64;
        tracing::debug!("Playback queue overflow, dropped {} oldest frames", excess);
        excess
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Total frames discarded by overflow trimming
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Default for PlaybackQueue {
    fn default() -> Self {
        Self::new(QUEUE_HIGH_WATER, QUEUE_TRIM_TO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use proptest::prelude::*;

    fn frame_of(tag: u8) -> AudioFrame {
        AudioFrame::new(Bytes::from(vec![tag; 16])).unwrap()
    }

    fn collect(assembler: &mut FrameAssembler, data: &[u8], chunk: usize) -> Vec<AudioFrame> {
        let mut frames = Vec::new();
        for piece in data.chunks(chunk) {
            assembler.push(piece, |f| frames.push(f));
        }
        frames
    }

    #[test]
    fn test_leftover_stays_pending() {
        let mut assembler = FrameAssembler::default();
        let mut frames = Vec::new();
        assembler.push(&vec![1u8; 10000], |f| frames.push(f));

        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.len() == 4096));
        assert_eq!(assembler.pending_len(), 10000 - 8192);

        assembler.push(&vec![2u8; 4096 - 1808], |f| frames.push(f));
        assert_eq!(frames.len(), 3);
        assert_eq!(assembler.pending_len(), 0);
    }

    #[test]
    fn test_single_bytes_vs_one_chunk() {
        let data: Vec<u8> = (0..20000u32).map(|i| (i * 7 % 251) as u8).collect();

        let one_by_one = collect(&mut FrameAssembler::default(), &data, 1);
        let all_at_once = collect(&mut FrameAssembler::default(), &data, 10000);

        assert_eq!(one_by_one.len(), 4);
        assert_eq!(one_by_one, all_at_once);
        let decoded_a: Vec<_> = one_by_one.iter().map(|f| f.decode()).collect();
        let decoded_b: Vec<_> = all_at_once.iter().map(|f| f.decode()).collect();
        assert_eq!(decoded_a, decoded_b);
    }

    #[test]
    fn test_clear_discards_partial_frame() {
        let mut assembler = FrameAssembler::default();
        assembler.push(&[0u8; 100], |_| panic!("no frame expected"));
        assembler.clear();
        assert_eq!(assembler.pending_len(), 0);
    }

    #[test]
    #[should_panic]
    fn test_frame_size_must_align() {
        FrameAssembler::new(4094);
    }

    #[test]
    fn test_queue_is_fifo() {
        let mut queue = PlaybackQueue::default();
        for tag in 0..5 {
            queue.push(frame_of(tag));
        }
        for tag in 0..5 {
            assert_eq!(queue.pop().unwrap().as_bytes()[0], tag);
        }
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_overflow_keeps_newest_twenty() {
        let mut queue = PlaybackQueue::default();
        for tag in 0..30 {
            queue.push(frame_of(tag));
        }
        assert_eq!(queue.len(), 30);

        queue.push(frame_of(30));
        assert_eq!(queue.len(), 20);
        assert_eq!(queue.dropped(), 11);
        assert_eq!(queue.pop().unwrap().as_bytes()[0], 11);
    }

    proptest! {
        #[test]
        fn framing_ignores_chunk_boundaries(
            data in proptest::collection::vec(any::<u8>(), 0..20000),
            cuts in proptest::collection::vec(1usize..5000, 1..20),
        ) {
            let reference = collect(&mut FrameAssembler::default(), &data, data.len().max(1));

            let mut assembler = FrameAssembler::default();
            let mut frames = Vec::new();
            let mut offset = 0;
            for cut in cuts.iter().cycle() {
                if offset >= data.len() {
                    break;
                }
                let end = (offset + cut).min(data.len());
                assembler.push(&data[offset..end], |f| frames.push(f));
                offset = end;
            }

            prop_assert_eq!(frames.len(), data.len() / 4096);
            prop_assert_eq!(assembler.pending_len(), data.len() % 4096);
            prop_assert_eq!(frames, reference);
        }

        #[test]
        fn queue_never_settles_above_high_water(pushes in 0usize..200) {
            let mut queue = PlaybackQueue::default();
            for i in 0..pushes {
                queue.push(frame_of((i % 256) as u8));
                prop_assert!(queue.len() <= 30);
            }
        }
    }
}
