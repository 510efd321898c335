//! Memory budget accounting and chunk planning.

use clipfix_core::memory_budget::{AUDIO_BYTES_PER_SECOND, CHUNK_BUDGET_FRACTION};
use clipfix_core::{EnhancementError, ErrorCode, RecoveryStrategy, BYTES_PER_PIXEL};
use std::ops::Range;
use tracing::{debug, info};

/// Gates oversized inputs up front and tracks bytes held during a run.
#[derive(Debug, Clone)]
pub struct MemoryManager {
    budget: usize,
    in_use: usize,
    high_water: usize,
    allow_chunking: bool,
}

impl MemoryManager {
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            in_use: 0,
            high_water: 0,
            allow_chunking: false,
        }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn estimate_frame_bytes(width: u32, height: u32) -> usize {
        width as usize * height as usize * BYTES_PER_PIXEL
    }

    /// Decoded size of a clip: every frame plus its audio.
    pub fn estimate_video_bytes(width: u32, height: u32, frame_count: u64, audio_secs: f64) -> usize {
        let frames = Self::estimate_frame_bytes(width, height).saturating_mul(frame_count as usize);
        let audio = (audio_secs.max(0.0) * AUDIO_BYTES_PER_SECOND as f64) as usize;
        frames.saturating_add(audio)
    }

    /// Refuse inputs over budget unless chunked processing has been allowed.
    pub fn check_input(&self, estimated_bytes: usize) -> clipfix_core::Result<()> {
        if estimated_bytes <= self.budget || self.allow_chunking {
            return Ok(());
        }
        Err(EnhancementError::new(ErrorCode::VideoTooLarge)
            .with_context("estimated_bytes", estimated_bytes)
            .with_context("budget_bytes", self.budget))
    }

    /// Refuse a frame size that cannot fit in the budget on its own. Chunking
    /// cannot help here, so the error asks for the user.
    pub fn check_frame(&self, width: u32, height: u32) -> clipfix_core::Result<()> {
        let frame_bytes = Self::estimate_frame_bytes(width, height);
        if frame_bytes <= self.budget {
            return Ok(());
        }
        Err(EnhancementError::new(ErrorCode::VideoTooLarge)
            .with_strategy(RecoveryStrategy::UserIntervention)
            .with_recoverable(false)
            .with_context("frame_bytes", frame_bytes)
            .with_context("budget_bytes", self.budget))
    }

    /// Frames of `width`x`height` that fit in one chunk. Always at least one.
    pub fn chunk_size_frames(&self, width: u32, height: u32) -> u64 {
        let frame = Self::estimate_frame_bytes(width, height).max(1);
        let chunk_budget = (self.budget as f64 * CHUNK_BUDGET_FRACTION) as usize;
        ((chunk_budget / frame) as u64).max(1)
    }

    /// Split `total_frames` into consecutive budget-sized ranges.
    pub fn plan_chunks(&self, total_frames: u64, width: u32, height: u32) -> Vec<Range<u64>> {
        let size = self.chunk_size_frames(width, height);
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < total_frames {
            let end = (start + size).min(total_frames);
            chunks.push(start..end);
            start = end;
        }
        debug!(total_frames, chunk_frames = size, chunks = chunks.len(), "chunk plan");
        chunks
    }

    /// Account for `bytes` held. Fails without changing state when the
    /// budget would be exceeded.
    pub fn reserve(&mut self, bytes: usize) -> clipfix_core::Result<()> {
        let next = self.in_use.saturating_add(bytes);
        if next > self.budget {
            return Err(EnhancementError::new(ErrorCode::OutOfMemory)
                .with_context("requested_bytes", bytes)
                .with_context("in_use_bytes", self.in_use)
                .with_context("budget_bytes", self.budget));
        }
        self.in_use = next;
        self.high_water = self.high_water.max(next);
        Ok(())
    }

    pub fn release(&mut self, bytes: usize) {
        self.in_use = self.in_use.saturating_sub(bytes);
    }

    pub fn in_use(&self) -> usize {
        self.in_use
    }

    pub fn available(&self) -> usize {
        self.budget.saturating_sub(self.in_use)
    }

    pub fn high_water(&self) -> usize {
        self.high_water
    }

    pub fn allow_chunking(&self) -> bool {
        self.allow_chunking
    }

    pub fn set_allow_chunking(&mut self, allow: bool) {
        if allow != self.allow_chunking {
            info!(allow, "Chunked processing toggled");
        }
        self.allow_chunking = allow;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipfix_core::RecoveryStrategy;

    const MIB: usize = 1024 * 1024;

    #[test]
    fn estimates() {
        assert_eq!(MemoryManager::estimate_frame_bytes(1920, 1080), 1920 * 1080 * 4);
        let bytes = MemoryManager::estimate_video_bytes(10, 10, 30, 1.0);
        assert_eq!(bytes, 400 * 30 + AUDIO_BYTES_PER_SECOND);
    }

    #[test]
    fn oversized_input_is_refused_until_chunking_allowed() {
        let mut mm = MemoryManager::new(64 * MIB);
        let err = mm.check_input(100 * MIB).unwrap_err();
        assert_eq!(err.code, ErrorCode::VideoTooLarge);
        assert_eq!(err.recovery_strategy, RecoveryStrategy::ChunkProcessing);
        assert!(mm.check_input(10 * MIB).is_ok());

        mm.set_allow_chunking(true);
        assert!(mm.check_input(100 * MIB).is_ok());
    }

    #[test]
    fn chunk_plan_covers_every_frame() {
        let mm = MemoryManager::new(8 * MIB);
        // 4 MiB per chunk, 1 MiB per 512x512 frame
        assert_eq!(mm.chunk_size_frames(512, 512), 4);
        let plan = mm.plan_chunks(10, 512, 512);
        assert_eq!(plan, vec![0..4, 4..8, 8..10]);
        assert!(mm.plan_chunks(0, 512, 512).is_empty());
    }

    #[test]
    fn huge_frames_still_get_one_per_chunk() {
        let mm = MemoryManager::new(1024);
        assert_eq!(mm.chunk_size_frames(4096, 4096), 1);
    }

    #[test]
    fn frame_larger_than_budget_needs_the_user() {
        let mut mm = MemoryManager::new(1_000);
        assert!(mm.check_frame(10, 10).is_ok());
        mm.set_allow_chunking(true);
        let err = mm.check_frame(20, 20).unwrap_err();
        assert_eq!(err.code, ErrorCode::VideoTooLarge);
        assert_eq!(err.recovery_strategy, RecoveryStrategy::UserIntervention);
        assert!(!err.recoverable);
        assert_eq!(err.context["frame_bytes"], "1600");
    }

    #[test]
    fn reserve_and_release_track_high_water() {
        let mut mm = MemoryManager::new(100);
        mm.reserve(60).unwrap();
        assert_eq!(mm.reserve(50).unwrap_err().code, ErrorCode::OutOfMemory);
        assert_eq!(mm.in_use(), 60);
        mm.release(60);
        mm.reserve(30).unwrap();
        assert_eq!(mm.in_use(), 30);
        assert_eq!(mm.available(), 70);
        assert_eq!(mm.high_water(), 60);
        mm.release(500);
        assert_eq!(mm.in_use(), 0);
    }
}
