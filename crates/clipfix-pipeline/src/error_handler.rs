//! Error classification, history, and escalation of repeated failures.

use clipfix_core::{EnhancementError, ErrorCode, RecoveryStrategy};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default number of errors kept in history.
pub const DEFAULT_MAX_HISTORY: usize = 100;
/// Prior occurrences of one code tolerated inside the window.
pub const DEFAULT_RETRY_BUDGET: usize = 3;
pub const DEFAULT_ESCALATION_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub error: EnhancementError,
    pub at: Instant,
}

/// Classifies failures and escalates codes that keep recurring.
///
/// One handler is constructed per pipeline and passed in; nothing here is
/// process-wide.
#[derive(Debug, Clone)]
pub struct ErrorHandler {
    max_history: usize,
    retry_budget: usize,
    window: Duration,
    history: VecDeque<ErrorRecord>,
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl ErrorHandler {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history: max_history.max(1),
            retry_budget: DEFAULT_RETRY_BUDGET,
            window: DEFAULT_ESCALATION_WINDOW,
            history: VecDeque::new(),
        }
    }

    pub fn with_escalation(mut self, retry_budget: usize, window: Duration) -> Self {
        self.retry_budget = retry_budget;
        self.window = window;
        self
    }

    /// Record an error and return it, escalated if its code keeps recurring.
    pub fn handle(&mut self, error: EnhancementError) -> EnhancementError {
        self.handle_at(error, Instant::now())
    }

    /// [`handle`](Self::handle) with an explicit clock reading.
    pub fn handle_at(&mut self, error: EnhancementError, now: Instant) -> EnhancementError {
        let prior = self.recent_at(error.code, now);
        let error = if prior >= self.retry_budget
            && error.recovery_strategy != RecoveryStrategy::UserIntervention
        {
            warn!(
                code = %error.code,
                occurrences = prior + 1,
                "Repeated failure escalated to user intervention"
            );
            error
                .with_strategy(RecoveryStrategy::UserIntervention)
                .with_recoverable(false)
                .with_context("escalated", prior + 1)
        } else {
            error
        };

        debug!(code = %error.code, strategy = ?error.recovery_strategy, "error recorded");
        if self.history.len() == self.max_history {
            self.history.pop_front();
        }
        self.history.push_back(ErrorRecord {
            error: error.clone(),
            at: now,
        });
        error
    }

    /// Occurrences of `code` inside the escalation window ending now.
    pub fn recent(&self, code: ErrorCode) -> usize {
        self.recent_at(code, Instant::now())
    }

    pub fn recent_at(&self, code: ErrorCode, now: Instant) -> usize {
        self.history
            .iter()
            .filter(|r| r.error.code == code && now.saturating_duration_since(r.at) <= self.window)
            .count()
    }

    pub fn history(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.history.iter()
    }

    pub fn last(&self) -> Option<&EnhancementError> {
        self.history.back().map(|r| &r.error)
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

/// Map a free-form failure message onto an error code by keyword.
pub fn classify(message: &str) -> ErrorCode {
    let msg = message.to_lowercase();
    let has = |keys: &[&str]| keys.iter().any(|k| msg.contains(k));

    if has(&["context lost", "device lost"]) {
        ErrorCode::GpuContextLost
    } else if has(&["shader"]) {
        ErrorCode::ShaderCompilationFailed
    } else if has(&["texture"]) {
        ErrorCode::TextureCreationFailed
    } else if has(&["gpu", "webgl", "adapter"]) {
        ErrorCode::GpuNotAvailable
    } else if has(&["out of memory", "allocation"]) {
        ErrorCode::OutOfMemory
    } else if has(&["seek"]) {
        ErrorCode::SeekTimeout
    } else if has(&["timeout", "timed out"]) {
        ErrorCode::ProcessingTimeout
    } else if has(&["audio context", "audiocontext"]) {
        ErrorCode::AudioContextFailed
    } else if has(&["decode"]) {
        ErrorCode::AudioDecodeFailed
    } else if has(&["codec"]) {
        ErrorCode::UnsupportedCodec
    } else if has(&["security", "permission"]) {
        ErrorCode::SecurityRestriction
    } else if has(&["corrupt"]) {
        ErrorCode::DataCorruption
    } else if has(&["invalid"]) {
        ErrorCode::InvalidInput
    } else {
        ErrorCode::Unknown
    }
}

/// Turn any error into an [`EnhancementError`]. Pipeline errors pass
/// through; everything else is classified by its message.
pub fn to_enhancement_error(err: &(dyn std::error::Error + 'static)) -> EnhancementError {
    if let Some(e) = err.downcast_ref::<EnhancementError>() {
        return e.clone();
    }
    let message = err.to_string();
    EnhancementError::new(classify(&message)).with_context("source", message)
}
