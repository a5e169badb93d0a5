//! Live progress indicator for slow generation calls
//!
//! The animator edits one message on a timer until it is cancelled. The
//! percentages are cosmetic: they never reach 100 on their own.

mod animator;

pub use animator::{AnimationHandle, AnimationOutcome, ProgressAnimator, StopCause};

/// Highest percent the animation shows before the real result arrives
pub const ANIMATION_CAP: u8 = 95;

/// `[█████░░░░░░░] 42%`
pub fn progress_bar(percent: u8, width: usize) -> String {
    let percent = percent.min(100);
    let filled = (percent as usize * width) / 100;
    format!(
        "[{}{}] {}%",
        "█".repeat(filled),
        "░".repeat(width - filled),
        percent
    )
}

/// Message text shown while generation is running
pub fn render_progress(percent: u8, width: usize) -> String {
    format!("⚙️ Generating plan…\n<code>{}</code>", progress_bar(percent, width))
}

/// Message text once generation has finished
pub fn render_done(width: usize) -> String {
    format!("✅ Done!\n<code>{}</code>", progress_bar(100, width))
}
