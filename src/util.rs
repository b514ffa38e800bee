//! Utility functions

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// A progress bar of `len` steps labelled `message`, drawn to stderr if
/// `draw_progress`, otherwise hidden.
pub fn progress_bar(len: usize, message: &'static str, draw_progress: bool) -> ProgressBar {
    let draw_target = if draw_progress {
        ProgressDrawTarget::stderr()
    } else {
        ProgressDrawTarget::hidden()
    };
    let style = ProgressStyle::default_bar()
        .template("{msg:16}: [{elapsed_precise}] [{wide_bar:.cyan/blue}] {percent:3}% ({eta:5})")
        .map(|style| style.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    ProgressBar::with_draw_target(Some(len as u64), draw_target)
        .with_style(style)
        .with_position(0)
        .with_message(message)
}

/// Format a slice of frequencies \[Hz\] in MHz for log messages.
pub fn fmt_freqs_mhz(freqs_hz: &[f64]) -> String {
    match (freqs_hz.first(), freqs_hz.last()) {
        (Some(first), Some(last)) => format!(
            "{:.6} - {:.6} MHz ({} channels)",
            first / 1e6,
            last / 1e6,
            freqs_hz.len()
        ),
        _ => "no channels".into(),
    }
}
