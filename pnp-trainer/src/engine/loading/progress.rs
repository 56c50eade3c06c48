use indicatif::{ProgressBar, ProgressStyle};

const POINT_TEMPLATE: &str = "[{bar:40.cyan/blue}] {pos}/{len} points ({percent}%) {msg}";

/// Terminal progress bar for reading points. Hidden when `visible` is false
/// so tests and library callers stay quiet.
pub fn point_progress_bar(total: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(POINT_TEMPLATE)
        .map(|s| s.progress_chars("▉▊▋▌▍▎▏ "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

/// Update the bar every this many points.
pub const PROGRESS_STEP: usize = 10_000;
