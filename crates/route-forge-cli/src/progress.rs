use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Create a spinner on stderr that ticks every 80ms.
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// A spinner when the output context allows one.
pub fn maybe_spinner(show: bool, message: &str) -> Option<ProgressBar> {
    show.then(|| create_spinner(message))
}

pub fn finish_spinner(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(message.to_string());
}

pub fn finish_spinner_error(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("ERROR: {message}"));
}
