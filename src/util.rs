use indicatif::{ProgressBar, ProgressStyle};

/// Byte-count bar for a run, hidden unless `enable` is set
pub(crate) fn create_progress_bar(total_bytes: u64, msg: &str, enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(total_bytes);
    match ProgressStyle::default_bar().template(
        "[{spinner:.green} {elapsed_precise}] {bar:40.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}) {msg}",
    ) {
        Ok(style) => pb.set_style(style.progress_chars("#>-")),
        Err(e) => tracing::debug!("Falling back to default progress style: {}", e),
    }
    pb.set_message(msg.to_owned());

    pb
}
