use crate::timeline::RenderTimeline;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

fn seconds_to_timestamp(secs: u32) -> String {
    let hh = secs / 3600;
    let mm = (secs % 3600) / 60;
    let ss = secs % 60;
    format!("{:02}:{:02}:{:02},000", hh, mm, ss)
}

/// One cue per visible page. Empty pages and zero-length windows are skipped
/// and cue numbers stay consecutive.
pub fn to_srt(timeline: &RenderTimeline) -> String {
    let mut output = String::new();
    let mut cue = 0usize;

    for window in &timeline.windows {
        if window.page.text.trim().is_empty() || window.duration() == 0 {
            continue;
        }
        cue += 1;
        output.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            cue,
            seconds_to_timestamp(window.start),
            seconds_to_timestamp(window.end),
            window.page.text
        ));
    }

    output
}

pub async fn write_srt(timeline: &RenderTimeline, output_srt: &Path) -> Result<()> {
    let mut out = fs::File::create(output_srt)
        .await
        .with_context(|| format!("create srt output: {}", output_srt.display()))?;
    out.write_all(to_srt(timeline).as_bytes()).await?;
    out.flush().await.ok();
    Ok(())
}
