use crate::logw;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::process::Command;

async fn run_cmd(args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Ok(());
    }

    let mut cmd = Command::new(&args[0]);
    if args.len() > 1 {
        cmd.args(&args[1..]);
    }

    let status = cmd.status().await.context("Command execution failed")?;
    if !status.success() {
        return Err(anyhow::anyhow!("Command failed: {:?}", args));
    }

    Ok(())
}

pub async fn ffprobe_duration_seconds(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .context("ffprobe duration failed")?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("ffprobe failed"));
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    parse_probe_duration(&text)
}

fn parse_probe_duration(text: &str) -> Result<f64> {
    let duration = text.parse::<f64>().unwrap_or(-1.0);
    if !duration.is_finite() || duration <= 0.05 {
        return Err(anyhow::anyhow!("Invalid duration: {:?}", text));
    }
    Ok(duration)
}

/// Re-encodes a narration clip padded with silence to exactly `hold_seconds`,
/// so concatenated clips line up with their display windows.
pub async fn ffmpeg_pad_audio(in_audio: &Path, hold_seconds: u32, out_m4a: &Path) -> Result<bool> {
    if hold_seconds == 0 {
        return Ok(false);
    }

    let args = pad_args(in_audio, hold_seconds, out_m4a);
    if let Err(err) = run_cmd(&args).await {
        logw(format!("Padding failed for {}: {}", in_audio.display(), err));
        return Ok(false);
    }
    Ok(out_m4a.exists())
}

fn pad_args(in_audio: &Path, hold_seconds: u32, out_m4a: &Path) -> Vec<String> {
    vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        in_audio.display().to_string(),
        "-af".to_string(),
        "apad".to_string(),
        "-t".to_string(),
        format!("{:.3}", f64::from(hold_seconds)),
        "-ar".to_string(),
        "44100".to_string(),
        "-ac".to_string(),
        "2".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "192k".to_string(),
        out_m4a.display().to_string(),
    ]
}

pub async fn ffmpeg_concat_audio(list_txt: &Path, out_m4a: &Path) -> Result<bool> {
    let args = vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        list_txt.display().to_string(),
        "-c".to_string(),
        "copy".to_string(),
        out_m4a.display().to_string(),
    ];
    run_cmd(&args).await?;
    Ok(out_m4a.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parses_ffprobe_output() {
        assert_eq!(parse_probe_duration("3.482000").unwrap(), 3.482);
        assert!(parse_probe_duration("N/A").is_err());
        assert!(parse_probe_duration("0.0").is_err());
        assert!(parse_probe_duration("").is_err());
    }

    #[test]
    fn pad_holds_for_window_length() {
        let args = pad_args(
            &PathBuf::from("audio/page_01.wav"),
            7,
            &PathBuf::from("audio/page_01_padded.m4a"),
        );
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "7.000");
        assert!(args.contains(&"apad".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("audio/page_01_padded.m4a"));
    }
}
