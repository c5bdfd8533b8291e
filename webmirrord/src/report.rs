//! Console progress surface. Wording is for humans, not a stable format.

use crate::sync::engine::{FailureKind, SyncOutcome, SyncStats, WriteKind};

const RULE_WIDTH: usize = 70;

pub fn file_icon(path: &str) -> &'static str {
    let lower = path.to_ascii_lowercase();
    let ext = lower.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    match ext {
        "html" | "htm" => "📄",
        "css" => "🎨",
        "js" => "⚙️",
        "jpg" | "jpeg" | "png" | "gif" | "svg" | "ico" | "webp" => "🖼️",
        "woff" | "woff2" | "ttf" | "eot" | "otf" => "🔤",
        _ => "📦",
    }
}

pub fn status_glyph(outcome: SyncOutcome) -> &'static str {
    match outcome {
        SyncOutcome::Written(WriteKind::New) => "✨",
        SyncOutcome::Written(WriteKind::Updated) => "🔄",
        SyncOutcome::Unchanged => "⏭️",
        SyncOutcome::Failed(_) => "❌",
    }
}

fn status_label(outcome: SyncOutcome) -> &'static str {
    match outcome {
        SyncOutcome::Written(WriteKind::New) => "new",
        SyncOutcome::Written(WriteKind::Updated) => "updated",
        SyncOutcome::Unchanged => "unchanged",
        SyncOutcome::Failed(FailureKind::NotFoundPage) => "404",
        SyncOutcome::Failed(FailureKind::Fetch) => "fetch failed",
        SyncOutcome::Failed(FailureKind::InvalidPath) => "invalid path",
        SyncOutcome::Failed(FailureKind::Write) => "write failed",
    }
}

pub fn progress_line(
    position: Option<(usize, usize)>,
    path: &str,
    outcome: SyncOutcome,
    detail: Option<&str>,
) -> String {
    let counter = position
        .map(|(index, total)| format!("[{index:3}/{total}] "))
        .unwrap_or_default();
    let label = match detail {
        Some(detail) => format!("{}: {detail}", status_label(outcome)),
        None => status_label(outcome).to_string(),
    };
    format!(
        "{counter}{} {} {path} ({label})",
        status_glyph(outcome),
        file_icon(path)
    )
}

pub fn summary_lines(stats: &SyncStats) -> Vec<String> {
    let mut lines = vec![
        format!("  ✨ new/updated: {}", stats.downloaded),
        format!("  ⏭️  unchanged: {}", stats.skipped),
    ];
    if stats.failed > 0 {
        lines.push(format!("  ❌ failed: {}", stats.failed));
    }
    lines
}

pub fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

pub fn print_pass_header(total: usize) {
    println!("\n{}\n🔄 syncing {total} file(s)\n{}", rule(), rule());
}

pub fn print_progress(
    position: Option<(usize, usize)>,
    path: &str,
    outcome: SyncOutcome,
    detail: Option<&str>,
) {
    println!("{}", progress_line(position, path, outcome, detail));
}

pub fn print_summary(stats: &SyncStats) {
    println!("{}\n✅ sync finished", rule());
    for line in summary_lines(stats) {
        println!("{line}");
    }
    println!("{}", rule());
}

pub fn print_empty_list_hint() {
    println!("❌ file list is empty; add paths to \"files\" in sync_config.json");
}
