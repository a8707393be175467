//! Text, JSON, and Markdown rendering of reports.

use hotmap_core::OutputFormat;
use hotmap_gitpulse::folders::FolderResult;
use hotmap_gitpulse::pipeline::Report;
use hotmap_gitpulse::scoring::FileResult;

pub fn files(report: &Report, limit: usize, format: OutputFormat) -> Result<String, serde_json::Error> {
    let top: Vec<&FileResult> = report.files.iter().take(limit).collect();
    match format {
        OutputFormat::Json => json(&serde_json::json!({
            "mode": report.mode,
            "totalFiles": report.files.len(),
            "files": top,
        })),
        OutputFormat::Markdown => {
            let mut out = format!("# Hotspot files ({} mode)\n\n", report.mode);
            if top.is_empty() {
                out.push_str("No file activity in the selected window.\n");
                return Ok(out);
            }
            out.push_str("| Rank | File | Score | Commits | Churn | LoC | Owners |\n");
            out.push_str("|------|------|-------|---------|-------|-----|--------|\n");
            for (i, f) in top.iter().enumerate() {
                out.push_str(&format!(
                    "| {} | `{}` | {:.2} | {} | {} | {} | {} |\n",
                    i + 1,
                    f.path,
                    f.mode_score,
                    f.commits,
                    f.churn,
                    f.lines_of_code,
                    f.owners.join(", "),
                ));
            }
            Ok(out)
        }
        OutputFormat::Text => {
            let mut out = format!("Hotspot files ({} mode, top {limit}):\n", report.mode);
            out.push_str(&format!("{:-<72}\n", ""));
            if top.is_empty() {
                out.push_str("  No file activity in the selected window.\n");
                return Ok(out);
            }
            for (i, f) in top.iter().enumerate() {
                out.push_str(&format!(
                    "{:>2}. {:<40} score={:.2}  commits={}  churn={}  loc={}  owners={}\n",
                    i + 1,
                    f.path,
                    f.mode_score,
                    f.commits,
                    f.churn,
                    f.lines_of_code,
                    owners_or_dash(&f.owners),
                ));
            }
            Ok(out)
        }
    }
}

pub fn folders(report: &Report, limit: usize, format: OutputFormat) -> Result<String, serde_json::Error> {
    let top: Vec<&FolderResult> = report.folders.iter().take(limit).collect();
    match format {
        OutputFormat::Json => json(&serde_json::json!({
            "mode": report.mode,
            "totalFolders": report.folders.len(),
            "folders": top,
        })),
        OutputFormat::Markdown => {
            let mut out = format!("# Hotspot folders ({} mode)\n\n", report.mode);
            if top.is_empty() {
                out.push_str("No folder activity in the selected window.\n");
                return Ok(out);
            }
            out.push_str("| Rank | Folder | Score | Files | Commits | Churn | LoC | Owners |\n");
            out.push_str("|------|--------|-------|-------|---------|-------|-----|--------|\n");
            for (i, f) in top.iter().enumerate() {
                out.push_str(&format!(
                    "| {} | `{}` | {:.2} | {} | {} | {} | {} | {} |\n",
                    i + 1,
                    f.path,
                    f.score,
                    f.files,
                    f.commits,
                    f.churn,
                    f.total_loc,
                    f.owners.join(", "),
                ));
            }
            Ok(out)
        }
        OutputFormat::Text => {
            let mut out = format!("Hotspot folders ({} mode, top {limit}):\n", report.mode);
            out.push_str(&format!("{:-<72}\n", ""));
            if top.is_empty() {
                out.push_str("  No folder activity in the selected window.\n");
                return Ok(out);
            }
            for (i, f) in top.iter().enumerate() {
                out.push_str(&format!(
                    "{:>2}. {:<32} score={:.2}  files={}  commits={}  churn={}  loc={}  owners={}\n",
                    i + 1,
                    f.path,
                    f.score,
                    f.files,
                    f.commits,
                    f.churn,
                    f.total_loc,
                    owners_or_dash(&f.owners),
                ));
            }
            Ok(out)
        }
    }
}

fn json(value: &serde_json::Value) -> Result<String, serde_json::Error> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}

fn owners_or_dash(owners: &[String]) -> String {
    if owners.is_empty() {
        "-".into()
    } else {
        owners.join(", ")
    }
}
