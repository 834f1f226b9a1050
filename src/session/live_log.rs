//! Post-execution additions to the per-notebook live log files.
//!
//! While a cell runs, the `%%live_log` wrapper mirrors its input and stdout to `<notebook>.log` (one
//! `<notebook>.log-<rank>` per process under MPI). Once the cell is done the runner appends the failure, if any,
//! and the rich outputs the wrapper cannot see.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use nbvalx_core::lang::magics::{self, MagicId};
use regex::Regex;
use serde_json::Value as Json;

pub const FAILURE_SECTION: &str = "Failure";
pub const OUTPUT_SECTION: &str = "Output (jupyter)";

static ANSI_COLOR: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\x1B\[\d+(;\d+){0,2}m").ok());

/// Remove terminal color codes.
pub fn strip_ansi(text: &str) -> String {
    match ANSI_COLOR.as_ref() {
        Some(pattern) => pattern.replace_all(text, "").into_owned(),
        None => text.to_string(),
    }
}

/// Whether the cell source carries the live log wrapper.
pub fn is_logged(source: &str) -> bool {
    source.contains(&magics::cell_prefix(MagicId::LiveLog))
}

/// Every log file of the notebook at `ipynb_path`, sorted.
pub fn log_files(ipynb_path: &Path) -> io::Result<Vec<PathBuf>> {
    let Some(stem) = ipynb_path.file_stem().map(|s| format!("{}.log", s.to_string_lossy())) else {
        return Ok(Vec::new());
    };
    let dir = match ipynb_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with(&stem) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Append `<section>:` and `content` to every log file of the notebook.
pub fn append_section(ipynb_path: &Path, section: &str, content: &str) -> io::Result<()> {
    let content = strip_ansi(content);
    for path in log_files(ipynb_path)? {
        let mut file = OpenOptions::new().append(true).open(&path)?;
        writeln!(file, "{section}:")?;
        writeln!(file, "{content}")?;
    }
    Ok(())
}

fn text_of(value: Option<&Json>) -> String {
    match value {
        Some(Json::String(text)) => text.clone(),
        Some(Json::Array(lines)) => lines.iter().filter_map(Json::as_str).collect(),
        _ => String::new(),
    }
}

/// Render the outputs not captured by the wrapper: `[stream] text` and `[output_type] text/plain`.
///
/// Consecutive chunks of the same stream are merged first.
pub fn render_outputs(outputs: &[Json]) -> String {
    let mut rendered: Vec<(Option<String>, String)> = Vec::new();
    for output in outputs {
        let output_type = output.get("output_type").and_then(Json::as_str).unwrap_or_default();
        match output_type {
            "stream" => {
                let name = output.get("name").and_then(Json::as_str).unwrap_or("stdout").to_string();
                let text = text_of(output.get("text"));
                match rendered.last_mut() {
                    Some((Some(last), body)) if *last == name => body.push_str(&text),
                    _ => rendered.push((Some(name), text)),
                }
            }
            "display_data" | "execute_result" => {
                if let Some(plain) = output.get("data").and_then(|data| data.get("text/plain")) {
                    rendered.push((None, format!("[{output_type}] {}", text_of(Some(plain)))));
                }
            }
            _ => {}
        }
    }
    if rendered.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = rendered
        .into_iter()
        .map(|(stream, body)| match stream {
            Some(name) => format!("[{name}] {body}"),
            None => body,
        })
        .collect();
    format!("\n{}", lines.join("\n")).trim_matches('\n').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[0;31mError\x1b[0m: bad"), "Error: bad");
        assert_eq!(strip_ansi("\x1b[1;32;40mok"), "ok");
    }

    #[test]
    fn test_render_outputs() {
        let outputs = vec![
            json!({"output_type": "stream", "name": "stdout", "text": ["a\n"]}),
            json!({"output_type": "stream", "name": "stdout", "text": "b\n"}),
            json!({"output_type": "execute_result", "data": {"text/plain": "42"}, "metadata": {}}),
            json!({"output_type": "display_data", "data": {"image/png": "..."}, "metadata": {}}),
        ];
        assert_eq!(render_outputs(&outputs), "[stdout] a\nb\n\n[execute_result] 42");
        assert_eq!(render_outputs(&[]), "");
    }

    #[test]
    fn test_append_to_every_rank_file() {
        let dir = tempfile::tempdir().unwrap();
        let nb = dir.path().join("demo[a=1].ipynb");
        fs::write(dir.path().join("demo[a=1].log-0"), "").unwrap();
        fs::write(dir.path().join("demo[a=1].log-1"), "").unwrap();
        fs::write(dir.path().join("demo[a=2].log"), "").unwrap();

        append_section(&nb, FAILURE_SECTION, "\x1b[31mboom\x1b[0m").unwrap();

        for rank in 0..2 {
            let text = fs::read_to_string(dir.path().join(format!("demo[a=1].log-{rank}"))).unwrap();
            assert_eq!(text, "Failure:\nboom\n");
        }
        assert_eq!(fs::read_to_string(dir.path().join("demo[a=2].log")).unwrap(), "");
    }

    #[test]
    fn test_is_logged() {
        assert!(is_logged("%%px\n%%live_log\nx = 1"));
        assert!(!is_logged("x = 1"));
    }
}
