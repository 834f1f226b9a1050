use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use nbvalx_core::lang::{bookkeeping, magics, markers};

/// Guardrail against reintroducing stringly-typed vocabulary checks.
///
/// This is intentionally a **coarse** safety net. It looks for suspicious patterns like `== "run_if"` or
/// `.starts_with("PYTEST_XFAIL")` in Rust source files where we expect callers to go through the
/// `nbvalx_core::lang` registries instead.
///
/// Notes:
/// - We allow occurrences in `crates/nbvalx_core/src/lang/**` (registries themselves) and in tests.
/// - Unit-test modules (everything after `#[cfg(test)]`) are not scanned.
#[test]
fn no_new_stringly_vocab_checks_in_rust_sources() {
    let root = repo_root();
    let spellings = spellings();
    let mut offenders: Vec<(PathBuf, usize, String)> = Vec::new();

    let targets = [root.join("src"), root.join("crates")];
    for dir in targets {
        if dir.exists() {
            scan_dir(&root, &dir, &spellings, &mut offenders);
        }
    }

    if !offenders.is_empty() {
        let mut msg = String::new();
        msg.push_str("Found potential stringly-typed vocabulary checks. Prefer nbvalx_core registries.\n\n");
        for (path, line_no, line) in offenders.into_iter().take(80) {
            msg.push_str(&format!(
                "- {}:{}: {}\n",
                path.strip_prefix(&root).unwrap_or(&path).display(),
                line_no,
                line.trim()
            ));
        }
        panic!("{msg}");
    }
}

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn spellings() -> Vec<String> {
    let mut set: BTreeSet<String> = BTreeSet::new();

    for m in magics::MAGICS {
        set.insert(m.item.canonical.to_string());
        set.insert(magics::line_prefix(m.item.id));
        set.insert(magics::cell_prefix(m.item.id));
    }
    for m in markers::MARKERS {
        set.insert(m.item.canonical.to_string());
    }
    set.insert(markers::MARKER_FAMILY_PREFIX.to_string());
    for b in bookkeeping::BOOKKEEPING_CELLS {
        set.insert(b.item.canonical.to_string());
    }
    set.insert(magics::NOTEBOOK_NAME_MARKER.to_string());

    set.into_iter().collect()
}

fn is_allowed_file(root: &Path, path: &Path) -> bool {
    let rel = path.strip_prefix(root).unwrap_or(path).to_string_lossy();
    if !rel.ends_with(".rs") {
        return true;
    }
    // Registries define the spellings; allow them.
    if rel.starts_with("crates/nbvalx_core/src/lang/") {
        return true;
    }
    // Tests can mention spellings directly.
    if rel.starts_with("tests/") || rel.contains("/tests/") {
        return true;
    }
    false
}

fn scan_dir(root: &Path, dir: &Path, spellings: &[String], offenders: &mut Vec<(PathBuf, usize, String)>) {
    let Ok(entries) = fs::read_dir(dir) else { return };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            scan_dir(root, &path, spellings, offenders);
            continue;
        }
        if is_allowed_file(root, &path) {
            continue;
        }
        let Ok(contents) = fs::read_to_string(&path) else {
            continue;
        };
        for (idx, line) in contents.lines().enumerate() {
            if line.trim_start().starts_with("#[cfg(test)]") {
                break;
            }
            if is_suspicious_line(line, spellings) {
                offenders.push((path.clone(), idx + 1, line.to_string()));
            }
        }
    }
}

fn is_suspicious_line(line: &str, spellings: &[String]) -> bool {
    // Avoid false positives in comments/docstrings.
    let trimmed = line.trim_start();
    if trimmed.starts_with("//") {
        return false;
    }

    // Patterns we consider "stringly vocab checks":
    // - `... == "spelling"`
    // - `"spelling" => ...`
    // - `.starts_with("spelling")` / `.contains("spelling")`
    for s in spellings {
        let patterns = [
            format!("== \"{s}\""),
            format!("\"{s}\" =>"),
            format!("starts_with(\"{s}"),
            format!("contains(\"{s}"),
        ];
        if patterns.iter().any(|p| line.contains(p.as_str())) {
            return true;
        }
    }

    false
}
