//! End-to-end tests of the session start pass on scratch directories.

use std::fs;
use std::path::Path;

use nbvalx::magics::RecordingShell;
use nbvalx::notebook::{Cell, Notebook, read_notebook, write_notebook};
use nbvalx::outcome::{CellItem, OutcomeTracker};
use nbvalx::session::runner::{ExtensionExecutor, TestReporter, TestResult, TestSummary, run_items};
use nbvalx::{Action, Session, SessionConfig};

fn tagged_notebook() -> Notebook {
    Notebook::from_cells(vec![
        Cell::markdown("# Demo"),
        Cell::code("%load_ext nbvalx"),
        Cell::code("%%register_allowed_run_if_tags\nbackend: \"cpu\", \"gpu\"\nprecision: 32, 64"),
        Cell::code("%%register_current_run_if_tags\nbackend = \"cpu\"\nprecision = 32"),
        Cell::code("__notebook_name__ = \"demo.ipynb\""),
        Cell::code("%%run_if backend == \"gpu\"\nimport cupy"),
        Cell::code("%%run_if precision == 64\n# PYTEST_XFAIL: double precision is flaky\nrun_double()"),
        Cell::code("print('done')"),
    ])
}

fn session(config: SessionConfig) -> Session {
    Session::new_unchecked(config)
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_one_notebook_per_combination() {
    let dir = tempfile::tempdir().unwrap();
    write_notebook(&tagged_notebook(), &dir.path().join("demo.ipynb")).unwrap();

    let written = session(SessionConfig::default().with_work_dir("out"))
        .start(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(written.len(), 4);
    assert_eq!(
        file_names(&dir.path().join("out")),
        vec![
            "demo[backend=cpu,precision=32].ipynb",
            "demo[backend=cpu,precision=64].ipynb",
            "demo[backend=gpu,precision=32].ipynb",
            "demo[backend=gpu,precision=64].ipynb",
        ]
    );

    let gpu = read_notebook(&dir.path().join("out/demo[backend=gpu,precision=64].ipynb")).unwrap();
    insta::assert_snapshot!(gpu.cells[4].source, @r#"
    %%live_log
    %%register_current_run_if_tags
    backend = 'gpu'
    precision = 64
    "#);
    assert_eq!(
        gpu.cells[5].source,
        "%%live_log\n__notebook_name__ = \"out/demo[backend=gpu,precision=64].ipynb\""
    );
}

#[test]
fn test_keyword_selects_one_combination() {
    let dir = tempfile::tempdir().unwrap();
    write_notebook(&tagged_notebook(), &dir.path().join("demo.ipynb")).unwrap();
    write_notebook(
        &Notebook::from_cells(vec![Cell::code("x = 1")]),
        &dir.path().join("plain.ipynb"),
    )
    .unwrap();

    let config = SessionConfig::default()
        .with_work_dir("out")
        .with_keyword(Some("backend=gpu,precision=32".to_string()));
    let written = session(config).start(&[dir.path().to_path_buf()]).unwrap();

    let labels: Vec<_> = written.iter().map(|m| m.label.clone()).collect();
    assert_eq!(labels, vec![Some("backend=gpu,precision=32".to_string())]);
}

#[test]
fn test_rerun_is_byte_identical_and_cleans_stale_notebooks() {
    let dir = tempfile::tempdir().unwrap();
    write_notebook(&tagged_notebook(), &dir.path().join("demo.ipynb")).unwrap();
    let stale = dir.path().join("out/demo[backend=tpu,precision=16].ipynb");
    write_notebook(&Notebook::default(), &stale).unwrap();

    let config = SessionConfig::default().with_work_dir("out").with_tag_collapse(true);
    let target = dir.path().join("out/demo[backend=cpu,precision=64].ipynb");

    session(config.clone()).start(&[dir.path().to_path_buf()]).unwrap();
    let first = fs::read(&target).unwrap();
    session(config).start(&[dir.path().to_path_buf()]).unwrap();
    let second = fs::read(&target).unwrap();

    assert_eq!(first, second);
    assert!(!stale.exists());
}

#[test]
fn test_collapse_drops_unreachable_cells() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("demo.ipynb");
    write_notebook(&tagged_notebook(), &source).unwrap();

    let config = SessionConfig::default()
        .with_work_dir("out")
        .with_tag_collapse(true)
        .with_action(Action::CreateNotebooks);
    let written = session(config).materialize(&source).unwrap();

    let cpu32: Vec<&str> = written[0].notebook.cells.iter().map(|c| c.source.as_str()).collect();
    assert_eq!(
        cpu32,
        vec![
            "# Demo",
            "__notebook_name__ = \"out/demo[backend=cpu,precision=32].ipynb\"",
            "print('done')",
        ]
    );

    let cpu64 = &written[1].notebook.cells;
    insta::assert_snapshot!(cpu64[2].source, @r#"
    # PYTEST_XFAIL: double precision is flaky
    """
    run_double()
    """  # noqa: D
    "#);
}

#[test]
fn test_parallel_collect_layout() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("demo.ipynb");
    write_notebook(&Notebook::from_cells(vec![Cell::code("x = 1")]), &source).unwrap();

    let config = SessionConfig::default().with_np(2).with_gc_bracket(true);
    let s = session(config);
    let written = s.materialize(&source).unwrap();
    assert_eq!(
        written[0].path,
        dir.path().join(".ipynb_pytest/np_2/collapse_False/demo.ipynb")
    );

    let items = s.collect(&written);
    let ids: Vec<Option<&str>> = items.iter().map(|item| item.cell_id.as_deref()).collect();
    assert_eq!(
        ids,
        vec![
            Some("cluster_start"),
            Some("gc_disable"),
            Some("live_log_magic"),
            None,
            Some("gc_enable"),
            Some("cluster_stop"),
        ]
    );
    assert_eq!(items[3].source, "%%px --no-stream\n%%live_log\nx = 1");
}

#[test]
fn test_invalid_setup_aborts_the_notebook() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("broken.ipynb");
    write_notebook(
        &Notebook::from_cells(vec![
            Cell::code("%load_ext nbvalx"),
            Cell::code("%%register_allowed_run_if_tags\nbackend: cpu"),
        ]),
        &source,
    )
    .unwrap();

    let s = session(SessionConfig::default().with_work_dir("out"));
    let err = s.start(&[source.clone()]).unwrap_err();
    assert!(err.to_string().contains("broken.ipynb"));
    assert!(!dir.path().join("out").exists());
}

#[derive(Default)]
struct Recorder {
    results: Vec<(String, TestResult)>,
}

impl TestReporter for Recorder {
    fn on_collection_complete(&mut self, _item_count: usize) {}

    fn on_test_start(&mut self, _item: &CellItem) {}

    fn on_test_complete(&mut self, item: &CellItem, result: &TestResult) {
        self.results.push((item.name(), result.clone()));
    }

    fn on_run_complete(&mut self, _summary: &TestSummary) {}
}

#[test]
fn test_dry_run_of_materialized_notebooks() {
    let dir = tempfile::tempdir().unwrap();
    write_notebook(&tagged_notebook(), &dir.path().join("demo.ipynb")).unwrap();
    let config = SessionConfig::default()
        .with_work_dir("out")
        .with_keyword(Some("backend=cpu,precision=64".to_string()));
    let s = session(config);
    let written = s.start(&[dir.path().to_path_buf()]).unwrap();
    let items = s.collect(&written);

    let mut executor = ExtensionExecutor::new(RecordingShell::new().failing_on("run_double"));
    let mut reporter = Recorder::default();
    let summary = run_items(items, OutcomeTracker::new(1), &mut executor, &mut reporter);

    assert_eq!(summary.total, 8);
    assert_eq!(summary.xfailed, 1);
    assert_eq!(reporter.results[6].0, "Cell 6");
    assert!(matches!(reporter.results[6].1, TestResult::XFailed(..)));
    assert!(summary.is_success());
    let log = fs::read_to_string(dir.path().join("out/demo[backend=cpu,precision=64].log"));
    // The log file is created by the notebook itself when it runs in a kernel.
    assert!(log.is_err());
}
