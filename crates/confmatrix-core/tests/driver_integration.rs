//! Integration tests for matrix sequencing with the ScriptedExecutor.

use std::path::Path;
use std::sync::Arc;

use confmatrix_core::fakes::ScriptedExecutor;
use confmatrix_core::{
    BuildPlacement, EnvironmentProfile, FlagSet, MatrixDriver, MatrixEntry, MatrixError,
    MatrixPhase, ProjectLayout, Reporter, Suite,
};

fn entry(flags: &[&str]) -> MatrixEntry {
    MatrixEntry::in_tree(FlagSet::new(flags.iter().copied()))
}

fn phase(name: &str, distclean_before: bool, entries: Vec<MatrixEntry>) -> MatrixPhase {
    MatrixPhase {
        name: name.to_string(),
        distclean_before,
        entries,
    }
}

fn baseline_env() -> EnvironmentProfile {
    EnvironmentProfile {
        compiler: "cc".to_string(),
        version_line: Some("gcc (GCC) 12.2.0".to_string()),
        extended_warnings: false,
        warning_flags: Vec::new(),
    }
}

/// Layout whose out-of-tree directory lives inside the test's tempdir.
fn layout_for(dir: &Path) -> ProjectLayout {
    ProjectLayout {
        out_of_tree_dir: dir.join("oot-build"),
        ..ProjectLayout::default()
    }
}

/// Script a variant whose probe reports an LF build with JIT and UTF.
fn script_lf_build(exec: &ScriptedExecutor) {
    exec.respond("rxtest -C jit", 0, "", "");
    exec.respond("rxtest -C utf", 0, "", "");
    exec.respond(
        "rxtest -C",
        0,
        "  8-bit support\n  Newline sequence is LF\n",
        "",
    );
}

fn driver(exec: Arc<ScriptedExecutor>, dir: &Path) -> MatrixDriver {
    MatrixDriver::new(
        exec,
        layout_for(dir),
        dir.to_path_buf(),
        Reporter::new(false),
    )
}

#[tokio::test]
async fn test_full_run_passes_and_runs_applicable_suites() {
    let dir = tempfile::tempdir().expect("tempdir");
    let exec = Arc::new(ScriptedExecutor::new());
    script_lf_build(&exec);

    let plan = vec![phase(
        "in-tree",
        false,
        vec![entry(&[]), entry(&["--enable-utf"]), entry(&["--enable-jit"])],
    )];

    let mut driver = driver(exec.clone(), dir.path());
    driver
        .run(&plan, &baseline_env())
        .await
        .expect("matrix should pass");

    assert_eq!(exec.count_matching("configure"), 3);
    assert_eq!(exec.count_matching("RunLibTest"), 3);
    assert_eq!(exec.count_matching("RunToolTest"), 3);
    assert_eq!(exec.count_matching("rxjit_test"), 3);
    assert_eq!(driver.state().index, 3);
    assert_eq!(driver.state().total, 3);
}

#[tokio::test]
async fn test_failing_entry_short_circuits_the_matrix() {
    let dir = tempfile::tempdir().expect("tempdir");
    let exec = Arc::new(ScriptedExecutor::new());
    script_lf_build(&exec);
    exec.respond("configure --enable-utf", 1, "", "configure: error: no utf");

    let plan = vec![phase(
        "in-tree",
        false,
        vec![
            entry(&[]),
            entry(&["--enable-utf"]),
            entry(&["--with-link-size=3"]),
        ],
    )];

    let mut driver = driver(exec.clone(), dir.path());
    match driver.run(&plan, &baseline_env()).await {
        Err(MatrixError::Configure { code, output }) => {
            assert_eq!(code, 1);
            assert!(output.stderr.contains("no utf"));
        }
        other => panic!("expected Configure error, got {:?}", other),
    }

    // Entry 3 must never be attempted; terminal progress is 2 of 3.
    assert_eq!(exec.count_matching("--with-link-size"), 0);
    assert_eq!(driver.state().index, 2);
    assert_eq!(driver.state().total, 3);
}

#[tokio::test]
async fn test_noisy_successful_build_is_a_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let exec = Arc::new(ScriptedExecutor::new());
    script_lf_build(&exec);
    exec.respond("make", 0, "", "warning: shadowed declaration\n");

    let plan = vec![phase("in-tree", false, vec![entry(&[])])];
    let mut driver = driver(exec.clone(), dir.path());

    match driver.run(&plan, &baseline_env()).await {
        Err(MatrixError::NoisyBuild { output }) => {
            assert!(output.stderr.contains("shadowed"));
        }
        other => panic!("expected NoisyBuild, got {:?}", other),
    }
    // The run never got to the suites.
    assert_eq!(exec.count_matching("RunLibTest"), 0);
}

#[tokio::test]
async fn test_benign_archiver_line_alone_passes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let exec = Arc::new(ScriptedExecutor::new());
    script_lf_build(&exec);
    exec.respond(
        "make",
        0,
        "",
        "ar: `u' modifier ignored since `D' is the default (see `U')\n",
    );

    let plan = vec![phase("in-tree", false, vec![entry(&[])])];
    let mut driver = driver(exec, dir.path());
    driver
        .run(&plan, &baseline_env())
        .await
        .expect("archiver line alone must not fail the build");
}

#[tokio::test]
async fn test_suite_failure_carries_captured_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let exec = Arc::new(ScriptedExecutor::new());
    script_lf_build(&exec);
    exec.respond("RunLibTest", 2, "test 7 failed\n", "");

    let plan = vec![phase("in-tree", false, vec![entry(&[]), entry(&["--enable-utf"])])];
    let mut driver = driver(exec.clone(), dir.path());

    match driver.run(&plan, &baseline_env()).await {
        Err(MatrixError::Suite { suite, code, output }) => {
            assert_eq!(suite, "library tests");
            assert_eq!(code, 2);
            assert!(output.stdout.contains("test 7 failed"));
        }
        other => panic!("expected Suite error, got {:?}", other),
    }

    // Later suites of the failing entry and the next entry never run.
    assert_eq!(exec.count_matching("RunToolTest"), 0);
    assert_eq!(exec.count_matching("configure"), 1);
}

#[tokio::test]
async fn test_cr_newline_skips_suites_with_reasons() {
    let dir = tempfile::tempdir().expect("tempdir");
    let exec = Arc::new(ScriptedExecutor::new());
    exec.respond("rxtest -C jit", 1, "", "");
    exec.respond("rxtest -C utf", 1, "", "");
    exec.respond("rxtest -C", 0, "  Newline sequence is CR\n", "");

    let plan = vec![phase("in-tree", false, vec![entry(&["--enable-newline-is-cr"])])];
    let mut driver = driver(exec.clone(), dir.path());
    driver
        .run(&plan, &baseline_env())
        .await
        .expect("a variant with every suite skipped still passes");

    assert_eq!(exec.count_matching("RunLibTest"), 0);
    assert_eq!(exec.count_matching("RunToolTest"), 0);
    assert_eq!(exec.count_matching("rxjit_test"), 0);

    let skips = &driver.state().skip_notes;
    assert_eq!(skips.len(), 4);
    assert!(skips
        .iter()
        .any(|s| s.suite == Suite::Library && s.reason == "newline is CR"));
    assert!(skips
        .iter()
        .any(|s| s.suite == Suite::Jit && s.reason == "JIT support is not compiled"));
}

#[tokio::test]
async fn test_failing_distclean_blocks_out_of_tree_phase() {
    let dir = tempfile::tempdir().expect("tempdir");
    let exec = Arc::new(ScriptedExecutor::new());
    script_lf_build(&exec);
    exec.respond("make distclean", 2, "", "make: *** no makefile\n");

    let plan = vec![
        phase("in-tree", false, vec![entry(&[])]),
        phase(
            "out-of-tree",
            true,
            vec![MatrixEntry {
                placement: BuildPlacement::OutOfTree,
                ..entry(&["--enable-utf"])
            }],
        ),
    ];

    let layout = layout_for(dir.path());
    let oot = layout.out_of_tree_dir.clone();
    let mut driver = MatrixDriver::new(
        exec.clone(),
        layout,
        dir.path().to_path_buf(),
        Reporter::new(false),
    );

    match driver.run(&plan, &baseline_env()).await {
        Err(MatrixError::Clean { code, .. }) => assert_eq!(code, 2),
        other => panic!("expected Clean error, got {:?}", other),
    }

    // The temporary directory must never have been created or entered.
    assert!(!oot.exists());
    assert_eq!(exec.count_matching("configure --enable-utf"), 0);
}

#[tokio::test]
async fn test_out_of_tree_builds_in_temp_dir_and_removes_it() {
    let dir = tempfile::tempdir().expect("tempdir");
    let exec = Arc::new(ScriptedExecutor::new());
    script_lf_build(&exec);

    let plan = vec![
        phase("in-tree", false, vec![entry(&[])]),
        phase(
            "out-of-tree",
            true,
            vec![MatrixEntry {
                placement: BuildPlacement::OutOfTree,
                ..entry(&["--enable-utf"])
            }],
        ),
    ];

    let layout = layout_for(dir.path());
    let oot = layout.out_of_tree_dir.clone();
    let mut driver = MatrixDriver::new(
        exec.clone(),
        layout,
        dir.path().to_path_buf(),
        Reporter::new(false),
    );

    driver
        .run(&plan, &baseline_env())
        .await
        .expect("out-of-tree phase should pass");

    // The out-of-tree configure pointed back at the source tree but ran in
    // the temporary directory, which is gone now that the phase passed.
    let oot_configure = exec
        .invocations()
        .into_iter()
        .find(|inv| inv.cwd == oot)
        .expect("an invocation ran in the temporary directory");
    assert!(oot_configure.program.starts_with(dir.path().to_str().unwrap()));
    assert!(!oot.exists());
}

#[tokio::test]
async fn test_out_of_tree_path_occupied_by_file_is_setup_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let exec = Arc::new(ScriptedExecutor::new());
    script_lf_build(&exec);

    let layout = layout_for(dir.path());
    std::fs::write(&layout.out_of_tree_dir, b"not a directory").expect("write");

    let plan = vec![phase(
        "out-of-tree",
        false,
        vec![MatrixEntry {
            placement: BuildPlacement::OutOfTree,
            ..entry(&[])
        }],
    )];

    let mut driver = MatrixDriver::new(
        exec,
        layout,
        dir.path().to_path_buf(),
        Reporter::new(false),
    );

    match driver.run(&plan, &baseline_env()).await {
        Err(MatrixError::Setup { reason }) => {
            assert!(reason.contains("not a directory"));
        }
        other => panic!("expected Setup error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_memcheck_entry_wraps_suites_and_instruments_build() {
    let dir = tempfile::tempdir().expect("tempdir");
    let exec = Arc::new(ScriptedExecutor::new());
    script_lf_build(&exec);

    let mut mc = entry(&["--enable-utf", "--enable-memcheck"]);
    mc.memcheck = true;
    let plan = vec![phase("memcheck", false, vec![mc])];

    let mut driver = driver(exec.clone(), dir.path());
    driver
        .run(&plan, &baseline_env())
        .await
        .expect("memcheck entry should pass");

    assert_eq!(exec.count_matching("configure --enable-utf --enable-memcheck"), 1);
    assert_eq!(exec.count_matching("valgrind -q ./RunLibTest"), 1);
    assert_eq!(exec.count_matching("valgrind -q ./RunToolTest"), 1);
    // The probe itself runs unwrapped.
    assert_eq!(exec.count_matching("valgrind -q ./rxtest"), 0);
}

#[tokio::test]
async fn test_warning_overlay_is_passed_to_configure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let exec = Arc::new(ScriptedExecutor::new());
    script_lf_build(&exec);

    let env = EnvironmentProfile {
        extended_warnings: true,
        warning_flags: vec!["-Wall".to_string(), "-Wextra".to_string()],
        ..baseline_env()
    };

    let mut opt = entry(&["--enable-utf"]);
    opt.cflags = vec!["-O2".to_string()];
    let plan = vec![phase("optimized", false, vec![opt])];

    let mut driver = driver(exec.clone(), dir.path());
    driver.run(&plan, &env).await.expect("run failed");

    let configure = exec
        .invocations()
        .into_iter()
        .find(|inv| inv.command_line().contains("configure"))
        .expect("configure ran");
    let cflags = configure
        .env
        .iter()
        .find(|(k, _)| k == "CFLAGS")
        .map(|(_, v)| v.clone())
        .expect("CFLAGS overlay present");
    assert_eq!(cflags, "-Wall -Wextra -O2");
}

#[tokio::test]
async fn test_two_runs_classify_identically() {
    let plan = vec![phase(
        "in-tree",
        false,
        vec![entry(&[]), entry(&["--enable-utf"]), entry(&["--enable-newline-is-cr"])],
    )];

    let mut traces = Vec::new();
    for _ in 0..2 {
        let dir = tempfile::tempdir().expect("tempdir");
        let exec = Arc::new(ScriptedExecutor::new());
        exec.respond("rxtest -C jit", 1, "", "");
        exec.respond("rxtest -C utf", 0, "", "");
        exec.respond("rxtest -C", 0, "  Newline sequence is ANY\n", "");

        let mut driver = driver(exec.clone(), dir.path());
        driver
            .run(&plan, &baseline_env())
            .await
            .expect("run failed");

        // Strip the tempdir prefix so the traces are comparable.
        let prefix = dir.path().to_str().unwrap().to_string();
        traces.push(
            exec.command_lines()
                .into_iter()
                .map(|line| line.replace(&prefix, "<src>"))
                .collect::<Vec<_>>(),
        );
    }

    assert_eq!(traces[0], traces[1]);
}
