//! Names of the external collaborators the orchestrator drives.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// External command and binary names for the project under test.
///
/// Everything the orchestrator invokes is named here, so a harness can point
/// a whole run at scripted stand-ins without touching the decision logic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectLayout {
    /// Configure script, relative to the source root.
    pub configure: String,

    /// Make program.
    pub make: String,

    /// Extra arguments for the compile step (internal parallelism such as
    /// `-j4` is allowed; it does not affect entry sequencing).
    pub make_args: Vec<String>,

    /// The artifact's self-reporting test program, relative to the build dir.
    pub probe_bin: String,

    /// Core library test suite script.
    pub lib_suite: String,

    /// Auxiliary command-line-tool test suite script.
    pub tool_suite: String,

    /// JIT regression test binary.
    pub jit_suite: String,

    /// Fixed set of per-binary unit tests.
    pub unit_test_bins: Vec<String>,

    /// Memory-check wrapper command and arguments.
    pub memcheck_prefix: Vec<String>,

    /// Build-time flag that compiles memory-check instrumentation into the
    /// artifact itself.
    pub memcheck_flag: String,

    /// Temporary directory used by the out-of-tree phase.
    pub out_of_tree_dir: PathBuf,
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self {
            configure: "configure".to_string(),
            make: "make".to_string(),
            make_args: Vec::new(),
            probe_bin: "rxtest".to_string(),
            lib_suite: "RunLibTest".to_string(),
            tool_suite: "RunToolTest".to_string(),
            jit_suite: "rxjit_test".to_string(),
            unit_test_bins: vec![
                "rxposix_test".to_string(),
                "rxsubstring_test".to_string(),
                "rxserialize_test".to_string(),
            ],
            memcheck_prefix: vec!["valgrind".to_string(), "-q".to_string()],
            memcheck_flag: "--enable-memcheck".to_string(),
            out_of_tree_dir: PathBuf::from("/tmp/confmatrix-build"),
        }
    }
}
