//! The curated configuration matrix.
//!
//! The matrix is data, not logic: a fixed, hand-picked sample of
//! configurations chosen for representativeness rather than exhaustiveness.
//! The driver is generic over any plan, which also lets tests inject
//! synthetic matrices.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::envprobe::EnvironmentProfile;
use crate::layout::ProjectLayout;

/// One configuration-option combination passed to the build toolchain.
/// Immutable once defined; duplicates across the matrix are permitted by
/// design.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlagSet(Vec<String>);

impl FlagSet {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tokens.into_iter().map(Into::into).collect())
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy of this flag set with one extra token appended.
    pub fn with(&self, extra: &str) -> Self {
        let mut tokens = self.0.clone();
        tokens.push(extra.to_string());
        Self(tokens)
    }
}

impl fmt::Display for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("default settings")
        } else {
            f.write_str(&self.0.join(" "))
        }
    }
}

/// Where a variant's build directory sits relative to the source tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildPlacement {
    InTree,
    OutOfTree,
}

/// One point in the configuration matrix.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatrixEntry {
    pub flags: FlagSet,

    /// Extra compile-flag overlay for this entry, on top of the environment
    /// probe's warning flags.
    #[serde(default)]
    pub cflags: Vec<String>,

    /// Extra link-flag overlay for this entry.
    #[serde(default)]
    pub ldflags: Vec<String>,

    /// Run every suite under the memory-check wrapper.
    #[serde(default)]
    pub memcheck: bool,

    pub placement: BuildPlacement,
}

impl MatrixEntry {
    /// In-tree entry with no overlays.
    pub fn in_tree(flags: FlagSet) -> Self {
        Self {
            flags,
            cflags: Vec::new(),
            ldflags: Vec::new(),
            memcheck: false,
            placement: BuildPlacement::InTree,
        }
    }
}

/// A contiguous group of matrix entries. `distclean_before` forces a full
/// clean of the previous build state before the phase's first entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixPhase {
    pub name: String,
    pub distclean_before: bool,
    pub entries: Vec<MatrixEntry>,
}

// ---------------------------------------------------------------------------
// The fixed sample
// ---------------------------------------------------------------------------

/// Flag set for the optimizer-diagnostics variant: every major feature on,
/// so optimization-dependent warnings have the widest surface to show up in.
const MAXIMAL: &[&str] = &[
    "--enable-utf",
    "--enable-unicode-properties",
    "--enable-jit",
    "--enable-16bit",
    "--enable-32bit",
];

/// In-tree sample: default build, UTF, recursion strategy, Unicode property
/// tables, link size, chartable rebuild, every newline convention, JIT, the
/// 16-bit and 32-bit libraries alone and combined, with and without the
/// 8-bit library.
const IN_TREE: &[&[&str]] = &[
    &[],
    &["--enable-utf"],
    &["--enable-utf", "--enable-unicode-properties"],
    &["--disable-stack-recursion"],
    &["--enable-utf", "--disable-stack-recursion"],
    &["--with-link-size=3"],
    &["--with-link-size=4"],
    &["--enable-utf", "--with-link-size=3"],
    &["--enable-rebuild-chartables"],
    &["--enable-utf", "--enable-rebuild-chartables"],
    &["--enable-newline-is-cr"],
    &["--enable-newline-is-lf"],
    &["--enable-newline-is-crlf"],
    &["--enable-newline-is-anycrlf"],
    &["--enable-newline-is-any"],
    &["--enable-utf", "--enable-newline-is-any"],
    &["--enable-jit"],
    &["--enable-jit", "--enable-utf"],
    &["--enable-jit", "--enable-utf", "--enable-unicode-properties"],
    &["--enable-16bit"],
    &["--enable-16bit", "--enable-utf"],
    &["--enable-16bit", "--disable-8bit"],
    &["--enable-16bit", "--enable-utf", "--disable-8bit"],
    &["--enable-32bit"],
    &["--enable-32bit", "--enable-utf"],
    &["--enable-32bit", "--disable-8bit"],
    &["--enable-32bit", "--enable-utf", "--disable-8bit"],
    &["--enable-16bit", "--enable-32bit"],
    &["--enable-16bit", "--enable-32bit", "--enable-utf"],
    &["--enable-16bit", "--enable-32bit", "--disable-8bit"],
    &["--enable-jit", "--enable-16bit", "--enable-utf"],
    &["--enable-jit", "--enable-32bit", "--enable-utf"],
    &[
        "--enable-16bit",
        "--enable-32bit",
        "--enable-utf",
        "--enable-unicode-properties",
    ],
    &["--enable-jit", "--enable-utf", "--enable-newline-is-anycrlf"],
];

/// Memory-check sample: a small re-run of representative configurations
/// under the wrapper. Each also gets the build-time instrumentation flag.
const MEMCHECK: &[&[&str]] = &[
    &[],
    &["--enable-utf", "--enable-unicode-properties"],
    &["--enable-jit", "--enable-utf"],
    &["--enable-16bit", "--enable-utf"],
    &["--enable-32bit", "--enable-utf"],
];

/// Out-of-tree validation build.
const OUT_OF_TREE: &[&str] = &["--enable-utf", "--enable-jit"];

/// The fixed, hand-curated plan: an optional optimizer-diagnostics variant,
/// the in-tree sample, the memory-check sample, and one out-of-tree build.
pub fn standard_plan(env: &EnvironmentProfile, layout: &ProjectLayout) -> Vec<MatrixPhase> {
    let mut phases = Vec::new();

    // Optimizer-dependent diagnostics need the extended warning set.
    if env.extended_warnings {
        phases.push(MatrixPhase {
            name: "optimized".to_string(),
            distclean_before: false,
            entries: vec![MatrixEntry {
                flags: FlagSet::new(MAXIMAL.iter().copied()),
                cflags: vec!["-O2".to_string()],
                ldflags: Vec::new(),
                memcheck: false,
                placement: BuildPlacement::InTree,
            }],
        });
    }

    phases.push(MatrixPhase {
        name: "in-tree".to_string(),
        distclean_before: false,
        entries: IN_TREE
            .iter()
            .map(|tokens| MatrixEntry::in_tree(FlagSet::new(tokens.iter().copied())))
            .collect(),
    });

    phases.push(MatrixPhase {
        name: "memcheck".to_string(),
        distclean_before: true,
        entries: MEMCHECK
            .iter()
            .map(|tokens| {
                let flags = FlagSet::new(tokens.iter().copied()).with(&layout.memcheck_flag);
                MatrixEntry {
                    memcheck: true,
                    ..MatrixEntry::in_tree(flags)
                }
            })
            .collect(),
    });

    phases.push(MatrixPhase {
        name: "out-of-tree".to_string(),
        distclean_before: true,
        entries: vec![MatrixEntry {
            flags: FlagSet::new(OUT_OF_TREE.iter().copied()),
            cflags: Vec::new(),
            ldflags: Vec::new(),
            memcheck: false,
            placement: BuildPlacement::OutOfTree,
        }],
    });

    phases
}

/// Deterministic digest of the ordered plan.
pub fn plan_digest(phases: &[MatrixPhase]) -> String {
    let mut hasher = Sha256::new();
    for phase in phases {
        for entry in &phase.entries {
            hasher.update(entry.flags.to_string().as_bytes());
            hasher.update(b"\0");
            if entry.memcheck {
                hasher.update(b"memcheck\0");
            }
        }
    }
    hex::encode(hasher.finalize())
}
