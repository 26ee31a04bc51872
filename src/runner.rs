//! Run loop - walk, parse, patch, and render the last tree
//!
//! Files are processed strictly one after another. The most recently parsed
//! tree is carried through the loop as an explicit accumulator and rendered
//! once, after the walk is exhausted, to the configured output file.

use crate::config::ThemeConfig;
use crate::output::{write_atomic, OutputError};
use crate::patch::{apply_rules, FieldChange, PatchReport, Rule};
use crate::walk::{expand_home, markup_files, WalkError};
use crate::xml::{parse_file, to_pretty_string, Document, XmlError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// What to do when a file cannot be walked, read or parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Stop at the first failure
    #[default]
    Abort,
    /// Report the failure and move on to the next file
    Continue,
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error(transparent)]
    Parse(#[from] XmlError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub root: PathBuf,
    pub extension: String,
    /// Where the last processed tree is rendered; `None` skips the final write
    pub output: Option<PathBuf>,
    pub policy: ErrorPolicy,
    pub dry_run: bool,
    /// Also write each patched tree back over its source file
    pub in_place: bool,
    /// Emit [`RunEvent::Diff`] with before/after renders of each file
    pub diffs: bool,
}

impl RunOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: crate::config::DEFAULT_EXTENSION.to_string(),
            output: Some(PathBuf::from(crate::config::DEFAULT_OUTPUT)),
            policy: ErrorPolicy::Abort,
            dry_run: false,
            in_place: false,
            diffs: false,
        }
    }

    /// Options taken from a config's `[meta]` table.
    pub fn from_config(config: &ThemeConfig) -> Self {
        let root = config
            .meta
            .root
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::config::DEFAULT_ROOT));
        Self {
            extension: config.extension().to_string(),
            output: Some(config.output()),
            policy: config.meta.on_error,
            ..Self::new(root)
        }
    }
}

/// Progress reported to the caller while the run advances.
#[derive(Debug)]
pub enum RunEvent<'a> {
    /// A markup file is about to be parsed
    Fixing { path: &'a Path },
    Change {
        path: &'a Path,
        change: &'a FieldChange,
    },
    Diff {
        path: &'a Path,
        before: &'a str,
        after: &'a str,
    },
    /// A patched tree was written back over its source (`in_place`)
    Rewrote { path: &'a Path },
    /// A failure skipped under [`ErrorPolicy::Continue`]
    Skipped { error: &'a RunError },
    /// The walk is exhausted
    Done,
    /// The last tree was rendered to the output file
    Wrote { path: &'a Path, dry_run: bool },
}

/// A file that parsed and had the rules applied.
#[derive(Debug, Clone)]
pub struct ProcessedFile {
    pub path: PathBuf,
    pub document: Document,
    pub report: PatchReport,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files_processed: usize,
    pub files_failed: usize,
    pub changes: usize,
    pub inserted: usize,
    pub files_rewritten: usize,
    pub last_file: Option<PathBuf>,
    pub output_written: Option<PathBuf>,
}

/// Walk `options.root`, patch every markup file with `rules`, then render
/// the last tree to `options.output`.
pub fn run<F>(
    rules: &[Rule],
    options: &RunOptions,
    mut on_event: F,
) -> Result<RunSummary, RunError>
where
    F: FnMut(RunEvent<'_>),
{
    let root = expand_home(&options.root);
    if !root.exists() {
        warn!(root = %root.display(), "theme directory does not exist; nothing to do");
    }

    let mut summary = RunSummary::default();
    let mut last: Option<ProcessedFile> = None;
    // in-place writes wait until the walk is over so renamed files never
    // show up in the directory listing being iterated
    let mut rewrites: Vec<(PathBuf, String)> = Vec::new();

    for entry in markup_files(&root, &options.extension) {
        let result = entry
            .map_err(RunError::from)
            .and_then(|path| process_file(path, rules, options, &mut on_event));

        match result {
            Ok(processed) => {
                summary.files_processed += 1;
                summary.changes += processed.report.change_count();
                summary.inserted += processed.report.inserted_count();
                if options.in_place && !processed.report.is_noop() {
                    let rendered = to_pretty_string(&processed.document);
                    rewrites.push((processed.path.clone(), rendered));
                }
                last = Some(processed);
            }
            Err(error) => match options.policy {
                ErrorPolicy::Abort => return Err(error),
                ErrorPolicy::Continue => {
                    warn!(%error, "skipping file");
                    summary.files_failed += 1;
                    on_event(RunEvent::Skipped { error: &error });
                }
            },
        }
    }

    on_event(RunEvent::Done);

    if !options.dry_run {
        for (path, rendered) in &rewrites {
            write_atomic(path, rendered)?;
            summary.files_rewritten += 1;
            on_event(RunEvent::Rewrote { path });
        }
    }

    let Some(last) = last else {
        debug!("no markup files processed; output not written");
        return Ok(summary);
    };
    summary.last_file = Some(last.path.clone());

    if let Some(output) = &options.output {
        let rendered = to_pretty_string(&last.document);
        if !options.dry_run {
            write_atomic(output, &rendered)?;
            summary.output_written = Some(output.clone());
        }
        debug!(source = %last.path.display(), output = %output.display(), "rendered last tree");
        on_event(RunEvent::Wrote {
            path: output,
            dry_run: options.dry_run,
        });
    }

    Ok(summary)
}

fn process_file<F>(
    path: PathBuf,
    rules: &[Rule],
    options: &RunOptions,
    on_event: &mut F,
) -> Result<ProcessedFile, RunError>
where
    F: FnMut(RunEvent<'_>),
{
    on_event(RunEvent::Fixing { path: &path });

    let mut document = parse_file(&path)?;
    debug!(path = %path.display(), elements = document.root.element_count(), "parsed");

    let before = options.diffs.then(|| to_pretty_string(&document));
    let report = apply_rules(&mut document.root, rules);
    for change in report.changes() {
        debug!(
            path = %path.display(),
            field = change.field(),
            noop = change.is_noop(),
            "field patched"
        );
        on_event(RunEvent::Change {
            path: &path,
            change,
        });
    }

    if let Some(before) = before {
        let after = to_pretty_string(&document);
        if before != after {
            on_event(RunEvent::Diff {
                path: &path,
                before: &before,
                after: &after,
            });
        }
    }

    Ok(ProcessedFile {
        path,
        document,
        report,
    })
}
