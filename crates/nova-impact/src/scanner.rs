use std::collections::BTreeSet;

use nova_core::FileId;
use nova_scheduler::{Cancelled, CancellationToken};

use crate::project::ProjectSnapshot;
use crate::scope::ScanScope;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Files to verify, in id order. Always contains the declaring file.
    Candidates(Vec<FileId>),
    /// More than `limit` files could reference the declaration.
    TooMany { found: usize, limit: usize },
}

/// What a usage scan is looking for.
#[derive(Debug, Clone)]
pub struct ScanRequest<'a> {
    pub declaring_file: FileId,
    pub scope: ScanScope,
    /// Names a referencing file must mention to be a candidate.
    pub probes: &'a BTreeSet<String>,
    /// Files that must be rechecked regardless of their words (existing problems).
    pub pinned: &'a BTreeSet<FileId>,
    pub limit: usize,
}

/// Word-index based candidate search; precision is left to the verifier.
pub fn find_candidates(
    project: &ProjectSnapshot,
    request: &ScanRequest<'_>,
    token: &CancellationToken,
) -> Result<ScanOutcome, Cancelled> {
    let package = project
        .file(request.declaring_file)
        .map(|parsed| parsed.package.as_str());

    let mut candidates = BTreeSet::new();
    candidates.insert(request.declaring_file);

    for probe in request.probes {
        for file in project.words().files_containing(probe) {
            Cancelled::check(token)?;
            if candidates.contains(&file) {
                continue;
            }
            let in_scope = match request.scope {
                ScanScope::File => false,
                ScanScope::Package => project
                    .file(file)
                    .is_some_and(|parsed| Some(parsed.package.as_str()) == package),
                ScanScope::Project => true,
            };
            if in_scope {
                candidates.insert(file);
            }
        }
    }

    for &file in request.pinned {
        if project.contains(file) {
            candidates.insert(file);
        }
    }

    if candidates.len() > request.limit {
        return Ok(ScanOutcome::TooMany {
            found: candidates.len(),
            limit: request.limit,
        });
    }
    Ok(ScanOutcome::Candidates(candidates.into_iter().collect()))
}
