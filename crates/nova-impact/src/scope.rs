use nova_syntax::ast::Visibility;

use crate::project::{ParsedFile, SiteRef};
use crate::snapshot::Snapshot;

/// Files a declaration's usages can live in, ordered from narrowest to widest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScanScope {
    /// Only the declaring file.
    File,
    /// Files of the declaring file's package.
    Package,
    Project,
}

/// Effective visibility of the declaration at `index`, with `own` standing in for its own
/// snapshot: the narrowest visibility along the enclosing-class chain.
pub fn effective_visibility(file: &ParsedFile, index: u32, own: &Snapshot) -> Option<Visibility> {
    if own.is_local {
        return None;
    }
    let mut visibility = own.visibility;
    let mut parent = file.site(index).and_then(|site| site.parent);
    while let Some(idx) = parent {
        let site = file.site(idx)?;
        if site.snapshot.is_local {
            return None;
        }
        visibility = visibility.min(site.snapshot.visibility);
        parent = site.parent;
    }
    Some(visibility)
}

/// Scope implied by one snapshot of the declaration at `site`.
///
/// Local declarations, and anything whose context cannot be determined, fall back to the
/// declaring file.
pub fn scope_of(file: &ParsedFile, site: SiteRef, snapshot: &Snapshot) -> ScanScope {
    match effective_visibility(file, site.index, snapshot) {
        None | Some(Visibility::Private) => ScanScope::File,
        Some(Visibility::Package) => ScanScope::Package,
        Some(Visibility::Protected | Visibility::Public) => ScanScope::Project,
    }
}

/// Scope to scan after a change from `previous` to `current`: the wider of the two.
pub fn scan_scope(
    file: &ParsedFile,
    site: SiteRef,
    previous: Option<&Snapshot>,
    current: &Snapshot,
) -> ScanScope {
    let current_scope = scope_of(file, site, current);
    match previous {
        Some(previous) => current_scope.max(scope_of(file, site, previous)),
        None => current_scope,
    }
}
