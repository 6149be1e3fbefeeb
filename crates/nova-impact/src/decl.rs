//! Stable declaration identities.
//!
//! Declarations are addressed by [`DeclId`], a generation-tagged slot index. Reparsing a file
//! re-matches the old declarations against the new ones so that in-place edits keep their ids;
//! removed declarations bump the slot generation and every outstanding id to them goes stale.

use std::collections::HashMap;

use nova_core::{FileId, TextDelta, TextSize};

use crate::project::{DeclSite, ParsedFile, SiteRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId {
    index: u32,
    generation: u32,
}

impl DeclId {
    pub fn to_raw(self) -> (u32, u32) {
        (self.index, self.generation)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    site: Option<SiteRef>,
}

/// Declarations gained and lost by a reparse.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Rematch {
    pub added: Vec<DeclId>,
    pub removed: Vec<DeclId>,
}

#[derive(Debug, Default)]
pub struct DeclarationTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_file: HashMap<FileId, Vec<DeclId>>,
}

impl DeclarationTable {
    pub fn get(&self, id: DeclId) -> Option<SiteRef> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.site
    }

    pub fn is_valid(&self, id: DeclId) -> bool {
        self.get(id).is_some()
    }

    pub fn id_of(&self, site: SiteRef) -> Option<DeclId> {
        self.by_file
            .get(&site.file)?
            .get(site.index as usize)
            .copied()
    }

    /// Ids of `file`'s declarations, indexed like [`ParsedFile::decls`].
    pub fn ids_in(&self, file: FileId) -> &[DeclId] {
        self.by_file.get(&file).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn insert_file(&mut self, parsed: &ParsedFile) -> Vec<DeclId> {
        let ids: Vec<DeclId> = (0..parsed.decls.len() as u32)
            .map(|idx| self.alloc(parsed.site_ref(idx)))
            .collect();
        self.by_file.insert(parsed.file, ids.clone());
        ids
    }

    pub fn remove_file(&mut self, file: FileId) -> Vec<DeclId> {
        let ids = self.by_file.remove(&file).unwrap_or_default();
        for &id in &ids {
            self.release(id);
        }
        ids
    }

    /// Carries ids from `old` over to `new`.
    ///
    /// Siblings are matched group by group, parents first: by range shifted through `delta`,
    /// then by name in order, then by position among what is left. Only declarations
    /// of the same kind (and constructor-ness and locality) ever match.
    pub fn rematch(
        &mut self,
        old: &ParsedFile,
        new: &ParsedFile,
        delta: Option<TextDelta>,
    ) -> Rematch {
        let old_ids = self.by_file.remove(&old.file).unwrap_or_default();
        let mut new_ids: Vec<Option<DeclId>> = vec![None; new.decls.len()];
        let mut old_taken = vec![false; old.decls.len()];

        let mut kept = 0usize;
        let mut groups: Vec<(Option<u32>, Option<u32>)> = vec![(None, None)];
        while let Some((old_parent, new_parent)) = groups.pop() {
            let old_group = siblings(old, old_parent);
            let new_group = siblings(new, new_parent);
            let pairs = match_group(old, new, &old_group, &new_group, delta);
            for (old_idx, new_idx) in pairs {
                old_taken[old_idx as usize] = true;
                new_ids[new_idx as usize] = old_ids.get(old_idx as usize).copied();
                kept += 1;
                groups.push((Some(old_idx), Some(new_idx)));
            }
        }

        let mut rematch = Rematch::default();
        for (old_idx, taken) in old_taken.iter().enumerate() {
            if !taken {
                if let Some(&id) = old_ids.get(old_idx) {
                    self.release(id);
                    rematch.removed.push(id);
                }
            }
        }

        let mut ids = Vec::with_capacity(new.decls.len());
        for (new_idx, id) in new_ids.into_iter().enumerate() {
            let site = new.site_ref(new_idx as u32);
            let id = match id {
                Some(id) => {
                    self.slots[id.index as usize].site = Some(site);
                    id
                }
                None => {
                    let id = self.alloc(site);
                    rematch.added.push(id);
                    id
                }
            };
            ids.push(id);
        }
        self.by_file.insert(new.file, ids);

        tracing::trace!(
            target: "nova.impact",
            file = new.file.to_raw(),
            kept,
            added = rematch.added.len(),
            removed = rematch.removed.len(),
            "rematched declarations"
        );
        rematch
    }

    pub fn len(&self) -> usize {
        self.by_file.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn alloc(&mut self, site: SiteRef) -> DeclId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.site = Some(site);
            return DeclId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            site: Some(site),
        });
        DeclId {
            index,
            generation: 0,
        }
    }

    fn release(&mut self, id: DeclId) {
        let Some(slot) = self.slots.get_mut(id.index as usize) else {
            return;
        };
        if slot.generation != id.generation {
            return;
        }
        slot.generation = slot.generation.wrapping_add(1);
        slot.site = None;
        self.free.push(id.index);
    }
}

fn siblings(file: &ParsedFile, parent: Option<u32>) -> Vec<u32> {
    match parent {
        Some(parent) => file
            .site(parent)
            .map(|site| site.children.clone())
            .unwrap_or_default(),
        None => file.roots().collect(),
    }
}

fn same_shape(a: &DeclSite, b: &DeclSite) -> bool {
    a.kind == b.kind
        && a.snapshot.is_constructor == b.snapshot.is_constructor
        && a.snapshot.is_local == b.snapshot.is_local
}

fn match_group(
    old: &ParsedFile,
    new: &ParsedFile,
    old_group: &[u32],
    new_group: &[u32],
    delta: Option<TextDelta>,
) -> Vec<(u32, u32)> {
    let mut pairs = Vec::new();
    let mut old_free: Vec<u32> = old_group.to_vec();
    let mut new_free: Vec<u32> = new_group.to_vec();

    fn site(file: &ParsedFile, idx: u32) -> &DeclSite {
        &file.decls[idx as usize]
    }

    // Pass 1: unchanged position.
    new_free.retain(|&new_idx| {
        let new_site = site(new, new_idx);
        let found = old_free.iter().position(|&old_idx| {
            let old_site = site(old, old_idx);
            same_shape(old_site, new_site)
                && shift(old_site.range.start, delta) == Some(new_site.range.start)
                && shift(old_site.range.end, delta) == Some(new_site.range.end)
        });
        match found {
            Some(pos) => {
                pairs.push((old_free.remove(pos), new_idx));
                false
            }
            None => true,
        }
    });

    // Pass 2: same name, in order.
    new_free.retain(|&new_idx| {
        let new_site = site(new, new_idx);
        let found = old_free.iter().position(|&old_idx| {
            let old_site = site(old, old_idx);
            same_shape(old_site, new_site) && old_site.snapshot.name == new_site.snapshot.name
        });
        match found {
            Some(pos) => {
                pairs.push((old_free.remove(pos), new_idx));
                false
            }
            None => true,
        }
    });

    // Pass 3: ordinal among the rest.
    new_free.retain(|&new_idx| {
        let new_site = site(new, new_idx);
        let found = old_free
            .iter()
            .position(|&old_idx| same_shape(site(old, old_idx), new_site));
        match found {
            Some(pos) => {
                pairs.push((old_free.remove(pos), new_idx));
                false
            }
            None => true,
        }
    });

    pairs
}

fn shift(offset: usize, delta: Option<TextDelta>) -> Option<usize> {
    let Some(delta) = delta else {
        return Some(offset);
    };
    let offset = TextSize::try_from(offset).ok()?;
    delta.map_offset(offset).map(|offset| u32::from(offset) as usize)
}
