//! Unit classification: pairwise comparison plus the grouping closure.
//!
//! Every compiled unit of the new archive is classified as `Changed` or
//! `Unchanged`. A unit is pairwise-changed when its bytes differ from its
//! same-path counterpart in the old archive (or when it has no counterpart);
//! a logical group of outer and inner classes always changes as a whole,
//! because the decompiler re-emits one source file per group.

use std::collections::BTreeMap;

use jarsift_archive::Archive;
use jarsift_types::{ArchivePath, GroupKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diff::DiffOptions;
use crate::error::{EngineError, EngineResult};

/// Verdict for one compiled unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    /// The unit, or a member of its group, differs from the old archive.
    Changed,
    /// The unit and its whole group are byte-identical to the old archive.
    Unchanged,
}

/// The verdict for every compiled unit of the new archive.
///
/// Covers each enumerated unit exactly once; iteration order is sorted by
/// path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassificationMap {
    /// Verdict per unit path.
    pub units: BTreeMap<ArchivePath, Classification>,
}

impl ClassificationMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no units were classified.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Number of classified units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Sorted paths of all changed units.
    pub fn changed_paths(&self) -> Vec<ArchivePath> {
        self.units
            .iter()
            .filter(|(_, class)| **class == Classification::Changed)
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Sorted paths of all unchanged units.
    pub fn unchanged_paths(&self) -> Vec<ArchivePath> {
        self.units
            .iter()
            .filter(|(_, class)| **class == Classification::Unchanged)
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Number of changed units.
    pub fn changed_count(&self) -> usize {
        self.units
            .values()
            .filter(|class| **class == Classification::Changed)
            .count()
    }
}

/// Classify every compiled unit of `new` against `old`.
///
/// - `old`: the previous archive (or `None` on a first build, which marks
///   everything changed).
///
/// Units are folded into logical groups per directory; one pairwise-changed
/// member marks the whole group changed. The scan over a group
/// short-circuits on the first changed member.
pub fn classify_units(
    new: &dyn Archive,
    old: Option<&dyn Archive>,
    options: &DiffOptions,
) -> EngineResult<ClassificationMap> {
    let paths = new.unit_paths()?;

    let mut groups: BTreeMap<GroupKey, Vec<ArchivePath>> = BTreeMap::new();
    for path in paths {
        groups.entry(path.group_key()).or_default().push(path);
    }

    let mut units = BTreeMap::new();
    for (key, members) in &groups {
        let verdict = if group_changed(new, old, key, members, options)? {
            Classification::Changed
        } else {
            Classification::Unchanged
        };
        for member in members {
            units.insert(member.clone(), verdict);
        }
    }

    debug!(
        groups = groups.len(),
        units = units.len(),
        "classified compiled units"
    );
    Ok(ClassificationMap { units })
}

/// Whether any member of one logical group is pairwise-changed.
fn group_changed(
    new: &dyn Archive,
    old: Option<&dyn Archive>,
    key: &GroupKey,
    members: &[ArchivePath],
    options: &DiffOptions,
) -> EngineResult<bool> {
    let old = match old {
        Some(old) => old,
        // Nothing to compare against; the whole archive is new.
        None => return Ok(true),
    };

    for member in members {
        if unit_changed(new, old, member)? {
            return Ok(true);
        }
    }

    if options.invalidate_on_removed_units {
        // A group member that vanished from the new archive also changes
        // the merged source the group decompiles to.
        for sibling in old.siblings(key.dir())? {
            if sibling.outer_name() == key.outer() && !members.contains(&sibling) {
                return Ok(true);
            }
        }
    }

    Ok(false)
}

/// Whether one unit's bytes differ from its old counterpart.
///
/// Metadata inequality (size, then CRC-32 when both sides carry one) proves
/// a change without reading bytes; metadata equality proves nothing, so the
/// fallthrough is a full byte comparison.
fn unit_changed(
    new: &dyn Archive,
    old: &dyn Archive,
    path: &ArchivePath,
) -> EngineResult<bool> {
    let old_meta = match old.unit_meta(path)? {
        Some(meta) => meta,
        // No counterpart in the old archive.
        None => return Ok(true),
    };
    if let Some(new_meta) = new.unit_meta(path)? {
        if new_meta.size != old_meta.size {
            return Ok(true);
        }
        if let (Some(new_crc), Some(old_crc)) = (new_meta.crc32, old_meta.crc32) {
            if new_crc != old_crc {
                return Ok(true);
            }
        }
    }

    let old_bytes = old
        .read_unit(path)?
        .ok_or_else(|| EngineError::MissingUnit(path.clone()))?;
    let new_bytes = new
        .read_unit(path)?
        .ok_or_else(|| EngineError::MissingUnit(path.clone()))?;
    Ok(new_bytes != old_bytes)
}
