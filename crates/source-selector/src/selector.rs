//! Active-Source Selector

use crate::probe::{probe, SourceSnapshot};
use crate::registry::Registry;
use crate::SourceId;
use condition_validator::CompiledValidator;
use tracing::debug;

/// The source chosen by [`select_active`]
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Selected source
    pub source: SourceId,
    /// Position of `source` in the priority list
    pub index: usize,
    /// Snapshot that qualified the source
    pub snapshot: SourceSnapshot,
}

/// Return the highest-priority source that is valid and passes `validator`.
///
/// Sources after the first qualifying one are not probed.
pub fn select_active<R: Registry + ?Sized>(
    sources: &[SourceId],
    registry: &R,
    validator: &CompiledValidator,
) -> Option<Selection> {
    for (index, source) in sources.iter().enumerate() {
        let Some(snapshot) = probe(registry, source).into_snapshot() else {
            continue;
        };

        if !validator.is_valid(&snapshot.value) {
            debug!("Source entity '{}' rejected by conditions", source);
            continue;
        }

        return Some(Selection {
            source: source.clone(),
            index,
            snapshot,
        });
    }

    None
}
