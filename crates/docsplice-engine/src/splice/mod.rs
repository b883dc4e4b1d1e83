/*!
 * # Splice
 *
 * Inserting foreign content into the middle of a paragraph.
 *
 * The controller brackets the insertion point with two splits, so the
 * importer writes into an empty gap paragraph of its own:
 *
 * ```text
 * before:   [ A|B ]
 * split:    [ A ] [ gap ] [ B ]
 * import:   [ A ] [ X ] [ Y ] [ B ]
 * merge:    [ AX ] [ YB ]
 * ```
 *
 * - **`reconcile`**: `merge_left` / `merge_right`, which join the brackets back
 *   onto whatever the importer left next to them, and `separate_list_runs`,
 *   which renumbers a list the import cut in two
 * - **`controller`**: the `SpliceController` state machine and the `splice`
 *   entry point
 */

pub mod controller;
pub mod reconcile;

use crate::import::{ImportError, ImportMode};
use crate::tree::{StyleRef, TreeError};

pub use controller::{SpliceController, SpliceOutcome, SpliceState, splice};
pub use reconcile::{
    MergeOutcome, Region, SplitRecord, merge_left, merge_right, separate_list_runs,
};

#[derive(Debug, thiserror::Error)]
pub enum SpliceError {
    /// The importer failed; the document text is as it was before the call
    #[error("import failed: {0}")]
    Read(#[from] ImportError),
    /// The target is not a valid insertion point; nothing was changed
    #[error("invalid splice target: {0}")]
    StructuralPrecondition(#[from] TreeError),
}

/// Settings for one splice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpliceOptions {
    /// Style given to the gap paragraph before the importer runs
    pub neutral_style: StyleRef,
    /// Passed through to the importer
    pub mode: ImportMode,
}

impl Default for SpliceOptions {
    fn default() -> Self {
        Self {
            neutral_style: StyleRef::neutral(),
            mode: ImportMode::Insert,
        }
    }
}
