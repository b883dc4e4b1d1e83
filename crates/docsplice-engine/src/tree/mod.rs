/*!
 * # Document Tree
 *
 * The mutable document a splice operates on.
 *
 * - **`node`**: `Node`, `NodeId` and the node kinds (paragraphs and objects)
 * - **`format`**: paragraph styles, direct paragraph formatting, inline hints
 *   and list membership
 * - **`anchors`**: `Position`, `Range` and self-rebasing `Marker`s
 * - **`document`**: the `DocumentTree` arena with its split / join / edit
 *   operations
 *
 * Node identity is an arena index that survives edits: a split keeps the
 * original id on the left half and a join keeps the id it was called on.
 * Markers are handles owned by the caller and resolved through the tree, which
 * rebases them on every mutation.
 */

pub mod anchors;
pub mod document;
pub mod format;
pub mod node;

pub use anchors::{Marker, Position, Range, RangeMarker};
pub use document::{Direction, DocumentTree, OBJECT_REPLACEMENT, TreeError};
pub use format::{
    Alignment, CharFormat, InlineHint, ListId, ListMembership, ParagraphFormat, ParagraphStyle,
    ResolvedCharFormat, StyleRef, StyleSheet,
};
pub use node::{Node, NodeId, NodeKind, ObjectKind};
