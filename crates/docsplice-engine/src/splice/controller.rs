use std::io::Read;

use log::{debug, warn};

use crate::import::ImporterDelegate;
use crate::splice::reconcile::{
    MergeOutcome, Region, SplitRecord, merge_left, merge_right, separate_list_runs,
};
use crate::splice::{SpliceError, SpliceOptions};
use crate::tree::{
    Direction, DocumentTree, Marker, Node, NodeId, ParagraphFormat, Position, Range, TreeError,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpliceOutcome {
    Success,
    Failure,
}

/// Progress of a splice. Reconciling always follows Importing, whatever the
/// importer returned.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpliceState {
    Idle,
    Splitting,
    Importing,
    Reconciling,
    Done(SpliceOutcome),
}

/// The bracket nodes produced by the two splits
#[derive(Debug)]
struct Brackets {
    prefix: SplitRecord,
    gap: NodeId,
    suffix: SplitRecord,
}

/// Runs splices against one document.
///
/// The controller holds the tree mutably for its whole lifetime, so no other
/// edit can interleave with a splice.
pub struct SpliceController<'t> {
    tree: &'t mut DocumentTree,
    options: SpliceOptions,
    state: SpliceState,
}

impl<'t> SpliceController<'t> {
    pub fn new(tree: &'t mut DocumentTree, options: SpliceOptions) -> Self {
        Self {
            tree,
            options,
            state: SpliceState::Idle,
        }
    }

    pub fn state(&self) -> SpliceState {
        self.state
    }

    pub fn tree(&self) -> &DocumentTree {
        self.tree
    }

    fn advance(&mut self, next: SpliceState) {
        debug!("splice: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Import `content` at `target` and reconcile the result with the
    /// surrounding paragraph.
    ///
    /// Returns the position directly after the inserted content. If the
    /// importer fails, whatever it left behind is discarded, the paragraph is
    /// joined back together and [`SpliceError::Read`] is returned.
    pub fn run(
        &mut self,
        target: Position,
        content: &mut dyn Read,
        importer: &mut dyn ImporterDelegate,
    ) -> Result<Position, SpliceError> {
        self.state = SpliceState::Idle;
        self.validate(target)?;

        self.advance(SpliceState::Splitting);
        let marker = self.tree.anchor(target)?;
        let brackets = match self.split(target, &marker) {
            Ok(brackets) => brackets,
            Err(err) => {
                self.tree.release(marker);
                self.advance(SpliceState::Done(SpliceOutcome::Failure));
                return Err(err.into());
            }
        };

        self.advance(SpliceState::Importing);
        let gap = Range::collapsed(Position::start_of(brackets.gap));
        let imported = importer.filter(self.tree, gap, content, self.options.mode);
        if let Err(err) = &imported {
            warn!("{} importer failed: {err}", importer.name());
            self.discard_import(&brackets);
        }

        self.advance(SpliceState::Reconciling);
        let left = merge_left(self.tree, &brackets.prefix, &marker);
        let right = merge_right(self.tree, &brackets.suffix);
        let lists = separate_list_runs(self.tree, &brackets.prefix.region);
        let end = self.tree.release(marker);

        let outcome = match imported {
            Ok(()) => SpliceOutcome::Success,
            Err(_) => SpliceOutcome::Failure,
        };
        self.advance(SpliceState::Done(outcome));

        log_merge("left", &left);
        log_merge("right", &right);
        if let Err(err) = &lists {
            warn!("could not separate list runs: {err}");
        }
        imported?;
        left?;
        right?;
        lists?;
        end.ok_or(SpliceError::StructuralPrecondition(TreeError::DeadNode(target.node)))
    }

    fn validate(&self, target: Position) -> Result<(), TreeError> {
        self.tree.check_position(target)?;
        if !self.tree.node(target.node).is_some_and(Node::is_text) {
            return Err(TreeError::NotText(target.node));
        }
        Ok(())
    }

    /// Split twice at the cursor, leaving an empty gap paragraph between the
    /// two halves of the target paragraph.
    ///
    /// The suffix continues the original paragraph, so it keeps the original
    /// style and direct formatting; the gap gets the neutral style.
    fn split(&mut self, target: Position, marker: &Marker) -> Result<Brackets, TreeError> {
        let floor = self.tree.next_id();
        let (prefix, continuation) = self.tree.split(target)?;
        let original = self
            .tree
            .node(prefix)
            .map(|node| (node.style().clone(), node.format().clone()))
            .ok_or(TreeError::DeadNode(prefix))?;
        self.tree.set_paragraph_style(continuation, original.0.clone())?;
        self.tree.set_paragraph_format(continuation, original.1.clone())?;

        let cursor = self.tree.resolve(marker).ok_or(TreeError::DeadNode(continuation))?;
        let (gap, suffix) = match self.tree.split(cursor) {
            Ok(pair) => pair,
            Err(err) => {
                self.tree.join(prefix, Direction::Next);
                return Err(err);
            }
        };
        self.tree.set_paragraph_style(suffix, original.0)?;
        self.tree.set_paragraph_format(suffix, original.1)?;
        self.tree
            .set_paragraph_style(gap, self.options.neutral_style.clone())?;
        self.tree
            .set_paragraph_format(gap, ParagraphFormat::default())?;
        if !self.tree.styles().contains(&self.options.neutral_style) {
            warn!(
                "neutral style {} is not in the style sheet",
                self.options.neutral_style
            );
        }

        let region = Region { prefix, floor };
        debug!("splice brackets: prefix {prefix}, gap {gap}, suffix {suffix}");
        Ok(Brackets {
            prefix: SplitRecord {
                node: prefix,
                region,
            },
            gap,
            suffix: SplitRecord {
                node: suffix,
                region,
            },
        })
    }

    /// Remove everything a failed importer left between the brackets
    fn discard_import(&mut self, brackets: &Brackets) {
        let (prefix, suffix) = (brackets.prefix.node, brackets.suffix.node);
        let (Some(first), Some(last)) = (self.tree.index_of(prefix), self.tree.index_of(suffix))
        else {
            warn!("bracket nodes were removed, leaving import residue in place");
            return;
        };
        if first >= last {
            return;
        }
        let residue: Vec<NodeId> = self.tree.node_ids()[first + 1..last].to_vec();
        for id in residue {
            if let Err(err) = self.tree.remove_node(id) {
                warn!("could not discard {id}: {err}");
            }
        }
    }
}

fn log_merge(side: &str, result: &Result<MergeOutcome, TreeError>) {
    match result {
        Ok(MergeOutcome::Joined { survivor }) => debug!("merge {side}: joined into {survivor}"),
        Ok(outcome) => debug!("merge {side}: {outcome:?}"),
        Err(err) => warn!("merge {side} failed: {err}"),
    }
}

/// Splice `content` into `tree` at `target` using `importer`.
///
/// See [`SpliceController::run`].
pub fn splice(
    tree: &mut DocumentTree,
    target: Position,
    content: &mut dyn Read,
    importer: &mut dyn ImporterDelegate,
    options: &SpliceOptions,
) -> Result<Position, SpliceError> {
    SpliceController::new(tree, options.clone()).run(target, content, importer)
}
