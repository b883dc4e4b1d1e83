//! Post-import reconciliation of the two split points.
//!
//! After the importer returns, the prefix and suffix brackets are joined back
//! onto the content next to them. Nothing from split time is trusted: the
//! importer may have added or removed nodes, so adjacency is checked again
//! against the live tree and a broken pair is simply left alone.

use std::collections::HashSet;

use log::{debug, warn};

use crate::tree::{
    Direction, DocumentTree, ListId, ListMembership, Marker, Node, NodeId, ParagraphFormat,
    Position, TreeError,
};

/// The nodes a splice may join: its prefix bracket and every node it created
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Region {
    pub prefix: NodeId,
    /// First id allocated by the splice
    pub floor: NodeId,
}

impl Region {
    pub fn contains(&self, id: NodeId) -> bool {
        id == self.prefix || id >= self.floor
    }
}

/// A node produced by one of the splice's splits
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SplitRecord {
    pub node: NodeId,
    pub region: Region,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    Joined { survivor: NodeId },
    /// The recorded node is gone or no longer holds text
    Stale,
    /// No text neighbour inside the splice region
    NotAdjacent,
    /// Both nodes belong to different lists
    DifferentLists,
}

/// Join the prefix node `T` with the node `U` that now follows it.
///
/// An empty `U` is absorbed as is. An empty `T` takes on `U`'s paragraph
/// style, and `U`'s direct formatting unless `U` is a list member, then
/// absorbs it. Otherwise `T`'s paragraph formatting is kept as inline hints and
/// `U` absorbs `T`, except that a list member is never absorbed by a
/// paragraph outside its list.
pub fn merge_left(
    tree: &mut DocumentTree,
    record: &SplitRecord,
    marker: &Marker,
) -> Result<MergeOutcome, TreeError> {
    let t = record.node;
    let u = match candidate(tree, record, Direction::Next) {
        Ok(u) => u,
        Err(outcome) => return Ok(outcome),
    };

    if tree.resolve(marker) == Some(Position::start_of(u)) {
        let end = shape(tree, t)?.0;
        tree.move_marker(marker, Position::new(t, end))?;
    }

    let (t_len, t_list) = shape(tree, t)?;
    let (u_len, u_list) = shape(tree, u)?;

    if u_len == 0 {
        debug!("merge left: {t} absorbs empty {u}");
        return Ok(join(tree, t, Direction::Next));
    }
    if t_len == 0 {
        debug!("merge left: empty {t} takes over {u}");
        adopt_style(tree, u, t)?;
        if u_list.is_none() {
            tree.copy_paragraph_formatting(u, t, true)?;
        }
        return Ok(join(tree, t, Direction::Next));
    }
    if different_lists(t_list, u_list) {
        debug!("merge left: {t} and {u} are in different lists");
        return Ok(MergeOutcome::DifferentLists);
    }
    if t_list.is_some() && u_list.is_none() {
        debug!("merge left: list entry {t} absorbs {u}");
        tree.convert_paragraph_formatting_to_inline_hints(u, t)?;
        return Ok(join(tree, t, Direction::Next));
    }
    debug!("merge left: {u} absorbs {t}");
    tree.convert_paragraph_formatting_to_inline_hints(t, u)?;
    Ok(join(tree, u, Direction::Prev))
}

/// Join the suffix node `S` with the node `P` that now precedes it.
///
/// Mirrors [`merge_left`]: an empty `P` is absorbed, an empty `S` takes on
/// `P`'s paragraph style and formatting before absorbing it, and otherwise
/// `S`'s paragraph formatting becomes inline hints and `P` absorbs `S`.
pub fn merge_right(tree: &mut DocumentTree, record: &SplitRecord) -> Result<MergeOutcome, TreeError> {
    let s = record.node;
    let p = match candidate(tree, record, Direction::Prev) {
        Ok(p) => p,
        Err(outcome) => return Ok(outcome),
    };

    let (s_len, s_list) = shape(tree, s)?;
    let (p_len, p_list) = shape(tree, p)?;

    if p_len == 0 {
        debug!("merge right: {s} absorbs empty {p}");
        return Ok(join(tree, s, Direction::Prev));
    }
    if s_len == 0 {
        // S ends up holding only P's content, so it takes P's look entirely
        debug!("merge right: empty {s} takes over {p}");
        adopt_style(tree, p, s)?;
        tree.copy_paragraph_formatting(p, s, false)?;
        return Ok(join(tree, s, Direction::Prev));
    }
    if different_lists(s_list, p_list) {
        debug!("merge right: {p} and {s} are in different lists");
        return Ok(MergeOutcome::DifferentLists);
    }
    if s_list.is_some() && p_list.is_none() {
        debug!("merge right: list entry {s} absorbs {p}");
        tree.convert_paragraph_formatting_to_inline_hints(p, s)?;
        return Ok(join(tree, s, Direction::Prev));
    }
    debug!("merge right: {p} absorbs {s}");
    tree.convert_paragraph_formatting_to_inline_hints(s, p)?;
    Ok(join(tree, p, Direction::Next))
}

/// Give every later run of an interrupted list a list id of its own.
///
/// Content spliced into a list item can end up between two entries of the same
/// list. The first run keeps the id; each following run is moved onto a fresh
/// one, levels unchanged. Only lists with a member inside `region` are
/// touched. Returns the ids handed out.
pub fn separate_list_runs(
    tree: &mut DocumentTree,
    region: &Region,
) -> Result<Vec<ListId>, TreeError> {
    let touched: HashSet<ListId> = tree
        .nodes()
        .filter(|(id, _)| region.contains(*id))
        .filter_map(|(_, node)| node.list())
        .map(|membership| membership.list)
        .collect();
    if touched.is_empty() {
        return Ok(Vec::new());
    }

    let mut runs: Vec<(ListId, Vec<NodeId>)> = Vec::new();
    let mut previous: Option<ListId> = None;
    for (id, node) in tree.nodes() {
        let current = node.list().map(|membership| membership.list);
        if let Some(list) = current {
            match runs.last_mut() {
                Some((_, members)) if current == previous => members.push(id),
                _ => runs.push((list, vec![id])),
            }
        }
        previous = current;
    }

    let mut seen = HashSet::new();
    let mut fresh = Vec::new();
    for (list, members) in runs {
        if !touched.contains(&list) || seen.insert(list) {
            continue;
        }
        let replacement = tree.allocate_list();
        debug!(
            "list {} is interrupted, moving {} entries onto list {}",
            list.0,
            members.len(),
            replacement.0
        );
        for id in members {
            let format = tree.node(id).ok_or(TreeError::DeadNode(id))?.format().clone();
            let list = format.list.map(|membership| ListMembership {
                list: replacement,
                ..membership
            });
            tree.set_paragraph_format(id, ParagraphFormat { list, ..format })?;
        }
        fresh.push(replacement);
    }
    Ok(fresh)
}

/// The neighbour a record may join with, if the pair is still joinable
fn candidate(
    tree: &DocumentTree,
    record: &SplitRecord,
    direction: Direction,
) -> Result<NodeId, MergeOutcome> {
    if !tree.node(record.node).is_some_and(Node::is_text) {
        warn!("split record {} is stale, skipping merge", record.node);
        return Err(MergeOutcome::Stale);
    }
    let neighbour = match direction {
        Direction::Next => tree.next(record.node),
        Direction::Prev => tree.prev(record.node),
    };
    match neighbour {
        Some(id) if record.region.contains(id) && tree.node(id).is_some_and(Node::is_text) => Ok(id),
        _ => {
            debug!("{} has no joinable {direction:?} neighbour", record.node);
            Err(MergeOutcome::NotAdjacent)
        }
    }
}

fn shape(tree: &DocumentTree, id: NodeId) -> Result<(usize, Option<ListMembership>), TreeError> {
    let node = tree.node(id).ok_or(TreeError::DeadNode(id))?;
    Ok((node.len(), node.list()))
}

fn adopt_style(tree: &mut DocumentTree, from: NodeId, onto: NodeId) -> Result<(), TreeError> {
    let style = tree
        .node(from)
        .ok_or(TreeError::DeadNode(from))?
        .style()
        .clone();
    tree.set_paragraph_style(onto, style)
}

fn different_lists(a: Option<ListMembership>, b: Option<ListMembership>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a.list != b.list)
}

fn join(tree: &mut DocumentTree, survivor: NodeId, direction: Direction) -> MergeOutcome {
    if tree.join(survivor, direction) {
        MergeOutcome::Joined { survivor }
    } else {
        MergeOutcome::NotAdjacent
    }
}
