//! Assembling a flat set of justification rows into a tree of root
//! justifications and their counter-justifications.
//!
//! Nodes live in one arena; parents refer to their counters by index. The
//! tree is only ever walked iteratively, except when serialising, where each
//! node is written as an object with a nested `counter_justifications` list.

use std::collections::{HashMap, VecDeque};

use serde::{Serialize, ser::SerializeStruct};
use uuid::Uuid;

use super::{Justification, JustificationRootTarget, JustificationTarget};
use crate::{
  error::{Error, Result},
  vote::VotePolarity,
};

#[derive(Debug, Clone)]
pub struct JustificationTree {
  root_target: JustificationRootTarget,
  nodes:       Vec<Justification>,
  counters:    Vec<Vec<usize>>,
  roots:       Vec<usize>,
}

/// Sibling order: verified before neutral before disverified, then score
/// ascending. The sort is stable, so ties keep row order.
fn sibling_order(j: &Justification) -> (u8, i64) {
  let precedence = match j.current_vote {
    Some(VotePolarity::Positive) => 0,
    None => 1,
    Some(VotePolarity::Negative) => 2,
  };
  (precedence, j.score)
}

impl JustificationTree {
  /// Build the tree for `root_target` from every justification stored
  /// against it.
  ///
  /// A row that targets neither the root nor another justification is a
  /// consistency fault. Counters whose countered justification is absent
  /// from `rows` are not attached.
  pub fn build(root_target: JustificationRootTarget, rows: Vec<Justification>) -> Result<Self> {
    let root: JustificationTarget = root_target.into();

    let mut roots = Vec::new();
    let mut by_countered: HashMap<Uuid, Vec<Justification>> = HashMap::new();
    for row in rows {
      match row.target {
        target if target == root => roots.push(row),
        JustificationTarget::Justification(countered) => {
          by_countered.entry(countered).or_default().push(row);
        }
        other => {
          return Err(Error::Consistency(format!(
            "justification {} targets {} {} but was read for root {} {}",
            row.justification_id,
            other.target_type(),
            other.id(),
            root_target.root_type(),
            root_target.id(),
          )));
        }
      }
    }

    let mut tree = Self {
      root_target,
      nodes: Vec::new(),
      counters: Vec::new(),
      roots: Vec::new(),
    };

    roots.sort_by_key(sibling_order);
    let mut queue = VecDeque::new();
    for justification in roots {
      let index = tree.push(justification);
      tree.roots.push(index);
      queue.push_back(index);
    }

    while let Some(parent) = queue.pop_front() {
      let Some(mut children) = by_countered.remove(&tree.nodes[parent].justification_id) else {
        continue;
      };
      children.sort_by_key(sibling_order);
      for child in children {
        let index = tree.push(child);
        tree.counters[parent].push(index);
        queue.push_back(index);
      }
    }

    if !by_countered.is_empty() {
      tracing::debug!(
        root_target_id = %root_target.id(),
        orphaned = by_countered.values().map(Vec::len).sum::<usize>(),
        "dropped counter-justifications whose target is not in the tree"
      );
    }

    Ok(tree)
  }

  fn push(&mut self, justification: Justification) -> usize {
    self.nodes.push(justification);
    self.counters.push(Vec::new());
    self.nodes.len() - 1
  }

  pub fn root_target(&self) -> JustificationRootTarget { self.root_target }

  /// Root justifications, in sibling order.
  pub fn roots(&self) -> impl Iterator<Item = JustificationNode<'_>> {
    self.roots.iter().map(|&index| JustificationNode { tree: self, index })
  }

  /// Every attached justification, breadth first.
  pub fn iter(&self) -> impl Iterator<Item = &Justification> { self.nodes.iter() }

  pub fn get(&self, justification_id: Uuid) -> Option<JustificationNode<'_>> {
    self
      .nodes
      .iter()
      .position(|j| j.justification_id == justification_id)
      .map(|index| JustificationNode { tree: self, index })
  }

  pub fn len(&self) -> usize { self.nodes.len() }

  pub fn is_empty(&self) -> bool { self.nodes.is_empty() }
}

/// A borrowed view of one justification within a [`JustificationTree`].
#[derive(Debug, Clone, Copy)]
pub struct JustificationNode<'a> {
  tree:  &'a JustificationTree,
  index: usize,
}

impl<'a> JustificationNode<'a> {
  pub fn justification(&self) -> &'a Justification { &self.tree.nodes[self.index] }

  pub fn counter_justifications(&self) -> impl Iterator<Item = JustificationNode<'a>> + 'a {
    let tree = self.tree;
    tree.counters[self.index]
      .iter()
      .map(move |&index| JustificationNode { tree, index })
  }
}

impl Serialize for JustificationNode<'_> {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    struct View<'a> {
      #[serde(flatten)]
      justification:          &'a Justification,
      counter_justifications: Vec<JustificationNode<'a>>,
    }

    View {
      justification:          self.justification(),
      counter_justifications: self.counter_justifications().collect(),
    }
    .serialize(serializer)
  }
}

impl Serialize for JustificationTree {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut s = serializer.serialize_struct("JustificationTree", 2)?;
    s.serialize_field("root_target", &self.root_target)?;
    s.serialize_field("justifications", &self.roots().collect::<Vec<_>>())?;
    s.end()
  }
}
