//! Structural merge of a template instance into a concrete node.
//!
//! The target always wins: scalars are copied only when absent, keyed children with the same name
//! are merged recursively and everything else is appended. Entries marked optional inside a
//! template only ever refine what the target already has.

use crate::error::ExpansionError;
use crate::nodes::{Node, NodeKind, Optionality};
use log::trace;
use std::collections::BTreeSet;

fn describe(node: &Node) -> String {
    format!("{} `{}`", node.kind(), node.name())
}

fn merge_error(target: &Node, source: &Node, reason: impl Into<String>) -> ExpansionError {
    ExpansionError::Merge {
        target: describe(target),
        source_node: describe(source),
        reason: reason.into(),
    }
}

fn compatible(target: NodeKind, source: NodeKind) -> bool {
    target == source || (target == NodeKind::Method && source == NodeKind::AbstractMethod)
}

/// Whether an unmatched child of the source must stay out of the target.
fn suppressed(child: &Node, target_kinds: &BTreeSet<NodeKind>) -> bool {
    match child.optionality() {
        Some(Optionality::Entry) => true,
        Some(Optionality::Collection) => !target_kinds.contains(&child.kind()),
        None => false,
    }
}

fn effective_type(parameter: &Node) -> &str {
    parameter.str_property("type").unwrap_or("string")
}

impl Node {
    /// Merges `other` into `self` with `self` taking precedence.
    ///
    /// # Errors
    /// Fails when the kinds cannot be merged or when two bodies or responses disagree on their
    /// media type or status code.
    pub fn merge(&mut self, other: &Node) -> Result<(), ExpansionError> {
        if !compatible(self.kind, other.kind) {
            return Err(merge_error(self, other, "incompatible node kinds"));
        }
        if matches!(self.kind, NodeKind::Body | NodeKind::Response) && self.name != other.name {
            return Err(merge_error(
                self,
                other,
                "bodies and responses only merge with the same media type or status code",
            ));
        }
        if self.kind.is_parameter() {
            return self.merge_parameter(other);
        }
        self.merge_scalars(other);
        self.merge_children(other)
    }

    fn merge_scalars(&mut self, other: &Node) {
        for (name, value) in &other.scalars {
            if other.optionals.contains(name) {
                trace!("skipping optional property `{name}` of {}", describe(other));
                continue;
            }
            self.scalars.entry(*name).or_insert_with(|| value.clone());
        }
    }

    fn merge_children(&mut self, other: &Node) -> Result<(), ExpansionError> {
        let target_kinds: BTreeSet<NodeKind> = self.children.iter().map(|c| c.kind).collect();
        let mut inherited_traits = Vec::new();

        for child in &other.children {
            match child.kind {
                kind if kind.is_keyed() => {
                    let existing = self
                        .children
                        .iter_mut()
                        .find(|c| c.kind == kind && c.name == child.name);
                    if let Some(existing) = existing {
                        existing.merge(child)?;
                    } else if suppressed(child, &target_kinds) {
                        trace!("skipping optional {} for {}", describe(child), describe(self));
                    } else {
                        self.children.push(Node::adopt(child)?);
                    }
                }
                NodeKind::TraitReference | NodeKind::Trait => {
                    let present = self.applied_traits().iter().any(|t| same_trait(t, child));
                    if !present {
                        inherited_traits.push(child.clone());
                    }
                }
                NodeKind::ResourceTypeReference | NodeKind::ResourceType => {
                    if self.resource_type().is_none() {
                        self.children.push(child.clone());
                    }
                }
                NodeKind::Schema | NodeKind::SchemaReference => {
                    if self.schema().is_none() && !suppressed(child, &target_kinds) {
                        self.children.push(child.clone());
                    }
                }
                kind => {
                    if !target_kinds.contains(&kind) && !suppressed(child, &target_kinds) {
                        self.children.push(child.clone());
                    }
                }
            }
        }

        if !inherited_traits.is_empty() {
            let position = self
                .children
                .iter()
                .position(|c| matches!(c.kind, NodeKind::TraitReference | NodeKind::Trait))
                .unwrap_or(self.children.len());
            for (offset, inherited) in inherited_traits.into_iter().enumerate() {
                self.children.insert(position + offset, inherited);
            }
        }
        Ok(())
    }

    /// A fresh copy of an unmatched source child, with its own optional entries dropped since there
    /// is nothing in the target for them to refine.
    fn adopt(source: &Node) -> Result<Node, ExpansionError> {
        let mut node = Node::empty(source.kind, source.name.clone());
        node.payload = source.payload.clone();
        if source.has_multiple_types() {
            for alternative in source.type_alternatives() {
                node.children.push(Node::adopt(alternative)?);
            }
            return Ok(node);
        }
        node.merge(source)?;
        Ok(node)
    }

    fn merge_parameter(&mut self, other: &Node) -> Result<(), ExpansionError> {
        match (self.has_multiple_types(), other.has_multiple_types()) {
            (false, false) => {
                self.merge_scalars(other);
                Ok(())
            }
            (true, true) => {
                for alternative in other.type_alternatives() {
                    self.merge_alternative(alternative)?;
                }
                Ok(())
            }
            (true, false) => self.merge_alternative(other),
            (false, true) => {
                // The target becomes multi-type: its single form is one alternative.
                let mut single = Node::empty(self.kind, self.name.clone());
                single.scalars = std::mem::take(&mut self.scalars);
                single.optionals = std::mem::take(&mut self.optionals);
                self.children.push(single);
                for alternative in other.type_alternatives() {
                    self.merge_alternative(alternative)?;
                }
                Ok(())
            }
        }
    }

    /// Merges one source alternative into the alternative of the same type, or appends it.
    fn merge_alternative(&mut self, source: &Node) -> Result<(), ExpansionError> {
        let kind = self.kind;
        let declared = effective_type(source).to_string();
        let matching = self
            .children
            .iter_mut()
            .find(|c| c.kind == kind && effective_type(c) == declared);
        match matching {
            Some(existing) => existing.merge_scalars(source),
            None => self.children.push(Node::adopt(source)?),
        }
        Ok(())
    }
}

fn same_trait(a: &Node, b: &Node) -> bool {
    match (a.reference(), b.reference()) {
        (Some(left), Some(right)) => left.name() == right.name(),
        (None, None) => a.template() == b.template(),
        _ => false,
    }
}
