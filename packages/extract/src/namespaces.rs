use std::collections::HashMap;

use gimli::constants::DW_TAG_namespace;
use model::ArcStr;

use crate::dwarf::{DieNode, Goff, Unit};

/// Maps every DIE in a compilation unit to the chain of enclosing
/// `DW_TAG_namespace` names (outermost first), built with one DFS pass over
/// the unit's whole tree.
///
/// DIEs outside of any namespace map to an empty slice. Anonymous
/// namespaces contribute a fixed placeholder name rather than being
/// skipped, since they still affect name lookup/qualification in C++.
pub struct NamespaceMap(HashMap<Goff, Vec<ArcStr>>);

impl NamespaceMap {
    pub fn build(unit: &Unit) -> cu::Result<Self> {
        let mut map = HashMap::new();
        let mut stack = Vec::new();
        let mut tree = unit.tree()?;
        let root = tree.root()?;
        root.for_each_child(|child| Self::visit(child, &mut stack, &mut map))?;
        Ok(Self(map))
    }

    fn visit(
        node: DieNode<'_, '_>,
        stack: &mut Vec<ArcStr>,
        map: &mut HashMap<Goff, Vec<ArcStr>>,
    ) -> cu::Result<()> {
        let goff = node.goff();
        let is_namespace = node.entry().tag() == DW_TAG_namespace;
        if is_namespace {
            let entry = node.entry();
            let name = entry.name_opt()?.unwrap_or("(anonymous namespace)");
            stack.push(ArcStr::from(name));
        }
        map.insert(goff, stack.clone());
        node.for_each_child(|child| Self::visit(child, stack, map))?;
        if is_namespace {
            stack.pop();
        }
        Ok(())
    }

    /// Namespace chain (outermost first) enclosing the DIE at `goff`.
    pub fn get(&self, goff: Goff) -> &[ArcStr] {
        self.0.get(&goff).map(Vec::as_slice).unwrap_or(&[])
    }
}
