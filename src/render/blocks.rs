use std::collections::BTreeMap;

use crate::types::program::{BlockDecl, Template};

/// A block declaration together with the template that declared it.
#[derive(Clone, Copy)]
pub struct BlockRef<'render> {
    pub template: &'render Template<'render>,
    pub decl: &'render BlockDecl,
}

/// The override chain for each block name in an `{% extends %}` hierarchy.
///
/// Each chain is ordered from the root template up to the most derived one so
/// the declaration that should be rendered is always on top.
#[derive(Default)]
pub struct BlockContext<'render> {
    blocks: BTreeMap<&'render str, Vec<BlockRef<'render>>>,
}

impl<'render> BlockContext<'render> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add all the blocks declared in a template.
    ///
    /// Templates must be added from the most derived to the root, each one is
    /// placed beneath the declarations already present.
    pub fn add_blocks(&mut self, template: &'render Template<'render>) {
        for decl in &template.blocks {
            let name = template.block_name(decl);
            self.blocks
                .entry(name)
                .or_default()
                .insert(0, BlockRef { template, decl });
        }
    }

    pub fn pop(&mut self, name: &str) -> Option<BlockRef<'render>> {
        self.blocks.get_mut(name)?.pop()
    }

    pub fn push(&mut self, name: &'render str, block: BlockRef<'render>) {
        self.blocks.entry(name).or_default().push(block);
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<BlockRef<'render>> {
        self.blocks.get(name)?.last().copied()
    }
}
