// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! MIR function representation - control-flow graph of basic blocks.

use crate::{MirStmt, MirTerminator, MirType};

#[derive(Debug, Clone)]
pub struct MirFunction {
    pub name: String,
    pub params: Vec<MirLocal>,
    pub ret_ty: MirType,
    pub locals: Vec<MirLocal>,
    pub blocks: Vec<MirBlock>,
    pub entry_block: BlockId,
}

/// Basic block in CFG
#[derive(Debug, Clone)]
pub struct MirBlock {
    pub id: BlockId,
    pub statements: Vec<MirStmt>,
    pub terminator: MirTerminator,
}

/// Local variable or temporary
#[derive(Debug, Clone)]
pub struct MirLocal {
    pub id: LocalId,
    pub name: Option<String>,
    pub ty: MirType,
    pub is_param: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u32);

impl MirFunction {
    pub fn block(&self, id: BlockId) -> Option<&MirBlock> {
        self.blocks.get(id.0 as usize)
    }

    pub fn local(&self, id: LocalId) -> Option<&MirLocal> {
        self.locals.get(id.0 as usize)
    }

    /// Local by source name; the last declaration wins on shadowing.
    pub fn local_named(&self, name: &str) -> Option<&MirLocal> {
        self.locals.iter().rev().find(|l| l.name.as_deref() == Some(name))
    }

    /// Every suspension in the function, in block order.
    pub fn suspend_terminators(&self) -> impl Iterator<Item = (&MirBlock, &MirTerminator)> {
        self.blocks
            .iter()
            .filter(|b| matches!(b.terminator, MirTerminator::Suspend { .. }))
            .map(|b| (b, &b.terminator))
    }

    /// Blocks that install a protected region's handler.
    pub fn handler_blocks(&self) -> Vec<BlockId> {
        let mut out = Vec::new();
        for block in &self.blocks {
            for stmt in &block.statements {
                if let MirStmt::EnsurePush { cleanup_block } = stmt {
                    if !out.contains(cleanup_block) {
                        out.push(*cleanup_block);
                    }
                }
            }
        }
        out
    }
}
