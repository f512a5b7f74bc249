// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! BlockBuilder - helper for CFG construction during lowering.

use crate::{BlockId, LocalId, MirBlock, MirFunction, MirLocal, MirStmt, MirTerminator, MirType};

pub struct BlockBuilder {
    function: MirFunction,
    current_block: BlockId,
    next_local_id: u32,
    next_block_id: u32,
}

impl BlockBuilder {
    pub fn new(name: String, ret_ty: MirType) -> Self {
        let entry_block = BlockId(0);
        let function = MirFunction {
            name,
            params: Vec::new(),
            ret_ty,
            locals: Vec::new(),
            blocks: vec![MirBlock {
                id: entry_block,
                statements: Vec::new(),
                terminator: MirTerminator::Unreachable,
            }],
            entry_block,
        };

        Self { function, current_block: entry_block, next_local_id: 0, next_block_id: 1 }
    }

    pub fn set_ret_ty(&mut self, ty: MirType) {
        self.function.ret_ty = ty;
    }

    pub fn create_block(&mut self) -> BlockId {
        let id = BlockId(self.next_block_id);
        self.next_block_id += 1;
        self.function.blocks.push(MirBlock {
            id,
            statements: Vec::new(),
            terminator: MirTerminator::Unreachable,
        });
        id
    }

    pub fn switch_to_block(&mut self, block: BlockId) {
        self.current_block = block;
    }

    pub fn current_block(&self) -> BlockId {
        self.current_block
    }

    pub fn alloc_temp(&mut self, ty: MirType) -> LocalId {
        self.alloc(None, ty, false)
    }

    pub fn alloc_local(&mut self, name: String, ty: MirType) -> LocalId {
        self.alloc(Some(name), ty, false)
    }

    pub fn add_param(&mut self, name: String, ty: MirType) -> LocalId {
        let id = self.alloc(Some(name), ty, true);
        let local = self.function.locals[id.0 as usize].clone();
        self.function.params.push(local);
        id
    }

    fn alloc(&mut self, name: Option<String>, ty: MirType, is_param: bool) -> LocalId {
        let id = LocalId(self.next_local_id);
        self.next_local_id += 1;
        self.function.locals.push(MirLocal { id, name, ty, is_param });
        id
    }

    pub fn local_type(&self, id: LocalId) -> Option<&MirType> {
        self.function.locals.get(id.0 as usize).map(|l| &l.ty)
    }

    pub fn push_stmt(&mut self, stmt: MirStmt) {
        let block = &mut self.function.blocks[self.current_block.0 as usize];
        block.statements.push(stmt);
    }

    pub fn terminate(&mut self, term: MirTerminator) {
        let block = &mut self.function.blocks[self.current_block.0 as usize];
        block.terminator = term;
    }

    /// Check if the current block still has the default Unreachable terminator.
    pub fn current_block_unterminated(&self) -> bool {
        matches!(
            self.function.blocks[self.current_block.0 as usize].terminator,
            MirTerminator::Unreachable
        )
    }

    pub fn finish(self) -> MirFunction {
        self.function
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MirOperand;

    #[test]
    fn blocks_and_locals_are_numbered_in_order() {
        let mut b = BlockBuilder::new("f".into(), MirType::Void);
        let p = b.add_param("xs".into(), MirType::Ref("Bag".into()));
        let t = b.alloc_temp(MirType::Bool);
        let next = b.create_block();
        assert_eq!((p, t, next), (LocalId(0), LocalId(1), BlockId(1)));
        assert!(b.current_block_unterminated());

        b.terminate(MirTerminator::Goto { target: next });
        b.switch_to_block(next);
        b.terminate(MirTerminator::Return { value: Some(MirOperand::Local(t)) });
        let f = b.finish();
        assert_eq!(f.params.len(), 1);
        assert!(f.params[0].is_param);
        assert_eq!(f.blocks.len(), 2);
    }
}
