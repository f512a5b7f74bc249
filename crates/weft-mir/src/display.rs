// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Display implementations for MIR types.

use std::fmt;

use crate::operand::{BinOp, FunctionRef, MirConst, Receiver};
use crate::*;

impl fmt::Display for MirType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirType::Void => write!(f, "void"),
            MirType::Bool => write!(f, "bool"),
            MirType::I32 => write!(f, "i32"),
            MirType::I64 => write!(f, "i64"),
            MirType::U32 => write!(f, "u32"),
            MirType::F64 => write!(f, "f64"),
            MirType::String => write!(f, "string"),
            MirType::Ref(name) => write!(f, "ref {}", name),
            MirType::Struct(name) => write!(f, "struct {}", name),
            MirType::Nullable(inner) => write!(f, "{}?", inner),
            MirType::Awaitable(name) => write!(f, "await {}", name),
            MirType::Exception => write!(f, "exception"),
        }
    }
}

impl fmt::Display for MirOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirOperand::Local(id) => write!(f, "_{}", id.0),
            MirOperand::Constant(c) => write!(f, "{}", c),
        }
    }
}

impl fmt::Display for MirConst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirConst::Int(v) => write!(f, "{}", v),
            MirConst::Float(v) => write!(f, "{}", v),
            MirConst::Bool(v) => write!(f, "{}", v),
            MirConst::String(s) => write!(f, "\"{}\"", s),
            MirConst::Null => write!(f, "null"),
            MirConst::Default(ty) => write!(f, "default({})", ty),
            MirConst::EmptyArray => write!(f, "[]"),
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sym = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
        };
        write!(f, "{}", sym)
    }
}

impl fmt::Display for MirRValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirRValue::Use(op) => write!(f, "{}", op),
            MirRValue::BinaryOp { op, left, right } => {
                write!(f, "{} {} {}", left, op, right)
            }
            MirRValue::Convert { value, conversion, target } => {
                write!(f, "{} as {} ({:?})", value, target, conversion)
            }
            MirRValue::NullableHasValue(op) => write!(f, "has_value({})", op),
            MirRValue::NullableValue(op) => write!(f, "value({})", op),
            MirRValue::IsNull(op) => write!(f, "{} == null", op),
            MirRValue::IsInstance { value, contract } => write!(f, "{} is {}", value, contract),
        }
    }
}

impl fmt::Display for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified())
    }
}

impl fmt::Display for Receiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.by_ref {
            write!(f, "&mut {}", self.value)
        } else {
            write!(f, "{}", self.value)
        }
    }
}

impl fmt::Display for MirStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirStmt::Assign { dst, rvalue } => {
                write!(f, "_{} = {}", dst.0, rvalue)
            }
            MirStmt::Call { dst, func, receiver, args } => {
                if let Some(d) = dst {
                    write!(f, "_{} = ", d.0)?;
                }
                write!(f, "{}(", func)?;
                let receiver = receiver.iter().map(ToString::to_string);
                let args = args.iter().map(ToString::to_string);
                let all: Vec<String> = receiver.chain(args).collect();
                write!(f, "{})", all.join(", "))
            }
            MirStmt::EnsurePush { cleanup_block } => {
                write!(f, "ensure_push(bb{})", cleanup_block.0)
            }
            MirStmt::EnsurePop => write!(f, "ensure_pop"),
            MirStmt::CatchException { dst } => write!(f, "_{} = catch", dst.0),
            MirStmt::FrameLoad { dst, slot } => write!(f, "_{} = frame[{}]", dst.0, slot),
            MirStmt::FrameStore { slot, value } => write!(f, "frame[{}] = {}", slot, value),
        }
    }
}

impl fmt::Display for MirTerminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirTerminator::Return { value: Some(v) } => write!(f, "return {}", v),
            MirTerminator::Return { value: None } => write!(f, "return"),
            MirTerminator::Goto { target } => write!(f, "goto bb{}", target.0),
            MirTerminator::Branch { cond, then_block, else_block } => {
                write!(f, "if {} then bb{} else bb{}", cond, then_block.0, else_block.0)
            }
            MirTerminator::Switch { value, cases, default } => {
                write!(f, "switch {} [", value)?;
                for (i, (val, block)) in cases.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}: bb{}", val, block.0)?;
                }
                write!(f, ", default: bb{}]", default.0)
            }
            MirTerminator::Suspend { point, awaitable, dst, resume } => {
                if let Some(d) = dst {
                    write!(f, "_{} = ", d.0)?;
                }
                write!(f, "suspend#{} {} -> bb{}", point.0, awaitable, resume.0)
            }
            MirTerminator::Throw { value } => write!(f, "throw {}", value),
            MirTerminator::Unreachable => write!(f, "unreachable"),
        }
    }
}

impl fmt::Display for MirFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| match &p.name {
                Some(name) => format!("{}: {}", name, p.ty),
                None => format!("_{}: {}", p.id.0, p.ty),
            })
            .collect();
        writeln!(f, "func {}({}) -> {} {{", self.name, params.join(", "), self.ret_ty)?;

        let mut locals = self.locals.iter().filter(|l| !l.is_param).peekable();
        let any_locals = locals.peek().is_some();
        for local in locals {
            write!(f, "  _{}: {}", local.id.0, local.ty)?;
            match &local.name {
                Some(name) => writeln!(f, "  // {}", name)?,
                None => writeln!(f)?,
            }
        }
        if any_locals {
            writeln!(f)?;
        }

        for block in &self.blocks {
            let entry = if block.id == self.entry_block { "  // entry" } else { "" };
            writeln!(f, "  bb{}:{}", block.id.0, entry)?;
            for stmt in &block.statements {
                writeln!(f, "    {}", stmt)?;
            }
            writeln!(f, "    {}", block.terminator)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operand::{CallDispatch, CallRole};

    #[test]
    fn protocol_calls_show_their_receiver() {
        let stmt = MirStmt::Call {
            dst: Some(LocalId(2)),
            func: FunctionRef {
                owner: "E".into(),
                name: "MoveNextAsync".into(),
                dispatch: CallDispatch::Instance,
                role: CallRole::Advance,
                ret: MirType::Awaitable("ValueTask<bool>".into()),
            },
            receiver: Some(Receiver { value: MirOperand::Local(LocalId(1)), by_ref: true }),
            args: vec![MirOperand::Constant(MirConst::Default(MirType::Struct("CancellationToken".into())))],
        };
        assert_eq!(
            stmt.to_string(),
            "_2 = E.MoveNextAsync(&mut _1, default(struct CancellationToken))"
        );

        let term = MirTerminator::Suspend {
            point: SuspendPointId(0),
            awaitable: MirOperand::Local(LocalId(2)),
            dst: Some(LocalId(3)),
            resume: BlockId(4),
        };
        assert_eq!(term.to_string(), "_3 = suspend#0 _2 -> bb4");
    }
}
