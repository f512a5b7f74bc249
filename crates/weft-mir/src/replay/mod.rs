// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Replay executor for resumable functions.
//!
//! Runs a [`StateMachine`] against a [`Host`] that implements the calls and
//! awaits. Every suspension and every fault dispatch discards all locals,
//! so a value that is needed afterwards but was not saved in the frame is
//! reported as [`ReplayError::LostLocal`] instead of silently surviving.

mod script;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;
use weft_types::Conversion;

use crate::lower::NULLABLE_NO_VALUE;
use crate::operand::MirConst;
use crate::transform::{StateMachine, STATE_SLOT};
use crate::{
    BinOp, BlockId, FunctionRef, LocalId, MirOperand, MirRValue, MirStmt, MirTerminator, MirType,
    SuspendPointId,
};

pub use script::{HostEvent, Script, ScriptHost};

/// Fault raised when a call is made on a null receiver.
pub const NULL_REFERENCE: &str = "Object reference not set to an instance of an object.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Unit,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Host object handle.
    Object(u32),
    Struct { ty: String, fields: Vec<Value> },
    Array(Vec<Value>),
    /// Host awaitable handle.
    Awaitable(u32),
    Exception(String),
    /// A local discarded at a suspension.
    Poison,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::Object(id) => write!(f, "object#{}", id),
            Value::Struct { ty, fields } => {
                write!(f, "{} {{", ty)?;
                for (i, field) in fields.iter().enumerate() {
                    write!(f, "{}{}", if i == 0 { " " } else { ", " }, field)?;
                }
                write!(f, " }}")
            }
            Value::Array(items) => write!(f, "[{} items]", items.len()),
            Value::Awaitable(id) => write!(f, "awaitable#{}", id),
            Value::Exception(msg) => write!(f, "{}", msg),
            Value::Poison => write!(f, "<discarded>"),
        }
    }
}

/// A runtime exception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub message: String,
}

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Fault { message: message.into() }
    }
}

/// The runtime a replay runs against.
pub trait Host {
    fn call(
        &mut self,
        func: &FunctionRef,
        receiver: Option<&mut Value>,
        args: &[Value],
    ) -> Result<Value, Fault>;

    /// Complete the awaitable suspended on at `point`.
    fn await_value(&mut self, point: SuspendPointId, awaitable: Value) -> Result<Value, Fault>;

    fn is_instance(&mut self, value: &Value, contract: &str) -> bool;

    fn convert(
        &mut self,
        value: Value,
        conversion: &Conversion,
        target: &MirType,
    ) -> Result<Value, Fault> {
        default_convert(value, conversion, target)
    }
}

/// Conversions that need no host knowledge.
pub fn default_convert(value: Value, conversion: &Conversion, target: &MirType) -> Result<Value, Fault> {
    match (conversion, value) {
        (Conversion::ExplicitNullable | Conversion::Unboxing, Value::Null) => {
            Err(Fault::new(NULLABLE_NO_VALUE))
        }
        (Conversion::ImplicitNumeric | Conversion::ExplicitNumeric, Value::Int(i))
            if *target == MirType::F64 =>
        {
            Ok(Value::Float(i as f64))
        }
        (Conversion::ExplicitNumeric, Value::Float(x)) if target.is_numeric() && *target != MirType::F64 => {
            Ok(Value::Int(x as i64))
        }
        (_, value) => Ok(value),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    Returned(Option<Value>),
    /// Unhandled fault, by message.
    Threw(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub completion: Completion,
    /// Suspension points in the order they were reached.
    pub suspensions: Vec<SuspendPointId>,
    pub steps: usize,
}

impl Outcome {
    pub fn suspensions_at(&self, point: SuspendPointId) -> usize {
        self.suspensions.iter().filter(|p| **p == point).count()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReplayError {
    #[error("step limit of {limit} exceeded")]
    StepLimit { limit: usize },
    #[error("local _{local} read after it was discarded at a suspension")]
    LostLocal { local: u32 },
    #[error("expected {expected} arguments, got {found}")]
    ArgumentCount { expected: usize, found: usize },
    #[error("no block bb{block}")]
    InvalidBlock { block: u32 },
    #[error("no frame slot {slot}")]
    InvalidFrameSlot { slot: u32 },
    #[error("reached unreachable code in bb{block}")]
    Unreachable { block: u32 },
    #[error("expected {expected}, found `{found}`")]
    TypeMismatch { expected: &'static str, found: String },
    #[error("left a protected region that was never entered")]
    UnbalancedRegion,
}

/// Run `machine` to completion.
pub fn run<H: Host + ?Sized>(
    machine: &StateMachine,
    host: &mut H,
    args: Vec<Value>,
    max_steps: usize,
) -> Result<Outcome, ReplayError> {
    let func = &machine.function;
    if args.len() != func.params.len() {
        return Err(ReplayError::ArgumentCount { expected: func.params.len(), found: args.len() });
    }
    let mut exec = Executor {
        machine,
        host,
        locals: vec![Value::Null; func.locals.len()],
        frame: vec![Value::Null; machine.frame.len()],
        handlers: Vec::new(),
        in_flight: None,
        steps: 0,
        max_steps,
        suspensions: Vec::new(),
    };
    for (param, value) in func.params.iter().zip(args) {
        exec.locals[param.id.0 as usize] = value;
    }
    if let Some(tag) = exec.frame.get_mut(STATE_SLOT as usize) {
        *tag = Value::Int(0);
    }
    let completion = exec.run()?;
    Ok(Outcome { completion, suspensions: exec.suspensions, steps: exec.steps })
}

struct Executor<'m, H: Host + ?Sized> {
    machine: &'m StateMachine,
    host: &'m mut H,
    locals: Vec<Value>,
    frame: Vec<Value>,
    handlers: Vec<BlockId>,
    in_flight: Option<Value>,
    steps: usize,
    max_steps: usize,
    suspensions: Vec<SuspendPointId>,
}

/// Statement effect: continue, or a fault to dispatch.
type Step = Result<(), Fault>;

impl<H: Host + ?Sized> Executor<'_, H> {
    fn run(&mut self) -> Result<Completion, ReplayError> {
        let machine = self.machine;
        let func = &machine.function;
        let mut block = func.entry_block;

        'blocks: loop {
            let current = func.block(block).ok_or(ReplayError::InvalidBlock { block: block.0 })?;
            for stmt in &current.statements {
                self.tick()?;
                if let Err(fault) = self.exec(stmt)? {
                    match self.raise(fault) {
                        Ok(handler) => {
                            block = handler;
                            continue 'blocks;
                        }
                        Err(message) => return Ok(Completion::Threw(message)),
                    }
                }
            }

            self.tick()?;
            block = match &current.terminator {
                MirTerminator::Return { value } => {
                    let value = value.as_ref().map(|v| self.read(v)).transpose()?;
                    return Ok(Completion::Returned(value));
                }
                MirTerminator::Goto { target } => *target,
                MirTerminator::Branch { cond, then_block, else_block } => match self.read(cond)? {
                    Value::Bool(true) => *then_block,
                    Value::Bool(false) => *else_block,
                    other => return Err(mismatch("bool", &other)),
                },
                MirTerminator::Switch { value, cases, default } => match self.read(value)? {
                    Value::Int(v) => cases
                        .iter()
                        .find(|(case, _)| *case == v)
                        .map(|(_, target)| *target)
                        .unwrap_or(*default),
                    other => return Err(mismatch("integer", &other)),
                },
                MirTerminator::Suspend { point, awaitable, dst, .. } => {
                    let awaitable = self.read(awaitable)?;
                    self.suspensions.push(*point);
                    trace!(target: "state_machine", point = point.0, "suspend");
                    let result = self.host.await_value(*point, awaitable);
                    self.discard_locals();
                    match result {
                        Ok(value) => {
                            if let Some(dst) = dst {
                                self.locals[dst.0 as usize] = value;
                            }
                            func.entry_block
                        }
                        Err(fault) => match self.raise(fault) {
                            Ok(handler) => handler,
                            Err(message) => return Ok(Completion::Threw(message)),
                        },
                    }
                }
                MirTerminator::Throw { value } => {
                    let fault = Fault::new(self.read(value)?.to_string());
                    match self.raise(fault) {
                        Ok(handler) => handler,
                        Err(message) => return Ok(Completion::Threw(message)),
                    }
                }
                MirTerminator::Unreachable => return Err(ReplayError::Unreachable { block: block.0 }),
            };
        }
    }

    fn tick(&mut self) -> Result<(), ReplayError> {
        self.steps += 1;
        if self.steps > self.max_steps {
            return Err(ReplayError::StepLimit { limit: self.max_steps });
        }
        Ok(())
    }

    /// Enter the innermost handler, or report the fault as unhandled.
    fn raise(&mut self, fault: Fault) -> Result<BlockId, String> {
        match self.handlers.pop() {
            Some(handler) => {
                trace!(target: "state_machine", message = %fault.message, "fault dispatched");
                self.in_flight = Some(Value::Exception(fault.message));
                self.discard_locals();
                Ok(handler)
            }
            None => Err(fault.message),
        }
    }

    fn discard_locals(&mut self) {
        for local in &mut self.locals {
            *local = Value::Poison;
        }
    }

    fn read(&self, op: &MirOperand) -> Result<Value, ReplayError> {
        match op {
            MirOperand::Local(id) => match &self.locals[id.0 as usize] {
                Value::Poison => Err(ReplayError::LostLocal { local: id.0 }),
                value => Ok(value.clone()),
            },
            MirOperand::Constant(c) => Ok(constant(c)),
        }
    }

    fn write(&mut self, dst: LocalId, value: Value) {
        self.locals[dst.0 as usize] = value;
    }

    fn exec(&mut self, stmt: &MirStmt) -> Result<Step, ReplayError> {
        match stmt {
            MirStmt::Assign { dst, rvalue } => match self.eval(rvalue)? {
                Ok(value) => self.write(*dst, value),
                Err(fault) => return Ok(Err(fault)),
            },
            MirStmt::Call { dst, func, receiver, args } => {
                let args = args.iter().map(|a| self.read(a)).collect::<Result<Vec<_>, _>>()?;
                let mut target = receiver.as_ref().map(|r| self.read(&r.value)).transpose()?;
                if matches!(target, Some(Value::Null)) {
                    return Ok(Err(Fault::new(NULL_REFERENCE)));
                }
                let result = self.host.call(func, target.as_mut(), &args);
                if let (Some(r), Some(updated)) = (receiver, target) {
                    if let (true, Some(local)) = (r.by_ref, r.value.local()) {
                        self.write(local, updated);
                    }
                }
                match result {
                    Ok(value) => {
                        if let Some(dst) = dst {
                            self.write(*dst, value);
                        }
                    }
                    Err(fault) => return Ok(Err(fault)),
                }
            }
            MirStmt::EnsurePush { cleanup_block } => self.handlers.push(*cleanup_block),
            MirStmt::EnsurePop => {
                self.handlers.pop().ok_or(ReplayError::UnbalancedRegion)?;
            }
            MirStmt::CatchException { dst } => {
                let exception = self.in_flight.take().unwrap_or(Value::Null);
                self.write(*dst, exception);
            }
            MirStmt::FrameLoad { dst, slot } => {
                let value = self
                    .frame
                    .get(*slot as usize)
                    .cloned()
                    .ok_or(ReplayError::InvalidFrameSlot { slot: *slot })?;
                self.write(*dst, value);
            }
            MirStmt::FrameStore { slot, value } => {
                let value = self.read(value)?;
                let entry = self
                    .frame
                    .get_mut(*slot as usize)
                    .ok_or(ReplayError::InvalidFrameSlot { slot: *slot })?;
                *entry = value;
            }
        }
        Ok(Ok(()))
    }

    fn eval(&mut self, rvalue: &MirRValue) -> Result<Result<Value, Fault>, ReplayError> {
        let value = match rvalue {
            MirRValue::Use(op) => self.read(op)?,
            MirRValue::BinaryOp { op, left, right } => {
                binary(*op, self.read(left)?, self.read(right)?)?
            }
            MirRValue::Convert { value, conversion, target } => {
                let value = self.read(value)?;
                return Ok(self.host.convert(value, conversion, target));
            }
            MirRValue::NullableHasValue(op) => Value::Bool(self.read(op)? != Value::Null),
            MirRValue::NullableValue(op) => match self.read(op)? {
                Value::Null => return Ok(Err(Fault::new(NULLABLE_NO_VALUE))),
                value => value,
            },
            MirRValue::IsNull(op) => Value::Bool(self.read(op)? == Value::Null),
            MirRValue::IsInstance { value, contract } => match self.read(value)? {
                Value::Null => Value::Bool(false),
                value => Value::Bool(self.host.is_instance(&value, contract)),
            },
        };
        Ok(Ok(value))
    }
}

fn constant(c: &MirConst) -> Value {
    match c {
        MirConst::Int(i) => Value::Int(*i),
        MirConst::Float(x) => Value::Float(*x),
        MirConst::Bool(b) => Value::Bool(*b),
        MirConst::String(s) => Value::Str(s.clone()),
        MirConst::Null => Value::Null,
        MirConst::Default(ty) => default_of(ty),
        MirConst::EmptyArray => Value::Array(Vec::new()),
    }
}

fn default_of(ty: &MirType) -> Value {
    match ty {
        MirType::Bool => Value::Bool(false),
        MirType::I32 | MirType::I64 | MirType::U32 => Value::Int(0),
        MirType::F64 => Value::Float(0.0),
        MirType::Struct(name) => Value::Struct { ty: name.clone(), fields: Vec::new() },
        _ => Value::Null,
    }
}

fn binary(op: BinOp, left: Value, right: Value) -> Result<Value, ReplayError> {
    match (op, &left, &right) {
        (BinOp::Eq, _, _) => Ok(Value::Bool(left == right)),
        (BinOp::Ne, _, _) => Ok(Value::Bool(left != right)),
        (BinOp::Add, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
        (BinOp::Sub, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a - b)),
        (BinOp::Lt, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a < b)),
        (BinOp::Gt, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a > b)),
        (BinOp::Add, Value::Str(a), b) => Ok(Value::Str(format!("{}{}", a, b))),
        _ => Err(mismatch("integers", &left)),
    }
}

fn mismatch(expected: &'static str, found: &Value) -> ReplayError {
    ReplayError::TypeMismatch { expected, found: found.to_string() }
}
