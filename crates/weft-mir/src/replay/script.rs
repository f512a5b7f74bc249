// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! A data-driven host for replays.
//!
//! Every acquisition yields a fresh enumerator over the scripted elements.
//! Reference enumerators keep their cursor in the host; value-type
//! enumerators keep it in their first field, so a lost write-back shows up
//! as a loop that never advances.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Fault, Host, Value};
use crate::operand::CallRole;
use crate::{FunctionRef, MirType, SuspendPointId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Script {
    /// Elements produced by every enumerator, in order.
    pub elements: Vec<i64>,
    /// 1-based advance call whose await faults.
    pub fault_on_advance: Option<usize>,
    /// 1-based read of `Current` that faults.
    pub fault_on_current: Option<usize>,
    pub fault_on_dispose: bool,
    /// Acquisition returns null.
    pub null_enumerator: bool,
    /// Runtime answer to "implements the disposal contract".
    pub disposable: bool,
    /// Free functions that fault when called.
    pub faulting_calls: Vec<String>,
}

impl Default for Script {
    fn default() -> Self {
        Script {
            elements: Vec::new(),
            fault_on_advance: None,
            fault_on_current: None,
            fault_on_dispose: false,
            null_enumerator: false,
            disposable: true,
            faulting_calls: Vec::new(),
        }
    }
}

/// Observable host activity, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    Construct { ty: String },
    Acquire { member: String },
    Advance,
    Current { value: i64 },
    Dispose { member: String },
    Call { name: String, args: Vec<String> },
}

impl fmt::Display for HostEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostEvent::Construct { ty } => write!(f, "new {}", ty),
            HostEvent::Acquire { member } => write!(f, "acquire {}", member),
            HostEvent::Advance => write!(f, "advance"),
            HostEvent::Current { value } => write!(f, "current {}", value),
            HostEvent::Dispose { member } => write!(f, "dispose {}", member),
            HostEvent::Call { name, args } => write!(f, "{}({})", name, args.join(", ")),
        }
    }
}

#[derive(Debug, Default)]
pub struct ScriptHost {
    script: Script,
    events: Vec<HostEvent>,
    cursors: HashMap<u32, usize>,
    awaitables: HashMap<u32, Result<Value, Fault>>,
    next_handle: u32,
    advances: usize,
    reads: usize,
}

impl ScriptHost {
    pub fn new(script: Script) -> Self {
        ScriptHost { script, ..Default::default() }
    }

    pub fn events(&self) -> &[HostEvent] {
        &self.events
    }

    /// Events rendered one per entry, for assertions and the CLI.
    pub fn transcript(&self) -> Vec<String> {
        self.events.iter().map(ToString::to_string).collect()
    }

    pub fn count(&self, matches: impl Fn(&HostEvent) -> bool) -> usize {
        self.events.iter().filter(|e| matches(e)).count()
    }

    fn handle(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    fn pending(&mut self, result: Result<Value, Fault>) -> Value {
        let id = self.handle();
        self.awaitables.insert(id, result);
        Value::Awaitable(id)
    }

    fn acquire(&mut self, func: &FunctionRef) -> Value {
        self.events.push(HostEvent::Acquire { member: func.qualified() });
        if self.script.null_enumerator {
            return Value::Null;
        }
        match &func.ret {
            MirType::Struct(ty) => Value::Struct { ty: ty.clone(), fields: vec![Value::Int(0)] },
            _ => {
                let id = self.handle();
                self.cursors.insert(id, 0);
                Value::Object(id)
            }
        }
    }

    fn cursor(&self, receiver: Option<&mut Value>) -> Result<usize, Fault> {
        match receiver.as_deref() {
            Some(Value::Object(id)) => self.cursors.get(id).copied().ok_or_else(not_an_enumerator),
            Some(Value::Struct { fields, .. }) => match fields.first() {
                Some(Value::Int(pos)) => Ok(*pos as usize),
                _ => Err(not_an_enumerator()),
            },
            _ => Err(not_an_enumerator()),
        }
    }

    fn advance(&mut self, receiver: Option<&mut Value>) -> Result<Value, Fault> {
        self.events.push(HostEvent::Advance);
        self.advances += 1;
        let Some(receiver) = receiver else {
            return Err(not_an_enumerator());
        };
        let position = match receiver {
            Value::Object(id) => {
                let cursor = self.cursors.get_mut(id).ok_or_else(not_an_enumerator)?;
                *cursor += 1;
                *cursor
            }
            Value::Struct { fields, .. } => match fields.first_mut() {
                Some(Value::Int(pos)) => {
                    *pos += 1;
                    *pos as usize
                }
                _ => return Err(not_an_enumerator()),
            },
            _ => return Err(not_an_enumerator()),
        };
        let result = if self.script.fault_on_advance == Some(self.advances) {
            Err(Fault::new("advance failed"))
        } else {
            Ok(Value::Bool(position <= self.script.elements.len()))
        };
        Ok(self.pending(result))
    }

    fn current(&mut self, receiver: Option<&mut Value>) -> Result<Value, Fault> {
        let position = self.cursor(receiver)?;
        self.reads += 1;
        if self.script.fault_on_current == Some(self.reads) {
            return Err(Fault::new("current failed"));
        }
        let value = position
            .checked_sub(1)
            .and_then(|i| self.script.elements.get(i))
            .copied()
            .ok_or_else(|| Fault::new("enumeration has not started or already finished"))?;
        self.events.push(HostEvent::Current { value });
        Ok(Value::Int(value))
    }

    fn dispose(&mut self, func: &FunctionRef) -> Result<Value, Fault> {
        self.events.push(HostEvent::Dispose { member: func.qualified() });
        let result = if self.script.fault_on_dispose {
            Err(Fault::new("dispose failed"))
        } else {
            Ok(Value::Unit)
        };
        match func.ret {
            MirType::Void => result,
            _ => Ok(self.pending(result)),
        }
    }
}

fn not_an_enumerator() -> Fault {
    Fault::new("receiver is not an enumerator")
}

impl Host for ScriptHost {
    fn call(
        &mut self,
        func: &FunctionRef,
        receiver: Option<&mut Value>,
        args: &[Value],
    ) -> Result<Value, Fault> {
        match func.role {
            CallRole::Constructor => {
                self.events.push(HostEvent::Construct { ty: func.owner.clone() });
                Ok(match &func.ret {
                    MirType::Struct(ty) => Value::Struct { ty: ty.clone(), fields: Vec::new() },
                    _ => Value::Object(self.handle()),
                })
            }
            CallRole::Acquire => Ok(self.acquire(func)),
            CallRole::Advance => self.advance(receiver),
            CallRole::Current => self.current(receiver),
            CallRole::Dispose => self.dispose(func),
            CallRole::Free => {
                self.events.push(HostEvent::Call {
                    name: func.name.clone(),
                    args: args.iter().map(ToString::to_string).collect(),
                });
                if self.script.faulting_calls.contains(&func.name) {
                    Err(Fault::new(format!("{} failed", func.name)))
                } else {
                    Ok(Value::Unit)
                }
            }
        }
    }

    fn await_value(&mut self, _point: SuspendPointId, awaitable: Value) -> Result<Value, Fault> {
        match awaitable {
            Value::Awaitable(id) => self
                .awaitables
                .remove(&id)
                .unwrap_or_else(|| Err(Fault::new("awaitable already consumed"))),
            other => Err(Fault::new(format!("`{}` is not awaitable", other))),
        }
    }

    fn is_instance(&mut self, _value: &Value, _contract: &str) -> bool {
        self.script.disposable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operand::CallDispatch;

    fn protocol(role: CallRole, name: &str, ret: MirType) -> FunctionRef {
        FunctionRef { owner: "E".into(), name: name.into(), dispatch: CallDispatch::Instance, role, ret }
    }

    #[test]
    fn struct_enumerators_advance_through_their_receiver() {
        let mut host = ScriptHost::new(Script { elements: vec![7], ..Script::default() });
        let acquire = protocol(CallRole::Acquire, "GetAsyncEnumerator", MirType::Struct("E".into()));
        let advance = protocol(CallRole::Advance, "MoveNextAsync", MirType::Awaitable("ValueTask<bool>".into()));
        let current = protocol(CallRole::Current, "Current", MirType::I32);

        let mut e = host.call(&acquire, None, &[]).unwrap();
        let task = host.call(&advance, Some(&mut e), &[]).unwrap();
        assert_eq!(host.await_value(SuspendPointId(0), task), Ok(Value::Bool(true)));
        assert_eq!(host.call(&current, Some(&mut e), &[]), Ok(Value::Int(7)));

        // A stale copy still sits before the first element.
        let mut stale = Value::Struct { ty: "E".into(), fields: vec![Value::Int(0)] };
        assert!(host.call(&current, Some(&mut stale), &[]).is_err());
    }

    #[test]
    fn scripted_faults() {
        let mut host = ScriptHost::new(Script {
            fault_on_advance: Some(1),
            faulting_calls: vec!["fail".into()],
            ..Script::default()
        });
        let acquire = protocol(CallRole::Acquire, "GetAsyncEnumerator", MirType::Ref("E".into()));
        let advance = protocol(CallRole::Advance, "MoveNextAsync", MirType::Awaitable("ValueTask<bool>".into()));
        let mut e = host.call(&acquire, None, &[]).unwrap();
        let task = host.call(&advance, Some(&mut e), &[]).unwrap();
        assert_eq!(host.await_value(SuspendPointId(0), task), Err(Fault::new("advance failed")));
        assert!(host.call(&FunctionRef::free("fail"), None, &[]).is_err());
        assert_eq!(host.transcript(), vec!["acquire E.GetAsyncEnumerator", "advance", "fail()"]);
    }

    #[test]
    fn current_faults_on_the_scripted_read() {
        let mut host = ScriptHost::new(Script { elements: vec![4, 5], fault_on_current: Some(2), ..Script::default() });
        let acquire = protocol(CallRole::Acquire, "GetAsyncEnumerator", MirType::Ref("E".into()));
        let advance = protocol(CallRole::Advance, "MoveNextAsync", MirType::Awaitable("ValueTask<bool>".into()));
        let current = protocol(CallRole::Current, "Current", MirType::I32);
        let mut e = host.call(&acquire, None, &[]).unwrap();

        let task = host.call(&advance, Some(&mut e), &[]).unwrap();
        host.await_value(SuspendPointId(0), task).unwrap();
        assert_eq!(host.call(&current, Some(&mut e), &[]), Ok(Value::Int(4)));
        let task = host.call(&advance, Some(&mut e), &[]).unwrap();
        host.await_value(SuspendPointId(0), task).unwrap();
        assert_eq!(host.call(&current, Some(&mut e), &[]), Err(Fault::new("current failed")));
    }
}
