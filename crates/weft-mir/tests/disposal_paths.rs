// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! End-to-end replays: resolve, lower, build the state machine and run it
//! against a scripted host. Every test counts what the host observed.

use weft_ast::{BinOp, Expr, ExprKind, FnDecl, ForEach, LoopBinding, Param, Span, Stmt, StmtKind};
use weft_mir::replay::{self, Completion, HostEvent, Outcome, ReplayError, Script, ScriptHost, Value};
use weft_mir::transform::{FrameLayout, FrameSlot, StateMachine, STATE_SLOT};
use weft_mir::{lower_function, transform, CaptureRole, LowerOptions, MirType, SuspendKind};
use weft_resolve::{NullSourcePolicy, ResolveOptions, SemanticModel, UseSite};
use weft_types::{TypeDecl, TypeTable};

// ── Harness ────────────────────────────────────────────────────────────

fn table(types: &[TypeDecl]) -> TypeTable {
    let mut table = TypeTable::with_prelude();
    table.load(types, &[]).unwrap();
    table
}

fn stmt(kind: StmtKind) -> Stmt {
    Stmt::new(kind, Span::default())
}

fn int(v: i64) -> Expr {
    Expr::new(ExprKind::Int(v), Span::default())
}

fn log(arg: Expr) -> Stmt {
    stmt(StmtKind::Expr(Expr::call("log", vec![arg])))
}

fn call(name: &str) -> Stmt {
    stmt(StmtKind::Expr(Expr::call(name, Vec::new())))
}

fn when_equal(name: &str, value: i64, then: Stmt) -> Stmt {
    let cond = Expr::new(
        ExprKind::Binary { op: BinOp::Eq, left: Box::new(Expr::ident(name)), right: Box::new(int(value)) },
        Span::default(),
    );
    stmt(StmtKind::If { cond, then_branch: vec![then], else_branch: None })
}

fn each(var: &str, source: &str, body: Vec<Stmt>) -> Stmt {
    labeled(None, var, source, body)
}

fn labeled(label: Option<&str>, var: &str, source: &str, body: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::ForEach(ForEach {
        is_async: true,
        label: label.map(str::to_string),
        binding: LoopBinding::var(var),
        source: Expr::ident(source),
        body,
        keyword_span: Span::default(),
    }))
}

fn function(params: &[(&str, &str)], ret_ty: Option<&str>, body: Vec<Stmt>) -> FnDecl {
    let mut func = FnDecl {
        name: "consume".into(),
        is_async: true,
        params: params.iter().map(|(name, ty)| Param { name: (*name).into(), ty: (*ty).into() }).collect(),
        ret_ty: ret_ty.map(str::to_string),
        body,
        span: Span::default(),
    };
    func.assign_ids();
    func
}

/// One source of `int` elements through the contract.
fn over_xs(body: Vec<Stmt>) -> FnDecl {
    function(&[("xs", "IAsyncEnumerable<int>")], None, vec![each("x", "xs", body)])
}

struct Replay {
    outcome: Outcome,
    host: ScriptHost,
    machine: StateMachine,
}

impl Replay {
    fn count(&self, matches: impl Fn(&HostEvent) -> bool) -> usize {
        self.host.count(matches)
    }

    fn disposals(&self) -> usize {
        self.count(|e| matches!(e, HostEvent::Dispose { .. }))
    }

    fn logged(&self) -> Vec<String> {
        self.host
            .events()
            .iter()
            .filter_map(|e| match e {
                HostEvent::Call { name, args } if name == "log" => Some(args.join(",")),
                _ => None,
            })
            .collect()
    }

    fn suspensions(&self, kind: SuspendKind) -> usize {
        self.machine
            .loops
            .iter()
            .flat_map(|plan| plan.suspend_points_of(kind).collect::<Vec<_>>())
            .map(|point| self.outcome.suspensions_at(point))
            .sum()
    }
}

fn replay_with(
    table: &TypeTable,
    func: &FnDecl,
    resolve: &ResolveOptions,
    lower: &LowerOptions,
    script: Script,
    args: Vec<Value>,
) -> Result<Replay, ReplayError> {
    let site = UseSite::default().with_all_extensions(table);
    let model = SemanticModel::build(table, &site, resolve, func);
    assert!(!model.has_errors(), "{:?}", model.errors().collect::<Vec<_>>());
    let lowered = lower_function(table, &model, func).unwrap();
    let machine = transform(&lowered, lower);
    let mut host = ScriptHost::new(script);
    let outcome = replay::run(&machine, &mut host, args, lower.max_replay_steps)?;
    Ok(Replay { outcome, host, machine })
}

fn replay(table: &TypeTable, func: &FnDecl, script: Script, args: Vec<Value>) -> Replay {
    replay_with(table, func, &ResolveOptions::default(), &LowerOptions::default(), script, args).unwrap()
}

fn elements(items: &[i64]) -> Script {
    Script { elements: items.to_vec(), ..Script::default() }
}

fn source() -> Value {
    Value::Object(0)
}

const RETURNED: Completion = Completion::Returned(None);

// ── Normal completion ──────────────────────────────────────────────────

#[test]
fn completes_and_disposes_once() {
    let table = table(&[]);
    let run = replay(&table, &over_xs(vec![log(Expr::ident("x"))]), elements(&[1, 2, 3]), vec![source()]);

    assert_eq!(run.outcome.completion, RETURNED);
    assert_eq!(run.logged(), vec!["1", "2", "3"]);
    assert_eq!(run.count(|e| matches!(e, HostEvent::Acquire { .. })), 1);
    assert_eq!(run.count(|e| matches!(e, HostEvent::Advance)), 4);
    assert_eq!(run.disposals(), 1);
    assert!(matches!(run.host.events().last(), Some(HostEvent::Dispose { .. })));

    assert_eq!(run.suspensions(SuspendKind::Advance), 4);
    assert_eq!(run.suspensions(SuspendKind::Dispose), 1);
}

#[test]
fn empty_source_still_disposes() {
    let table = table(&[]);
    let run = replay(&table, &over_xs(vec![log(Expr::ident("x"))]), elements(&[]), vec![source()]);
    assert_eq!(run.outcome.completion, RETURNED);
    assert!(run.logged().is_empty());
    assert_eq!(run.count(|e| matches!(e, HostEvent::Advance)), 1);
    assert_eq!(run.disposals(), 1);
}

#[test]
fn liveness_alone_keeps_the_frame_complete() {
    let table = table(&[]);
    let lower = LowerOptions { hoist_all_captures: false, ..LowerOptions::default() };
    let run = replay_with(
        &table,
        &over_xs(vec![log(Expr::ident("x"))]),
        &ResolveOptions::default(),
        &lower,
        elements(&[5, 6]),
        vec![source()],
    )
    .unwrap();
    assert_eq!(run.outcome.completion, RETURNED);
    assert_eq!(run.logged(), vec!["5", "6"]);
    assert_eq!(run.disposals(), 1);

    // The enumerator lives across every suspension; the loop variable does not.
    let plan = &run.machine.loops[0];
    let enumerator = plan.capture(CaptureRole::Enumerator).unwrap().local;
    let variable = plan.capture(CaptureRole::LoopVariable).unwrap().local;
    assert!(run.machine.frame.slot_of(enumerator).is_some());
    assert!(run.machine.frame.slot_of(variable).is_none());
}

// ── Early exits ────────────────────────────────────────────────────────

#[test]
fn break_disposes_once() {
    let table = table(&[]);
    let body = vec![log(Expr::ident("x")), when_equal("x", 2, stmt(StmtKind::Break(None)))];
    let run = replay(&table, &over_xs(body), elements(&[1, 2, 3]), vec![source()]);

    assert_eq!(run.outcome.completion, RETURNED);
    assert_eq!(run.logged(), vec!["1", "2"]);
    assert_eq!(run.count(|e| matches!(e, HostEvent::Advance)), 2);
    assert_eq!(run.disposals(), 1);
}

#[test]
fn return_from_nested_loops_disposes_both_and_keeps_the_value() {
    let table = table(&[]);
    let inner = each("y", "ys", vec![log(Expr::ident("y")), stmt(StmtKind::Return(Some(Expr::ident("x"))))]);
    let func = function(
        &[("xs", "IAsyncEnumerable<int>"), ("ys", "IAsyncEnumerable<int>")],
        Some("int"),
        vec![each("x", "xs", vec![inner]), stmt(StmtKind::Return(Some(int(-1))))],
    );
    let run = replay(&table, &func, elements(&[7, 8]), vec![source(), source()]);

    assert_eq!(run.outcome.completion, Completion::Returned(Some(Value::Int(7))));
    assert_eq!(run.logged(), vec!["7"]);
    assert_eq!(run.count(|e| matches!(e, HostEvent::Acquire { .. })), 2);
    assert_eq!(run.disposals(), 2);
    assert_eq!(run.suspensions(SuspendKind::Dispose), 2);
}

#[test]
fn goto_out_of_the_body_disposes_before_the_label() {
    let table = table(&[]);
    let func = function(
        &[("xs", "IAsyncEnumerable<int>")],
        None,
        vec![
            each("x", "xs", vec![log(Expr::ident("x")), stmt(StmtKind::Goto("done".into()))]),
            log(int(0)),
            stmt(StmtKind::Label("done".into())),
            log(int(99)),
        ],
    );
    let run = replay(&table, &func, elements(&[1, 2]), vec![source()]);

    assert_eq!(run.outcome.completion, RETURNED);
    assert_eq!(run.logged(), vec!["1", "99"]);
    assert_eq!(run.disposals(), 1);
    let events = run.host.transcript();
    let dispose = events.iter().position(|e| e.starts_with("dispose")).unwrap();
    assert_eq!(events[dispose + 1], "log(99)");
}

#[test]
fn continue_outer_disposes_each_inner_enumerator() {
    let table = table(&[]);
    let inner = each("y", "ys", vec![log(Expr::ident("y")), stmt(StmtKind::Continue(Some("outer".into())))]);
    let func = function(
        &[("xs", "IAsyncEnumerable<int>"), ("ys", "IAsyncEnumerable<int>")],
        None,
        vec![labeled(Some("outer"), "x", "xs", vec![inner, log(int(0))])],
    );
    let run = replay(&table, &func, elements(&[1, 2]), vec![source(), source()]);

    assert_eq!(run.outcome.completion, RETURNED);
    // Each outer step runs one inner step, then skips the rest of its body.
    assert_eq!(run.logged(), vec!["1", "1"]);
    assert_eq!(run.count(|e| matches!(e, HostEvent::Acquire { .. })), 3);
    assert_eq!(run.disposals(), 3);
}

// ── Faults ─────────────────────────────────────────────────────────────

#[test]
fn body_fault_disposes_then_rethrows() {
    let table = table(&[]);
    let script = Script { faulting_calls: vec!["fail".into()], ..elements(&[1, 2]) };
    let run = replay(&table, &over_xs(vec![log(Expr::ident("x")), call("fail")]), script, vec![source()]);

    assert_eq!(run.outcome.completion, Completion::Threw("fail failed".into()));
    assert_eq!(run.logged(), vec!["1"]);
    assert_eq!(run.disposals(), 1);
    assert!(matches!(run.host.events().last(), Some(HostEvent::Dispose { .. })));
}

#[test]
fn advance_fault_disposes_then_rethrows() {
    let table = table(&[]);
    let script = Script { fault_on_advance: Some(2), ..elements(&[1, 2, 3]) };
    let run = replay(&table, &over_xs(vec![log(Expr::ident("x"))]), script, vec![source()]);

    assert_eq!(run.outcome.completion, Completion::Threw("advance failed".into()));
    assert_eq!(run.logged(), vec!["1"]);
    assert_eq!(run.disposals(), 1);
}

#[test]
fn current_fault_disposes_then_rethrows() {
    let table = table(&[]);
    let script = Script { fault_on_current: Some(2), ..elements(&[1, 2, 3]) };
    let run = replay(&table, &over_xs(vec![log(Expr::ident("x"))]), script, vec![source()]);

    assert_eq!(run.outcome.completion, Completion::Threw("current failed".into()));
    assert_eq!(run.logged(), vec!["1"]);
    assert_eq!(run.disposals(), 1);
    assert!(matches!(run.host.events().last(), Some(HostEvent::Dispose { .. })));
}

#[test]
fn dispose_fault_escapes_the_construct() {
    let table = table(&[]);
    let script = Script { fault_on_dispose: true, ..elements(&[1]) };
    let func = function(
        &[("xs", "IAsyncEnumerable<int>")],
        None,
        vec![each("x", "xs", Vec::new()), log(int(99))],
    );
    let run = replay(&table, &func, script, vec![source()]);

    assert_eq!(run.outcome.completion, Completion::Threw("dispose failed".into()));
    assert_eq!(run.disposals(), 1);
    assert!(run.logged().is_empty());
}

// ── Sources ────────────────────────────────────────────────────────────

fn nullable_struct_source() -> TypeTable {
    table(&[TypeDecl::value("Seq").implements("IAsyncEnumerable<int>")])
}

#[test]
fn null_source_is_skipped_without_acquiring() {
    let table = nullable_struct_source();
    let func = function(&[("xs", "Seq?")], None, vec![each("x", "xs", vec![log(Expr::ident("x"))]), log(int(99))]);
    let run = replay(&table, &func, elements(&[1]), vec![Value::Null]);

    assert_eq!(run.outcome.completion, RETURNED);
    assert_eq!(run.logged(), vec!["99"]);
    assert_eq!(run.count(|e| matches!(e, HostEvent::Acquire { .. })), 0);
    assert_eq!(run.disposals(), 0);
    assert!(run.outcome.suspensions.is_empty());
}

#[test]
fn null_source_faults_under_the_fault_policy() {
    let table = nullable_struct_source();
    let func = function(&[("xs", "Seq?")], None, vec![each("x", "xs", Vec::new())]);
    let resolve = ResolveOptions { null_source: NullSourcePolicy::Fault, ..ResolveOptions::default() };
    let run = replay_with(&table, &func, &resolve, &LowerOptions::default(), elements(&[1]), vec![Value::Null])
        .unwrap();

    assert_eq!(
        run.outcome.completion,
        Completion::Threw(weft_mir::lower::NULLABLE_NO_VALUE.into())
    );
    assert!(run.host.events().is_empty());
}

#[test]
fn present_nullable_source_iterates() {
    let table = nullable_struct_source();
    let func = function(&[("xs", "Seq?")], None, vec![each("x", "xs", vec![log(Expr::ident("x"))])]);
    let present = Value::Struct { ty: "Seq".into(), fields: Vec::new() };
    let run = replay(&table, &func, elements(&[4]), vec![present]);

    assert_eq!(run.outcome.completion, RETURNED);
    assert_eq!(run.logged(), vec!["4"]);
    assert_eq!(run.disposals(), 1);
}

// ── Enumerator kinds ───────────────────────────────────────────────────

#[test]
fn contract_disposal_wins_over_a_structural_member() {
    let table = table(&[
        TypeDecl::sealed("Seq").method("GetAsyncEnumerator", "E"),
        TypeDecl::sealed("E")
            .method("MoveNextAsync", "ValueTask<bool>")
            .property("Current", "int")
            .implements("IAsyncDisposable")
            .method("DisposeAsync", "ValueTask"),
    ]);
    let func = function(&[("xs", "Seq")], None, vec![each("x", "xs", vec![log(Expr::ident("x"))])]);
    let run = replay(&table, &func, elements(&[1, 2]), vec![source()]);

    assert_eq!(run.outcome.completion, RETURNED);
    let disposed: Vec<&HostEvent> =
        run.host.events().iter().filter(|e| matches!(e, HostEvent::Dispose { .. })).collect();
    assert_eq!(disposed, vec![&HostEvent::Dispose { member: "IAsyncDisposable.DisposeAsync".into() }]);
}

#[test]
fn struct_enumerator_mutations_survive_suspension() {
    let table = table(&[
        TypeDecl::sealed("Valued").method("GetAsyncEnumerator", "E4"),
        TypeDecl::value("E4").method("MoveNextAsync", "ValueTask<bool>").property("Current", "int"),
    ]);
    let func = function(&[("xs", "Valued")], None, vec![each("x", "xs", vec![log(Expr::ident("x"))])]);
    let run = replay(&table, &func, elements(&[1, 2, 3]), vec![source()]);

    assert_eq!(run.outcome.completion, RETURNED);
    assert_eq!(run.logged(), vec!["1", "2", "3"]);
    assert_eq!(run.disposals(), 0);

    let enumerator = run.machine.loops[0].capture(CaptureRole::Enumerator).unwrap();
    assert_eq!(enumerator.ty, MirType::Struct("E4".into()));
    assert!(run.machine.frame.slot_of(enumerator.local).is_some());
}

#[test]
fn unsealed_enumerator_disposes_only_when_the_runtime_type_allows() {
    let table = table(&[
        TypeDecl::sealed("Open").method("GetAsyncEnumerator", "E3"),
        TypeDecl::class("E3").method("MoveNextAsync", "Task<bool>").property("Current", "int"),
    ]);
    let func = function(&[("xs", "Open")], None, vec![each("x", "xs", Vec::new())]);

    let run = replay(&table, &func, elements(&[1]), vec![source()]);
    assert_eq!(run.disposals(), 1);

    let run = replay(&table, &func, Script { disposable: false, ..elements(&[1]) }, vec![source()]);
    assert_eq!(run.outcome.completion, RETURNED);
    assert_eq!(run.disposals(), 0);
    assert_eq!(run.suspensions(SuspendKind::Dispose), 0);
}

#[test]
fn null_enumerator_faults_on_advance_and_skips_disposal() {
    let table = table(&[]);
    let script = Script { null_enumerator: true, ..elements(&[1]) };
    let run = replay(&table, &over_xs(Vec::new()), script, vec![source()]);

    assert_eq!(run.outcome.completion, Completion::Threw(replay::NULL_REFERENCE.into()));
    assert_eq!(run.disposals(), 0);
}

// ── Frame ──────────────────────────────────────────────────────────────

#[test]
fn without_a_frame_locals_are_lost_at_the_first_suspension() {
    let table = table(&[]);
    let func = over_xs(vec![log(Expr::ident("x"))]);
    let site = UseSite::default();
    let model = SemanticModel::build(&table, &site, &ResolveOptions::default(), &func);
    let lowered = lower_function(&table, &model, &func).unwrap();

    // Run the lowered body directly: it re-enters at the top after suspending.
    let machine = StateMachine {
        frame: FrameLayout {
            slots: vec![FrameSlot {
                slot: STATE_SLOT,
                local: None,
                name: "<state>".into(),
                ty: MirType::I32,
                role: None,
            }],
        },
        resume_points: Vec::new(),
        start_block: lowered.function.entry_block,
        loops: lowered.loops.clone(),
        function: lowered.function,
    };
    let mut host = ScriptHost::new(elements(&[1]));
    let err = replay::run(&machine, &mut host, vec![source()], 1_000).unwrap_err();
    assert_eq!(err, ReplayError::LostLocal { local: 0 });
}

#[test]
fn runaway_replays_hit_the_step_limit() {
    let table = table(&[]);
    let lower = LowerOptions { max_replay_steps: 20, ..LowerOptions::default() };
    let err = replay_with(
        &table,
        &over_xs(vec![log(Expr::ident("x"))]),
        &ResolveOptions::default(),
        &lower,
        elements(&[1, 2, 3, 4, 5, 6, 7, 8]),
        vec![source()],
    )
    .err()
    .unwrap();
    assert_eq!(err, ReplayError::StepLimit { limit: 20 });
}
