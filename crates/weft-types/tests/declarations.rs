// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Loading declarations into a table and querying the relations the
//! resolver depends on.

use weft_types::awaitable::awaits_to_bool;
use weft_types::contracts::{implements, instantiations};
use weft_types::conversions::{classify, classify_implicit};
use weft_types::{
    parse_in, Conversion, MemberDecl, ParamDecl, Type, TypeContext, TypeDecl, TypeError, TypeTable,
    WellKnown,
};

fn load(types: &[TypeDecl]) -> TypeTable {
    let mut table = TypeTable::with_prelude();
    table.load(types, &[]).unwrap();
    table
}

#[test]
fn declarations_may_refer_forward() {
    let table = load(&[
        TypeDecl::sealed("Node").property("Next", "Box<Node>"),
        TypeDecl::sealed("Box").generic("T").property("Value", "T"),
    ]);
    let ty = parse_in(&table, "Box<Node>").unwrap();
    assert_eq!(table.type_name(&ty), "Box<Node>");
    // `?` on a reference type is an annotation only.
    assert_eq!(table.type_name(&parse_in(&table, "Node?").unwrap()), "Node");
}

#[test]
fn bad_type_strings_are_reported() {
    let table = load(&[]);
    assert_eq!(parse_in(&table, "Nope"), Err(TypeError::Undefined("Nope".into())));
    assert!(matches!(
        parse_in(&table, "IAsyncEnumerable<int, int>"),
        Err(TypeError::ArityMismatch { expected: 1, found: 2, .. })
    ));

    let mut table = TypeTable::with_prelude();
    let err = table.load(&[TypeDecl::sealed("Bag").method("GetAsyncEnumerator", "Missing")], &[]);
    assert_eq!(err, Err(TypeError::Undefined("Missing".into())));
}

#[test]
fn contracts_are_inherited_through_bases() {
    let table = load(&[
        TypeDecl::class("Base").implements("IAsyncEnumerable<int>"),
        TypeDecl::sealed("Derived").extends("Base"),
        TypeDecl::sealed("Both")
            .implements("IAsyncEnumerable<int>")
            .implements("IAsyncEnumerable<string>"),
    ]);
    let cx = TypeContext::new(&table, &[]);
    let contract = table.well_known(WellKnown::AsyncEnumerable).unwrap();

    let derived = parse_in(&table, "Derived").unwrap();
    let found = instantiations(cx, &derived, contract);
    assert_eq!(found.len(), 1);
    assert_eq!(table.type_name(&found[0]), "IAsyncEnumerable<int>");
    assert!(implements(cx, &derived, contract));

    let both = parse_in(&table, "Both").unwrap();
    assert_eq!(instantiations(cx, &both, contract).len(), 2);
}

#[test]
fn user_defined_conversions_follow_standard_ones() {
    let table = load(&[
        TypeDecl::value("Meters").member(MemberDecl::conversion(true, "int", "Meters")),
        TypeDecl::value("Feet").member(MemberDecl::conversion(false, "Meters", "Feet")),
    ]);
    let cx = TypeContext::new(&table, &[]);
    let meters = parse_in(&table, "Meters").unwrap();
    let feet = parse_in(&table, "Feet").unwrap();

    assert_eq!(classify(cx, &Type::I32, &Type::I64), Conversion::ImplicitNumeric);
    assert!(matches!(classify(cx, &Type::I32, &meters), Conversion::UserDefined { implicit: true, .. }));
    assert!(matches!(classify(cx, &meters, &feet), Conversion::UserDefined { implicit: false, .. }));
    assert_eq!(classify_implicit(cx, &meters, &feet), Conversion::None);
    assert_eq!(classify(cx, &Type::String, &meters), Conversion::None);
}

#[test]
fn custom_awaitables_follow_the_awaiter_pattern() {
    let table = load(&[
        TypeDecl::sealed("Later").method("GetAwaiter", "LaterAwaiter"),
        TypeDecl::value("LaterAwaiter")
            .property("IsCompleted", "bool")
            .method("GetResult", "bool")
            .member(MemberDecl::method("OnCompleted", "void").param(ParamDecl::new("next", "object"))),
        TypeDecl::sealed("Never").method("GetAwaiter", "Incomplete"),
        TypeDecl::value("Incomplete").property("IsCompleted", "bool").method("GetResult", "bool"),
    ]);
    let cx = TypeContext::new(&table, &[]);
    assert!(awaits_to_bool(cx, &parse_in(&table, "Later").unwrap()));
    assert!(awaits_to_bool(cx, &parse_in(&table, "ValueTask<bool>").unwrap()));
    assert!(!awaits_to_bool(cx, &parse_in(&table, "Task<int>").unwrap()));
    // No OnCompleted, so not awaitable at all.
    assert!(!awaits_to_bool(cx, &parse_in(&table, "Never").unwrap()));
}
