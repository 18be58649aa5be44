//! Integration tests for the scriptcore interpreter
//!
//! Programs are built with the `ast::build` constructors and run end to
//! end, observing printed output, final variable state and diagnostics.

use insta::assert_snapshot;
use pretty_assertions::assert_eq;
use scriptcore::ast::build::*;
use scriptcore::ast::{Arg, BinOp, Raised, Spanned, Stmt};
use scriptcore::config::InterpreterConfig;
use scriptcore::db::MemoryDb;
use scriptcore::interp::CaptureOutput;
use scriptcore::types::{DataType, ErrorType};
use scriptcore::{ErrorKind, Interpreter, Program, RuntimeError, Value};

/// Run a program and collect its printed lines
fn run(stmts: Vec<Spanned<Stmt>>) -> Vec<String> {
    try_run(stmts).unwrap()
}

fn try_run(stmts: Vec<Spanned<Stmt>>) -> Result<Vec<String>, RuntimeError> {
    let out = CaptureOutput::new();
    let mut interp = Interpreter::new().with_output(Box::new(out.clone()));
    interp.run(&program(stmts))?;
    Ok(out.lines())
}

fn failure(stmts: Vec<Spanned<Stmt>>) -> RuntimeError {
    match try_run(stmts) {
        Ok(lines) => panic!("expected failure, printed {lines:?}"),
        Err(e) => e,
    }
}

// ============================================
// Functions and control flow
// ============================================

#[test]
fn test_recursive_factorial() {
    let fact = function(
        "fact",
        vec![("n", Some(ty(DataType::Long)))],
        Some(ty(DataType::Long)),
        vec![
            if_(
                binary(var("n"), BinOp::Le, long(1)),
                vec![ret(Some(long(1)))],
                None,
            ),
            ret(Some(binary(
                var("n"),
                BinOp::Mul,
                call("fact", vec![binary(var("n"), BinOp::Sub, long(1))]),
            ))),
        ],
    );
    let lines = run(vec![print(call("FACT", vec![long(20)])), fact]);
    assert_eq!(lines, vec!["2432902008176640000"]);
}

#[test]
fn test_loops_with_break_and_continue() {
    let lines = run(vec![
        let_("total", int(0)),
        for_(
            Some(let_("i", int(0))),
            Some(binary(var("i"), BinOp::Lt, int(10))),
            Some(set("i", binary(var("i"), BinOp::Add, int(1)))),
            vec![
                if_(
                    binary(binary(var("i"), BinOp::Mod, int(2)), BinOp::Eq, int(0)),
                    vec![continue_()],
                    None,
                ),
                if_(binary(var("i"), BinOp::Gt, int(7)), vec![break_()], None),
                set("total", binary(var("Total"), BinOp::Add, var("i"))),
            ],
        ),
        print(var("total")),
    ]);
    // 1 + 3 + 5 + 7
    assert_eq!(lines, vec!["16"]);
}

#[test]
fn test_return_from_nested_loops() {
    let find = function(
        "find",
        vec![("target", Some(ty(DataType::Int)))],
        Some(ty(DataType::Int)),
        vec![
            foreach(
                "row",
                array(vec![array(vec![int(1), int(2)]), array(vec![int(3), int(4)])]),
                vec![foreach(
                    "cell",
                    var("row"),
                    vec![if_(
                        binary(var("cell"), BinOp::Eq, var("target")),
                        vec![ret(Some(binary(var("cell"), BinOp::Mul, int(10))))],
                        None,
                    )],
                )],
            ),
            ret(Some(int(-1))),
        ],
    );
    let lines = run(vec![
        find,
        print(call("find", vec![int(3)])),
        print(call("find", vec![int(9)])),
    ]);
    assert_eq!(lines, vec!["30", "-1"]);
}

#[test]
fn test_loop_guard_from_config() {
    let config = InterpreterConfig {
        max_loop_iterations: 100,
        ..InterpreterConfig::default()
    };
    let mut interp = Interpreter::new()
        .with_config(config)
        .with_output(Box::new(CaptureOutput::new()));
    let err = interp
        .run(&program(vec![while_(boolean(true), vec![])]))
        .unwrap_err();
    assert_eq!(err.message, "Infinite loop detected!");
}

#[test]
fn test_non_boolean_condition() {
    let err = failure(vec![if_(int(1), vec![], None)]);
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    assert_eq!(err.message, "\"If\" condition expression must be boolean, but is = 1");
}

// ============================================
// Values, records and arrays
// ============================================

#[test]
fn test_string_concatenation_and_builtins() {
    let lines = run(vec![
        let_("name", string("  World ")),
        print(binary(
            string("Hello, "),
            BinOp::Add,
            call("str.trim", vec![var("name")]),
        )),
        print(call("STR.TOUPPER", vec![string("abc")])),
        print(binary(string("n="), BinOp::Add, int(3))),
    ]);
    assert_eq!(lines, vec!["Hello, World", "ABC", "n=3"]);
}

#[test]
fn test_typed_record_variable() {
    let person = record_ty(vec![("name", ty(DataType::String)), ("age", ty(DataType::Int))]);
    let lines = run(vec![
        var_decl(
            "p",
            Some(person),
            Some(map(vec![("name", string("Ann")), ("age", string("41"))])),
        ),
        set("p.age", binary(var("p.age"), BinOp::Add, int(1))),
        print(var("p.name")),
        print(var("p.age")),
        print(type_of(var("p"))),
    ]);
    assert_eq!(lines, vec!["Ann", "42", "record {name:string, age:int}"]);
}

#[test]
fn test_record_structure_mismatch() {
    let person = record_ty(vec![("name", ty(DataType::String))]);
    let err = failure(vec![var_decl(
        "p",
        Some(person),
        Some(map(vec![("name", string("Ann")), ("extra", int(1))])),
    )]);
    assert_eq!(err.kind, ErrorKind::StructuralMismatch);
    assert!(err.message.starts_with("Record type mismatch for variable 'p'"));
}

#[test]
fn test_fixed_array_capacity() {
    let err = failure(vec![
        let_("a", array_init(ty(DataType::Int), vec![Some(int(2))])),
        set("a", array(vec![int(1), int(2), int(3)])),
    ]);
    assert_eq!(err.kind, ErrorKind::CapacityOverflow);
    assert_eq!(err.message, "Array literal length (3) exceeds fixed array length (2).");
}

#[test]
fn test_arrays_alias_storage() {
    let lines = run(vec![
        let_("a", array(vec![int(1), int(2)])),
        let_("b", var("a")),
        assign(index(var("b"), vec![int(0)]), int(9)),
        print(var("a")),
        print(length(var("a"))),
    ]);
    assert_eq!(lines, vec!["[9, 2]", "2"]);
}

#[test]
fn test_queue_is_fifo() {
    let lines = run(vec![
        let_("q", queue(ty(DataType::String))),
        expr_stmt(call("queue.enqueue", vec![var("q"), string("a")])),
        expr_stmt(call("queue.enqueue", vec![var("q"), string("b")])),
        print(call("queue.dequeue", vec![var("q")])),
        print(call("queue.size", vec![var("q")])),
        print(type_of(var("q"))),
    ]);
    assert_eq!(lines, vec!["a", "1", "queue.string"]);
}

#[test]
fn test_const_cannot_be_reassigned() {
    let err = failure(vec![const_decl("limit", int(3)), set("LIMIT", int(4))]);
    assert_eq!(err.message, "Cannot reassign constant variable 'limit'.");
}

#[test]
fn test_const_array_rejects_literal_assignment() {
    let out = CaptureOutput::new();
    let mut interp = Interpreter::new().with_output(Box::new(out.clone()));
    let err = interp
        .run(&program(vec![
            const_decl("k", array(vec![int(1), int(2)])),
            set("k", array(vec![int(9), int(9), int(9)])),
        ]))
        .unwrap_err();
    assert_eq!(err.message, "Cannot reassign constant variable 'k'.");
    assert_eq!(interp.get_var("k").map(|v| v.to_string()), Some("[1, 2]".to_string()));
}

#[test]
fn test_unassigned_record_cast_leaves_next_variable_plain() {
    let lines = run(vec![
        print(cast(ty(DataType::Record), map(vec![("a", int(1))]))),
        let_("y", int(5)),
        print(type_of(var("y"))),
        set("y", int(6)),
        print(var("y")),
    ]);
    assert_eq!(lines, vec!["{\"a\": 1}", "int", "6"]);
}

#[test]
fn test_record_array_literal_checks_structure() {
    let row = record_ty(vec![("a", ty(DataType::Int))]);
    let err = failure(vec![
        let_("rows", array_init(row, vec![Some(int(2))])),
        set("rows", array(vec![map(vec![("zzz", string("x"))])])),
    ]);
    assert_eq!(err.kind, ErrorKind::StructuralMismatch);
    assert!(
        err.message
            .starts_with("Array element 0 does not match record structure for 'rows'")
    );
}

// ============================================
// Exceptions and diagnostics
// ============================================

#[test]
fn test_error_caught_across_function_call() {
    let withdraw = function(
        "withdraw",
        vec![("amount", Some(ty(DataType::Int)))],
        None,
        vec![if_(
            binary(var("amount"), BinOp::Gt, int(100)),
            vec![raise(Raised::Custom("Overdrawn".into()), vec![var("amount")])],
            None,
        )],
    );
    let lines = run(vec![
        withdraw,
        try_(
            vec![
                expr_stmt(call("withdraw", vec![int(500)])),
                print(string("unreachable")),
            ],
            vec![when(Raised::Custom("overdrawn".into()), Some("msg"), vec![print(var("msg"))])],
        ),
        print(string("done")),
    ]);
    assert_eq!(lines, vec!["Overdrawn: 500", "done"]);
}

#[test]
fn test_standard_handler_catches_runtime_error() {
    let lines = run(vec![try_(
        vec![print(index(array(vec![int(1)]), vec![int(5)]))],
        vec![
            when(Raised::Standard(ErrorType::MathError), None, vec![print(string("math"))]),
            when(Raised::Standard(ErrorType::IndexError), None, vec![print(string("index"))]),
        ],
    )]);
    assert_eq!(lines, vec!["index"]);
}

#[test]
fn test_uncaught_error_stack_trace() {
    let boom = at(
        2,
        function(
            "boom",
            vec![],
            None,
            vec![at(3, raise(Raised::Standard(ErrorType::IoError), vec![string("disk full")]))],
        ),
    );
    let err = failure(vec![boom, at(5, print(at(5, call("boom", vec![]))))]);
    assert_eq!(err.line, Some(3));
    assert_eq!(err.to_string(), "Runtime error on line 3: disk full");
    let frames: Vec<String> = err.stack.iter().map(ToString::to_string).collect();
    assert_snapshot!(frames.join("\n"), @r"
    line 3 STATEMENT : Raise IO_ERROR
    line 5 BLOCK : Block boom
    line 5 STATEMENT : Print
    line 1 SCRIPT : <script>
    ");
}

// ============================================
// Database
// ============================================

#[test]
fn test_cursor_loop_over_memory_tables() {
    let json = serde_json::json!({
        "orders": [
            {"id": 1, "customer": "ann", "total": 10},
            {"id": 2, "customer": "bob", "total": 25},
            {"id": 3, "customer": "ann", "total": 5}
        ]
    });
    let out = CaptureOutput::new();
    let mut interp = Interpreter::new()
        .with_output(Box::new(out.clone()))
        .with_db_adapter(Box::new(MemoryDb::from_json(&json).unwrap()));
    interp
        .run(&program(vec![
            connect("shop", string("memory")),
            let_("sum", int(0)),
            use_(
                "shop",
                vec![
                    cursor("byCustomer", "select * from orders where customer = ?"),
                    open("byCustomer", vec![Arg::positional(string("ann"))]),
                    while_(
                        has_next(var("byCustomer")),
                        vec![
                            let_("row", next(var("byCustomer"))),
                            set("sum", binary(var("sum"), BinOp::Add, var("row.total"))),
                        ],
                    ),
                    close_cursor("byCustomer"),
                ],
            ),
            close_connection("shop"),
            print(var("sum")),
        ]))
        .unwrap();
    assert_eq!(out.lines(), vec!["15"]);
}

// ============================================
// Serialized programs
// ============================================

#[test]
fn test_program_json_round_trip_runs() {
    let original = program(vec![let_("x", int(2)), print(binary(var("x"), BinOp::Mul, int(21)))]);
    let json = serde_json::to_string_pretty(&original).unwrap();
    let parsed = Program::from_json(&json).unwrap();
    assert_eq!(parsed, original);

    let out = CaptureOutput::new();
    let mut interp = Interpreter::new().with_output(Box::new(out.clone()));
    interp.run(&parsed).unwrap();
    assert_eq!(out.lines(), vec!["42"]);
}

#[test]
fn test_top_level_return_value() {
    let mut interp = Interpreter::new().with_output(Box::new(CaptureOutput::new()));
    let value = interp
        .run(&program(vec![let_("x", int(7)), ret(Some(var("x")))]))
        .unwrap();
    assert_eq!(value, Value::Int(7));
}
