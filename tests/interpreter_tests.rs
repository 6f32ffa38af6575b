use las::run_to_string;

fn run(source: &str) -> String {
    run_to_string("test.las", source).expect("program should run without error")
}

#[test]
fn hello_world_prints_without_trailing_newline() {
    assert_eq!(run(r#"print("hello");"#), "hello");
}

#[test]
fn arithmetic_respects_precedence() {
    assert_eq!(run("println(1 + 2 * 3);"), "7\n");
}

#[test]
fn integer_and_string_cross_operations() {
    assert_eq!(run(r#"println("n=" + 42);"#), "n=42\n");
    assert_eq!(run(r#"println(3 * "ab");"#), "ababab\n");
}

#[test]
fn array_elements_alias_across_bindings() {
    let source = r#"
        let a = [1, 2, 3];
        let b = a;
        b[0] = 99;
        println(a[0]);
    "#;
    assert_eq!(run(source), "99\n");
}

#[test]
fn range_iteration_sums_inclusive_range() {
    let source = r#"
        let s = 0;
        for i in 1..=5 { s = s + i; }
        println(s);
    "#;
    assert_eq!(run(source), "15\n");
}

#[test]
fn recursive_function_with_return() {
    let source = r#"
        function fib(n: I32) ~> I32 {
            if n < 2 { return n; }
            return fib(n - 1) + fib(n - 2);
        }
        println(fib(10));
    "#;
    assert_eq!(run(source), "55\n");
}

#[test]
fn assert_failure_reports_the_asserted_source_text() {
    let err = las::run_to_string("test.las", "assert(1 == 2);").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("assertion failed"), "{message}");
    assert!(message.contains("1 == 2"), "{message}");
}

#[test]
fn split_and_join_round_trip() {
    assert_eq!(run(r#"println(join(split("a,b,c", ','), ","));"#), "a,b,c\n");
}

#[test]
fn split_can_discard_empty_segments() {
    let source = r#"
        let parts = split("a,,b", ',', true);
        println(parts.size);
    "#;
    assert_eq!(run(source), "2\n");
}

#[test]
fn let_binding_an_lvalue_scalar_does_not_alias() {
    let source = r#"
        let a = [10];
        let b = a[0];
        b = 99;
        println(a[0]);
    "#;
    assert_eq!(run(source), "10\n");
}

#[test]
fn scope_depth_is_restored_after_early_break() {
    let source = r#"
        let total = 0;
        for i in 0..10 {
            if i == 3 { break; }
            total = total + i;
        }
        println(total);
    "#;
    assert_eq!(run(source), "3\n");
}

#[test]
fn continue_restarts_the_loop_condition() {
    let source = r#"
        let sum = 0;
        let i = 0;
        while i < 5 {
            i = i + 1;
            if i mod 2 == 0 { continue; }
            sum = sum + i;
        }
        println(sum);
    "#;
    assert_eq!(run(source), "9\n");
}

#[test]
fn exclusive_and_descending_range_bounds() {
    assert_eq!(
        run(r#"
            let s = 0;
            for i in 1..5 { s = s + 1; }
            println(s);
        "#),
        "4\n"
    );
    assert_eq!(
        run(r#"
            let s = 0;
            for i in 5..1 { s = s + 1; }
            println(s);
        "#),
        "4\n"
    );
}

#[test]
fn typeof_round_trips_through_source_level_names() {
    assert_eq!(run("println(typeof(1));"), "I32\n");
    assert_eq!(run(r#"println(typeof("x"));"#), "String\n");
    assert_eq!(run("println(typeof([1, 2]));"), "[I32]\n");
}

#[test]
fn struct_definition_and_field_access() {
    let source = r#"
        struct Point {
            x: I32,
            y: I32
        }
        let p = Point(x: 1, y: 2);
        p.x = 5;
        println(p.x + p.y);
    "#;
    assert_eq!(run(source), "7\n");
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    let err = las::run_to_string("test.las", "println(1 / 0);").unwrap_err();
    assert!(err.to_string().contains("division by zero"));
}

#[test]
fn undefined_reference_reports_the_name() {
    let err = las::run_to_string("test.las", "println(missing);").unwrap_err();
    assert!(err.to_string().contains("missing"));
}

#[test]
fn delete_removes_an_array_element() {
    let source = r#"
        let a = [1, 2, 3];
        delete(a, 1);
        println(a.size);
        println(a[0] + a[1]);
    "#;
    assert_eq!(run(source), "2\n4\n");
}

#[test]
fn delete_removes_a_string_character() {
    let source = r#"
        let s = "abc";
        delete(s, 1);
        println(s);
    "#;
    assert_eq!(run(source), "ac\n");
}

#[test]
fn write_then_read_round_trips_file_contents() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("las_test.txt");
    let path_str = path.to_str().expect("utf8 path").replace('\\', "/");
    let source = format!(
        r#"
            write("hello from las", "{path}");
            println(read("{path}"));
        "#,
        path = path_str
    );
    assert_eq!(run(&source), "hello from las\n");
}

#[test]
fn adding_mismatched_types_is_a_runtime_error() {
    let err = las::run_to_string("test.las", "println(5 + true);").unwrap_err();
    assert!(err.to_string().contains("cannot be applied"), "{err}");
}

#[test]
fn subtracting_mismatched_types_is_a_runtime_error() {
    let err = las::run_to_string("test.las", "println(true - false);").unwrap_err();
    assert!(err.to_string().contains("cannot be applied"), "{err}");
}

#[test]
fn multiplying_mismatched_types_is_a_runtime_error() {
    let err = las::run_to_string("test.las", "println(true * 2);").unwrap_err();
    assert!(err.to_string().contains("cannot be applied"), "{err}");
}

#[test]
fn dividing_mismatched_types_is_a_runtime_error() {
    let err = las::run_to_string("test.las", r#"println("a" / 2);"#).unwrap_err();
    assert!(err.to_string().contains("cannot be applied"), "{err}");
}

#[test]
fn modulo_on_mismatched_types_is_a_runtime_error() {
    let err = las::run_to_string("test.las", r#"println("a" mod 2);"#).unwrap_err();
    assert!(err.to_string().contains("cannot be applied"), "{err}");
}
