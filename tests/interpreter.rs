#[cfg(test)]
mod interpreter_tests {
    use mad_interpreter as mad;

    use mad::error::MadError;
    use mad::value::Value;
    use mad::Interpreter;
    use pretty_assertions::assert_eq;

    /// Run `source` as a whole program and return what it printed.
    fn run(source: &str) -> Result<String, MadError> {
        let (output, result) = run_capturing(source);
        result.map(|()| output)
    }

    /// Like [`run`], but keeps the output produced before a failure.
    fn run_capturing(source: &str) -> (String, Result<(), MadError>) {
        let mut interpreter = Interpreter::new(Vec::new());

        let result = mad::scan(source)
            .and_then(|tokens| mad::parse(&tokens))
            .and_then(|statements| interpreter.interpret(&statements));

        let output = String::from_utf8(interpreter.into_output()).unwrap();
        (output, result)
    }

    fn run_ok(source: &str) -> String {
        match run(source) {
            Ok(output) => output,
            Err(e) => panic!("program failed: {}\n{}", e, source),
        }
    }

    fn run_err(source: &str) -> MadError {
        match run(source) {
            Ok(output) => panic!("expected a runtime error, program printed {:?}", output),
            Err(e) => e,
        }
    }

    fn lines(output: &str) -> Vec<&str> {
        output.lines().collect()
    }

    #[test]
    fn test_interpreter_01_arithmetic() {
        let output = run_ok(
            r#"
            print 2 + 2 * 2;
            print (2 + 2) * 2;
            print 0 / 2;
            print 7 / 2;
            print 10 - 4 - 3;
            print -(3);
            "#,
        );

        assert_eq!(lines(&output), vec!["6", "8", "0", "3.5", "3", "-3"]);
    }

    #[test]
    fn test_interpreter_02_division_by_zero() {
        let err = run_err("print 1 / 0;");

        assert!(matches!(err, MadError::Runtime { .. }));
        assert_eq!(err.message(), "Cannot divide by zero");
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn test_interpreter_03_comparisons_and_equality() {
        let output = run_ok(
            r#"
            print 1 < 2;
            print 2 <= 2;
            print 3 > 4;
            print 3 >= 4;
            print 1 == 1;
            print "a" == "a";
            print "1" == 1;
            print nil == false;
            print nil != nil;
            "#,
        );

        assert_eq!(
            lines(&output),
            vec!["true", "true", "false", "false", "true", "true", "false", "false", "false"]
        );
    }

    #[test]
    fn test_interpreter_04_truthiness() {
        let output = run_ok(
            r#"
            print !nil;
            print !false;
            print !0;
            print !"";
            print 1 and "x";
            print nil or false;
            "#,
        );

        assert_eq!(
            lines(&output),
            vec!["true", "true", "false", "false", "true", "false"]
        );
    }

    #[test]
    fn logical_operators_evaluate_both_sides() {
        let output = run_ok(
            r#"
            func side(tag) { log(tag); true; };
            print false and side("right of and");
            print true or side("right of or");
            "#,
        );

        assert_eq!(
            lines(&output),
            vec!["right of and", "false", "right of or", "true"]
        );
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(run_ok("print \"foo\" + \"bar\";"), "foobar\n");
    }

    #[test]
    fn plus_rejects_mixed_operands() {
        let err = run_err("print \"a\" + 1;");

        assert_eq!(
            err.message(),
            "Operands must be either two numbers or two strings"
        );
        assert_eq!(
            err.to_string(),
            "[line 1] Error: Operands must be either two numbers or two strings \
             (Operands: \"a\" and 1 (number))"
        );
    }

    #[test]
    fn plus_refuses_strings_spelling_literals() {
        for source in [
            "print \"true\" + \"x\";",
            "print \"x\" + \"false\";",
            "print \"nil\" + \"nil\";",
        ] {
            let err = run_err(source);
            assert_eq!(
                err.message(),
                "Operands must be either two numbers or two strings"
            );
        }

        // Only exact matches are refused.
        assert_eq!(run_ok("print \"truer\" + \"x\";"), "truerx\n");
    }

    #[test]
    fn arithmetic_needs_numbers() {
        let err = run_err("print 2 * \"3\";");
        assert_eq!(err.message(), "Operands must be numbers");

        let err = run_err("print -\"3\";");
        assert_eq!(err.message(), "Operand must be a number");

        let err = run_err("print nil < 1;");
        assert_eq!(err.message(), "Operands must be numbers");
    }

    #[test]
    fn let_bindings_are_immutable_by_default() {
        let err = run_err("let x = 1;\nx = 2;");

        assert_eq!(
            err.message(),
            "Variable is immutable. It can be made mutable by declaring it with \"let mut\""
        );
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn let_mut_bindings_can_be_reassigned() {
        let output = run_ok(
            r#"
            let mut x = 1;
            x = x + 41;
            print x;
            x = "now a string";
            print x;
            "#,
        );

        assert_eq!(lines(&output), vec!["42", "now a string"]);
    }

    #[test]
    fn redeclaration_in_one_scope_is_an_error() {
        let err = run_err("let a = 1;\nlet a = 2;");

        assert_eq!(err.message(), "Cannot redeclare variable \"a\"");
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn inner_blocks_may_shadow() {
        let output = run_ok(
            r#"
            let a = "outer";
            {
                let a = "inner";
                print a;
            };
            print a;
            "#,
        );

        assert_eq!(lines(&output), vec!["inner", "outer"]);
    }

    #[test]
    fn undefined_variables_are_reported() {
        let err = run_err("print ghost;");

        assert_eq!(err.to_string(), "[line 1] Error: Undefined variable (ghost)");

        let err = run_err("ghost = 1;");
        assert_eq!(err.message(), "Undefined variable");
    }

    #[test]
    fn block_bindings_do_not_leak() {
        let err = run_err("{ let inner = 1; };\nprint inner;");

        assert_eq!(err.message(), "Undefined variable");
    }

    #[test]
    fn blocks_yield_their_last_value() {
        let output = run_ok(
            r#"
            let v = { let a = 2; a * 3; };
            print v;
            print {};
            print { let unused = 1; };
            "#,
        );

        assert_eq!(lines(&output), vec!["6", "nil", "nil"]);
    }

    #[test]
    fn if_is_an_expression() {
        let output = run_ok(
            r#"
            let pick = if 1 > 2 { "a"; } else if 2 > 1 { "b"; } else { "c"; };
            print pick;
            print if false { "never"; };
            print if nil { 1; } else { 2; };
            "#,
        );

        assert_eq!(lines(&output), vec!["b", "nil", "2"]);
    }

    #[test]
    fn if_takes_only_the_first_truthy_branch() {
        let output = run_ok(
            r#"
            if 0 { log("zero is truthy"); } else { log("else"); };
            if false { log("a"); } else if true { log("b"); } else if true { log("c"); };
            "#,
        );

        assert_eq!(lines(&output), vec!["zero is truthy", "b"]);
    }

    #[test]
    fn functions_return_their_last_value() {
        let output = run_ok(
            r#"
            func add(a, b) { a + b; };
            print add(2, 3);
            func nothing() {};
            print nothing();
            print add;
            "#,
        );

        assert_eq!(lines(&output), vec!["5", "nil", "<fn add>"]);
    }

    #[test]
    fn closures_see_their_defining_scope() {
        let output = run_ok(
            r#"
            let greeting = "hello";
            func greet(name) { greeting + " " + name; };
            {
                let greeting = "shadowed";
                print greet("world");
            };
            "#,
        );

        assert_eq!(output, "hello world\n");
    }

    #[test]
    fn closures_keep_captured_state_alive() {
        let output = run_ok(
            r#"
            func counter() {
                let mut count = 0;
                func next() {
                    count = count + 1;
                    count;
                };
                next;
            };
            let tick = counter();
            tick();
            tick();
            print tick();
            let other = counter();
            print other();
            "#,
        );

        assert_eq!(lines(&output), vec!["3", "1"]);
    }

    #[test]
    fn closures_can_mutate_outer_bindings() {
        let output = run_ok(
            r#"
            let mut total = 0;
            func add(n) { total = total + n; };
            add(5);
            add(10);
            print total;
            "#,
        );

        assert_eq!(output, "15\n");
    }

    #[test]
    fn recursion_resolves_through_the_defining_frame() {
        let output = run_ok(
            r#"
            func fib(n) {
                if n < 2 { n; } else { fib(n - 1) + fib(n - 2); };
            };
            print fib(15);
            "#,
        );

        assert_eq!(output, "610\n");
    }

    #[test]
    fn parameters_are_immutable() {
        let err = run_err("func f(a) { a = 2; };\nf(1);");

        assert!(err.message().starts_with("Variable is immutable"), "{}", err);
    }

    #[test]
    fn duplicate_parameters_fail_at_call_time() {
        let err = run_err("func f(a, a) { a; };\nf(1, 2);");

        assert_eq!(err.message(), "Cannot redeclare variable \"a\"");
    }

    #[test]
    fn calls_check_arity() {
        let err = run_err("func f(a, b) { a; };\nf(1);");
        assert_eq!(
            err.to_string(),
            "[line 2] Error: Missing argument for function \"f\" (expected 2, got 1)"
        );

        let err = run_err("func f(a) { a; };\nf(1, 2);");
        assert_eq!(
            err.to_string(),
            "[line 2] Error: Too many arguments for function \"f\" (expected 1, got 2)"
        );
    }

    #[test]
    fn only_functions_are_callable() {
        let err = run_err("let x = 1;\nx();");

        assert_eq!(err.message(), "Can only call functions");
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn pipes_thread_the_value_as_first_argument() {
        let output = run_ok(
            r#"
            func sub(a, b) { a - b; };
            func double(x) { x * 2; };
            print 10 -> sub(3);
            print 5 -> double -> sub(1);
            print 1 + 2 -> double();
            "#,
        );

        assert_eq!(lines(&output), vec!["7", "9", "6"]);
    }

    #[test]
    fn pipes_feed_the_innermost_call() {
        let output = run_ok(
            r#"
            func add(a, b) {
                func inner(c) { a + b + c; };
                inner;
            };
            print 2 -> add(1)(5);
            "#,
        );

        assert_eq!(output, "8\n");
    }

    #[test]
    fn pipe_into_log_prints_the_value() {
        assert_eq!(run_ok("\"piped\" -> log;"), "piped\n");
    }

    #[test]
    fn log_prints_each_argument_on_its_own_line() {
        let output = run_ok("log(1, \"two\", nil, true);\nprint log();");

        assert_eq!(lines(&output), vec!["1", "two", "nil", "true", "nil"]);
    }

    #[test]
    fn builtins_can_be_shadowed() {
        let output = run_ok("let log = 3;\nprint log;");
        assert_eq!(output, "3\n");

        assert_eq!(run_ok("print log;"), "<native fn log>\n");
    }

    #[test]
    fn number_formatting() {
        let output = run_ok(
            r#"
            print 1.0;
            print 2.50;
            print -0;
            print 1000000;
            "#,
        );

        assert_eq!(lines(&output), vec!["1", "2.5", "0", "1000000"]);
    }

    #[test]
    fn output_before_an_error_is_kept() {
        let (output, result) = run_capturing("print \"first\";\nprint 1 / 0;\nprint \"never\";");

        assert_eq!(output, "first\n");
        assert!(result.is_err());
    }

    #[test]
    fn each_interpret_call_starts_fresh() {
        let mut interpreter = Interpreter::new(Vec::new());

        for _ in 0..2 {
            let statements = mad::parse(&mad::scan("let x = 1; print x;").unwrap()).unwrap();
            interpreter.interpret(&statements).unwrap();
        }

        assert_eq!(
            String::from_utf8(interpreter.into_output()).unwrap(),
            "1\n1\n"
        );
    }

    #[test]
    fn incremental_runs_share_one_scope() {
        let mut interpreter = Interpreter::new(Vec::new());

        let first = mad::parse(&mad::scan("let mut n = 1; func bump() { n = n + 1; };").unwrap())
            .unwrap();
        interpreter.interpret_incremental(&first).unwrap();

        let second = mad::parse(&mad::scan("bump(); print n;").unwrap()).unwrap();
        interpreter.interpret_incremental(&second).unwrap();

        // A failed input leaves earlier bindings in place.
        let third = mad::parse(&mad::scan("let n = 0;").unwrap()).unwrap();
        assert!(interpreter.interpret_incremental(&third).is_err());

        let fourth = mad::parse(&mad::scan("print n;").unwrap()).unwrap();
        interpreter.interpret_incremental(&fourth).unwrap();

        assert_eq!(
            String::from_utf8(interpreter.into_output()).unwrap(),
            "2\n2\n"
        );
    }

    #[test]
    fn expression_statements_yield_values() {
        let mut interpreter = Interpreter::new(Vec::new());
        let statements = mad::parse(&mad::scan("\"a\" + \"b\";").unwrap()).unwrap();

        let value = interpreter.execute(&statements[0]).unwrap();

        assert_eq!(value, Value::String("ab".into()));
        assert!(interpreter.output().is_empty());
    }

    #[test]
    fn pipe_runs_the_value_before_the_stage() {
        let output = run_ok(
            r#"
            func id(x) { x; };
            print { log("left"); 1; } -> { log("right"); id; };
            "#,
        );

        assert_eq!(lines(&output), vec!["left", "right", "1"]);
    }

    #[test]
    fn pipe_runs_the_value_before_a_computed_callee() {
        let output = run_ok(
            r#"
            func src() { log("value"); 3; };
            func add(a, b) { a + b; };
            func mk() { log("callee"); add; };
            func curry(a) {
                log("callee");
                func plus(b) { a + b; };
                plus;
            };
            print src() -> (mk())(4);
            print src() -> curry()(4);
            "#,
        );

        assert_eq!(
            lines(&output),
            vec!["value", "callee", "7", "value", "callee", "7"]
        );
    }

    #[test]
    fn pipe_arguments_still_run_left_to_right() {
        let output = run_ok(
            r#"
            func tag(t) { log(t); t; };
            func join(a, b, c) { a + b + c; };
            print tag("a") -> join(tag("b"), tag("c"));
            "#,
        );

        assert_eq!(lines(&output), vec!["a", "b", "c", "abc"]);
    }

    #[test]
    fn recursion_below_the_depth_limit_succeeds() {
        let output = run_ok(
            r#"
            func count(n) { if n > 0 { 1 + count(n - 1); } else { 0; }; };
            print count(900);
            "#,
        );

        assert_eq!(output, "900\n");
    }

    #[test]
    fn runaway_recursion_is_a_runtime_error() {
        let err = run_err("func down(n) { down(n + 1); };\ndown(0);");

        assert!(matches!(err, MadError::Runtime { .. }));
        assert_eq!(err.message(), "Maximum call depth exceeded");
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn depth_is_released_after_a_failed_call() {
        let mut interpreter = Interpreter::new(Vec::new());

        let deep = mad::parse(&mad::scan("func down(n) { down(n + 1); };").unwrap()).unwrap();
        interpreter.interpret_incremental(&deep).unwrap();

        let run = mad::parse(&mad::scan("down(0);").unwrap()).unwrap();
        assert!(interpreter.interpret_incremental(&run).is_err());
        assert!(interpreter.interpret_incremental(&run).is_err());

        let source = r#"
            func count(n) { if n > 0 { count(n - 1); } else { "ok"; }; };
            print count(900);
        "#;
        let shallow = mad::parse(&mad::scan(source).unwrap()).unwrap();
        interpreter.interpret_incremental(&shallow).unwrap();

        assert_eq!(
            String::from_utf8(interpreter.into_output()).unwrap(),
            "ok\n"
        );
    }
}
