use std::fs;
use std::path::Path;

use anyhow::{Context, Result, ensure};

use customlang::interpreter::Interpreter;
use customlang::{lexer, parser};
use test_support::{CaseClass, load_cases, normalize_output};

#[test]
fn runs_fixture_programs() -> Result<()> {
    let cases = load_cases(Path::new("tests/programs"))?;

    for case in cases {
        if case.spec.bench.enabled {
            ensure!(
                !case.spec.bench.tags.is_empty(),
                "Case {} has bench enabled but no tags",
                case.name
            );
        }
        let source = fs::read_to_string(&case.program_path)
            .with_context(|| format!("Reading {}", case.name))?;
        let tokenized = lexer::tokenize(&source);

        match case.spec.class {
            CaseClass::RuntimeSuccess => {
                let stdout_file = case
                    .spec
                    .expected
                    .stdout_file
                    .as_deref()
                    .with_context(|| format!("Missing stdout_file in {}", case.name))?;
                let expected = case.read_text(stdout_file)?;
                let tokens = tokenized.with_context(|| format!("Tokenizing {}", case.name))?;
                let program = parser::parse_tokens(tokens)
                    .with_context(|| format!("Parsing {}", case.name))?;
                let output = Interpreter::new()
                    .run(&program)
                    .with_context(|| format!("Running {}", case.name))?;
                assert_eq!(
                    normalize_output(&output.render()),
                    normalize_output(&expected),
                    "Output mismatch for {}",
                    case.name
                );
            }
            CaseClass::FrontendError => {
                let expected_file = case
                    .spec
                    .expected
                    .error_contains_file
                    .as_deref()
                    .with_context(|| format!("Missing error expectation file in {}", case.name))?;
                let expected_error = case.read_text(expected_file)?;
                let expected_error = expected_error.trim();
                let actual = match tokenized {
                    Err(error) => error.to_string(),
                    Ok(tokens) => {
                        let parse_result = parser::parse_tokens(tokens);
                        ensure!(
                            parse_result.is_err(),
                            "Expected frontend error in {}, but parsing succeeded",
                            case.name
                        );
                        parse_result
                            .expect_err("parse_result checked as err")
                            .to_string()
                    }
                };
                ensure!(
                    actual.contains(expected_error),
                    "Expected frontend error containing '{expected_error}' in {}, got '{actual}'",
                    case.name
                );
            }
            CaseClass::RuntimeError => {
                let expected_file = case
                    .spec
                    .expected
                    .error_contains_file
                    .as_deref()
                    .with_context(|| format!("Missing error expectation file in {}", case.name))?;
                let expected_error = case.read_text(expected_file)?;
                let expected_error = expected_error.trim();
                let tokens = tokenized.with_context(|| format!("Tokenizing {}", case.name))?;
                let program = parser::parse_tokens(tokens)
                    .with_context(|| format!("Parsing {}", case.name))?;
                let result = Interpreter::new().run(&program);
                ensure!(
                    result.is_err(),
                    "Expected runtime error for {}",
                    case.name
                );
                let actual = result.expect_err("result checked as err").to_string();
                ensure!(
                    actual.contains(expected_error),
                    "Expected runtime error containing '{expected_error}' in {}, got '{actual}'",
                    case.name
                );
            }
        }
    }

    Ok(())
}
