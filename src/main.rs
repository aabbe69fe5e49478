use std::fs;
use std::io::{self, Read};

use anyhow::{Context, Result, bail};

use customlang::interpreter::Interpreter;
use customlang::{lexer, parser};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let mut input_path: Option<String> = None;

    if let Some(arg) = args.next() {
        input_path = Some(arg);
        if args.next().is_some() {
            bail!("Only one input file is supported");
        }
    }

    let source = if let Some(path) = input_path {
        fs::read_to_string(&path).with_context(|| format!("Reading {path}"))?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Reading stdin")?;
        buffer
    };

    let tokens = lexer::tokenize(&source)?;
    let program = parser::parse_tokens(tokens)?;
    let output = Interpreter::new().run(&program)?;
    print!("{}", output.render());
    Ok(())
}
