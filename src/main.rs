mod args;

use args::Args;

use lucc::{diagnostics, emission, lexer, parser};

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::exit;

/// Output name: the input path with everything from the first `.` stripped
/// and `.ll` appended.
fn output_path(input: &Path) -> PathBuf {
    let name = input.to_string_lossy();
    let stem: String = name.chars().take_while(|c| *c != '.').collect();
    PathBuf::from(format!("{stem}.ll"))
}

fn compile_file(input: &Path, args: &Args) -> Result<bool> {
    let filepath = input.to_string_lossy();
    let source = fs::read_to_string(input)?;

    if args.tokens {
        match lexer::lex(&source) {
            Ok(tokens) => {
                dbg!(tokens);
                return Ok(true);
            }
            Err(err) => {
                let rendered = diagnostics::render(
                    &filepath,
                    &source,
                    err.line(),
                    err.column(),
                    &err.to_string(),
                );
                eprint!("{rendered}");
                return Ok(false);
            }
        }
    }

    let mut lexer = lexer::Lexer::new(&source);
    let translation_unit = match parser::parse_translation_unit(&mut lexer) {
        Ok(translation_unit) => translation_unit,
        Err(err) => {
            let rendered = diagnostics::render(
                &filepath,
                &source,
                err.line(),
                err.column(),
                &err.to_string(),
            );
            eprint!("{rendered}");
            return Ok(false);
        }
    };

    if args.parse {
        dbg!(translation_unit);
        return Ok(true);
    }

    match emission::emit_ir(&translation_unit) {
        Ok(ir) => {
            fs::write(output_path(input), ir)?;
            Ok(true)
        }
        Err(err) => {
            eprintln!("Error: {filepath} : {err}");
            Ok(false)
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut any_failed = false;

    for input in &args.inputs {
        let file_exists = fs::exists(input)?;
        if !file_exists {
            eprintln!("File {} not found, aborting.", input.display());
            any_failed = true;
            continue;
        }

        if !compile_file(input, &args)? {
            any_failed = true;
        }
    }

    if any_failed {
        exit(1);
    }
    Ok(())
}
