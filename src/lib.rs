/*!
This crate is the front-end of a small C compiler: it takes one translation
unit of preprocessed C source and produces textual [LLVM-IR] suitable for
feeding to a back-end assembler. This project follows these ideas and goals:
  * **Pull, don't batch** - The lexer holds exactly one current token and the
    parser drives it on demand; there is no token buffer between the stages.
  * **Result-typed errors** - Every stage returns a positioned error instead
    of aborting; the driver decides how to present it and whether to stop.
  * **Reusable modules** - Each pipeline stage is hidden behind a feature
    flag with the same name, so the lexer or parser can be reused as a
    library on their own.
  ## Command-line options
  ```shell
Usage: lucc [OPTIONS] FILE...

Options:
  -h, --help             Show this message
      --tokens           Stop after lexing and dump the token stream
      --parse            Stop after parsing and dump the AST
  ```

## Compilation stages
1. **Lexing** - [Lexer](lexer::Lexer) scans the source buffer one token at a
   time, tracking 0-based line and column of every token. Malformed input
   (e.g. `0x`, `1..2`, `1foo`) produces a positioned [LexError](lexer::LexError).
2. **Parsing** - [parse_translation_unit](parser::parse_translation_unit)
   drives the lexer and produces a [TranslationUnit](ast::TranslationUnit):
   the list of external declarations in source order, each either a function
   definition or a declaration. Declaration specifiers are folded into a
   [SpecifierFlags](types::SpecifierFlags) bitset and resolved against the
   legal multisets of C11 6.7.2 to a [FundamentalType](types::FundamentalType).
   Any syntactic error raises a positioned [ParseError](parser::ParseError).
3. **Emission** - [emit_ir](emission::emit_ir) walks the external-declaration
   list and renders LLVM-IR function definitions and globals as text.
   Constructs the front-end recognises but cannot lower yet raise an
   [EmitError](emission::EmitError).

## What is implemented
  * Position-tracked lexing of the full C11 token set, including `0b` binary
    constants, integer suffixes, line and block comments.
  * Declarations with pointer declarators, function declarators with
    parameter lists and variadic markers, init-declarator lists, typedef
    registration and typedef-name resolution through the scope chain.
  * The 16 expression precedence levels by recursive descent.
  * Compound, selection, iteration, jump and labeled statements with
    lexically scoped symbol tables.
  * IR lowering for function definitions: stack-slot locals, signedness
    aware arithmetic, short-circuit logic via `phi`, loops and branches.

Struct/union members, arrays, initializer lists with designators, `switch`
lowering and `_Generic` are recognised but unimplemented; see DESIGN.md.

[LLVM-IR]: https://llvm.org/docs/LangRef.html
*/

#![deny(unused_must_use)]
#![warn(clippy::pedantic)]
#![allow(clippy::wildcard_imports)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_possible_truncation)]

pub mod ast;
pub mod diagnostics;
#[cfg(feature = "emission")]
pub mod emission;
#[cfg(feature = "lexer")]
pub mod lexer;
#[cfg(feature = "parser")]
pub mod parser;
pub mod types;
