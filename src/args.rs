use std::env;
use std::path::PathBuf;
use std::process::exit;

#[derive(Default)]
pub struct Args {
    pub tokens: bool,
    pub parse: bool,
    pub inputs: Vec<PathBuf>,
}

impl Args {
    pub fn parse() -> Self {
        let env_args = env::args();
        let mut args = Self::default();

        for arg in env_args.skip(1) {
            match arg.as_str() {
                "--tokens" => args.tokens = true,
                "--parse" => args.parse = true,
                "-h" | "--help" => Self::usage(),
                _ => args.inputs.push(PathBuf::from(arg)),
            }
        }

        if args.inputs.is_empty() {
            Self::usage();
        }
        args
    }

    fn usage() -> ! {
        let cmd0 = std::env::args().next().unwrap_or("lucc".to_owned());
        let usage_msg = format!("Usage: {cmd0} [OPTIONS] FILE...\n");
        let options = [
            "Options:\n",
            "  -h, --help             Show this message\n",
            "      --tokens           Stop after lexing and dump the token stream\n",
            "      --parse            Stop after parsing and dump the AST\n",
        ];

        print!("LLVM-IR emitting C front-end\n\n{usage_msg}\n");
        options.into_iter().for_each(|o| print!("{o}"));

        exit(0)
    }
}
