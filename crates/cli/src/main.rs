//! `asteria` - batch runner and interactive REPL for the Asteria scripting
//! language (spec §6): the thin binary wrapping [`facade::Facade`].

mod facade;

use asteria_core::ErrorKind;
use asteria_runtime::value::Value;
use clap::Parser;
use facade::Facade;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "asteria", version, about = "Asteria scripting language interpreter")]
struct Cli {
    /// Drop into the REPL after running `script`, instead of exiting.
    #[arg(short = 'i')]
    interactive: bool,

    /// Enable optimisations (accepted for compatibility; codegen is
    /// unaffected today, see `Options::disable_tco`).
    #[arg(short = 'O', num_args = 0..=1, default_missing_value = "1")]
    optimize: Option<String>,

    /// Script file to run. Omit to start the REPL directly.
    script: Option<PathBuf>,

    /// Arguments forwarded to the script as `__varg`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt::try_init().ok();
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = Cli::parse();
    let mut facade = Facade::new();
    if let Some(level) = &cli.optimize {
        tracing::debug!(level, "optimisation level accepted, codegen unaffected");
    }

    match &cli.script {
        Some(path) => run_script(&mut facade, path, &cli.args, cli.interactive),
        None => repl(&mut facade),
    }
}

fn run_script(facade: &mut Facade, path: &PathBuf, script_args: &[String], then_interactive: bool) -> i32 {
    if let Err(fault) = facade.reload_file(path) {
        eprintln!("asteria: {fault}");
        return exit_code_for_fault(&fault);
    }

    let args: Vec<Value> = script_args.iter().map(|s| Value::string_from_static(s)).collect();
    let code = match facade.execute(args) {
        Ok(_) => 0,
        Err(exception) => {
            eprintln!("asteria: uncaught exception: {}", describe(&exception.value));
            1
        }
    };

    if then_interactive { repl(facade) } else { code }
}

fn exit_code_for_fault(fault: &asteria_core::Fault) -> i32 {
    match fault.kind {
        ErrorKind::Parse => 2,
        ErrorKind::Io => 3,
        _ => 3,
    }
}

fn describe(value: &Value) -> String {
    let mut out = String::new();
    value.print(&mut out, false).ok();
    out
}

fn repl(facade: &mut Facade) -> i32 {
    let mut editor = match rustyline::DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("asteria: failed to start the line editor: {err}");
            return 3;
        }
    };

    let mut line_no: i64 = 1;
    loop {
        match editor.readline("asteria> ") {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                run_one_line(facade, &line, line_no);
                line_no += 1;
            }
            Err(rustyline::error::ReadlineError::Interrupted | rustyline::error::ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("asteria: {err}");
                break;
            }
        }
    }
    0
}

fn run_one_line(facade: &mut Facade, line: &str, line_no: i64) {
    if let Err(fault) = facade.reload_string("<stdin>", line_no, line) {
        eprintln!("asteria: {fault}");
        return;
    }
    match facade.execute(Vec::new()) {
        Ok(reference) => match reference.read() {
            Ok(value) => println!("{}", describe(&value)),
            Err(fault) => eprintln!("asteria: {fault}"),
        },
        Err(exception) => eprintln!("asteria: uncaught exception: {}", describe(&exception.value)),
    }
}
