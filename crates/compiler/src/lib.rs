//! Asteria compiler library: lexer, recursive-descent parser, and the
//! AST-to-AIR lowering pass, wired together behind a small
//! tokenize-parse-resolve-lower pipeline.
//!
//! `import "path";` is resolved here, before lowering, by splicing the
//! imported file's (recursively resolved) statements in place; a file
//! that imports itself, directly or through a chain, surfaces as
//! [`ErrorKind::RecursiveImport`] rather than overflowing the host stack.

pub mod ast;
pub mod lexer;
pub mod lower;
pub mod parser;

use crate::ast::{Program, Stmt, SwitchArm};
use crate::parser::Parser;
use asteria_core::{ErrorKind, Fault};
use asteria_runtime::air::AirQueue;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Parses, resolves imports relative to `file`'s directory, and lowers
/// `source` into an executable instruction stream.
pub fn compile_source(source: &str, file: &str) -> Result<AirQueue, Fault> {
    debug!("compiling {file} ({} bytes)", source.len());
    let program = parse_resolved(source, file)?;
    Ok(lower::lower_program(&program))
}

/// Reads a script file from disk and compiles it.
pub fn compile_file(path: &Path) -> Result<AirQueue, Fault> {
    let source = std::fs::read_to_string(path).map_err(|e| Fault::new(ErrorKind::Io, format!("reading `{}`: {e}", path.display())))?;
    compile_source(&source, &path.to_string_lossy())
}

fn parse_resolved(source: &str, file: &str) -> Result<Program, Fault> {
    let program = Parser::new(source, file)?.parse()?;
    let dir = Path::new(file).parent().map(Path::to_path_buf).unwrap_or_default();
    let mut visited = vec![canonicalize_best_effort(Path::new(file))];
    resolve_imports(program, &dir, &mut visited)
}

fn canonicalize_best_effort(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Walks a statement list (and into every nested block) replacing each
/// `import` directive with the imported file's own resolved statements.
fn resolve_imports(stmts: Program, dir: &Path, visited: &mut Vec<PathBuf>) -> Result<Program, Fault> {
    let mut out = Vec::with_capacity(stmts.len());
    for stmt in stmts {
        out.extend(resolve_stmt(stmt, dir, visited)?);
    }
    Ok(out)
}

fn resolve_stmt(stmt: Stmt, dir: &Path, visited: &mut Vec<PathBuf>) -> Result<Vec<Stmt>, Fault> {
    Ok(match stmt {
        Stmt::Import(path, loc) => {
            let target = dir.join(&path);
            let canonical = std::fs::canonicalize(&target)
                .map_err(|e| Fault::new(ErrorKind::Io, format!("importing `{path}`: {e}")).at(loc.clone()))?;
            if visited.contains(&canonical) {
                return Err(Fault::new(ErrorKind::RecursiveImport, format!("`{path}` is imported recursively")).at(loc));
            }
            trace!("resolving import {path}");
            let source = std::fs::read_to_string(&canonical)
                .map_err(|e| Fault::new(ErrorKind::Io, format!("reading `{path}`: {e}")).at(loc.clone()))?;
            let sub_file = canonical.to_string_lossy().into_owned();
            let sub_program = Parser::new(&source, sub_file.as_str())?.parse()?;
            let sub_dir = canonical.parent().map(Path::to_path_buf).unwrap_or_default();
            visited.push(canonical);
            let resolved = resolve_imports(sub_program, &sub_dir, visited);
            visited.pop();
            resolved?
        }
        Stmt::Block(body) => vec![Stmt::Block(resolve_imports(body, dir, visited)?)],
        Stmt::If { cond, then_branch, else_branch } => vec![Stmt::If {
            cond,
            then_branch: resolve_imports(then_branch, dir, visited)?,
            else_branch: resolve_imports(else_branch, dir, visited)?,
        }],
        Stmt::While { cond, body } => vec![Stmt::While { cond, body: resolve_imports(body, dir, visited)? }],
        Stmt::DoWhile { body, cond } => vec![Stmt::DoWhile { body: resolve_imports(body, dir, visited)?, cond }],
        Stmt::For { init, cond, step, body } => {
            vec![Stmt::For { init, cond, step, body: resolve_imports(body, dir, visited)? }]
        }
        Stmt::ForEach { key_name, value_name, collection, body } => {
            vec![Stmt::ForEach { key_name, value_name, collection, body: resolve_imports(body, dir, visited)? }]
        }
        Stmt::Switch { control, arms } => {
            let mut resolved_arms = Vec::with_capacity(arms.len());
            for arm in arms {
                let SwitchArm { test, locals, body } = arm;
                resolved_arms.push(SwitchArm { test, locals, body: resolve_imports(body, dir, visited)? });
            }
            vec![Stmt::Switch { control, arms: resolved_arms }]
        }
        Stmt::TryCatch { try_body, catch_name, catch_body } => vec![Stmt::TryCatch {
            try_body: resolve_imports(try_body, dir, visited)?,
            catch_name,
            catch_body: resolve_imports(catch_body, dir, visited)?,
        }],
        Stmt::Defer(body) => vec![Stmt::Defer(resolve_imports(body, dir, visited)?)],
        Stmt::FunctionDecl { name, params, variadic, body, location } => {
            vec![Stmt::FunctionDecl { name, params, variadic, body: resolve_imports(body, dir, visited)?, location }]
        }
        other => vec![other],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use asteria_runtime::air::execute_top_level;
    use asteria_runtime::global_context::GlobalContext;
    use asteria_runtime::value::Value;
    use std::io::Write;

    #[test]
    fn compiles_and_runs_a_simple_script() {
        let queue = compile_source("return 6 * 7;", "<test>").unwrap();
        let mut global = GlobalContext::new();
        assert_eq!(execute_top_level(&mut global, &queue).unwrap(), Value::Integer(42));
    }

    #[test]
    fn import_splices_a_sibling_file() {
        let dir = tempfile::tempdir().unwrap();
        let lib_path = dir.path().join("lib.ast");
        std::fs::File::create(&lib_path).unwrap().write_all(b"func answer() { return 42; }").unwrap();

        let main_path = dir.path().join("main.ast");
        std::fs::File::create(&main_path).unwrap().write_all(b"import \"lib.ast\"; return answer();").unwrap();

        let queue = compile_file(&main_path).unwrap();
        let mut global = GlobalContext::new();
        assert_eq!(execute_top_level(&mut global, &queue).unwrap(), Value::Integer(42));
    }

    #[test]
    fn self_import_is_a_recursive_import_error() {
        let dir = tempfile::tempdir().unwrap();
        let main_path = dir.path().join("loop.ast");
        std::fs::File::create(&main_path).unwrap().write_all(b"import \"loop.ast\";").unwrap();

        let err = compile_file(&main_path).unwrap_err();
        assert_eq!(err.kind, ErrorKind::RecursiveImport);
    }

    #[test]
    fn mutual_import_cycle_is_a_recursive_import_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::File::create(dir.path().join("a.ast")).unwrap().write_all(b"import \"b.ast\";").unwrap();
        std::fs::File::create(dir.path().join("b.ast")).unwrap().write_all(b"import \"a.ast\";").unwrap();

        let err = compile_file(&dir.path().join("a.ast")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::RecursiveImport);
    }
}
