//! The Simple Script Facade (spec §4.K/§6): the thin layer a host (or the
//! `asteria` binary's own REPL and batch modes) drives instead of poking
//! at the compiler and runtime crates directly.

use asteria_compiler::compile_source;
use asteria_core::{ErrorKind, Fault};
use asteria_runtime::bytestring::ByteString;
use asteria_runtime::exception::Exception;
use asteria_runtime::function::Function;
use asteria_runtime::global_context::GlobalContext;
use asteria_runtime::reference::Reference;
use asteria_runtime::value::Value;
use asteria_runtime::variable::Variable;
use asteria_runtime::execute_function_call;
use std::io::Read;
use std::path::Path;
use std::rc::Rc;

/// Parser/codegen toggles exposed to embedders (spec §6). Neither flag
/// changes generated AIR today: proper tail calls are structural (every
/// tail-position call produces a pending-tail-call reference regardless
/// of this flag) and single-step traps would hook the executor's node
/// dispatch, which this facade does not yet instrument. Both are plain
/// fields so a host can set them without the facade's public shape
/// changing later.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub disable_tco: bool,
    pub verbose_single_step_traps: bool,
}

/// Compiles one source unit into a callable, zero-parameter closure and
/// drives its execution against an owned [`GlobalContext`].
pub struct Facade {
    global: GlobalContext,
    options: Options,
    loaded: Option<Rc<Function>>,
}

impl Facade {
    pub fn new() -> Self {
        Facade { global: GlobalContext::new(), options: Options::default(), loaded: None }
    }

    /// Parses and lowers `source` (attributed to `path` starting at
    /// `start_line`) into a zero-parameter, variadic function; arguments
    /// later passed to [`execute`](Self::execute) surface inside the
    /// script as `__varg`.
    pub fn reload_string(&mut self, path: &str, start_line: i64, source: &str) -> Result<(), Fault> {
        let padded = "\n".repeat(start_line.saturating_sub(1).max(0) as usize) + source;
        let air = compile_source(&padded, path)?;
        let location = asteria_core::SourceLocation::new(path.to_string(), start_line);
        let function = Function::new_scripted(ByteString::from("<script>"), Vec::new(), true, air, None, location);
        self.loaded = Some(function);
        Ok(())
    }

    pub fn reload_file(&mut self, path: &Path) -> Result<(), Fault> {
        let source = std::fs::read_to_string(path).map_err(|e| Fault::new(ErrorKind::Io, format!("reading `{}`: {e}", path.display())))?;
        self.reload_string(&path.to_string_lossy(), 1, &source)
    }

    pub fn reload_stdin(&mut self, start_line: i64) -> Result<(), Fault> {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source).map_err(|e| Fault::new(ErrorKind::Io, format!("reading stdin: {e}")))?;
        self.reload_string("<stdin>", start_line, &source)
    }

    /// Runs the most recently loaded script with `args` bound to
    /// `__varg`. Fails with a contract-style [`Fault`] if nothing has
    /// been loaded yet.
    pub fn execute(&mut self, args: Vec<Value>) -> Result<Reference, Exception> {
        let Some(function) = self.loaded.clone() else {
            return Err(Exception::new(Value::string_from_static("no script has been loaded")));
        };
        let refs = args.into_iter().map(Reference::constant).collect();
        execute_function_call(&mut self.global, function, Reference::constant(Value::Null), refs)
    }

    pub fn get_global_variable_opt(&self, name: &str) -> Option<Reference> {
        self.global.get_named_reference_opt(&ByteString::from(name))
    }

    /// Returns the reference bound to `name`, creating a fresh foreign
    /// (host-owned, not GC-managed) variable if none exists yet. Foreign
    /// variables are exactly the mechanism spec §8 scenario 6 exercises:
    /// the host writes through the reference, the script reads and
    /// writes the same cell, the host observes the result -- and the
    /// collector structurally never reclaims it, since it was never
    /// handed to the collector in the first place.
    pub fn open_global_variable(&mut self, name: &str) -> Reference {
        let key = ByteString::from(name);
        if let Some(existing) = self.global.get_named_reference_opt(&key) {
            return existing;
        }
        let handle = Variable::foreign(Value::Null).handle();
        let reference = Reference::from_variable(handle);
        self.global.insert_named_reference(key, reference.clone());
        reference
    }

    pub fn erase_global_variable(&mut self, name: &str) -> Option<Reference> {
        self.global.remove_named_reference(&ByteString::from(name))
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn mut_options(&mut self) -> &mut Options {
        &mut self.options
    }

    pub fn global(&self) -> &GlobalContext {
        &self.global
    }

    pub fn mut_global(&mut self) -> &mut GlobalContext {
        &mut self.global
    }
}

impl Default for Facade {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_loaded_source_and_returns_value() {
        let mut facade = Facade::new();
        facade.reload_string("<test>", 1, "return 2 + 2;").unwrap();
        let result = facade.execute(Vec::new()).unwrap();
        assert_eq!(result.read().unwrap(), Value::Integer(4));
    }

    #[test]
    fn variadic_args_reach_the_script_as_varg() {
        let mut facade = Facade::new();
        facade.reload_string("<test>", 1, "return __varg[0];").unwrap();
        let result = facade.execute(vec![Value::string_from_static("hello")]).unwrap();
        assert_eq!(result.read().unwrap(), Value::string_from_static("hello"));
    }

    #[test]
    fn global_variable_round_trips_between_host_and_script() {
        let mut facade = Facade::new();
        let handle = facade.open_global_variable("counter");
        handle.write(Value::Integer(1)).unwrap();
        facade.reload_string("<test>", 1, "counter += 41; return counter;").unwrap();
        let result = facade.execute(Vec::new()).unwrap();
        assert_eq!(result.read().unwrap(), Value::Integer(42));
        assert!(facade.erase_global_variable("counter").is_some());
        assert!(facade.get_global_variable_opt("counter").is_none());
    }

    #[test]
    fn parse_error_surfaces_as_a_fault() {
        let mut facade = Facade::new();
        let err = facade.reload_string("<test>", 1, "var = ;").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
    }
}
