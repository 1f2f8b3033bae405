//! Functions: spec §3/§4.A treats `function` as an ordinary `Value`
//! variant carrying a signature, a body, and a captured closure context.

use crate::air::AirQueue;
use crate::bytestring::ByteString;
use crate::context::ExecutiveContext;
use crate::exception::Exception;
use crate::global_context::GlobalContext;
use crate::reference::Reference;
use crate::variable::VariableSet;
use asteria_core::SourceLocation;
use std::fmt;
use std::rc::Rc;

/// A host-provided function registered through the standard-library hook
/// interface (spec §4.H "language-API version" / component J). Takes the
/// materialised `this` and argument references and produces a result
/// reference or throws.
pub type NativeFn = dyn Fn(&GlobalContext, Reference, Vec<Reference>) -> Result<Reference, Exception>;

enum Body {
    Scripted {
        params: Vec<ByteString>,
        variadic: bool,
        air: AirQueue,
        captured: Option<Rc<ExecutiveContext>>,
    },
    Native(Rc<NativeFn>),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Scripted { params, variadic, .. } => {
                f.debug_struct("Scripted").field("params", params).field("variadic", variadic).finish()
            }
            Body::Native(_) => f.write_str("Native(..)"),
        }
    }
}

/// A function value: either a scripted closure (params + AIR body +
/// captured context) or a native hook. Spec §3 gives this a `signature`
/// string for diagnostics/printing and a `source_location`.
#[derive(Debug)]
pub struct Function {
    name: ByteString,
    location: SourceLocation,
    body: Body,
}

impl Function {
    pub fn new_scripted(
        name: ByteString,
        params: Vec<ByteString>,
        variadic: bool,
        air: AirQueue,
        captured: Option<Rc<ExecutiveContext>>,
        location: SourceLocation,
    ) -> Rc<Self> {
        Rc::new(Function {
            name,
            location,
            body: Body::Scripted { params, variadic, air, captured },
        })
    }

    pub fn new_native(name: ByteString, location: SourceLocation, f: impl Fn(&GlobalContext, Reference, Vec<Reference>) -> Result<Reference, Exception> + 'static) -> Rc<Self> {
        Rc::new(Function { name, location, body: Body::Native(Rc::new(f)) })
    }

    pub fn name(&self) -> &ByteString {
        &self.name
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    pub fn is_variadic(&self) -> bool {
        match &self.body {
            Body::Scripted { variadic, .. } => *variadic,
            Body::Native(_) => true,
        }
    }

    pub fn params(&self) -> &[ByteString] {
        match &self.body {
            Body::Scripted { params, .. } => params,
            Body::Native(_) => &[],
        }
    }

    pub fn air(&self) -> Option<&AirQueue> {
        match &self.body {
            Body::Scripted { air, .. } => Some(air),
            Body::Native(_) => None,
        }
    }

    pub fn captured_context(&self) -> Option<&Rc<ExecutiveContext>> {
        match &self.body {
            Body::Scripted { captured, .. } => captured.as_ref(),
            Body::Native(_) => None,
        }
    }

    pub fn native(&self) -> Option<&Rc<NativeFn>> {
        match &self.body {
            Body::Native(f) => Some(f),
            Body::Scripted { .. } => None,
        }
    }

    /// Human-readable `name(params...)` used by `print()` and uncaught
    /// backtraces.
    pub fn signature(&self) -> String {
        let params = self.params().iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ");
        let variadic_suffix = if self.is_variadic() && matches!(self.body, Body::Scripted { .. }) { ", ..." } else { "" };
        format!("{}({params}{variadic_suffix})", self.name)
    }

    pub fn enumerate_variables(&self, staged: &mut VariableSet, temp: &mut VariableSet) {
        if let Some(ctx) = self.captured_context() {
            ctx.enumerate_variables(staged, temp);
        }
    }
}
