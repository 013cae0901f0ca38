use std::fmt;
use std::rc::Rc;

use weave_typesys::{Emitter, HostMethod, HostType};

use crate::casts::{check_arity, emit_argument_casts};
use crate::error::SignatureAdaptationError;

/// A callable that hides whether the target takes a receiver.
///
/// `parameters_with_this` lists every value the caller pushes, receiver
/// first for instance methods.
pub trait WrappedMethod {
    fn name(&self) -> &str;
    fn return_type(&self) -> HostType;
    fn declaring_type(&self) -> HostType;
    fn parameters_with_this(&self) -> &[HostType];
    /// Emit the call. With `swallow_result` set, a returned value is dropped.
    fn emit(&self, gen: &mut dyn Emitter, swallow_result: bool);
}

impl fmt::Debug for dyn WrappedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WrappedMethod({}::{}(", self.declaring_type(), self.name())?;
        for (i, p) in self.parameters_with_this().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, "))")
    }
}

/// Wraps a method handle as-is.
pub struct DirectWrappedMethod {
    method: HostMethod,
    parameters_with_this: Vec<HostType>,
}

impl DirectWrappedMethod {
    pub fn new(method: HostMethod) -> Self {
        let parameters_with_this = method.parameters_with_this();
        Self {
            method,
            parameters_with_this,
        }
    }

    pub fn method(&self) -> &HostMethod {
        &self.method
    }
}

impl From<HostMethod> for DirectWrappedMethod {
    fn from(method: HostMethod) -> Self {
        Self::new(method)
    }
}

impl WrappedMethod for DirectWrappedMethod {
    fn name(&self) -> &str {
        self.method.name()
    }

    fn return_type(&self) -> HostType {
        self.method.return_type()
    }

    fn declaring_type(&self) -> HostType {
        self.method.declaring_type()
    }

    fn parameters_with_this(&self) -> &[HostType] {
        &self.parameters_with_this
    }

    fn emit(&self, gen: &mut dyn Emitter, swallow_result: bool) {
        gen.emit_call(&self.method, swallow_result);
    }
}

/// Presents a wrapped method under a caller-chosen parameter list and casts
/// the pushed arguments back to what the base expects at emission.
pub struct WrappedMethodWithCasts {
    base: Rc<dyn WrappedMethod>,
    parameters_with_this: Vec<HostType>,
}

impl WrappedMethodWithCasts {
    pub fn new(
        base: Rc<dyn WrappedMethod>,
        parameters_with_this: Vec<HostType>,
    ) -> Result<Self, SignatureAdaptationError> {
        check_arity(
            &format!("{}::{}", base.declaring_type(), base.name()),
            base.parameters_with_this().len(),
            parameters_with_this.len(),
        )?;
        Ok(Self {
            base,
            parameters_with_this,
        })
    }
}

impl WrappedMethod for WrappedMethodWithCasts {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn return_type(&self) -> HostType {
        self.base.return_type()
    }

    fn declaring_type(&self) -> HostType {
        self.base.declaring_type()
    }

    fn parameters_with_this(&self) -> &[HostType] {
        &self.parameters_with_this
    }

    fn emit(&self, gen: &mut dyn Emitter, swallow_result: bool) {
        emit_argument_casts(gen, &self.parameters_with_this, self.base.parameters_with_this());
        self.base.emit(gen, swallow_result);
    }
}
