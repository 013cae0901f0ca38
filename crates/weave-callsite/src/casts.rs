//! Cast adaptation.
//!
//! Arguments for a call are already on the evaluation stack, typed by an
//! earlier pass more loosely than the callee expects. Only the topmost value
//! is reachable, so the casts are applied right to left: each cast value
//! above the lowest mismatching position is parked in a pooled temporary,
//! then the temporaries are reloaded in reverse to restore the original order.

use std::rc::Rc;

use tracing::trace;
use weave_typesys::ty::{HandleId, MethodInfo};
use weave_typesys::{
    CustomAttribute, CustomEmitMethod, Emitter, HostMethod, HostType, PooledLocal, Visibility,
};

use crate::error::SignatureAdaptationError;

/// Cast the suffix of the argument list that needs it.
///
/// `adapted` is what the caller pushed, `actual` is what the callee declares
/// (receiver included for instance calls). Both must have the same length.
/// Returns the number of casts emitted.
pub fn emit_argument_casts(gen: &mut dyn Emitter, adapted: &[HostType], actual: &[HostType]) -> usize {
    debug_assert_eq!(adapted.len(), actual.len());
    // Lowest index whose type differs. Everything from there up gets a cast.
    let Some(first_cast) = adapted.iter().zip(actual).position(|(a, b)| a != b) else {
        return 0;
    };

    let pool = gen.locals_pool();
    let mut stash: Vec<PooledLocal> = Vec::new();
    for c in (first_cast..actual.len()).rev() {
        gen.castclass(&actual[c]);
        if c > first_cast {
            let temp = pool.get_local(&actual[c], gen);
            gen.stloc(temp.local());
            stash.push(temp);
        }
    }
    while let Some(temp) = stash.pop() {
        gen.ldloc(temp.local());
    }

    let casts = actual.len() - first_cast;
    trace!(first_cast, casts, "adapted call arguments");
    casts
}

pub(crate) fn check_arity(
    method: &str,
    expected: usize,
    found: usize,
) -> Result<(), SignatureAdaptationError> {
    if expected == found {
        Ok(())
    } else {
        Err(SignatureAdaptationError {
            method: method.to_string(),
            expected,
            found,
        })
    }
}

/// A plain method handle whose parameter list has been replaced by the
/// caller's view of the arguments.
///
/// The adapted method is static from the call site's point of view: for an
/// instance base method the receiver becomes the first parameter. It shares
/// the base method's id but compares unequal to the base and to any
/// adaptation with a different parameter list.
pub struct MethodWithCasts {
    base: HostMethod,
    base_parameters_with_this: Vec<HostType>,
    parameters: Vec<HostType>,
}

impl MethodWithCasts {
    pub fn new(base: HostMethod, parameters: Vec<HostType>) -> Result<Self, SignatureAdaptationError> {
        let base_parameters_with_this = base.parameters_with_this();
        check_arity(
            &base.to_string(),
            base_parameters_with_this.len(),
            parameters.len(),
        )?;
        Ok(Self {
            base,
            base_parameters_with_this,
            parameters,
        })
    }

    /// Wrap into a method handle usable anywhere a `HostMethod` is expected.
    pub fn into_method(self) -> HostMethod {
        HostMethod::new(Rc::new(self))
    }

    pub fn base(&self) -> &HostMethod {
        &self.base
    }
}

impl MethodInfo for MethodWithCasts {
    fn id(&self) -> HandleId {
        self.base.id()
    }

    fn name(&self) -> &str {
        self.base.name()
    }

    fn declaring_type(&self) -> HostType {
        self.base.declaring_type()
    }

    fn visibility(&self) -> Visibility {
        Visibility::Public
    }

    fn is_static(&self) -> bool {
        true
    }

    fn return_type(&self) -> HostType {
        self.base.return_type()
    }

    fn parameters(&self) -> Vec<HostType> {
        self.parameters.clone()
    }

    fn custom_attributes(&self) -> Vec<CustomAttribute> {
        self.base.custom_attributes()
    }

    fn adapted_parameters(&self) -> Option<&[HostType]> {
        Some(&self.parameters)
    }

    fn custom_emit(&self) -> Option<&dyn CustomEmitMethod> {
        Some(self)
    }
}

impl CustomEmitMethod for MethodWithCasts {
    fn emit_call(&self, gen: &mut dyn Emitter) {
        emit_argument_casts(gen, &self.parameters, &self.base_parameters_with_this);
        gen.emit_call(&self.base, false);
    }
}
