//! Compiler configuration: the active type system and the types the compiler
//! treats specially. Passed by reference everywhere; there is no global copy.

use std::rc::Rc;

use crate::error::TypeResolutionError;
use crate::system::{TypeSystem, TypeSystemExt};
use crate::ty::{HostMethod, HostType};

/// Core runtime types, resolved once per configuration.
#[derive(Clone, Debug)]
pub struct WellKnownTypes {
    pub object: HostType,
    pub string: HostType,
    pub void: HostType,
    pub boolean: HostType,
    pub int32: HostType,
    pub intptr: HostType,
    /// The two-argument function definition (`Func<T, TResult>`).
    pub func_definition: HostType,
}

impl WellKnownTypes {
    pub fn resolve(ts: &dyn TypeSystem) -> Result<Self, TypeResolutionError> {
        Ok(Self {
            object: ts.get_type("System.Object")?,
            string: ts.get_type("System.String")?,
            void: ts.get_type("System.Void")?,
            boolean: ts.get_type("System.Boolean")?,
            int32: ts.get_type("System.Int32")?,
            intptr: ts.get_type("System.IntPtr")?,
            func_definition: ts.get_type("System.Func`2")?,
        })
    }
}

/// Types with a role in the generated code's runtime contract.
#[derive(Clone, Debug)]
pub struct TypeMappings {
    /// The external context handed to generated build methods.
    pub service_provider: HostType,
    /// Service exposing the top-level object of the graph (`RootObject`).
    pub root_object_provider: Option<HostType>,
    /// Runtime context type constructed at the start of every build method.
    pub context_type: HostType,
    /// Called with the enclosing runtime context on every deferred-content
    /// factory: `(Func<SP, Object>, Context) -> Func<SP, Object>`.
    pub deferred_content_customization: Option<HostMethod>,
    /// Properties carrying this attribute receive their content deferred.
    pub deferred_content_attribute: Option<HostType>,
}

#[derive(Clone)]
pub struct CompilerConfig {
    pub type_system: Rc<dyn TypeSystem>,
    pub well_known: WellKnownTypes,
    pub mappings: TypeMappings,
}

impl CompilerConfig {
    pub fn new(type_system: Rc<dyn TypeSystem>, mappings: TypeMappings) -> Result<Self, TypeResolutionError> {
        let well_known = WellKnownTypes::resolve(&*type_system)?;
        Ok(Self {
            type_system,
            well_known,
            mappings,
        })
    }

    /// `Func<ServiceProvider, Object>`, the type of every deferred-content value.
    pub fn deferred_content_type(&self) -> Result<HostType, TypeResolutionError> {
        self.well_known.func_definition.make_generic_type(&[
            self.mappings.service_provider.clone(),
            self.well_known.object.clone(),
        ])
    }
}
