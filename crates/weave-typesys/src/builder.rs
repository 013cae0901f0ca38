//! Type building: the part of the facade only emission needs.

use crate::emit::Emitter;
use crate::ty::{HostConstructor, HostField, HostMethod, HostProperty, HostType, Visibility};

/// A type under construction.
///
/// `create_type` consumes the builder, so a finalized type cannot receive
/// further members.
pub trait TypeBuilder {
    /// Handle to the type being built. Usable in signatures before finalization.
    fn host_type(&self) -> HostType;

    fn define_field(&mut self, ty: &HostType, name: &str, is_public: bool, is_static: bool) -> HostField;

    fn add_interface_implementation(&mut self, iface: &HostType);

    #[allow(clippy::too_many_arguments)]
    fn define_method(
        &mut self,
        return_type: &HostType,
        parameters: &[HostType],
        name: &str,
        visibility: Visibility,
        is_static: bool,
        is_interface_impl: bool,
        overrides: Option<&HostMethod>,
    ) -> Box<dyn MethodBuilder>;

    fn define_property(
        &mut self,
        property_type: &HostType,
        name: &str,
        setter: Option<&HostMethod>,
        getter: Option<&HostMethod>,
    ) -> HostProperty;

    fn define_constructor(&mut self, parameters: &[HostType], is_public: bool) -> Box<dyn ConstructorBuilder>;

    fn define_sub_type(&mut self, base: &HostType, name: &str, is_public: bool) -> Box<dyn TypeBuilder>;

    /// A nested delegate type with an `(Object, IntPtr)` constructor and an
    /// `Invoke` method of the given shape.
    fn define_delegate_sub_type(
        &mut self,
        name: &str,
        is_public: bool,
        return_type: &HostType,
        parameters: &[HostType],
    ) -> HostType;

    fn create_type(self: Box<Self>) -> HostType;
}

pub trait MethodBuilder {
    fn method(&self) -> HostMethod;
    fn generator(&mut self) -> &mut dyn Emitter;
}

pub trait ConstructorBuilder {
    fn constructor(&self) -> HostConstructor;
    fn generator(&mut self) -> &mut dyn Emitter;
}
