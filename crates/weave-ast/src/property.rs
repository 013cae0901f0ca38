//! Logical property references and the setters that assign them.

use std::fmt;
use std::rc::Rc;

use weave_callsite::{DirectWrappedMethod, SignatureAdaptationError, WrappedMethod, WrappedMethodWithCasts};
use weave_typesys::{CustomAttribute, Emitter, HostMethod, HostProperty, HostType};

/// Knobs that let the setter binder choose between candidate setters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinderParameters {
    /// The setter may be invoked once per value (collection-style adders).
    pub allow_multiple: bool,
    /// `{x:Null}` may be passed.
    pub allow_x_null: bool,
    /// A value that may be null at run time may be passed.
    pub allow_runtime_null: bool,
}

impl Default for BinderParameters {
    fn default() -> Self {
        Self {
            allow_multiple: false,
            allow_x_null: true,
            allow_runtime_null: true,
        }
    }
}

/// One way of storing values into a property.
///
/// At emission the target object sits below the `parameters` on the stack.
pub trait PropertySetter {
    fn target_type(&self) -> HostType;
    fn parameters(&self) -> &[HostType];
    fn binder_parameters(&self) -> &BinderParameters;
    fn emit(&self, gen: &mut dyn Emitter);

    /// This setter seen as taking the looser `parameters`, casting the
    /// values back at emission. `None` when it cannot be adapted.
    fn adapted(&self, _parameters: &[HostType]) -> Option<Rc<dyn PropertySetter>> {
        None
    }
}

impl fmt::Debug for dyn PropertySetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertySetter({}: ", self.target_type())?;
        for (i, p) in self.parameters().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ")")
    }
}

/// A setter that is a plain method call: an instance `set_X(value)` or a
/// static `SetX(target, value)`.
pub struct DirectCallPropertySetter {
    method: HostMethod,
    target_type: HostType,
    parameters: Vec<HostType>,
    binder: BinderParameters,
}

impl DirectCallPropertySetter {
    /// `None` for a static method with no parameters, which has no target.
    pub fn new(method: HostMethod) -> Option<Self> {
        let target_type = method.this_or_first_parameter()?;
        let parameters = method.parameters_with_this().into_iter().skip(1).collect();
        Some(Self {
            method,
            target_type,
            parameters,
            binder: BinderParameters::default(),
        })
    }

    pub fn with_binder(mut self, binder: BinderParameters) -> Self {
        self.binder = binder;
        self
    }

    pub fn method(&self) -> &HostMethod {
        &self.method
    }

    /// Present this setter as taking `parameters` instead of the declared
    /// ones. Arity must match.
    pub fn with_parameters(
        &self,
        parameters: Vec<HostType>,
    ) -> Result<AdaptedPropertySetter, SignatureAdaptationError> {
        let mut with_this = Vec::with_capacity(parameters.len() + 1);
        with_this.push(self.target_type.clone());
        with_this.extend(parameters.iter().cloned());
        let call = WrappedMethodWithCasts::new(Rc::new(DirectWrappedMethod::new(self.method.clone())), with_this)?;
        Ok(AdaptedPropertySetter {
            target_type: self.target_type.clone(),
            parameters,
            binder: self.binder.clone(),
            call,
        })
    }
}

impl PropertySetter for DirectCallPropertySetter {
    fn target_type(&self) -> HostType {
        self.target_type.clone()
    }

    fn parameters(&self) -> &[HostType] {
        &self.parameters
    }

    fn binder_parameters(&self) -> &BinderParameters {
        &self.binder
    }

    fn emit(&self, gen: &mut dyn Emitter) {
        gen.emit_call(&self.method, true);
    }

    fn adapted(&self, parameters: &[HostType]) -> Option<Rc<dyn PropertySetter>> {
        let setter = self.with_parameters(parameters.to_vec()).ok()?;
        Some(Rc::new(setter))
    }
}

/// A direct setter whose values arrive typed more loosely than it declares,
/// for example a markup extension returning `Object` into a `String`
/// property. Emission casts the values down before the call.
pub struct AdaptedPropertySetter {
    target_type: HostType,
    parameters: Vec<HostType>,
    binder: BinderParameters,
    call: WrappedMethodWithCasts,
}

impl PropertySetter for AdaptedPropertySetter {
    fn target_type(&self) -> HostType {
        self.target_type.clone()
    }

    fn parameters(&self) -> &[HostType] {
        &self.parameters
    }

    fn binder_parameters(&self) -> &BinderParameters {
        &self.binder
    }

    fn emit(&self, gen: &mut dyn Emitter) {
        self.call.emit(gen, true);
    }
}

/// A property as the compiler sees it: a name on a type with an optional
/// getter and any number of setters.
#[derive(Clone)]
pub struct ClrProperty {
    pub name: String,
    pub declaring_type: HostType,
    pub getter: Option<HostMethod>,
    pub setters: Vec<Rc<dyn PropertySetter>>,
    pub custom_attributes: Vec<CustomAttribute>,
}

impl ClrProperty {
    pub fn new(
        name: impl Into<String>,
        declaring_type: HostType,
        getter: Option<HostMethod>,
        setters: Vec<Rc<dyn PropertySetter>>,
    ) -> Self {
        Self {
            name: name.into(),
            declaring_type,
            getter,
            setters,
            custom_attributes: Vec::new(),
        }
    }

    pub fn from_host(property: &HostProperty) -> Self {
        let setters = property
            .setter()
            .and_then(DirectCallPropertySetter::new)
            .map(|s| Rc::new(s) as Rc<dyn PropertySetter>)
            .into_iter()
            .collect();
        Self {
            name: property.name().to_string(),
            declaring_type: property.declaring_type(),
            getter: property.getter(),
            setters,
            custom_attributes: property.custom_attributes(),
        }
    }

    /// Usable as an assignment target only with a getter or a setter.
    pub fn is_usable(&self) -> bool {
        self.getter.is_some() || !self.setters.is_empty()
    }

    pub fn property_type(&self) -> Option<HostType> {
        self.getter
            .as_ref()
            .map(|g| g.return_type())
            .or_else(|| self.setters.first().and_then(|s| s.parameters().last().cloned()))
    }
}

impl fmt::Display for ClrProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_type.fqn(), self.name)
    }
}

impl fmt::Debug for ClrProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClrProperty")
            .field("name", &self.name)
            .field("declaring_type", &self.declaring_type)
            .field("getter", &self.getter)
            .field("setters", &self.setters)
            .finish()
    }
}

/// The property a `PropertyValue` node targets: a bare name from markup, or
/// an already resolved property.
#[derive(Clone, Debug)]
pub enum PropertyRef {
    Named(String),
    Clr(ClrProperty),
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_typesys::memory::MemoryTypeSystem;

    #[test]
    fn from_host_property_builds_a_direct_setter() {
        let (ts, core) = MemoryTypeSystem::with_core_types();
        let ui = ts.assembly("Ui");
        let button = ui.class("Ui", "Button");
        let content = button.add_property("Content", &core.object);

        let prop = ClrProperty::from_host(&content);
        assert!(prop.is_usable());
        assert_eq!(prop.setters.len(), 1);
        assert_eq!(prop.setters[0].target_type(), button.ty());
        assert_eq!(prop.setters[0].parameters(), &[core.object.clone()]);
        assert_eq!(prop.property_type(), Some(core.object.clone()));
        assert_eq!(prop.to_string(), "Ui:Ui.Button.Content");
    }

    #[test]
    fn static_setters_target_their_first_parameter() {
        let (ts, core) = MemoryTypeSystem::with_core_types();
        let ui = ts.assembly("Ui");
        let grid = ui.class("Ui", "Grid");
        let control = ui.class("Ui", "Control");
        let set_row = grid.add_static_method("SetRow", &core.void, &[control.ty(), core.int32.clone()]);

        let setter = DirectCallPropertySetter::new(set_row).unwrap();
        assert_eq!(setter.target_type(), control.ty());
        assert_eq!(setter.parameters(), &[core.int32.clone()]);
        assert_eq!(setter.binder_parameters(), &BinderParameters::default());

        let reset = grid.add_static_method("Reset", &core.void, &[]);
        assert!(DirectCallPropertySetter::new(reset).is_none());
    }

    #[test]
    fn adapted_setters_cast_values_back_down() {
        use weave_typesys::RecordingEmitter;

        let (ts, core) = MemoryTypeSystem::with_core_types();
        let ui = ts.assembly("Ui");
        let batch = ui.class("Ui", "Batch");
        let title = batch.add_property("Title", &core.string);

        let prop = ClrProperty::from_host(&title);
        let adapted = prop.setters[0].adapted(&[core.object.clone()]).unwrap();
        assert_eq!(adapted.target_type(), batch.ty());
        assert_eq!(adapted.parameters(), &[core.object.clone()]);

        let mut gen = RecordingEmitter::new();
        adapted.emit(&mut gen);
        insta::assert_snapshot!(gen.listing(), @r"
        castclass System.String
        call Ui.Batch::set_Title
        ");

        assert!(prop.setters[0].adapted(&[core.object.clone(), core.object.clone()]).is_none());
    }

    #[test]
    fn read_only_and_empty_properties() {
        let (ts, core) = MemoryTypeSystem::with_core_types();
        let ui = ts.assembly("Ui");
        let panel = ui.class("Ui", "Panel");
        let children = panel.add_property_full("Children", &core.object, true, false, Vec::new());

        let prop = ClrProperty::from_host(&children);
        assert!(prop.setters.is_empty());
        assert!(prop.is_usable());

        let empty = ClrProperty::new("Ghost", panel.ty(), None, Vec::new());
        assert!(!empty.is_usable());
        assert_eq!(empty.property_type(), None);
    }
}
