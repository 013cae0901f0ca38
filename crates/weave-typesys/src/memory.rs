//! In-memory reference backend.
//!
//! Types are described programmatically through [`AssemblyDef`] and
//! [`TypeDef`]. Generic instantiations and array types are created on demand
//! and cached on their definition. [`MemoryTypeBuilder`] implements the
//! builder capability; the bodies it records can be read back as listings.
//!
//! Links that point "up" (member to declaring type, instance to definition,
//! array to element, type to assembly) are weak. The [`MemoryTypeSystem`]
//! owns the assemblies, and the assemblies own their types.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use crate::builder::{ConstructorBuilder, MethodBuilder, TypeBuilder};
use crate::config::WellKnownTypes;
use crate::emit::{listing, Emitter, Instr, RecordingEmitter};
use crate::error::TypeResolutionError;
use crate::pseudo::PseudoType;
use crate::system::TypeSystem;
use crate::ty::{
    AssemblyInfo, AttributeInfo, ConstValue, ConstructorInfo, CustomAttribute, EventInfo,
    FieldInfo, HandleId, HostAssembly, HostConstructor, HostEvent, HostField, HostMethod,
    HostProperty, HostType, MethodInfo, PropertyInfo, TypeInfo, Visibility,
};

type Body = Rc<RefCell<Vec<Instr>>>;

// ── Registry ───────────────────────────────────────────────────────────

#[derive(Default)]
struct Registry {
    next_id: Cell<u64>,
    assemblies: RefCell<Vec<Rc<MemoryAssembly>>>,
    root_object: RefCell<Option<HostType>>,
    void: RefCell<Option<HostType>>,
    bodies: RefCell<FxHashMap<HandleId, Body>>,
    created: RefCell<Vec<HostType>>,
}

impl Registry {
    fn next_id(&self) -> HandleId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        HandleId(id)
    }

    fn void_type(&self) -> HostType {
        self.void.borrow().clone().unwrap_or_else(PseudoType::unknown)
    }

    fn object_type(&self) -> HostType {
        self.root_object
            .borrow()
            .clone()
            .unwrap_or_else(PseudoType::unknown)
    }
}

/// The in-memory type system. Cloning shares the same registry.
#[derive(Clone, Default)]
pub struct MemoryTypeSystem {
    registry: Rc<Registry>,
}

/// Handles to the core types registered by [`MemoryTypeSystem::with_core_types`].
#[derive(Clone)]
pub struct CoreTypes {
    pub object: HostType,
    pub string: HostType,
    pub void: HostType,
    pub boolean: HostType,
    pub int32: HostType,
    pub intptr: HostType,
    pub type_: HostType,
    pub nullable: HostType,
    pub func: HostType,
    pub service_provider: HostType,
    pub get_service: HostMethod,
    /// The `System` assembly, for tests that want to add more core types.
    pub system: AssemblyDef,
}

impl CoreTypes {
    pub fn well_known(&self) -> WellKnownTypes {
        WellKnownTypes {
            object: self.object.clone(),
            string: self.string.clone(),
            void: self.void.clone(),
            boolean: self.boolean.clone(),
            int32: self.int32.clone(),
            intptr: self.intptr.clone(),
            func_definition: self.func.clone(),
        }
    }
}

impl MemoryTypeSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// A type system with a `System` assembly holding the runtime core:
    /// `Object`, `String`, `Void`, `Boolean`, `Int32`, `IntPtr`, `Type`,
    /// ``Nullable`1``, ``Func`2`` and `IServiceProvider`.
    pub fn with_core_types() -> (Self, CoreTypes) {
        let ts = Self::new();
        let system = ts.assembly("System");

        let object = system.define_type("System", "Object", TypeKind::Class);
        *ts.registry.root_object.borrow_mut() = Some(object.ty());
        let void = system.define_type("System", "Void", TypeKind::Void);
        *ts.registry.void.borrow_mut() = Some(void.ty());

        let string = system.class("System", "String");
        let boolean = system.define_type("System", "Boolean", TypeKind::Struct);
        let int32 = system.define_type("System", "Int32", TypeKind::Struct);
        let intptr = system.define_type("System", "IntPtr", TypeKind::Struct);
        let type_ = system.class("System", "Type");

        let nullable = system.generic_type("System", "Nullable`1", TypeKind::Struct, &["T"]);
        nullable.mark_nullable_wrapper();
        let t = nullable.generic_parameters()[0].clone();
        nullable.add_constructor(&[t.clone()]);
        nullable.add_property_full("Value", &t, true, false, Vec::new());
        nullable.add_property_full("HasValue", &boolean.ty(), true, false, Vec::new());

        let func = system.generic_type("System", "Func`2", TypeKind::Class, &["T", "TResult"]);
        let params = func.generic_parameters();
        func.add_constructor(&[object.ty(), intptr.ty()]);
        func.add_method("Invoke", &params[1], &[params[0].clone()]);

        let service_provider = system.define_type("System", "IServiceProvider", TypeKind::Interface);
        let get_service = service_provider.add_method("GetService", &object.ty(), &[type_.ty()]);

        let core = CoreTypes {
            object: object.ty(),
            string: string.ty(),
            void: void.ty(),
            boolean: boolean.ty(),
            int32: int32.ty(),
            intptr: intptr.ty(),
            type_: type_.ty(),
            nullable: nullable.ty(),
            func: func.ty(),
            service_provider: service_provider.ty(),
            get_service,
            system,
        };
        (ts, core)
    }

    /// Create a new, empty assembly.
    pub fn assembly(&self, name: &str) -> AssemblyDef {
        let asm = Rc::new(MemoryAssembly {
            id: self.registry.next_id(),
            name: name.to_string(),
            types: RefCell::new(Vec::new()),
            attributes: RefCell::new(Vec::new()),
        });
        self.registry.assemblies.borrow_mut().push(asm.clone());
        AssemblyDef {
            asm,
            registry: self.registry.clone(),
        }
    }

    /// A custom attribute instance of `attribute_type`.
    pub fn attribute(&self, attribute_type: &HostType, arguments: Vec<ConstValue>, inherited: bool) -> CustomAttribute {
        CustomAttribute::new(Rc::new(MemoryAttribute {
            id: self.registry.next_id(),
            ty: attribute_type.clone(),
            arguments,
            inherited,
        }))
    }

    /// A new type under construction in `assembly`. It becomes visible to
    /// lookups once `create_type` is called.
    pub fn define_dynamic_type(
        &self,
        assembly: &AssemblyDef,
        namespace: &str,
        name: &str,
        base: &HostType,
    ) -> Box<dyn TypeBuilder> {
        let def = TypeDef::new(
            &self.registry,
            name,
            Some(namespace),
            Rc::downgrade(&assembly.asm),
            TypeKind::Class,
            true,
        );
        def.set_base(base);
        Box::new(MemoryTypeBuilder {
            def,
            assembly: Rc::downgrade(&assembly.asm),
            registry: self.registry.clone(),
        })
    }

    /// Instructions recorded for a method defined through a builder.
    pub fn method_body(&self, method: &HostMethod) -> Option<Vec<Instr>> {
        self.body(method.id())
    }

    pub fn constructor_body(&self, ctor: &HostConstructor) -> Option<Vec<Instr>> {
        self.body(ctor.id())
    }

    pub fn method_listing(&self, method: &HostMethod) -> Option<String> {
        self.method_body(method).map(|body| listing(&body))
    }

    fn body(&self, id: HandleId) -> Option<Vec<Instr>> {
        self.registry
            .bodies
            .borrow()
            .get(&id)
            .map(|b| b.borrow().clone())
    }

    /// Types finalized through `create_type`, in creation order.
    pub fn created_types(&self) -> Vec<HostType> {
        self.registry.created.borrow().clone()
    }
}

impl TypeSystem for MemoryTypeSystem {
    fn assemblies(&self) -> Vec<HostAssembly> {
        self.registry
            .assemblies
            .borrow()
            .iter()
            .map(|a| HostAssembly::new(a.clone()))
            .collect()
    }

    fn find_type(&self, name: &str) -> Option<HostType> {
        self.registry
            .assemblies
            .borrow()
            .iter()
            .find_map(|a| a.find_type(name))
    }
}

// ── Assemblies ─────────────────────────────────────────────────────────

pub struct MemoryAssembly {
    id: HandleId,
    name: String,
    types: RefCell<Vec<HostType>>,
    attributes: RefCell<Vec<CustomAttribute>>,
}

impl AssemblyInfo for MemoryAssembly {
    fn id(&self) -> HandleId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn custom_attributes(&self) -> Vec<CustomAttribute> {
        self.attributes.borrow().clone()
    }

    fn find_type(&self, full_name: &str) -> Option<HostType> {
        self.types
            .borrow()
            .iter()
            .find(|t| t.qualified_name() == full_name)
            .cloned()
    }
}

/// Handle used to populate an assembly.
#[derive(Clone)]
pub struct AssemblyDef {
    asm: Rc<MemoryAssembly>,
    registry: Rc<Registry>,
}

impl AssemblyDef {
    pub fn handle(&self) -> HostAssembly {
        HostAssembly::new(self.asm.clone())
    }

    pub fn define_type(&self, namespace: &str, name: &str, kind: TypeKind) -> TypeDef {
        let def = TypeDef::new(
            &self.registry,
            name,
            Some(namespace),
            Rc::downgrade(&self.asm),
            kind,
            true,
        );
        self.asm.types.borrow_mut().push(def.ty());
        def
    }

    /// A public class deriving from the root object when one is registered.
    pub fn class(&self, namespace: &str, name: &str) -> TypeDef {
        let def = self.define_type(namespace, name, TypeKind::Class);
        if let Some(root) = self.registry.root_object.borrow().as_ref() {
            def.set_base(root);
        }
        def
    }

    pub fn interface(&self, namespace: &str, name: &str) -> TypeDef {
        self.define_type(namespace, name, TypeKind::Interface)
    }

    /// A generic definition with one generic parameter per entry in `params`.
    pub fn generic_type(&self, namespace: &str, name: &str, kind: TypeKind, params: &[&str]) -> TypeDef {
        let def = if kind == TypeKind::Class {
            self.class(namespace, name)
        } else {
            self.define_type(namespace, name, kind)
        };
        let parameters: Vec<HostType> = params
            .iter()
            .map(|p| {
                let param = TypeDef::new(
                    &self.registry,
                    p,
                    None,
                    Rc::downgrade(&self.asm),
                    TypeKind::GenericParameter,
                    true,
                );
                param.data().declaring = Some(Rc::downgrade(&def.rc));
                param.ty()
            })
            .collect();
        def.data().generic_parameters = parameters;
        def
    }

    pub fn add_attribute(&self, attribute: CustomAttribute) {
        self.asm.attributes.borrow_mut().push(attribute);
    }
}

// ── Types ──────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    Enum,
    Void,
    GenericParameter,
}

#[derive(Default)]
struct TypeData {
    base: Option<HostType>,
    interfaces: Vec<HostType>,
    methods: Vec<HostMethod>,
    constructors: Vec<HostConstructor>,
    properties: Vec<HostProperty>,
    fields: Vec<HostField>,
    events: Vec<HostEvent>,
    attributes: Vec<CustomAttribute>,
    generic_parameters: Vec<HostType>,
    generic_arguments: Vec<HostType>,
    definition: Option<Weak<MemoryType>>,
    declaring: Option<Weak<MemoryType>>,
    element: Option<(Weak<MemoryType>, u32)>,
    instances: FxHashMap<Vec<HandleId>, HostType>,
    arrays: FxHashMap<u32, HostType>,
    nullable_wrapper: bool,
}

pub struct MemoryType {
    id: HandleId,
    this: Weak<MemoryType>,
    registry: Weak<Registry>,
    name: String,
    namespace: Option<String>,
    assembly: Weak<MemoryAssembly>,
    kind: TypeKind,
    is_public: bool,
    data: RefCell<TypeData>,
}

fn upgrade(weak: &Weak<MemoryType>) -> Option<HostType> {
    weak.upgrade().map(|rc| HostType::new(rc))
}

fn declaring(weak: &Weak<MemoryType>) -> HostType {
    upgrade(weak).unwrap_or_else(PseudoType::unknown)
}

impl MemoryType {
    fn handle(&self) -> HostType {
        upgrade(&self.this).unwrap_or_else(PseudoType::unknown)
    }

    fn substitute(&self, ty: &HostType, arguments: &[HostType]) -> HostType {
        let data = self.data.borrow();
        match data.generic_parameters.iter().position(|p| p == ty) {
            Some(i) => arguments.get(i).cloned().unwrap_or_else(|| ty.clone()),
            None => ty.clone(),
        }
    }

    fn is_root_object(&self, registry: &Registry) -> bool {
        registry
            .root_object
            .borrow()
            .as_ref()
            .is_some_and(|root| root.id() == self.id)
    }

    fn instantiate(&self, arguments: &[HostType]) -> Result<HostType, TypeResolutionError> {
        let registry = self.registry.upgrade().ok_or_else(|| TypeResolutionError::Unsupported {
            operation: "generic instantiation",
            subject: self.name.clone(),
        })?;
        let names: Vec<String> = arguments.iter().map(|a| a.qualified_name()).collect();
        let instance = TypeDef::new(
            &registry,
            &format!("{}<{}>", self.name, names.join(", ")),
            self.namespace.as_deref(),
            self.assembly.clone(),
            self.kind,
            self.is_public,
        );
        let this_ty = instance.ty();
        let (base, interfaces, ctors, methods) = {
            let data = self.data.borrow();
            (
                data.base.clone(),
                data.interfaces.clone(),
                data.constructors.clone(),
                data.methods.clone(),
            )
        };
        let ctors: Vec<HostConstructor> = ctors
            .iter()
            .map(|c| {
                HostConstructor::new(Rc::new(MemoryConstructor {
                    id: registry.next_id(),
                    declaring: Rc::downgrade(&instance.rc),
                    is_public: c.is_public(),
                    is_static: c.is_static(),
                    parameters: c.parameters().iter().map(|p| self.substitute(p, arguments)).collect(),
                }))
            })
            .collect();
        let methods: Vec<HostMethod> = methods
            .iter()
            .map(|m| {
                HostMethod::new(Rc::new(MemoryMethod {
                    id: registry.next_id(),
                    name: m.name().to_string(),
                    declaring: Rc::downgrade(&instance.rc),
                    visibility: m.visibility(),
                    is_static: m.is_static(),
                    return_type: self.substitute(&m.return_type(), arguments),
                    parameters: m.parameters().iter().map(|p| self.substitute(p, arguments)).collect(),
                }))
            })
            .collect();
        {
            let mut data = instance.data();
            data.base = base;
            data.interfaces = interfaces;
            data.constructors = ctors;
            data.methods = methods;
            data.generic_arguments = arguments.to_vec();
            data.definition = Some(self.this.clone());
        }
        Ok(this_ty)
    }
}

impl TypeInfo for MemoryType {
    fn id(&self) -> HandleId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    fn assembly(&self) -> Option<HostAssembly> {
        self.assembly
            .upgrade()
            .map(|a| HostAssembly::new(a as Rc<dyn AssemblyInfo>))
    }

    fn is_public(&self) -> bool {
        self.is_public
    }

    fn properties(&self) -> Vec<HostProperty> {
        self.data.borrow().properties.clone()
    }

    fn events(&self) -> Vec<HostEvent> {
        self.data.borrow().events.clone()
    }

    fn fields(&self) -> Vec<HostField> {
        self.data.borrow().fields.clone()
    }

    fn methods(&self) -> Vec<HostMethod> {
        self.data.borrow().methods.clone()
    }

    fn constructors(&self) -> Vec<HostConstructor> {
        self.data.borrow().constructors.clone()
    }

    fn custom_attributes(&self) -> Vec<CustomAttribute> {
        self.data.borrow().attributes.clone()
    }

    fn generic_arguments(&self) -> Vec<HostType> {
        self.data.borrow().generic_arguments.clone()
    }

    fn generic_parameters(&self) -> Vec<HostType> {
        self.data.borrow().generic_parameters.clone()
    }

    fn generic_type_definition(&self) -> Option<HostType> {
        self.data.borrow().definition.as_ref().and_then(upgrade)
    }

    fn make_generic_type(&self, arguments: &[HostType]) -> Result<HostType, TypeResolutionError> {
        let arity = self.data.borrow().generic_parameters.len();
        if arity == 0 || arity != arguments.len() {
            return Err(TypeResolutionError::Unsupported {
                operation: "generic instantiation with these arguments",
                subject: self.name.clone(),
            });
        }
        let key: Vec<HandleId> = arguments.iter().map(|a| a.id()).collect();
        if let Some(cached) = self.data.borrow().instances.get(&key) {
            return Ok(cached.clone());
        }
        let instance = self.instantiate(arguments)?;
        self.data.borrow_mut().instances.insert(key, instance.clone());
        Ok(instance)
    }

    fn is_array(&self) -> bool {
        self.data.borrow().element.is_some()
    }

    fn array_element_type(&self) -> Option<HostType> {
        self.data.borrow().element.as_ref().and_then(|(e, _)| upgrade(e))
    }

    fn make_array_type(&self, dimensions: u32) -> Result<HostType, TypeResolutionError> {
        if let Some(cached) = self.data.borrow().arrays.get(&dimensions) {
            return Ok(cached.clone());
        }
        let registry = self.registry.upgrade().ok_or_else(|| TypeResolutionError::Unsupported {
            operation: "array construction",
            subject: self.name.clone(),
        })?;
        let rank = ",".repeat(dimensions.saturating_sub(1) as usize);
        let array = TypeDef::new(
            &registry,
            &format!("{}[{}]", self.name, rank),
            self.namespace.as_deref(),
            self.assembly.clone(),
            TypeKind::Class,
            self.is_public,
        );
        {
            let mut data = array.data();
            data.base = registry.root_object.borrow().clone();
            data.element = Some((self.this.clone(), dimensions));
        }
        let ty = array.ty();
        self.data.borrow_mut().arrays.insert(dimensions, ty.clone());
        Ok(ty)
    }

    fn base_type(&self) -> Option<HostType> {
        self.data.borrow().base.clone()
    }

    fn declaring_type(&self) -> Option<HostType> {
        self.data.borrow().declaring.as_ref().and_then(upgrade)
    }

    fn interfaces(&self) -> Vec<HostType> {
        self.data.borrow().interfaces.clone()
    }

    fn is_value_type(&self) -> bool {
        matches!(self.kind, TypeKind::Struct | TypeKind::Enum)
    }

    fn is_enum(&self) -> bool {
        self.kind == TypeKind::Enum
    }

    fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    fn is_void(&self) -> bool {
        self.kind == TypeKind::Void
    }

    fn is_nullable_wrapper(&self) -> bool {
        self.data.borrow().nullable_wrapper
    }

    fn is_assignable_from(&self, candidate: &HostType) -> bool {
        if candidate.id() == self.id {
            return true;
        }
        if candidate.is_pseudo() || self.kind == TypeKind::GenericParameter {
            return false;
        }
        if let Some(registry) = self.registry.upgrade() {
            if self.is_root_object(&registry) {
                return true;
            }
        }
        if candidate.self_and_bases().iter().any(|t| t.id() == self.id) {
            return true;
        }
        if self.kind == TypeKind::Interface && candidate.all_interfaces().iter().any(|i| i.id() == self.id) {
            return true;
        }
        let handle = self.handle();
        if handle.is_nullable() {
            return handle.generic_arguments().first() == Some(candidate);
        }
        // Reference-type arrays are covariant.
        if let (Some(elem), Some(other)) = (self.array_element_type(), candidate.array_element_type()) {
            return !other.is_value_type() && elem.is_assignable_from(&other);
        }
        false
    }
}

/// Handle used to populate a type.
#[derive(Clone)]
pub struct TypeDef {
    rc: Rc<MemoryType>,
    registry: Rc<Registry>,
}

impl TypeDef {
    fn new(
        registry: &Rc<Registry>,
        name: &str,
        namespace: Option<&str>,
        assembly: Weak<MemoryAssembly>,
        kind: TypeKind,
        is_public: bool,
    ) -> Self {
        let id = registry.next_id();
        let rc = Rc::new_cyclic(|this| MemoryType {
            id,
            this: this.clone(),
            registry: Rc::downgrade(registry),
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
            assembly,
            kind,
            is_public,
            data: RefCell::new(TypeData::default()),
        });
        Self {
            rc,
            registry: registry.clone(),
        }
    }

    fn data(&self) -> std::cell::RefMut<'_, TypeData> {
        self.rc.data.borrow_mut()
    }

    pub fn ty(&self) -> HostType {
        HostType::new(self.rc.clone())
    }

    pub fn set_base(&self, base: &HostType) -> &Self {
        self.data().base = Some(base.clone());
        self
    }

    pub fn add_interface(&self, iface: &HostType) -> &Self {
        self.data().interfaces.push(iface.clone());
        self
    }

    /// Mark this generic definition as the backend's nullable wrapper.
    pub fn mark_nullable_wrapper(&self) -> &Self {
        self.data().nullable_wrapper = true;
        self
    }

    pub fn set_declaring_type(&self, outer: &TypeDef) -> &Self {
        self.data().declaring = Some(Rc::downgrade(&outer.rc));
        self
    }

    pub fn generic_parameters(&self) -> Vec<HostType> {
        self.rc.generic_parameters()
    }

    /// A public instance method.
    pub fn add_method(&self, name: &str, return_type: &HostType, parameters: &[HostType]) -> HostMethod {
        self.add_method_full(name, return_type, parameters, Visibility::Public, false)
    }

    pub fn add_static_method(&self, name: &str, return_type: &HostType, parameters: &[HostType]) -> HostMethod {
        self.add_method_full(name, return_type, parameters, Visibility::Public, true)
    }

    pub fn add_method_full(
        &self,
        name: &str,
        return_type: &HostType,
        parameters: &[HostType],
        visibility: Visibility,
        is_static: bool,
    ) -> HostMethod {
        let method = HostMethod::new(Rc::new(MemoryMethod {
            id: self.registry.next_id(),
            name: name.to_string(),
            declaring: Rc::downgrade(&self.rc),
            visibility,
            is_static,
            return_type: return_type.clone(),
            parameters: parameters.to_vec(),
        }));
        self.data().methods.push(method.clone());
        method
    }

    /// A public instance constructor.
    pub fn add_constructor(&self, parameters: &[HostType]) -> HostConstructor {
        self.add_constructor_with(parameters, true, false)
    }

    pub fn add_constructor_with(&self, parameters: &[HostType], is_public: bool, is_static: bool) -> HostConstructor {
        let ctor = HostConstructor::new(Rc::new(MemoryConstructor {
            id: self.registry.next_id(),
            declaring: Rc::downgrade(&self.rc),
            is_public,
            is_static,
            parameters: parameters.to_vec(),
        }));
        self.data().constructors.push(ctor.clone());
        ctor
    }

    /// A read-write property with `get_<name>` and `set_<name>` accessors.
    pub fn add_property(&self, name: &str, ty: &HostType) -> HostProperty {
        self.add_property_full(name, ty, true, true, Vec::new())
    }

    pub fn add_property_full(
        &self,
        name: &str,
        ty: &HostType,
        has_getter: bool,
        has_setter: bool,
        attributes: Vec<CustomAttribute>,
    ) -> HostProperty {
        let getter = has_getter.then(|| self.add_method(&format!("get_{}", name), ty, &[]));
        let setter = has_setter
            .then(|| self.add_method(&format!("set_{}", name), &self.registry.void_type(), &[ty.clone()]));
        let property = HostProperty::new(Rc::new(MemoryProperty {
            id: self.registry.next_id(),
            name: name.to_string(),
            declaring: Rc::downgrade(&self.rc),
            ty: ty.clone(),
            getter,
            setter,
            attributes,
        }));
        self.data().properties.push(property.clone());
        property
    }

    /// A public field.
    pub fn add_field(&self, name: &str, ty: &HostType, is_static: bool) -> HostField {
        self.push_field(name, ty, true, is_static, None)
    }

    pub fn add_literal_field(&self, name: &str, ty: &HostType, value: ConstValue) -> HostField {
        self.push_field(name, ty, true, true, Some(value))
    }

    fn push_field(
        &self,
        name: &str,
        ty: &HostType,
        is_public: bool,
        is_static: bool,
        literal: Option<ConstValue>,
    ) -> HostField {
        let field = HostField::new(Rc::new(MemoryField {
            id: self.registry.next_id(),
            name: name.to_string(),
            declaring: Rc::downgrade(&self.rc),
            ty: ty.clone(),
            is_public,
            is_static,
            literal,
        }));
        self.data().fields.push(field.clone());
        field
    }

    /// An event with an `add_<name>(handler)` accessor.
    pub fn add_event(&self, name: &str, handler: &HostType) -> HostEvent {
        let add = self.add_method(&format!("add_{}", name), &self.registry.void_type(), &[handler.clone()]);
        let event = HostEvent::new(Rc::new(MemoryEvent {
            id: self.registry.next_id(),
            name: name.to_string(),
            declaring: Rc::downgrade(&self.rc),
            add_method: add,
        }));
        self.data().events.push(event.clone());
        event
    }

    pub fn add_attribute(&self, attribute: CustomAttribute) -> &Self {
        self.data().attributes.push(attribute);
        self
    }
}

// ── Members ────────────────────────────────────────────────────────────

struct MemoryMethod {
    id: HandleId,
    name: String,
    declaring: Weak<MemoryType>,
    visibility: Visibility,
    is_static: bool,
    return_type: HostType,
    parameters: Vec<HostType>,
}

impl MethodInfo for MemoryMethod {
    fn id(&self) -> HandleId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn declaring_type(&self) -> HostType {
        declaring(&self.declaring)
    }

    fn visibility(&self) -> Visibility {
        self.visibility
    }

    fn is_static(&self) -> bool {
        self.is_static
    }

    fn return_type(&self) -> HostType {
        self.return_type.clone()
    }

    fn parameters(&self) -> Vec<HostType> {
        self.parameters.clone()
    }
}

struct MemoryConstructor {
    id: HandleId,
    declaring: Weak<MemoryType>,
    is_public: bool,
    is_static: bool,
    parameters: Vec<HostType>,
}

impl ConstructorInfo for MemoryConstructor {
    fn id(&self) -> HandleId {
        self.id
    }

    fn declaring_type(&self) -> HostType {
        declaring(&self.declaring)
    }

    fn is_public(&self) -> bool {
        self.is_public
    }

    fn is_static(&self) -> bool {
        self.is_static
    }

    fn parameters(&self) -> Vec<HostType> {
        self.parameters.clone()
    }
}

struct MemoryProperty {
    id: HandleId,
    name: String,
    declaring: Weak<MemoryType>,
    ty: HostType,
    getter: Option<HostMethod>,
    setter: Option<HostMethod>,
    attributes: Vec<CustomAttribute>,
}

impl PropertyInfo for MemoryProperty {
    fn id(&self) -> HandleId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn declaring_type(&self) -> HostType {
        declaring(&self.declaring)
    }

    fn property_type(&self) -> HostType {
        self.ty.clone()
    }

    fn getter(&self) -> Option<HostMethod> {
        self.getter.clone()
    }

    fn setter(&self) -> Option<HostMethod> {
        self.setter.clone()
    }

    fn custom_attributes(&self) -> Vec<CustomAttribute> {
        self.attributes.clone()
    }
}

struct MemoryField {
    id: HandleId,
    name: String,
    declaring: Weak<MemoryType>,
    ty: HostType,
    is_public: bool,
    is_static: bool,
    literal: Option<ConstValue>,
}

impl FieldInfo for MemoryField {
    fn id(&self) -> HandleId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn declaring_type(&self) -> HostType {
        declaring(&self.declaring)
    }

    fn field_type(&self) -> HostType {
        self.ty.clone()
    }

    fn is_public(&self) -> bool {
        self.is_public
    }

    fn is_static(&self) -> bool {
        self.is_static
    }

    fn is_literal(&self) -> bool {
        self.literal.is_some()
    }

    fn literal_value(&self) -> Option<ConstValue> {
        self.literal.clone()
    }
}

struct MemoryEvent {
    id: HandleId,
    name: String,
    declaring: Weak<MemoryType>,
    add_method: HostMethod,
}

impl EventInfo for MemoryEvent {
    fn id(&self) -> HandleId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn declaring_type(&self) -> HostType {
        declaring(&self.declaring)
    }

    fn add_method(&self) -> Option<HostMethod> {
        Some(self.add_method.clone())
    }
}

struct MemoryAttribute {
    id: HandleId,
    ty: HostType,
    arguments: Vec<ConstValue>,
    inherited: bool,
}

impl AttributeInfo for MemoryAttribute {
    fn id(&self) -> HandleId {
        self.id
    }

    fn attribute_type(&self) -> HostType {
        self.ty.clone()
    }

    fn arguments(&self) -> Vec<ConstValue> {
        self.arguments.clone()
    }

    fn is_inherited(&self) -> bool {
        self.inherited
    }
}

// ── Builders ───────────────────────────────────────────────────────────

pub struct MemoryTypeBuilder {
    def: TypeDef,
    assembly: Weak<MemoryAssembly>,
    registry: Rc<Registry>,
}

impl MemoryTypeBuilder {
    fn body(&self, id: HandleId) -> RecordingEmitter {
        let body: Body = Rc::default();
        self.registry.bodies.borrow_mut().insert(id, body.clone());
        RecordingEmitter::with_body(body)
    }
}

impl TypeBuilder for MemoryTypeBuilder {
    fn host_type(&self) -> HostType {
        self.def.ty()
    }

    fn define_field(&mut self, ty: &HostType, name: &str, is_public: bool, is_static: bool) -> HostField {
        self.def.push_field(name, ty, is_public, is_static, None)
    }

    fn add_interface_implementation(&mut self, iface: &HostType) {
        self.def.add_interface(iface);
    }

    fn define_method(
        &mut self,
        return_type: &HostType,
        parameters: &[HostType],
        name: &str,
        visibility: Visibility,
        is_static: bool,
        _is_interface_impl: bool,
        _overrides: Option<&HostMethod>,
    ) -> Box<dyn MethodBuilder> {
        let method = self
            .def
            .add_method_full(name, return_type, parameters, visibility, is_static);
        let gen = self.body(method.id());
        Box::new(MemoryMethodBuilder { method, gen })
    }

    fn define_property(
        &mut self,
        property_type: &HostType,
        name: &str,
        setter: Option<&HostMethod>,
        getter: Option<&HostMethod>,
    ) -> HostProperty {
        let property = HostProperty::new(Rc::new(MemoryProperty {
            id: self.registry.next_id(),
            name: name.to_string(),
            declaring: Rc::downgrade(&self.def.rc),
            ty: property_type.clone(),
            getter: getter.cloned(),
            setter: setter.cloned(),
            attributes: Vec::new(),
        }));
        self.def.data().properties.push(property.clone());
        property
    }

    fn define_constructor(&mut self, parameters: &[HostType], is_public: bool) -> Box<dyn ConstructorBuilder> {
        let ctor = self.def.add_constructor_with(parameters, is_public, false);
        let gen = self.body(ctor.id());
        Box::new(MemoryConstructorBuilder { ctor, gen })
    }

    fn define_sub_type(&mut self, base: &HostType, name: &str, is_public: bool) -> Box<dyn TypeBuilder> {
        let def = TypeDef::new(
            &self.registry,
            name,
            self.def.rc.namespace.as_deref(),
            self.assembly.clone(),
            TypeKind::Class,
            is_public,
        );
        def.set_base(base).set_declaring_type(&self.def);
        Box::new(MemoryTypeBuilder {
            def,
            assembly: self.assembly.clone(),
            registry: self.registry.clone(),
        })
    }

    fn define_delegate_sub_type(
        &mut self,
        name: &str,
        is_public: bool,
        return_type: &HostType,
        parameters: &[HostType],
    ) -> HostType {
        let object = self.registry.object_type();
        let mut sub = self.define_sub_type(&object, name, is_public);
        let intptr = self
            .registry
            .assemblies
            .borrow()
            .iter()
            .find_map(|a| a.find_type("System.IntPtr"))
            .unwrap_or_else(PseudoType::unknown);
        sub.define_constructor(&[object, intptr], true);
        sub.define_method(return_type, parameters, "Invoke", Visibility::Public, false, false, None);
        sub.create_type()
    }

    fn create_type(self: Box<Self>) -> HostType {
        let ty = self.def.ty();
        if let Some(asm) = self.assembly.upgrade() {
            asm.types.borrow_mut().push(ty.clone());
        }
        self.registry.created.borrow_mut().push(ty.clone());
        ty
    }
}

struct MemoryMethodBuilder {
    method: HostMethod,
    gen: RecordingEmitter,
}

impl MethodBuilder for MemoryMethodBuilder {
    fn method(&self) -> HostMethod {
        self.method.clone()
    }

    fn generator(&mut self) -> &mut dyn Emitter {
        &mut self.gen
    }
}

struct MemoryConstructorBuilder {
    ctor: HostConstructor,
    gen: RecordingEmitter,
}

impl ConstructorBuilder for MemoryConstructorBuilder {
    fn constructor(&self) -> HostConstructor {
        self.ctor.clone()
    }

    fn generator(&mut self) -> &mut dyn Emitter {
        &mut self.gen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::TypeSystemExt;

    #[test]
    fn core_types_are_findable() {
        let (ts, core) = MemoryTypeSystem::with_core_types();
        assert_eq!(ts.get_type("System.Object").unwrap(), core.object);
        assert_eq!(core.string.base_type(), Some(core.object.clone()));
        assert!(core.void.is_void());
        assert!(core.int32.is_value_type());
        assert_eq!(core.string.full_name(), "System.String,System");
        assert_eq!(core.string.fqn(), "System:System.String");
        assert!(ts.find_type("System.Missing").is_none());
    }

    #[test]
    fn generic_instances_are_cached_and_substituted() {
        let (_ts, core) = MemoryTypeSystem::with_core_types();
        let a = core.func.make_generic_type(&[core.service_provider.clone(), core.object.clone()]).unwrap();
        let b = core.func.make_generic_type(&[core.service_provider.clone(), core.object.clone()]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.generic_type_definition(), Some(core.func.clone()));
        assert_eq!(a.name(), "Func`2<System.IServiceProvider, System.Object>");

        let invoke = a.methods().into_iter().find(|m| m.name() == "Invoke").unwrap();
        assert_eq!(invoke.parameters(), vec![core.service_provider.clone()]);
        assert_eq!(invoke.return_type(), core.object);
        assert_eq!(invoke.declaring_type(), a);
    }

    #[test]
    fn nullable_detection() {
        let (_ts, core) = MemoryTypeSystem::with_core_types();
        let nint = core.nullable.make_generic_type(&[core.int32.clone()]).unwrap();
        assert!(nint.is_nullable());
        assert!(nint.is_nullable_of(&core.int32));
        assert!(!nint.is_nullable_of(&core.boolean));
        assert!(nint.accepts_null());
        assert!(!core.int32.accepts_null());
        assert!(core.string.accepts_null());
        assert!(nint.is_assignable_from(&core.int32));
    }

    #[test]
    fn arrays() {
        let (_ts, core) = MemoryTypeSystem::with_core_types();
        let strings = core.string.make_array_type(1).unwrap();
        assert!(strings.is_array());
        assert_eq!(strings.array_element_type(), Some(core.string.clone()));
        assert_eq!(strings, core.string.make_array_type(1).unwrap());
        let objects = core.object.make_array_type(1).unwrap();
        assert!(objects.is_assignable_from(&strings));
        let ints = core.int32.make_array_type(1).unwrap();
        assert!(!objects.is_assignable_from(&ints));
        assert_eq!(core.int32.make_array_type(2).unwrap().name(), "Int32[,]");
    }

    #[test]
    fn builder_records_bodies() {
        let (ts, core) = MemoryTypeSystem::with_core_types();
        let asm = ts.assembly("Generated");
        let mut tb = ts.define_dynamic_type(&asm, "Gen", "Holder", &core.object);
        let mut mb = tb.define_method(&core.object, &[], "Make", Visibility::Public, true, false, None);
        mb.generator().ldnull().ret();
        let method = mb.method();
        assert!(ts.find_type("Gen.Holder").is_none());
        let created = tb.create_type();

        assert_eq!(ts.get_type("Gen.Holder").unwrap(), created);
        assert_eq!(ts.created_types(), vec![created]);
        assert_eq!(ts.method_listing(&method).unwrap(), "ldnull\nret\n");
    }
}
