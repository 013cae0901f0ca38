//! Emission of resolved nodes.
//!
//! Value nodes leave exactly one value on the stack. Manipulation nodes
//! consume the target object their parent left on the stack and leave
//! nothing.

use std::cell::Cell;
use std::rc::Rc;

use tracing::trace;
use weave_ast::{Ast, NodeClass, NodeId, NodeKind};
use weave_common::Span;
use weave_typesys::{CompilerConfig, ConstValue, Emitter, HostType, Local, PseudoType, TypeBuilder};

use crate::error::EmitError;
use crate::runtime::RuntimeContext;

pub struct EmitContext<'a> {
    pub config: &'a CompilerConfig,
    pub runtime: &'a RuntimeContext,
    /// The local holding this body's runtime context.
    pub context_local: Local,
    /// Type that receives closure types as nested types.
    pub(crate) owner: &'a mut dyn TypeBuilder,
    pub(crate) closures: Rc<Cell<u32>>,
}

impl<'a> EmitContext<'a> {
    pub fn new(
        config: &'a CompilerConfig,
        runtime: &'a RuntimeContext,
        context_local: Local,
        owner: &'a mut dyn TypeBuilder,
    ) -> Self {
        Self {
            config,
            runtime,
            context_local,
            owner,
            closures: Rc::default(),
        }
    }

    /// Number of deferred-content closures compiled so far, nested ones
    /// included.
    pub fn closure_count(&self) -> u32 {
        self.closures.get()
    }

    /// Emit any resolved node. Returns the type of the value left on the
    /// stack, or `None` for a manipulation.
    pub fn emit_node(&mut self, ast: &Ast, id: NodeId, gen: &mut dyn Emitter) -> Result<Option<HostType>, EmitError> {
        match ast.class(id) {
            NodeClass::Value => self.emit_value(ast, id, gen, None).map(Some),
            NodeClass::Manipulation => self.emit_manipulation(ast, id, gen).map(|()| None),
            NodeClass::TypeReference => Err(EmitError::NotAValue {
                node: ast.kind(id).name(),
                span: ast.span(id),
            }),
        }
    }

    /// Emit a value node, converting it to `expected` when given.
    pub fn emit_value(
        &mut self,
        ast: &Ast,
        id: NodeId,
        gen: &mut dyn Emitter,
        expected: Option<&HostType>,
    ) -> Result<HostType, EmitError> {
        let kind = ast.kind(id);
        let span = ast.span(id);
        if kind.is_parser_level() {
            return Err(EmitError::UnresolvedNode { node: kind.name(), span });
        }
        trace!(node = kind.name(), "emitting value");

        let produced = match kind {
            NodeKind::Constant { value, ty } => {
                match value {
                    ConstValue::Null => {
                        gen.ldnull();
                    }
                    ConstValue::Str(s) => {
                        gen.ldstr(s);
                    }
                    ConstValue::Bool(b) => {
                        gen.ldc_i4(i32::from(*b));
                    }
                    ConstValue::Int(n) => match i32::try_from(*n) {
                        Ok(n) => {
                            gen.ldc_i4(n);
                        }
                        Err(_) => {
                            return Err(EmitError::UnsupportedConstant {
                                value: value.to_string(),
                                span,
                            })
                        }
                    },
                    ConstValue::Float(_) => {
                        return Err(EmitError::UnsupportedConstant {
                            value: value.to_string(),
                            span,
                        })
                    }
                }
                ty.clone()
            }
            NodeKind::NewClrObject {
                type_ref,
                constructor,
                arguments,
            } => {
                let params = constructor.parameters();
                for (arg, param) in arguments.iter().zip(&params) {
                    self.emit_value(ast, *arg, gen, Some(param))?;
                }
                gen.newobj(constructor);
                type_ref.ty.clone()
            }
            NodeKind::MethodCall { method, arguments } => {
                let params = method.parameters_with_this().to_vec();
                for (arg, param) in arguments.iter().zip(&params) {
                    self.emit_value(ast, *arg, gen, Some(param))?;
                }
                method.emit(gen, false);
                method.return_type()
            }
            NodeKind::ValueWithManipulation {
                value,
                manipulation,
            } => {
                let ty = self.emit_value(ast, *value, gen, None)?;
                let parents = self
                    .runtime
                    .parent_stack
                    .clone()
                    .filter(|_| ast.subtree_needs_parent_stack(*manipulation));
                match parents {
                    Some(parents) => {
                        // The object is the innermost parent while its own
                        // manipulation runs.
                        let pool = gen.locals_pool();
                        let target = pool.get_local(&ty, gen);
                        gen.stloc(target.local()).ldloc(self.context_local).ldloc(target.local());
                        let slot = parents.push.parameters().first().cloned();
                        self.convert(gen, &ty, slot.as_ref(), span)?;
                        gen.emit_call(&parents.push, true);
                        gen.ldloc(target.local());
                        drop(target);
                        gen.dup();
                        self.emit_manipulation(ast, *manipulation, gen)?;
                        gen.ldloc(self.context_local);
                        gen.emit_call(&parents.pop, true);
                    }
                    None => {
                        gen.dup();
                        self.emit_manipulation(ast, *manipulation, gen)?;
                    }
                }
                ty
            }
            NodeKind::MarkupExtension {
                value,
                provide_value,
            } => {
                self.emit_value(ast, *value, gen, Some(&provide_value.declaring_type()))?;
                if let Some(provider) = provide_value.parameters().first() {
                    gen.ldloc(self.context_local);
                    self.convert(gen, &self.runtime.context_type, Some(provider), span)?;
                }
                gen.emit_call(provide_value, false);
                provide_value.return_type()
            }
            NodeKind::DeferredContent { value, ty } => self.emit_deferred_content(ast, *value, ty, gen)?,
            _ => {
                return Err(EmitError::NotAValue {
                    node: kind.name(),
                    span,
                })
            }
        };

        self.convert(gen, &produced, expected, span)?;
        Ok(expected.cloned().unwrap_or(produced))
    }

    /// Emit a manipulation against the target on top of the stack.
    pub fn emit_manipulation(&mut self, ast: &Ast, id: NodeId, gen: &mut dyn Emitter) -> Result<(), EmitError> {
        let kind = ast.kind(id);
        let span = ast.span(id);
        if kind.is_parser_level() {
            return Err(EmitError::UnresolvedNode { node: kind.name(), span });
        }
        trace!(node = kind.name(), "emitting manipulation");

        match kind {
            NodeKind::PropertyAssignment {
                property,
                possible_setters,
                values,
            } => {
                let Some(setter) = possible_setters.first() else {
                    return Err(EmitError::NoSetter {
                        property: property.to_string(),
                        span,
                    });
                };
                let param = setter.parameters().last().cloned();
                if values.is_empty() {
                    gen.pop();
                }
                for (i, value) in values.iter().enumerate() {
                    if i + 1 < values.len() {
                        gen.dup();
                    }
                    self.emit_value(ast, *value, gen, param.as_ref())?;
                    setter.emit(gen);
                }
            }
            NodeKind::PropertyValueManipulation {
                property,
                manipulation,
            } => {
                let Some(getter) = &property.getter else {
                    return Err(EmitError::NoGetter {
                        property: property.to_string(),
                        span,
                    });
                };
                gen.emit_call(getter, false);
                self.emit_manipulation(ast, *manipulation, gen)?;
            }
            NodeKind::NoReturnMethodCall { method, arguments } => {
                let params = method.parameters_with_this().to_vec();
                for (arg, param) in arguments.iter().zip(params.iter().skip(1)) {
                    self.emit_value(ast, *arg, gen, Some(param))?;
                }
                method.emit(gen, true);
            }
            NodeKind::ManipulationGroup { children } => {
                for child in children {
                    gen.dup();
                    self.emit_manipulation(ast, *child, gen)?;
                }
                gen.pop();
            }
            NodeKind::ObjectInitialization {
                manipulation,
                ty,
                skip_begin_init,
            } => {
                let bracket = if *skip_begin_init { None } else { init_bracket(ty) };
                match bracket {
                    Some((begin, end)) => {
                        gen.dup();
                        gen.emit_call(&begin, true);
                        gen.dup();
                        self.emit_manipulation(ast, *manipulation, gen)?;
                        gen.emit_call(&end, true);
                    }
                    None => self.emit_manipulation(ast, *manipulation, gen)?,
                }
            }
            _ => {
                return Err(EmitError::NotAManipulation {
                    node: kind.name(),
                    span,
                })
            }
        }
        Ok(())
    }

    /// Box value types headed for a reference slot and wrap them into their
    /// `Nullable<T>`; cast references that are not statically assignable.
    /// Value types never widen to another value type.
    fn convert(
        &self,
        gen: &mut dyn Emitter,
        actual: &HostType,
        expected: Option<&HostType>,
        span: Span,
    ) -> Result<(), EmitError> {
        let Some(expected) = expected else {
            return Ok(());
        };
        if expected == actual || *actual == PseudoType::null() {
            return Ok(());
        }
        let incompatible = || EmitError::IncompatibleValue {
            expected: expected.to_string(),
            actual: actual.to_string(),
            span,
        };
        if actual.is_value_type() {
            if expected.is_nullable_of(actual) {
                let wrap = expected.get_constructor(&[actual.clone()])?;
                gen.newobj(&wrap);
            } else if !expected.is_value_type() && expected.is_assignable_from(actual) {
                gen.box_value(actual);
            } else {
                return Err(incompatible());
            }
            return Ok(());
        }
        if expected.is_value_type() {
            return Err(incompatible());
        }
        if !expected.is_assignable_from(actual) {
            gen.castclass(expected);
        }
        Ok(())
    }
}

/// Parameterless `BeginInit`/`EndInit` pair, when the type supports
/// batched initialization.
fn init_bracket(ty: &HostType) -> Option<(weave_typesys::HostMethod, weave_typesys::HostMethod)> {
    let find = |name: &str| ty.find_method_by(|m| m.name() == name && !m.is_static() && m.parameters().is_empty());
    Some((find("BeginInit")?, find("EndInit")?))
}
