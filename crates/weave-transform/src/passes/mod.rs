//! Built-in transformation passes, in pipeline order.

mod deferred_content;
mod markup_extension;
mod object_construction;
mod property_reference;
mod setter_binder;
mod type_reference;

pub use deferred_content::DeferredContentTransformer;
pub use markup_extension::MarkupExtensionTransformer;
pub use object_construction::ObjectConstructionTransformer;
pub use property_reference::PropertyReferenceResolver;
pub use setter_binder::SetterBinder;
pub use type_reference::TypeReferenceResolver;
