use crate::error::TypeResolutionError;
use crate::ty::{HostAssembly, HostType};

/// The entry point a backend exposes: its assemblies and type lookup.
///
/// Lookups return `None` on failure. Use [`TypeSystemExt::get_type`] where a
/// missing type must abort.
pub trait TypeSystem {
    fn assemblies(&self) -> Vec<HostAssembly>;

    /// First assembly whose name contains `substring`.
    fn find_assembly(&self, substring: &str) -> Option<HostAssembly> {
        self.assemblies()
            .into_iter()
            .find(|a| a.name().contains(substring))
    }

    /// Look a type up by namespace-qualified name across all assemblies.
    fn find_type(&self, name: &str) -> Option<HostType>;

    /// Look a type up in the assembly whose name contains `assembly`.
    fn find_type_in(&self, name: &str, assembly: &str) -> Option<HostType> {
        self.find_assembly(assembly)?.find_type(name)
    }
}

pub trait TypeSystemExt {
    fn get_type(&self, name: &str) -> Result<HostType, TypeResolutionError>;
}

impl<T: TypeSystem + ?Sized> TypeSystemExt for T {
    fn get_type(&self, name: &str) -> Result<HostType, TypeResolutionError> {
        self.find_type(name)
            .ok_or_else(|| TypeResolutionError::TypeNotFound {
                name: name.to_string(),
            })
    }
}
