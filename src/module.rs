//! Loadable modules and their API identities.
//!
//! A module is an owned object bound to one IRC context and to one API
//! identity, the abstract contract it implements. All implementations
//! sharing an API identity are mutually exclusive on a context: loading a
//! second implementation unloads the first.

use std::any::{type_name, Any};
use std::rc::Rc;

/// Marker trait for module API identities.
///
/// Declare an API by implementing this trait on a unit type; modules name
/// it through [`Module::Api`]. The crate ships two:
/// [`Protocol`](crate::protocol::Protocol) and
/// [`Connection`](crate::connection::Connection).
pub trait ModuleApi: 'static {
    /// Display name of this API.
    fn name() -> &'static str
    where
        Self: Sized,
    {
        type_name::<Self>().rsplit("::").next().unwrap_or("?")
    }
}

/// A loadable module implementation.
///
/// Modules are constructed and destroyed through the module API of the IRC
/// context ([`Irc::load`](crate::Irc::load) and
/// [`Irc::unload`](crate::Irc::unload)). A module typically attaches
/// handlers in its constructor and keeps the returned
/// [`HandlerHandle`](crate::HandlerHandle)s so they detach when the module
/// is unloaded.
pub trait Module: Any {
    /// The API identity this module occupies.
    type Api: ModuleApi;
}

/// A module as stored in the context's registry.
pub(crate) struct LoadedModule {
    /// The owning handle; concretely an `Rc<M>` erased to `Any`.
    pub(crate) instance: Rc<dyn Any>,
    pub(crate) name: &'static str,
}
