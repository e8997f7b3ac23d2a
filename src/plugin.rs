//! The plugin capability set as seen by the host.
//!
//! Every loaded plugin implements [`Plugin`]. The host hands each plugin a weak
//! [`PluginManagerHandle`] to its own [`PluginManager`], then drives the plugin
//! through [`Plugin::start`] and [`Plugin::stop`].

use std::any::Any ;
use std::sync::{ Arc, Weak };

use crate::plugin_instance::CallError ;



/// The host object plugins talk back to.
///
/// The trait is intentionally empty: a host defines the operations it exposes
/// on its own type and recovers that type from an `Arc<dyn PluginManager>` by
/// upcasting to `Arc<dyn Any + Send + Sync>` and downcasting.
///
/// ```
/// use std::any::Any ;
/// use std::sync::Arc ;
/// use wasm_plugin_loader::PluginManager ;
///
/// struct Host { application_version: &'static str }
/// impl PluginManager for Host {}
///
/// let manager: Arc<dyn PluginManager> = Arc::new( Host { application_version: "1.4.0" });
/// let any: Arc<dyn Any + Send + Sync> = manager ;
/// let host = any.downcast::<Host>().ok().unwrap();
/// assert_eq!( host.application_version, "1.4.0" );
/// ```
pub trait PluginManager: Any + Send + Sync {}

/// A non-owning reference from a plugin to the host's [`PluginManager`].
///
/// The host keeps the manager alive. Once it is dropped, [`upgrade`]( Self::upgrade )
/// returns `None`.
#[derive( Clone )]
pub struct PluginManagerHandle( Weak<dyn PluginManager> );

impl PluginManagerHandle {

	/// Creates a handle to `manager` without taking ownership of it.
	pub fn new( manager: &Arc<dyn PluginManager> ) -> Self {
		Self( Arc::downgrade( manager ))
	}

	/// Returns the manager if the host still holds it.
	pub fn upgrade( &self ) -> Option<Arc<dyn PluginManager>> {
		self.0.upgrade()
	}

}

impl std::fmt::Debug for PluginManagerHandle {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_tuple( "PluginManagerHandle" )
			.field( &match self.0.strong_count() {
				0 => "<dropped>",
				_ => "<live>",
			})
			.finish()
	}
}

/// Descriptive metadata a plugin reports about itself.
#[derive( Debug, Clone, PartialEq, Eq, Default )]
pub struct PluginMetadata {
	/// Display name
	pub name: String,
	/// Free-form description
	pub description: String,
	/// Author entries, e.g. `"First Last <mail@provider>"`
	pub authors: Vec<String>,
	/// The plugin's own version
	pub version: String,
	/// The version of the host application the plugin targets
	pub application_version: String,
}

/// The capability set every plugin exposes.
///
/// Metadata is read from the plugin once, when it is constructed, so the
/// getters are infallible. `start` and `stop` call into plugin code.
pub trait Plugin {

	/// Initialises the plugin.
	///
	/// Returns `Ok( false )` if the plugin reports that it failed to start.
	///
	/// # Errors
	/// Returns [`CallError`] if the call itself fails, e.g. the plugin traps.
	fn start( &mut self ) -> Result<bool, CallError> ;

	/// Stops the plugin.
	///
	/// Returns `Ok( false )` if the plugin reports that it failed to stop.
	///
	/// # Errors
	/// Returns [`CallError`] if the call itself fails, e.g. the plugin traps.
	fn stop( &mut self ) -> Result<bool, CallError> ;

	/// The manager this plugin was given, if any and if the host still holds it.
	fn plugin_manager( &self ) -> Option<Arc<dyn PluginManager>> ;

	/// Gives this plugin a reference to the host's manager.
	///
	/// Only a weak reference is kept; the plugin never owns the manager.
	fn set_plugin_manager( &mut self, manager: &Arc<dyn PluginManager> ) ;

	/// The plugin's name.
	fn name( &self ) -> &str ;

	/// The plugin's description.
	fn description( &self ) -> &str ;

	/// The plugin's authors.
	fn authors( &self ) -> &[String] ;

	/// The plugin's version.
	fn version( &self ) -> &str ;

	/// The host application version the plugin was written for.
	fn application_version( &self ) -> &str ;

}
