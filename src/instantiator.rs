use std::collections::HashSet ;
use thiserror::Error ;
use wasmtime::{ Instance, Linker, Store };

use crate::{ PluginInstance, PluginState, ResolvedType, CallError };



/// Errors raised while constructing a plugin instance.
#[derive( Error, Debug )]
pub enum InstantiationError {
	/// A unit the plugin imports from could not be instantiated.
	#[error( "Failed to instantiate dependency {name}: {source}" )]
	Dependency { name: String, #[source] source: wasmtime::Error },
	/// The plugin itself could not be instantiated, e.g. a host import is
	/// missing or its start function trapped.
	#[error( "Failed to instantiate module: {0}" )]
	Instantiate( #[source] wasmtime::Error ),
	/// The plugin was instantiated but its metadata could not be read.
	#[error( "Failed to read plugin metadata: {0}" )]
	Metadata( #[source] CallError ),
}

/// A freshly instantiated module, not yet known to be a plugin.
pub(crate) struct Construction<Ctx: 'static> {
	pub(crate) store: Store<PluginState<Ctx>>,
	pub(crate) instance: Instance,
}

impl<Ctx: 'static> Construction<Ctx> {

	/// Reads the plugin's metadata and hands it over to the host.
	pub(crate) fn into_plugin( self, resolved: &ResolvedType ) -> Result<PluginInstance<Ctx>, InstantiationError> {
		PluginInstance::new(
			resolved.qualified_name(),
			resolved.package().path(),
			self.store,
			self.instance,
		).map_err( InstantiationError::Metadata )
	}

}

/// Instantiates `resolved` into a new store holding `context`.
///
/// Dependencies are instantiated first, deepest first, each at most once, and
/// registered on a copy of `linker` under their qualified names. `linker`
/// itself is left untouched.
pub(crate) fn construct<Ctx: 'static>(
	resolved: &ResolvedType,
	linker: &Linker<PluginState<Ctx>>,
	context: Ctx,
) -> Result<Construction<Ctx>, InstantiationError> {

	let mut store = Store::new( linker.engine(), PluginState::new( context ));
	let mut linker = linker.clone();
	let mut linked = HashSet::new();

	resolved.dependencies().iter()
		.try_for_each(| dependency | link_dependency( dependency, &mut linker, &mut store, &mut linked ))?;

	let instance = linker.instantiate( &mut store, resolved.module() )
		.map_err( InstantiationError::Instantiate )?;

	Ok( Construction { store, instance })

}

/// Constructs a plugin from a type that already passed the capability check.
///
/// # Errors
/// Returns [`InstantiationError`] if the module or one of its dependencies
/// cannot be instantiated, or if the plugin's metadata cannot be read.
pub fn instantiate<Ctx: 'static>(
	resolved: &ResolvedType,
	linker: &Linker<PluginState<Ctx>>,
	context: Ctx,
) -> Result<PluginInstance<Ctx>, InstantiationError> {
	construct( resolved, linker, context )?.into_plugin( resolved )
}

fn link_dependency<Ctx: 'static>(
	dependency: &ResolvedType,
	linker: &mut Linker<PluginState<Ctx>>,
	store: &mut Store<PluginState<Ctx>>,
	linked: &mut HashSet<String>,
) -> Result<(), InstantiationError> {

	if !linked.insert( dependency.qualified_name().to_string() ) { return Ok(()) }

	dependency.dependencies().iter()
		.try_for_each(| nested | link_dependency( nested, linker, store, linked ))?;

	let to_error = | source: wasmtime::Error | InstantiationError::Dependency { name: dependency.qualified_name().to_string(), source };
	let instance = linker.instantiate( &mut *store, dependency.module() ).map_err( to_error )?;
	linker.instance( &mut *store, dependency.qualified_name(), instance ).map_err( to_error )?;

	Ok(())

}
