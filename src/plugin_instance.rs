use std::path::Path ;
use std::sync::Arc ;
use thiserror::Error ;
use wasmtime::{ Instance, Store };

use crate::{ Plugin, PluginManager, PluginManagerHandle, PluginMetadata };
use crate::capability::{
	MEMORY_EXPORT, START_EXPORT, STOP_EXPORT, NAME_EXPORT, DESCRIPTION_EXPORT,
	AUTHORS_EXPORT, VERSION_EXPORT, APPLICATION_VERSION_EXPORT,
};



/// Data stored in every plugin's wasmtime [`Store`].
///
/// Host functions registered on the loader's linker receive it through
/// `Caller::data`, which gives them the host context and the plugin manager
/// handle of the calling plugin.
pub struct PluginState<Ctx> {
	context: Ctx,
	plugin_manager: Option<PluginManagerHandle>,
}

impl<Ctx> PluginState<Ctx> {

	pub(crate) fn new( context: Ctx ) -> Self {
		Self { context, plugin_manager: None }
	}

	/// The host context created for this plugin.
	#[inline] pub fn context( &self ) -> &Ctx { &self.context }

	/// Mutable access to the host context created for this plugin.
	#[inline] pub fn context_mut( &mut self ) -> &mut Ctx { &mut self.context }

	/// The plugin manager, if one was set and the host still holds it.
	pub fn plugin_manager( &self ) -> Option<Arc<dyn PluginManager>> {
		self.plugin_manager.as_ref().and_then( PluginManagerHandle::upgrade )
	}

}

impl<Ctx: std::fmt::Debug> std::fmt::Debug for PluginState<Ctx> {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "PluginState" )
			.field( "context", &self.context )
			.field( "plugin_manager", &self.plugin_manager )
			.finish()
	}
}

/// Errors that can occur when calling into a loaded plugin.
#[derive( Error, Debug )]
pub enum CallError {
	/// A contract export is missing or has the wrong type.
	#[error( "Invalid Export {export}: {source}" )]
	InvalidExport { export: &'static str, #[source] source: wasmtime::Error },
	/// The plugin's memory export is missing.
	#[error( "Missing Memory" )] MissingMemory,
	/// The plugin trapped or otherwise failed while running.
	#[error( "Runtime Exception: {0}" )] RuntimeException( #[source] wasmtime::Error ),
	/// A returned string points outside of the plugin's memory.
	#[error( "String out of bounds: {len} bytes at offset {offset}" )]
	OutOfBounds { offset: usize, len: usize },
	/// A returned string is not valid UTF-8.
	#[error( "Invalid UTF-8: {0}" )] InvalidUtf8( #[from] std::string::FromUtf8Error ),
}

/// A loaded plugin: a wasm instance together with its own store.
///
/// Returned by [`PluginLoader::load`]( crate::PluginLoader::load ) and owned by
/// the host from then on. Dropping it releases the instance.
pub struct PluginInstance<Ctx: 'static> {
	qualified_name: String,
	package: Arc<Path>,
	metadata: PluginMetadata,
	store: Store<PluginState<Ctx>>,
	instance: Instance,
}

impl<Ctx: std::fmt::Debug + 'static> std::fmt::Debug for PluginInstance<Ctx> {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::result::Result<(), std::fmt::Error> {
		f.debug_struct( "PluginInstance" )
			.field( "qualified_name", &self.qualified_name )
			.field( "package", &self.package )
			.field( "metadata", &self.metadata )
			.field( "data", self.store.data() )
			.finish_non_exhaustive()
	}
}

impl<Ctx: 'static> PluginInstance<Ctx> {

	/// Wraps a constructed instance, reading its metadata.
	pub(crate) fn new(
		qualified_name: &str,
		package: &Path,
		mut store: Store<PluginState<Ctx>>,
		instance: Instance,
	) -> Result<Self, CallError> {
		let metadata = read_metadata( &mut store, &instance )?;
		Ok( Self {
			qualified_name: qualified_name.to_string(),
			package: package.into(),
			metadata,
			store,
			instance,
		})
	}

	/// Fully qualified name of the code unit this plugin was loaded from.
	#[inline] pub fn qualified_name( &self ) -> &str { &self.qualified_name }

	/// Path of the package this plugin was loaded from.
	#[inline] pub fn package( &self ) -> &Path { &self.package }

	/// All metadata the plugin reported at construction.
	#[inline] pub fn metadata( &self ) -> &PluginMetadata { &self.metadata }

	/// The host context of this plugin's store.
	#[inline] pub fn context( &self ) -> &Ctx { self.store.data().context() }

	/// Mutable access to the host context of this plugin's store.
	#[inline] pub fn context_mut( &mut self ) -> &mut Ctx { self.store.data_mut().context_mut() }

	fn call_status( &mut self, export: &'static str ) -> Result<bool, CallError> {
		let func = self.instance
			.get_typed_func::<(), i32>( &mut self.store, export )
			.map_err(| source | CallError::InvalidExport { export, source })?;
		let status = func.call( &mut self.store, () ).map_err( CallError::RuntimeException )?;
		Ok( status != 0 )
	}

}

impl<Ctx: 'static> Plugin for PluginInstance<Ctx> {

	fn start( &mut self ) -> Result<bool, CallError> { self.call_status( START_EXPORT )}

	fn stop( &mut self ) -> Result<bool, CallError> { self.call_status( STOP_EXPORT )}

	fn plugin_manager( &self ) -> Option<Arc<dyn PluginManager>> {
		self.store.data().plugin_manager()
	}

	fn set_plugin_manager( &mut self, manager: &Arc<dyn PluginManager> ) {
		self.store.data_mut().plugin_manager = Some( PluginManagerHandle::new( manager ));
	}

	#[inline] fn name( &self ) -> &str { &self.metadata.name }
	#[inline] fn description( &self ) -> &str { &self.metadata.description }
	#[inline] fn authors( &self ) -> &[String] { &self.metadata.authors }
	#[inline] fn version( &self ) -> &str { &self.metadata.version }
	#[inline] fn application_version( &self ) -> &str { &self.metadata.application_version }

}

fn read_metadata<Ctx: 'static>(
	store: &mut Store<PluginState<Ctx>>,
	instance: &Instance,
) -> Result<PluginMetadata, CallError> {
	Ok( PluginMetadata {
		name: read_string( store, instance, NAME_EXPORT )?,
		description: read_string( store, instance, DESCRIPTION_EXPORT )?,
		authors: read_string( store, instance, AUTHORS_EXPORT )?
			.lines()
			.map( str::trim )
			.filter(| author | !author.is_empty() )
			.map( String::from )
			.collect(),
		version: read_string( store, instance, VERSION_EXPORT )?,
		application_version: read_string( store, instance, APPLICATION_VERSION_EXPORT )?,
	})
}

/// Calls a `() -> i64` export and reads the packed `( offset << 32 ) | length`
/// string it returns from the plugin's memory.
fn read_string<T: 'static>(
	store: &mut Store<T>,
	instance: &Instance,
	export: &'static str,
) -> Result<String, CallError> {

	let func = instance
		.get_typed_func::<(), i64>( &mut *store, export )
		.map_err(| source | CallError::InvalidExport { export, source })?;
	let packed = func.call( &mut *store, () ).map_err( CallError::RuntimeException )?;

	#[allow( clippy::cast_sign_loss )]
	let packed = packed as u64 ;
	let offset = usize::try_from( packed >> 32 ).map_err(|_| CallError::OutOfBounds { offset: usize::MAX, len: 0 })?;
	let len = usize::try_from( packed & 0xFFFF_FFFF ).map_err(|_| CallError::OutOfBounds { offset, len: usize::MAX })?;

	let memory = instance.get_memory( &mut *store, MEMORY_EXPORT ).ok_or( CallError::MissingMemory )?;
	let bytes = offset.checked_add( len )
		.and_then(| end | memory.data( &*store ).get( offset..end ))
		.ok_or( CallError::OutOfBounds { offset, len })?;

	Ok( String::from_utf8( bytes.to_vec() )? )

}
