//! The loader facade: discovery, extraction, resolution, capability check and
//! instantiation composed into a single call.

use std::path::{ Path, PathBuf };
use std::sync::Arc ;
use itertools::Itertools ;
use serde::Deserialize ;
use thiserror::Error ;
use tokio_util::sync::CancellationToken ;
use wasmtime::{ Engine, Linker };

use crate::{
	CodeUnitRef, DirectoryError, LoadDiagnostic, PartialSuccess, PluginInstance, PluginState,
	ResolutionContext, CapabilityCheck, CapabilityError, check_declared, check_instance,
	enumerate_packages, list_code_units,
};
use crate::instantiator::construct ;



/// Settings of a [`PluginLoader`].
///
/// Every field has a default, so a host may keep only the settings it changes
/// in its own configuration file:
///
/// ```toml
/// extension = "jar"
/// capability-check = "trial-instantiation"
/// host-namespaces = [ "host" ]
/// ```
#[derive( Debug, Clone, PartialEq, Eq, Deserialize )]
#[serde( default, deny_unknown_fields, rename_all = "kebab-case" )]
pub struct LoaderConfig {
	/// Package file extension, without the dot. Matched case-insensitively.
	pub extension: String,
	/// Extensions of archive entries that are code units, without the dot.
	pub unit_extensions: Vec<String>,
	/// How candidate types are checked against the plugin contract.
	pub capability_check: CapabilityCheck,
	/// Import module names provided by the host's linker.
	pub host_namespaces: Vec<String>,
}

impl LoaderConfig {
	/// Directory plugins are loaded from by [`PluginLoader::load_default`],
	/// relative to the working directory.
	pub const DEFAULT_DIRECTORY: &str = "plugins" ;
}

impl Default for LoaderConfig {
	fn default() -> Self {
		Self {
			extension: "wpk".to_string(),
			unit_extensions: vec![ "wasm".to_string(), "wat".to_string() ],
			capability_check: CapabilityCheck::default(),
			host_namespaces: Vec::new(),
		}
	}
}

/// Failures that abort a whole load operation.
#[derive( Error, Debug )]
pub enum LoadError {
	/// The plugin directory does not exist or cannot be listed.
	#[error( "Plugin directory {} is unreadable: {source}", path.display() )]
	DirectoryUnreadable { path: PathBuf, #[source] source: std::io::Error },
	/// The caller cancelled the operation.
	#[error( "Loading was cancelled" )]
	Cancelled,
}

impl From<DirectoryError> for LoadError {
	fn from( err: DirectoryError ) -> Self {
		Self::DirectoryUnreadable { path: err.path, source: err.source }
	}
}

type ContextFactory<Ctx> = Arc<dyn Fn() -> Ctx + Send + Sync> ;

/// Loads every plugin found in a directory of plugin packages.
///
/// Each returned plugin lives in its own store whose data holds a fresh host
/// context produced by the loader's context factory. The host linker is shared
/// by all plugins and may define imports under the configured host namespaces.
///
/// ```no_run
/// use wasm_plugin_loader::{ Engine, PluginLoader, Plugin };
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = Engine::default();
/// let loader = PluginLoader::new( &engine, || ());
/// let ( mut plugins, diagnostics ) = loader.load_default()?;
/// for diagnostic in &diagnostics { eprintln!( "{diagnostic}" ); }
/// for plugin in &mut plugins { plugin.start()?; }
/// # Ok(())
/// # }
/// ```
pub struct PluginLoader<Ctx: 'static> {
	engine: Engine,
	linker: Linker<PluginState<Ctx>>,
	context_factory: ContextFactory<Ctx>,
	config: LoaderConfig,
}

impl<Ctx: 'static> std::fmt::Debug for PluginLoader<Ctx> {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "PluginLoader" )
			.field( "config", &self.config )
			.finish_non_exhaustive()
	}
}

impl<Ctx: 'static> PluginLoader<Ctx> {

	/// Creates a loader with the default configuration and an empty host linker.
	pub fn new( engine: &Engine, context_factory: impl Fn() -> Ctx + Send + Sync + 'static ) -> Self {
		Self {
			engine: engine.clone(),
			linker: Linker::new( engine ),
			context_factory: Arc::new( context_factory ),
			config: LoaderConfig::default(),
		}
	}

	/// Replaces the host linker. Plugins may import anything it defines under one
	/// of the host namespaces.
	pub fn with_linker( mut self, linker: Linker<PluginState<Ctx>> ) -> Self {
		self.linker = linker ;
		self
	}

	/// Replaces the whole configuration.
	pub fn with_config( mut self, config: LoaderConfig ) -> Self {
		self.config = config ;
		self
	}

	/// Sets the package file extension, without the dot.
	pub fn with_extension( mut self, extension: impl Into<String> ) -> Self {
		self.config.extension = extension.into();
		self
	}

	/// Sets how candidate types are checked against the plugin contract.
	pub fn with_capability_check( mut self, capability_check: CapabilityCheck ) -> Self {
		self.config.capability_check = capability_check ;
		self
	}

	/// Sets the import module names the host linker provides.
	pub fn with_host_namespaces( mut self, namespaces: impl IntoIterator<Item = impl Into<String>> ) -> Self {
		self.config.host_namespaces = namespaces.into_iter().map( Into::into ).collect();
		self
	}

	#[inline] pub fn config( &self ) -> &LoaderConfig { &self.config }

	#[inline] pub fn engine( &self ) -> &Engine { &self.engine }

	/// Loads every plugin in `directory`.
	///
	/// Packages, types and plugins that fail are skipped and reported as
	/// diagnostics alongside the plugins that did load.
	///
	/// # Errors
	/// Fails only if `directory` cannot be listed.
	pub fn load(
		&self,
		directory: impl AsRef<Path>,
	) -> Result<PartialSuccess<Vec<PluginInstance<Ctx>>, LoadDiagnostic>, LoadError> {
		self.load_with_cancellation( directory, &CancellationToken::new() )
	}

	/// Loads every plugin in [`LoaderConfig::DEFAULT_DIRECTORY`].
	///
	/// # Errors
	/// Fails only if the directory cannot be listed.
	pub fn load_default( &self ) -> Result<PartialSuccess<Vec<PluginInstance<Ctx>>, LoadDiagnostic>, LoadError> {
		self.load( LoaderConfig::DEFAULT_DIRECTORY )
	}

	/// Like [`load`]( Self::load ), but stops between packages once `cancellation`
	/// is triggered. Plugins constructed up to that point are dropped.
	///
	/// # Errors
	/// Fails if `directory` cannot be listed or the operation is cancelled.
	pub fn load_with_cancellation(
		&self,
		directory: impl AsRef<Path>,
		cancellation: &CancellationToken,
	) -> Result<PartialSuccess<Vec<PluginInstance<Ctx>>, LoadDiagnostic>, LoadError> {

		let directory = directory.as_ref();
		let packages = enumerate_packages( directory, &self.config.extension )?;
		tracing::debug!( directory = %directory.display(), packages = packages.len(), "Enumerated plugin packages" );

		let ( listings, mut diagnostics ): ( Vec<Vec<CodeUnitRef>>, Vec<LoadDiagnostic> ) = packages.iter()
			.map(| package | match cancellation.is_cancelled() {
				true => Err( LoadError::Cancelled ),
				false => Ok( list_code_units( package, &self.config.unit_extensions )
					.map_err(| source | LoadDiagnostic::ArchiveUnreadable { package: package.path().to_path_buf(), source })),
			})
			.collect::<Result<Vec<_>, _>>()?
			.into_iter()
			.partition_result();

		let context = ResolutionContext::new(
			&self.engine,
			listings.iter().map( Vec::as_slice ),
			self.config.host_namespaces.iter().cloned(),
		);
		tracing::debug!( units = context.len(), "Built resolution context" );

		let mut plugins = Vec::new();
		for units in &listings {
			if cancellation.is_cancelled() { return Err( LoadError::Cancelled ) }
			units.iter()
				.filter(| unit | context.is_visible( unit ))
				.filter_map(| unit | self.load_unit( &context, unit ).transpose() )
				.for_each(| result | match result {
					Ok( plugin ) => plugins.push( plugin ),
					Err( diagnostic ) => diagnostics.push( diagnostic ),
				});
		}

		diagnostics.iter().for_each(| diagnostic | tracing::warn!(
			kind = ?diagnostic.kind(),
			package = %diagnostic.package().display(),
			type_name = diagnostic.type_name(),
			"{diagnostic}",
		));
		tracing::info!(
			directory = %directory.display(),
			plugins = plugins.len(),
			diagnostics = diagnostics.len(),
			"Loaded plugins",
		);

		Ok(( plugins, diagnostics ))

	}

	/// Runs one code unit through resolution, the capability check and
	/// instantiation. `Ok( None )` means the unit is not a plugin.
	fn load_unit(
		&self,
		context: &ResolutionContext,
		unit: &CodeUnitRef,
	) -> Result<Option<PluginInstance<Ctx>>, LoadDiagnostic> {

		let package = || unit.package().path().to_path_buf();
		let type_name = || unit.qualified_name().to_string();

		let resolved = context.resolve( unit ).map_err(| source | LoadDiagnostic::TypeNotResolvable {
			package: package(), type_name: type_name(), source,
		})?;

		let construction = match self.config.capability_check {
			CapabilityCheck::Declared => {
				if !check_declared( resolved.module() ) {
					tracing::debug!( unit = unit.qualified_name(), "Not a plugin" );
					return Ok( None )
				}
				construct( &resolved, &self.linker, ( self.context_factory )() ).map_err(| source | LoadDiagnostic::InstantiationFailed {
					package: package(), type_name: type_name(), source,
				})?
			}
			CapabilityCheck::TrialInstantiation => {
				let mut construction = construct( &resolved, &self.linker, ( self.context_factory )() ).map_err(| source | LoadDiagnostic::CapabilityCheckFailed {
					package: package(), type_name: type_name(), source: CapabilityError::TrialInstantiation( source ),
				})?;
				if !check_instance( &mut construction.store, &construction.instance ) {
					tracing::debug!( unit = unit.qualified_name(), "Not a plugin, dropping trial instance" );
					return Ok( None )
				}
				construction
			}
		};

		let plugin = construction.into_plugin( &resolved ).map_err(| source | LoadDiagnostic::InstantiationFailed {
			package: package(), type_name: type_name(), source,
		})?;
		tracing::debug!( plugin = plugin.qualified_name(), name = %plugin.metadata().name, "Instantiated plugin" );

		Ok( Some( plugin ))

	}

}
