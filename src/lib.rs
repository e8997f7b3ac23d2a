//! Runtime discovery and loading of WebAssembly plugins.
//!
//! A host points a [`PluginLoader`] at a directory. Every file in it whose name
//! ends with the package extension (`.wpk` by default) is read as a tar archive
//! of WebAssembly modules. Each module is a **code unit**, named by its path in
//! the archive: `demo/DemoPlugin.wasm` is the unit `demo.DemoPlugin`. Units
//! that implement the plugin contract are instantiated and handed to the host.
//!
//! # Pipeline
//!
//! 1. [`enumerate_packages`] lists the candidate packages in the directory.
//! 2. [`PackageArchive`] walks each package's entries and yields [`CodeUnitRef`]s.
//! 3. A [`ResolutionContext`] spanning all packages compiles each unit and
//! 	resolves its imports. A unit may import from a unit in any package by
//! 	using the exporting unit's qualified name as the import module.
//! 4. The capability check ([`CapabilityCheck`]) decides whether a resolved
//! 	type is a plugin.
//! 5. Every plugin is instantiated in its own store and returned as a
//! 	[`PluginInstance`].
//!
//! Failures in steps 2 to 5 only skip the affected package or type. They are
//! returned as [`LoadDiagnostic`]s next to the plugins that did load and are
//! also emitted as `tracing` events. Only an unreadable directory or a
//! cancelled operation fail the whole load with a [`LoadError`].
//!
//! # The plugin contract
//!
//! A plugin exports its linear memory plus the functions listed in
//! [`capability`]. Strings are returned as `( offset << 32 ) | length`:
//!
//! ```wat
//! (module
//! 	(memory (export "memory") 1)
//! 	(data (i32.const 0) "Demo")
//! 	(func (export "start") (result i32) i32.const 1)
//! 	(func (export "stop") (result i32) i32.const 1)
//! 	(func (export "get_name") (result i64) i64.const 4)
//! 	;; get_description, get_authors, get_version, get_application_version
//! )
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc ;
//! use wasm_plugin_loader::{ Engine, Linker, Plugin, PluginLoader, PluginManager, PluginState };
//!
//! struct Host ;
//! impl PluginManager for Host {}
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::default();
//!
//! // Host functions live under a host namespace and see the per-plugin context.
//! let mut linker = Linker::<PluginState<u32>>::new( &engine );
//! linker.func_wrap( "host", "log", | caller: wasmtime::Caller<'_, PluginState<u32>>, code: i32 | {
//! 	println!( "plugin {} logged {code}", caller.data().context() );
//! })?;
//!
//! let loader = PluginLoader::new( &engine, || 0_u32 )
//! 	.with_linker( linker )
//! 	.with_host_namespaces([ "host" ]);
//!
//! let ( mut plugins, diagnostics ) = loader.load_default()?;
//! for diagnostic in diagnostics {
//! 	eprintln!( "skipped: {diagnostic}" );
//! }
//!
//! let manager: Arc<dyn PluginManager> = Arc::new( Host );
//! for plugin in &mut plugins {
//! 	plugin.set_plugin_manager( &manager );
//! 	if !plugin.start()? { eprintln!( "{} failed to start", plugin.name() ); }
//! }
//! for plugin in &mut plugins { plugin.stop()?; }
//! # Ok(())
//! # }
//! ```

mod package ;
mod code_unit ;
mod resolution_context ;
pub mod capability ;
mod instantiator ;
mod plugin ;
mod plugin_instance ;
mod diagnostic ;
mod loader ;
mod utils ;

#[doc( no_inline )]
pub use wasmtime::{ Engine, Linker };
#[doc( no_inline )]
pub use tokio_util::sync::CancellationToken ;

pub use package::{ PackageRef, DirectoryError, is_plugin_package, enumerate_packages };
pub use code_unit::{ CodeUnitRef, PackageArchive, CodeUnits, ArchiveError, list_code_units, read_unit };
pub use resolution_context::{ ResolutionContext, ResolvedType, ResolveError };
pub use capability::{ CapabilityCheck, CapabilityError, check_declared, check_instance };
pub use instantiator::{ InstantiationError, instantiate };
pub use plugin::{ Plugin, PluginManager, PluginManagerHandle, PluginMetadata };
pub use plugin_instance::{ PluginInstance, PluginState, CallError };
pub use diagnostic::{ LoadDiagnostic, DiagnosticKind };
pub use loader::{ PluginLoader, LoaderConfig, LoadError };
pub use utils::PartialSuccess ;
