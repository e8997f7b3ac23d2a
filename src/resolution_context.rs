//! Dynamic resolution of code units into loadable types.
//!
//! A [`ResolutionContext`] spans every package found by one load operation, so a
//! module in one package may import from a module that only exists in another.
//! Imports name the exporting unit by its qualified name:
//!
//! ```wat
//! (import "shared.Greeting" "value" (func $value (result i32)))
//! ```
//!
//! Imports from one of the host namespaces are left to the host's linker.

use std::collections::{ HashMap, HashSet };
use std::sync::{ Arc, Mutex, PoisonError };
use itertools::Itertools ;
use pipe_trait::Pipe ;
use thiserror::Error ;
use wasmtime::{ Engine, ExternType, ImportType, Module, Mutability, RefType, ValType };

use crate::{ ArchiveError, CodeUnitRef, PackageRef };
use crate::code_unit::read_unit ;



/// Errors raised when a code unit cannot be resolved into a [`ResolvedType`].
#[derive( Error, Debug )]
pub enum ResolveError {
	/// The unit is not known to the context.
	#[error( "Unknown code unit: {0}" )] UnknownUnit( String ),
	/// The unit's bytes could not be read from its package.
	#[error( "Cannot read code unit: {0}" )] Unreadable( #[source] ArchiveError ),
	/// The unit is not a valid WebAssembly module.
	#[error( "Invalid module: {0}" )] InvalidModule( #[source] wasmtime::Error ),
	/// An import names a unit that none of the packages provide.
	#[error( "Missing dependency {module} (imported item '{item}')" )]
	MissingDependency { module: String, item: String },
	/// The imported unit exists but does not export the imported item.
	#[error( "{module} does not export '{item}'" )]
	MissingExport { module: String, item: String },
	/// The imported unit exports the item, but as a different kind of extern.
	#[error( "{module} exports '{item}' as a {found}, but it is imported as a {expected}" )]
	ExportKindMismatch { module: String, item: String, expected: &'static str, found: &'static str },
	/// The imported unit exports the item as the right kind of extern, but its
	/// type does not satisfy the import.
	#[error( "{module} exports the {kind} '{item}' with a type that does not match its import" )]
	ExportTypeMismatch { module: String, item: String, kind: &'static str },
	/// Units import from each other in a loop.
	#[error( "Circular dependency: {}", chain.join( " -> " ))]
	CircularDependency { chain: Vec<String> },
	/// A dependency of the unit failed to resolve.
	#[error( "Dependency {name} failed to resolve: {source}" )]
	Dependency { name: String, #[source] source: Box<ResolveError> },
}

/// A compiled, not yet instantiated code unit together with the units it imports from.
#[derive( Clone )]
pub struct ResolvedType {
	qualified_name: String,
	package: PackageRef,
	module: Module,
	dependencies: Vec<Arc<ResolvedType>>,
}

impl ResolvedType {
	/// Fully qualified name of the unit.
	#[inline] pub fn qualified_name( &self ) -> &str { &self.qualified_name }
	/// The package the unit was loaded from.
	#[inline] pub fn package( &self ) -> &PackageRef { &self.package }
	/// The compiled module.
	#[inline] pub fn module( &self ) -> &Module { &self.module }
	/// Units this one imports from, each listed once.
	#[inline] pub fn dependencies( &self ) -> &[Arc<ResolvedType>] { &self.dependencies }
}

impl std::fmt::Debug for ResolvedType {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ResolvedType" )
			.field( "qualified_name", &self.qualified_name )
			.field( "package", &self.package )
			.field( "module", &"<Module>" )
			.field( "dependencies", &self.dependencies.iter().map(| dependency | dependency.qualified_name() ).collect::<Vec<_>>() )
			.finish()
	}
}

/// The resolution scope of a single load operation.
///
/// The unit index is built once from the unit listings of every readable
/// package and never modified afterwards. When two packages define the same
/// qualified name, the one listed first wins. Resolved types are memoised, so
/// every unit is read and compiled at most once per context.
pub struct ResolutionContext {
	engine: Engine,
	units: HashMap<String, CodeUnitRef>,
	host_namespaces: HashSet<String>,
	resolved: Mutex<HashMap<String, Arc<ResolvedType>>>,
}

impl std::fmt::Debug for ResolutionContext {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ResolutionContext" )
			.field( "units", &self.units.keys().collect::<Vec<_>>() )
			.field( "host_namespaces", &self.host_namespaces )
			.finish_non_exhaustive()
	}
}

impl ResolutionContext {

	/// Builds a context over the given package listings.
	///
	/// `host_namespaces` are import module names the host's linker provides.
	/// Imports from them are not resolved against the packages.
	pub fn new<'a>(
		engine: &Engine,
		listings: impl IntoIterator<Item = &'a [CodeUnitRef]>,
		host_namespaces: impl IntoIterator<Item = impl Into<String>>,
	) -> Self {
		let units = listings.into_iter()
			.flatten()
			.fold( HashMap::new(), | mut units: HashMap<String, CodeUnitRef>, unit | {
				match units.get( unit.qualified_name() ) {
					Some( winner ) => tracing::warn!(
						unit = unit.qualified_name(),
						package = %unit.package(),
						shadowed_by = %winner.package(),
						"Code unit is shadowed by an earlier package",
					),
					None => { units.insert( unit.qualified_name().to_string(), unit.clone() ); }
				}
				units
			});
		Self {
			engine: engine.clone(),
			units,
			host_namespaces: host_namespaces.into_iter().map( Into::into ).collect(),
			resolved: Mutex::default(),
		}
	}

	/// The engine units are compiled with.
	#[inline] pub fn engine( &self ) -> &Engine { &self.engine }

	/// Number of distinct qualified names in the context.
	#[inline] pub fn len( &self ) -> usize { self.units.len() }

	/// Whether the context holds no units.
	#[inline] pub fn is_empty( &self ) -> bool { self.units.is_empty() }

	/// Returns `true` if `unit` is the definition its qualified name resolves to,
	/// `false` if another package's unit of the same name shadows it.
	pub fn is_visible( &self, unit: &CodeUnitRef ) -> bool {
		self.units.get( unit.qualified_name() )
			.is_some_and(| winner | winner.package() == unit.package() && winner.entry_path() == unit.entry_path() )
	}

	/// Looks up the unit a qualified name resolves to.
	pub fn find( &self, qualified_name: &str ) -> Option<&CodeUnitRef> {
		self.units.get( qualified_name )
	}

	/// Compiles `unit` and resolves everything it imports.
	///
	/// Resolving the same unit again, directly or as a dependency, returns the
	/// memoised type. A unit shadowed by another package is resolved on its own
	/// and never memoised.
	///
	/// # Errors
	/// Returns [`ResolveError`] if the unit or any unit it depends on cannot be
	/// read, compiled, or found, or if an import does not match the export it
	/// names.
	pub fn resolve( &self, unit: &CodeUnitRef ) -> Result<Arc<ResolvedType>, ResolveError> {
		if !self.units.contains_key( unit.qualified_name() ) {
			return Err( ResolveError::UnknownUnit( unit.qualified_name().to_string() ));
		}
		self.resolve_unit( unit, &mut Vec::new() )
	}

	/// Resolves a unit by qualified name.
	///
	/// # Errors
	/// See [`resolve`]( Self::resolve ).
	pub fn resolve_name( &self, qualified_name: &str ) -> Result<Arc<ResolvedType>, ResolveError> {
		let unit = self.find( qualified_name )
			.ok_or_else(|| ResolveError::UnknownUnit( qualified_name.to_string() ))?;
		self.resolve_unit( unit, &mut Vec::new() )
	}

	fn memoised( &self, qualified_name: &str ) -> Option<Arc<ResolvedType>> {
		self.resolved.lock().unwrap_or_else( PoisonError::into_inner ).get( qualified_name ).cloned()
	}

	fn resolve_unit(
		&self,
		unit: &CodeUnitRef,
		chain: &mut Vec<String>,
	) -> Result<Arc<ResolvedType>, ResolveError> {

		let visible = self.is_visible( unit );
		if let Some( resolved ) = self.memoised( unit.qualified_name() ).filter(| _ | visible ) { return Ok( resolved ) }

		let bytes = read_unit( unit ).map_err( ResolveError::Unreadable )?;
		let module = Module::new( &self.engine, &bytes ).map_err( ResolveError::InvalidModule )?;

		chain.push( unit.qualified_name().to_string() );
		let dependencies = module.imports()
			.filter(| import | !self.host_namespaces.contains( import.module() ))
			.map(| import | self.resolve_import( &import, chain ))
			.collect::<Result<Vec<_>, _>>();
		chain.pop();

		let dependencies = dependencies?.into_iter()
			.unique_by(| dependency | dependency.qualified_name().to_string() )
			.collect();

		tracing::debug!( unit = unit.qualified_name(), package = %unit.package(), "Resolved code unit" );

		let resolved = ResolvedType {
			qualified_name: unit.qualified_name().to_string(),
			package: unit.package().clone(),
			module,
			dependencies,
		}.pipe( Arc::new );
		if !visible { return Ok( resolved ) }

		let mut memo = self.resolved.lock().unwrap_or_else( PoisonError::into_inner );
		Ok( Arc::clone( memo.entry( unit.qualified_name().to_string() ).or_insert( resolved )))

	}

	fn resolve_import(
		&self,
		import: &ImportType<'_>,
		chain: &mut Vec<String>,
	) -> Result<Arc<ResolvedType>, ResolveError> {

		let name = import.module();
		if chain.iter().any(| link | link == name ) {
			let mut chain = chain.clone();
			chain.push( name.to_string() );
			return Err( ResolveError::CircularDependency { chain });
		}

		let unit = self.units.get( name ).ok_or_else(|| ResolveError::MissingDependency {
			module: name.to_string(),
			item: import.name().to_string(),
		})?;
		let dependency = self.resolve_unit( unit, chain )
			.map_err(| err | ResolveError::Dependency { name: name.to_string(), source: Box::new( err ) })?;

		let expected = import.ty();
		match dependency.module().get_export( import.name() ) {
			None => Err( ResolveError::MissingExport { module: name.to_string(), item: import.name().to_string() }),
			Some( found ) if extern_kind( &found ) != extern_kind( &expected ) => Err( ResolveError::ExportKindMismatch {
				module: name.to_string(),
				item: import.name().to_string(),
				expected: extern_kind( &expected ),
				found: extern_kind( &found ),
			}),
			Some( found ) if !satisfies( &found, &expected ) => Err( ResolveError::ExportTypeMismatch {
				module: name.to_string(),
				item: import.name().to_string(),
				kind: extern_kind( &expected ),
			}),
			Some( _ ) => Ok( dependency ),
		}

	}

}

/// Whether an export of type `found` can be linked to an import of type `expected`.
/// Both must be of the same kind.
fn satisfies( found: &ExternType, expected: &ExternType ) -> bool {
	match ( found, expected ) {
		( ExternType::Func( found ), ExternType::Func( expected )) => found.matches( expected ),
		( ExternType::Global( found ), ExternType::Global( expected )) => found.mutability() == expected.mutability()
			&& match found.mutability() {
				Mutability::Const => found.content().matches( expected.content() ),
				Mutability::Var => ValType::eq( found.content(), expected.content() ),
			},
		( ExternType::Table( found ), ExternType::Table( expected )) => found.is_64() == expected.is_64()
			&& RefType::eq( found.element(), expected.element() )
			&& limits_satisfy(( found.minimum(), found.maximum() ), ( expected.minimum(), expected.maximum() )),
		( ExternType::Memory( found ), ExternType::Memory( expected )) => found.is_64() == expected.is_64()
			&& found.is_shared() == expected.is_shared()
			&& found.page_size_log2() == expected.page_size_log2()
			&& limits_satisfy(( found.minimum(), found.maximum() ), ( expected.minimum(), expected.maximum() )),
		_ => true,
	}
}

fn limits_satisfy(( found_min, found_max ): ( u64, Option<u64> ), ( expected_min, expected_max ): ( u64, Option<u64> )) -> bool {
	found_min >= expected_min && match ( found_max, expected_max ) {
		( _, None ) => true,
		( Some( found_max ), Some( expected_max )) => found_max <= expected_max,
		( None, Some( _ )) => false,
	}
}

pub(crate) fn extern_kind( ty: &ExternType ) -> &'static str {
	match ty {
		ExternType::Func( _ ) => "function",
		ExternType::Global( _ ) => "global",
		ExternType::Table( _ ) => "table",
		ExternType::Memory( _ ) => "memory",
		#[allow( unreachable_patterns )]
		_ => "tag",
	}
}
