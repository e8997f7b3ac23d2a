//! The plugin capability contract.
//!
//! A module is a plugin if it exports:
//!
//! | export                    | type        |
//! |---------------------------|-------------|
//! | `memory`                  | memory      |
//! | `start`                   | `() -> i32` |
//! | `stop`                    | `() -> i32` |
//! | `get_name`                | `() -> i64` |
//! | `get_description`         | `() -> i64` |
//! | `get_authors`             | `() -> i64` |
//! | `get_version`             | `() -> i64` |
//! | `get_application_version` | `() -> i64` |
//!
//! `start` and `stop` return non-zero on success. The `get_*` functions return a
//! string in the exported memory packed as `( offset << 32 ) | length`. Authors
//! are separated by newlines.
//!
//! The plugin manager half of the contract lives on the host side, in
//! [`PluginInstance`]( crate::PluginInstance ).

use serde::Deserialize ;
use thiserror::Error ;
use wasmtime::{ ExternType, Instance, Module, Store, ValType };

use crate::instantiator::InstantiationError ;
use crate::resolution_context::extern_kind ;



pub(crate) const MEMORY_EXPORT: &str = "memory" ;
pub(crate) const START_EXPORT: &str = "start" ;
pub(crate) const STOP_EXPORT: &str = "stop" ;
pub(crate) const NAME_EXPORT: &str = "get_name" ;
pub(crate) const DESCRIPTION_EXPORT: &str = "get_description" ;
pub(crate) const AUTHORS_EXPORT: &str = "get_authors" ;
pub(crate) const VERSION_EXPORT: &str = "get_version" ;
pub(crate) const APPLICATION_VERSION_EXPORT: &str = "get_application_version" ;

#[derive( Debug, Clone, Copy, PartialEq, Eq )]
enum Shape {
	Memory,
	/// `() -> i32`
	Status,
	/// `() -> i64`
	PackedString,
}

impl Shape {

	fn matches( self, ty: &ExternType ) -> bool {
		match ( self, ty ) {
			( Self::Memory, ExternType::Memory( _ )) => true,
			( Self::Status, ExternType::Func( func )) => func.params().len() == 0
				&& func.results().len() == 1
				&& func.results().all(| result | matches!( result, ValType::I32 )),
			( Self::PackedString, ExternType::Func( func )) => func.params().len() == 0
				&& func.results().len() == 1
				&& func.results().all(| result | matches!( result, ValType::I64 )),
			_ => false,
		}
	}

	fn describe( self ) -> &'static str {
		match self {
			Self::Memory => "memory",
			Self::Status => "function () -> i32",
			Self::PackedString => "function () -> i64",
		}
	}

}

const CONTRACT: [( &str, Shape ); 8] = [
	( MEMORY_EXPORT, Shape::Memory ),
	( START_EXPORT, Shape::Status ),
	( STOP_EXPORT, Shape::Status ),
	( NAME_EXPORT, Shape::PackedString ),
	( DESCRIPTION_EXPORT, Shape::PackedString ),
	( AUTHORS_EXPORT, Shape::PackedString ),
	( VERSION_EXPORT, Shape::PackedString ),
	( APPLICATION_VERSION_EXPORT, Shape::PackedString ),
];

/// How the loader decides whether a resolved type is a plugin.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize )]
#[serde( rename_all = "kebab-case" )]
pub enum CapabilityCheck {
	/// Inspect the module's declared exports. Nothing is instantiated, so
	/// non-plugin modules never run.
	#[default] Declared,
	/// Instantiate the module and inspect the live instance.
	///
	/// Every candidate's start function runs, including modules that turn out
	/// not to be plugins. The trial instance of a plugin is the one returned to
	/// the host, so no plugin is constructed twice.
	TrialInstantiation,
}

/// Errors raised while checking a type against the contract.
#[derive( Error, Debug )]
pub enum CapabilityError {
	/// The trial instance could not be constructed.
	#[error( "Trial instantiation failed: {0}" )]
	TrialInstantiation( #[source] InstantiationError ),
}

/// Checks the declared exports of `module` against the contract.
///
/// Returns `false` if any contract export is absent or has the wrong type:
/// such a module is simply not a plugin.
pub fn check_declared( module: &Module ) -> bool {
	CONTRACT.iter().all(|( export, shape )| match module.get_export( export ) {
		None => false,
		Some( ty ) if shape.matches( &ty ) => true,
		Some( ty ) => {
			let found = match ty { ExternType::Func( _ ) => "function with another signature", _ => extern_kind( &ty ) };
			tracing::debug!( export = *export, expected = shape.describe(), found, "Contract export has the wrong type" );
			false
		}
	})
}

/// Checks a live instance against the contract.
pub fn check_instance<T: 'static>( store: &mut Store<T>, instance: &Instance ) -> bool {
	CONTRACT.iter().all(|( name, shape )| match shape {
		Shape::Memory => instance.get_memory( &mut *store, name ).is_some(),
		Shape::Status => instance.get_typed_func::<(), i32>( &mut *store, name ).is_ok(),
		Shape::PackedString => instance.get_typed_func::<(), i64>( &mut *store, name ).is_ok(),
	})
}
