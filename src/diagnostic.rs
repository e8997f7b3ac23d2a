use std::path::{ Path, PathBuf };
use thiserror::Error ;

use crate::{ ArchiveError, ResolveError, CapabilityError, InstantiationError };



/// A non-fatal failure recorded while loading plugins.
///
/// Every diagnostic names the package it happened in, and all but
/// [`ArchiveUnreadable`]( Self::ArchiveUnreadable ) also name the type.
/// The affected package or type is skipped; everything else still loads.
#[derive( Error, Debug )]
pub enum LoadDiagnostic {

	/// A package could not be opened or its entries could not be listed. None
	/// of its units take part in the load.
	#[error( "Package {} could not be read: {source}", package.display() )]
	ArchiveUnreadable { package: PathBuf, #[source] source: ArchiveError },

	/// A unit could not be compiled, or one of its imports could not be satisfied.
	#[error( "Type {type_name} in {} could not be resolved: {source}", package.display() )]
	TypeNotResolvable { package: PathBuf, type_name: String, #[source] source: ResolveError },

	/// A candidate could not be constructed while checking it against the
	/// plugin contract. Only raised by [`CapabilityCheck::TrialInstantiation`]( crate::CapabilityCheck::TrialInstantiation ).
	#[error( "Type {type_name} in {} failed the capability check: {source}", package.display() )]
	CapabilityCheckFailed { package: PathBuf, type_name: String, #[source] source: CapabilityError },

	/// A unit exhibiting the plugin contract could not be turned into a plugin.
	#[error( "Plugin {type_name} in {} could not be instantiated: {source}", package.display() )]
	InstantiationFailed { package: PathBuf, type_name: String, #[source] source: InstantiationError },

}

/// The kind of a [`LoadDiagnostic`], without its payload.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash )]
pub enum DiagnosticKind {
	/// See [`LoadDiagnostic::ArchiveUnreadable`].
	ArchiveUnreadable,
	/// See [`LoadDiagnostic::TypeNotResolvable`].
	TypeNotResolvable,
	/// See [`LoadDiagnostic::CapabilityCheckFailed`].
	CapabilityCheckFailed,
	/// See [`LoadDiagnostic::InstantiationFailed`].
	InstantiationFailed,
}

impl LoadDiagnostic {

	/// The kind of failure, for matching without destructuring the payload.
	pub fn kind( &self ) -> DiagnosticKind {
		match self {
			Self::ArchiveUnreadable { .. } => DiagnosticKind::ArchiveUnreadable,
			Self::TypeNotResolvable { .. } => DiagnosticKind::TypeNotResolvable,
			Self::CapabilityCheckFailed { .. } => DiagnosticKind::CapabilityCheckFailed,
			Self::InstantiationFailed { .. } => DiagnosticKind::InstantiationFailed,
		}
	}

	/// The package the failure happened in.
	pub fn package( &self ) -> &Path {
		match self {
			Self::ArchiveUnreadable { package, .. }
			| Self::TypeNotResolvable { package, .. }
			| Self::CapabilityCheckFailed { package, .. }
			| Self::InstantiationFailed { package, .. } => package,
		}
	}

	/// The qualified name of the affected type, if the failure concerns a single type.
	pub fn type_name( &self ) -> Option<&str> {
		match self {
			Self::ArchiveUnreadable { .. } => None,
			Self::TypeNotResolvable { type_name, .. }
			| Self::CapabilityCheckFailed { type_name, .. }
			| Self::InstantiationFailed { type_name, .. } => Some( type_name ),
		}
	}

}
