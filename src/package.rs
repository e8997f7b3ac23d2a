//! Plugin package discovery.
//!
//! A plugin package is a tar archive sitting directly inside the plugin directory.
//! Packages are recognised by file name alone; nothing is opened until the
//! [`PackageArchive`]( crate::PackageArchive ) stage.

use std::path::{ Path, PathBuf };
use std::sync::Arc ;
use pipe_trait::Pipe ;
use thiserror::Error ;



/// Identifies one candidate plugin package found during enumeration.
///
/// Cheap to clone; every [`CodeUnitRef`]( crate::CodeUnitRef ) extracted from the
/// package carries a copy.
#[derive( Debug, Clone, PartialEq, Eq, Hash )]
pub struct PackageRef {
	path: Arc<Path>,
	location: Arc<Path>,
}

impl PackageRef {

	/// Creates a reference to the package at `path`.
	///
	/// The resolvable location is the absolute form of `path`. If the current
	/// directory cannot be determined it falls back to `path` itself.
	pub fn new( path: impl Into<PathBuf> ) -> Self {
		let path: PathBuf = path.into();
		let location = std::path::absolute( &path ).unwrap_or_else(|_| path.clone() );
		Self { path: path.into(), location: location.into() }
	}

	/// The path the package was discovered under.
	#[inline] pub fn path( &self ) -> &Path { &self.path }

	/// Absolute location of the package, independent of the working directory.
	#[inline] pub fn location( &self ) -> &Path { &self.location }

}

impl std::fmt::Display for PackageRef {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		write!( f, "{}", self.path.display() )
	}
}

/// The plugin directory could not be listed.
#[derive( Error, Debug )]
#[error( "Cannot read plugin directory {}: {source}", path.display() )]
pub struct DirectoryError {
	/// The directory that was requested.
	pub path: PathBuf,
	/// The underlying IO failure.
	#[source] pub source: std::io::Error,
}

/// Returns `true` if the entry's file name ends with `.{extension}`, ignoring case.
///
/// This is a name test only. The entry is not opened, so a directory named
/// `foo.wpk` passes and fails later when it is read as an archive.
///
/// ```
/// # use std::path::Path ;
/// use wasm_plugin_loader::is_plugin_package ;
///
/// assert!( is_plugin_package( Path::new( "plugins/Demo.WPK" ), "wpk" ));
/// assert!( !is_plugin_package( Path::new( "plugins/demo.wpk.txt" ), "wpk" ));
/// ```
pub fn is_plugin_package( entry: &Path, extension: &str ) -> bool {
	let Some( file_name ) = entry.file_name() else { return false };
	let file_name = file_name.to_string_lossy().to_lowercase();
	let suffix = format!( ".{}", extension.to_lowercase() );
	file_name.ends_with( &suffix )
}

/// Lists the packages directly inside `directory`.
///
/// Only immediate children are considered. Children whose directory entry
/// cannot be read are skipped. The result is sorted by file name so a single
/// run is deterministic, but nothing downstream relies on the order for
/// correctness.
///
/// # Errors
/// Returns [`DirectoryError`] if `directory` does not exist or cannot be read.
pub fn enumerate_packages( directory: &Path, extension: &str ) -> Result<Vec<PackageRef>, DirectoryError> {

	let entries = std::fs::read_dir( directory ).map_err(| source | DirectoryError {
		path: directory.to_path_buf(),
		source,
	})?;

	entries
		.filter_map(| entry | match entry {
			Ok( entry ) => Some( entry.path() ),
			Err( err ) => {
				tracing::debug!( directory = %directory.display(), error = %err, "Skipping unreadable directory entry" );
				None
			}
		})
		.filter(| path | is_plugin_package( path, extension ))
		.collect::<Vec<_>>()
		.pipe(| mut paths | { paths.sort(); paths })
		.into_iter()
		.map( PackageRef::new )
		.collect::<Vec<_>>()
		.pipe( Ok )

}
