//! Code unit extraction.
//!
//! A code unit is one WebAssembly module stored inside a package. Its qualified
//! name is the entry path with the unit extension removed and path separators
//! replaced by `.`, so `demo/DemoPlugin.wasm` becomes `demo.DemoPlugin`. Other
//! modules import from a unit using that qualified name as the import module.

use std::fs::File ;
use std::io::{ Read, Seek, SeekFrom };
use std::path::{ Component, Path, PathBuf };
use thiserror::Error ;

use crate::PackageRef ;



/// Identifies one module embedded in a package.
///
/// Besides the qualified name it records where the entry's bytes live inside
/// the archive file, so the module can later be read without scanning the
/// archive again.
#[derive( Debug, Clone, PartialEq, Eq, Hash )]
pub struct CodeUnitRef {
	qualified_name: String,
	entry_path: PathBuf,
	package: PackageRef,
	data_offset: u64,
	data_len: u64,
}

impl CodeUnitRef {
	/// Fully qualified name, e.g. `demo.DemoPlugin`.
	#[inline] pub fn qualified_name( &self ) -> &str { &self.qualified_name }
	/// Path of the entry inside the archive.
	#[inline] pub fn entry_path( &self ) -> &Path { &self.entry_path }
	/// The package this unit was extracted from.
	#[inline] pub fn package( &self ) -> &PackageRef { &self.package }
	/// Size of the unit's bytes.
	#[inline] pub fn len( &self ) -> u64 { self.data_len }
	/// Whether the unit has no bytes at all.
	#[inline] pub fn is_empty( &self ) -> bool { self.data_len == 0 }
}

/// Errors raised while reading a package archive.
#[derive( Error, Debug )]
pub enum ArchiveError {
	/// The package path exists but is not a regular file.
	#[error( "Not a regular file" )] NotAFile,
	/// The archive could not be opened or read.
	#[error( "IO error: {0}" )] Io( #[from] std::io::Error ),
	/// An entry's header is malformed.
	#[error( "Corrupt entry header: {0}" )] CorruptEntry( std::io::Error ),
	/// A unit's recorded data span does not fit in memory on this platform.
	#[error( "Code unit {0} is too large to load" )] UnitTooLarge( String ),
}

/// An open plugin package.
///
/// The underlying file is closed when this value is dropped, including when an
/// iteration over [`code_units`]( Self::code_units ) is abandoned early or fails.
pub struct PackageArchive {
	package: PackageRef,
	archive: tar::Archive<File>,
	unit_extensions: Vec<String>,
}

impl std::fmt::Debug for PackageArchive {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "PackageArchive" )
			.field( "package", &self.package )
			.field( "archive", &"<tar::Archive>" )
			.field( "unit_extensions", &self.unit_extensions )
			.finish()
	}
}

impl PackageArchive {

	/// Opens `package` for scanning.
	///
	/// `unit_extensions` lists the entry extensions (without the dot) that count
	/// as code units. They are matched case-insensitively.
	///
	/// # Errors
	/// Returns [`ArchiveError`] if the package is not a readable regular file.
	pub fn open( package: &PackageRef, unit_extensions: &[String] ) -> Result<Self, ArchiveError> {
		let file = File::open( package.path() )?;
		if !file.metadata()?.is_file() { return Err( ArchiveError::NotAFile ) }
		Ok( Self {
			package: package.clone(),
			archive: tar::Archive::new( file ),
			unit_extensions: unit_extensions.iter().map(| extension | extension.to_lowercase() ).collect(),
		})
	}

	/// Lazily enumerates the code units in the archive.
	///
	/// Only entry headers are read; entry contents are skipped. The sequence can
	/// be walked once. To walk it again, open the package again.
	///
	/// # Errors
	/// Returns [`ArchiveError`] if the archive has already been walked.
	pub fn code_units( &mut self ) -> Result<CodeUnits<'_>, ArchiveError> {
		let entries = self.archive.entries()?;
		Ok( CodeUnits { package: &self.package, unit_extensions: &self.unit_extensions, entries })
	}

}

/// Iterator over the code units of a [`PackageArchive`].
///
/// Yields an error and then stops if a corrupt entry is met.
pub struct CodeUnits<'a> {
	package: &'a PackageRef,
	unit_extensions: &'a [String],
	entries: tar::Entries<'a, File>,
}

impl Iterator for CodeUnits<'_> {
	type Item = Result<CodeUnitRef, ArchiveError> ;

	fn next( &mut self ) -> Option<Self::Item> {
		loop {
			let entry = match self.entries.next()? {
				Ok( entry ) => entry,
				Err( err ) => return Some( Err( ArchiveError::CorruptEntry( err ))),
			};
			if !entry.header().entry_type().is_file() { continue }
			let entry_path = match entry.path() {
				Ok( path ) => path.into_owned(),
				Err( err ) => return Some( Err( ArchiveError::CorruptEntry( err ))),
			};
			let Some( qualified_name ) = qualified_name( &entry_path, self.unit_extensions ) else { continue };
			return Some( Ok( CodeUnitRef {
				qualified_name,
				entry_path,
				package: self.package.clone(),
				data_offset: entry.raw_file_position(),
				data_len: entry.size(),
			}));
		}
	}
}

/// Opens `package` and collects the names of all of its code units.
///
/// The archive is closed before returning.
///
/// # Errors
/// Fails if the package cannot be opened or any entry is corrupt.
pub fn list_code_units( package: &PackageRef, unit_extensions: &[String] ) -> Result<Vec<CodeUnitRef>, ArchiveError> {
	let mut archive = PackageArchive::open( package, unit_extensions )?;
	let units = archive.code_units()?.collect();
	units
}

/// Reads the bytes of one code unit from its package.
///
/// # Errors
/// Fails if the package cannot be reopened or the entry's span cannot be read.
pub fn read_unit( unit: &CodeUnitRef ) -> Result<Vec<u8>, ArchiveError> {
	let capacity = usize::try_from( unit.data_len )
		.map_err(|_| ArchiveError::UnitTooLarge( unit.qualified_name.clone() ))?;
	let mut file = File::open( unit.package.path() )?;
	file.seek( SeekFrom::Start( unit.data_offset ))?;
	let mut bytes = Vec::with_capacity( capacity );
	file.take( unit.data_len ).read_to_end( &mut bytes )?;
	if bytes.len() != capacity {
		return Err( ArchiveError::Io( std::io::Error::from( std::io::ErrorKind::UnexpectedEof )));
	}
	Ok( bytes )
}

/// Derives the qualified name of an entry, or `None` if it is not a code unit.
fn qualified_name( entry_path: &Path, unit_extensions: &[String] ) -> Option<String> {

	let extension = entry_path.extension()?.to_string_lossy().to_lowercase();
	if !unit_extensions.contains( &extension ) { return None }

	let stem = entry_path.with_extension( "" );
	let segments = stem.components()
		.filter_map(| component | match component {
			Component::Normal( segment ) => Some( segment.to_string_lossy().into_owned() ),
			Component::CurDir | Component::RootDir | Component::Prefix( _ ) | Component::ParentDir => None,
		})
		.collect::<Vec<_>>();

	match segments.is_empty() {
		true => None,
		false => Some( segments.join( "." )),
	}

}
