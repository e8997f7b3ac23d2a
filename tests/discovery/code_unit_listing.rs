use std::path::Path ;
use wasm_plugin_loader::{ PackageArchive, PackageRef, ArchiveError, list_code_units, read_unit };
use crate::package_fixtures::{ Fixture, helper_module, greeting_module };

fn unit_extensions() -> Vec<String> { vec![ "wasm".to_string(), "wat".to_string() ]}

#[test]
fn code_unit_listing_skips_other_entries() {

	let fixture = Fixture::new();
	let path = fixture.package( "demo.wpk", &[
		( "demo/", String::new() ),
		( "demo/Helper.wat", helper_module() ),
		( "demo/readme.md", "# Demo".to_string() ),
		( "META-INF/MANIFEST.MF", "Manifest-Version: 1.0\n".to_string() ),
		( "demo/nested/Greeting.WAT", greeting_module( 3 )),
	]);

	let units = list_code_units( &PackageRef::new( path ), &unit_extensions() ).expect( "Failed to list code units" );
	let names = units.iter().map(| unit | unit.qualified_name() ).collect::<Vec<_>>();

	assert_eq!( names, vec![ "demo.Helper", "demo.nested.Greeting" ]);
	assert_eq!( units[1].entry_path(), Path::new( "demo/nested/Greeting.WAT" ));

}

#[test]
fn code_unit_listing_reads_unit_bytes() {

	let fixture = Fixture::new();
	let path = fixture.package( "demo.wpk", &[
		( "demo/Helper.wat", helper_module() ),
		( "demo/Greeting.wat", greeting_module( 5 )),
	]);

	let units = list_code_units( &PackageRef::new( path ), &unit_extensions() ).expect( "Failed to list code units" );
	let bytes = read_unit( &units[1] ).expect( "Failed to read code unit" );

	assert_eq!( bytes, greeting_module( 5 ).into_bytes() );
	assert_eq!( units[1].len(), bytes.len() as u64 );

}

#[test]
fn code_unit_listing_is_lazy_and_single_pass() {

	let fixture = Fixture::new();
	let path = fixture.package( "demo.wpk", &[
		( "a/One.wat", helper_module() ),
		( "a/Two.wat", helper_module() ),
	]);
	let package = PackageRef::new( path );

	let mut archive = PackageArchive::open( &package, &unit_extensions() ).expect( "Failed to open package" );
	let first = archive.code_units()
		.expect( "Failed to walk package" )
		.next()
		.expect( "Package has no code units" )
		.expect( "Corrupt entry" );
	assert_eq!( first.qualified_name(), "a.One" );
	assert_eq!( first.package(), &package );

	let mut reopened = PackageArchive::open( &package, &unit_extensions() ).expect( "Failed to reopen package" );
	let count = reopened.code_units().expect( "Failed to walk package" ).count();
	assert_eq!( count, 2 );

}

#[test]
fn code_unit_listing_corrupted_archive() {

	let fixture = Fixture::new();
	let path = fixture.file( "broken.wpk", &[ b'x'; 1024 ]);

	match list_code_units( &PackageRef::new( path ), &unit_extensions() ) {
		Err( ArchiveError::CorruptEntry( _ )) => {}
		value => panic!( "Expected CorruptEntry error, found: {:#?}", value ),
	}

}
