use std::path::Path ;
use wasm_plugin_loader::{ Engine, PluginLoader, DiagnosticKind, is_plugin_package, enumerate_packages };
use crate::package_fixtures::{ Fixture, PluginWat };

#[test]
fn discovery_extension_is_case_insensitive() {

	assert!( is_plugin_package( Path::new( "demo.wpk" ), "wpk" ));
	assert!( is_plugin_package( Path::new( "DEMO.WPK" ), "wpk" ));
	assert!( is_plugin_package( Path::new( "/plugins/Demo.Wpk" ), "WPK" ));
	assert!( !is_plugin_package( Path::new( "demo.wpk.txt" ), "wpk" ));
	assert!( !is_plugin_package( Path::new( "demowpk" ), "wpk" ));
	assert!( !is_plugin_package( Path::new( "demo.jar" ), "wpk" ));

}

#[test]
fn discovery_packages_are_sorted() {

	let fixture = Fixture::new();
	fixture.package( "b.wpk", &[] );
	fixture.package( "A.WPK", &[] );
	fixture.package( "c.wpk", &[] );
	fixture.file( "notes.txt", b"" );

	let packages = enumerate_packages( fixture.path(), "wpk" ).expect( "Failed to enumerate packages" );
	let names = packages.iter()
		.map(| package | package.path().file_name().expect( "Package has no file name" ).to_string_lossy().into_owned() )
		.collect::<Vec<_>>();

	assert_eq!( names, vec![ "A.WPK", "b.wpk", "c.wpk" ]);
	assert!( packages.iter().all(| package | package.location().is_absolute() ));

}

#[test]
fn discovery_upper_case_package_loads() {

	let fixture = Fixture::new();
	fixture.package( "DEMO.WPK", &[( "demo/DemoPlugin.wat", PluginWat::new( "Demo" ).render() )]);
	let engine = Engine::default();

	let ( plugins, diagnostics ) = PluginLoader::new( &engine, || ())
		.load( fixture.path() )
		.expect( "Failed to load plugins" );

	assert_no_diagnostics!( diagnostics );
	assert_eq!( plugins.len(), 1 );

}

#[test]
fn discovery_directory_with_package_extension() {

	let fixture = Fixture::new();
	fixture.directory( "folder.wpk" );
	let engine = Engine::default();

	let ( plugins, diagnostics ) = PluginLoader::new( &engine, || ())
		.load( fixture.path() )
		.expect( "Failed to load plugins" );

	assert!( plugins.is_empty() );
	assert_eq!( diagnostics.len(), 1 );
	assert_eq!( diagnostics[0].kind(), DiagnosticKind::ArchiveUnreadable );

}
