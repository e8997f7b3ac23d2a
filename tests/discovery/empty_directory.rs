use wasm_plugin_loader::{ Engine, PluginLoader, enumerate_packages };
use crate::package_fixtures::Fixture ;

#[test]
fn discovery_empty_directory() {

	let fixture = Fixture::new();
	let engine = Engine::default();

	let ( plugins, diagnostics ) = PluginLoader::new( &engine, || ())
		.load( fixture.path() )
		.expect( "Failed to load plugins" );

	assert_no_diagnostics!( diagnostics );
	assert!( plugins.is_empty() );

}

#[test]
fn discovery_empty_directory_enumerates_nothing() {

	let fixture = Fixture::new();

	let packages = enumerate_packages( fixture.path(), "wpk" ).expect( "Failed to enumerate packages" );
	assert!( packages.is_empty() );

}
