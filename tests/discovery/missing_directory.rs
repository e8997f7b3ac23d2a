use wasm_plugin_loader::{ Engine, PluginLoader, LoadError };
use crate::package_fixtures::Fixture ;

#[test]
fn discovery_missing_directory() {

	let fixture = Fixture::new();
	let missing = fixture.path().join( "does-not-exist" );
	let engine = Engine::default();

	match PluginLoader::new( &engine, || ()).load( &missing ) {
		Err( LoadError::DirectoryUnreadable { path, .. }) => assert_eq!( path, missing ),
		value => panic!( "Expected DirectoryUnreadable error, found: {:#?}", value.map(|( _, diagnostics )| diagnostics )),
	}

}

#[test]
fn discovery_path_is_a_file() {

	let fixture = Fixture::new();
	let file = fixture.file( "plugins", b"not a directory" );
	let engine = Engine::default();

	match PluginLoader::new( &engine, || ()).load( &file ) {
		Err( LoadError::DirectoryUnreadable { .. }) => {}
		value => panic!( "Expected DirectoryUnreadable error, found: {:#?}", value.map(|( _, diagnostics )| diagnostics )),
	}

}
