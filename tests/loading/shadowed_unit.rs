use wasm_plugin_loader::{ Engine, PluginLoader, Plugin };
use crate::package_fixtures::{ Fixture, PluginWat };

#[test]
fn loading_shadowed_unit() {

	let fixture = Fixture::new();
	let first = fixture.package( "a.wpk", &[( "demo/DemoPlugin.wat", PluginWat::new( "First" ).render() )]);
	fixture.package( "b.wpk", &[( "demo/DemoPlugin.wat", PluginWat::new( "Second" ).render() )]);
	let engine = Engine::default();

	let ( plugins, diagnostics ) = PluginLoader::new( &engine, || ())
		.load( fixture.path() )
		.expect( "Failed to load plugins" );

	assert_no_diagnostics!( diagnostics );
	assert_eq!( plugins.len(), 1 );
	assert_eq!( plugins[0].name(), "First" );
	assert_eq!( plugins[0].package(), first );

}
