use wasm_plugin_loader::{ Engine, PluginLoader, Plugin };
use crate::package_fixtures::{ Fixture, PluginWat, helper_module };

#[test]
fn loading_demo_package() {

	let fixture = Fixture::new();
	let package = fixture.package( "demo.wpk", &[
		( "demo/", String::new() ),
		( "demo/DemoPlugin.wat", PluginWat::new( "Demo" ).render() ),
		( "demo/Helper.wat", helper_module() ),
	]);
	let engine = Engine::default();

	let ( plugins, diagnostics ) = PluginLoader::new( &engine, || ())
		.load( fixture.path() )
		.expect( "Failed to load plugins" );

	assert_no_diagnostics!( diagnostics );
	assert_eq!( plugins.len(), 1 );
	assert_eq!( plugins[0].qualified_name(), "demo.DemoPlugin" );
	assert_eq!( plugins[0].package(), package );
	assert_eq!( plugins[0].name(), "Demo" );

}

#[test]
fn loading_binary_module() {

	// `\0asm` magic followed by version 1: the smallest valid binary module.
	let empty_module = "\0asm\u{1}\0\0\0".to_string();

	let fixture = Fixture::new();
	fixture.package( "demo.wpk", &[
		( "demo/Empty.wasm", empty_module ),
		( "demo/DemoPlugin.wat", PluginWat::new( "Demo" ).render() ),
	]);
	let engine = Engine::default();

	let ( plugins, diagnostics ) = PluginLoader::new( &engine, || ())
		.load( fixture.path() )
		.expect( "Failed to load plugins" );

	assert_no_diagnostics!( diagnostics );
	assert_eq!( plugins.len(), 1 );

}

#[test]
fn loading_each_plugin_gets_its_own_context() {

	let fixture = Fixture::new();
	fixture.package( "a.wpk", &[( "a/First.wat", PluginWat::new( "First" ).render() )]);
	fixture.package( "b.wpk", &[( "b/Second.wat", PluginWat::new( "Second" ).render() )]);
	let engine = Engine::default();

	let counter = std::sync::atomic::AtomicU32::new( 0 );
	let loader = PluginLoader::new( &engine, move || counter.fetch_add( 1, std::sync::atomic::Ordering::SeqCst ));
	let ( mut plugins, diagnostics ) = loader.load( fixture.path() ).expect( "Failed to load plugins" );

	assert_no_diagnostics!( diagnostics );
	assert_eq!( plugins.iter().map(| plugin | *plugin.context() ).collect::<Vec<_>>(), vec![ 0, 1 ]);

	*plugins[1].context_mut() = 42 ;
	assert_eq!( *plugins[0].context(), 0 );
	assert_eq!( *plugins[1].context(), 42 );

}
