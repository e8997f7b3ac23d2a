use wasm_plugin_loader::{ Engine, PluginLoader, LoadDiagnostic, ResolveError };
use crate::package_fixtures::{ Fixture, PluginWat, greeting_module };

#[test]
fn load_error_missing_dependency() {

	let fixture = Fixture::new();
	fixture.package( "app.wpk", &[( "app/App.wat", PluginWat::new( "App" )
		.import( r#"(import "lib.Greeting" "value" (func $value (result i32)))"# )
		.render()
	)]);
	let engine = Engine::default();

	let ( plugins, diagnostics ) = PluginLoader::new( &engine, || ())
		.load( fixture.path() )
		.expect( "Failed to load plugins" );

	assert!( plugins.is_empty() );
	match diagnostics.as_slice() {
		[ LoadDiagnostic::TypeNotResolvable { type_name, source: ResolveError::MissingDependency { module, item }, .. }] => {
			assert_eq!( type_name, "app.App" );
			assert_eq!( module, "lib.Greeting" );
			assert_eq!( item, "value" );
		}
		value => panic!( "Expected a single TypeNotResolvable diagnostic, found: {:#?}", value ),
	}

}

#[test]
fn load_error_missing_export() {

	let fixture = Fixture::new();
	fixture.package( "app.wpk", &[
		( "app/App.wat", PluginWat::new( "App" )
			.import( r#"(import "lib.Greeting" "greet" (func $greet (result i32)))"# )
			.render()
		),
		( "lib/Greeting.wat", greeting_module( 1 )),
	]);
	let engine = Engine::default();

	let ( plugins, diagnostics ) = PluginLoader::new( &engine, || ())
		.load( fixture.path() )
		.expect( "Failed to load plugins" );

	assert!( plugins.is_empty() );
	match diagnostics.as_slice() {
		[ LoadDiagnostic::TypeNotResolvable { source: ResolveError::MissingExport { module, item }, .. }] => {
			assert_eq!( module, "lib.Greeting" );
			assert_eq!( item, "greet" );
		}
		value => panic!( "Expected a single TypeNotResolvable diagnostic, found: {:#?}", value ),
	}

}

#[test]
fn load_error_export_signature_mismatch() {

	let fixture = Fixture::new();
	fixture.package( "app.wpk", &[( "app/App.wat", PluginWat::new( "App" )
		.import( r#"(import "lib.Greeting" "value" (func $value (param i64) (result f32)))"# )
		.render()
	)]);
	fixture.package( "lib.wpk", &[( "lib/Greeting.wat", greeting_module( 1 ))]);
	let engine = Engine::default();

	let ( plugins, diagnostics ) = PluginLoader::new( &engine, || ())
		.load( fixture.path() )
		.expect( "Failed to load plugins" );

	assert!( plugins.is_empty() );
	match diagnostics.as_slice() {
		[ LoadDiagnostic::TypeNotResolvable { type_name, source: ResolveError::ExportTypeMismatch { module, item, kind }, .. }] => {
			assert_eq!( type_name, "app.App" );
			assert_eq!( module, "lib.Greeting" );
			assert_eq!( item, "value" );
			assert_eq!( *kind, "function" );
		}
		value => panic!( "Expected a single TypeNotResolvable diagnostic, found: {:#?}", value ),
	}

}

#[test]
fn load_error_helper_with_mismatched_import() {

	let fixture = Fixture::new();
	fixture.package( "lib.wpk", &[
		( "lib/Greeting.wat", greeting_module( 1 )),
		( "lib/Wrapper.wat", r#"(module (import "lib.Greeting" "value" (global i32)))"#.to_string() ),
		( "lib/Mutable.wat", r#"(module
			(import "lib.Counter" "count" (global (mut i32)))
		)"#.to_string() ),
		( "lib/Counter.wat", r#"(module (global (export "count") i32 (i32.const 0)))"#.to_string() ),
	]);
	let engine = Engine::default();

	let ( plugins, diagnostics ) = PluginLoader::new( &engine, || ())
		.load( fixture.path() )
		.expect( "Failed to load plugins" );

	assert!( plugins.is_empty() );
	match diagnostics.as_slice() {
		[
			LoadDiagnostic::TypeNotResolvable { source: ResolveError::ExportKindMismatch { .. }, .. },
			LoadDiagnostic::TypeNotResolvable { type_name, source: ResolveError::ExportTypeMismatch { kind, .. }, .. },
		] => {
			assert_eq!( type_name, "lib.Mutable" );
			assert_eq!( *kind, "global" );
		}
		value => panic!( "Expected two TypeNotResolvable diagnostics, found: {:#?}", value ),
	}

}
