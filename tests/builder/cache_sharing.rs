use std::sync::Arc ;
use automation_link::{ BuildOptions, ReflectionCache };
use crate::fake::* ;

#[test]
fn wrappers_of_one_class_share_a_descriptor() {

	let cache = ReflectionCache::new();
	let first = wrap_with( &label_object(), &cache );
	let second = wrap_with( &label_object(), &cache );

	let a = first.descriptor().expect( "first is bound" );
	let b = second.descriptor().expect( "second is bound" );
	assert!( Arc::ptr_eq( &a, &b ));
	assert_eq!( cache.len(), 1 );

}

#[test]
fn build_options_are_part_of_the_cache_key() {

	let cache = ReflectionCache::new();
	let full = wrap_with( &label_object(), &cache );
	let quiet = wrap_with( &label_object(), &cache ).with_options( BuildOptions::default().with_event_sink( false ));

	let a = full.descriptor().expect( "full is bound" );
	let b = quiet.descriptor().expect( "quiet is bound" );
	assert!( !Arc::ptr_eq( &a, &b ));
	assert_eq!( cache.len(), 2 );

}

#[test]
fn objects_without_class_identity_are_not_cached_by_default() {

	let cache = ReflectionCache::new();
	let first = wrap_with( &counter_object(), &cache );
	let second = wrap_with( &counter_object(), &cache );

	let a = first.descriptor().expect( "first is bound" );
	let b = second.descriptor().expect( "second is bound" );
	assert!( !Arc::ptr_eq( &a, &b ));
	assert!( cache.is_empty() );

}

#[test]
fn dispatch_identity_keys_the_cache_when_enabled() {

	let cache = ReflectionCache::new();
	let options = BuildOptions::default().with_class_info( false ).with_dispatch_equals_unknown( true );
	let first = wrap_with( &label_object(), &cache ).with_options( options );
	let second = wrap_with( &label_object(), &cache ).with_options( options );

	let a = first.descriptor().expect( "first is bound" );
	let b = second.descriptor().expect( "second is bound" );
	assert!( Arc::ptr_eq( &a, &b ));
	assert_eq!( a.class_id(), Some( ILABEL ));
	assert_eq!( a.class_name(), "ILabel" );

}

#[test]
fn the_cache_empties_when_the_last_wrapper_goes() {

	let cache = ReflectionCache::new();
	let first = wrap_with( &label_object(), &cache );
	let second = wrap_with( &label_object(), &cache );
	first.descriptor();
	assert_eq!( cache.holders(), 2 );

	drop( first );
	assert_eq!( cache.len(), 1 );
	drop( second );
	assert_eq!( cache.holders(), 0 );
	assert!( cache.is_empty() );

}
