use automation_link::{ DispatchError, Value };
use crate::fake::* ;

#[test]
fn clearing_unsubscribes_and_releases_the_object() {

	let object = label_object();
	let points = object.points.clone().expect( "label has connection points" );
	let wrapper = wrap( &object );
	wrapper.on_property_changed( | _ | {});
	wrapper.invoke( "GetName()", &mut [] ).expect( "GetName succeeds" );

	assert_eq!( points.advised(), 2 );
	assert!( wrapper.member_id_cached( "GetName" ).is_some() );

	wrapper.clear();
	assert_eq!( points.advised(), 0 );
	assert!( !wrapper.is_bound() );
	assert!( wrapper.object().is_none() );
	assert!( wrapper.member_id_cached( "GetName" ).is_none() );
	assert_eq!( wrapper.invoke( "GetName()", &mut [] ), Err( DispatchError::NotBound ));

	wrapper.clear();
	assert!( !wrapper.is_bound() );

}

#[test]
fn dropping_the_wrapper_unsubscribes() {

	let object = label_object();
	let points = object.points.clone().expect( "label has connection points" );
	let wrapper = wrap( &object );
	wrapper.on_signal( | _, _ | {});
	assert_eq!( points.advised(), 2 );

	drop( wrapper );
	assert_eq!( points.advised(), 0 );

}

#[test]
fn a_cleared_wrapper_can_be_bound_again() {

	let wrapper = wrap( &label_object() );
	wrapper.clear();

	wrapper.bind_object( foreign( &label_object() )).expect( "wrapper is idle" );
	assert_eq!( wrapper.get_property( "Caption" ), Ok( Value::String( "Hello".into() )));

}

#[test]
fn subscriptions_lost_to_a_concurrent_clear_are_cancelled_without_the_state_lock() {

	let object = label_object();
	let points = object.points.clone().expect( "label has connection points" );
	let wrapper = std::sync::Arc::new( wrap( &object ));
	let seen = std::sync::Arc::new( parking_lot::Mutex::new( Vec::new() ));

	let clearing = std::sync::Arc::downgrade( &wrapper );
	points.on_advise( move || if let Some( wrapper ) = clearing.upgrade() { wrapper.clear() });
	let observing = std::sync::Arc::downgrade( &wrapper );
	let observed = std::sync::Arc::clone( &seen );
	points.on_unadvise( move || if let Some( wrapper ) = observing.upgrade() { observed.lock().push( wrapper.is_bound() ) });

	wrapper.on_property_changed( | _ | {});

	assert!( !wrapper.is_bound() );
	assert_eq!( points.advised(), 0 );
	assert_eq!( *seen.lock(), vec![ false, false ]);

}
