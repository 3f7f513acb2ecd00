use std::sync::Arc ;
use std::sync::atomic::Ordering ;
use automation_link::{ CallFault, WireValue };
use crate::fake::* ;

#[test]
fn subscription_waits_for_the_first_listener() {

	let object = label_object();
	let points = object.points.clone().expect( "label has connection points" );
	let wrapper = wrap( &object );

	wrapper.descriptor();
	assert_eq!( points.advised(), 0 );

	wrapper.connect_signal( "Clicked", | _ | {});
	assert_eq!( points.advised_to( LABEL_EVENTS ), 1 );
	assert_eq!( points.advised_to( automation_link::IID_PROPERTY_NOTIFY_SINK ), 1 );

	wrapper.on_signal( | _, _ | {});
	wrapper.on_property_changed( | _ | {});
	assert_eq!( points.advised(), 2 );

}

#[test]
fn arguments_are_decoded_only_for_listening_channels() {

	let object = label_object();
	let points = object.points.clone().expect( "label has connection points" );
	let wrapper = wrap( &object );
	let font = font_object( "Tahoma" );
	let fire = || points.fire( LABEL_EVENTS, FONT_PICKED, &mut [ WireValue::Object( Some( foreign( &font ))) ]);

	wrapper.connect_signal( "Clicked", | _ | {});
	assert!( fire().iter().all( Result::is_ok ));
	assert_eq!( font.font_queries.load( Ordering::SeqCst ), 0 );

	wrapper.on_signal( | _, _ | {});
	fire();
	assert_eq!( font.font_queries.load( Ordering::SeqCst ), 1 );

	let received = Arc::new( parking_lot::Mutex::new( Vec::new() ));
	let sink = Arc::clone( &received );
	wrapper.connect_signal( "FontPicked(font)", move | args | sink.lock().extend_from_slice( args ));
	fire();
	assert_eq!( font.font_queries.load( Ordering::SeqCst ), 3 );

	let received = received.lock();
	match received.as_slice() {
		[ automation_link::Value::Font( font )] if font.family == "Tahoma" => {}
		value => panic!( "Expected [ Font( Tahoma ) ], found: {:#?}", value ),
	}

}

#[test]
fn unknown_event_members_are_rejected() {

	let object = label_object();
	let points = object.points.clone().expect( "label has connection points" );
	let wrapper = wrap( &object );
	wrapper.on_signal( | _, _ | {});

	assert_eq!( points.fire( LABEL_EVENTS, 99, &mut [] ), vec![ Err( CallFault::MemberNotFound ) ]);

}

#[test]
fn objects_without_events_still_accept_listeners() {

	let wrapper = wrap( &counter_object() );
	wrapper.on_signal( | _, _ | {});
	assert!( wrapper.descriptor().expect( "wrapper is bound" ).event_sources().is_empty() );

}
