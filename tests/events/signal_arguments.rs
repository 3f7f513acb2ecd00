use std::sync::Arc ;
use parking_lot::Mutex ;
use automation_link::{ ByRef, Value, WireValue };
use crate::fake::* ;

fn clicked_args( x: i32, cancel: &ByRef ) -> [WireValue; 2] {
	[ WireValue::ByRef( cancel.clone() ), WireValue::I4( x ) ]
}

#[test]
fn generic_listeners_receive_untyped_arguments_in_declaration_order() {

	let object = label_object();
	let points = object.points.clone().expect( "label has connection points" );
	let wrapper = wrap( &object );

	let received = Arc::new( Mutex::new( Vec::new() ));
	let sink = Arc::clone( &received );
	wrapper.on_signal( move | name, args | sink.lock().push(( name.to_string(), args.to_vec() )));

	let cancel = ByRef::new( WireValue::Bool( false ));
	points.fire( LABEL_EVENTS, CLICKED, &mut clicked_args( 10, &cancel ));

	assert_eq!( *received.lock(), vec![( "Clicked".to_string(), vec![ Value::Int( 10 ), Value::Bool( false ) ])]);
	assert_eq!( cancel.get(), WireValue::Bool( false ));

}

#[test]
fn typed_listeners_write_out_parameters_back() {

	let object = label_object();
	let points = object.points.clone().expect( "label has connection points" );
	let wrapper = wrap( &object );

	let seen_x = Arc::new( Mutex::new( None ));
	let sink = Arc::clone( &seen_x );
	wrapper.connect_signal( "Clicked(int,bool)", move | args | {
		*sink.lock() = Some( args[ 0 ].clone() );
		args[ 1 ] = Value::Bool( true );
	});

	let cancel = ByRef::new( WireValue::Bool( false ));
	let results = points.fire( LABEL_EVENTS, CLICKED, &mut clicked_args( 7, &cancel ));

	assert!( results.iter().all( Result::is_ok ));
	assert_eq!( *seen_x.lock(), Some( Value::Int( 7 )));
	assert_eq!( cancel.get(), WireValue::Bool( true ));

}

#[test]
fn listeners_of_other_signals_are_not_called() {

	let object = label_object();
	let points = object.points.clone().expect( "label has connection points" );
	let wrapper = wrap( &object );

	let calls = Arc::new( Mutex::new( 0 ));
	let sink = Arc::clone( &calls );
	wrapper.connect_signal( "FontPicked", move | _ | *sink.lock() += 1 );

	let cancel = ByRef::new( WireValue::Bool( false ));
	points.fire( LABEL_EVENTS, CLICKED, &mut clicked_args( 1, &cancel ));
	assert_eq!( *calls.lock(), 0 );

}
