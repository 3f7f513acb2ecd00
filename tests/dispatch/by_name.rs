use automation_link::{ Color, Value, WireValue };
use crate::fake::* ;

#[test]
fn method_call_by_signature_caches_the_member_id() {

	let wrapper = wrap( &label_object() );
	assert_eq!( wrapper.member_id_cached( "GetName" ), None );

	match wrapper.invoke( "GetName()", &mut [] ) {
		Ok( Value::String( name )) if name == "Label1" => {}
		value => panic!( "Expected Ok( String( \"Label1\" )), found: {:#?}", value ),
	}
	assert_eq!( wrapper.member_id_cached( "GetName" ), Some( 5 ));

}

#[test]
fn bare_names_read_and_write_properties() {

	let object = label_object();
	let wrapper = wrap( &object );

	assert_eq!( wrapper.invoke( "Caption", &mut [] ), Ok( Value::String( "Hello".into() )));
	assert_eq!( wrapper.invoke( "Caption", &mut [ Value::String( "World".into() ) ]), Ok( Value::Invalid ));
	assert_eq!( wrapper.get_property( "Caption" ), Ok( Value::String( "World".into() )));

}

#[test]
fn properties_decode_by_their_declared_type() {

	let wrapper = wrap( &label_object() );

	assert_eq!( wrapper.get_property( "BackColor" ), Ok( Value::Color( Color::rgb( 0, 255, 0 ))));
	assert_eq!( wrapper.get_property( "Alignment" ), Ok( Value::Int( 1 )));
	// Inherited from the base interface.
	assert_eq!( wrapper.get_property( "Enabled" ), Ok( Value::Bool( true )));

}

#[test]
fn literal_arguments_resolve_enum_keys() {

	let object = label_object();
	let wrapper = wrap( &object );

	assert_eq!( wrapper.invoke( "setAlignment(AlignRight)", &mut [] ), Ok( Value::Invalid ));
	assert_eq!( wrapper.get_property( "Alignment" ), Ok( Value::Int( 2 )));

	let dispatch = object.dispatch.as_ref().expect( "label has a dispatch interface" );
	assert_eq!( dispatch.property( 2 ), Some( WireValue::I4( 2 )));

}

#[test]
fn unknown_set_methods_fall_back_to_property_writes() {

	let wrapper = wrap( &counter_object() );
	assert_eq!( wrapper.invoke( "setCount", &mut [ Value::Int( 9 ) ]), Ok( Value::Invalid ));
	assert_eq!( wrapper.get_property( "Count" ), Ok( Value::Int( 9 )));

}

#[test]
fn variants_carry_nested_lists_both_ways() {

	let wrapper = wrap( &label_object() );
	let table = Value::List( vec![
		Value::List( vec![ Value::Int( 1 ), Value::Int( 2 ), Value::Int( 3 ) ]),
		Value::List( vec![ Value::Int( 4 ), Value::Int( 5 ), Value::Int( 6 ) ]),
	]);

	assert_eq!( wrapper.invoke( "Echo", &mut [ table.clone() ]), Ok( table ));

}
