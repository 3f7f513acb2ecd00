use automation_link::{ DispatchError, Value };
use crate::fake::* ;

#[test]
fn trailing_optional_arguments_select_shorter_overloads() {

	let wrapper = wrap( &label_object() );
	let text = || Value::String( "abc".into() );

	assert_eq!( wrapper.invoke( "Format", &mut [ text() ]), Ok( Value::String( "abc:1".into() )));
	assert_eq!( wrapper.invoke( "Format", &mut [ text(), Value::Int( 4 ) ]), Ok( Value::String( "abc:2".into() )));
	assert_eq!(
		wrapper.invoke( "Format", &mut [ text(), Value::Int( 4 ), Value::String( "_".into() ) ]),
		Ok( Value::String( "abc:3".into() )),
	);

}

#[test]
fn every_arity_has_its_own_signature() {

	let wrapper = wrap( &label_object() );
	let descriptor = wrapper.descriptor().expect( "wrapper is bound" );

	assert!( descriptor.by_signature( "Format(string)" ).is_some() );
	assert!( descriptor.by_signature( "Format(string,int)" ).is_some() );
	assert!( descriptor.by_signature( "Format( string, int, string )" ).is_some() );
	assert_eq!( descriptor.overloads( "Format" ).count(), 3 );

	let index = descriptor.by_signature( "Format(string,int)" ).expect( "overload exists" );
	let mut args = [ Value::String( "x".into() ), Value::Int( 1 ) ];
	assert_eq!( wrapper.invoke_method( index, &mut args ), Ok( Value::String( "x:2".into() )));

}

#[test]
fn literal_arguments_choose_the_overload_by_count() {

	let wrapper = wrap( &label_object() );
	assert_eq!( wrapper.invoke( r#"Format("a, b", 12)"#, &mut [] ), Ok( Value::String( "a, b:2".into() )));

}

#[test]
fn no_overload_fits_the_argument_count() {

	let object = label_object();
	let wrapper = wrap( &object );
	let mut args = vec![ Value::Int( 0 ); 4 ];

	match wrapper.invoke( "Format", &mut args ) {
		Err( DispatchError::ParameterCountMismatch { member, given: 4 }) if member == "Format" => {}
		value => panic!( "Expected Err( ParameterCountMismatch ), found: {:#?}", value ),
	}

	let dispatch = object.dispatch.as_ref().expect( "label has a dispatch interface" );
	assert!( dispatch.calls().is_empty(), "no foreign call should have been made" );

}

#[test]
fn indexed_setters_send_the_value_as_a_named_argument() {

	let wrapper = wrap( &label_object() );
	let descriptor = wrapper.descriptor().expect( "wrapper is bound" );
	assert!( descriptor.by_signature( "setItem(int,string)" ).is_some() );
	assert!( descriptor.property( "Item" ).is_none() );

	assert_eq!( wrapper.invoke( "setItem", &mut [ Value::Int( 0 ), Value::String( "first".into() ) ]), Ok( Value::Invalid ));

}
