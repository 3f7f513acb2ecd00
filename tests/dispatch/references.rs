use std::sync::Arc ;
use automation_link::{ Font, InvokeFlags, Value };
use crate::fake::* ;

fn font() -> Font {
	Font { family: "Consolas".into(), point_size: 10.0, ..Font::default() }
}

#[test]
fn object_writes_prefer_reference_semantics() {

	let object = label_object();
	let wrapper = wrap( &object );

	assert_eq!( wrapper.set_property( "Font", &Value::Font( font() )), Ok(()));

	let dispatch = object.dispatch.as_ref().expect( "label has a dispatch interface" );
	assert_eq!( dispatch.puts(), vec![( 4, InvokeFlags::PROPERTY_PUT_REF )]);
	assert_eq!( wrapper.get_property( "Font" ), Ok( Value::Font( font() )));

}

#[test]
fn rejected_reference_writes_are_retried_once_as_plain_writes() {

	let dispatch = Arc::new( label_dispatch().rejecting_put_ref( 4 ));
	let object = Arc::new( FakeObject { dispatch: Some( Arc::clone( &dispatch )), class: Some( entry( "Label" )), ..FakeObject::default() });
	let wrapper = wrap( &object );

	assert_eq!( wrapper.set_property( "Font", &Value::Font( font() )), Ok(()));
	assert_eq!( dispatch.puts(), vec![
		( 4, InvokeFlags::PROPERTY_PUT_REF ),
		( 4, InvokeFlags::PROPERTY_PUT ),
	]);
	assert_eq!( wrapper.get_property( "Font" ), Ok( Value::Font( font() )));

}

#[test]
fn scalar_writes_use_plain_semantics() {

	let object = label_object();
	let wrapper = wrap( &object );

	assert_eq!( wrapper.set_property( "Caption", &Value::String( "plain".into() )), Ok(()));
	let dispatch = object.dispatch.as_ref().expect( "label has a dispatch interface" );
	assert_eq!( dispatch.puts(), vec![( 1, InvokeFlags::PROPERTY_PUT )]);

}
