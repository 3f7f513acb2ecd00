use automation_link::{ BuildWarning, DispatchError, Value };
use crate::fake::* ;

#[test]
fn objects_without_a_catalog_work_by_name() {

	let object = counter_object();
	let wrapper = wrap( &object );

	let descriptor = wrapper.descriptor().expect( "wrapper is bound" );
	assert!( descriptor.warnings().contains( &BuildWarning::NoCatalog ));
	assert!( descriptor.property( "Count" ).is_none() );

	assert_eq!( wrapper.get_property( "Count" ), Ok( Value::Int( 3 )));

	wrapper.set_property_writable( "Count", false );
	match wrapper.set_property( "Count", &Value::Int( 4 )) {
		Err( DispatchError::NotWritable { property }) if property == "Count" => {}
		value => panic!( "Expected Err( NotWritable ), found: {:#?}", value ),
	}

	let dispatch = object.dispatch.as_ref().expect( "counter has a dispatch interface" );
	assert!( dispatch.puts().is_empty(), "the write must be refused before any foreign call" );
	assert_eq!( wrapper.get_property( "Count" ), Ok( Value::Int( 3 )));

}

#[test]
fn read_only_catalog_properties_refuse_writes() {

	let object = label_object();
	let wrapper = wrap( &object );
	let descriptor = wrapper.descriptor().expect( "wrapper is bound" );
	let ( index, version ) = descriptor.property( "Version" ).expect( "Version is a property" );

	assert!( version.readable && !version.writable );
	assert_eq!( wrapper.read_property( index ), Ok( Value::String( "2.1".into() )));
	assert!( matches!( wrapper.write_property( index, &Value::String( "3.0".into() )), Err( DispatchError::NotWritable { .. })));

	let dispatch = object.dispatch.as_ref().expect( "label has a dispatch interface" );
	assert!( dispatch.puts().is_empty() );

}

#[test]
fn host_overrides_apply_to_catalog_properties() {

	let wrapper = wrap( &label_object() );
	assert!( wrapper.is_property_writable( "Caption" ));

	wrapper.set_property_writable( "Caption", false );
	assert!( !wrapper.is_property_writable( "Caption" ));
	assert!( matches!( wrapper.set_property( "Caption", &Value::String( "x".into() )), Err( DispatchError::NotWritable { .. })));

	wrapper.set_property_writable( "Caption", true );
	assert_eq!( wrapper.set_property( "Caption", &Value::String( "x".into() )), Ok(()));

}

#[test]
fn synthesized_setters_honor_host_overrides() {

	let object = label_object();
	let wrapper = wrap( &object );
	let descriptor = wrapper.descriptor().expect( "wrapper is bound" );
	let setter = descriptor.by_signature( "setCaption(string)" ).expect( "Caption has a setter" );

	wrapper.set_property_writable( "Caption", false );
	match wrapper.invoke( "setCaption", &mut [ Value::String( "x".into() )]) {
		Err( DispatchError::NotWritable { property }) if property == "Caption" => {}
		value => panic!( "Expected Err( NotWritable ), found: {:#?}", value ),
	}
	assert!( matches!( wrapper.invoke_method( setter, &mut [ Value::String( "y".into() )]), Err( DispatchError::NotWritable { .. })));

	let dispatch = object.dispatch.as_ref().expect( "label has a dispatch interface" );
	assert!( dispatch.puts().is_empty(), "the write must be refused before any foreign call" );

	wrapper.set_property_writable( "Caption", true );
	assert_eq!( wrapper.invoke( "setCaption", &mut [ Value::String( "z".into() )]), Ok( Value::Invalid ));
	assert_eq!( dispatch.puts().len(), 1 );

}
