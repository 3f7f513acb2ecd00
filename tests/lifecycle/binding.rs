use std::sync::Arc ;
use automation_link::{ BindError, CallFault, ForeignWrapper, ReflectionCache, Value };
use crate::fake::* ;

fn wrapper( factory: &Arc<FakeFactory> ) -> ForeignWrapper {
	logging();
	ForeignWrapper::new( Arc::clone( factory ) as Arc<dyn automation_link::ObjectFactory>, ReflectionCache::new() )
}

#[test]
fn binding_a_class_name_creates_the_object() {

	let factory = FakeFactory::new();
	let wrapper = wrapper( &factory );

	wrapper.bind( "Label.Control" ).expect( "class is registered" );
	assert!( wrapper.is_bound() );
	assert_eq!( wrapper.specifier().as_deref(), Some( "Label.Control" ));
	assert_eq!( factory.created(), 1 );
	assert_eq!( wrapper.get_property( "Caption" ), Ok( Value::String( "Hello".into() )));

}

#[test]
fn binding_the_same_specifier_twice_does_nothing() {

	let factory = FakeFactory::new();
	let wrapper = wrapper( &factory );

	wrapper.bind( "Label.Control" ).expect( "class is registered" );
	let object = wrapper.object().expect( "wrapper is bound" );
	wrapper.bind( "Label.Control" ).expect( "rebinding is a no-op" );

	assert_eq!( factory.created(), 1 );
	assert!( wrapper.object().is_some_and(| current | current.ptr_eq( &object )));

}

#[test]
fn running_instances_are_attached_to() {

	let factory = FakeFactory::new();
	let running = foreign( &label_object() );
	*factory.running.lock() = Some( running.clone() );
	let wrapper = wrapper( &factory );

	wrapper.bind( "Label.Control&" ).expect( "an instance is running" );
	assert_eq!( factory.created(), 0 );
	assert!( wrapper.object().is_some_and(| current | current.ptr_eq( &running )));

}

#[test]
fn failed_strategies_fall_back_to_plain_creation() {

	let factory = FakeFactory::new();
	let wrapper = wrapper( &factory );

	wrapper.bind( "Label.Control&" ).expect( "plain creation succeeds" );
	assert_eq!( factory.created(), 1 );

	wrapper.bind( "Label.Control:LICENSE-KEY" ).expect( "plain creation succeeds" );
	assert_eq!( factory.created(), 2 );

}

#[test]
fn unknown_classes_leave_the_wrapper_empty() {

	let factory = FakeFactory::new();
	let wrapper = wrapper( &factory );
	wrapper.bind( "Label.Control" ).expect( "class is registered" );

	match wrapper.bind( "Missing.Control" ) {
		Err( BindError::BindingFailed { specifier, reason: CallFault::MemberNotFound }) if specifier == "Missing.Control" => {}
		value => panic!( "Expected Err( BindingFailed ), found: {:#?}", value ),
	}
	assert!( !wrapper.is_bound() );
	assert_eq!( wrapper.specifier(), None );

}

#[test]
fn rebinding_moves_subscriptions_to_the_new_object() {

	let first = label_object();
	let second = label_object();
	let wrapper = wrap( &first );
	wrapper.on_signal( | _, _ | {});

	let first_points = first.points.clone().expect( "label has connection points" );
	let second_points = second.points.clone().expect( "label has connection points" );
	assert_eq!( first_points.advised(), 2 );

	wrapper.bind_object( foreign( &second )).expect( "wrapper is idle" );
	assert_eq!( first_points.advised(), 0 );
	assert_eq!( second_points.advised(), 2 );
	assert_eq!( wrapper.specifier(), None );

}
