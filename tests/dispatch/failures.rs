use std::sync::Arc ;
use parking_lot::Mutex ;
use automation_link::{ DispatchError, ExceptionInfo, ForeignWrapper, ReflectionCache };
use crate::fake::* ;

#[test]
fn unknown_members_suggest_case_insensitive_matches() {

	let wrapper = wrap( &label_object() );

	match wrapper.invoke( "getname()", &mut [] ) {
		Err( DispatchError::MemberNotFound { name, candidates }) => {
			assert_eq!( name, "getname" );
			assert_eq!( candidates, vec![ "GetName".to_string() ]);
		},
		value => panic!( "Expected Err( MemberNotFound ), found: {:#?}", value ),
	}

}

#[test]
fn foreign_exceptions_carry_their_details() {

	let wrapper = wrap( &label_object() );

	match wrapper.invoke( "Fail()", &mut [] ) {
		Err( DispatchError::ForeignException { member, info }) => {
			assert_eq!( member, "Fail" );
			assert_eq!( info.code, 1001 );
			assert_eq!( info.description, "Something broke" );
		},
		value => panic!( "Expected Err( ForeignException ), found: {:#?}", value ),
	}

}

#[test]
fn exception_listeners_receive_foreign_exceptions() {

	let wrapper = wrap( &label_object() );
	let seen = Arc::new( Mutex::new( Vec::<ExceptionInfo>::new() ));
	let sink = Arc::clone( &seen );
	wrapper.on_exception( move | info | sink.lock().push( info.clone() ));

	assert!( wrapper.invoke( "Fail()", &mut [] ).is_err() );
	let seen = seen.lock();
	assert_eq!( seen.len(), 1 );
	assert_eq!( seen[ 0 ].source, "Label" );

}

#[test]
fn malformed_literals_are_rejected_before_dispatch() {

	let object = label_object();
	let wrapper = wrap( &object );

	assert!( matches!( wrapper.invoke( r#"Format("unterminated)"#, &mut [] ), Err( DispatchError::Literal( _ ))));
	let dispatch = object.dispatch.as_ref().expect( "label has a dispatch interface" );
	assert!( dispatch.calls().is_empty() );

}

#[test]
fn bad_indices_are_reported() {

	let wrapper = wrap( &label_object() );
	let descriptor = wrapper.descriptor().expect( "wrapper is bound" );
	let ( index, _ ) = descriptor.property( "Caption" ).expect( "Caption is a property" );

	assert_eq!( wrapper.read_property( descriptor.len() ), Err( DispatchError::InvalidIndex( descriptor.len() )));
	assert!( matches!( wrapper.invoke_method( index, &mut [] ), Err( DispatchError::WrongMemberKind { .. })));

}

#[test]
fn unbound_wrappers_refuse_calls() {

	let wrapper = ForeignWrapper::new( FakeFactory::new(), ReflectionCache::new() );
	assert_eq!( wrapper.invoke( "Caption", &mut [] ), Err( DispatchError::NotBound ));
	assert_eq!( wrapper.get_property( "Caption" ), Err( DispatchError::NotBound ));
	assert!( wrapper.descriptor().is_none() );

}
