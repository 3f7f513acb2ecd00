use std::sync::Arc ;
use automation_link::DispatchError ;
use crate::fake::* ;

#[test]
fn verbs_are_listed_and_performed_by_name() {

	let object = label_object();
	let verbs = object.verbs.clone().expect( "label has verbs" );
	let wrapper = wrap( &object );

	let names = wrapper.verbs().expect( "verbs are enumerable" ).into_iter().map(| verb | verb.name ).collect::<Vec<_>>();
	assert_eq!( names, vec![ "Open", "Properties" ]);

	wrapper.perform_verb( "Properties" ).expect( "verb exists" );
	assert_eq!( *verbs.performed.lock(), vec![ 1 ]);

}

#[test]
fn unknown_verbs_suggest_alternatives() {

	let wrapper = wrap( &label_object() );

	match wrapper.perform_verb( "open" ) {
		Err( DispatchError::MemberNotFound { name, candidates }) => {
			assert_eq!( name, "open" );
			assert_eq!( candidates, vec![ "Open".to_string() ]);
		},
		value => panic!( "Expected Err( MemberNotFound ), found: {:#?}", value ),
	}

}

#[test]
fn objects_without_verbs_report_not_implemented() {

	let object = Arc::new( FakeObject { dispatch: Some( Arc::new( label_dispatch() )), ..FakeObject::default() });
	let wrapper = wrap( &object );

	assert!( matches!( wrapper.verbs(), Err( DispatchError::Foreign { .. })));

}
