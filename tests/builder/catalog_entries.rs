use automation_link::{ BuildOptions, ReflectionBuilder, ReflectionCache, TypeTag };
use crate::fake::* ;

#[test]
fn classes_build_from_their_default_interface_and_sources() {

	let builder = ReflectionBuilder::new( ReflectionCache::new(), BuildOptions::default() );
	let ( descriptor, warnings ) = builder.build_from_catalog( &entry( "Label" ));

	assert!( warnings.is_empty(), "unexpected warnings: {:#?}", warnings );
	assert_eq!( descriptor.class_name(), "Label" );
	assert!( descriptor.property( "Caption" ).is_some() );
	assert!( descriptor.signal( "Clicked" ).is_some() );

}

#[test]
fn enumerations_build_into_value_tables() {

	let builder = ReflectionBuilder::new( ReflectionCache::new(), BuildOptions::default() );
	let ( descriptor, _ ) = builder.build_from_catalog( &entry( "Alignment" ));

	let def = descriptor.enums().find(| def | def.name == "Alignment" ).expect( "enum registered" );
	assert_eq!( def.values.get( "AlignRight" ), Some( &2 ));
	assert_eq!( def.values.keys().collect::<Vec<_>>(), vec![ "AlignLeft", "AlignCenter", "AlignRight" ]);

}

#[test]
fn event_parameters_keep_their_direction() {

	let builder = ReflectionBuilder::new( ReflectionCache::new(), BuildOptions::default() );
	let ( descriptor, _ ) = builder.build_from_catalog( &entry( "Label" ));
	let ( _, clicked ) = descriptor.signal( "Clicked" ).expect( "Clicked signal exists" );

	assert_eq!( clicked.params.len(), 2 );
	assert_eq!( clicked.params[ 0 ].tag, TypeTag::Int );
	assert!( !clicked.params[ 0 ].is_out() );
	assert_eq!( clicked.params[ 1 ].tag, TypeTag::Bool );
	assert!( clicked.params[ 1 ].is_out() );

}
