//! Conversion between host [`Value`]s and foreign [`WireValue`]s.
//!
//! Both directions take an optional expected [`TypeTag`]. The wire format alone
//! cannot tell a color from an enum-backed integer or a plain integer, and a host
//! integer bound for a currency parameter must be sent in fixed-point form, so the
//! caller passes the tag it learned from the reflection descriptor.
//!
//! Neither direction fails: values that cannot be represented degrade to the
//! "argument not supplied" marker outbound, and to the empty value of the
//! expected type inbound.

use std::borrow::Cow ;
use chrono::{ NaiveDate, NaiveDateTime, Timelike };

use crate::bridge::{ HostFont, HostPicture };
use crate::foreign::ForeignRef ;
use crate::type_tag::TypeTag ;
use crate::value::{ Color, Value };
use crate::wire::{ ByRef, VarType, WireArray, WireRecord, WireValue };



/// Lowest representable wire date; anything below it is the null date.
pub const NULL_DATE: f64 = -657_434.0 ;
/// Wire dates at or above this value are rejected as out of range.
const MAX_DATE: f64 = 949_998.0 ;
const MILLIS_PER_DAY: i64 = 86_400_000 ;

fn ole_epoch() -> NaiveDateTime {
	NaiveDate::from_ymd_opt( 1899, 12, 30 )
		.and_then(| date | date.and_hms_opt( 0, 0, 0 ))
		.unwrap_or_default()
}

/// Decodes a wire date. Values outside the representable range, including
/// anything before the null-date sentinel, yield an invalid date.
#[allow( clippy::cast_possible_truncation )]
pub fn ole_to_datetime( ole: f64 ) -> Option<NaiveDateTime> {
	if !ole.is_finite() || ole < NULL_DATE || ole >= MAX_DATE { return None }
	let whole = ole.trunc();
	let mut days = whole as i64 ;
	let mut millis = (( ole - whole ).abs() * MILLIS_PER_DAY as f64 ).round() as i64 ;
	if millis >= MILLIS_PER_DAY {
		millis -= MILLIS_PER_DAY ;
		days += 1 ;
	}
	ole_epoch()
		.checked_add_signed( chrono::Duration::days( days ))?
		.checked_add_signed( chrono::Duration::milliseconds( millis ))
}

/// Encodes a date/time in wire form; an invalid date encodes below the sentinel.
#[allow( clippy::cast_precision_loss )]
pub fn datetime_to_ole( datetime: Option<NaiveDateTime> ) -> f64 {
	let Some( datetime ) = datetime else { return NULL_DATE - 1.0 };
	let days = ( datetime.date() - ole_epoch().date() ).num_days();
	let time = datetime.time();
	let millis = i64::from( time.num_seconds_from_midnight() ) * 1000
		+ i64::from( time.nanosecond().min( 999_999_999 ) / 1_000_000 );
	let fraction = millis as f64 / MILLIS_PER_DAY as f64 ;
	match days >= 0 {
		true => days as f64 + fraction,
		false => days as f64 - fraction,
	}
}

/// Converts a host value into its wire form.
///
/// With `expected` set, the value is first coerced toward that type when it does
/// not already match. With `out` set, the result is a by-reference box the callee
/// can write through; an invalid value is then replaced by the empty value of the
/// expected type.
pub fn to_wire( value: &Value, expected: Option<&TypeTag>, out: bool ) -> WireValue {

	let coerced = match expected {
		Some( tag ) if value.is_valid() && !tag.accepts( value ) => value.convert( tag )
			.map_or( Cow::Borrowed( value ), Cow::Owned ),
		Some( tag ) if out && !value.is_valid() => Cow::Owned( Value::default_for( tag )),
		_ => Cow::Borrowed( value ),
	};

	let wire = encode( &coerced, expected, out );
	match out {
		true => WireValue::ByRef( ByRef::new( wire )),
		false => wire,
	}

}

fn encode( value: &Value, expected: Option<&TypeTag>, out: bool ) -> WireValue {
	match value {
		Value::Invalid if out => WireValue::Empty,
		Value::Invalid | Value::Missing => WireValue::missing(),
		Value::Bool( b ) => WireValue::Bool( *b ),
		Value::Int( v ) => WireValue::I4( *v ),
		Value::UInt( v ) => WireValue::U4( *v ),
		Value::LongLong( v ) => match expected {
			Some( TypeTag::Currency ) => WireValue::Currency( *v ),
			_ => WireValue::I8( *v ),
		},
		Value::ULongLong( v ) => WireValue::U8( *v ),
		Value::Double( v ) => WireValue::R8( *v ),
		Value::String( text ) => WireValue::Str( text.clone() ),
		Value::DateTime( datetime ) => WireValue::Date( datetime_to_ole( *datetime )),
		Value::Color( color ) => WireValue::U4( color.packed() ),
		Value::Font( font ) => WireValue::Object( Some( ForeignRef::new( HostFont( font.clone() )))),
		Value::Image( picture ) => WireValue::Object( Some( ForeignRef::new( HostPicture( picture.clone() )))),
		Value::Bytes( bytes ) => WireValue::Array( WireArray::bytes( bytes )),
		Value::StringList( strings ) => WireValue::Array( WireArray::strings( strings )),
		Value::List( items ) => WireValue::Array( encode_list( items )),
		Value::Record { name, fields } => WireValue::Record( WireRecord {
			type_name: name.clone(),
			fields: fields.iter().map(|( key, field )| ( key.clone(), encode( field, None, false ))).collect(),
		}),
		Value::Object( object ) => WireValue::Object( Some( object.clone() )),
	}
}

/// A list of lists becomes a two-dimensional array whose column count is the
/// length of the first row; longer rows are truncated and shorter ones padded.
fn encode_list( items: &[Value] ) -> WireArray {

	let rows = items.iter()
		.map(| item | match item { Value::List( row ) => Some( row ), _ => None })
		.collect::<Option<Vec<_>>>()
		.filter(| rows | !rows.is_empty() );

	match rows {
		Some( rows ) => {
			let columns = rows[0].len();
			let cells = rows.iter()
				.flat_map(| row | ( 0..columns ).map(| column | match row.get( column ) {
					Some( cell ) => encode( cell, None, false ),
					None => WireValue::Empty,
				}))
				.collect();
			WireArray::two_d( VarType::Variant, rows.len(), columns, cells )
		},
		None => WireArray::one_d( VarType::Variant, items.iter().map(| item | encode( item, None, false )).collect() ),
	}

}

/// Converts a wire value into a host value.
///
/// `expected` disambiguates 32-bit integers (color, enum, plain integer) and
/// object references. When the decoded value still does not match `expected`, a
/// final coercion runs and substitutes the expected type's empty value on failure.
/// "Argument not supplied" always reads back as [`Value::Missing`].
pub fn from_wire( wire: &WireValue, expected: Option<&TypeTag> ) -> Value {
	let decoded = decode( wire, expected );
	match expected {
		Some( tag ) if decoded != Value::Missing && !tag.accepts( &decoded ) =>
			decoded.convert( tag ).unwrap_or_else(|| Value::default_for( tag )),
		_ => decoded,
	}
}

#[allow( clippy::cast_possible_wrap )]
fn decode( wire: &WireValue, expected: Option<&TypeTag> ) -> Value {
	match wire {
		WireValue::Empty | WireValue::Null | WireValue::Object( None ) => Value::Invalid,
		WireValue::I1( v ) => Value::Int( i32::from( *v )),
		WireValue::I2( v ) => Value::Int( i32::from( *v )),
		WireValue::I4( v ) => match expected {
			Some( TypeTag::Color ) => Value::Color( Color::from_packed( *v as u32 )),
			_ => Value::Int( *v ),
		},
		WireValue::U1( v ) => Value::UInt( u32::from( *v )),
		WireValue::U2( v ) => Value::UInt( u32::from( *v )),
		WireValue::U4( v ) => match expected {
			Some( TypeTag::Color ) => Value::Color( Color::from_packed( *v )),
			Some( TypeTag::Int | TypeTag::Enum( _ )) => Value::Int( *v as i32 ),
			_ => Value::UInt( *v ),
		},
		WireValue::I8( v ) | WireValue::Currency( v ) => Value::LongLong( *v ),
		WireValue::U8( v ) => Value::ULongLong( *v ),
		WireValue::R4( v ) => Value::Double( f64::from( *v )),
		WireValue::R8( v ) => Value::Double( *v ),
		WireValue::Date( ole ) => Value::DateTime( ole_to_datetime( *ole )),
		WireValue::Bool( b ) => Value::Bool( *b ),
		WireValue::Str( text ) => Value::String( text.clone() ),
		WireValue::Error( _ ) if wire.is_missing() => Value::Missing,
		WireValue::Error( code ) => Value::Int( *code ),
		WireValue::Object( Some( object )) => decode_object( object, expected ),
		WireValue::Record( record ) => Value::Record {
			name: record.type_name.clone(),
			fields: record.fields.iter().map(|( key, field )| ( key.clone(), decode( field, None ))).collect(),
		},
		WireValue::Array( array ) => decode_array( array ),
		WireValue::ByRef( inner ) => decode( &inner.get(), expected ),
	}
}

fn decode_object( object: &ForeignRef, expected: Option<&TypeTag> ) -> Value {
	if let Some( TypeTag::Object( _ )) = expected { return Value::Object( object.clone() )}
	if let Some( font ) = object.font() { return Value::Font( font )}
	if let Some( picture ) = object.picture() { return Value::Image( picture )}
	Value::Object( object.clone() )
}

fn decode_array( array: &WireArray ) -> Value {
	if array.dimensions() == 2 {
		return Value::List( array.rows()
			.map(| row | Value::List( row.iter().map(| cell | decode( cell, None )).collect() ))
			.collect() )
	}
	match array.element() {
		VarType::U1 => Value::Bytes( array.items().iter()
			.map(| item | match item {
				WireValue::U1( byte ) => *byte,
				other => decode( other, None ).to_i64().and_then(| v | u8::try_from( v ).ok() ).unwrap_or_default(),
			})
			.collect() ),
		VarType::Str => Value::StringList( array.items().iter()
			.map(| item | match item {
				WireValue::Str( text ) => text.clone(),
				other => decode( other, None ).to_text().unwrap_or_default(),
			})
			.collect() ),
		_ => Value::List( array.items().iter().map(| item | decode( item, None )).collect() ),
	}
}

/// Writes a host value back into a by-reference wire slot after a call or an
/// event emission. Slots that are not by-reference are left untouched.
pub fn write_back( slot: &WireValue, value: &Value, expected: Option<&TypeTag> ) {
	if let WireValue::ByRef( inner ) = slot {
		inner.set( to_wire( value, expected, false ));
	}
}

#[cfg( test )]
mod tests {
	use super::* ;
	use crate::value::{ Font, Picture };
	use proptest::prelude::* ;

	fn round_trip( value: &Value, tag: &TypeTag ) -> Value {
		from_wire( &to_wire( value, Some( tag ), false ), Some( tag ))
	}

	#[test]
	fn thirty_two_bit_integers_disambiguate_by_expected_type() {
		let wire = WireValue::U4( 0x0000_00FF );
		assert_eq!( from_wire( &wire, Some( &TypeTag::Color )), Value::Color( Color::rgb( 255, 0, 0 )));
		assert_eq!( from_wire( &wire, Some( &TypeTag::Enum( "Shape".into() ))), Value::Int( 255 ));
		assert_eq!( from_wire( &wire, None ), Value::UInt( 255 ));
		assert_eq!( from_wire( &WireValue::I4( 0x00FF_0000 ), Some( &TypeTag::Color )), Value::Color( Color::rgb( 0, 0, 255 )));
	}

	#[test]
	fn missing_reads_back_as_missing_never_zero() {
		assert_eq!( from_wire( &WireValue::missing(), Some( &TypeTag::Int )), Value::Missing );
		assert_eq!( from_wire( &WireValue::missing(), None ), Value::Missing );
		assert_eq!( to_wire( &Value::Missing, Some( &TypeTag::Int ), false ), WireValue::missing() );
		assert_eq!( to_wire( &Value::Invalid, None, false ), WireValue::missing() );
	}

	#[test]
	fn empty_arrays_decode_to_empty_lists() {
		assert_eq!( from_wire( &WireValue::Array( WireArray::one_d( VarType::Variant, vec![] )), None ), Value::List( vec![] ));
		assert_eq!( from_wire( &WireValue::Array( WireArray::strings( &[] )), None ), Value::StringList( vec![] ));
		assert_eq!( from_wire( &WireValue::Array( WireArray::bytes( &[] )), None ), Value::Bytes( vec![] ));
	}

	#[test]
	fn dates_before_the_sentinel_are_invalid() {
		assert_eq!( from_wire( &WireValue::Date( NULL_DATE - 0.5 ), None ), Value::DateTime( None ));
		assert_eq!( from_wire( &WireValue::Date( MAX_DATE ), None ), Value::DateTime( None ));
		assert_eq!( to_wire( &Value::DateTime( None ), None, false ), WireValue::Date( NULL_DATE - 1.0 ));
	}

	#[test]
	fn dates_use_the_1899_epoch() {
		let noon = NaiveDate::from_ymd_opt( 1899, 12, 30 ).and_then(| d | d.and_hms_opt( 12, 0, 0 ));
		assert_eq!( ole_to_datetime( 0.5 ), noon );
		let early = NaiveDate::from_ymd_opt( 1899, 12, 29 ).and_then(| d | d.and_hms_opt( 6, 0, 0 ));
		assert_eq!( ole_to_datetime( -1.25 ), early );
		assert_eq!( datetime_to_ole( early ), -1.25 );
		let known = NaiveDate::from_ymd_opt( 2000, 1, 1 ).and_then(| d | d.and_hms_opt( 0, 0, 0 ));
		assert_eq!( datetime_to_ole( known ), 36526.0 );
	}

	#[test]
	fn nested_lists_become_two_dimensional_arrays() {
		let table = Value::List( vec![
			Value::List( vec![ Value::Int( 1 ), Value::Int( 2 ) ]),
			Value::List( vec![ Value::Int( 3 ), Value::Int( 4 ), Value::Int( 99 ) ]),
			Value::List( vec![ Value::Int( 5 ) ]),
		]);
		let WireValue::Array( array ) = to_wire( &table, None, false ) else { panic!( "expected an array" ) };
		assert_eq!( array.bounds(), &[ 3, 2 ]);
		assert_eq!( array.items()[3], WireValue::I4( 4 ));
		assert_eq!( array.items()[5], WireValue::Empty );
	}

	#[test]
	fn empty_rows_survive_the_round_trip() {
		let blank = Value::List( vec![ Value::List( vec![] ), Value::List( vec![] ) ]);
		let wire = to_wire( &blank, None, false );
		let WireValue::Array( array ) = &wire else { panic!( "expected an array" ) };
		assert_eq!( array.bounds(), &[ 2, 0 ]);
		assert_eq!( from_wire( &wire, None ), blank );

		let leading_blank = Value::List( vec![ Value::List( vec![] ), Value::List( vec![ Value::Int( 1 ), Value::Int( 2 ) ]) ]);
		let wire = to_wire( &leading_blank, None, false );
		let WireValue::Array( array ) = &wire else { panic!( "expected an array" ) };
		assert_eq!( array.bounds(), &[ 2, 0 ]);
		assert_eq!( from_wire( &wire, None ), blank );
	}

	#[test]
	fn currency_uses_fixed_point_form_only_when_expected() {
		assert_eq!( to_wire( &Value::LongLong( 15_000 ), Some( &TypeTag::Currency ), false ), WireValue::Currency( 15_000 ));
		assert_eq!( to_wire( &Value::LongLong( 15_000 ), None, false ), WireValue::I8( 15_000 ));
		assert_eq!( to_wire( &Value::Int( 3 ), Some( &TypeTag::Currency ), false ), WireValue::Currency( 3 ));
	}

	#[test]
	fn out_arguments_are_boxed_with_expected_defaults() {
		let WireValue::ByRef( slot ) = to_wire( &Value::Invalid, Some( &TypeTag::String ), true ) else {
			panic!( "expected a by-reference box" )
		};
		assert_eq!( slot.get(), WireValue::Str( String::new() ));
		let wire = WireValue::ByRef( slot.clone() );
		write_back( &wire, &Value::from( "done" ), Some( &TypeTag::String ));
		assert_eq!( from_wire( &wire, Some( &TypeTag::String )), Value::from( "done" ));
	}

	#[test]
	fn fonts_and_pictures_travel_as_bridge_objects() {
		let font = Font { family: "Serif".into(), point_size: 11.0, weight: 700, ..Font::default() };
		let wire = to_wire( &Value::Font( font.clone() ), None, false );
		assert!( matches!( wire, WireValue::Object( Some( _ ))));
		assert_eq!( from_wire( &wire, None ), Value::Font( font ));
		let picture = Picture { width: 2, height: 1, data: vec![ 0, 1 ] };
		assert_eq!( round_trip( &Value::Image( picture.clone() ), &TypeTag::Image ), Value::Image( picture ));
	}

	#[test]
	fn failed_coercions_substitute_defaults() {
		assert_eq!( from_wire( &WireValue::Str( "abc".into() ), Some( &TypeTag::Int )), Value::Int( 0 ));
		assert_eq!( from_wire( &WireValue::Empty, Some( &TypeTag::String )), Value::String( String::new() ));
		assert_eq!( from_wire( &WireValue::Str( "42".into() ), Some( &TypeTag::Int )), Value::Int( 42 ));
	}

	fn datetime_strategy() -> impl Strategy<Value = NaiveDateTime> {
		( 1601_i32..4000, 1_u32..=12, 1_u32..=28, 0_u32..24, 0_u32..60, 0_u32..60 )
			.prop_filter_map( "valid date", |( y, m, d, h, min, s )| {
				NaiveDate::from_ymd_opt( y, m, d )?.and_hms_opt( h, min, s )
			})
	}

	proptest! {
		#[test]
		fn scalars_round_trip( b in any::<bool>(), i in any::<i32>(), u in any::<u32>(), l in any::<i64>(), ul in any::<u64>(), d in -1.0e12_f64..1.0e12 ) {
			prop_assert_eq!( round_trip( &Value::Bool( b ), &TypeTag::Bool ), Value::Bool( b ));
			prop_assert_eq!( round_trip( &Value::Int( i ), &TypeTag::Int ), Value::Int( i ));
			prop_assert_eq!( round_trip( &Value::UInt( u ), &TypeTag::UInt ), Value::UInt( u ));
			prop_assert_eq!( round_trip( &Value::LongLong( l ), &TypeTag::LongLong ), Value::LongLong( l ));
			prop_assert_eq!( round_trip( &Value::LongLong( l ), &TypeTag::Currency ), Value::LongLong( l ));
			prop_assert_eq!( round_trip( &Value::ULongLong( ul ), &TypeTag::ULongLong ), Value::ULongLong( ul ));
			prop_assert_eq!( round_trip( &Value::Double( d ), &TypeTag::Double ), Value::Double( d ));
		}

		#[test]
		fn strings_round_trip( text in ".*", list in proptest::collection::vec( ".*", 0..8 )) {
			prop_assert_eq!( round_trip( &Value::String( text.clone() ), &TypeTag::String ), Value::String( text ));
			prop_assert_eq!( round_trip( &Value::StringList( list.clone() ), &TypeTag::StringList ), Value::StringList( list ));
		}

		#[test]
		fn arrays_round_trip( ints in proptest::collection::vec( any::<i32>(), 0..16 ), bytes in proptest::collection::vec( any::<u8>(), 0..32 )) {
			let list = Value::List( ints.into_iter().map( Value::Int ).collect() );
			prop_assert_eq!( round_trip( &list, &TypeTag::List ), list );
			prop_assert_eq!( round_trip( &Value::Bytes( bytes.clone() ), &TypeTag::Bytes ), Value::Bytes( bytes ));
		}

		#[test]
		fn dates_round_trip( datetime in datetime_strategy() ) {
			prop_assert_eq!( round_trip( &Value::DateTime( Some( datetime )), &TypeTag::DateTime ), Value::DateTime( Some( datetime )));
		}

		#[test]
		fn colors_round_trip( r in any::<u8>(), g in any::<u8>(), b in any::<u8>() ) {
			let color = Value::Color( Color::rgb( r, g, b ));
			prop_assert_eq!( round_trip( &color, &TypeTag::Color ), color );
		}
	}
}
