//! The foreign tagged-union wire value.
//!
//! A [`WireValue`] is what crosses the boundary: a type tag plus an inline
//! scalar, a string, a nested object reference, an array, or a by-reference box
//! the callee may write through. Payload ownership follows Rust ownership: the
//! side that builds a value for an outbound call drops it once the call returns,
//! object references release through [`ForeignRef`]'s drop, and values handed back
//! as results or out-parameters are moved to the receiver.

use std::sync::Arc ;
use parking_lot::Mutex ;

use crate::foreign::{ ForeignRef, DISP_E_PARAMNOTFOUND };



/// Type tag of a [`WireValue`].
#[derive( Copy, Clone, Debug, Eq, Hash, PartialEq )]
pub enum VarType {
	Empty,
	Null,
	I1, I2, I4, I8,
	U1, U2, U4, U8,
	R4, R8,
	Currency,
	Date,
	Bool,
	Str,
	Error,
	Object,
	Record,
	/// Heterogeneous element type of an array of tagged values.
	Variant,
	Array,
}

/// The foreign tagged-union value.
#[derive( Clone, Debug )]
pub enum WireValue {
	Empty,
	Null,
	I1( i8 ), I2( i16 ), I4( i32 ), I8( i64 ),
	U1( u8 ), U2( u16 ), U4( u32 ), U8( u64 ),
	R4( f32 ), R8( f64 ),
	/// Fixed-point 64-bit value scaled by 10 000.
	Currency( i64 ),
	/// Days since 1899-12-30, fractional part is the time of day.
	Date( f64 ),
	Bool( bool ),
	Str( String ),
	/// Status code; [`DISP_E_PARAMNOTFOUND`] marks an argument that was not supplied.
	Error( i32 ),
	Object( Option<ForeignRef> ),
	Record( WireRecord ),
	Array( WireArray ),
	ByRef( ByRef ),
}

impl WireValue {

	/// The "argument not supplied" marker.
	pub const fn missing() -> Self { Self::Error( DISP_E_PARAMNOTFOUND )}

	#[inline] pub fn is_missing( &self ) -> bool { matches!( self, Self::Error( DISP_E_PARAMNOTFOUND ))}

	#[inline] pub fn is_by_ref( &self ) -> bool { matches!( self, Self::ByRef( _ ))}

	/// Type tag of this value; by-reference boxes report the tag of their content.
	pub fn var_type( &self ) -> VarType {
		match self {
			Self::Empty => VarType::Empty,
			Self::Null => VarType::Null,
			Self::I1( _ ) => VarType::I1,
			Self::I2( _ ) => VarType::I2,
			Self::I4( _ ) => VarType::I4,
			Self::I8( _ ) => VarType::I8,
			Self::U1( _ ) => VarType::U1,
			Self::U2( _ ) => VarType::U2,
			Self::U4( _ ) => VarType::U4,
			Self::U8( _ ) => VarType::U8,
			Self::R4( _ ) => VarType::R4,
			Self::R8( _ ) => VarType::R8,
			Self::Currency( _ ) => VarType::Currency,
			Self::Date( _ ) => VarType::Date,
			Self::Bool( _ ) => VarType::Bool,
			Self::Str( _ ) => VarType::Str,
			Self::Error( _ ) => VarType::Error,
			Self::Object( _ ) => VarType::Object,
			Self::Record( _ ) => VarType::Record,
			Self::Array( _ ) => VarType::Array,
			Self::ByRef( inner ) => inner.get().var_type(),
		}
	}

	/// Whether a property put of this value should first be tried with
	/// reference semantics.
	pub fn prefers_put_ref( &self ) -> bool {
		matches!( self, Self::Object( _ ) | Self::Array( _ ) | Self::ByRef( _ ))
	}

}

impl PartialEq for WireValue {
	fn eq( &self, other: &Self ) -> bool {
		match ( self, other ) {
			( Self::Empty, Self::Empty ) | ( Self::Null, Self::Null ) => true,
			( Self::I1( a ), Self::I1( b )) => a == b,
			( Self::I2( a ), Self::I2( b )) => a == b,
			( Self::I4( a ), Self::I4( b )) => a == b,
			( Self::I8( a ), Self::I8( b )) => a == b,
			( Self::U1( a ), Self::U1( b )) => a == b,
			( Self::U2( a ), Self::U2( b )) => a == b,
			( Self::U4( a ), Self::U4( b )) => a == b,
			( Self::U8( a ), Self::U8( b )) => a == b,
			( Self::R4( a ), Self::R4( b )) => a == b,
			( Self::R8( a ), Self::R8( b )) => a == b,
			( Self::Currency( a ), Self::Currency( b )) => a == b,
			( Self::Date( a ), Self::Date( b )) => a == b,
			( Self::Bool( a ), Self::Bool( b )) => a == b,
			( Self::Str( a ), Self::Str( b )) => a == b,
			( Self::Error( a ), Self::Error( b )) => a == b,
			( Self::Object( None ), Self::Object( None )) => true,
			( Self::Object( Some( a )), Self::Object( Some( b ))) => a.ptr_eq( b ),
			( Self::Record( a ), Self::Record( b )) => a == b,
			( Self::Array( a ), Self::Array( b )) => a == b,
			( Self::ByRef( a ), Self::ByRef( b )) => a == b,
			_ => false,
		}
	}
}

/// A record (user-defined structure) value.
#[derive( Clone, Debug, PartialEq )]
pub struct WireRecord {
	pub type_name: String,
	pub fields: Vec<( String, WireValue )>,
}

/// A one- or two-dimensional array, stored row-major.
#[derive( Clone, Debug, PartialEq )]
pub struct WireArray {
	element: VarType,
	bounds: Vec<usize>,
	items: Vec<WireValue>,
}

impl WireArray {

	/// A one-dimensional array of `element`-typed items.
	pub fn one_d( element: VarType, items: Vec<WireValue> ) -> Self {
		Self { element, bounds: vec![ items.len() ], items }
	}

	/// A two-dimensional array. `items` must hold `rows * columns` entries, row-major.
	pub fn two_d( element: VarType, rows: usize, columns: usize, items: Vec<WireValue> ) -> Self {
		debug_assert_eq!( items.len(), rows * columns );
		Self { element, bounds: vec![ rows, columns ], items }
	}

	/// A byte blob.
	pub fn bytes( bytes: &[u8] ) -> Self {
		Self::one_d( VarType::U1, bytes.iter().map(| byte | WireValue::U1( *byte )).collect() )
	}

	/// An array of strings.
	pub fn strings( strings: &[String] ) -> Self {
		Self::one_d( VarType::Str, strings.iter().map(| s | WireValue::Str( s.clone() )).collect() )
	}

	#[inline] pub fn element( &self ) -> VarType { self.element }
	#[inline] pub fn dimensions( &self ) -> usize { self.bounds.len() }
	#[inline] pub fn bounds( &self ) -> &[usize] { &self.bounds }
	#[inline] pub fn items( &self ) -> &[WireValue] { &self.items }
	#[inline] pub fn is_empty( &self ) -> bool { self.items.is_empty() }

	/// Rows of a two-dimensional array; a one-dimensional array is a single row.
	/// A zero-column array still yields one empty slice per row.
	pub fn rows( &self ) -> impl Iterator<Item = &[WireValue]> {
		let ( rows, columns ) = match self.bounds.as_slice() {
			[ rows, columns ] => ( *rows, *columns ),
			_ => ( usize::from( !self.items.is_empty() ), self.items.len() ),
		};
		( 0..rows ).map( move | row | self.items.get( row * columns..( row + 1 ) * columns ).unwrap_or_default() )
	}

}

/// A heap box the callee may write through; the by-reference form of a value.
#[derive( Clone, Debug )]
pub struct ByRef( Arc<Mutex<WireValue>> );

impl ByRef {
	pub fn new( value: WireValue ) -> Self { Self( Arc::new( Mutex::new( value )))}

	/// Current content of the box.
	pub fn get( &self ) -> WireValue { self.0.lock().clone() }

	/// Replaces the content of the box.
	pub fn set( &self, value: WireValue ) { *self.0.lock() = value ; }

	/// Takes the content out, leaving [`WireValue::Empty`] behind.
	pub fn take( &self ) -> WireValue { std::mem::replace( &mut *self.0.lock(), WireValue::Empty )}
}

impl PartialEq for ByRef {
	fn eq( &self, other: &Self ) -> bool {
		Arc::ptr_eq( &self.0, &other.0 ) || self.get() == other.get()
	}
}

#[cfg( test )]
mod tests {
	use super::* ;

	#[test]
	fn missing_is_an_error_tag() {
		let missing = WireValue::missing();
		assert!( missing.is_missing() );
		assert_eq!( missing.var_type(), VarType::Error );
		assert!( !WireValue::Error( 5 ).is_missing() );
	}

	#[test]
	fn by_ref_reports_inner_tag_and_writes_through() {
		let boxed = ByRef::new( WireValue::I4( 1 ));
		let value = WireValue::ByRef( boxed.clone() );
		assert_eq!( value.var_type(), VarType::I4 );
		boxed.set( WireValue::Str( "x".into() ));
		assert_eq!( value.var_type(), VarType::Str );
	}

	#[test]
	fn rows_split_two_dimensional_arrays() {
		let array = WireArray::two_d( VarType::I4, 2, 3, ( 0..6 ).map( WireValue::I4 ).collect() );
		let rows = array.rows().collect::<Vec<_>>();
		assert_eq!( rows.len(), 2 );
		assert_eq!( rows[1], &[ WireValue::I4( 3 ), WireValue::I4( 4 ), WireValue::I4( 5 ) ]);
	}

	#[test]
	fn zero_column_arrays_keep_their_rows() {
		let array = WireArray::two_d( VarType::Variant, 3, 0, Vec::new() );
		let rows = array.rows().collect::<Vec<_>>();
		assert_eq!( rows.len(), 3 );
		assert!( rows.iter().all(| row | row.is_empty() ));
	}
}
