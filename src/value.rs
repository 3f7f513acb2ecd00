//! The host's dynamic value and its coercion rules.

use chrono::{ NaiveDate, NaiveDateTime };
use itertools::Itertools ;

use crate::codec::{ datetime_to_ole, ole_to_datetime };
use crate::foreign::ForeignRef ;
use crate::type_tag::TypeTag ;



/// A 32-bit color. The wire form is packed `0x00BBGGRR`, so alpha does not survive
/// a round trip through the foreign side.
#[derive( Copy, Clone, Debug, Eq, Hash, PartialEq )]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	pub a: u8,
}

impl Color {
	pub const fn rgb( r: u8, g: u8, b: u8 ) -> Self { Self { r, g, b, a: 0xFF }}

	/// Unpacks the `0x00BBGGRR` wire form.
	pub const fn from_packed( packed: u32 ) -> Self {
		Self::rgb(( packed & 0xFF ) as u8, (( packed >> 8 ) & 0xFF ) as u8, (( packed >> 16 ) & 0xFF ) as u8 )
	}

	/// Packs into the `0x00BBGGRR` wire form.
	pub const fn packed( self ) -> u32 {
		( self.r as u32 ) | (( self.g as u32 ) << 8 ) | (( self.b as u32 ) << 16 )
	}

	/// Parses `#rrggbb`.
	pub fn parse( text: &str ) -> Option<Self> {
		let hex = text.trim().strip_prefix( '#' )?;
		if hex.len() != 6 { return None }
		let channel = | range: std::ops::Range<usize> | u8::from_str_radix( hex.get( range )?, 16 ).ok();
		Some( Self::rgb( channel( 0..2 )?, channel( 2..4 )?, channel( 4..6 )? ))
	}
}

impl Default for Color {
	fn default() -> Self { Self::rgb( 0, 0, 0 )}
}

impl std::fmt::Display for Color {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result {
		write!( f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b )
	}
}

/// Font description exchanged with objects exposing the font capability.
#[derive( Clone, Debug, Default, PartialEq )]
pub struct Font {
	pub family: String,
	pub point_size: f64,
	pub weight: u16,
	pub italic: bool,
	pub underline: bool,
	pub strikeout: bool,
}

/// Image exchanged with objects exposing the picture capability.
#[derive( Clone, Debug, Default, PartialEq, Eq )]
pub struct Picture {
	pub width: u32,
	pub height: u32,
	pub data: Vec<u8>,
}

/// The host's tagged dynamic value.
#[derive( Clone, Debug, Default, PartialEq )]
pub enum Value {
	/// No value.
	#[default] Invalid,
	/// An argument that was deliberately not supplied; the foreign side applies
	/// its own default.
	Missing,
	Bool( bool ),
	Int( i32 ),
	UInt( u32 ),
	LongLong( i64 ),
	ULongLong( u64 ),
	Double( f64 ),
	String( String ),
	/// `None` is an invalid date/time.
	DateTime( Option<NaiveDateTime> ),
	Color( Color ),
	Font( Font ),
	Image( Picture ),
	Bytes( Vec<u8> ),
	StringList( Vec<String> ),
	List( Vec<Value> ),
	Record { name: String, fields: Vec<( String, Value )> },
	Object( ForeignRef ),
}

impl Value {

	#[inline] pub fn is_valid( &self ) -> bool { !matches!( self, Self::Invalid | Self::Missing )}

	/// Runtime type of this value expressed as a tag.
	pub fn tag( &self ) -> TypeTag {
		match self {
			Self::Invalid | Self::Missing => TypeTag::Variant,
			Self::Bool( _ ) => TypeTag::Bool,
			Self::Int( _ ) => TypeTag::Int,
			Self::UInt( _ ) => TypeTag::UInt,
			Self::LongLong( _ ) => TypeTag::LongLong,
			Self::ULongLong( _ ) => TypeTag::ULongLong,
			Self::Double( _ ) => TypeTag::Double,
			Self::String( _ ) => TypeTag::String,
			Self::DateTime( _ ) => TypeTag::DateTime,
			Self::Color( _ ) => TypeTag::Color,
			Self::Font( _ ) => TypeTag::Font,
			Self::Image( _ ) => TypeTag::Image,
			Self::Bytes( _ ) => TypeTag::Bytes,
			Self::StringList( _ ) => TypeTag::StringList,
			Self::List( _ ) => TypeTag::List,
			Self::Record { name, .. } => TypeTag::Record( name.clone() ),
			Self::Object( _ ) => TypeTag::Object( "IDispatch".to_string() ),
		}
	}

	/// The empty value of a type, substituted when a coercion fails.
	pub fn default_for( tag: &TypeTag ) -> Self {
		match tag {
			TypeTag::Bool => Self::Bool( false ),
			TypeTag::Int | TypeTag::Enum( _ ) => Self::Int( 0 ),
			TypeTag::UInt => Self::UInt( 0 ),
			TypeTag::LongLong | TypeTag::Currency => Self::LongLong( 0 ),
			TypeTag::ULongLong => Self::ULongLong( 0 ),
			TypeTag::Double => Self::Double( 0.0 ),
			TypeTag::String => Self::String( String::new() ),
			TypeTag::DateTime => Self::DateTime( None ),
			TypeTag::Color => Self::Color( Color::default() ),
			TypeTag::Font => Self::Font( Font::default() ),
			TypeTag::Image => Self::Image( Picture::default() ),
			TypeTag::Bytes => Self::Bytes( Vec::new() ),
			TypeTag::StringList => Self::StringList( Vec::new() ),
			TypeTag::List => Self::List( Vec::new() ),
			TypeTag::Record( name ) => Self::Record { name: name.clone(), fields: Vec::new() },
			TypeTag::Void | TypeTag::Variant | TypeTag::Object( _ ) | TypeTag::Unsupported( _ ) => Self::Invalid,
		}
	}

	/// Converts toward `target`. Returns `None` when no sensible conversion exists.
	pub fn convert( &self, target: &TypeTag ) -> Option<Self> {
		if target.accepts( self ) { return Some( self.clone() )}
		match target {
			TypeTag::Bool => self.to_bool().map( Self::Bool ),
			TypeTag::Int | TypeTag::Enum( _ ) => self.to_i64().and_then(| v | i32::try_from( v ).ok() ).map( Self::Int ),
			TypeTag::UInt => self.to_i64().and_then(| v | u32::try_from( v ).ok() ).map( Self::UInt ),
			TypeTag::LongLong | TypeTag::Currency => self.to_i64().map( Self::LongLong ),
			TypeTag::ULongLong => match self {
				Self::ULongLong( v ) => Some( Self::ULongLong( *v )),
				_ => self.to_i64().and_then(| v | u64::try_from( v ).ok() ).map( Self::ULongLong ),
			},
			TypeTag::Double => self.to_f64().map( Self::Double ),
			TypeTag::String => self.to_text().map( Self::String ),
			TypeTag::DateTime => match self {
				Self::String( text ) => parse_datetime( text ).map(| dt | Self::DateTime( Some( dt ))),
				Self::Double( ole ) => Some( Self::DateTime( ole_to_datetime( *ole ))),
				_ => None,
			},
			TypeTag::Color => match self {
				Self::Int( v ) => Some( Self::Color( Color::from_packed( *v as u32 ))),
				Self::UInt( v ) => Some( Self::Color( Color::from_packed( *v ))),
				Self::String( text ) => Color::parse( text ).map( Self::Color ),
				_ => None,
			},
			TypeTag::Bytes => match self {
				Self::String( text ) => Some( Self::Bytes( text.as_bytes().to_vec() )),
				Self::List( items ) => items.iter()
					.map(| item | item.to_i64().and_then(| v | u8::try_from( v ).ok() ))
					.collect::<Option<Vec<_>>>()
					.map( Self::Bytes ),
				_ => None,
			},
			TypeTag::StringList => match self {
				Self::String( text ) => Some( Self::StringList( vec![ text.clone() ])),
				Self::List( items ) => items.iter()
					.map( Self::to_text )
					.collect::<Option<Vec<_>>>()
					.map( Self::StringList ),
				_ => None,
			},
			TypeTag::List => match self {
				Self::StringList( items ) => Some( Self::List( items.iter().cloned().map( Self::String ).collect() )),
				Self::Bytes( bytes ) => Some( Self::List( bytes.iter().map(| b | Self::UInt( u32::from( *b ))).collect() )),
				_ => None,
			},
			TypeTag::Font | TypeTag::Image | TypeTag::Record( _ ) | TypeTag::Object( _ ) => None,
			TypeTag::Void | TypeTag::Variant | TypeTag::Unsupported( _ ) => Some( self.clone() ),
		}
	}

	/// Boolean reading of a scalar.
	pub fn to_bool( &self ) -> Option<bool> {
		match self {
			Self::Bool( b ) => Some( *b ),
			Self::String( text ) => match text.trim().to_ascii_lowercase().as_str() {
				"true" => Some( true ),
				"false" => Some( false ),
				_ => self.to_i64().map(| v | v != 0 ),
			},
			_ => self.to_i64().map(| v | v != 0 ),
		}
	}

	/// Integer reading of a scalar; doubles are truncated when in range.
	pub fn to_i64( &self ) -> Option<i64> {
		match self {
			Self::Bool( b ) => Some( i64::from( *b )),
			Self::Int( v ) => Some( i64::from( *v )),
			Self::UInt( v ) => Some( i64::from( *v )),
			Self::LongLong( v ) => Some( *v ),
			Self::ULongLong( v ) => i64::try_from( *v ).ok(),
			#[allow( clippy::cast_possible_truncation )]
			Self::Double( v ) if v.is_finite() && *v >= i64::MIN as f64 && *v <= i64::MAX as f64 => Some( v.trunc() as i64 ),
			Self::Color( color ) => Some( i64::from( color.packed() )),
			Self::String( text ) => {
				let text = text.trim();
				text.parse::<i64>().ok().or_else(|| Self::Double( text.parse::<f64>().ok()? ).to_i64() )
			},
			_ => None,
		}
	}

	/// Floating-point reading of a scalar.
	#[allow( clippy::cast_precision_loss )]
	pub fn to_f64( &self ) -> Option<f64> {
		match self {
			Self::Double( v ) => Some( *v ),
			Self::LongLong( v ) => Some( *v as f64 ),
			Self::ULongLong( v ) => Some( *v as f64 ),
			Self::String( text ) => text.trim().parse::<f64>().ok(),
			Self::DateTime( dt ) => Some( datetime_to_ole( *dt )),
			_ => self.to_i64().map(| v | v as f64 ),
		}
	}

	/// Textual reading of a scalar.
	pub fn to_text( &self ) -> Option<String> {
		Some( match self {
			Self::String( text ) => text.clone(),
			Self::Bool( b ) => b.to_string(),
			Self::Int( v ) => v.to_string(),
			Self::UInt( v ) => v.to_string(),
			Self::LongLong( v ) => v.to_string(),
			Self::ULongLong( v ) => v.to_string(),
			Self::Double( v ) => v.to_string(),
			Self::DateTime( Some( dt )) => dt.format( "%Y-%m-%dT%H:%M:%S%.3f" ).to_string(),
			Self::Color( color ) => color.to_string(),
			Self::StringList( items ) => items.iter().join( "," ),
			_ => return None,
		})
	}

	pub fn as_str( &self ) -> Option<&str> {
		match self {
			Self::String( text ) => Some( text ),
			_ => None,
		}
	}

	pub fn as_object( &self ) -> Option<&ForeignRef> {
		match self {
			Self::Object( object ) => Some( object ),
			_ => None,
		}
	}

}

fn parse_datetime( text: &str ) -> Option<NaiveDateTime> {
	let text = text.trim();
	NaiveDateTime::parse_from_str( text, "%Y-%m-%dT%H:%M:%S%.f" ).ok()
		.or_else(|| NaiveDateTime::parse_from_str( text, "%Y-%m-%d %H:%M:%S%.f" ).ok() )
		.or_else(|| NaiveDate::parse_from_str( text, "%Y-%m-%d" ).ok().and_then(| date | date.and_hms_opt( 0, 0, 0 )))
}

impl From<bool> for Value { fn from( v: bool ) -> Self { Self::Bool( v )}}
impl From<i32> for Value { fn from( v: i32 ) -> Self { Self::Int( v )}}
impl From<u32> for Value { fn from( v: u32 ) -> Self { Self::UInt( v )}}
impl From<i64> for Value { fn from( v: i64 ) -> Self { Self::LongLong( v )}}
impl From<u64> for Value { fn from( v: u64 ) -> Self { Self::ULongLong( v )}}
impl From<f64> for Value { fn from( v: f64 ) -> Self { Self::Double( v )}}
impl From<&str> for Value { fn from( v: &str ) -> Self { Self::String( v.to_string() )}}
impl From<String> for Value { fn from( v: String ) -> Self { Self::String( v )}}
impl From<Color> for Value { fn from( v: Color ) -> Self { Self::Color( v )}}
impl From<NaiveDateTime> for Value { fn from( v: NaiveDateTime ) -> Self { Self::DateTime( Some( v ))}}
impl From<Vec<Value>> for Value { fn from( v: Vec<Value> ) -> Self { Self::List( v )}}
impl From<ForeignRef> for Value { fn from( v: ForeignRef ) -> Self { Self::Object( v )}}

#[cfg( test )]
mod tests {
	use super::* ;

	#[test]
	fn color_packs_low_byte_red() {
		let color = Color::rgb( 0x11, 0x22, 0x33 );
		assert_eq!( color.packed(), 0x0033_2211 );
		assert_eq!( Color::from_packed( 0x0033_2211 ), color );
		assert_eq!( Color::parse( &color.to_string() ), Some( color ));
	}

	#[test]
	fn numeric_conversions_respect_range() {
		assert_eq!( Value::LongLong( 7 ).convert( &TypeTag::Int ), Some( Value::Int( 7 )));
		assert_eq!( Value::LongLong( i64::MAX ).convert( &TypeTag::Int ), None );
		assert_eq!( Value::Int( -1 ).convert( &TypeTag::UInt ), None );
		assert_eq!( Value::Double( 2.9 ).convert( &TypeTag::Int ), Some( Value::Int( 2 )));
		assert_eq!( Value::from( " 12 " ).convert( &TypeTag::LongLong ), Some( Value::LongLong( 12 )));
	}

	#[test]
	fn strings_convert_to_structured_values() {
		assert_eq!( Value::from( "TRUE" ).convert( &TypeTag::Bool ), Some( Value::Bool( true )));
		assert_eq!( Value::from( "#ff0000" ).convert( &TypeTag::Color ), Some( Value::Color( Color::rgb( 255, 0, 0 ))));
		let expected = NaiveDate::from_ymd_opt( 2024, 2, 29 ).and_then(| d | d.and_hms_opt( 13, 5, 0 ));
		assert_eq!( Value::from( "2024-02-29T13:05:00" ).convert( &TypeTag::DateTime ), Some( Value::DateTime( expected )));
	}

	#[test]
	fn lists_convert_between_shapes() {
		let list = Value::List( vec![ Value::from( "a" ), Value::Int( 2 ) ]);
		assert_eq!( list.convert( &TypeTag::StringList ), Some( Value::StringList( vec![ "a".into(), "2".into() ])));
		let bytes = Value::List( vec![ Value::Int( 1 ), Value::UInt( 255 ) ]);
		assert_eq!( bytes.convert( &TypeTag::Bytes ), Some( Value::Bytes( vec![ 1, 255 ])));
		assert_eq!( Value::List( vec![ Value::Int( 256 ) ]).convert( &TypeTag::Bytes ), None );
	}

	#[test]
	fn invalid_values_do_not_convert() {
		assert_eq!( Value::Invalid.convert( &TypeTag::Int ), None );
		assert_eq!( Value::default_for( &TypeTag::Int ), Value::Int( 0 ));
		assert_eq!( Value::default_for( &TypeTag::Object( "IDispatch".into() )), Value::Invalid );
	}
}
