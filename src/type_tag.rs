use crate::value::Value ;



/// Type tag of a reflected parameter, return value or property.
///
/// Tags are what the reflection builder infers from catalog type descriptors and
/// what the codec uses as the "expected type" when converting in either direction.
/// Their textual form is used in member signatures such as `Move(int,int)`.
#[derive( Clone, Debug, Eq, Hash, PartialEq )]
pub enum TypeTag {
	Void,
	/// Any value; no conversion is applied.
	Variant,
	Bool,
	Int,
	UInt,
	LongLong,
	ULongLong,
	/// 64-bit fixed-point value carried as its raw scaled integer.
	Currency,
	Double,
	String,
	DateTime,
	Color,
	Font,
	Image,
	Bytes,
	StringList,
	List,
	/// Reference to a foreign object implementing the named interface.
	Object( String ),
	/// Integer backed by the named enumeration.
	Enum( String ),
	/// User-defined record of the named type.
	Record( String ),
	/// A type the builder could not map; members using it cannot be called.
	Unsupported( String ),
}

impl TypeTag {

	/// Whether a member with this tag can be called through the codec.
	#[inline] pub fn is_supported( &self ) -> bool { !matches!( self, Self::Unsupported( _ ))}

	/// Whether `value` already has the runtime shape this tag expects.
	pub fn accepts( &self, value: &Value ) -> bool {
		match ( self, value ) {
			( Self::Variant | Self::Void | Self::Unsupported( _ ), _ ) => true,
			( Self::Object( _ ), Value::Object( _ ) | Value::Font( _ ) | Value::Image( _ ) | Value::Invalid ) => true,
			( Self::Enum( _ ) | Self::Int, Value::Int( _ )) => true,
			( Self::Bool, Value::Bool( _ )) => true,
			( Self::UInt, Value::UInt( _ )) => true,
			( Self::LongLong | Self::Currency, Value::LongLong( _ )) => true,
			( Self::ULongLong, Value::ULongLong( _ )) => true,
			( Self::Double, Value::Double( _ )) => true,
			( Self::String, Value::String( _ )) => true,
			( Self::DateTime, Value::DateTime( _ )) => true,
			( Self::Color, Value::Color( _ )) => true,
			( Self::Font, Value::Font( _ )) => true,
			( Self::Image, Value::Image( _ )) => true,
			( Self::Bytes, Value::Bytes( _ )) => true,
			( Self::StringList, Value::StringList( _ )) => true,
			( Self::List, Value::List( _ )) => true,
			( Self::Record( expected ), Value::Record { name, .. }) => expected == name || expected.is_empty(),
			_ => false,
		}
	}

}

impl std::fmt::Display for TypeTag {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result {
		match self {
			Self::Void => f.write_str( "void" ),
			Self::Variant => f.write_str( "variant" ),
			Self::Bool => f.write_str( "bool" ),
			Self::Int => f.write_str( "int" ),
			Self::UInt => f.write_str( "uint" ),
			Self::LongLong => f.write_str( "i64" ),
			Self::ULongLong => f.write_str( "u64" ),
			Self::Currency => f.write_str( "currency" ),
			Self::Double => f.write_str( "double" ),
			Self::String => f.write_str( "string" ),
			Self::DateTime => f.write_str( "datetime" ),
			Self::Color => f.write_str( "color" ),
			Self::Font => f.write_str( "font" ),
			Self::Image => f.write_str( "image" ),
			Self::Bytes => f.write_str( "bytes" ),
			Self::StringList => f.write_str( "string_list" ),
			Self::List => f.write_str( "list" ),
			Self::Object( name ) => write!( f, "{}*", name ),
			Self::Enum( name ) | Self::Record( name ) => f.write_str( name ),
			Self::Unsupported( _ ) => f.write_str( "unsupported" ),
		}
	}
}

/// Normalizes a member signature: strips whitespace so that `"Move( int, int )"`
/// and `"Move(int,int)"` compare equal.
pub fn normalize_signature( signature: &str ) -> String {
	signature.chars().filter(| c | !c.is_whitespace() ).collect()
}

#[cfg( test )]
mod tests {
	use super::* ;

	#[test]
	fn signatures_normalize_whitespace() {
		assert_eq!( normalize_signature( " Move( int , string_list ) " ), "Move(int,string_list)" );
	}

	#[test]
	fn object_tags_accept_bridge_values() {
		let tag = TypeTag::Object( "IDispatch".into() );
		assert!( tag.accepts( &Value::Invalid ));
		assert!( tag.accepts( &Value::Font( Default::default() )));
		assert!( !tag.accepts( &Value::Int( 3 )));
		assert_eq!( tag.to_string(), "IDispatch*" );
	}

	#[test]
	fn enum_tags_accept_plain_integers() {
		assert!( TypeTag::Enum( "Alignment".into() ).accepts( &Value::Int( 2 )));
		assert!( !TypeTag::Enum( "Alignment".into() ).accepts( &Value::UInt( 2 )));
	}
}
