//! Literal-argument mini-grammar for calls written as a single string, e.g.
//! `Move( 10, 0x20, "left \"edge\"", AlignRight )`.
//!
//! Grammar, per comma-separated argument:
//! - `"…"` a string with `\"`, `\\`, `\n` and `\t` escapes
//! - `true` / `false`
//! - decimal or `0x` hexadecimal integers (32-bit if they fit, else 64-bit)
//! - floating-point numbers
//! - an enumeration key known to the caller's lookup
//! - anything else is kept as trimmed text
//!
//! An empty argument stands for an omitted one.

use thiserror::Error ;

use crate::value::Value ;



#[derive( Error, Debug, Clone, PartialEq, Eq )]
pub enum LiteralError {
	#[error( "Unterminated string literal starting at byte {0}" )] UnterminatedString( usize ),
	#[error( "Unbalanced parenthesis in \"{0}\"" )] UnbalancedParenthesis( String ),
}

/// Splits `name( args )` into the member name and the raw argument text.
/// Bare names (property syntax) yield `None` for the arguments.
///
/// # Errors
/// [`LiteralError::UnbalancedParenthesis`] if an opening parenthesis is not
/// closed at the end of the text.
pub fn split_call( text: &str ) -> Result<( &str, Option<&str> ), LiteralError> {
	let text = text.trim();
	let Some( open ) = text.find( '(' ) else {
		return match text.contains( ')' ) {
			true => Err( LiteralError::UnbalancedParenthesis( text.to_string() )),
			false => Ok(( text, None )),
		}
	};
	let inner = text[ open + 1.. ].strip_suffix( ')' )
		.ok_or_else(|| LiteralError::UnbalancedParenthesis( text.to_string() ))?;
	Ok(( text[ ..open ].trim_end(), Some( inner )))
}

/// Parses a comma-separated argument list. `enum_value` resolves enumeration keys.
///
/// # Errors
/// [`LiteralError::UnterminatedString`] for a quote without its closing quote.
pub fn parse_arguments( text: &str, enum_value: impl Fn( &str ) -> Option<i32> ) -> Result<Vec<Value>, LiteralError> {
	if text.trim().is_empty() { return Ok( Vec::new() )}
	split_arguments( text )?
		.into_iter()
		.map(|( offset, token )| parse_literal( offset, token, &enum_value ))
		.collect()
}

fn split_arguments( text: &str ) -> Result<Vec<( usize, &str )>, LiteralError> {

	let mut tokens = Vec::new();
	let mut start = 0 ;
	let mut quote_start = None ;
	let mut escaped = false ;

	for ( index, c ) in text.char_indices() {
		match ( quote_start, c ) {
			( Some( _ ), _ ) if escaped => escaped = false,
			( Some( _ ), '\\' ) => escaped = true,
			( Some( _ ), '"' ) => quote_start = None,
			( None, '"' ) => quote_start = Some( index ),
			( None, ',' ) => {
				tokens.push(( start, &text[ start..index ]));
				start = index + 1 ;
			},
			_ => {},
		}
	}

	if let Some( offset ) = quote_start { return Err( LiteralError::UnterminatedString( offset ))}
	tokens.push(( start, &text[ start.. ]));
	Ok( tokens )

}

fn parse_literal( offset: usize, token: &str, enum_value: &impl Fn( &str ) -> Option<i32> ) -> Result<Value, LiteralError> {

	let token = token.trim();
	if token.is_empty() { return Ok( Value::Missing )}
	if let Some( quoted ) = token.strip_prefix( '"' ) {
		return unescape( quoted ).map( Value::String ).ok_or( LiteralError::UnterminatedString( offset ))
	}

	Ok( match token {
		"true" => Value::Bool( true ),
		"false" => Value::Bool( false ),
		_ => parse_integer( token )
			.or_else(|| token.parse::<f64>().ok().filter(| _ | looks_numeric( token )).map( Value::Double ))
			.or_else(|| enum_value( token ).map( Value::Int ))
			.unwrap_or_else(|| Value::String( token.to_string() )),
	})

}

fn parse_integer( token: &str ) -> Option<Value> {
	let ( negative, digits ) = match token.strip_prefix( '-' ) {
		Some( rest ) => ( true, rest ),
		None => ( false, token ),
	};
	let magnitude = match digits.strip_prefix( "0x" ).or_else(|| digits.strip_prefix( "0X" )) {
		Some( hex ) if !hex.is_empty() && hex.bytes().all(| b | b.is_ascii_hexdigit() ) => i128::from_str_radix( hex, 16 ).ok()?,
		Some( _ ) => return None,
		None if digits.bytes().all(| b | b.is_ascii_digit() ) && !digits.is_empty() => digits.parse::<i128>().ok()?,
		None => return None,
	};
	let value = if negative { -magnitude } else { magnitude };
	i32::try_from( value ).map( Value::Int )
		.or_else(| _ | i64::try_from( value ).map( Value::LongLong ))
		.ok()
}

/// Rejects words `f64::from_str` accepts, like `inf` or `NaN`.
fn looks_numeric( token: &str ) -> bool {
	token.bytes().all(| b | b.is_ascii_digit() || matches!( b, b'.' | b'-' | b'+' | b'e' | b'E' ))
}

/// Unescapes the body of a quoted literal (opening quote already stripped).
/// Returns `None` if the closing quote is missing or is followed by more text.
fn unescape( quoted: &str ) -> Option<String> {
	let mut out = String::with_capacity( quoted.len() );
	let mut chars = quoted.chars();
	while let Some( c ) = chars.next() {
		match c {
			'\\' => match chars.next()? {
				'n' => out.push( '\n' ),
				't' => out.push( '\t' ),
				other => out.push( other ),
			},
			'"' => return chars.as_str().trim().is_empty().then_some( out ),
			_ => out.push( c ),
		}
	}
	None
}

#[cfg( test )]
mod tests {
	use super::* ;

	fn no_enums( _: &str ) -> Option<i32> { None }

	#[test]
	fn splits_calls_and_bare_names() {
		assert_eq!( split_call( "GetName()" ), Ok(( "GetName", Some( "" ))));
		assert_eq!( split_call( " Move ( 1, 2 ) " ), Ok(( "Move", Some( " 1, 2 " ))));
		assert_eq!( split_call( "Count" ), Ok(( "Count", None )));
		assert!( matches!( split_call( "Move(1, 2" ), Err( LiteralError::UnbalancedParenthesis( _ ))));
	}

	#[test]
	fn parses_each_literal_kind() {
		let enums = | key: &str | ( key == "AlignRight" ).then_some( 2 );
		let args = parse_arguments( r#"10, 0x20, -3.5, true, "a, \"b\"\n", AlignRight, plain text"#, enums )
			.expect( "valid arguments" );
		assert_eq!( args, vec![
			Value::Int( 10 ),
			Value::Int( 0x20 ),
			Value::Double( -3.5 ),
			Value::Bool( true ),
			Value::String( "a, \"b\"\n".to_string() ),
			Value::Int( 2 ),
			Value::String( "plain text".to_string() ),
		]);
	}

	#[test]
	fn wide_integers_become_long_long() {
		assert_eq!( parse_arguments( "4294967296", no_enums ), Ok( vec![ Value::LongLong( 4_294_967_296 ) ]));
		assert_eq!( parse_arguments( "-2147483648", no_enums ), Ok( vec![ Value::Int( i32::MIN ) ]));
	}

	#[test]
	fn signs_belong_before_the_hex_prefix() {
		assert_eq!( parse_arguments( "-0x10, 0x-5, 0x+5", no_enums ), Ok( vec![
			Value::Int( -16 ),
			Value::from( "0x-5" ),
			Value::from( "0x+5" ),
		]));
	}

	#[test]
	fn empty_arguments_are_omitted_ones() {
		assert_eq!( parse_arguments( "1,,3", no_enums ), Ok( vec![ Value::Int( 1 ), Value::Missing, Value::Int( 3 ) ]));
		assert_eq!( parse_arguments( "  ", no_enums ), Ok( vec![] ));
	}

	#[test]
	fn unterminated_strings_are_rejected() {
		assert_eq!( parse_arguments( r#"1, "open"#, no_enums ), Err( LiteralError::UnterminatedString( 3 )));
		assert_eq!( parse_arguments( "inf, NaN", no_enums ), Ok( vec![ Value::from( "inf" ), Value::from( "NaN" ) ]));
	}
}
