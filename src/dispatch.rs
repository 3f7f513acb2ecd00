//! The dynamic dispatch engine.
//!
//! A [`Dispatcher`] performs one host-side call against a foreign object: it
//! resolves the member (by name, by signature or by descriptor index), marshals
//! the arguments back-to-front through the codec, invokes the foreign
//! call-by-name entry point and decodes the result and any out-parameters.
//!
//! Member identifiers are resolved through a per-handle [`MemberIdCache`]; they
//! are stable for one foreign instance only.

use std::collections::HashMap ;
use parking_lot::{ Mutex, RwLock };
use pipe_trait::Pipe ;
use thiserror::Error ;
use tracing::{ debug, warn };

use crate::codec::{ from_wire, to_wire };
use crate::descriptor::{ Member, Method, MethodKind, Param, Property, ReflectionDescriptor };
use crate::foreign::{ CallArgs, CallFault, Dispatch, ExceptionInfo, InvokeFlags, MemberId, DISPID_PROPERTYPUT };
use crate::literal::{ parse_arguments, split_call, LiteralError };
use crate::signals::Notifier ;
use crate::type_tag::TypeTag ;
use crate::value::Value ;
use crate::wire::WireValue ;



/// Status code reported for members the foreign object does not implement.
const E_NOTIMPL: i32 = 0x8000_4001_u32 as i32 ;

/// Errors of a host-side call.
///
/// Argument indices are in declaration order, i.e. already mapped back from the
/// foreign side's back-to-front numbering.
#[derive( Error, Debug, Clone, PartialEq )]
pub enum DispatchError {
	/// No foreign object is bound.
	#[error( "No object bound" )] NotBound,
	/// The name resolves to no member; `candidates` differ only in case.
	#[error( "Member not found: {name}" )] MemberNotFound { name: String, candidates: Vec<String> },
	#[error( "Wrong number of arguments ({given}) calling {member}" )] ParameterCountMismatch { member: String, given: usize },
	#[error( "Type mismatch calling {member} at argument {argument:?}" )] TypeMismatch { member: String, argument: Option<usize> },
	#[error( "{member} does not accept named arguments" )] NoNamedArguments { member: String },
	#[error( "Overflow calling {member} at argument {argument:?}" )] Overflow { member: String, argument: Option<usize> },
	#[error( "Unknown locale calling {member}" )] UnknownLocale { member: String },
	/// The foreign object raised an application-level fault.
	#[error( "{member} raised {info}" )] ForeignException { member: String, info: ExceptionInfo },
	/// The property is read-only or was made read-only by the host.
	#[error( "Property {property} is not writable" )] NotWritable { property: String },
	/// The member's descriptor entry has a type the codec cannot marshal.
	#[error( "{member} uses an unsupported type" )] UnsupportedType { member: String },
	#[error( "No member at descriptor index {0}" )] InvalidIndex( usize ),
	#[error( "Member {index} is not a {expected}" )] WrongMemberKind { index: usize, expected: &'static str },
	/// Any other failure the foreign object reported.
	#[error( "{member} failed with code {code:#010x}" )] Foreign { member: String, code: i32 },
	#[error( "Malformed call text: {0}" )] Literal( #[from] LiteralError ),
}

impl DispatchError {
	/// Maps a foreign rejection of a call with `argc` arguments. Argument indices
	/// are converted from wire order to declaration order.
	pub fn from_fault( member: &str, fault: CallFault, argc: usize ) -> Self {
		let declared = | argument: Option<usize> | argument.and_then(| wire | argc.checked_sub( wire + 1 ));
		let member = member.to_string();
		match fault {
			CallFault::MemberNotFound => Self::MemberNotFound { name: member, candidates: Vec::with_capacity( 0 ) },
			CallFault::BadParamCount | CallFault::ParameterNotOptional => Self::ParameterCountMismatch { member, given: argc },
			CallFault::TypeMismatch { argument } => Self::TypeMismatch { member, argument: declared( argument )},
			CallFault::NoNamedArguments => Self::NoNamedArguments { member },
			CallFault::Overflow { argument } => Self::Overflow { member, argument: declared( argument )},
			CallFault::UnknownLocale => Self::UnknownLocale { member },
			CallFault::Exception( info ) => Self::ForeignException { member, info },
			CallFault::NotSupported => Self::Foreign { member, code: E_NOTIMPL },
			CallFault::Failed( code ) => Self::Foreign { member, code },
		}
	}
}

/// Per-handle name to member-identifier cache.
#[derive( Debug, Default )]
pub struct MemberIdCache( Mutex<HashMap<String, MemberId>> );

impl MemberIdCache {

	pub fn new() -> Self { Self::default() }

	/// Resolves `name`, asking the foreign object only on a miss. The lock is
	/// released during the foreign lookup.
	///
	/// # Errors
	/// The foreign lookup's [`CallFault`]; failures are not cached.
	pub fn resolve( &self, dispatch: &dyn Dispatch, name: &str ) -> Result<MemberId, CallFault> {
		if let Some( id ) = self.0.lock().get( name ) { return Ok( *id )}
		let id = dispatch.member_id( name )?;
		self.0.lock().insert( name.to_string(), id );
		Ok( id )
	}

	pub fn get( &self, name: &str ) -> Option<MemberId> { self.0.lock().get( name ).copied() }
	pub fn contains( &self, name: &str ) -> bool { self.0.lock().contains_key( name )}
	pub fn len( &self ) -> usize { self.0.lock().len() }
	pub fn is_empty( &self ) -> bool { self.0.lock().is_empty() }
	pub fn clear( &self ) { self.0.lock().clear(); }

}

/// Host-side per-property writable overrides. Properties are writable unless
/// overridden.
#[derive( Debug, Default )]
pub struct WritableOverrides( RwLock<HashMap<String, bool>> );

impl WritableOverrides {
	pub fn set( &self, property: &str, writable: bool ) { self.0.write().insert( property.to_string(), writable ); }
	pub fn is_writable( &self, property: &str ) -> bool { self.0.read().get( property ).copied().unwrap_or( true )}
}

/// One call context against a bound foreign object.
///
/// Without a descriptor (or for names it does not know) the dispatcher still
/// works by name resolution alone, without type information.
#[derive( Clone, Copy )]
pub struct Dispatcher<'a> {
	dispatch: &'a dyn Dispatch,
	descriptor: Option<&'a ReflectionDescriptor>,
	ids: &'a MemberIdCache,
	overrides: Option<&'a WritableOverrides>,
	notifier: Option<&'a Notifier>,
}

impl<'a> Dispatcher<'a> {

	pub fn new( dispatch: &'a dyn Dispatch, ids: &'a MemberIdCache ) -> Self {
		Self { dispatch, descriptor: None, ids, overrides: None, notifier: None }
	}

	pub fn with_descriptor( mut self, descriptor: Option<&'a ReflectionDescriptor> ) -> Self {
		self.descriptor = descriptor ;
		self
	}

	pub fn with_overrides( mut self, overrides: &'a WritableOverrides ) -> Self {
		self.overrides = Some( overrides );
		self
	}

	/// Foreign exceptions are delivered to `notifier`'s exception channel.
	pub fn with_notifier( mut self, notifier: &'a Notifier ) -> Self {
		self.notifier = Some( notifier );
		self
	}

	/// Calls a member given as `name`, `name( literal, … )` or `name( type, … )`.
	///
	/// - A bare name reads the property with no arguments, writes it with one.
	/// - A call whose text is a known signature uses that overload with `args`.
	/// - A call with literal arguments in its text and empty `args` parses them.
	/// - A name the object does not know is retried without a leading `set` as a
	///   property write.
	///
	/// Out-parameters are written back into `args`.
	///
	/// # Errors
	/// [`DispatchError`] for malformed text, unknown members or foreign failures.
	pub fn invoke_by_name( &self, text: &str, args: &mut [Value] ) -> Result<Value, DispatchError> {

		let ( name, arg_text ) = split_call( text )?;

		if arg_text.is_none() {
			match &*args {
				[] => return self.get_property( name ),
				[ value ] if self.is_property( name ) => return self.set_property( name, value ).map(| () | Value::Invalid ),
				_ => {},
			}
		}

		let by_signature = self.descriptor
			.and_then(| descriptor | descriptor.by_signature( text ).and_then(| index | descriptor.member( index )))
			.and_then(| member | match member { Member::Method( method ) => Some( method ), _ => None });

		let mut parsed ;
		let args = match ( by_signature, arg_text ) {
			( None, Some( literals )) if args.is_empty() && !literals.trim().is_empty() => {
				parsed = parse_arguments( literals, | key | self.descriptor.and_then(| descriptor | descriptor.enum_value( key )))?;
				parsed.as_mut_slice()
			},
			_ => args,
		};

		let method = match by_signature {
			Some( method ) => Some( method ),
			None => self.overload( name, args.len() )?,
		};
		match method {
			Some( method ) => self.call_method( method, args ),
			None => self.call( name, None, args ),
		}

	}

	/// Reads the property at descriptor `index`.
	///
	/// # Errors
	/// [`DispatchError`] for bad indices, unsupported types or foreign failures.
	pub fn read_property( &self, index: usize ) -> Result<Value, DispatchError> {
		let property = self.property_at( index )?;
		if !property.tag.is_supported() { return Err( self.report( DispatchError::UnsupportedType { member: property.name.clone() }))}
		self.get( &property.name, Some( &property.tag ))
	}

	/// Writes the property at descriptor `index`. The writable flag is checked
	/// before any foreign call.
	///
	/// # Errors
	/// [`DispatchError::NotWritable`] for read-only properties, otherwise as
	/// [`read_property`]( Self::read_property ).
	pub fn write_property( &self, index: usize, value: &Value ) -> Result<(), DispatchError> {
		let property = self.property_at( index )?;
		if !property.writable || !self.overridden_writable( &property.name ) {
			return Err( self.report( DispatchError::NotWritable { property: property.name.clone() }))
		}
		if !property.tag.is_supported() { return Err( self.report( DispatchError::UnsupportedType { member: property.name.clone() }))}
		self.put( &property.name, value, Some( &property.tag ))
	}

	/// Reads a property by name; works without a descriptor entry.
	///
	/// # Errors
	/// [`DispatchError`] for unknown members or foreign failures.
	pub fn get_property( &self, name: &str ) -> Result<Value, DispatchError> {
		match self.descriptor.and_then(| descriptor | descriptor.property( name )) {
			Some(( index, _ )) => self.read_property( index ),
			None => self.get( name, None ),
		}
	}

	/// Writes a property by name; works without a descriptor entry, but host
	/// overrides are honored either way.
	///
	/// # Errors
	/// [`DispatchError::NotWritable`] before any foreign call for read-only
	/// properties, otherwise foreign failures.
	pub fn set_property( &self, name: &str, value: &Value ) -> Result<(), DispatchError> {
		match self.descriptor.and_then(| descriptor | descriptor.property( name )) {
			Some(( index, _ )) => self.write_property( index, value ),
			None if !self.overridden_writable( name ) => Err( self.report( DispatchError::NotWritable { property: name.to_string() })),
			None => self.put( name, value, None ),
		}
	}

	/// Calls the method at descriptor `index`, writing out-parameters back into `args`.
	///
	/// # Errors
	/// [`DispatchError::ParameterCountMismatch`] before any foreign call when
	/// `args` does not fit the entry, otherwise foreign failures.
	pub fn invoke_method( &self, index: usize, args: &mut [Value] ) -> Result<Value, DispatchError> {
		match self.descriptor.and_then(| descriptor | descriptor.member( index )) {
			Some( Member::Method( method )) => self.call_method( method, args ),
			Some( _ ) => Err( self.report( DispatchError::WrongMemberKind { index, expected: "method" })),
			None => Err( self.report( DispatchError::InvalidIndex( index ))),
		}
	}

	fn is_property( &self, name: &str ) -> bool {
		self.descriptor.is_none_or(| descriptor | descriptor.property( name ).is_some() )
	}

	fn overridden_writable( &self, name: &str ) -> bool {
		self.overrides.is_none_or(| overrides | overrides.is_writable( name ))
	}

	fn property_at( &self, index: usize ) -> Result<&'a Property, DispatchError> {
		match self.descriptor.and_then(| descriptor | descriptor.member( index )) {
			Some( Member::Property( property )) => Ok( property ),
			Some( _ ) => Err( self.report( DispatchError::WrongMemberKind { index, expected: "property" })),
			None => Err( self.report( DispatchError::InvalidIndex( index ))),
		}
	}

	/// The overload of `name` accepting `count` arguments. `Ok( None )` when the
	/// descriptor has no method of that name; an error when it has some but none
	/// accepts `count`.
	fn overload( &self, name: &str, count: usize ) -> Result<Option<&'a Method>, DispatchError> {
		let Some( descriptor ) = self.descriptor else { return Ok( None )};
		let overloads = descriptor.overloads( name ).map(|( _, method )| method ).collect::<Vec<_>>();
		if overloads.is_empty() { return Ok( None )}
		overloads.iter()
			.find(| method | method.params.len() == count )
			.or_else(|| overloads.iter().find(| method | method.min_args() <= count && count <= method.params.len() ))
			.map(| method | Some( *method ))
			.ok_or_else(|| self.report( DispatchError::ParameterCountMismatch { member: name.to_string(), given: count }))
	}

	fn call_method( &self, method: &Method, args: &mut [Value] ) -> Result<Value, DispatchError> {

		if !method.is_callable() { return Err( self.report( DispatchError::UnsupportedType { member: method.name.clone() }))}
		if args.len() < method.min_args() || args.len() > method.params.len() {
			return Err( self.report( DispatchError::ParameterCountMismatch { member: method.name.clone(), given: args.len() }))
		}

		match ( method.kind, method.name.strip_prefix( "set" )) {
			( MethodKind::Setter, Some( property )) if !self.overridden_writable( property ) => {
				Err( self.report( DispatchError::NotWritable { property: property.to_string() }))
			},
			( MethodKind::Setter, Some( property )) => self.put_indexed( property, &method.params, args ).map(| () | Value::Invalid ),
			_ => self.call( &method.name, Some( method ), args ),
		}

	}

	fn call( &self, name: &str, method: Option<&Method>, args: &mut [Value] ) -> Result<Value, DispatchError> {

		let member = match self.ids.resolve( self.dispatch, name ) {
			Ok( member ) => member,
			Err( CallFault::MemberNotFound ) => match ( name.strip_prefix( "set" ), &*args ) {
				( Some( property ), [ value ]) if !property.is_empty() => {
					debug!( member = name, property, "retrying as property write" );
					return self.set_property( property, value ).map(| () | Value::Invalid )
				},
				_ => return Err( self.fail( name, CallFault::MemberNotFound, args.len() )),
			},
			Err( fault ) => return Err( self.fail( name, fault, args.len() )),
		};

		let params = method.map(| method | method.params.as_slice() ).unwrap_or_default();
		let mut call = marshal( params, args ).pipe( CallArgs::from_wire_order );
		let result = self.dispatch.invoke( member, InvokeFlags::METHOD | InvokeFlags::PROPERTY_GET, &mut call )
			.map_err(| fault | self.fail( name, fault, args.len() ))?;

		for ( index, param ) in params.iter().enumerate().take( args.len() ) {
			if let ( true, Some( wire )) = ( param.is_out(), call.declared( index )) {
				args[ index ] = from_wire( wire, Some( &param.tag ));
			}
		}

		Ok( match method.map(| method | &method.ret ) {
			Some( TypeTag::Void ) => Value::Invalid,
			expected => from_wire( &result, expected ),
		})

	}

	fn get( &self, name: &str, tag: Option<&TypeTag> ) -> Result<Value, DispatchError> {
		let member = self.ids.resolve( self.dispatch, name ).map_err(| fault | self.fail( name, fault, 0 ))?;
		self.dispatch.invoke( member, InvokeFlags::PROPERTY_GET, &mut CallArgs::default() )
			.map(| result | from_wire( &result, tag ))
			.map_err(| fault | self.fail( name, fault, 0 ))
	}

	/// Property write. Objects, arrays and by-reference values are first offered
	/// with reference semantics; a rejection is retried once as a plain write.
	fn put( &self, name: &str, value: &Value, tag: Option<&TypeTag> ) -> Result<(), DispatchError> {

		let member = self.ids.resolve( self.dispatch, name ).map_err(| fault | self.fail( name, fault, 1 ))?;
		let wire = to_wire( value, tag, false );

		if wire.prefers_put_ref() {
			match self.dispatch.invoke( member, InvokeFlags::PROPERTY_PUT_REF, &mut CallArgs::property_put( wire.clone() )) {
				Ok( _ ) => return Ok(()),
				Err( fault ) => debug!( member = name, %fault, "reference write rejected, retrying as plain write" ),
			}
		}

		self.dispatch.invoke( member, InvokeFlags::PROPERTY_PUT, &mut CallArgs::property_put( wire ))
			.map(| _ | ())
			.map_err(| fault | self.fail( name, fault, 1 ))

	}

	/// Indexed property write: the last argument is the value.
	fn put_indexed( &self, name: &str, params: &[Param], args: &mut [Value] ) -> Result<(), DispatchError> {
		if let [ value ] = &*args { return self.put( name, value, params.first().map(| param | &param.tag ))}
		let member = self.ids.resolve( self.dispatch, name ).map_err(| fault | self.fail( name, fault, args.len() ))?;
		let mut call = CallArgs { named: vec![ DISPID_PROPERTYPUT ], ..CallArgs::from_wire_order( marshal( params, args )) };
		self.dispatch.invoke( member, InvokeFlags::PROPERTY_PUT, &mut call )
			.map(| _ | ())
			.map_err(| fault | self.fail( name, fault, args.len() ))
	}

	/// Maps a foreign rejection to a [`DispatchError`] and reports it.
	fn fail( &self, member: &str, fault: CallFault, argc: usize ) -> DispatchError {
		self.report( match DispatchError::from_fault( member, fault, argc ) {
			DispatchError::MemberNotFound { name, .. } => DispatchError::MemberNotFound {
				candidates: self.descriptor.map(| descriptor | descriptor.candidates( &name )).unwrap_or_default(),
				name,
			},
			other => other,
		})
	}

	/// Logs an error with case-insensitive name suggestions; foreign exceptions go
	/// to the exception channel instead when someone listens there.
	fn report( &self, error: DispatchError ) -> DispatchError {
		if let DispatchError::ForeignException { info, .. } = &error {
			if self.notifier.is_some_and(| notifier | notifier.emit_exception( info )) { return error }
		}
		let ( member, candidates ) = match &error {
			DispatchError::MemberNotFound { name, candidates } => ( name.as_str(), candidates.clone() ),
			other => {
				let member = error_member( other );
				( member, self.descriptor.map(| descriptor | descriptor.candidates( member )).unwrap_or_default() )
			},
		};
		warn!( member, ?candidates, %error, "foreign call failed" );
		error
	}

}

fn error_member( error: &DispatchError ) -> &str {
	match error {
		DispatchError::MemberNotFound { name: member, .. }
		| DispatchError::ParameterCountMismatch { member, .. }
		| DispatchError::TypeMismatch { member, .. }
		| DispatchError::NoNamedArguments { member }
		| DispatchError::Overflow { member, .. }
		| DispatchError::UnknownLocale { member }
		| DispatchError::ForeignException { member, .. }
		| DispatchError::NotWritable { property: member }
		| DispatchError::UnsupportedType { member }
		| DispatchError::Foreign { member, .. } => member,
		DispatchError::NotBound | DispatchError::InvalidIndex( _ ) | DispatchError::WrongMemberKind { .. } | DispatchError::Literal( _ ) => "",
	}
}

/// Marshals `args` into wire order (last declared first). Parameters beyond the
/// descriptor's list, or calls without one, are marshaled without type hints.
fn marshal( params: &[Param], args: &[Value] ) -> Vec<WireValue> {
	args.iter()
		.enumerate()
		.rev()
		.map(|( index, value )| match params.get( index ) {
			Some( param ) => to_wire( value, Some( &param.tag ), param.is_out() ),
			None => to_wire( value, None, false ),
		})
		.collect()
}

#[cfg( test )]
mod tests {
	use super::* ;

	#[test]
	fn marshal_reverses_and_boxes_out_parameters() {
		let params = vec![
			Param::new( "a", TypeTag::Int ),
			Param::new( "b", TypeTag::String ).with_direction( crate::descriptor::ParamDirection::Out ),
		];
		let wire = marshal( &params, &[ Value::Int( 1 ), Value::Invalid ]);
		assert!( wire[0].is_by_ref() );
		assert_eq!( wire[1], WireValue::I4( 1 ));
	}

	#[test]
	fn fault_argument_indices_count_from_the_front() {
		assert_eq!(
			DispatchError::from_fault( "Move", CallFault::TypeMismatch { argument: Some( 0 )}, 3 ),
			DispatchError::TypeMismatch { member: "Move".into(), argument: Some( 2 )},
		);
		assert_eq!(
			DispatchError::from_fault( "Move", CallFault::NotSupported, 0 ),
			DispatchError::Foreign { member: "Move".into(), code: E_NOTIMPL },
		);
	}

	#[test]
	fn overrides_default_to_writable() {
		let overrides = WritableOverrides::default();
		assert!( overrides.is_writable( "Caption" ));
		overrides.set( "Caption", false );
		assert!( !overrides.is_writable( "Caption" ));
	}
}
