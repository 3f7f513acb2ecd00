//! The foreign object model this crate binds to.
//!
//! Nothing in this module is implemented by `automation_link` itself: these are the
//! contracts a foreign object (or the platform glue in front of it) satisfies. An
//! object exposes a call-by-name entry point ([`Dispatch`]), an optional catalog
//! ([`TypeInfo`]( crate::catalog::TypeInfo )), an optional event subscription
//! mechanism ([`ConnectionPoints`]) and a handful of optional capabilities that the
//! value codec queries for (fonts, pictures).
//!
//! The contracts mirror the "Automation" calling convention: one discriminated wire
//! value type, members addressed by small integer identifiers, parameters passed
//! back-to-front with in/out/by-reference modality.

use std::sync::Arc ;
use thiserror::Error ;

use crate::catalog::TypeInfo ;
use crate::value::{ Font, Picture };
use crate::wire::WireValue ;



/// Small integer handle for a foreign member, obtained by name resolution.
pub type MemberId = i32 ;

/// The default member of an object.
pub const DISPID_VALUE: MemberId = 0 ;
/// Returned by catalogs for names they cannot resolve.
pub const DISPID_UNKNOWN: MemberId = -1 ;
/// Named-argument marker identifying the value of a property put.
pub const DISPID_PROPERTYPUT: MemberId = -3 ;

/// Error code carried by a wire value that stands for "argument not supplied".
pub const DISP_E_PARAMNOTFOUND: i32 = 0x8002_0004_u32 as i32 ;

/// 128-bit identity of a foreign interface, class or type library.
#[derive( Copy, Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd )]
pub struct InterfaceId( u128 );

impl InterfaceId {
	/// Creates an identifier from its raw 128-bit value.
	pub const fn new( id: u128 ) -> Self { Self( id )}

	/// Parses the braced textual form `{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}`.
	pub fn parse( text: &str ) -> Option<Self> {
		let inner = text.trim().strip_prefix( '{' )?.strip_suffix( '}' )?;
		let groups = inner.split( '-' ).collect::<Vec<_>>();
		let expected = [ 8, 4, 4, 4, 12 ];
		if groups.len() != expected.len() { return None }
		if groups.iter().zip( expected ).any(|( group, len )| group.len() != len || !group.bytes().all(| b | b.is_ascii_hexdigit() )) { return None }
		let digits = groups.concat();
		u128::from_str_radix( &digits, 16 ).ok().map( Self )
	}
}

impl std::fmt::Display for InterfaceId {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result {
		let hex = format!( "{:032X}", self.0 );
		write!( f, "{{{}-{}-{}-{}-{}}}", &hex[0..8], &hex[8..12], &hex[12..16], &hex[16..20], &hex[20..32] )
	}
}

impl From<InterfaceId> for u128 {
	fn from( id: InterfaceId ) -> Self { id.0 }
}

/// Identity of the generic property-change notification interface.
pub const IID_PROPERTY_NOTIFY_SINK: InterfaceId = InterfaceId::new( 0x9BFB_BC02_EFF1_101A_84ED_00AA_0034_1D07 );

/// Application-level fault raised by a foreign member.
#[derive( Clone, Debug, Default, PartialEq, Eq )]
pub struct ExceptionInfo {
	pub code: i32,
	pub source: String,
	pub description: String,
	pub help: String,
}

impl std::fmt::Display for ExceptionInfo {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result {
		write!( f, "{} ({:#010x}): {}", self.source, self.code, self.description )
	}
}

/// Rejection reasons a foreign entry point may report.
///
/// `argument` indices are reported the way the foreign side sees them, i.e. as
/// positions in the back-to-front wire argument array.
#[derive( Error, Clone, Debug, PartialEq )]
pub enum CallFault {
	#[error( "Member not found" )] MemberNotFound,
	#[error( "Bad parameter count" )] BadParamCount,
	#[error( "Type mismatch at wire argument {argument:?}" )] TypeMismatch { argument: Option<usize> },
	#[error( "Named arguments not supported" )] NoNamedArguments,
	#[error( "Overflow at wire argument {argument:?}" )] Overflow { argument: Option<usize> },
	#[error( "Unknown locale" )] UnknownLocale,
	#[error( "Parameter not optional" )] ParameterNotOptional,
	#[error( "Not supported" )] NotSupported,
	#[error( "Exception: {0}" )] Exception( ExceptionInfo ),
	#[error( "Failed with code {0:#010x}" )] Failed( i32 ),
}

/// Flags selecting get/put/method semantics for [`Dispatch::invoke`].
#[derive( Copy, Clone, Debug, Default, Eq, Hash, PartialEq )]
pub struct InvokeFlags( u8 );

impl InvokeFlags {
	pub const METHOD: Self = Self( 0x1 );
	pub const PROPERTY_GET: Self = Self( 0x2 );
	pub const PROPERTY_PUT: Self = Self( 0x4 );
	pub const PROPERTY_PUT_REF: Self = Self( 0x8 );

	#[inline] pub fn contains( self, other: Self ) -> bool { self.0 & other.0 == other.0 }
	#[inline] pub fn is_put( self ) -> bool { self.0 & ( Self::PROPERTY_PUT.0 | Self::PROPERTY_PUT_REF.0 ) != 0 }
}

impl std::ops::BitOr for InvokeFlags {
	type Output = Self ;
	fn bitor( self, rhs: Self ) -> Self { Self( self.0 | rhs.0 )}
}

/// Parameter block passed to [`Dispatch::invoke`].
///
/// `positional` is stored in wire order: the last declared parameter comes first.
#[derive( Debug, Default )]
pub struct CallArgs {
	pub positional: Vec<WireValue>,
	pub named: Vec<MemberId>,
}

impl CallArgs {
	/// Builds a parameter block from arguments already in wire (reversed) order.
	pub fn from_wire_order( positional: Vec<WireValue> ) -> Self {
		Self { positional, named: Vec::with_capacity( 0 ) }
	}

	/// Builds the single named argument block of a property put.
	pub fn property_put( value: WireValue ) -> Self {
		Self { positional: vec![ value ], named: vec![ DISPID_PROPERTYPUT ] }
	}

	/// Returns the argument at declaration position `index` out of `count` arguments.
	pub fn declared( &self, index: usize ) -> Option<&WireValue> {
		let count = self.positional.len();
		if index >= count { return None }
		self.positional.get( count - 1 - index )
	}
}

/// The generic call-by-name entry point of a foreign object.
pub trait Dispatch: Send + Sync {
	/// Resolves a member name to its identifier.
	///
	/// # Errors
	/// [`CallFault::MemberNotFound`] if the object knows no member of that name.
	fn member_id( &self, name: &str ) -> Result<MemberId, CallFault> ;

	/// Invokes a member. By-reference arguments may be written through.
	///
	/// # Errors
	/// Any [`CallFault`] the object reports.
	fn invoke( &self, member: MemberId, flags: InvokeFlags, args: &mut CallArgs ) -> Result<WireValue, CallFault> ;

	/// The catalog entry describing this dispatch interface, if published.
	fn type_info( &self ) -> Option<Arc<dyn TypeInfo>> { None }
}

/// Token returned by a successful subscription.
#[derive( Copy, Clone, Debug, Eq, Hash, PartialEq )]
pub struct Cookie( pub u32 );

/// Callback contract for event-source interfaces.
pub trait EventSink: Send + Sync {
	/// Called by the foreign object when it fires member `member`.
	///
	/// `args` is in wire order; by-reference entries may be written through.
	///
	/// # Errors
	/// [`CallFault::MemberNotFound`] for members the sink does not handle.
	fn invoke( &self, member: MemberId, args: &mut [WireValue] ) -> Result<(), CallFault> ;
}

/// Callback contract for the generic property-change notification interface.
pub trait PropertyNotifySink: Send + Sync {
	/// A bindable property changed its value.
	///
	/// # Errors
	/// Implementations report failures to the notifying object.
	fn on_changed( &self, member: MemberId ) -> Result<(), CallFault> ;

	/// A bindable property is about to change; returns `true` to allow it.
	fn on_request_edit( &self, member: MemberId ) -> bool ;
}

/// The callback object handed to [`ConnectionPoints::advise`].
#[derive( Clone )]
pub enum Subscriber {
	Events( Arc<dyn EventSink> ),
	PropertyNotify( Arc<dyn PropertyNotifySink> ),
}

impl std::fmt::Debug for Subscriber {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		match self {
			Self::Events( _ ) => f.write_str( "Subscriber::Events" ),
			Self::PropertyNotify( _ ) => f.write_str( "Subscriber::PropertyNotify" ),
		}
	}
}

/// Event subscription mechanism of a foreign object.
pub trait ConnectionPoints: Send + Sync {
	/// Enumerates the outgoing interfaces the object can fire.
	///
	/// # Errors
	/// [`CallFault::NotSupported`] when the object cannot enumerate its sources; the
	/// builder then falls back to the class catalog's declared sources.
	fn sources( &self ) -> Result<Vec<InterfaceId>, CallFault> ;

	/// Catalog entry for a source interface.
	fn source_type_info( &self, source: InterfaceId ) -> Option<Arc<dyn TypeInfo>> ;

	/// Registers `subscriber` for notifications on `source`.
	///
	/// # Errors
	/// Any [`CallFault`] the object reports; nothing is registered on failure.
	fn advise( &self, source: InterfaceId, subscriber: Subscriber ) -> Result<Cookie, CallFault> ;

	/// Cancels a registration made by [`advise`]( Self::advise ).
	///
	/// # Errors
	/// Any [`CallFault`] the object reports.
	fn unadvise( &self, source: InterfaceId, cookie: Cookie ) -> Result<(), CallFault> ;
}

/// A verb the object can perform on request of its host.
#[derive( Clone, Debug, PartialEq, Eq )]
pub struct Verb {
	pub id: i32,
	pub name: String,
}

/// Verb enumeration capability.
pub trait VerbSource: Send + Sync {
	/// Lists the verbs the object supports.
	///
	/// # Errors
	/// Any [`CallFault`] the object reports.
	fn verbs( &self ) -> Result<Vec<Verb>, CallFault> ;

	/// Performs verb `id`.
	///
	/// # Errors
	/// Any [`CallFault`] the object reports.
	fn perform( &self, id: i32 ) -> Result<(), CallFault> ;
}

/// Base interface of every foreign object.
///
/// All capabilities are optional; the defaults report them as absent.
pub trait ForeignObject: Send + Sync {
	/// The dynamic-dispatch sub-interface.
	fn dispatch( &self ) -> Option<Arc<dyn Dispatch>> { None }
	/// Catalog entry of the object's class, when it can describe itself.
	fn class_info( &self ) -> Option<Arc<dyn TypeInfo>> { None }
	/// Event subscription mechanism.
	fn connection_points( &self ) -> Option<Arc<dyn ConnectionPoints>> { None }
	/// Font capability.
	fn font( &self ) -> Option<Font> { None }
	/// Picture capability.
	fn picture( &self ) -> Option<Picture> { None }
	/// Verb enumeration capability.
	fn verbs( &self ) -> Option<Arc<dyn VerbSource>> { None }
}

/// Shared, foreign-counted pointer to a [`ForeignObject`].
///
/// Cloning acquires a reference and dropping releases it, so every exit path
/// releases exactly once.
#[derive( Clone )]
pub struct ForeignRef( Arc<dyn ForeignObject> );

impl ForeignRef {
	pub fn new( object: impl ForeignObject + 'static ) -> Self { Self( Arc::new( object ))}

	pub fn from_arc( object: Arc<dyn ForeignObject> ) -> Self { Self( object )}

	/// Whether both references point at the same foreign object.
	pub fn ptr_eq( &self, other: &Self ) -> bool {
		std::ptr::addr_eq( Arc::as_ptr( &self.0 ), Arc::as_ptr( &other.0 ))
	}

	/// Number of live references held on the host side.
	pub fn ref_count( &self ) -> usize { Arc::strong_count( &self.0 )}
}

impl PartialEq for ForeignRef {
	fn eq( &self, other: &Self ) -> bool { self.ptr_eq( other )}
}

impl std::ops::Deref for ForeignRef {
	type Target = dyn ForeignObject ;
	fn deref( &self ) -> &Self::Target { &*self.0 }
}

impl std::fmt::Debug for ForeignRef {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		write!( f, "ForeignRef({:p})", Arc::as_ptr( &self.0 ))
	}
}

/// Credentials and host name of a remote-host-qualified specifier.
#[derive( Clone, Debug, Default, PartialEq, Eq )]
pub struct RemoteHost {
	pub server: String,
	pub user: Option<String>,
	pub password: Option<String>,
}

/// Process/registry bootstrapping collaborator that locates and creates objects.
///
/// Only [`resolve_class`]( Self::resolve_class ) and [`create`]( Self::create ) are
/// required; the remaining strategies report [`CallFault::NotSupported`] by default.
pub trait ObjectFactory: Send + Sync {
	/// Resolves a registered class name to its identity.
	///
	/// # Errors
	/// [`CallFault::MemberNotFound`] if no class of that name is registered.
	fn resolve_class( &self, name: &str ) -> Result<InterfaceId, CallFault> ;

	/// Creates a new instance of `class`.
	///
	/// # Errors
	/// Any [`CallFault`] raised during creation.
	fn create( &self, class: InterfaceId ) -> Result<ForeignRef, CallFault> ;

	/// Creates an instance of `class` on a remote host.
	///
	/// # Errors
	/// Any [`CallFault`] raised during creation.
	fn create_remote( &self, class: InterfaceId, host: &RemoteHost ) -> Result<ForeignRef, CallFault> {
		let _ = ( class, host );
		Err( CallFault::NotSupported )
	}

	/// Creates an instance of a licensed class.
	///
	/// # Errors
	/// Any [`CallFault`] raised during creation.
	fn create_licensed( &self, class: InterfaceId, key: &str ) -> Result<ForeignRef, CallFault> {
		let _ = ( class, key );
		Err( CallFault::NotSupported )
	}

	/// Attaches to an already running instance of `class`.
	///
	/// # Errors
	/// Any [`CallFault`] raised while looking up the instance.
	fn running_instance( &self, class: InterfaceId ) -> Result<ForeignRef, CallFault> {
		let _ = class ;
		Err( CallFault::NotSupported )
	}

	/// Loads an object from file-backed content.
	///
	/// # Errors
	/// Any [`CallFault`] raised while loading.
	fn from_file( &self, path: &std::path::Path ) -> Result<ForeignRef, CallFault> {
		let _ = path ;
		Err( CallFault::NotSupported )
	}
}

#[cfg( test )]
mod tests {
	use super::* ;

	#[test]
	fn interface_id_round_trips_through_text() {
		let text = "{9BFBBC02-EFF1-101A-84ED-00AA00341D07}";
		let id = InterfaceId::parse( text ).expect( "valid identity" );
		assert_eq!( id, IID_PROPERTY_NOTIFY_SINK );
		assert_eq!( id.to_string(), text );
	}

	#[test]
	fn interface_id_rejects_malformed_text() {
		assert_eq!( InterfaceId::parse( "9BFBBC02-EFF1-101A-84ED-00AA00341D07" ), None );
		assert_eq!( InterfaceId::parse( "{9BFBBC02-EFF1-101A-84ED}" ), None );
		assert_eq!( InterfaceId::parse( "{ZZFBBC02-EFF1-101A-84ED-00AA00341D07}" ), None );
		assert_eq!( InterfaceId::parse( "{+BFBBC02-EFF1-101A-84ED-00AA00341D07}" ), None );
	}

	#[test]
	fn invoke_flags_combine() {
		let flags = InvokeFlags::METHOD | InvokeFlags::PROPERTY_GET ;
		assert!( flags.contains( InvokeFlags::METHOD ));
		assert!( flags.contains( InvokeFlags::PROPERTY_GET ));
		assert!( !flags.is_put() );
		assert!( InvokeFlags::PROPERTY_PUT_REF.is_put() );
	}

	#[test]
	fn declared_reads_back_to_front() {
		let args = CallArgs::from_wire_order( vec![ WireValue::I4( 3 ), WireValue::I4( 2 ), WireValue::I4( 1 ) ]);
		assert_eq!( args.declared( 0 ), Some( &WireValue::I4( 1 )));
		assert_eq!( args.declared( 2 ), Some( &WireValue::I4( 3 )));
		assert_eq!( args.declared( 3 ), None );
	}
}
