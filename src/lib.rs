//! A typed bridge between a host's dynamic values and late-bound automation objects.
//!
//! Foreign objects publish their members only through a call-by-name protocol with
//! a tagged-union wire value, plus an optional catalog describing signatures ahead of
//! time. `automation_link` reflects such an object into a typed descriptor once,
//! translates every call and value across the boundary, and redirects the object's
//! notifications into host signals.
//!
//! # Core Concepts
//!
//! - [`ForeignWrapper`]: Owns one foreign object. Binds from a textual specifier or
//! 	wraps an existing [`ForeignRef`], builds the descriptor lazily, dispatches calls
//! 	and fans out events. Clearing or dropping it unsubscribes and releases everything.
//!
//! - [`ReflectionDescriptor`]: The immutable member table of a foreign interface:
//! 	signals, methods (with overloads for optional parameters), properties and enums.
//! 	Built by [`ReflectionBuilder`] and shared through a [`ReflectionCache`] between
//! 	every wrapper of the same interface identity and [`BuildOptions`].
//!
//! - [`Value`] and [`WireValue`]: The host's dynamic value and the foreign wire value.
//! 	The [`codec`] converts between them, guided by the descriptor's [`TypeTag`]s.
//!
//! - [`Dispatcher`]: One call against a foreign object, by name, by signature, with
//! 	literal arguments parsed from text, or by descriptor index.
//!
//! - [`EventProxy`]: The host-side callback object registered with the foreign
//! 	object's subscription mechanism.
//!
//! The foreign side is described by traits such as [`ForeignObject`], [`Dispatch`] and
//! [`TypeInfo`]; the platform glue in front of real objects implements them.
//! [`StaticLibrary`] describes a catalog in memory.
//!
//! # Example
//!
//! ```
//! use automation_link::{
//! 	BuildOptions, FuncDesc, InterfaceId, ReflectionBuilder, ReflectionCache,
//! 	ScalarType, StaticLibrary, TypeKind, TypeSpec, TypeTag,
//! };
//!
//! let library = StaticLibrary::new( InterfaceId::new( 1 ), vec![
//! 	TypeSpec::new( "ILabel", InterfaceId::new( 2 ), TypeKind::Dispatch )
//! 		.with_func( FuncDesc::getter( 1, "Caption", ScalarType::Bstr ))
//! 		.with_func( FuncDesc::putter( 1, "Caption", ScalarType::Bstr ))
//! 		.with_func( FuncDesc::method( 2, "Clear" )),
//! ]);
//! let interface = library.find( "ILabel" ).expect( "entry exists" );
//!
//! let builder = ReflectionBuilder::new( ReflectionCache::new(), BuildOptions::default() );
//! let ( descriptor, warnings ) = builder.build_from_catalog( &interface );
//! assert!( warnings.is_empty() );
//!
//! let ( _, caption ) = descriptor.property( "Caption" ).expect( "property exists" );
//! assert!( caption.readable && caption.writable );
//! assert_eq!( caption.tag, TypeTag::String );
//! assert!( descriptor.by_signature( "Clear()" ).is_some() );
//! ```

mod foreign ;
pub mod catalog ;
mod wire ;
mod value ;
mod type_tag ;
pub mod codec ;
mod bridge ;
pub mod literal ;
mod cache ;
mod descriptor ;
mod builder ;
mod dispatch ;
mod signals ;
mod event_proxy ;
mod specifier ;
mod wrapper ;
mod utils ;

pub use foreign::{
	CallArgs, CallFault, ConnectionPoints, Cookie, Dispatch, EventSink, ExceptionInfo,
	ForeignObject, ForeignRef, InterfaceId, InvokeFlags, MemberId, ObjectFactory,
	PropertyNotifySink, RemoteHost, Subscriber, Verb, VerbSource,
	DISPID_PROPERTYPUT, DISPID_UNKNOWN, DISPID_VALUE, DISP_E_PARAMNOTFOUND, IID_PROPERTY_NOTIFY_SINK,
};
pub use catalog::{
	FuncDesc, ImplTypeFlags, InvokeKind, MemberFlags, ParamDesc, ParamFlags, ScalarType,
	StaticLibrary, TypeAttr, TypeDesc, TypeInfo, TypeKind, TypeLibrary, TypeSpec, VarDesc, VarKind,
};
pub use wire::{ ByRef, VarType, WireArray, WireRecord, WireValue };
pub use value::{ Color, Font, Picture, Value };
pub use type_tag::TypeTag ;
pub use bridge::{ HostFont, HostPicture };
pub use cache::{ CacheKey, CacheLease, ReflectionCache };
pub use descriptor::{
	DescriptorBuilder, EnumDef, Member, Method, MethodKind, Param, ParamDirection,
	Property, ReflectionDescriptor, Signal,
};
pub use builder::{ BuildOptions, BuildWarning, ReflectionBuilder };
pub use dispatch::{ DispatchError, Dispatcher, MemberIdCache, WritableOverrides };
pub use signals::Notifier ;
pub use event_proxy::{ EventHost, EventProxy };
pub use specifier::Specifier ;
pub use wrapper::{ BindError, ForeignWrapper };
pub use utils::PartialSuccess ;
