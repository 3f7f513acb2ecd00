//! The interface catalog: ahead-of-time type descriptions of foreign interfaces.
//!
//! A catalog is optional. Objects that publish one hand out [`TypeInfo`] entries
//! from [`Dispatch::type_info`]( crate::foreign::Dispatch::type_info ) and
//! [`ForeignObject::class_info`]( crate::foreign::ForeignObject::class_info ); the
//! reflection builder walks them to synthesize a descriptor without invoking the
//! object.
//!
//! Descriptors are plain data. [`StaticLibrary`] is a data-backed catalog for
//! objects that describe their shape programmatically.

use std::sync::{ Arc, Weak };

use crate::foreign::{ CallFault, InterfaceId, MemberId };



macro_rules! flag_set {
	( $(#[$meta:meta])* $name:ident : $repr:ty { $( $(#[$flag_meta:meta])* $flag:ident = $bit:expr ),* $(,)? } ) => {
		$(#[$meta])*
		#[derive( Copy, Clone, Debug, Default, Eq, Hash, PartialEq )]
		pub struct $name( $repr );

		impl $name {
			$( $(#[$flag_meta])* pub const $flag: Self = Self( $bit ); )*
			pub const NONE: Self = Self( 0 );

			#[inline] pub fn contains( self, other: Self ) -> bool { self.0 & other.0 == other.0 }
			#[inline] pub fn intersects( self, other: Self ) -> bool { self.0 & other.0 != 0 }
		}

		impl std::ops::BitOr for $name {
			type Output = Self ;
			fn bitor( self, rhs: Self ) -> Self { Self( self.0 | rhs.0 )}
		}
	};
}

flag_set! {
	/// Attributes of a catalog function or variable.
	MemberFlags: u16 {
		/// Not meant to be shown to (or called by) hosts.
		HIDDEN = 0x01,
		/// Not callable through the dynamic-dispatch entry point.
		RESTRICTED = 0x02,
		/// Fires a property-change notification when its value changes.
		BINDABLE = 0x04,
		/// Dispatch properties only: cannot be written.
		READONLY = 0x08,
		/// Fires a property-change request before its value changes.
		REQUEST_EDIT = 0x10,
	}
}

flag_set! {
	/// Parameter modality.
	ParamFlags: u8 {
		IN = 0x01,
		OUT = 0x02,
		/// The parameter receives the function's logical return value.
		RETVAL = 0x04,
		OPTIONAL = 0x08,
		HAS_DEFAULT = 0x10,
	}
}

flag_set! {
	/// Role of an interface implemented by a class or inherited by an interface.
	ImplTypeFlags: u8 {
		DEFAULT = 0x01,
		/// An outgoing (event) interface.
		SOURCE = 0x02,
		RESTRICTED = 0x04,
	}
}

/// Handle to a type referenced from another type's descriptors, resolved through
/// [`TypeInfo::ref_type`].
#[derive( Copy, Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd )]
pub struct RefHandle( pub u32 );

/// Base scalar types a catalog type descriptor can name.
#[derive( Copy, Clone, Debug, Eq, Hash, PartialEq )]
pub enum ScalarType {
	Void,
	/// Status code return; treated as no return value.
	HResult,
	Bool,
	I1, I2, I4, I8, Int,
	U1, U2, U4, U8, UInt,
	R4, R8,
	Currency,
	Date,
	/// Counted string.
	Bstr,
	LpStr,
	LpWStr,
	Variant,
	Dispatch,
	Unknown,
	Error,
	Decimal,
}

/// Recursive type descriptor of a parameter, return value or variable.
#[derive( Clone, Debug, Eq, Hash, PartialEq )]
pub enum TypeDesc {
	Scalar( ScalarType ),
	Ptr( Box<TypeDesc> ),
	SafeArray( Box<TypeDesc> ),
	/// Fixed-size inline array.
	CArray( Box<TypeDesc> ),
	UserDefined( RefHandle ),
}

impl TypeDesc {
	pub fn ptr( inner: TypeDesc ) -> Self { Self::Ptr( Box::new( inner ))}
	pub fn array( element: TypeDesc ) -> Self { Self::SafeArray( Box::new( element ))}
	pub fn user( handle: u32 ) -> Self { Self::UserDefined( RefHandle( handle ))}
}

impl From<ScalarType> for TypeDesc {
	fn from( scalar: ScalarType ) -> Self { Self::Scalar( scalar )}
}

/// What a catalog entry describes.
#[derive( Clone, Debug, PartialEq, Eq )]
pub enum TypeKind {
	Enum,
	Record,
	Module,
	Interface,
	/// A dynamic-dispatch interface.
	Dispatch,
	/// A creatable class; its implemented interfaces are listed as impl types.
	CoClass,
	/// A named alias of another type.
	Alias( TypeDesc ),
	Union,
}

/// Summary of a catalog entry.
#[derive( Clone, Debug, PartialEq, Eq )]
pub struct TypeAttr {
	pub id: InterfaceId,
	pub kind: TypeKind,
	pub func_count: usize,
	pub var_count: usize,
	pub impl_count: usize,
}

/// How a function is meant to be invoked.
#[derive( Copy, Clone, Debug, Eq, Hash, PartialEq )]
pub enum InvokeKind {
	Func,
	PropertyGet,
	PropertyPut,
	PropertyPutRef,
}

#[derive( Clone, Debug, PartialEq, Eq )]
pub struct ParamDesc {
	pub name: String,
	pub ty: TypeDesc,
	pub flags: ParamFlags,
}

/// A catalog function entry.
#[derive( Clone, Debug, PartialEq, Eq )]
pub struct FuncDesc {
	pub member: MemberId,
	pub name: String,
	pub params: Vec<ParamDesc>,
	pub ret: TypeDesc,
	pub invoke: InvokeKind,
	/// Number of trailing parameters that may be omitted.
	pub optional_count: usize,
	pub flags: MemberFlags,
}

impl FuncDesc {

	pub fn new( member: MemberId, name: impl Into<String>, invoke: InvokeKind ) -> Self {
		Self {
			member,
			name: name.into(),
			params: Vec::new(),
			ret: TypeDesc::Scalar( ScalarType::Void ),
			invoke,
			optional_count: 0,
			flags: MemberFlags::NONE,
		}
	}

	pub fn method( member: MemberId, name: impl Into<String> ) -> Self { Self::new( member, name, InvokeKind::Func )}

	/// A property get accessor returning `ty`.
	pub fn getter( member: MemberId, name: impl Into<String>, ty: impl Into<TypeDesc> ) -> Self {
		Self::new( member, name, InvokeKind::PropertyGet ).with_return( ty )
	}

	/// A property put accessor taking a single `ty` value.
	pub fn putter( member: MemberId, name: impl Into<String>, ty: impl Into<TypeDesc> ) -> Self {
		Self::new( member, name, InvokeKind::PropertyPut ).with_param( "value", ty )
	}

	pub fn with_param( self, name: impl Into<String>, ty: impl Into<TypeDesc> ) -> Self {
		self.with_param_flags( name, ty, ParamFlags::IN )
	}

	pub fn with_param_flags( mut self, name: impl Into<String>, ty: impl Into<TypeDesc>, flags: ParamFlags ) -> Self {
		self.params.push( ParamDesc { name: name.into(), ty: ty.into(), flags });
		self
	}

	pub fn with_return( mut self, ty: impl Into<TypeDesc> ) -> Self {
		self.ret = ty.into();
		self
	}

	pub fn with_optional( mut self, count: usize ) -> Self {
		self.optional_count = count ;
		self
	}

	pub fn with_flags( mut self, flags: MemberFlags ) -> Self {
		self.flags = self.flags | flags ;
		self
	}

}

#[derive( Clone, Debug, PartialEq, Eq )]
pub enum VarKind {
	/// A named constant; enumeration members are constants.
	Const( i32 ),
	/// A property of a dynamic-dispatch interface.
	Dispatch,
	PerInstance,
}

/// A catalog variable entry.
#[derive( Clone, Debug, PartialEq, Eq )]
pub struct VarDesc {
	pub member: MemberId,
	pub name: String,
	pub ty: TypeDesc,
	pub kind: VarKind,
	pub flags: MemberFlags,
}

impl VarDesc {

	/// An enumeration member.
	pub fn constant( member: MemberId, name: impl Into<String>, value: i32 ) -> Self {
		Self { member, name: name.into(), ty: ScalarType::I4.into(), kind: VarKind::Const( value ), flags: MemberFlags::NONE }
	}

	/// A dispatch property.
	pub fn property( member: MemberId, name: impl Into<String>, ty: impl Into<TypeDesc> ) -> Self {
		Self { member, name: name.into(), ty: ty.into(), kind: VarKind::Dispatch, flags: MemberFlags::NONE }
	}

	pub fn with_flags( mut self, flags: MemberFlags ) -> Self {
		self.flags = self.flags | flags ;
		self
	}

}

/// One entry of an interface catalog.
///
/// Index-based accessors follow the catalog's own ordering and fail with
/// [`CallFault::MemberNotFound`] past the counts reported by [`attr`]( Self::attr ).
pub trait TypeInfo: Send + Sync {
	fn name( &self ) -> String ;
	fn attr( &self ) -> TypeAttr ;

	/// # Errors
	/// [`CallFault`] if the entry cannot be read.
	fn func( &self, index: usize ) -> Result<FuncDesc, CallFault> ;

	/// # Errors
	/// [`CallFault`] if the entry cannot be read.
	fn var( &self, index: usize ) -> Result<VarDesc, CallFault> ;

	/// Name of the function or variable identified by `member`.
	fn member_name( &self, member: MemberId ) -> Option<String> ;

	/// Resolves a type referenced by one of this entry's descriptors.
	///
	/// # Errors
	/// [`CallFault`] for dangling handles.
	fn ref_type( &self, handle: RefHandle ) -> Result<Arc<dyn TypeInfo>, CallFault> ;

	/// The `index`-th implemented (or, for interfaces, inherited) type.
	///
	/// # Errors
	/// [`CallFault`] for dangling handles.
	fn impl_type( &self, index: usize ) -> Result<( Arc<dyn TypeInfo>, ImplTypeFlags ), CallFault> ;

	/// The library containing this entry, if any.
	fn library( &self ) -> Option<Arc<dyn TypeLibrary>> ;
}

/// A collection of catalog entries sharing one identity.
pub trait TypeLibrary: Send + Sync {
	fn id( &self ) -> InterfaceId ;
	fn count( &self ) -> usize ;

	/// # Errors
	/// [`CallFault`] past [`count`]( Self::count ).
	fn type_at( &self, index: usize ) -> Result<Arc<dyn TypeInfo>, CallFault> ;
}

/// Data for one entry of a [`StaticLibrary`]. References to other types
/// ([`RefHandle`], impl types) are indices into the library's entry list.
#[derive( Clone, Debug )]
pub struct TypeSpec {
	pub name: String,
	pub id: InterfaceId,
	pub kind: TypeKind,
	pub funcs: Vec<FuncDesc>,
	pub vars: Vec<VarDesc>,
	pub impls: Vec<( RefHandle, ImplTypeFlags )>,
}

impl TypeSpec {

	pub fn new( name: impl Into<String>, id: InterfaceId, kind: TypeKind ) -> Self {
		Self { name: name.into(), id, kind, funcs: Vec::new(), vars: Vec::new(), impls: Vec::new() }
	}

	pub fn with_func( mut self, func: FuncDesc ) -> Self {
		self.funcs.push( func );
		self
	}

	pub fn with_var( mut self, var: VarDesc ) -> Self {
		self.vars.push( var );
		self
	}

	pub fn with_impl( mut self, handle: u32, flags: ImplTypeFlags ) -> Self {
		self.impls.push(( RefHandle( handle ), flags ));
		self
	}

}

/// A catalog backed by in-memory [`TypeSpec`]s.
#[derive( Debug )]
pub struct StaticLibrary {
	id: InterfaceId,
	types: Vec<TypeSpec>,
	this: Weak<StaticLibrary>,
}

impl StaticLibrary {

	pub fn new( id: InterfaceId, types: Vec<TypeSpec> ) -> Arc<Self> {
		Arc::new_cyclic(| this | Self { id, types, this: this.clone() })
	}

	/// Entry `index` as a catalog handle.
	pub fn entry( &self, index: usize ) -> Option<Arc<dyn TypeInfo>> {
		if index >= self.types.len() { return None }
		let library = self.this.upgrade()?;
		Some( Arc::new( StaticTypeInfo { library, index }))
	}

	/// First entry named `name`.
	pub fn find( &self, name: &str ) -> Option<Arc<dyn TypeInfo>> {
		self.types.iter().position(| spec | spec.name == name ).and_then(| index | self.entry( index ))
	}

}

impl TypeLibrary for StaticLibrary {
	fn id( &self ) -> InterfaceId { self.id }
	fn count( &self ) -> usize { self.types.len() }
	fn type_at( &self, index: usize ) -> Result<Arc<dyn TypeInfo>, CallFault> {
		self.entry( index ).ok_or( CallFault::MemberNotFound )
	}
}

struct StaticTypeInfo {
	library: Arc<StaticLibrary>,
	index: usize,
}

impl StaticTypeInfo {
	fn spec( &self ) -> &TypeSpec { &self.library.types[ self.index ] }
}

impl TypeInfo for StaticTypeInfo {

	fn name( &self ) -> String { self.spec().name.clone() }

	fn attr( &self ) -> TypeAttr {
		let spec = self.spec();
		TypeAttr {
			id: spec.id,
			kind: spec.kind.clone(),
			func_count: spec.funcs.len(),
			var_count: spec.vars.len(),
			impl_count: spec.impls.len(),
		}
	}

	fn func( &self, index: usize ) -> Result<FuncDesc, CallFault> {
		self.spec().funcs.get( index ).cloned().ok_or( CallFault::MemberNotFound )
	}

	fn var( &self, index: usize ) -> Result<VarDesc, CallFault> {
		self.spec().vars.get( index ).cloned().ok_or( CallFault::MemberNotFound )
	}

	fn member_name( &self, member: MemberId ) -> Option<String> {
		let spec = self.spec();
		spec.funcs.iter().find(| func | func.member == member ).map(| func | func.name.clone() )
			.or_else(|| spec.vars.iter().find(| var | var.member == member ).map(| var | var.name.clone() ))
	}

	fn ref_type( &self, handle: RefHandle ) -> Result<Arc<dyn TypeInfo>, CallFault> {
		self.library.entry( handle.0 as usize ).ok_or( CallFault::MemberNotFound )
	}

	fn impl_type( &self, index: usize ) -> Result<( Arc<dyn TypeInfo>, ImplTypeFlags ), CallFault> {
		let ( handle, flags ) = *self.spec().impls.get( index ).ok_or( CallFault::MemberNotFound )?;
		Ok(( self.ref_type( handle )?, flags ))
	}

	fn library( &self ) -> Option<Arc<dyn TypeLibrary>> {
		Some( Arc::clone( &self.library ) as Arc<dyn TypeLibrary> )
	}

}

#[cfg( test )]
mod tests {
	use super::* ;

	fn library() -> Arc<StaticLibrary> {
		StaticLibrary::new( InterfaceId::new( 1 ), vec![
			TypeSpec::new( "IShape", InterfaceId::new( 2 ), TypeKind::Dispatch )
				.with_func( FuncDesc::getter( 1, "Kind", TypeDesc::user( 1 )))
				.with_var( VarDesc::property( 2, "Area", ScalarType::R8 )),
			TypeSpec::new( "ShapeKind", InterfaceId::new( 3 ), TypeKind::Enum )
				.with_var( VarDesc::constant( 0, "Circle", 0 ))
				.with_var( VarDesc::constant( 1, "Square", 1 )),
		])
	}

	#[test]
	fn entries_resolve_references_within_the_library() {
		let library = library();
		let shape = library.find( "IShape" ).expect( "entry present" );
		let kind = shape.func( 0 ).expect( "function present" );
		let TypeDesc::UserDefined( handle ) = kind.ret else { panic!( "expected a user-defined type" ) };
		let resolved = shape.ref_type( handle ).expect( "reference resolves" );
		assert_eq!( resolved.name(), "ShapeKind" );
		assert_eq!( resolved.attr().var_count, 2 );
		assert_eq!( resolved.library().map(| library | library.id() ), Some( InterfaceId::new( 1 )));
	}

	#[test]
	fn member_names_cover_functions_and_variables() {
		let shape = library().find( "IShape" ).expect( "entry present" );
		assert_eq!( shape.member_name( 1 ).as_deref(), Some( "Kind" ));
		assert_eq!( shape.member_name( 2 ).as_deref(), Some( "Area" ));
		assert_eq!( shape.member_name( 9 ), None );
		assert!( matches!( shape.func( 5 ), Err( CallFault::MemberNotFound )));
	}

	#[test]
	fn flag_sets_combine() {
		let flags = MemberFlags::HIDDEN | MemberFlags::BINDABLE ;
		assert!( flags.contains( MemberFlags::BINDABLE ));
		assert!( flags.intersects( MemberFlags::HIDDEN | MemberFlags::RESTRICTED ));
		assert!( !flags.contains( MemberFlags::HIDDEN | MemberFlags::RESTRICTED ));
	}
}
