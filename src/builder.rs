//! Reflection descriptor builder.
//!
//! Walks a foreign object's interface catalog and synthesizes a
//! [`ReflectionDescriptor`]. The build never aborts: members whose types cannot
//! be resolved are recorded with an unsupported tag, and every problem is
//! reported as a [`BuildWarning`] next to the descriptor.

use std::collections::HashSet ;
use std::sync::Arc ;
use indexmap::IndexMap ;
use itertools::Itertools ;
use thiserror::Error ;
use tracing::{ debug, warn };

use crate::cache::{ CacheKey, ReflectionCache };
use crate::catalog::{
	FuncDesc, ImplTypeFlags, InvokeKind, MemberFlags, ParamFlags, ScalarType,
	TypeDesc, TypeInfo, TypeKind, TypeLibrary, VarDesc, VarKind, RefHandle,
};
use crate::descriptor::{
	DescriptorBuilder, EnumDef, Method, MethodKind, Param, ParamDirection,
	ReflectionDescriptor, Signal,
};
use crate::foreign::{ CallFault, ForeignRef, InterfaceId, MemberId, IID_PROPERTY_NOTIFY_SINK };
use crate::type_tag::TypeTag ;
use crate::utils::PartialSuccess ;



/// Non-fatal problems encountered while building a descriptor.
#[derive( Error, Debug, Clone, PartialEq )]
pub enum BuildWarning {
	/// A member was recorded but cannot be called.
	#[error( "Member {member} uses unsupported type {description}" )] UnsupportedType { member: String, description: String },
	/// The object exposes no dynamic-dispatch interface.
	#[error( "Object exposes no dispatch interface" )] NoDispatch,
	/// No catalog is available; members resolve by name only.
	#[error( "No interface catalog available" )] NoCatalog,
	/// A catalog call failed.
	#[error( "Catalog error while reading {context}: {fault}" )] Catalog { context: String, fault: CallFault },
}

/// Options that change the shape of a built descriptor. They are part of the
/// cache key, so descriptors built with different options are never shared.
///
/// ```
/// # use automation_link::BuildOptions ;
/// let options = BuildOptions::default().with_event_sink( false );
/// assert!( !options.event_sink() );
/// assert_ne!( options.fingerprint(), BuildOptions::default().fingerprint() );
/// ```
#[derive( Copy, Clone, Debug, Eq, Hash, PartialEq )]
pub struct BuildOptions {
	event_sink: bool,
	class_info: bool,
	dispatch_equals_unknown: bool,
}

impl Default for BuildOptions {
	fn default() -> Self {
		Self { event_sink: true, class_info: true, dispatch_equals_unknown: false }
	}
}

impl BuildOptions {

	/// Whether event sources are enumerated and turned into signals. Default on.
	pub fn with_event_sink( mut self, enabled: bool ) -> Self {
		self.event_sink = enabled ;
		self
	}

	/// Whether the object's class catalog entry is consulted for its identity,
	/// name and declared event sources. Default on.
	pub fn with_class_info( mut self, enabled: bool ) -> Self {
		self.class_info = enabled ;
		self
	}

	/// Treats the dispatch interface as the object's whole identity: when no class
	/// identity is available, the dispatch interface's catalog identity keys the
	/// cache instead. Default off, in which case such objects are never cached.
	pub fn with_dispatch_equals_unknown( mut self, enabled: bool ) -> Self {
		self.dispatch_equals_unknown = enabled ;
		self
	}

	#[inline] pub fn event_sink( &self ) -> bool { self.event_sink }
	#[inline] pub fn class_info( &self ) -> bool { self.class_info }
	#[inline] pub fn dispatch_equals_unknown( &self ) -> bool { self.dispatch_equals_unknown }

	/// Small integer folded into the cache key.
	pub fn fingerprint( &self ) -> u8 {
		u8::from( self.event_sink ) | ( u8::from( self.class_info ) << 1 ) | ( u8::from( self.dispatch_equals_unknown ) << 2 )
	}

}

/// Member shapes of the root introspection interfaces, filtered by name and
/// parameter count.
const RESERVED_SHAPES: [( &str, usize ); 7] = [
	( "QueryInterface", 2 ),
	( "AddRef", 0 ),
	( "Release", 0 ),
	( "GetTypeInfoCount", 1 ),
	( "GetTypeInfo", 3 ),
	( "GetIDsOfNames", 5 ),
	( "Invoke", 8 ),
];

const ROOT_INTERFACES: [&str; 2] = [ "IUnknown", "IDispatch" ];

fn is_reserved( func: &FuncDesc ) -> bool {
	RESERVED_SHAPES.iter().any(|( name, count )| func.name == *name && func.params.len() == *count )
}

fn is_hidden( flags: MemberFlags ) -> bool {
	flags.intersects( MemberFlags::HIDDEN | MemberFlags::RESTRICTED )
}

/// Builds reflection descriptors, consulting and filling a [`ReflectionCache`].
#[derive( Debug, Clone )]
pub struct ReflectionBuilder {
	cache: ReflectionCache,
	options: BuildOptions,
}

impl ReflectionBuilder {

	pub fn new( cache: ReflectionCache, options: BuildOptions ) -> Self { Self { cache, options }}

	pub fn options( &self ) -> BuildOptions { self.options }

	/// Builds (or fetches from the cache) the descriptor of a live object.
	///
	/// Warnings are returned only for a fresh build; a cache hit reports none.
	/// Event subscriptions are per instance and are not made here.
	pub fn build( &self, object: &ForeignRef ) -> PartialSuccess<Arc<ReflectionDescriptor>, BuildWarning> {

		let class_info = match self.options.class_info {
			true => object.class_info(),
			false => None,
		};
		let dispatch = object.dispatch();
		let interface_info = dispatch.as_ref()
			.and_then(| dispatch | dispatch.type_info() )
			.or_else(|| class_info.as_ref().and_then(| class | default_interface( class.as_ref() )));

		let identity = class_info.as_ref().map(| class | class.attr().id ).or_else(|| match self.options.dispatch_equals_unknown {
			true => interface_info.as_ref().map(| info | info.attr().id ),
			false => None,
		});
		let key = identity.map(| interface | CacheKey { interface, fingerprint: self.options.fingerprint() });

		if let Some( hit ) = key.as_ref().and_then(| key | self.cache.get( key )) {
			debug!( class = hit.class_name(), "reusing cached reflection descriptor" );
			return ( hit, Vec::with_capacity( 0 ))
		}

		let class_name = class_info.as_ref()
			.or( interface_info.as_ref() )
			.map_or_else(|| "ForeignObject".to_string(), | info | info.name() );
		let mut state = BuildState::new( DescriptorBuilder::new( class_name ).with_class_id( identity ));

		if dispatch.is_none() { state.builder.warn( BuildWarning::NoDispatch ); }
		match &interface_info {
			Some( info ) => {
				if let Some( library ) = info.library() { state.load_enums( &self.cache, library.as_ref() ); }
				state.walk_interface( info, &mut HashSet::new() );
			},
			None => state.builder.warn( BuildWarning::NoCatalog ),
		}

		if self.options.event_sink { state.walk_event_sources( object, class_info.as_deref() ); }

		self.finish( state, key )

	}

	/// Builds the descriptor of a pure catalog entry: an interface, a class or an
	/// enumeration, without an object instance.
	pub fn build_from_catalog( &self, info: &Arc<dyn TypeInfo> ) -> PartialSuccess<Arc<ReflectionDescriptor>, BuildWarning> {

		let attr = info.attr();
		let key = CacheKey { interface: attr.id, fingerprint: self.options.fingerprint() };
		if let Some( hit ) = self.cache.get( &key ) { return ( hit, Vec::with_capacity( 0 ))}

		let mut state = BuildState::new( DescriptorBuilder::new( info.name() ).with_class_id( Some( attr.id )));
		if let Some( library ) = info.library() { state.load_enums( &self.cache, library.as_ref() ); }

		match attr.kind {
			TypeKind::Enum => {
				let ( def, warnings ) = read_enum( info.as_ref(), &info.name(), &mut HashSet::new(), &mut 0 );
				warnings.into_iter().for_each(| warning | state.builder.warn( warning ));
				state.builder.add_enum( def );
			},
			TypeKind::CoClass => {
				match default_interface( info.as_ref() ) {
					Some( interface ) => state.walk_interface( &interface, &mut HashSet::new() ),
					None => state.builder.warn( BuildWarning::NoCatalog ),
				}
				if self.options.event_sink {
					declared_sources( info.as_ref(), &mut state.builder )
						.into_iter()
						.for_each(|( source, source_info )| state.add_event_source( source, Some( source_info )));
				}
			},
			_ => state.walk_interface( info, &mut HashSet::new() ),
		}

		self.finish( state, Some( key ))

	}

	fn finish( &self, state: BuildState, key: Option<CacheKey> ) -> PartialSuccess<Arc<ReflectionDescriptor>, BuildWarning> {

		let descriptor = state.finish();
		let warnings = descriptor.warnings().to_vec();
		warnings.iter().for_each(| warning | warn!( class = descriptor.class_name(), %warning, "reflection build warning" ));

		let descriptor = match key {
			Some( key ) => self.cache.insert( key, Arc::new( descriptor )),
			None => Arc::new( descriptor ),
		};
		debug!( class = descriptor.class_name(), members = descriptor.len(), "built reflection descriptor" );
		( descriptor, warnings )

	}

}

/// The class's default, non-source interface.
fn default_interface( class: &dyn TypeInfo ) -> Option<Arc<dyn TypeInfo>> {
	( 0..class.attr().impl_count )
		.filter_map(| index | class.impl_type( index ).ok() )
		.filter(|( _, flags )| !flags.contains( ImplTypeFlags::SOURCE ))
		.sorted_by_key(|( _, flags )| !flags.contains( ImplTypeFlags::DEFAULT ))
		.map(|( info, _ )| info )
		.next()
}

/// Source interfaces a class declares in its catalog entry.
fn declared_sources( class: &dyn TypeInfo, builder: &mut DescriptorBuilder ) -> Vec<( InterfaceId, Arc<dyn TypeInfo> )> {
	( 0..class.attr().impl_count )
		.filter_map(| index | match class.impl_type( index ) {
			Ok( entry ) => Some( entry ),
			Err( fault ) => {
				builder.warn( BuildWarning::Catalog { context: format!( "implemented type {} of {}", index, class.name() ), fault });
				None
			},
		})
		.filter(|( _, flags )| flags.contains( ImplTypeFlags::SOURCE ))
		.map(|( info, _ )| ( info.attr().id, info ))
		.collect()
}

/// Reads an enumeration's constants. Keys already taken by another enum get a
/// numeric suffix from the shared `serial` counter.
fn read_enum( info: &dyn TypeInfo, name: &str, taken: &mut HashSet<String>, serial: &mut usize ) -> ( EnumDef, Vec<BuildWarning> ) {
	let ( values, faults ): ( Vec<_>, Vec<_> ) = ( 0..info.attr().var_count )
		.map(| index | info.var( index ).map_err(| fault | BuildWarning::Catalog { context: format!( "constant {} of {}", index, name ), fault }))
		.partition_result();
	let values = values.into_iter()
		.filter_map(| var | match var.kind {
			VarKind::Const( value ) => Some(( var.name, value )),
			VarKind::Dispatch | VarKind::PerInstance => None,
		})
		.map(|( key, value )| match taken.insert( key.clone() ) {
			true => ( key, value ),
			false => {
				*serial += 1 ;
				let key = format!( "{}{}", key, serial );
				taken.insert( key.clone() );
				( key, value )
			},
		})
		.collect::<IndexMap<_, _>>();
	( EnumDef { name: name.to_string(), values }, faults )
}

/// Result of type-tag inference for one type descriptor.
struct Inferred {
	tag: TypeTag,
	/// The descriptor is a pointer the callee may write through.
	by_ref: bool,
}

impl Inferred {
	fn value( tag: TypeTag ) -> Self { Self { tag, by_ref: false }}
}

fn scalar_tag( scalar: ScalarType ) -> TypeTag {
	match scalar {
		ScalarType::Void | ScalarType::HResult => TypeTag::Void,
		ScalarType::Bool => TypeTag::Bool,
		ScalarType::I1 | ScalarType::I2 | ScalarType::I4 | ScalarType::Int | ScalarType::Error => TypeTag::Int,
		ScalarType::U1 | ScalarType::U2 | ScalarType::U4 | ScalarType::UInt => TypeTag::UInt,
		ScalarType::I8 => TypeTag::LongLong,
		ScalarType::U8 => TypeTag::ULongLong,
		ScalarType::Currency => TypeTag::Currency,
		ScalarType::R4 | ScalarType::R8 => TypeTag::Double,
		ScalarType::Date => TypeTag::DateTime,
		ScalarType::Bstr | ScalarType::LpStr | ScalarType::LpWStr => TypeTag::String,
		ScalarType::Variant => TypeTag::Variant,
		ScalarType::Dispatch => TypeTag::Object( "IDispatch".to_string() ),
		ScalarType::Unknown => TypeTag::Object( "IUnknown".to_string() ),
		ScalarType::Decimal => TypeTag::Unsupported( "decimal".to_string() ),
	}
}

fn array_tag( element: &TypeDesc ) -> TypeTag {
	match element {
		TypeDesc::Scalar( ScalarType::Bstr | ScalarType::LpStr | ScalarType::LpWStr ) => TypeTag::StringList,
		TypeDesc::Scalar( ScalarType::U1 | ScalarType::I1 ) => TypeTag::Bytes,
		_ => TypeTag::List,
	}
}

/// Bridge types recognized by their catalog name.
fn well_known( name: &str ) -> Option<TypeTag> {
	Some( match name {
		"OLE_COLOR" => TypeTag::Color,
		"IFontDisp" | "IFont" | "Font" => TypeTag::Font,
		"IPictureDisp" | "IPicture" | "Picture" => TypeTag::Image,
		"OLE_OPTEXCLUSIVE" | "OLE_ENABLEDEFAULTBOOL" | "OLE_CANCELBOOL" => TypeTag::Bool,
		_ => return None,
	})
}

struct BuildState {
	builder: DescriptorBuilder,
	enum_names: HashSet<String>,
	/// Types currently being resolved, guarding against self-referential aliases.
	resolving: HashSet<( InterfaceId, String )>,
}

impl BuildState {

	fn new( builder: DescriptorBuilder ) -> Self {
		Self { builder, enum_names: HashSet::new(), resolving: HashSet::new() }
	}

	fn finish( mut self ) -> ReflectionDescriptor {
		self.add_setters();
		self.builder.finish()
	}

	fn catalog_warning( &mut self, context: String, fault: CallFault ) {
		self.builder.warn( BuildWarning::Catalog { context, fault });
	}

	/// Loads the library's enumerations, enumerating the library once per cache
	/// lifetime.
	fn load_enums( &mut self, cache: &ReflectionCache, library: &dyn TypeLibrary ) {

		let enums = match cache.enums( library.id() ) {
			Some( enums ) => enums,
			None => {
				let mut taken = HashSet::new();
				let mut serial = 0 ;
				let mut anonymous = 0 ;
				let mut defs = Vec::new();
				for index in 0..library.count() {
					let info = match library.type_at( index ) {
						Ok( info ) => info,
						Err( fault ) => { self.catalog_warning( format!( "library entry {}", index ), fault ); continue },
					};
					if info.attr().kind != TypeKind::Enum { continue }
					let name = match info.name() {
						name if name.is_empty() => { anonymous += 1 ; format!( "enum{}", anonymous ) },
						name => name,
					};
					let ( def, warnings ) = read_enum( info.as_ref(), &name, &mut taken, &mut serial );
					warnings.into_iter().for_each(| warning | self.builder.warn( warning ));
					defs.push( def );
				}
				cache.insert_enums( library.id(), Arc::from( defs ))
			},
		};

		for def in enums.iter() {
			self.enum_names.insert( def.name.clone() );
			self.builder.add_enum( def.clone() );
		}

	}

	fn infer( &mut self, scope: &dyn TypeInfo, desc: &TypeDesc ) -> Inferred {
		match desc {
			TypeDesc::Scalar( scalar ) => Inferred::value( scalar_tag( *scalar )),
			TypeDesc::Ptr( inner ) => {
				let pointee = self.infer( scope, inner );
				match ( inner.as_ref(), &pointee.tag ) {
					// The pointer is the object reference itself.
					( TypeDesc::UserDefined( _ ), TypeTag::Object( _ ) | TypeTag::Font | TypeTag::Image ) => pointee,
					_ => Inferred { tag: pointee.tag, by_ref: true },
				}
			},
			TypeDesc::SafeArray( element ) | TypeDesc::CArray( element ) => Inferred::value( array_tag( element )),
			TypeDesc::UserDefined( handle ) => Inferred::value( self.resolve_user_type( scope, *handle )),
		}
	}

	fn resolve_user_type( &mut self, scope: &dyn TypeInfo, handle: RefHandle ) -> TypeTag {

		let target = match scope.ref_type( handle ) {
			Ok( target ) => target,
			Err( fault ) => {
				self.catalog_warning( format!( "type reference {} in {}", handle.0, scope.name() ), fault );
				return TypeTag::Unsupported( format!( "unresolved reference {}", handle.0 ))
			},
		};
		let name = target.name();
		if let Some( tag ) = well_known( &name ) { return tag }

		let attr = target.attr();
		let guard = ( attr.id, name.clone() );
		if !self.resolving.insert( guard.clone() ) { return TypeTag::Unsupported( name ) }

		let tag = match attr.kind {
			TypeKind::Enum if self.enum_names.contains( &name ) => TypeTag::Enum( name ),
			TypeKind::Enum => TypeTag::Int,
			TypeKind::Alias( aliased ) => self.infer( target.as_ref(), &aliased ).tag,
			TypeKind::Dispatch | TypeKind::Interface | TypeKind::CoClass => TypeTag::Object( name ),
			TypeKind::Record => TypeTag::Record( name ),
			TypeKind::Module | TypeKind::Union => TypeTag::Unsupported( name ),
		};

		self.resolving.remove( &guard );
		tag

	}

	fn check_supported( &mut self, member: &str, tag: &TypeTag ) {
		if let TypeTag::Unsupported( description ) = tag {
			self.builder.warn( BuildWarning::UnsupportedType { member: member.to_string(), description: description.clone() });
		}
	}

	/// Walks an interface and its bases, registering methods and properties.
	fn walk_interface( &mut self, info: &Arc<dyn TypeInfo>, visited: &mut HashSet<InterfaceId> ) {

		let attr = info.attr();
		if !visited.insert( attr.id ) { return }

		for index in 0..attr.impl_count {
			match info.impl_type( index ) {
				Ok(( base, _ )) if ROOT_INTERFACES.contains( &base.name().as_str() ) => {},
				Ok(( base, _ )) => self.walk_interface( &base, visited ),
				Err( fault ) => self.catalog_warning( format!( "base {} of {}", index, info.name() ), fault ),
			}
		}

		for index in 0..attr.func_count {
			match info.func( index ) {
				Ok( func ) => self.add_function( info.as_ref(), func ),
				Err( fault ) => self.catalog_warning( format!( "function {} of {}", index, info.name() ), fault ),
			}
		}

		for index in 0..attr.var_count {
			match info.var( index ) {
				Ok( var ) => self.add_variable( info.as_ref(), var ),
				Err( fault ) => self.catalog_warning( format!( "variable {} of {}", index, info.name() ), fault ),
			}
		}

	}

	/// Parameters of `func` and its return type; a trailing `retval` parameter
	/// becomes the return type.
	fn signature_of( &mut self, scope: &dyn TypeInfo, func: &FuncDesc ) -> ( Vec<Param>, TypeTag ) {

		let mut declared = func.params.as_slice();
		let mut ret = self.infer( scope, &func.ret ).tag ;
		if let Some(( last, rest )) = declared.split_last() {
			if last.flags.contains( ParamFlags::RETVAL ) && ret == TypeTag::Void {
				ret = self.infer( scope, &last.ty ).tag ;
				declared = rest ;
			}
		}

		let params = declared.iter()
			.enumerate()
			.map(|( index, param )| {
				let inferred = self.infer( scope, &param.ty );
				let direction = match ( param.flags.contains( ParamFlags::IN ), param.flags.contains( ParamFlags::OUT )) {
					( true, true ) => ParamDirection::InOut,
					( false, true ) => ParamDirection::Out,
					_ if inferred.by_ref => ParamDirection::InOut,
					_ => ParamDirection::In,
				};
				let name = match param.name.is_empty() {
					true => format!( "p{}", index ),
					false => param.name.clone(),
				};
				Param::new( name, inferred.tag ).with_direction( direction )
			})
			.collect::<Vec<_>>();

		self.check_supported( &func.name, &ret );
		params.iter().for_each(| param | self.check_supported( &func.name, &param.tag ));
		( params, ret )

	}

	fn add_function( &mut self, scope: &dyn TypeInfo, func: FuncDesc ) {

		if is_hidden( func.flags ) || is_reserved( &func ) { return }
		let ( params, ret ) = self.signature_of( scope, &func );
		let optional = func.optional_count.min( params.len() );
		let bindable = func.flags.contains( MemberFlags::BINDABLE );

		match func.invoke {
			InvokeKind::PropertyGet => {
				if params.len() == optional {
					self.builder.property_mut( &func.name, ret.clone() ).readable = true ;
					if bindable { self.make_bindable( &func.name, &ret, func.member ); }
				}
				if !params.is_empty() { self.add_overloads( &func.name, params, ret, optional, MethodKind::Method ); }
			},
			InvokeKind::PropertyPut | InvokeKind::PropertyPutRef => match params.as_slice() {
				[ value ] => {
					let tag = value.tag.clone();
					self.builder.property_mut( &func.name, tag.clone() ).writable = true ;
					if bindable { self.make_bindable( &func.name, &tag, func.member ); }
				},
				_ => {
					let name = format!( "set{}", func.name );
					self.add_overloads( &name, params, TypeTag::Void, optional, MethodKind::Setter );
				},
			},
			InvokeKind::Func => self.add_overloads( &func.name, params, ret, optional, MethodKind::Method ),
		}

	}

	/// Registers one method entry per accepted arity, full arity first.
	fn add_overloads( &mut self, name: &str, params: Vec<Param>, ret: TypeTag, optional: usize, kind: MethodKind ) {
		let count = params.len();
		( 0..=optional ).for_each(| dropped | {
			let method = Method {
				kind,
				optional: optional - dropped,
				cloned: dropped > 0,
				..Method::new( name, params[ ..count - dropped ].to_vec(), ret.clone() )
			};
			self.builder.add_method( method );
		});
	}

	fn add_variable( &mut self, scope: &dyn TypeInfo, var: VarDesc ) {
		if is_hidden( var.flags ) { return }
		if let VarKind::Const( _ ) = var.kind { return }
		let tag = self.infer( scope, &var.ty ).tag ;
		self.check_supported( &var.name, &tag );
		let property = self.builder.property_mut( &var.name, tag.clone() );
		property.readable = true ;
		property.writable = !var.flags.contains( MemberFlags::READONLY );
		if var.flags.contains( MemberFlags::BINDABLE ) { self.make_bindable( &var.name, &tag, var.member ); }
	}

	/// Adds the `<name>Changed` signal of a bindable property and registers the
	/// property for change notifications.
	fn make_bindable( &mut self, name: &str, tag: &TypeTag, member: MemberId ) {
		let signal = self.builder.add_signal( Signal::new( format!( "{}Changed", name ), vec![ Param::new( "value", tag.clone() ) ]));
		let property = self.builder.property_mut( name, tag.clone() );
		property.bindable = true ;
		property.notify = Some( signal );
		self.builder.register_property_notify( member, name );
	}

	/// Adds `set<Name>( tag )` for every property that is both readable and writable.
	fn add_setters( &mut self ) {
		let setters = self.builder.properties()
			.filter(| property | property.readable && property.writable )
			.map(| property | Method {
				kind: MethodKind::Setter,
				..Method::new( format!( "set{}", property.name ), vec![ Param::new( "value", property.tag.clone() ) ], TypeTag::Void )
			})
			.collect::<Vec<_>>();
		setters.into_iter().for_each(| setter | { self.builder.add_method( setter ); });
	}

	fn walk_event_sources( &mut self, object: &ForeignRef, class_info: Option<&dyn TypeInfo> ) {

		let points = object.connection_points();
		let enumerated = points.as_ref().map(| points | points.sources().map(| ids | ( points, ids )));

		let sources = match enumerated {
			Some( Ok(( points, ids ))) => ids.into_iter()
				.map(| id | ( id, points.source_type_info( id )))
				.collect::<Vec<_>>(),
			failed => {
				if let Some( Err( fault )) = failed { self.catalog_warning( "event sources".to_string(), fault ); }
				class_info
					.map(| class | declared_sources( class, &mut self.builder ))
					.unwrap_or_default()
					.into_iter()
					.map(|( id, info )| ( id, Some( info )))
					.collect()
			},
		};

		sources.into_iter().for_each(|( id, info )| self.add_event_source( id, info ));

	}

	fn add_event_source( &mut self, source: InterfaceId, info: Option<Arc<dyn TypeInfo>> ) {

		if source == IID_PROPERTY_NOTIFY_SINK {
			self.builder.set_supports_property_notify( true );
			return
		}
		self.builder.declare_event_source( source );
		let Some( info ) = info else { return };

		for index in 0..info.attr().func_count {
			let func = match info.func( index ) {
				Ok( func ) => func,
				Err( fault ) => { self.catalog_warning( format!( "event {} of {}", index, info.name() ), fault ); continue },
			};
			if func.invoke != InvokeKind::Func || is_hidden( func.flags ) || is_reserved( &func ) { continue }
			let ( params, _ ) = self.signature_of( info.as_ref(), &func );
			let signal = self.builder.add_signal( Signal::new( func.name.clone(), params ));
			self.builder.add_event_source( source, func.member, signal );
		}

	}

}

#[cfg( test )]
mod tests {
	use super::* ;

	#[test]
	fn fingerprints_differ_per_option() {
		let base = BuildOptions::default();
		let variants = [
			base,
			base.with_event_sink( false ),
			base.with_class_info( false ),
			base.with_dispatch_equals_unknown( true ),
		];
		let fingerprints = variants.iter().map( BuildOptions::fingerprint ).unique().count();
		assert_eq!( fingerprints, variants.len() );
	}

	#[test]
	fn reserved_shapes_match_by_parameter_count() {
		let invoke = FuncDesc::method( 1, "Invoke" );
		assert!( !is_reserved( &invoke ));
		assert!( is_reserved( &FuncDesc::method( 2, "Release" )));
	}

	#[test]
	fn arrays_collapse_to_native_lists() {
		assert_eq!( array_tag( &ScalarType::Bstr.into() ), TypeTag::StringList );
		assert_eq!( array_tag( &ScalarType::U1.into() ), TypeTag::Bytes );
		assert_eq!( array_tag( &ScalarType::Variant.into() ), TypeTag::List );
		assert_eq!( array_tag( &TypeDesc::array( ScalarType::I4.into() )), TypeTag::List );
	}
}
