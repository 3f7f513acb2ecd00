//! The reflection descriptor: a typed table of a foreign interface's members.
//!
//! Members live in a single ordered table of tagged variants. Signals come
//! first, then methods, then properties, then enums; descriptor indices used by
//! the dispatch engine are positions in that table. Resolution by name or by
//! signature is a map lookup.
//!
//! A descriptor is immutable once [`DescriptorBuilder::finish`] returns it, and is
//! shared between every wrapper bound to the same interface identity.

use std::collections::HashMap ;
use indexmap::IndexMap ;
use itertools::Itertools ;
use nonempty_collections::NEVec ;

use crate::builder::BuildWarning ;
use crate::foreign::{ InterfaceId, MemberId };
use crate::type_tag::{ normalize_signature, TypeTag };



#[derive( Copy, Clone, Debug, Eq, Hash, PartialEq )]
pub enum ParamDirection {
	In,
	/// Written by the callee only.
	Out,
	/// Read and written by the callee.
	InOut,
}

#[derive( Clone, Debug, PartialEq )]
pub struct Param {
	pub name: String,
	pub tag: TypeTag,
	pub direction: ParamDirection,
}

impl Param {
	pub fn new( name: impl Into<String>, tag: TypeTag ) -> Self {
		Self { name: name.into(), tag, direction: ParamDirection::In }
	}

	pub fn with_direction( mut self, direction: ParamDirection ) -> Self {
		self.direction = direction ;
		self
	}

	/// Whether the callee may write through this parameter.
	#[inline] pub fn is_out( &self ) -> bool { self.direction != ParamDirection::In }
}

#[derive( Copy, Clone, Debug, Eq, Hash, PartialEq )]
pub enum MethodKind {
	/// A foreign function or multi-argument accessor.
	Method,
	/// Synthesized `set<Name>` entry driving a writable property through the call path.
	Setter,
}

#[derive( Clone, Debug, PartialEq )]
pub struct Method {
	pub name: String,
	pub params: Vec<Param>,
	pub ret: TypeTag,
	pub kind: MethodKind,
	/// Number of trailing parameters of this entry that may be left out.
	pub optional: usize,
	/// Truncated copy of an overload with optional trailing parameters.
	pub cloned: bool,
}

impl Method {
	pub fn new( name: impl Into<String>, params: Vec<Param>, ret: TypeTag ) -> Self {
		Self { name: name.into(), params, ret, kind: MethodKind::Method, optional: 0, cloned: false }
	}

	pub fn signature( &self ) -> String { signature( &self.name, &self.params )}

	/// Whether every parameter and the return type can be marshaled.
	pub fn is_callable( &self ) -> bool {
		self.ret.is_supported() && self.params.iter().all(| param | param.tag.is_supported() )
	}

	/// Smallest argument count this entry accepts.
	pub fn min_args( &self ) -> usize { self.params.len().saturating_sub( self.optional )}
}

#[derive( Clone, Debug, PartialEq )]
pub struct Property {
	pub name: String,
	pub tag: TypeTag,
	pub readable: bool,
	pub writable: bool,
	pub bindable: bool,
	/// Index of the companion `<name>Changed` signal of a bindable property.
	pub notify: Option<usize>,
}

impl Property {
	pub fn new( name: impl Into<String>, tag: TypeTag ) -> Self {
		Self { name: name.into(), tag, readable: false, writable: false, bindable: false, notify: None }
	}

	#[inline] pub fn is_enum( &self ) -> bool { matches!( self.tag, TypeTag::Enum( _ ))}
}

/// A method emitted toward the host.
#[derive( Clone, Debug, PartialEq )]
pub struct Signal {
	pub name: String,
	pub params: Vec<Param>,
}

impl Signal {
	pub fn new( name: impl Into<String>, params: Vec<Param> ) -> Self { Self { name: name.into(), params }}

	pub fn signature( &self ) -> String { signature( &self.name, &self.params )}
}

#[derive( Clone, Debug, PartialEq, Eq )]
pub struct EnumDef {
	pub name: String,
	pub values: IndexMap<String, i32>,
}

#[derive( Clone, Debug, PartialEq )]
pub enum Member {
	Signal( Signal ),
	Method( Method ),
	Property( Property ),
	Enum( EnumDef ),
}

impl Member {
	pub fn name( &self ) -> &str {
		match self {
			Self::Signal( signal ) => &signal.name,
			Self::Method( method ) => &method.name,
			Self::Property( property ) => &property.name,
			Self::Enum( def ) => &def.name,
		}
	}

	pub fn kind( &self ) -> &'static str {
		match self {
			Self::Signal( _ ) => "signal",
			Self::Method( _ ) => "method",
			Self::Property( _ ) => "property",
			Self::Enum( _ ) => "enum",
		}
	}
}

fn signature( name: &str, params: &[Param] ) -> String {
	format!( "{}({})", name, params.iter().map(| param | &param.tag ).join( "," ))
}

/// Synthesized, immutable table of a foreign interface's members.
#[derive( Debug )]
pub struct ReflectionDescriptor {
	class_name: String,
	class_id: Option<InterfaceId>,
	members: Vec<Member>,
	names: HashMap<String, NEVec<usize>>,
	signatures: HashMap<String, usize>,
	event_sources: IndexMap<InterfaceId, HashMap<MemberId, usize>>,
	property_notify: HashMap<MemberId, String>,
	supports_property_notify: bool,
	warnings: Vec<BuildWarning>,
}

impl ReflectionDescriptor {

	pub fn class_name( &self ) -> &str { &self.class_name }
	pub fn class_id( &self ) -> Option<InterfaceId> { self.class_id }
	pub fn members( &self ) -> &[Member] { &self.members }
	pub fn member( &self, index: usize ) -> Option<&Member> { self.members.get( index )}
	pub fn len( &self ) -> usize { self.members.len() }
	pub fn is_empty( &self ) -> bool { self.members.is_empty() }
	pub fn warnings( &self ) -> &[BuildWarning] { &self.warnings }

	/// Indices of every member called `name`; overloads share a name.
	pub fn lookup( &self, name: &str ) -> Option<&NEVec<usize>> { self.names.get( name )}

	/// Index of the signal or method with exactly this signature; whitespace is ignored.
	pub fn by_signature( &self, signature: &str ) -> Option<usize> {
		self.signatures.get( &normalize_signature( signature )).copied()
	}

	pub fn signals( &self ) -> impl Iterator<Item = ( usize, &Signal )> {
		self.members.iter().enumerate().filter_map(|( index, member )| match member {
			Member::Signal( signal ) => Some(( index, signal )),
			_ => None,
		})
	}

	pub fn methods( &self ) -> impl Iterator<Item = ( usize, &Method )> {
		self.members.iter().enumerate().filter_map(|( index, member )| match member {
			Member::Method( method ) => Some(( index, method )),
			_ => None,
		})
	}

	pub fn properties( &self ) -> impl Iterator<Item = ( usize, &Property )> {
		self.members.iter().enumerate().filter_map(|( index, member )| match member {
			Member::Property( property ) => Some(( index, property )),
			_ => None,
		})
	}

	pub fn enums( &self ) -> impl Iterator<Item = &EnumDef> {
		self.members.iter().filter_map(| member | match member {
			Member::Enum( def ) => Some( def ),
			_ => None,
		})
	}

	pub fn property( &self, name: &str ) -> Option<( usize, &Property )> {
		self.lookup( name )?.iter().find_map(| index | match &self.members[ *index ] {
			Member::Property( property ) => Some(( *index, property )),
			_ => None,
		})
	}

	pub fn signal( &self, name: &str ) -> Option<( usize, &Signal )> {
		self.lookup( name )?.iter().find_map(| index | match &self.members[ *index ] {
			Member::Signal( signal ) => Some(( *index, signal )),
			_ => None,
		})
	}

	/// Method overloads called `name`, in declaration order (full arity first).
	pub fn overloads<'a>( &'a self, name: &str ) -> impl Iterator<Item = ( usize, &'a Method )> + 'a {
		self.lookup( name ).into_iter()
			.flat_map(| indices | indices.iter() )
			.filter_map(| index | match &self.members[ *index ] {
				Member::Method( method ) => Some(( *index, method )),
				_ => None,
			})
	}

	/// Value of an enumeration key; keys are unique across all enums.
	pub fn enum_value( &self, key: &str ) -> Option<i32> {
		self.enums().find_map(| def | def.values.get( key ).copied() )
	}

	/// Event-source interfaces and, per source, member identifier to signal index.
	pub fn event_sources( &self ) -> &IndexMap<InterfaceId, HashMap<MemberId, usize>> { &self.event_sources }

	/// Member identifiers of bindable properties mapped to property names.
	pub fn property_notify( &self ) -> &HashMap<MemberId, String> { &self.property_notify }

	pub fn supports_property_notify( &self ) -> bool { self.supports_property_notify }

	/// Names of members equal to `name` ignoring case, for diagnostics.
	pub fn candidates( &self, name: &str ) -> Vec<String> {
		self.members.iter()
			.map( Member::name )
			.filter(| candidate | candidate.eq_ignore_ascii_case( name ))
			.unique()
			.map( str::to_string )
			.collect()
	}

}

/// Assembles a [`ReflectionDescriptor`].
///
/// Members may be added in any order; [`finish`]( Self::finish ) lays them out
/// signals first. Duplicate signatures are ignored, so walking an interface and
/// its bases can add the same member twice without effect.
#[derive( Debug, Default )]
pub struct DescriptorBuilder {
	class_name: String,
	class_id: Option<InterfaceId>,
	signals: Vec<Signal>,
	methods: Vec<Method>,
	properties: IndexMap<String, Property>,
	enums: IndexMap<String, EnumDef>,
	event_sources: IndexMap<InterfaceId, HashMap<MemberId, usize>>,
	property_notify: HashMap<MemberId, String>,
	supports_property_notify: bool,
	warnings: Vec<BuildWarning>,
}

impl DescriptorBuilder {

	pub fn new( class_name: impl Into<String> ) -> Self {
		Self { class_name: class_name.into(), ..Self::default() }
	}

	pub fn with_class_id( mut self, id: Option<InterfaceId> ) -> Self {
		self.class_id = id ;
		self
	}

	pub fn set_class_name( &mut self, name: impl Into<String> ) { self.class_name = name.into(); }

	/// Adds a signal and returns its final index. A signal with the same
	/// signature is reused.
	pub fn add_signal( &mut self, signal: Signal ) -> usize {
		let signature = signal.signature();
		match self.signals.iter().position(| existing | existing.signature() == signature ) {
			Some( index ) => index,
			None => {
				self.signals.push( signal );
				self.signals.len() - 1
			},
		}
	}

	/// Adds a method; returns `false` if one with the same signature exists.
	pub fn add_method( &mut self, method: Method ) -> bool {
		let signature = method.signature();
		if self.methods.iter().any(| existing | existing.signature() == signature ) { return false }
		self.methods.push( method );
		true
	}

	pub fn has_method( &self, signature: &str ) -> bool {
		let signature = normalize_signature( signature );
		self.methods.iter().any(| method | method.signature() == signature )
	}

	/// The property called `name`, created with no access flags if absent.
	pub fn property_mut( &mut self, name: &str, tag: TypeTag ) -> &mut Property {
		self.properties.entry( name.to_string() ).or_insert_with(|| Property::new( name, tag ))
	}

	pub fn properties( &self ) -> impl Iterator<Item = &Property> { self.properties.values() }

	pub fn add_enum( &mut self, def: EnumDef ) {
		self.enums.entry( def.name.clone() ).or_insert( def );
	}

	/// Routes `member` of event source `source` to signal `signal`.
	pub fn add_event_source( &mut self, source: InterfaceId, member: MemberId, signal: usize ) {
		self.event_sources.entry( source ).or_default().insert( member, signal );
	}

	/// Declares an event source even if none of its members became signals.
	pub fn declare_event_source( &mut self, source: InterfaceId ) {
		self.event_sources.entry( source ).or_default();
	}

	/// Registers a bindable property's member identifier for change notifications.
	pub fn register_property_notify( &mut self, member: MemberId, property: impl Into<String> ) {
		self.property_notify.insert( member, property.into() );
	}

	pub fn set_supports_property_notify( &mut self, supported: bool ) { self.supports_property_notify = supported ; }

	pub fn warn( &mut self, warning: BuildWarning ) { self.warnings.push( warning ); }

	pub fn finish( self ) -> ReflectionDescriptor {

		let members = self.signals.into_iter().map( Member::Signal )
			.chain( self.methods.into_iter().map( Member::Method ))
			.chain( self.properties.into_values().map( Member::Property ))
			.chain( self.enums.into_values().map( Member::Enum ))
			.collect::<Vec<_>>();

		let mut names: HashMap<String, NEVec<usize>> = HashMap::new();
		let mut signatures = HashMap::new();
		for ( index, member ) in members.iter().enumerate() {
			match names.get_mut( member.name() ) {
				Some( indices ) => indices.push( index ),
				None => { names.insert( member.name().to_string(), NEVec::new( index )); },
			}
			let signature = match member {
				Member::Signal( signal ) => signal.signature(),
				Member::Method( method ) => method.signature(),
				Member::Property( _ ) | Member::Enum( _ ) => continue,
			};
			signatures.entry( signature ).or_insert( index );
		}

		ReflectionDescriptor {
			class_name: self.class_name,
			class_id: self.class_id,
			members,
			names,
			signatures,
			event_sources: self.event_sources,
			property_notify: self.property_notify,
			supports_property_notify: self.supports_property_notify,
			warnings: self.warnings,
		}

	}

}

#[cfg( test )]
mod tests {
	use super::* ;

	fn sample() -> ReflectionDescriptor {
		let mut builder = DescriptorBuilder::new( "Sample" );
		builder.add_method( Method::new( "Move", vec![ Param::new( "x", TypeTag::Int ), Param::new( "y", TypeTag::Int ) ], TypeTag::Void ));
		let property = builder.property_mut( "Caption", TypeTag::String );
		property.readable = true ;
		let changed = builder.add_signal( Signal::new( "CaptionChanged", vec![ Param::new( "value", TypeTag::String ) ]));
		builder.property_mut( "Caption", TypeTag::String ).notify = Some( changed );
		builder.add_enum( EnumDef { name: "Align".into(), values: IndexMap::from([( "AlignLeft".to_string(), 1 )]) });
		builder.finish()
	}

	#[test]
	fn members_are_ordered_signals_first() {
		let descriptor = sample();
		let kinds = descriptor.members().iter().map( Member::kind ).collect::<Vec<_>>();
		assert_eq!( kinds, vec![ "signal", "method", "property", "enum" ]);
		assert_eq!( descriptor.property( "Caption" ).and_then(| ( _, p )| p.notify ), Some( 0 ));
	}

	#[test]
	fn signatures_resolve_ignoring_whitespace() {
		let descriptor = sample();
		assert_eq!( descriptor.by_signature( "Move( int, int )" ), Some( 1 ));
		assert_eq!( descriptor.by_signature( "CaptionChanged(string)" ), Some( 0 ));
		assert_eq!( descriptor.by_signature( "Move(int)" ), None );
	}

	#[test]
	fn duplicate_signatures_are_ignored() {
		let mut builder = DescriptorBuilder::new( "Sample" );
		assert!( builder.add_method( Method::new( "Close", vec![], TypeTag::Void )));
		assert!( !builder.add_method( Method::new( "Close", vec![], TypeTag::Bool )));
		assert_eq!( builder.add_signal( Signal::new( "Done", vec![] )), builder.add_signal( Signal::new( "Done", vec![] )));
	}

	#[test]
	fn candidates_match_case_insensitively() {
		let descriptor = sample();
		assert_eq!( descriptor.candidates( "move" ), vec![ "Move".to_string() ]);
		assert_eq!( descriptor.enum_value( "AlignLeft" ), Some( 1 ));
	}
}
