#[allow( dead_code )]
pub mod fake {

	use std::collections::{ HashMap, HashSet };
	use std::sync::Arc ;
	use std::sync::atomic::{ AtomicU32, AtomicUsize, Ordering };
	use once_cell::sync::Lazy ;
	use parking_lot::Mutex ;
	use automation_link::{
		CallArgs, CallFault, ConnectionPoints, Cookie, Dispatch, ExceptionInfo, Font,
		ForeignObject, ForeignRef, ForeignWrapper, FuncDesc, ImplTypeFlags, InterfaceId, InvokeFlags, InvokeKind,
		MemberFlags, MemberId, ObjectFactory, ParamFlags, ReflectionCache, ScalarType, StaticLibrary, Subscriber,
		TypeDesc, TypeInfo, TypeKind, TypeLibrary, TypeSpec, VarDesc, Verb, VerbSource, WireValue,
		IID_PROPERTY_NOTIFY_SINK,
	};

	pub const LIBRARY: InterfaceId = InterfaceId::new( 0x1000 );
	pub const ALIGNMENT: InterfaceId = InterfaceId::new( 0x1001 );
	pub const ILABEL: InterfaceId = InterfaceId::new( 0x1002 );
	pub const LABEL_EVENTS: InterfaceId = InterfaceId::new( 0x1003 );
	pub const LABEL_CLASS: InterfaceId = InterfaceId::new( 0x1004 );

	pub const CAPTION: MemberId = 1 ;
	pub const CLICKED: MemberId = 1 ;
	pub const FONT_PICKED: MemberId = 2 ;

	/// Member names of the label's dispatch interface.
	const LABEL_NAMES: [( &str, MemberId ); 13] = [
		( "Caption", 1 ),
		( "Alignment", 2 ),
		( "BackColor", 3 ),
		( "Font", 4 ),
		( "GetName", 5 ),
		( "Format", 6 ),
		( "Measure", 7 ),
		( "Echo", 8 ),
		( "Fail", 10 ),
		( "Item", 11 ),
		( "Version", 12 ),
		( "Child", 13 ),
		( "Enabled", 20 ),
	];

	static LOGGING: Lazy<()> = Lazy::new(|| {
		let _ = tracing_subscriber::fmt().with_test_writer().try_init();
	});

	pub fn logging() { Lazy::force( &LOGGING ); }

	/// Catalog of a label control: an enum, the control's dispatch interface and
	/// its base, an event interface and the class tying them together.
	pub static LABEL_LIBRARY: Lazy<Arc<StaticLibrary>> = Lazy::new(|| StaticLibrary::new( LIBRARY, vec![
		// 0
		TypeSpec::new( "Alignment", ALIGNMENT, TypeKind::Enum )
			.with_var( VarDesc::constant( 0, "AlignLeft", 0 ))
			.with_var( VarDesc::constant( 1, "AlignCenter", 1 ))
			.with_var( VarDesc::constant( 2, "AlignRight", 2 )),
		// 1
		TypeSpec::new( "ILabel", ILABEL, TypeKind::Dispatch )
			.with_impl( 6, ImplTypeFlags::NONE )
			.with_func( FuncDesc::getter( 1, "Caption", ScalarType::Bstr ).with_flags( MemberFlags::BINDABLE ))
			.with_func( FuncDesc::putter( 1, "Caption", ScalarType::Bstr ).with_flags( MemberFlags::BINDABLE ))
			.with_func( FuncDesc::getter( 2, "Alignment", TypeDesc::user( 0 )))
			.with_func( FuncDesc::putter( 2, "Alignment", TypeDesc::user( 0 )))
			.with_func( FuncDesc::getter( 3, "BackColor", TypeDesc::user( 4 )))
			.with_func( FuncDesc::putter( 3, "BackColor", TypeDesc::user( 4 )))
			.with_func( FuncDesc::getter( 4, "Font", TypeDesc::ptr( TypeDesc::user( 5 ))))
			.with_func( FuncDesc::new( 4, "Font", InvokeKind::PropertyPutRef ).with_param( "value", TypeDesc::ptr( TypeDesc::user( 5 ))))
			.with_func( FuncDesc::method( 5, "GetName" ).with_return( ScalarType::Bstr ))
			.with_func( FuncDesc::method( 6, "Format" )
				.with_param( "text", ScalarType::Bstr )
				.with_param( "width", ScalarType::I4 )
				.with_param( "fill", ScalarType::Bstr )
				.with_optional( 2 )
				.with_return( ScalarType::Bstr ))
			.with_func( FuncDesc::method( 7, "Measure" )
				.with_param( "text", ScalarType::Bstr )
				.with_param_flags( "width", TypeDesc::ptr( ScalarType::I4.into() ), ParamFlags::OUT )
				.with_param_flags( "fits", TypeDesc::ptr( ScalarType::Bool.into() ), ParamFlags::OUT | ParamFlags::RETVAL ))
			.with_func( FuncDesc::method( 8, "Echo" ).with_param( "value", ScalarType::Variant ).with_return( ScalarType::Variant ))
			.with_func( FuncDesc::method( 9, "Internal" ).with_flags( MemberFlags::HIDDEN ))
			.with_func( FuncDesc::method( 10, "Fail" ))
			.with_func( FuncDesc::getter( 11, "Item", ScalarType::Bstr ).with_param( "index", ScalarType::I4 ))
			.with_func( FuncDesc::new( 11, "Item", InvokeKind::PropertyPut ).with_param( "index", ScalarType::I4 ).with_param( "value", ScalarType::Bstr ))
			.with_func( FuncDesc::method( 13, "Child" ).with_return( ScalarType::Dispatch ))
			.with_var( VarDesc::property( 12, "Version", ScalarType::Bstr ).with_flags( MemberFlags::READONLY )),
		// 2
		TypeSpec::new( "_LabelEvents", LABEL_EVENTS, TypeKind::Dispatch )
			.with_func( FuncDesc::method( CLICKED, "Clicked" )
				.with_param( "x", ScalarType::I4 )
				.with_param_flags( "cancel", TypeDesc::ptr( ScalarType::Bool.into() ), ParamFlags::IN | ParamFlags::OUT ))
			.with_func( FuncDesc::method( FONT_PICKED, "FontPicked" ).with_param( "font", TypeDesc::ptr( TypeDesc::user( 5 )))),
		// 3
		TypeSpec::new( "Label", LABEL_CLASS, TypeKind::CoClass )
			.with_impl( 1, ImplTypeFlags::DEFAULT )
			.with_impl( 2, ImplTypeFlags::DEFAULT | ImplTypeFlags::SOURCE ),
		// 4
		TypeSpec::new( "OLE_COLOR", InterfaceId::new( 0x1005 ), TypeKind::Alias( ScalarType::U4.into() )),
		// 5
		TypeSpec::new( "IFontDisp", InterfaceId::new( 0x1006 ), TypeKind::Dispatch ),
		// 6
		TypeSpec::new( "IControl", InterfaceId::new( 0x1007 ), TypeKind::Dispatch )
			.with_impl( 7, ImplTypeFlags::NONE )
			.with_func( FuncDesc::getter( 20, "Enabled", ScalarType::Bool ))
			.with_func( FuncDesc::putter( 20, "Enabled", ScalarType::Bool )),
		// 7
		TypeSpec::new( "IDispatch", InterfaceId::new( 0x1008 ), TypeKind::Dispatch )
			.with_func( FuncDesc::method( 100, "GetTypeInfoCount" ).with_param( "count", TypeDesc::ptr( ScalarType::UInt.into() ))),
	]));

	pub fn entry( name: &str ) -> Arc<dyn TypeInfo> {
		LABEL_LIBRARY.find( name ).expect( "catalog entry exists" )
	}

	pub type Handler = Arc<dyn Fn( &mut CallArgs ) -> Result<WireValue, CallFault> + Send + Sync>;

	/// In-memory dispatch interface: properties are stored wire values, methods
	/// are handlers, and every call is logged.
	pub struct FakeDispatch {
		catalog: Option<Arc<dyn TypeInfo>>,
		names: HashMap<String, MemberId>,
		properties: Mutex<HashMap<MemberId, WireValue>>,
		handlers: Mutex<HashMap<MemberId, Handler>>,
		reject_put_ref: Mutex<HashSet<MemberId>>,
		calls: Mutex<Vec<( MemberId, InvokeFlags )>>,
		lookups: AtomicUsize,
	}

	impl FakeDispatch {

		pub fn new( catalog: Option<Arc<dyn TypeInfo>>, names: &[( &str, MemberId )]) -> Self {
			Self {
				catalog,
				names: names.iter().map(|( name, id )| ( name.to_string(), *id )).collect(),
				properties: Mutex::new( HashMap::new() ),
				handlers: Mutex::new( HashMap::new() ),
				reject_put_ref: Mutex::new( HashSet::new() ),
				calls: Mutex::new( Vec::new() ),
				lookups: AtomicUsize::new( 0 ),
			}
		}

		pub fn with_property( self, member: MemberId, value: WireValue ) -> Self {
			self.properties.lock().insert( member, value );
			self
		}

		pub fn with_handler( self, member: MemberId, handler: impl Fn( &mut CallArgs ) -> Result<WireValue, CallFault> + Send + Sync + 'static ) -> Self {
			self.handlers.lock().insert( member, Arc::new( handler ));
			self
		}

		pub fn rejecting_put_ref( self, member: MemberId ) -> Self {
			self.reject_put_ref.lock().insert( member );
			self
		}

		pub fn property( &self, member: MemberId ) -> Option<WireValue> { self.properties.lock().get( &member ).cloned() }
		pub fn calls( &self ) -> Vec<( MemberId, InvokeFlags )> { self.calls.lock().clone() }
		pub fn lookups( &self ) -> usize { self.lookups.load( Ordering::SeqCst ) }

		pub fn puts( &self ) -> Vec<( MemberId, InvokeFlags )> {
			self.calls().into_iter().filter(|( _, flags )| flags.is_put() ).collect()
		}

	}

	impl Dispatch for FakeDispatch {

		fn member_id( &self, name: &str ) -> Result<MemberId, CallFault> {
			self.lookups.fetch_add( 1, Ordering::SeqCst );
			self.names.get( name ).copied().ok_or( CallFault::MemberNotFound )
		}

		fn invoke( &self, member: MemberId, flags: InvokeFlags, args: &mut CallArgs ) -> Result<WireValue, CallFault> {

			self.calls.lock().push(( member, flags ));
			if !self.names.values().any(| id | *id == member ) { return Err( CallFault::MemberNotFound ) }

			if flags.is_put() {
				if flags.contains( InvokeFlags::PROPERTY_PUT_REF ) && self.reject_put_ref.lock().contains( &member ) {
					return Err( CallFault::TypeMismatch { argument: Some( 0 )})
				}
				let handler = self.handlers.lock().get( &member ).cloned();
				if let Some( handler ) = handler { return handler( args )}
				let value = match args.positional.first() {
					Some( WireValue::ByRef( inner )) => inner.get(),
					Some( value ) => value.clone(),
					None => return Err( CallFault::BadParamCount ),
				};
				self.properties.lock().insert( member, value );
				return Ok( WireValue::Empty )
			}

			let handler = self.handlers.lock().get( &member ).cloned();
			match handler {
				Some( handler ) => handler( args ),
				None => Ok( self.property( member ).unwrap_or( WireValue::Empty )),
			}

		}

		fn type_info( &self ) -> Option<Arc<dyn TypeInfo>> { self.catalog.clone() }

	}

	/// Subscription mechanism recording its subscribers.
	pub type Hook = Arc<dyn Fn() + Send + Sync>;

	pub struct FakePoints {
		sources: Result<Vec<InterfaceId>, CallFault>,
		subscribers: Mutex<Vec<( InterfaceId, Cookie, Subscriber )>>,
		next: AtomicU32,
		on_advise: Mutex<Option<Hook>>,
		on_unadvise: Mutex<Option<Hook>>,
	}

	impl FakePoints {

		pub fn new( sources: Result<Vec<InterfaceId>, CallFault> ) -> Self {
			Self {
				sources,
				subscribers: Mutex::new( Vec::new() ),
				next: AtomicU32::new( 1 ),
				on_advise: Mutex::new( None ),
				on_unadvise: Mutex::new( None ),
			}
		}

		/// Runs `hook` after every subscription, outside the fake's own locks.
		pub fn on_advise( &self, hook: impl Fn() + Send + Sync + 'static ) { *self.on_advise.lock() = Some( Arc::new( hook )); }

		/// Runs `hook` after every cancelled subscription.
		pub fn on_unadvise( &self, hook: impl Fn() + Send + Sync + 'static ) { *self.on_unadvise.lock() = Some( Arc::new( hook )); }

		pub fn advised( &self ) -> usize { self.subscribers.lock().len() }

		pub fn advised_to( &self, source: InterfaceId ) -> usize {
			self.subscribers.lock().iter().filter(|( id, _, _ )| *id == source ).count()
		}

		fn subscribers( &self, source: InterfaceId ) -> Vec<Subscriber> {
			self.subscribers.lock().iter()
				.filter(|( id, _, _ )| *id == source )
				.map(|( _, _, subscriber )| subscriber.clone() )
				.collect()
		}

		/// Fires event `member` of `source`; `args` are in wire order.
		pub fn fire( &self, source: InterfaceId, member: MemberId, args: &mut [WireValue] ) -> Vec<Result<(), CallFault>> {
			self.subscribers( source ).into_iter()
				.filter_map(| subscriber | match subscriber {
					Subscriber::Events( sink ) => Some( sink.invoke( member, args )),
					Subscriber::PropertyNotify( _ ) => None,
				})
				.collect()
		}

		pub fn changed( &self, member: MemberId ) -> Vec<Result<(), CallFault>> {
			self.subscribers( IID_PROPERTY_NOTIFY_SINK ).into_iter()
				.filter_map(| subscriber | match subscriber {
					Subscriber::PropertyNotify( sink ) => Some( sink.on_changed( member )),
					Subscriber::Events( _ ) => None,
				})
				.collect()
		}

		pub fn request_edit( &self, member: MemberId ) -> Vec<bool> {
			self.subscribers( IID_PROPERTY_NOTIFY_SINK ).into_iter()
				.filter_map(| subscriber | match subscriber {
					Subscriber::PropertyNotify( sink ) => Some( sink.on_request_edit( member )),
					Subscriber::Events( _ ) => None,
				})
				.collect()
		}

	}

	impl ConnectionPoints for FakePoints {

		fn sources( &self ) -> Result<Vec<InterfaceId>, CallFault> { self.sources.clone() }

		fn source_type_info( &self, source: InterfaceId ) -> Option<Arc<dyn TypeInfo>> {
			( 0..LABEL_LIBRARY.count() )
				.filter_map(| index | LABEL_LIBRARY.type_at( index ).ok() )
				.find(| info | info.attr().id == source )
		}

		fn advise( &self, source: InterfaceId, subscriber: Subscriber ) -> Result<Cookie, CallFault> {
			let cookie = Cookie( self.next.fetch_add( 1, Ordering::SeqCst ));
			self.subscribers.lock().push(( source, cookie, subscriber ));
			let hook = self.on_advise.lock().clone();
			if let Some( hook ) = hook { hook() }
			Ok( cookie )
		}

		fn unadvise( &self, source: InterfaceId, cookie: Cookie ) -> Result<(), CallFault> {
			{
				let mut subscribers = self.subscribers.lock();
				let index = subscribers.iter()
					.position(|( id, token, _ )| *id == source && *token == cookie )
					.ok_or( CallFault::Failed( 0x8004_0200_u32 as i32 ))?;
				subscribers.remove( index );
			}
			let hook = self.on_unadvise.lock().clone();
			if let Some( hook ) = hook { hook() }
			Ok(())
		}

	}

	#[derive( Default )]
	pub struct FakeVerbs {
		pub performed: Mutex<Vec<i32>>,
	}

	impl VerbSource for FakeVerbs {
		fn verbs( &self ) -> Result<Vec<Verb>, CallFault> {
			Ok( vec![ Verb { id: 0, name: "Open".into() }, Verb { id: 1, name: "Properties".into() } ])
		}

		fn perform( &self, id: i32 ) -> Result<(), CallFault> {
			self.performed.lock().push( id );
			Ok(())
		}
	}

	#[derive( Default )]
	pub struct FakeObject {
		pub dispatch: Option<Arc<FakeDispatch>>,
		pub class: Option<Arc<dyn TypeInfo>>,
		pub points: Option<Arc<FakePoints>>,
		pub verbs: Option<Arc<FakeVerbs>>,
		pub font: Option<Font>,
		pub font_queries: AtomicUsize,
	}

	impl ForeignObject for FakeObject {
		fn dispatch( &self ) -> Option<Arc<dyn Dispatch>> { self.dispatch.clone().map(| dispatch | dispatch as Arc<dyn Dispatch> )}
		fn class_info( &self ) -> Option<Arc<dyn TypeInfo>> { self.class.clone() }
		fn connection_points( &self ) -> Option<Arc<dyn ConnectionPoints>> { self.points.clone().map(| points | points as Arc<dyn ConnectionPoints> )}
		fn verbs( &self ) -> Option<Arc<dyn VerbSource>> { self.verbs.clone().map(| verbs | verbs as Arc<dyn VerbSource> )}

		fn font( &self ) -> Option<Font> {
			self.font_queries.fetch_add( 1, Ordering::SeqCst );
			self.font.clone()
		}
	}

	pub fn foreign( object: &Arc<FakeObject> ) -> ForeignRef {
		ForeignRef::from_arc( Arc::clone( object ) as Arc<dyn ForeignObject> )
	}

	/// An object carrying nothing but a font.
	pub fn font_object( name: &str ) -> Arc<FakeObject> {
		Arc::new( FakeObject { font: Some( Font { family: name.to_string(), ..Font::default() }), ..FakeObject::default() })
	}

	fn declared( args: &CallArgs, index: usize ) -> Option<WireValue> {
		args.declared( index ).map(| value | match value {
			WireValue::ByRef( inner ) => inner.get(),
			other => other.clone(),
		})
	}

	pub fn label_dispatch() -> FakeDispatch {
		FakeDispatch::new( Some( entry( "ILabel" )), &LABEL_NAMES )
			.with_property( 1, WireValue::Str( "Hello".into() ))
			.with_property( 2, WireValue::I4( 1 ))
			.with_property( 3, WireValue::U4( 0x0000_FF00 ))
			.with_property( 12, WireValue::Str( "2.1".into() ))
			.with_property( 20, WireValue::Bool( true ))
			.with_handler( 5, | _ | Ok( WireValue::Str( "Label1".into() )))
			.with_handler( 6, | args | {
				let text = match declared( args, 0 ) {
					Some( WireValue::Str( text )) => text,
					_ => return Err( CallFault::TypeMismatch { argument: Some( args.positional.len().saturating_sub( 1 ))}),
				};
				Ok( WireValue::Str( format!( "{}:{}", text, args.positional.len() )))
			})
			.with_handler( 7, | args | {
				let width = match declared( args, 0 ) {
					Some( WireValue::Str( text )) => i32::try_from( text.len() * 7 ).unwrap_or( i32::MAX ),
					_ => return Err( CallFault::TypeMismatch { argument: Some( 1 )}),
				};
				if let Some( WireValue::ByRef( slot )) = args.declared( 1 ) { slot.set( WireValue::I4( width )); }
				Ok( WireValue::Bool( width < 100 ))
			})
			.with_handler( 8, | args | Ok( declared( args, 0 ).unwrap_or( WireValue::Empty )))
			.with_handler( 10, | _ | Err( CallFault::Exception( ExceptionInfo {
				code: 1001,
				source: "Label".into(),
				description: "Something broke".into(),
				help: String::new(),
			})))
			.with_handler( 13, | _ | Ok( WireValue::Object( Some( foreign( &label_object() )))))
	}

	/// A fully described label: catalog, class entry, events and verbs.
	pub fn label_object() -> Arc<FakeObject> {
		Arc::new( FakeObject {
			dispatch: Some( Arc::new( label_dispatch() )),
			class: Some( entry( "Label" )),
			points: Some( Arc::new( FakePoints::new( Ok( vec![ LABEL_EVENTS, IID_PROPERTY_NOTIFY_SINK ])))),
			verbs: Some( Arc::new( FakeVerbs::default() )),
			..FakeObject::default()
		})
	}

	/// An object with a dispatch interface but no catalog at all.
	pub fn counter_object() -> Arc<FakeObject> {
		Arc::new( FakeObject {
			dispatch: Some( Arc::new( FakeDispatch::new( None, &[( "Count", 30 )]).with_property( 30, WireValue::I4( 3 )))),
			..FakeObject::default()
		})
	}

	/// Resolves `Label.Control` and creates fresh labels; attaches to `running`
	/// when asked for a running instance.
	pub struct FakeFactory {
		pub created: AtomicUsize,
		pub running: Mutex<Option<ForeignRef>>,
	}

	impl FakeFactory {
		pub fn new() -> Arc<Self> { Arc::new( Self { created: AtomicUsize::new( 0 ), running: Mutex::new( None )})}
		pub fn created( &self ) -> usize { self.created.load( Ordering::SeqCst ) }
	}

	impl ObjectFactory for FakeFactory {

		fn resolve_class( &self, name: &str ) -> Result<InterfaceId, CallFault> {
			match name {
				"Label.Control" => Ok( LABEL_CLASS ),
				_ => Err( CallFault::MemberNotFound ),
			}
		}

		fn create( &self, class: InterfaceId ) -> Result<ForeignRef, CallFault> {
			if class != LABEL_CLASS { return Err( CallFault::Failed( 0x8004_0154_u32 as i32 ))}
			self.created.fetch_add( 1, Ordering::SeqCst );
			Ok( foreign( &label_object() ))
		}

		fn running_instance( &self, class: InterfaceId ) -> Result<ForeignRef, CallFault> {
			match ( class == LABEL_CLASS, self.running.lock().clone() ) {
				( true, Some( object )) => Ok( object ),
				_ => Err( CallFault::Failed( 0x800401E3_u32 as i32 )),
			}
		}

	}

	/// Wraps `object` with a fresh factory and cache.
	pub fn wrap( object: &Arc<FakeObject> ) -> ForeignWrapper {
		wrap_with( object, &ReflectionCache::new() )
	}

	pub fn wrap_with( object: &Arc<FakeObject>, cache: &ReflectionCache ) -> ForeignWrapper {
		logging();
		let wrapper = ForeignWrapper::new( FakeFactory::new(), cache.clone() );
		wrapper.bind_object( foreign( object )).expect( "wrapping never fails on an idle wrapper" );
		wrapper
	}

}
