//! The foreign handle lifecycle.
//!
//! A [`ForeignWrapper`] owns one foreign object at a time. It moves through
//! `Empty → Initializing → Bound → Empty`: binding creates or attaches the object,
//! the reflection descriptor is built on first use, event proxies are advised on
//! the first listener, and [`clear`]( ForeignWrapper::clear ) (or dropping the
//! wrapper) unadvises and releases everything.
//!
//! Internal locks are only held while reading or swapping state, never across a
//! foreign call, so listeners and foreign callbacks may re-enter the wrapper.

use std::collections::BTreeMap ;
use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::{ Arc, Weak };
use itertools::Itertools ;
use parking_lot::{ Mutex, RwLock };
use thiserror::Error ;
use tracing::{ debug, error, info, warn };

use crate::builder::{ BuildOptions, ReflectionBuilder };
use crate::cache::{ CacheLease, ReflectionCache };
use crate::descriptor::ReflectionDescriptor ;
use crate::dispatch::{ DispatchError, Dispatcher, MemberIdCache, WritableOverrides };
use crate::event_proxy::{ EventHost, EventProxy };
use crate::foreign::{ CallFault, Dispatch, ExceptionInfo, ForeignRef, MemberId, ObjectFactory, Verb, IID_PROPERTY_NOTIFY_SINK };
use crate::signals::Notifier ;
use crate::specifier::Specifier ;
use crate::value::Value ;



/// Errors of [`ForeignWrapper::bind`].
#[derive( Error, Debug, Clone, PartialEq )]
pub enum BindError {
	#[error( "Failed to bind \"{specifier}\": {reason}" )] BindingFailed { specifier: String, reason: CallFault },
	/// Another bind on the same wrapper is in progress.
	#[error( "Wrapper is busy binding" )] Busy,
}

struct Binding {
	specifier: Option<String>,
	object: ForeignRef,
	dispatch: Option<Arc<dyn Dispatch>>,
	descriptor: Option<Arc<ReflectionDescriptor>>,
	proxies: Vec<Arc<EventProxy>>,
	subscribed: bool,
	_lease: CacheLease,
}

enum State {
	Empty,
	Initializing,
	Bound( Binding ),
}

struct WrapperCore {
	factory: Arc<dyn ObjectFactory>,
	cache: ReflectionCache,
	options: RwLock<BuildOptions>,
	state: Mutex<State>,
	ids: MemberIdCache,
	overrides: WritableOverrides,
	notifier: Notifier,
	listening: AtomicBool,
}

impl WrapperCore {

	fn dispatch( &self ) -> Option<Arc<dyn Dispatch>> {
		match &*self.state.lock() {
			State::Bound( binding ) => binding.dispatch.clone(),
			State::Empty | State::Initializing => None,
		}
	}

	fn cached_descriptor( &self ) -> Option<Arc<ReflectionDescriptor>> {
		match &*self.state.lock() {
			State::Bound( binding ) => binding.descriptor.clone(),
			State::Empty | State::Initializing => None,
		}
	}

	fn dispatcher<R>(
		&self,
		descriptor: Option<&ReflectionDescriptor>,
		call: impl FnOnce( &Dispatcher ) -> Result<R, DispatchError>,
	) -> Result<R, DispatchError> {
		let Some( dispatch ) = self.dispatch() else {
			warn!( "call on a wrapper without a bound dispatch interface" );
			return Err( DispatchError::NotBound )
		};
		let dispatcher = Dispatcher::new( dispatch.as_ref(), &self.ids )
			.with_descriptor( descriptor )
			.with_overrides( &self.overrides )
			.with_notifier( &self.notifier );
		call( &dispatcher )
	}

}

impl EventHost for WrapperCore {

	fn notifier( &self ) -> &Notifier { &self.notifier }

	fn is_writable( &self, property: &str ) -> bool { self.overrides.is_writable( property )}

	fn current_value( &self, property: &str ) -> Option<Value> {
		let descriptor = self.cached_descriptor();
		self.dispatcher( descriptor.as_deref(), | dispatcher | dispatcher.get_property( property )).ok()
	}

}

/// Host-side handle to one foreign object.
///
/// ```
/// # use std::sync::Arc ;
/// # use automation_link::{ CallFault, ForeignRef, ForeignWrapper, InterfaceId, ObjectFactory, ReflectionCache };
/// struct NoFactory ;
///
/// impl ObjectFactory for NoFactory {
/// 	fn resolve_class( &self, _: &str ) -> Result<InterfaceId, CallFault> { Err( CallFault::MemberNotFound ) }
/// 	fn create( &self, _: InterfaceId ) -> Result<ForeignRef, CallFault> { Err( CallFault::NotSupported ) }
/// }
///
/// let wrapper = ForeignWrapper::new( Arc::new( NoFactory ), ReflectionCache::new() );
/// assert!( wrapper.bind( "Shell.Explorer" ).is_err() );
/// assert!( !wrapper.is_bound() );
/// ```
pub struct ForeignWrapper {
	core: Arc<WrapperCore>,
}

impl std::fmt::Debug for ForeignWrapper {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ForeignWrapper" )
			.field( "specifier", &self.specifier() )
			.field( "bound", &self.is_bound() )
			.field( "options", &self.options() )
			.finish_non_exhaustive()
	}
}

impl ForeignWrapper {

	pub fn new( factory: Arc<dyn ObjectFactory>, cache: ReflectionCache ) -> Self {
		Self { core: Arc::new( WrapperCore {
			factory,
			cache,
			options: RwLock::new( BuildOptions::default() ),
			state: Mutex::new( State::Empty ),
			ids: MemberIdCache::new(),
			overrides: WritableOverrides::default(),
			notifier: Notifier::new(),
			listening: AtomicBool::new( false ),
		})}
	}

	/// Options for descriptors built from now on.
	pub fn with_options( self, options: BuildOptions ) -> Self {
		*self.core.options.write() = options ;
		self
	}

	pub fn options( &self ) -> BuildOptions { *self.core.options.read() }

	pub fn is_bound( &self ) -> bool { matches!( *self.core.state.lock(), State::Bound( _ ))}

	/// The specifier the wrapper was bound from; `None` for wrapped objects.
	pub fn specifier( &self ) -> Option<String> {
		match &*self.core.state.lock() {
			State::Bound( binding ) => binding.specifier.clone(),
			State::Empty | State::Initializing => None,
		}
	}

	pub fn object( &self ) -> Option<ForeignRef> {
		match &*self.core.state.lock() {
			State::Bound( binding ) => Some( binding.object.clone() ),
			State::Empty | State::Initializing => None,
		}
	}

	/// Creates or attaches the object named by `specifier` (see [`Specifier`]).
	/// Binding the specifier the wrapper is already bound to does nothing; any
	/// other specifier replaces the current object.
	///
	/// # Errors
	/// [`BindError::Busy`] while another bind is in progress,
	/// [`BindError::BindingFailed`] when no strategy produced an object.
	pub fn bind( &self, specifier: &str ) -> Result<(), BindError> {

		if let State::Bound( binding ) = &*self.core.state.lock() {
			if binding.specifier.as_deref() == Some( specifier ) { return Ok(()) }
		}
		self.begin()?;

		match Specifier::parse( specifier ).open( self.core.factory.as_ref() ) {
			Ok( object ) => {
				info!( specifier, "bound foreign object" );
				self.finish( Some( specifier.to_string() ), object );
				Ok(())
			},
			Err( reason ) => {
				*self.core.state.lock() = State::Empty ;
				error!( specifier, %reason, "binding failed" );
				Err( BindError::BindingFailed { specifier: specifier.to_string(), reason })
			},
		}

	}

	/// Wraps an already created foreign object.
	///
	/// # Errors
	/// [`BindError::Busy`] while another bind is in progress.
	pub fn bind_object( &self, object: ForeignRef ) -> Result<(), BindError> {
		self.begin()?;
		info!( ?object, "wrapped foreign object" );
		self.finish( None, object );
		Ok(())
	}

	/// Releases the current object, if any, and enters `Initializing`.
	fn begin( &self ) -> Result<(), BindError> {
		if matches!( *self.core.state.lock(), State::Initializing ) { return Err( BindError::Busy )}
		self.clear();
		let mut state = self.core.state.lock();
		match matches!( *state, State::Empty ) {
			true => {
				*state = State::Initializing ;
				Ok(())
			},
			false => Err( BindError::Busy ),
		}
	}

	fn finish( &self, specifier: Option<String>, object: ForeignRef ) {
		let dispatch = object.dispatch();
		*self.core.state.lock() = State::Bound( Binding {
			specifier,
			object,
			dispatch,
			descriptor: None,
			proxies: Vec::with_capacity( 0 ),
			subscribed: false,
			_lease: self.core.cache.acquire(),
		});
		if self.core.listening.load( Ordering::SeqCst ) { self.subscribe(); }
	}

	/// Unadvises every event proxy and releases the object. The descriptor is
	/// dropped too unless the reflection cache shares it.
	pub fn clear( &self ) {
		let binding = {
			let mut state = self.core.state.lock();
			match std::mem::replace( &mut *state, State::Empty ) {
				State::Bound( binding ) => binding,
				State::Initializing => {
					*state = State::Initializing ;
					return
				},
				State::Empty => return,
			}
		};
		binding.proxies.iter().for_each(| proxy | proxy.unadvise() );
		self.core.ids.clear();
		info!( specifier = ?binding.specifier, "cleared foreign object" );
	}

	/// The reflection descriptor of the bound object, built on first use.
	pub fn descriptor( &self ) -> Option<Arc<ReflectionDescriptor>> {

		let object = match &*self.core.state.lock() {
			State::Bound( Binding { descriptor: Some( descriptor ), .. }) => return Some( Arc::clone( descriptor )),
			State::Bound( binding ) => binding.object.clone(),
			State::Empty | State::Initializing => return None,
		};

		let ( descriptor, _ ) = ReflectionBuilder::new( self.core.cache.clone(), self.options() ).build( &object );

		match &mut *self.core.state.lock() {
			State::Bound( binding ) if binding.object.ptr_eq( &object ) =>
				Some( Arc::clone( binding.descriptor.get_or_insert( descriptor ))),
			_ => Some( descriptor ),
		}

	}

	/// Advises one proxy per event source of the descriptor, plus the change
	/// notification proxy when the object supports it. Runs once per binding.
	fn subscribe( &self ) {

		let Some( descriptor ) = self.descriptor() else { return };
		let ( object, dispatch ) = match &mut *self.core.state.lock() {
			State::Bound( binding ) if !binding.subscribed => {
				binding.subscribed = true ;
				( binding.object.clone(), binding.dispatch.clone() )
			},
			_ => return,
		};
		let Some( points ) = object.connection_points() else {
			debug!( class = descriptor.class_name(), "object has no event subscription mechanism" );
			return
		};

		let host = Arc::downgrade( &self.core ) as Weak<dyn EventHost> ;
		let sources = descriptor.event_sources().keys()
			.map(| source | ( *source, points.source_type_info( *source )))
			.chain( descriptor.supports_property_notify()
				.then(|| ( IID_PROPERTY_NOTIFY_SINK, dispatch.as_ref().and_then(| dispatch | dispatch.type_info() )))
			)
			.collect::<Vec<_>>();

		let ( proxies, failures ): ( Vec<_>, Vec<_> ) = sources.into_iter()
			.map(|( source, catalog )| {
				let proxy = Arc::new( EventProxy::new( source, Arc::clone( &descriptor ), Weak::clone( &host )).with_catalog( catalog ));
				proxy.advise( Arc::clone( &points )).map(| () | proxy ).map_err(| fault | ( source, fault ))
			})
			.partition_result();
		failures.iter().for_each(|( source, fault )| warn!( %source, %fault, "event subscription failed" ));

		let stale = match &mut *self.core.state.lock() {
			State::Bound( binding ) if binding.object.ptr_eq( &object ) => { binding.proxies.extend( proxies ); Vec::with_capacity( 0 ) },
			_ => proxies,
		};
		stale.iter().for_each(| proxy | proxy.unadvise() );

	}

	/// Calls a member by name or signature; see [`Dispatcher::invoke_by_name`].
	///
	/// # Errors
	/// [`DispatchError`] for unbound wrappers, unknown members and foreign failures.
	pub fn invoke( &self, text: &str, args: &mut [Value] ) -> Result<Value, DispatchError> {
		let descriptor = self.descriptor();
		self.core.dispatcher( descriptor.as_deref(), | dispatcher | dispatcher.invoke_by_name( text, args ))
	}

	/// # Errors
	/// [`DispatchError`] for unbound wrappers, unknown members and foreign failures.
	pub fn get_property( &self, name: &str ) -> Result<Value, DispatchError> {
		let descriptor = self.descriptor();
		self.core.dispatcher( descriptor.as_deref(), | dispatcher | dispatcher.get_property( name ))
	}

	/// # Errors
	/// [`DispatchError::NotWritable`] before any foreign call for read-only
	/// properties, otherwise as [`get_property`]( Self::get_property ).
	pub fn set_property( &self, name: &str, value: &Value ) -> Result<(), DispatchError> {
		let descriptor = self.descriptor();
		self.core.dispatcher( descriptor.as_deref(), | dispatcher | dispatcher.set_property( name, value ))
	}

	/// Reads the property at descriptor index `index`.
	///
	/// # Errors
	/// [`DispatchError`] for bad indices and foreign failures.
	pub fn read_property( &self, index: usize ) -> Result<Value, DispatchError> {
		let descriptor = self.descriptor();
		self.core.dispatcher( descriptor.as_deref(), | dispatcher | dispatcher.read_property( index ))
	}

	/// # Errors
	/// [`DispatchError`] for bad indices, read-only properties and foreign failures.
	pub fn write_property( &self, index: usize, value: &Value ) -> Result<(), DispatchError> {
		let descriptor = self.descriptor();
		self.core.dispatcher( descriptor.as_deref(), | dispatcher | dispatcher.write_property( index, value ))
	}

	/// Calls the method at descriptor index `index`; out-parameters are written
	/// back into `args`.
	///
	/// # Errors
	/// [`DispatchError`] for bad indices, argument counts and foreign failures.
	pub fn invoke_method( &self, index: usize, args: &mut [Value] ) -> Result<Value, DispatchError> {
		let descriptor = self.descriptor();
		self.core.dispatcher( descriptor.as_deref(), | dispatcher | dispatcher.invoke_method( index, args ))
	}

	/// Host-side writable override, consulted by writes and by edit requests
	/// from the object. Properties are writable unless overridden.
	pub fn set_property_writable( &self, name: &str, writable: bool ) { self.core.overrides.set( name, writable ); }

	pub fn is_property_writable( &self, name: &str ) -> bool { self.core.overrides.is_writable( name )}

	/// Member identifier already resolved for `name` on the current object.
	pub fn member_id_cached( &self, name: &str ) -> Option<MemberId> { self.core.ids.get( name )}

	/// Calls a member returning an object and wraps the result in a new wrapper
	/// sharing this wrapper's factory, cache and options. `Ok( None )` when the
	/// member returned no object.
	///
	/// # Errors
	/// As [`invoke`]( Self::invoke ).
	pub fn query_sub_object( &self, name: &str, args: &mut [Value] ) -> Result<Option<ForeignWrapper>, DispatchError> {
		let Value::Object( object ) = self.invoke( name, args )? else { return Ok( None )};
		let wrapper = Self::new( Arc::clone( &self.core.factory ), self.core.cache.clone() ).with_options( self.options() );
		wrapper.finish( None, object );
		Ok( Some( wrapper ))
	}

	/// Every readable and writable property with a marshalable type. Properties
	/// that fail to read are left out.
	pub fn property_bag( &self ) -> BTreeMap<String, Value> {
		let Some( descriptor ) = self.descriptor() else { return BTreeMap::new() };
		descriptor.properties()
			.filter(|( _, property )| property.readable && property.writable && property.tag.is_supported() )
			.filter_map(|( index, property )| match self.read_property( index ) {
				Ok( value ) => Some(( property.name.clone(), value )),
				Err( error ) => {
					debug!( property = %property.name, %error, "left out of property bag" );
					None
				},
			})
			.collect()
	}

	/// Writes a property bag back. Failures are logged and skipped; they are
	/// returned so callers can inspect them.
	pub fn restore_property_bag( &self, bag: &BTreeMap<String, Value> ) -> Vec<DispatchError> {
		bag.iter()
			.filter_map(|( name, value )| self.set_property( name, value ).err() )
			.inspect(| error | warn!( %error, "property not restored" ))
			.collect()
	}

	/// Verbs the object supports.
	///
	/// # Errors
	/// [`DispatchError::NotBound`] when unbound, [`DispatchError::Foreign`] when
	/// the object cannot enumerate verbs.
	pub fn verbs( &self ) -> Result<Vec<Verb>, DispatchError> {
		let object = self.object().ok_or( DispatchError::NotBound )?;
		object.verbs()
			.ok_or( CallFault::NotSupported )
			.and_then(| source | source.verbs() )
			.map_err(| fault | DispatchError::from_fault( "verbs", fault, 0 ))
	}

	/// Performs the verb called `name`.
	///
	/// # Errors
	/// [`DispatchError::MemberNotFound`] for unknown verbs, otherwise as
	/// [`verbs`]( Self::verbs ).
	pub fn perform_verb( &self, name: &str ) -> Result<(), DispatchError> {
		let verbs = self.verbs()?;
		let Some( verb ) = verbs.iter().find(| verb | verb.name == name ) else {
			let candidates = verbs.iter().filter(| verb | verb.name.eq_ignore_ascii_case( name )).map(| verb | verb.name.clone() ).collect_vec();
			warn!( verb = name, ?candidates, "unknown verb" );
			return Err( DispatchError::MemberNotFound { name: name.to_string(), candidates })
		};
		self.object()
			.and_then(| object | object.verbs() )
			.ok_or( DispatchError::NotBound )?
			.perform( verb.id )
			.map_err(| fault | DispatchError::from_fault( name, fault, 0 ))
	}

	/// Every signal the object fires, with untyped arguments.
	pub fn on_signal( &self, listener: impl Fn( &str, &[Value] ) + Send + Sync + 'static ) {
		self.core.notifier.on_signal( listener );
		self.listen();
	}

	/// Every change notification of a bindable property.
	pub fn on_property_changed( &self, listener: impl Fn( &str ) + Send + Sync + 'static ) {
		self.core.notifier.on_property_changed( listener );
		self.listen();
	}

	/// Foreign exceptions raised by calls through this wrapper. With a listener
	/// here, they are no longer logged.
	pub fn on_exception( &self, listener: impl Fn( &ExceptionInfo ) + Send + Sync + 'static ) {
		self.core.notifier.on_exception( listener );
	}

	/// One signal, by name or signature, with typed arguments. Arguments the
	/// listener modifies are written back to the object's out-parameters.
	pub fn connect_signal( &self, signal: &str, listener: impl Fn( &mut [Value] ) + Send + Sync + 'static ) {
		self.core.notifier.connect( signal, listener );
		self.listen();
	}

	fn listen( &self ) {
		self.core.listening.store( true, Ordering::SeqCst );
		self.subscribe();
	}

}

impl Drop for ForeignWrapper {
	fn drop( &mut self ) { self.clear(); }
}
