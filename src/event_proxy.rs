//! Host-implemented callback objects that turn foreign notifications into host
//! signals.
//!
//! One [`EventProxy`] exists per subscribed event-source interface, plus one for
//! the generic property-change interface when the object supports it. A proxy
//! refers back to its owning wrapper weakly; notifications arriving after the
//! wrapper is gone are accepted and dropped.

use std::collections::HashMap ;
use std::sync::{ Arc, Weak };
use parking_lot::Mutex ;
use tracing::debug ;

use crate::catalog::TypeInfo ;
use crate::codec::{ from_wire, write_back };
use crate::descriptor::{ Member, ReflectionDescriptor, Signal };
use crate::foreign::{
	CallFault, ConnectionPoints, Cookie, EventSink, InterfaceId, MemberId,
	PropertyNotifySink, Subscriber, IID_PROPERTY_NOTIFY_SINK,
};
use crate::signals::Notifier ;
use crate::value::Value ;
use crate::wire::WireValue ;



/// What a proxy needs from the wrapper that owns it.
pub trait EventHost: Send + Sync {
	fn notifier( &self ) -> &Notifier ;

	/// Host-side writable flag of a property, consulted on edit requests.
	fn is_writable( &self, property: &str ) -> bool ;

	/// Reads a property's current value. `None` when the read fails.
	fn current_value( &self, property: &str ) -> Option<Value> ;
}

pub struct EventProxy {
	source: InterfaceId,
	descriptor: Arc<ReflectionDescriptor>,
	host: Weak<dyn EventHost>,
	catalog: Option<Arc<dyn TypeInfo>>,
	discovered: Mutex<HashMap<MemberId, String>>,
	connection: Mutex<Option<( Arc<dyn ConnectionPoints>, Cookie )>>,
}

impl std::fmt::Debug for EventProxy {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "EventProxy" )
			.field( "source", &self.source )
			.field( "class", &self.descriptor.class_name() )
			.field( "advised", &self.is_advised() )
			.finish_non_exhaustive()
	}
}

impl EventProxy {

	pub fn new( source: InterfaceId, descriptor: Arc<ReflectionDescriptor>, host: Weak<dyn EventHost> ) -> Self {
		Self {
			source,
			descriptor,
			host,
			catalog: None,
			discovered: Mutex::new( HashMap::new() ),
			connection: Mutex::new( None ),
		}
	}

	/// Catalog used to name property-change members missing from the descriptor.
	pub fn with_catalog( mut self, catalog: Option<Arc<dyn TypeInfo>> ) -> Self {
		self.catalog = catalog ;
		self
	}

	#[inline] pub fn source( &self ) -> InterfaceId { self.source }

	pub fn is_advised( &self ) -> bool { self.connection.lock().is_some() }

	/// Registers this proxy with `points` and records the returned cookie.
	///
	/// # Errors
	/// The subscription mechanism's [`CallFault`]; nothing is recorded then.
	pub fn advise( self: &Arc<Self>, points: Arc<dyn ConnectionPoints> ) -> Result<(), CallFault> {
		let subscriber = match self.source == IID_PROPERTY_NOTIFY_SINK {
			true => Subscriber::PropertyNotify( Arc::clone( self ) as Arc<dyn PropertyNotifySink> ),
			false => Subscriber::Events( Arc::clone( self ) as Arc<dyn EventSink> ),
		};
		let cookie = points.advise( self.source, subscriber )?;
		debug!( source = %self.source, cookie = cookie.0, "advised event proxy" );
		*self.connection.lock() = Some(( points, cookie ));
		Ok(())
	}

	/// Cancels the subscription. Calling it again, or on a proxy that was never
	/// advised, does nothing.
	pub fn unadvise( &self ) {
		let Some(( points, cookie )) = self.connection.lock().take() else { return };
		match points.unadvise( self.source, cookie ) {
			Ok(()) => debug!( source = %self.source, cookie = cookie.0, "unadvised event proxy" ),
			Err( fault ) => debug!( source = %self.source, cookie = cookie.0, %fault, "unadvise rejected" ),
		}
	}

	fn signal( &self, member: MemberId ) -> Option<&Signal> {
		let index = *self.descriptor.event_sources().get( &self.source )?.get( &member )?;
		match self.descriptor.member( index )? {
			Member::Signal( signal ) => Some( signal ),
			_ => None,
		}
	}

	/// Property name of a change-notification member: the descriptor's table
	/// first, then names learned earlier, then the catalog.
	fn property_name( &self, member: MemberId ) -> Option<String> {
		if let Some( name ) = self.descriptor.property_notify().get( &member ) { return Some( name.clone() )}
		if let Some( name ) = self.discovered.lock().get( &member ) { return Some( name.clone() )}
		let name = self.catalog.as_ref()?.member_name( member )?;
		debug!( member, property = %name, "learned property from catalog" );
		self.discovered.lock().insert( member, name.clone() );
		Some( name )
	}

}

impl EventSink for EventProxy {

	fn invoke( &self, member: MemberId, args: &mut [WireValue] ) -> Result<(), CallFault> {

		let signal = self.signal( member ).ok_or( CallFault::MemberNotFound )?;
		let Some( host ) = self.host.upgrade() else { return Ok(()) };
		let notifier = host.notifier();

		let generic = notifier.has_signal_listeners();
		let signature = signal.signature();
		let typed = notifier.has_typed_listeners( &signal.name, &signature );
		if !generic && !typed { return Ok(()) }

		let count = args.len();
		let declared = | index: usize | count.checked_sub( index + 1 ).and_then(| wire | args.get( wire ));

		if generic {
			let values = ( 0..count ).filter_map( declared ).map(| wire | from_wire( wire, None )).collect::<Vec<_>>();
			notifier.emit_signal( &signal.name, &values );
		}

		if typed {
			let mut values = ( 0..count )
				.filter_map(| index | declared( index ).map(| wire | from_wire( wire, signal.params.get( index ).map(| param | &param.tag ))))
				.collect::<Vec<_>>();
			notifier.emit_typed( &signal.name, &signature, &mut values );
			for ( index, value ) in values.iter().enumerate() {
				let Some( param ) = signal.params.get( index ) else { continue };
				if let ( true, Some( slot )) = ( param.is_out(), declared( index )) {
					write_back( slot, value, Some( &param.tag ));
				}
			}
		}

		Ok(())

	}

}

impl PropertyNotifySink for EventProxy {

	fn on_changed( &self, member: MemberId ) -> Result<(), CallFault> {

		let Some( host ) = self.host.upgrade() else { return Ok(()) };
		let Some( property ) = self.property_name( member ) else {
			debug!( member, "change notification for unknown property" );
			return Ok(())
		};

		let notifier = host.notifier();
		let signal = format!( "{}Changed", property );
		let signature = self.descriptor.signals()
			.find(|( _, changed )| changed.name == signal )
			.map_or_else(|| signal.clone(), |( _, changed )| changed.signature() );
		if notifier.has_typed_listeners( &signal, &signature ) {
			if let Some( value ) = host.current_value( &property ) {
				notifier.emit_typed( &signal, &signature, &mut [ value ]);
			}
		}
		notifier.emit_property_changed( &property );
		Ok(())

	}

	fn on_request_edit( &self, member: MemberId ) -> bool {
		match ( self.host.upgrade(), self.property_name( member )) {
			( Some( host ), Some( property )) => host.is_writable( &property ),
			_ => true,
		}
	}

}

impl Drop for EventProxy {
	fn drop( &mut self ) {
		debug_assert!( self.connection.get_mut().is_none(), "event proxy for {} dropped while advised", self.source );
	}
}

#[cfg( test )]
mod tests {
	use super::* ;
	use crate::descriptor::{ DescriptorBuilder, Param, ParamDirection };
	use crate::type_tag::TypeTag ;
	use crate::wire::ByRef ;
	use std::sync::atomic::{ AtomicUsize, Ordering };

	const SOURCE: InterfaceId = InterfaceId::new( 0x42 );

	struct Host {
		notifier: Notifier,
		writable: bool,
	}

	impl EventHost for Host {
		fn notifier( &self ) -> &Notifier { &self.notifier }
		fn is_writable( &self, _: &str ) -> bool { self.writable }
		fn current_value( &self, _: &str ) -> Option<Value> { Some( Value::Int( 5 ))}
	}

	fn descriptor() -> Arc<ReflectionDescriptor> {
		let mut builder = DescriptorBuilder::new( "Button" );
		let index = builder.add_signal( Signal::new( "Clicked", vec![
			Param::new( "x", TypeTag::Int ),
			Param::new( "cancel", TypeTag::Bool ).with_direction( ParamDirection::InOut ),
		]));
		builder.add_event_source( SOURCE, 7, index );
		builder.register_property_notify( 3, "Count" );
		Arc::new( builder.finish() )
	}

	fn host( writable: bool ) -> Arc<Host> { Arc::new( Host { notifier: Notifier::new(), writable })}

	#[test]
	fn unknown_members_are_rejected() {
		let host = host( true );
		let proxy = EventProxy::new( SOURCE, descriptor(), Arc::downgrade( &host ) as Weak<dyn EventHost> );
		assert_eq!( proxy.invoke( 99, &mut [] ), Err( CallFault::MemberNotFound ));
	}

	#[test]
	fn typed_listeners_write_out_parameters_back() {
		let host = host( true );
		host.notifier.connect( "Clicked", | args | args[1] = Value::Bool( true ));
		let proxy = EventProxy::new( SOURCE, descriptor(), Arc::downgrade( &host ) as Weak<dyn EventHost> );
		let cancel = ByRef::new( WireValue::Bool( false ));
		let mut args = [ WireValue::ByRef( cancel.clone() ), WireValue::I4( 10 ) ];
		assert!( proxy.invoke( 7, &mut args ).is_ok() );
		assert_eq!( cancel.get(), WireValue::Bool( true ));
	}

	#[test]
	fn change_notifications_reach_both_channels() {
		let host = host( false );
		let typed = Arc::new( AtomicUsize::new( 0 ));
		let counter = Arc::clone( &typed );
		host.notifier.connect( "CountChanged", move | args | {
			assert_eq!( args, &[ Value::Int( 5 ) ]);
			counter.fetch_add( 1, Ordering::SeqCst );
		});
		let names = Arc::new( Mutex::new( Vec::new() ));
		let sink = Arc::clone( &names );
		host.notifier.on_property_changed( move | name | sink.lock().push( name.to_string() ));
		let proxy = EventProxy::new( IID_PROPERTY_NOTIFY_SINK, descriptor(), Arc::downgrade( &host ) as Weak<dyn EventHost> );
		assert!( proxy.on_changed( 3 ).is_ok() );
		assert_eq!( typed.load( Ordering::SeqCst ), 1 );
		assert_eq!( *names.lock(), vec![ "Count".to_string() ]);
		assert!( !proxy.on_request_edit( 3 ));
	}

	#[test]
	fn notifications_after_the_host_is_gone_are_dropped() {
		let host = host( true );
		let proxy = EventProxy::new( SOURCE, descriptor(), Arc::downgrade( &host ) as Weak<dyn EventHost> );
		drop( host );
		assert!( proxy.invoke( 7, &mut [ WireValue::Bool( false ), WireValue::I4( 1 ) ]).is_ok() );
		assert!( proxy.on_request_edit( 3 ));
	}
}
