//! The host's notification channels.
//!
//! Three generic channels (every signal, every property change, every foreign
//! exception) plus typed per-signal listeners. Listener lists are cloned out of
//! their lock before any listener runs, so listeners may subscribe more
//! listeners or call back into the wrapper.

use std::collections::HashMap ;
use std::sync::Arc ;
use itertools::Itertools ;
use parking_lot::RwLock ;

use crate::foreign::ExceptionInfo ;
use crate::type_tag::normalize_signature ;
use crate::value::Value ;



type SignalListener = Arc<dyn Fn( &str, &[Value] ) + Send + Sync>;
type PropertyListener = Arc<dyn Fn( &str ) + Send + Sync>;
type ExceptionListener = Arc<dyn Fn( &ExceptionInfo ) + Send + Sync>;
type TypedListener = Arc<dyn Fn( &mut [Value] ) + Send + Sync>;

#[derive( Default )]
pub struct Notifier {
	signal: RwLock<Vec<SignalListener>>,
	property_changed: RwLock<Vec<PropertyListener>>,
	exception: RwLock<Vec<ExceptionListener>>,
	typed: RwLock<HashMap<String, Vec<TypedListener>>>,
}

impl std::fmt::Debug for Notifier {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "Notifier" )
			.field( "signal", &self.signal.read().len() )
			.field( "property_changed", &self.property_changed.read().len() )
			.field( "exception", &self.exception.read().len() )
			.field( "typed", &self.typed.read().keys().collect::<Vec<_>>() )
			.finish()
	}
}

/// Typed listeners are keyed by their normalized signature, or by the bare name
/// to hear every overload of that name.
fn signal_key( signal: &str ) -> String {
	match signal.contains( '(' ) {
		true => normalize_signature( signal ),
		false => signal.trim().to_string(),
	}
}

impl Notifier {

	pub fn new() -> Self { Self::default() }

	pub fn on_signal( &self, listener: impl Fn( &str, &[Value] ) + Send + Sync + 'static ) {
		self.signal.write().push( Arc::new( listener ));
	}

	pub fn on_property_changed( &self, listener: impl Fn( &str ) + Send + Sync + 'static ) {
		self.property_changed.write().push( Arc::new( listener ));
	}

	pub fn on_exception( &self, listener: impl Fn( &ExceptionInfo ) + Send + Sync + 'static ) {
		self.exception.write().push( Arc::new( listener ));
	}

	/// Subscribes to one signal with fully typed arguments. Arguments the listener
	/// modifies are written back to out-parameters of the firing object.
	pub fn connect( &self, signal: &str, listener: impl Fn( &mut [Value] ) + Send + Sync + 'static ) {
		self.typed.write().entry( signal_key( signal )).or_default().push( Arc::new( listener ));
	}

	pub fn has_signal_listeners( &self ) -> bool { !self.signal.read().is_empty() }
	pub fn has_property_listeners( &self ) -> bool { !self.property_changed.read().is_empty() }
	pub fn has_exception_listeners( &self ) -> bool { !self.exception.read().is_empty() }

	/// Whether typed listeners wait on signal `name` or on this exact `signature`.
	pub fn has_typed_listeners( &self, name: &str, signature: &str ) -> bool {
		!self.typed_listeners( name, signature ).is_empty()
	}

	fn typed_listeners( &self, name: &str, signature: &str ) -> Vec<TypedListener> {
		let typed = self.typed.read();
		[ signal_key( name ), signal_key( signature )].iter()
			.dedup()
			.filter_map(| key | typed.get( key ))
			.flatten()
			.cloned()
			.collect()
	}

	pub fn emit_signal( &self, name: &str, args: &[Value] ) {
		let listeners = self.signal.read().clone();
		listeners.iter().for_each(| listener | listener( name, args ));
	}

	pub fn emit_property_changed( &self, name: &str ) {
		let listeners = self.property_changed.read().clone();
		listeners.iter().for_each(| listener | listener( name ));
	}

	/// Returns whether anyone received the exception.
	pub fn emit_exception( &self, info: &ExceptionInfo ) -> bool {
		let listeners = self.exception.read().clone();
		listeners.iter().for_each(| listener | listener( info ));
		!listeners.is_empty()
	}

	pub fn emit_typed( &self, name: &str, signature: &str, args: &mut [Value] ) {
		let listeners = self.typed_listeners( name, signature );
		listeners.iter().for_each(| listener | listener( args ));
	}

}

#[cfg( test )]
mod tests {
	use super::* ;
	use std::sync::atomic::{ AtomicUsize, Ordering };
	use parking_lot::Mutex ;

	#[test]
	fn typed_listeners_match_by_name_or_signature() {
		let notifier = Notifier::new();
		let hits = Arc::new( AtomicUsize::new( 0 ));
		let counter = Arc::clone( &hits );
		notifier.connect( "Clicked(int)", move | args | {
			counter.fetch_add( 1, Ordering::SeqCst );
			args[0] = Value::Int( 7 );
		});
		assert!( notifier.has_typed_listeners( "Clicked", "Clicked(int)" ));
		let mut args = vec![ Value::Int( 1 ) ];
		notifier.emit_typed( "Clicked", "Clicked( int )", &mut args );
		assert_eq!( hits.load( Ordering::SeqCst ), 1 );
		assert_eq!( args, vec![ Value::Int( 7 ) ]);

		notifier.connect( "Clicked", | _ | {});
		assert!( notifier.has_typed_listeners( "Clicked", "Clicked(int,int)" ));
	}

	#[test]
	fn overloads_keep_separate_typed_listeners() {
		let notifier = Notifier::new();
		let hits = Arc::new( Mutex::new( Vec::new() ));
		let one = Arc::clone( &hits );
		notifier.connect( "Moved(int)", move | _ | one.lock().push( 1 ));
		let two = Arc::clone( &hits );
		notifier.connect( "Moved(int,int)", move | _ | two.lock().push( 2 ));

		assert!( !notifier.has_typed_listeners( "Moved", "Moved(string)" ));
		notifier.emit_typed( "Moved", "Moved(int,int)", &mut [ Value::Int( 1 ), Value::Int( 2 ) ]);
		notifier.emit_typed( "Moved", "Moved(int)", &mut [ Value::Int( 1 ) ]);
		assert_eq!( *hits.lock(), vec![ 2, 1 ]);
	}

	#[test]
	fn listeners_may_subscribe_while_notified() {
		let notifier = Arc::new( Notifier::new() );
		let inner = Arc::clone( &notifier );
		notifier.on_property_changed( move | _ | inner.on_property_changed(| _ | {}));
		notifier.emit_property_changed( "Caption" );
		assert!( notifier.has_property_listeners() );
		assert!( !notifier.emit_exception( &ExceptionInfo::default() ));
	}
}
