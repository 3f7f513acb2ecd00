//! Process-wide reflection cache.
//!
//! The cache is an explicit handle rather than a global: the builder and every
//! wrapper receive a clone of it. Descriptors are keyed by interface identity plus
//! the build-options fingerprint; enum tables are keyed by catalog library.
//!
//! Teardown is refcounted for the cache as a whole. Every bound wrapper holds a
//! [`CacheLease`]; when the last lease is dropped, every entry is discarded.
//! The lock is never held while a descriptor is being built, since building calls
//! into foreign objects which may re-enter the cache.

use std::collections::HashMap ;
use std::sync::Arc ;
use parking_lot::Mutex ;
use tracing::debug ;

use crate::descriptor::{ EnumDef, ReflectionDescriptor };
use crate::foreign::InterfaceId ;



/// Cache key: interface identity plus build-options fingerprint.
#[derive( Copy, Clone, Debug, Eq, Hash, PartialEq )]
pub struct CacheKey {
	pub interface: InterfaceId,
	pub fingerprint: u8,
}

#[derive( Default )]
struct CacheState {
	descriptors: HashMap<CacheKey, Arc<ReflectionDescriptor>>,
	enums: HashMap<InterfaceId, Arc<[EnumDef]>>,
	holders: usize,
}

/// Shared handle to a reflection cache. Cloning shares the same store.
#[derive( Clone, Default )]
pub struct ReflectionCache {
	state: Arc<Mutex<CacheState>>,
}

impl std::fmt::Debug for ReflectionCache {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		let state = self.state.lock();
		f.debug_struct( "ReflectionCache" )
			.field( "descriptors", &state.descriptors.len() )
			.field( "enums", &state.enums.len() )
			.field( "holders", &state.holders )
			.finish()
	}
}

impl ReflectionCache {

	pub fn new() -> Self { Self::default() }

	/// Registers a holder. The cache is emptied when the last lease drops.
	pub fn acquire( &self ) -> CacheLease {
		self.state.lock().holders += 1 ;
		CacheLease { cache: self.clone() }
	}

	pub fn get( &self, key: &CacheKey ) -> Option<Arc<ReflectionDescriptor>> {
		let hit = self.state.lock().descriptors.get( key ).cloned();
		debug!( interface = %key.interface, fingerprint = key.fingerprint, hit = hit.is_some(), "reflection cache lookup" );
		hit
	}

	/// Stores a freshly built descriptor. If another build for the same key won
	/// the race, the stored descriptor is returned instead so that all wrappers
	/// share one instance.
	pub fn insert( &self, key: CacheKey, descriptor: Arc<ReflectionDescriptor> ) -> Arc<ReflectionDescriptor> {
		Arc::clone( self.state.lock().descriptors.entry( key ).or_insert( descriptor ))
	}

	pub fn enums( &self, library: InterfaceId ) -> Option<Arc<[EnumDef]>> {
		self.state.lock().enums.get( &library ).cloned()
	}

	pub fn insert_enums( &self, library: InterfaceId, enums: Arc<[EnumDef]> ) -> Arc<[EnumDef]> {
		Arc::clone( self.state.lock().enums.entry( library ).or_insert( enums ))
	}

	/// Number of cached descriptors.
	pub fn len( &self ) -> usize { self.state.lock().descriptors.len() }

	pub fn is_empty( &self ) -> bool { self.len() == 0 }

	/// Number of live leases.
	pub fn holders( &self ) -> usize { self.state.lock().holders }

}

/// Keeps the cache's contents alive; see [`ReflectionCache::acquire`].
#[derive( Debug )]
pub struct CacheLease {
	cache: ReflectionCache,
}

impl CacheLease {
	pub fn cache( &self ) -> &ReflectionCache { &self.cache }
}

impl Drop for CacheLease {
	fn drop( &mut self ) {
		let mut state = self.cache.state.lock();
		state.holders = state.holders.saturating_sub( 1 );
		if state.holders == 0 {
			state.descriptors.clear();
			state.enums.clear();
			debug!( "last holder released, reflection cache emptied" );
		}
	}
}

#[cfg( test )]
mod tests {
	use super::* ;
	use crate::descriptor::DescriptorBuilder ;

	fn key( fingerprint: u8 ) -> CacheKey { CacheKey { interface: InterfaceId::new( 7 ), fingerprint }}

	#[test]
	fn first_insert_wins() {
		let cache = ReflectionCache::new();
		let first = cache.insert( key( 0 ), Arc::new( DescriptorBuilder::new( "A" ).finish() ));
		let second = cache.insert( key( 0 ), Arc::new( DescriptorBuilder::new( "B" ).finish() ));
		assert!( Arc::ptr_eq( &first, &second ));
		assert_eq!( second.class_name(), "A" );
		assert!( cache.get( &key( 1 )).is_none() );
	}

	#[test]
	fn last_lease_empties_the_cache() {
		let cache = ReflectionCache::new();
		let outer = cache.acquire();
		let inner = cache.acquire();
		cache.insert( key( 0 ), Arc::new( DescriptorBuilder::new( "A" ).finish() ));
		cache.insert_enums( InterfaceId::new( 9 ), Arc::from( Vec::new() ));
		drop( inner );
		assert_eq!( cache.len(), 1 );
		drop( outer );
		assert!( cache.is_empty() );
		assert!( cache.enums( InterfaceId::new( 9 )).is_none() );
		assert_eq!( cache.holders(), 0 );
	}
}
