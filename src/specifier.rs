//! Binding specifiers: the textual forms a wrapper can be bound from.
//!
//! Forms are recognized in this order:
//!
//! 1. `{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}` creates the class of that identity.
//! 2. `[user[:password]@]server/<class>` creates the class on a remote host. Without
//!    credentials the class part must be a braced identity, so that relative
//!    paths are not mistaken for host names.
//! 3. `<class>:<license-key>` creates a licensed class.
//! 4. `<class>&` attaches to a running instance.
//! 5. `file:<path>`, or a path with a separator and an extension, loads an object
//!    from file-backed content.
//! 6. Anything else is a registered class name.
//!
//! When forms 2 to 5 fail, plain creation of the class part is attempted.

use std::path::{ Path, PathBuf };
use tracing::debug ;

use crate::foreign::{ CallFault, ForeignRef, InterfaceId, ObjectFactory, RemoteHost };



#[derive( Clone, Debug, PartialEq, Eq )]
pub enum Specifier {
	Identity( InterfaceId ),
	Remote { class: String, host: RemoteHost },
	Licensed { class: String, key: String },
	Running { class: String },
	File( PathBuf ),
	Plain( String ),
}

impl Specifier {

	pub fn parse( text: &str ) -> Self {
		let text = text.trim();
		if let Some( id ) = InterfaceId::parse( text ) { return Self::Identity( id )}
		if let Some(( class, host )) = split_remote( text ) { return Self::Remote { class: class.to_string(), host }}
		if let Some(( class, key )) = split_licensed( text ) { return Self::Licensed { class: class.to_string(), key: key.to_string() }}
		if let Some( class ) = text.strip_suffix( '&' ).map( str::trim ).filter(| class | !class.is_empty() ) {
			return Self::Running { class: class.to_string() }
		}
		if let Some( path ) = file_path( text ) { return Self::File( path )}
		Self::Plain( text.to_string() )
	}

	/// The class plain creation falls back to.
	pub fn class( &self ) -> String {
		match self {
			Self::Identity( id ) => id.to_string(),
			Self::Remote { class, .. } | Self::Licensed { class, .. } | Self::Running { class } | Self::Plain( class ) => class.clone(),
			Self::File( path ) => path.display().to_string(),
		}
	}

	/// Creates or locates the object this specifier names.
	///
	/// # Errors
	/// The factory's [`CallFault`] from the last strategy attempted.
	pub fn open( &self, factory: &dyn ObjectFactory ) -> Result<ForeignRef, CallFault> {
		let attempt = match self {
			Self::Identity( id ) => return factory.create( *id ),
			Self::Plain( class ) => return factory.create( resolve( factory, class )?),
			Self::Remote { class, host } => resolve( factory, class ).and_then(| id | factory.create_remote( id, host )),
			Self::Licensed { class, key } => resolve( factory, class ).and_then(| id | factory.create_licensed( id, key )),
			Self::Running { class } => resolve( factory, class ).and_then(| id | factory.running_instance( id )),
			Self::File( path ) => factory.from_file( path ),
		};
		attempt.or_else(| fault | {
			let class = self.class();
			debug!( specifier = ?self, %fault, %class, "falling back to plain creation" );
			factory.create( resolve( factory, &class )?)
		})
	}

}

/// Braced identities need no registry lookup.
fn resolve( factory: &dyn ObjectFactory, class: &str ) -> Result<InterfaceId, CallFault> {
	match InterfaceId::parse( class ) {
		Some( id ) => Ok( id ),
		None => factory.resolve_class( class ),
	}
}

fn split_remote( text: &str ) -> Option<( &str, RemoteHost )> {

	let ( credentials, rest ) = match text.rsplit_once( '@' ) {
		Some(( credentials, rest )) => ( Some( credentials ), rest ),
		None => ( None, text ),
	};
	let ( server, class ) = rest.split_once( '/' )?;
	if server.is_empty() || class.is_empty() || class.contains([ '/', '\\' ]) { return None }
	if credentials.is_none() && InterfaceId::parse( class ).is_none() { return None }

	let ( user, password ) = match credentials.map(| credentials | credentials.split_once( ':' ).unwrap_or(( credentials, "" ))) {
		Some(( user, password )) => ( Some( user.to_string() ), Some( password.to_string() ).filter(| password | !password.is_empty() )),
		None => ( None, None ),
	};
	Some(( class, RemoteHost { server: server.to_string(), user, password }))

}

/// Single-letter prefixes are drive letters and `file:` is a path, not classes.
fn split_licensed( text: &str ) -> Option<( &str, &str )> {
	let ( class, key ) = text.split_once( ':' )?;
	let class = class.trim();
	let is_class = class.len() > 1 && !class.eq_ignore_ascii_case( "file" ) && !class.contains([ '/', '\\' ]);
	( is_class && !key.is_empty() ).then_some(( class, key ))
}

fn file_path( text: &str ) -> Option<PathBuf> {
	if let Some( path ) = text.strip_prefix( "file:" ) { return Some( PathBuf::from( path.trim_start_matches( "//" )))}
	let path = Path::new( text );
	( text.contains([ '/', '\\' ]) && path.extension().is_some() ).then(|| path.to_path_buf() )
}

#[cfg( test )]
mod tests {
	use super::* ;

	const GUID: &str = "{8856F961-340A-11D0-A96B-00C04FD705A2}";

	#[test]
	fn identities_win_over_everything() {
		assert_eq!( Specifier::parse( GUID ), Specifier::Identity( InterfaceId::parse( GUID ).unwrap() ));
	}

	#[test]
	fn remote_hosts_carry_credentials() {
		let parsed = Specifier::parse( &format!( "admin:secret@buildhost/{}", GUID ));
		assert_eq!( parsed, Specifier::Remote {
			class: GUID.to_string(),
			host: RemoteHost { server: "buildhost".into(), user: Some( "admin".into() ), password: Some( "secret".into() )},
		});
		assert_eq!(
			Specifier::parse( "ops@buildhost/Shell.Explorer" ),
			Specifier::Remote { class: "Shell.Explorer".into(), host: RemoteHost { server: "buildhost".into(), user: Some( "ops".into() ), password: None }},
		);
	}

	#[test]
	fn relative_paths_are_not_hosts() {
		assert_eq!( Specifier::parse( "docs/report.rtf" ), Specifier::File( PathBuf::from( "docs/report.rtf" )));
		assert_eq!( Specifier::parse( "file:///tmp/sheet.xls" ), Specifier::File( PathBuf::from( "/tmp/sheet.xls" )));
		assert_eq!( Specifier::parse( "C:\\data\\chart.xls" ), Specifier::File( PathBuf::from( "C:\\data\\chart.xls" )));
	}

	#[test]
	fn licensed_running_and_plain_forms() {
		assert_eq!( Specifier::parse( "Calendar.Control:ABC-123" ), Specifier::Licensed { class: "Calendar.Control".into(), key: "ABC-123".into() });
		assert_eq!( Specifier::parse( "Excel.Application&" ), Specifier::Running { class: "Excel.Application".into() });
		assert_eq!( Specifier::parse( "  Shell.Explorer " ), Specifier::Plain( "Shell.Explorer".into() ));
	}
}
