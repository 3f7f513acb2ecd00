use crate::foreign::ForeignObject ;
use crate::value::{ Font, Picture };



/// Host-side object carrying a font across the boundary.
///
/// Outbound font values are wrapped in one of these so that the foreign side
/// receives an object reference exposing the font capability.
#[derive( Debug )]
pub struct HostFont( pub Font );

impl ForeignObject for HostFont {
	fn font( &self ) -> Option<Font> { Some( self.0.clone() )}
}

/// Host-side object carrying a picture across the boundary.
#[derive( Debug )]
pub struct HostPicture( pub Picture );

impl ForeignObject for HostPicture {
	fn picture( &self ) -> Option<Picture> { Some( self.0.clone() )}
}
