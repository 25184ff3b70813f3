//! Pixel data containers: planar channel buffers produced by the decompressors,
//! interleaved output surfaces produced by the color processors,
//! and the tiled container used for progressive decoding.

pub mod surface;
pub mod tiled;
pub mod sink;

use smallvec::SmallVec;
use crate::error::*;
use crate::math::Vec2;
use crate::meta::{ColorMode, FileHeader};


/// What a channel of the composite image means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaneRole {
    Red, Green, Blue, Alpha,
    Cyan, Magenta, Yellow, Key,
    Gray, Index,
    Lightness, LabA, LabB,
    Spot, Mask,
}

/// The roles of the planes a processor needs, in file order.
pub type PlaneRoles = SmallVec<[PlaneRole; 5]>;

/// The planes of the composite image that are decoded for this document.
/// Channels beyond these (extra spot channels) are never decoded.
pub fn composite_roles(header: &FileHeader) -> Result<PlaneRoles> {
    use PlaneRole::*;

    let count = header.channel_count;
    let with_alpha = |base: &[PlaneRole]| -> PlaneRoles {
        let mut roles = PlaneRoles::from_slice(base);
        if count > base.len() { roles.push(Alpha); }
        roles
    };

    let roles = match header.color_mode {
        ColorMode::Rgb => with_alpha(&[Red, Green, Blue]),
        ColorMode::Cmyk => with_alpha(&[Cyan, Magenta, Yellow, Key]),
        ColorMode::Grayscale | ColorMode::Duotone => with_alpha(&[Gray]),
        ColorMode::Indexed => with_alpha(&[Index]),
        ColorMode::Lab => with_alpha(&[Lightness, LabA, LabB]),

        ColorMode::Multichannel => {
            let mut roles = PlaneRoles::new();
            roles.push(Gray);
            roles.extend(std::iter::repeat(Spot).take(count.saturating_sub(1)));
            roles
        },

        ColorMode::Bitmap => return Err(Error::unsupported("bitmap color mode")),
    };

    if roles.len() > count {
        return Err(Error::invalid(format!(
            "{} color mode needs {} channels, but the document has {}",
            header.color_mode, roles.len(), count
        )));
    }

    Ok(roles)
}


/// One channel of decoded samples, one byte per sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {

    /// What the samples mean.
    pub role: PlaneRole,

    /// Number of bytes between the starts of two rows. At least the width.
    pub bytes_per_row: usize,

    /// The samples, row by row.
    pub data: Vec<u8>,
}

impl Plane {

    /// A plane filled with zeroes.
    pub fn new(role: PlaneRole, size: Vec2<usize>) -> Self {
        Plane { role, bytes_per_row: size.width(), data: vec![0; size.area()] }
    }

    /// The samples of one row. The slice may be longer than the width.
    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.bytes_per_row;
        &self.data[start .. start + self.bytes_per_row]
    }

    /// The samples of one row, for writing.
    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let start = y * self.bytes_per_row;
        &mut self.data[start .. start + self.bytes_per_row]
    }
}


/// All decoded channels of an image region, each in its own buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaneImage {

    /// Width and height in pixels.
    pub size: Vec2<usize>,

    /// Bits per sample. Only 8 is produced.
    pub depth: u16,

    /// The channels, in the order of their roles.
    pub planes: SmallVec<[Plane; 5]>,
}

impl PlaneImage {

    /// Allocate zeroed planes for the specified roles.
    pub fn new(size: Vec2<usize>, roles: &[PlaneRole]) -> Self {
        PlaneImage {
            size, depth: 8,
            planes: roles.iter().map(|&role| Plane::new(role, size)).collect(),
        }
    }

    /// The first plane with the specified role.
    pub fn plane(&self, role: PlaneRole) -> Option<&Plane> {
        self.planes.iter().find(|plane| plane.role == role)
    }

    /// The first plane with the specified role, or an error naming the missing role.
    pub fn require(&self, role: PlaneRole) -> Result<&Plane> {
        self.plane(role).ok_or_else(|| Error::invalid(format!("missing {:?} channel", role)))
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::meta::Version;

    fn header(color_mode: ColorMode, channel_count: usize) -> FileHeader {
        FileHeader { version: Version::Standard, channel_count, size: Vec2(1, 1), depth: 8, color_mode }
    }

    #[test]
    fn roles_per_color_mode(){
        use PlaneRole::*;

        assert_eq!(composite_roles(&header(ColorMode::Rgb, 3)).unwrap().as_slice(), &[Red, Green, Blue]);
        assert_eq!(composite_roles(&header(ColorMode::Rgb, 5)).unwrap().as_slice(), &[Red, Green, Blue, Alpha]);
        assert_eq!(composite_roles(&header(ColorMode::Cmyk, 4)).unwrap().as_slice(), &[Cyan, Magenta, Yellow, Key]);
        assert_eq!(composite_roles(&header(ColorMode::Indexed, 1)).unwrap().as_slice(), &[Index]);
        assert_eq!(composite_roles(&header(ColorMode::Indexed, 2)).unwrap().as_slice(), &[Index, Alpha]);
        assert_eq!(composite_roles(&header(ColorMode::Multichannel, 3)).unwrap().as_slice(), &[Gray, Spot, Spot]);
    }

    #[test]
    fn too_few_channels(){
        assert!(matches!(composite_roles(&header(ColorMode::Rgb, 2)), Err(Error::Invalid(_))));
        assert!(matches!(composite_roles(&header(ColorMode::Bitmap, 1)), Err(Error::NotSupported(_))));
    }
}
