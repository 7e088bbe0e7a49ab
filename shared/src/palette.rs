use glam::Vec4;
use num_traits::Float;

/// Maps an escape count onto a color. Every palette is monotonic in the
/// count and paints interior points (`count >= max_iterations`) black.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Palette {
    /// Red grows linearly, green quadratically, blue with the square root.
    #[default]
    Spectral = 0,
    Grayscale = 1,
}

impl Palette {
    pub fn from_u32(value: u32) -> Self {
        match value {
            1 => Self::Grayscale,
            _ => Self::Spectral,
        }
    }

    pub fn shade(self, count: u32, max_iterations: u32) -> Vec4 {
        if count >= max_iterations {
            return Vec4::new(0.0, 0.0, 0.0, 1.0);
        }

        let t = count as f32 / max_iterations as f32;
        match self {
            Self::Spectral => Vec4::new(t, t * t, Float::sqrt(t), 1.0),
            Self::Grayscale => Vec4::new(t, t, t, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_is_black() {
        for palette in [Palette::Spectral, Palette::Grayscale] {
            assert_eq!(palette.shade(64, 64), Vec4::new(0.0, 0.0, 0.0, 1.0));
        }
    }

    #[test]
    fn brightness_grows_with_the_count() {
        for palette in [Palette::Spectral, Palette::Grayscale] {
            let mut previous = palette.shade(0, 100);
            for count in 1..100 {
                let color = palette.shade(count, 100);
                assert!(color.x >= previous.x && color.y >= previous.y && color.z >= previous.z);
                previous = color;
            }
        }
    }

    #[test]
    fn spectral_channels() {
        let color = Palette::Spectral.shade(25, 100);
        assert_eq!(color, Vec4::new(0.25, 0.0625, 0.5, 1.0));
    }

    #[test]
    fn unknown_encoding_falls_back_to_spectral() {
        assert_eq!(Palette::from_u32(Palette::Grayscale as u32), Palette::Grayscale);
        assert_eq!(Palette::from_u32(7), Palette::Spectral);
    }
}
