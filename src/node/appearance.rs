//! Appearance node: material reflectance properties.

use tracing::warn;

use crate::util::Color;

/// Material of a shape. Fractions are kept in `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Appearance {
    pub ambient: Color,
    pub diffuse: Color,
    pub emissive: Color,
    pub specular: Color,
    shininess: f32,
    transparency: f32,
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            ambient: Color::new(0.05317, 0.17879, 0.01804),
            diffuse: Color::new(0.8, 0.8, 0.8),
            emissive: Color::BLACK,
            specular: Color::BLACK,
            shininess: 0.2,
            transparency: 0.0,
        }
    }
}

impl Appearance {
    #[inline]
    pub fn shininess(&self) -> f32 {
        self.shininess
    }

    #[inline]
    pub fn transparency(&self) -> f32 {
        self.transparency
    }

    pub fn set_shininess(&mut self, value: f32) -> bool {
        set_fraction(&mut self.shininess, value, "shininess")
    }

    pub fn set_transparency(&mut self, value: f32) -> bool {
        set_fraction(&mut self.transparency, value, "transparency")
    }

    pub fn set_ambient(&mut self, c: Color) {
        self.ambient = c;
    }

    pub fn set_diffuse(&mut self, c: Color) {
        self.diffuse = c;
    }

    pub fn set_emissive(&mut self, c: Color) {
        self.emissive = c;
    }

    pub fn set_specular(&mut self, c: Color) {
        self.specular = c;
    }

    /// VRML `ambientIntensity`: ambient luminance relative to diffuse, capped at 1.
    pub fn ambient_intensity(&self) -> f32 {
        let den = self.diffuse.luminance().max(0.004);
        (self.ambient.luminance() / den).min(1.0)
    }
}

fn set_fraction(slot: &mut f32, value: f32, what: &str) -> bool {
    if (0.0..=1.0).contains(&value) {
        *slot = value;
        true
    } else {
        warn!("{what} {value} outside [0, 1]; ignored");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_setters() {
        let mut a = Appearance::default();
        assert!(a.set_shininess(0.5));
        assert!(!a.set_shininess(1.5));
        assert_eq!(a.shininess(), 0.5);
        assert!(!a.set_transparency(-0.1));
        assert_eq!(a.transparency(), 0.0);
    }

    #[test]
    fn test_ambient_intensity_capped() {
        let mut a = Appearance::default();
        a.set_ambient(Color::new(1.0, 1.0, 1.0));
        a.set_diffuse(Color::new(0.1, 0.1, 0.1));
        assert_eq!(a.ambient_intensity(), 1.0);
    }
}
