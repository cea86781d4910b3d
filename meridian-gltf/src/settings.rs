use crate::error::LoadError;

/// Options for a single model import.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportSettings {
    /// Global scale of the model. Must be finite and greater than zero.
    pub scale: f32,
    /// Scene to instantiate. `None` picks the asset's default scene, or the
    /// first scene when the asset declares no default.
    pub scene: Option<usize>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            scale: 1.0,
            scene: None,
        }
    }
}

impl ImportSettings {
    pub fn with_scale(scale: f32) -> Self {
        Self {
            scale,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(LoadError::InvalidScale(self.scale));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = ImportSettings::default();
        assert_eq!(settings.scale, 1.0);
        assert!(settings.scene.is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_scale() {
        for scale in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let err = ImportSettings::with_scale(scale).validate().unwrap_err();
            assert!(matches!(err, LoadError::InvalidScale(_)));
        }
    }
}
