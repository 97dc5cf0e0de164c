use crate::error::RenderError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Highest supersampling factor the kernel accepts.
pub const MAX_MSAA: u32 = 16;

/// User-facing ray-march configuration.
///
/// ```yaml
/// kernel_name: main
/// msaa: 4
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RayMarchSettings {
    /// Compute entry point to dispatch.
    pub kernel_name: String,
    /// Samples per pixel, 1..=16.
    pub msaa: u32,
}

impl Default for RayMarchSettings {
    fn default() -> Self {
        Self {
            kernel_name: "main".to_string(),
            msaa: 1,
        }
    }
}

impl RayMarchSettings {
    pub fn from_yaml_str(source: &str) -> Result<Self, RenderError> {
        let settings: Self = serde_yaml::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let settings = Self::from_yaml_str(&source)?;
        tracing::info!(path = %path.display(), kernel = %settings.kernel_name, msaa = settings.msaa, "loaded ray-march settings");
        Ok(settings)
    }

    pub fn to_yaml_string(&self) -> Result<String, RenderError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        if self.kernel_name.trim().is_empty() {
            return Err(RenderError::InvalidSettings("kernel_name is empty".into()));
        }
        if !(1..=MAX_MSAA).contains(&self.msaa) {
            return Err(RenderError::InvalidSettings(format!(
                "msaa must be in 1..={MAX_MSAA}, got {}",
                self.msaa
            )));
        }
        Ok(())
    }

    /// Samples per pixel for a camera. Preview cameras always get 1.
    pub fn effective_msaa(&self, is_preview: bool) -> u32 {
        if is_preview {
            1
        } else {
            self.msaa.clamp(1, MAX_MSAA)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = RayMarchSettings::default();
        assert_eq!(s.kernel_name, "main");
        assert_eq!(s.msaa, 1);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let s = RayMarchSettings::from_yaml_str("msaa: 4\n").unwrap();
        assert_eq!(s.msaa, 4);
        assert_eq!(s.kernel_name, "main");
    }

    #[test]
    fn out_of_range_msaa_rejected() {
        assert!(RayMarchSettings::from_yaml_str("msaa: 0").is_err());
        assert!(RayMarchSettings::from_yaml_str("msaa: 17").is_err());
        assert!(RayMarchSettings::from_yaml_str("msaa: 16").is_ok());
    }

    #[test]
    fn preview_forces_single_sample() {
        let s = RayMarchSettings {
            msaa: 8,
            ..Default::default()
        };
        assert_eq!(s.effective_msaa(true), 1);
        assert_eq!(s.effective_msaa(false), 8);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raymarch.yaml");
        std::fs::write(&path, "kernel_name: march\nmsaa: 2\n").unwrap();
        let s = RayMarchSettings::load(&path).unwrap();
        assert_eq!(s.kernel_name, "march");
        assert_eq!(s.msaa, 2);
    }

    #[test]
    fn yaml_round_trip() {
        let s = RayMarchSettings {
            kernel_name: "alt".into(),
            msaa: 3,
        };
        let text = s.to_yaml_string().unwrap();
        assert_eq!(RayMarchSettings::from_yaml_str(&text).unwrap(), s);
    }
}
