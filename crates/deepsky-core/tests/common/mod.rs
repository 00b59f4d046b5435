#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use deepsky_core::engine::params::{
    AsinhParams, CalibrateParams, ColorCalibrationParams, ConvertParams, DenoiseParams,
    PixelMathParams, PlateSolveParams, RegisterParams, StackParameters, StarSeparationParams,
};
use deepsky_core::engine::ProcessingEngine;
use deepsky_core::error::Result;
use deepsky_core::exif::{TagReader, TAG_EXPOSURE, TAG_ISO, TAG_MODEL};

/// One recorded engine invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Open,
    Close,
    Convert {
        dir: PathBuf,
        name: String,
        params: ConvertParams,
    },
    Calibrate {
        dir: PathBuf,
        name: String,
        params: CalibrateParams,
    },
    Register {
        dir: PathBuf,
        name: String,
        params: RegisterParams,
    },
    Stack {
        dir: PathBuf,
        name: String,
        out: String,
        params: StackParameters,
    },
    Merge {
        dir: PathBuf,
        names: Vec<String>,
        out: String,
    },
    Load {
        dir: PathBuf,
        name: String,
    },
    Save {
        name: String,
    },
    SaveJpeg {
        name: String,
    },
    Autostretch,
    RemoveGreen,
    Asinh(AsinhParams),
    PlateSolve(PlateSolveParams),
    ColorCalibration(ColorCalibrationParams),
    StarSeparation(StarSeparationParams),
    Denoise(DenoiseParams),
    PixelMath {
        dir: PathBuf,
        params: PixelMathParams,
    },
}

/// Engine double: records every call and materializes output files so the
/// session's filesystem probing sees what a real engine would leave behind.
/// Failures are scripted per operation (optionally narrowed to sequence
/// names containing a substring).
pub struct MockEngine {
    pub calls: Vec<Call>,
    pub extension: String,
    failures: Vec<(String, String)>,
    loaded: Option<(PathBuf, String)>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            extension: "fit".into(),
            failures: Vec::new(),
            loaded: None,
        }
    }

    /// Make `op` report failure for sequence names containing `name_part`
    /// (empty matches everything).
    pub fn fail_on(mut self, op: &str, name_part: &str) -> Self {
        self.failures.push((op.to_string(), name_part.to_string()));
        self
    }

    fn succeeds(&self, op: &str, name: &str) -> bool {
        !self
            .failures
            .iter()
            .any(|(f_op, part)| f_op == op && (part.is_empty() || name.contains(part.as_str())))
    }

    pub fn convert_calls(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Convert { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn stack_calls(&self) -> Vec<(&str, &str, &StackParameters)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Stack {
                    name, out, params, ..
                } => Some((name.as_str(), out.as_str(), params)),
                _ => None,
            })
            .collect()
    }

    pub fn calibrate_calls(&self) -> Vec<(&str, &CalibrateParams)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Calibrate { name, params, .. } => Some((name.as_str(), params)),
                _ => None,
            })
            .collect()
    }

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        std::fs::write(path, b"").expect("write mock output");
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingEngine for MockEngine {
    fn open(&mut self) -> Result<()> {
        self.calls.push(Call::Open);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.calls.push(Call::Close);
        Ok(())
    }

    fn convert(&mut self, dir: &Path, name: &str, params: &ConvertParams) -> Result<bool> {
        self.calls.push(Call::Convert {
            dir: dir.to_path_buf(),
            name: name.to_string(),
            params: params.clone(),
        });
        Ok(self.succeeds("convert", name))
    }

    fn calibrate(&mut self, dir: &Path, name: &str, params: &CalibrateParams) -> Result<bool> {
        self.calls.push(Call::Calibrate {
            dir: dir.to_path_buf(),
            name: name.to_string(),
            params: params.clone(),
        });
        Ok(self.succeeds("calibrate", name))
    }

    fn register(&mut self, dir: &Path, name: &str, params: &RegisterParams) -> Result<bool> {
        self.calls.push(Call::Register {
            dir: dir.to_path_buf(),
            name: name.to_string(),
            params: params.clone(),
        });
        Ok(self.succeeds("register", name))
    }

    fn stack(
        &mut self,
        dir: &Path,
        name: &str,
        out: &str,
        params: &StackParameters,
    ) -> Result<bool> {
        self.calls.push(Call::Stack {
            dir: dir.to_path_buf(),
            name: name.to_string(),
            out: out.to_string(),
            params: params.clone(),
        });
        if !self.succeeds("stack", name) {
            return Ok(false);
        }
        Self::touch(&dir.join(format!("{out}.{}", self.extension)));
        Ok(true)
    }

    fn merge(&mut self, dir: &Path, names: &[String], out: &str) -> Result<bool> {
        self.calls.push(Call::Merge {
            dir: dir.to_path_buf(),
            names: names.to_vec(),
            out: out.to_string(),
        });
        Ok(self.succeeds("merge", out))
    }

    fn load(&mut self, dir: &Path, name: &str) -> Result<bool> {
        self.calls.push(Call::Load {
            dir: dir.to_path_buf(),
            name: name.to_string(),
        });
        self.loaded = Some((dir.to_path_buf(), name.to_string()));
        Ok(self.succeeds("load", name))
    }

    fn save(&mut self, name: &str) -> Result<bool> {
        self.calls.push(Call::Save {
            name: name.to_string(),
        });
        if !self.succeeds("save", name) {
            return Ok(false);
        }
        let path = PathBuf::from(format!("{name}.{}", self.extension));
        let path = if path.is_absolute() {
            path
        } else {
            match &self.loaded {
                Some((dir, _)) => dir.join(path),
                None => return Ok(true),
            }
        };
        Self::touch(&path);
        Ok(true)
    }

    fn save_jpeg(&mut self, name: &str) -> Result<bool> {
        self.calls.push(Call::SaveJpeg {
            name: name.to_string(),
        });
        Ok(self.succeeds("savejpg", name))
    }

    fn autostretch(&mut self) -> Result<bool> {
        self.calls.push(Call::Autostretch);
        Ok(self.succeeds("autostretch", ""))
    }

    fn remove_green(&mut self) -> Result<bool> {
        self.calls.push(Call::RemoveGreen);
        Ok(self.succeeds("rmgreen", ""))
    }

    fn asinh_stretch(&mut self, params: &AsinhParams) -> Result<bool> {
        self.calls.push(Call::Asinh(params.clone()));
        Ok(self.succeeds("asinh", ""))
    }

    fn platesolve(&mut self, params: &PlateSolveParams) -> Result<bool> {
        self.calls.push(Call::PlateSolve(params.clone()));
        Ok(self.succeeds("platesolve", ""))
    }

    fn photometric_color_calibration(&mut self, params: &ColorCalibrationParams) -> Result<bool> {
        self.calls.push(Call::ColorCalibration(params.clone()));
        Ok(self.succeeds("pcc", ""))
    }

    fn star_separation(&mut self, params: &StarSeparationParams) -> Result<bool> {
        self.calls.push(Call::StarSeparation(params.clone()));
        if !self.succeeds("starnet", "") {
            return Ok(false);
        }
        // Starless/starmask siblings of the loaded image.
        if let Some((dir, name)) = &self.loaded {
            let stem = Path::new(name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            Self::touch(&dir.join(format!("starless_{stem}.{}", self.extension)));
            Self::touch(&dir.join(format!("starmask_{stem}.{}", self.extension)));
        }
        Ok(true)
    }

    fn denoise(&mut self, params: &DenoiseParams) -> Result<bool> {
        self.calls.push(Call::Denoise(params.clone()));
        Ok(self.succeeds("denoise", ""))
    }

    fn pixel_math(&mut self, dir: &Path, params: &PixelMathParams) -> Result<bool> {
        self.calls.push(Call::PixelMath {
            dir: dir.to_path_buf(),
            params: params.clone(),
        });
        Ok(self.succeeds("pm", ""))
    }
}

/// Tag reader returning the same tag set for every file.
pub struct FakeTagReader {
    tags: BTreeMap<String, String>,
}

impl FakeTagReader {
    pub fn camera(model: &str, iso: u32, exposure_s: Option<f64>) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert(TAG_MODEL.to_string(), model.to_string());
        tags.insert(TAG_ISO.to_string(), iso.to_string());
        if let Some(exposure) = exposure_s {
            tags.insert(TAG_EXPOSURE.to_string(), exposure.to_string());
        }
        Self { tags }
    }

    pub fn empty() -> Self {
        Self {
            tags: BTreeMap::new(),
        }
    }
}

impl TagReader for FakeTagReader {
    fn get_tags(&self, _file: &Path, tags: &[&str]) -> Result<BTreeMap<String, String>> {
        Ok(self
            .tags
            .iter()
            .filter(|(k, _)| tags.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

/// Tag reader with per-directory tag sets, for checks that compare frame
/// types shot with different settings.
pub struct DirTagReader {
    by_dir: BTreeMap<PathBuf, BTreeMap<String, String>>,
}

impl DirTagReader {
    pub fn new() -> Self {
        Self {
            by_dir: BTreeMap::new(),
        }
    }

    pub fn camera(mut self, dir: &Path, model: &str, iso: u32, exposure_s: Option<f64>) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert(TAG_MODEL.to_string(), model.to_string());
        tags.insert(TAG_ISO.to_string(), iso.to_string());
        if let Some(exposure) = exposure_s {
            tags.insert(TAG_EXPOSURE.to_string(), exposure.to_string());
        }
        self.by_dir.insert(dir.to_path_buf(), tags);
        self
    }
}

impl Default for DirTagReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TagReader for DirTagReader {
    fn get_tags(&self, file: &Path, tags: &[&str]) -> Result<BTreeMap<String, String>> {
        let dir = file.parent().unwrap_or(Path::new(""));
        Ok(self
            .by_dir
            .get(dir)
            .map(|all| {
                all.iter()
                    .filter(|(k, _)| tags.contains(&k.as_str()))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Create a capture directory with `count` dummy raw files.
pub fn fill_captures(dir: &Path, count: usize) {
    std::fs::create_dir_all(dir).expect("create capture dir");
    for i in 0..count {
        std::fs::write(dir.join(format!("IMG_{i:04}.cr3")), b"raw").expect("write capture");
    }
}
