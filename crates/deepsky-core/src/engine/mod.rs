pub mod params;
pub mod siril;

use std::path::Path;

use crate::error::Result;

use params::{
    AsinhParams, CalibrateParams, ColorCalibrationParams, ConvertParams, DenoiseParams,
    PixelMathParams, PlateSolveParams, RegisterParams, StackParameters, StarSeparationParams,
};

/// Contract of the external image-processing engine.
///
/// Every sequence operation names the directory it runs in explicitly —
/// there is no shared "current directory" state in the contract. Operations
/// return `Ok(true)` on success, `Ok(false)` when the tool reports failure,
/// and `Err` only for transport-level problems (process died, pipe broke).
///
/// The engine session is a single long-lived resource: `open` once, use for
/// the whole run, `close` once on every exit path. Calls block until the
/// engine finishes; there is no cancellation.
pub trait ProcessingEngine {
    fn open(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;

    /// Convert the raw captures named `name` in `dir` to the engine's
    /// working format, writing the sequence into `params.output_dir`.
    fn convert(&mut self, dir: &Path, name: &str, params: &ConvertParams) -> Result<bool>;

    /// Calibrate the sequence `name` in `dir` against the master frames in
    /// `params`, producing a prefixed output sequence.
    fn calibrate(&mut self, dir: &Path, name: &str, params: &CalibrateParams) -> Result<bool>;

    /// Register (align) the sequence `name` in `dir`.
    fn register(&mut self, dir: &Path, name: &str, params: &RegisterParams) -> Result<bool>;

    /// Stack the sequence `name` in `dir` into `out`.
    fn stack(&mut self, dir: &Path, name: &str, out: &str, params: &StackParameters)
        -> Result<bool>;

    /// Merge several sequences in `dir` into one sequence `out`.
    fn merge(&mut self, dir: &Path, names: &[String], out: &str) -> Result<bool>;

    /// Load an image; subsequent image operations apply to it.
    fn load(&mut self, dir: &Path, name: &str) -> Result<bool>;

    /// Save the loaded image under `name` (relative to the load directory,
    /// or absolute).
    fn save(&mut self, name: &str) -> Result<bool>;

    /// Export the loaded image as a JPEG preview.
    fn save_jpeg(&mut self, name: &str) -> Result<bool>;

    fn autostretch(&mut self) -> Result<bool>;

    /// Remove the green-channel noise bias typical of CFA sensors.
    fn remove_green(&mut self) -> Result<bool>;

    fn asinh_stretch(&mut self, params: &AsinhParams) -> Result<bool>;

    fn platesolve(&mut self, params: &PlateSolveParams) -> Result<bool>;

    fn photometric_color_calibration(&mut self, params: &ColorCalibrationParams) -> Result<bool>;

    /// Split the loaded image into starless and starmask siblings.
    fn star_separation(&mut self, params: &StarSeparationParams) -> Result<bool>;

    fn denoise(&mut self, params: &DenoiseParams) -> Result<bool>;

    /// Evaluate a pixel-math expression over images in `dir`; the result
    /// becomes the loaded image.
    fn pixel_math(&mut self, dir: &Path, params: &PixelMathParams) -> Result<bool>;
}
