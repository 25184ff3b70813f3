//! Approximate color management.
//!
//! Instead of transforming every pixel through an ICC profile,
//! a grid of pixels is sampled through the full transform,
//! and the results are condensed into one lookup table per output channel.
//! Tables are cached per profile, so documents sharing a profile share the tables.

pub mod luts;
pub mod oracle;
pub mod profile_name;
pub mod system;

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::cancel::CancelToken;
use crate::error::*;
use crate::math::Vec2;
use crate::meta::ColorMode;
use self::luts::{Calibration, LutAccumulator, RgbLuts};
use self::oracle::{ColorOracle, MoxcmsOracles, OracleFactory, ProfileSource};
use self::system::SystemProfile;


/// Number of samples along each axis, unless configured otherwise.
pub const DEFAULT_GRID_SIZE: usize = 64;

/// The name reported for embedded profiles without a readable description.
pub const EMBEDDED_PROFILE_NAME: &str = "Embedded ICC Profile";


/// How the ink polarity of CMYK samples is decided.
/// Some producers store CMYK inverted, and no header flag tells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolarityMode {

    /// Decide with the first sample, and use that for all samples.
    #[default]
    Once,

    /// Decide for every sample separately.
    PerSample,
}


/// Configures how calibration tables are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationSettings {

    /// Number of samples along each axis of the image.
    pub grid_size: usize,

    /// How CMYK ink polarity is decided.
    pub polarity: PolarityMode,

    /// Profile for CMYK documents without an embedded profile.
    pub system_cmyk_profile: SystemProfile,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        CalibrationSettings {
            grid_size: DEFAULT_GRID_SIZE,
            polarity: PolarityMode::default(),
            system_cmyk_profile: SystemProfile::default(),
        }
    }
}


/// What is to be calibrated.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationRequest<'r> {

    /// Color mode of the samples.
    pub color_mode: ColorMode,

    /// Raw bytes of the profile embedded in the document.
    pub embedded_profile: Option<&'r [u8]>,

    /// Without this flag, the identity is returned.
    pub prefer_color_management: bool,
}

/// One sampled pixel, as the color processor sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {

    /// Rgb values, which are both the table index and the transform input.
    Rgb([u8; 3]),

    /// Cmyk values as stored in the file, and the uncalibrated rgb approximation,
    /// which is the table index.
    Cmyk { stored: [u8; 4], baseline: [u8; 3] },
}

/// The calibration for one decode and the name of the profile it was built from.
#[derive(Debug, Clone)]
pub struct ResolvedCalibration {

    /// Tables, or the identity.
    pub calibration: Calibration,

    /// Human-readable name of the profile, if one was used.
    pub profile_name: Option<String>,
}

impl ResolvedCalibration {

    /// No calibration.
    pub fn identity() -> Self {
        ResolvedCalibration { calibration: Calibration::Identity, profile_name: None }
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ProfileKey {
    Embedded { fingerprint: u64, length: usize },
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    profile: ProfileKey,
    grid_size: usize,
    color_mode: ColorMode,
}

/// Calibration tables by profile identity.
/// Entries are never changed once inserted, so concurrent decodes can share it.
#[derive(Debug, Default)]
pub struct LutCache {
    entries: RwLock<HashMap<CacheKey, Arc<RgbLuts>>>,
}

impl LutCache {

    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached tables.
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Whether no tables are cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, key: &CacheKey) -> Option<Arc<RgbLuts>> {
        self.entries.read().ok()?.get(key).cloned()
    }

    /// Insert unless another decode was faster, and return the cached tables.
    fn insert(&self, key: CacheKey, luts: Arc<RgbLuts>) -> Arc<RgbLuts> {
        match self.entries.write() {
            Ok(mut entries) => entries.entry(key).or_insert(luts).clone(),
            Err(_) => luts,
        }
    }
}


/// Builds and caches calibration tables.
/// Owned by whoever sets up decoding, and shared by reference.
pub struct CalibrationProvider {
    settings: CalibrationSettings,
    cache: LutCache,
    oracles: Box<dyn OracleFactory>,
}

impl std::fmt::Debug for CalibrationProvider {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("CalibrationProvider")
            .field("settings", &self.settings)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl Default for CalibrationProvider {
    fn default() -> Self {
        Self::new(CalibrationSettings::default())
    }
}

impl CalibrationProvider {

    /// Sample profiles with `moxcms`.
    pub fn new(settings: CalibrationSettings) -> Self {
        Self::with_oracles(settings, MoxcmsOracles)
    }

    /// Sample profiles with a custom transform implementation.
    pub fn with_oracles(settings: CalibrationSettings, oracles: impl OracleFactory + 'static) -> Self {
        CalibrationProvider { settings, cache: LutCache::new(), oracles: Box::new(oracles) }
    }

    /// The active settings.
    pub fn settings(&self) -> &CalibrationSettings {
        &self.settings
    }

    /// The table cache.
    pub fn cache(&self) -> &LutCache {
        &self.cache
    }

    /// Find the profile for the request and return the tables for it,
    /// building them from samples of the image if they are not cached yet.
    ///
    /// `sample` returns the pixel at the specified position of an image of size `size`.
    /// Returns the identity if color management is not preferred, or if no profile applies.
    /// A profile that cannot be parsed is reported and ignored.
    pub fn resolve(
        &self, request: &CalibrationRequest<'_>,
        size: Vec2<usize>, sample: &dyn Fn(Vec2<usize>) -> Sample,
        cancel: &CancelToken,
    ) -> Result<ResolvedCalibration>
    {
        if !request.prefer_color_management {
            return Ok(ResolvedCalibration::identity());
        }

        if !matches!(request.color_mode, ColorMode::Rgb | ColorMode::Cmyk | ColorMode::Indexed) {
            return Ok(ResolvedCalibration::identity());
        }

        // palette colors are calibrated as rgb
        let color_mode = if request.color_mode == ColorMode::Cmyk { ColorMode::Cmyk } else { ColorMode::Rgb };
        let system_profile;

        let (profile_key, source, name) = match request.embedded_profile {
            Some(bytes) if !bytes.is_empty() => {
                let mut hasher = DefaultHasher::new();
                bytes.hash(&mut hasher);

                let name = profile_name::profile_name(bytes).unwrap_or_else(|| EMBEDDED_PROFILE_NAME.to_string());
                let key = ProfileKey::Embedded { fingerprint: hasher.finish(), length: bytes.len() };
                (key, ProfileSource::Embedded(bytes), name)
            },

            // rgb without a profile is assumed to already be in the output space
            _ if color_mode != ColorMode::Cmyk => return Ok(ResolvedCalibration::identity()),

            _ => {
                system_profile = match self.settings.system_cmyk_profile.resolve() {
                    Some(path) => path,
                    None => return Ok(ResolvedCalibration::identity()),
                };

                let name = system::display_name(&system_profile);
                (ProfileKey::File(system_profile.clone()), ProfileSource::File(&system_profile), name)
            },
        };

        let key = CacheKey { profile: profile_key, grid_size: self.settings.grid_size, color_mode };

        if let Some(luts) = self.cache.get(&key) {
            log::debug!("calibration tables for {} found in cache", name);
            return Ok(ResolvedCalibration { calibration: Calibration::Luts(luts), profile_name: Some(name) });
        }

        let oracle = match self.oracles.create(source, color_mode) {
            Ok(oracle) => oracle,
            Err(error) => {
                log::warn!("color profile {} is not usable, colors are not calibrated: {}", name, error);
                return Ok(ResolvedCalibration::identity());
            }
        };

        log::debug!("sampling calibration tables for {} with a {} grid", name, self.settings.grid_size);

        let luts = self.sample_luts(oracle.as_ref(), size, sample, cancel)?;
        let luts = self.cache.insert(key, Arc::new(luts));

        Ok(ResolvedCalibration { calibration: Calibration::Luts(luts), profile_name: Some(name) })
    }

    fn sample_luts(
        &self, oracle: &dyn ColorOracle,
        size: Vec2<usize>, sample: &dyn Fn(Vec2<usize>) -> Sample,
        cancel: &CancelToken,
    ) -> Result<RgbLuts>
    {
        let grid_size = self.settings.grid_size;
        let mut accumulator = LutAccumulator::default();
        let mut inverted: Option<bool> = None;

        for grid_y in 0 .. grid_size {
            cancel.check()?;
            let y = grid_position(grid_y, grid_size, size.height());

            for grid_x in 0 .. grid_size {
                let x = grid_position(grid_x, grid_size, size.width());

                match sample(Vec2(x, y)) {
                    Sample::Rgb(rgb) => {
                        accumulator.add(rgb, oracle.convert(&rgb)?);
                    },

                    Sample::Cmyk { stored, baseline } => {
                        let invert = match (inverted, self.settings.polarity) {
                            (Some(invert), PolarityMode::Once) => invert,
                            _ => {
                                let decision = prefers_inverted(oracle, stored, baseline)?;
                                inverted = Some(decision);
                                decision
                            },
                        };

                        let input = if invert { stored.map(|value| 255 - value) } else { stored };
                        accumulator.add(baseline, oracle.convert(&input)?);
                    },
                }
            }
        }

        Ok(accumulator.build())
    }
}

/// The pixel coordinate of a grid cell center.
fn grid_position(cell: usize, grid_size: usize, length: usize) -> usize {
    let position = ((cell as f64 + 0.5) * length as f64 / grid_size as f64) as usize;
    position.min(length.saturating_sub(1))
}

/// Whether the inverted cmyk values convert closer to the baseline approximation.
fn prefers_inverted(oracle: &dyn ColorOracle, stored: [u8; 4], baseline: [u8; 3]) -> Result<bool> {
    let as_stored = oracle.convert(&stored)?;
    let inverted = oracle.convert(&stored.map(|value| 255 - value))?;
    Ok(distance_squared(inverted, baseline) < distance_squared(as_stored, baseline))
}

fn distance_squared(left: [u8; 3], right: [u8; 3]) -> i32 {
    left.iter().zip(right.iter())
        .map(|(&left, &right)| (left as i32 - right as i32).pow(2))
        .sum()
}
