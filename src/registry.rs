// SPDX-License-Identifier: MPL-2.0
//! Static mapping from model identifiers to download URLs, weight paths,
//! and network hyperparameters.
//!
//! Each known model id resolves to an immutable [`ModelConfig`] template.
//! Callers take a device-adjusted copy via [`ModelConfig::for_device`]; the
//! template held by the registry is never mutated.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default location of the published NAFNet model exports.
pub const DEFAULT_URL_PREFIX: &str =
    "https://huggingface.co/mikestealth/nafnet-models/resolve/main/";

/// All model ids known to the registry.
pub const ALL_MODEL_IDS: &[&str] = &[
    "gopro_width64",
    "gopro_width32",
    "reds_width64",
    "sidd_width64",
    "sidd_width32",
];

/// Compute target for inference. Only affects the `num_gpu` field of the
/// resolved configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,
    Cuda,
}

impl Device {
    #[must_use]
    pub fn is_cuda(self) -> bool {
        matches!(self, Device::Cuda)
    }
}

impl FromStr for Device {
    type Err = Error;

    /// Accepts `"cpu"`, `"cuda"`, and indexed forms like `"cuda:0"`.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_lowercase();
        if lower == "cpu" {
            return Ok(Device::Cpu);
        }
        if lower == "cuda" {
            return Ok(Device::Cuda);
        }
        if let Some(index) = lower.strip_prefix("cuda:") {
            if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) {
                return Ok(Device::Cuda);
            }
        }
        Err(Error::Config(format!("Unknown device: {s}")))
    }
}

/// Architecture hyperparameters of a NAFNet variant.
///
/// Field order mirrors the order the network consumes them in: architecture
/// name, channel width, per-stage encoder block counts, middle block count,
/// per-stage decoder block counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParams {
    pub arch: String,
    pub width: u32,
    pub enc_blk_nums: Vec<u32>,
    pub middle_blk_num: u32,
    pub dec_blk_nums: Vec<u32>,
}

impl NetworkParams {
    /// Spatial stride of the encoder: each stage halves both dimensions, so
    /// inference input must be padded to a multiple of `2^stages`. Saturates
    /// at `u32::MAX` for stage counts that would overflow the shift.
    #[must_use]
    pub fn encoder_stride(&self) -> u32 {
        u32::try_from(self.enc_blk_nums.len())
            .ok()
            .and_then(|stages| 1u32.checked_shl(stages))
            .unwrap_or(u32::MAX)
    }
}

/// Immutable configuration template for one model id.
///
/// `model_path` is both the download destination and the pretrained-weight
/// path the network is loaded from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model_url: Option<String>,
    pub model_path: PathBuf,
    pub model_type: Option<String>,
    pub scale: u32,
    pub num_gpu: u32,
    pub manual_seed: u64,
    pub network: Option<NetworkParams>,
    /// Expected BLAKE3 hash of the weight file, when published.
    pub checksum: Option<String>,
    pub strict_load: bool,
    pub resume_state: Option<PathBuf>,
    pub is_train: bool,
    pub distributed: bool,
}

impl ModelConfig {
    /// Returns a copy of this configuration adjusted for `device`:
    /// `num_gpu` is 1 on a CUDA device and 0 otherwise. The template itself
    /// is left untouched.
    #[must_use]
    pub fn for_device(&self, device: Device) -> ModelConfig {
        let mut config = self.clone();
        config.num_gpu = u32::from(device.is_cuda());
        config
    }
}

/// Registry resolving model ids to configuration records.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    weight_dir: PathBuf,
    url_prefix: String,
}

impl ModelRegistry {
    /// Creates a registry storing weight files under `weight_dir`.
    pub fn new(weight_dir: impl Into<PathBuf>) -> Self {
        Self {
            weight_dir: weight_dir.into(),
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
        }
    }

    /// Replaces the download URL prefix (mirrors, test servers).
    #[must_use]
    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into();
        self
    }

    /// Returns the directory weight files are stored in.
    #[must_use]
    pub fn weight_dir(&self) -> &Path {
        &self.weight_dir
    }

    /// Resolves a model id to its configuration template.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownModel`] for an unrecognized id.
    pub fn resolve(&self, model_id: &str) -> Result<ModelConfig> {
        match model_id {
            "gopro_width64" => Ok(self.gopro_width64()),
            "gopro_width32" => Ok(self.gopro_width32()),
            "reds_width64" => Ok(self.reds_width64()),
            "sidd_width64" => Ok(self.sidd_width64()),
            "sidd_width32" => Ok(self.sidd_width32()),
            other => Err(Error::UnknownModel(other.to_string())),
        }
    }

    fn base(&self) -> ModelConfig {
        ModelConfig {
            model_url: None,
            model_path: PathBuf::new(),
            model_type: None,
            scale: 1,
            num_gpu: 0,
            manual_seed: 10,
            network: None,
            checksum: None,
            strict_load: true,
            resume_state: None,
            is_train: false,
            distributed: false,
        }
    }

    fn entry(&self, filename: &str, network: NetworkParams) -> ModelConfig {
        let mut config = self.base();
        config.model_url = Some(format!("{}{filename}", self.url_prefix));
        config.model_path = self.weight_dir.join(filename);
        config.model_type = Some("ImageRestorationModel".to_string());
        config.network = Some(network);
        config
    }

    fn gopro_width64(&self) -> ModelConfig {
        self.entry(
            "NAFNet-GoPro-width64.onnx",
            NetworkParams {
                arch: "NAFNetLocal".to_string(),
                width: 64,
                enc_blk_nums: vec![1, 1, 1, 28],
                middle_blk_num: 1,
                dec_blk_nums: vec![1, 1, 1, 1],
            },
        )
    }

    fn gopro_width32(&self) -> ModelConfig {
        self.entry(
            "NAFNet-GoPro-width32.onnx",
            NetworkParams {
                arch: "NAFNetLocal".to_string(),
                width: 32,
                enc_blk_nums: vec![1, 1, 1, 28],
                middle_blk_num: 1,
                dec_blk_nums: vec![1, 1, 1, 1],
            },
        )
    }

    fn reds_width64(&self) -> ModelConfig {
        self.entry(
            "NAFNet-REDS-width64.onnx",
            NetworkParams {
                arch: "NAFNetLocal".to_string(),
                width: 64,
                enc_blk_nums: vec![1, 1, 1, 28],
                middle_blk_num: 1,
                dec_blk_nums: vec![1, 1, 1, 1],
            },
        )
    }

    fn sidd_width64(&self) -> ModelConfig {
        self.entry(
            "NAFNet-SIDD-width64.onnx",
            NetworkParams {
                arch: "NAFNet".to_string(),
                width: 64,
                enc_blk_nums: vec![2, 2, 4, 8],
                middle_blk_num: 12,
                dec_blk_nums: vec![2, 2, 2, 2],
            },
        )
    }

    fn sidd_width32(&self) -> ModelConfig {
        self.entry(
            "NAFNet-SIDD-width32.onnx",
            NetworkParams {
                arch: "NAFNet".to_string(),
                width: 32,
                enc_blk_nums: vec![2, 2, 4, 8],
                middle_blk_num: 12,
                dec_blk_nums: vec![2, 2, 2, 2],
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_known_id_builds_url_and_path() {
        let registry = ModelRegistry::new("/weights");
        let config = registry.resolve("gopro_width64").expect("known id");

        assert_eq!(
            config.model_url.as_deref(),
            Some("https://huggingface.co/mikestealth/nafnet-models/resolve/main/NAFNet-GoPro-width64.onnx")
        );
        assert_eq!(
            config.model_path,
            PathBuf::from("/weights/NAFNet-GoPro-width64.onnx")
        );
    }

    #[test]
    fn resolve_unknown_id_fails() {
        let registry = ModelRegistry::new("/weights");
        let err = registry.resolve("gopro_width128").unwrap_err();
        assert!(matches!(err, Error::UnknownModel(id) if id == "gopro_width128"));
    }

    #[test]
    fn every_known_id_has_full_hyperparameters() {
        let registry = ModelRegistry::new("/weights");
        for id in ALL_MODEL_IDS {
            let config = registry.resolve(id).expect("known id");
            let network = config.network.expect("network params");
            assert!(!network.arch.is_empty());
            assert!(network.width > 0);
            assert_eq!(network.enc_blk_nums.len(), network.dec_blk_nums.len());
            assert!(config.model_url.is_some());
        }
    }

    #[test]
    fn url_prefix_override_is_used() {
        let registry =
            ModelRegistry::new("/weights").with_url_prefix("http://localhost:8080/models/");
        let config = registry.resolve("sidd_width32").expect("known id");
        assert_eq!(
            config.model_url.as_deref(),
            Some("http://localhost:8080/models/NAFNet-SIDD-width32.onnx")
        );
    }

    #[test]
    fn for_device_sets_num_gpu_without_touching_template() {
        let registry = ModelRegistry::new("/weights");
        let template = registry.resolve("sidd_width64").expect("known id");

        let cuda = template.for_device(Device::Cuda);
        assert_eq!(cuda.num_gpu, 1);

        let cpu = template.for_device(Device::Cpu);
        assert_eq!(cpu.num_gpu, 0);

        // Template unchanged after both adjustments.
        assert_eq!(template.num_gpu, 0);
    }

    #[test]
    fn for_device_is_idempotent() {
        let registry = ModelRegistry::new("/weights");
        let template = registry.resolve("gopro_width32").expect("known id");

        let once = template.for_device(Device::Cuda);
        let twice = once.for_device(Device::Cuda);
        assert_eq!(once, twice);
    }

    #[test]
    fn device_parses_common_forms() {
        assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("cuda".parse::<Device>().unwrap(), Device::Cuda);
        assert_eq!("cuda:1".parse::<Device>().unwrap(), Device::Cuda);
        assert_eq!("CUDA".parse::<Device>().unwrap(), Device::Cuda);
        assert!("tpu".parse::<Device>().is_err());
    }

    #[test]
    fn device_rejects_non_numeric_cuda_index() {
        assert!("cuda:abc".parse::<Device>().is_err());
        assert!("cuda:".parse::<Device>().is_err());
        assert!("cuda:0x1".parse::<Device>().is_err());
        assert!("cudab".parse::<Device>().is_err());
    }

    #[test]
    fn encoder_stride_follows_stage_count() {
        let registry = ModelRegistry::new("/weights");
        let config = registry.resolve("gopro_width64").expect("known id");
        // Four encoder stages, each halving dimensions.
        assert_eq!(config.network.unwrap().encoder_stride(), 16);
    }

    #[test]
    fn encoder_stride_saturates_on_excessive_stage_count() {
        let network = NetworkParams {
            arch: "NAFNet".to_string(),
            width: 64,
            enc_blk_nums: vec![1; 40],
            middle_blk_num: 1,
            dec_blk_nums: vec![1; 40],
        };
        assert_eq!(network.encoder_stride(), u32::MAX);
    }
}
