// SPDX-License-Identifier: MPL-2.0
//! Image deblurring and denoising with pretrained NAFNet models.
//!
//! The crate resolves a model id to a configuration record, downloads the
//! corresponding weight file on first use, and exposes single-image and
//! batch-directory restoration:
//!
//! ```no_run
//! use nafnet_restore::{Device, Processor};
//! use std::path::Path;
//!
//! let mut processor = Processor::deblur("gopro_width64", "/data/weights", Device::Cpu)?;
//!
//! let image = image_rs::open("blurry.jpg")?;
//! let restored = processor.process(&image)?;
//! restored.save("restored.png")?;
//!
//! processor.batch(Path::new("input"), Path::new("output"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! All operations are synchronous and blocking; errors propagate to the
//! caller without internal retries.

#![doc(html_root_url = "https://docs.rs/nafnet-restore/0.1.0")]

pub mod batch;
pub mod download;
pub mod error;
pub mod model;
pub mod paths;
pub mod processor;
pub mod registry;
pub mod settings;

pub use batch::{NoProgress, Progress, SUPPORTED_FORMATS};
pub use download::{ensure_weights, HttpFetcher, WeightFetcher};
pub use error::{Error, Result};
pub use model::RestorationModel;
pub use processor::{Processor, ProcessorKind};
pub use registry::{Device, ModelConfig, ModelRegistry, NetworkParams, ALL_MODEL_IDS};
pub use settings::Settings;
