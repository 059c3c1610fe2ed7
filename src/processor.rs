// SPDX-License-Identifier: MPL-2.0
//! Deblur / denoise front end over the restoration network.
//!
//! A [`Processor`] validates the requested model id, provisions the weight
//! file, and owns one [`RestorationModel`] built from a device-adjusted
//! configuration. The two task kinds share all construction logic and differ
//! only in the closed set of model ids they accept.

use crate::batch::{run_batch, NoProgress, Progress};
use crate::download::{ensure_weights, HttpFetcher, WeightFetcher};
use crate::error::{Error, Result};
use crate::model::RestorationModel;
use crate::registry::{Device, ModelRegistry};
use image_rs::DynamicImage;
use std::path::{Path, PathBuf};

/// Restoration task selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorKind {
    Deblur,
    Denoise,
}

impl ProcessorKind {
    /// Model ids this kind accepts.
    #[must_use]
    pub fn supported_models(self) -> &'static [&'static str] {
        match self {
            ProcessorKind::Deblur => &["gopro_width64", "gopro_width32", "reds_width64"],
            ProcessorKind::Denoise => &["sidd_width64", "sidd_width32"],
        }
    }

    /// Validates a model id against this kind's supported set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidModel`] (enumerating the supported ids) for an
    /// id outside the set.
    pub fn validate_model(self, model_id: &str) -> Result<()> {
        if self.supported_models().contains(&model_id) {
            Ok(())
        } else {
            Err(Error::InvalidModel {
                id: model_id.to_string(),
                supported: self.supported_models(),
            })
        }
    }
}

/// Single-image and batch restoration processor.
pub struct Processor {
    kind: ProcessorKind,
    model_id: String,
    device: Device,
    registry: ModelRegistry,
    net: RestorationModel,
    progress: Box<dyn Progress>,
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("kind", &self.kind)
            .field("model_id", &self.model_id)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl Processor {
    /// Creates a deblurring processor.
    ///
    /// # Errors
    ///
    /// See [`Processor::new`].
    pub fn deblur(model_id: &str, weight_dir: impl Into<PathBuf>, device: Device) -> Result<Self> {
        Self::new(ProcessorKind::Deblur, model_id, weight_dir, device)
    }

    /// Creates a denoising processor.
    ///
    /// # Errors
    ///
    /// See [`Processor::new`].
    pub fn denoise(model_id: &str, weight_dir: impl Into<PathBuf>, device: Device) -> Result<Self> {
        Self::new(ProcessorKind::Denoise, model_id, weight_dir, device)
    }

    /// Creates a processor, downloading the weight file over HTTP when it is
    /// not yet present under `weight_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidModel`] for an id outside the kind's supported
    /// set (checked before anything else happens), [`Error::UnknownModel`]
    /// when the registry has no entry, and [`Error::Download`] when
    /// provisioning fails.
    pub fn new(
        kind: ProcessorKind,
        model_id: &str,
        weight_dir: impl Into<PathBuf>,
        device: Device,
    ) -> Result<Self> {
        Self::from_registry(kind, model_id, ModelRegistry::new(weight_dir), device, &HttpFetcher)
    }

    /// Creates a processor with an injected registry and download facility.
    ///
    /// Construction order: validate the id, resolve the configuration,
    /// provision weights, take a device-adjusted configuration copy, build
    /// the network wrapper. An invalid id fails before any download or
    /// wrapper construction is attempted.
    ///
    /// # Errors
    ///
    /// See [`Processor::new`].
    pub fn from_registry(
        kind: ProcessorKind,
        model_id: &str,
        registry: ModelRegistry,
        device: Device,
        fetcher: &dyn WeightFetcher,
    ) -> Result<Self> {
        kind.validate_model(model_id)?;

        let template = registry.resolve(model_id)?;
        ensure_weights(&template, fetcher, &mut |_| {})?;

        let config = template.for_device(device);

        Ok(Self {
            kind,
            model_id: model_id.to_string(),
            device,
            registry,
            net: RestorationModel::new(config),
            progress: Box::new(NoProgress),
        })
    }

    /// Replaces the batch progress reporter (no-op by default).
    #[must_use]
    pub fn with_progress(mut self, progress: Box<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn kind(&self) -> ProcessorKind {
        self.kind
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    #[must_use]
    pub fn device(&self) -> Device {
        self.device
    }

    /// Returns the registry this processor resolves configurations from.
    #[must_use]
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Model ids this processor's kind accepts.
    #[must_use]
    pub fn available_models(&self) -> &'static [&'static str] {
        self.kind.supported_models()
    }

    /// Returns the owned network wrapper.
    #[must_use]
    pub fn network(&self) -> &RestorationModel {
        &self.net
    }

    /// Restores a single image. Synchronous and blocking; delegates directly
    /// to the owned network wrapper.
    ///
    /// # Errors
    ///
    /// Propagates session-loading and inference failures.
    pub fn process(&mut self, image: &DynamicImage) -> Result<DynamicImage> {
        self.net.predict(image)
    }

    /// Restores every supported image in `input_dir`, writing
    /// `<stem>_processed.png` files into `output_dir` (created if absent).
    ///
    /// The first failing file aborts the run; earlier outputs remain written.
    ///
    /// # Errors
    ///
    /// Propagates listing, decoding, inference, and write failures.
    pub fn batch(&mut self, input_dir: &Path, output_dir: &Path) -> Result<()> {
        let net = &mut self.net;
        run_batch(input_dir, output_dir, self.progress.as_mut(), &mut |img| {
            net.predict(img)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ALL_MODEL_IDS;
    use std::cell::RefCell;
    use tempfile::tempdir;

    struct RecordingFetcher {
        calls: RefCell<usize>,
    }

    impl RecordingFetcher {
        fn new() -> Self {
            Self {
                calls: RefCell::new(0),
            }
        }

        fn call_count(&self) -> usize {
            *self.calls.borrow()
        }
    }

    impl WeightFetcher for RecordingFetcher {
        fn fetch(&self, _url: &str, dest: &Path, _progress: &mut dyn FnMut(f32)) -> Result<u64> {
            *self.calls.borrow_mut() += 1;
            std::fs::write(dest, b"weights").map_err(|e| Error::Io(e.to_string()))?;
            Ok(7)
        }
    }

    /// Seeds a dummy weight file for `model_id` so construction needs no
    /// download.
    fn seed_weights(weight_dir: &Path, model_id: &str) {
        let config = ModelRegistry::new(weight_dir)
            .resolve(model_id)
            .expect("known id");
        std::fs::create_dir_all(weight_dir).expect("weight dir");
        std::fs::write(&config.model_path, b"seeded").expect("seed weights");
    }

    #[test]
    fn kinds_have_disjoint_model_sets() {
        for id in ProcessorKind::Deblur.supported_models() {
            assert!(!ProcessorKind::Denoise.supported_models().contains(id));
        }
        for id in ALL_MODEL_IDS {
            let known = ProcessorKind::Deblur.supported_models().contains(id)
                || ProcessorKind::Denoise.supported_models().contains(id);
            assert!(known, "{id} belongs to no processor kind");
        }
    }

    #[test]
    fn invalid_id_fails_before_any_download() {
        let dir = tempdir().expect("temp dir");
        let fetcher = RecordingFetcher::new();

        let err = Processor::from_registry(
            ProcessorKind::Deblur,
            "sidd_width64", // valid for denoise, not deblur
            ModelRegistry::new(dir.path()),
            Device::Cpu,
            &fetcher,
        )
        .unwrap_err();

        assert!(matches!(err, Error::InvalidModel { .. }));
        assert!(err.to_string().contains("gopro_width64"));
        assert_eq!(fetcher.call_count(), 0);
        // No side effects on disk either.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn construction_with_present_weights_downloads_nothing() {
        let dir = tempdir().expect("temp dir");
        let fetcher = RecordingFetcher::new();

        for id in ProcessorKind::Deblur.supported_models() {
            seed_weights(dir.path(), id);
            let processor = Processor::from_registry(
                ProcessorKind::Deblur,
                id,
                ModelRegistry::new(dir.path()),
                Device::Cpu,
                &fetcher,
            )
            .expect("construction");
            assert_eq!(processor.model_id(), *id);
        }

        assert_eq!(fetcher.call_count(), 0);
    }

    #[test]
    fn construction_with_absent_weights_downloads_once() {
        let dir = tempdir().expect("temp dir");
        let fetcher = RecordingFetcher::new();

        let processor = Processor::from_registry(
            ProcessorKind::Denoise,
            "sidd_width32",
            ModelRegistry::new(dir.path()),
            Device::Cpu,
            &fetcher,
        )
        .expect("construction");

        assert_eq!(fetcher.call_count(), 1);
        assert!(processor.network().config().model_path.is_file());
    }

    #[test]
    fn construction_applies_device_adjustment() {
        let dir = tempdir().expect("temp dir");
        seed_weights(dir.path(), "gopro_width64");

        let cpu = Processor::from_registry(
            ProcessorKind::Deblur,
            "gopro_width64",
            ModelRegistry::new(dir.path()),
            Device::Cpu,
            &RecordingFetcher::new(),
        )
        .expect("construction");
        assert_eq!(cpu.network().config().num_gpu, 0);

        let cuda = Processor::from_registry(
            ProcessorKind::Deblur,
            "gopro_width64",
            ModelRegistry::new(dir.path()),
            Device::Cuda,
            &RecordingFetcher::new(),
        )
        .expect("construction");
        assert_eq!(cuda.network().config().num_gpu, 1);
    }

    #[test]
    fn construction_does_not_load_session() {
        let dir = tempdir().expect("temp dir");
        seed_weights(dir.path(), "sidd_width64");

        let processor = Processor::from_registry(
            ProcessorKind::Denoise,
            "sidd_width64",
            ModelRegistry::new(dir.path()),
            Device::Cpu,
            &RecordingFetcher::new(),
        )
        .expect("construction");

        assert!(!processor.network().is_session_ready());
    }

    #[test]
    fn available_models_matches_kind() {
        let dir = tempdir().expect("temp dir");
        seed_weights(dir.path(), "reds_width64");

        let processor = Processor::from_registry(
            ProcessorKind::Deblur,
            "reds_width64",
            ModelRegistry::new(dir.path()),
            Device::Cpu,
            &RecordingFetcher::new(),
        )
        .expect("construction");

        assert_eq!(
            processor.available_models(),
            ProcessorKind::Deblur.supported_models()
        );
        assert_eq!(processor.kind(), ProcessorKind::Deblur);
        assert_eq!(processor.device(), Device::Cpu);
    }
}
