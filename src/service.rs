use crate::config::ServiceConfig;
use crate::encode::EncodedImage;
use crate::foundation::core::{ColorMode, DimensionLimits};
use crate::foundation::error::{ImgElfError, ImgElfResult};
use crate::format::registry::{self, ActiveFormat, FormatKind};
use crate::format::variant::FormatVariant;
use crate::render::canvas::{RenderOptions, RenderRequest};
use crate::render::text::TextRasterizer;
use crate::validate::{self, ValidationErrors};

/// Entry point for callers: limit queries, validation, generation and the active-format switch.
///
/// The service is `Send + Sync`; share it behind an `Arc` across request handlers. Every request
/// reads the active format once and uses that single variant for validation, rendering and
/// encoding.
#[derive(Debug)]
pub struct ImageService {
    config: ServiceConfig,
    active: ActiveFormat,
    text: TextRasterizer,
}

impl ImageService {
    /// Build a service, loading system fonts plus `config.font_dirs`.
    pub fn new(config: ServiceConfig) -> ImgElfResult<Self> {
        let text = TextRasterizer::new(&config.font_dirs);
        Self::with_rasterizer(config, text)
    }

    /// Build a service around an existing rasterizer (fonts are shared, not reloaded).
    pub fn with_rasterizer(config: ServiceConfig, text: TextRasterizer) -> ImgElfResult<Self> {
        config.validate()?;
        Ok(Self {
            active: ActiveFormat::new(config.default_format),
            config,
            text,
        })
    }

    /// Settings the service was built with.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Rasterizer used for labels.
    pub fn text_rasterizer(&self) -> &TextRasterizer {
        &self.text
    }

    /// Currently active format.
    pub fn active_format(&self) -> FormatKind {
        self.active.snapshot()
    }

    /// Switch the active format. Unknown names leave the selection untouched.
    pub fn set_active_format(&self, name: &str) -> ImgElfResult<&'static dyn FormatVariant> {
        let variant = registry::resolve(name)?;
        let previous = self.active.set(variant.kind());
        tracing::info!(from = %previous, to = %variant.kind(), "active format switched");
        Ok(variant)
    }

    /// Limits for `name` after narrowing by the absolute cap. An empty name means the active
    /// format.
    pub fn config_limits(&self, name: &str) -> ImgElfResult<DimensionLimits> {
        let variant = if name.trim().is_empty() {
            registry::variant(self.active.snapshot())
        } else {
            registry::resolve(name)?
        };
        Ok(validate::effective_limits(
            variant,
            self.config.absolute_max_dimension,
        ))
    }

    /// Advisory encoded size for `name` (empty means the active format).
    pub fn estimate_file_size(
        &self,
        width: u32,
        height: u32,
        name: &str,
        mode: Option<ColorMode>,
    ) -> ImgElfResult<u64> {
        let variant = if name.trim().is_empty() {
            registry::variant(self.active.snapshot())
        } else {
            registry::resolve(name)?
        };
        Ok(variant.estimate_file_size(width, height, mode))
    }

    /// Check raw request fields without rendering anything.
    pub fn validate(&self, width: &str, height: &str, format: &str) -> ValidationErrors {
        let (variant, format) = self.request_variant(format);
        validate::validate(
            width,
            height,
            format,
            variant,
            self.config.absolute_max_dimension,
        )
    }

    /// Validate, render and encode with the configured default styling.
    pub fn generate_image(
        &self,
        width: &str,
        height: &str,
        format: &str,
    ) -> ImgElfResult<EncodedImage> {
        self.generate_image_with(width, height, format, self.config.render_options())
    }

    /// Validate, render and encode with explicit styling.
    ///
    /// Either a complete [`EncodedImage`] is returned or, on bad input,
    /// [`ImgElfError::Validation`] with every failing field; nothing is rendered in that case.
    #[tracing::instrument(skip(self, options))]
    pub fn generate_image_with(
        &self,
        width: &str,
        height: &str,
        format: &str,
        options: RenderOptions,
    ) -> ImgElfResult<EncodedImage> {
        let (variant, format) = self.request_variant(format);
        let checked = validate::validate_request(
            width,
            height,
            format,
            variant,
            self.config.absolute_max_dimension,
        )
        .map_err(ImgElfError::Validation)?;

        let request = RenderRequest::with_options(checked.width, checked.height, options);
        let canvas = variant.render(&request, &self.text)?;
        let encoded = variant.encode(canvas)?;

        tracing::info!(
            format = %encoded.format,
            width = encoded.width,
            height = encoded.height,
            bytes = encoded.bytes.len(),
            "generated image"
        );
        Ok(encoded)
    }

    // The variant a request runs against: the one it names, or the active one when it names
    // none. Unknown names also get the active variant; validation reports the type error.
    fn request_variant<'a>(&self, format: &'a str) -> (&'static dyn FormatVariant, &'a str) {
        if let Some(kind) = FormatKind::parse(format) {
            return (registry::variant(kind), format);
        }
        let active = registry::variant(self.active.snapshot());
        if format.trim().is_empty() {
            (active, active.name())
        } else {
            (active, format)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::Field;

    fn service() -> ImageService {
        ImageService::with_rasterizer(ServiceConfig::default(), TextRasterizer::empty()).unwrap()
    }

    #[test]
    fn service_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ImageService>();
    }

    #[test]
    fn limits_are_narrowed_by_the_cap() {
        let svc = service();
        assert_eq!(
            svc.config_limits("png").unwrap(),
            DimensionLimits::square(1, 10_000)
        );
        assert_eq!(
            svc.config_limits("ICO").unwrap(),
            DimensionLimits::square(16, 256)
        );
        assert_eq!(
            svc.config_limits("").unwrap(),
            DimensionLimits::square(1, 10_000)
        );
        assert!(matches!(
            svc.config_limits("jpg"),
            Err(ImgElfError::InvalidFormat(_))
        ));
    }

    #[test]
    fn uncapped_service_reports_native_limits() {
        let cfg = ServiceConfig {
            absolute_max_dimension: None,
            ..ServiceConfig::default()
        };
        let svc = ImageService::with_rasterizer(cfg, TextRasterizer::empty()).unwrap();
        assert_eq!(svc.config_limits("png").unwrap().max_width, 100_000);
    }

    #[test]
    fn switching_formats() {
        let svc = service();
        assert_eq!(svc.active_format(), FormatKind::Png);

        let v = svc.set_active_format("Ico").unwrap();
        assert_eq!(v.kind(), FormatKind::Ico);
        assert_eq!(svc.active_format(), FormatKind::Ico);
        assert_eq!(svc.config_limits("").unwrap().max_width, 256);

        assert!(svc.set_active_format("jpg").is_err());
        assert_eq!(svc.active_format(), FormatKind::Ico);
    }

    #[test]
    fn validation_failure_produces_no_image() {
        let err = service().generate_image("0", "600", "png").unwrap_err();
        let errors = err.validation_errors().unwrap();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec![Field::Width]);
    }

    #[test]
    fn empty_format_uses_the_active_variant() {
        let svc = service();
        svc.set_active_format("bmp").unwrap();
        let encoded = svc.generate_image("20", "10", "").unwrap();
        assert_eq!(encoded.format, FormatKind::Bmp);
        assert_eq!(encoded.download_name, "_ImgElf.bmp");
        assert!(svc.validate("300", "300", "").is_empty());
        svc.set_active_format("ico").unwrap();
        assert_eq!(svc.validate("300", "300", "").len(), 2);
    }

    #[test]
    fn estimates_resolve_names() {
        let svc = service();
        assert_eq!(svc.estimate_file_size(3, 2, "bmp", None).unwrap(), 24);
        assert_eq!(svc.estimate_file_size(100, 100, "", None).unwrap(), 15_000);
        assert!(svc.estimate_file_size(1, 1, "jpg", None).is_err());
    }

    #[test]
    fn alpha_jpeg_is_an_encoding_error() {
        let opts = RenderOptions {
            color_mode: ColorMode::Rgba,
            ..RenderOptions::default()
        };
        let err = service()
            .generate_image_with("32", "32", "jpeg", opts)
            .unwrap_err();
        assert!(matches!(err, ImgElfError::Encoding { .. }));
    }
}
