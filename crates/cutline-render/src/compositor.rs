//! Frame compositor: turns one render request into one output frame.
//!
//! Layers, bottom to top:
//! 1. solid background colour
//! 2. the first listed track, aspect-fitted
//! 3. during a transition, the last listed track styled by the transition
//! 4. the frame filter, over everything so far
//! 5. the optional watermark
//!
//! The result depends only on the request and the context, so the same
//! request always produces byte-identical output.

use cutline_core::{Color, Size, Transform2D, Vec2};
use cutline_effects::{
    draw_fitted, drop_shadow, fitted_transform, transformed, BlendMode, FrameFilter, Image,
    Sampling, ShadowStyle, TransitionParams, TransitionStyle,
};
use cutline_timeline::TrackId;
use tracing::{debug, warn};

use crate::context::RenderContext;
use crate::error::{RenderError, Result};
use crate::request::{OutputFrame, RenderRequest};

/// Image stamped over every output frame.
#[derive(Debug, Clone)]
pub struct Watermark {
    pub image: Image,
    /// Center of the watermark in UV coordinates of the output frame
    pub origin: Vec2,
    /// Size relative to the aspect-fitted frame
    pub scale: f64,
    pub blend_mode: BlendMode,
    pub shadow: Option<ShadowStyle>,
}

impl Watermark {
    pub fn new(image: Image) -> Self {
        Self {
            image,
            origin: Vec2::new(0.15, 0.15),
            scale: 0.3,
            blend_mode: BlendMode::SourceOver,
            shadow: Some(ShadowStyle::default()),
        }
    }

    fn placement(&self) -> Transform2D {
        Transform2D::UV_IDENTITY
            .setting_origin(self.origin)
            .setting_scale(self.scale, self.scale)
    }
}

/// Configuration for the compositor.
#[derive(Debug, Clone)]
pub struct CompositorConfig {
    pub background: Color,
    pub transition: TransitionStyle,
    /// Applied to the composited frame before the watermark
    pub filter: FrameFilter,
    pub watermark: Option<Watermark>,
    /// Copy a passthrough track's frame verbatim when nothing else would
    /// change it
    pub honor_passthrough: bool,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            background: Color::WHITE,
            transition: TransitionStyle::default(),
            filter: FrameFilter::None,
            watermark: None,
            honor_passthrough: true,
        }
    }
}

/// Stateless per-frame compositor, shared by all render workers.
#[derive(Debug, Clone)]
pub struct FrameCompositor {
    config: CompositorConfig,
    /// Watermark with its shadow already applied
    stamp: Option<Image>,
}

impl FrameCompositor {
    pub fn new(config: CompositorConfig) -> Result<Self> {
        let stamp = match &config.watermark {
            Some(Watermark {
                image,
                shadow: Some(style),
                ..
            }) => Some(drop_shadow(image, *style)?),
            Some(wm) => Some(wm.image.clone()),
            None => None,
        };
        Ok(Self { config, stamp })
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Composite `request` into a fresh frame from the context pool.
    pub fn render(&self, request: &RenderRequest, context: &RenderContext) -> Result<OutputFrame> {
        let mut frame = context
            .new_output_frame()
            .ok_or(RenderError::MissingPixelBuffer)?;

        if let Some(source) = self.passthrough_source(request, context) {
            // Sizes were checked by passthrough_source
            if frame.copy_from(source).is_ok() {
                debug!(time = %request.time, "passthrough frame copied");
                return Ok(frame);
            }
        }

        let canvas = self.compose(request, context.width, context.height, context.sampling())?;
        canvas.write_into(&mut frame)?;
        debug!(
            time = %request.time,
            tracks = request.instruction.required_tracks.len(),
            "frame composited"
        );
        Ok(frame)
    }

    /// Composite `request` onto a new premultiplied canvas.
    pub fn compose(
        &self,
        request: &RenderRequest,
        width: u32,
        height: u32,
        sampling: Sampling,
    ) -> Result<Image> {
        let mut canvas = Image::solid(self.config.background, width, height);
        let instruction = &request.instruction;

        if let Some(image) = instruction
            .background_track()
            .and_then(|id| source_image(request, id))
        {
            draw_fitted(
                &mut canvas,
                &image,
                Transform2D::UV_IDENTITY,
                BlendMode::SourceOver,
                sampling,
            );
        }

        if instruction.is_transition() {
            if let Some(image) = instruction
                .foreground_track()
                .and_then(|id| source_image(request, id))
            {
                self.draw_incoming(&mut canvas, &image, instruction.progress(request.time), sampling)?;
            }
        }

        if !self.config.filter.is_identity() {
            canvas = self.config.filter.apply(&canvas)?;
        }

        if let (Some(stamp), Some(wm)) = (&self.stamp, &self.config.watermark) {
            draw_fitted(&mut canvas, stamp, wm.placement(), wm.blend_mode, sampling);
        }
        Ok(canvas)
    }

    fn draw_incoming(
        &self,
        canvas: &mut Image,
        image: &Image,
        progress: f64,
        sampling: Sampling,
    ) -> Result<()> {
        let style = &self.config.transition;
        let params = style.params_at(progress);
        if params.scale <= 0.0 && style.blend_mode.keeps_backdrop() {
            return Ok(());
        }
        let layer = incoming_layer(image, &params, canvas.size(), sampling)?;
        draw_fitted(canvas, &layer, params.placement(), style.blend_mode, sampling);
        Ok(())
    }

    fn passthrough_source<'r>(
        &self,
        request: &'r RenderRequest,
        context: &RenderContext,
    ) -> Option<&'r cutline_core::FrameBuffer> {
        if !self.config.honor_passthrough
            || self.config.watermark.is_some()
            || !self.config.filter.is_identity()
        {
            return None;
        }
        let track = request.instruction.passthrough?;
        let source = request.source_frame(track)?;
        (source.width == context.width && source.height == context.height).then_some(&**source)
    }
}

/// Incoming image fitted into an output-sized layer, then blurred and faded.
///
/// Fitting first keeps the blur cost bounded by the output size and lets the
/// sigma stay in output pixels.
fn incoming_layer(
    image: &Image,
    params: &TransitionParams,
    output: Size,
    sampling: Sampling,
) -> Result<Image> {
    let fit = fitted_transform(image.size(), output, Transform2D::UV_IDENTITY);
    let fitted = transformed(image, fit, output, sampling);
    Ok(params.style_image(&fitted)?)
}

fn source_image(request: &RenderRequest, track: TrackId) -> Option<Image> {
    match request.source_frame(track) {
        Some(frame) => Some(Image::from_frame(frame)),
        None => {
            warn!(
                time = %request.time,
                "{}, compositing without it",
                RenderError::MissingSourceFrame(track)
            );
            None
        }
    }
}
