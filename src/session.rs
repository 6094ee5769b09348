//! One crop session: load, interact, then confirm or cancel.
//!
//! ```text
//! Loading ──ok──▶ Ready ◀──▶ Interacting
//!    │              │  └──confirm──▶ Confirmed
//!    │              └─────cancel───▶ Cancelled
//!    └──decode error──▶ Errored
//! ```
//!
//! The whole observable state is one [`SessionState`] value. Transitions on it
//! are pure; [`CropSession`] applies them, owns the decoded bitmap and tells
//! subscribers whenever the value changes.

use crate::backend::ImageDecoder;
use crate::config::{CropOptions, CropperConfig};
use crate::error::CropError;
use crate::geometry::{Point, PreviewSurface, SelectionRect};
use crate::loader::{ImageAsset, ImageLoader, LoadedImage};
use crate::render::{CropRenderer, EncodedImage};
use crate::selection::{InteractionMode, PointerId, SelectionLimits, SelectionState};

#[derive(Clone, Debug, PartialEq)]
pub enum SessionState {
    /// Decoding; nothing to interact with yet.
    Loading,
    Ready(SelectionState),
    /// A pointer gesture is in progress.
    Interacting(SelectionState),
    Confirmed,
    Cancelled,
    Errored(CropError),
}

impl SessionState {
    /// State entered once the image is decoded.
    pub fn loaded(surface: PreviewSurface, aspect_ratio: Option<f32>, limits: SelectionLimits) -> Self {
        Self::Ready(SelectionState::new(surface, aspect_ratio, limits))
    }

    pub fn selection_state(&self) -> Option<&SelectionState> {
        match self {
            Self::Ready(state) | Self::Interacting(state) => Some(state),
            _ => None,
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.selection_state().is_some()
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Cancelled | Self::Errored(_))
    }

    fn map_selection(&self, f: impl FnOnce(SelectionState) -> SelectionState) -> Self {
        match self.selection_state() {
            Some(state) => {
                let next = f(*state);
                if next.mode().is_some() {
                    Self::Interacting(next)
                } else {
                    Self::Ready(next)
                }
            }
            None => self.clone(),
        }
    }

    #[must_use]
    pub fn pointer_down(&self, pointer: PointerId, point: Point) -> Self {
        self.map_selection(|s| s.pointer_down(pointer, point))
    }

    #[must_use]
    pub fn pointer_move(&self, pointer: PointerId, point: Point) -> Self {
        self.map_selection(|s| s.pointer_move(pointer, point))
    }

    #[must_use]
    pub fn pointer_up(&self, pointer: PointerId) -> Self {
        self.map_selection(|s| s.pointer_up(pointer))
    }

    #[must_use]
    pub fn pointer_cancel(&self, pointer: PointerId) -> Self {
        self.map_selection(|s| s.pointer_cancel(pointer))
    }

    #[must_use]
    pub fn reset_selection(&self) -> Self {
        self.map_selection(SelectionState::reset)
    }

    #[must_use]
    pub fn fit_to_image(&self) -> Self {
        self.map_selection(SelectionState::fit_to_image)
    }

    #[must_use]
    pub fn with_aspect_ratio(&self, aspect_ratio: Option<f32>) -> Self {
        self.map_selection(|s| s.with_aspect_ratio(aspect_ratio))
    }

    /// Cancelling is allowed until the session has finished.
    #[must_use]
    pub fn cancelled(&self) -> Self {
        if self.is_finished() {
            self.clone()
        } else {
            Self::Cancelled
        }
    }
}

/// A decode that has been started but not yet applied to its session.
///
/// It can be decoded on another thread and handed back through
/// [`CropSession::finish_load`].
#[derive(Debug)]
pub struct PendingLoad {
    generation: u64,
    asset: ImageAsset,
    loader: ImageLoader,
}

impl PendingLoad {
    pub fn decode(self, decoder: &dyn ImageDecoder) -> CompletedLoad {
        CompletedLoad {
            generation: self.generation,
            result: self.loader.load(&self.asset, decoder),
        }
    }
}

/// Outcome of a [`PendingLoad`], ready to be applied.
#[derive(Debug)]
pub struct CompletedLoad {
    generation: u64,
    result: Result<LoadedImage, CropError>,
}

type Observer = Box<dyn FnMut(&SessionState)>;

pub struct CropSession {
    options: CropOptions,
    config: CropperConfig,
    renderer: CropRenderer,
    state: SessionState,
    image: Option<LoadedImage>,
    generation: u64,
    observers: Vec<Observer>,
}

impl CropSession {
    /// Opens a session in `Loading` and returns the decode it is waiting for.
    pub fn start(asset: ImageAsset, options: CropOptions, config: CropperConfig) -> (Self, PendingLoad) {
        let renderer = CropRenderer::new(config.clone());
        let session = Self {
            options,
            config: config.clone(),
            renderer,
            state: SessionState::Loading,
            image: None,
            generation: 1,
            observers: Vec::new(),
        };
        let pending = PendingLoad {
            generation: session.generation,
            asset,
            loader: ImageLoader::new(config),
        };
        (session, pending)
    }

    /// Opens a session and decodes synchronously.
    pub fn open(
        asset: ImageAsset,
        options: CropOptions,
        config: CropperConfig,
        decoder: &dyn ImageDecoder,
    ) -> Self {
        let (mut session, pending) = Self::start(asset, options, config);
        session.finish_load(pending.decode(decoder));
        session
    }

    /// Replaces the default `image`-backed renderer.
    pub fn with_renderer(mut self, renderer: CropRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Registers a callback run after every state change.
    pub fn subscribe(&mut self, observer: impl FnMut(&SessionState) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Applies a finished decode. Returns `false` when the result was
    /// dropped because the session moved on (cancelled or already loaded).
    pub fn finish_load(&mut self, completed: CompletedLoad) -> bool {
        if completed.generation != self.generation || self.state != SessionState::Loading {
            log::warn!(
                "discarding late image load (generation {}, session {})",
                completed.generation,
                self.state_name()
            );
            return false;
        }

        match completed.result {
            Ok(image) => {
                let next = SessionState::loaded(
                    image.surface(),
                    self.options.effective_aspect_ratio(),
                    SelectionLimits::from(&self.config),
                );
                self.image = Some(image);
                self.transition(next);
            }
            Err(err) => {
                log::error!("unable to open image for cropping: {err}");
                self.transition(SessionState::Errored(err));
            }
        }
        true
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn options(&self) -> &CropOptions {
        &self.options
    }

    pub fn title(&self) -> &str {
        self.options.resolve_title()
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_interactive()
    }

    pub fn image(&self) -> Option<&LoadedImage> {
        self.image.as_ref()
    }

    /// `None` until decoding has finished.
    pub fn surface(&self) -> Option<PreviewSurface> {
        self.state.selection_state().map(SelectionState::surface)
    }

    pub fn selection(&self) -> Option<SelectionRect> {
        self.state.selection_state().map(SelectionState::selection)
    }

    pub fn mode(&self) -> Option<InteractionMode> {
        self.state.selection_state().and_then(SelectionState::mode)
    }

    pub fn error(&self) -> Option<&CropError> {
        match &self.state {
            SessionState::Errored(err) => Some(err),
            _ => None,
        }
    }

    pub fn pointer_down(&mut self, pointer: PointerId, point: Point) {
        let next = self.state.pointer_down(pointer, point);
        self.transition(next);
    }

    pub fn pointer_move(&mut self, pointer: PointerId, point: Point) {
        let next = self.state.pointer_move(pointer, point);
        self.transition(next);
    }

    pub fn pointer_up(&mut self, pointer: PointerId) {
        let next = self.state.pointer_up(pointer);
        self.transition(next);
    }

    pub fn pointer_cancel(&mut self, pointer: PointerId) {
        let next = self.state.pointer_cancel(pointer);
        self.transition(next);
    }

    pub fn reset_selection(&mut self) {
        let next = self.state.reset_selection();
        self.transition(next);
    }

    pub fn fit_to_image(&mut self) {
        let next = self.state.fit_to_image();
        self.transition(next);
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: Option<f32>) {
        self.options.aspect_ratio = aspect_ratio;
        let next = self.state.with_aspect_ratio(aspect_ratio);
        self.transition(next);
    }

    /// Renders the current selection. On success the session ends; on a
    /// render failure it stays interactive so the caller can try again.
    pub fn confirm(&mut self) -> Result<EncodedImage, CropError> {
        let Some(selection) = self.selection() else {
            return Err(CropError::InvalidState(format!(
                "cannot confirm while {}",
                self.state_name()
            )));
        };
        let Some(image) = self.image.as_ref() else {
            return Err(CropError::InvalidState("no image loaded".to_string()));
        };

        match self.renderer.render(image, selection, &self.options) {
            Ok(encoded) => {
                self.image = None;
                self.transition(SessionState::Confirmed);
                Ok(encoded)
            }
            Err(err) => {
                log::warn!("crop render failed, session stays open: {err}");
                Err(err)
            }
        }
    }

    /// Abandons the session. Any decode still in flight will be ignored.
    pub fn cancel(&mut self) {
        let next = self.state.cancelled();
        if next == SessionState::Cancelled {
            self.image = None;
            self.generation += 1;
        }
        self.transition(next);
    }

    fn state_name(&self) -> &'static str {
        match self.state {
            SessionState::Loading => "loading",
            SessionState::Ready(_) => "ready",
            SessionState::Interacting(_) => "interacting",
            SessionState::Confirmed => "confirmed",
            SessionState::Cancelled => "cancelled",
            SessionState::Errored(_) => "errored",
        }
    }

    fn transition(&mut self, next: SessionState) {
        if next == self.state {
            return;
        }
        self.state = next;
        for observer in &mut self.observers {
            observer(&self.state);
        }
    }
}
