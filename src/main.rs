#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

use std::path::{Path, PathBuf};

use clap::Parser;
use eframe::egui;
use image_cropper::{
    AspectPreset, CropOptions, CropSession, CropperConfig, ImageAsset, OutputFormat, Point,
    PointerId, SessionState, StandardDecoder,
};

const PADDING: f32 = 20.0;

/// Crop an image by drawing or dragging a selection over its preview.
#[derive(Parser, Debug)]
#[command(name = "ImageCropper", version, about)]
struct Args {
    /// Image to open on start-up.
    input: Option<PathBuf>,

    /// Aspect lock: free, original, W:H (e.g. 16:9) or a ratio such as 1.5.
    #[arg(long, default_value = "free")]
    aspect: AspectPreset,

    /// Output format (jpeg, png, webp). Inferred from the input when omitted.
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Encoding quality between 0 and 1.
    #[arg(long)]
    quality: Option<f32>,

    /// Largest output width in pixels.
    #[arg(long)]
    max_width: Option<u32>,

    /// Largest output height in pixels.
    #[arg(long)]
    max_height: Option<u32>,

    /// Title shown above the crop surface.
    #[arg(long)]
    title: Option<String>,

    /// Write the crop here instead of asking with a save dialog.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl Args {
    fn crop_options(&self) -> CropOptions {
        CropOptions {
            title: self.title.clone(),
            aspect_ratio: None,
            output_format: self.format,
            quality: self.quality,
            max_output_width: self.max_width,
            max_output_height: self.max_height,
        }
    }
}

struct ImageCropper {
    config: CropperConfig,
    options: CropOptions,
    output: Option<PathBuf>,
    session: Option<CropSession>,
    texture: Option<egui::TextureHandle>,
    aspect_preset: AspectPreset,
    custom_w: u32,
    custom_h: u32,
    is_portrait: bool,
    status: Option<String>,
}

impl ImageCropper {
    fn new(cc: &eframe::CreationContext<'_>, args: Args) -> Self {
        let (custom_w, custom_h) = match args.aspect {
            AspectPreset::Custom(w, h) => (w, h),
            _ => (4, 3),
        };
        let is_portrait = AspectPreset::PORTRAIT.contains(&args.aspect);

        let mut app = Self {
            config: CropperConfig::default(),
            options: args.crop_options(),
            output: args.output.clone(),
            session: None,
            texture: None,
            aspect_preset: args.aspect,
            custom_w,
            custom_h,
            is_portrait,
            status: None,
        };

        if let Some(path) = &args.input {
            app.open(&cc.egui_ctx, path);
        }
        app
    }

    fn open(&mut self, ctx: &egui::Context, path: &Path) {
        self.texture = None;
        self.session = None;

        let asset = match ImageAsset::from_path(path).and_then(|asset| {
            asset.validate(self.config.max_asset_bytes)?;
            Ok(asset)
        }) {
            Ok(asset) => asset,
            Err(err) => {
                log::warn!("rejected {}: {err}", path.display());
                self.status = Some(err.user_message());
                return;
            }
        };

        // Decode once up front so "Original" can resolve against the real size.
        let session = CropSession::open(
            asset,
            self.options.clone(),
            self.config.clone(),
            &StandardDecoder::new(self.config.max_decoded_pixels),
        );

        if let Some(err) = session.error() {
            self.status = Some(err.user_message());
            self.session = Some(session);
            return;
        }

        self.session = Some(session);
        self.apply_aspect_ratio();
        self.load_texture(ctx);
        self.status = None;
    }

    fn load_texture(&mut self, ctx: &egui::Context) {
        let Some(image) = self.session.as_ref().and_then(CropSession::image) else {
            return;
        };
        let preview = image.preview_bitmap(self.config.resize_filter);
        let size = [preview.width() as _, preview.height() as _];
        let image_buffer = preview.to_rgba8();
        let pixels = image_buffer.as_flat_samples();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
        self.texture = Some(ctx.load_texture("preview", color_image, egui::TextureOptions::LINEAR));
    }

    fn current_preset(&self) -> AspectPreset {
        match self.aspect_preset {
            AspectPreset::Custom(..) => AspectPreset::Custom(self.custom_w, self.custom_h),
            other => other,
        }
    }

    fn apply_aspect_ratio(&mut self) {
        let preset = self.current_preset();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let ratio = session
            .image()
            .and_then(|image| preset.ratio(image.source_width(), image.source_height()));
        session.set_aspect_ratio(ratio);
    }

    fn confirm(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let encoded = match session.confirm() {
            Ok(encoded) => encoded,
            Err(err) => {
                log::error!("crop failed: {err}");
                self.status = Some(err.user_message());
                return;
            }
        };

        let target = self.output.clone().or_else(|| {
            rfd::FileDialog::new()
                .add_filter("Image", &[encoded.format.extension()])
                .set_file_name(format!("cropped.{}", encoded.format.extension()))
                .save_file()
        });

        self.status = Some(match target {
            Some(path) => match std::fs::write(&path, &encoded.bytes) {
                Ok(()) => {
                    log::info!("wrote {} ({} bytes)", path.display(), encoded.bytes.len());
                    format!(
                        "Saved {}x{} {} to {}",
                        encoded.width,
                        encoded.height,
                        encoded.content_type(),
                        path.display()
                    )
                }
                Err(err) => {
                    log::error!("failed to save {}: {err}", path.display());
                    format!("Failed to save image: {err}")
                }
            },
            None => "Save cancelled.".to_string(),
        });
        self.texture = None;
    }

    fn cancel(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.cancel();
        }
        self.session = None;
        self.texture = None;
        self.status = Some("Crop cancelled.".to_string());
    }

    fn aspect_controls(&mut self, ui: &mut egui::Ui) {
        ui.label("Aspect Ratio:");
        let mut changed = false;
        let selected_text = match self.aspect_preset {
            AspectPreset::Custom(..) => "Custom".to_string(),
            other => other.to_string(),
        };
        let orientation = if self.is_portrait {
            AspectPreset::PORTRAIT
        } else {
            AspectPreset::LANDSCAPE
        };

        egui::ComboBox::from_id_salt("params_aspect_ratio")
            .selected_text(selected_text)
            .show_ui(ui, |ui| {
                for preset in [AspectPreset::Free, AspectPreset::Original, AspectPreset::Square] {
                    changed |= ui
                        .selectable_value(&mut self.aspect_preset, preset, preset.to_string())
                        .changed();
                }
                ui.separator();
                for preset in orientation {
                    changed |= ui
                        .selectable_value(&mut self.aspect_preset, preset, preset.to_string())
                        .changed();
                }
                ui.separator();
                let is_custom = matches!(self.aspect_preset, AspectPreset::Custom(..));
                if ui.selectable_label(is_custom, "Custom").clicked() {
                    self.aspect_preset = AspectPreset::Custom(self.custom_w, self.custom_h);
                    changed = true;
                }
            });

        if ui.button("🔄").clicked() {
            self.is_portrait = !self.is_portrait;
            if matches!(self.aspect_preset, AspectPreset::Custom(..)) {
                std::mem::swap(&mut self.custom_w, &mut self.custom_h);
            } else {
                self.aspect_preset = self.aspect_preset.counterpart();
            }
            changed = true;
        }

        if matches!(self.aspect_preset, AspectPreset::Custom(..)) {
            changed |= ui
                .add(
                    egui::DragValue::new(&mut self.custom_w)
                        .speed(0.1)
                        .range(1..=100),
                )
                .changed();
            ui.label(":");
            changed |= ui
                .add(
                    egui::DragValue::new(&mut self.custom_h)
                        .speed(0.1)
                        .range(1..=100),
                )
                .changed();
        }

        if changed {
            self.apply_aspect_ratio();
        }
    }

    fn crop_surface(&mut self, ui: &mut egui::Ui) {
        let (Some(texture), Some(session)) = (&self.texture, self.session.as_mut()) else {
            return;
        };
        let (Some(surface), Some(selection)) = (session.surface(), session.selection()) else {
            return;
        };

        let available_size = ui.available_size();
        let max_size = available_size - egui::vec2(PADDING * 2.0, PADDING * 2.0);
        let surface_size = egui::vec2(surface.width_f32(), surface.height_f32());

        // The engine works in surface pixels; shrink the drawing if the window is smaller.
        let scale = (max_size.x / surface_size.x)
            .min(max_size.y / surface_size.y)
            .clamp(0.05, 1.0);
        let display_size = surface_size * scale;
        let total_display_size = display_size + egui::vec2(PADDING * 2.0, PADDING * 2.0);

        // Manual centering
        let x_offset = (available_size.x - total_display_size.x) / 2.0;
        let y_offset = (available_size.y - total_display_size.y) / 2.0;
        let start_pos = ui.cursor().min + egui::vec2(x_offset.max(0.0), y_offset.max(0.0));

        let target_rect = egui::Rect::from_min_size(start_pos, total_display_size);
        let response = ui.allocate_rect(target_rect, egui::Sense::drag());
        let painter = ui.painter_at(target_rect);

        let image_rect = egui::Rect::from_min_size(
            target_rect.min + egui::vec2(PADDING, PADDING),
            display_size,
        );

        painter.image(
            texture.id(),
            image_rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );

        let to_surface = |pos: egui::Pos2| {
            let local = (pos - image_rect.min) / scale;
            Point::new(local.x, local.y)
        };

        // egui reports one primary pointer for drags.
        if response.drag_started() {
            if let Some(pos) = response.interact_pointer_pos() {
                session.pointer_down(PointerId::PRIMARY, to_surface(pos));
            }
        }
        if response.dragged() {
            if let Some(pos) = response.interact_pointer_pos() {
                session.pointer_move(PointerId::PRIMARY, to_surface(pos));
            }
        }
        if response.drag_stopped() {
            session.pointer_up(PointerId::PRIMARY);
        }

        let selection = session.selection().unwrap_or(selection);
        let screen_crop_rect = egui::Rect::from_min_size(
            image_rect.min + egui::vec2(selection.x, selection.y) * scale,
            egui::vec2(selection.width, selection.height) * scale,
        );

        // Draw overlay (dimmed area outside crop)
        let overlay_color = egui::Color32::from_black_alpha(115);

        // Top
        painter.rect_filled(
            egui::Rect::from_min_max(
                image_rect.min,
                egui::pos2(image_rect.max.x, screen_crop_rect.min.y),
            ),
            0.0,
            overlay_color,
        );
        // Bottom
        painter.rect_filled(
            egui::Rect::from_min_max(
                egui::pos2(image_rect.min.x, screen_crop_rect.max.y),
                image_rect.max,
            ),
            0.0,
            overlay_color,
        );
        // Left
        painter.rect_filled(
            egui::Rect::from_min_max(
                egui::pos2(image_rect.min.x, screen_crop_rect.min.y),
                egui::pos2(screen_crop_rect.min.x, screen_crop_rect.max.y),
            ),
            0.0,
            overlay_color,
        );
        // Right
        painter.rect_filled(
            egui::Rect::from_min_max(
                egui::pos2(screen_crop_rect.max.x, screen_crop_rect.min.y),
                egui::pos2(image_rect.max.x, screen_crop_rect.max.y),
            ),
            0.0,
            overlay_color,
        );

        painter.rect_stroke(
            screen_crop_rect,
            0.0,
            egui::Stroke::new(2.0, egui::Color32::WHITE),
        );

        painter.text(
            image_rect.left_bottom() + egui::vec2(10.0, -10.0),
            egui::Align2::LEFT_BOTTOM,
            "Drag to crop. Drag inside box to reposition.",
            egui::FontId::proportional(12.0),
            egui::Color32::WHITE,
        );
    }
}

impl eframe::App for ImageCropper {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Handle dropped files
        let dropped = ctx.input(|i| i.raw.dropped_files.first().and_then(|f| f.path.clone()));
        if let Some(path) = dropped {
            self.open(ctx, &path);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Open Image").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Image", &["png", "jpg", "jpeg", "webp", "bmp", "gif"])
                        .pick_file()
                    {
                        self.open(ctx, &path);
                    }
                }

                let title = self
                    .session
                    .as_ref()
                    .map_or(self.options.resolve_title(), |session| session.title())
                    .to_string();
                ui.heading(title);
            });

            let ready = self
                .session
                .as_ref()
                .is_some_and(|session| session.is_ready());

            if ready {
                ui.horizontal(|ui| {
                    self.aspect_controls(ui);
                    ui.separator();

                    if ui.button("Full Image").clicked() {
                        if let Some(session) = self.session.as_mut() {
                            session.fit_to_image();
                        }
                    }
                    if ui.button("Reset").clicked() {
                        if let Some(session) = self.session.as_mut() {
                            session.reset_selection();
                        }
                    }
                    if ui.button("Cancel").clicked() {
                        self.cancel();
                    }
                    if ui.button("Use Image").clicked() {
                        self.confirm();
                    }
                });
            }

            if let Some(status) = &self.status {
                let errored = self
                    .session
                    .as_ref()
                    .is_some_and(|s| matches!(s.state(), SessionState::Errored(_)));
                let color = if errored {
                    ui.visuals().error_fg_color
                } else {
                    ui.visuals().weak_text_color()
                };
                ui.colored_label(color, status);
            }

            ui.separator();
            self.crop_surface(ui);
        });
    }
}

fn main() -> eframe::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let title = args.title.clone().unwrap_or_else(|| "Image Cropper".to_string());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([860.0, 640.0]),
        ..Default::default()
    };
    eframe::run_native(
        &title,
        options,
        Box::new(|cc| Ok(Box::new(ImageCropper::new(cc, args)))),
    )
}
