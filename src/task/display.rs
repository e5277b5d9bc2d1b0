//! # Display
//! This module draws the image shown on a key.
//!
//! The image is composed from two layers: the clock face art, tinted with the animation color and
//! wobbling while the alarm rings, and the alarm time printed on top of it in the status color with
//! a black outline so it stays readable on any part of the face.
use crate::config::{IMAGE_SIZE, TEXT_OVERSAMPLE};
use crate::error::Result;
use crate::state::{AlarmSettings, AlarmStatus};
use crate::task::animation::RenderState;
use crate::utility::bitmap::Bitmap;
use crate::utility::string_utils::StringUtils;
use embedded_graphics::{
    mono_font::{MonoTextStyleBuilder, ascii::FONT_10X20},
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{Circle, Line, PrimitiveStyle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};

/// Time color of an alarm that is not armed
pub const TIME_COLOR_UNSET: Rgb888 = Rgb888::new(0xbb, 0xbb, 0xbb);

/// Time color of an armed alarm
pub const TIME_COLOR_ARMED: Rgb888 = Rgb888::new(0x00, 0xff, 0x00);

/// Time color of a ringing alarm
pub const TIME_COLOR_RINGING: Rgb888 = Rgb888::new(0x00, 0xf9, 0xff);

/// The face art is laid out on this grid and scaled to the image size
const ART_GRID: i32 = 72;

/// Offsets of the outline pass around the time text
const OUTLINE_OFFSETS: [Point; 8] = [
    Point::new(-1, -1),
    Point::new(0, -1),
    Point::new(1, -1),
    Point::new(-1, 0),
    Point::new(1, 0),
    Point::new(-1, 1),
    Point::new(0, 1),
    Point::new(1, 1),
];

/// The color the time is printed in
pub const fn time_color(status: AlarmStatus) -> Rgb888 {
    match status {
        AlarmStatus::Unset => TIME_COLOR_UNSET,
        AlarmStatus::Armed => TIME_COLOR_ARMED,
        AlarmStatus::Ringing => TIME_COLOR_RINGING,
    }
}

/// Renders key images. Holds the face art so it is drawn only once.
pub struct KeyRenderer {
    /// Edge length of the key image
    size: u32,
    /// Edge length of the canvas the time text is printed on before it is scaled down
    text_size: u32,
    /// The clock face, in black
    face: Bitmap,
}

impl Default for KeyRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyRenderer {
    /// Create a renderer for the configured image size
    pub fn new() -> Self {
        Self::with_size(IMAGE_SIZE)
    }

    /// Create a renderer for square images of `size` pixels
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn with_size(size: u32) -> Self {
        Self {
            size,
            text_size: (size as f32 * TEXT_OVERSAMPLE).round() as u32,
            face: draw_clock_face(size),
        }
    }

    /// Compose the key image for the settings and the animation state
    pub fn render(&self, settings: &AlarmSettings, state: &RenderState) -> Bitmap {
        let mut canvas = Bitmap::new(self.size, self.size);

        let mut face = self.face.clone();
        face.recolor_black(state.clock_color());
        if state.wobble().abs() > f32::EPSILON {
            face = face.transformed(state.scale(), state.rotation_degrees());
        }
        canvas.blit_centered(&face);

        let text = StringUtils::format_alarm_time(
            settings.hour(),
            settings.minute(),
            settings.military_time,
        );
        let outline = self
            .print(&text, &OUTLINE_OFFSETS)
            .resized(self.size, self.size);
        let mut fill = self.print(&text, &[Point::zero()]);
        fill.recolor_black(time_color(AlarmStatus::of(settings, state.is_ringing())));
        let fill = fill.resized(self.size, self.size);

        canvas.blit(&outline, 0, 0);
        canvas.blit(&fill, 0, 0);
        canvas
    }

    /// Compose the key image and encode it the way the host takes it
    pub fn render_data_url(&self, settings: &AlarmSettings, state: &RenderState) -> Result<String> {
        self.render(settings, state).to_data_url()
    }

    /// Print the text in black, centered on the oversampled canvas, once per offset
    #[allow(clippy::cast_possible_wrap)]
    fn print(&self, text: &str, offsets: &[Point]) -> Bitmap {
        let mut layer = Bitmap::new(self.text_size, self.text_size);
        let character_style = MonoTextStyleBuilder::new()
            .font(&FONT_10X20)
            .text_color(Rgb888::BLACK)
            .build();
        let text_style = TextStyleBuilder::new()
            .alignment(Alignment::Center)
            .baseline(Baseline::Middle)
            .build();
        let center = Point::new(self.text_size as i32 / 2, self.text_size as i32 / 2);
        for offset in offsets {
            let _ = Text::with_text_style(text, center + *offset, character_style, text_style)
                .draw(&mut layer);
        }
        layer
    }
}

/// Draw the alarm clock art in black on a transparent square of `size` pixels
#[allow(clippy::cast_possible_wrap)]
fn draw_clock_face(size: u32) -> Bitmap {
    let mut face = Bitmap::new(size, size);
    let edge = size as i32;
    let at = |x: i32, y: i32| Point::new(x * edge / ART_GRID, y * edge / ART_GRID);
    let length = |l: i32| (l * edge / ART_GRID).unsigned_abs();
    let stroke = |width: i32| PrimitiveStyle::with_stroke(Rgb888::BLACK, length(width).max(1));
    let fill = PrimitiveStyle::with_fill(Rgb888::BLACK);

    // bells
    let _ = Circle::with_center(at(15, 15), length(18))
        .into_styled(fill)
        .draw(&mut face);
    let _ = Circle::with_center(at(57, 15), length(18))
        .into_styled(fill)
        .draw(&mut face);
    // hammer
    let _ = Line::new(at(36, 3), at(36, 12))
        .into_styled(stroke(3))
        .draw(&mut face);
    // legs
    let _ = Line::new(at(20, 58), at(12, 69))
        .into_styled(stroke(4))
        .draw(&mut face);
    let _ = Line::new(at(52, 58), at(60, 69))
        .into_styled(stroke(4))
        .draw(&mut face);
    // body, drawn last so it covers the inner half of the bells
    let _ = Circle::with_center(at(36, 38), length(56))
        .into_styled(PrimitiveStyle::with_fill(Rgb888::WHITE))
        .draw(&mut face);
    let _ = Circle::with_center(at(36, 38), length(56))
        .into_styled(stroke(5))
        .draw(&mut face);
    // hour marks
    for (from, to) in [
        ((36, 13), (36, 18)),
        ((61, 38), (56, 38)),
        ((36, 63), (36, 58)),
        ((11, 38), (16, 38)),
    ] {
        let _ = Line::new(at(from.0, from.1), at(to.0, to.1))
            .into_styled(stroke(2))
            .draw(&mut face);
    }
    face
}
