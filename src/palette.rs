//! Category color assignment
//!
//! Colors are bound lazily, in first-encounter order: a newly seen category
//! draws one color at random from those not yet bound to another category,
//! and keeps it for the rest of the build. When the palette runs dry the
//! configured `PaletteExhaustion` policy decides.

use crate::config::PaletteExhaustion;
use crate::error::TimelineError;
use rand::Rng;
use tracing::{debug, warn};

/// Category → color bindings in first-encounter order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryColors {
    entries: Vec<(String, String)>,
}

impl CategoryColors {
    pub fn get(&self, category: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, color)| color.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<(String, String)> {
        self.entries
    }
}

/// Ordered list of colors plus what to do once it is used up
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<String>,
    exhaustion: PaletteExhaustion,
}

impl Palette {
    pub fn new(colors: Vec<String>, exhaustion: PaletteExhaustion) -> Self {
        Self { colors, exhaustion }
    }

    /// Take `color` out of the draw pool, e.g. a color reserved for "Other"
    pub fn without(mut self, color: &str) -> Self {
        self.colors.retain(|c| c != color);
        self
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Color for the n-th category past the end of the palette
    fn overflow_color(&self, category: &str, overflow: usize) -> Result<String, TimelineError> {
        match self.exhaustion {
            PaletteExhaustion::Cycle if !self.colors.is_empty() => {
                Ok(self.colors[overflow % self.colors.len()].clone())
            }
            PaletteExhaustion::Cycle | PaletteExhaustion::Generate => {
                Ok(generated_color(overflow))
            }
            PaletteExhaustion::Fail => Err(TimelineError::PaletteExhausted {
                category: category.to_string(),
                palette_size: self.colors.len(),
            }),
        }
    }
}

/// Bind a color to `category`.
///
/// Pure apart from the injected `rng`: takes the current bindings and the
/// colors still unused, returns the category's color with the updated
/// bindings and unused colors. A category that is already bound keeps its
/// color and leaves both collections untouched.
pub fn assign_color<R: Rng + ?Sized>(
    category: &str,
    mut assigned: CategoryColors,
    mut available: Vec<String>,
    palette: &Palette,
    rng: &mut R,
) -> Result<(String, CategoryColors, Vec<String>), TimelineError> {
    if let Some(color) = assigned.get(category) {
        let color = color.to_string();
        return Ok((color, assigned, available));
    }

    let color = if available.is_empty() {
        let overflow = assigned.len().saturating_sub(palette.len());
        let color = palette.overflow_color(category, overflow)?;
        warn!(category, %color, "palette exhausted, using overflow color");
        color
    } else {
        let index = rng.gen_range(0..available.len());
        available.remove(index)
    };

    debug!(category, %color, "bound category color");
    assigned.entries.push((category.to_string(), color.clone()));
    Ok((color, assigned, available))
}

/// Stateful wrapper around `assign_color` for the duration of one build
pub struct ColorAssigner<'p, R> {
    palette: &'p Palette,
    assigned: CategoryColors,
    available: Vec<String>,
    rng: R,
}

impl<'p, R: Rng> ColorAssigner<'p, R> {
    pub fn new(palette: &'p Palette, rng: R) -> Self {
        Self {
            palette,
            assigned: CategoryColors::default(),
            available: palette.colors.clone(),
            rng,
        }
    }

    pub fn color_for(&mut self, category: &str) -> Result<String, TimelineError> {
        let assigned = std::mem::take(&mut self.assigned);
        let available = std::mem::take(&mut self.available);
        let (color, assigned, available) =
            assign_color(category, assigned, available, self.palette, &mut self.rng)?;
        self.assigned = assigned;
        self.available = available;
        Ok(color)
    }

    pub fn into_colors(self) -> CategoryColors {
        self.assigned
    }
}

/// Distinct hex color for the n-th generated slot (golden-angle hue steps)
fn generated_color(n: usize) -> String {
    let hue = (n as f64 * 137.507_764) % 360.0;
    let (r, g, b) = hsl_to_rgb(hue, 0.65, 0.45);
    format!("#{r:02x}{g:02x}{b:02x}")
}

fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> (u8, u8, u8) {
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let h = hue / 60.0;
    let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = lightness - chroma / 2.0;
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (channel(r), channel(g), channel(b))
}
