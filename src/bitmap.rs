use std::path::Path;

use image::RgbImage;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::warn;

use crate::canvas::{BoardPath, Canvas, LabelStyle, Point};
use crate::error::{RenderError, Result};
use crate::sprite::{SpriteCell, SpriteSheet};

const BACKGROUND: u8 = 0xff;

fn drawing_error<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Drawing(e.to_string())
}

/// 描画先の RGB ピクセルバッファ。ブラウザの canvas 要素に相当する。
#[derive(Debug, Clone, Default)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Surface {
    pub fn new() -> Self {
        Self::default()
    }

    /// 大きさを変える。内容は消える。
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels = vec![BACKGROUND; (width as usize) * (height as usize) * 3];
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + x as usize) * 3;
        Some([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]])
    }

    pub fn canvas(&mut self) -> BitmapCanvas<'_> {
        let size = (self.width, self.height);
        BitmapCanvas::new(&mut self.pixels, size)
    }

    pub fn to_image(&self) -> Result<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or_else(|| RenderError::Drawing("surface buffer does not match its size".to_string()))
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.to_image()?.save(path).map_err(|source| RenderError::Asset {
            locator: path.display().to_string(),
            source,
        })
    }
}

/// plotters の BitMapBackend に描く Canvas
pub struct BitmapCanvas<'a> {
    area: DrawingArea<BitMapBackend<'a>, Shift>,
    size: (u32, u32),
}

impl<'a> BitmapCanvas<'a> {
    pub fn new(buffer: &'a mut [u8], size: (u32, u32)) -> Self {
        let area = BitMapBackend::with_buffer(buffer, size).into_drawing_area();
        BitmapCanvas { area, size }
    }

    /// バッファへ書き出す
    pub fn present(&self) -> Result<()> {
        self.area.present().map_err(drawing_error)
    }

    fn inside(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.size.0 && (y as u32) < self.size.1
    }
}

impl Canvas for BitmapCanvas<'_> {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn draw_sprite(&mut self, sheet: &SpriteSheet, cell: SpriteCell, at: Point) -> Result<()> {
        let sprite = sheet.cell_image(cell);
        for (dx, dy, px) in sprite.enumerate_pixels() {
            let [r, g, b, a] = px.0;
            let (x, y) = (at.0 + dx as i32, at.1 + dy as i32);
            if a == 0 || !self.inside(x, y) {
                continue;
            }
            let drawn = if a == u8::MAX {
                self.area.draw_pixel((x, y), &RGBColor(r, g, b))
            } else {
                self.area.draw_pixel((x, y), &RGBAColor(r, g, b, a as f64 / 255.0))
            };
            drawn.map_err(drawing_error)?;
        }
        Ok(())
    }

    fn fill_text(&mut self, text: &str, at: Point, style: &LabelStyle) -> Result<()> {
        let text_style = TextStyle::from((style.font.as_str(), style.size as f64).into_font())
            .color(&BLACK)
            .pos(Pos::new(HPos::Left, VPos::Bottom));
        // フォントが見つからない環境では枚数表示だけ諦める
        if let Err(e) = self.area.draw_text(text, &text_style, at) {
            warn!(text, error = %e, "failed to draw label");
        }
        Ok(())
    }

    fn stroke_path(&mut self, path: &BoardPath, rgb: (u8, u8, u8)) -> Result<()> {
        let color = RGBColor(rgb.0, rgb.1, rgb.2);
        for &(from, to) in &path.lines {
            self.area
                .draw(&PathElement::new(vec![from, to], color.stroke_width(1)))
                .map_err(drawing_error)?;
        }
        for &(center, radius) in &path.dots {
            self.area
                .draw(&Circle::new(center, radius as i32, color.filled()))
                .map_err(drawing_error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::sprite;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_resize_clears() {
        let mut surface = Surface::new();
        assert_eq!(surface.size(), (0, 0));
        surface.resize(4, 3);
        assert_eq!(surface.size(), (4, 3));
        assert_eq!(surface.pixel(3, 2), Some([BACKGROUND; 3]));
        assert_eq!(surface.pixel(4, 0), None);
    }

    #[test]
    fn test_sprite_blit_and_clip() {
        let config = RenderConfig::default();
        let pawn = sprite::lookup("P").unwrap();
        let (ox, oy) = pawn.origin(43, 48);
        let mut sheet_image = RgbaImage::new(43 * 8, 48 * 6);
        for dy in 0..48 {
            for dx in 0..43 {
                sheet_image.put_pixel(ox + dx, oy + dy, Rgba([10, 20, 30, 255]));
            }
        }
        let sheet = SpriteSheet::from_image(sheet_image, &config).unwrap();

        let mut surface = Surface::new();
        surface.resize(60, 60);
        {
            let mut canvas = surface.canvas();
            canvas.draw_sprite(&sheet, pawn, (30, 30)).unwrap();
            canvas.present().unwrap();
        }
        assert_eq!(surface.pixel(30, 30), Some([10, 20, 30]));
        assert_eq!(surface.pixel(59, 59), Some([10, 20, 30]));
        assert_eq!(surface.pixel(29, 30), Some([BACKGROUND; 3]));
    }

    #[test]
    fn test_transparent_pixels_keep_background() {
        let config = RenderConfig::default();
        let sheet = SpriteSheet::from_image(RgbaImage::new(43 * 8, 48 * 6), &config).unwrap();
        let mut surface = Surface::new();
        surface.resize(43, 48);
        {
            let mut canvas = surface.canvas();
            canvas.draw_sprite(&sheet, sprite::lookup("k").unwrap(), (0, 0)).unwrap();
            canvas.present().unwrap();
        }
        assert_eq!(surface.pixel(20, 20), Some([BACKGROUND; 3]));
    }

    #[test]
    fn test_stroke_path_colors_line() {
        let mut surface = Surface::new();
        surface.resize(20, 20);
        {
            let mut canvas = surface.canvas();
            let mut path = BoardPath::default();
            path.line((0, 10), (19, 10));
            path.dot((5, 5), 2);
            canvas.stroke_path(&path, (200, 0, 0)).unwrap();
            canvas.present().unwrap();
        }
        assert_eq!(surface.pixel(12, 10), Some([200, 0, 0]));
        assert_eq!(surface.pixel(5, 5), Some([200, 0, 0]));
        assert_eq!(surface.pixel(15, 2), Some([BACKGROUND; 3]));
    }

    #[test]
    fn test_save_png() {
        let mut surface = Surface::new();
        surface.resize(8, 8);
        let path = std::env::temp_dir().join(format!("shogiboard-surface-{}.png", std::process::id()));
        surface.save_png(&path).unwrap();
        let loaded = image::open(&path).unwrap().to_rgb8();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.dimensions(), (8, 8));
    }
}
