//! Headless figure export: diagrams rendered to PNG heatmaps.

use std::path::Path;

use eframe::egui::Color32;
use image::{imageops, Rgb, RgbImage};
use ndarray::ArrayView2;

use crate::cmd::Cmd;
use crate::color::{normalise_grid, ColorMap, ColorScale};
use crate::error::Result;
use crate::hrdiagrams::{Abundance, HrDiagram};

/// Appearance of an exported heatmap.
#[derive(Debug, Clone)]
pub struct FigureOptions {
    pub cmap: ColorMap,
    pub scale: ColorScale,
    /// Side length in pixels of one grid cell.
    pub pixel_size: u32,
    /// Colour of empty cells.
    pub background: Color32,
}

impl Default for FigureOptions {
    fn default() -> Self {
        Self {
            cmap: ColorMap::Viridis,
            scale: ColorScale::Log10,
            pixel_size: 4,
            background: Color32::WHITE,
        }
    }
}

/// Render `grid`, indexed `[x, y]`, as an image.
///
/// Without flips the first x bin is on the left and the last y bin on top.
pub fn heatmap_image(
    grid: ArrayView2<'_, f64>,
    opts: &FigureOptions,
    flip_x: bool,
    flip_y: bool,
) -> RgbImage {
    let (nx, ny) = grid.dim();
    let norm = normalise_grid(grid, opts.scale);
    let rgb = |c: Color32| Rgb([c.r(), c.g(), c.b()]);

    let img = RgbImage::from_fn(nx as u32, ny as u32, |px, py| {
        let x = if flip_x { nx - 1 - px as usize } else { px as usize };
        let y = if flip_y { py as usize } else { ny - 1 - py as usize };
        match norm[[x, y]] {
            Some(t) => rgb(opts.cmap.at(t)),
            None => rgb(opts.background),
        }
    });

    if opts.pixel_size > 1 {
        imageops::resize(
            &img,
            nx as u32 * opts.pixel_size,
            ny as u32 * opts.pixel_size,
            imageops::FilterType::Nearest,
        )
    } else {
        img
    }
}

/// HR diagram image: temperature decreasing to the right, luminosity up.
pub fn hrd_image(grid: ArrayView2<'_, f64>, opts: &FigureOptions) -> RgbImage {
    heatmap_image(grid, opts, true, false)
}

/// CMD image from a `[mag, col]` grid: colour to the right, bright on top.
pub fn cmd_image(grid: ArrayView2<'_, f64>, opts: &FigureOptions) -> RgbImage {
    heatmap_image(grid.t(), opts, false, true)
}

/// Write the HR diagram at `log_age` to a PNG file.
pub fn plot_hrd(
    hrd: &HrDiagram,
    log_age: f64,
    abundance: Abundance,
    path: &Path,
    opts: &FigureOptions,
) -> Result<()> {
    let slices = hrd.at_log_age(log_age);
    save_png(&hrd_image(slices.get(abundance).view(), opts), path)
}

/// Write the CMD at `log_age` to a PNG file.
pub fn plot_cmd(cmd: &Cmd, log_age: f64, path: &Path, opts: &FigureOptions) -> Result<()> {
    save_png(&cmd_image(cmd.at_log_age(log_age), opts), path)
}

pub fn save_png(img: &RgbImage, path: &Path) -> Result<()> {
    img.save_with_format(path, image::ImageFormat::Png)?;
    log::info!("wrote {}x{} figure to {}", img.width(), img.height(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn plain() -> FigureOptions {
        FigureOptions {
            cmap: ColorMap::Greys,
            scale: ColorScale::Linear,
            pixel_size: 1,
            background: Color32::from_rgb(255, 0, 0),
        }
    }

    #[test]
    fn last_y_bin_is_on_top() {
        // grid[x][y]: only (x=0, y=1) is filled
        let grid = array![[0.0, 1.0], [0.0, 0.0]];
        let img = heatmap_image(grid.view(), &plain(), false, false);
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(img.get_pixel(1, 0), &Rgb([255, 0, 0]));
        assert_eq!(img.get_pixel(0, 1), &Rgb([255, 0, 0]));
    }

    #[test]
    fn hrd_puts_hot_stars_on_the_left() {
        let grid = array![[0.0, 0.0], [1.0, 0.0]];
        let img = hrd_image(grid.view(), &plain());
        assert_eq!(img.get_pixel(0, 1), &Rgb([0, 0, 0]));
    }

    #[test]
    fn cmd_puts_bright_stars_on_top() {
        // [mag, col]: brightest magnitude bin 0, colour bin 1
        let grid = array![[0.0, 1.0], [0.0, 0.0]];
        let img = cmd_image(grid.view(), &plain());
        assert_eq!(img.get_pixel(1, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn pixels_are_scaled_up() {
        let grid = array![[1.0]];
        let opts = FigureOptions {
            pixel_size: 3,
            ..plain()
        };
        assert_eq!(heatmap_image(grid.view(), &opts, false, false).dimensions(), (3, 3));
    }

    #[test]
    fn png_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmd.png");
        let mut cmd = Cmd::new([0.0, 1.0], [0.0, 1.0], 0.25);
        cmd.grid[[0, 1, 1]] = 3.0;
        plot_cmd(&cmd, 6.0, &path, &FigureOptions::default()).unwrap();
        assert!(path.exists());
    }
}
